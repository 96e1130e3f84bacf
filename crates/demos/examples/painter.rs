//! Replay a drag painter session.

use clap::Parser;
use easel::{Config, Result, logging};
use easel_demos::{painter, replay};

/// CLI flags for the painter demo.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Pointer poll period in milliseconds.
    #[clap(short, long, default_value_t = 50)]
    poll: u64,
}

/// Run the painter demo.
fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let runner = painter::runner(Config::from_env()).mouse_moved_delay(args.poll);
    let session = replay(runner, painter::script)?;
    for call in session.window.drawing_calls() {
        println!("{call}");
    }
    for stroke in &session.app.model.strokes {
        println!("{} stroke, {} points", stroke.color, stroke.points.len());
    }
    Ok(())
}

//! Replay a scripted click counter session.

use clap::Parser;
use easel::{Config, Result, logging};
use easel_demos::{counter, replay};

/// CLI flags for the counter demo.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Also print every surface operation the host recorded.
    #[clap(short, long)]
    ops: bool,
}

/// Run the counter demo.
fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let session = replay(counter::runner(Config::from_env()), counter::script)?;
    for call in session.window.drawing_calls() {
        println!("{call}");
    }
    if args.ops {
        for op in session.probe.ops() {
            println!("{op:?}");
        }
    }
    println!("clicks: {}", session.app.model.clicks);
    Ok(())
}

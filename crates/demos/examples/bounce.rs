//! Replay a bouncing ball session.

use clap::Parser;
use easel::{Config, Result, logging};
use easel_demos::{bounce, replay};

/// CLI flags for the bounce demo.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Session length in milliseconds.
    #[clap(short, long, default_value_t = 2000)]
    millis: u64,

    /// Window width.
    #[clap(long, default_value_t = 300)]
    width: u32,

    /// Window height.
    #[clap(long, default_value_t = 300)]
    height: u32,
}

/// Run the bounce demo.
fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let runner = bounce::runner(Config::from_env()).size(args.width, args.height);
    let session = replay(runner, |p| bounce::script(p, args.millis))?;
    for call in session.window.drawing_calls() {
        println!("{call}");
    }
    let ball = &session.app.model;
    println!("ball at ({}, {}) after {:?}", ball.x, ball.y, session.probe.elapsed());
    Ok(())
}

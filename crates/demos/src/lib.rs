//! Sample applications built on easel.
//!
//! Each demo exposes a `runner` that wires the application's callbacks and
//! a `script` that drives a short session on the headless backend.

use easel::{
    App, Result, Runner, Window, backend::headless::Probe, fingerprint::Fingerprint,
};

/// Bouncing ball.
pub mod bounce;
/// Click counter.
pub mod counter;
/// Drag painter.
pub mod painter;

#[cfg(test)]
mod tests;

/// A finished headless session.
pub struct Session<M> {
    /// The application after it stopped.
    pub app: App<M>,
    /// The window it ran in.
    pub window: Window,
    /// The headless host's probe.
    pub probe: Probe,
}

/// Run an application against a scripted headless session.
pub fn replay<M: Fingerprint>(runner: Runner<M>, script: impl FnOnce(&Probe)) -> Result<Session<M>> {
    let (probe, window) = Window::headless();
    script(&probe);
    let app = runner.run(&window)?;
    Ok(Session { app, window, probe })
}

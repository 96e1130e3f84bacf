//! Easel: a small event-driven graphics application framework.
//!
//! An application is a model plus a set of callbacks. The run loop
//! delivers normalised input, timer ticks and pointer motion to the
//! callbacks, and redraws the view after each one. The model and the view
//! are kept apart: drawing is only possible during a redraw, and a redraw
//! that changes the model stops the application.
//!
//! # Quick Start
//!
//! - [`Runner`] - Configure callbacks and run an application
//! - [`App`] - The model wrapper every callback receives
//! - [`Window`] - The host window applications run in
//! - [`Canvas`] - The guarded drawing surface handed to redraw
//!
//! # Module Organization
//!
//! - [`event`] - Key and mouse events, key name normalisation
//! - [`fingerprint`] - Structural fingerprints used by the model check
//! - [`schedule`] - Deferred calls keyed by id
//! - [`canvas`] - Drawing surface guard and drawing-call log
//! - [`safe`] - Failure containment and traceback reports
//! - [`backend`] - The host trait and the headless host

#![warn(missing_docs)]

// Allow derive macros to reference `easel::` from within this crate
extern crate self as easel;

mod runloop;

pub mod app;
pub mod backend;
pub mod canvas;
pub mod config;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod geom;
pub mod logging;
pub mod runner;
pub mod safe;
pub mod schedule;
pub mod window;

pub use app::{App, RunState, scale_image};
pub use canvas::{Canvas, DrawCall, Op, Options};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{KeyEvent, MouseEvent};
pub use runner::Runner;
pub use window::Window;

/// Everything an application usually needs.
pub mod prelude {
    pub use crate::{
        App, Canvas, Error, KeyEvent, MouseEvent, Options, Result, RunState, Runner, Window,
        fingerprint::Fingerprint,
    };
}

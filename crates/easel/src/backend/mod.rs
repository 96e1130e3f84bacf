/// Headless backend for tests and scripted sessions.
pub mod headless;

use std::{path::PathBuf, process, time::Instant};

use image::DynamicImage;

use crate::{
    canvas::{ImageHandle, ItemId, Op, Options},
    error::Result,
    event::Event,
    geom::{Geometry, Point},
};

/// The windowing toolkit underneath an application: one top-level window
/// with a single drawing surface, an input event source and a clock.
///
/// The run loop is the only caller. Drawing calls arrive already checked by
/// the surface guard; options are passed through opaquely.
pub trait Host {
    /// The host's clock. Deadlines handed to [`Host::next_event`] are
    /// measured against it.
    fn now(&self) -> Instant;

    /// Current window geometry.
    fn geometry(&self) -> Result<Geometry>;

    /// Request a new window geometry. The host reports the outcome with an
    /// [`Event::Configure`].
    fn set_geometry(&mut self, geometry: Geometry) -> Result<()>;

    /// Set the window title.
    fn set_title(&mut self, title: &str) -> Result<()>;

    /// Reveal, raise and focus the window.
    fn show(&mut self) -> Result<()>;

    /// Hide the window without destroying it.
    fn hide(&mut self) -> Result<()>;

    /// Pointer position relative to the window origin. May lie outside the
    /// window.
    fn pointer(&self) -> Result<Point>;

    /// Block until the next input event, or until `deadline` passes, in
    /// which case `None` is returned.
    fn next_event(&mut self, deadline: Option<Instant>) -> Result<Option<Event>>;

    /// Create the drawing surface, filling the window.
    fn create_surface(&mut self) -> Result<()>;

    /// Destroy the drawing surface.
    fn destroy_surface(&mut self) -> Result<()>;

    /// Create an item on the drawing surface.
    fn draw(&mut self, op: Op, coords: &[f64], options: &Options) -> Result<ItemId>;

    /// Convert a portable image to a native handle.
    fn native_image(&mut self, img: &DynamicImage) -> Result<ImageHandle>;

    /// Delete every item on the surface.
    fn clear(&mut self) -> Result<()>;

    /// Push pending drawing to the screen.
    fn update(&mut self) -> Result<()>;

    /// Show a modal message.
    fn show_message(&mut self, title: &str, message: &str) -> Result<()>;

    /// Ask the user for a line of text. `None` if cancelled.
    fn ask_string(&mut self, title: &str, prompt: &str) -> Result<Option<String>>;

    /// Ask the user for a path to save to. `None` if cancelled.
    fn ask_save_path(&mut self, title: &str) -> Result<Option<PathBuf>>;

    /// Ask the user for an existing file. `None` if cancelled.
    fn ask_open_path(&mut self, title: &str) -> Result<Option<PathBuf>>;

    /// Capture the window contents.
    fn snapshot(&mut self) -> Result<DynamicImage>;

    /// Exit the process immediately, skipping any graceful shutdown.
    fn exit(&mut self, code: i32) -> ! {
        process::exit(code)
    }
}

//! The application handle passed to every callback.
use std::{
    cell::{Cell, RefMut},
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
    time::{Duration, Instant},
};

use image::{DynamicImage, imageops::FilterType};
use tracing::debug;

use crate::{
    backend::Host,
    config::Config,
    error::{Error, Result},
    geom::{Geometry, Point},
    schedule::{CancelToken, Scheduler},
    window::{HostCell, borrow_host},
};

/// Scheduler id for the debounced redraw.
pub(crate) const REDRAW_ID: &str = "deferred_redraw_all";
/// Scheduler id for the repeating timer.
pub(crate) const TIMER_ID: &str = "timer_fired";
/// Scheduler id for the pointer poll.
pub(crate) const MOTION_ID: &str = "mouse_motion";
/// Scheduler id for the deferred snapshot capture.
pub(crate) const SNAPSHOT_ID: &str = "save_snapshot";

/// Application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Constructed but not yet run.
    #[default]
    NotStarted,
    /// Delivering events.
    Running,
    /// Running, but timer, motion and click delivery are suppressed.
    Paused,
    /// Terminal.
    Stopped,
}

impl RunState {
    /// Is the application live, paused or not?
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Work the run loop defers through the scheduler.
#[derive(Debug)]
pub(crate) enum Task {
    /// A debounced redraw.
    Redraw,
    /// One tick of the repeating timer.
    Timer(CancelToken),
    /// One sample of the pointer position.
    MotionPoll(CancelToken),
    /// Capture the window and save it.
    SaveSnapshot(PathBuf),
}

/// The running application: the user's model plus the window state the run
/// loop maintains around it.
///
/// Input callbacks receive `&mut App<M>` and may change the model freely.
/// The redraw callback receives `&App<M>`, so the model can only change
/// there through interior mutability, which the model check catches.
pub struct App<M> {
    /// The application model.
    pub model: M,
    /// Locked configuration this run started from.
    pub(crate) config: Config,
    /// Last accepted window geometry.
    pub(crate) geometry: Geometry,
    /// Base title, without the size suffix.
    pub(crate) title: String,
    /// Timer period.
    pub(crate) timer_delay: Duration,
    /// Pointer poll period.
    pub(crate) mouse_moved_delay: Duration,
    /// Fingerprint the model around each redraw?
    pub(crate) mvc_check: bool,
    /// Lifecycle state.
    pub(crate) state: RunState,
    /// Is a mouse button held down after a press inside the window?
    pub(crate) mouse_pressed: bool,
    /// Did the current press start outside the window?
    pub(crate) pressed_outside: bool,
    /// Last pointer position delivered to the application.
    pub(crate) last_mouse: Point,
    /// Geometry last seen by resize handling.
    pub(crate) last_dims: Option<Geometry>,
    /// Has quit been requested?
    pub(crate) quit_requested: bool,
    /// The failure that stopped the application, if any.
    pub(crate) failure: Option<Error>,
    /// Deferred work.
    pub(crate) scheduler: Scheduler<Task>,
    /// Token for the repeating timer chain.
    pub(crate) timer_token: CancelToken,
    /// Token for the pointer poll chain.
    pub(crate) motion_token: CancelToken,
    /// The host.
    host: HostCell,
    /// Set while a redraw is in progress.
    in_redraw: Rc<Cell<bool>>,
}

impl<M: fmt::Debug> fmt::Debug for App<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("model", &self.model)
            .field("title", &self.title)
            .field("geometry", &self.geometry)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<M> App<M> {
    /// Construct an application from a locked configuration.
    pub(crate) fn new(
        model: M,
        config: Config,
        host: HostCell,
        in_redraw: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            model,
            geometry: config.geometry(),
            title: config.title(),
            timer_delay: config.timer_delay(),
            mouse_moved_delay: config.mouse_moved_delay(),
            mvc_check: config.mvc_check(),
            config,
            state: RunState::NotStarted,
            mouse_pressed: false,
            pressed_outside: false,
            last_mouse: Point::new(-1, -1),
            last_dims: None,
            quit_requested: false,
            failure: None,
            scheduler: Scheduler::new(),
            timer_token: CancelToken::new(),
            motion_token: CancelToken::new(),
            host,
            in_redraw,
        }
    }

    /// Borrow the host on behalf of an application call. Host access from
    /// inside a redraw is a model/view violation.
    fn host_for(&self, call: &str) -> Result<RefMut<'_, Box<dyn Host>>> {
        if self.in_redraw.get() {
            return Err(Error::mvc(format!("Cannot call {call} in redraw_all")));
        }
        borrow_host(&self.host)
    }

    /// Borrow the host on behalf of the run loop.
    pub(crate) fn host(&self) -> Result<RefMut<'_, Box<dyn Host>>> {
        borrow_host(&self.host)
    }

    /// The host's clock.
    pub(crate) fn now(&self) -> Result<Instant> {
        Ok(self.host()?.now())
    }

    /// Schedule deferred work relative to the host clock.
    pub(crate) fn defer(
        &mut self,
        id: &str,
        delay: Duration,
        task: Task,
        replace: bool,
    ) -> Result<()> {
        let now = self.now()?;
        self.scheduler.schedule(id, delay, task, replace, now);
        Ok(())
    }

    /// Push the title, with the current size appended, to the host.
    pub(crate) fn update_title(&self) -> Result<()> {
        let title = format!(
            "{} ({} x {})",
            self.title, self.geometry.width, self.geometry.height
        );
        self.host()?.set_title(&title)
    }

    /// Window width.
    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    /// Window height.
    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    /// Window x position.
    pub fn x(&self) -> i32 {
        self.geometry.x
    }

    /// Window y position.
    pub fn y(&self) -> i32 {
        self.geometry.y
    }

    /// Base window title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The configuration this run started from. Always locked.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The failure that stopped the application, if any.
    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Ask the host to resize the window. The change arrives later as a
    /// configure event and goes through normal resize handling.
    pub fn set_size(&self, width: u32, height: u32) -> Result<()> {
        let g = Geometry::new(width, height, self.geometry.x, self.geometry.y);
        self.host_for("set_size")?.set_geometry(g)
    }

    /// Ask the host to move the window.
    pub fn set_position(&self, x: i32, y: i32) -> Result<()> {
        let g = Geometry::new(self.geometry.width, self.geometry.height, x, y);
        self.host_for("set_position")?.set_geometry(g)
    }

    /// Timer period.
    pub fn timer_delay(&self) -> Duration {
        self.timer_delay
    }

    /// Change the timer period. Takes effect from the next tick.
    pub fn set_timer_delay(&mut self, ms: u64) {
        self.timer_delay = Duration::from_millis(ms);
    }

    /// Pointer poll period.
    pub fn mouse_moved_delay(&self) -> Duration {
        self.mouse_moved_delay
    }

    /// Is the application paused?
    pub fn is_paused(&self) -> bool {
        self.state == RunState::Paused
    }

    /// Switch between running and paused. Does nothing once stopped.
    pub fn toggle_paused(&mut self) {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
            s => s,
        };
        debug!(state = ?self.state, "toggled pause");
    }

    /// Stop the application and leave the run loop once the current
    /// callback returns.
    pub fn quit(&mut self) {
        self.state = RunState::Stopped;
        self.quit_requested = true;
    }

    /// Show a modal message.
    pub fn show_message(&self, message: &str) -> Result<()> {
        self.host_for("show_message")?
            .show_message("show_message", message)
    }

    /// Ask the user for a line of text. `None` if they cancel.
    pub fn get_user_input(&self, prompt: &str) -> Result<Option<String>> {
        self.host_for("get_user_input")?
            .ask_string("get_user_input", prompt)
    }

    /// Load an image from disk. Without a path, the user is asked for one,
    /// and `None` is returned if they cancel.
    pub fn load_image(&self, path: Option<&Path>) -> Result<Option<DynamicImage>> {
        if self.in_redraw.get() {
            return Err(Error::mvc("Cannot call load_image in redraw_all"));
        }
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let asked = self
                    .host_for("load_image")?
                    .ask_open_path("Select file: ")?;
                match asked {
                    Some(p) => p,
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(image::open(&path)?))
    }

    /// Capture the window contents.
    pub fn get_snapshot(&self) -> Result<DynamicImage> {
        let mut host = self.host_for("get_snapshot")?;
        host.show()?;
        host.snapshot()
    }

    /// Ask the user for a path and save a snapshot there. A `.png`
    /// extension is appended if missing. The capture happens on the next
    /// turn of the run loop so the file dialog is not captured with it.
    pub fn save_snapshot(&mut self) -> Result<()> {
        let asked = self
            .host_for("save_snapshot")?
            .ask_save_path("Select file: ")?;
        let Some(path) = asked else {
            return Ok(());
        };
        let path = if path.to_string_lossy().ends_with(".png") {
            path
        } else {
            let mut s = path.into_os_string();
            s.push(".png");
            PathBuf::from(s)
        };
        self.defer(
            SNAPSHOT_ID,
            Duration::ZERO,
            Task::SaveSnapshot(path),
            false,
        )
    }
}

/// Scale an image by a factor. With `antialias` the Lanczos filter is used,
/// otherwise nearest-neighbour sampling.
pub fn scale_image(img: &DynamicImage, scale: f64, antialias: bool) -> DynamicImage {
    let dim = |v: u32| {
        let scaled = (f64::from(v) * scale).round();
        if scaled < 1.0 {
            1
        } else if scaled > f64::from(u32::MAX) {
            u32::MAX
        } else {
            scaled as u32
        }
    };
    let filter = if antialias {
        FilterType::Lanczos3
    } else {
        FilterType::Nearest
    };
    img.resize_exact(dim(img.width()), dim(img.height()), filter)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use image::RgbImage;

    use super::*;
    use crate::backend::headless::{HeadlessHost, Probe};

    fn app() -> (Probe, App<u32>) {
        let (probe, host) = HeadlessHost::create();
        let host: HostCell = Rc::new(RefCell::new(Box::new(host)));
        let mut config = Config::from_vars(Vec::<(String, String)>::new());
        config.lock();
        (
            probe,
            App::new(0, config, host, Rc::new(Cell::new(false))),
        )
    }

    #[test]
    fn defaults() {
        let (_, app) = app();
        assert_eq!(app.width(), 300);
        assert_eq!(app.height(), 300);
        assert_eq!((app.x(), app.y()), (0, 0));
        assert_eq!(app.title(), "Easel");
        assert_eq!(app.timer_delay(), Duration::from_millis(100));
        assert_eq!(app.mouse_moved_delay(), Duration::from_millis(50));
        assert_eq!(app.state(), RunState::NotStarted);
        assert!(app.config().is_locked());
    }

    #[test]
    fn pause_and_quit() {
        let (_, mut app) = app();
        app.toggle_paused();
        assert_eq!(app.state(), RunState::NotStarted);
        app.state = RunState::Running;
        app.toggle_paused();
        assert!(app.is_paused());
        assert!(app.state().is_running());
        app.toggle_paused();
        assert_eq!(app.state(), RunState::Running);
        app.quit();
        assert_eq!(app.state(), RunState::Stopped);
        assert!(app.quit_requested);
        app.toggle_paused();
        assert_eq!(app.state(), RunState::Stopped);
    }

    #[test]
    fn dialogs() -> Result<()> {
        let (probe, app) = app();
        probe.answer(Some("bob")).answer(None);
        assert_eq!(app.get_user_input("name?")?, Some("bob".into()));
        assert_eq!(app.get_user_input("again?")?, None);
        app.show_message("hi")?;
        assert_eq!(probe.prompts(), vec!["name?".to_string(), "again?".into()]);
        assert_eq!(
            probe.messages(),
            vec![("show_message".to_string(), "hi".to_string())]
        );
        Ok(())
    }

    #[test]
    fn host_calls_refused_in_redraw() {
        let (_, app) = app();
        app.in_redraw.set(true);
        assert_eq!(
            app.load_image(None).unwrap_err(),
            Error::mvc("Cannot call load_image in redraw_all")
        );
        assert!(app.show_message("x").unwrap_err().is_mvc_violation());
        assert!(app.set_size(10, 10).unwrap_err().is_mvc_violation());
    }

    #[test]
    fn load_image_cancelled() -> Result<()> {
        let (probe, app) = app();
        probe.answer_path(None);
        assert!(app.load_image(None)?.is_none());
        Ok(())
    }

    #[test]
    fn save_snapshot_defers() -> Result<()> {
        let (probe, mut app) = app();
        probe
            .answer_path(Some("shot".into()))
            .answer_path(Some("other.png".into()))
            .answer_path(None);
        app.save_snapshot()?;
        assert!(app.scheduler.is_pending(SNAPSHOT_ID));
        let due = app.scheduler.take_due(app.now()?);
        match due.as_slice() {
            [(id, Task::SaveSnapshot(p))] => {
                assert_eq!(id, SNAPSHOT_ID);
                assert_eq!(p, &PathBuf::from("shot.png"));
            }
            other => panic!("unexpected tasks {other:?}"),
        }
        app.save_snapshot()?;
        match app.scheduler.take_due(app.now()?).as_slice() {
            [(_, Task::SaveSnapshot(p))] => assert_eq!(p, &PathBuf::from("other.png")),
            other => panic!("unexpected tasks {other:?}"),
        }
        app.save_snapshot()?;
        assert!(app.scheduler.is_empty());
        Ok(())
    }

    #[test]
    fn scaling() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 4));
        let s = scale_image(&img, 2.5, false);
        assert_eq!((s.width(), s.height()), (25, 10));
        let s = scale_image(&img, 0.01, true);
        assert_eq!((s.width(), s.height()), (1, 1));
    }
}

//! Building and running applications.
use std::fmt;

use tracing::warn;

use crate::{
    app::App,
    canvas::Canvas,
    config::Config,
    error::{Error, Result},
    event::{KeyEvent, MouseEvent},
    fingerprint::Fingerprint,
    runloop::Runtime,
    safe::Reporter,
    window::Window,
};

/// A lifecycle, timer or resize callback.
pub type Callback<M> = Box<dyn FnMut(&mut App<M>) -> Result<()>>;
/// A key callback.
pub type KeyCallback<M> = Box<dyn FnMut(&mut App<M>, &KeyEvent) -> Result<()>>;
/// A mouse callback.
pub type MouseCallback<M> = Box<dyn FnMut(&mut App<M>, MouseEvent) -> Result<()>>;
/// The redraw callback. It sees the application read-only.
pub type RedrawCallback<M> = Box<dyn Fn(&App<M>, &mut Canvas<'_>) -> Result<()>>;

/// User callbacks. Absent callbacks are never invoked.
pub(crate) struct Handlers<M> {
    /// After startup, before the first redraw.
    pub(crate) app_started: Option<Callback<M>>,
    /// During shutdown.
    pub(crate) app_stopped: Option<Callback<M>>,
    /// Draw the view.
    pub(crate) redraw: Option<RedrawCallback<M>>,
    /// Key pressed.
    pub(crate) key_pressed: Option<KeyCallback<M>>,
    /// Key released.
    pub(crate) key_released: Option<KeyCallback<M>>,
    /// Mouse button pressed inside the window.
    pub(crate) mouse_pressed: Option<MouseCallback<M>>,
    /// Mouse button released.
    pub(crate) mouse_released: Option<MouseCallback<M>>,
    /// Pointer moved with no button held.
    pub(crate) mouse_moved: Option<MouseCallback<M>>,
    /// Pointer moved with a button held.
    pub(crate) mouse_dragged: Option<MouseCallback<M>>,
    /// Timer tick.
    pub(crate) timer_fired: Option<Callback<M>>,
    /// Window geometry changed.
    pub(crate) size_changed: Option<Callback<M>>,
}

impl<M> Default for Handlers<M> {
    fn default() -> Self {
        Self {
            app_started: None,
            app_stopped: None,
            redraw: None,
            key_pressed: None,
            key_released: None,
            mouse_pressed: None,
            mouse_released: None,
            mouse_moved: None,
            mouse_dragged: None,
            timer_fired: None,
            size_changed: None,
        }
    }
}

/// Configures an application and runs it in a [`Window`].
///
/// ```
/// use easel::prelude::*;
///
/// #[derive(Fingerprint, Default)]
/// struct Counter {
///     clicks: u32,
/// }
///
/// let (probe, window) = Window::headless();
/// probe.click(10, 10).click(20, 20);
///
/// let app = Runner::new(Counter::default())
///     .title("Counter")
///     .on_mouse_pressed(|app, _| {
///         app.model.clicks += 1;
///         Ok(())
///     })
///     .on_redraw(|app, canvas| {
///         let label = format!("{} clicks", app.model.clicks);
///         canvas.create_text(150, 150, Options::new().text(label))?;
///         Ok(())
///     })
///     .run(&window)?;
/// assert_eq!(app.model.clicks, 2);
/// # Ok::<(), easel::Error>(())
/// ```
pub struct Runner<M> {
    /// The initial model.
    model: M,
    /// Configuration, locked when the run starts.
    config: Config,
    /// Callbacks.
    handlers: Handlers<M>,
    /// Where failures are reported.
    reporter: Reporter,
    /// The first configuration write that was refused.
    refused: Option<Error>,
}

impl<M> fmt::Debug for Runner<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M: Fingerprint> Runner<M> {
    /// A runner configured from the process environment.
    pub fn new(model: M) -> Self {
        Self::with_config(model, Config::from_env())
    }

    /// A runner with an explicit configuration.
    pub fn with_config(model: M, config: Config) -> Self {
        Self {
            model,
            config,
            handlers: Handlers::default(),
            reporter: Reporter::default(),
            refused: None,
        }
    }

    /// Apply a configuration change. A refused change is kept and returned
    /// by [`Runner::run`].
    fn apply(mut self, f: impl FnOnce(&mut Config) -> Result<()>) -> Self {
        if let Err(e) = f(&mut self.config) {
            warn!("{e}");
            self.refused.get_or_insert(e);
        }
        self
    }

    /// The configuration the run will start from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Initial window size.
    pub fn size(self, width: u32, height: u32) -> Self {
        self.apply(|c| c.set_size(width, height))
    }

    /// Initial window position.
    pub fn position(self, x: i32, y: i32) -> Self {
        self.apply(|c| c.set_position(x, y))
    }

    /// Window title.
    pub fn title(self, title: &str) -> Self {
        self.apply(|c| c.set_title(title))
    }

    /// Timer period in milliseconds.
    pub fn timer_delay(self, ms: u64) -> Self {
        self.apply(|c| c.set_timer_delay(ms))
    }

    /// Pointer poll period in milliseconds.
    pub fn mouse_moved_delay(self, ms: u64) -> Self {
        self.apply(|c| c.set_mouse_moved_delay(ms))
    }

    /// Enable or disable the check that redraw leaves the model unchanged.
    pub fn mvc_check(self, on: bool) -> Self {
        self.apply(|c| c.set_mvc_check(on))
    }

    /// Enable or disable logging of drawing calls.
    pub fn log_drawing_calls(self, on: bool) -> Self {
        self.apply(|c| c.set_log_drawing_calls(on))
    }

    /// Report failures somewhere other than standard error.
    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Called once the window is up, before the first redraw.
    pub fn on_app_started(mut self, f: impl FnMut(&mut App<M>) -> Result<()> + 'static) -> Self {
        self.handlers.app_started = Some(Box::new(f));
        self
    }

    /// Called on shutdown.
    pub fn on_app_stopped(mut self, f: impl FnMut(&mut App<M>) -> Result<()> + 'static) -> Self {
        self.handlers.app_stopped = Some(Box::new(f));
        self
    }

    /// Draw the view. Runs after every event that may have changed the
    /// model.
    pub fn on_redraw(
        mut self,
        f: impl Fn(&App<M>, &mut Canvas<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.redraw = Some(Box::new(f));
        self
    }

    /// Key presses, with reserved chords filtered out.
    pub fn on_key_pressed(
        mut self,
        f: impl FnMut(&mut App<M>, &KeyEvent) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.key_pressed = Some(Box::new(f));
        self
    }

    /// Key releases.
    pub fn on_key_released(
        mut self,
        f: impl FnMut(&mut App<M>, &KeyEvent) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.key_released = Some(Box::new(f));
        self
    }

    /// Mouse presses inside the window.
    pub fn on_mouse_pressed(
        mut self,
        f: impl FnMut(&mut App<M>, MouseEvent) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.mouse_pressed = Some(Box::new(f));
        self
    }

    /// Mouse releases that follow a press inside the window.
    pub fn on_mouse_released(
        mut self,
        f: impl FnMut(&mut App<M>, MouseEvent) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.mouse_released = Some(Box::new(f));
        self
    }

    /// Pointer motion with no button held.
    pub fn on_mouse_moved(
        mut self,
        f: impl FnMut(&mut App<M>, MouseEvent) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.mouse_moved = Some(Box::new(f));
        self
    }

    /// Pointer motion with a button held.
    pub fn on_mouse_dragged(
        mut self,
        f: impl FnMut(&mut App<M>, MouseEvent) -> Result<()> + 'static,
    ) -> Self {
        self.handlers.mouse_dragged = Some(Box::new(f));
        self
    }

    /// Timer ticks, every [`App::timer_delay`].
    pub fn on_timer_fired(mut self, f: impl FnMut(&mut App<M>) -> Result<()> + 'static) -> Self {
        self.handlers.timer_fired = Some(Box::new(f));
        self
    }

    /// Window size or position changes.
    pub fn on_size_changed(mut self, f: impl FnMut(&mut App<M>) -> Result<()> + 'static) -> Self {
        self.handlers.size_changed = Some(Box::new(f));
        self
    }

    /// Run the application until it quits or its window is closed, and
    /// return it. A failure inside a callback stops the application but
    /// not the run; it is available from [`App::failure`]. Errors returned
    /// here come from the host itself, or from a configuration setter that
    /// was refused, in which case the application never starts.
    pub fn run(self, window: &Window) -> Result<App<M>> {
        let Self {
            model,
            mut config,
            handlers,
            reporter,
            refused,
        } = self;
        if let Some(e) = refused {
            return Err(e);
        }
        config.lock();
        let app = App::new(model, config, window.host.clone(), window.in_redraw.clone());
        Runtime::new(app, handlers, window, reporter).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locked() -> Config {
        let mut config = Config::from_vars(Vec::<(String, String)>::new());
        config.lock();
        config
    }

    #[test]
    fn refused_setting_stops_run() {
        let (probe, window) = Window::headless();
        let r = Runner::with_config(0u32, locked()).title("Late").size(10, 10);
        assert!(matches!(r.run(&window), Err(Error::Config(_))));
        assert!(probe.titles().is_empty());
        assert!(!probe.has_surface());
    }

    #[test]
    fn accepted_settings_run() -> Result<()> {
        let (probe, window) = Window::headless();
        let config = Config::from_vars(Vec::<(String, String)>::new());
        let app = Runner::with_config(0u32, config)
            .title("Fine")
            .size(120, 80)
            .run(&window)?;
        assert_eq!((app.width(), app.height()), (120, 80));
        assert_eq!(probe.titles(), ["Fine (120 x 80)"]);
        Ok(())
    }
}

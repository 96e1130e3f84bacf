//! The dispatcher: drives one application through its lifecycle.
use std::{cell::RefMut, time::Duration};

use scopeguard::guard;
use tracing::{debug, error, info, warn};

use crate::{
    app::{App, MOTION_ID, REDRAW_ID, RunState, TIMER_ID, Task},
    canvas::{Canvas, Options, SurfaceGuard},
    error::{Error, Result},
    event::{Event, KeyEvent, MouseEvent, RawKey},
    fingerprint::{Fingerprint, fingerprint},
    geom::Geometry,
    runner::Handlers,
    safe::{Failure, Reporter, run_guarded},
    window::Window,
};

/// Delay before a redraw requested by a resize.
const DEFERRED_REDRAW_DELAY: Duration = Duration::from_millis(100);

/// Raised when a redraw changes the model.
const MODEL_CHANGED: &str = "you may not change the app state (the model) in redraw_all (the view)";

/// Reserved chord: save a snapshot.
const SAVE_SNAPSHOT: &str = "control-s";
/// Reserved chord: toggle pause.
const TOGGLE_PAUSE: &str = "control-p";
/// Reserved chord: quit.
const QUIT: &str = "control-q";
/// Reserved chord: exit the process at once.
const HARD_EXIT: &str = "control-x";

/// Font for the failure banner.
const BANNER_FONT: &str = "Arial 12 bold";

/// One application run in a window.
pub struct Runtime<'w, M> {
    /// The application.
    app: App<M>,
    /// User callbacks.
    handlers: Handlers<M>,
    /// The window we run in.
    window: &'w Window,
    /// Failure output.
    reporter: Reporter,
}

/// Borrow the surface guard.
fn borrow_guard(window: &Window) -> Result<RefMut<'_, SurfaceGuard>> {
    window
        .guard
        .try_borrow_mut()
        .map_err(|_| Error::Internal("surface guard is already in use".into()))
}

impl<'w, M: Fingerprint> Runtime<'w, M> {
    /// Bind an application to a window.
    pub fn new(app: App<M>, handlers: Handlers<M>, window: &'w Window, reporter: Reporter) -> Self {
        Self {
            app,
            handlers,
            window,
            reporter,
        }
    }

    /// Start up, service events until quit, shut down.
    pub fn run(mut self) -> Result<App<M>> {
        self.start()?;
        while !self.app.quit_requested {
            self.run_due()?;
            if self.app.quit_requested {
                break;
            }
            let deadline = self.app.scheduler.next_deadline();
            let event = self.app.host()?.next_event(deadline)?;
            if let Some(event) = event {
                self.dispatch(event);
            }
        }
        self.shutdown()?;
        Ok(self.app)
    }

    /// Bring the window up and deliver the startup callbacks.
    fn start(&mut self) -> Result<()> {
        self.app.host()?.set_geometry(self.app.geometry)?;
        self.app.update_title()?;
        self.window
            .attach_surface(self.app.config.log_drawing_calls())?;
        self.app.state = RunState::Running;
        info!(title = %self.app.title, geometry = %self.app.geometry, "app started");

        let started = self.safely(false, |rt| match rt.handlers.app_started.as_mut() {
            Some(f) => f(&mut rt.app),
            None => Ok(()),
        });
        if started {
            self.redraw();
        }
        self.timer_tick();
        self.motion_poll();
        self.app.host()?.show()
    }

    /// Leave the window hidden but intact for the next application.
    fn shutdown(&mut self) -> Result<()> {
        self.app.host()?.hide()?;
        self.app.state = RunState::Stopped;
        self.app.timer_token.cancel();
        self.app.motion_token.cancel();
        self.app.scheduler.cancel_all();
        self.safely(false, |rt| match rt.handlers.app_stopped.as_mut() {
            Some(f) => f(&mut rt.app),
            None => Ok(()),
        });
        info!(title = %self.app.title, "app stopped");
        println!("*** Closing {}.  Bye! ***", self.app.title);
        Ok(())
    }

    /// Run a step of dispatch, containing any failure. Returns false if the
    /// step failed, in which case the application has been stopped.
    fn safely(&mut self, in_redraw: bool, f: impl FnOnce(&mut Self) -> Result<()>) -> bool {
        match run_guarded(|| f(self)) {
            Ok(()) => true,
            Err(failure) => {
                self.fail(failure, in_redraw);
                false
            }
        }
    }

    /// Stop the application, report the failure and flag it on screen.
    fn fail(&mut self, mut failure: Failure, in_redraw: bool) {
        self.app.state = RunState::Stopped;
        error!(error = %failure.error, "app stopped by failure");
        if let Err(e) = self.reporter.report(&mut failure, in_redraw) {
            warn!("could not print failure report: {e}");
        }
        if let Err(e) = self.banner(&failure.error) {
            warn!("could not show failure banner: {e}");
        }
        self.app.failure = Some(failure.error);
    }

    /// Draw the failure banner and notify the user.
    fn banner(&mut self, error: &Error) -> Result<()> {
        let mut host = self.app.host()?;
        if self.window.has_surface.get() {
            let mut surface = borrow_guard(self.window)?;
            let flag = self.window.in_redraw.clone();
            flag.set(true);
            let _reset = guard(flag, |f| f.set(false));
            let (w, h) = (f64::from(self.app.width()), f64::from(self.app.height()));
            let mut canvas = Canvas::new(&mut surface, &mut **host);
            canvas.create_rectangle(0, 0, w, h, Options::new().width(10).outline("red"))?;
            canvas.create_rectangle(
                10,
                h - 50.0,
                w - 10.0,
                h - 10.0,
                Options::new().fill("white").outline("red").width(4),
            )?;
            for (y, text) in [
                (h - 40.0, "Exception! App Stopped!"),
                (h - 20.0, "See console for details"),
            ] {
                canvas.create_text(
                    w / 2.0,
                    y,
                    Options::new().text(text).fill("red").font(BANNER_FONT),
                )?;
            }
            host.update()?;
        }
        host.show_message(
            "show_message",
            &format!("Exception: {error}\nClick ok then see console for details."),
        )
    }

    /// Fire deferred work that has come due.
    fn run_due(&mut self) -> Result<()> {
        let now = self.app.now()?;
        for (id, task) in self.app.scheduler.take_due(now) {
            if self.app.quit_requested {
                break;
            }
            debug!(%id, "deferred call");
            match task {
                Task::Redraw => self.redraw(),
                Task::Timer(token) if !token.is_cancelled() => self.timer_tick(),
                Task::MotionPoll(token) if !token.is_cancelled() => self.motion_poll(),
                Task::Timer(_) | Task::MotionPoll(_) => {}
                Task::SaveSnapshot(path) => {
                    self.safely(false, |rt| {
                        rt.app.get_snapshot()?.save(&path)?;
                        info!(path = %path.display(), "snapshot saved");
                        Ok(())
                    });
                }
            }
        }
        Ok(())
    }

    /// Route a host event.
    fn dispatch(&mut self, event: Event) {
        match event {
            Event::KeyPress(raw) => self.key_pressed(&raw),
            Event::KeyRelease(raw) => self.key_released(&raw),
            Event::MousePress(m) => self.mouse_pressed(m),
            Event::MouseRelease(m) => self.mouse_released(m),
            Event::Configure { width, height } => {
                self.safely(false, |rt| rt.resized(Some((width, height))));
            }
            Event::CloseRequested => {
                debug!("window closed");
                self.app.quit();
            }
        }
    }

    /// Redraw now, unless a deferred redraw is already on its way.
    fn redraw(&mut self) {
        if !self.app.state.is_running() {
            return;
        }
        if self.app.scheduler.is_pending(REDRAW_ID) {
            debug!("redraw coalesced with pending deferred redraw");
            return;
        }
        self.safely(true, Self::render);
    }

    /// Clear the surface and run the redraw callback under the surface
    /// guard, checking that the model is left unchanged.
    fn render(&mut self) -> Result<()> {
        let mut surface = borrow_guard(self.window)?;
        let mut host = self.app.host()?;
        let flag = self.window.in_redraw.clone();
        flag.set(true);
        let reset = guard(flag, |f| f.set(false));

        host.clear()?;
        let (width, outline) = if self.app.is_paused() {
            (10, "red")
        } else {
            (0, "white")
        };
        Canvas::new(&mut surface, &mut **host).create_rectangle(
            0,
            0,
            self.app.width(),
            self.app.height(),
            Options::new().width(width).outline(outline),
        )?;
        surface.clear_log();

        let before = if self.app.mvc_check {
            Some(fingerprint(&self.app.model)?)
        } else {
            None
        };
        if let Some(f) = &self.handlers.redraw {
            f(&self.app, &mut Canvas::new(&mut surface, &mut **host))?;
        }
        let changed = match before {
            Some(before) => fingerprint(&self.app.model)? != before,
            None => false,
        };
        drop(reset);
        if changed {
            drop(host);
            self.app.state = RunState::Stopped;
            return Err(Error::mvc(MODEL_CHANGED));
        }
        host.update()
    }

    /// Key press: reserved chords first, then the user callback.
    fn key_pressed(&mut self, raw: &RawKey) {
        let event = KeyEvent::from_raw(raw);
        self.safely(false, |rt| match event.key.as_str() {
            SAVE_SNAPSHOT => {
                debug!("reserved chord: save snapshot");
                rt.app.save_snapshot()
            }
            TOGGLE_PAUSE => {
                rt.app.toggle_paused();
                rt.redraw();
                Ok(())
            }
            QUIT => {
                debug!("reserved chord: quit");
                rt.app.quit();
                Ok(())
            }
            HARD_EXIT => rt.app.host()?.exit(0),
            _ => {
                if rt.app.state == RunState::Running
                    && !event.is_modifier()
                    && let Some(f) = rt.handlers.key_pressed.as_mut()
                {
                    f(&mut rt.app, &event)?;
                    rt.redraw();
                }
                Ok(())
            }
        });
    }

    /// Key release.
    fn key_released(&mut self, raw: &RawKey) {
        let event = KeyEvent::from_raw(raw);
        if self.app.state != RunState::Running || event.is_modifier() {
            return;
        }
        self.safely(false, |rt| {
            if let Some(f) = rt.handlers.key_released.as_mut() {
                f(&mut rt.app, &event)?;
                rt.redraw();
            }
            Ok(())
        });
    }

    /// Mouse press. Presses outside the window are remembered but not
    /// delivered.
    fn mouse_pressed(&mut self, event: MouseEvent) {
        if self.app.state != RunState::Running {
            return;
        }
        if !event
            .location()
            .within(self.app.width(), self.app.height())
        {
            self.app.pressed_outside = true;
            return;
        }
        self.app.pressed_outside = false;
        self.app.mouse_pressed = true;
        self.app.last_mouse = event.location();
        self.safely(false, |rt| {
            if let Some(f) = rt.handlers.mouse_pressed.as_mut() {
                f(&mut rt.app, event)?;
                rt.redraw();
            }
            Ok(())
        });
    }

    /// Mouse release. Releasing a press that began outside the window
    /// re-checks the window size instead of notifying the application.
    fn mouse_released(&mut self, event: MouseEvent) {
        if self.app.state != RunState::Running {
            return;
        }
        self.app.mouse_pressed = false;
        if self.app.pressed_outside {
            self.app.pressed_outside = false;
            self.safely(false, |rt| rt.resized(None));
            return;
        }
        self.app.last_mouse = event.location();
        self.safely(false, |rt| {
            if let Some(f) = rt.handlers.mouse_released.as_mut() {
                f(&mut rt.app, event)?;
                rt.redraw();
            }
            Ok(())
        });
    }

    /// Window geometry notification. `reported` is the size carried by the
    /// host event, if any.
    fn resized(&mut self, reported: Option<(u32, u32)>) -> Result<()> {
        if !self.app.state.is_running() {
            return Ok(());
        }
        let geometry = self.app.host()?.geometry()?;
        let degenerate = match reported {
            Some((width, height)) => Geometry::new(width, height, 0, 0).is_degenerate(),
            None => geometry.is_degenerate(),
        };
        if degenerate {
            debug!(%geometry, "ignoring degenerate resize");
            return Ok(());
        }
        if self.app.pressed_outside {
            debug!("ignoring resize while a press from outside is in flight");
            return Ok(());
        }
        self.app.geometry = geometry;
        match self.app.last_dims {
            None => self.app.last_dims = Some(geometry),
            Some(last) if last != geometry => {
                self.app.last_dims = Some(geometry);
                self.app.update_title()?;
                if let Some(f) = self.handlers.size_changed.as_mut() {
                    f(&mut self.app)?;
                }
                self.app
                    .defer(REDRAW_ID, DEFERRED_REDRAW_DELAY, Task::Redraw, true)?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// One timer tick. The next tick is scheduled after the callback
    /// returns, so the period excludes the callback's own run time.
    fn timer_tick(&mut self) {
        self.safely(false, |rt| {
            if !rt.app.state.is_running() {
                return Ok(());
            }
            let Some(f) = rt.handlers.timer_fired.as_mut() else {
                return Ok(());
            };
            if !rt.app.is_paused() {
                f(&mut rt.app)?;
                rt.redraw();
            }
            if rt.app.state.is_running() {
                let token = rt.app.timer_token.clone();
                let delay = rt.app.timer_delay;
                rt.app.defer(TIMER_ID, delay, Task::Timer(token), false)?;
            }
            Ok(())
        });
    }

    /// One pointer sample. Motion is delivered only when the pointer moved
    /// to a new position inside the window.
    fn motion_poll(&mut self) {
        self.safely(false, |rt| {
            if !rt.app.state.is_running() {
                return Ok(());
            }
            let polling =
                rt.handlers.mouse_moved.is_some() || rt.handlers.mouse_dragged.is_some();
            let dragging = rt.app.mouse_pressed;
            let handler = if dragging {
                rt.handlers.mouse_dragged.as_mut()
            } else {
                rt.handlers.mouse_moved.as_mut()
            };
            if !rt.app.is_paused()
                && !rt.app.pressed_outside
                && let Some(f) = handler
            {
                let pointer = rt.app.host()?.pointer()?;
                if pointer != rt.app.last_mouse
                    && pointer.within(rt.app.width(), rt.app.height())
                {
                    f(&mut rt.app, MouseEvent::from(pointer))?;
                    rt.app.last_mouse = pointer;
                    rt.redraw();
                }
            }
            if polling && rt.app.state.is_running() {
                let token = rt.app.motion_token.clone();
                let delay = rt.app.mouse_moved_delay;
                rt.app.defer(MOTION_ID, delay, Task::MotionPoll(token), false)?;
            }
            Ok(())
        });
    }
}

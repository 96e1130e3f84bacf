//! The application window: a host plus its guarded drawing surface.
use std::{
    cell::{Cell, RefCell, RefMut},
    fmt,
    rc::Rc,
};

use crate::{
    backend::{
        Host,
        headless::{HeadlessHost, Probe},
    },
    canvas::{DrawCall, SurfaceGuard},
    error::{Error, Result},
};

/// Shared handle to the host.
pub(crate) type HostCell = Rc<RefCell<Box<dyn Host>>>;

/// Borrow the host, failing if it is already in use.
pub(crate) fn borrow_host(host: &HostCell) -> Result<RefMut<'_, Box<dyn Host>>> {
    host.try_borrow_mut()
        .map_err(|_| Error::Internal("host is already in use".into()))
}

/// The single top-level window applications run in.
///
/// A window outlives the applications run in it. Running a second
/// application in the same window first tears down the previous
/// application's drawing surface, then reuses the window. Stopped
/// applications leave the window hidden, not destroyed.
pub struct Window {
    /// The host toolkit.
    pub(crate) host: HostCell,
    /// Inside-redraw flag, shared with the guard and with running apps.
    pub(crate) in_redraw: Rc<Cell<bool>>,
    /// Guard state for the current surface.
    pub(crate) guard: RefCell<SurfaceGuard>,
    /// Does a surface from a previous run exist?
    pub(crate) has_surface: Cell<bool>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("has_surface", &self.has_surface.get())
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Wrap a host.
    pub fn new(host: impl Host + 'static) -> Self {
        let in_redraw = Rc::new(Cell::new(false));
        Self {
            host: Rc::new(RefCell::new(Box::new(host))),
            guard: RefCell::new(SurfaceGuard::new(in_redraw.clone(), true)),
            in_redraw,
            has_surface: Cell::new(false),
        }
    }

    /// A window on a fresh headless host, with the probe that scripts and
    /// inspects it.
    pub fn headless() -> (Probe, Self) {
        let (probe, host) = HeadlessHost::create();
        (probe, Self::new(host))
    }

    /// Drawing calls logged during the most recent redraw.
    pub fn drawing_calls(&self) -> Vec<DrawCall> {
        self.guard.borrow().calls().to_vec()
    }

    /// Tear down any previous surface and create a fresh one.
    pub(crate) fn attach_surface(&self, log_calls: bool) -> Result<()> {
        let mut host = borrow_host(&self.host)?;
        if self.has_surface.get() {
            host.destroy_surface()?;
        }
        host.create_surface()?;
        self.has_surface.set(true);
        self.in_redraw.set(false);
        *self.guard.borrow_mut() = SurfaceGuard::new(self.in_redraw.clone(), log_calls);
        Ok(())
    }
}

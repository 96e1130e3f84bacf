//! Guarded execution of application callbacks.
//!
//! [`run_guarded`] runs a callback, converting both returned errors and
//! panics into a [`Failure`] that carries a backtrace. The [`Reporter`]
//! prints failures as a traceback trimmed down to application frames.
use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    rc::Rc,
    result::Result as StdResult,
    sync::{
        Arc, Once,
        atomic::{AtomicUsize, Ordering},
    },
};

use backtrace::Backtrace;
use color_backtrace::{BacktracePrinter, Frame};
use scopeguard::guard;
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::error::{Error, Result};

thread_local! {
    /// Backtrace captured by the panic hook at the panic site.
    static PANIC_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
    /// Number of guarded calls active on this thread.
    static GUARDED: Cell<usize> = const { Cell::new(0) };
}

/// Installs the recording panic hook.
static HOOK: Once = Once::new();

/// Line printed in place of a traceback when a redraw fails with no
/// application frames on the stack.
pub const NO_TRACEBACK_IN_REDRAW: &str = "    No traceback available. Error occurred in redraw_all.";

/// Symbol prefixes of frames that never belong to application code.
const INTERNAL_PREFIXES: &[&str] = &[
    "easel::",
    "<easel::",
    "backtrace::",
    "<backtrace::",
    "color_backtrace::",
    "scopeguard::",
    "<scopeguard::",
    "alloc::",
    "<alloc::",
    "<core::",
    "<std::",
    "test::",
    "<test::",
    "rust_begin_unwind",
    "rust_panic",
    "clone",
    "__clone",
    "start_thread",
    "thread_start",
];

/// A contained callback failure.
pub struct Failure {
    /// What went wrong.
    pub error: Error,
    /// Where it went wrong. For panics this is captured at the panic site,
    /// for returned errors when the error reached the guard.
    pub trace: Backtrace,
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Extract a message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".into()
    }
}

/// Install the process-wide panic hook. Panics on a thread inside
/// [`run_guarded`] record their backtrace; all others go to the hook that
/// was installed before.
fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) > 0 {
                PANIC_TRACE.with(|t| *t.borrow_mut() = Some(Backtrace::new_unresolved()));
            } else {
                previous(info);
            }
        }));
    });
}

/// Run a callback, containing any error or panic it produces. Panics inside
/// the call are recorded with their backtrace instead of being printed.
pub fn run_guarded<T>(f: impl FnOnce() -> Result<T>) -> StdResult<T, Failure> {
    install_hook();
    GUARDED.with(|g| g.set(g.get() + 1));
    let active = guard((), |()| GUARDED.with(|g| g.set(g.get() - 1)));
    let res = panic::catch_unwind(AssertUnwindSafe(f));
    drop(active);

    match res {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(error)) => Err(Failure {
            error,
            trace: Backtrace::new_unresolved(),
        }),
        Err(payload) => {
            let trace = PANIC_TRACE
                .with(|t| t.borrow_mut().take())
                .unwrap_or_else(Backtrace::new_unresolved);
            Err(Failure {
                error: Error::Panic(panic_message(&*payload)),
                trace,
            })
        }
    }
}

/// Is this frame application code?
fn is_user_frame(frame: &Frame) -> bool {
    if frame.is_dependency_code() {
        return false;
    }
    match &frame.name {
        Some(name) => !INTERNAL_PREFIXES.iter().any(|p| name.starts_with(p)),
        None => false,
    }
}

/// Prints failure reports to a colour-capable sink.
pub struct Reporter {
    /// Output sink.
    sink: Box<dyn WriteColor>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

impl Reporter {
    /// Report to standard error.
    pub fn stderr() -> Self {
        Self::new(StandardStream::stderr(ColorChoice::Auto))
    }

    /// Report to an arbitrary sink.
    pub fn new(sink: impl WriteColor + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// A scratch buffer matching the sink's colour support.
    fn buffer(&self) -> Buffer {
        if self.sink.supports_color() {
            Buffer::ansi()
        } else {
            Buffer::no_color()
        }
    }

    /// Render the application frames of a trace. Returns the rendered text
    /// and the number of frames kept.
    fn render_filtered(&self, trace: &Backtrace) -> io::Result<(Buffer, usize)> {
        let kept = Arc::new(AtomicUsize::new(0));
        let counter = kept.clone();
        let printer = BacktracePrinter::new().add_frame_filter(Box::new(move |frames| {
            frames.retain(|f| is_user_frame(f));
            counter.store(frames.len(), Ordering::SeqCst);
        }));
        let mut buf = self.buffer();
        printer.print_trace(trace, &mut buf)?;
        Ok((buf, kept.load(Ordering::SeqCst)))
    }

    /// Print a failure. When no application frames remain after filtering,
    /// a failure inside a redraw prints a fixed notice and any other
    /// failure prints the whole trace.
    pub fn report(&mut self, failure: &mut Failure, in_redraw: bool) -> Result<()> {
        failure.trace.resolve();
        let (filtered, kept) = self.render_filtered(&failure.trace)?;

        writeln!(self.sink, "Traceback (most recent call first):")?;
        if kept > 0 {
            self.sink.write_all(filtered.as_slice())?;
        } else if in_redraw {
            writeln!(self.sink, "{NO_TRACEBACK_IN_REDRAW}")?;
        } else {
            let mut buf = self.buffer();
            BacktracePrinter::new()
                .clear_frame_filters()
                .print_trace(&failure.trace, &mut buf)?;
            self.sink.write_all(buf.as_slice())?;
        }
        self.sink
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(self.sink, "Exception: {}", failure.error)?;
        self.sink.reset()?;
        writeln!(self.sink)?;
        self.sink.flush()?;
        Ok(())
    }
}

/// An in-memory report sink whose contents can be read back. Clones share
/// the buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink(Rc<RefCell<Vec<u8>>>);

impl CaptureSink {
    /// Construct an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteColor for CaptureSink {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}

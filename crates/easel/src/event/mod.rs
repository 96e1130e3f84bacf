/// Keyboard input and key name normalisation.
pub mod key;
/// Mouse input.
pub mod mouse;

pub use key::{KeyEvent, Mods, RawKey};
pub use mouse::MouseEvent;

/// This enum represents the raw events a host delivers to the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key was pressed.
    KeyPress(RawKey),
    /// A key was released.
    KeyRelease(RawKey),
    /// The primary mouse button was pressed.
    MousePress(MouseEvent),
    /// The primary mouse button was released.
    MouseRelease(MouseEvent),
    /// The window was reconfigured. Carries the size the window manager
    /// reported; the authoritative geometry is read back from the host.
    Configure {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },
    /// The user asked the window to close.
    CloseRequested,
}

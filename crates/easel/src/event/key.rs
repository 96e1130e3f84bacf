//! This module contains the primitives to represent keyboard input, and the
//! normalisation that turns raw platform key events into canonical key names.
use std::fmt;

/// Shift bit in a raw modifier state mask.
pub const STATE_SHIFT: u32 = 0x1;
/// Caps-lock bit in a raw modifier state mask.
pub const STATE_LOCK: u32 = 0x2;
/// Control bit in a raw modifier state mask.
pub const STATE_CONTROL: u32 = 0x4;
/// Alt (Mod1) bit in a raw modifier state mask.
pub const STATE_ALT: u32 = 0x8;
/// Option bit reported for Alt on some platforms.
pub const STATE_OPTION: u32 = 0x80;

/// Canonical name delivered for a bare modifier press. Never forwarded to
/// application callbacks.
pub const MODIFIER_KEY: &str = "Modifier_Key";

/// Prefix added to single-character keys typed with control held.
pub const CONTROL_PREFIX: &str = "control-";

/// Control characters with a symbolic name.
const NAMED: &[(char, &str)] = &[
    ('\t', "Tab"),
    ('\n', "Enter"),
    ('\r', "Enter"),
    ('\u{8}', "Backspace"),
    ('\u{7f}', "Delete"),
    ('\u{1b}', "Escape"),
    (' ', "Space"),
];

/// Modifier key state.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Mods {
    /// Shift is active.
    pub shift: bool,
    /// Control is active.
    pub ctrl: bool,
    /// Alt is active.
    pub alt: bool,
}

impl Mods {
    /// Decode a raw modifier state mask.
    pub fn from_state(state: u32) -> Self {
        Self {
            shift: state & STATE_SHIFT != 0,
            ctrl: state & STATE_CONTROL != 0,
            alt: state & (STATE_ALT | STATE_OPTION) != 0,
        }
    }
}

/// A key event as delivered by the host: the platform key symbol, the
/// character it produced (possibly empty), and the modifier state mask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawKey {
    /// Platform key symbol, e.g. "a", "Return", "Shift_L".
    pub keysym: String,
    /// Character produced by the key press. Empty for non-printing keys.
    pub ch: String,
    /// Modifier state mask.
    pub state: u32,
}

impl RawKey {
    /// Construct a raw key event.
    pub fn new(keysym: impl Into<String>, ch: impl Into<String>, state: u32) -> Self {
        Self {
            keysym: keysym.into(),
            ch: ch.into(),
            state,
        }
    }

    /// A printable character typed without modifiers.
    pub fn char(c: char) -> Self {
        Self::new(c.to_string(), c.to_string(), 0)
    }
}

/// A normalised key event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Canonical key name: "Enter", "Escape", "a", "control-s", "Up", ...
    pub key: String,
    /// Modifier state at the time of the event.
    pub mods: Mods,
}

impl KeyEvent {
    /// Normalise a raw key event.
    pub fn from_raw(raw: &RawKey) -> Self {
        let (key, _) = normalize_key(&raw.keysym, &raw.ch, raw.state);
        Self {
            key,
            mods: Mods::from_state(raw.state),
        }
    }

    /// Is this a bare modifier press?
    pub fn is_modifier(&self) -> bool {
        self.key == MODIFIER_KEY
    }
}

impl PartialEq<&str> for KeyEvent {
    fn eq(&self, other: &&str) -> bool {
        self.key == *other
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event(key={:?})", self.key)
    }
}

/// Does the key symbol name a bare modifier key: left or right variants of
/// Shift, Control, Alt, Super, or one of the lock keys?
fn is_modifier_keysym(keysym: &str) -> bool {
    keysym.ends_with("_L") || keysym.ends_with("_R") || keysym.ends_with("_Lock")
}

/// Produce the canonical key name for a raw key event, and whether control
/// was held. The character takes precedence over the key symbol, except when
/// it is empty, longer than one character, or outside the single-byte range.
/// Control characters 1-26 are letters typed with control held, and always
/// report control. Only single-character names receive the `control-`
/// prefix, so control + Enter is still "Enter".
pub fn normalize_key(keysym: &str, ch: &str, state: u32) -> (String, bool) {
    let mut ctrl = state & STATE_CONTROL != 0;
    let mut chars = ch.chars();
    let single = match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) <= 255 => Some(c),
        _ => None,
    };

    let key = match single {
        None => {
            if is_modifier_keysym(keysym) {
                MODIFIER_KEY.to_string()
            } else {
                keysym.to_string()
            }
        }
        Some(c) => {
            if let Some((_, name)) = NAMED.iter().find(|(k, _)| *k == c) {
                name.to_string()
            } else if (1..=26).contains(&(c as u32)) {
                ctrl = true;
                char::from(b'a' - 1 + c as u8).to_string()
            } else {
                c.to_string()
            }
        }
    };

    if ctrl && key.chars().count() == 1 {
        (format!("{CONTROL_PREFIX}{key}"), ctrl)
    } else {
        (key, ctrl)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn key(keysym: &str, ch: &str, state: u32) -> String {
        normalize_key(keysym, ch, state).0
    }

    #[test]
    fn named() {
        assert_eq!(key("Return", "\r", 0), "Enter");
        assert_eq!(key("KP_Enter", "\n", 0), "Enter");
        assert_eq!(key("Tab", "\t", 0), "Tab");
        assert_eq!(key("BackSpace", "\u{8}", 0), "Backspace");
        assert_eq!(key("Delete", "\u{7f}", 0), "Delete");
        assert_eq!(key("Escape", "\u{1b}", 0), "Escape");
        assert_eq!(key("space", " ", 0), "Space");
        // Named keys never take the control prefix.
        assert_eq!(key("Return", "\r", STATE_CONTROL), "Enter");
    }

    #[test]
    fn control_chords() {
        assert_eq!(key("a", "a", STATE_CONTROL), "control-a");
        assert_eq!(key("s", "\u{13}", 0), "control-s");
        assert_eq!(key("z", "\u{1a}", STATE_CONTROL), "control-z");
        assert_eq!(normalize_key("a", "\u{1}", 0), ("control-a".into(), true));
    }

    #[test]
    fn fallback_to_keysym() {
        assert_eq!(key("Up", "", 0), "Up");
        assert_eq!(key("F1", "", STATE_CONTROL), "F1");
        assert_eq!(key("Shift_L", "", STATE_SHIFT), MODIFIER_KEY);
        assert_eq!(key("Control_R", "", STATE_CONTROL), MODIFIER_KEY);
        assert_eq!(key("Caps_Lock", "", 0), MODIFIER_KEY);
        assert_eq!(key("Super_L", "", 0), MODIFIER_KEY);
        // Multi-character and wide input fall back to the key symbol.
        assert_eq!(key("dead_acute", "ab", 0), "dead_acute");
        assert_eq!(key("x", "\u{263a}", 0), "x");
    }

    #[test]
    fn plain_chars() {
        assert_eq!(key("a", "a", 0), "a");
        assert_eq!(key("A", "A", STATE_SHIFT), "A");
        assert_eq!(key("eacute", "\u{e9}", 0), "\u{e9}");
    }

    #[test]
    fn event_mods() {
        let ev = KeyEvent::from_raw(&RawKey::new("a", "a", STATE_CONTROL | STATE_SHIFT));
        assert_eq!(ev, "control-a");
        assert!(ev.mods.ctrl);
        assert!(ev.mods.shift);
        assert!(!ev.mods.alt);
        assert!(KeyEvent::from_raw(&RawKey::new("x", "x", STATE_OPTION)).mods.alt);
        assert!(KeyEvent::from_raw(&RawKey::new("Alt_L", "", STATE_ALT)).is_modifier());
        assert_eq!(ev.to_string(), "Event(key=\"control-a\")");
    }

    proptest! {
        #[test]
        fn control_letters(code in 1u32..=26) {
            let c = char::from_u32(code).unwrap();
            let named = NAMED.iter().any(|(k, _)| *k == c);
            let (name, ctrl) = normalize_key("x", &c.to_string(), 0);
            if named {
                prop_assert!(name.chars().count() > 1);
            } else {
                prop_assert!(ctrl);
                let letter = char::from(b'a' + (code as u8) - 1);
                prop_assert_eq!(name, format!("control-{letter}"));
            }
        }

        #[test]
        fn prefix_only_single_chars(keysym in "[A-Za-z_]{1,12}", ch in any::<char>(), state in 0u32..256) {
            let (name, ctrl) = normalize_key(&keysym, &ch.to_string(), state);
            prop_assert!(!name.is_empty());
            if let Some(rest) = name.strip_prefix(CONTROL_PREFIX) {
                prop_assert!(ctrl);
                prop_assert_eq!(rest.chars().count(), 1);
            } else if ctrl {
                prop_assert!(name.chars().count() != 1);
            }
        }
    }
}

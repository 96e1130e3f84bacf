//! Window and run-loop configuration.
//!
//! Each property resolves from three layers: an explicit setting, an
//! environment variable, and a default. Explicit settings win unless
//! `EASEL_ENV_PRIORITY` is set, in which case environment values are fixed
//! and explicit settings for them are ignored. Values that fail to convert
//! are warned about and ignored. Once the run loop starts the configuration
//! is locked and further changes fail.
use std::{collections::HashMap, env, fmt, time::Duration};

use tracing::warn;

use crate::{
    error::{Error, Result},
    geom::Geometry,
};

/// Environment variable that gives environment values priority over
/// explicit settings.
pub const ENV_PRIORITY: &str = "EASEL_ENV_PRIORITY";

/// A configurable property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Window width in pixels.
    Width,
    /// Window height in pixels.
    Height,
    /// Window x position.
    X,
    /// Window y position.
    Y,
    /// Window title.
    Title,
    /// Timer period in milliseconds.
    TimerDelay,
    /// Mouse motion polling period in milliseconds.
    MouseMovedDelay,
    /// Detect model changes during redraw.
    MvcCheck,
    /// Record drawing calls during redraw.
    LogDrawingCalls,
}

impl Property {
    /// Every property.
    pub const ALL: [Self; 9] = [
        Self::Width,
        Self::Height,
        Self::X,
        Self::Y,
        Self::Title,
        Self::TimerDelay,
        Self::MouseMovedDelay,
        Self::MvcCheck,
        Self::LogDrawingCalls,
    ];

    /// The property's name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::X => "x",
            Self::Y => "y",
            Self::Title => "title",
            Self::TimerDelay => "timer_delay",
            Self::MouseMovedDelay => "mouse_moved_delay",
            Self::MvcCheck => "mvc_check",
            Self::LogDrawingCalls => "log_drawing_calls",
        }
    }

    /// The environment variable that sets this property.
    pub fn env_var(&self) -> String {
        format!("EASEL_{}", self.name().to_uppercase())
    }

    /// Look up a property by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The default value.
    pub fn default_value(&self) -> Setting {
        match self {
            Self::Width | Self::Height => Setting::Size(300),
            Self::X | Self::Y => Setting::Offset(0),
            Self::Title => Setting::Text("Easel".into()),
            Self::TimerDelay => Setting::Millis(100),
            Self::MouseMovedDelay => Setting::Millis(50),
            Self::MvcCheck | Self::LogDrawingCalls => Setting::Flag(true),
        }
    }

    /// Convert a string to this property's type.
    pub fn parse(&self, value: &str) -> Option<Setting> {
        let v = value.trim();
        Some(match self.default_value() {
            Setting::Size(_) => Setting::Size(v.parse().ok()?),
            Setting::Offset(_) => Setting::Offset(v.parse().ok()?),
            Setting::Millis(_) => Setting::Millis(v.parse().ok()?),
            Setting::Flag(_) => Setting::Flag(truthy(v)),
            Setting::Text(_) => Setting::Text(value.to_string()),
        })
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// A dimension in pixels.
    Size(u32),
    /// A screen offset.
    Offset(i32),
    /// A period in milliseconds.
    Millis(u64),
    /// A flag.
    Flag(bool),
    /// A string.
    Text(String),
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(v) => write!(f, "{v}"),
            Self::Offset(v) => write!(f, "{v}"),
            Self::Millis(v) => write!(f, "{v}ms"),
            Self::Flag(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// Boolean strings: `true`, `t` and `1`, in any case, are true.
fn truthy(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "true" | "t" | "1")
}

/// Layered configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Changes are refused once set.
    locked: bool,
    /// Environment values win over explicit ones.
    env_priority: bool,
    /// Values from the environment.
    env: HashMap<Property, Setting>,
    /// Explicitly set values.
    explicit: HashMap<Property, Setting>,
}

impl Config {
    /// Configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Configuration from an explicit set of environment variables.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        let mut c = Self {
            env_priority: vars.get(ENV_PRIORITY).is_some_and(|v| truthy(v)),
            ..Self::default()
        };
        for p in Property::ALL {
            let Some(raw) = vars.get(&p.env_var()) else {
                continue;
            };
            match p.parse(raw) {
                Some(v) => {
                    c.env.insert(p, v);
                }
                None => warn!(
                    "{} must be of the same type as property {p}, but conversion failed for {raw:?}; ignoring",
                    p.env_var()
                ),
            }
        }
        c
    }

    /// Lock the configuration.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Is the configuration locked?
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Fail if locked.
    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(Error::Config(
                "configuration is locked once the app is running; \
                 complete all configuration before calling run"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Store an explicit value, honouring environment priority.
    pub(crate) fn store(&mut self, p: Property, v: Setting) {
        if let Some(env) = self.env.get(&p) {
            if self.env_priority {
                warn!(
                    "{ENV_PRIORITY} is set and {p} was set to {env} by {}; ignoring {v}",
                    p.env_var()
                );
                return;
            }
            warn!(
                "{p} was set to {env} by {}, but is overridden by explicit setting {v}",
                p.env_var()
            );
        }
        self.explicit.insert(p, v);
    }

    /// Set a property by name from a string. Unknown names fail; values that
    /// fail to convert are warned about and ignored.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.check_unlocked()?;
        let p = Property::from_name(name)
            .ok_or_else(|| Error::Config(format!("property {name} is not supported")))?;
        match p.parse(value) {
            Some(v) => self.store(p, v),
            None => warn!("property {p} could not be set from {value:?}; ignoring"),
        }
        Ok(())
    }

    /// Set the window size.
    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::Width, Setting::Size(width));
        self.store(Property::Height, Setting::Size(height));
        Ok(())
    }

    /// Set the window position.
    pub fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::X, Setting::Offset(x));
        self.store(Property::Y, Setting::Offset(y));
        Ok(())
    }

    /// Set the window title.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::Title, Setting::Text(title.into()));
        Ok(())
    }

    /// Set the timer period.
    pub fn set_timer_delay(&mut self, ms: u64) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::TimerDelay, Setting::Millis(ms));
        Ok(())
    }

    /// Set the mouse motion polling period.
    pub fn set_mouse_moved_delay(&mut self, ms: u64) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::MouseMovedDelay, Setting::Millis(ms));
        Ok(())
    }

    /// Enable or disable model change detection during redraw.
    pub fn set_mvc_check(&mut self, on: bool) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::MvcCheck, Setting::Flag(on));
        Ok(())
    }

    /// Enable or disable the drawing log.
    pub fn set_log_drawing_calls(&mut self, on: bool) -> Result<()> {
        self.check_unlocked()?;
        self.store(Property::LogDrawingCalls, Setting::Flag(on));
        Ok(())
    }

    /// Resolve a property.
    pub fn get(&self, p: Property) -> Setting {
        let env = self.env.get(&p);
        let explicit = self.explicit.get(&p);
        let chosen = if self.env_priority {
            env.or(explicit)
        } else {
            explicit.or(env)
        };
        chosen.cloned().unwrap_or_else(|| p.default_value())
    }

    /// Resolve a dimension property.
    fn size(&self, p: Property) -> u32 {
        match self.get(p) {
            Setting::Size(v) => v,
            _ => 0,
        }
    }

    /// Resolve an offset property.
    fn offset(&self, p: Property) -> i32 {
        match self.get(p) {
            Setting::Offset(v) => v,
            _ => 0,
        }
    }

    /// Resolve a period property.
    fn millis(&self, p: Property) -> Duration {
        match self.get(p) {
            Setting::Millis(v) => Duration::from_millis(v),
            _ => Duration::ZERO,
        }
    }

    /// Resolve a flag property.
    fn flag(&self, p: Property) -> bool {
        matches!(self.get(p), Setting::Flag(true))
    }

    /// Window width.
    pub fn width(&self) -> u32 {
        self.size(Property::Width)
    }

    /// Window height.
    pub fn height(&self) -> u32 {
        self.size(Property::Height)
    }

    /// Window x position.
    pub fn x(&self) -> i32 {
        self.offset(Property::X)
    }

    /// Window y position.
    pub fn y(&self) -> i32 {
        self.offset(Property::Y)
    }

    /// Window geometry.
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.width(), self.height(), self.x(), self.y())
    }

    /// Window title.
    pub fn title(&self) -> String {
        match self.get(Property::Title) {
            Setting::Text(v) => v,
            other => other.to_string(),
        }
    }

    /// Timer period.
    pub fn timer_delay(&self) -> Duration {
        self.millis(Property::TimerDelay)
    }

    /// Mouse motion polling period.
    pub fn mouse_moved_delay(&self) -> Duration {
        self.millis(Property::MouseMovedDelay)
    }

    /// Detect model changes during redraw?
    pub fn mvc_check(&self) -> bool {
        self.flag(Property::MvcCheck)
    }

    /// Record drawing calls?
    pub fn log_drawing_calls(&self) -> bool {
        self.flag(Property::LogDrawingCalls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::from_vars(Vec::<(String, String)>::new());
        assert_eq!(c.geometry(), Geometry::new(300, 300, 0, 0));
        assert_eq!(c.title(), "Easel");
        assert_eq!(c.timer_delay(), Duration::from_millis(100));
        assert_eq!(c.mouse_moved_delay(), Duration::from_millis(50));
        assert!(c.mvc_check());
        assert!(c.log_drawing_calls());
    }

    #[test]
    fn layering() -> Result<()> {
        let mut c = Config::from_vars([
            ("EASEL_WIDTH", "640"),
            ("EASEL_TITLE", "From env"),
            ("EASEL_MVC_CHECK", "no"),
            ("EASEL_HEIGHT", "tall"),
        ]);
        assert_eq!(c.width(), 640);
        assert_eq!(c.title(), "From env");
        assert!(!c.mvc_check());
        // Unparseable environment values are ignored.
        assert_eq!(c.height(), 300);

        c.set_size(100, 200)?;
        c.set("mvc_check", "T")?;
        assert_eq!((c.width(), c.height()), (100, 200));
        assert!(c.mvc_check());
        Ok(())
    }

    #[test]
    fn env_priority() -> Result<()> {
        let mut c = Config::from_vars([("EASEL_WIDTH", "640"), ("EASEL_ENV_PRIORITY", "TRUE")]);
        c.set_size(100, 200)?;
        assert_eq!(c.width(), 640);
        assert_eq!(c.height(), 200);
        Ok(())
    }

    #[test]
    fn set_by_name() -> Result<()> {
        let mut c = Config::default();
        c.set("timer_delay", "250")?;
        c.set("x", "-20")?;
        c.set("width", "wide")?;
        assert_eq!(c.timer_delay(), Duration::from_millis(250));
        assert_eq!(c.x(), -20);
        assert_eq!(c.width(), 300);
        assert!(matches!(c.set("colour", "red"), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn locking() -> Result<()> {
        let mut c = Config::default();
        c.set_title("before")?;
        c.lock();
        assert!(c.is_locked());
        assert!(matches!(c.set_title("after"), Err(Error::Config(_))));
        assert!(matches!(c.set("width", "10"), Err(Error::Config(_))));
        assert_eq!(c.title(), "before");
        Ok(())
    }

    #[test]
    fn names() {
        for p in Property::ALL {
            assert_eq!(Property::from_name(p.name()), Some(p));
        }
        assert_eq!(Property::MouseMovedDelay.env_var(), "EASEL_MOUSE_MOVED_DELAY");
    }
}

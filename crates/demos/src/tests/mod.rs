use easel::{Config, DrawCall};

mod bounce;
mod counter;
mod painter;

/// Configuration that ignores the process environment.
fn config() -> Config {
    Config::from_vars(Vec::<(String, String)>::new())
}

/// Render a drawing log as text.
fn log(calls: &[DrawCall]) -> Vec<String> {
    calls.iter().map(ToString::to_string).collect()
}

use easel::{
    App, Canvas, Config, Options, Result, Runner, backend::headless::Probe,
    fingerprint::Fingerprint,
};
use tracing::debug;

/// Fastest timer period the speed keys allow, in milliseconds.
const MIN_DELAY: u64 = 10;
/// Slowest timer period the speed keys allow, in milliseconds.
const MAX_DELAY: u64 = 1000;

/// A ball moving in a straight line, bouncing off the window edges.
#[derive(Debug, Clone, PartialEq, Eq, Fingerprint)]
pub struct Ball {
    /// Centre x.
    pub x: i32,
    /// Centre y.
    pub y: i32,
    /// Horizontal step per tick.
    pub dx: i32,
    /// Vertical step per tick.
    pub dy: i32,
    /// Radius.
    pub radius: i32,
}

impl Default for Ball {
    fn default() -> Self {
        Self {
            x: 50,
            y: 50,
            dx: 10,
            dy: 5,
            radius: 10,
        }
    }
}

/// Keep one coordinate inside `[r, limit - r]`, turning the step around at
/// the edges. Returns true on a bounce.
fn reflect(pos: &mut i32, step: &mut i32, r: i32, limit: i32) -> bool {
    if *pos - r < 0 {
        *pos = r;
        *step = step.abs();
        true
    } else if *pos + r > limit {
        *pos = (limit - r).max(r);
        *step = -step.abs();
        true
    } else {
        false
    }
}

impl Ball {
    /// Advance one tick inside a `width` x `height` window.
    pub fn step(&mut self, width: u32, height: u32) {
        self.x += self.dx;
        self.y += self.dy;
        self.contain(width, height);
    }

    /// Pull the ball back inside the window.
    pub fn contain(&mut self, width: u32, height: u32) {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        if reflect(&mut self.x, &mut self.dx, self.radius, w)
            | reflect(&mut self.y, &mut self.dy, self.radius, h)
        {
            debug!(x = self.x, y = self.y, "bounce");
        }
    }
}

/// Wire up the ball.
pub fn runner(config: Config) -> Runner<Ball> {
    Runner::with_config(Ball::default(), config)
        .title("Bounce")
        .on_timer_fired(|app| {
            let (w, h) = (app.width(), app.height());
            app.model.step(w, h);
            Ok(())
        })
        .on_key_pressed(|app, k| {
            let delay = u64::try_from(app.timer_delay().as_millis()).unwrap_or(MAX_DELAY);
            match k.key.as_str() {
                "Space" => {
                    app.model.dx = -app.model.dx;
                    app.model.dy = -app.model.dy;
                }
                "f" => app.set_timer_delay((delay / 2).max(MIN_DELAY)),
                "s" => app.set_timer_delay((delay * 2).min(MAX_DELAY)),
                _ => {}
            }
            Ok(())
        })
        .on_size_changed(|app| {
            let (w, h) = (app.width(), app.height());
            app.model.contain(w, h);
            Ok(())
        })
        .on_redraw(draw)
}

/// Draw the ball.
fn draw(app: &App<Ball>, canvas: &mut Canvas<'_>) -> Result<()> {
    let b = &app.model;
    canvas.create_oval(
        b.x - b.radius,
        b.y - b.radius,
        b.x + b.radius,
        b.y + b.radius,
        Options::new().fill("orange"),
    )?;
    Ok(())
}

/// Let the ball run for `ms` milliseconds.
pub fn script(probe: &Probe, ms: u64) {
    probe.wait_ms(ms).end();
}

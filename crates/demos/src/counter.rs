use easel::{
    App, Canvas, Config, Options, Result, Runner, backend::headless::Probe, fingerprint::Fingerprint,
    geom::Point,
};

/// Radius of the mark left at the last click.
const MARK: i32 = 10;

/// Counts clicks and marks where the last one landed.
#[derive(Debug, Default, Fingerprint)]
pub struct Counter {
    /// Clicks so far.
    pub clicks: u32,
    /// Location of the most recent click.
    pub last: Option<Point>,
}

/// Wire up the counter.
pub fn runner(config: Config) -> Runner<Counter> {
    Runner::with_config(Counter::default(), config)
        .title("Counter")
        .on_mouse_pressed(|app, m| {
            app.model.clicks += 1;
            app.model.last = Some(m.location());
            Ok(())
        })
        .on_key_pressed(|app, k| {
            match k.key.as_str() {
                "r" => app.model = Counter::default(),
                "Up" => app.model.clicks += 1,
                "Down" => app.model.clicks = app.model.clicks.saturating_sub(1),
                _ => {}
            }
            Ok(())
        })
        .on_redraw(draw)
}

/// Draw the count and the click mark.
fn draw(app: &App<Counter>, canvas: &mut Canvas<'_>) -> Result<()> {
    let cx = f64::from(app.width()) / 2.0;
    canvas.create_text(
        cx,
        30,
        Options::new()
            .text(format!("Clicks: {}", app.model.clicks))
            .font("Arial 20 bold"),
    )?;
    if let Some(p) = app.model.last {
        canvas.create_oval(
            p.x - MARK,
            p.y - MARK,
            p.x + MARK,
            p.y + MARK,
            Options::new().fill("cyan"),
        )?;
    }
    Ok(())
}

/// Two clicks and a key press.
pub fn script(probe: &Probe) {
    probe
        .click(100, 100)
        .wait_ms(200)
        .click(50, 60)
        .wait_ms(200)
        .key("Up", "", 0);
}

use easel::{
    App, Canvas, Config, Options, Result, Runner, backend::headless::Probe,
    fingerprint::Fingerprint, geom::Point,
};

/// Line width for strokes.
const STROKE_WIDTH: i32 = 3;

/// One continuous drag.
#[derive(Debug, Clone, PartialEq, Eq, Fingerprint)]
pub struct Stroke {
    /// Colour name.
    pub color: String,
    /// Points visited, in order.
    pub points: Vec<Point>,
}

/// Paints strokes by dragging.
#[derive(Debug, Fingerprint)]
pub struct Painter {
    /// Finished and in-progress strokes.
    pub strokes: Vec<Stroke>,
    /// Colour for new strokes.
    pub color: String,
}

impl Default for Painter {
    fn default() -> Self {
        Self {
            strokes: vec![],
            color: "black".into(),
        }
    }
}

/// Wire up the painter.
pub fn runner(config: Config) -> Runner<Painter> {
    Runner::with_config(Painter::default(), config)
        .title("Painter")
        .on_mouse_pressed(|app, m| {
            let color = app.model.color.clone();
            app.model.strokes.push(Stroke {
                color,
                points: vec![m.location()],
            });
            Ok(())
        })
        .on_mouse_dragged(|app, m| {
            if let Some(s) = app.model.strokes.last_mut() {
                s.points.push(m.location());
            }
            Ok(())
        })
        .on_key_pressed(|app, k| {
            match k.key.as_str() {
                "c" => app.model.strokes.clear(),
                "1" => app.model.color = "black".into(),
                "2" => app.model.color = "red".into(),
                "3" => app.model.color = "blue".into(),
                "s" => {
                    if let Some(color) = app.get_user_input("Stroke colour?")? {
                        app.model.color = color;
                    }
                }
                _ => {}
            }
            Ok(())
        })
        .on_redraw(draw)
}

/// Draw every stroke. Single points are drawn as dots.
fn draw(app: &App<Painter>, canvas: &mut Canvas<'_>) -> Result<()> {
    for s in &app.model.strokes {
        match s.points.as_slice() {
            [] => {}
            [p] => {
                canvas.create_oval(
                    p.x - STROKE_WIDTH,
                    p.y - STROKE_WIDTH,
                    p.x + STROKE_WIDTH,
                    p.y + STROKE_WIDTH,
                    Options::new().fill(&s.color).outline(""),
                )?;
            }
            points => {
                canvas.create_line(
                    points.iter().flat_map(|p| [p.x, p.y]),
                    Options::new().fill(&s.color).width(STROKE_WIDTH),
                )?;
            }
        }
    }
    Ok(())
}

/// Pick red and drag a short stroke.
pub fn script(probe: &Probe) {
    probe
        .key("2", "2", 0)
        .mouse_press(10, 10)
        .move_pointer(20, 20)
        .wait_ms(60)
        .move_pointer(30, 25)
        .wait_ms(60)
        .mouse_release(30, 25)
        .wait_ms(60)
        .end();
}

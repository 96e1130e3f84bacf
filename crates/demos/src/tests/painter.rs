use easel::{Result, geom::Point};
use pretty_assertions::assert_eq;

use super::{config, log};
use crate::{painter, replay};

#[test]
fn test_painter_drag() -> Result<()> {
    let s = replay(painter::runner(config()), painter::script)?;
    let strokes = &s.app.model.strokes;
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].color, "red");
    assert_eq!(
        strokes[0].points,
        vec![Point::new(10, 10), Point::new(20, 20), Point::new(30, 25)]
    );
    assert_eq!(
        log(&s.window.drawing_calls()),
        vec!["create_line(10, 10, 20, 20, 30, 25, fill='red', width=3)"]
    );
    Ok(())
}

#[test]
fn test_painter_colour_prompt() -> Result<()> {
    let s = replay(painter::runner(config()), |p| {
        p.answer(Some("green"))
            .answer(None)
            .key("s", "s", 0)
            .click(5, 5)
            .key("s", "s", 0);
    })?;
    assert_eq!(s.app.model.color, "green");
    assert_eq!(
        s.probe.prompts(),
        vec!["Stroke colour?".to_string(), "Stroke colour?".into()]
    );
    assert_eq!(
        log(&s.window.drawing_calls()),
        vec!["create_oval(2, 2, 8, 8, fill='green', outline='')"]
    );
    Ok(())
}

#[test]
fn test_painter_clear() -> Result<()> {
    let s = replay(painter::runner(config()), |p| {
        painter::script(p);
        p.key("c", "c", 0);
    })?;
    assert!(s.app.model.strokes.is_empty());
    assert!(s.window.drawing_calls().is_empty());
    Ok(())
}

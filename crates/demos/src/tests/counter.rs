use easel::{Result, geom::Point};
use pretty_assertions::assert_eq;

use super::{config, log};
use crate::{counter, replay};

#[test]
fn test_counter_session() -> Result<()> {
    let s = replay(counter::runner(config()), counter::script)?;
    assert_eq!(s.app.model.clicks, 3);
    assert_eq!(s.app.model.last, Some(Point::new(50, 60)));
    assert_eq!(
        log(&s.window.drawing_calls()),
        vec![
            "create_text(150, 30, text='Clicks: 3', font='Arial 20 bold')",
            "create_oval(40, 50, 60, 70, fill='cyan')",
        ]
    );
    assert_eq!(s.probe.title(), Some("Counter (300 x 300)".into()));
    Ok(())
}

#[test]
fn test_counter_reset() -> Result<()> {
    let s = replay(counter::runner(config()), |p| {
        counter::script(p);
        p.key("r", "r", 0).key("Down", "", 0);
    })?;
    assert_eq!(s.app.model.clicks, 0);
    assert_eq!(s.app.model.last, None);
    assert_eq!(
        log(&s.window.drawing_calls()),
        vec!["create_text(150, 30, text='Clicks: 0', font='Arial 20 bold')"]
    );
    Ok(())
}

#[test]
fn test_counter_ignores_outside_clicks() -> Result<()> {
    let s = replay(counter::runner(config()), |p| {
        p.click(-1, 10).click(301, 10).click(300, 300);
    })?;
    // Edges are inside the window.
    assert_eq!(s.app.model.clicks, 1);
    Ok(())
}

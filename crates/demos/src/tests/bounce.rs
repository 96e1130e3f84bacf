use easel::{Result, event::key::STATE_CONTROL};
use pretty_assertions::assert_eq;

use super::{config, log};
use crate::{
    bounce::{self, Ball},
    replay,
};

#[test]
fn test_ball_step() {
    let mut b = Ball::default();
    b.step(300, 300);
    assert_eq!((b.x, b.y), (60, 55));

    // Bounce off the right and bottom edges.
    let mut b = Ball::default();
    b.step(60, 60);
    assert_eq!((b.x, b.y, b.dx, b.dy), (50, 50, -10, -5));

    // Bounce off the left edge.
    let mut b = Ball {
        x: 12,
        dx: -5,
        ..Ball::default()
    };
    b.step(300, 300);
    assert_eq!((b.x, b.dx), (10, 5));
}

#[test]
fn test_ball_contained_in_tiny_window() {
    let mut b = Ball::default();
    b.contain(5, 5);
    assert_eq!((b.x, b.y), (10, 10));
}

#[test]
fn test_bounce_session() -> Result<()> {
    let s = replay(bounce::runner(config()), |p| bounce::script(p, 1000))?;
    // Ticks at 0, 100, ..., 900.
    assert_eq!((s.app.model.x, s.app.model.y), (150, 100));
    assert_eq!(
        log(&s.window.drawing_calls()),
        vec!["create_oval(140, 90, 160, 110, fill='orange')"]
    );
    Ok(())
}

#[test]
fn test_bounce_pause() -> Result<()> {
    let s = replay(bounce::runner(config()), |p| {
        p.wait_ms(300)
            .key("p", "\u{10}", STATE_CONTROL)
            .wait_ms(300)
            .key("p", "\u{10}", STATE_CONTROL)
            .wait_ms(400)
            .end();
    })?;
    // Moves at 0, 100, 200, then 600, 700, 800, 900.
    assert_eq!((s.app.model.x, s.app.model.y), (120, 85));
    Ok(())
}

#[test]
fn test_bounce_faster() -> Result<()> {
    let s = replay(bounce::runner(config()), |p| {
        p.key("f", "f", 0).wait_ms(1000).end();
    })?;
    assert_eq!(s.app.timer_delay().as_millis(), 50);
    // Ticks at 0 and 100, then every 50ms up to 950.
    assert_eq!((s.app.model.x, s.app.model.y), (240, 145));
    Ok(())
}

#[test]
fn test_bounce_resize_contains_ball() -> Result<()> {
    let s = replay(bounce::runner(config()), |p| {
        p.wait_ms(500).resize(40, 40).wait_ms(150).end();
    })?;
    let b = &s.app.model;
    assert!(b.x + b.radius <= 40 && b.y + b.radius <= 40);
    assert_eq!(s.probe.title(), Some("Bounce (40 x 40)".into()));
    Ok(())
}

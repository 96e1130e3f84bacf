//! A backend with no window. Input comes from a script, time is virtual, and
//! every surface operation is recorded for inspection.
use std::{
    cell::RefCell,
    collections::VecDeque,
    path::PathBuf,
    rc::Rc,
    time::{Duration, Instant},
};

use image::{DynamicImage, ImageBuffer, Rgb};

use super::Host;
use crate::{
    canvas::{DrawCall, ImageHandle, ItemId, Op, Options},
    error::{Error, Result},
    event::{Event, MouseEvent, RawKey},
    geom::{Geometry, Point},
};

/// A scripted step.
#[derive(Debug, Clone)]
enum Action {
    /// Deliver an input event.
    Input(Event),
    /// Move the pointer without generating an event.
    Pointer(Point),
    /// Resize the window and report it.
    Resize(u32, u32),
}

/// A recorded surface operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    /// The surface was created.
    Create,
    /// The surface was destroyed.
    Destroy,
    /// All items were deleted.
    Clear,
    /// Drawing was pushed to the screen.
    Update,
    /// An item was drawn.
    Draw(DrawCall),
    /// A portable image was converted to a native handle.
    NativeImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
}

/// Shared state between the host and its probe.
#[derive(Debug)]
struct State {
    /// Virtual clock origin.
    start: Instant,
    /// Current virtual time.
    now: Instant,
    /// Script offset for the next step added.
    cursor: Duration,
    /// Pending script steps, in time order.
    script: VecDeque<(Instant, Action)>,
    /// End of session, if configured.
    end: Option<Instant>,
    /// Window geometry.
    geometry: Geometry,
    /// Pointer position relative to the window.
    pointer: Point,
    /// Titles set, in order.
    titles: Vec<String>,
    /// Is the window shown?
    visible: bool,
    /// Does a surface exist?
    surface: bool,
    /// Every surface operation, in order.
    ops: Vec<SurfaceOp>,
    /// Next item id.
    next_item: u64,
    /// Messages shown, as (title, message).
    messages: Vec<(String, String)>,
    /// Prompts asked.
    prompts: Vec<String>,
    /// Scripted answers to string prompts.
    answers: VecDeque<Option<String>>,
    /// Scripted answers to path prompts.
    paths: VecDeque<Option<PathBuf>>,
    /// Number of snapshots taken.
    snapshots: usize,
}

impl State {
    /// Fresh state with the clock at `start`.
    fn new(start: Instant) -> Self {
        Self {
            start,
            now: start,
            cursor: Duration::ZERO,
            script: VecDeque::new(),
            end: None,
            geometry: Geometry::new(1, 1, 0, 0),
            pointer: Point::new(-1, -1),
            titles: vec![],
            visible: false,
            surface: false,
            ops: vec![],
            next_item: 1,
            messages: vec![],
            prompts: vec![],
            answers: VecDeque::new(),
            paths: VecDeque::new(),
            snapshots: 0,
        }
    }

    /// Append a step at the script cursor.
    fn push(&mut self, action: Action) {
        let due = self.start + self.cursor;
        self.script.push_back((due, action));
    }

    /// Apply a due step, returning the event it produces.
    fn apply(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::Input(e) => {
                if let Event::MousePress(m) | Event::MouseRelease(m) = &e {
                    self.pointer = m.location();
                }
                Some(e)
            }
            Action::Pointer(p) => {
                self.pointer = p;
                None
            }
            Action::Resize(width, height) => {
                self.geometry.width = width;
                self.geometry.height = height;
                Some(Event::Configure { width, height })
            }
        }
    }
}

/// Inspection and scripting handle for a [`HeadlessHost`]. Script methods
/// append steps at a cursor that starts at time zero and advances with
/// [`Probe::wait`].
#[derive(Debug, Clone)]
pub struct Probe {
    /// Shared state.
    state: Rc<RefCell<State>>,
}

impl Probe {
    /// Advance the script cursor.
    pub fn wait(&self, d: Duration) -> &Self {
        self.state.borrow_mut().cursor += d;
        self
    }

    /// Advance the script cursor by `ms` milliseconds.
    pub fn wait_ms(&self, ms: u64) -> &Self {
        self.wait(Duration::from_millis(ms))
    }

    /// Press a key.
    pub fn key_press(&self, raw: RawKey) -> &Self {
        self.state
            .borrow_mut()
            .push(Action::Input(Event::KeyPress(raw)));
        self
    }

    /// Release a key.
    pub fn key_release(&self, raw: RawKey) -> &Self {
        self.state
            .borrow_mut()
            .push(Action::Input(Event::KeyRelease(raw)));
        self
    }

    /// Press and release a key.
    pub fn key(&self, keysym: &str, ch: &str, state: u32) -> &Self {
        let raw = RawKey::new(keysym, ch, state);
        self.key_press(raw.clone()).key_release(raw)
    }

    /// Type each character of a string.
    pub fn type_str(&self, s: &str) -> &Self {
        for c in s.chars() {
            let raw = RawKey::char(c);
            self.key_press(raw.clone()).key_release(raw);
        }
        self
    }

    /// Press the mouse button at a window position.
    pub fn mouse_press(&self, x: i32, y: i32) -> &Self {
        self.state
            .borrow_mut()
            .push(Action::Input(Event::MousePress(MouseEvent::new(x, y))));
        self
    }

    /// Release the mouse button at a window position.
    pub fn mouse_release(&self, x: i32, y: i32) -> &Self {
        self.state
            .borrow_mut()
            .push(Action::Input(Event::MouseRelease(MouseEvent::new(x, y))));
        self
    }

    /// Press and release the mouse button.
    pub fn click(&self, x: i32, y: i32) -> &Self {
        self.mouse_press(x, y).mouse_release(x, y)
    }

    /// Move the pointer. No event is generated; motion is observed by
    /// polling.
    pub fn move_pointer(&self, x: i32, y: i32) -> &Self {
        self.state
            .borrow_mut()
            .push(Action::Pointer(Point::new(x, y)));
        self
    }

    /// Resize the window, as a user dragging its border would.
    pub fn resize(&self, width: u32, height: u32) -> &Self {
        self.state.borrow_mut().push(Action::Resize(width, height));
        self
    }

    /// Click the window's close button.
    pub fn close(&self) -> &Self {
        self.state
            .borrow_mut()
            .push(Action::Input(Event::CloseRequested));
        self
    }

    /// End the session at the script cursor. Without an end, the session
    /// closes as soon as the script is exhausted.
    pub fn end(&self) -> &Self {
        let mut s = self.state.borrow_mut();
        s.end = Some(s.start + s.cursor);
        drop(s);
        self
    }

    /// Queue an answer for the next text prompt.
    pub fn answer(&self, answer: Option<&str>) -> &Self {
        self.state
            .borrow_mut()
            .answers
            .push_back(answer.map(str::to_string));
        self
    }

    /// Queue an answer for the next file dialog.
    pub fn answer_path(&self, path: Option<PathBuf>) -> &Self {
        self.state.borrow_mut().paths.push_back(path);
        self
    }

    /// Every surface operation so far.
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.state.borrow().ops.clone()
    }

    /// Items drawn since the surface was last cleared.
    pub fn draws(&self) -> Vec<DrawCall> {
        let s = self.state.borrow();
        let start = s
            .ops
            .iter()
            .rposition(|op| matches!(op, SurfaceOp::Clear | SurfaceOp::Create))
            .map_or(0, |i| i + 1);
        s.ops[start..]
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Draw(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of times the surface was pushed to the screen.
    pub fn updates(&self) -> usize {
        self.state
            .borrow()
            .ops
            .iter()
            .filter(|op| **op == SurfaceOp::Update)
            .count()
    }

    /// The current title.
    pub fn title(&self) -> Option<String> {
        self.state.borrow().titles.last().cloned()
    }

    /// Every title set, in order.
    pub fn titles(&self) -> Vec<String> {
        self.state.borrow().titles.clone()
    }

    /// Is the window shown?
    pub fn visible(&self) -> bool {
        self.state.borrow().visible
    }

    /// Does a drawing surface exist?
    pub fn has_surface(&self) -> bool {
        self.state.borrow().surface
    }

    /// Current window geometry.
    pub fn geometry(&self) -> Geometry {
        self.state.borrow().geometry
    }

    /// Messages shown, as (title, message).
    pub fn messages(&self) -> Vec<(String, String)> {
        self.state.borrow().messages.clone()
    }

    /// Prompts asked.
    pub fn prompts(&self) -> Vec<String> {
        self.state.borrow().prompts.clone()
    }

    /// Number of snapshots taken.
    pub fn snapshots(&self) -> usize {
        self.state.borrow().snapshots
    }

    /// Virtual time elapsed since the host was created.
    pub fn elapsed(&self) -> Duration {
        let s = self.state.borrow();
        s.now - s.start
    }
}

/// A [`Host`] that runs a scripted session against a virtual clock.
#[derive(Debug)]
pub struct HeadlessHost {
    /// Shared state.
    state: Rc<RefCell<State>>,
}

impl HeadlessHost {
    /// Create a host and a probe sharing its state.
    pub fn create() -> (Probe, Self) {
        let state = Rc::new(RefCell::new(State::new(Instant::now())));
        (
            Probe {
                state: state.clone(),
            },
            Self { state },
        )
    }
}

impl Host for HeadlessHost {
    fn now(&self) -> Instant {
        self.state.borrow().now
    }

    fn geometry(&self) -> Result<Geometry> {
        Ok(self.state.borrow().geometry)
    }

    fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.geometry = geometry;
        let now = s.now;
        s.script.push_front((
            now,
            Action::Input(Event::Configure {
                width: geometry.width,
                height: geometry.height,
            }),
        ));
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.state.borrow_mut().titles.push(title.to_string());
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        self.state.borrow_mut().visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.state.borrow_mut().visible = false;
        Ok(())
    }

    fn pointer(&self) -> Result<Point> {
        Ok(self.state.borrow().pointer)
    }

    fn next_event(&mut self, deadline: Option<Instant>) -> Result<Option<Event>> {
        let mut s = self.state.borrow_mut();
        loop {
            let next = s.script.front().map(|(due, _)| *due);
            if next.is_none() && s.end.is_none() {
                return Ok(Some(Event::CloseRequested));
            }
            let target = [next, deadline, s.end].into_iter().flatten().min();
            if let Some(t) = target
                && t > s.now
            {
                s.now = t;
            }
            let now = s.now;
            if next.is_some_and(|due| due <= now) {
                if let Some((_, action)) = s.script.pop_front()
                    && let Some(e) = s.apply(action)
                {
                    return Ok(Some(e));
                }
                continue;
            }
            if s.end.is_some_and(|end| end <= now) {
                s.end = None;
                return Ok(Some(Event::CloseRequested));
            }
            if deadline.is_some_and(|d| d <= now) {
                return Ok(None);
            }
        }
    }

    fn create_surface(&mut self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.surface = true;
        s.ops.push(SurfaceOp::Create);
        Ok(())
    }

    fn destroy_surface(&mut self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.surface = false;
        s.ops.push(SurfaceOp::Destroy);
        Ok(())
    }

    fn draw(&mut self, op: Op, coords: &[f64], options: &Options) -> Result<ItemId> {
        let mut s = self.state.borrow_mut();
        if !s.surface {
            return Err(Error::Host(format!("{op}: no drawing surface")));
        }
        s.ops
            .push(SurfaceOp::Draw(DrawCall::new(op, coords, options.clone())));
        let id = ItemId(s.next_item);
        s.next_item += 1;
        Ok(id)
    }

    fn native_image(&mut self, img: &DynamicImage) -> Result<ImageHandle> {
        let mut s = self.state.borrow_mut();
        s.ops.push(SurfaceOp::NativeImage {
            width: img.width(),
            height: img.height(),
        });
        let id = ImageHandle(s.next_item);
        s.next_item += 1;
        Ok(id)
    }

    fn clear(&mut self) -> Result<()> {
        self.state.borrow_mut().ops.push(SurfaceOp::Clear);
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        self.state.borrow_mut().ops.push(SurfaceOp::Update);
        Ok(())
    }

    fn show_message(&mut self, title: &str, message: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .messages
            .push((title.to_string(), message.to_string()));
        Ok(())
    }

    fn ask_string(&mut self, _title: &str, prompt: &str) -> Result<Option<String>> {
        let mut s = self.state.borrow_mut();
        s.prompts.push(prompt.to_string());
        Ok(s.answers.pop_front().flatten())
    }

    fn ask_save_path(&mut self, title: &str) -> Result<Option<PathBuf>> {
        let mut s = self.state.borrow_mut();
        s.prompts.push(title.to_string());
        Ok(s.paths.pop_front().flatten())
    }

    fn ask_open_path(&mut self, title: &str) -> Result<Option<PathBuf>> {
        self.ask_save_path(title)
    }

    fn snapshot(&mut self) -> Result<DynamicImage> {
        let mut s = self.state.borrow_mut();
        s.snapshots += 1;
        let Geometry { width, height, .. } = s.geometry;
        Ok(DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            width,
            height,
            Rgb([255, 255, 255]),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_timing() -> Result<()> {
        let (probe, mut host) = HeadlessHost::create();
        let t0 = host.now();
        probe.wait_ms(100).type_str("a").wait_ms(50).click(5, 6);

        // A deadline before the first step passes without an event.
        assert_eq!(host.next_event(Some(t0 + Duration::from_millis(40)))?, None);
        assert_eq!(probe.elapsed(), Duration::from_millis(40));

        assert_eq!(
            host.next_event(None)?,
            Some(Event::KeyPress(RawKey::char('a')))
        );
        assert_eq!(probe.elapsed(), Duration::from_millis(100));
        assert_eq!(
            host.next_event(None)?,
            Some(Event::KeyRelease(RawKey::char('a')))
        );
        assert_eq!(
            host.next_event(None)?,
            Some(Event::MousePress(MouseEvent::new(5, 6)))
        );
        assert_eq!(host.pointer()?, Point::new(5, 6));
        assert_eq!(
            host.next_event(None)?,
            Some(Event::MouseRelease(MouseEvent::new(5, 6)))
        );
        // Script exhausted with no end configured.
        assert_eq!(host.next_event(None)?, Some(Event::CloseRequested));
        Ok(())
    }

    #[test]
    fn end_of_session() -> Result<()> {
        let (probe, mut host) = HeadlessHost::create();
        let t0 = host.now();
        probe.wait_ms(10).move_pointer(3, 4).wait_ms(1000).end();
        let ms = Duration::from_millis;

        // Pointer moves are silent.
        assert_eq!(host.next_event(Some(t0 + ms(100)))?, None);
        assert_eq!(host.pointer()?, Point::new(3, 4));
        assert_eq!(host.next_event(Some(t0 + ms(500)))?, None);
        assert_eq!(host.next_event(Some(t0 + ms(5000)))?, Some(Event::CloseRequested));
        assert_eq!(probe.elapsed(), ms(1010));
        Ok(())
    }

    #[test]
    fn geometry_and_surface() -> Result<()> {
        let (probe, mut host) = HeadlessHost::create();
        probe.wait_ms(20).resize(400, 250);
        host.set_geometry("300x200+5+5".parse()?)?;
        assert_eq!(
            host.next_event(None)?,
            Some(Event::Configure {
                width: 300,
                height: 200
            })
        );
        assert_eq!(
            host.next_event(None)?,
            Some(Event::Configure {
                width: 400,
                height: 250
            })
        );
        assert_eq!(host.geometry()?, Geometry::new(400, 250, 5, 5));

        assert!(host.draw(Op::Oval, &[0.0; 4], &Options::new()).is_err());
        host.create_surface()?;
        host.draw(Op::Oval, &[0.0; 4], &Options::new())?;
        host.clear()?;
        host.draw(Op::Line, &[1.0; 4], &Options::new())?;
        assert_eq!(probe.draws().len(), 1);
        assert_eq!(probe.draws()[0].op, Op::Line);

        let snap = host.snapshot()?;
        assert_eq!((snap.width(), snap.height()), (400, 250));
        assert_eq!(probe.snapshots(), 1);
        Ok(())
    }

    #[test]
    fn dialogs() -> Result<()> {
        let (probe, mut host) = HeadlessHost::create();
        probe.answer(Some("bob")).answer(None);
        assert_eq!(host.ask_string("t", "name?")?, Some("bob".into()));
        assert_eq!(host.ask_string("t", "again?")?, None);
        assert_eq!(host.ask_string("t", "unscripted")?, None);
        assert_eq!(probe.prompts(), vec!["name?", "again?", "unscripted"]);
        host.show_message("title", "hello")?;
        assert_eq!(probe.messages(), vec![("title".into(), "hello".into())]);
        Ok(())
    }
}

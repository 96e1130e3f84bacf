//! The guarded drawing surface handed to `redraw_all`.
//!
//! Every drawing operation passes through a [`Canvas`], which checks that a
//! redraw is in progress, appends the call to the drawing log, and forwards
//! it to the host. The log is what external tools (and tests) inspect after a
//! redraw to see what was drawn.
use std::{cell::Cell, fmt, rc::Rc, sync::Arc};

use image::DynamicImage;

use crate::{
    backend::Host,
    error::{Error, Result},
};

/// Message for drawing outside a redraw pass.
pub const OUTSIDE_REDRAW: &str = "you may not use the canvas (the view) outside of redraw_all";

/// A drawing primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// An arc or pie slice inside a bounding box.
    Arc,
    /// A two-colour bitmap at a point.
    Bitmap,
    /// An image at a point.
    Image,
    /// A polyline.
    Line,
    /// An ellipse inside a bounding box.
    Oval,
    /// A closed polygon.
    Polygon,
    /// An axis-aligned rectangle.
    Rectangle,
    /// Text at a point.
    Text,
    /// An embedded widget at a point.
    Window,
}

impl Op {
    /// The operation's name as it appears in the drawing log.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arc => "create_arc",
            Self::Bitmap => "create_bitmap",
            Self::Image => "create_image",
            Self::Line => "create_line",
            Self::Oval => "create_oval",
            Self::Polygon => "create_polygon",
            Self::Rectangle => "create_rectangle",
            Self::Text => "create_text",
            Self::Window => "create_window",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of an item created on the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Handle to an image already converted to the host's native form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);

/// An image in portable form, converted to a native handle when drawn.
/// Clones share pixel data; equality is identity.
#[derive(Clone)]
pub struct PortableImage(pub Arc<DynamicImage>);

impl PortableImage {
    /// Wrap an image.
    pub fn new(img: DynamicImage) -> Self {
        Self(Arc::new(img))
    }
}

impl PartialEq for PortableImage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PortableImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<image {}x{}>", self.0.width(), self.0.height())
    }
}

impl From<DynamicImage> for PortableImage {
    fn from(img: DynamicImage) -> Self {
        Self::new(img)
    }
}

/// An option value. Options are passed through to the host unvalidated.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A string, e.g. a colour name or font.
    Str(String),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A flag.
    Bool(bool),
    /// A native image handle.
    Image(ImageHandle),
    /// A portable image.
    Pixels(PortableImage),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Image(h) => write!(f, "<native image {}>", h.0),
            Self::Pixels(p) => write!(f, "{p:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<ImageHandle> for Value {
    fn from(v: ImageHandle) -> Self {
        Self::Image(v)
    }
}

impl From<PortableImage> for Value {
    fn from(v: PortableImage) -> Self {
        Self::Pixels(v)
    }
}

/// Named drawing options, in the order they were given.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Options(Vec<(String, Value)>);

impl Options {
    /// No options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option by name, replacing any previous value.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Set an option in place.
    pub fn insert(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value;
        } else {
            self.0.push((name.to_string(), value));
        }
    }

    /// Remove an option, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(idx).1)
    }

    /// Look up an option.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Iterate over options in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Are there no options?
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fill colour.
    pub fn fill(self, color: &str) -> Self {
        self.set("fill", color)
    }

    /// Outline colour.
    pub fn outline(self, color: &str) -> Self {
        self.set("outline", color)
    }

    /// Stroke width.
    pub fn width(self, w: impl Into<Value>) -> Self {
        self.set("width", w)
    }

    /// Anchor point, e.g. "nw" or "center".
    pub fn anchor(self, anchor: &str) -> Self {
        self.set("anchor", anchor)
    }

    /// Font description, e.g. "Arial 12 bold".
    pub fn font(self, font: &str) -> Self {
        self.set("font", font)
    }

    /// Text justification.
    pub fn justify(self, justify: &str) -> Self {
        self.set("justify", justify)
    }

    /// Rotation angle in degrees.
    pub fn angle(self, angle: f64) -> Self {
        self.set("angle", angle)
    }

    /// Smooth lines into curves.
    pub fn smooth(self, smooth: bool) -> Self {
        self.set("smooth", smooth)
    }

    /// Text content.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.set("text", text.into())
    }

    /// Arc start angle.
    pub fn start(self, start: f64) -> Self {
        self.set("start", start)
    }

    /// Arc extent.
    pub fn extent(self, extent: f64) -> Self {
        self.set("extent", extent)
    }

    /// Native image to draw.
    pub fn image(self, handle: ImageHandle) -> Self {
        self.set("image", handle)
    }

    /// Portable image to draw.
    pub fn pixels(self, img: impl Into<PortableImage>) -> Self {
        self.set("pixels", img.into())
    }
}

/// One entry in the drawing log.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// The primitive.
    pub op: Op,
    /// Positional coordinates.
    pub coords: Vec<f64>,
    /// Named options.
    pub options: Options,
}

impl DrawCall {
    /// Construct a log entry.
    pub fn new(op: Op, coords: &[f64], options: Options) -> Self {
        Self {
            op,
            coords: coords.to_vec(),
            options,
        }
    }
}

impl fmt::Display for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args: Vec<String> = self.coords.iter().map(|c| format!("{c}")).collect();
        args.extend(self.options.iter().map(|(k, v)| format!("{k}={v}")));
        write!(f, "{}({})", self.op, args.join(", "))
    }
}

/// Persistent guard state for the drawing surface: the inside-redraw flag
/// and the drawing log. Only the run loop changes the flag.
#[derive(Debug, Default)]
pub struct SurfaceGuard {
    /// Set while a redraw pass is running. Shared with the window so that
    /// host-touching app methods can refuse to run during a redraw.
    in_redraw: Rc<Cell<bool>>,
    /// Record calls in the log?
    log_calls: bool,
    /// Calls made during the current redraw pass.
    calls: Vec<DrawCall>,
}

impl SurfaceGuard {
    /// Construct a guard sharing an inside-redraw flag.
    pub fn new(in_redraw: Rc<Cell<bool>>, log_calls: bool) -> Self {
        Self {
            in_redraw,
            log_calls,
            calls: vec![],
        }
    }

    /// Is a redraw pass in progress?
    pub fn in_redraw(&self) -> bool {
        self.in_redraw.get()
    }

    /// Set the inside-redraw flag.
    pub fn set_in_redraw(&self, v: bool) {
        self.in_redraw.set(v);
    }

    /// Enable or disable call logging.
    pub fn set_log_calls(&mut self, v: bool) {
        self.log_calls = v;
    }

    /// Calls logged since the last clear.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Clear the drawing log.
    pub fn clear_log(&mut self) {
        self.calls.clear();
    }
}

/// Collect coordinates from any numeric sequence.
fn collect_coords<T: Into<f64>>(coords: impl IntoIterator<Item = T>) -> Vec<f64> {
    coords.into_iter().map(Into::into).collect()
}

/// A drawing surface borrowed for the duration of one redraw.
pub struct Canvas<'a> {
    /// Flag and log.
    guard: &'a mut SurfaceGuard,
    /// The host surface.
    host: &'a mut dyn Host,
}

impl<'a> Canvas<'a> {
    /// Bind a guard to a host surface.
    pub fn new(guard: &'a mut SurfaceGuard, host: &'a mut dyn Host) -> Self {
        Self { guard, host }
    }

    /// Issue a drawing operation. Fails with an MVC violation outside a
    /// redraw pass. Image operations must carry exactly one of the `image`
    /// (native handle) or `pixels` (portable image) options.
    pub fn draw(&mut self, op: Op, coords: &[f64], options: Options) -> Result<ItemId> {
        if !self.guard.in_redraw() {
            return Err(Error::mvc(OUTSIDE_REDRAW));
        }
        if self.guard.log_calls {
            self.guard
                .calls
                .push(DrawCall::new(op, coords, options.clone()));
        }
        let options = if op == Op::Image {
            self.resolve_image(options)?
        } else {
            options
        };
        self.host.draw(op, coords, &options)
    }

    /// Check image arguments and convert a portable image to a native
    /// handle.
    fn resolve_image(&mut self, mut options: Options) -> Result<Options> {
        let image = options.remove("image");
        let pixels = options.remove("pixels");
        let handle = match (image, pixels) {
            (Some(_), Some(_)) => {
                return Err(Error::Resource(
                    "create_image: cannot specify both image and pixels".into(),
                ));
            }
            (None, None) => {
                return Err(Error::Resource(
                    "create_image: an image or pixels option is required".into(),
                ));
            }
            (Some(Value::Image(h)), None) => h,
            (Some(other), None) => {
                return Err(Error::Resource(format!(
                    "create_image: image must be a native image handle, not {other}; \
                     use pixels for portable images"
                )));
            }
            (None, Some(Value::Pixels(p))) => self.host.native_image(&p.0)?,
            (None, Some(other)) => {
                return Err(Error::Resource(format!(
                    "create_image: pixels must be a portable image, not {other}"
                )));
            }
        };
        options.insert("image", Value::Image(handle));
        Ok(options)
    }

    /// Draw an arc inside a bounding box.
    pub fn create_arc(
        &mut self,
        x0: impl Into<f64>,
        y0: impl Into<f64>,
        x1: impl Into<f64>,
        y1: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(
            Op::Arc,
            &[x0.into(), y0.into(), x1.into(), y1.into()],
            options,
        )
    }

    /// Draw a bitmap at a point.
    pub fn create_bitmap(
        &mut self,
        x: impl Into<f64>,
        y: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(Op::Bitmap, &[x.into(), y.into()], options)
    }

    /// Draw an image at a point.
    pub fn create_image(
        &mut self,
        x: impl Into<f64>,
        y: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(Op::Image, &[x.into(), y.into()], options)
    }

    /// Draw a line through a flat list of coordinates.
    pub fn create_line<T: Into<f64>>(
        &mut self,
        coords: impl IntoIterator<Item = T>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(Op::Line, &collect_coords(coords), options)
    }

    /// Draw an oval inside a bounding box.
    pub fn create_oval(
        &mut self,
        x0: impl Into<f64>,
        y0: impl Into<f64>,
        x1: impl Into<f64>,
        y1: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(
            Op::Oval,
            &[x0.into(), y0.into(), x1.into(), y1.into()],
            options,
        )
    }

    /// Draw a polygon through a flat list of coordinates.
    pub fn create_polygon<T: Into<f64>>(
        &mut self,
        coords: impl IntoIterator<Item = T>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(Op::Polygon, &collect_coords(coords), options)
    }

    /// Draw a rectangle from two corners.
    pub fn create_rectangle(
        &mut self,
        x0: impl Into<f64>,
        y0: impl Into<f64>,
        x1: impl Into<f64>,
        y1: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(
            Op::Rectangle,
            &[x0.into(), y0.into(), x1.into(), y1.into()],
            options,
        )
    }

    /// Draw text at a point.
    pub fn create_text(
        &mut self,
        x: impl Into<f64>,
        y: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(Op::Text, &[x.into(), y.into()], options)
    }

    /// Embed a widget at a point.
    pub fn create_window(
        &mut self,
        x: impl Into<f64>,
        y: impl Into<f64>,
        options: Options,
    ) -> Result<ItemId> {
        self.draw(Op::Window, &[x.into(), y.into()], options)
    }

    /// Calls logged so far in this redraw.
    pub fn calls(&self) -> &[DrawCall] {
        self.guard.calls()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use image::DynamicImage;

    use super::*;
    use crate::backend::headless::{HeadlessHost, Probe};

    fn guard(in_redraw: bool) -> SurfaceGuard {
        SurfaceGuard::new(Rc::new(Cell::new(in_redraw)), true)
    }

    /// A headless host with a drawing surface attached.
    fn surface() -> Result<(Probe, HeadlessHost)> {
        let (probe, mut host) = HeadlessHost::create();
        host.create_surface()?;
        Ok((probe, host))
    }

    #[test]
    fn outside_redraw() -> Result<()> {
        let (probe, mut host) = surface()?;
        let mut g = guard(false);
        let mut c = Canvas::new(&mut g, &mut host);
        assert_eq!(
            c.create_rectangle(10, 20, 30, 40, Options::new().fill("red")),
            Err(Error::mvc(OUTSIDE_REDRAW))
        );
        assert!(g.calls().is_empty());
        assert!(probe.draws().is_empty());

        g.set_in_redraw(true);
        let mut c = Canvas::new(&mut g, &mut host);
        c.create_rectangle(10, 20, 30, 40, Options::new().fill("red"))?;
        assert_eq!(probe.draws().len(), 1);
        assert_eq!(
            g.calls(),
            &[DrawCall::new(
                Op::Rectangle,
                &[10.0, 20.0, 30.0, 40.0],
                Options::new().fill("red")
            )]
        );
        assert_eq!(
            g.calls()[0].to_string(),
            "create_rectangle(10, 20, 30, 40, fill='red')"
        );
        Ok(())
    }

    #[test]
    fn logging_disabled() -> Result<()> {
        let (probe, mut host) = surface()?;
        let mut g = guard(true);
        g.set_log_calls(false);
        let mut c = Canvas::new(&mut g, &mut host);
        c.create_line([0, 0, 5, 5], Options::new().width(2))?;
        c.create_polygon([0.5, 0.0, 1.0, 1.0, 0.0, 1.0], Options::new())?;
        assert!(g.calls().is_empty());
        assert_eq!(probe.draws().len(), 2);
        Ok(())
    }

    #[test]
    fn image_arguments() -> Result<()> {
        let (probe, mut host) = surface()?;
        let mut g = guard(true);
        let mut c = Canvas::new(&mut g, &mut host);
        let img = PortableImage::new(DynamicImage::new_rgb8(4, 3));

        assert!(matches!(
            c.create_image(0, 0, Options::new()),
            Err(Error::Resource(_))
        ));
        assert!(matches!(
            c.create_image(
                0,
                0,
                Options::new().image(ImageHandle(1)).pixels(img.clone())
            ),
            Err(Error::Resource(_))
        ));
        assert!(matches!(
            c.create_image(0, 0, Options::new().set("image", "cat.png")),
            Err(Error::Resource(_))
        ));
        assert!(matches!(
            c.create_image(0, 0, Options::new().set("pixels", 3)),
            Err(Error::Resource(_))
        ));

        c.create_image(0, 0, Options::new().pixels(img.clone()).anchor("nw"))?;
        let draws = probe.draws();
        let last = draws.last().expect("one image drawn");
        assert_eq!(last.op, Op::Image);
        assert!(matches!(last.options.get("image"), Some(Value::Image(_))));
        assert!(last.options.get("pixels").is_none());
        // The log keeps the arguments as given.
        assert_eq!(
            g.calls().last().and_then(|c| c.options.get("pixels")),
            Some(&Value::Pixels(img))
        );
        Ok(())
    }

    #[test]
    fn options() {
        let o = Options::new().fill("red").width(3).fill("blue");
        assert_eq!(o.get("fill"), Some(&Value::Str("blue".into())));
        assert_eq!(o.iter().count(), 2);
        assert_eq!(
            DrawCall::new(Op::Text, &[1.5, 2.0], o.smooth(true)).to_string(),
            "create_text(1.5, 2, fill='blue', width=3, smooth=True)"
        );
    }
}

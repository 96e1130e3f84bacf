//! Structural fingerprints of application state.
//!
//! A [`Shape`] captures the recursive content of a value: two shapes are
//! equal exactly when the values they were taken from are observably equal.
//! The run loop takes a fingerprint of the application before and after a
//! redraw, and reports an MVC violation if they differ.
//!
//! Types opt in by implementing [`Fingerprint`], usually through
//! `#[derive(Fingerprint)]`:
//!
//! ```
//! use easel::fingerprint::{Fingerprint, fingerprint};
//!
//! #[derive(Fingerprint)]
//! struct Model {
//!     score: u32,
//!     names: Vec<String>,
//!     #[fingerprint(skip)]
//!     _scratch: Vec<u8>,
//! }
//!
//! let a = Model { score: 1, names: vec!["x".into()], _scratch: vec![] };
//! let b = Model { score: 1, names: vec!["x".into()], _scratch: vec![1] };
//! assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
//! ```
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    fmt::Debug,
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
    time::Duration,
};

pub use easel_derive::Fingerprint;

use crate::{
    error::{Error, Result},
    geom::{Geometry, Point},
};

/// Maximum nesting depth visited before giving up. Only cyclic `Rc` graphs
/// reach this in practice.
pub const MAX_DEPTH: usize = 256;

/// The structural content of a value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    /// A value with no content.
    Unit,
    /// A boolean.
    Bool(bool),
    /// Any integer.
    Int(i128),
    /// A character.
    Char(char),
    /// A string.
    Text(String),
    /// An ordered sequence. Element order is significant.
    Seq(Vec<Self>),
    /// An unordered set, with elements sorted.
    Set(Vec<Self>),
    /// A keyed mapping, with entries sorted by key.
    Map(Vec<(Self, Self)>),
    /// A value with named fields.
    Composite(Vec<(&'static str, Self)>),
    /// An enum variant and its fields.
    Variant(&'static str, Vec<(&'static str, Self)>),
    /// Textual fallback for values without structural equality.
    Opaque(String),
    /// Placeholder for content beyond the depth limit.
    Truncated,
}

/// Implemented by values that can be fingerprinted.
pub trait Fingerprint {
    /// Compute the shape of this value. Implementations recurse through
    /// [`Fingerprinter::visit`] and the container helpers, never by calling
    /// `shape` on children directly, so that depth is tracked.
    fn shape(&self, fp: &mut Fingerprinter) -> Shape;
}

/// Recursion state for a single fingerprint computation.
#[derive(Debug, Default)]
pub struct Fingerprinter {
    /// Current depth.
    depth: usize,
    /// Set when the depth limit was hit.
    overflowed: bool,
}

impl Fingerprinter {
    /// Visit a child value.
    pub fn visit<T: Fingerprint + ?Sized>(&mut self, v: &T) -> Shape {
        if self.overflowed || self.depth >= MAX_DEPTH {
            self.overflowed = true;
            return Shape::Truncated;
        }
        self.depth += 1;
        let shape = v.shape(self);
        self.depth -= 1;
        shape
    }

    /// Fingerprint an ordered sequence.
    pub fn seq<'a, T, I>(&mut self, items: I) -> Shape
    where
        T: Fingerprint + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Shape::Seq(items.into_iter().map(|v| self.visit(v)).collect())
    }

    /// Fingerprint an unordered set. Elements are sorted so that iteration
    /// order does not matter.
    pub fn set<'a, T, I>(&mut self, items: I) -> Shape
    where
        T: Fingerprint + ?Sized + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut v: Vec<Shape> = items.into_iter().map(|v| self.visit(v)).collect();
        v.sort();
        Shape::Set(v)
    }

    /// Fingerprint a keyed mapping. Entries are sorted by key, so insertion
    /// order does not matter but the key set does.
    pub fn map<'a, K, V, I>(&mut self, entries: I) -> Shape
    where
        K: Fingerprint + ?Sized + 'a,
        V: Fingerprint + ?Sized + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let mut v: Vec<(Shape, Shape)> = entries
            .into_iter()
            .map(|(k, v)| (self.visit(k), self.visit(v)))
            .collect();
        v.sort();
        Shape::Map(v)
    }

    /// Fingerprint a value with named fields.
    pub fn composite(&mut self, fields: &[(&'static str, &dyn Fingerprint)]) -> Shape {
        Shape::Composite(self.fields(fields))
    }

    /// Fingerprint an enum variant.
    pub fn variant(
        &mut self,
        name: &'static str,
        fields: &[(&'static str, &dyn Fingerprint)],
    ) -> Shape {
        Shape::Variant(name, self.fields(fields))
    }

    /// Visit a list of named fields.
    fn fields(&mut self, fields: &[(&'static str, &dyn Fingerprint)]) -> Vec<(&'static str, Shape)> {
        fields
            .iter()
            .map(|(name, v)| (*name, self.visit(*v)))
            .collect()
    }
}

/// Compute the fingerprint of a value. Fails if the value nests deeper than
/// [`MAX_DEPTH`], which in practice means it contains a reference cycle.
pub fn fingerprint<T: Fingerprint + ?Sized>(v: &T) -> Result<Shape> {
    let mut fp = Fingerprinter::default();
    let shape = fp.visit(v);
    if fp.overflowed {
        return Err(Error::Fingerprint(MAX_DEPTH));
    }
    Ok(shape)
}

/// Fingerprint a value through its `Debug` representation. Used by
/// `#[fingerprint(debug)]` for field types that have no structural
/// implementation.
pub struct DebugShape<'a, T: Debug + ?Sized>(pub &'a T);

impl<T: Debug + ?Sized> Fingerprint for DebugShape<'_, T> {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Opaque(format!("{:?}", self.0))
    }
}

/// Integer implementations.
macro_rules! int_shape {
    ($($t:ty),*) => {
        $(
            impl Fingerprint for $t {
                fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
                    Shape::Int(i128::from(*self))
                }
            }
        )*
    };
}

int_shape!(u8, u16, u32, u64, i8, i16, i32, i64, i128);

impl Fingerprint for usize {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Int(*self as i128)
    }
}

impl Fingerprint for isize {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Int(*self as i128)
    }
}

impl Fingerprint for u128 {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        match i128::try_from(*self) {
            Ok(v) => Shape::Int(v),
            Err(_) => Shape::Opaque(self.to_string()),
        }
    }
}

/// Floats have no total equality, so they take the textual fallback.
macro_rules! float_shape {
    ($($t:ty),*) => {
        $(
            impl Fingerprint for $t {
                fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
                    Shape::Opaque(format!("{self:?}"))
                }
            }
        )*
    };
}

float_shape!(f32, f64);

impl Fingerprint for bool {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Bool(*self)
    }
}

impl Fingerprint for char {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Char(*self)
    }
}

impl Fingerprint for () {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Unit
    }
}

impl Fingerprint for str {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Text(self.to_string())
    }
}

impl Fingerprint for String {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Text(self.clone())
    }
}

impl Fingerprint for Path {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Text(self.to_string_lossy().into_owned())
    }
}

impl Fingerprint for PathBuf {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        self.as_path().shape(fp)
    }
}

impl Fingerprint for Duration {
    fn shape(&self, _fp: &mut Fingerprinter) -> Shape {
        Shape::Int(self.as_nanos() as i128)
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for &T {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        (**self).shape(fp)
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for Box<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.visit(&**self)
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for Rc<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.visit(&**self)
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for Arc<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.visit(&**self)
    }
}

impl<T: Fingerprint + Copy> Fingerprint for Cell<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.visit(&self.get())
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for RefCell<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        match self.try_borrow() {
            Ok(v) => fp.visit(&*v),
            Err(_) => Shape::Opaque("<mutably borrowed>".into()),
        }
    }
}

impl<T: Fingerprint> Fingerprint for Option<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        match self {
            None => fp.variant("None", &[]),
            Some(v) => fp.variant("Some", &[("0", v as &dyn Fingerprint)]),
        }
    }
}

impl<T: Fingerprint> Fingerprint for [T] {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.seq(self)
    }
}

impl<T: Fingerprint, const N: usize> Fingerprint for [T; N] {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.seq(self)
    }
}

impl<T: Fingerprint> Fingerprint for Vec<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.seq(self)
    }
}

impl<T: Fingerprint> Fingerprint for VecDeque<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.seq(self)
    }
}

impl<T: Fingerprint, S> Fingerprint for HashSet<T, S> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.set(self)
    }
}

impl<T: Fingerprint> Fingerprint for BTreeSet<T> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.set(self)
    }
}

impl<K: Fingerprint, V: Fingerprint, S> Fingerprint for HashMap<K, V, S> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.map(self)
    }
}

impl<K: Fingerprint, V: Fingerprint> Fingerprint for BTreeMap<K, V> {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.map(self)
    }
}

/// Tuple implementations, fingerprinted as sequences.
macro_rules! tuple_shape {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Fingerprint),+> Fingerprint for ($($name,)+) {
            fn shape(&self, fp: &mut Fingerprinter) -> Shape {
                Shape::Seq(vec![$(fp.visit(&self.$idx)),+])
            }
        }
    };
}

tuple_shape!(A: 0);
tuple_shape!(A: 0, B: 1);
tuple_shape!(A: 0, B: 1, C: 2);
tuple_shape!(A: 0, B: 1, C: 2, D: 3);
tuple_shape!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_shape!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl Fingerprint for Point {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.composite(&[("x", &self.x), ("y", &self.y)])
    }
}

impl Fingerprint for Geometry {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        fp.composite(&[
            ("width", &self.width),
            ("height", &self.height),
            ("x", &self.x),
            ("y", &self.y),
        ])
    }
}

/// Images are reduced to their dimensions and a hash of their pixels.
impl Fingerprint for image::DynamicImage {
    fn shape(&self, fp: &mut Fingerprinter) -> Shape {
        let mut h = DefaultHasher::new();
        self.as_bytes().hash(&mut h);
        let pixels = h.finish();
        fp.composite(&[
            ("width", &self.width()),
            ("height", &self.height()),
            ("pixels", &pixels),
        ])
    }
}

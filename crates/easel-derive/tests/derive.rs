//! Derive macro integration tests.

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::BTreeMap};

    use easel::{
        error::Result,
        fingerprint::{Fingerprint, Shape, fingerprint},
    };
    use pretty_assertions::assert_eq;

    #[derive(Fingerprint)]
    struct Named {
        a: u8,
        #[fingerprint(skip)]
        _b: String,
        r#type: bool,
    }

    #[derive(Fingerprint)]
    struct Tuple(i32, #[fingerprint(skip)] i32);

    #[derive(Fingerprint)]
    struct Unit;

    #[derive(Fingerprint)]
    struct Generic<T> {
        items: Vec<T>,
    }

    #[derive(Debug)]
    struct Handle(u32);

    #[derive(Fingerprint)]
    enum Tool {
        Pen,
        Brush { size: u8, #[fingerprint(skip)] _worn: bool },
        Stamp(#[fingerprint(debug)] Handle),
    }

    #[derive(Fingerprint)]
    struct Counter {
        clicks: Cell<u32>,
        fp: BTreeMap<String, u8>,
    }

    #[test]
    fn named_fields() -> Result<()> {
        let v = Named {
            a: 1,
            _b: "ignored".into(),
            r#type: true,
        };
        assert_eq!(
            fingerprint(&v)?,
            Shape::Composite(vec![("a", Shape::Int(1)), ("type", Shape::Bool(true))])
        );
        Ok(())
    }

    #[test]
    fn tuple_and_unit() -> Result<()> {
        assert_eq!(
            fingerprint(&Tuple(4, 5))?,
            Shape::Composite(vec![("0", Shape::Int(4))])
        );
        assert_eq!(fingerprint(&Tuple(4, 5))?, fingerprint(&Tuple(4, 6))?);
        assert_eq!(fingerprint(&Unit)?, Shape::Composite(vec![]));
        Ok(())
    }

    #[test]
    fn generics() -> Result<()> {
        let a = Generic { items: vec!["x"] };
        let b = Generic { items: vec!["y"] };
        assert!(fingerprint(&a)? != fingerprint(&b)?);
        Ok(())
    }

    #[test]
    fn enums() -> Result<()> {
        assert_eq!(fingerprint(&Tool::Pen)?, Shape::Variant("Pen", vec![]));
        assert_eq!(
            fingerprint(&Tool::Brush {
                size: 3,
                _worn: true
            })?,
            Shape::Variant("Brush", vec![("size", Shape::Int(3))])
        );
        assert_eq!(
            fingerprint(&Tool::Stamp(Handle(7)))?,
            Shape::Variant("Stamp", vec![("0", Shape::Opaque("Handle(7)".into()))])
        );
        Ok(())
    }

    #[test]
    fn interior_change() -> Result<()> {
        let c = Counter {
            clicks: Cell::new(0),
            fp: BTreeMap::new(),
        };
        let before = fingerprint(&c)?;
        c.clicks.set(1);
        assert!(before != fingerprint(&c)?);
        Ok(())
    }
}

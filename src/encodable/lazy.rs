//! Single-pass lazy sequences.

use std::cell::RefCell;
use std::fmt;

use super::{Encodable, Shape, ValueRef};
use crate::types::{BoxError, Error, Result};

type Source = Box<dyn Iterator<Item = Result<Box<dyn Encodable>>>>;

/// A sequence produced on demand, like a generator.
///
/// Items are pulled only while the encoder drains the sequence. Draining
/// consumes the source: a second encode of the same `LazySeq` yields `[]`.
pub struct LazySeq {
    source: RefCell<Option<Source>>,
}

impl LazySeq {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
        T: Encodable,
    {
        let source: Source = Box::new(
            items
                .into_iter()
                .map(|item| -> Result<Box<dyn Encodable>> { Ok(Box::new(item)) }),
        );
        Self {
            source: RefCell::new(Some(source)),
        }
    }

    /// Sequence whose source can fail mid-way. The first error aborts encoding.
    pub fn fallible<I, T, E>(items: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<T, E>>,
        I::IntoIter: 'static,
        T: Encodable,
        E: Into<BoxError> + 'static,
    {
        let source: Source = Box::new(items.into_iter().map(
            |item| -> Result<Box<dyn Encodable>> {
                match item {
                    Ok(value) => Ok(Box::new(value)),
                    Err(err) => Err(Error::iteration(err)),
                }
            },
        ));
        Self {
            source: RefCell::new(Some(source)),
        }
    }

    /// True once the source has been fully drained.
    pub fn is_exhausted(&self) -> bool {
        self.source.borrow().is_none()
    }
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySeq")
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

impl Encodable for LazySeq {
    fn shape(&self) -> Shape<'_> {
        Shape::Sequence(Box::new(Drain {
            source: &self.source,
        }))
    }
}

/// Pulls one item per `next()`; the cell is only borrowed inside `next()`.
struct Drain<'a> {
    source: &'a RefCell<Option<Source>>,
}

impl<'a> Iterator for Drain<'a> {
    type Item = Result<ValueRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut slot = self.source.borrow_mut();
        let next = slot.as_mut()?.next();
        if next.is_none() {
            *slot = None;
        }
        next.map(|item| item.map(ValueRef::Owned))
    }
}

//! The describe capability
//!
//! [`Describe`] is how a value tells the reader what it looks like. Each call
//! returns a [`Shape`] from a small closed set; the reader never inspects a
//! value any other way.
//!
//! # Borrowed and owned members
//!
//! Members are normally borrowed from the described value ([`Value::Ref`]).
//! Containers that cannot hand out a borrow beyond a guard (`RefCell`,
//! `Mutex`, `Weak`, ...) forward to an owned snapshot instead
//! ([`Value::Owned`]). Snapshots of `Rc`/`Arc` handles keep pointing at the
//! same allocation, so reference identity survives the copy.

use crate::classify::{ShapeKind, TypeKey};
use crate::value::LeafValue;
use std::rc::Rc;

/// A value the reader can snapshot
///
/// Implement with [`describe_struct!`](crate::describe_struct) or
/// [`describe_leaf!`](crate::describe_leaf) for most types.
///
/// # Contract
/// - `describe` must list members in a stable (declaration) order
/// - `kind` must agree with the shape `describe` returns
pub trait Describe: 'static {
    /// Describe this value's shape
    fn describe(&self) -> Shape<'_>;

    /// Shape kind, without building members
    ///
    /// Override when `describe` allocates.
    fn kind(&self) -> ShapeKind {
        self.describe().kind()
    }

    /// Runtime type identity
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Self>()
    }

    /// Reference identity (the value's address)
    fn identity(&self) -> usize {
        (self as *const Self).cast::<()>() as usize
    }

    /// Leaf snapshot used when the type is registered as terminal
    ///
    /// Defaults to `None`: a terminal type without a snapshot reads as an
    /// opaque leaf and always compares equal to another opaque leaf of the
    /// same type.
    fn terminal_value(&self) -> Option<LeafValue> {
        None
    }
}

/// Handle to a member value
pub enum Value<'a> {
    /// Borrowed from the described value
    Ref(&'a dyn Describe),
    /// Owned snapshot (guarded or weak content)
    Owned(Rc<dyn Describe>),
}

impl<'a> Value<'a> {
    /// Borrow a describable value
    #[inline]
    #[must_use]
    pub fn of<T: Describe>(value: &'a T) -> Self {
        Self::Ref(value)
    }

    /// Take an owned snapshot
    #[inline]
    #[must_use]
    pub fn owned<T: Describe>(value: T) -> Self {
        Self::Owned(Rc::new(value))
    }

    /// Access the value
    #[inline]
    #[must_use]
    pub fn get(&self) -> &dyn Describe {
        match self {
            Self::Ref(value) => *value,
            Self::Owned(value) => &**value,
        }
    }
}

/// Named struct member
pub struct Field<'a> {
    /// Member name
    pub name: &'static str,
    /// Member value
    pub value: Value<'a>,
    /// Format hint for renderers
    pub format: Option<&'static str>,
}

impl<'a> Field<'a> {
    /// Borrowed member
    #[inline]
    #[must_use]
    pub fn new<T: Describe>(name: &'static str, value: &'a T) -> Self {
        Self {
            name,
            value: Value::Ref(value),
            format: None,
        }
    }

    /// Attach a format hint
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }
}

/// What a value looks like
pub enum Shape<'a> {
    /// Absent value
    Null,
    /// Scalar snapshot
    Leaf(LeafValue),
    /// Ordered elements
    Sequence(Vec<Value<'a>>),
    /// Key/value entries, keys already stringified
    Mapping(Vec<(String, Value<'a>)>),
    /// Named members in declaration order
    Struct(Vec<Field<'a>>),
    /// This value is represented by another one (wrappers, cells, pointers)
    Forward(Value<'a>),
}

impl Shape<'_> {
    /// Kind of this shape, following forwards
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Null => ShapeKind::Null,
            Self::Leaf(_) => ShapeKind::Leaf,
            Self::Sequence(_) => ShapeKind::Sequence,
            Self::Mapping(_) => ShapeKind::Mapping,
            Self::Struct(_) => ShapeKind::Struct,
            Self::Forward(value) => value.get().kind(),
        }
    }

    /// Number of members (0 for null, leaves and forwards)
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(items) => items.len(),
            Self::Mapping(entries) => entries.len(),
            Self::Struct(fields) => fields.len(),
            Self::Null | Self::Leaf(_) | Self::Forward(_) => 0,
        }
    }

    /// Whether the shape has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> Shape<'a> {
    /// Take the member at `index`, or the forward target when `index` is
    /// `None`
    pub(crate) fn into_member(self, index: Option<usize>) -> Option<Value<'a>> {
        match (self, index) {
            (Shape::Forward(value), None) => Some(value),
            (Shape::Sequence(items), Some(i)) => items.into_iter().nth(i),
            (Shape::Mapping(entries), Some(i)) => entries.into_iter().nth(i).map(|(_, v)| v),
            (Shape::Struct(fields), Some(i)) => fields.into_iter().nth(i).map(|f| f.value),
            _ => None,
        }
    }
}

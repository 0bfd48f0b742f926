//! Leaf value snapshots
//!
//! Provides [`LeafValue`], a cheap-to-clone, type-erased copy of a leaf taken
//! during a read, and [`Formatting`], the display hints attached to it.

use serde::{Serialize, Serializer};
use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// Type-erased leaf data
///
/// Implemented for every `Debug + PartialEq + Send + Sync + 'static` type.
pub trait LeafData: Any + Debug + Send + Sync {
    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Equality against another leaf; values of different types are unequal
    fn eq_leaf(&self, other: &dyn LeafData) -> bool;
}

impl<T> LeafData for T
where
    T: Any + Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_leaf(&self, other: &dyn LeafData) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Snapshot of a leaf value
#[derive(Clone)]
pub struct LeafValue(Arc<dyn LeafData>);

impl LeafValue {
    /// Wrap a value
    #[inline]
    #[must_use]
    pub fn new<T: LeafData>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the erased data
    #[inline]
    #[must_use]
    pub fn data(&self) -> &dyn LeafData {
        &*self.0
    }

    /// Type id of the wrapped value
    #[inline]
    #[must_use]
    pub fn value_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    /// Downcast to the concrete value
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Default text rendering: text verbatim, everything else via `Debug`
    #[must_use]
    pub fn render(&self) -> String {
        let any = self.0.as_any();
        if let Some(text) = any.downcast_ref::<String>() {
            return text.clone();
        }
        if let Some(text) = any.downcast_ref::<&'static str>() {
            return (*text).to_string();
        }
        format!("{:?}", self.0)
    }
}

impl PartialEq for LeafValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_leaf(other.data())
    }
}

impl Debug for LeafValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Display for LeafValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for LeafValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

/// Value-to-text function supplied by configuration
pub type FormatterFn = Arc<dyn Fn(&LeafValue) -> String + Send + Sync>;

/// Display hints carried alongside a value
///
/// `format` is an opaque hint handed to renderers; `formatter`, when set,
/// replaces the default rendering.
#[derive(Clone, Default)]
pub struct Formatting {
    format: Option<Arc<str>>,
    formatter: Option<FormatterFn>,
}

impl Formatting {
    /// No hints
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// With a format hint
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: impl Into<Arc<str>>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// With a formatter function
    #[inline]
    #[must_use]
    pub fn with_formatter(mut self, formatter: FormatterFn) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Format hint
    #[inline]
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Formatter function
    #[inline]
    #[must_use]
    pub fn formatter(&self) -> Option<&FormatterFn> {
        self.formatter.as_ref()
    }

    /// Whether no hint is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.formatter.is_none()
    }

    /// Fill unset hints from `fallback`
    #[must_use]
    pub fn or(mut self, fallback: &Formatting) -> Self {
        if self.format.is_none() {
            self.format.clone_from(&fallback.format);
        }
        if self.formatter.is_none() {
            self.formatter.clone_from(&fallback.formatter);
        }
        self
    }

    /// Render a value (absent values render as `null`)
    #[must_use]
    pub fn render(&self, value: Option<&LeafValue>) -> String {
        match (value, &self.formatter) {
            (None, _) => "null".to_string(),
            (Some(value), Some(formatter)) => formatter(value),
            (Some(value), None) => value.render(),
        }
    }
}

impl Debug for Formatting {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatting")
            .field("format", &self.format)
            .field("formatter", &self.formatter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

//! Value classification
//!
//! Provides [`TypeKey`] (runtime type identity), [`ShapeKind`] and the
//! [`ValueClassifier`] that decides whether a value is read as a leaf.

use crate::describe::Describe;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime type identity of a described value
///
/// Equality and hashing use the [`TypeId`] only; the full type name is kept
/// for display.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Type key of `T`
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, as reported by the compiler
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> &'static str {
        self.name
    }

    /// Display name with module paths stripped, generic arguments kept
    ///
    /// `alloc::vec::Vec<my_app::Invoice>` renders as `Vec<Invoice>`.
    #[must_use]
    pub fn display_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Strip module paths from every path segment of a type name
fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut token = String::new();

    for ch in full.chars() {
        if ch == ':' {
            // `a::b` keeps only the last segment
            token.clear();
        } else if ch.is_alphanumeric() || ch == '_' {
            token.push(ch);
        } else {
            out.push_str(&token);
            token.clear();
            out.push(ch);
        }
    }
    out.push_str(&token);
    out
}

/// The closed set of shapes a value can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Absent value
    Null,
    /// Not decomposed further
    Leaf,
    /// Ordered elements, named `[i]`
    Sequence,
    /// Key/value entries, named by the stringified key
    Mapping,
    /// Named members in declaration order
    Struct,
}

impl ShapeKind {
    /// Whether values of this kind have members
    #[inline]
    #[must_use]
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Sequence | Self::Mapping | Self::Struct)
    }
}

/// Decides whether a value is read as a leaf
///
/// A value is a leaf when its own shape is a leaf (numbers, text, dates and
/// other scalar types describe themselves that way) or when its type was
/// registered as terminal. Display names are resolved once per type and
/// cached.
#[derive(Debug, Default)]
pub struct ValueClassifier {
    terminal: HashSet<TypeId>,
    names: DashMap<TypeId, Arc<str>>,
}

impl ValueClassifier {
    /// Create classifier with the given terminal types
    #[must_use]
    pub fn new(terminal: HashSet<TypeId>) -> Self {
        Self {
            terminal,
            names: DashMap::new(),
        }
    }

    /// Whether the type was registered as terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(&self, key: &TypeKey) -> bool {
        self.terminal.contains(&key.id())
    }

    /// Whether `value` is read without descending into members
    #[must_use]
    pub fn is_leaf(&self, value: &dyn Describe) -> bool {
        self.is_terminal(&value.type_key()) || !value.kind().is_structured()
    }

    /// Cached display name for a type
    #[must_use]
    pub fn display_name(&self, key: &TypeKey) -> Arc<str> {
        if let Some(name) = self.names.get(&key.id()) {
            return Arc::clone(name.value());
        }
        let name: Arc<str> = Arc::from(key.display_name());
        self.names.insert(key.id(), Arc::clone(&name));
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Invoice;

    #[test]
    fn short_name_strips_paths() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(short_type_name("i32"), "i32");
    }

    #[test]
    fn short_name_renders_generic_arguments() {
        assert_eq!(
            short_type_name("alloc::vec::Vec<core::option::Option<app::model::Invoice>>"),
            "Vec<Option<Invoice>>"
        );
        assert_eq!(
            short_type_name("std::collections::hash::map::HashMap<alloc::string::String, i32>"),
            "HashMap<String, i32>"
        );
        assert_eq!(short_type_name("(i32, &str)"), "(i32, &str)");
    }

    #[test]
    fn type_key_equality_uses_type_id() {
        assert_eq!(TypeKey::of::<i32>(), TypeKey::of::<i32>());
        assert_ne!(TypeKey::of::<i32>(), TypeKey::of::<i64>());
        assert_eq!(
            TypeKey::of::<HashMap<String, Vec<Invoice>>>().to_string(),
            "HashMap<String, Vec<Invoice>>"
        );
    }

    #[test]
    fn classifier_terminal_types() {
        let mut terminal = HashSet::new();
        terminal.insert(TypeId::of::<Vec<u8>>());
        let classifier = ValueClassifier::new(terminal);

        assert!(classifier.is_leaf(&vec![1u8, 2, 3]));
        assert!(!classifier.is_leaf(&vec![1u16, 2, 3]));
        assert!(classifier.is_leaf(&42_i32));
        assert!(classifier.is_leaf(&String::from("text")));
    }

    #[test]
    fn classifier_caches_display_names() {
        let classifier = ValueClassifier::default();
        let key = TypeKey::of::<Vec<Invoice>>();

        let first = classifier.display_name(&key);
        let second = classifier.display_name(&key);
        assert_eq!(&*first, "Vec<Invoice>");
        assert!(Arc::ptr_eq(&first, &second));
    }
}

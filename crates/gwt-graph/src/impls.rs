//! Built-in [`Describe`] implementations
//!
//! Scalars, text and date/time types are leaves. Collections are sequences or
//! mappings. Pointers, `Option` and cells forward to their content.

use crate::classify::ShapeKind;
use crate::describe::{Describe, Shape, Value};
use crate::value::LeafValue;
use crate::{describe_leaf, Field};
use indexmap::IndexMap;
use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::rc::{Rc, Weak as RcWeak};
use std::sync::{Arc, Mutex, OnceLock, RwLock, TryLockError, Weak as ArcWeak};
use std::time::{Duration, SystemTime};

describe_leaf!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    String, &'static str, (),
);

describe_leaf!(Duration, SystemTime);

describe_leaf!(
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::NaiveTime,
    chrono::TimeDelta,
);

/// Placeholder leaf for content that cannot be borrowed right now
fn unavailable(reason: &'static str) -> Shape<'static> {
    Shape::Leaf(LeafValue::new(reason))
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

fn sequence<'a, T: Describe>(items: impl Iterator<Item = &'a T>) -> Shape<'a> {
    Shape::Sequence(items.map(Value::of).collect())
}

impl<T: Describe> Describe for Vec<T> {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Sequence
    }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Sequence
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Sequence
    }
}

impl<T: Describe + Ord> Describe for BTreeSet<T> {
    fn describe(&self) -> Shape<'_> {
        sequence(self.iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Sequence
    }
}

/// Elements sorted, so two equal sets read identically
impl<T: Describe + Ord, S: 'static> Describe for HashSet<T, S> {
    fn describe(&self) -> Shape<'_> {
        let mut items: Vec<&T> = self.iter().collect();
        items.sort();
        sequence(items.into_iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Sequence
    }
}

macro_rules! describe_tuple {
    ($(($($name:tt $idx:tt),+)),+ $(,)?) => {
        $(
            impl<$($name: Describe),+> Describe for ($($name,)+) {
                fn describe(&self) -> Shape<'_> {
                    Shape::Struct(vec![
                        $(Field::new(stringify!($idx), &self.$idx)),+
                    ])
                }

                fn kind(&self) -> ShapeKind {
                    ShapeKind::Struct
                }
            }
        )+
    };
}

describe_tuple!((A 0, B 1), (A 0, B 1, C 2), (A 0, B 1, C 2, D 3));

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

fn mapping<'a, K: Display + 'a, V: Describe>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Shape<'a> {
    Shape::Mapping(entries.map(|(k, v)| (k.to_string(), Value::of(v))).collect())
}

impl<K: Display + 'static, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(&self) -> Shape<'_> {
        mapping(self.iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Mapping
    }
}

impl<K: Display + 'static, V: Describe, S: 'static> Describe for IndexMap<K, V, S> {
    fn describe(&self) -> Shape<'_> {
        mapping(self.iter())
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Mapping
    }
}

/// Entries are snapshot and sorted by their stringified key
impl<K: Display + 'static, V: Describe, S: 'static> Describe for HashMap<K, V, S> {
    fn describe(&self) -> Shape<'_> {
        let mut entries: Vec<(String, Value<'_>)> = self
            .iter()
            .map(|(k, v)| (k.to_string(), Value::of(v)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Shape::Mapping(entries)
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Mapping
    }
}

// ---------------------------------------------------------------------------
// Wrappers
// ---------------------------------------------------------------------------

impl<T: Describe> Describe for Option<T> {
    fn describe(&self) -> Shape<'_> {
        match self {
            Some(value) => Shape::Forward(Value::of(value)),
            None => Shape::Null,
        }
    }

    fn kind(&self) -> ShapeKind {
        self.as_ref().map_or(ShapeKind::Null, |value| value.kind())
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe(&self) -> Shape<'_> {
        Shape::Forward(Value::of(&**self))
    }

    fn kind(&self) -> ShapeKind {
        (**self).kind()
    }
}

impl Describe for Box<dyn Describe> {
    fn describe(&self) -> Shape<'_> {
        Shape::Forward(Value::Ref(&**self))
    }

    fn kind(&self) -> ShapeKind {
        (**self).kind()
    }
}

impl<T: Describe> Describe for Rc<T> {
    fn describe(&self) -> Shape<'_> {
        Shape::Forward(Value::of(&**self))
    }

    fn kind(&self) -> ShapeKind {
        (**self).kind()
    }
}

impl<T: Describe> Describe for Arc<T> {
    fn describe(&self) -> Shape<'_> {
        Shape::Forward(Value::of(&**self))
    }

    fn kind(&self) -> ShapeKind {
        (**self).kind()
    }
}

impl<T: Describe> Describe for RcWeak<T> {
    fn describe(&self) -> Shape<'_> {
        match self.upgrade() {
            Some(strong) => Shape::Forward(Value::Owned(strong)),
            None => Shape::Null,
        }
    }
}

impl<T: Describe> Describe for ArcWeak<T> {
    fn describe(&self) -> Shape<'_> {
        match self.upgrade() {
            Some(strong) => Shape::Forward(Value::owned(strong)),
            None => Shape::Null,
        }
    }
}

impl<T: Describe> Describe for OnceCell<T> {
    fn describe(&self) -> Shape<'_> {
        match self.get() {
            Some(value) => Shape::Forward(Value::of(value)),
            None => Shape::Null,
        }
    }
}

impl<T: Describe> Describe for OnceLock<T> {
    fn describe(&self) -> Shape<'_> {
        match self.get() {
            Some(value) => Shape::Forward(Value::of(value)),
            None => Shape::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Cells and locks: forward to an owned clone of the content
// ---------------------------------------------------------------------------

impl<T: Describe + Clone> Describe for RefCell<T> {
    fn describe(&self) -> Shape<'_> {
        match self.try_borrow() {
            Ok(inner) => Shape::Forward(Value::owned(inner.clone())),
            Err(_) => unavailable("<mutably borrowed>"),
        }
    }
}

impl<T: Describe + Clone> Describe for Mutex<T> {
    fn describe(&self) -> Shape<'_> {
        match self.try_lock() {
            Ok(inner) => Shape::Forward(Value::owned(inner.clone())),
            Err(TryLockError::Poisoned(poisoned)) => {
                Shape::Forward(Value::owned(poisoned.into_inner().clone()))
            }
            Err(TryLockError::WouldBlock) => unavailable("<locked>"),
        }
    }
}

impl<T: Describe + Clone> Describe for RwLock<T> {
    fn describe(&self) -> Shape<'_> {
        match self.try_read() {
            Ok(inner) => Shape::Forward(Value::owned(inner.clone())),
            Err(TryLockError::Poisoned(poisoned)) => {
                Shape::Forward(Value::owned(poisoned.into_inner().clone()))
            }
            Err(TryLockError::WouldBlock) => unavailable("<locked>"),
        }
    }
}

impl<T: Describe + Clone> Describe for parking_lot::Mutex<T> {
    fn describe(&self) -> Shape<'_> {
        match self.try_lock() {
            Some(inner) => Shape::Forward(Value::owned(inner.clone())),
            None => unavailable("<locked>"),
        }
    }
}

impl<T: Describe + Clone> Describe for parking_lot::RwLock<T> {
    fn describe(&self) -> Shape<'_> {
        match self.try_read() {
            Some(inner) => Shape::Forward(Value::owned(inner.clone())),
            None => unavailable("<locked>"),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON documents
// ---------------------------------------------------------------------------

/// Numbers snapshot as `i64`, `u64` or `f64`, whichever holds them
fn json_number(number: &serde_json::Number) -> LeafValue {
    if let Some(value) = number.as_i64() {
        LeafValue::new(value)
    } else if let Some(value) = number.as_u64() {
        LeafValue::new(value)
    } else {
        number
            .as_f64()
            .map_or_else(|| LeafValue::new(number.to_string()), LeafValue::new)
    }
}

impl Describe for serde_json::Value {
    fn describe(&self) -> Shape<'_> {
        use serde_json::Value as Json;

        match self {
            Json::Null => Shape::Null,
            Json::Bool(b) => Shape::Leaf(LeafValue::new(*b)),
            Json::Number(n) => Shape::Leaf(json_number(n)),
            Json::String(s) => Shape::Leaf(LeafValue::new(s.clone())),
            Json::Array(items) => sequence(items.iter()),
            Json::Object(map) => mapping(map.iter()),
        }
    }

    fn kind(&self) -> ShapeKind {
        use serde_json::Value as Json;

        match self {
            Json::Null => ShapeKind::Null,
            Json::Bool(_) | Json::Number(_) | Json::String(_) => ShapeKind::Leaf,
            Json::Array(_) => ShapeKind::Sequence,
            Json::Object(_) => ShapeKind::Mapping,
        }
    }
}

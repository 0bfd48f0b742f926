//! Structural comparer
//!
//! Walks an expected and an actual snapshot in lock-step. The expected tree
//! drives the walk: children are paired by position, and a type or shape
//! divergence is reported as one [`Mismatch`](crate::Outcome::Mismatch) at
//! the point where it happens, without descending further.

use crate::detail::Detail;
use crate::entry::{ReportEntry, Then};
use crate::error::{CompareError, Side};
use gwt_graph::{Describe, Formatting, LeafValue, ReadResult, Reader};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// Leaf equality for one type
pub type EqualityFn = Arc<dyn Fn(&LeafValue, &LeafValue) -> bool + Send + Sync>;

/// Shown for the side whose graph closed a cycle where the other side did not
pub const CYCLE_MARKER: &str = "<cycle>";

/// Compares snapshots into diff trees
///
/// Stateless between calls; share one comparer across threads.
pub struct Comparer {
    reader: Reader,
    equality: HashMap<TypeId, EqualityFn>,
}

impl Comparer {
    /// Create comparer reading with `reader`
    ///
    /// Floats compare NaN equal to NaN, so a value always matches itself.
    #[must_use]
    pub fn new(reader: Reader) -> Self {
        Self {
            reader,
            equality: HashMap::new(),
        }
        .with_equality::<f32, _>(|a, b| a == b || (a.is_nan() && b.is_nan()))
        .with_equality::<f64, _>(|a, b| a == b || (a.is_nan() && b.is_nan()))
    }

    /// Use `equals` for leaves of type `T` instead of `PartialEq`
    ///
    /// Replaces any earlier equality for `T`, the float defaults included.
    #[must_use]
    pub fn with_equality<T, F>(mut self, equals: F) -> Self
    where
        T: Any,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let equality: EqualityFn = Arc::new(move |expected: &LeafValue, actual: &LeafValue| {
            match (expected.downcast_ref::<T>(), actual.downcast_ref::<T>()) {
                (Some(expected), Some(actual)) => equals(expected, actual),
                _ => expected == actual,
            }
        });
        self.equality.insert(TypeId::of::<T>(), equality);
        self
    }

    /// Reader used for both sides
    #[inline]
    #[must_use]
    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    /// Read both values and compare them
    ///
    /// # Errors
    /// [`CompareError::GraphTooLarge`] when either value cannot be read.
    pub fn compare<E, A>(
        &self,
        scope: Option<&str>,
        expected: &E,
        actual: &A,
    ) -> Result<Then, CompareError>
    where
        E: Describe,
        A: Describe,
    {
        self.compare_dyn(scope, expected, actual)
    }

    /// Type-erased [`compare`](Self::compare)
    ///
    /// # Errors
    /// [`CompareError::GraphTooLarge`] when either value cannot be read.
    pub fn compare_dyn(
        &self,
        scope: Option<&str>,
        expected: &dyn Describe,
        actual: &dyn Describe,
    ) -> Result<Then, CompareError> {
        let expected = self
            .reader
            .read_dyn(expected)
            .map_err(|source| CompareError::GraphTooLarge {
                side: Side::Expected,
                source,
            })?;
        let actual = self
            .reader
            .read_dyn(actual)
            .map_err(|source| CompareError::GraphTooLarge {
                side: Side::Actual,
                source,
            })?;
        Ok(self.compare_results(scope, &expected, &actual))
    }

    /// Compare two snapshots
    ///
    /// A structured root contributes its members as the entry's details; a
    /// leaf or divergent root is the single detail.
    #[must_use]
    pub fn compare_results(
        &self,
        scope: Option<&str>,
        expected: &ReadResult,
        actual: &ReadResult,
    ) -> Then {
        let (mut root, descended) = self.diff_tree(expected, actual);
        let details = if descended {
            root.take_children()
        } else {
            vec![root]
        };

        let then = Then::new(expected.type_name(), scope.map(str::to_string), details);
        tracing::debug!(
            title = then.title(),
            scope = ?scope,
            success = then.is_success(),
            "comparison finished"
        );
        then
    }

    /// Diff two snapshots into a single tree rooted at the expected node
    #[must_use]
    pub fn diff(&self, expected: &ReadResult, actual: &ReadResult) -> Detail {
        self.diff_tree(expected, actual).0
    }

    fn diff_tree(&self, expected: &ReadResult, actual: &ReadResult) -> (Detail, bool) {
        let mut slots = vec![Slot::Pending];
        let mut stack = vec![(expected, Some(actual), 0)];
        let mut root_descended = false;

        while let Some((expected, actual, slot)) = stack.pop() {
            let actual = match (self.step(expected, actual), actual) {
                (Step::Done(detail), _) => {
                    slots[slot] = Slot::Done(detail);
                    continue;
                }
                (Step::Descend, Some(actual)) => actual,
                // descending always has an actual side
                (Step::Descend, None) => {
                    slots[slot] = Slot::Done(one_sided(expected, Side::Expected));
                    continue;
                }
            };
            root_descended |= slot == 0;

            let mut children = Vec::with_capacity(expected.properties().len());
            for (index, child) in expected.properties().iter().enumerate() {
                let child_slot = slots.len();
                slots.push(Slot::Pending);
                children.push(child_slot);
                stack.push((child, actual.properties().get(index), child_slot));
            }
            for surplus in actual.properties().iter().skip(expected.properties().len()) {
                children.push(slots.len());
                slots.push(Slot::Done(one_sided(surplus, Side::Actual)));
            }

            slots[slot] = Slot::Group {
                name: expected.name().to_string(),
                formatting: expected.formatting().clone(),
                children,
            };
        }

        (assemble(slots, expected), root_descended)
    }

    /// Compare one pair without looking at children
    fn step(&self, expected: &ReadResult, actual: Option<&ReadResult>) -> Step {
        let Some(actual) = actual else {
            return Step::Done(one_sided(expected, Side::Expected));
        };

        if expected.is_null() || actual.is_null() {
            let detail = if expected.is_null() && actual.is_null() {
                Detail::matched(expected.name(), None)
                    .with_formatting(expected.formatting().clone())
            } else {
                divergence(expected, actual)
            };
            return Step::Done(detail);
        }

        if expected.type_key() != actual.type_key() {
            return Step::Done(Detail::mismatch(
                expected.name(),
                Some(type_leaf(expected)),
                Some(type_leaf(actual)),
            ));
        }

        // a truncated node only matches where the other side closed a cycle too
        match (expected.is_truncated(), actual.is_truncated()) {
            (true, true) => {
                return Step::Done(
                    Detail::matched(expected.name(), None)
                        .with_formatting(expected.formatting().clone()),
                );
            }
            (true, false) | (false, true) => return Step::Done(divergence(expected, actual)),
            (false, false) => {}
        }

        match (is_structured(expected), is_structured(actual)) {
            (true, true) => Step::Descend,
            (false, false) => Step::Done(self.compare_leaves(expected, actual)),
            _ => Step::Done(divergence(expected, actual)),
        }
    }

    fn compare_leaves(&self, expected: &ReadResult, actual: &ReadResult) -> Detail {
        let equal = match (expected.value(), actual.value()) {
            (Some(left), Some(right)) => match self
                .equality
                .get(&expected.type_key().id())
                .or_else(|| self.equality.get(&left.value_type_id()))
            {
                Some(equals) => equals(left, right),
                None => left == right,
            },
            (None, None) => true,
            _ => false,
        };

        let detail = if equal {
            Detail::matched(expected.name(), expected.value().cloned())
        } else {
            Detail::mismatch(
                expected.name(),
                expected.value().cloned(),
                actual.value().cloned(),
            )
        };
        detail.with_formatting(expected.formatting().clone())
    }
}

impl Default for Comparer {
    fn default() -> Self {
        Self::new(Reader::default())
    }
}

impl Debug for Comparer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparer")
            .field("reader", &self.reader)
            .field("custom_equality", &self.equality.len())
            .finish()
    }
}

enum Step {
    Done(Detail),
    Descend,
}

enum Slot {
    Pending,
    Done(Detail),
    Group {
        name: String,
        formatting: Formatting,
        children: Vec<usize>,
    },
}

/// Build the tree from slots; children always follow their parent
fn assemble(slots: Vec<Slot>, root: &ReadResult) -> Detail {
    let mut built: Vec<Option<Detail>> = Vec::with_capacity(slots.len());
    built.resize_with(slots.len(), || None);

    for (index, slot) in slots.into_iter().enumerate().rev() {
        built[index] = match slot {
            Slot::Pending => None,
            Slot::Done(detail) => Some(detail),
            Slot::Group {
                name,
                formatting,
                children,
            } => {
                let children = children
                    .into_iter()
                    .filter_map(|child| built[child].take())
                    .collect();
                Some(Detail::group(name, children).with_formatting(formatting))
            }
        };
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| Detail::matched(root.name(), None))
}

fn is_structured(node: &ReadResult) -> bool {
    node.kind().is_structured() && !node.is_truncated()
}

fn type_leaf(node: &ReadResult) -> LeafValue {
    LeafValue::new(node.type_name().to_string())
}

/// How one side shows up in a divergence: its value for leaves, its type
/// otherwise, nothing when null
fn summary(node: &ReadResult) -> Option<LeafValue> {
    if node.is_null() {
        None
    } else if node.is_truncated() {
        Some(LeafValue::new(CYCLE_MARKER.to_string()))
    } else if is_structured(node) {
        Some(type_leaf(node))
    } else {
        node.value().cloned().or_else(|| Some(type_leaf(node)))
    }
}

fn shows_type(node: &ReadResult) -> bool {
    !node.is_null() && (is_structured(node) || node.value().is_none())
}

/// Mismatch where one side is null or the shapes differ
fn divergence(expected: &ReadResult, actual: &ReadResult) -> Detail {
    let formatting = if shows_type(expected) || shows_type(actual) {
        Formatting::none()
    } else {
        expected.formatting().clone()
    };
    Detail::mismatch(expected.name(), summary(expected), summary(actual)).with_formatting(formatting)
}

/// Mismatch for an element present on one side only
fn one_sided(node: &ReadResult, side: Side) -> Detail {
    let formatting = if shows_type(node) {
        Formatting::none()
    } else {
        node.formatting().clone()
    };
    let detail = match side {
        Side::Expected => Detail::mismatch(node.name(), summary(node), None),
        Side::Actual => Detail::mismatch(node.name(), None, summary(node)),
    };
    detail.with_formatting(formatting)
}

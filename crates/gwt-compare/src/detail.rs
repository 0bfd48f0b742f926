//! Report details
//!
//! A [`Detail`] is one node of a diff tree. Matches may have children;
//! mismatches and failures never do, which the [`Outcome`] variants enforce.

use gwt_graph::{Formatting, LeafValue, ReadResult};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Detail classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    /// Expected and actual agree
    Match,
    /// Expected and actual differ
    Mismatch,
    /// The step failed outright
    Failure,
}

/// What a detail records
#[derive(Debug)]
pub enum Outcome {
    /// Agreement; `value` is empty for structured nodes
    Match {
        /// The agreed value
        value: Option<LeafValue>,
        /// Nested details in member order
        children: Vec<Detail>,
    },
    /// Disagreement at a leaf or at a point of structural divergence
    Mismatch {
        /// Expected side (`None` renders as `null`)
        expected: Option<LeafValue>,
        /// Actual side (`None` renders as `null`)
        actual: Option<LeafValue>,
    },
    /// Failure with a message
    Failure {
        /// What went wrong
        message: String,
    },
}

/// Node of a diff tree
#[derive(Debug)]
pub struct Detail {
    name: String,
    formatting: Formatting,
    outcome: Outcome,
}

impl Detail {
    /// Leaf match
    #[must_use]
    pub fn matched(name: impl Into<String>, value: Option<LeafValue>) -> Self {
        Self {
            name: name.into(),
            formatting: Formatting::none(),
            outcome: Outcome::Match {
                value,
                children: Vec::new(),
            },
        }
    }

    /// Structured match
    #[must_use]
    pub fn group(name: impl Into<String>, children: Vec<Detail>) -> Self {
        Self {
            name: name.into(),
            formatting: Formatting::none(),
            outcome: Outcome::Match {
                value: None,
                children,
            },
        }
    }

    /// Mismatch
    #[must_use]
    pub fn mismatch(
        name: impl Into<String>,
        expected: Option<LeafValue>,
        actual: Option<LeafValue>,
    ) -> Self {
        Self {
            name: name.into(),
            formatting: Formatting::none(),
            outcome: Outcome::Mismatch { expected, actual },
        }
    }

    /// Failure
    #[must_use]
    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formatting: Formatting::none(),
            outcome: Outcome::Failure {
                message: message.into(),
            },
        }
    }

    /// Attach display hints
    #[must_use]
    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    /// Convert a snapshot into a tree of matches
    ///
    /// Used for Given and When entries, where there is nothing to compare
    /// against.
    #[must_use]
    pub fn from_read(result: &ReadResult) -> Self {
        // breadth-first order keeps every child after its parent
        let mut order: Vec<(&ReadResult, Vec<usize>)> = vec![(result, Vec::new())];
        let mut index = 0;
        while index < order.len() {
            let node = order[index].0;
            let start = order.len();
            order.extend(node.properties().iter().map(|child| (child, Vec::new())));
            order[index].1 = (start..order.len()).collect();
            index += 1;
        }

        let mut built: Vec<Option<Detail>> = Vec::with_capacity(order.len());
        built.resize_with(order.len(), || None);
        for (index, (node, children)) in order.into_iter().enumerate().rev() {
            let detail = if node.is_leaf() {
                Detail::matched(node.name(), node.value().cloned())
            } else {
                let children = children
                    .into_iter()
                    .filter_map(|child| built[child].take())
                    .collect();
                Detail::group(node.name(), children)
            };
            built[index] = Some(detail.with_formatting(node.formatting().clone()));
        }

        built
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(|| Detail::matched(result.name(), None))
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display hints
    #[inline]
    #[must_use]
    pub fn formatting(&self) -> &Formatting {
        &self.formatting
    }

    /// Format hint
    #[inline]
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.formatting.format()
    }

    /// What the detail records
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Classification
    #[must_use]
    pub fn kind(&self) -> DetailKind {
        match self.outcome {
            Outcome::Match { .. } => DetailKind::Match,
            Outcome::Mismatch { .. } => DetailKind::Mismatch,
            Outcome::Failure { .. } => DetailKind::Failure,
        }
    }

    /// Matched value, or the expected side of a mismatch
    #[must_use]
    pub fn value(&self) -> Option<&LeafValue> {
        match &self.outcome {
            Outcome::Match { value, .. } => value.as_ref(),
            Outcome::Mismatch { expected, .. } => expected.as_ref(),
            Outcome::Failure { .. } => None,
        }
    }

    /// Actual side of a mismatch
    #[must_use]
    pub fn actual(&self) -> Option<&LeafValue> {
        match &self.outcome {
            Outcome::Mismatch { actual, .. } => actual.as_ref(),
            _ => None,
        }
    }

    /// Nested details (always empty unless a match)
    #[must_use]
    pub fn children(&self) -> &[Detail] {
        match &self.outcome {
            Outcome::Match { children, .. } => children,
            _ => &[],
        }
    }

    /// Detach nested details
    pub(crate) fn take_children(&mut self) -> Vec<Detail> {
        match &mut self.outcome {
            Outcome::Match { children, .. } => std::mem::take(children),
            _ => Vec::new(),
        }
    }

    /// Failure message
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { message } => Some(message),
            _ => None,
        }
    }

    /// Whether this node is a match
    #[inline]
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, Outcome::Match { .. })
    }

    /// Whether this node and every descendant is a match
    #[must_use]
    pub fn is_success(&self) -> bool {
        let mut stack = vec![self];
        while let Some(detail) = stack.pop() {
            if !detail.is_match() {
                return false;
            }
            stack.extend(detail.children());
        }
        true
    }

    /// Render the matched or expected value
    #[must_use]
    pub fn render_value(&self) -> String {
        self.formatting.render(self.value())
    }

    /// Render the actual value of a mismatch
    #[must_use]
    pub fn render_actual(&self) -> String {
        self.formatting.render(self.actual())
    }
}

impl Drop for Detail {
    fn drop(&mut self) {
        let Outcome::Match { children, .. } = &mut self.outcome else {
            return;
        };
        let mut stack = std::mem::take(children);
        while let Some(mut detail) = stack.pop() {
            if let Outcome::Match { children, .. } = &mut detail.outcome {
                stack.append(children);
            }
        }
    }
}

impl Serialize for Detail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Detail", 7)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("value", &self.value().map(|_| self.render_value()))?;
        state.serialize_field("actual", &self.actual().map(|_| self.render_actual()))?;
        state.serialize_field("format", &self.format())?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("children", self.children())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwt_graph::{describe_struct, Reader};
    use pretty_assertions::assert_eq;

    struct Invoice {
        amount: i32,
        lines: Vec<u8>,
    }
    describe_struct!(Invoice { amount: "0.00", lines });

    #[test]
    fn mismatch_has_no_children() {
        let detail = Detail::mismatch("Amount", Some(LeafValue::new(4)), Some(LeafValue::new(3)));

        assert_eq!(detail.kind(), DetailKind::Mismatch);
        assert!(detail.children().is_empty());
        assert_eq!(detail.render_value(), "4");
        assert_eq!(detail.render_actual(), "3");
        assert!(!detail.is_success());
    }

    #[test]
    fn success_requires_every_descendant() {
        let nested = Detail::group(
            "root",
            vec![
                Detail::matched("a", Some(LeafValue::new(1))),
                Detail::group("b", vec![Detail::failure("c", "boom")]),
            ],
        );
        assert!(nested.is_match());
        assert!(!nested.is_success());

        let clean = Detail::group("root", vec![Detail::matched("a", None)]);
        assert!(clean.is_success());
    }

    #[test]
    fn from_read_mirrors_the_snapshot() {
        let invoice = Invoice {
            amount: 12,
            lines: vec![1, 2],
        };
        let snapshot = Reader::default().read(&invoice).unwrap();
        let detail = Detail::from_read(&snapshot);

        assert_eq!(detail.name(), "Invoice");
        let names: Vec<&str> = detail.children().iter().map(Detail::name).collect();
        assert_eq!(names, vec!["amount", "lines"]);

        let amount = &detail.children()[0];
        assert_eq!(amount.format(), Some("0.00"));
        assert_eq!(amount.render_value(), "12");
        assert_eq!(detail.children()[1].children()[1].name(), "[1]");
        assert!(detail.is_success());
    }

    #[test]
    fn serializes_rendered_values() {
        let detail = Detail::group(
            "Invoice",
            vec![Detail::mismatch("Amount", Some(LeafValue::new(4)), None)],
        );

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "match");
        assert_eq!(json["children"][0]["kind"], "mismatch");
        assert_eq!(json["children"][0]["value"], "4");
        assert_eq!(json["children"][0]["actual"], serde_json::Value::Null);
    }

    #[test]
    fn deep_trees_drop_iteratively() {
        let mut detail = Detail::matched("leaf", None);
        for depth in 0..200_000 {
            detail = Detail::group(depth.to_string(), vec![detail]);
        }
        assert!(detail.is_success());
    }
}

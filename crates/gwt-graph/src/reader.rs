//! Object graph reader
//!
//! [`Reader::read`] snapshots a value into a [`ReadResult`] tree. The walk
//! uses an explicit work stack, so depth is bounded by memory rather than by
//! the call stack.
//!
//! # Cycles
//!
//! Every value on the active path is "open", keyed by `(address, type)` for
//! each hop of its forward chain (`Rc` → `RefCell` → content). A value that
//! resolves to an open identity is emitted with no properties and the branch
//! ends there. Identity is by address, never by equality: two distinct but
//! equal values are both read.
//!
//! # Owned snapshots
//!
//! Guarded content (`RefCell`, locks, `Weak`) is described through an owned
//! clone. Work items below such a clone hold the clone (the anchor) and the
//! member path from it, and are re-resolved from the anchor when popped.
//! Anchors stay alive until the subtree closes, so open addresses stay stable.

use crate::classify::{ShapeKind, TypeKey, ValueClassifier};
use crate::describe::{Describe, Shape, Value};
use crate::error::GraphTooLargeError;
use crate::value::{Formatting, LeafValue};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use std::sync::Arc;

/// Default cap on pending reads
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Number of pending type names listed in a [`GraphTooLargeError`]
const PENDING_TYPES_REPORTED: usize = 16;

/// Member predicate: `(owner type, member name) -> skip?`
pub type MemberFilter = Arc<dyn Fn(&TypeKey, &str) -> bool + Send + Sync>;

// ============================================================================
// Options
// ============================================================================

/// Reader configuration
///
/// Immutable once handed to [`Reader::new`].
#[derive(Clone)]
pub struct ReaderOptions {
    max_pending: usize,
    skip_types: HashSet<TypeId>,
    member_filter: Option<MemberFilter>,
    formatting: HashMap<TypeId, Formatting>,
}

impl ReaderOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on pending reads before [`GraphTooLargeError`]
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Read `T` as a leaf, without descending into it
    #[must_use]
    pub fn skip_type<T: ?Sized + 'static>(mut self) -> Self {
        self.skip_types.insert(TypeId::of::<T>());
        self
    }

    /// Suppress members for which `filter(owner, member)` is true
    #[must_use]
    pub fn with_member_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&TypeKey, &str) -> bool + Send + Sync + 'static,
    {
        self.member_filter = Some(Arc::new(filter));
        self
    }

    /// Format hint for every value of type `T`
    #[must_use]
    pub fn with_type_format<T: ?Sized + 'static>(mut self, format: &str) -> Self {
        let entry = self.formatting.entry(TypeId::of::<T>()).or_default();
        *entry = std::mem::take(entry).with_format(format);
        self
    }

    /// Formatter for every value of type `T`
    #[must_use]
    pub fn with_type_formatter<T, F>(mut self, formatter: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn(&LeafValue) -> String + Send + Sync + 'static,
    {
        let entry = self.formatting.entry(TypeId::of::<T>()).or_default();
        *entry = std::mem::take(entry).with_formatter(Arc::new(formatter));
        self
    }

    /// Configured pending cap
    #[inline]
    #[must_use]
    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Registered terminal types
    #[inline]
    #[must_use]
    pub fn skip_types(&self) -> &HashSet<TypeId> {
        &self.skip_types
    }

    fn skips(&self, owner: &TypeKey, member: &str) -> bool {
        self.member_filter
            .as_ref()
            .is_some_and(|filter| filter(owner, member))
    }

    fn formatting_for(&self, key: &TypeKey) -> Option<&Formatting> {
        self.formatting.get(&key.id())
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
            skip_types: HashSet::new(),
            member_filter: None,
            formatting: HashMap::new(),
        }
    }
}

impl Debug for ReaderOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("max_pending", &self.max_pending)
            .field("skip_types", &self.skip_types.len())
            .field("member_filter", &self.member_filter.is_some())
            .field("formatting", &self.formatting.len())
            .finish()
    }
}

// ============================================================================
// Read results
// ============================================================================

/// Snapshot node produced by [`Reader::read`]
///
/// A node is a leaf iff it has no properties. Structured nodes carry no
/// value; leaves carry their snapshot, or `None` when null or opaque.
#[derive(Debug)]
pub struct ReadResult {
    type_key: TypeKey,
    type_name: Arc<str>,
    name: String,
    kind: ShapeKind,
    value: Option<LeafValue>,
    formatting: Formatting,
    truncated: bool,
    properties: Vec<ReadResult>,
}

impl ReadResult {
    /// Runtime type of the value
    #[inline]
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Display name of the runtime type (`Vec<Invoice>`)
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Member name: field name, `[i]`, map key, or the type name at the root
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape kind the value described itself as
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Leaf snapshot
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&LeafValue> {
        self.value.as_ref()
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

    /// Child nodes in member order
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &[ReadResult] {
        &self.properties
    }

    /// No properties
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.properties.is_empty()
    }

    /// The value was absent
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind == ShapeKind::Null
    }

    /// The node closed a cycle and was not descended into
    #[inline]
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Render the value with its formatting
    #[must_use]
    pub fn render(&self) -> String {
        self.formatting.render(self.value.as_ref())
    }

    /// Leaf values in depth-first member order
    #[must_use]
    pub fn leaf_values(&self) -> Vec<&LeafValue> {
        let mut values = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                values.extend(node.value.as_ref());
            }
            stack.extend(node.properties.iter().rev());
        }
        values
    }

    /// Total number of nodes in the tree
    #[must_use]
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.properties.iter());
        }
        count
    }
}

impl Drop for ReadResult {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.properties);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.properties);
        }
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Iterative, cycle-safe object graph reader
///
/// Holds no per-read state; one reader can serve many threads.
#[derive(Debug, Default)]
pub struct Reader {
    options: ReaderOptions,
    classifier: ValueClassifier,
}

impl Reader {
    /// Create reader
    #[must_use]
    pub fn new(options: ReaderOptions) -> Self {
        let classifier = ValueClassifier::new(options.skip_types.clone());
        Self {
            options,
            classifier,
        }
    }

    /// Options in use
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Leaf classifier
    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &ValueClassifier {
        &self.classifier
    }

    /// Snapshot a value
    ///
    /// # Errors
    /// [`GraphTooLargeError`] when more than `max_pending` reads are queued.
    pub fn read<T: Describe>(&self, value: &T) -> Result<ReadResult, GraphTooLargeError> {
        self.read_dyn(value)
    }

    /// Snapshot a type-erased value
    ///
    /// # Errors
    /// [`GraphTooLargeError`] when more than `max_pending` reads are queued.
    pub fn read_dyn(&self, value: &dyn Describe) -> Result<ReadResult, GraphTooLargeError> {
        let mut walk = Walk::new(self);
        walk.run(value)?;
        let result = walk.assemble();
        tracing::trace!(
            type_name = %result.type_name(),
            nodes = result.node_count(),
            "graph read"
        );
        Ok(result)
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// `(address, type)` of one hop
type Identity = (usize, TypeId);

/// Where a pending read finds its value
enum Origin<'r> {
    /// Borrowed from the root for the whole read
    Borrowed(&'r dyn Describe),
    /// Member path below an owned snapshot
    Within {
        anchor: Rc<dyn Describe>,
        path: Vec<usize>,
    },
}

struct Target<'r> {
    origin: Origin<'r>,
    slot: usize,
    /// Forward hops already taken for this slot
    hops: Vec<Identity>,
    /// Anchors the recorded hops point into
    retained: Vec<Rc<dyn Describe>>,
    declared: TypeKey,
}

impl<'r> Target<'r> {
    fn new(origin: Origin<'r>, slot: usize, declared: TypeKey) -> Self {
        Self {
            origin,
            slot,
            hops: Vec::new(),
            retained: Vec::new(),
            declared,
        }
    }
}

enum Work<'r> {
    Read(Target<'r>),
    Close {
        identities: Vec<Identity>,
        _retained: Vec<Rc<dyn Describe>>,
    },
}

/// Outcome of following a value's forward chain
enum Step<'s> {
    Done(Resolved),
    Hop(Rc<dyn Describe>),
    Expand(TypeKey, Shape<'s>),
}

/// [`Step`] without the borrowed shape
enum Settled {
    Done(Resolved),
    Hop(Rc<dyn Describe>),
    Expand,
}

struct Resolved {
    type_key: TypeKey,
    kind: ShapeKind,
    value: Option<LeafValue>,
    truncated: bool,
}

impl Resolved {
    fn null(type_key: TypeKey) -> Self {
        Self {
            type_key,
            kind: ShapeKind::Null,
            value: None,
            truncated: false,
        }
    }

    fn leaf(type_key: TypeKey, value: Option<LeafValue>) -> Self {
        Self {
            type_key,
            kind: ShapeKind::Leaf,
            value,
            truncated: false,
        }
    }

    fn structured(type_key: TypeKey, kind: ShapeKind) -> Self {
        Self {
            type_key,
            kind,
            value: None,
            truncated: false,
        }
    }

    fn truncated(type_key: TypeKey, kind: ShapeKind) -> Self {
        Self {
            type_key,
            kind,
            value: None,
            truncated: true,
        }
    }
}

struct Slot {
    name: String,
    format: Option<&'static str>,
    resolved: Option<Resolved>,
    children: Vec<usize>,
}

/// State of one read
struct Walk<'a, 'r> {
    reader: &'a Reader,
    slots: Vec<Slot>,
    stack: Vec<Work<'r>>,
    open: HashMap<Identity, (TypeKey, ShapeKind)>,
    pending: usize,
}

impl<'a, 'r> Walk<'a, 'r> {
    fn new(reader: &'a Reader) -> Self {
        Self {
            reader,
            slots: Vec::new(),
            stack: Vec::new(),
            open: HashMap::new(),
            pending: 0,
        }
    }

    fn run(&mut self, root: &'r dyn Describe) -> Result<(), GraphTooLargeError> {
        let declared = root.type_key();
        let name = self.reader.classifier.display_name(&declared).to_string();
        let slot = self.allocate(name, None);
        self.push(Target::new(Origin::Borrowed(root), slot, declared));

        while let Some(work) = self.stack.pop() {
            match work {
                Work::Read(target) => {
                    self.pending -= 1;
                    self.visit(target)?;
                }
                Work::Close { identities, .. } => {
                    for identity in &identities {
                        self.open.remove(identity);
                    }
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, target: Target<'r>) -> Result<(), GraphTooLargeError> {
        let Target {
            origin,
            slot,
            mut hops,
            mut retained,
            declared,
        } = target;

        match origin {
            Origin::Borrowed(value) => match self.follow(value, &mut hops) {
                Step::Done(resolved) => self.fill(slot, resolved),
                Step::Hop(next) => self.push_hop(slot, next, hops, retained, declared),
                Step::Expand(key, shape) => {
                    self.expand(slot, key, shape, hops, retained, |_, member| {
                        Origin::Borrowed(member)
                    })?;
                }
            },
            Origin::Within { anchor, path } => {
                let Some(start) = resolve_path(&*anchor, &path) else {
                    tracing::debug!(type_name = %declared, "member path no longer resolves");
                    self.fill(slot, Resolved::null(declared));
                    return Ok(());
                };
                match self.follow(start, &mut hops) {
                    Step::Done(resolved) => self.fill(slot, resolved),
                    Step::Hop(next) => {
                        retained.push(Rc::clone(&anchor));
                        self.push_hop(slot, next, hops, retained, declared);
                    }
                    Step::Expand(key, shape) => {
                        retained.push(Rc::clone(&anchor));
                        self.expand(slot, key, shape, hops, retained, |index, _| {
                            let mut path = path.clone();
                            path.push(index);
                            Origin::Within {
                                anchor: Rc::clone(&anchor),
                                path,
                            }
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Follow forwards from `start` until a leaf, null, cycle, owned hop or
    /// structured value
    fn follow<'s>(&self, start: &'s dyn Describe, hops: &mut Vec<Identity>) -> Step<'s> {
        let mut current = start;
        loop {
            let key = current.type_key();
            if self.reader.classifier.is_terminal(&key) {
                return Step::Done(Resolved::leaf(key, current.terminal_value()));
            }

            let identity = (current.identity(), key.id());
            if let Some(&(open_key, open_kind)) = self.open.get(&identity) {
                tracing::debug!(type_name = %open_key, "cycle detected, branch truncated");
                return Step::Done(Resolved::truncated(open_key, open_kind));
            }
            if hops.contains(&identity) {
                // forward chain loops without reaching content
                tracing::debug!(type_name = %key, "forward loop detected, branch truncated");
                return Step::Done(Resolved::truncated(key, ShapeKind::Null));
            }

            match current.describe() {
                Shape::Null => return Step::Done(Resolved::null(key)),
                Shape::Leaf(value) => return Step::Done(Resolved::leaf(key, Some(value))),
                Shape::Forward(Value::Ref(next)) => {
                    hops.push(identity);
                    current = next;
                }
                Shape::Forward(Value::Owned(next)) => {
                    hops.push(identity);
                    return Step::Hop(next);
                }
                shape => {
                    hops.push(identity);
                    return Step::Expand(key, shape);
                }
            }
        }
    }

    fn settle(&self, member: &dyn Describe, hops: &mut Vec<Identity>) -> Settled {
        match self.follow(member, hops) {
            Step::Done(resolved) => Settled::Done(resolved),
            Step::Hop(next) => Settled::Hop(next),
            Step::Expand(..) => Settled::Expand,
        }
    }

    /// Open a structured value and queue its members
    fn expand<'s, F>(
        &mut self,
        slot: usize,
        key: TypeKey,
        shape: Shape<'s>,
        hops: Vec<Identity>,
        retained: Vec<Rc<dyn Describe>>,
        locate: F,
    ) -> Result<(), GraphTooLargeError>
    where
        F: Fn(usize, &'s dyn Describe) -> Origin<'r>,
    {
        let kind = shape.kind();
        self.fill(slot, Resolved::structured(key, kind));

        for identity in &hops {
            self.open.insert(*identity, (key, kind));
        }
        self.stack.push(Work::Close {
            identities: hops,
            _retained: retained,
        });

        let mut targets = Vec::new();
        for (index, (name, format, member)) in members(shape).into_iter().enumerate() {
            if self.reader.options.skips(&key, &name) {
                continue;
            }
            let child = self.allocate(name, format);
            self.slots[slot].children.push(child);

            let mut hops = Vec::new();
            match member {
                Value::Ref(member) => match self.settle(member, &mut hops) {
                    Settled::Done(resolved) => self.fill(child, resolved),
                    Settled::Hop(next) => {
                        let mut target = Target::new(owned_origin(next), child, member.type_key());
                        target.hops = hops;
                        targets.push(target);
                    }
                    Settled::Expand => {
                        targets.push(Target::new(locate(index, member), child, member.type_key()));
                    }
                },
                Value::Owned(member) => match self.settle(&*member, &mut hops) {
                    Settled::Done(resolved) => self.fill(child, resolved),
                    Settled::Hop(next) => {
                        let mut target = Target::new(owned_origin(next), child, member.type_key());
                        target.hops = hops;
                        target.retained.push(member);
                        targets.push(target);
                    }
                    Settled::Expand => {
                        let declared = member.type_key();
                        targets.push(Target::new(owned_origin(member), child, declared));
                    }
                },
            }
        }

        self.pending += targets.len();
        if self.pending > self.reader.options.max_pending {
            return Err(self.too_large(&key, &targets));
        }
        self.stack.extend(targets.into_iter().rev().map(Work::Read));
        Ok(())
    }

    fn push(&mut self, target: Target<'r>) {
        self.pending += 1;
        self.stack.push(Work::Read(target));
    }

    fn push_hop(
        &mut self,
        slot: usize,
        next: Rc<dyn Describe>,
        hops: Vec<Identity>,
        retained: Vec<Rc<dyn Describe>>,
        declared: TypeKey,
    ) {
        let mut target = Target::new(owned_origin(next), slot, declared);
        target.hops = hops;
        target.retained = retained;
        self.push(target);
    }

    fn allocate(&mut self, name: String, format: Option<&'static str>) -> usize {
        self.slots.push(Slot {
            name,
            format,
            resolved: None,
            children: Vec::new(),
        });
        self.slots.len() - 1
    }

    fn fill(&mut self, slot: usize, resolved: Resolved) {
        self.slots[slot].resolved = Some(resolved);
    }

    fn too_large(&self, key: &TypeKey, targets: &[Target<'r>]) -> GraphTooLargeError {
        let queued = self.stack.iter().rev().filter_map(|work| match work {
            Work::Read(target) => Some(target),
            Work::Close { .. } => None,
        });

        let mut pending: Vec<String> = Vec::new();
        for target in targets.iter().rev().chain(queued) {
            let name = self.reader.classifier.display_name(&target.declared);
            if !pending.iter().any(|seen| **seen == *name) {
                pending.push(name.to_string());
            }
            if pending.len() == PENDING_TYPES_REPORTED {
                break;
            }
        }

        let error = GraphTooLargeError {
            type_name: self.reader.classifier.display_name(key).to_string(),
            limit: self.reader.options.max_pending,
            pending,
        };
        tracing::warn!(
            type_name = %error.type_name,
            limit = error.limit,
            "object graph too large"
        );
        error
    }

    /// Build the tree from the slot arena
    ///
    /// Children always sit after their parent, so a reverse pass sees every
    /// child before its parent.
    fn assemble(self) -> ReadResult {
        let reader = self.reader;
        let mut built: Vec<Option<ReadResult>> = Vec::with_capacity(self.slots.len());
        built.resize_with(self.slots.len(), || None);

        for (index, slot) in self.slots.into_iter().enumerate().rev() {
            let resolved = slot
                .resolved
                .unwrap_or_else(|| Resolved::null(TypeKey::of::<()>()));
            let properties = slot
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();

            let mut formatting = Formatting::none();
            if let Some(format) = slot.format {
                formatting = formatting.with_format(format);
            }
            if let Some(by_type) = reader.options.formatting_for(&resolved.type_key) {
                formatting = formatting.or(by_type);
            }

            built[index] = Some(ReadResult {
                type_key: resolved.type_key,
                type_name: reader.classifier.display_name(&resolved.type_key),
                name: slot.name,
                kind: resolved.kind,
                value: resolved.value,
                formatting,
                truncated: resolved.truncated,
                properties,
            });
        }

        built
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(|| ReadResult {
                type_key: TypeKey::of::<()>(),
                type_name: reader.classifier.display_name(&TypeKey::of::<()>()),
                name: String::new(),
                kind: ShapeKind::Null,
                value: None,
                formatting: Formatting::none(),
                truncated: false,
                properties: Vec::new(),
            })
    }
}

fn owned_origin<'r>(anchor: Rc<dyn Describe>) -> Origin<'r> {
    Origin::Within {
        anchor,
        path: Vec::new(),
    }
}

/// Members as `(name, format hint, value)` in declaration order
fn members(shape: Shape<'_>) -> Vec<(String, Option<&'static str>, Value<'_>)> {
    match shape {
        Shape::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, value)| (format!("[{index}]"), None, value))
            .collect(),
        Shape::Mapping(entries) => entries
            .into_iter()
            .map(|(key, value)| (key, None, value))
            .collect(),
        Shape::Struct(fields) => fields
            .into_iter()
            .map(|field| (field.name.to_string(), field.format, field.value))
            .collect(),
        Shape::Null | Shape::Leaf(_) | Shape::Forward(_) => Vec::new(),
    }
}

/// Re-find a value below an anchor by member indices
///
/// Intermediate forwards are borrowed; an owned value mid-path means the
/// anchor no longer matches the path.
fn resolve_path<'s>(anchor: &'s dyn Describe, path: &[usize]) -> Option<&'s dyn Describe> {
    let mut current = anchor;
    for &index in path {
        let mut shape = current.describe();
        while let Shape::Forward(Value::Ref(next)) = shape {
            shape = next.describe();
        }
        match shape.into_member(Some(index))? {
            Value::Ref(member) => current = member,
            Value::Owned(_) => return None,
        }
    }
    Some(current)
}

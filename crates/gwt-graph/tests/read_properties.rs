//! Traversal properties of the object graph reader

use gwt_graph::{describe_struct, LeafValue, ReadResult, Reader, ReaderOptions, ShapeKind};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
struct Line {
    sku: String,
    quantity: u32,
    tags: Vec<String>,
}
describe_struct!(Line { sku, quantity, tags });

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: u64,
    lines: Vec<Line>,
    notes: BTreeMap<String, i64>,
}
describe_struct!(Order { id, lines, notes });

#[derive(Debug, Clone)]
struct Node {
    label: u32,
    next: Option<Rc<RefCell<Node>>>,
}
describe_struct!(Node { label, next });

fn line_strategy() -> impl Strategy<Value = Line> {
    (
        "[a-z]{1,6}",
        any::<u32>(),
        proptest::collection::vec("[a-z]{0,4}", 0..4),
    )
        .prop_map(|(sku, quantity, tags)| Line {
            sku,
            quantity,
            tags,
        })
}

fn order_strategy() -> impl Strategy<Value = Order> {
    (
        any::<u64>(),
        proptest::collection::vec(line_strategy(), 0..6),
        proptest::collection::btree_map("[a-z]{1,3}", any::<i64>(), 0..4),
    )
        .prop_map(|(id, lines, notes)| Order { id, lines, notes })
}

/// Leaves in declaration order, computed by hand
fn expected_leaves(order: &Order) -> Vec<LeafValue> {
    let mut leaves = vec![LeafValue::new(order.id)];
    for line in &order.lines {
        leaves.push(LeafValue::new(line.sku.clone()));
        leaves.push(LeafValue::new(line.quantity));
        leaves.extend(line.tags.iter().cloned().map(LeafValue::new));
    }
    leaves.extend(order.notes.values().copied().map(LeafValue::new));
    leaves
}

/// Build a ring of `len` nodes and return its first node
fn ring(len: u32) -> Vec<Rc<RefCell<Node>>> {
    let nodes: Vec<_> = (0..len)
        .map(|label| Rc::new(RefCell::new(Node { label, next: None })))
        .collect();
    for (index, node) in nodes.iter().enumerate() {
        let next = &nodes[(index + 1) % nodes.len()];
        node.borrow_mut().next = Some(Rc::clone(next));
    }
    nodes
}

fn break_ring(nodes: &[Rc<RefCell<Node>>]) {
    for node in nodes {
        node.borrow_mut().next = None;
    }
}

/// Follow `next` members from the root, returning the visited nodes
fn walk_next(root: &ReadResult) -> Vec<&ReadResult> {
    let mut visited = vec![root];
    let mut current = root;
    while let Some(next) = current.properties().iter().find(|p| p.name() == "next") {
        visited.push(next);
        current = next;
    }
    visited
}

proptest! {
    #[test]
    fn prop_acyclic_leaves_appear_once_in_order(order in order_strategy()) {
        let result = Reader::default().read(&order).unwrap();

        let actual: Vec<LeafValue> = result.leaf_values().into_iter().cloned().collect();
        prop_assert_eq!(actual, expected_leaves(&order));
    }

    #[test]
    fn prop_rings_terminate(len in 1..40u32) {
        let nodes = ring(len);
        let result = Reader::default().read(&nodes[0]).unwrap();

        let chain = walk_next(&result);
        // every node once, then the edge back to the first
        prop_assert_eq!(chain.len(), len as usize + 1);
        let last = chain[chain.len() - 1];
        prop_assert!(last.is_truncated());
        prop_assert_eq!(last.kind(), ShapeKind::Struct);
        prop_assert!(chain[..chain.len() - 1].iter().all(|node| !node.is_truncated()));

        break_ring(&nodes);
    }

    #[test]
    fn prop_reads_are_deterministic(order in order_strategy()) {
        let reader = Reader::default();
        let first = reader.read(&order).unwrap();
        let second = reader.read(&order).unwrap();

        prop_assert_eq!(first.node_count(), second.node_count());
        prop_assert_eq!(first.leaf_values(), second.leaf_values());
    }
}

#[test]
fn pending_cap_is_a_configuration_error() {
    let orders: Vec<Order> = (0..50)
        .map(|id| Order {
            id,
            lines: Vec::new(),
            notes: BTreeMap::new(),
        })
        .collect();

    let reader = Reader::new(ReaderOptions::new().with_max_pending(10));
    let err = reader.read(&orders).unwrap_err();

    assert_eq!(err.type_name, "Vec<Order>");
    assert!(err.to_string().contains("register `Vec<Order>` as a terminal type"));

    let reader = Reader::new(ReaderOptions::new().with_max_pending(10).skip_type::<Order>());
    assert!(reader.read(&orders).is_ok());
}

#[test]
fn ring_entered_through_a_borrowed_node() {
    let nodes = ring(3);
    let first = nodes[0].borrow().clone();

    let result = Reader::default().read(&first).unwrap();
    let chain = walk_next(&result);

    // the copy is not part of the ring, so the original first node is read
    // once more before the cycle closes
    assert_eq!(chain.len(), 5);
    assert!(chain[4].is_truncated());

    break_ring(&nodes);
}

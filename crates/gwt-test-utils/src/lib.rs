//! Testing utilities for GWT workspace
//!
//! Shared fixtures, in-memory report writers and logging setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use gwt_graph::describe_struct;
use gwt_report::{ReportItem, ReportWriter};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub name: String,
    pub vip: bool,
}
describe_struct!(Customer { name, vip });

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub sku: String,
    pub quantity: u32,
}
describe_struct!(Line { sku, quantity });

#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub number: u32,
    pub customer: Customer,
    pub lines: Vec<Line>,
    pub total: f64,
}
describe_struct!(Invoice { number, customer, lines, total: "0.00" });

pub fn create_customer(name: &str) -> Customer {
    Customer {
        name: name.to_string(),
        vip: false,
    }
}

pub fn create_invoice(number: u32, skus: &[&str]) -> Invoice {
    let lines: Vec<Line> = skus
        .iter()
        .map(|sku| Line {
            sku: (*sku).to_string(),
            quantity: 1,
        })
        .collect();
    Invoice {
        number,
        customer: create_customer("Ada"),
        total: lines.iter().map(|line| f64::from(line.quantity) * 9.5).sum(),
        lines,
    }
}

/// Writer keeping every item as JSON
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    items: Arc<Mutex<Vec<Value>>>,
    delay: Option<Duration>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before each write, to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    /// The `type` tag of every item written so far
    pub fn types(&self) -> Vec<String> {
        self.items
            .lock()
            .iter()
            .map(|item| item["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

#[async_trait]
impl ReportWriter for MemoryWriter {
    async fn write(&mut self, item: &ReportItem) -> anyhow::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let value = serde_json::to_value(item)?;
        self.items.lock().push(value);
        Ok(())
    }
}

/// Writer failing on the item at `fail_at` (zero based)
#[derive(Debug, Clone)]
pub struct FailingWriter {
    pub memory: MemoryWriter,
    fail_at: usize,
    seen: usize,
}

impl FailingWriter {
    pub fn new(fail_at: usize) -> Self {
        Self {
            memory: MemoryWriter::new(),
            fail_at,
            seen: 0,
        }
    }
}

#[async_trait]
impl ReportWriter for FailingWriter {
    async fn write(&mut self, item: &ReportItem) -> anyhow::Result<()> {
        let index = self.seen;
        self.seen += 1;
        if index == self.fail_at {
            anyhow::bail!("disk full at item {index}");
        }
        self.memory.write(item).await
    }
}

/// Writer panicking on the first scenario item
#[derive(Debug, Clone, Default)]
pub struct PanickingWriter {
    pub memory: MemoryWriter,
}

#[async_trait]
impl ReportWriter for PanickingWriter {
    async fn write(&mut self, item: &ReportItem) -> anyhow::Result<()> {
        if matches!(item, ReportItem::StartScenario { .. }) {
            panic!("renderer crashed");
        }
        self.memory.write(item).await
    }
}

/// Split a written report into per-scenario item runs
///
/// Panics if scenario markers are unbalanced or interleaved.
pub fn scenario_runs(items: &[Value]) -> Vec<Vec<Value>> {
    let mut runs = Vec::new();
    let mut current: Option<Vec<Value>> = None;
    for item in items {
        match item["type"].as_str() {
            Some("start_scenario") => {
                assert!(current.is_none(), "scenario started inside another");
                current = Some(vec![item.clone()]);
            }
            Some("end_scenario") => {
                let mut run = current.take().expect("scenario ended without start");
                assert_eq!(run[0]["title"], item["title"], "scenario items interleaved");
                run.push(item.clone());
                runs.push(run);
            }
            _ => {
                if let Some(run) = current.as_mut() {
                    run.push(item.clone());
                }
            }
        }
    }
    assert!(current.is_none(), "scenario never ended");
    runs
}

/// Initialise tracing output for tests; `RUST_LOG` selects levels
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

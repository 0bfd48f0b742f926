//! Ordered asynchronous report sink
//!
//! Scenarios finish on arbitrary tasks and hand their results to a shared
//! [`ReportSink`]. Each result is expanded into one batch of items and queued
//! as a single unit, so batches never interleave. Whoever wins the drain flag
//! spawns a drain task on the captured runtime; the task writes queued units
//! in FIFO order, then releases the flag. No task outlives an empty queue.
//!
//! A writer failure or panic is captured once and makes the sink errored:
//! later batches are discarded and [`ReportSink::write_final`] fails with the
//! captured error.

use crate::config::ReportConfig;
use crate::error::{SinkError, SinkResult};
use crate::item::ReportItem;
use crate::scenario::ScenarioRunResult;
use async_trait::async_trait;
use chrono::Utc;
use crossbeam::queue::SegQueue;
use futures::FutureExt;
use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Mutex};

/// Destination for report items
///
/// Implemented by renderers. Calls are never concurrent: the sink holds the
/// writer exclusively while draining.
#[async_trait]
pub trait ReportWriter: Send {
    /// Write one item
    async fn write(&mut self, item: &ReportItem) -> anyhow::Result<()>;

    /// Flush buffered output; called once after the final item
    async fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Observable sink state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Nothing being written
    Idle,
    /// A drain task owns the queue
    Draining,
    /// Final write requested, not yet completed
    Finalizing,
    /// Report complete
    Done,
    /// A write failed; absorbing
    Errored,
}

enum Unit {
    Batch(Vec<ReportItem>),
    Finish(oneshot::Sender<SinkResult<()>>),
}

struct SinkInner {
    queue: SegQueue<Unit>,
    draining: AtomicBool,
    finalizing: AtomicBool,
    done: AtomicBool,
    error: OnceLock<Arc<anyhow::Error>>,
    writer: Mutex<Box<dyn ReportWriter>>,
    runtime: Handle,
}

/// Shared handle to the report sink
///
/// Cloning is cheap; every clone feeds the same queue.
#[derive(Clone)]
pub struct ReportSink {
    inner: Arc<SinkInner>,
}

impl ReportSink {
    /// Create sink draining on the current Tokio runtime
    ///
    /// The report header is queued immediately.
    ///
    /// # Errors
    /// [`SinkError::NoRuntime`] outside a Tokio runtime.
    pub fn new<W>(config: &ReportConfig, writer: W) -> SinkResult<Self>
    where
        W: ReportWriter + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| SinkError::NoRuntime)?;
        Ok(Self::with_handle(runtime, config, writer))
    }

    /// Create sink draining on `runtime`
    pub fn with_handle<W>(runtime: Handle, config: &ReportConfig, writer: W) -> Self
    where
        W: ReportWriter + 'static,
    {
        let sink = Self {
            inner: Arc::new(SinkInner {
                queue: SegQueue::new(),
                draining: AtomicBool::new(false),
                finalizing: AtomicBool::new(false),
                done: AtomicBool::new(false),
                error: OnceLock::new(),
                writer: Mutex::new(Box::new(writer)),
                runtime,
            }),
        };
        sink.inner.queue.push(Unit::Batch(vec![ReportItem::StartReport {
            title: config.title.clone(),
            started_at: Utc::now(),
        }]));
        sink.schedule();
        sink
    }

    /// Queue a finished scenario
    ///
    /// Never blocks and never writes on the caller's task. Results reported
    /// after [`write_final`](Self::write_final) are dropped, as are results
    /// reported once the sink has errored.
    pub fn report(&self, result: ScenarioRunResult) {
        if self.inner.finalizing.load(Ordering::SeqCst) {
            tracing::warn!(scenario = result.title(), "report already finalized; result dropped");
            return;
        }
        if self.inner.error.get().is_some() {
            tracing::debug!(scenario = result.title(), "sink errored; result discarded");
            return;
        }
        self.inner.queue.push(Unit::Batch(result.into_items()));
        self.schedule();
    }

    /// Queue the report footer and wait until everything is written
    ///
    /// # Errors
    /// - [`SinkError::WriteFailed`] with the first captured writer failure
    /// - [`SinkError::AlreadyFinalized`] on a second call
    /// - [`SinkError::DrainStopped`] if the drain task was dropped
    pub async fn write_final(&self) -> SinkResult<()> {
        if let Some(error) = self.inner.error.get() {
            return Err(SinkError::WriteFailed(Arc::clone(error)));
        }
        if self.inner.finalizing.swap(true, Ordering::SeqCst) {
            return Err(SinkError::AlreadyFinalized);
        }

        let (reply, done) = oneshot::channel();
        self.inner.queue.push(Unit::Finish(reply));
        self.schedule();
        done.await.map_err(|_| SinkError::DrainStopped)?
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SinkState {
        if self.inner.error.get().is_some() {
            SinkState::Errored
        } else if self.inner.done.load(Ordering::SeqCst) {
            SinkState::Done
        } else if self.inner.finalizing.load(Ordering::SeqCst) {
            SinkState::Finalizing
        } else if self.inner.draining.load(Ordering::SeqCst) {
            SinkState::Draining
        } else {
            SinkState::Idle
        }
    }

    /// Units queued and not yet taken by a drain task
    #[must_use]
    pub fn pending_units(&self) -> usize {
        self.inner.queue.len()
    }

    fn schedule(&self) {
        fence(Ordering::SeqCst);
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::trace!("drain ownership acquired");
            self.inner.runtime.spawn(drain(Arc::clone(&self.inner)));
        }
    }
}

impl Debug for ReportSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportSink")
            .field("state", &self.state())
            .field("pending_units", &self.pending_units())
            .finish_non_exhaustive()
    }
}

/// Drain the queue until it is empty and no one else can claim it
async fn drain(inner: Arc<SinkInner>) {
    loop {
        {
            let mut writer = inner.writer.lock().await;
            while let Some(unit) = inner.queue.pop() {
                inner.process(&mut **writer, unit).await;
            }
        }

        // Release, then re-check: a unit pushed while we held the flag must
        // not be stranded.
        inner.draining.store(false, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        if inner.queue.is_empty()
            || inner
                .draining
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            break;
        }
    }
    tracing::trace!("drain ownership released");
}

impl SinkInner {
    async fn process(&self, writer: &mut dyn ReportWriter, unit: Unit) {
        match unit {
            Unit::Batch(items) => {
                if self.error.get().is_some() {
                    return;
                }
                if self.done.load(Ordering::SeqCst) {
                    tracing::warn!(items = items.len(), "batch queued after report end dropped");
                    return;
                }
                for item in &items {
                    if let Err(error) = guarded(writer.write(item)).await {
                        self.fail(error);
                        return;
                    }
                }
            }
            Unit::Finish(reply) => {
                let result = self.finish(writer).await;
                self.done.store(true, Ordering::SeqCst);
                if reply.send(result).is_err() {
                    tracing::debug!("final write no longer awaited");
                }
            }
        }
    }

    async fn finish(&self, writer: &mut dyn ReportWriter) -> SinkResult<()> {
        if self.error.get().is_none() {
            let footer = ReportItem::EndReport {
                finished_at: Utc::now(),
            };
            let written = match guarded(writer.write(&footer)).await {
                Ok(()) => guarded(writer.flush()).await,
                Err(error) => Err(error),
            };
            if let Err(error) = written {
                self.fail(error);
            }
        }

        match self.error.get() {
            Some(error) => Err(SinkError::WriteFailed(Arc::clone(error))),
            None => {
                tracing::debug!("report written");
                Ok(())
            }
        }
    }

    fn fail(&self, error: anyhow::Error) {
        let message = format!("{error:#}");
        if self.error.set(Arc::new(error)).is_ok() {
            tracing::error!(error = %message, "report writer failed; sink errored");
        }
    }
}

/// Await a writer call, turning a panic into an error
async fn guarded<F>(call: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!(
            "report writer panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

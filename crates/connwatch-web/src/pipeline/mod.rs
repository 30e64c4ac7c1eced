use std::collections::BTreeMap;
use std::sync::Arc;

use connwatch_engine::aggregate::chain_speed_rows;
use connwatch_engine::{EngineConfig, Pipeline, PreferenceStore, TickOutcome, ViewPrefs};
use connwatch_types::{Connection, SnapshotMessage, TrafficTotals, ViewsUpdate};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMMAND_QUEUE_DEPTH: usize = 64;

pub enum PipelineCommand {
    Snapshot(Option<SnapshotMessage>),
    SetPaused {
        paused: bool,
        reply: oneshot::Sender<bool>,
    },
    GrowCapacity {
        reply: oneshot::Sender<usize>,
    },
    Reset {
        reason: &'static str,
        reply: oneshot::Sender<usize>,
    },
}

/// Read side of the pipeline outputs. Cloning is cheap.
#[derive(Clone)]
pub struct ViewReceivers {
    pub active: watch::Receiver<Arc<Vec<Connection>>>,
    pub closed: watch::Receiver<Arc<Vec<Connection>>>,
    pub chains: watch::Receiver<Arc<BTreeMap<String, i64>>>,
    pub paused: watch::Receiver<bool>,
    pub totals: watch::Receiver<TrafficTotals>,
}

impl ViewReceivers {
    pub fn current(&self) -> ViewsUpdate {
        ViewsUpdate {
            active: self.active.borrow().as_ref().clone(),
            closed: self.closed.borrow().as_ref().clone(),
            chains: chain_speed_rows(&self.chains.borrow()),
            paused: *self.paused.borrow(),
            totals: *self.totals.borrow(),
        }
    }

    /// Like [`Self::current`], but marks every output as seen so that
    /// [`Self::changed`] only wakes on later publications.
    pub fn current_marking_seen(&mut self) -> ViewsUpdate {
        ViewsUpdate {
            active: self.active.borrow_and_update().as_ref().clone(),
            closed: self.closed.borrow_and_update().as_ref().clone(),
            chains: chain_speed_rows(&self.chains.borrow_and_update()),
            paused: *self.paused.borrow_and_update(),
            totals: *self.totals.borrow_and_update(),
        }
    }

    /// Waits until the views or the paused flag change. Totals alone do not wake.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        tokio::select! {
            changed = self.active.changed() => changed,
            changed = self.closed.changed() => changed,
            changed = self.paused.changed() => changed,
        }
    }
}

/// Handle to the single task that owns the [`Pipeline`].
#[derive(Clone)]
pub struct PipelineHandle {
    commands: mpsc::Sender<PipelineCommand>,
    views: ViewReceivers,
}

impl PipelineHandle {
    pub fn views(&self) -> &ViewReceivers {
        &self.views
    }

    pub async fn submit_snapshot(&self, message: Option<SnapshotMessage>) -> Result<(), String> {
        self.commands
            .send(PipelineCommand::Snapshot(message))
            .await
            .map_err(|_| "pipeline task stopped".to_string())
    }

    /// Returns the paused flag after the command was applied.
    pub async fn set_paused(&self, paused: bool) -> Result<bool, String> {
        self.request(|reply| PipelineCommand::SetPaused { paused, reply })
            .await
    }

    /// Returns the new visible row capacity.
    pub async fn grow_capacity(&self) -> Result<usize, String> {
        self.request(|reply| PipelineCommand::GrowCapacity { reply })
            .await
    }

    /// Returns how many ledger entries were dropped.
    pub async fn reset(&self, reason: &'static str) -> Result<usize, String> {
        self.request(|reply| PipelineCommand::Reset { reason, reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> PipelineCommand,
    ) -> Result<T, String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| "pipeline task stopped".to_string())?;
        reply_rx
            .await
            .map_err(|_| "pipeline task dropped the reply".to_string())
    }
}

struct ViewPublisher {
    active: watch::Sender<Arc<Vec<Connection>>>,
    closed: watch::Sender<Arc<Vec<Connection>>>,
    chains: watch::Sender<Arc<BTreeMap<String, i64>>>,
    paused: watch::Sender<bool>,
    totals: watch::Sender<TrafficTotals>,
}

impl ViewPublisher {
    fn new(pipeline: &Pipeline) -> (Self, ViewReceivers) {
        let (active, active_rx) = watch::channel(Arc::new(pipeline.active_view().to_vec()));
        let (closed, closed_rx) = watch::channel(Arc::new(pipeline.closed_view().to_vec()));
        let (chains, chains_rx) = watch::channel(Arc::new(pipeline.chain_speeds().clone()));
        let (paused, paused_rx) = watch::channel(pipeline.paused());
        let (totals, totals_rx) = watch::channel(pipeline.totals());
        (
            Self {
                active,
                closed,
                chains,
                paused,
                totals,
            },
            ViewReceivers {
                active: active_rx,
                closed: closed_rx,
                chains: chains_rx,
                paused: paused_rx,
                totals: totals_rx,
            },
        )
    }

    fn publish_views(&self, pipeline: &Pipeline) {
        self.active
            .send_replace(Arc::new(pipeline.active_view().to_vec()));
        self.closed
            .send_replace(Arc::new(pipeline.closed_view().to_vec()));
        self.chains
            .send_replace(Arc::new(pipeline.chain_speeds().clone()));
    }

    fn publish_paused(&self, paused: bool) {
        self.paused.send_if_modified(|current| {
            let changed = *current != paused;
            *current = paused;
            changed
        });
    }

    fn publish_totals(&self, totals: TrafficTotals) {
        self.totals.send_if_modified(|current| {
            let changed = *current != totals;
            *current = totals;
            changed
        });
    }
}

/// Spawns the pipeline task. The task exits once every handle is dropped.
pub fn spawn_pipeline(
    config: EngineConfig,
    prefs: Arc<dyn PreferenceStore>,
) -> (PipelineHandle, JoinHandle<()>) {
    let pipeline = Pipeline::new(config);
    let (publisher, views) = ViewPublisher::new(&pipeline);
    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let task = tokio::spawn(run_pipeline(pipeline, prefs, command_rx, publisher));
    (PipelineHandle { commands, views }, task)
}

async fn run_pipeline(
    mut pipeline: Pipeline,
    prefs: Arc<dyn PreferenceStore>,
    mut commands: mpsc::Receiver<PipelineCommand>,
    publisher: ViewPublisher,
) {
    while let Some(command) = commands.recv().await {
        match command {
            PipelineCommand::Snapshot(message) => {
                let view_prefs = ViewPrefs::load(prefs.as_ref());
                match pipeline.ingest(message, &view_prefs) {
                    TickOutcome::Skipped => debug!("snapshot without connections, views kept"),
                    TickOutcome::Frozen { ledger_len } => {
                        debug!(ledger_len, "paused, views frozen")
                    }
                    TickOutcome::Materialized { .. } => publisher.publish_views(&pipeline),
                }
                publisher.publish_totals(pipeline.totals());
            }
            PipelineCommand::SetPaused { paused, reply } => {
                if pipeline.set_paused(paused) {
                    info!(paused, "pause state changed");
                }
                publisher.publish_paused(pipeline.paused());
                let _ = reply.send(pipeline.paused());
            }
            PipelineCommand::GrowCapacity { reply } => {
                let rows = pipeline.grow_capacity();
                debug!(rows, "view capacity grown");
                let _ = reply.send(rows);
            }
            PipelineCommand::Reset { reason, reply } => {
                let cleared = pipeline.reset();
                info!(reason, cleared, "pipeline reset");
                publisher.publish_views(&pipeline);
                publisher.publish_paused(pipeline.paused());
                publisher.publish_totals(pipeline.totals());
                let _ = reply.send(cleared);
            }
        }
    }
    debug!("pipeline command channel closed");
}

//! The polling state machine and shared dashboard state.
//!
//! One fixed-cadence loop drives everything: each tick polls status first,
//! then step count, and fetches only the history slice beyond what is already
//! known. A simple re-entrancy flag guarantees at most one in-flight history
//! fetch — ticks that land while a fetch is outstanding are dropped, never
//! queued. Transport failures are logged and the tick becomes a no-op; the
//! next tick is the retry.
//!
//! Reset sequencing: a reset registers a one-shot "ready" hook that clears
//! the log and bindings and bumps an epoch counter. History fetches capture
//! the epoch before issuing requests and discard their result if it moved,
//! so a fetch that was in flight across a reset can never append stale
//! records to the cleared log.

use crate::catalog;
use crate::charts::ChartBindings;
use crate::client::{ApiClient, ClientError};
use crate::config::ConfigTracker;
use crate::history::{HistoryLog, StepRecord};
use crate::policy::{PolicyError, PolicyInvocation, PolicyTracker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Simulation phase as reported by the server.
///
/// Mutating actions (stepping, applying config, submitting policies) are
/// permitted only while `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Loading,
    Ready,
    Running,
}

impl SimulationStatus {
    pub fn is_ready(self) -> bool {
        matches!(self, SimulationStatus::Ready)
    }

    pub fn label(self) -> &'static str {
        match self {
            SimulationStatus::Loading => "loading",
            SimulationStatus::Ready => "ready",
            SimulationStatus::Running => "running",
        }
    }
}

/// A one-shot subscription: fires on the next poll that reports its status,
/// then is gone.
type StatusHook = Box<dyn FnOnce(&mut Dashboard) + Send + Sync>;

#[derive(Default)]
struct StatusListeners {
    loading: Vec<StatusHook>,
    ready: Vec<StatusHook>,
    running: Vec<StatusHook>,
}

impl StatusListeners {
    fn slot(&mut self, status: SimulationStatus) -> &mut Vec<StatusHook> {
        match status {
            SimulationStatus::Loading => &mut self.loading,
            SimulationStatus::Ready => &mut self.ready,
            SimulationStatus::Running => &mut self.running,
        }
    }
}

/// All client-side state: the history log, the chart bindings, the staging
/// trackers, and the polling bookkeeping.
///
/// Shared as `Arc<RwLock<Dashboard>>`; the lock is the explicit mutation
/// boundary around log appends and binding updates.
pub struct Dashboard {
    pub history: HistoryLog,
    pub charts: ChartBindings,
    pub config: ConfigTracker,
    pub policies: PolicyTracker,
    status: SimulationStatus,
    listeners: StatusListeners,
    fetching: bool,
    epoch: u64,
    config_reload_pending: bool,
}

impl Dashboard {
    pub fn new(charts: ChartBindings, config: ConfigTracker, policies: PolicyTracker) -> Self {
        Self {
            history: HistoryLog::new(),
            charts,
            config,
            policies,
            status: SimulationStatus::Loading,
            listeners: StatusListeners::default(),
            fetching: false,
            epoch: 0,
            config_reload_pending: false,
        }
    }

    /// A dashboard wired with the built-in catalog (charts, config fields,
    /// policies).
    pub fn with_catalog() -> Self {
        Self::new(
            ChartBindings::new(catalog::charts(), catalog::scatters()),
            ConfigTracker::new(
                catalog::CONFIG_FIELDS.to_vec(),
                catalog::PUBLISHER_FIELDS.to_vec(),
                catalog::default_publisher(),
            ),
            PolicyTracker::new(catalog::policies()),
        )
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    /// Whether mutating operator actions are currently permitted.
    pub fn actions_enabled(&self) -> bool {
        self.status.is_ready()
    }

    /// True while a history fetch cycle is outstanding.
    pub fn fetching(&self) -> bool {
        self.fetching
    }

    /// Register a one-shot hook for the next poll reporting `status`.
    ///
    /// Each registration fires at most once; firing drains only the polled
    /// status's list. A hook registered while its list is firing lands in the
    /// fresh list and waits for the next matching poll.
    pub fn on(&mut self, status: SimulationStatus, hook: impl FnOnce(&mut Dashboard) + Send + Sync + 'static) {
        self.listeners.slot(status).push(Box::new(hook));
    }

    fn fire_status_hooks(&mut self, status: SimulationStatus) {
        let hooks = std::mem::take(self.listeners.slot(status));
        for hook in hooks {
            hook(self);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("simulation is not ready (status: {0})")]
    NotReady(&'static str),
    #[error("no configuration loaded to submit")]
    NoConfig,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// The polling state machine.
///
/// Cheap to clone; clones share the same dashboard. `start` spawns the
/// cadence loop and returns its handle — aborting the handle stops polling.
#[derive(Clone)]
pub struct SyncController {
    client: ApiClient,
    state: Arc<RwLock<Dashboard>>,
}

impl SyncController {
    pub fn new(client: ApiClient, state: Arc<RwLock<Dashboard>>) -> Self {
        Self { client, state }
    }

    pub fn state(&self) -> &Arc<RwLock<Dashboard>> {
        &self.state
    }

    /// Seed the trackers with the server's current config and enacted
    /// policies. Failures are logged; polling will still start.
    pub async fn load_initial(&self) {
        match self.client.config().await {
            Ok(cfg) => self.state.write().await.config.load(cfg),
            Err(e) => warn!("initial config load failed: {e}"),
        }
        match self.client.policies().await {
            Ok(enacted) => self.state.write().await.policies.load(enacted),
            Err(e) => warn!("initial policy load failed: {e}"),
        }
    }

    /// Begin the fixed-cadence polling loop.
    ///
    /// Status is polled inline each tick; the history fetch runs as a
    /// detached task so a slow fetch never delays the cadence — overlapping
    /// ticks are dropped by the in-flight guard.
    pub fn start(&self, interval_ms: u64) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                this.poll_status().await;
                let fetcher = this.clone();
                tokio::spawn(async move {
                    fetcher.poll_history().await;
                });
            }
        })
    }

    /// One full poll cycle, awaited inline: status, then history.
    pub async fn tick(&self) {
        self.poll_status().await;
        self.poll_history().await;
    }

    /// Poll `/status`, update the dashboard, and drain that status's one-shot
    /// hooks. Also performs a pending configuration reload once the hook that
    /// requested it has run.
    pub async fn poll_status(&self) {
        let status = match self.client.status().await {
            Ok(s) => s,
            Err(e) => {
                warn!("status poll failed: {e}");
                return;
            }
        };

        let reload = {
            let mut d = self.state.write().await;
            if d.status != status {
                info!("simulation status: {}", status.label());
            }
            d.status = status;
            d.fire_status_hooks(status);
            d.config_reload_pending
        };

        if reload {
            match self.client.config().await {
                Ok(cfg) => {
                    let mut d = self.state.write().await;
                    d.config.load(cfg);
                    d.config_reload_pending = false;
                    info!("configuration reloaded");
                }
                Err(e) => warn!("config reload failed: {e}"),
            }
        }
    }

    /// Poll `/state/step` and fetch the history slice beyond the local log.
    ///
    /// No-op if a fetch cycle is already outstanding (coalesced, not queued)
    /// or if the server reports nothing new. Results fetched across a reset
    /// are discarded via the epoch guard.
    pub async fn poll_history(&self) {
        let (from, epoch) = {
            let mut d = self.state.write().await;
            if d.fetching {
                return;
            }
            d.fetching = true;
            (d.history.next_step(), d.epoch)
        };

        let result = self.fetch_new(from).await;

        let mut guard = self.state.write().await;
        let d = &mut *guard;
        d.fetching = false;
        let records = match result {
            Ok(Some(records)) => records,
            Ok(None) => return,
            Err(e) => {
                warn!("history poll failed: {e}");
                return;
            }
        };
        if d.epoch != epoch {
            debug!(
                "discarding {} history records fetched across a reset",
                records.len()
            );
            return;
        }
        match d.history.extend(records) {
            Ok(appended) if appended > 0 => {
                let start = d.history.len() - appended;
                d.charts.append(&d.history.records()[start..]);
                debug!("appended {appended} history records (log length {})", d.history.len());
            }
            Ok(_) => {}
            Err(e) => warn!("rejected history batch: {e}"),
        }
    }

    async fn fetch_new(&self, from: u64) -> Result<Option<Vec<StepRecord>>, ClientError> {
        let reported = self.client.current_step().await?;
        if reported < from {
            return Ok(None);
        }
        let records = self.client.history(from, reported).await?;
        Ok(Some(records))
    }

    /// Advance the simulation by `steps`. Permitted only while ready.
    pub async fn run_steps(&self, steps: u32) -> Result<(), SyncError> {
        {
            let d = self.state.read().await;
            if !d.status.is_ready() {
                return Err(SyncError::NotReady(d.status.label()));
            }
        }
        self.client.run_steps(steps).await?;
        info!("requested {steps} simulation steps");
        Ok(())
    }

    /// Submit the staged configuration to the reset endpoint.
    ///
    /// Applying a new configuration and resetting the run are deliberately
    /// the same operation. On ack, a one-shot ready hook clears the log and
    /// bindings, bumps the epoch (invalidating any in-flight fetch), and
    /// schedules a configuration reload.
    pub async fn reset(&self) -> Result<(), SyncError> {
        let draft = {
            let d = self.state.read().await;
            if !d.status.is_ready() {
                return Err(SyncError::NotReady(d.status.label()));
            }
            if !d.config.is_loaded() {
                return Err(SyncError::NoConfig);
            }
            d.config.draft().clone()
        };
        self.client.reset(&draft).await?;
        info!("reset submitted");

        let mut d = self.state.write().await;
        d.on(SimulationStatus::Ready, |d| {
            d.history.clear();
            d.charts.reset();
            d.epoch += 1;
            d.config_reload_pending = true;
            info!("reset complete, dashboard cleared");
        });
        Ok(())
    }

    /// Validate, stage, and submit one policy invocation, queued at the
    /// current step. Permitted only while ready.
    pub async fn enact_policy(&self, name: &str) -> Result<PolicyInvocation, SyncError> {
        let invocation = {
            let mut d = self.state.write().await;
            if !d.status.is_ready() {
                return Err(SyncError::NotReady(d.status.label()));
            }
            let step = d.history.next_step();
            d.policies.stage(name, step)?
        };
        self.client
            .enact(&invocation.name, &invocation.values())
            .await?;
        info!("enacted policy {}", invocation.name);
        Ok(invocation)
    }
}

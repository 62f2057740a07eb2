//! Monitoring loop and its lifecycle controller.
//!
//! [`MonitorController`] is the on/off switch. Each `start` opens a session:
//! a spawned task that owns the containment tracker, the active-target cache
//! and the location subscription, and evaluates fixes strictly in arrival
//! order. Persistence goes through a per-session [`EventWriter`].

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::status::{STATUS_NO_TARGETS, STATUS_PERMISSION_REVOKED, STATUS_WAITING};
use crate::models::{LocationFix, LocationUpdateConfig, NewLogRecord, Target, TrackingStatus};
use crate::services::alert::AlertSink;
use crate::services::containment::ContainmentTracker;
use crate::services::event_log::EventLogSink;
use crate::services::event_writer::{EventWriter, DEFAULT_WRITE_QUEUE_CAPACITY};
use crate::services::keep_alive::{KeepAlive, KeepAliveHandle};
use crate::services::location_source::{LocationError, LocationSource, LocationSubscription};
use crate::services::proximity::{EvaluatorPolicy, ProximityEvaluator};
use crate::services::target_store::TargetStore;

/// Collaborators a monitoring session works with.
#[derive(Clone)]
pub struct MonitorDeps {
    pub targets: Arc<dyn TargetStore>,
    pub event_log: Arc<dyn EventLogSink>,
    pub location: Arc<dyn LocationSource>,
    pub keep_alive: Arc<dyn KeepAlive>,
    pub alerts: Arc<dyn AlertSink>,
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub update_config: LocationUpdateConfig,
    pub policy: EvaluatorPolicy,
    pub write_queue_capacity: usize,
    /// How long `stop` waits for queued writes to finish.
    pub drain_timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            update_config: LocationUpdateConfig::default(),
            policy: EvaluatorPolicy::default(),
            write_queue_capacity: DEFAULT_WRITE_QUEUE_CAPACITY,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// The two commands the control surface can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
}

impl ControlCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlCommand::Start => "start",
            ControlCommand::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown control command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(ControlCommand::Start),
            "stop" => Ok(ControlCommand::Stop),
            _ => Err(UnknownCommand(s.to_string())),
        }
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Idempotent start/stop switch for proximity monitoring.
///
/// Neither `start` nor `stop` ever fails; problems are reported through the
/// published [`TrackingStatus`].
pub struct MonitorController {
    deps: MonitorDeps,
    settings: MonitorSettings,
    session: Mutex<Option<Session>>,
    status_tx: Arc<watch::Sender<TrackingStatus>>,
}

impl MonitorController {
    pub fn new(deps: MonitorDeps, settings: MonitorSettings) -> Self {
        let (status_tx, _) = watch::channel(TrackingStatus::stopped());
        Self {
            deps,
            settings,
            session: Mutex::new(None),
            status_tx: Arc::new(status_tx),
        }
    }

    /// Live status updates.
    pub fn status(&self) -> watch::Receiver<TrackingStatus> {
        self.status_tx.subscribe()
    }

    pub fn current_status(&self) -> TrackingStatus {
        self.status_tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status_tx.borrow().is_running()
    }

    pub async fn handle(&self, command: ControlCommand) {
        debug!(command = %command, "Control command received");
        match command {
            ControlCommand::Start => self.start().await,
            ControlCommand::Stop => self.stop().await,
        }
    }

    /// Starts a monitoring session unless one is already running.
    pub async fn start(&self) {
        let mut session = self.session.lock().await;

        if let Some(current) = session.as_ref() {
            if !current.task.is_finished() && self.is_running() {
                debug!("Tracking already running");
                return;
            }
        }
        // A session that halted on its own is reaped before starting over.
        if let Some(previous) = session.take() {
            previous.cancel.cancel();
            if let Err(e) = previous.task.await {
                error!(error = %e, "Previous monitoring task failed");
            }
        }

        let keep_alive = self.deps.keep_alive.acquire(STATUS_WAITING);
        let targets_rx = self.deps.targets.subscribe_active_targets();

        let subscription = match self.deps.location.request_updates(self.settings.update_config)
        {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "Location updates unavailable, tracking not started");
                keep_alive.release();
                let status = match e {
                    LocationError::PermissionDenied => {
                        TrackingStatus::halted(STATUS_PERMISSION_REVOKED)
                    }
                    LocationError::ProviderUnavailable(_) => {
                        TrackingStatus::halted(format!("tracking halted: {e}"))
                    }
                };
                let record =
                    NewLogRecord::system(format!("Tracking not started: {e}"), now_millis());
                if let Err(e) = self.deps.event_log.append(record).await {
                    warn!(error = %e, "Failed to record tracking failure");
                }
                self.status_tx.send_replace(status);
                return;
            }
        };

        let (writer, writer_task) = EventWriter::spawn(
            self.deps.event_log.clone(),
            self.deps.targets.clone(),
            self.settings.write_queue_capacity,
        );
        writer.append(NewLogRecord::system("Tracking started", now_millis()));

        let cancel = CancellationToken::new();
        let mut run = MonitorRun {
            evaluator: ProximityEvaluator::new(self.settings.policy),
            tracker: ContainmentTracker::new(),
            targets: Vec::new(),
            alerted_at: HashMap::new(),
            flagged: HashSet::new(),
            last_fix_at: None,
            targets_rx,
            subscription,
            writer,
            writer_task,
            keep_alive,
            alerts: self.deps.alerts.clone(),
            status_tx: self.status_tx.clone(),
            cancel: cancel.clone(),
            drain_timeout: self.settings.drain_timeout,
        };
        run.refresh_targets();

        info!(
            active_targets = run.targets.len(),
            high_accuracy = self.settings.update_config.high_accuracy,
            min_interval_ms = self.settings.update_config.min_interval_ms,
            min_distance_meters = self.settings.update_config.min_distance_meters,
            "Tracking started"
        );

        *session = Some(Session {
            cancel,
            task: tokio::spawn(run.run()),
        });
    }

    /// Stops the running session. A no-op when nothing is running.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        let Some(current) = session.take() else {
            debug!("Tracking not running");
            return;
        };

        current.cancel.cancel();
        if let Err(e) = current.task.await {
            error!(error = %e, "Monitoring task failed");
        }
    }
}

impl Drop for MonitorController {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunExit {
    Stopped,
    Halted(&'static str),
}

/// State owned by one running session.
struct MonitorRun {
    evaluator: ProximityEvaluator,
    tracker: ContainmentTracker,
    targets: Vec<Target>,
    /// Alerts fired this session; survives cache refreshes that race the
    /// `last_triggered` write.
    alerted_at: HashMap<Uuid, i64>,
    /// Malformed targets already reported this session.
    flagged: HashSet<Uuid>,
    last_fix_at: Option<i64>,
    targets_rx: watch::Receiver<Vec<Target>>,
    subscription: LocationSubscription,
    writer: EventWriter,
    writer_task: JoinHandle<()>,
    keep_alive: Box<dyn KeepAliveHandle>,
    alerts: Arc<dyn AlertSink>,
    status_tx: Arc<watch::Sender<TrackingStatus>>,
    cancel: CancellationToken,
    drain_timeout: Duration,
}

impl MonitorRun {
    async fn run(mut self) {
        let exit = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break RunExit::Stopped,

                changed = self.targets_rx.changed() => {
                    if changed.is_err() {
                        break RunExit::Halted("target store unavailable");
                    }
                    self.refresh_targets();
                }

                item = self.subscription.recv() => match item {
                    Some(Ok(fix)) => self.on_fix(fix),
                    Some(Err(LocationError::PermissionDenied)) => {
                        break RunExit::Halted("permission revoked");
                    }
                    Some(Err(LocationError::ProviderUnavailable(reason))) => {
                        self.on_provider_unavailable(&reason);
                    }
                    None => break RunExit::Halted("location source closed"),
                },
            }
        };

        self.shutdown(exit).await;
    }

    fn refresh_targets(&mut self) {
        let mut latest = self.targets_rx.borrow_and_update().clone();
        latest.retain(|t| t.is_active);
        for target in &mut latest {
            if let Some(&alerted) = self.alerted_at.get(&target.id) {
                target.last_triggered = target.last_triggered.max(alerted);
            }
        }

        let active: HashSet<Uuid> = latest.iter().map(|t| t.id).collect();
        let released = self.tracker.retain_targets(&active);
        if !released.is_empty() {
            debug!(count = released.len(), "Released containment state for inactive targets");
        }

        self.targets = latest;
        debug!(active_targets = self.targets.len(), "Target cache refreshed");

        if self.targets.is_empty() {
            let status = TrackingStatus::no_targets();
            self.publish(match self.last_fix_at {
                Some(ts) => status.at_fix(ts),
                None => status,
            });
        } else if self.last_fix_at.is_none()
            || self.status_tx.borrow().summary == STATUS_NO_TARGETS
        {
            self.publish(TrackingStatus::waiting());
        }
    }

    fn on_fix(&mut self, fix: LocationFix) {
        metrics::counter!("location_fixes_total").increment(1);
        self.last_fix_at = Some(fix.timestamp);

        let evaluation = self
            .evaluator
            .evaluate(&fix, &self.targets, &mut self.tracker);

        for (target_id, problem) in &evaluation.rejected {
            if !self.flagged.insert(*target_id) {
                continue;
            }
            let name = self
                .targets
                .iter()
                .find(|t| t.id == *target_id)
                .map(|t| t.name.clone())
                .unwrap_or_default();
            warn!(target_id = %target_id, problem = %problem, "Skipping malformed target");
            self.writer.append(NewLogRecord::system(
                format!("Skipped target \"{name}\": {problem}"),
                fix.timestamp,
            ));
        }

        for transition in &evaluation.transitions {
            metrics::counter!("geofence_transitions_total", "kind" => transition.kind.as_str())
                .increment(1);
            info!(
                target_id = %transition.target_id,
                target_name = %transition.target_name,
                kind = %transition.kind,
                distance_meters = transition.distance_meters,
                fires_alert = transition.fires_alert,
                "Geofence transition"
            );
            self.writer.append(NewLogRecord::from_transition(transition));

            if transition.fires_alert {
                self.alerts.fire(&transition.target_name);
                self.writer
                    .last_triggered(transition.target_id, transition.timestamp);
                self.alerted_at
                    .insert(transition.target_id, transition.timestamp);
                if let Some(target) = self
                    .targets
                    .iter_mut()
                    .find(|t| t.id == transition.target_id)
                {
                    target.last_triggered = transition.timestamp;
                }
            }
        }

        self.publish(evaluation.status(fix.timestamp));
    }

    fn on_provider_unavailable(&mut self, reason: &str) {
        warn!(reason = %reason, "Location provider unavailable");
        self.writer.append(NewLogRecord::system(
            format!("Location provider unavailable: {reason}"),
            now_millis(),
        ));

        let status = TrackingStatus::signal_lost();
        self.publish(match self.last_fix_at {
            Some(ts) => status.at_fix(ts),
            None => status,
        });
    }

    fn publish(&self, status: TrackingStatus) {
        self.keep_alive.update(&status.summary);
        self.status_tx.send_replace(status);
    }

    async fn shutdown(self, exit: RunExit) {
        let MonitorRun {
            subscription,
            writer,
            writer_task,
            keep_alive,
            status_tx,
            drain_timeout,
            ..
        } = self;

        subscription.cancel();

        let (status, message) = match exit {
            RunExit::Stopped => {
                info!("Tracking stopped");
                (TrackingStatus::stopped(), "Tracking stopped".to_string())
            }
            RunExit::Halted(reason) => {
                warn!(reason = reason, "Tracking halted");
                (
                    TrackingStatus::halted(format!("tracking halted: {reason}")),
                    format!("Tracking halted: {reason}"),
                )
            }
        };

        writer.append(NewLogRecord::system(message, now_millis()));
        keep_alive.update(&status.summary);
        keep_alive.release();
        status_tx.send_replace(status);

        drop(subscription);
        drop(writer);
        if tokio::time::timeout(drain_timeout, writer_task).await.is_err() {
            warn!("Pending writes did not finish before shutdown");
        }
    }
}

//! Concurrent fan-out of commands across the fleet.
//!
//! One dispatch call runs one worker per requested device, bounded by a
//! global in-flight ceiling. Workers are fully isolated: a device that
//! fails, times out, or rejects every credential never disturbs the
//! others. Every requested device ends up in exactly one of the three
//! result buckets.

pub mod sink;

pub use sink::{DeviceLog, FacadeSink, LogEntry, LogSink, NullSink};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::connector::{ConnectOutcome, Connector};
use crate::error::{PlatformError, Result};
use crate::executor::{BatchReport, CommandExecutor};
use crate::inventory::{DeviceFilter, Inventory};
use crate::platform::{PlatformCatalog, PlatformDefinition};

/// Whether a dispatch runs read-only show commands or mutating config
/// commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Read-only commands; outputs are returned verbatim.
    Show,
    /// Configuration commands; run as one batch with a trailing persist.
    Config,
}

/// The commands to run, in one of three addressing forms.
#[derive(Debug, Clone)]
pub enum CommandSet {
    /// The same literal commands on every device.
    Literal(Vec<String>),

    /// Commands keyed by platform tag; each device gets its platform's
    /// list.
    PerPlatform(HashMap<String, Vec<String>>),

    /// One abstract command id resolved through each platform's dialect
    /// table, with an optional `{}` argument.
    Dialect {
        /// Abstract command id.
        id: String,
        /// Substituted for `{}` in the dialect string.
        arg: Option<String>,
    },
}

impl CommandSet {
    /// A single literal command.
    pub fn single(command: impl Into<String>) -> Self {
        Self::Literal(vec![command.into()])
    }

    /// Resolve to the concrete command list for one platform.
    pub fn resolve(&self, platform: &PlatformDefinition) -> Result<Vec<String>> {
        match self {
            Self::Literal(commands) => Ok(commands.clone()),
            Self::PerPlatform(by_platform) => {
                by_platform.get(&platform.name).cloned().ok_or_else(|| {
                    PlatformError::UnknownCommand {
                        platform: platform.name.clone(),
                        id: "command set".to_string(),
                    }
                    .into()
                })
            }
            Self::Dialect { id, arg } => {
                Ok(vec![platform.render_dialect(id, arg.as_deref())?])
            }
        }
    }
}

/// Three-way partition of one dispatch call's devices.
#[derive(Debug, Default)]
pub struct DispatchResult {
    /// Device -> combined command output.
    pub succeeded: IndexMap<String, String>,

    /// Device -> error description.
    pub failed: IndexMap<String, String>,

    /// Devices that failed the reachability pre-check.
    pub unreachable: BTreeSet<String>,
}

impl DispatchResult {
    /// Total number of devices accounted for.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.unreachable.len()
    }

    /// One-line summary for operator output.
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} unreachable",
            self.succeeded.len(),
            self.failed.len(),
            self.unreachable.len()
        )
    }
}

enum WorkerOutcome {
    Succeeded(String),
    Failed(String),
    Unreachable,
}

/// Concurrency limits for one dispatch call.
///
/// Re-exported from the configuration layer.
pub use crate::config::DispatchLimits;

/// Fan-out orchestrator.
pub struct DispatchEngine<C: Connector> {
    inventory: Arc<Inventory>,
    catalog: Arc<PlatformCatalog>,
    connector: Arc<C>,
    limits: DispatchLimits,
    executor: CommandExecutor,
    sink: Arc<dyn LogSink>,
}

impl<C: Connector + 'static> DispatchEngine<C> {
    /// Create an engine.
    pub fn new(
        inventory: Arc<Inventory>,
        catalog: Arc<PlatformCatalog>,
        connector: Arc<C>,
        limits: DispatchLimits,
        settle_delay: Duration,
    ) -> Self {
        Self {
            inventory,
            catalog,
            connector,
            limits,
            executor: CommandExecutor::new(settle_delay),
            sink: Arc::new(FacadeSink),
        }
    }

    /// Replace the observability sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run `commands` on every named device concurrently.
    ///
    /// Duplicate names collapse; a single device or command is just a
    /// one-element set. The returned partition covers every requested
    /// device exactly once.
    pub async fn dispatch<I>(
        &self,
        devices: I,
        commands: CommandSet,
        mode: DispatchMode,
    ) -> DispatchResult
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut seen = BTreeSet::new();
        for device in devices {
            let name = device.into();
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }

        let commands = Arc::new(commands);
        let semaphore = Arc::new(Semaphore::new(self.limits.max_in_flight.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, WorkerOutcome)>();
        let mut workers: JoinSet<()> = JoinSet::new();

        for name in names.clone() {
            let tx = tx.clone();
            let semaphore = semaphore.clone();
            let inventory = self.inventory.clone();
            let catalog = self.catalog.clone();
            let connector = self.connector.clone();
            let commands = commands.clone();
            let sink = self.sink.clone();
            let executor = self.executor;

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = device_worker(
                    &name, &inventory, &catalog, &*connector, &commands, mode, executor, sink,
                )
                .await;
                let _ = tx.send((name, outcome));
            });
        }
        drop(tx);

        let mut result = DispatchResult::default();
        let collect = async {
            while let Some((name, outcome)) = rx.recv().await {
                match outcome {
                    WorkerOutcome::Succeeded(output) => {
                        result.succeeded.insert(name, output);
                    }
                    WorkerOutcome::Failed(message) => {
                        result.failed.insert(name, message);
                    }
                    WorkerOutcome::Unreachable => {
                        result.unreachable.insert(name);
                    }
                }
            }
        };

        match self.limits.overall_timeout() {
            Some(deadline) => {
                let _ = tokio::time::timeout(deadline, collect).await;
            }
            None => collect.await,
        }

        // Abort anything still in flight (dropping a worker closes its
        // session) and reap finished tasks.
        workers.shutdown().await;

        // A worker abandoned at the deadline never reported; its device is
        // a failure, never a silent drop and never a success.
        for name in names {
            if !result.succeeded.contains_key(&name)
                && !result.failed.contains_key(&name)
                && !result.unreachable.contains(&name)
            {
                result
                    .failed
                    .insert(name, "dispatch timed out before completion".to_string());
            }
        }

        result
    }

    /// Dispatch to every device matching the filter.
    pub async fn dispatch_filter(
        &self,
        filter: &DeviceFilter,
        commands: CommandSet,
        mode: DispatchMode,
    ) -> DispatchResult {
        let names: Vec<String> = self
            .inventory
            .select(filter)
            .into_iter()
            .map(|d| d.name.clone())
            .collect();
        self.dispatch(names, commands, mode).await
    }
}

/// One device's whole journey: resolve, connect, execute, close.
#[allow(clippy::too_many_arguments)]
async fn device_worker<C: Connector>(
    name: &str,
    inventory: &Inventory,
    catalog: &PlatformCatalog,
    connector: &C,
    commands: &CommandSet,
    mode: DispatchMode,
    executor: CommandExecutor,
    sink: Arc<dyn LogSink>,
) -> WorkerOutcome {
    let mut journal = DeviceLog::new(name);
    let outcome = run_device(
        name,
        inventory,
        catalog,
        connector,
        commands,
        mode,
        executor,
        &mut journal,
    )
    .await;
    journal.flush(sink.as_ref());
    outcome
}

#[allow(clippy::too_many_arguments)]
async fn run_device<C: Connector>(
    name: &str,
    inventory: &Inventory,
    catalog: &PlatformCatalog,
    connector: &C,
    commands: &CommandSet,
    mode: DispatchMode,
    executor: CommandExecutor,
    journal: &mut DeviceLog,
) -> WorkerOutcome {
    let device = match inventory.resolve(name) {
        Ok(device) => device,
        Err(e) => {
            journal.error(e.to_string());
            return WorkerOutcome::Failed(e.to_string());
        }
    };
    let platform = match catalog.get(&device.platform) {
        Ok(platform) => platform,
        Err(e) => {
            journal.error(e.to_string());
            return WorkerOutcome::Failed(e.to_string());
        }
    };
    let commands = match commands.resolve(platform) {
        Ok(commands) => commands,
        Err(e) => {
            journal.error(e.to_string());
            return WorkerOutcome::Failed(e.to_string());
        }
    };

    journal.info(format!("connecting to {}", device.address));
    let mut session = match connector.connect(device).await {
        ConnectOutcome::Connected(session) => session,
        ConnectOutcome::Unreachable => {
            journal.warn("unreachable (probe failed)");
            return WorkerOutcome::Unreachable;
        }
        ConnectOutcome::AuthFailed => {
            let message = "authentication failed: all credentials exhausted";
            journal.error(message);
            return WorkerOutcome::Failed(message.to_string());
        }
        ConnectOutcome::Failed(e) => {
            journal.error(e.to_string());
            return WorkerOutcome::Failed(e.to_string());
        }
    };

    let result = match mode {
        DispatchMode::Show => {
            let mut outputs = Vec::with_capacity(commands.len());
            let mut failure = None;
            for command in &commands {
                match executor.run_show(&mut session, command).await {
                    Ok(output) => outputs.push(output),
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            match failure {
                None => Ok(outputs.join("\n")),
                Some(e) => Err(e),
            }
        }
        DispatchMode::Config => executor
            .run_config_batch(&mut session, platform, &commands)
            .await
            .map(BatchReport::into_output),
    };

    // Exactly one session per device per dispatch, closed on every exit
    // path before the outcome is reported.
    if let Err(e) = crate::transport::Session::close(session).await {
        journal.warn(format!("session close failed: {}", e));
    }

    match result {
        Ok(output) => {
            journal.info("commands completed");
            WorkerOutcome::Succeeded(output)
        }
        Err(e) => {
            journal.error(e.to_string());
            WorkerOutcome::Failed(e.to_string())
        }
    }
}

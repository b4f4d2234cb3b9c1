//! The computer: owns a set of processors and containers, accepts lambda
//! invocations, and runs the virtual-time dispatcher loop that advances
//! container state as tasks complete.
//!
//! Grounded on spec.md §4.3's dispatcher-thread-loop and
//! utilization-collector-thread description, built from the now-precise
//! [`Processor`](super::Processor)/[`Container`](super::Container) models.
//! Per spec.md §9's "coroutine vs. thread" note, both loops are tokio
//! tasks rather than OS threads, coordinated with [`tokio::sync::Notify`]
//! instead of condition variables.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Mutex as AsyncMutex, Notify};
use tracing::{debug, instrument, warn};

use crate::domain_types::{FunctionName, TaskId};
use crate::error::ComputerConfigError;

use super::container::{Container, Task};
use super::lambda::LambdaDescriptor;
use super::processor::Processor;

/// How often the utilization-collector task samples each processor.
const UTILIZATION_SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// How often the dispatcher loop wakes even with no explicit notification,
/// as a safety net against a missed wakeup.
const DISPATCHER_TICK: Duration = Duration::from_millis(50);

struct ContainerState {
    container: Container,
    processor: String,
    waiters: HashMap<u64, oneshot::Sender<Result<(), DispatchError>>>,
}

/// Error returned when a lambda invocation cannot be admitted or does not
/// complete.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// No lambda is registered under this name.
    #[error("no lambda named {0}")]
    NoSuchLambda(FunctionName),
    /// The task's memory requirement exceeds its container's processor's
    /// total capacity; it can never be admitted.
    #[error("task requires {required} bytes, container's processor only has {available}")]
    OversizedRequest {
        /// Bytes of memory the task requires.
        required: u64,
        /// Bytes of memory actually available.
        available: u64,
    },
    /// The completion channel was dropped before the task finished,
    /// indicating the dispatcher loop stopped.
    #[error("dispatcher loop stopped before task completed")]
    DispatcherStopped,
}

/// A single edge compute node: processors, containers, and the registered
/// lambdas that run in them.
pub struct Computer {
    processors: AsyncMutex<HashMap<String, Processor>>,
    containers: AsyncMutex<HashMap<String, ContainerState>>,
    lambdas: AsyncMutex<HashMap<FunctionName, LambdaDescriptor>>,
    next_task_id: std::sync::atomic::AtomicU64,
    notify: Notify,
}

impl Computer {
    /// Create an empty computer with no processors, containers, or
    /// lambdas registered.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            processors: AsyncMutex::new(HashMap::new()),
            containers: AsyncMutex::new(HashMap::new()),
            lambdas: AsyncMutex::new(HashMap::new()),
            next_task_id: std::sync::atomic::AtomicU64::new(1),
            notify: Notify::new(),
        })
    }

    /// Register a processor. No-op check against duplicates is the
    /// caller's responsibility during config load; see
    /// [`ComputerConfigError::DupProcessorName`].
    pub async fn add_processor(&self, name: impl Into<String>, processor: Processor) -> Result<(), ComputerConfigError> {
        let name = name.into();
        let mut processors = self.processors.lock().await;
        if processors.contains_key(&name) {
            return Err(ComputerConfigError::DupProcessorName(name));
        }
        processors.insert(name, processor);
        Ok(())
    }

    /// Register a container bound to an already-registered processor.
    ///
    /// # Errors
    /// Returns [`ComputerConfigError::NoProcessorFound`] if `processor`
    /// is unknown, or [`ComputerConfigError::DupContainerName`] if `name`
    /// is already registered.
    pub async fn add_container(
        &self,
        name: impl Into<String>,
        processor: impl Into<String>,
        num_workers: usize,
    ) -> Result<(), ComputerConfigError> {
        let name = name.into();
        let processor = processor.into();
        if !self.processors.lock().await.contains_key(&processor) {
            return Err(ComputerConfigError::NoProcessorFound(processor));
        }
        let mut containers = self.containers.lock().await;
        if containers.contains_key(&name) {
            return Err(ComputerConfigError::DupContainerName(name));
        }
        let container = Container::new(name.clone(), num_workers)
            .map_err(|e| ComputerConfigError::InvalidValue(e.to_string()))?;
        containers.insert(
            name,
            ContainerState {
                container,
                processor,
                waiters: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Register a lambda, bound to an already-registered container.
    ///
    /// # Errors
    /// Returns [`ComputerConfigError::NoContainerFound`] if the lambda's
    /// container is unknown, or [`ComputerConfigError::DupLambdaName`] if
    /// the lambda's name is already registered.
    pub async fn add_lambda(&self, descriptor: LambdaDescriptor) -> Result<(), ComputerConfigError> {
        if !self.containers.lock().await.contains_key(descriptor.container()) {
            return Err(ComputerConfigError::NoContainerFound(
                descriptor.container().to_string(),
            ));
        }
        let mut lambdas = self.lambdas.lock().await;
        if lambdas.contains_key(descriptor.name()) {
            return Err(ComputerConfigError::DupLambdaName(
                descriptor.name().to_string(),
            ));
        }
        lambdas.insert(descriptor.name().clone(), descriptor);
        Ok(())
    }

    /// Submit a lambda invocation and wait for it to complete.
    ///
    /// # Errors
    /// See [`DispatchError`].
    #[instrument(skip(self), fields(function = %function))]
    pub async fn invoke(self: &Arc<Self>, function: &FunctionName, input_size: u64) -> Result<TaskId, DispatchError> {
        let descriptor = self
            .lambdas
            .lock()
            .await
            .get(function)
            .cloned()
            .ok_or_else(|| DispatchError::NoSuchLambda(function.clone()))?;
        let ops = descriptor.requirement().ops(input_size);
        let mem = descriptor.requirement().mem(input_size);

        let task_id = self
            .next_task_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        {
            let mut containers = self.containers.lock().await;
            let state = containers
                .get_mut(descriptor.container())
                .expect("lambda's container was validated at registration time");
            let mut processors = self.processors.lock().await;
            let processor = processors
                .get_mut(&state.processor)
                .expect("container's processor was validated at registration time");

            if mem > processor.mem_total() {
                return Err(DispatchError::OversizedRequest {
                    required: mem,
                    available: processor.mem_total(),
                });
            }

            let available = processor.mem_available();
            let task = Task::new(task_id, mem, ops);
            state
                .container
                .push(task, available, processor.mem_total())
                .map_err(|_| DispatchError::OversizedRequest {
                    required: mem,
                    available: processor.mem_total(),
                })?;
            if state.container.active().iter().any(|t| t.id() == task_id) {
                processor.allocate(mem).expect("admission already checked against available memory");
            }
            state.waiters.insert(task_id, tx);
        }
        self.notify.notify_one();

        rx.await.map_err(|_| DispatchError::DispatcherStopped)??;
        Ok(TaskId::from(task_id))
    }

    /// Run the dispatcher loop until `cancel` fires: periodically advances
    /// virtual time for every container, pops completed heads, frees
    /// processor memory, admits newly-fitting pending tasks, and wakes
    /// waiters.
    pub async fn run_dispatcher(self: Arc<Self>, cancel: tokio_util::sync::CancellationToken) {
        let mut last_tick = Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("dispatcher loop stopping");
                    return;
                }
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(DISPATCHER_TICK) => {}
            }
            let now = Instant::now();
            let elapsed = now.duration_since(last_tick).as_secs_f64();
            last_tick = now;
            self.advance_all(elapsed).await;
        }
    }

    async fn advance_all(&self, elapsed: f64) {
        let mut containers = self.containers.lock().await;
        let mut processors = self.processors.lock().await;
        for state in containers.values_mut() {
            let processor = processors
                .get_mut(&state.processor)
                .expect("container's processor was validated at registration time");
            let _ = state
                .container
                .advance(elapsed, |t| processor.time_to_ops(t));

            let finished = matches!(state.container.active().first(), Some(t) if t.residual_ops() == 0);
            if finished {
                let available = processor.mem_available();
                match state.container.pop(available) {
                    Ok((finished, admitted)) => {
                        let _ = processor.free(finished.mem());
                        for task in &admitted {
                            let _ = processor.allocate(task.mem());
                        }
                        if let Some(tx) = state.waiters.remove(&finished.id()) {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    Err(err) => warn!(?err, "container pop failed after head task completed"),
                }
            }
        }
    }
}

/// Periodically samples every processor's utilization and forwards the
/// sample to the local optimizer, until `cancel` fires.
pub async fn run_utilization_collector(
    computer: Arc<Computer>,
    cancel: tokio_util::sync::CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(UTILIZATION_SAMPLE_PERIOD) => {}
        }
        let mut processors = computer.processors.lock().await;
        for (name, processor) in processors.iter_mut() {
            let util = processor.utilization();
            debug!(processor = %name, utilization = util, "sampled utilization");
        }
    }
}

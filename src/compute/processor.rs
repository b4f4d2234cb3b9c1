//! Virtual-time processor model.
//!
//! Grounded on `Edge/processor.{h,cpp}`. A processor with `K` cores and
//! per-core rate `r` currently running `R` tasks advertises an
//! **equivalent per-task rate** `s = min(K,R) * r / R`; time/ops
//! conversions use `s`, returning 0 when `R = 0`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::domain_types::{CoreCount, MemoryBytes, OpsPerSecond};
use crate::error::ProcessorError;

/// A processor type tag, mirroring the original's generic CPU/GPU
/// distinction; purely informational (does not affect scheduling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessorType {
    /// A general-purpose CPU core.
    Cpu,
    /// A GPU or other acceleration board.
    Gpu,
}

/// A rolling window of recent utilization samples, used to report the
/// "last 1/10/30 s" triple a [`Processor`] exposes to the computer's
/// response callback.
#[derive(Debug, Clone)]
struct MovingWindow {
    capacity: usize,
    samples: std::collections::VecDeque<f64>,
}

impl MovingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: std::collections::VecDeque::with_capacity(capacity),
        }
    }

    fn add(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn average(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    fn last(&self) -> f64 {
        *self.samples.back().expect("moving window is non-empty")
    }
}

/// A processor with associated memory: a multi-core CPU or an
/// acceleration board such as a GPU.
#[derive(Debug)]
pub struct Processor {
    name: String,
    kind: ProcessorType,
    speed: f64,
    cores: usize,
    mem_total: u64,
    mem_used: u64,
    running: usize,

    /// Time of the last `utilization()` call.
    utilization_epoch: Instant,
    /// Time of the last `allocate`/`free` call (busy-time accounting).
    busy_epoch: Instant,
    /// Accumulated `sum(dt * running(dt))` since the last `utilization()`.
    busy_time: f64,

    load10: MovingWindow,
    load30: MovingWindow,
}

impl Processor {
    /// Construct a new processor.
    ///
    /// # Errors
    /// Returns a [`ProcessorError`] if `name` is empty, `speed` is not
    /// positive, `cores` is zero, or `mem_total` is zero.
    pub fn new(
        name: impl Into<String>,
        kind: ProcessorType,
        speed: OpsPerSecond,
        cores: CoreCount,
        mem_total: MemoryBytes,
    ) -> Result<Self, ProcessorError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ProcessorError::EmptyName);
        }
        let mem_total = mem_total.as_u64();
        if mem_total == 0 {
            return Err(ProcessorError::ZeroMemory);
        }
        let now = Instant::now();
        Ok(Self {
            name,
            kind,
            speed: speed.as_f64(),
            cores: cores.as_usize(),
            mem_total,
            mem_used: 0,
            running: 0,
            utilization_epoch: now,
            busy_epoch: now,
            busy_time: 0.0,
            load10: MovingWindow::new(10),
            load30: MovingWindow::new(30),
        })
    }

    /// Allocate `size` bytes of memory for a newly-admitted task.
    ///
    /// # Errors
    /// Returns [`ProcessorError::InsufficientMemory`] if `size` exceeds
    /// [`Processor::mem_available`].
    pub fn allocate(&mut self, size: u64) -> Result<(), ProcessorError> {
        if size > self.mem_available() {
            return Err(ProcessorError::InsufficientMemory {
                requested: size,
                available: self.mem_available(),
            });
        }
        self.accrue_busy_time();
        self.mem_used += size;
        self.running += 1;
        Ok(())
    }

    /// Release `size` bytes of memory for a completed task.
    ///
    /// # Errors
    /// Returns [`ProcessorError::OverFree`] if `size` exceeds
    /// [`Processor::mem_used`].
    pub fn free(&mut self, size: u64) -> Result<(), ProcessorError> {
        if size > self.mem_used {
            return Err(ProcessorError::OverFree {
                requested: size,
                used: self.mem_used,
            });
        }
        self.accrue_busy_time();
        self.mem_used -= size;
        self.running -= 1;
        Ok(())
    }

    fn accrue_busy_time(&mut self) {
        let elapsed = self.busy_epoch.elapsed().as_secs_f64();
        self.busy_epoch = Instant::now();
        self.busy_time += elapsed * self.running as f64;
    }

    /// The equivalent per-task rate `min(cores, running) * speed / running`.
    ///
    /// # Panics
    /// Panics if no tasks are running; callers must check [`Processor::idle`] first.
    fn equivalent_speed(&self) -> f64 {
        assert!(self.running > 0, "equivalent_speed requires running > 0");
        self.cores.min(self.running) as f64 * self.speed / self.running as f64
    }

    /// Time required to perform `ops` operations at the current equivalent
    /// rate; 0 if no tasks are running.
    #[must_use]
    pub fn ops_to_time(&self, ops: u64) -> f64 {
        if self.running == 0 {
            0.0
        } else {
            ops as f64 / self.equivalent_speed()
        }
    }

    /// Same as [`Processor::ops_to_time`] but as if one more task were
    /// admitted; used by the no-side-effect simulation API.
    #[must_use]
    pub fn ops_to_time_plus_one(&self, ops: u64) -> f64 {
        let running = self.running + 1;
        let rate = self.cores.min(running) as f64 * self.speed / running as f64;
        ops as f64 / rate
    }

    /// Operations performable in `time` seconds at the current equivalent
    /// rate; 0 if no tasks are running.
    #[must_use]
    pub fn time_to_ops(&self, time: f64) -> u64 {
        if self.running == 0 {
            0
        } else {
            (0.5 + time * self.equivalent_speed()) as u64
        }
    }

    /// The real-time utilization since the last call to this method, as a
    /// value in `[0, 1]`. Also resets the busy-time accumulator and feeds
    /// the 10s/30s moving-average windows.
    ///
    /// # Panics
    /// Panics if called twice with no elapsed time (division by zero),
    /// mirroring the source's debug assertion.
    pub fn utilization(&mut self) -> f64 {
        let elapsed = self.utilization_epoch.elapsed().as_secs_f64();
        self.utilization_epoch = Instant::now();
        self.accrue_busy_time();
        debug_assert!(elapsed > 0.0);
        let util = (self.busy_time / (self.cores as f64 * elapsed)).min(1.0);
        self.busy_time = 0.0;
        self.load10.add(util);
        self.load30.add(util);
        util
    }

    /// The last-measured utilization, and its 10s/30s moving averages;
    /// `(0, 0, 0)` until the first `utilization()` call.
    #[must_use]
    pub fn last_utils(&self) -> [f64; 3] {
        if self.load10.is_empty() || self.load30.is_empty() {
            return [0.0, 0.0, 0.0];
        }
        [self.load30.last(), self.load10.average(), self.load30.average()]
    }

    /// True if no tasks are currently running.
    #[must_use]
    pub fn idle(&self) -> bool {
        self.running == 0
    }

    /// The number of tasks currently running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.running
    }

    /// The processor's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The processor's type tag.
    #[must_use]
    pub fn kind(&self) -> ProcessorType {
        self.kind
    }

    /// The per-core operation rate, in ops/s.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The number of cores.
    #[must_use]
    pub fn cores(&self) -> usize {
        self.cores
    }

    /// Total memory, in bytes.
    #[must_use]
    pub fn mem_total(&self) -> u64 {
        self.mem_total
    }

    /// Memory currently available, in bytes.
    #[must_use]
    pub fn mem_available(&self) -> u64 {
        self.mem_total - self.mem_used
    }

    /// Memory currently in use, in bytes.
    #[must_use]
    pub fn mem_used(&self) -> u64 {
        self.mem_used
    }
}

impl std::fmt::Display for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "name {}, type {:?}, {} cores, speed {} operations/s per core, memory total/available/used {}/{}/{} bytes, {} running tasks",
            self.name,
            self.kind,
            self.cores,
            self.speed,
            self.mem_total,
            self.mem_available(),
            self.mem_used,
            self.running
        )
    }
}

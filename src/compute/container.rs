//! A container: a fixed number of worker slots sharing one processor,
//! running tasks for a single lambda.
//!
//! Grounded on `Edge/container.{h,cpp}`. Active tasks are kept in a
//! **differential residual** list: each element stores the number of
//! operations remaining *beyond* the sum of all elements before it, so a
//! time-advance only has to touch the head, and insertion walks the list
//! once to find where the new task's residual fits.

use std::time::Instant;

use crate::error::ContainerError;

/// A unit of work admitted to a container.
#[derive(Debug, Clone)]
pub struct Task {
    id: u64,
    /// Operations remaining, differential: the true remaining operation
    /// count is this value plus the sum of all active tasks before it.
    residual_ops: u64,
    /// The task's own (non-differential) total operation count, kept for
    /// `simulate()`'s what-if projections.
    total_ops: u64,
    mem: u64,
    admitted_at: Instant,
}

impl Task {
    /// Construct a new task with the given id, memory requirement, and
    /// total (non-differential) operation count.
    #[must_use]
    pub fn new(id: u64, mem: u64, total_ops: u64) -> Self {
        Self {
            id,
            residual_ops: total_ops,
            total_ops,
            mem,
            admitted_at: Instant::now(),
        }
    }

    /// This task's id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Memory this task holds.
    #[must_use]
    pub fn mem(&self) -> u64 {
        self.mem
    }

    /// Operations remaining beyond the sum of tasks ahead of it in the
    /// active list (0 if queued/pending).
    #[must_use]
    pub fn residual_ops(&self) -> u64 {
        self.residual_ops
    }

    /// Wall-clock time this task was admitted.
    #[must_use]
    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }
}

/// A single lambda's execution container: worker slots, an active list
/// ordered by differential residual, and a FIFO pending queue for tasks
/// that could not be admitted immediately.
#[derive(Debug)]
pub struct Container {
    name: String,
    num_workers: usize,
    active: Vec<Task>,
    pending: std::collections::VecDeque<Task>,
}

impl Container {
    /// Create an empty container with `num_workers` worker slots.
    ///
    /// # Errors
    /// Returns [`ContainerError::ZeroWorkers`] if `num_workers` is 0.
    pub fn new(name: impl Into<String>, num_workers: usize) -> Result<Self, ContainerError> {
        let name = name.into();
        if num_workers == 0 {
            return Err(ContainerError::ZeroWorkers { name });
        }
        Ok(Self {
            name,
            num_workers,
            active: Vec::new(),
            pending: std::collections::VecDeque::new(),
        })
    }

    /// The container's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of worker slots.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Active (currently running) tasks, head first, in differential-
    /// residual order.
    #[must_use]
    pub fn active(&self) -> &[Task] {
        &self.active
    }

    /// Tasks waiting for a worker slot or memory, FIFO order.
    #[must_use]
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &Task> {
        self.pending.iter()
    }

    /// Admit `task` to the active list if a worker slot and enough
    /// processor memory are available (`mem_available`); otherwise enqueue
    /// it as pending.
    ///
    /// # Errors
    /// Returns [`ContainerError::OversizedRequest`] if `task`'s memory
    /// requirement exceeds `mem_total` outright (it could never run here).
    pub fn push(&mut self, task: Task, mem_available: u64, mem_total: u64) -> Result<(), ContainerError> {
        if task.mem > mem_total {
            return Err(ContainerError::OversizedRequest {
                container: self.name.clone(),
                available: mem_total,
                required: task.mem,
            });
        }
        if self.active.len() < self.num_workers && task.mem <= mem_available {
            self.make_active(task);
        } else {
            self.pending.push_back(task);
        }
        Ok(())
    }

    /// Remove the finished task at the head of the active list, then drain
    /// as much of the pending queue as worker slots and remaining
    /// processor memory allow. Returns the completed task and the tasks
    /// newly admitted from pending (for processor allocation bookkeeping
    /// by the caller).
    ///
    /// # Errors
    /// Returns [`ContainerError::NoActiveTasks`] if the active list is
    /// empty.
    pub fn pop(&mut self, mem_available: u64) -> Result<(Task, Vec<Task>), ContainerError> {
        if self.active.is_empty() {
            return Err(ContainerError::NoActiveTasks);
        }
        let finished = self.active.remove(0);
        let mut admitted = Vec::new();
        let mut available = mem_available + finished.mem;
        while self.active.len() < self.num_workers {
            let Some(next) = self.pending.front() else {
                break;
            };
            if next.mem > available {
                break;
            }
            let next = self.pending.pop_front().expect("front checked above");
            available -= next.mem;
            self.make_active(next.clone());
            admitted.push(next);
        }
        Ok((finished, admitted))
    }

    /// A no-side-effect projection of how long `task` would have to wait
    /// for the processor before making progress: the pending queue's total
    /// work plus, if no worker slot is free, the head active task's
    /// residual, all expressed through the two processor time functions
    /// the caller supplies (so the projection reflects the processor's
    /// equivalent-rate model without this module depending on it
    /// directly).
    #[must_use]
    pub fn simulate(
        &self,
        task_ops: u64,
        ops_to_time: impl Fn(u64) -> f64,
        ops_to_time_plus_one: impl Fn(u64) -> f64,
    ) -> f64 {
        let mut total = self
            .pending
            .iter()
            .map(|t| ops_to_time(t.total_ops))
            .sum::<f64>();
        if self.active.len() >= self.num_workers {
            if let Some(head) = self.active.first() {
                total += ops_to_time(head.residual_ops);
            }
            total += ops_to_time_plus_one(task_ops);
        } else {
            total += ops_to_time(task_ops);
        }
        total
    }

    /// Advance virtual time by `elapsed` seconds, converted via
    /// `time_to_ops`, consuming operations from the head of the active
    /// list only (the differential encoding means later elements are
    /// unaffected until they become the head).
    ///
    /// # Errors
    /// Returns [`ContainerError::NegativeElapsed`] if `elapsed` is
    /// negative. No-ops if the active list is empty.
    pub fn advance(&mut self, elapsed: f64, time_to_ops: impl Fn(f64) -> u64) -> Result<(), ContainerError> {
        if elapsed < 0.0 {
            return Err(ContainerError::NegativeElapsed(elapsed));
        }
        let Some(head) = self.active.first_mut() else {
            return Ok(());
        };
        let consumed = head.residual_ops.min(time_to_ops(elapsed));
        head.residual_ops -= consumed;
        Ok(())
    }

    /// Insert `task` into the active list at its differential-residual
    /// position: accumulate the residuals of all active tasks ahead of it
    /// until the running sum would exceed the new task's own residual,
    /// insert there, subtract the accumulated sum from the new task's
    /// residual, and subtract the new task's (now-adjusted) residual from
    /// the following element, if any.
    fn make_active(&mut self, mut task: Task) {
        let mut running_sum = 0u64;
        let mut insert_at = self.active.len();
        for (i, existing) in self.active.iter().enumerate() {
            if running_sum + existing.residual_ops > task.residual_ops {
                insert_at = i;
                break;
            }
            running_sum += existing.residual_ops;
        }
        task.residual_ops = task.residual_ops.saturating_sub(running_sum);
        if let Some(next) = self.active.get_mut(insert_at) {
            next.residual_ops = next.residual_ops.saturating_sub(task.residual_ops);
        }
        self.active.insert(insert_at, task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_tasks_on_ten_workers_admits_ten_and_queues_two() {
        let mut c = Container::new("c0", 10).unwrap();
        let mem_total = 100u64;
        let mut mem_used = 0u64;
        for id in 1..=12 {
            c.push(Task::new(id, 10, 10), mem_total - mem_used, mem_total).unwrap();
            mem_used = mem_used.saturating_add(10).min(mem_total);
        }
        assert_eq!(c.active().len(), 10);
        assert_eq!(c.pending().len(), 2);

        let (_, _) = c.pop(0).unwrap();
        assert_eq!(c.pending().len(), 1);
        let (_, _) = c.pop(0).unwrap();
        assert_eq!(c.pending().len(), 0);
    }

    #[test]
    fn push_admits_up_to_worker_count() {
        let mut c = Container::new("c0", 2).unwrap();
        c.push(Task::new(1, 10, 100), 1000, 1000).unwrap();
        c.push(Task::new(2, 10, 100), 990, 1000).unwrap();
        assert_eq!(c.active().len(), 2);
        c.push(Task::new(3, 10, 100), 980, 1000).unwrap();
        assert_eq!(c.active().len(), 2);
        assert_eq!(c.pending().len(), 1);
    }

    #[test]
    fn push_rejects_task_too_large_for_container() {
        let mut c = Container::new("c0", 2).unwrap();
        let err = c.push(Task::new(1, 2000, 100), 1000, 1000).unwrap_err();
        assert!(matches!(err, ContainerError::OversizedRequest { .. }));
    }

    #[test]
    fn differential_insert_sorts_by_true_remaining_ops() {
        let mut c = Container::new("c0", 3).unwrap();
        c.push(Task::new(1, 10, 300), 1000, 1000).unwrap();
        c.push(Task::new(2, 10, 100), 990, 1000).unwrap();
        c.push(Task::new(3, 10, 200), 980, 1000).unwrap();

        // True remaining order should be task2 (100) < task3 (200) < task1 (300).
        let ids: Vec<u64> = c.active().iter().map(Task::id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        // Differential residuals sum correctly along the chain.
        let residuals: Vec<u64> = c.active().iter().map(Task::residual_ops).collect();
        let mut running = 0u64;
        let mut true_remaining = Vec::new();
        for r in residuals {
            running += r;
            true_remaining.push(running);
        }
        assert_eq!(true_remaining, vec![100, 200, 300]);
    }

    #[test]
    fn advance_only_touches_head_residual() {
        let mut c = Container::new("c0", 2).unwrap();
        c.push(Task::new(1, 10, 300), 1000, 1000).unwrap();
        c.push(Task::new(2, 10, 100), 990, 1000).unwrap();
        let before: Vec<u64> = c.active().iter().map(Task::residual_ops).collect();
        c.advance(1.0, |_t| 50).unwrap();
        let after: Vec<u64> = c.active().iter().map(Task::residual_ops).collect();
        assert_eq!(after[0], before[0] - 50);
        assert_eq!(after[1], before[1]);
    }

    #[test]
    fn advance_rejects_negative_elapsed() {
        let mut c = Container::new("c0", 1).unwrap();
        assert!(matches!(
            c.advance(-1.0, |_| 0),
            Err(ContainerError::NegativeElapsed(_))
        ));
    }

    #[test]
    fn pop_drains_pending_while_capacity_allows() {
        let mut c = Container::new("c0", 1).unwrap();
        c.push(Task::new(1, 10, 100), 20, 20).unwrap();
        c.push(Task::new(2, 10, 100), 10, 20).unwrap();
        assert_eq!(c.pending().len(), 1);
        let (finished, admitted) = c.pop(0).unwrap();
        assert_eq!(finished.id(), 1);
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].id(), 2);
        assert!(c.pending().len() == 0);
    }

    #[test]
    fn pop_on_empty_active_fails() {
        let mut c = Container::new("c0", 1).unwrap();
        assert!(matches!(c.pop(0), Err(ContainerError::NoActiveTasks)));
    }
}

//! Cooperative repeating timers.
//!
//! The engine has no threads. Time moves only when the host calls
//! `SoundEngine::advance`, which pops due firings one at a time in
//! chronological order, so a firing that cancels another task is honored
//! before that task's next firing is considered.

use std::collections::BTreeMap;
use std::time::Duration;

/// Handle to a scheduled repeating task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// What a firing asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Heartbeat,
    MusicStep,
}

#[derive(Debug, Clone)]
struct RepeatingTask {
    kind: TaskKind,
    period: Duration,
    next_due: Duration,
}

#[derive(Debug, Default)]
pub struct Timers {
    now: Duration,
    tasks: BTreeMap<TaskId, RepeatingTask>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed time on the timer clock.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Fire `kind` every `period`, first at `now + period`.
    pub fn every(&mut self, period: Duration, kind: TaskKind) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            RepeatingTask {
                kind,
                period,
                next_due: self.now.saturating_add(period),
            },
        );
        id
    }

    /// Cancel future firings. Returns false if the task was not scheduled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pop the earliest firing due strictly before `until`, moving the clock
    /// to its due time and rescheduling the task one period later. Ties go
    /// to the older task. A firing due exactly at `until` is left for the
    /// next window.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TaskId, TaskKind)> {
        let (&id, _) = self
            .tasks
            .iter()
            .filter(|(_, t)| t.next_due < until)
            .min_by_key(|(id, t)| (t.next_due, **id))?;

        let task = self.tasks.get_mut(&id)?;
        self.now = self.now.max(task.next_due);
        task.next_due = task.next_due.saturating_add(task.period);
        Some((id, task.kind))
    }

    /// Jump the clock to `until` without firing anything. Each task drops
    /// the firings it missed but keeps its phase.
    pub fn skip_to(&mut self, until: Duration) {
        for task in self.tasks.values_mut() {
            if task.next_due < until {
                let behind = (until - task.next_due).as_nanos();
                let period = task.period.as_nanos();
                let lead = (period - behind % period) % period;
                task.next_due = until.saturating_add(Duration::from_nanos(lead as u64));
            }
        }
        self.now = self.now.max(until);
    }

    /// Move the clock to `until` once every due firing has been popped.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

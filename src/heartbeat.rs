//! Heartbeat loop — the "time is nearly up" cue.

use std::time::Duration;

use crate::timer::{TaskId, TaskKind, Timers};

/// Time between heartbeat units.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(800);

/// Stopped or running; running means one repeating task is scheduled.
#[derive(Debug, Default)]
pub struct HeartbeatLoop {
    task: Option<TaskId>,
}

impl HeartbeatLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Schedule the recurring beat. Returns false if already running; the
    /// caller plays the immediate first unit only when this returns true.
    pub fn start(&mut self, timers: &mut Timers) -> bool {
        if self.task.is_some() {
            return false;
        }
        self.task = Some(timers.every(HEARTBEAT_PERIOD, TaskKind::Heartbeat));
        true
    }

    /// Cancel the recurring beat. Units already playing finish on their own.
    pub fn stop(&mut self, timers: &mut Timers) -> bool {
        match self.task.take() {
            Some(id) => {
                timers.cancel(id);
                true
            }
            None => false,
        }
    }
}

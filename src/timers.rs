//! Deferred work on a logical millisecond clock.
//!
//! The game never sleeps. Anything that should happen "later" is queued here
//! and fired when the owner advances the clock. Handles cancel queued tasks.

use crate::pitch::PitchClass;
use std::time::Duration;

/// Work the session wants done later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// One second of the countdown has passed
    CountdownTick,
    /// The wrong-answer window is over: unlock input, clear the key
    ReleaseInput { pitch_class: PitchClass },
    /// Start the next round after a completed one
    AdvanceRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Scheduled {
    handle: TaskHandle,
    due_ms: u64,
    period_ms: Option<u64>,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: u64,
    pending: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|s| s.handle == handle)
    }

    pub fn schedule_once(&mut self, delay_ms: u64, task: Task) -> TaskHandle {
        self.push(delay_ms, None, task)
    }

    /// Fires every `period_ms`, first after one period. A zero period is treated as 1 ms.
    pub fn schedule_repeating(&mut self, period_ms: u64, task: Task) -> TaskHandle {
        let period_ms = period_ms.max(1);
        self.push(period_ms, Some(period_ms), task)
    }

    fn push(&mut self, delay_ms: u64, period_ms: Option<u64>, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled {
            handle,
            due_ms: self.now_ms + delay_ms,
            period_ms,
            task,
        });
        handle
    }

    /// Returns false if the task already fired (one-shot) or was cancelled
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.handle != handle);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Pops the earliest task due at or before `target_ms`, moving the clock to
    /// its due time. Ties fire in scheduling order. Repeating tasks are re-armed.
    ///
    /// Callers loop on this so tasks scheduled by a fired task are honoured
    /// within the same advance.
    pub fn pop_due(&mut self, target_ms: u64) -> Option<(TaskHandle, Task)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= target_ms)
            .min_by_key(|(_, s)| (s.due_ms, s.handle.0))
            .map(|(idx, _)| idx)?;

        let due_ms = self.pending[idx].due_ms;
        self.now_ms = self.now_ms.max(due_ms);

        let fired = (self.pending[idx].handle, self.pending[idx].task);
        match self.pending[idx].period_ms {
            Some(period) => self.pending[idx].due_ms += period,
            None => {
                self.pending.swap_remove(idx);
            }
        }
        Some(fired)
    }

    /// Moves the clock forward once every due task has been popped
    pub fn settle(&mut self, target_ms: u64) {
        self.now_ms = self.now_ms.max(target_ms);
    }
}

/// Converts wall-clock durations into whole logical milliseconds, holding
/// back the sub-millisecond remainder for the next conversion
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MillisCarry {
    remainder: Duration,
}

impl MillisCarry {
    pub fn take(&mut self, elapsed: Duration) -> u64 {
        let total = self.remainder + elapsed;
        let whole_ms = total.as_millis() as u64;
        self.remainder = total - Duration::from_millis(whole_ms);
        whole_ms
    }

    pub fn remainder(&self) -> Duration {
        self.remainder
    }

    pub fn reset(&mut self) {
        self.remainder = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut Scheduler, target_ms: u64) -> Vec<(u64, Task)> {
        let mut fired = vec![];
        while let Some((_, task)) = scheduler.pop_due(target_ms) {
            fired.push((scheduler.now_ms(), task));
        }
        scheduler.settle(target_ms);
        fired
    }

    #[test]
    fn test_once_fires_when_due() {
        let mut s = Scheduler::new();
        let h = s.schedule_once(150, Task::AdvanceRound);

        assert!(drain(&mut s, 149).is_empty());
        assert!(s.is_pending(h));
        assert_eq!(drain(&mut s, 150), vec![(150, Task::AdvanceRound)]);
        assert!(!s.is_pending(h));
        assert_eq!(s.now_ms(), 150);
    }

    #[test]
    fn test_repeating_fires_each_period() {
        let mut s = Scheduler::new();
        s.schedule_repeating(1000, Task::CountdownTick);

        let fired = drain(&mut s, 3500);
        assert_eq!(
            fired,
            vec![
                (1000, Task::CountdownTick),
                (2000, Task::CountdownTick),
                (3000, Task::CountdownTick),
            ]
        );
        assert_eq!(s.now_ms(), 3500);
        assert_eq!(s.pending_count(), 1);
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut s = Scheduler::new();
        let pc = PitchClass::new(2).unwrap();
        s.schedule_once(300, Task::ReleaseInput { pitch_class: pc });
        s.schedule_once(150, Task::AdvanceRound);

        let tasks: Vec<Task> = drain(&mut s, 1000).into_iter().map(|(_, t)| t).collect();
        assert_eq!(tasks, vec![Task::AdvanceRound, Task::ReleaseInput { pitch_class: pc }]);
    }

    #[test]
    fn test_cancel() {
        let mut s = Scheduler::new();
        let h = s.schedule_repeating(1000, Task::CountdownTick);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(drain(&mut s, 5000).is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut s = Scheduler::new();
        s.schedule_once(10, Task::AdvanceRound);
        s.schedule_repeating(10, Task::CountdownTick);
        s.cancel_all();
        assert_eq!(s.pending_count(), 0);
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut s = Scheduler::new();
        s.settle(400);
        s.schedule_once(100, Task::AdvanceRound);
        assert!(drain(&mut s, 499).is_empty());
        assert_eq!(drain(&mut s, 500).len(), 1);
    }

    #[test]
    fn test_millis_carry_keeps_fractions() {
        let mut carry = MillisCarry::default();
        let total: u64 = (0..2000)
            .map(|_| carry.take(Duration::from_micros(25_900)))
            .sum();
        assert_eq!(total, 51_800);
        assert_eq!(carry.remainder(), Duration::ZERO);

        assert_eq!(carry.take(Duration::from_micros(400)), 0);
        assert_eq!(carry.take(Duration::from_micros(700)), 1);
        assert_eq!(carry.remainder(), Duration::from_micros(100));
        carry.reset();
        assert_eq!(carry.remainder(), Duration::ZERO);
    }
}

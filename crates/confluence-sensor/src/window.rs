//! Window stages and caller-imposed budgets.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, SensorError};

/// Progress of one window. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStage {
    Idle,
    GraphUpdated,
    Scored,
    Adjusted,
    Selected,
    Emitted,
}

impl WindowStage {
    /// The stage after this one.
    pub const fn next(self) -> Option<WindowStage> {
        match self {
            WindowStage::Idle => Some(WindowStage::GraphUpdated),
            WindowStage::GraphUpdated => Some(WindowStage::Scored),
            WindowStage::Scored => Some(WindowStage::Adjusted),
            WindowStage::Adjusted => Some(WindowStage::Selected),
            WindowStage::Selected => Some(WindowStage::Emitted),
            WindowStage::Emitted => None,
        }
    }
}

impl fmt::Display for WindowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowStage::Idle => "idle",
            WindowStage::GraphUpdated => "graph_updated",
            WindowStage::Scored => "scored",
            WindowStage::Adjusted => "adjusted",
            WindowStage::Selected => "selected",
            WindowStage::Emitted => "emitted",
        };
        f.write_str(name)
    }
}

/// Limits on one window run, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct WindowBudget {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl WindowBudget {
    /// No deadline, not cancellable.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Abort the window once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Fail if the window must not proceed to `stage`.
    pub fn check(&self, stage: WindowStage) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Acquire) {
                return Err(SensorError::Cancelled { stage });
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SensorError::BudgetExceeded { stage });
            }
        }
        Ok(())
    }
}

/// Forward-only stage tracker for one window.
#[derive(Debug)]
pub(crate) struct WindowRun<'a> {
    stage: WindowStage,
    budget: &'a WindowBudget,
    window: u64,
}

impl<'a> WindowRun<'a> {
    pub(crate) fn new(budget: &'a WindowBudget, window: u64) -> Self {
        Self {
            stage: WindowStage::Idle,
            budget,
            window,
        }
    }

    /// Budget check before starting work towards the next stage.
    pub(crate) fn check(&self) -> Result<()> {
        match self.stage.next() {
            Some(next) => self.budget.check(next),
            None => Ok(()),
        }
    }

    /// Record that the next stage has been reached.
    pub(crate) fn advance(&mut self) -> Result<WindowStage> {
        let next = self.stage.next().unwrap_or(WindowStage::Emitted);
        self.budget.check(next)?;
        debug!(window = self.window, from = %self.stage, to = %next, "window stage");
        self.stage = next;
        Ok(next)
    }

    pub(crate) fn stage(&self) -> WindowStage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = WindowStage::Idle;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(stage, WindowStage::Emitted);
    }

    #[test]
    fn run_walks_every_stage() {
        let budget = WindowBudget::unlimited();
        let mut run = WindowRun::new(&budget, 0);
        for expected in [
            WindowStage::GraphUpdated,
            WindowStage::Scored,
            WindowStage::Adjusted,
            WindowStage::Selected,
            WindowStage::Emitted,
        ] {
            run.check().unwrap();
            assert_eq!(run.advance().unwrap(), expected);
        }
        assert_eq!(run.stage(), WindowStage::Emitted);
    }

    #[test]
    fn cancelled_budget_names_stage() {
        let flag = Arc::new(AtomicBool::new(false));
        let budget = WindowBudget::unlimited().with_cancel_flag(flag.clone());
        let mut run = WindowRun::new(&budget, 3);
        run.advance().unwrap();
        flag.store(true, Ordering::Release);
        match run.advance() {
            Err(SensorError::Cancelled { stage }) => assert_eq!(stage, WindowStage::Scored),
            other => panic!("expected cancellation, got {:?}", other),
        }
        assert_eq!(run.stage(), WindowStage::GraphUpdated);
    }

    #[test]
    fn expired_deadline() {
        let budget = WindowBudget::unlimited().with_deadline(Instant::now());
        assert!(matches!(
            budget.check(WindowStage::GraphUpdated),
            Err(SensorError::BudgetExceeded {
                stage: WindowStage::GraphUpdated
            })
        ));
        assert!(WindowBudget::unlimited()
            .with_timeout(Duration::from_secs(3600))
            .check(WindowStage::Scored)
            .is_ok());
    }

    #[test]
    fn display() {
        assert_eq!(WindowStage::GraphUpdated.to_string(), "graph_updated");
    }
}

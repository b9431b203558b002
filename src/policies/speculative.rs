//! Speculative Execution Policies
//!
//! Decide whether, and after how long, another execution of the same
//! statement is started against the next node of the plan while earlier
//! executions are still pending.

use crate::cluster::Node;
use crate::statement::Statement;
use std::time::Duration;

pub trait SpeculativeExecutionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Delay before starting the next execution, or `None` to stop
    /// scheduling. `running_executions` counts the executions started so
    /// far, including the initial one.
    fn next_execution(
        &self,
        node: &Node,
        statement: &Statement,
        running_executions: usize,
    ) -> Option<Duration>;
}

/// Never starts speculative executions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeculativeExecutionPolicy;

impl SpeculativeExecutionPolicy for NoSpeculativeExecutionPolicy {
    fn name(&self) -> &'static str {
        "NoSpeculativeExecutionPolicy"
    }

    fn next_execution(&self, _: &Node, _: &Statement, _: usize) -> Option<Duration> {
        None
    }
}

/// Starts up to `max_executions` executions in total, spaced by a fixed
/// delay.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSpeculativeExecutionPolicy {
    max_executions: usize,
    delay: Duration,
}

impl ConstantSpeculativeExecutionPolicy {
    pub fn new(max_executions: usize, delay: Duration) -> Self {
        Self {
            max_executions: max_executions.max(1),
            delay,
        }
    }

    pub fn max_executions(&self) -> usize {
        self.max_executions
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl SpeculativeExecutionPolicy for ConstantSpeculativeExecutionPolicy {
    fn name(&self) -> &'static str {
        "ConstantSpeculativeExecutionPolicy"
    }

    fn next_execution(&self, _: &Node, _: &Statement, running_executions: usize) -> Option<Duration> {
        if running_executions < self.max_executions {
            Some(self.delay)
        } else {
            None
        }
    }
}

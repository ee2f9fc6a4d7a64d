use crate::error::Failure;
use crate::types::{AttemptOutcome, RequestSpec};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which failures are worth another attempt.
///
/// `All` retries every classified failure until the budget is spent.
/// `SkipClientErrors` treats 4xx upstream statuses as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryCondition {
    #[default]
    All,
    SkipClientErrors,
}

impl RetryCondition {
    pub fn should_retry(&self, failure: &Failure) -> bool {
        match self {
            RetryCondition::All => true,
            RetryCondition::SkipClientErrors => {
                !matches!(failure.status_code(), Some(code) if (400..500).contains(&code))
            }
        }
    }
}

/// State of one logical call inside the retrying executor.
///
/// `attempt` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState<T> {
    Attempting {
        attempt: u32,
    },
    Backoff {
        next_attempt: u32,
        delay: Duration,
        failure: Failure,
    },
    Terminal(AttemptOutcome<T>),
}

impl<T> RetryState<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Terminal(_))
    }
}

/// Exponential backoff policy without jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt budget, first attempt included. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Optional ceiling applied to every computed delay.
    pub max_delay: Option<Duration>,
    pub condition: RetryCondition,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: None,
            condition: RetryCondition::All,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    pub fn with_condition(mut self, condition: RetryCondition) -> Self {
        self.condition = condition;
        self
    }

    fn budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Copy of this policy with the request's attempt override applied.
    pub fn for_spec(&self, spec: &RequestSpec) -> RetryPolicy {
        let mut policy = self.clone();
        if let Some(n) = spec.max_attempts {
            policy.max_attempts = n;
        }
        policy
    }

    /// Delay slept before `attempt` (1-based): `base_delay * 2^(attempt-2)`.
    ///
    /// The first attempt starts immediately.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    pub fn start<T>(&self) -> RetryState<T> {
        RetryState::Attempting { attempt: 1 }
    }

    /// Transition after `attempt` produced `outcome`.
    ///
    /// Success is always terminal. A failure backs off while budget remains and
    /// the condition allows it; otherwise it becomes the terminal outcome.
    pub fn next<T>(&self, attempt: u32, outcome: AttemptOutcome<T>) -> RetryState<T> {
        match outcome {
            Err(failure) if attempt < self.budget() && self.condition.should_retry(&failure) => {
                let next_attempt = attempt + 1;
                RetryState::Backoff {
                    next_attempt,
                    delay: self.delay_before(next_attempt),
                    failure,
                }
            }
            outcome => RetryState::Terminal(outcome),
        }
    }
}

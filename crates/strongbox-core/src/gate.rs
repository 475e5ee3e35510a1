//! Human confirmation before destructive restores
//!
//! [`ConfirmationGate`] asks a small addition question and only hands out a
//! [`RestorePermit`] once it has been answered correctly. It is friction
//! against misclicks and unattended scripts, not an authorization check.
//!
//! ```text
//! Idle ──start──▶ Challenged ──correct──▶ Verified ──take_permit──▶ Idle
//!                    │  ▲
//!              wrong │  │ new question (attempts < 3)
//!                    ▼  │
//!                 (3rd wrong) ──▶ Failed ──reset──▶ Idle
//! ```

use rand::Rng;
use std::fmt;
use std::ops::RangeInclusive;

/// Wrong answers allowed before the gate locks.
pub const MAX_ATTEMPTS: u8 = 3;

/// Range both operands are drawn from.
pub const OPERAND_RANGE: RangeInclusive<u32> = 1..=20;

/// A two-operand addition question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub left: u32,
    pub right: u32,
}

impl Challenge {
    pub fn new(left: u32, right: u32) -> Self {
        Self { left, right }
    }

    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self {
            left: rng.random_range(OPERAND_RANGE),
            right: rng.random_range(OPERAND_RANGE),
        }
    }

    pub fn expected(&self) -> u64 {
        u64::from(self.left) + u64::from(self.right)
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "What is {} + {}?", self.left, self.right)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Challenged {
        challenge: Challenge,
        wrong_answers: u8,
    },
    Verified,
    Failed,
}

/// Result of submitting one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Verified,
    /// Wrong answer; a new question replaces the old one.
    Retry {
        challenge: Challenge,
        attempts_left: u8,
    },
    /// Wrong answer and no attempts left.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("no confirmation challenge is pending")]
    NotChallenged,
    #[error("confirmation attempts exhausted; restart the confirmation")]
    Exhausted,
    #[error("confirmation has not been completed")]
    NotVerified,
}

/// Proof that a human confirmed one destructive restore.
///
/// Not `Clone`: each permit is consumed by exactly one restore call.
#[derive(Debug)]
pub struct RestorePermit {
    _private: (),
}

#[derive(Debug)]
pub struct ConfirmationGate {
    state: GateState,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Pose a question.
    ///
    /// Starting an already challenged gate returns the pending question.
    /// A failed gate must be [`reset`](Self::reset) first.
    pub fn start(&mut self) -> Result<Challenge, GateError> {
        self.start_with(Challenge::random())
    }

    fn start_with(&mut self, fresh: Challenge) -> Result<Challenge, GateError> {
        match &self.state {
            GateState::Challenged { challenge, .. } => Ok(*challenge),
            GateState::Failed => Err(GateError::Exhausted),
            GateState::Idle | GateState::Verified => {
                self.state = GateState::Challenged {
                    challenge: fresh,
                    wrong_answers: 0,
                };
                Ok(fresh)
            }
        }
    }

    /// Submit a numeric answer.
    ///
    /// In the `Failed` state the answer is rejected without being looked at.
    pub fn answer(&mut self, response: i64) -> Result<AnswerOutcome, GateError> {
        let (challenge, wrong_answers) = match &self.state {
            GateState::Challenged {
                challenge,
                wrong_answers,
            } => (*challenge, *wrong_answers),
            GateState::Failed => return Err(GateError::Exhausted),
            GateState::Idle | GateState::Verified => return Err(GateError::NotChallenged),
        };

        let correct = u64::try_from(response).is_ok_and(|value| value == challenge.expected());
        Ok(self.record(correct, wrong_answers))
    }

    /// Submit a typed answer; anything that is not an integer counts as wrong.
    pub fn answer_text(&mut self, response: &str) -> Result<AnswerOutcome, GateError> {
        match response.trim().parse::<i64>() {
            Ok(value) => self.answer(value),
            // Non-numeric replies still cost an attempt.
            Err(_) => self.answer(-1),
        }
    }

    fn record(&mut self, correct: bool, wrong_answers: u8) -> AnswerOutcome {
        if correct {
            self.state = GateState::Verified;
            return AnswerOutcome::Verified;
        }

        let wrong_answers = wrong_answers + 1;
        if wrong_answers >= MAX_ATTEMPTS {
            tracing::warn!(attempts = wrong_answers, "Restore confirmation failed");
            self.state = GateState::Failed;
            return AnswerOutcome::Failed;
        }

        let challenge = Challenge::random();
        self.state = GateState::Challenged {
            challenge,
            wrong_answers,
        };
        AnswerOutcome::Retry {
            challenge,
            attempts_left: MAX_ATTEMPTS - wrong_answers,
        }
    }

    /// Exchange a completed confirmation for a single-use permit.
    pub fn take_permit(&mut self) -> Result<RestorePermit, GateError> {
        match self.state {
            GateState::Verified => {
                self.state = GateState::Idle;
                Ok(RestorePermit { _private: () })
            }
            GateState::Failed => Err(GateError::Exhausted),
            GateState::Idle | GateState::Challenged { .. } => Err(GateError::NotVerified),
        }
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }
}

pub mod grading;
pub mod session;

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::trivia::CategoryChoice;

pub use session::{Phase, QuizSession, Resolution, ScoreSummary, Step};

/// How many rounds a game lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundLimit {
    Limited(NonZeroUsize),
    Unlimited,
}

impl RoundLimit {
    /// What the setup screen offers, in order.
    pub const CHOICES: [&'static str; 5] = ["5", "10", "20", "50", "unlimited"];

    pub fn limited(rounds: usize) -> Option<Self> {
        NonZeroUsize::new(rounds).map(RoundLimit::Limited)
    }

    pub fn is_reached(self, asked: usize) -> bool {
        match self {
            RoundLimit::Limited(limit) => asked >= limit.get(),
            RoundLimit::Unlimited => false,
        }
    }
}

impl Default for RoundLimit {
    fn default() -> Self {
        RoundLimit::Limited(NonZeroUsize::MIN.saturating_add(4))
    }
}

impl fmt::Display for RoundLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundLimit::Limited(limit) => write!(f, "{limit}"),
            RoundLimit::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a positive number of questions or \"unlimited\", got {0:?}")]
pub struct ParseRoundLimitError(String);

impl FromStr for RoundLimit {
    type Err = ParseRoundLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") || s == "-1" {
            return Ok(RoundLimit::Unlimited);
        }
        s.parse::<usize>()
            .ok()
            .and_then(RoundLimit::limited)
            .ok_or_else(|| ParseRoundLimitError(s.to_string()))
    }
}

/// Chosen on the setup screen before the first question; replaced as a
/// whole when a new game starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameConfig {
    pub category: CategoryChoice,
    pub questions_per_round: RoundLimit,
}

use std::ops::RangeInclusive;

use super::{CategoryId, Difficulty, NewQuestion};

pub const DIFFICULTIES: RangeInclusive<Difficulty> = 1..=5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("the question text is empty")]
    EmptyQuestion,
    #[error("the answer is empty")]
    EmptyAnswer,
    #[error("difficulty must be a number from 1 to 5, got {0:?}")]
    InvalidDifficulty(String),
}

/// A question being put together one field at a time before it is sent to
/// the backend. Starts at difficulty 1 in category 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub category: CategoryId,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        Self {
            question: String::new(),
            answer: String::new(),
            difficulty: *DIFFICULTIES.start(),
            category: 1,
        }
    }
}

impl QuestionDraft {
    pub fn set_difficulty(&mut self, input: &str) -> Result<(), DraftError> {
        self.difficulty = parse_difficulty(input)?;
        Ok(())
    }

    pub fn finish(self) -> Result<NewQuestion, DraftError> {
        if self.question.trim().is_empty() {
            return Err(DraftError::EmptyQuestion);
        }
        if self.answer.trim().is_empty() {
            return Err(DraftError::EmptyAnswer);
        }
        if !DIFFICULTIES.contains(&self.difficulty) {
            return Err(DraftError::InvalidDifficulty(self.difficulty.to_string()));
        }
        Ok(NewQuestion {
            question: self.question,
            answer: self.answer,
            difficulty: self.difficulty,
            category: self.category,
        })
    }
}

pub fn parse_difficulty(input: &str) -> Result<Difficulty, DraftError> {
    input
        .trim()
        .parse::<Difficulty>()
        .ok()
        .filter(|d| DIFFICULTIES.contains(d))
        .ok_or_else(|| DraftError::InvalidDifficulty(input.trim().to_string()))
}

pub mod categories;
pub mod form;
pub mod http;
pub mod listing;

use std::fmt;

use async_trait::async_trait;

use listing::ListingQuery;

pub type QuestionId = i64;
pub type CategoryId = i64;
/// Stored as a plain integer by the backend, which does not bound it. Only
/// the creation form restricts it to [`form::DIFFICULTIES`].
pub type Difficulty = i64;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub question: String,
    pub answer: String,
    pub category: CategoryId,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "type")]
    pub name: String,
}

/// Body of `POST /questions`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub category: CategoryId,
}

/// One page of `GET /questions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub total_questions: u64,
    // The server echoes the page it actually served, which differs from the
    // requested one when it was out of range.
    #[serde(default)]
    pub page: Option<u64>,
}

/// Category filter used when drawing quiz questions. The backend spells
/// "any category" as `-1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategoryChoice {
    #[default]
    Any,
    Only(CategoryId),
}

impl CategoryChoice {
    pub const ANY_WIRE_VALUE: CategoryId = -1;

    pub fn wire_value(self) -> CategoryId {
        match self {
            CategoryChoice::Any => Self::ANY_WIRE_VALUE,
            CategoryChoice::Only(id) => id,
        }
    }
}

impl fmt::Display for CategoryChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryChoice::Any => f.write_str("all"),
            CategoryChoice::Only(id) => write!(f, "{id}"),
        }
    }
}

/// Errors that can occur while talking to the trivia backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a usable response (connection refused,
    /// timeout, malformed body).
    #[error("request to the trivia backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered, but not with a 2xx status.
    #[error("trivia backend answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid backend endpoint: {0}")]
    Endpoint(String),
}

/// The remote trivia service, seen from the client.
///
/// Every method is a single request/response exchange. None of them retry;
/// a failed call is reported to the user, who can trigger it again.
#[async_trait]
pub trait TriviaBackend: Send + Sync {
    /// `GET /categories`
    async fn categories(&self) -> Result<Vec<Category>, ApiError>;

    /// `GET /questions?page&current_category&search_term`
    async fn questions(&self, query: &ListingQuery) -> Result<QuestionPage, ApiError>;

    /// `POST /questions`
    async fn create_question(&self, question: &NewQuestion) -> Result<(), ApiError>;

    /// `DELETE /questions/{id}`
    async fn delete_question(&self, id: QuestionId) -> Result<(), ApiError>;

    /// `POST /quizzes`. `Ok(None)` means the bank has nothing left that is
    /// not in `previous_questions`.
    async fn next_quiz_question(
        &self,
        previous_questions: &[QuestionId],
        category: CategoryChoice,
    ) -> Result<Option<Question>, ApiError>;
}

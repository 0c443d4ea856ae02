use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, Url};

use super::listing::ListingQuery;
use super::{
    ApiError, Category, CategoryChoice, NewQuestion, Question, QuestionId, QuestionPage,
    TriviaBackend,
};

#[derive(serde::Deserialize)]
struct CategoriesBody {
    categories: Vec<Category>,
}

#[derive(serde::Serialize)]
struct QuizRequestBody<'a> {
    previous_questions: &'a [QuestionId],
    category: i64,
}

#[derive(serde::Deserialize)]
struct QuizResponseBody {
    question: Option<Question>,
}

/// [`TriviaBackend`] over the backend's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Builds a client rooted at `base_url`. Every request gives up after
    /// `timeout`, which surfaces as an ordinary transport error.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Endpoint(format!("{path}: {e}")))
    }
}

fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status(status))
    }
}

#[async_trait]
impl TriviaBackend for HttpBackend {
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint("categories")?;
        log::debug!("GET {url}");

        let response = ensure_success(self.client.get(url).send().await?)?;
        let body: CategoriesBody = response.json().await?;
        Ok(body.categories)
    }

    async fn questions(&self, query: &ListingQuery) -> Result<QuestionPage, ApiError> {
        let url = self.endpoint("questions")?;
        log::debug!("GET {url} {query:?}");

        let response = self
            .client
            .get(url)
            .query(&query.query_pairs())
            .send()
            .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    async fn create_question(&self, question: &NewQuestion) -> Result<(), ApiError> {
        let url = self.endpoint("questions")?;
        log::debug!("POST {url} {question:?}");

        ensure_success(self.client.post(url).json(question).send().await?)?;
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("questions/{id}"))?;
        log::debug!("DELETE {url}");

        ensure_success(self.client.delete(url).send().await?)?;
        Ok(())
    }

    async fn next_quiz_question(
        &self,
        previous_questions: &[QuestionId],
        category: CategoryChoice,
    ) -> Result<Option<Question>, ApiError> {
        let url = self.endpoint("quizzes")?;
        let body = QuizRequestBody {
            previous_questions,
            category: category.wire_value(),
        };
        log::debug!(
            "POST {url} excluding {} question(s), category {category}",
            previous_questions.len()
        );

        let response = ensure_success(self.client.post(url).json(&body).send().await?)?;
        let body: QuizResponseBody = response.json().await?;
        Ok(body.question)
    }
}

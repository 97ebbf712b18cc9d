//! HTTP API client for the workout backend.
//!
//! The [`WorkoutApi`] trait is the boundary between the store and the
//! remote service. [`HttpWorkoutApi`] is the reqwest implementation used in
//! production; tests substitute their own implementations.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::types::{ExerciseTemplate, NewWorkout, Stats, StepLog, Workout};

/// Remote call failure.
///
/// Every variant is a transport-level failure from the caller's point of
/// view: nothing is retried.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Connection failed or the request could not be sent
    #[error("Request failed: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Response body was not what we expected
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Base URL could not be used
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::InvalidUrl(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Optional inclusive date window for list endpoints
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    fn query(&self) -> [(&'static str, &str); 2] {
        [("start_date", self.start.as_str()), ("end_date", self.end.as_str())]
    }
}

/// Operations offered by the workout backend.
#[async_trait]
pub trait WorkoutApi: Send + Sync {
    /// `GET /api/workouts`
    async fn list_workouts(&self) -> Result<Vec<Workout>, ApiError>;

    /// `GET /api/workouts?start_date=..&end_date=..`
    async fn list_workouts_between(&self, range: &DateRange) -> Result<Vec<Workout>, ApiError>;

    /// `GET /api/workouts/{id}`
    async fn get_workout(&self, id: &str) -> Result<Workout, ApiError>;

    /// `POST /api/workouts`
    async fn create_workout(&self, workout: &NewWorkout) -> Result<Workout, ApiError>;

    /// `DELETE /api/workouts/{id}`
    async fn delete_workout(&self, id: &str) -> Result<(), ApiError>;

    /// `GET /api/workouts/stats/summary`
    async fn stats_summary(&self) -> Result<Stats, ApiError>;

    /// `POST /api/steps`
    async fn log_steps(&self, log: &StepLog) -> Result<(), ApiError>;

    /// `GET /api/steps`, optionally bounded
    async fn list_steps(&self, range: Option<&DateRange>) -> Result<Vec<StepLog>, ApiError>;

    /// `GET /api/exercises`
    async fn list_exercises(&self) -> Result<Vec<ExerciseTemplate>, ApiError>;
}

/// reqwest-backed [`WorkoutApi`].
#[derive(Debug, Clone)]
pub struct HttpWorkoutApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWorkoutApi {
    /// Create a client for the backend at `base_url` (scheme and host, without `/api`).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing reqwest client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(format!(
                "'{}' must start with http:// or https://",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Url::parse(&self.url(path)).map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// `/api/workouts/{id}` with `id` encoded as a single path segment
    fn workout_url(&self, id: &str) -> Result<Url, ApiError> {
        if matches!(id, "" | "." | "..") {
            return Err(ApiError::InvalidUrl(format!("'{}' is not a workout id", id)));
        }
        let mut url = self.endpoint("/workouts")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{} cannot carry a path", self.base_url)))?
            .push(id);
        Ok(url)
    }

    /// Turn a non-2xx response into [`ApiError::Status`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl WorkoutApi for HttpWorkoutApi {
    async fn list_workouts(&self) -> Result<Vec<Workout>, ApiError> {
        self.get_json(self.endpoint("/workouts")?, &[]).await
    }

    async fn list_workouts_between(&self, range: &DateRange) -> Result<Vec<Workout>, ApiError> {
        self.get_json(self.endpoint("/workouts")?, &range.query()).await
    }

    async fn get_workout(&self, id: &str) -> Result<Workout, ApiError> {
        self.get_json(self.workout_url(id)?, &[]).await
    }

    async fn create_workout(&self, workout: &NewWorkout) -> Result<Workout, ApiError> {
        let url = self.url("/workouts");
        tracing::debug!("POST {}", url);
        let response = self.client.post(&url).json(workout).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<Workout>().await?)
    }

    async fn delete_workout(&self, id: &str) -> Result<(), ApiError> {
        let url = self.workout_url(id)?;
        tracing::debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn stats_summary(&self) -> Result<Stats, ApiError> {
        self.get_json(self.endpoint("/workouts/stats/summary")?, &[]).await
    }

    async fn log_steps(&self, log: &StepLog) -> Result<(), ApiError> {
        let url = self.url("/steps");
        tracing::debug!("POST {} ({} steps on {})", url, log.steps, log.date);
        let response = self.client.post(&url).json(log).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_steps(&self, range: Option<&DateRange>) -> Result<Vec<StepLog>, ApiError> {
        match range {
            Some(range) => self.get_json(self.endpoint("/steps")?, &range.query()).await,
            None => self.get_json(self.endpoint("/steps")?, &[]).await,
        }
    }

    async fn list_exercises(&self) -> Result<Vec<ExerciseTemplate>, ApiError> {
        self.get_json(self.endpoint("/exercises")?, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let api = HttpWorkoutApi::new("https://fit.example.com/").unwrap();
        assert_eq!(api.base_url(), "https://fit.example.com");
        assert_eq!(api.url("/workouts"), "https://fit.example.com/api/workouts");
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let err = HttpWorkoutApi::new("fit.example.com").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_workout_id_stays_one_path_segment() {
        let api = HttpWorkoutApi::new("http://localhost:8001").unwrap();
        assert_eq!(
            api.workout_url("abc123").unwrap().as_str(),
            "http://localhost:8001/api/workouts/abc123"
        );
        assert_eq!(
            api.workout_url("a/b").unwrap().path(),
            "/api/workouts/a%2Fb"
        );

        let url = api.workout_url("abc?x=1").unwrap();
        assert_eq!(url.path(), "/api/workouts/abc%3Fx=1");
        assert!(url.query().is_none());

        assert_eq!(
            api.workout_url("../steps").unwrap().path(),
            "/api/workouts/..%2Fsteps"
        );
        assert!(matches!(api.workout_url(".."), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(api.workout_url(""), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Status {
            status: 404,
            message: "Workout not found".into(),
        };
        assert_eq!(err.to_string(), "Server error (404): Workout not found");
        assert_eq!(
            ApiError::Transport("connection refused".into()).to_string(),
            "Request failed: connection refused"
        );
    }
}

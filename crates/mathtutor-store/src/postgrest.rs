//! Supabase/PostgREST mastery store.
//!
//! Reads go straight to the table. Writes call a SQL function (see
//! `sql/upsert_mastery_max.sql`) that performs the max-merge in a single
//! `INSERT ... ON CONFLICT DO UPDATE` statement, so concurrent writers to
//! the same key cannot lose an update.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mathtutor_core::error::StoreError;
use mathtutor_core::mastery::{MasteryKey, MasteryRecord, MasteryUpdate, MASTERED_THRESHOLD};
use mathtutor_core::traits::MasteryStore;

const DEFAULT_TABLE: &str = "student_mastery";
const DEFAULT_UPSERT_FUNCTION: &str = "upsert_mastery_max";

/// PostgREST-backed store.
pub struct PostgrestStore {
    api_key: String,
    base_url: String,
    table: String,
    upsert_function: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            table: DEFAULT_TABLE.to_string(),
            upsert_function: DEFAULT_UPSERT_FUNCTION.to_string(),
            timeout_secs,
            client,
        })
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    pub fn with_upsert_function(mut self, function: &str) -> Self {
        self.upsert_function = function.to_string();
        self
    }

    fn table_url(&self, filters: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut params: Vec<(&str, String)> = filters
            .iter()
            .map(|(column, value)| (*column, format!("eq.{value}")))
            .collect();
        params.push(("select", "*".to_string()));
        Url::parse_with_params(&format!("{}/rest/v1/{}", self.base_url, self.table), &params)
            .map_err(|e| StoreError::Network(format!("invalid store URL: {e}")))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
    }

    async fn get_rows(&self, url: Url) -> Result<Vec<MasteryRecord>, StoreError> {
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, &self.table).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("failed to parse rows: {e}")))
    }

    fn send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout_secs)
        } else {
            StoreError::Network(e.to_string())
        }
    }

    /// Map non-success statuses to typed errors.
    async fn check_status(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(StoreError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Unauthorized(error_message(body)));
        }
        if status == 404 {
            return Err(StoreError::NotFound(resource.to_string()));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status,
                message: error_message(body),
            });
        }
        Ok(response)
    }
}

/// Body of a PostgREST error response.
#[derive(Deserialize)]
struct PostgrestError {
    message: String,
}

fn error_message(body: String) -> String {
    serde_json::from_str::<PostgrestError>(&body)
        .map(|e| e.message)
        .unwrap_or(body)
}

#[derive(Serialize)]
struct UpsertArgs<'a> {
    p_student_id: &'a str,
    p_topic_id: &'a str,
    p_objective_id: &'a str,
    p_score: f64,
    p_curriculum_country: Option<&'a str>,
    p_curriculum_level: Option<&'a str>,
    p_mastered_threshold: f64,
}

/// A function returning one row comes back as an object, a set-returning
/// one as an array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RpcRows {
    One(MasteryRecord),
    Many(Vec<MasteryRecord>),
}

#[async_trait]
impl MasteryStore for PostgrestStore {
    fn name(&self) -> &str {
        "postgrest"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>, StoreError> {
        let url = self.table_url(&[
            ("student_id", key.student_id.clone()),
            ("topic_id", key.topic_id.clone()),
            ("objective_id", key.objective_id.clone()),
        ])?;
        Ok(self.get_rows(url).await?.into_iter().next())
    }

    #[instrument(skip(self, update), fields(key = %update.key()))]
    async fn upsert_max(&self, update: &MasteryUpdate) -> Result<MasteryRecord, StoreError> {
        let args = UpsertArgs {
            p_student_id: &update.student_id,
            p_topic_id: &update.topic_id,
            p_objective_id: &update.objective_id,
            p_score: update.score,
            p_curriculum_country: update.curriculum_country.as_deref(),
            p_curriculum_level: update.curriculum_level.as_deref(),
            p_mastered_threshold: MASTERED_THRESHOLD,
        };

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/rest/v1/rpc/{}", self.base_url, self.upsert_function)),
            )
            .json(&args)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, &self.upsert_function).await?;

        let rows: RpcRows = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("failed to parse RPC result: {e}")))?;
        match rows {
            RpcRows::One(record) => Ok(record),
            RpcRows::Many(records) => records.into_iter().next().ok_or_else(|| StoreError::Api {
                status: 0,
                message: format!("{} returned no rows", self.upsert_function),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn list_for_student(&self, student_id: &str) -> Result<Vec<MasteryRecord>, StoreError> {
        let url = self.table_url(&[("student_id", student_id.to_string())])?;
        self.get_rows(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::mastery::{update_mastery, MasteryStatus};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(score: f64, status: &str, attempts: u32) -> serde_json::Value {
        serde_json::json!({
            "student_id": "ana",
            "topic_id": "fractions",
            "objective_id": "compare",
            "score": score,
            "status": status,
            "attempts": attempts,
            "curriculum_country": "en",
            "curriculum_level": null,
            "updated_at": "2026-03-01T10:00:00Z"
        })
    }

    fn key() -> MasteryKey {
        MasteryKey {
            student_id: "ana".into(),
            topic_id: "fractions".into(),
            objective_id: "compare".into(),
        }
    }

    #[tokio::test]
    async fn fetch_filters_by_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/student_mastery"))
            .and(query_param("student_id", "eq.ana"))
            .and(query_param("topic_id", "eq.fractions"))
            .and(query_param("objective_id", "eq.compare"))
            .and(query_param("select", "*"))
            .and(header("apikey", "test-key"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([row(
                    72.5,
                    "in_progress",
                    3
                )])),
            )
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5).unwrap();
        let record = store.fetch(&key()).await.unwrap().unwrap();
        assert_eq!(record.score, 72.5);
        assert_eq!(record.status, MasteryStatus::InProgress);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.curriculum_country.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn fetch_missing_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/student_mastery"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5).unwrap();
        assert!(store.fetch(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_calls_rpc_with_clamped_score() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/upsert_mastery_max"))
            .and(header("apikey", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "p_student_id": "ana",
                "p_score": 100.0,
                "p_mastered_threshold": 80.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(row(100.0, "mastered", 4)))
            .expect(1)
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5).unwrap();
        let record = update_mastery(
            &store,
            &MasteryUpdate::new("ana", "fractions", "compare", 130.0),
        )
        .await
        .unwrap();
        assert_eq!(record.status, MasteryStatus::Mastered);
        assert_eq!(record.attempts, 4);
    }

    #[tokio::test]
    async fn upsert_accepts_row_array() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/custom_upsert"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([row(40.0, "in_progress", 1)])),
            )
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5)
            .unwrap()
            .with_upsert_function("custom_upsert");
        let record = store
            .upsert_max(&MasteryUpdate::new("ana", "fractions", "compare", 40.0))
            .await
            .unwrap();
        assert_eq!(record.score, 40.0);
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/upsert_mastery_max"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "Invalid API key"})),
            )
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "bad-key", 5).unwrap();
        let err = store
            .upsert_max(&MasteryUpdate::new("ana", "fractions", "compare", 50.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(ref m) if m == "Invalid API key"));
    }

    #[tokio::test]
    async fn rate_limiting() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/student_mastery"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5).unwrap();
        let err = store.list_for_student("ana").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert!(matches!(
            err,
            StoreError::RateLimited {
                retry_after_ms: 2000
            }
        ));
    }

    #[tokio::test]
    async fn server_error_message_is_kept() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/upsert_mastery_max"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"message": "deadlock detected"})),
            )
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5).unwrap();
        let err = store
            .upsert_max(&MasteryUpdate::new("ana", "fractions", "compare", 50.0))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "store API error (HTTP 500): deadlock detected"
        );
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/mastery_v2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = PostgrestStore::new(&server.uri(), "test-key", 5)
            .unwrap()
            .with_table("mastery_v2");
        let err = store.list_for_student("ana").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref t) if t == "mastery_v2"));
    }
}

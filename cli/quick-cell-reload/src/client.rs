//! Scheduler HTTP API client.
//!
//! Covers the four calls the reload flow needs:
//! - listing jobs in a namespace
//! - reading a full job specification
//! - registering an updated job specification
//! - reading an evaluation

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::ReloadError;

/// ACL token header (`X-Nomad-Token`). Lowercase for `HeaderMap::insert`.
pub const TOKEN_HEADER: &str = "x-nomad-token";

/// Fragment of the scheduler's error text when `EnforceIndex` fails.
const INDEX_CONFLICT_MARKER: &str = "conflicting job modify index";

/// Operations the reload flow needs from the scheduler.
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    /// List every job in a namespace.
    async fn list_jobs(&self, namespace: &str) -> Result<Vec<JobStub>, ReloadError>;

    /// Fetch the full specification of a job.
    async fn get_job(&self, job_id: &str, namespace: &str) -> Result<Job, ReloadError>;

    /// Submit a full job specification.
    ///
    /// With `enforce_index`, the write only succeeds if the job's modify index
    /// still matches the one carried in `job`.
    async fn register_job(
        &self,
        job: &Job,
        namespace: &str,
        enforce_index: bool,
    ) -> Result<JobRegisterResponse, ReloadError>;

    /// Fetch an evaluation by ID.
    async fn get_evaluation(
        &self,
        eval_id: &str,
        namespace: &str,
    ) -> Result<Evaluation, ReloadError>;
}

/// Summary row returned by the job list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobStub {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub job_modify_index: u64,
}

/// A job specification.
///
/// Only the fields the reload flow touches are typed. Everything else is kept
/// verbatim so the job can be registered again without losing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "Namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(rename = "Meta", default)]
    pub meta: Option<BTreeMap<String, String>>,

    #[serde(
        rename = "JobModifyIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub job_modify_index: Option<u64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Job {
    /// Merge `updates` into the job's meta, creating the map if missing.
    pub fn merge_meta(&mut self, updates: &BTreeMap<String, String>) {
        let meta = self.meta.get_or_insert_with(BTreeMap::new);
        for (key, value) in updates {
            meta.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct JobRegisterRequest<'a> {
    job: &'a Job,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    enforce_index: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_modify_index: Option<u64>,
}

/// Response to a job registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobRegisterResponse {
    /// Empty for periodic and parameterized jobs.
    #[serde(rename = "EvalID", default)]
    pub eval_id: String,
    #[serde(default)]
    pub eval_create_index: u64,
    #[serde(default)]
    pub job_modify_index: u64,
    #[serde(default)]
    pub warnings: String,
}

/// An evaluation created by a job registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Evaluation {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "JobID", default)]
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_description: String,
    #[serde(default)]
    pub triggered_by: String,
}

/// HTTP client for the scheduler API.
#[derive(Debug, Clone)]
pub struct NomadClient {
    client: reqwest::Client,
    base_url: String,
    region: Option<String>,
}

impl NomadClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(token).context("Invalid ACL token format")?;
            value.set_sensitive(true);
            headers.insert(TOKEN_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.address().to_string(),
            region: config.region.clone(),
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query parameters shared by every request.
    fn query<'a>(&'a self, namespace: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut query = vec![("namespace", namespace)];
        if let Some(region) = &self.region {
            query.push(("region", region.as_str()));
        }
        query
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        namespace: &str,
    ) -> Result<T, ReloadError> {
        debug!(path = %path, namespace = %namespace, "GET");
        let response = self
            .client
            .get(self.url(path))
            .query(&self.query(namespace))
            .send()
            .await?;

        self.handle_response(response, path).await
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, ReloadError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                ReloadError::Other(anyhow::anyhow!("Failed to parse response: {}", e))
            })
        } else {
            Err(self.handle_error(response, what).await)
        }
    }

    /// Map an error response. The scheduler answers errors in plain text.
    async fn handle_error(&self, response: reqwest::Response, what: &str) -> ReloadError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = body.trim().to_string();

        match status {
            404 => ReloadError::NotFound(what.to_string()),
            409 => ReloadError::Conflict(message),
            _ if message.contains(INDEX_CONFLICT_MARKER) => ReloadError::Conflict(message),
            _ => ReloadError::api(status, message),
        }
    }
}

#[async_trait]
impl SchedulerApi for NomadClient {
    async fn list_jobs(&self, namespace: &str) -> Result<Vec<JobStub>, ReloadError> {
        self.get("/v1/jobs", namespace).await
    }

    async fn get_job(&self, job_id: &str, namespace: &str) -> Result<Job, ReloadError> {
        let path = format!("/v1/job/{}", urlencoding::encode(job_id));
        self.get(&path, namespace).await.map_err(|e| match e {
            ReloadError::NotFound(_) => {
                ReloadError::NotFound(format!("job '{}' in namespace '{}'", job_id, namespace))
            }
            other => other,
        })
    }

    async fn register_job(
        &self,
        job: &Job,
        namespace: &str,
        enforce_index: bool,
    ) -> Result<JobRegisterResponse, ReloadError> {
        let request = JobRegisterRequest {
            job,
            enforce_index,
            job_modify_index: if enforce_index {
                Some(job.job_modify_index.unwrap_or(0))
            } else {
                None
            },
        };

        debug!(job_id = %job.id, namespace = %namespace, enforce_index, "Registering job");
        let response = self
            .client
            .post(self.url("/v1/jobs"))
            .query(&self.query(namespace))
            .json(&request)
            .send()
            .await?;

        self.handle_response(response, &format!("job '{}'", job.id))
            .await
    }

    async fn get_evaluation(
        &self,
        eval_id: &str,
        namespace: &str,
    ) -> Result<Evaluation, ReloadError> {
        let path = format!("/v1/evaluation/{}", urlencoding::encode(eval_id));
        self.get(&path, namespace).await.map_err(|e| match e {
            ReloadError::NotFound(_) => ReloadError::NotFound(format!("evaluation '{}'", eval_id)),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let config = Config {
            address: "http://nomad:4646/".to_string(),
            ..Config::default()
        };
        let client = NomadClient::new(&config).unwrap();
        assert_eq!(client.url("/v1/jobs"), "http://nomad:4646/v1/jobs");
    }

    #[test]
    fn query_includes_region_when_configured() {
        let config = Config {
            region: Some("eu".to_string()),
            ..Config::default()
        };
        let client = NomadClient::new(&config).unwrap();
        assert_eq!(
            client.query("sites"),
            vec![("namespace", "sites"), ("region", "eu")]
        );
    }

    #[test]
    fn job_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "ID": "app-1",
            "Name": "app-1",
            "Meta": null,
            "JobModifyIndex": 42,
            "TaskGroups": [{ "Name": "web", "Count": 3 }],
            "Datacenters": ["dc1"]
        });

        let mut job: Job = serde_json::from_value(raw).unwrap();
        assert!(job.meta.is_none());
        assert_eq!(job.job_modify_index, Some(42));

        job.merge_meta(&BTreeMap::from([("reload-hash".to_string(), "abc".to_string())]));

        let out = serde_json::to_value(&job).unwrap();
        assert_eq!(out["TaskGroups"][0]["Count"], 3);
        assert_eq!(out["Datacenters"][0], "dc1");
        assert_eq!(out["Meta"]["reload-hash"], "abc");
    }

    #[test]
    fn merge_meta_overwrites_and_keeps_other_keys() {
        let mut job: Job = serde_json::from_value(serde_json::json!({
            "ID": "app-1",
            "Meta": { "owner": "team-a", "reload-hash": "old" }
        }))
        .unwrap();

        job.merge_meta(&BTreeMap::from([("reload-hash".to_string(), "new".to_string())]));

        let meta = job.meta.unwrap();
        assert_eq!(meta["reload-hash"], "new");
        assert_eq!(meta["owner"], "team-a");
    }

    #[test]
    fn register_request_omits_index_unless_enforced() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "ID": "app-1",
            "JobModifyIndex": 7
        }))
        .unwrap();

        let plain = serde_json::to_value(JobRegisterRequest {
            job: &job,
            enforce_index: false,
            job_modify_index: None,
        })
        .unwrap();
        assert!(plain.get("EnforceIndex").is_none());
        assert!(plain.get("JobModifyIndex").is_none());
        assert_eq!(plain["Job"]["ID"], "app-1");

        let enforced = serde_json::to_value(JobRegisterRequest {
            job: &job,
            enforce_index: true,
            job_modify_index: Some(7),
        })
        .unwrap();
        assert_eq!(enforced["EnforceIndex"], true);
        assert_eq!(enforced["JobModifyIndex"], 7);
    }
}

//! In-memory scheduler for exercising the reload flow without HTTP.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quick_cell_reload::client::{Evaluation, JobRegisterResponse};
use quick_cell_reload::{Job, JobStub, ReloadError, SchedulerApi};

/// A registration the fake accepted.
#[derive(Debug, Clone)]
pub struct Registration {
    pub job: Job,
    pub namespace: String,
    pub enforce_index: bool,
    pub at: Instant,
}

#[derive(Default)]
pub struct FakeScheduler {
    jobs: Mutex<BTreeMap<(String, String), Job>>,
    order: Mutex<Vec<(String, String)>>,
    registrations: Mutex<Vec<Registration>>,
    fail_get: Mutex<HashSet<String>>,
    conflict_on_register: Mutex<HashSet<String>>,
    fail_list: Mutex<bool>,
    fail_eval: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
    next_index: AtomicU64,
    pub get_calls: AtomicUsize,
    pub eval_calls: AtomicUsize,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self {
            next_index: AtomicU64::new(100),
            ..Self::default()
        }
    }

    /// Seed a job with the given meta.
    pub fn with_job(self, namespace: &str, id: &str, meta: Option<&[(&str, &str)]>) -> Self {
        let job = Job {
            id: id.to_string(),
            name: Some(id.to_string()),
            namespace: Some(namespace.to_string()),
            meta: meta.map(|pairs| {
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
            job_modify_index: Some(self.next_index.fetch_add(1, Ordering::SeqCst)),
            extra: serde_json::Map::from_iter([(
                "TaskGroups".to_string(),
                serde_json::json!([{ "Name": "web", "Count": 2 }]),
            )]),
        };
        let key = (namespace.to_string(), id.to_string());
        self.order.lock().unwrap().push(key.clone());
        self.jobs.lock().unwrap().insert(key, job);
        self
    }

    pub fn fail_get_for(self, id: &str) -> Self {
        self.fail_get.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn conflict_for(self, id: &str) -> Self {
        self.conflict_on_register.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn failing_list(self) -> Self {
        *self.fail_list.lock().unwrap() = true;
        self
    }

    pub fn failing_eval(self) -> Self {
        *self.fail_eval.lock().unwrap() = true;
        self
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    pub fn job(&self, namespace: &str, id: &str) -> Option<Job> {
        self.jobs
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), id.to_string()))
            .cloned()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .registrations()
            .into_iter()
            .map(|r| r.job.id)
            .collect();
        ids.sort();
        ids
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SchedulerApi for FakeScheduler {
    async fn list_jobs(&self, namespace: &str) -> Result<Vec<JobStub>, ReloadError> {
        if *self.fail_list.lock().unwrap() {
            return Err(ReloadError::api(500, "No cluster leader"));
        }

        let jobs = self.jobs.lock().unwrap();
        let stubs = self
            .order
            .lock()
            .unwrap()
            .iter()
            .filter(|(ns, _)| ns == namespace)
            .filter_map(|key| jobs.get(key))
            .map(|job| JobStub {
                id: job.id.clone(),
                name: job.name.clone().unwrap_or_default(),
                namespace: namespace.to_string(),
                r#type: "service".to_string(),
                status: "running".to_string(),
                job_modify_index: job.job_modify_index.unwrap_or(0),
            })
            .collect();
        Ok(stubs)
    }

    async fn get_job(&self, job_id: &str, namespace: &str) -> Result<Job, ReloadError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail_get.lock().unwrap().contains(job_id) {
            return Err(ReloadError::api(500, format!("rpc error reading {}", job_id)));
        }

        self.job(namespace, job_id).ok_or_else(|| {
            ReloadError::NotFound(format!("job '{}' in namespace '{}'", job_id, namespace))
        })
    }

    async fn register_job(
        &self,
        job: &Job,
        namespace: &str,
        enforce_index: bool,
    ) -> Result<JobRegisterResponse, ReloadError> {
        self.simulate_latency().await;

        if enforce_index && self.conflict_on_register.lock().unwrap().contains(&job.id) {
            return Err(ReloadError::Conflict(format!(
                "Enforcing job modify index {}: job exists with conflicting job modify index",
                job.job_modify_index.unwrap_or(0)
            )));
        }

        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let mut stored = job.clone();
        stored.job_modify_index = Some(index);
        self.jobs
            .lock()
            .unwrap()
            .insert((namespace.to_string(), job.id.clone()), stored);

        self.registrations.lock().unwrap().push(Registration {
            job: job.clone(),
            namespace: namespace.to_string(),
            enforce_index,
            at: Instant::now(),
        });

        Ok(JobRegisterResponse {
            eval_id: format!("eval-{}", job.id),
            eval_create_index: index,
            job_modify_index: index,
            warnings: String::new(),
        })
    }

    async fn get_evaluation(
        &self,
        eval_id: &str,
        _namespace: &str,
    ) -> Result<Evaluation, ReloadError> {
        self.eval_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_eval.lock().unwrap() {
            return Err(ReloadError::api(500, "eval lookup failed"));
        }

        Ok(Evaluation {
            id: eval_id.to_string(),
            job_id: eval_id.trim_start_matches("eval-").to_string(),
            status: "complete".to_string(),
            status_description: String::new(),
            triggered_by: "job-register".to_string(),
        })
    }
}

pub fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

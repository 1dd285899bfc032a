use anyhow::{Context, Result};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::filters::{FilterState, PAGE_SIZE, Paginator, SortMode};
use crate::models::{Job, JobsPage, JobsResponse};

// --- Request descriptor ---

/// Everything the remote search needs, derived from filters + paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience: Option<String>,
    pub sort_by: SortMode,
    pub page: u32,
    pub limit: u32,
}

impl JobQuery {
    pub fn from_state(filters: &FilterState, pager: &Paginator) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let joined = |values: Vec<&str>| (!values.is_empty()).then(|| values.join(","));

        Self {
            search: non_empty(&filters.search_query),
            location: non_empty(&filters.location),
            job_type: joined(filters.job_type.iter().map(|t| t.as_str()).collect()),
            experience: joined(filters.experience.iter().map(String::as_str).collect()),
            sort_by: filters.sort_by,
            page: pager.page,
            // Always the fixed size, whatever the last response reported.
            limit: PAGE_SIZE,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(location) = &self.location {
            params.push(("location", location.clone()));
        }
        if let Some(job_type) = &self.job_type {
            params.push(("jobType", job_type.clone()));
        }
        if let Some(experience) = &self.experience {
            params.push(("experience", experience.clone()));
        }
        params.push(("sortBy", self.sort_by.as_str().to_string()));
        params.push(("page", self.page.to_string()));
        params.push(("limit", self.limit.to_string()));
        params
    }
}

// --- Remote API ---

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("server reported an unsuccessful search")]
    Unsuccessful,
}

pub trait JobSource: Send + Sync {
    fn search(&self, query: &JobQuery) -> Result<JobsPage, FetchError>;
}

pub struct HttpJobSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpJobSource {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn jobs_url(&self) -> String {
        format!("{}/jobs", self.base_url)
    }
}

impl JobSource for HttpJobSource {
    fn search(&self, query: &JobQuery) -> Result<JobsPage, FetchError> {
        let response = self
            .client
            .get(self.jobs_url())
            .query(&query.params())
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_jobs_response(&body)
    }
}

pub fn parse_jobs_response(body: &str) -> Result<JobsPage, FetchError> {
    let response: JobsResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if !response.success {
        return Err(FetchError::Unsuccessful);
    }

    let pagination = response
        .pagination
        .ok_or_else(|| FetchError::Malformed("missing pagination block".to_string()))?;

    Ok(JobsPage {
        jobs: response.data,
        pagination,
    })
}

/// A `JobSource` that answers from a script keyed by search text, with an
/// optional delay per answer. Unscripted searches fail as malformed.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    script: std::sync::Mutex<std::collections::HashMap<String, (Duration, Result<JobsPage, FetchError>)>>,
    calls: std::sync::Mutex<Vec<JobQuery>>,
}

#[cfg(test)]
impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self {
            script: std::sync::Mutex::new(std::collections::HashMap::new()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(self, search: &str, delay: Duration, ids: &[&str]) -> Self {
        let page = JobsPage {
            jobs: ids.iter().map(|id| crate::models::sample_job(id)).collect(),
            pagination: crate::models::Pagination {
                page: 1,
                limit: PAGE_SIZE,
                total_count: ids.len() as u64,
                total_pages: 1,
            },
        };
        self.script.lock().unwrap().insert(search.to_string(), (delay, Ok(page)));
        self
    }

    pub(crate) fn fail(self, search: &str, error: FetchError) -> Self {
        self.script.lock().unwrap().insert(search.to_string(), (Duration::ZERO, Err(error)));
        self
    }

    pub(crate) fn calls(&self) -> Vec<JobQuery> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl JobSource for ScriptedSource {
    fn search(&self, query: &JobQuery) -> Result<JobsPage, FetchError> {
        self.calls.lock().unwrap().push(query.clone());
        let key = query.search.clone().unwrap_or_default();
        let entry = self.script.lock().unwrap().remove(&key);
        match entry {
            Some((delay, result)) => {
                std::thread::sleep(delay);
                result
            }
            None => Err(FetchError::Malformed(format!("no scripted answer for '{}'", key))),
        }
    }
}

// --- Executor ---

/// How completions that arrive out of issue order are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Every completion is applied in arrival order, so an older response can
    /// overwrite a newer one.
    #[default]
    AsCompleted,
    /// Only the completion for the most recently issued request is applied.
    LatestOnly,
}

/// A fetch that has been issued and must be reported back via `complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub seq: u64,
    pub query: JobQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    Stale,
}

#[derive(Debug, Default)]
pub struct QueryExecutor {
    ordering: ResponseOrdering,
    loading: bool,
    results: Vec<Job>,
    latest_seq: u64,
    last_error: Option<String>,
}

impl QueryExecutor {
    pub fn new(ordering: ResponseOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn results(&self) -> &[Job] {
        &self.results
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Raise the loading flag and hand out the next request.
    pub fn begin(&mut self, filters: &FilterState, pager: &Paginator) -> PendingFetch {
        self.latest_seq += 1;
        self.loading = true;

        let query = JobQuery::from_state(filters, pager);
        debug!(seq = self.latest_seq, ?query, "issuing job search");
        PendingFetch {
            seq: self.latest_seq,
            query,
        }
    }

    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<JobsPage, FetchError>,
        pager: &mut Paginator,
    ) -> FetchOutcome {
        if seq < self.latest_seq {
            match self.ordering {
                ResponseOrdering::LatestOnly => {
                    debug!(seq, latest = self.latest_seq, "dropping stale response");
                    return FetchOutcome::Stale;
                }
                ResponseOrdering::AsCompleted => {
                    debug!(seq, latest = self.latest_seq, "applying out-of-order response");
                }
            }
        }

        self.loading = false;
        match result {
            Ok(page) => {
                info!(
                    seq,
                    page = page.pagination.page,
                    count = page.jobs.len(),
                    total = page.pagination.total_count,
                    "job search completed"
                );
                self.results = page.jobs;
                pager.update_from(&page.pagination);
                self.last_error = None;
                FetchOutcome::Applied
            }
            Err(e) => {
                warn!(seq, error = %e, "job search failed");
                self.last_error = Some(e.to_string());
                FetchOutcome::Failed
            }
        }
    }
}

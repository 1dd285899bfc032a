use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Job identifier as issued by the remote API. Kept opaque: the API may send
/// either numbers or strings, and saved ids are persisted in the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Number(i64),
    Text(String),
}

impl JobId {
    /// Parse user input, preferring the numeric form.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => JobId::Number(n),
            Err(_) => JobId::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobId::Number(n) => write!(f, "{}", n),
            JobId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Internship,
    Unknown(String),
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Freelance,
        JobType::Internship,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            JobType::FullTime => "FULL_TIME",
            JobType::PartTime => "PART_TIME",
            JobType::Contract => "CONTRACT",
            JobType::Freelance => "FREELANCE",
            JobType::Internship => "INTERNSHIP",
            JobType::Unknown(raw) => raw,
        }
    }
}

impl From<String> for JobType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "FULL_TIME" => JobType::FullTime,
            "PART_TIME" => JobType::PartTime,
            "CONTRACT" => JobType::Contract,
            "FREELANCE" => JobType::Freelance,
            "INTERNSHIP" => JobType::Internship,
            _ => JobType::Unknown(raw),
        }
    }
}

impl From<JobType> for String {
    fn from(job_type: JobType) -> Self {
        job_type.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub slug: String,
    pub title: String,
    pub company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_verified: bool,
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    pub posted_date: DateTime<Utc>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remote: bool,
    pub experience: Option<String>,
    pub applicants: Option<u32>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_applied: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urgent: bool,
}

/// The API sends `null` for missing columns as often as it omits them.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

/// Body of `GET /jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobsResponse {
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Job>,
    pub pagination: Option<Pagination>,
}

/// A successfully fetched page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct JobsPage {
    pub jobs: Vec<Job>,
    pub pagination: Pagination,
}

#[cfg(test)]
pub(crate) fn sample_job(id: &str) -> Job {
    Job {
        id: JobId::Text(id.to_string()),
        slug: format!("job-{}", id.to_lowercase()),
        title: format!("Engineer {}", id),
        company: "Acme".to_string(),
        company_verified: false,
        logo: None,
        location: "Jakarta".to_string(),
        posted_date: Utc::now(),
        salary: None,
        job_type: JobType::FullTime,
        remote: false,
        experience: None,
        applicants: None,
        description: None,
        requirements: None,
        benefits: None,
        has_applied: false,
        urgent: false,
    }
}

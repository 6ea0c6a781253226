//! Job request and job data types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::envelope::QueueMessage;

/// Longest accepted scheduling key.
const MAX_SCHEDULE_KEY_LEN: usize = 64;

/// Errors from parsing a storage locator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("expected <scheme>://<bucket>/<object>, got '{0}'")]
    Malformed(String),

    #[error("unsupported storage scheme '{0}'")]
    UnsupportedScheme(String),
}

/// Errors from validating a job request. Nothing is stored when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {field}: {source}")]
    Locator {
        field: &'static str,
        #[source]
        source: LocatorError,
    },

    #[error("start_date must not be empty")]
    EmptyScheduleKey,

    #[error("start_date is too long ({0} characters, max {max})", max = MAX_SCHEDULE_KEY_LEN)]
    ScheduleKeyTooLong(usize),
}

/// Opaque reference to an object in a bucket-based storage system.
///
/// Only the shape is checked here; whether the object exists is the
/// optimizer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocator {
    scheme: String,
    bucket: String,
    object: String,
}

impl StorageLocator {
    /// Parse `raw`, accepting only the given schemes (compared case-insensitively).
    pub fn parse(raw: &str, schemes: &[String]) -> Result<Self, LocatorError> {
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| LocatorError::Malformed(raw.to_string()))?;

        if scheme.is_empty() {
            return Err(LocatorError::Malformed(raw.to_string()));
        }

        let scheme = scheme.to_ascii_lowercase();
        if !schemes.iter().any(|s| s.eq_ignore_ascii_case(&scheme)) {
            return Err(LocatorError::UnsupportedScheme(scheme));
        }

        let (bucket, object) = rest
            .split_once('/')
            .ok_or_else(|| LocatorError::Malformed(raw.to_string()))?;

        if bucket.is_empty() || object.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(LocatorError::Malformed(raw.to_string()));
        }

        Ok(Self {
            scheme,
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object(&self) -> &str {
        &self.object
    }
}

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.object)
    }
}

/// A roster-optimization request as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRequest {
    /// Locator of the flights dataset.
    pub flights_gcs: String,
    /// Locator of the crew dataset.
    pub crew_gcs: String,
    /// Scheduling key, normally the roster start date (`YYYY-MM-DD`).
    pub start_date: String,
}

impl JobRequest {
    pub fn new(
        flights_gcs: impl Into<String>,
        crew_gcs: impl Into<String>,
        start_date: impl Into<String>,
    ) -> Self {
        Self {
            flights_gcs: flights_gcs.into(),
            crew_gcs: crew_gcs.into(),
            start_date: start_date.into(),
        }
    }
}

/// A validated, identified unit of work. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Unique identifier (UUID v4), never reused.
    pub id: String,
    pub flights: StorageLocator,
    pub crew: StorageLocator,
    pub start_date: String,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Validate a request and assign it a fresh identifier.
    pub fn from_request(request: &JobRequest, schemes: &[String]) -> Result<Self, ValidationError> {
        let flights = StorageLocator::parse(&request.flights_gcs, schemes).map_err(|source| {
            ValidationError::Locator {
                field: "flights_gcs",
                source,
            }
        })?;
        let crew = StorageLocator::parse(&request.crew_gcs, schemes).map_err(|source| {
            ValidationError::Locator {
                field: "crew_gcs",
                source,
            }
        })?;

        let start_date = request.start_date.trim();
        if start_date.is_empty() {
            return Err(ValidationError::EmptyScheduleKey);
        }
        let len = start_date.chars().count();
        if len > MAX_SCHEDULE_KEY_LEN {
            return Err(ValidationError::ScheduleKeyTooLong(len));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            flights,
            crew,
            start_date: start_date.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Build the queue envelope carried to workers.
    pub fn to_message(&self) -> QueueMessage {
        QueueMessage {
            job_id: self.id.clone(),
            flights_gcs: self.flights.to_string(),
            crew_gcs: self.crew.to_string(),
            start_date: self.start_date.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gs() -> Vec<String> {
        vec!["gs".to_string()]
    }

    #[test]
    fn test_parse_locator() {
        let locator = StorageLocator::parse("gs://aeroguard-inputs/flights/jan.csv", &gs()).unwrap();
        assert_eq!(locator.scheme(), "gs");
        assert_eq!(locator.bucket(), "aeroguard-inputs");
        assert_eq!(locator.object(), "flights/jan.csv");
        assert_eq!(locator.to_string(), "gs://aeroguard-inputs/flights/jan.csv");
    }

    #[test]
    fn test_parse_locator_scheme_case_insensitive() {
        let locator = StorageLocator::parse("GS://bucket/a.csv", &gs()).unwrap();
        assert_eq!(locator.to_string(), "gs://bucket/a.csv");
    }

    #[test]
    fn test_parse_locator_unsupported_scheme() {
        let err = StorageLocator::parse("s3://bucket/a.csv", &gs()).unwrap_err();
        assert_eq!(err, LocatorError::UnsupportedScheme("s3".to_string()));
    }

    #[test]
    fn test_parse_locator_malformed() {
        for raw in ["", "bucket/a.csv", "gs://", "gs://bucket", "gs://bucket/", "gs:///a.csv", "gs://b/a b.csv"] {
            assert!(
                matches!(StorageLocator::parse(raw, &gs()), Err(LocatorError::Malformed(_))),
                "expected malformed: {raw:?}"
            );
        }
    }

    #[test]
    fn test_job_from_request() {
        let request = JobRequest::new("gs://in/flights.csv", "gs://in/crew.csv", "2024-01-01");
        let job = Job::from_request(&request, &gs()).unwrap();

        assert!(uuid::Uuid::parse_str(&job.id).is_ok());
        assert_eq!(job.flights.to_string(), "gs://in/flights.csv");
        assert_eq!(job.crew.to_string(), "gs://in/crew.csv");
        assert_eq!(job.start_date, "2024-01-01");
    }

    #[test]
    fn test_job_ids_are_unique() {
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "2024-01-01");
        let a = Job::from_request(&request, &gs()).unwrap();
        let b = Job::from_request(&request, &gs()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_job_rejects_bad_crew_locator() {
        let request = JobRequest::new("gs://in/f.csv", "file:///tmp/crew.csv", "2024-01-01");
        let err = Job::from_request(&request, &gs()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Locator {
                field: "crew_gcs",
                source: LocatorError::UnsupportedScheme(_)
            }
        ));
    }

    #[test]
    fn test_job_rejects_empty_start_date() {
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "   ");
        assert_eq!(
            Job::from_request(&request, &gs()).unwrap_err(),
            ValidationError::EmptyScheduleKey
        );
    }

    #[test]
    fn test_job_rejects_long_start_date() {
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "x".repeat(65));
        assert_eq!(
            Job::from_request(&request, &gs()).unwrap_err(),
            ValidationError::ScheduleKeyTooLong(65)
        );
    }

    #[test]
    fn test_to_message() {
        let request = JobRequest::new("gs://in/f.csv", "gs://in/c.csv", "2024-01-01");
        let job = Job::from_request(&request, &gs()).unwrap();
        let message = job.to_message();

        assert_eq!(message.job_id, job.id);
        assert_eq!(message.flights_gcs, "gs://in/f.csv");
        assert_eq!(message.crew_gcs, "gs://in/c.csv");
        assert_eq!(message.start_date, "2024-01-01");
    }
}

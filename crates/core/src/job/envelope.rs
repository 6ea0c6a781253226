//! Wire format of jobs travelling through the broker.
//!
//! A [`QueueMessage`] is serialized as UTF-8 JSON. Push deliveries wrap those
//! bytes base64-encoded inside a [`PushRequest`].

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a delivered payload cannot be turned into a job.
///
/// None of these can succeed on redelivery, so the payload is acknowledged and dropped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("push request carries no message")]
    NoMessage,

    #[error("push message carries no data")]
    NoData,

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a valid job envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job envelope field '{0}' is empty")]
    EmptyField(&'static str),
}

impl DecodeError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::NoMessage => "no_message",
            DecodeError::NoData => "no_data",
            DecodeError::Base64(_) | DecodeError::Json(_) | DecodeError::EmptyField(_) => {
                "bad_data"
            }
        }
    }
}

/// Envelope published to the queue for each job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueMessage {
    pub job_id: String,
    pub flights_gcs: String,
    pub crew_gcs: String,
    pub start_date: String,
}

impl QueueMessage {
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode and check that every field is present and non-empty.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let message: QueueMessage = serde_json::from_slice(bytes)?;

        for (name, value) in [
            ("job_id", &message.job_id),
            ("flights_gcs", &message.flights_gcs),
            ("crew_gcs", &message.crew_gcs),
            ("start_date", &message.start_date),
        ] {
            if value.trim().is_empty() {
                return Err(DecodeError::EmptyField(name));
            }
        }

        Ok(message)
    }
}

/// Body of a broker push request (Pub/Sub push format).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushRequest {
    #[serde(default)]
    pub message: Option<PushMessage>,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// The message part of a push request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushMessage {
    /// Base64-encoded payload.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PushRequest {
    /// Wrap a raw payload the way the broker would push it.
    pub fn wrap(payload: &[u8], message_id: impl Into<String>) -> Self {
        Self {
            message: Some(PushMessage {
                data: Some(STANDARD.encode(payload)),
                message_id: Some(message_id.into()),
                attributes: HashMap::new(),
            }),
            subscription: None,
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.message_id.as_deref())
    }

    /// Extract the raw payload bytes.
    pub fn payload(&self) -> Result<Vec<u8>, DecodeError> {
        let message = self.message.as_ref().ok_or(DecodeError::NoMessage)?;
        let data = message
            .data
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or(DecodeError::NoData)?;
        Ok(STANDARD.decode(data)?)
    }
}

//! Inbound notifications of new raw data.
//!
//! A [`Message`] announces one file, an ordered dataset of files, or a
//! collection of files or datasets tagged with the region they cover. The
//! metadata mapping carries platform, sensors and time range.

mod source;
pub mod wire;

pub use source::{LineSource, MessageSource, SourceError};

use crate::template::{ParamValue, Params};
use chrono::NaiveDateTime;
use serde_json::Value;
use thiserror::Error;

/// Message decoding errors.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("not a bus message")]
    NotAMessage,

    #[error("message header lacks {0}")]
    MissingHeader(&'static str),

    #[error("unsupported payload type {0}")]
    UnsupportedMime(String),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("{kind} message lacks '{field}'")]
    MissingField { kind: String, field: &'static str },
}

/// Where the data of a message lives.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    File { uri: String },
    Dataset { uris: Vec<String> },
    Collection { area_id: String, uris: Vec<String> },
    /// Any other message type; ignored by the pipeline.
    Other(String),
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub sender: String,
    pub time: Option<NaiveDateTime>,
    pub body: MessageBody,
    /// The `data` mapping, timestamps decoded.
    pub metadata: Params,
}

impl Message {
    /// Build a message of type `kind` from its JSON `data` mapping.
    pub fn new(subject: impl Into<String>, kind: &str, data: &Value) -> Result<Self, MessageError> {
        let body = match kind {
            "file" => MessageBody::File {
                uri: data
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(kind, "uri"))?
                    .to_string(),
            },
            "dataset" => MessageBody::Dataset {
                uris: dataset_uris(data.get("dataset").ok_or_else(|| missing(kind, "dataset"))?),
            },
            "collection" => {
                let area_id = data
                    .get("collection_area_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(kind, "collection_area_id"))?
                    .to_string();
                let items = data
                    .get("collection")
                    .and_then(Value::as_array)
                    .ok_or_else(|| missing(kind, "collection"))?;
                let uris = items
                    .iter()
                    .flat_map(|item| match item.get("dataset") {
                        Some(dataset) => dataset_uris(dataset),
                        None => item
                            .get("uri")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .into_iter()
                            .collect(),
                    })
                    .collect();
                MessageBody::Collection { area_id, uris }
            }
            other => MessageBody::Other(other.to_string()),
        };

        Ok(Self {
            subject: subject.into(),
            sender: String::new(),
            time: None,
            body,
            metadata: Params::from_json(data),
        })
    }

    /// Decode a bus line (see [`wire`]).
    pub fn decode(line: &str) -> Result<Self, MessageError> {
        let envelope = wire::decode_line(line)?;
        let mut message = Self::new(envelope.subject, &envelope.kind, &envelope.data)?;
        message.sender = envelope.sender;
        message.time = envelope.time;
        Ok(message)
    }

    pub fn kind(&self) -> &str {
        match &self.body {
            MessageBody::File { .. } => "file",
            MessageBody::Dataset { .. } => "dataset",
            MessageBody::Collection { .. } => "collection",
            MessageBody::Other(kind) => kind,
        }
    }

    /// File, dataset or collection.
    pub fn carries_data(&self) -> bool {
        !matches!(self.body, MessageBody::Other(_))
    }

    /// Source locators, in message order.
    pub fn uris(&self) -> Vec<String> {
        match &self.body {
            MessageBody::File { uri } => vec![uri.clone()],
            MessageBody::Dataset { uris } | MessageBody::Collection { uris, .. } => uris.clone(),
            MessageBody::Other(_) => Vec::new(),
        }
    }

    pub fn collection_area_id(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Collection { area_id, .. } => Some(area_id),
            _ => None,
        }
    }

    pub fn platform_name(&self) -> Option<&str> {
        self.metadata.get_str("platform_name")
    }

    /// `sensor` as a list, whether sent as a string or a list.
    pub fn sensors(&self) -> Vec<String> {
        match self.metadata.get("sensor") {
            Some(ParamValue::List(items)) => items.iter().map(ToString::to_string).collect(),
            Some(ParamValue::Null) | None => Vec::new(),
            Some(value) => vec![value.to_string()],
        }
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.metadata.get_time("start_time")
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        self.metadata.get_time("end_time")
    }

    /// Start time, else nominal time, else end time.
    pub fn time_slot(&self) -> Option<NaiveDateTime> {
        self.start_time()
            .or_else(|| self.metadata.get_time("nominal_time"))
            .or_else(|| self.end_time())
    }

    /// Absent for geostationary platforms.
    pub fn orbit_number(&self) -> Option<i64> {
        self.metadata.get("orbit_number").and_then(ParamValue::as_i64)
    }

    pub fn orbit_type(&self) -> Option<&str> {
        self.metadata.get_str("orbit_type")
    }

    pub fn variant(&self) -> &str {
        self.metadata.get_str("variant").unwrap_or("")
    }
}

fn missing(kind: &str, field: &'static str) -> MessageError {
    MessageError::MissingField {
        kind: kind.to_string(),
        field,
    }
}

fn dataset_uris(dataset: &Value) -> Vec<String> {
    dataset
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("uri").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

//! Completion announcements for written files.
//!
//! Every file the writer places is announced on the bus with the artifact
//! metadata, its location and a coarse format classification taken from the
//! file extension.

use crate::artifact::Artifact;
use crate::config::ProducerSettings;
use crate::message::wire;
use crate::template::{compose, ParamValue, Params, TemplateError};
use chrono::{NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("cannot compose announcement subject: {0}")]
    Subject(#[from] TemplateError),

    #[error("announcement channel closed")]
    Closed,

    #[error("failed to publish announcement: {0}")]
    Io(#[from] std::io::Error),
}

/// A `file` message describing one written product.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub subject: String,
    pub kind: String,
    pub time: NaiveDateTime,
    pub data: Map<String, Value>,
}

/// Coarse classification of a written file.
struct FileClass {
    kind: String,
    format: &'static str,
    level: &'static str,
}

fn classify(path: &Path) -> FileClass {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let (kind, format, level) = if ext.starts_with("tif") {
        ("TIFF".to_string(), "GeoTIFF", "2")
    } else if ext.starts_with("png") {
        ("PNG".to_string(), "raster", "2")
    } else if ext.starts_with("jp") {
        ("JPEG".to_string(), "raster", "2")
    } else if ext.starts_with("nc") {
        ("NetCDF4".to_string(), "CF", "1b")
    } else if ext == "hdf" || ext == "h5" {
        ("HDF5".to_string(), "PPS", "3")
    } else {
        (ext, "raster", "2")
    };
    FileClass { kind, format, level }
}

impl Announcement {
    /// Describe `path`, written from `artifact` with batch parameters
    /// `params`.
    ///
    /// `uid` identifies the rendering: files linked from one encode share
    /// it.
    pub fn for_file(
        artifact: &dyn Artifact,
        path: &Path,
        uid: &str,
        params: &Params,
        publish_topic: Option<&str>,
    ) -> Result<Self, AnnounceError> {
        let mut data = artifact.metadata().to_json_map();
        data.remove("collection");
        data.remove("dataset");

        let nominal_time = artifact
            .time_slot()
            .or_else(|| params.get_time("time_slot"));
        data.insert(
            "nominal_time".to_string(),
            nominal_time.map_or(Value::Null, |t| ParamValue::Time(t).to_json()),
        );

        let area = match artifact.area() {
            Some(info) => serde_json::to_value(info).ok(),
            None => match params.get("area") {
                Some(value @ ParamValue::Map(_)) => Some(value.to_json()),
                _ => None,
            },
        };
        match area {
            Some(area) => {
                data.insert("area".to_string(), area);
            }
            None => {
                data.remove("area");
            }
        }

        let uri = Url::from_file_path(path)
            .map(String::from)
            .unwrap_or_else(|_| format!("file://{}", path.display()));
        data.insert("uri".to_string(), Value::String(uri));
        data.insert("uid".to_string(), Value::String(uid.to_string()));

        let class = classify(path);
        let product_name = match class.kind.as_str() {
            "NetCDF4" => Value::String("dump".to_string()),
            "HDF5" => Value::String("cloudproduct".to_string()),
            _ => data.get("product_name").cloned().unwrap_or(Value::Null),
        };
        data.insert("type".to_string(), Value::String(class.kind));
        data.insert("format".to_string(), Value::String(class.format.to_string()));
        data.insert(
            "data_processing_level".to_string(),
            Value::String(class.level.to_string()),
        );
        data.insert("product_name".to_string(), product_name);

        let subject = match publish_topic {
            None => format!("/{}/{}", class.format, class.level),
            Some(topic) => compose(topic, &flatten(&data))?,
        };

        Ok(Self {
            subject,
            kind: "file".to_string(),
            time: Utc::now().naive_utc(),
            data,
        })
    }

    pub fn uri(&self) -> Option<&str> {
        self.data.get("uri").and_then(Value::as_str)
    }

    pub fn uid(&self) -> Option<&str> {
        self.data.get("uid").and_then(Value::as_str)
    }

    /// Bus line form.
    pub fn encode(&self, sender: &str) -> String {
        wire::encode_line(
            &self.subject,
            &self.kind,
            sender,
            self.time,
            &Value::Object(self.data.clone()),
        )
    }
}

/// Top-level fields with nested mappings lifted one level.
fn flatten(data: &Map<String, Value>) -> Params {
    let mut flat = Params::new();
    for (key, value) in data {
        match value {
            Value::Object(inner) => {
                for (key2, value2) in inner {
                    flat.insert(key2.clone(), ParamValue::from_json(value2));
                }
            }
            other => flat.insert(key.clone(), ParamValue::from_json(other)),
        }
    }
    flat
}

/// Publishes announcements.
pub trait Announcer: Send {
    fn publish(&mut self, announcement: Announcement) -> Result<(), AnnounceError>;
}

/// Hands announcements to an in-process channel.
pub struct ChannelAnnouncer {
    sender: Sender<Announcement>,
}

impl ChannelAnnouncer {
    pub fn new(sender: Sender<Announcement>) -> Self {
        Self { sender }
    }
}

impl Announcer for ChannelAnnouncer {
    fn publish(&mut self, announcement: Announcement) -> Result<(), AnnounceError> {
        self.sender
            .send(announcement)
            .map_err(|_| AnnounceError::Closed)
    }
}

/// Writes announcements as bus lines, one per line.
///
/// For embedding: a deployment hands it the writer end of its bus link
/// (a pipe, a socket, a relay's stdin) and passes it to
/// [`Orchestrator::new`](crate::orchestrator::Orchestrator::new).
pub struct LineAnnouncer<W> {
    writer: W,
    sender: String,
}

impl<W: Write + Send> LineAnnouncer<W> {
    pub fn new(writer: W, sender: impl Into<String>) -> Self {
        Self {
            writer,
            sender: sender.into(),
        }
    }

    /// Announcer stamped with the configured sender name.
    pub fn from_settings(writer: W, settings: &ProducerSettings) -> Self {
        Self::new(writer, settings.sender.clone())
    }
}

impl<W: Write + Send> Announcer for LineAnnouncer<W> {
    fn publish(&mut self, announcement: Announcement) -> Result<(), AnnounceError> {
        writeln!(self.writer, "{}", announcement.encode(&self.sender))?;
        self.writer.flush()?;
        Ok(())
    }
}

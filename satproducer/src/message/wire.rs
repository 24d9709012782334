//! Line encoding of bus messages.
//!
//! ```text
//! pytroll://<subject> <type> <sender> <time> <version> <mime> [<data>]
//! ```
//!
//! Subjects start with `/`; the `pytroll:/` prefix plus the subject gives the
//! familiar `pytroll://...` form. Only JSON payloads are understood.

use super::MessageError;
use chrono::NaiveDateTime;

pub const MAGIC: &str = "pytroll:/";
pub const VERSION: &str = "v1.01";
pub const JSON_MIME: &str = "application/json";

const HEADER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// The header fields and decoded payload of one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub subject: String,
    pub kind: String,
    pub sender: String,
    pub time: Option<NaiveDateTime>,
    pub data: serde_json::Value,
}

pub fn decode_line(line: &str) -> Result<Envelope, MessageError> {
    let rest = line
        .trim_end_matches(['\r', '\n'])
        .strip_prefix(MAGIC)
        .ok_or(MessageError::NotAMessage)?;

    let mut fields = rest.splitn(7, ' ');
    let mut next = |name: &'static str| {
        fields
            .next()
            .filter(|f| !f.is_empty())
            .ok_or(MessageError::MissingHeader(name))
    };
    let subject = next("subject")?.to_string();
    let kind = next("type")?.to_string();
    let sender = next("sender")?.to_string();
    let time = next("time")?;
    let _version = next("version")?;
    let mime = fields.next();
    let payload = fields.next().unwrap_or("").trim();

    let data = match mime {
        None => serde_json::Value::Null,
        Some(_) if payload.is_empty() => serde_json::Value::Null,
        Some(JSON_MIME) => serde_json::from_str(payload)?,
        Some(other) => return Err(MessageError::UnsupportedMime(other.to_string())),
    };

    Ok(Envelope {
        subject,
        kind,
        sender,
        time: NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S%.f").ok(),
        data,
    })
}

pub fn encode_line(
    subject: &str,
    kind: &str,
    sender: &str,
    time: NaiveDateTime,
    data: &serde_json::Value,
) -> String {
    format!(
        "{}{} {} {} {} {} {} {}",
        MAGIC,
        subject,
        kind,
        sender,
        time.format(HEADER_TIME_FORMAT),
        VERSION,
        JSON_MIME,
        data
    )
}

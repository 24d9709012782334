//! INI parsing: the single place where key names map to settings fields.

use ini::{Ini, Properties};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::file::SettingsError;
use super::settings::ProducerSettings;
use crate::product::parse_bool;

/// Read `section` of `ini` over the defaults.
///
/// A relative `product_config_file` resolves against `base_dir`.
pub(super) fn parse_ini(
    ini: &Ini,
    section: &str,
    base_dir: Option<&Path>,
) -> Result<ProducerSettings, SettingsError> {
    let props = ini
        .section(Some(section))
        .ok_or_else(|| SettingsError::MissingSection(section.to_string()))?;
    let mut settings = ProducerSettings::default();

    settings.instruments = split_list(required(props, section, "instruments")?);
    if settings.instruments.is_empty() {
        return Err(invalid(section, "instruments", "", "must name at least one sensor"));
    }

    let path = PathBuf::from(required(props, section, "product_config_file")?.trim());
    settings.product_config_file = match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    };

    if let Some(v) = props.get("process_only_once") {
        settings.process_only_once = parse_bool(v);
    }
    if let Some(v) = props.get("publish_topic") {
        let v = v.trim();
        if !v.is_empty() {
            settings.publish_topic = Some(v.to_string());
        }
    }
    if let Some(v) = props.get("topics") {
        settings.topics = split_list(v);
    }
    if let Some(v) = props.get("retry_delay") {
        settings.retry_delay = Duration::from_secs(v.trim().parse().map_err(|_| {
            invalid(section, "retry_delay", v, "must be a whole number of seconds")
        })?);
    }
    if let Some(v) = props.get("receive_timeout") {
        let secs: u64 = v.trim().parse().map_err(|_| {
            invalid(section, "receive_timeout", v, "must be a whole number of seconds")
        })?;
        if secs == 0 {
            return Err(invalid(section, "receive_timeout", v, "must be positive"));
        }
        settings.receive_timeout = Duration::from_secs(secs);
    }
    if let Some(v) = props.get("writer_poll_interval") {
        let ms: u64 = v.trim().parse().map_err(|_| {
            invalid(section, "writer_poll_interval", v, "must be a whole number of milliseconds")
        })?;
        if ms == 0 {
            return Err(invalid(section, "writer_poll_interval", v, "must be positive"));
        }
        settings.writer_poll_interval = Duration::from_millis(ms);
    }
    if let Some(v) = props.get("queue_capacity") {
        let v = v.trim();
        if !v.is_empty() {
            let capacity: usize = v
                .parse()
                .map_err(|_| invalid(section, "queue_capacity", v, "must be a positive integer"))?;
            if capacity == 0 {
                return Err(invalid(section, "queue_capacity", v, "must be a positive integer"));
            }
            settings.queue_capacity = Some(capacity);
        }
    }
    if let Some(v) = props.get("sender") {
        let v = v.trim();
        if !v.is_empty() {
            settings.sender = v.to_string();
        }
    }

    Ok(settings)
}

fn required<'a>(props: &'a Properties, section: &str, key: &str) -> Result<&'a str, SettingsError> {
    props
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SettingsError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

//! Filename and topic template composition.
//!
//! Templates use `{key}` fields, optionally followed by a format:
//!
//! - times take strftime patterns: `{start_time:%Y%m%d_%H%M}`
//! - numbers take `[0][width][.precision][d|f]`: `{orbit_number:05d}`
//! - text takes `[<|>][width]`: `{areaname:>8}`
//!
//! `{{` and `}}` produce literal braces.

use super::params::{ParamValue, Params};
use regex::{Captures, Regex};
use std::fmt::Write;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while composing a template.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("template field '{0}' has no value")]
    MissingKey(String),

    #[error("invalid format '{format}' for field '{key}'")]
    BadFormat { key: String, format: String },
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)(?::([^{}]*))?\}")
            .expect("field pattern is a valid regex")
    })
}

/// Substitute every field of `template` from `params`.
pub fn compose(template: &str, params: &Params) -> Result<String, TemplateError> {
    let mut failure = None;
    let composed = field_pattern().replace_all(template, |caps: &Captures<'_>| {
        let whole = &caps[0];
        if whole == "{{" {
            return "{".to_string();
        }
        if whole == "}}" {
            return "}".to_string();
        }
        let key = &caps[1];
        let format = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        match params.get(key).filter(|v| !v.is_null()) {
            Some(value) => match format_value(value, format) {
                Some(text) => text,
                None => {
                    failure.get_or_insert(TemplateError::BadFormat {
                        key: key.to_string(),
                        format: format.to_string(),
                    });
                    String::new()
                }
            },
            None => {
                failure.get_or_insert(TemplateError::MissingKey(key.to_string()));
                String::new()
            }
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(composed.into_owned()),
    }
}

/// Names of the fields referenced by `template`, in order of appearance.
pub fn fields(template: &str) -> Vec<String> {
    field_pattern()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Parsed `[<|>][0][width][.precision][type]` specification.
#[derive(Debug, Default, PartialEq)]
struct FormatSpec {
    align: Option<char>,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

fn parse_spec(spec: &str) -> Option<FormatSpec> {
    let mut out = FormatSpec::default();
    let mut rest = spec;

    if let Some(c) = rest.chars().next().filter(|c| *c == '<' || *c == '>') {
        out.align = Some(c);
        rest = &rest[1..];
    }
    if rest.starts_with('0') {
        out.zero_pad = true;
        rest = &rest[1..];
    }
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        out.width = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
    }
    if let Some(after_dot) = rest.strip_prefix('.') {
        let digits = after_dot.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        out.precision = Some(after_dot[..digits].parse().ok()?);
        rest = &after_dot[digits..];
    }
    match rest {
        "" => {}
        "d" | "f" | "s" => out.kind = rest.chars().next(),
        _ => return None,
    }
    Some(out)
}

fn pad(text: String, spec: &FormatSpec, numeric: bool) -> String {
    if text.chars().count() >= spec.width {
        return text;
    }
    let fill = spec.width - text.chars().count();
    let right_align = match spec.align {
        Some('<') => false,
        Some(_) => true,
        None => numeric,
    };
    if spec.zero_pad && numeric && right_align {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(d) => ("-", d.to_string()),
            None => ("", text),
        };
        return format!("{}{}{}", sign, "0".repeat(fill), digits);
    }
    if right_align {
        format!("{}{}", " ".repeat(fill), text)
    } else {
        format!("{}{}", text, " ".repeat(fill))
    }
}

fn format_value(value: &ParamValue, format: &str) -> Option<String> {
    if format.is_empty() {
        return Some(value.to_string());
    }
    match value {
        ParamValue::Time(t) => {
            let mut out = String::new();
            write!(out, "{}", t.format(format)).ok()?;
            Some(out)
        }
        ParamValue::Int(i) => {
            let spec = parse_spec(format)?;
            let text = match (spec.kind, spec.precision) {
                (Some('f'), p) => format!("{:.*}", p.unwrap_or(6), *i as f64),
                (Some('s'), _) => return None,
                _ => i.to_string(),
            };
            Some(pad(text, &spec, true))
        }
        ParamValue::Float(x) => {
            let spec = parse_spec(format)?;
            let text = match (spec.kind, spec.precision) {
                (Some('d'), _) | (Some('s'), _) => return None,
                (Some('f'), p) => format!("{:.*}", p.unwrap_or(6), x),
                (None, Some(p)) => format!("{:.*}", p, x),
                (None, None) => x.to_string(),
                _ => return None,
            };
            Some(pad(text, &spec, true))
        }
        ParamValue::Text(s) => {
            let spec = parse_spec(format)?;
            if matches!(spec.kind, Some('d') | Some('f')) {
                // Numeric formats apply to numeric-looking text, as message
                // fields sometimes carry numbers as strings.
                let n: i64 = s.trim().parse().ok()?;
                return format_value(&ParamValue::Int(n), format);
            }
            let text = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.clone(),
            };
            Some(pad(text, &spec, false))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params() -> Params {
        let mut p = Params::new();
        p.insert("platform_name", "NOAA-19");
        p.insert(
            "start_time",
            NaiveDate::from_ymd_opt(2016, 3, 1)
                .unwrap()
                .and_hms_opt(12, 5, 0)
                .unwrap(),
        );
        p.insert("orbit_number", 4321i64);
        p.insert("areaname", "euron1");
        p.insert("coverage", 0.8125f64);
        p
    }

    #[test]
    fn test_compose_plain_fields() {
        let out = compose("{platform_name}_{areaname}.png", &params()).unwrap();
        assert_eq!(out, "NOAA-19_euron1.png");
    }

    #[test]
    fn test_compose_time_format() {
        let out = compose("{start_time:%Y%m%d_%H%M}_{areaname}.png", &params()).unwrap();
        assert_eq!(out, "20160301_1205_euron1.png");
    }

    #[test]
    fn test_compose_number_formats() {
        assert_eq!(compose("{orbit_number:07d}", &params()).unwrap(), "0004321");
        assert_eq!(compose("{coverage:.2f}", &params()).unwrap(), "0.81");
        assert_eq!(compose("{orbit_number:6}", &params()).unwrap(), "  4321");
    }

    #[test]
    fn test_compose_text_alignment() {
        assert_eq!(compose("[{areaname:8}]", &params()).unwrap(), "[euron1  ]");
        assert_eq!(compose("[{areaname:>8}]", &params()).unwrap(), "[  euron1]");
    }

    #[test]
    fn test_compose_escaped_braces() {
        assert_eq!(compose("{{literal}}", &params()).unwrap(), "{literal}");
    }

    #[test]
    fn test_compose_missing_key() {
        let err = compose("{nope}.png", &params()).unwrap_err();
        assert_eq!(err, TemplateError::MissingKey("nope".to_string()));
    }

    #[test]
    fn test_compose_bad_format() {
        let err = compose("{orbit_number:xyz}", &params()).unwrap_err();
        assert!(matches!(err, TemplateError::BadFormat { .. }));
    }

    #[test]
    fn test_fields_lists_keys() {
        assert_eq!(
            fields("/{format}/{data_processing_level}/{{x}}"),
            vec!["format".to_string(), "data_processing_level".to_string()]
        );
    }
}

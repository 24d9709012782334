//! Resolution of message locators to local files.

use super::ProcessError;
use std::path::PathBuf;
use tracing::debug;
use url::{Host, Url};

/// Local paths of `uris`, in order.
///
/// Plain paths and host-less `file://` URLs are taken as they are. A URL
/// naming another host is accepted only when its path also exists here.
pub fn resolve_sources(uris: &[String]) -> Result<Vec<PathBuf>, ProcessError> {
    uris.iter().map(|uri| resolve_source(uri)).collect()
}

pub fn resolve_source(uri: &str) -> Result<PathBuf, ProcessError> {
    let url = match Url::parse(uri) {
        // Single letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => url,
        _ => return Ok(PathBuf::from(uri)),
    };
    let path = url_path(&url).ok_or_else(|| ProcessError::UnreachableSource(uri.to_string()))?;

    match url.host() {
        None => Ok(path),
        Some(host) if is_local(&host) => Ok(path),
        Some(host) => {
            if path.exists() {
                debug!(%host, path = %path.display(), "Remote locator found on local filesystem");
                Ok(path)
            } else {
                Err(ProcessError::UnreachableSource(uri.to_string()))
            }
        }
    }
}

/// Percent-decoded path of any URL, ignoring its host.
fn url_path(url: &Url) -> Option<PathBuf> {
    let mut local = Url::parse("file:///").ok()?;
    local.set_path(url.path());
    local.to_file_path().ok()
}

fn is_local(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(name) => {
            name.eq_ignore_ascii_case("localhost")
                || local_hostname().is_some_and(|own| {
                    own.eq_ignore_ascii_case(name)
                        || own.split('.').next().is_some_and(|short| short.eq_ignore_ascii_case(name))
                })
        }
        Host::Ipv4(addr) => addr.is_loopback(),
        Host::Ipv6(addr) => addr.is_loopback(),
    }
}

#[cfg(unix)]
fn local_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for its full length and gethostname
    // writes at most that many bytes.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).ok().map(str::to_string)
}

#[cfg(not(unix))]
fn local_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_path() {
        assert_eq!(
            resolve_source("/data/hrpt.l1b").unwrap(),
            PathBuf::from("/data/hrpt.l1b")
        );
    }

    #[test]
    fn test_file_url_without_host() {
        assert_eq!(
            resolve_source("file:///data/with%20space.l1b").unwrap(),
            PathBuf::from("/data/with space.l1b")
        );
    }

    #[test]
    fn test_localhost_url() {
        assert_eq!(
            resolve_source("ssh://localhost/data/a").unwrap(),
            PathBuf::from("/data/a")
        );
        assert_eq!(
            resolve_source("ssh://127.0.0.1/data/a").unwrap(),
            PathBuf::from("/data/a")
        );
    }

    #[test]
    fn test_remote_url_missing_locally() {
        let result = resolve_source("ssh://elsewhere.invalid/no/such/file");
        assert!(matches!(result, Err(ProcessError::UnreachableSource(_))));
    }

    #[test]
    fn test_remote_url_present_locally() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("granule.h5");
        std::fs::write(&file, b"x").unwrap();
        let uri = format!("ssh://elsewhere.invalid{}", file.display());

        assert_eq!(resolve_source(&uri).unwrap(), file);
    }

    #[test]
    fn test_resolve_sources_fails_on_any() {
        let uris = vec!["/a".to_string(), "ssh://elsewhere.invalid/b".to_string()];
        assert!(resolve_sources(&uris).is_err());
    }
}

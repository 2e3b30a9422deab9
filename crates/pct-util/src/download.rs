//! HTTP downloads for catalog feeds and plugin artifacts.

use std::path::Path;
use std::time::Duration;

use crate::error::UtilError;

/// Upper bound for an in-memory text download (catalog feeds run to a few MB).
const MAX_TEXT_BYTES: u64 = 64 * 1024 * 1024;

fn agent() -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::config::Config::builder()
            .timeout_connect(Some(Duration::from_secs(30)))
            .timeout_global(Some(Duration::from_secs(600)))
            .build(),
    )
}

fn download_error(url: &str, message: impl ToString) -> UtilError {
    UtilError::Download {
        url: url.to_owned(),
        message: message.to_string(),
    }
}

/// Fetch a URL and return its body as text.
///
/// # Errors
/// Returns an error if the request fails or the body is not valid UTF-8.
pub fn fetch_string(url: &str) -> Result<String, UtilError> {
    let mut response = agent().get(url).call().map_err(|e| download_error(url, e))?;
    response
        .body_mut()
        .with_config()
        .limit(MAX_TEXT_BYTES)
        .read_to_string()
        .map_err(|e| download_error(url, e))
}

/// Download a URL to `dest`, returning the number of bytes written.
///
/// The body is streamed to a sibling temp file and renamed into place, so an
/// interrupted download never leaves a truncated artifact at `dest`.
///
/// # Errors
/// Returns an error if the HTTP request fails or the file cannot be written.
pub fn download_to_file(url: &str, dest: &Path) -> Result<u64, UtilError> {
    if let Some(parent) = dest.parent() {
        crate::fs::ensure_dir(parent)?;
    }

    let response = agent().get(url).call().map_err(|e| download_error(url, e))?;
    let mut body = response.into_body();

    let tmp_path = dest.with_extension(format!("{}.part", std::process::id()));
    let mut file = std::fs::File::create(&tmp_path).map_err(|source| UtilError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;

    let written = match std::io::copy(&mut body.as_reader(), &mut file) {
        Ok(n) => n,
        Err(e) => {
            drop(file);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(download_error(url, e));
        }
    };
    drop(file);

    std::fs::rename(&tmp_path, dest).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        UtilError::Io {
            path: dest.display().to_string(),
            source,
        }
    })?;

    log::debug!("downloaded {url} ({written} bytes) to {}", dest.display());
    Ok(written)
}

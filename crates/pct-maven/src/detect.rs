//! Build tool executable resolution.

use std::path::{Path, PathBuf};

use crate::error::MavenError;

/// Name of the build tool launcher on this platform, resolved through `PATH`.
pub fn default_executable() -> &'static str {
    if cfg!(windows) {
        "mvn.cmd"
    } else {
        "mvn"
    }
}

/// Pick the executable to launch.
///
/// An explicit path must exist and be executable. Without one, the platform
/// default name is returned as-is and resolved by the OS at spawn time.
///
/// # Errors
/// Returns `MavenError::NotFound` or `MavenError::NotExecutable` for a bad
/// explicit path.
pub fn resolve_executable(explicit: Option<&Path>) -> Result<PathBuf, MavenError> {
    let Some(path) = explicit else {
        return Ok(PathBuf::from(default_executable()));
    };
    if !path.is_file() {
        return Err(MavenError::NotFound {
            path: path.to_path_buf(),
        });
    }
    check_executable(path)?;
    Ok(path.to_path_buf())
}

fn check_executable(path: &Path) -> Result<(), MavenError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(|_| MavenError::NotExecutable {
            path: path.to_path_buf(),
        })?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(MavenError::NotExecutable {
                path: path.to_path_buf(),
            });
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

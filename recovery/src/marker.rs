use crate::errors::RecoveryError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What the previous instance of a service left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousRun {
    /// No marker: first start, or the last instance shut down cleanly
    Clean,
    /// Marker still present: the last instance died without releasing it
    Crashed { pid: Option<u32> },
}

impl PreviousRun {
    pub fn crashed(&self) -> bool {
        matches!(self, PreviousRun::Crashed { .. })
    }
}

/// `<dir>/<instance>.running`, holding the pid of the live instance.
///
/// Only an explicit [`CrashMarker::release`] removes the file, so a panic,
/// kill or abort leaves it for the next start to find.
#[derive(Debug)]
pub struct CrashMarker {
    path: PathBuf,
}

impl CrashMarker {
    pub fn path_for(dir: &Path, instance: &str) -> PathBuf {
        dir.join(format!("{}.running", instance))
    }

    /// Inspects the previous marker, then claims it for this process.
    pub fn acquire(dir: &Path, instance: &str) -> Result<(Self, PreviousRun), RecoveryError> {
        let path = Self::path_for(dir, instance);
        let marker_error = |source| RecoveryError::Marker {
            path: path.clone(),
            source,
        };

        let previous = match fs::read_to_string(&path) {
            Ok(content) => {
                let pid = content.trim().parse().ok();
                warn!(instance, previous_pid = ?pid, "Previous instance did not shut down cleanly");
                PreviousRun::Crashed { pid }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => PreviousRun::Clean,
            Err(e) => return Err(marker_error(e)),
        };

        fs::create_dir_all(dir).map_err(marker_error)?;
        fs::write(&path, std::process::id().to_string()).map_err(marker_error)?;

        Ok((Self { path }, previous))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks a clean shutdown.
    pub fn release(self) -> Result<(), RecoveryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Released crash marker {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RecoveryError::Marker {
                path: self.path,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_clean_start_then_release() {
        let dir = tempdir().unwrap();
        let (marker, previous) = CrashMarker::acquire(dir.path(), "worker-A").unwrap();
        assert_eq!(previous, PreviousRun::Clean);
        assert_eq!(
            fs::read_to_string(marker.path()).unwrap(),
            std::process::id().to_string()
        );

        marker.release().unwrap();
        let (_marker, previous) = CrashMarker::acquire(dir.path(), "worker-A").unwrap();
        assert!(!previous.crashed());
    }

    #[test]
    fn test_unreleased_marker_means_crash() {
        let dir = tempdir().unwrap();
        fs::write(CrashMarker::path_for(dir.path(), "daemon"), "31337").unwrap();

        let (_marker, previous) = CrashMarker::acquire(dir.path(), "daemon").unwrap();
        assert_eq!(previous, PreviousRun::Crashed { pid: Some(31337) });
    }

    #[test]
    fn test_dropped_marker_is_left_behind() {
        let dir = tempdir().unwrap();
        let (marker, _) = CrashMarker::acquire(dir.path(), "daemon").unwrap();
        drop(marker);

        let (_marker, previous) = CrashMarker::acquire(dir.path(), "daemon").unwrap();
        assert!(previous.crashed());
    }
}

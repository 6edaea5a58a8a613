use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long writers wait for each other before giving up
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Advisory lock held around a load-mutate-save of the task book.
///
/// Two `cad` processes completing the same task at once would otherwise both
/// read the old book and one completion would be lost. The lock file itself
/// is left in place; only the flock matters, and it is released when the
/// guard is dropped.
#[derive(Debug)]
pub struct BookLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another cad process is writing")]
    Timeout { path: PathBuf },
}

impl BookLock {
    /// Lock the data directory, waiting up to `timeout`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let lock_path = data_dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| LockError::CreateError {
                path: lock_path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        let mut waited = false;
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    if waited {
                        log::debug!("acquired {} after {:?}", lock_path.display(), start.elapsed());
                    }
                    return Ok(BookLock {
                        _file: file,
                        path: lock_path,
                    });
                }
                Err(e) if start.elapsed() < timeout => {
                    if !waited {
                        log::info!("waiting for {} ({})", lock_path.display(), e);
                        waited = true;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => {
                    return Err(LockError::Timeout { path: lock_path });
                }
            }
        }
    }

    pub fn acquire_default(data_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(data_dir, DEFAULT_TIMEOUT)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Try to take an exclusive flock on the file without blocking
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let tmp = TempDir::new().unwrap();

        let lock = BookLock::acquire_default(tmp.path()).unwrap();
        assert!(lock.path().ends_with(".lock"));
        drop(lock);

        assert!(BookLock::acquire_default(tmp.path()).is_ok());
        assert!(tmp.path().join(".lock").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_contention_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = BookLock::acquire_default(tmp.path()).unwrap();

        let second = BookLock::acquire(tmp.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }

    #[test]
    fn test_missing_dir_is_create_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            BookLock::acquire_default(&missing),
            Err(LockError::CreateError { .. })
        ));
    }
}

//! Deferred deletion of stubborn temporary files.
//!
//! Deleting a spooled temp file can fail while another process (a viewer, an
//! indexer, a virus scanner) still holds it open. Those failures must not
//! surface to the parsing caller, so buffers hand the path to a
//! [`TempFileSweeper`], which retries deletion a bounded number of times and
//! then gives up with a warning. The sweeper is an ordinary owned value with
//! an explicit lifecycle; create one per application or per association and
//! share it by cloning.

use std::{
    path::PathBuf,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
        Weak,
    },
    thread::JoinHandle,
    time::Duration,
};

use parking_lot::Mutex;

/// Retry attempts per file before giving up.
const MAX_ATTEMPTS: u32 = 10;

/// Pause between background sweep passes.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    attempts: u32,
}

#[derive(Debug, Default)]
struct Inner {
    queue: Mutex<Vec<Entry>>,
    stopped: AtomicBool,
}

/// Bounded-retry deleter for temp files whose first deletion failed.
///
/// Cloning yields another handle to the same queue. Without
/// [`start`](Self::start), files are only retried on explicit
/// [`sweep`](Self::sweep) calls and once more when the last handle is
/// dropped.
#[derive(Clone, Debug, Default)]
pub struct TempFileSweeper {
    inner: Arc<Inner>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TempFileSweeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `path` for deletion retries.
    ///
    /// Files that no longer exist are not queued.
    pub fn enqueue(&self, path: PathBuf) {
        if !path.exists() {
            return;
        }
        tracing::debug!(path = %path.display(), "queueing temp file for deferred deletion");
        self.inner.queue.lock().push(Entry { path, attempts: 0 });
    }

    /// Number of files still awaiting deletion.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Runs one deletion pass and returns how many files were removed.
    ///
    /// Entries that exceed their retry budget are dropped with a warning,
    /// never escalated.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Starts the background retry thread. Calling twice is a no-op.
    pub fn start(&self) {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return;
        }
        self.inner.stopped.store(false, Ordering::Relaxed);
        let inner = Arc::downgrade(&self.inner);
        *thread = Some(std::thread::spawn(move || background_loop(inner)));
    }

    /// Stops the background thread, leaving queued entries for later sweeps.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

fn background_loop(inner: Weak<Inner>) {
    loop {
        std::thread::sleep(SWEEP_INTERVAL);
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if inner.stopped.load(Ordering::Relaxed) {
            return;
        }
        inner.sweep();
    }
}

impl Inner {
    fn sweep(&self) -> usize {
        let mut queue = self.queue.lock();
        let mut removed = 0;
        queue.retain_mut(|entry| {
            match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    removed += 1;
                    false
                }
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    removed += 1;
                    false
                }
                Err(error) => {
                    entry.attempts += 1;
                    if entry.attempts >= MAX_ATTEMPTS {
                        tracing::warn!(
                            path = %entry.path.display(),
                            %error,
                            "giving up on temp file after {MAX_ATTEMPTS} deletion attempts"
                        );
                        false
                    }
                    else {
                        true
                    }
                }
            }
        });
        removed
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // last chance; failures are ignored
        for entry in self.queue.get_mut().drain(..) {
            let _ = std::fs::remove_file(&entry.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn temp_file(content: &[u8]) -> PathBuf {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        // keep the file on disk, the sweeper owns deletion now
        file.into_temp_path().keep().unwrap()
    }

    #[test]
    fn sweep_deletes_queued_files() {
        let sweeper = TempFileSweeper::new();
        let path = temp_file(b"doomed");
        sweeper.enqueue(path.clone());
        assert_eq!(sweeper.pending(), 1);

        assert_eq!(sweeper.sweep(), 1);
        assert_eq!(sweeper.pending(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn missing_files_are_not_queued() {
        let sweeper = TempFileSweeper::new();
        sweeper.enqueue(PathBuf::from("/nonexistent/gone"));
        assert_eq!(sweeper.pending(), 0);
    }

    #[test]
    fn drop_makes_a_final_attempt() {
        let path = temp_file(b"doomed");
        {
            let sweeper = TempFileSweeper::new();
            sweeper.enqueue(path.clone());
        }
        assert!(!path.exists());
    }

    #[test]
    fn undeletable_entries_are_retried_then_dropped() {
        let sweeper = TempFileSweeper::new();
        // remove_file refuses a directory on every platform, so this entry
        // fails deterministically on each attempt
        let dir = tempfile::tempdir().unwrap();
        sweeper.enqueue(dir.path().to_path_buf());

        for _ in 0..MAX_ATTEMPTS - 1 {
            assert_eq!(sweeper.sweep(), 0);
            assert_eq!(sweeper.pending(), 1);
        }
        // the final attempt exhausts the retry budget and gives up
        assert_eq!(sweeper.sweep(), 0);
        assert_eq!(sweeper.pending(), 0);
        assert!(dir.path().exists());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let sweeper = TempFileSweeper::new();
        sweeper.start();
        sweeper.start();
        sweeper.stop();
        sweeper.stop();
    }
}

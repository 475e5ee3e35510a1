//! Process-wide serialization of restores per database target

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

static RESTORE_LOCKS: Lazy<DashMap<PathBuf, Arc<Mutex<()>>>> = Lazy::new(DashMap::new);

/// Run `f` while holding the restore lock for `target`.
///
/// Restores against the same target never overlap; restores against
/// different targets run independently. Previews and backups do not take
/// this lock.
pub fn with_restore_lock<T>(target: &Path, f: impl FnOnce() -> T) -> T {
    let lock = RESTORE_LOCKS
        .entry(target.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();

    // A panicked restore leaves nothing behind that the next one depends on
    let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
    tracing::debug!(database = %target.display(), "Restore lock acquired");
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_target_is_serialized() {
        let target = PathBuf::from("/tmp/strongbox-lock-test-same.db");
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let target = target.clone();
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    with_restore_lock(&target, || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lock_survives_panic() {
        let target = PathBuf::from("/tmp/strongbox-lock-test-panic.db");
        let result = thread::spawn({
            let target = target.clone();
            move || with_restore_lock::<()>(&target, || panic!("restore failed"))
        })
        .join();
        assert!(result.is_err());

        assert_eq!(with_restore_lock(&target, || 7), 7);
    }
}

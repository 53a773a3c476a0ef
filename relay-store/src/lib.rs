//! Token-keyed ephemeral ciphertext store.
//!
//! Entries live for a bounded TTL, are served at most until they expire or
//! are explicitly consumed, and are destroyed through a best-effort
//! multi-pass secure wipe rather than a plain `HashMap` removal. A
//! background sweeper drains a deletion queue and scans for newly expired
//! entries on a fixed interval; it is cancellation-aware so shutdown never
//! leaves queued deletions unprocessed.

mod config;
mod error;
mod wipe;

pub use config::StoreConfig;
pub use error::StoreError;

use relay_core::now_epoch_secs;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Readable,
    ScheduledForDeletion,
}

struct Entry {
    ciphertext: Vec<u8>,
    expire_at: u64,
    created_at: u64,
    read: bool,
    access_count: u64,
    forensic_id: String,
    state: EntryState,
}

/// A snapshot returned by [`EphemeralStore::get`].
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub ciphertext: Vec<u8>,
    pub expire_at: u64,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct ForensicStatus {
    pub entry_count: usize,
    pub deletion_queue_size: usize,
    pub pass_count: u32,
    pub protections_enabled: bool,
}

struct PendingDeletion {
    forensic_id: String,
    buffer: Vec<u8>,
}

struct Inner {
    map: HashMap<String, Entry>,
    queue: Vec<PendingDeletion>,
}

/// The ephemeral store. All operations are serialized by a single mutex
/// guarding both the keyed map and the deletion queue, matching the
/// single-reentrant-lock discipline the source and the specification both
/// require: `get` and `ttl_remaining` never observe a partial `put`.
pub struct EphemeralStore {
    config: StoreConfig,
    inner: Mutex<Inner>,
}

impl EphemeralStore {
    pub fn new(config: StoreConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                queue: Vec::new(),
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding this lock would indicate a bug in this
        // module, not a recoverable runtime condition.
        #[allow(clippy::unwrap_used)]
        self.inner.lock().unwrap()
    }

    /// Records `ciphertext` under `token`, expiring `ttl_seconds` from
    /// now. Any prior entry for the same token is enqueued for secure
    /// deletion rather than silently dropped.
    pub fn put(
        &self,
        token: &str,
        ciphertext: Vec<u8>,
        ttl_seconds: i64,
    ) -> Result<(), StoreError> {
        if ttl_seconds <= 0 {
            return Err(StoreError::NonPositiveTtl(ttl_seconds));
        }
        let now = now_epoch_secs();
        let entry = Entry {
            ciphertext,
            expire_at: now + ttl_seconds as u64,
            created_at: now,
            read: false,
            access_count: 0,
            forensic_id: wipe::forensic_id(token, now),
            state: EntryState::Readable,
        };

        let mut guard = self.lock();
        if let Some(prev) = guard.map.insert(token.to_string(), entry) {
            enqueue_locked(&mut guard, prev);
        }
        Ok(())
    }

    /// Returns the entry for `token` if present and unexpired, else
    /// `None`. An expired entry is enqueued for deletion and reported as
    /// absent; access increments `access_count` before the snapshot is
    /// taken.
    pub fn get(&self, token: &str) -> Option<Retrieved> {
        let now = now_epoch_secs();
        let mut guard = self.lock();

        let expired = matches!(guard.map.get(token), Some(e) if e.expire_at <= now);
        if expired {
            if let Some(entry) = guard.map.remove(token) {
                enqueue_locked(&mut guard, entry);
            }
            return None;
        }

        let entry = guard.map.get_mut(token)?;
        entry.access_count += 1;
        Some(Retrieved {
            ciphertext: entry.ciphertext.clone(),
            expire_at: entry.expire_at,
            read: entry.read,
        })
    }

    /// Enqueues secure deletion of `token`'s entry. Returns `true` if an
    /// entry existed.
    pub fn mark_read_and_delete(&self, token: &str) -> bool {
        let mut guard = self.lock();
        match guard.map.remove(token) {
            Some(mut entry) => {
                entry.read = true;
                entry.state = EntryState::ScheduledForDeletion;
                enqueue_locked(&mut guard, entry);
                true
            }
            None => false,
        }
    }

    /// Seconds remaining before `token`'s entry expires, or `None` if
    /// absent or already expired.
    pub fn ttl_remaining(&self, token: &str) -> Option<u64> {
        let now = now_epoch_secs();
        let guard = self.lock();
        let entry = guard.map.get(token)?;
        if entry.expire_at <= now {
            None
        } else {
            Some(entry.expire_at - now)
        }
    }

    /// Force-queues every still-live entry, expired or not, then drains
    /// the deletion queue, returning the total number of entries
    /// securely deleted. Distinct from the periodic sweep, which only
    /// queues entries whose TTL has already elapsed.
    pub fn force_secure_cleanup(&self) -> usize {
        let mut guard = self.lock();

        let all_tokens: Vec<String> = guard.map.keys().cloned().collect();
        for token in all_tokens {
            if let Some(entry) = guard.map.remove(&token) {
                enqueue_locked(&mut guard, entry);
            }
        }

        drain_queue_locked(guard, self.config.secure_delete_passes)
    }

    /// Drains whatever is already queued, without force-queueing any
    /// still-live entry. Used on sweeper shutdown, where the contract is
    /// "finish what's queued", not "wipe everything".
    fn drain_queue(&self) -> usize {
        let guard = self.lock();
        drain_queue_locked(guard, self.config.secure_delete_passes)
    }

    pub fn forensic_status(&self) -> ForensicStatus {
        let guard = self.lock();
        ForensicStatus {
            entry_count: guard.map.len(),
            deletion_queue_size: guard.queue.len(),
            pass_count: self.config.secure_delete_passes,
            protections_enabled: true,
        }
    }

    /// One sweep: drain the queue (wiping outside the lock), then scan
    /// for expired entries and enqueue them. Intended to be called from a
    /// periodic background task; exposed directly so tests and callers
    /// needing deterministic control can drive it without a timer. Unlike
    /// `force_secure_cleanup`, entries that haven't expired yet are left
    /// alone.
    pub fn sweep_once(&self) -> usize {
        let now = now_epoch_secs();
        let mut guard = self.lock();

        let expired_tokens: Vec<String> = guard
            .map
            .iter()
            .filter(|(_, e)| e.expire_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for token in expired_tokens {
            if let Some(entry) = guard.map.remove(&token) {
                enqueue_locked(&mut guard, entry);
            }
        }

        drain_queue_locked(guard, self.config.secure_delete_passes)
    }

    /// Spawns the background sweeper on the current Tokio runtime. The
    /// returned task completes once `shutdown` is cancelled, draining the
    /// queue one final time before returning so no deletion is left
    /// pending across a clean shutdown.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let interval = std::time::Duration::from_secs(store.config.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        store.sweep_once();
                    }
                    _ = shutdown.cancelled() => {
                        store.drain_queue();
                        tracing::info!("ephemeral store sweeper shut down cleanly");
                        break;
                    }
                }
            }
        })
    }
}

fn enqueue_locked(guard: &mut Inner, mut entry: Entry) {
    entry.state = EntryState::ScheduledForDeletion;
    guard.queue.push(PendingDeletion {
        forensic_id: entry.forensic_id.clone(),
        buffer: std::mem::take(&mut entry.ciphertext),
    });
}

/// Takes whatever is queued under `guard`, releases the lock, then wipes
/// each pending buffer. Returns the number of entries wiped.
fn drain_queue_locked(mut guard: std::sync::MutexGuard<'_, Inner>, passes: u32) -> usize {
    let pending = std::mem::take(&mut guard.queue);
    drop(guard);

    let count = pending.len();
    for mut item in pending {
        wipe::secure_wipe(&mut item.buffer, passes);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_within_ttl() {
        let store = EphemeralStore::new(StoreConfig::default());
        store.put("t1", b"hello".to_vec(), 10).expect("put");
        let got = store.get("t1").expect("present");
        assert_eq!(got.ciphertext, b"hello");
        assert!(got.expire_at > 0);
    }

    #[test]
    fn zero_or_negative_ttl_rejected() {
        let store = EphemeralStore::new(StoreConfig::default());
        assert!(store.put("t1", b"x".to_vec(), 0).is_err());
        assert!(store.put("t1", b"x".to_vec(), -1).is_err());
    }

    #[test]
    fn mark_read_and_delete_removes_entry() {
        let store = EphemeralStore::new(StoreConfig::default());
        store.put("t1", b"hello".to_vec(), 10).expect("put");
        assert!(store.mark_read_and_delete("t1"));
        assert!(store.get("t1").is_none());
        assert!(!store.mark_read_and_delete("t1"));
    }

    #[test]
    fn overwrite_enqueues_previous_ciphertext() {
        let store = EphemeralStore::new(StoreConfig::default());
        store.put("t1", b"first".to_vec(), 10).expect("put");
        store.put("t1", b"second".to_vec(), 10).expect("put");
        let status = store.forensic_status();
        assert_eq!(status.deletion_queue_size, 1);
        let got = store.get("t1").expect("present");
        assert_eq!(got.ciphertext, b"second");
    }

    #[test]
    fn force_secure_cleanup_wipes_live_and_queued_entries() {
        let store = EphemeralStore::new(StoreConfig::default());
        store.put("t1", b"first".to_vec(), 10).expect("put");
        store.put("t1", b"second".to_vec(), 10).expect("put");
        store.put("t2", b"unrelated".to_vec(), 10).expect("put");
        // t1's overwritten "first" is already queued; t1's live "second"
        // and t2 are both still unexpired and must be force-wiped too.
        let deleted = store.force_secure_cleanup();
        assert_eq!(deleted, 3);
        assert_eq!(store.forensic_status().deletion_queue_size, 0);
        assert_eq!(store.forensic_status().entry_count, 0);
        assert!(store.get("t1").is_none());
        assert!(store.get("t2").is_none());
    }

    #[test]
    fn sweep_once_leaves_unexpired_entries_alone() {
        let store = EphemeralStore::new(StoreConfig::default());
        store.put("t1", b"hello".to_vec(), 10).expect("put");
        assert_eq!(store.sweep_once(), 0);
        assert!(store.get("t1").is_some());
    }

    #[test]
    fn ttl_remaining_reports_and_absent_after_expiry() {
        let store = EphemeralStore::new(StoreConfig::default());
        store.put("t1", b"hello".to_vec(), 1).expect("put");
        assert!(store.ttl_remaining("t1").is_some());
        std::thread::sleep(std::time::Duration::from_secs(2));
        assert!(store.ttl_remaining("t1").is_none());
        assert!(store.get("t1").is_none());
    }

    #[tokio::test]
    async fn sweeper_drains_queue_on_shutdown() {
        let store = EphemeralStore::new(StoreConfig {
            cleanup_interval_secs: 60,
            secure_delete_passes: 3,
        });
        store.put("t1", b"hello".to_vec(), 10).expect("put");
        store.mark_read_and_delete("t1");
        assert_eq!(store.forensic_status().deletion_queue_size, 1);

        let shutdown = CancellationToken::new();
        let handle = store.spawn_sweeper(shutdown.clone());
        shutdown.cancel();
        handle.await.expect("sweeper task");
        assert_eq!(store.forensic_status().deletion_queue_size, 0);
    }
}

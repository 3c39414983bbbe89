use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use futures_util::lock::Mutex as AsyncMutex;
use tracing::trace;

use operator_types::ItemMeta;

type KeyLock = Arc<AsyncMutex<()>>;

/// Serializes work on the same key, different keys run concurrently.
/// Entries are dropped once no task holds or waits on them.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<ItemMeta, KeyLock>>,
}

impl KeyLocks {
    pub(crate) async fn run<F, T>(&self, key: &ItemMeta, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let entry = self.acquire(key);
        let _guard = entry.lock.lock().await;
        trace!(%key, "holding key lock");
        work.await
    }

    fn acquire<'a>(&'a self, key: &'a ItemMeta) -> KeyEntry<'a> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(key.clone()).or_default().clone();
        KeyEntry {
            locks: self,
            key,
            lock,
        }
    }

    fn release(&self, key: &ItemMeta, lock: &KeyLock) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // map and `lock` are the only holders
        if Arc::strong_count(lock) == 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// interest of one task in a key, released on drop so abandoned waiters are cleaned up too
struct KeyEntry<'a> {
    locks: &'a KeyLocks,
    key: &'a ItemMeta,
    lock: KeyLock,
}

impl Drop for KeyEntry<'_> {
    fn drop(&mut self) {
        self.locks.release(self.key, &self.lock);
    }
}

#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use fluvio_future::test_async;
    use fluvio_future::timer::sleep;
    use futures_util::future::{join, pending};
    use futures_util::FutureExt;

    use operator_types::ItemMeta;

    use super::KeyLocks;

    #[test_async]
    async fn test_same_key_serialized() -> Result<(), ()> {
        let locks = KeyLocks::default();
        let key = ItemMeta::new("demo", "default");
        let active = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let work = || {
            let active = active.clone();
            let overlap = overlap.clone();
            async move {
                if active.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlap.fetch_add(1, Ordering::SeqCst);
                }
                sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        };

        join(locks.run(&key, work()), locks.run(&key, work())).await;
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert_eq!(locks.len(), 0);
        Ok(())
    }

    #[test_async]
    async fn test_different_keys_concurrent() -> Result<(), ()> {
        let locks = KeyLocks::default();
        let first = ItemMeta::new("one", "default");
        let second = ItemMeta::new("two", "default");
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let work = || {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        };

        join(locks.run(&first, work()), locks.run(&second, work())).await;
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(locks.len(), 0);
        Ok(())
    }

    #[test]
    fn test_dropped_holder_releases_key() {
        let locks = KeyLocks::default();
        let key = ItemMeta::new("demo", "default");

        assert!(locks.run(&key, pending::<()>()).now_or_never().is_none());
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_dropped_waiter_releases_key() {
        let locks = KeyLocks::default();
        let key = ItemMeta::new("demo", "default");

        let mut holder = Box::pin(locks.run(&key, pending::<()>()));
        assert!((&mut holder).now_or_never().is_none());

        assert!(locks.run(&key, async {}).now_or_never().is_none());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert_eq!(locks.len(), 0);
        assert_eq!(locks.run(&key, async { 7 }).now_or_never(), Some(7));
        assert_eq!(locks.len(), 0);
    }
}

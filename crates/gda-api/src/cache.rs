use std::sync::{Arc, Mutex};

use crate::error::{ApiError, ApiResult};

/// A lazily filled, never invalidated value.
///
/// The slot's mutex is held across the fetch, so concurrent callers on one
/// slot trigger at most one fetch; a failed fetch leaves the slot empty.
#[derive(Debug)]
pub struct CacheSlot<T> {
    value: Mutex<Option<Arc<T>>>,
}

impl<T> CacheSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// The cached value, if any, without fetching.
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.lock().ok().and_then(|slot| slot.clone())
    }

    pub fn is_filled(&self) -> bool {
        self.get().is_some()
    }

    /// Return the cached value, running `fetch` first if the slot is empty.
    pub fn get_or_try_fetch<F>(&self, fetch: F) -> ApiResult<Arc<T>>
    where
        F: FnOnce() -> ApiResult<T>,
    {
        let mut slot = self
            .value
            .lock()
            .map_err(|e| ApiError::Internal(format!("cache lock poisoned: {e}")))?;
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(fetch()?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }
}

impl<T> Default for CacheSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fetches_once() {
        let slot = CacheSlot::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = slot
                .get_or_try_fetch(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_fetch_leaves_slot_empty() {
        let slot: CacheSlot<u32> = CacheSlot::new();
        assert!(slot
            .get_or_try_fetch(|| Err(ApiError::NotFound("x".into())))
            .is_err());
        assert!(!slot.is_filled());
        assert_eq!(*slot.get_or_try_fetch(|| Ok(7)).unwrap(), 7);
        assert!(slot.is_filled());
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        use std::thread;

        let slot = Arc::new(CacheSlot::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    let v = slot
                        .get_or_try_fetch(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(String::from("payload"))
                        })
                        .unwrap();
                    assert_eq!(v.as_str(), "payload");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

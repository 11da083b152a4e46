//! Registry of names currently being resolved by the download pipeline

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of names with a resolution in progress
///
/// Every mutation is a single insert or remove under the lock; the lock is
/// never held across an await.
#[derive(Debug, Default)]
pub struct InFlight {
    names: Mutex<HashSet<String>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Mark `name` as resolving, or return `None` if it already is
    ///
    /// The returned guard removes the entry when dropped, so the mark is
    /// cleared on success, failure and cancellation alike.
    pub fn try_begin(&self, name: &str) -> Option<InFlightGuard<'_>> {
        if self.lock().insert(name.to_string()) {
            Some(InFlightGuard {
                registry: self,
                name: name.to_string(),
            })
        } else {
            None
        }
    }
}

/// Holds a name in the [`InFlight`] set for as long as it lives
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    registry: &'a InFlight,
    name: String,
}

impl InFlightGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_and_release() {
        let registry = InFlight::new();
        {
            let guard = registry.try_begin("movie").unwrap();
            assert_eq!(guard.name(), "movie");
            assert!(registry.contains("movie"));
            assert_eq!(registry.len(), 1);
        }
        assert!(!registry.contains("movie"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_second_begin_is_rejected() {
        let registry = InFlight::new();
        let _guard = registry.try_begin("movie").unwrap();
        assert!(registry.try_begin("movie").is_none());
        assert!(registry.try_begin("other").is_some());
        // "other" guard dropped immediately
        assert_eq!(registry.len(), 1);
    }
}

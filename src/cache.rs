//! Caching of rendered output.
use serde_json::{Map, Value};
use std::{
    collections::{hash_map::DefaultHasher, HashMap, VecDeque},
    hash::{Hash, Hasher},
    sync::Mutex,
    time::{Duration, Instant},
};

/// The number of entries a [`Cache`] holds by default.
pub const DEFAULT_CAPACITY: usize = 1000;

/// The time an entry stays valid by default.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A bounded store of rendered output keyed by fingerprint.
///
/// Entries expire after a time to live, and when the cache is full
/// the oldest entry is evicted first. The interior [`Mutex`] keeps
/// the cache usable from an engine shared across threads.
pub struct Cache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

struct Inner {
    entries: HashMap<u64, Entry>,
    order: VecDeque<u64>,
}

struct Entry {
    text: String,
    at: Instant,
}

impl Cache {
    /// Create a new Cache with the default capacity and time to live.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }

    /// Set the capacity.
    ///
    /// Returns the Cache, so additional methods may be chained.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Set the time to live.
    ///
    /// Returns the Cache, so additional methods may be chained.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Fingerprint a render by template source and data.
    ///
    /// The data keeps insertion order, so equal data always produces
    /// an equal fingerprint.
    pub fn fingerprint(source: &str, data: &Map<String, Value>) -> u64 {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        Value::Object(data.clone()).to_string().hash(&mut hasher);

        hasher.finish()
    }

    /// Return the cached text for the key, unless it expired.
    pub fn get(&self, key: u64) -> Option<String> {
        let mut inner = self.inner.lock().expect("cache lock should not be poisoned");
        match inner.entries.get(&key) {
            Some(entry) if entry.at.elapsed() < self.ttl => Some(entry.text.clone()),
            Some(_) => {
                inner.entries.remove(&key);
                inner.order.retain(|held| *held != key);
                None
            }
            None => None,
        }
    }

    /// Store text under the key, evicting the oldest entries when the
    /// cache is full.
    pub fn put(&self, key: u64, text: String) {
        let mut inner = self.inner.lock().expect("cache lock should not be poisoned");
        let entry = Entry {
            text,
            at: Instant::now(),
        };
        if inner.entries.insert(key, entry).is_some() {
            return;
        }

        inner.order.push_back(key);
        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => inner.entries.remove(&oldest),
                None => break,
            };
        }
    }

    /// Drop the entry for the key, if any.
    pub fn invalidate(&self, key: u64) {
        let mut inner = self.inner.lock().expect("cache lock should not be poisoned");
        inner.entries.remove(&key);
        inner.order.retain(|held| *held != key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock should not be poisoned");
        inner.entries.clear();
        inner.order.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("cache lock should not be poisoned")
            .entries
            .len()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;
    use serde_json::Map;
    use std::time::Duration;

    #[test]
    fn test_hit_and_miss() {
        let cache = Cache::new();
        cache.put(1, "rendered".into());

        assert_eq!(cache.get(1), Some("rendered".into()));
        assert_eq!(cache.get(2), None);
    }

    #[test]
    fn test_expiry() {
        let cache = Cache::new().with_ttl(Duration::ZERO);
        cache.put(1, "rendered".into());

        assert_eq!(cache.get(1), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let cache = Cache::new().with_capacity(2);
        cache.put(1, "one".into());
        cache.put(2, "two".into());
        cache.put(3, "three".into());

        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some("two".into()));
        assert_eq!(cache.get(3), Some("three".into()));
    }

    #[test]
    fn test_fingerprint_tracks_source_and_data() {
        let mut data = Map::new();
        data.insert("a".into(), 1.into());
        let key = Cache::fingerprint("{{ a }}", &data);

        assert_eq!(Cache::fingerprint("{{ a }}", &data), key);
        assert_ne!(Cache::fingerprint("{{ b }}", &data), key);

        data.insert("a".into(), 2.into());
        assert_ne!(Cache::fingerprint("{{ a }}", &data), key);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = Cache::new();
        cache.put(1, "one".into());
        cache.put(2, "two".into());
        cache.invalidate(1);
        assert_eq!(cache.get(1), None);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}

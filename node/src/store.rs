use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory key/value store owned exclusively by the node that holds it.
/// Values are opaque byte strings; presence, not truthiness, decides a hit
/// (an explicitly stored empty value is still `Found`).
pub struct KvStore {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl KvStore {
    pub fn new() -> Self {
        KvStore {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: String, value: Bytes) {
        self.entries.write().await.insert(key, value);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Snapshot for the `/node` endpoint, lossily decoded as UTF-8 text —
    /// the plain-text representation values are stored and served as.
    pub async fn snapshot_lossy(&self) -> HashMap<String, String> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect()
    }
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = KvStore::new();
        store.put("k".into(), Bytes::from_static(b"v")).await;
        assert_eq!(store.get("k").await, Some(Bytes::from_static(b"v")));
    }

    #[tokio::test]
    async fn empty_value_is_still_found() {
        let store = KvStore::new();
        store.put("k".into(), Bytes::new()).await;
        assert_eq!(store.get("k").await, Some(Bytes::new()));
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = KvStore::new();
        assert_eq!(store.get("nope").await, None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = KvStore::new();
        store.put("k".into(), Bytes::from_static(b"v1")).await;
        store.put("k".into(), Bytes::from_static(b"v2")).await;
        assert_eq!(store.get("k").await, Some(Bytes::from_static(b"v2")));
    }
}

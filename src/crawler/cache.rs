use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// URL → response body cache
///
/// There is no eviction and no invalidation: an entry lives as long as the
/// cache does. The harvester builds one cache per category walk and drops it
/// when the walk ends.
#[derive(Debug, Clone, Default)]
pub struct FetchCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Option<String> {
        self.entries.read().await.get(url).cloned()
    }

    pub async fn insert(&self, url: &str, body: String) {
        self.entries.write().await.insert(url.to_string(), body);
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.entries.read().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

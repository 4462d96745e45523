use doc_model::CategorySet;
use overlay_engine::RenderOutput;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Everything besides the document that determines a render's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub page_index: usize,
    pub zoom_percent: u16,
    pub filters: CategorySet,
    pub show_labels: bool,
}

/// Least-recently-used store of finished renders for one document.
#[derive(Debug, Clone)]
pub struct RenderCache {
    capacity: usize,
    entries: HashMap<RenderKey, Arc<RenderOutput>>,
    recency: VecDeque<RenderKey>,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: HashMap::new(), recency: VecDeque::new() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &RenderKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Shared handle to a cached render, marking it most recently used.
    pub fn get(&mut self, key: &RenderKey) -> Option<Arc<RenderOutput>> {
        let output = self.entries.get(key).cloned()?;
        self.promote(key);
        Some(output)
    }

    pub fn insert(&mut self, key: RenderKey, output: Arc<RenderOutput>) {
        if self.entries.insert(key, output).is_some() {
            self.promote(&key);
            return;
        }

        self.recency.push_back(key);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn promote(&mut self, key: &RenderKey) {
        if let Some(position) = self.recency.iter().position(|existing| existing == key) {
            if let Some(found) = self.recency.remove(position) {
                self.recency.push_back(found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::Diagnostics;
    use overlay_engine::{HitIndex, RgbaImage};

    fn key(page_index: usize) -> RenderKey {
        RenderKey { page_index, zoom_percent: 100, filters: CategorySet::all(), show_labels: true }
    }

    fn output() -> Arc<RenderOutput> {
        Arc::new(RenderOutput {
            image: RgbaImage::new(1, 1),
            hits: HitIndex::default(),
            diagnostics: Diagnostics::new(),
            rotated: false,
        })
    }

    #[test]
    fn evicts_least_recently_used_render() {
        let mut cache = RenderCache::new(2);
        cache.insert(key(0), output());
        cache.insert(key(1), output());
        cache.insert(key(2), output());

        assert!(!cache.contains(&key(0)));
        assert!(cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
    }

    #[test]
    fn lookup_refreshes_entry() {
        let mut cache = RenderCache::new(2);
        cache.insert(key(0), output());
        cache.insert(key(1), output());

        assert!(cache.get(&key(0)).is_some());
        cache.insert(key(2), output());

        assert!(cache.contains(&key(0)));
        assert!(!cache.contains(&key(1)));
    }

    #[test]
    fn filters_and_labels_are_part_of_the_key() {
        let mut cache = RenderCache::new(4);
        cache.insert(key(0), output());

        let unlabeled = RenderKey { show_labels: false, ..key(0) };
        let filtered = RenderKey { filters: CategorySet::empty(), ..key(0) };
        assert!(cache.get(&unlabeled).is_none());
        assert!(cache.get(&filtered).is_none());
        assert_eq!(cache.len(), 1);
    }
}

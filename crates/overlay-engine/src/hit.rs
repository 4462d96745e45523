use doc_model::{AnnotationItem, Category};
use geometry::{PixelPoint, PixelRect};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitEntry {
    pub rect: PixelRect,
    /// Untruncated item; the tooltip holds the display form.
    pub item: Arc<AnnotationItem>,
    pub tooltip: String,
    pub label: String,
}

/// Pixel regions of one render, in draw order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct HitIndex {
    entries: Vec<HitEntry>,
}

impl HitIndex {
    pub(crate) fn push(&mut self, entry: HitEntry) {
        self.entries.push(entry);
    }

    /// Top-most entry containing `point`. Entries drawn later win.
    pub fn hit_test(&self, point: PixelPoint) -> Option<&HitEntry> {
        self.entries.iter().rev().find(|entry| entry.rect.contains(point))
    }

    pub fn entries(&self) -> &[HitEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &HitEntry> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, category: Category) -> usize {
        self.entries.iter().filter(|entry| entry.item.category == category).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{ItemExtra, ItemId};

    fn entry(seq: u32, category: Category, rect: PixelRect) -> HitEntry {
        HitEntry {
            rect,
            item: Arc::new(AnnotationItem {
                id: ItemId { page: 0, seq },
                category,
                geometry: Vec::new(),
                content: String::new(),
                confidence: 1.0,
                extra: ItemExtra::None,
            }),
            tooltip: String::new(),
            label: String::new(),
        }
    }

    #[test]
    fn later_entries_win_overlap() {
        let mut index = HitIndex::default();
        index.push(entry(0, Category::Paragraph, PixelRect::new(0.0, 0.0, 100.0, 100.0)));
        index.push(entry(1, Category::Entity, PixelRect::new(40.0, 40.0, 60.0, 60.0)));

        let hit = index.hit_test(PixelPoint::new(50.0, 50.0)).expect("overlap should hit");
        assert_eq!(hit.item.category, Category::Entity);

        let hit = index.hit_test(PixelPoint::new(10.0, 10.0)).expect("paragraph should hit");
        assert_eq!(hit.item.category, Category::Paragraph);

        assert!(index.hit_test(PixelPoint::new(100.0, 50.0)).is_none());
        assert_eq!(index.count(Category::Entity), 1);
    }
}

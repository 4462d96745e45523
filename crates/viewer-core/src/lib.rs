//! View state for paging, zooming and filtering one analyzed document.
//!
//! The session owns no pixels of its own: page rasters come from a
//! [`PageSource`], overlays from [`overlay_engine::render`], and finished
//! renders are shared out of a [`RenderCache`].

mod cache;

pub use cache::{RenderCache, RenderKey};

use doc_model::{Category, CategorySet, Document};
use geometry::PixelPoint;
use overlay_engine::{HitEntry, RenderError, RenderOutput, RenderSpec, RgbaImage};
use std::sync::Arc;

pub const MIN_ZOOM_PERCENT: u16 = 10;
pub const MAX_ZOOM_PERCENT: u16 = 1600;
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to rasterize page {page}")]
    Source {
        page: usize,
        #[source]
        source: SourceError,
    },
}

/// Supplies the raster of a page at a zoom factor (1.0 is the nominal size).
pub trait PageSource {
    fn rasterize(&self, page_index: usize, zoom: f64) -> Result<RgbaImage, SourceError>;
}

pub fn clamp_zoom_percent(percent: u16) -> u16 {
    percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT)
}

/// Neighbouring pages worth rendering ahead, nearest first.
pub fn prefetch_page_indices(current: usize, page_count: usize, radius: usize) -> Vec<usize> {
    let mut pages = Vec::new();

    for offset in 1..=radius {
        if let Some(lower) = current.checked_sub(offset) {
            if lower < page_count {
                pages.push(lower);
            }
        }

        let upper = current.saturating_add(offset);
        if upper < page_count {
            pages.push(upper);
        }
    }

    pages
}

#[derive(Debug)]
pub struct ViewerSession {
    document: Arc<Document>,
    page: usize,
    zoom_percent: u16,
    filters: CategorySet,
    show_labels: bool,
    cache: RenderCache,
    last: Option<Arc<RenderOutput>>,
}

impl ViewerSession {
    pub fn new(document: Arc<Document>) -> Self {
        Self::with_cache_capacity(document, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(document: Arc<Document>, capacity: usize) -> Self {
        Self {
            document,
            page: 0,
            zoom_percent: 100,
            filters: CategorySet::all(),
            show_labels: true,
            cache: RenderCache::new(capacity),
            last: None,
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    pub fn zoom_percent(&self) -> u16 {
        self.zoom_percent
    }

    pub fn filters(&self) -> CategorySet {
        self.filters
    }

    pub fn show_labels(&self) -> bool {
        self.show_labels
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        let before = self.page;
        self.set_page(self.page.saturating_add(1));
        self.page != before
    }

    /// Returns whether the page changed.
    pub fn previous_page(&mut self) -> bool {
        let before = self.page;
        self.set_page(self.page.saturating_sub(1));
        self.page != before
    }

    /// Moves to `index`, clamped to the last page. Returns the page shown.
    pub fn set_page(&mut self, index: usize) -> usize {
        let index = index.min(self.page_count().saturating_sub(1));
        if index != self.page {
            self.page = index;
            self.last = None;
        }
        self.page
    }

    pub fn set_zoom_percent(&mut self, percent: u16) -> u16 {
        let percent = clamp_zoom_percent(percent);
        if percent != self.zoom_percent {
            self.zoom_percent = percent;
            self.last = None;
        }
        self.zoom_percent
    }

    /// Flips one category in the filter set. Returns whether it is now shown.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        let mut filters = self.filters;
        if filters.contains(category) {
            filters.remove(category);
        } else {
            filters.insert(category);
        }
        self.set_filters(filters);
        self.filters.contains(category)
    }

    pub fn set_filters(&mut self, filters: CategorySet) {
        if filters != self.filters {
            self.filters = filters;
            self.last = None;
        }
    }

    pub fn set_show_labels(&mut self, show_labels: bool) {
        if show_labels != self.show_labels {
            self.show_labels = show_labels;
            self.last = None;
        }
    }

    pub fn zoom(&self) -> f64 {
        f64::from(self.zoom_percent) / 100.0
    }

    pub fn render_spec(&self) -> RenderSpec {
        RenderSpec { filters: self.filters, zoom: self.zoom(), show_labels: self.show_labels }
    }

    fn key_for(&self, page_index: usize) -> RenderKey {
        RenderKey {
            page_index,
            zoom_percent: self.zoom_percent,
            filters: self.filters,
            show_labels: self.show_labels,
        }
    }

    /// Renders the current view, reusing a cached output when one exists.
    pub fn render(&mut self, source: &dyn PageSource) -> Result<Arc<RenderOutput>, ViewerError> {
        let output = self.render_page(self.page, source)?;
        self.last = Some(Arc::clone(&output));
        Ok(output)
    }

    /// Renders `page_index` with the current zoom and filters into the
    /// cache without changing the page shown.
    pub fn render_page(
        &mut self,
        page_index: usize,
        source: &dyn PageSource,
    ) -> Result<Arc<RenderOutput>, ViewerError> {
        let key = self.key_for(page_index);
        if let Some(output) = self.cache.get(&key) {
            tracing::debug!(page = page_index, zoom = self.zoom_percent, "render cache hit");
            return Ok(output);
        }

        if page_index >= self.page_count() {
            return Err(RenderError::PageIndexOutOfRange {
                page: page_index,
                page_count: self.page_count(),
            }
            .into());
        }

        let image = source
            .rasterize(page_index, self.zoom())
            .map_err(|error| ViewerError::Source { page: page_index, source: error })?;
        let spec = self.render_spec();
        let output = Arc::new(overlay_engine::render(&self.document, page_index, &spec, &image)?);
        self.cache.insert(key, Arc::clone(&output));

        Ok(output)
    }

    /// Renders up to `radius` pages on each side of the current one. Pages
    /// that fail are logged and left out of the cache.
    pub fn prefetch(&mut self, source: &dyn PageSource, radius: usize) -> usize {
        let mut rendered = 0;
        for page_index in prefetch_page_indices(self.page, self.page_count(), radius) {
            match self.render_page(page_index, source) {
                Ok(_) => rendered += 1,
                Err(error) => tracing::warn!(page = page_index, "prefetch failed: {error}"),
            }
        }
        rendered
    }

    /// Output of the last [`ViewerSession::render`] for the current view.
    pub fn last_output(&self) -> Option<&Arc<RenderOutput>> {
        self.last.as_ref()
    }

    /// Top-most item under a pointer position on the last render.
    pub fn hover(&self, x: f64, y: f64) -> Option<&HitEntry> {
        self.last.as_ref()?.hits.hit_test(PixelPoint::new(x, y))
    }
}

//! Viewport registry for all rendered pages, and the cache of projected
//! field rectangles.

use crate::error::{MapError, MapResult};
use crate::field::{Field, FieldId};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};
use std::collections::{BTreeMap, HashMap};

/// Viewports supplied by the rendering surface, one per rendered page.
///
/// `revision` changes whenever any mapping may have changed, so caches of
/// screen positions can tell when they are stale.
#[derive(Debug, Clone)]
pub struct Viewports {
    pages: BTreeMap<u32, Viewport>,
    scale: f64,
    revision: u64,
}

impl Default for Viewports {
    fn default() -> Self {
        Self {
            pages: BTreeMap::new(),
            scale: 1.0,
            revision: 0,
        }
    }
}

impl Viewports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current zoom scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record the viewport a render pass produced for a page.
    pub fn set(&mut self, viewport: Viewport) {
        if self.pages.get(&viewport.page) == Some(&viewport) {
            return;
        }
        self.pages.insert(viewport.page, viewport);
        self.revision += 1;
    }

    /// Forget a page, e.g. when it scrolls out and is unrendered.
    pub fn remove(&mut self, page: u32) -> Option<Viewport> {
        let removed = self.pages.remove(&page);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Forget every page.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.revision += 1;
    }

    /// Change the zoom scale of every page.
    ///
    /// Pages are assumed to be stacked top to bottom in page order. Each
    /// page is moved down by the growth of the pages above it, so canvases
    /// never overlap; hosts with another layout re-set the viewports after
    /// zooming.
    pub fn set_scale(&mut self, scale: f64) {
        let mut changed = (scale - self.scale).abs() >= f64::EPSILON;
        let mut shift = 0.0;
        for viewport in self.pages.values_mut() {
            if (viewport.scale - scale).abs() < f64::EPSILON && shift == 0.0 {
                continue;
            }
            let rescaled = viewport.rescaled(scale);
            let growth = rescaled.css_size.height - viewport.css_size.height;
            *viewport = rescaled;
            viewport.css_origin.y += shift;
            shift += growth;
            changed = true;
        }
        self.scale = scale;
        if changed {
            self.revision += 1;
            log::debug!("zoom scale set to {scale}, revision {}", self.revision);
        }
    }

    pub fn get(&self, page: u32) -> MapResult<&Viewport> {
        self.pages.get(&page).ok_or(MapError::Unavailable { page })
    }

    pub fn pages(&self) -> impl Iterator<Item = &Viewport> {
        self.pages.values()
    }

    /// The page whose canvas is under a screen point.
    pub fn page_at(&self, screen: Point) -> Option<u32> {
        self.pages
            .values()
            .find(|vp| vp.contains_screen_point(screen))
            .map(|vp| vp.page)
    }

    pub fn to_document_point(&self, page: u32, screen: Point) -> MapResult<Point> {
        self.get(page)?.to_document_point(screen)
    }

    pub fn to_screen_point(&self, page: u32, document: Point) -> MapResult<Point> {
        self.get(page)?.to_screen_point(document)
    }

    pub fn screen_delta_to_document_delta(&self, page: u32, delta: Vec2) -> MapResult<Vec2> {
        self.get(page)?.screen_delta_to_document_delta(delta)
    }

    pub fn to_screen_rect(&self, page: u32, document: Rect) -> MapResult<Rect> {
        self.get(page)?.to_screen_rect(document)
    }
}

#[derive(Debug, Clone, Copy)]
struct Projection {
    document: Rect,
    screen: Rect,
}

/// Memoized screen rectangles of fields.
///
/// Entries are keyed by field and remember the document rect they were
/// computed from. The whole cache is dropped when the viewport revision
/// moves, which is how zoom changes reach every field at once.
#[derive(Debug, Clone, Default)]
pub struct ProjectionCache {
    revision: u64,
    entries: HashMap<FieldId, Projection>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen rectangle of a field, computing it if needed.
    pub fn screen_rect(&mut self, viewports: &Viewports, field: &Field) -> MapResult<Rect> {
        if viewports.revision() != self.revision {
            self.entries.clear();
            self.revision = viewports.revision();
        }
        let document = field.rect();
        if let Some(entry) = self.entries.get(&field.id) {
            if entry.document == document {
                return Ok(entry.screen);
            }
        }
        let screen = viewports.to_screen_rect(field.page, document)?;
        self.entries.insert(field.id, Projection { document, screen });
        Ok(screen)
    }

    pub fn forget(&mut self, id: FieldId) {
        self.entries.remove(&id);
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    fn two_pages() -> Viewports {
        let mut viewports = Viewports::new();
        viewports.set(Viewport::new(1, Size::new(600.0, 800.0), 1.0, 1.0));
        let second = Viewport::new(2, Size::new(600.0, 800.0), 1.0, 1.0);
        viewports.set(second.with_css_origin(Point::new(0.0, 810.0)));
        viewports
    }

    #[test]
    fn test_missing_page_is_unavailable() {
        let viewports = two_pages();
        assert_eq!(
            viewports.to_document_point(3, Point::ZERO),
            Err(MapError::Unavailable { page: 3 })
        );
    }

    #[test]
    fn test_page_at() {
        let viewports = two_pages();
        assert_eq!(viewports.page_at(Point::new(10.0, 10.0)), Some(1));
        assert_eq!(viewports.page_at(Point::new(10.0, 900.0)), Some(2));
        assert_eq!(viewports.page_at(Point::new(10.0, 805.0)), None);
    }

    #[test]
    fn test_set_scale_rescales_all_pages() {
        let mut viewports = two_pages();
        let before = viewports.revision();
        viewports.set_scale(2.0);
        assert!(viewports.revision() > before);
        for vp in viewports.pages() {
            assert!((vp.scale - 2.0).abs() < f64::EPSILON);
            assert!((vp.width - 1200.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_set_scale_reaches_pages_rendered_at_another_scale() {
        let mut viewports = Viewports::new();
        viewports.set(Viewport::new(1, Size::new(600.0, 800.0), 2.0, 1.0));
        assert!((viewports.scale() - 1.0).abs() < f64::EPSILON);

        viewports.set_scale(1.0);
        let page = viewports.get(1).unwrap();
        assert!((page.scale - 1.0).abs() < f64::EPSILON);
        assert!((page.height - 800.0).abs() < 1e-10);
        let delta = viewports.screen_delta_to_document_delta(1, Vec2::new(10.0, 0.0)).unwrap();
        assert!((delta.x - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_set_scale_keeps_pages_apart() {
        let mut viewports = two_pages();
        viewports.set_scale(2.0);

        let second = viewports.get(2).unwrap();
        assert!((second.css_origin.y - 1610.0).abs() < 1e-10);
        assert_eq!(viewports.page_at(Point::new(10.0, 1605.0)), None);
        assert_eq!(viewports.page_at(Point::new(10.0, 1620.0)), Some(2));

        viewports.set_scale(1.0);
        assert!((viewports.get(2).unwrap().css_origin.y - 810.0).abs() < 1e-10);
    }

    #[test]
    fn test_same_scale_keeps_revision() {
        let mut viewports = two_pages();
        let before = viewports.revision();
        viewports.set_scale(1.0);
        assert_eq!(viewports.revision(), before);
    }

    #[test]
    fn test_identical_viewport_keeps_revision() {
        let mut viewports = two_pages();
        let before = viewports.revision();
        viewports.set(Viewport::new(1, Size::new(600.0, 800.0), 1.0, 1.0));
        assert_eq!(viewports.revision(), before);
    }

    #[test]
    fn test_cache_invalidated_by_zoom() {
        let mut viewports = two_pages();
        let mut cache = ProjectionCache::new();
        let field = Field::new("text", 1, Rect::new(10.0, 10.0, 60.0, 30.0));

        let at_one = cache.screen_rect(&viewports, &field).unwrap();
        assert!((at_one.width() - 50.0).abs() < 1e-10);
        assert_eq!(cache.len(), 1);

        viewports.set_scale(2.0);
        let at_two = cache.screen_rect(&viewports, &field).unwrap();
        assert!((at_two.width() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_cache_follows_field_geometry() {
        let viewports = two_pages();
        let mut cache = ProjectionCache::new();
        let mut field = Field::new("text", 1, Rect::new(10.0, 10.0, 60.0, 30.0));
        cache.screen_rect(&viewports, &field).unwrap();

        field.x = 100.0;
        let moved = cache.screen_rect(&viewports, &field).unwrap();
        assert!((moved.x0 - 100.0).abs() < 1e-10);
    }
}

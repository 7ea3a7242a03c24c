//! Per-page viewport and the document/screen coordinate mapping.
//!
//! A page is rendered into a canvas whose backing buffer holds
//! `viewport size × device_pixel_ratio` device pixels and which is laid out
//! on screen at `css_size`. Mapping a document point to the screen
//! therefore goes document units → viewport units (× scale) → buffer pixels
//! (× dpr) → CSS pixels (× css/buffer) → screen (+ css_origin).
//!
//! Document coordinates follow the page's native [`Origin`]. For bottom-left
//! pages the y axis is flipped against the unscaled page height before any
//! of the above.

use crate::error::{MapError, MapResult};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Origin convention of the rendering surface's native page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    #[default]
    TopLeft,
    /// PDF-style: y grows upward from the bottom edge.
    BottomLeft,
}

/// Render-pass state for one page. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// 1-based page index.
    pub page: u32,
    /// Width in viewport units (unscaled page width × scale).
    pub width: f64,
    /// Height in viewport units (unscaled page height × scale).
    pub height: f64,
    /// Active zoom scale.
    pub scale: f64,
    pub device_pixel_ratio: f64,
    /// Size of the canvas backing buffer in device pixels.
    pub buffer_size: Size,
    /// Laid-out size of the canvas element in CSS pixels.
    pub css_size: Size,
    /// Screen position of the canvas element's top-left corner.
    pub css_origin: Point,
    /// Origin convention of the page's document coordinates.
    pub origin: Origin,
}

impl Viewport {
    /// Build the viewport a surface would produce for an unscaled page size.
    ///
    /// The backing buffer is `dpr` times the viewport and the canvas is laid
    /// out at the viewport size; use the `with_*` builders when the surface
    /// reports something else.
    pub fn new(page: u32, page_size: Size, scale: f64, device_pixel_ratio: f64) -> Self {
        let width = page_size.width * scale;
        let height = page_size.height * scale;
        Self {
            page,
            width,
            height,
            scale,
            device_pixel_ratio,
            buffer_size: Size::new(width * device_pixel_ratio, height * device_pixel_ratio),
            css_size: Size::new(width, height),
            css_origin: Point::ZERO,
            origin: Origin::TopLeft,
        }
    }

    pub fn with_css_origin(mut self, css_origin: Point) -> Self {
        self.css_origin = css_origin;
        self
    }

    pub fn with_css_size(mut self, css_size: Size) -> Self {
        self.css_size = css_size;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: Size) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Unscaled page size in document units.
    pub fn page_size(&self) -> Size {
        Size::new(self.width / self.scale, self.height / self.scale)
    }

    /// The same page at another zoom scale.
    ///
    /// Viewport, buffer and CSS sizes all follow the scale; the screen
    /// position of the canvas is kept.
    pub fn rescaled(&self, scale: f64) -> Self {
        let ratio = scale / self.scale;
        Self {
            width: self.width * ratio,
            height: self.height * ratio,
            scale,
            buffer_size: self.buffer_size * ratio,
            css_size: self.css_size * ratio,
            ..*self
        }
    }

    fn validate(&self) -> MapResult<()> {
        let values = [
            self.width,
            self.height,
            self.scale,
            self.device_pixel_ratio,
            self.buffer_size.width,
            self.buffer_size.height,
            self.css_size.width,
            self.css_size.height,
        ];
        if values.iter().all(|v| v.is_finite() && *v > 0.0)
            && self.css_origin.x.is_finite()
            && self.css_origin.y.is_finite()
        {
            Ok(())
        } else {
            Err(MapError::Degenerate { page: self.page })
        }
    }

    /// Screen pixels per document unit along each axis.
    fn pixels_per_unit(&self) -> MapResult<Vec2> {
        self.validate()?;
        let device = self.scale * self.device_pixel_ratio;
        Ok(Vec2::new(
            device * self.css_size.width / self.buffer_size.width,
            device * self.css_size.height / self.buffer_size.height,
        ))
    }

    /// Maps native page coordinates to top-left page coordinates.
    ///
    /// The flip uses the unscaled page height, so it does not depend on zoom.
    /// It is its own inverse.
    fn native_flip(&self) -> Affine {
        match self.origin {
            Origin::TopLeft => Affine::IDENTITY,
            Origin::BottomLeft => Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, self.height / self.scale]),
        }
    }

    /// Document → screen transform.
    pub fn transform(&self) -> MapResult<Affine> {
        let ppu = self.pixels_per_unit()?;
        Ok(Affine::translate(self.css_origin.to_vec2())
            * Affine::scale_non_uniform(ppu.x, ppu.y)
            * self.native_flip())
    }

    /// Screen → document transform.
    pub fn inverse_transform(&self) -> MapResult<Affine> {
        let ppu = self.pixels_per_unit()?;
        Ok(self.native_flip()
            * Affine::scale_non_uniform(1.0 / ppu.x, 1.0 / ppu.y)
            * Affine::translate(-self.css_origin.to_vec2()))
    }

    /// Convert a screen point to document coordinates.
    pub fn to_document_point(&self, screen: Point) -> MapResult<Point> {
        Ok(self.inverse_transform()? * screen)
    }

    /// Convert a document point to screen coordinates.
    pub fn to_screen_point(&self, document: Point) -> MapResult<Point> {
        Ok(self.transform()? * document)
    }

    /// Convert a pixel displacement into a document displacement.
    ///
    /// Linear in the input and inversely proportional to `scale`. On
    /// bottom-left pages a downward pixel delta is a negative document one.
    pub fn screen_delta_to_document_delta(&self, delta: Vec2) -> MapResult<Vec2> {
        let ppu = self.pixels_per_unit()?;
        let dy = delta.y / ppu.y;
        Ok(match self.origin {
            Origin::TopLeft => Vec2::new(delta.x / ppu.x, dy),
            Origin::BottomLeft => Vec2::new(delta.x / ppu.x, -dy),
        })
    }

    /// Project a document rectangle onto the screen.
    pub fn to_screen_rect(&self, document: Rect) -> MapResult<Rect> {
        Ok(self.transform()?.transform_rect_bbox(document))
    }

    /// Whether a screen point falls on the rendered canvas.
    pub fn contains_screen_point(&self, screen: Point) -> bool {
        Rect::from_origin_size(self.css_origin, self.css_size).contains(screen)
    }
}

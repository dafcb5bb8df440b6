#![forbid(unsafe_code)]

//! The surface the core draws through.
//!
//! A [`Viewport`] is implemented by whatever toolkit hosts the scene. The
//! core only asks it to map coordinates, repaint regions, change the cursor
//! and paint the background; input flows the other way as
//! [`ViewportEvent`](crate::event::ViewportEvent)s delivered to the engine.
//!
//! [`HeadlessViewport`] keeps a log of every request and is what tests and
//! batch tools use.

use std::fmt;

use crate::color::Color;
use crate::geometry::{Point3, Rect};

/// Pointer cursor shapes the core may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorKind {
    #[default]
    Arrow,
    PointingHand,
    OpenHand,
    ClosedHand,
    Crosshair,
    Busy,
}

/// Background fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Brush {
    Solid(Color),
    /// Vertical gradient from top to bottom color.
    Gradient(Color, Color),
}

/// Rendering surface consumed by the core.
pub trait Viewport: fmt::Debug {
    /// Scene coordinates to widget coordinates.
    fn map_from_scene(&self, point: Point3) -> Point3;

    /// Widget coordinates to scene coordinates.
    fn map_to_scene(&self, point: Point3) -> Point3;

    /// Ask for a repaint; `None` repaints everything.
    fn request_redraw(&mut self, region: Option<Rect>);

    /// The part of the scene currently visible.
    fn visible_rect(&self) -> Rect;

    fn set_cursor(&mut self, kind: CursorKind);

    fn set_background(&mut self, brush: Brush);
}

/// A request recorded by [`HeadlessViewport`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportRequest {
    Redraw(Option<Rect>),
    Cursor(CursorKind),
    Background(Brush),
}

/// Viewport without a display. Scene and widget coordinates differ by a
/// fixed offset and scale.
#[derive(Debug, Clone)]
pub struct HeadlessViewport {
    size: (f64, f64),
    origin: Point3,
    scale: f64,
    requests: Vec<ViewportRequest>,
}

impl HeadlessViewport {
    /// A viewport of the given widget size showing scene origin at its center.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: (width, height),
            origin: Point3::xy(-width / 2.0, -height / 2.0),
            scale: 1.0,
            requests: Vec::new(),
        }
    }

    /// Set the zoom factor (widget pixels per scene unit).
    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        if scale > 0.0 {
            self.scale = scale;
        }
        self
    }

    /// Resize the widget area.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = (width, height);
    }

    /// Every request since the last [`Self::take_requests`].
    #[must_use]
    pub fn requests(&self) -> &[ViewportRequest] {
        &self.requests
    }

    /// Drain recorded requests.
    pub fn take_requests(&mut self) -> Vec<ViewportRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Number of redraw requests recorded.
    #[must_use]
    pub fn redraw_count(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, ViewportRequest::Redraw(_)))
            .count()
    }
}

impl Default for HeadlessViewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport for HeadlessViewport {
    fn map_from_scene(&self, point: Point3) -> Point3 {
        Point3::new(
            (point.x - self.origin.x) * self.scale,
            (point.y - self.origin.y) * self.scale,
            point.z,
        )
    }

    fn map_to_scene(&self, point: Point3) -> Point3 {
        Point3::new(
            point.x / self.scale + self.origin.x,
            point.y / self.scale + self.origin.y,
            point.z,
        )
    }

    fn request_redraw(&mut self, region: Option<Rect>) {
        self.requests.push(ViewportRequest::Redraw(region));
    }

    fn visible_rect(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.size.0 / self.scale,
            self.size.1 / self.scale,
        )
    }

    fn set_cursor(&mut self, kind: CursorKind) {
        self.requests.push(ViewportRequest::Cursor(kind));
    }

    fn set_background(&mut self, brush: Brush) {
        self.requests.push(ViewportRequest::Background(brush));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_round_trips() {
        let vp = HeadlessViewport::new(400.0, 300.0).with_scale(2.0);
        let p = Point3::xy(13.0, -7.5);
        let back = vp.map_to_scene(vp.map_from_scene(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn scene_origin_is_widget_center() {
        let vp = HeadlessViewport::new(400.0, 300.0);
        assert_eq!(vp.map_from_scene(Point3::ZERO), Point3::xy(200.0, 150.0));
        assert!(vp.visible_rect().contains(Point3::ZERO));
    }

    #[test]
    fn requests_are_recorded_in_order() {
        let mut vp = HeadlessViewport::default();
        vp.request_redraw(None);
        vp.set_cursor(CursorKind::OpenHand);
        vp.request_redraw(Some(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(vp.redraw_count(), 2);
        let reqs = vp.take_requests();
        assert_eq!(reqs[1], ViewportRequest::Cursor(CursorKind::OpenHand));
        assert!(vp.requests().is_empty());
    }
}

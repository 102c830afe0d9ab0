//! Camera module for pan/zoom of the on-screen canvas display.

use kurbo::{Affine, Point, Size, Vec2};

/// Minimum allowed zoom level.
pub const MIN_ZOOM: f64 = 0.5;
/// Maximum allowed zoom level.
pub const MAX_ZOOM: f64 = 5.0;
/// Zoom change applied per mouse-wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 0.1;

/// Camera manages the view transform of the displayed canvas.
///
/// The offset is in container pixels and is applied after scaling, so a
/// display-space point `p` appears on screen at `p * zoom + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Current translation offset (pan).
    pub offset: Vec2,
    zoom: f64,
    /// Pan anchor (`pointer - offset` at drag start) while a pan drag is active.
    pan_anchor: Option<Point>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            pan_anchor: None,
        }
    }
}

impl Camera {
    /// Create a new camera at 100% with no pan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom level, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Transform from display space to container space.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Transform from container space to display space.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Begin a drag-to-pan gesture at `pointer`.
    pub fn start_pan(&mut self, pointer: Point) {
        self.pan_anchor = Some(pointer - self.offset);
    }

    /// Continue a pan gesture. Returns false when no pan is active.
    pub fn update_pan(&mut self, pointer: Point) -> bool {
        match self.pan_anchor {
            Some(anchor) => {
                self.offset = pointer - anchor;
                true
            }
            None => false,
        }
    }

    /// End the current pan gesture.
    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    /// Whether a pan gesture is in progress.
    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    /// Change zoom by `delta`, keeping the container point `cursor` fixed on screen.
    ///
    /// Without a cursor the offset is left untouched.
    pub fn zoom_by(&mut self, delta: f64, cursor: Option<Point>) {
        let previous = self.zoom;
        let next = (previous + delta).clamp(MIN_ZOOM, MAX_ZOOM);

        if let Some(cursor) = cursor {
            let ratio = next / previous;
            let cursor = cursor.to_vec2();
            self.offset = cursor - (cursor - self.offset) * ratio;
        }

        self.zoom = next;
    }

    /// Zoom about the center of a container of the given size.
    pub fn zoom_on_center(&mut self, delta: f64, container: Size) {
        let center = Point::new(container.width / 2.0, container.height / 2.0);
        self.zoom_by(delta, Some(center));
    }

    /// Apply a mouse-wheel notch at `cursor`. Scrolling down zooms out.
    pub fn zoom_wheel(&mut self, delta_y: f64, cursor: Point) {
        let delta = if delta_y > 0.0 { -WHEEL_ZOOM_STEP } else { WHEEL_ZOOM_STEP };
        self.zoom_by(delta, Some(cursor));
    }

    /// Reset to 100% zoom with no pan.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.offset, Vec2::ZERO);
        assert!((camera.zoom() - 1.0).abs() < f64::EPSILON);
        assert!(!camera.is_panning());
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.set_zoom(0.01);
        assert!((camera.zoom() - MIN_ZOOM).abs() < f64::EPSILON);
        camera.set_zoom(100.0);
        assert!((camera.zoom() - MAX_ZOOM).abs() < f64::EPSILON);
        camera.zoom_by(10.0, None);
        assert!((camera.zoom() - MAX_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_drag() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(10.0, 10.0);
        camera.start_pan(Point::new(100.0, 100.0));
        assert!(camera.update_pan(Point::new(130.0, 80.0)));
        assert_eq!(camera.offset, Vec2::new(40.0, -10.0));
        camera.end_pan();
        assert!(!camera.update_pan(Point::new(0.0, 0.0)));
        assert_eq!(camera.offset, Vec2::new(40.0, -10.0));
    }

    #[test]
    fn test_pan_independent_of_zoom() {
        let mut camera = Camera::new();
        camera.set_zoom(3.0);
        camera.start_pan(Point::new(0.0, 0.0));
        camera.update_pan(Point::new(25.0, 5.0));
        assert_eq!(camera.offset, Vec2::new(25.0, 5.0));
    }

    #[test]
    fn test_zoom_keeps_cursor_fixed() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(20.0, -15.0);
        let cursor = Point::new(300.0, 200.0);
        let under_cursor = camera.inverse_transform() * cursor;

        camera.zoom_by(0.7, Some(cursor));

        let back = camera.transform() * under_cursor;
        assert!((back.x - cursor.x).abs() < 1e-9);
        assert!((back.y - cursor.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_wheel_direction() {
        let mut camera = Camera::new();
        camera.zoom_wheel(120.0, Point::ZERO);
        assert!((camera.zoom() - 0.9).abs() < 1e-12);
        camera.zoom_wheel(-120.0, Point::ZERO);
        camera.zoom_wheel(-120.0, Point::ZERO);
        assert!((camera.zoom() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_on_center() {
        let mut camera = Camera::new();
        camera.zoom_on_center(1.0, Size::new(800.0, 600.0));
        // Center (400, 300) stays fixed: offset = c - c * 2
        assert!((camera.offset.x + 400.0).abs() < 1e-9);
        assert!((camera.offset.y + 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut camera = Camera::new();
        camera.set_zoom(2.5);
        camera.offset = Vec2::new(5.0, 5.0);
        camera.reset();
        assert_eq!(camera, Camera::new());
    }
}

//! Conversion between container (screen) coordinates and logical canvas coordinates.

use crate::camera::Camera;
use crate::settings::Settings;
use crate::snap::snap_point;
use kurbo::{Point, Size};

/// Total border inset of the canvas container (4px on each side).
pub const BORDER_WIDTH: f64 = 8.0;

/// Geometry of the attached display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// On-screen size of the container, border included.
    pub container: Size,
    /// Pixel size of the logical canvas.
    pub canvas: Size,
}

impl Viewport {
    pub fn new(container: Size, canvas: Size) -> Self {
        Self { container, canvas }
    }

    /// On-screen size of the canvas at 100% zoom (container minus border).
    pub fn display_size(&self) -> Size {
        Size::new(
            self.container.width - BORDER_WIDTH,
            self.container.height - BORDER_WIDTH,
        )
    }

    /// Logical pixels per display pixel along each axis, or `None` for a degenerate surface.
    fn scale(&self) -> Option<(f64, f64)> {
        let display = self.display_size();
        let valid = display.width > 0.0
            && display.height > 0.0
            && self.canvas.width > 0.0
            && self.canvas.height > 0.0;
        valid.then(|| (self.canvas.width / display.width, self.canvas.height / display.height))
    }
}

/// Map a container-relative device point to logical canvas coordinates without snapping.
///
/// Returns the origin when no surface is attached.
pub fn to_logical_unsnapped(device: Point, viewport: Option<&Viewport>, camera: &Camera) -> Point {
    let Some((sx, sy)) = viewport.and_then(Viewport::scale) else {
        return Point::ZERO;
    };
    let display = camera.inverse_transform() * device;
    Point::new(display.x * sx, display.y * sy)
}

/// Map a container-relative device point to logical canvas coordinates.
///
/// Mirror-line snapping is applied first, then grid snapping. Never fails: a
/// missing or zero-sized surface yields the origin.
pub fn to_logical(device: Point, viewport: Option<&Viewport>, camera: &Camera, settings: &Settings) -> Point {
    let Some(viewport) = viewport.filter(|v| v.scale().is_some()) else {
        return Point::ZERO;
    };
    let raw = to_logical_unsnapped(device, Some(viewport), camera);
    snap_point(raw, viewport.canvas, settings, camera.zoom()).point
}

/// Map a logical canvas point to container coordinates (inverse of [`to_logical_unsnapped`]).
pub fn to_screen(point: Point, viewport: &Viewport, camera: &Camera) -> Option<Point> {
    let (sx, sy) = viewport.scale()?;
    let display = Point::new(point.x / sx, point.y / sy);
    Some(camera.transform() * display)
}

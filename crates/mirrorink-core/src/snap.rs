//! Snap functionality for aligning points to mirror lines and the grid.

use crate::settings::{MirrorMode, SNAP_DISTANCE, Settings};
use kurbo::{Point, Size};

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snap a point onto the canvas center lines used as mirror axes.
///
/// The snap radius is `SNAP_DISTANCE / zoom` logical units, so it stays the
/// same size on screen at every zoom level.
pub fn snap_to_mirror_lines(point: Point, canvas: Size, mode: MirrorMode, zoom: f64) -> SnapResult {
    let mut result = SnapResult::none(point);
    if zoom <= 0.0 {
        return result;
    }

    let threshold = SNAP_DISTANCE / zoom;
    let center_x = canvas.width / 2.0;
    let center_y = canvas.height / 2.0;

    if mode.mirrors_x() && (point.x - center_x).abs() < threshold {
        result.point.x = center_x;
        result.snapped_x = true;
    }
    if mode.mirrors_y() && (point.y - center_y).abs() < threshold {
        result.point.y = center_y;
        result.snapped_y = true;
    }
    result
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return SnapResult::none(point);
    }

    let snapped_x = (point.x / grid_size).round() * grid_size;
    let snapped_y = (point.y / grid_size).round() * grid_size;

    SnapResult {
        point: Point::new(snapped_x, snapped_y),
        snapped_x: true,
        snapped_y: true,
    }
}

/// Apply mirror-line snapping, then grid snapping if enabled.
pub fn snap_point(point: Point, canvas: Size, settings: &Settings, zoom: f64) -> SnapResult {
    let mirrored = snap_to_mirror_lines(point, canvas, settings.mirror_mode, zoom);
    if !settings.snap_to_grid {
        return mirrored;
    }

    let grid = snap_to_grid(mirrored.point, settings.grid_size);
    SnapResult {
        point: grid.point,
        snapped_x: mirrored.snapped_x || grid.snapped_x,
        snapped_y: mirrored.snapped_y || grid.snapped_y,
    }
}

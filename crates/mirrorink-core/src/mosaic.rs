//! Mosaic replication: tiling the canvas and rotating copies about each tile center.

use crate::settings::{MosaicRotation, Settings};
use kurbo::{Affine, Point, Size, Vec2};
use std::f64::consts::TAU;

/// Where a point falls within the mosaic grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileInfo {
    /// Tile column index (may be out of range for points off the canvas).
    pub tile_x: i64,
    /// Tile row index.
    pub tile_y: i64,
    /// Offset of the point from its tile's origin.
    pub local: Vec2,
    /// Size of a single tile.
    pub tile_size: Size,
    /// Absolute center of the point's tile.
    pub center: Point,
}

/// A `tiles_x` x `tiles_y` grid over the canvas with a rotational order per tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MosaicGrid {
    pub canvas: Size,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub rotation: MosaicRotation,
}

impl MosaicGrid {
    pub fn new(canvas: Size, tiles_x: u32, tiles_y: u32, rotation: MosaicRotation) -> Self {
        Self {
            canvas,
            tiles_x,
            tiles_y,
            rotation,
        }
    }

    /// Grid described by the mosaic fields of `settings`.
    pub fn from_settings(settings: &Settings, canvas: Size) -> Self {
        Self::new(
            canvas,
            settings.mosaic_tile_count_x,
            settings.mosaic_tile_count_y,
            settings.mosaic_rotation,
        )
    }

    /// Tile size, or `None` when the grid or canvas is degenerate.
    pub fn tile_size(&self) -> Option<Size> {
        let valid = self.tiles_x > 0
            && self.tiles_y > 0
            && self.canvas.width > 0.0
            && self.canvas.height > 0.0;
        valid.then(|| {
            Size::new(
                self.canvas.width / self.tiles_x as f64,
                self.canvas.height / self.tiles_y as f64,
            )
        })
    }

    /// Number of replicas `replicate` produces for one point.
    pub fn replica_count(&self) -> usize {
        if self.tile_size().is_none() {
            return 0;
        }
        self.tiles_x as usize * self.tiles_y as usize * self.rotation.replicas_per_tile()
    }

    /// Locate `point` within the grid. A degenerate grid yields all zeros.
    pub fn tile_info(&self, point: Point) -> TileInfo {
        let Some(size) = self.tile_size() else {
            return TileInfo::default();
        };

        let tile_x = (point.x / size.width).floor();
        let tile_y = (point.y / size.height).floor();
        let origin = Point::new(tile_x * size.width, tile_y * size.height);

        TileInfo {
            tile_x: tile_x as i64,
            tile_y: tile_y as i64,
            local: point - origin,
            tile_size: size,
            center: Point::new((tile_x + 0.5) * size.width, (tile_y + 0.5) * size.height),
        }
    }

    /// Origins and centers of every tile in row-major order.
    fn tiles(&self, size: Size) -> impl Iterator<Item = (Point, Point)> + '_ {
        (0..self.tiles_y).flat_map(move |ty| {
            (0..self.tiles_x).map(move |tx| {
                let origin = Point::new(tx as f64 * size.width, ty as f64 * size.height);
                let center = origin + Vec2::new(size.width / 2.0, size.height / 2.0);
                (origin, center)
            })
        })
    }

    /// Every replica of `point`: its tile-local position reproduced in each
    /// tile, then rotated about that tile's center.
    ///
    /// Output is ordered by tile (row-major), then by increasing rotation angle.
    pub fn replicate(&self, point: Point) -> Vec<Point> {
        let Some(size) = self.tile_size() else {
            return Vec::new();
        };

        let local = self.tile_info(point).local;
        let mut out = Vec::with_capacity(self.replica_count());
        for (origin, center) in self.tiles(size) {
            out.extend(rotated_points(origin + local, center, self.rotation));
        }
        out
    }

    /// Replicate an ordered point sequence (e.g. polygon vertices) as whole units.
    ///
    /// Returns one sequence per (tile, rotation) pair in the same order as
    /// [`replicate`](Self::replicate), each preserving the input vertex order.
    /// The first vertex is the reference that identifies the source tile; every
    /// vertex still contributes its own tile-local offset, so a shape straddling
    /// a tile boundary is folded back into each tile.
    pub fn replicate_sequence(&self, points: &[Point]) -> Vec<Vec<Point>> {
        let Some(size) = self.tile_size() else {
            return Vec::new();
        };
        let Some(&first) = points.first() else {
            return Vec::new();
        };

        let source = self.tile_info(first);
        log::trace!(
            "replicating {} points from tile ({}, {})",
            points.len(),
            source.tile_x,
            source.tile_y
        );

        let locals: Vec<Vec2> = points.iter().map(|&p| self.tile_info(p).local).collect();
        let mut out = Vec::with_capacity(self.replica_count());
        for (origin, center) in self.tiles(size) {
            for angle in rotation_angles(self.rotation) {
                let rotate = Affine::rotate_about(angle, center);
                out.push(locals.iter().map(|&local| rotate * (origin + local)).collect());
            }
        }
        out
    }
}

/// Angles (radians) of the copies produced for a rotational order, increasing from 0.
fn rotation_angles(rotation: MosaicRotation) -> impl Iterator<Item = f64> {
    let n = rotation.replicas_per_tile();
    (0..n).map(move |i| TAU * i as f64 / n as f64)
}

/// Copies of `point` rotated about `center` by `2*pi*i/N` for `i` in `0..N`.
///
/// With rotation disabled the point itself is the single copy.
pub fn rotated_points(point: Point, center: Point, rotation: MosaicRotation) -> Vec<Point> {
    rotation_angles(rotation)
        .map(|angle| Affine::rotate_about(angle, center) * point)
        .collect()
}

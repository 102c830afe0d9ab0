//! Replication of strokes according to the active mirror mode.

use crate::mosaic::MosaicGrid;
use crate::settings::{MirrorMode, Settings};
use kurbo::{Affine, Line, Point, Size};

/// The replication rule for one canvas: mirror axes or a mosaic grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Symmetry {
    mode: MirrorMode,
    canvas: Size,
    mosaic: MosaicGrid,
}

impl Symmetry {
    pub fn new(settings: &Settings, canvas: Size) -> Self {
        Self {
            mode: settings.mirror_mode,
            canvas,
            mosaic: MosaicGrid::from_settings(settings, canvas),
        }
    }

    pub fn mode(&self) -> MirrorMode {
        self.mode
    }

    pub fn mosaic(&self) -> &MosaicGrid {
        &self.mosaic
    }

    /// Reflections for the mirror modes, identity first.
    fn reflections(&self) -> Vec<Affine> {
        let (w, h) = (self.canvas.width, self.canvas.height);
        let flip_x = Affine::new([-1.0, 0.0, 0.0, 1.0, w, 0.0]);
        let flip_y = Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, h]);
        match self.mode {
            MirrorMode::None | MirrorMode::Mosaic => vec![Affine::IDENTITY],
            MirrorMode::Horizontal => vec![Affine::IDENTITY, flip_x],
            MirrorMode::Vertical => vec![Affine::IDENTITY, flip_y],
            MirrorMode::Both => vec![Affine::IDENTITY, flip_x, flip_y, flip_x * flip_y],
        }
    }

    fn is_degenerate(&self) -> bool {
        self.canvas.width <= 0.0 || self.canvas.height <= 0.0
    }

    /// Number of replicas produced for a single point.
    pub fn replica_count(&self) -> usize {
        match self.mode {
            _ if self.is_degenerate() => 0,
            MirrorMode::Mosaic => self.mosaic.replica_count(),
            _ => self.reflections().len(),
        }
    }

    /// Every replica of a single point. The first replica is the point itself
    /// for mirror modes.
    pub fn replicate(&self, point: Point) -> Vec<Point> {
        if self.is_degenerate() {
            return Vec::new();
        }
        match self.mode {
            MirrorMode::Mosaic => self.mosaic.replicate(point),
            _ => self.reflections().into_iter().map(|a| a * point).collect(),
        }
    }

    /// Every replica of an ordered point sequence, each preserving vertex order.
    pub fn replicate_sequence(&self, points: &[Point]) -> Vec<Vec<Point>> {
        if self.is_degenerate() || points.is_empty() {
            return Vec::new();
        }
        match self.mode {
            MirrorMode::Mosaic => self.mosaic.replicate_sequence(points),
            _ => self
                .reflections()
                .into_iter()
                .map(|a| points.iter().map(|&p| a * p).collect())
                .collect(),
        }
    }

    /// Guide lines for display: the mirror axes, or the mosaic tile boundaries.
    pub fn guide_lines(&self) -> Vec<Line> {
        let (w, h) = (self.canvas.width, self.canvas.height);
        let mut lines = Vec::new();
        match self.mode {
            MirrorMode::Mosaic => {
                if let Some(tile) = self.mosaic.tile_size() {
                    for i in 1..self.mosaic.tiles_x {
                        let x = tile.width * i as f64;
                        lines.push(Line::new((x, 0.0), (x, h)));
                    }
                    for j in 1..self.mosaic.tiles_y {
                        let y = tile.height * j as f64;
                        lines.push(Line::new((0.0, y), (w, y)));
                    }
                }
            }
            mode => {
                if mode.mirrors_x() {
                    lines.push(Line::new((w / 2.0, 0.0), (w / 2.0, h)));
                }
                if mode.mirrors_y() {
                    lines.push(Line::new((0.0, h / 2.0), (w, h / 2.0)));
                }
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MosaicRotation;

    fn symmetry(mode: MirrorMode) -> Symmetry {
        let settings = Settings {
            mirror_mode: mode,
            ..Settings::default()
        };
        Symmetry::new(&settings, Size::new(400.0, 300.0))
    }

    #[test]
    fn test_none_is_identity() {
        let p = Point::new(10.0, 20.0);
        assert_eq!(symmetry(MirrorMode::None).replicate(p), vec![p]);
    }

    #[test]
    fn test_horizontal_reflects_x() {
        let points = symmetry(MirrorMode::Horizontal).replicate(Point::new(10.0, 20.0));
        assert_eq!(points, vec![Point::new(10.0, 20.0), Point::new(390.0, 20.0)]);
    }

    #[test]
    fn test_vertical_reflects_y() {
        let points = symmetry(MirrorMode::Vertical).replicate(Point::new(10.0, 20.0));
        assert_eq!(points, vec![Point::new(10.0, 20.0), Point::new(10.0, 280.0)]);
    }

    #[test]
    fn test_both_gives_four_quadrants() {
        let points = symmetry(MirrorMode::Both).replicate(Point::new(10.0, 20.0));
        assert_eq!(
            points,
            vec![
                Point::new(10.0, 20.0),
                Point::new(390.0, 20.0),
                Point::new(10.0, 280.0),
                Point::new(390.0, 280.0),
            ]
        );
        assert_eq!(symmetry(MirrorMode::Both).replica_count(), 4);
    }

    #[test]
    fn test_mosaic_delegates_to_grid() {
        let settings = Settings {
            mirror_mode: MirrorMode::Mosaic,
            mosaic_rotation: MosaicRotation::Six,
            mosaic_tile_count_x: 3,
            mosaic_tile_count_y: 2,
            ..Settings::default()
        };
        let sym = Symmetry::new(&settings, Size::new(600.0, 400.0));
        assert_eq!(sym.replicate(Point::new(50.0, 50.0)).len(), 36);
        assert_eq!(sym.replica_count(), 36);
        assert_eq!(sym.replicate_sequence(&[Point::new(1.0, 1.0), Point::new(2.0, 2.0)]).len(), 36);
    }

    #[test]
    fn test_sequence_preserves_vertex_order() {
        let sets = symmetry(MirrorMode::Horizontal)
            .replicate_sequence(&[Point::new(0.0, 0.0), Point::new(100.0, 50.0)]);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1], vec![Point::new(400.0, 0.0), Point::new(300.0, 50.0)]);
    }

    #[test]
    fn test_degenerate_canvas() {
        let sym = Symmetry::new(&Settings::default(), Size::ZERO);
        assert!(sym.replicate(Point::new(1.0, 1.0)).is_empty());
        assert_eq!(sym.replica_count(), 0);
    }

    #[test]
    fn test_guide_lines() {
        assert_eq!(symmetry(MirrorMode::Both).guide_lines().len(), 2);
        assert!(symmetry(MirrorMode::None).guide_lines().is_empty());

        let settings = Settings {
            mirror_mode: MirrorMode::Mosaic,
            mosaic_tile_count_x: 3,
            mosaic_tile_count_y: 2,
            ..Settings::default()
        };
        let lines = Symmetry::new(&settings, Size::new(300.0, 200.0)).guide_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], Line::new((100.0, 0.0), (100.0, 200.0)));
    }
}

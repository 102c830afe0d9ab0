//! Rasterizing shape replicas into layer buffers.

use crate::raster::PixelBuffer;
use crate::settings::{DrawingTool, HexColor};
use crate::symmetry::Symmetry;
use kurbo::{BezPath, Circle, PathEl, Point, Shape as _, Vec2};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, PixmapMut, Stroke, Transform};

/// Stroke width for outlines, in logical pixels.
pub const STROKE_WIDTH: f32 = 4.0;

/// Tolerance used when flattening curves to paths.
const PATH_TOLERANCE: f64 = 0.1;

/// A single shape to rasterize, in logical canvas coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    Circle { center: Point, radius: f64 },
    Square { corners: [Point; 4] },
    /// Closed polygons are filled and outlined; open ones are previews drawn as polylines.
    Polygon { vertices: Vec<Point>, closed: bool },
}

impl Figure {
    /// Circle through `rim` centered at `center`.
    pub fn circle(center: Point, rim: Point) -> Self {
        Figure::Circle {
            center,
            radius: (rim - center).hypot(),
        }
    }

    /// Square centered at `center` with one corner at `corner`.
    ///
    /// The remaining corners are `corner` turned about the center in quarter
    /// turns, so a rotated replica stays a square.
    pub fn square(center: Point, corner: Point) -> Self {
        let d = corner - center;
        let quarter = |v: Vec2| Vec2::new(-v.y, v.x);
        let d1 = quarter(d);
        let d2 = quarter(d1);
        let d3 = quarter(d2);
        Figure::Square {
            corners: [center + d, center + d1, center + d2, center + d3],
        }
    }

    /// Whether the figure encloses no area worth drawing.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Figure::Circle { radius, .. } => *radius < 0.5,
            Figure::Square { corners } => (corners[0] - corners[2]).hypot() < 0.5,
            Figure::Polygon { vertices, .. } => vertices.len() < 2,
        }
    }

    /// Whether the interior is filled in addition to the outline.
    pub fn is_filled(&self) -> bool {
        matches!(self, Figure::Polygon { closed: true, .. })
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Figure::Circle { center, radius } => Circle::new(*center, *radius).to_path(PATH_TOLERANCE),
            Figure::Square { corners } => polyline(corners, true),
            Figure::Polygon { vertices, closed } => polyline(vertices, *closed),
        }
    }
}

fn polyline(points: &[Point], closed: bool) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(&first) = iter.next() {
        path.move_to(first);
        for &p in iter {
            path.line_to(p);
        }
        if closed {
            path.close_path();
        }
    }
    path
}

/// Replicas of a click-drag shape from `start` (center) to `current`.
pub fn drag_figures(tool: DrawingTool, start: Point, current: Point, symmetry: &Symmetry) -> Vec<Figure> {
    match tool {
        DrawingTool::Circle => symmetry
            .replicate_sequence(&[start, current])
            .into_iter()
            .map(|pair| Figure::circle(pair[0], pair[1]))
            .collect(),
        DrawingTool::Square => {
            let d = current - start;
            let half = d.x.abs().max(d.y.abs());
            let corner = start + Vec2::new(half, half);
            symmetry
                .replicate_sequence(&[start, corner])
                .into_iter()
                .map(|pair| Figure::square(pair[0], pair[1]))
                .collect()
        }
        DrawingTool::Polygon => polygon_figures(&[start, current], false, symmetry),
    }
}

/// Replicas of a polygon outline.
pub fn polygon_figures(vertices: &[Point], closed: bool, symmetry: &Symmetry) -> Vec<Figure> {
    symmetry
        .replicate_sequence(vertices)
        .into_iter()
        .map(|vertices| Figure::Polygon { vertices, closed })
        .collect()
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Paint figures into `target` in order. Returns how many were drawn.
///
/// Anti-aliasing is off so every touched pixel is fully opaque, which keeps
/// the straight-alpha buffer valid for tiny-skia's premultiplied pipeline.
pub fn paint_figures(target: &mut PixelBuffer, figures: &[Figure], color: HexColor) -> usize {
    let (width, height) = target.dimensions();
    let Some(mut pixmap) = PixmapMut::from_bytes(target.as_raw_mut(), width, height) else {
        return 0;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = false;

    let stroke = Stroke {
        width: STROKE_WIDTH,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let mut drawn = 0;
    for figure in figures.iter().filter(|f| !f.is_degenerate()) {
        let Some(path) = to_skia_path(&figure.to_path()) else {
            continue;
        };
        if figure.is_filled() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        drawn += 1;
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MirrorMode, MosaicRotation, Settings};
    use kurbo::Size;

    const RED: HexColor = HexColor::new(255, 0, 0);

    fn symmetry(mode: MirrorMode) -> Symmetry {
        let settings = Settings {
            mirror_mode: mode,
            mosaic_rotation: MosaicRotation::Four,
            ..Settings::default()
        };
        Symmetry::new(&settings, Size::new(100.0, 100.0))
    }

    #[test]
    fn test_square_corners() {
        let fig = Figure::square(Point::new(10.0, 10.0), Point::new(15.0, 15.0));
        let Figure::Square { corners } = fig else { panic!("expected square") };
        assert_eq!(corners[0], Point::new(15.0, 15.0));
        assert_eq!(corners[1], Point::new(5.0, 15.0));
        assert_eq!(corners[2], Point::new(5.0, 5.0));
        assert_eq!(corners[3], Point::new(15.0, 5.0));
    }

    #[test]
    fn test_circle_radius() {
        let fig = Figure::circle(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert_eq!(fig, Figure::Circle { center: Point::ZERO, radius: 5.0 });
    }

    #[test]
    fn test_drag_figures_follow_symmetry() {
        let figs = drag_figures(
            DrawingTool::Circle,
            Point::new(20.0, 20.0),
            Point::new(30.0, 20.0),
            &symmetry(MirrorMode::Both),
        );
        assert_eq!(figs.len(), 4);
        assert_eq!(figs[1], Figure::Circle { center: Point::new(80.0, 20.0), radius: 10.0 });

        let mosaic = drag_figures(
            DrawingTool::Square,
            Point::new(25.0, 25.0),
            Point::new(30.0, 28.0),
            &symmetry(MirrorMode::Mosaic),
        );
        assert_eq!(mosaic.len(), 16);
    }

    #[test]
    fn test_paint_filled_polygon() {
        let mut buffer = PixelBuffer::new(50, 50);
        let figs = vec![Figure::Polygon {
            vertices: vec![Point::new(10.0, 10.0), Point::new(40.0, 10.0), Point::new(25.0, 40.0)],
            closed: true,
        }];
        assert_eq!(paint_figures(&mut buffer, &figs, RED), 1);
        assert_eq!(buffer.pixel(25, 20), Some([255, 0, 0, 255]));
        assert_eq!(buffer.pixel(2, 45), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_paint_circle_outline_only() {
        let mut buffer = PixelBuffer::new(60, 60);
        let figs = vec![Figure::Circle { center: Point::new(30.0, 30.0), radius: 20.0 }];
        paint_figures(&mut buffer, &figs, RED);
        assert_eq!(buffer.pixel(50, 30), Some([255, 0, 0, 255]));
        assert_eq!(buffer.pixel(30, 30), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_degenerate_figures_skipped() {
        let mut buffer = PixelBuffer::new(10, 10);
        let figs = vec![
            Figure::Polygon { vertices: vec![Point::new(5.0, 5.0)], closed: false },
            Figure::Circle { center: Point::new(5.0, 5.0), radius: 0.0 },
        ];
        assert_eq!(paint_figures(&mut buffer, &figs, RED), 0);
        assert!(buffer.as_image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }
}

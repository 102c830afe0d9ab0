//! Drawing settings: canvas presets, symmetry configuration, tool and color.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Distance (in screen pixels at 100% zoom) within which points snap onto a mirror line.
pub const SNAP_DISTANCE: f64 = 20.0;

/// Default grid spacing in logical pixels.
pub const DEFAULT_GRID_SIZE: f64 = 50.0;

/// Inclusive bounds for the number of mosaic tiles along each axis.
pub const MIN_TILE_COUNT: u32 = 1;
pub const MAX_TILE_COUNT: u32 = 6;

const DEFAULT_TILE_COUNT: u32 = 2;

/// Canvas size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanvasSize {
    #[default]
    Landscape,
    Portrait,
    Square,
}

/// Pixel dimensions of the logical canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
    /// CSS-style aspect ratio, e.g. `"4 / 3"`.
    pub aspect_ratio: &'static str,
}

impl CanvasDimensions {
    /// Dimensions divided by `divisor` (at least 1px per side). A divisor of 1 is the identity.
    pub fn scaled_down(self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
            aspect_ratio: self.aspect_ratio,
        }
    }

    /// Size as floating point logical units.
    pub fn size(self) -> kurbo::Size {
        kurbo::Size::new(self.width as f64, self.height as f64)
    }
}

impl CanvasSize {
    pub const ALL: [CanvasSize; 3] = [CanvasSize::Landscape, CanvasSize::Portrait, CanvasSize::Square];

    /// Preset pixel dimensions for this size class.
    pub const fn dimensions(self) -> CanvasDimensions {
        match self {
            CanvasSize::Landscape => CanvasDimensions { width: 3200, height: 2400, aspect_ratio: "4 / 3" },
            CanvasSize::Portrait => CanvasDimensions { width: 2400, height: 3200, aspect_ratio: "3 / 4" },
            CanvasSize::Square => CanvasDimensions { width: 2800, height: 2800, aspect_ratio: "1 / 1" },
        }
    }
}

/// Shape tool used for new strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingTool {
    #[default]
    Polygon,
    Circle,
    Square,
}

impl DrawingTool {
    /// Tools drawn by click-drag rather than vertex accumulation.
    pub fn is_drag_shape(self) -> bool {
        matches!(self, DrawingTool::Circle | DrawingTool::Square)
    }
}

/// How strokes are replicated across the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorMode {
    None,
    /// Mirror across the vertical center line (left/right).
    Horizontal,
    /// Mirror across the horizontal center line (top/bottom).
    Vertical,
    #[default]
    Both,
    /// Tile the canvas and rotate copies about each tile center.
    Mosaic,
}

impl MirrorMode {
    /// Whether strokes are reflected across the vertical center line `x = W/2`.
    pub fn mirrors_x(self) -> bool {
        matches!(self, MirrorMode::Horizontal | MirrorMode::Both)
    }

    /// Whether strokes are reflected across the horizontal center line `y = H/2`.
    pub fn mirrors_y(self) -> bool {
        matches!(self, MirrorMode::Vertical | MirrorMode::Both)
    }
}

/// Rotational order of the mosaic: how many rotated copies each tile receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MosaicRotation {
    None,
    Two,
    Three,
    #[default]
    Four,
    Six,
    Eight,
}

impl MosaicRotation {
    pub const ALL: [MosaicRotation; 6] = [
        MosaicRotation::None,
        MosaicRotation::Two,
        MosaicRotation::Three,
        MosaicRotation::Four,
        MosaicRotation::Six,
        MosaicRotation::Eight,
    ];

    /// Rotational order, or `None` when rotation is disabled.
    pub fn order(self) -> Option<u32> {
        match self {
            MosaicRotation::None => None,
            MosaicRotation::Two => Some(2),
            MosaicRotation::Three => Some(3),
            MosaicRotation::Four => Some(4),
            MosaicRotation::Six => Some(6),
            MosaicRotation::Eight => Some(8),
        }
    }

    /// Look up a rotation by its order.
    pub fn from_order(order: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.order() == Some(order))
    }

    /// Number of replicas produced per tile (1 when rotation is disabled).
    pub fn replicas_per_tile(self) -> usize {
        self.order().unwrap_or(1) as usize
    }
}

// Persisted as the string "none" or a bare number.
impl Serialize for MosaicRotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.order() {
            Some(order) => serializer.serialize_u32(order),
            None => serializer.serialize_str("none"),
        }
    }
}

impl<'de> Deserialize<'de> for MosaicRotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Count(u32),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Count(n) => Self::from_order(n)
                .ok_or_else(|| serde::de::Error::custom(format!("unsupported mosaic rotation: {n}"))),
            Repr::Name(name) if name == "none" => Ok(MosaicRotation::None),
            Repr::Name(name) => name
                .parse::<u32>()
                .ok()
                .and_then(Self::from_order)
                .ok_or_else(|| serde::de::Error::custom(format!("unsupported mosaic rotation: {name}"))),
        }
    }
}

/// An opaque sRGB color, persisted as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for HexColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl HexColor {
    pub const BLACK: HexColor = HexColor::new(0, 0, 0);
    pub const WHITE: HexColor = HexColor::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb`, `#rrggbb`, or the legacy names `black` and `white`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "black" => return Some(Self::BLACK),
            "white" => return Some(Self::WHITE),
            _ => {}
        }

        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
                Some(Self::new(r, g, b))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::new(r, g, b))
            }
            _ => None,
        }
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HexColor::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color: {s}")))
    }
}

fn default_grid_size() -> f64 {
    DEFAULT_GRID_SIZE
}

fn default_tile_count() -> u32 {
    DEFAULT_TILE_COUNT
}

fn default_true() -> bool {
    true
}

/// User-facing drawing configuration.
///
/// This is also the settings snapshot stored with every library record, so the
/// fields added after the first schema version carry serde defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub canvas_size: CanvasSize,
    #[serde(default)]
    pub mirror_mode: MirrorMode,
    #[serde(default)]
    pub color: HexColor,
    #[serde(default)]
    pub drawing_tool: DrawingTool,
    #[serde(default)]
    pub show_grid: bool,
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    #[serde(default)]
    pub snap_to_grid: bool,
    #[serde(default = "default_true")]
    pub show_mirror_lines: bool,
    #[serde(default)]
    pub mosaic_rotation: MosaicRotation,
    #[serde(default = "default_tile_count")]
    pub mosaic_tile_count_x: u32,
    #[serde(default = "default_tile_count")]
    pub mosaic_tile_count_y: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_size: CanvasSize::default(),
            mirror_mode: MirrorMode::default(),
            color: HexColor::default(),
            drawing_tool: DrawingTool::default(),
            show_grid: false,
            grid_size: DEFAULT_GRID_SIZE,
            snap_to_grid: false,
            show_mirror_lines: true,
            mosaic_rotation: MosaicRotation::default(),
            mosaic_tile_count_x: DEFAULT_TILE_COUNT,
            mosaic_tile_count_y: DEFAULT_TILE_COUNT,
        }
    }
}

impl Settings {
    /// Preset dimensions for the current canvas size class.
    pub fn dimensions(&self) -> CanvasDimensions {
        self.canvas_size.dimensions()
    }

    /// Set the mosaic grid, clamping each axis into `[MIN_TILE_COUNT, MAX_TILE_COUNT]`.
    pub fn set_tile_counts(&mut self, x: u32, y: u32) {
        self.mosaic_tile_count_x = x.clamp(MIN_TILE_COUNT, MAX_TILE_COUNT);
        self.mosaic_tile_count_y = y.clamp(MIN_TILE_COUNT, MAX_TILE_COUNT);
    }

    /// Set the grid spacing. Non-positive or non-finite sizes are ignored.
    pub fn set_grid_size(&mut self, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.grid_size = size;
        }
    }

    /// Clamp values that may have come from an older or hand-edited record.
    pub fn sanitized(mut self) -> Self {
        self.set_tile_counts(self.mosaic_tile_count_x, self.mosaic_tile_count_y);
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            self.grid_size = DEFAULT_GRID_SIZE;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_presets() {
        let landscape = CanvasSize::Landscape.dimensions();
        assert_eq!((landscape.width, landscape.height), (3200, 2400));
        let portrait = CanvasSize::Portrait.dimensions();
        assert_eq!((portrait.width, portrait.height), (2400, 3200));
        let square = CanvasSize::Square.dimensions();
        assert_eq!((square.width, square.height), (2800, 2800));
        assert_eq!(square.aspect_ratio, "1 / 1");
    }

    #[test]
    fn test_scaled_down_dimensions() {
        let dims = CanvasSize::Landscape.dimensions().scaled_down(8);
        assert_eq!((dims.width, dims.height), (400, 300));
        let same = CanvasSize::Square.dimensions().scaled_down(0);
        assert_eq!(same.width, 2800);
    }

    #[test]
    fn test_hex_color_parse() {
        assert_eq!(HexColor::parse("#ff0000"), Some(HexColor::new(255, 0, 0)));
        assert_eq!(HexColor::parse("#0f0"), Some(HexColor::new(0, 255, 0)));
        assert_eq!(HexColor::parse("black"), Some(HexColor::BLACK));
        assert_eq!(HexColor::parse("white"), Some(HexColor::WHITE));
        assert_eq!(HexColor::parse("red"), None);
        assert_eq!(HexColor::parse("#12345"), None);
        assert_eq!(HexColor::new(18, 52, 86).to_hex(), "#123456");
    }

    #[test]
    fn test_mosaic_rotation_serde() {
        assert_eq!(serde_json::to_string(&MosaicRotation::Six).unwrap(), "6");
        assert_eq!(serde_json::to_string(&MosaicRotation::None).unwrap(), "\"none\"");
        let r: MosaicRotation = serde_json::from_str("8").unwrap();
        assert_eq!(r, MosaicRotation::Eight);
        let r: MosaicRotation = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(r, MosaicRotation::None);
        assert!(serde_json::from_str::<MosaicRotation>("5").is_err());
    }

    #[test]
    fn test_replicas_per_tile() {
        assert_eq!(MosaicRotation::None.replicas_per_tile(), 1);
        assert_eq!(MosaicRotation::Three.replicas_per_tile(), 3);
    }

    #[test]
    fn test_legacy_settings_get_defaults() {
        let json = r#"{
            "canvasSize": "portrait",
            "mirrorMode": "vertical",
            "color": "white",
            "drawingTool": "circle",
            "showGrid": true,
            "gridSize": 25,
            "snapToGrid": true,
            "showMirrorLines": false
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.canvas_size, CanvasSize::Portrait);
        assert_eq!(settings.mirror_mode, MirrorMode::Vertical);
        assert_eq!(settings.color, HexColor::WHITE);
        assert_eq!(settings.drawing_tool, DrawingTool::Circle);
        assert!((settings.grid_size - 25.0).abs() < f64::EPSILON);
        assert_eq!(settings.mosaic_rotation, MosaicRotation::Four);
        assert_eq!(settings.mosaic_tile_count_x, 2);
    }

    #[test]
    fn test_tile_counts_clamped() {
        let mut settings = Settings::default();
        settings.set_tile_counts(0, 9);
        assert_eq!(settings.mosaic_tile_count_x, MIN_TILE_COUNT);
        assert_eq!(settings.mosaic_tile_count_y, MAX_TILE_COUNT);
    }

    #[test]
    fn test_mirror_axes() {
        assert!(MirrorMode::Horizontal.mirrors_x());
        assert!(!MirrorMode::Horizontal.mirrors_y());
        assert!(MirrorMode::Both.mirrors_x() && MirrorMode::Both.mirrors_y());
        assert!(!MirrorMode::Mosaic.mirrors_x() && !MirrorMode::Mosaic.mirrors_y());
    }
}

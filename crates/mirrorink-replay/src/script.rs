//! JSON replay scripts.
//!
//! ```json
//! {
//!   "settings": { "mirrorMode": "mosaic", "mosaicRotation": 6 },
//!   "container": { "width": 808.0, "height": 608.0 },
//!   "steps": [
//!     { "action": "pointer", "event": { "type": "down", "position": { "x": 100.0, "y": 80.0 }, "button": "left" } },
//!     { "action": "shape", "tool": "circle", "from": { "x": 400.0, "y": 300.0 }, "to": { "x": 480.0, "y": 300.0 } },
//!     { "action": "undo" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result, bail};
use kurbo::{Point, Size};
use mirrorink_core::{
    CanvasSize, DrawingSession, DrawingTool, HexColor, InputController, KeyEvent, MirrorMode, MosaicRotation,
    PointerEvent, Settings,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A full replay: initial settings, optional on-screen container, and steps.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub settings: Settings,
    /// Container size for pointer steps. Pointer events need a viewport.
    #[serde(default)]
    pub container: Option<Size>,
    pub steps: Vec<Step>,
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Raw pointer event in container coordinates.
    Pointer { event: PointerEvent },
    Key { event: KeyEvent },
    /// Click-drag shape in logical coordinates.
    Shape { tool: DrawingTool, from: Point, to: Point },
    /// Closed polygon in logical coordinates.
    Polygon { points: Vec<Point> },
    SetTool { tool: DrawingTool },
    SetColor { color: HexColor },
    SetMirrorMode { mode: MirrorMode },
    SetMosaic {
        rotation: MosaicRotation,
        tiles_x: u32,
        tiles_y: u32,
    },
    SetCanvasSize { size: CanvasSize },
    AddLayer,
    /// Select a layer by paint-order index.
    SelectLayer { index: usize },
    SetLayerVisible { index: usize, visible: bool },
    Import { path: PathBuf },
    Clear,
    Undo,
    Redo,
}

impl Script {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// Applies script steps to a session.
pub struct Runner<'a> {
    session: &'a mut DrawingSession,
    input: InputController,
    /// Directory relative import paths are resolved against.
    base_dir: PathBuf,
}

impl<'a> Runner<'a> {
    pub fn new(session: &'a mut DrawingSession, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            input: InputController::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run(&mut self, script: &Script) -> Result<()> {
        if let Some(container) = script.container {
            self.session.attach_viewport(container);
        }
        for (i, step) in script.steps.iter().enumerate() {
            log::debug!("step {}: {:?}", i, step);
            self.apply(step).with_context(|| format!("step {i}"))?;
        }
        Ok(())
    }

    fn layer_id(&self, index: usize) -> Result<mirrorink_core::LayerId> {
        match self.session.layers().iter().nth(index) {
            Some(layer) => Ok(layer.id()),
            None => bail!("no layer at index {index}"),
        }
    }

    pub fn apply(&mut self, step: &Step) -> Result<()> {
        let session = &mut *self.session;
        match step {
            Step::Pointer { event } => {
                if session.viewport().is_none() {
                    bail!("pointer steps need a container");
                }
                self.input.handle_pointer(session, event.clone());
            }
            Step::Key { event } => self.input.handle_key(session, event.clone()),
            Step::Shape { tool, from, to } => {
                session.set_tool(*tool);
                session.start_shape(*from);
                session.update_shape(*to);
                session.finish_shape(*to);
            }
            Step::Polygon { points } => {
                session.set_tool(DrawingTool::Polygon);
                for point in points {
                    session.add_polygon_point(*point);
                }
                session.finish_polygon();
            }
            Step::SetTool { tool } => session.set_tool(*tool),
            Step::SetColor { color } => session.set_color(*color),
            Step::SetMirrorMode { mode } => session.set_mirror_mode(*mode),
            Step::SetMosaic {
                rotation,
                tiles_x,
                tiles_y,
            } => {
                session.set_mosaic_rotation(*rotation);
                session.set_tile_counts(*tiles_x, *tiles_y);
            }
            Step::SetCanvasSize { size } => session.set_canvas_size(*size, true)?,
            Step::AddLayer => {
                session.add_layer();
            }
            Step::SelectLayer { index } => {
                let id = self.layer_id(*index)?;
                self.session.select_layer(id)?;
            }
            Step::SetLayerVisible { index, visible } => {
                let id = self.layer_id(*index)?;
                self.session.set_layer_visible(id, *visible)?;
            }
            Step::Import { path } => {
                let path = self.base_dir.join(path);
                let bytes = fs::read(&path).with_context(|| format!("reading image {}", path.display()))?;
                pollster::block_on(self.session.import_encoded(bytes, true))?;
            }
            Step::Clear => session.clear_canvas(),
            Step::Undo => {
                session.undo();
            }
            Step::Redo => {
                session.redo();
            }
        }
        Ok(())
    }
}

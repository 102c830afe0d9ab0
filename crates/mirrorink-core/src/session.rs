//! The drawing session: interaction state machine, layers, history and view.

use crate::camera::Camera;
use crate::history::History;
use crate::layers::{BACKGROUND, LayerError, LayerId, LayerStack};
use crate::library::{self, Library, LibraryError, LoadedDrawing, SavedDrawing, Store};
use crate::paint::{self, Figure};
use crate::raster::{self, PixelBuffer, RasterError};
use crate::settings::{CanvasDimensions, CanvasSize, DrawingTool, HexColor, MirrorMode, MosaicRotation, Settings};
use crate::symmetry::Symmetry;
use crate::transform::{self, Viewport};
use kurbo::{Line, Point, Size};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Distance (in screen pixels at 100% zoom) within which a click on the first
/// vertex closes the polygon.
pub const CLOSE_DISTANCE: f64 = 15.0;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation would discard existing content and was not confirmed.
    #[error("Operation would discard existing content")]
    ConfirmationRequired,
    #[error("Image error: {0}")]
    Raster(#[from] RasterError),
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// What kind of state a mutation touched. Passed to the change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// An uncommitted preview was redrawn or discarded.
    Preview,
    /// A stroke or import was committed to the active layer.
    Committed,
    /// Undo or redo restored a previous state.
    History,
    Layers,
    Settings,
    /// Canvas dimensions changed; every layer was re-initialized.
    CanvasResized,
    View,
    /// A library record replaced the whole session state.
    Loaded,
}

/// Pointer interaction in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Idle,
    /// Click-drag shape from `start` (its center) to `current`.
    DrawingShape { start: Point, current: Point },
    /// Polygon vertices placed so far.
    DrawingPolygon { points: Vec<Point> },
}

/// One undo state: the flattened view plus the layer rasters it came from.
#[derive(Debug, Clone)]
struct Snapshot {
    composite: PixelBuffer,
    layers: Vec<(LayerId, PixelBuffer)>,
}

type Listener = Box<dyn FnMut(SessionChange)>;

/// A single open drawing.
pub struct DrawingSession {
    settings: Settings,
    /// Divisor applied to the preset canvas dimensions.
    canvas_scale: u32,
    dimensions: CanvasDimensions,
    camera: Camera,
    viewport: Option<Viewport>,
    layers: LayerStack,
    composite: PixelBuffer,
    history: History<Snapshot>,
    interaction: Interaction,
    /// Active layer raster captured when the current interaction began.
    saved_image: Option<PixelBuffer>,
    listener: Option<Listener>,
}

impl fmt::Debug for DrawingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingSession")
            .field("settings", &self.settings)
            .field("dimensions", &self.dimensions)
            .field("camera", &self.camera)
            .field("layers", &self.layers.len())
            .field("history", &self.history.len())
            .field("interaction", &self.interaction)
            .finish_non_exhaustive()
    }
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl DrawingSession {
    /// A session at full preset resolution.
    pub fn new(settings: Settings) -> Self {
        Self::with_scale(settings, 1)
    }

    /// A session whose canvas is the preset size divided by `canvas_scale`.
    pub fn with_scale(settings: Settings, canvas_scale: u32) -> Self {
        let settings = settings.sanitized();
        let canvas_scale = canvas_scale.max(1);
        let dimensions = settings.dimensions().scaled_down(canvas_scale);
        let layers = LayerStack::new(dimensions.width, dimensions.height, settings.color);
        let composite = layers.composite();
        let mut session = Self {
            settings,
            canvas_scale,
            dimensions,
            camera: Camera::new(),
            viewport: None,
            layers,
            composite,
            history: History::new(),
            interaction: Interaction::Idle,
            saved_image: None,
            listener: None,
        };
        session.reset_history();
        session
    }

    /// Register the change listener, replacing any previous one.
    pub fn on_change(&mut self, listener: impl FnMut(SessionChange) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn notify(&mut self, change: SessionChange) {
        if let Some(listener) = self.listener.as_mut() {
            listener(change);
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dimensions(&self) -> CanvasDimensions {
        self.dimensions
    }

    pub fn canvas_scale(&self) -> u32 {
        self.canvas_scale
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// The flattened canvas, including any uncommitted preview.
    pub fn composite(&self) -> &PixelBuffer {
        &self.composite
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn is_drawing(&self) -> bool {
        self.interaction != Interaction::Idle
    }

    /// Vertices of the polygon in progress.
    pub fn polygon_points(&self) -> &[Point] {
        match &self.interaction {
            Interaction::DrawingPolygon { points } => points,
            _ => &[],
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_index(&self) -> Option<usize> {
        self.history.index()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replication rule for the current settings and canvas.
    pub fn symmetry(&self) -> Symmetry {
        Symmetry::new(&self.settings, self.dimensions.size())
    }

    /// Mirror axes or mosaic tile boundaries to overlay, if enabled.
    pub fn guide_lines(&self) -> Vec<Line> {
        if self.settings.show_mirror_lines {
            self.symmetry().guide_lines()
        } else {
            Vec::new()
        }
    }

    /// Whether the flattened canvas holds anything but the white background.
    pub fn has_content(&self) -> bool {
        self.composite.has_content()
    }

    // --- View ---

    /// Attach (or resize) the on-screen container.
    pub fn attach_viewport(&mut self, container: Size) {
        self.viewport = Some(Viewport::new(container, self.dimensions.size()));
        self.notify(SessionChange::View);
    }

    pub fn detach_viewport(&mut self) {
        self.viewport = None;
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Container coordinates to snapped logical coordinates.
    pub fn to_logical(&self, device: Point) -> Point {
        transform::to_logical(device, self.viewport.as_ref(), &self.camera, &self.settings)
    }

    /// Logical coordinates to container coordinates, if a viewport is attached.
    pub fn to_screen(&self, point: Point) -> Option<Point> {
        self.viewport
            .as_ref()
            .and_then(|viewport| transform::to_screen(point, viewport, &self.camera))
    }

    pub fn start_pan(&mut self, pointer: Point) {
        self.camera.start_pan(pointer);
    }

    pub fn update_pan(&mut self, pointer: Point) {
        if self.camera.update_pan(pointer) {
            self.notify(SessionChange::View);
        }
    }

    pub fn end_pan(&mut self) {
        self.camera.end_pan();
    }

    pub fn is_panning(&self) -> bool {
        self.camera.is_panning()
    }

    /// Change zoom by `delta`, keeping `cursor` fixed on screen when given.
    pub fn zoom_by(&mut self, delta: f64, cursor: Option<Point>) {
        self.camera.zoom_by(delta, cursor);
        self.notify(SessionChange::View);
    }

    pub fn zoom_wheel(&mut self, delta_y: f64, cursor: Point) {
        self.camera.zoom_wheel(delta_y, cursor);
        self.notify(SessionChange::View);
    }

    /// Zoom about the container center (the origin without a viewport).
    pub fn zoom_on_center(&mut self, delta: f64) {
        match self.viewport {
            Some(viewport) => self.camera.zoom_on_center(delta, viewport.container),
            None => self.camera.zoom_by(delta, None),
        }
        self.notify(SessionChange::View);
    }

    pub fn reset_zoom_and_pan(&mut self) {
        self.camera.reset();
        self.notify(SessionChange::View);
    }

    // --- Drawing ---

    fn recomposite(&mut self) {
        self.composite = self.layers.composite();
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            composite: self.composite.clone(),
            layers: self.layers.snapshot(),
        }
    }

    fn push_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
    }

    fn reset_history(&mut self) {
        let snapshot = self.snapshot();
        self.history.reset(snapshot);
    }

    fn restore_saved_image(&mut self) {
        if let Some(saved) = &self.saved_image {
            *self.layers.active_canvas_mut() = saved.clone();
        }
    }

    /// Redraw the active layer as the saved image plus `figures`.
    fn draw_over_saved(&mut self, figures: &[Figure]) -> usize {
        self.restore_saved_image();
        let drawn = paint::paint_figures(self.layers.active_canvas_mut(), figures, self.settings.color);
        self.recomposite();
        drawn
    }

    /// Begin a click-drag shape at a logical point. Ignored unless the tool
    /// is a drag shape and nothing else is in progress.
    pub fn start_shape(&mut self, point: Point) -> bool {
        if !self.settings.drawing_tool.is_drag_shape() || self.is_drawing() {
            return false;
        }
        self.saved_image = self.layers.active().canvas().cloned();
        self.interaction = Interaction::DrawingShape {
            start: point,
            current: point,
        };
        log::debug!("Started {:?} at ({}, {})", self.settings.drawing_tool, point.x, point.y);
        true
    }

    /// Move the free end of the shape and redraw its preview.
    pub fn update_shape(&mut self, point: Point) {
        let Interaction::DrawingShape { start, .. } = self.interaction else {
            return;
        };
        self.interaction = Interaction::DrawingShape { start, current: point };
        let figures = paint::drag_figures(self.settings.drawing_tool, start, point, &self.symmetry());
        self.draw_over_saved(&figures);
        self.notify(SessionChange::Preview);
    }

    /// Bake the shape into the active layer. A zero-size shape is discarded
    /// without touching history. Returns whether anything was committed.
    pub fn finish_shape(&mut self, point: Point) -> bool {
        let Interaction::DrawingShape { start, .. } = self.interaction else {
            return false;
        };
        let figures = paint::drag_figures(self.settings.drawing_tool, start, point, &self.symmetry());
        let drawn = self.draw_over_saved(&figures);
        self.interaction = Interaction::Idle;
        self.saved_image = None;

        if drawn == 0 {
            log::debug!("Discarded zero-size {:?}", self.settings.drawing_tool);
            self.notify(SessionChange::Preview);
            return false;
        }
        self.push_history();
        log::debug!("Committed {} replicas", drawn);
        self.notify(SessionChange::Committed);
        true
    }

    /// Place a polygon vertex at a logical point.
    ///
    /// The first click starts the polygon. A click near the first vertex
    /// closes it once there are at least three vertices. Returns whether the
    /// polygon was finished by this click.
    pub fn add_polygon_point(&mut self, point: Point) -> bool {
        if self.settings.drawing_tool != DrawingTool::Polygon {
            return false;
        }
        match &mut self.interaction {
            Interaction::Idle => {
                self.saved_image = self.layers.active().canvas().cloned();
                self.interaction = Interaction::DrawingPolygon { points: vec![point] };
                log::debug!("Started polygon at ({}, {})", point.x, point.y);
            }
            Interaction::DrawingPolygon { points } => {
                let threshold = CLOSE_DISTANCE / self.camera.zoom();
                if points.len() >= 3 && (point - points[0]).hypot() < threshold {
                    return self.finish_polygon();
                }
                points.push(point);
            }
            Interaction::DrawingShape { .. } => return false,
        }
        self.redraw_polygon_preview(None);
        false
    }

    /// Redraw the open polygon with a rubber-band segment to `cursor`.
    pub fn update_polygon_preview(&mut self, cursor: Point) {
        self.redraw_polygon_preview(Some(cursor));
    }

    fn redraw_polygon_preview(&mut self, cursor: Option<Point>) {
        let Interaction::DrawingPolygon { points } = &self.interaction else {
            return;
        };
        let mut outline = points.clone();
        outline.extend(cursor);
        let figures = paint::polygon_figures(&outline, false, &self.symmetry());
        self.draw_over_saved(&figures);
        self.notify(SessionChange::Preview);
    }

    /// Close and bake the polygon. Fewer than three vertices cancels instead.
    pub fn finish_polygon(&mut self) -> bool {
        let Interaction::DrawingPolygon { points } = &self.interaction else {
            return false;
        };
        if points.len() < 3 {
            self.cancel_polygon();
            return false;
        }
        let figures = paint::polygon_figures(points, true, &self.symmetry());
        let vertices = points.len();
        self.draw_over_saved(&figures);
        self.interaction = Interaction::Idle;
        self.saved_image = None;
        self.push_history();
        log::debug!("Committed polygon with {} vertices", vertices);
        self.notify(SessionChange::Committed);
        true
    }

    /// Discard the polygon in progress without baking it.
    pub fn cancel_polygon(&mut self) {
        if matches!(self.interaction, Interaction::DrawingPolygon { .. }) {
            self.cancel_interaction();
        }
    }

    /// Abort whatever interaction is in progress and restore the saved image.
    pub fn cancel_interaction(&mut self) {
        if !self.is_drawing() {
            return;
        }
        self.restore_saved_image();
        self.recomposite();
        self.interaction = Interaction::Idle;
        self.saved_image = None;
        log::debug!("Cancelled interaction");
        self.notify(SessionChange::Preview);
    }

    pub fn undo(&mut self) -> bool {
        self.cancel_interaction();
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_interaction();
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(&snapshot);
        true
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.layers.restore_snapshot(&snapshot.layers);
        self.recomposite();
        if self.composite != snapshot.composite {
            log::debug!("Layer set changed since snapshot; composite rebuilt");
        }
        self.notify(SessionChange::History);
    }

    // --- Canvas ---

    fn confirm_destructive(&self, confirmed: bool, operation: &str) -> SessionResult<()> {
        if self.has_content() && !confirmed {
            log::warn!("Refusing to {} without confirmation", operation);
            return Err(SessionError::ConfirmationRequired);
        }
        Ok(())
    }

    /// Replace the active layer with `image` drawn aspect-fit and centered on
    /// a white fill.
    pub fn import_image(&mut self, image: &PixelBuffer, confirmed: bool) -> SessionResult<()> {
        self.confirm_destructive(confirmed, "import over existing content")?;
        self.cancel_interaction();

        let mut canvas = PixelBuffer::filled(self.dimensions.width, self.dimensions.height, BACKGROUND);
        canvas.draw_fitted(image);
        let id = self.layers.active_id();
        if let Some(layer) = self.layers.get_mut(id) {
            layer.replace_canvas(canvas);
        }
        self.recomposite();
        self.push_history();
        log::debug!("Imported {}x{} image", image.width(), image.height());
        self.notify(SessionChange::Committed);
        Ok(())
    }

    /// Decode encoded image bytes and import them.
    ///
    /// Confirmation is checked before decoding; a decode failure leaves the
    /// session untouched.
    pub async fn import_encoded(&mut self, bytes: Vec<u8>, confirmed: bool) -> SessionResult<()> {
        self.confirm_destructive(confirmed, "import over existing content")?;
        let image = raster::decode_image(bytes).await?;
        self.import_image(&image, true)
    }

    /// The composite to persist or export. An in-progress preview is excluded.
    fn committed_composite(&self) -> PixelBuffer {
        match &self.saved_image {
            Some(saved) if self.is_drawing() => self.layers.composite_with(Some((self.layers.active_id(), saved))),
            _ => self.composite.clone(),
        }
    }

    /// The layer set to persist. An in-progress preview is excluded.
    fn committed_layers(&self) -> Cow<'_, LayerStack> {
        match &self.saved_image {
            Some(saved) if self.is_drawing() => {
                let mut layers = self.layers.clone();
                let id = layers.active_id();
                if let Some(layer) = layers.get_mut(id) {
                    layer.replace_canvas(saved.clone());
                }
                Cow::Owned(layers)
            }
            _ => Cow::Borrowed(&self.layers),
        }
    }

    /// PNG encoding of the committed composite.
    pub fn export_png(&self) -> SessionResult<Vec<u8>> {
        Ok(self.committed_composite().encode_png()?)
    }

    /// Erase the active layer.
    pub fn clear_canvas(&mut self) {
        self.cancel_interaction();
        self.layers.active_canvas_mut().clear_all();
        self.recomposite();
        self.push_history();
        self.notify(SessionChange::Committed);
    }

    /// Switch the canvas size class. Every layer is re-created blank.
    pub fn set_canvas_size(&mut self, size: CanvasSize, confirmed: bool) -> SessionResult<()> {
        if size == self.settings.canvas_size {
            return Ok(());
        }
        self.confirm_destructive(confirmed, "resize a canvas with content")?;
        self.cancel_interaction();

        self.settings.canvas_size = size;
        self.apply_dimensions(size.dimensions().scaled_down(self.canvas_scale));
        self.layers.resize_all(self.dimensions.width, self.dimensions.height);
        self.recomposite();
        self.reset_history();
        log::debug!("Canvas resized to {}x{}", self.dimensions.width, self.dimensions.height);
        self.notify(SessionChange::CanvasResized);
        Ok(())
    }

    fn apply_dimensions(&mut self, dimensions: CanvasDimensions) {
        self.dimensions = dimensions;
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.canvas = dimensions.size();
        }
    }

    // --- Layers ---

    pub fn add_layer(&mut self) -> LayerId {
        self.cancel_interaction();
        let id = self.layers.add_layer(self.settings.color);
        self.notify(SessionChange::Layers);
        id
    }

    /// Remove a layer. If the active one goes, its replacement's color is adopted.
    pub fn remove_layer(&mut self, id: LayerId) -> SessionResult<()> {
        self.cancel_interaction();
        self.layers.remove_layer(id)?;
        self.settings.color = self.layers.active().color;
        self.recomposite();
        self.notify(SessionChange::Layers);
        Ok(())
    }

    pub fn reorder_layers(&mut self, from: usize, to: usize) -> SessionResult<()> {
        self.cancel_interaction();
        self.layers.reorder(from, to)?;
        self.recomposite();
        self.notify(SessionChange::Layers);
        Ok(())
    }

    /// Make a layer active and adopt its color.
    pub fn select_layer(&mut self, id: LayerId) -> SessionResult<()> {
        if id == self.layers.active_id() {
            return Ok(());
        }
        self.cancel_interaction();
        self.settings.color = self.layers.select(id)?;
        self.notify(SessionChange::Layers);
        Ok(())
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> SessionResult<()> {
        self.layers.set_visible(id, visible)?;
        self.recomposite();
        self.notify(SessionChange::Layers);
        Ok(())
    }

    pub fn rename_layer(&mut self, id: LayerId, name: &str) -> SessionResult<()> {
        self.layers.rename(id, name)?;
        self.notify(SessionChange::Layers);
        Ok(())
    }

    pub fn set_layer_color(&mut self, id: LayerId, color: HexColor) -> SessionResult<()> {
        self.layers.set_color(id, color)?;
        if id == self.layers.active_id() {
            self.settings.color = color;
        }
        self.notify(SessionChange::Layers);
        Ok(())
    }

    // --- Settings ---

    /// Set the drawing color. The active layer takes the same color.
    pub fn set_color(&mut self, color: HexColor) {
        self.settings.color = color;
        let active = self.layers.active_id();
        if let Some(layer) = self.layers.get_mut(active) {
            layer.color = color;
        }
        self.notify(SessionChange::Settings);
    }

    /// Switch tools. Any interaction in progress is cancelled.
    pub fn set_tool(&mut self, tool: DrawingTool) {
        if tool == self.settings.drawing_tool {
            return;
        }
        self.cancel_interaction();
        self.settings.drawing_tool = tool;
        self.notify(SessionChange::Settings);
    }

    pub fn set_mirror_mode(&mut self, mode: MirrorMode) {
        self.settings.mirror_mode = mode;
        self.notify(SessionChange::Settings);
    }

    pub fn set_mosaic_rotation(&mut self, rotation: MosaicRotation) {
        self.settings.mosaic_rotation = rotation;
        self.notify(SessionChange::Settings);
    }

    /// Set the mosaic grid; each axis is clamped into range.
    pub fn set_tile_counts(&mut self, x: u32, y: u32) {
        self.settings.set_tile_counts(x, y);
        self.notify(SessionChange::Settings);
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.settings.show_grid = show;
        self.notify(SessionChange::Settings);
    }

    pub fn set_grid_size(&mut self, size: f64) {
        self.settings.set_grid_size(size);
        self.notify(SessionChange::Settings);
    }

    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.settings.snap_to_grid = snap;
        self.notify(SessionChange::Settings);
    }

    pub fn set_show_mirror_lines(&mut self, show: bool) {
        self.settings.show_mirror_lines = show;
        self.notify(SessionChange::Settings);
    }

    // --- Library ---

    /// Save the committed drawing as a new library record.
    pub async fn save_to_library<S: Store>(&self, library: &Library<S>, name: Option<&str>) -> SessionResult<SavedDrawing> {
        let composite = self.committed_composite();
        let layers = self.committed_layers();
        Ok(library.save(&composite, &layers, &self.settings, name).await?)
    }

    /// Load a library record, replacing settings, canvas, layers and history.
    ///
    /// Any polygon in progress is cancelled first. If decoding fails the rest
    /// of the session is left as it was.
    pub async fn load_from_library(&mut self, record: &SavedDrawing) -> SessionResult<()> {
        self.cancel_interaction();
        let dimensions = record
            .settings
            .clone()
            .sanitized()
            .dimensions()
            .scaled_down(self.canvas_scale);
        let loaded = library::load(record, dimensions).await?;
        self.apply_loaded(loaded);
        log::debug!("Loaded drawing {} ({})", record.id, record.version);
        Ok(())
    }

    /// Replace the session state wholesale with a decoded drawing.
    pub fn apply_loaded(&mut self, loaded: LoadedDrawing) {
        self.interaction = Interaction::Idle;
        self.saved_image = None;
        self.settings = loaded.settings;
        self.apply_dimensions(loaded.dimensions);
        self.layers.replace_all(loaded.layers);
        self.composite = loaded.composite;
        self.reset_history();
        self.notify(SessionChange::Loaded);
    }
}

/// Suggested file name for an exported PNG.
pub fn export_file_name(unix_millis: i64) -> String {
    format!("mirror-drawing-{unix_millis}.png")
}

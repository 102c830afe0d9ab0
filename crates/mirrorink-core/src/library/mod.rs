//! Library of saved drawings, persisted as one JSON list in a blob store.

mod file;
mod memory;
mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{BoxFuture, Store, StoreError, StoreResult};

use crate::layers::{BACKGROUND, Layer, LayerStack};
use crate::raster::{self, PixelBuffer, RasterError};
use crate::settings::{CanvasDimensions, HexColor, Settings};
use chrono::{DateTime, Local};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Store key holding the whole library.
pub const STORAGE_KEY: &str = "mirror-drawing-library";
/// Schema version written by [`Library::save`].
pub const CURRENT_VERSION: &str = "2.0.0";
/// Schema version of single-image records without layers.
pub const LEGACY_VERSION: &str = "1.0.0";
/// Width of stored thumbnails. Height follows the canvas aspect ratio.
pub const THUMBNAIL_WIDTH: u32 = 300;

/// Library errors.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Storage quota exceeded")]
    QuotaExceeded,
    #[error("Storage error: {0}")]
    Store(StoreError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Image error: {0}")]
    Raster(#[from] RasterError),
    #[error("Drawing not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for LibraryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::QuotaExceeded => LibraryError::QuotaExceeded,
            other => LibraryError::Store(other),
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Serialization(err.to_string())
    }
}

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// One persisted layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLayer {
    pub id: String,
    pub name: String,
    pub color: HexColor,
    pub visible: bool,
    pub order: usize,
    /// PNG data URL of the layer raster.
    pub canvas_data: String,
}

/// One persisted drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDrawing {
    pub id: String,
    pub version: String,
    pub name: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    /// PNG data URL of the flattened composite.
    pub canvas_data: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<SavedLayer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_layer_id: Option<String>,
    #[serde(default)]
    pub settings: Settings,
}

impl SavedDrawing {
    /// Records without layers predate layer support.
    pub fn is_legacy(&self) -> bool {
        self.layers.is_none()
    }

    /// File name used when downloading the composite.
    pub fn download_file_name(&self) -> String {
        format!("{}.png", self.name)
    }

    /// Encoded PNG bytes of the composite.
    pub fn composite_png(&self) -> LibraryResult<Vec<u8>> {
        Ok(raster::data_url_bytes(&self.canvas_data)?)
    }
}

/// A decoded drawing ready to replace a session's state.
#[derive(Debug, Clone)]
pub struct LoadedDrawing {
    pub settings: Settings,
    pub dimensions: CanvasDimensions,
    pub layers: LayerStack,
    pub composite: PixelBuffer,
}

/// `Drawing - Mon D, YYYY, h:mm AM` for the given local time.
pub fn default_name(at: DateTime<Local>) -> String {
    format!("Drawing - {}", at.format("%b %-d, %Y, %-I:%M %p"))
}

fn generate_id(millis: i64) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(7).collect();
    format!("drawing-{millis}-{suffix}")
}

/// Thumbnail of `composite` at [`THUMBNAIL_WIDTH`] preserving aspect ratio.
pub fn thumbnail(composite: &PixelBuffer) -> PixelBuffer {
    let (width, height) = composite.dimensions();
    let aspect = width as f64 / height.max(1) as f64;
    let thumb_height = ((THUMBNAIL_WIDTH as f64 / aspect).round() as u32).max(1);
    composite.stretched(THUMBNAIL_WIDTH, thumb_height)
}

/// Library operations over a blob store.
pub struct Library<S: Store> {
    store: S,
}

impl<S: Store> Library<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the stored list as is. Missing storage is an empty list.
    async fn read_all(&self) -> LibraryResult<Vec<SavedDrawing>> {
        match self.store.get(STORAGE_KEY).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// The list a mutation starts from. Store failures propagate so a failed
    /// read never rewrites the library; unparsable JSON is replaced.
    async fn read_for_update(&self) -> LibraryResult<Vec<SavedDrawing>> {
        match self.read_all().await {
            Err(LibraryError::Serialization(e)) => {
                log::warn!("Discarding unreadable library data: {}", e);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn write_all(&self, drawings: &[SavedDrawing]) -> LibraryResult<()> {
        let json = serde_json::to_vec(drawings)?;
        self.store.set(STORAGE_KEY, json).await?;
        Ok(())
    }

    /// All drawings, newest first. Unreadable storage yields an empty list.
    pub async fn list(&self) -> Vec<SavedDrawing> {
        match self.read_all().await {
            Ok(mut drawings) => {
                drawings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                drawings
            }
            Err(e) => {
                log::error!("Error loading drawings from storage: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Option<SavedDrawing> {
        self.list().await.into_iter().find(|d| d.id == id)
    }

    /// Save the current drawing as a new record at the front of the library.
    pub async fn save(
        &self,
        composite: &PixelBuffer,
        layers: &LayerStack,
        settings: &Settings,
        name: Option<&str>,
    ) -> LibraryResult<SavedDrawing> {
        self.save_at(composite, layers, settings, name, Local::now()).await
    }

    /// [`save`](Self::save) with an explicit clock.
    pub async fn save_at(
        &self,
        composite: &PixelBuffer,
        layers: &LayerStack,
        settings: &Settings,
        name: Option<&str>,
        now: DateTime<Local>,
    ) -> LibraryResult<SavedDrawing> {
        let millis = now.timestamp_millis();

        let saved_layers = layers
            .iter()
            .map(|layer| {
                let canvas_data = match layer.canvas() {
                    Some(canvas) => canvas.encode_data_url()?,
                    None => PixelBuffer::new(layers.width(), layers.height()).encode_data_url()?,
                };
                Ok(SavedLayer {
                    id: layer.id().to_string(),
                    name: layer.name.clone(),
                    color: layer.color,
                    visible: layer.visible,
                    order: layer.order(),
                    canvas_data,
                })
            })
            .collect::<LibraryResult<Vec<_>>>()?;

        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => default_name(now),
        };

        let drawing = SavedDrawing {
            id: generate_id(millis),
            version: CURRENT_VERSION.to_string(),
            name,
            timestamp: millis,
            canvas_data: composite.encode_data_url()?,
            thumbnail: thumbnail(composite).encode_data_url()?,
            layers: Some(saved_layers),
            active_layer_id: Some(layers.active_id().to_string()),
            settings: settings.clone(),
        };

        let mut drawings = self.read_for_update().await?;
        drawings.insert(0, drawing.clone());
        self.write_all(&drawings).await?;

        log::debug!("Saved drawing {} ({} layers)", drawing.id, layers.len());
        Ok(drawing)
    }

    /// Remove a drawing. Unknown ids are ignored.
    pub async fn delete(&self, id: &str) -> LibraryResult<()> {
        let mut drawings = self.read_for_update().await?;
        drawings.retain(|d| d.id != id);
        self.write_all(&drawings).await
    }

    /// Rename a drawing. An empty name is replaced by the default name.
    pub async fn rename(&self, id: &str, name: &str) -> LibraryResult<()> {
        let mut drawings = self.read_for_update().await?;
        let drawing = drawings
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        let trimmed = name.trim();
        drawing.name = if trimmed.is_empty() {
            default_name(Local::now())
        } else {
            trimmed.to_string()
        };
        self.write_all(&drawings).await
    }
}

/// Decode a record into a layer set sized to `dimensions`.
///
/// Every layer is decoded before anything is returned; a single failure fails
/// the whole load.
pub async fn load(record: &SavedDrawing, dimensions: CanvasDimensions) -> LibraryResult<LoadedDrawing> {
    let settings = record.settings.clone().sanitized();
    let (width, height) = (dimensions.width, dimensions.height);

    let layers = match &record.layers {
        Some(saved) if !saved.is_empty() => load_layers(record, saved, width, height).await?,
        _ => load_legacy(record, settings.color, width, height).await?,
    };

    let composite = layers.composite();
    Ok(LoadedDrawing {
        settings,
        dimensions,
        layers,
        composite,
    })
}

async fn load_layers(record: &SavedDrawing, saved: &[SavedLayer], width: u32, height: u32) -> LibraryResult<LayerStack> {
    let decoded = try_join_all(saved.iter().map(|l| raster::decode_data_url(l.canvas_data.clone()))).await?;

    let layers: Vec<Layer> = saved
        .iter()
        .zip(decoded)
        .map(|(s, canvas)| {
            let id = Uuid::parse_str(&s.id).unwrap_or_else(|_| Uuid::new_v4());
            Layer::restore(id, s.name.clone(), s.color, s.visible, s.order, canvas)
        })
        .collect();

    let active = record
        .active_layer_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .filter(|id| layers.iter().any(|l| l.id() == *id))
        .or_else(|| layers.first().map(Layer::id))
        .unwrap_or_default();

    LayerStack::from_layers(layers, active, width, height)
        .ok_or_else(|| LibraryError::Serialization("drawing has no layers".to_string()))
}

async fn load_legacy(record: &SavedDrawing, color: HexColor, width: u32, height: u32) -> LibraryResult<LayerStack> {
    let image = raster::decode_data_url(record.canvas_data.clone()).await?;
    let mut canvas = PixelBuffer::filled(width, height, BACKGROUND);
    canvas.draw_over(&image.stretched(width, height));

    let layer = Layer::restore(Uuid::new_v4(), "Layer 1".to_string(), color, true, 0, canvas);
    let active = layer.id();
    LayerStack::from_layers(vec![layer], active, width, height)
        .ok_or_else(|| LibraryError::Serialization("drawing has no layers".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pollster::block_on;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn dims(width: u32, height: u32) -> CanvasDimensions {
        CanvasDimensions {
            width,
            height,
            aspect_ratio: "4 / 3",
        }
    }

    fn three_layer_stack() -> LayerStack {
        let mut stack = LayerStack::new(8, 6, HexColor::BLACK);
        stack.active_canvas_mut().fill(RED);
        let second = stack.add_layer(HexColor::new(0, 0, 255));
        stack.active_canvas_mut().put_pixels(&PixelBuffer::filled(2, 2, BLUE), (0, 0));
        stack.add_layer(HexColor::WHITE);
        stack.set_visible(second, false).unwrap();
        stack.rename(second, "Blue").unwrap();
        stack
    }

    #[test]
    fn test_default_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(default_name(at), "Drawing - Mar 5, 2024, 2:07 PM");
    }

    #[test]
    fn test_thumbnail_keeps_aspect() {
        let thumb = thumbnail(&PixelBuffer::new(3200, 2400));
        assert_eq!(thumb.dimensions(), (300, 225));
    }

    #[test]
    fn test_save_prepends_and_lists_newest_first() {
        let library = Library::new(MemoryStore::new());
        let stack = three_layer_stack();
        let composite = stack.composite();
        let settings = Settings::default();

        let first = block_on(library.save(&composite, &stack, &settings, Some("First"))).unwrap();
        let second = block_on(library.save(&composite, &stack, &settings, None)).unwrap();

        assert_eq!(first.version, CURRENT_VERSION);
        assert!(first.id.starts_with("drawing-"));
        assert!(second.name.starts_with("Drawing - "));
        assert_eq!(first.layers.as_ref().map(Vec::len), Some(3));

        let listed = block_on(library.list());
        assert_eq!(listed.len(), 2);
        assert!(listed[0].timestamp >= listed[1].timestamp);
    }

    #[test]
    fn test_list_corrupt_storage_is_empty() {
        let store = MemoryStore::new();
        block_on(store.set(STORAGE_KEY, b"{not json".to_vec())).unwrap();
        let library = Library::new(store);
        assert!(block_on(library.list()).is_empty());
    }

    #[test]
    fn test_rename_and_delete() {
        let library = Library::new(MemoryStore::new());
        let stack = LayerStack::new(4, 4, HexColor::BLACK);
        let saved = block_on(library.save(&stack.composite(), &stack, &Settings::default(), Some("A"))).unwrap();

        block_on(library.rename(&saved.id, "  Renamed  ")).unwrap();
        assert_eq!(block_on(library.get(&saved.id)).unwrap().name, "Renamed");

        block_on(library.rename(&saved.id, "   ")).unwrap();
        assert!(block_on(library.get(&saved.id)).unwrap().name.starts_with("Drawing - "));

        assert!(matches!(
            block_on(library.rename("missing", "x")),
            Err(LibraryError::NotFound(_))
        ));

        block_on(library.delete("missing")).unwrap();
        block_on(library.delete(&saved.id)).unwrap();
        assert!(block_on(library.list()).is_empty());
    }

    /// Store whose reads always fail and whose writes are recorded.
    #[derive(Default)]
    struct UnreadableStore {
        writes: std::sync::Mutex<usize>,
    }

    impl Store for UnreadableStore {
        fn get(&self, _key: &str) -> BoxFuture<'_, StoreResult<Option<Vec<u8>>>> {
            Box::pin(async { Err(StoreError::Io("permission denied".to_string())) })
        }

        fn set(&self, _key: &str, _value: Vec<u8>) -> BoxFuture<'_, StoreResult<()>> {
            Box::pin(async {
                *self.writes.lock().unwrap() += 1;
                Ok(())
            })
        }

        fn remove(&self, _key: &str) -> BoxFuture<'_, StoreResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_read_failure_never_rewrites_library() {
        let library = Library::new(UnreadableStore::default());
        let stack = LayerStack::new(4, 4, HexColor::BLACK);

        assert!(block_on(library.list()).is_empty());
        assert!(matches!(
            block_on(library.save(&stack.composite(), &stack, &Settings::default(), None)),
            Err(LibraryError::Store(StoreError::Io(_)))
        ));
        assert!(matches!(
            block_on(library.delete("drawing-1")),
            Err(LibraryError::Store(_))
        ));
        assert!(matches!(
            block_on(library.rename("drawing-1", "x")),
            Err(LibraryError::Store(_))
        ));
        assert_eq!(*library.store().writes.lock().unwrap(), 0);
    }

    #[test]
    fn test_save_replaces_corrupt_storage() {
        let store = MemoryStore::new();
        block_on(store.set(STORAGE_KEY, b"{not json".to_vec())).unwrap();
        let library = Library::new(store);
        let stack = LayerStack::new(4, 4, HexColor::BLACK);
        let saved = block_on(library.save(&stack.composite(), &stack, &Settings::default(), None)).unwrap();
        let listed = block_on(library.list());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, saved.id);
    }

    #[test]
    fn test_quota_is_distinct_error() {
        let library = Library::new(MemoryStore::with_quota(16));
        let stack = LayerStack::new(4, 4, HexColor::BLACK);
        let err = block_on(library.save(&stack.composite(), &stack, &Settings::default(), None)).unwrap_err();
        assert!(matches!(err, LibraryError::QuotaExceeded));
    }

    #[test]
    fn test_load_v2_restores_layers() {
        let library = Library::new(MemoryStore::new());
        let stack = three_layer_stack();
        let saved = block_on(library.save(&stack.composite(), &stack, &Settings::default(), None)).unwrap();

        let loaded = block_on(load(&saved, dims(16, 12))).unwrap();
        assert_eq!(loaded.layers.len(), 3);
        assert_eq!(loaded.layers.active_id(), stack.active_id());

        for (original, restored) in stack.iter().zip(loaded.layers.iter()) {
            assert_eq!(original.id(), restored.id());
            assert_eq!(original.name, restored.name);
            assert_eq!(original.visible, restored.visible);
            assert_eq!(original.order(), restored.order());
            assert_eq!(original.color, restored.color);
            assert_eq!(restored.canvas().map(PixelBuffer::dimensions), Some((16, 12)));
        }
        // The hidden blue layer does not show through.
        assert_eq!(loaded.composite.pixel(0, 0), Some(RED));
    }

    #[test]
    fn test_load_v1_builds_single_layer() {
        let image = PixelBuffer::filled(4, 3, RED);
        let record = SavedDrawing {
            id: "drawing-1-abcdefg".to_string(),
            version: LEGACY_VERSION.to_string(),
            name: "Old".to_string(),
            timestamp: 1,
            canvas_data: image.encode_data_url().unwrap(),
            thumbnail: String::new(),
            layers: None,
            active_layer_id: None,
            settings: Settings {
                color: HexColor::WHITE,
                ..Settings::default()
            },
        };

        let loaded = block_on(load(&record, dims(8, 6))).unwrap();
        assert_eq!(loaded.layers.len(), 1);
        let layer = loaded.layers.active();
        assert_eq!(layer.name, "Layer 1");
        assert_eq!(layer.color, HexColor::WHITE);
        assert_eq!(layer.canvas().and_then(|c| c.pixel(7, 5)), Some(RED));
        assert_eq!(loaded.composite.pixel(0, 0), Some(RED));
    }

    #[test]
    fn test_parse_legacy_record_json() {
        let json = r#"{
            "id": "drawing-1700000000000-k3j4h5g",
            "version": "1.0.0",
            "name": "Legacy",
            "timestamp": 1700000000000,
            "canvasData": "data:image/png;base64,AAAA",
            "thumbnail": "",
            "settings": {
                "canvasSize": "portrait",
                "mirrorMode": "vertical",
                "color": "white",
                "drawingTool": "circle",
                "showGrid": true,
                "gridSize": 25,
                "snapToGrid": false,
                "showMirrorLines": true
            }
        }"#;
        let record: SavedDrawing = serde_json::from_str(json).unwrap();
        assert!(record.is_legacy());
        assert_eq!(record.settings.color, HexColor::WHITE);
        assert_eq!(record.settings.mosaic_tile_count_x, 2);
        assert_eq!(record.download_file_name(), "Legacy.png");
    }

    #[test]
    fn test_load_fails_whole_on_bad_layer() {
        let library = Library::new(MemoryStore::new());
        let stack = three_layer_stack();
        let mut saved = block_on(library.save(&stack.composite(), &stack, &Settings::default(), None)).unwrap();
        if let Some(layers) = saved.layers.as_mut() {
            layers[1].canvas_data = "data:image/png;base64,AAAA".to_string();
        }
        assert!(matches!(
            block_on(load(&saved, dims(8, 6))),
            Err(LibraryError::Raster(_))
        ));
    }

    #[test]
    fn test_composite_png_roundtrips_bytes() {
        let library = Library::new(MemoryStore::new());
        let stack = LayerStack::new(4, 4, HexColor::BLACK);
        let composite = stack.composite();
        let saved = block_on(library.save(&composite, &stack, &Settings::default(), None)).unwrap();
        assert_eq!(saved.composite_png().unwrap(), composite.encode_png().unwrap());
    }
}

//! MirrorInk Core Library
//!
//! Symmetry and mosaic replication, layered raster compositing, undo history
//! and the saved-drawing library for the MirrorInk kaleidoscope canvas.

pub mod camera;
pub mod history;
pub mod input;
pub mod layers;
pub mod library;
pub mod mosaic;
pub mod paint;
pub mod raster;
pub mod session;
pub mod settings;
pub mod snap;
pub mod symmetry;
pub mod transform;

pub use camera::Camera;
pub use history::{History, MAX_HISTORY};
pub use input::{InputController, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use layers::{Layer, LayerError, LayerId, LayerStack};
pub use library::{FileStore, Library, LibraryError, MemoryStore, SavedDrawing, SavedLayer, Store, StoreError};
pub use mosaic::{MosaicGrid, TileInfo};
pub use paint::Figure;
pub use raster::{PixelBuffer, PixelRect, RasterError};
pub use session::{DrawingSession, Interaction, SessionChange, SessionError, export_file_name};
pub use settings::{CanvasDimensions, CanvasSize, DrawingTool, HexColor, MirrorMode, MosaicRotation, Settings};
pub use snap::{SnapResult, snap_point, snap_to_grid, snap_to_mirror_lines};
pub use symmetry::Symmetry;
pub use transform::{Viewport, to_logical, to_screen};

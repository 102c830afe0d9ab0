//! Layer collection and compositing.

use crate::raster::PixelBuffer;
use crate::settings::HexColor;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a layer.
pub type LayerId = Uuid;

/// Background the composite is painted on.
pub const BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// Layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Cannot remove the last layer")]
    LastLayer,
    #[error("Layer not found: {0}")]
    NotFound(LayerId),
    #[error("Layer index out of range: {0}")]
    IndexOutOfRange(usize),
}

/// A single independently drawable raster layer.
#[derive(Debug, Clone)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub name: String,
    pub color: HexColor,
    pub visible: bool,
    /// Paint order, ascending. Kept dense by [`LayerStack`].
    pub(crate) order: usize,
    canvas: Option<PixelBuffer>,
}

impl Layer {
    /// A new visible layer with no raster yet.
    pub fn new(name: impl Into<String>, color: HexColor) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color,
            visible: true,
            order: 0,
            canvas: None,
        }
    }

    /// Rebuild a layer from persisted parts.
    pub fn restore(id: LayerId, name: String, color: HexColor, visible: bool, order: usize, canvas: PixelBuffer) -> Self {
        Self {
            id,
            name,
            color,
            visible,
            order,
            canvas: Some(canvas),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn canvas(&self) -> Option<&PixelBuffer> {
        self.canvas.as_ref()
    }

    /// The raster, created blank at `width` x `height` if uninitialized.
    pub fn canvas_mut(&mut self, width: u32, height: u32) -> &mut PixelBuffer {
        self.canvas.get_or_insert_with(|| PixelBuffer::new(width, height))
    }

    /// Replace the raster wholesale, returning the previous one.
    pub fn replace_canvas(&mut self, canvas: PixelBuffer) -> Option<PixelBuffer> {
        self.canvas.replace(canvas)
    }
}

/// The ordered set of layers of one drawing. Never empty.
///
/// Layers are stored in paint order; each layer's `order` equals its index.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: LayerId,
    width: u32,
    height: u32,
    next_number: usize,
}

impl LayerStack {
    /// A stack with a single blank layer.
    pub fn new(width: u32, height: u32, color: HexColor) -> Self {
        let mut layer = Layer::new("Layer 1", color);
        layer.canvas = Some(PixelBuffer::new(width, height));
        let active = layer.id;
        Self {
            layers: vec![layer],
            active,
            width,
            height,
            next_number: 2,
        }
    }

    /// Build a stack from existing layers, sorted by their `order` field.
    ///
    /// Returns `None` for an empty set. Rasters are stretched to the stack size
    /// and missing ones are created blank. An unknown `active` id falls back to
    /// the first layer in paint order.
    pub fn from_layers(mut layers: Vec<Layer>, active: LayerId, width: u32, height: u32) -> Option<Self> {
        if layers.is_empty() {
            return None;
        }
        layers.sort_by_key(|l| l.order);
        for layer in &mut layers {
            let canvas = match layer.canvas.take() {
                Some(c) => c.stretched(width, height),
                None => PixelBuffer::new(width, height),
            };
            layer.canvas = Some(canvas);
        }

        let active = if layers.iter().any(|l| l.id == active) {
            active
        } else {
            layers[0].id
        };
        let next_number = layers.len() + 1;
        let mut stack = Self {
            layers,
            active,
            width,
            height,
            next_number,
        };
        stack.renormalize();
        Some(stack)
    }

    fn renormalize(&mut self) {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.order = i;
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in paint order (bottom to top).
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn active_id(&self) -> LayerId {
        self.active
    }

    pub fn active(&self) -> &Layer {
        let index = self.index_of(self.active).unwrap_or(0);
        &self.layers[index]
    }

    /// Mutable raster of the active layer.
    pub fn active_canvas_mut(&mut self) -> &mut PixelBuffer {
        let (width, height) = (self.width, self.height);
        let index = self.index_of(self.active).unwrap_or(0);
        self.layers[index].canvas_mut(width, height)
    }

    /// Append a blank layer at the top of the paint order and make it active.
    pub fn add_layer(&mut self, color: HexColor) -> LayerId {
        let mut layer = Layer::new(format!("Layer {}", self.next_number), color);
        self.next_number += 1;
        layer.canvas = Some(PixelBuffer::new(self.width, self.height));
        layer.order = self.layers.len();
        let id = layer.id;
        self.layers.push(layer);
        self.active = id;
        id
    }

    /// Remove a layer. The last remaining layer can never be removed.
    ///
    /// If the active layer is removed, the layer now at the same index
    /// (clamped to the end) becomes active.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, LayerError> {
        if self.layers.len() <= 1 {
            return Err(LayerError::LastLayer);
        }
        let index = self.index_of(id).ok_or(LayerError::NotFound(id))?;
        let removed = self.layers.remove(index);
        self.renormalize();
        if removed.id == self.active {
            let next = index.min(self.layers.len() - 1);
            self.active = self.layers[next].id;
        }
        Ok(removed)
    }

    /// Move the layer at paint position `from` to position `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), LayerError> {
        let len = self.layers.len();
        if from >= len {
            return Err(LayerError::IndexOutOfRange(from));
        }
        if to >= len {
            return Err(LayerError::IndexOutOfRange(to));
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.renormalize();
        Ok(())
    }

    /// Make a layer active. Returns its color, which becomes the drawing color.
    pub fn select(&mut self, id: LayerId) -> Result<HexColor, LayerError> {
        let color = self.get(id).ok_or(LayerError::NotFound(id))?.color;
        self.active = id;
        Ok(color)
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<(), LayerError> {
        self.get_mut(id).ok_or(LayerError::NotFound(id))?.visible = visible;
        Ok(())
    }

    pub fn rename(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), LayerError> {
        self.get_mut(id).ok_or(LayerError::NotFound(id))?.name = name.into();
        Ok(())
    }

    pub fn set_color(&mut self, id: LayerId, color: HexColor) -> Result<(), LayerError> {
        self.get_mut(id).ok_or(LayerError::NotFound(id))?.color = color;
        Ok(())
    }

    /// Discard every raster and re-create them blank at a new size.
    pub fn resize_all(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        for layer in &mut self.layers {
            layer.canvas = Some(PixelBuffer::new(width, height));
        }
    }

    /// Replace the whole stack, taking ownership of the new layers.
    pub fn replace_all(&mut self, other: LayerStack) {
        *self = other;
    }

    /// Flatten visible layers in paint order onto the white background.
    pub fn composite(&self) -> PixelBuffer {
        self.composite_with(None)
    }

    /// Like [`composite`](Self::composite), but with one layer's raster
    /// substituted (used to hide an uncommitted preview).
    pub fn composite_with(&self, substitute: Option<(LayerId, &PixelBuffer)>) -> PixelBuffer {
        let mut target = PixelBuffer::filled(self.width, self.height, BACKGROUND);
        for layer in self.layers.iter().filter(|l| l.visible) {
            let canvas = match substitute {
                Some((id, canvas)) if id == layer.id => Some(canvas),
                _ => layer.canvas.as_ref(),
            };
            if let Some(canvas) = canvas {
                target.draw_over(canvas);
            }
        }
        target
    }

    /// Copy of every layer raster, keyed by layer id.
    pub fn snapshot(&self) -> Vec<(LayerId, PixelBuffer)> {
        self.layers
            .iter()
            .filter_map(|l| l.canvas.clone().map(|c| (l.id, c)))
            .collect()
    }

    /// Restore rasters from a snapshot. Layers created after the snapshot
    /// are blanked; entries for deleted layers are ignored.
    pub fn restore_snapshot(&mut self, snapshot: &[(LayerId, PixelBuffer)]) {
        let (width, height) = (self.width, self.height);
        for layer in &mut self.layers {
            let canvas = match snapshot.iter().find(|(id, _)| *id == layer.id) {
                Some((_, canvas)) => canvas.clone(),
                None => PixelBuffer::new(width, height),
            };
            layer.canvas = Some(canvas);
        }
    }
}

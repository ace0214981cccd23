//! Decoded images and the reverse index from images to the display
//! objects drawing them.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::display::DisplayId;
use crate::error::Result;
use crate::hash::next_hash_code;

/// Identity of a [`BitmapData`], stable for its whole lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct BitmapId(u64);

impl BitmapId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Where the pixels of a bitmap live.
#[derive(Clone, Debug)]
pub enum BitmapSource {
    /// Straight-alpha RGBA pixels in memory.
    Pixels(Arc<RgbaImage>),
    /// A surface owned by a renderer (a cached display list or render
    /// texture). Only the renderer that produced it can sample it.
    Surface,
}

#[derive(Clone, Debug)]
pub struct BitmapData {
    pub width: u32,
    pub height: u32,
    pub source: BitmapSource,
    /// Bumped whenever the pixels change so GPU copies can be refreshed.
    pub revision: u64,
}

impl BitmapData {
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            source: BitmapSource::Pixels(Arc::new(image)),
            revision: 0,
        }
    }

    /// Wrap raw RGBA bytes. Returns `None` when the buffer does not match
    /// the given dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(Self::from_image)
    }

    /// Decode PNG, JPEG, GIF or WebP bytes.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(image.to_rgba8()))
    }

    /// Placeholder for pixels owned by a renderer surface.
    pub fn surface(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            source: BitmapSource::Surface,
            revision: 0,
        }
    }

    pub fn pixels(&self) -> Option<&Arc<RgbaImage>> {
        match &self.source {
            BitmapSource::Pixels(image) => Some(image),
            BitmapSource::Surface => None,
        }
    }
}

/// Owns every [`BitmapData`] of a scene plus the reverse index used to
/// notify dependents when an image changes or goes away.
#[derive(Default)]
pub struct BitmapRegistry {
    bitmaps: HashMap<BitmapId, BitmapData>,
    dependents: HashMap<BitmapId, Vec<DisplayId>>,
    disposed: Vec<BitmapId>,
}

impl BitmapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, data: BitmapData) -> BitmapId {
        let id = BitmapId(next_hash_code());
        self.bitmaps.insert(id, data);
        id
    }

    pub fn get(&self, id: BitmapId) -> Option<&BitmapData> {
        self.bitmaps.get(&id)
    }

    pub fn get_mut(&mut self, id: BitmapId) -> Option<&mut BitmapData> {
        self.bitmaps.get_mut(&id)
    }

    pub fn contains(&self, id: BitmapId) -> bool {
        self.bitmaps.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    /// Replace the pixels of an existing bitmap in place.
    pub fn update_pixels(&mut self, id: BitmapId, image: RgbaImage) {
        if let Some(data) = self.bitmaps.get_mut(&id) {
            data.width = image.width();
            data.height = image.height();
            data.source = BitmapSource::Pixels(Arc::new(image));
            data.revision += 1;
        }
    }

    /// Record that `object` draws `id`. Adding twice is a no-op.
    pub fn add_dependent(&mut self, id: BitmapId, object: DisplayId) {
        let list = self.dependents.entry(id).or_default();
        if !list.contains(&object) {
            list.push(object);
        }
    }

    pub fn remove_dependent(&mut self, id: BitmapId, object: DisplayId) {
        if let Some(list) = self.dependents.get_mut(&id) {
            list.retain(|&o| o != object);
        }
    }

    pub fn dependents(&self, id: BitmapId) -> &[DisplayId] {
        self.dependents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop the bitmap and its index entry, returning the former dependents.
    pub(crate) fn remove(&mut self, id: BitmapId) -> Vec<DisplayId> {
        if self.bitmaps.remove(&id).is_some() {
            self.disposed.push(id);
        }
        self.dependents.remove(&id).unwrap_or_default()
    }

    /// Bitmaps disposed since the last call, for releasing GPU copies.
    pub fn take_disposed(&mut self) -> Vec<BitmapId> {
        std::mem::take(&mut self.disposed)
    }
}

//! The raster engine boundary.
//!
//! The core never owns raster memory. It talks to an [`ImageEngine`], the
//! sole owner of pixel storage, through bounded one-scanline windows: a read
//! window fills a caller-owned row buffer, a commit window writes one back.
//! [`MemoryEngine`] is an in-process implementation used by the tests and as
//! a reference for binding a real engine.

use std::collections::HashMap;

use crate::{
    error::{ChanfxError, ChanfxResult},
    pixel::{Pixel, Quantum},
};

/// Failure signal from the engine, distinguishable from an empty result.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct EngineFailure(String);

impl EngineFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        EngineFailure(msg.into())
    }
}

/// Owner of raster storage: allocation, destruction, scanline windows, and
/// the runtime quantum maximum.
pub trait ImageEngine {
    /// Opaque handle to an engine-owned image.
    type Handle;

    /// The engine build's per-channel maximum `Q`.
    fn quantum_max(&self) -> Quantum;

    fn dimensions(&self, image: &Self::Handle) -> Result<(u32, u32), EngineFailure>;

    /// Allocate a fresh image with the same dimensions and storage class as
    /// `source`. Pixel contents are unspecified until committed.
    fn allocate_like(&mut self, source: &Self::Handle) -> Result<Self::Handle, EngineFailure>;

    /// Destroy an image. Used to discard a partially built destination.
    fn release(&mut self, image: Self::Handle);

    /// Fill `row` from the scanline at `y`; `row` must span the full width.
    fn read_window(
        &self,
        image: &Self::Handle,
        y: u32,
        row: &mut [Pixel],
    ) -> Result<(), EngineFailure>;

    /// Commit `row` as the scanline at `y`.
    fn commit_window(
        &mut self,
        image: &mut Self::Handle,
        y: u32,
        row: &[Pixel],
    ) -> Result<(), EngineFailure>;
}

/// Handle into a [`MemoryEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

#[derive(Clone, Debug)]
struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

/// In-process image engine holding rasters in row-major `Vec<Pixel>` buffers.
#[derive(Debug)]
pub struct MemoryEngine {
    quantum: Quantum,
    images: HashMap<ImageId, RasterImage>,
    next_id: u64,
}

impl MemoryEngine {
    pub fn new(quantum: Quantum) -> Self {
        MemoryEngine {
            quantum,
            images: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register an image from row-major pixels.
    pub fn insert_image(
        &mut self,
        width: u32,
        height: u32,
        pixels: Vec<Pixel>,
    ) -> ChanfxResult<ImageId> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| ChanfxError::validation("image size overflow"))?;
        if pixels.len() != expected {
            return Err(ChanfxError::validation(format!(
                "expected {expected} pixels for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        let id = ImageId(self.next_id);
        self.next_id += 1;
        self.images.insert(
            id,
            RasterImage {
                width,
                height,
                pixels,
            },
        );
        Ok(id)
    }

    /// Number of live images; lets tests assert that aborted traversals do
    /// not leak a destination.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn pixels(&self, image: ImageId) -> Option<&[Pixel]> {
        self.images.get(&image).map(|img| img.pixels.as_slice())
    }

    pub fn pixel(&self, image: ImageId, x: u32, y: u32) -> Option<Pixel> {
        let img = self.images.get(&image)?;
        if x >= img.width || y >= img.height {
            return None;
        }
        Some(img.pixels[y as usize * img.width as usize + x as usize])
    }

    fn image(&self, id: ImageId) -> Result<&RasterImage, EngineFailure> {
        self.images
            .get(&id)
            .ok_or_else(|| EngineFailure::new(format!("unknown image handle {id:?}")))
    }
}

impl ImageEngine for MemoryEngine {
    type Handle = ImageId;

    fn quantum_max(&self) -> Quantum {
        self.quantum
    }

    fn dimensions(&self, image: &ImageId) -> Result<(u32, u32), EngineFailure> {
        let img = self.image(*image)?;
        Ok((img.width, img.height))
    }

    fn allocate_like(&mut self, source: &ImageId) -> Result<ImageId, EngineFailure> {
        let (width, height) = self.dimensions(source)?;
        let id = ImageId(self.next_id);
        self.next_id += 1;
        self.images.insert(
            id,
            RasterImage {
                width,
                height,
                pixels: vec![Pixel::default(); width as usize * height as usize],
            },
        );
        Ok(id)
    }

    fn release(&mut self, image: ImageId) {
        self.images.remove(&image);
    }

    fn read_window(&self, image: &ImageId, y: u32, row: &mut [Pixel]) -> Result<(), EngineFailure> {
        let img = self.image(*image)?;
        if y >= img.height {
            return Err(EngineFailure::new(format!(
                "row {y} out of bounds (height {})",
                img.height
            )));
        }
        if row.len() != img.width as usize {
            return Err(EngineFailure::new(format!(
                "window width {} does not match image width {}",
                row.len(),
                img.width
            )));
        }
        let start = y as usize * img.width as usize;
        row.copy_from_slice(&img.pixels[start..start + img.width as usize]);
        Ok(())
    }

    fn commit_window(
        &mut self,
        image: &mut ImageId,
        y: u32,
        row: &[Pixel],
    ) -> Result<(), EngineFailure> {
        let img = self
            .images
            .get_mut(image)
            .ok_or_else(|| EngineFailure::new(format!("unknown image handle {image:?}")))?;
        if y >= img.height {
            return Err(EngineFailure::new(format!(
                "row {y} out of bounds (height {})",
                img.height
            )));
        }
        if row.len() != img.width as usize {
            return Err(EngineFailure::new(format!(
                "window width {} does not match image width {}",
                row.len(),
                img.width
            )));
        }
        let start = y as usize * img.width as usize;
        img.pixels[start..start + img.width as usize].copy_from_slice(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, p: Pixel) -> Vec<Pixel> {
        vec![p; (width * height) as usize]
    }

    #[test]
    fn allocate_like_matches_dimensions() {
        let mut engine = MemoryEngine::new(Quantum::EIGHT_BIT);
        let src = engine
            .insert_image(3, 2, filled(3, 2, Pixel::new(1, 2, 3, 4)))
            .unwrap();
        let dest = engine.allocate_like(&src).unwrap();
        assert_eq!(engine.dimensions(&dest).unwrap(), (3, 2));
        assert_eq!(engine.image_count(), 2);
    }

    #[test]
    fn release_removes_the_image() {
        let mut engine = MemoryEngine::new(Quantum::EIGHT_BIT);
        let src = engine.insert_image(1, 1, filled(1, 1, Pixel::default())).unwrap();
        engine.release(src);
        assert_eq!(engine.image_count(), 0);
        assert!(engine.dimensions(&src).is_err());
    }

    #[test]
    fn windows_round_trip_one_scanline() {
        let mut engine = MemoryEngine::new(Quantum::EIGHT_BIT);
        let src = engine.insert_image(2, 2, filled(2, 2, Pixel::default())).unwrap();
        let mut handle = src;
        let row = [Pixel::new(9, 8, 7, 6), Pixel::new(5, 4, 3, 2)];
        engine.commit_window(&mut handle, 1, &row).unwrap();

        let mut out = [Pixel::default(); 2];
        engine.read_window(&src, 1, &mut out).unwrap();
        assert_eq!(out, row);
        engine.read_window(&src, 0, &mut out).unwrap();
        assert_eq!(out, [Pixel::default(); 2]);
    }

    #[test]
    fn mismatched_window_width_is_refused() {
        let mut engine = MemoryEngine::new(Quantum::EIGHT_BIT);
        let src = engine.insert_image(3, 1, filled(3, 1, Pixel::default())).unwrap();
        let mut out = [Pixel::default(); 2];
        assert!(engine.read_window(&src, 0, &mut out).is_err());
    }

    #[test]
    fn insert_image_checks_pixel_count() {
        let mut engine = MemoryEngine::new(Quantum::EIGHT_BIT);
        let err = engine.insert_image(2, 2, vec![Pixel::default(); 3]).unwrap_err();
        assert!(err.to_string().contains("expected 4 pixels"));
    }
}

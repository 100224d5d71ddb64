// SPDX-License-Identifier: GPL-3.0-only

//! Render targets
//!
//! A [`RenderSurface`] is an RGBA pixel buffer owned by whichever component
//! created it. [`SharedSurface`] is the recording surface: the compositing
//! loop draws into it and the encoder samples it from another thread.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSurface {
    image: RgbaImage,
}

impl RenderSurface {
    /// Transparent black surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Reallocate to a new size; contents are cleared only if the size changes
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Replace the contents; the surface takes the size of `image`
    pub fn replace(&mut self, image: RgbaImage) {
        self.image = image;
    }
}

/// Composite straight RGBA over opaque black for formats without alpha
pub fn flatten_over_black(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let scale = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

#[derive(Debug)]
struct SharedSurfaceInner {
    surface: Mutex<RenderSurface>,
    generation: AtomicU64,
}

/// A surface drawn on one thread and sampled on another
///
/// Every completed draw bumps a generation counter so a sampler can tell
/// whether anything new was composited since its last read.
#[derive(Debug, Clone)]
pub struct SharedSurface {
    inner: Arc<SharedSurfaceInner>,
}

impl SharedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(SharedSurfaceInner {
                surface: Mutex::new(RenderSurface::new(width, height)),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Size at creation; the surface is never resized
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner
            .surface
            .lock()
            .map(|s| s.dimensions())
            .unwrap_or((0, 0))
    }

    /// Number of completed draws
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Draw into the surface; a draw returning true counts as a new frame
    pub fn draw<F>(&self, draw: F) -> bool
    where
        F: FnOnce(&mut RenderSurface) -> bool,
    {
        let Ok(mut surface) = self.inner.surface.lock() else {
            return false;
        };
        let drew = draw(&mut surface);
        if drew {
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
        }
        drew
    }

    /// Copy of the pixels if a frame newer than `seen` has been drawn
    pub fn sample_newer(&self, seen: u64) -> Option<(u64, RgbaImage)> {
        let surface = self.inner.surface.lock().ok()?;
        let generation = self.generation();
        if generation <= seen {
            return None;
        }
        Some((generation, surface.image().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_size_keeps_matching_buffer() {
        let mut surface = RenderSurface::new(4, 4);
        surface.image_mut().put_pixel(0, 0, Rgba([9, 9, 9, 9]));
        surface.ensure_size(4, 4);
        assert_eq!(surface.pixel(0, 0), Some(Rgba([9, 9, 9, 9])));
        surface.ensure_size(2, 2);
        assert_eq!(surface.pixel(0, 0), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(surface.pixel(3, 3), None);
    }

    #[test]
    fn test_flatten_over_black() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        assert_eq!(flatten_over_black(&image).get_pixel(0, 0).0, [100, 50, 25]);
        let opaque = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        assert_eq!(flatten_over_black(&opaque).get_pixel(0, 0).0, [200, 100, 50]);
    }

    #[test]
    fn test_shared_surface_generations() {
        let shared = SharedSurface::new(2, 2);
        assert!(shared.sample_newer(0).is_none());
        assert!(!shared.draw(|_| false));
        assert!(shared.draw(|s| {
            s.image_mut().put_pixel(1, 1, Rgba([1, 2, 3, 4]));
            true
        }));
        let (generation, image) = shared.sample_newer(0).unwrap();
        assert_eq!(generation, 1);
        assert_eq!(image.get_pixel(1, 1).0, [1, 2, 3, 4]);
        assert!(shared.sample_newer(generation).is_none());
    }
}

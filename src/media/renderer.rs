// SPDX-License-Identifier: GPL-3.0-only

//! Two-pass frame renderer
//!
//! Every consumer (preview thumbnails, photo capture, recording composite)
//! draws camera frames through [`render_frame`], so identical inputs give
//! identical pixels regardless of who asked.
//!
//! 1. Orientation pass: scale the frame into a scratch surface sized to the
//!    destination, mirroring it horizontally when requested.
//! 2. Filter pass: copy the scratch surface into the destination and run the
//!    filter chain over it.
//!
//! Filters therefore always see the frame in its final orientation.

use super::filters::FilterSpec;
use super::surface::RenderSurface;
use crate::backends::camera::{CameraFrame, Orientation};
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Render `frame` into `dest`
///
/// `scratch` is the caller's intermediate surface and is resized as needed.
/// Returns false without touching `dest` when there is no usable frame yet.
pub fn render_frame(
    frame: Option<&CameraFrame>,
    orientation: Orientation,
    filter: &FilterSpec,
    scratch: &mut RenderSurface,
    dest: &mut RenderSurface,
) -> bool {
    let Some(frame) = frame else {
        return false;
    };
    if !orientation_pass(frame, orientation, dest.dimensions(), scratch) {
        return false;
    }
    filter_pass(scratch.image(), filter, dest);
    true
}

/// Draw `frame` into `scratch` at `size`, mirrored if requested
pub fn orientation_pass(
    frame: &CameraFrame,
    orientation: Orientation,
    size: (u32, u32),
    scratch: &mut RenderSurface,
) -> bool {
    let (width, height) = size;
    if width == 0 || height == 0 || frame.width == 0 || frame.height == 0 {
        return false;
    }
    let Some(view) = frame.view() else {
        return false;
    };

    if view.dimensions() == size {
        scratch.ensure_size(width, height);
        scratch.image_mut().copy_from_slice(&view);
    } else {
        scratch.replace(imageops::resize(&view, width, height, FilterType::Triangle));
    }

    if orientation.is_mirrored() {
        imageops::flip_horizontal_in_place(scratch.image_mut());
    }
    true
}

/// Copy `source` into `dest` with `filter` applied
///
/// `dest` takes the size of `source`.
pub fn filter_pass(source: &RgbaImage, filter: &FilterSpec, dest: &mut RenderSurface) {
    let (width, height) = source.dimensions();
    dest.ensure_size(width, height);
    dest.image_mut().copy_from_slice(source);
    filter.apply(dest.image_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::filters::{self, FilterSpec};
    use image::Rgba;

    /// Red left half, blue right half
    fn split_frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame::from_image(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        }))
    }

    #[test]
    fn test_no_frame_is_noop() {
        let mut scratch = RenderSurface::new(4, 4);
        let mut dest = RenderSurface::new(4, 4);
        dest.image_mut().put_pixel(0, 0, Rgba([7, 7, 7, 7]));
        assert!(!render_frame(
            None,
            Orientation::Natural,
            FilterSpec::identity(),
            &mut scratch,
            &mut dest
        ));
        assert_eq!(dest.pixel(0, 0), Some(Rgba([7, 7, 7, 7])));
    }

    #[test]
    fn test_mirroring_swaps_sides() {
        let frame = split_frame(8, 4);
        let mut scratch = RenderSurface::new(0, 0);
        let mut natural = RenderSurface::new(8, 4);
        let mut mirrored = RenderSurface::new(8, 4);

        let identity = FilterSpec::identity();
        assert!(render_frame(Some(&frame), Orientation::Natural, identity, &mut scratch, &mut natural));
        assert!(render_frame(Some(&frame), Orientation::Mirrored, identity, &mut scratch, &mut mirrored));

        assert_eq!(natural.pixel(0, 0), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(mirrored.pixel(0, 0), Some(Rgba([0, 0, 255, 255])));
        assert_eq!(natural.pixel(0, 2), mirrored.pixel(7, 2));
    }

    #[test]
    fn test_scales_to_destination() {
        let frame = split_frame(64, 32);
        let mut scratch = RenderSurface::new(0, 0);
        let mut dest = RenderSurface::new(16, 8);
        assert!(render_frame(
            Some(&frame),
            Orientation::Mirrored,
            filters::preset("bw").unwrap(),
            &mut scratch,
            &mut dest
        ));
        assert_eq!(dest.dimensions(), (16, 8));
        let p = dest.pixel(15, 4).unwrap();
        assert_eq!(p[0], p[1]);
    }

    #[test]
    fn test_filter_runs_after_flip() {
        let frame = split_frame(8, 2);
        let sepia = filters::preset("sepia").unwrap();

        let mut scratch = RenderSurface::new(0, 0);
        let mut via_renderer = RenderSurface::new(8, 2);
        render_frame(Some(&frame), Orientation::Mirrored, sepia, &mut scratch, &mut via_renderer);

        let raw = frame.view().unwrap().into_raw().into_owned();
        let mut manual = RgbaImage::from_raw(8, 2, raw).unwrap();
        imageops::flip_horizontal_in_place(&mut manual);
        sepia.apply(&mut manual);

        assert_eq!(via_renderer.image(), &manual);
    }
}

// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for V4L2 capture
//!
//! Webcams deliver packed YUV 4:2:2 or Motion-JPEG; everything downstream
//! works on straight RGBA.

use image::ImageFormat;

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0, each 4-byte group encodes 2 pixels.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    convert_422(data, width, height, |c| (c[0], c[1], c[2], c[3]))
}

/// Convert UYVY (YUV 4:2:2) to RGBA
///
/// UYVY format: U0 Y0 V0 Y1.
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    convert_422(data, width, height, |c| (c[1], c[0], c[3], c[2]))
}

/// Decode one Motion-JPEG frame to RGBA
///
/// Returns the decoded dimensions along with the pixels, since a device may
/// deliver a different size than negotiated.
pub fn mjpeg_to_rgba(data: &[u8]) -> Result<(u32, u32, Vec<u8>), String> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| format!("MJPEG decode failed: {}", e))?;
    let rgba = decoded.to_rgba8();
    let (w, h) = rgba.dimensions();
    Ok((w, h, rgba.into_raw()))
}

/// Shared 4:2:2 path; `split` yields (y0, u, y1, v) from a 4-byte group
fn convert_422<F>(data: &[u8], width: u32, height: u32, split: F) -> Vec<u8>
where
    F: Fn(&[u8]) -> (u8, u8, u8, u8),
{
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let (y0, u, y1, v) = split(chunk);
        let u = u as f32 - 128.0;
        let v = v as f32 - 128.0;

        // BT.601
        for y in [y0 as f32, y1 as f32] {
            if rgba.len() >= pixel_count * 4 {
                break;
            }
            rgba.push((y + 1.402 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
            rgba.push((y + 1.772 * u).clamp(0.0, 255.0) as u8);
            rgba.push(255);
        }
    }

    // Short buffers (truncated DMA transfers) are padded with black
    rgba.resize(pixel_count * 4, 0);
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_gray() {
        let data = [128u8, 128, 128, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1);
        assert_eq!(rgba, vec![128, 128, 128, 255, 128, 128, 128, 255]);
    }

    #[test]
    fn test_uyvy_matches_yuyv_reordered() {
        let yuyv = [200u8, 90, 50, 160];
        let uyvy = [90u8, 200, 160, 50];
        assert_eq!(yuyv_to_rgba(&yuyv, 2, 1), uyvy_to_rgba(&uyvy, 2, 1));
    }

    #[test]
    fn test_short_buffer_is_padded() {
        let rgba = yuyv_to_rgba(&[16, 128, 16, 128], 4, 1);
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[8..], &[0; 8]);
    }

    #[test]
    fn test_mjpeg_rejects_garbage() {
        assert!(mjpeg_to_rgba(&[0, 1, 2, 3]).is_err());
    }
}

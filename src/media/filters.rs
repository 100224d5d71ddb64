// SPDX-License-Identifier: GPL-3.0-only

//! Filter presets and the CPU filter pass
//!
//! Each [`FilterSpec`] is an ordered list of [`FilterEffect`] primitives with
//! the semantics of the CSS Filter Effects functions of the same names. The
//! catalog is static and ordered; the first entry is the identity preset.
//!
//! Primitives run in list order over straight (non-premultiplied) RGBA. Color
//! primitives clamp to the 8-bit range after each step, as a browser does when
//! it evaluates a filter chain.

use image::RgbaImage;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single filter primitive
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "amount", rename_all = "kebab-case")]
pub enum FilterEffect {
    /// Amount in 0..=1 (1 = fully gray)
    Grayscale(f32),
    /// Amount in 0..=1 (1 = fully sepia)
    Sepia(f32),
    /// Saturation multiplier (1 = unchanged)
    Saturate(f32),
    /// Rotation in degrees
    HueRotate(f32),
    /// Gaussian blur, standard deviation in pixels
    Blur(f32),
    /// Linear multiplier (1 = unchanged)
    Brightness(f32),
    /// Contrast around mid-gray (1 = unchanged)
    Contrast(f32),
    /// Alpha multiplier in 0..=1
    Opacity(f32),
}

impl fmt::Display for FilterEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |v: f32| (v * 100.0).round() as i32;
        match *self {
            FilterEffect::Grayscale(a) => write!(f, "grayscale({}%)", pct(a)),
            FilterEffect::Sepia(a) => write!(f, "sepia({}%)", pct(a)),
            FilterEffect::Saturate(a) => write!(f, "saturate({}%)", pct(a)),
            FilterEffect::HueRotate(deg) => write!(f, "hue-rotate({}deg)", deg),
            FilterEffect::Blur(px) => write!(f, "blur({}px)", px),
            FilterEffect::Brightness(a) => write!(f, "brightness({}%)", pct(a)),
            FilterEffect::Contrast(a) => write!(f, "contrast({}%)", pct(a)),
            FilterEffect::Opacity(a) => write!(f, "opacity({}%)", pct(a)),
        }
    }
}

/// A named, ordered composition of filter primitives
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub effects: &'static [FilterEffect],
}

impl FilterSpec {
    /// The identity preset
    pub fn identity() -> &'static FilterSpec {
        &PRESETS[0]
    }

    pub fn is_identity(&self) -> bool {
        self.effects.is_empty()
    }

    /// CSS `filter` property text for display-level filtering
    pub fn css(&self) -> String {
        if self.effects.is_empty() {
            return "none".to_string();
        }
        self.effects
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Apply every primitive to `image` in order
    pub fn apply(&self, image: &mut RgbaImage) {
        apply_effects(self.effects, image);
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The preset catalog, in display order
pub static PRESETS: [FilterSpec; 7] = [
    FilterSpec {
        id: "none",
        name: "Normal",
        effects: &[],
    },
    FilterSpec {
        id: "gray",
        name: "Gray",
        effects: &[FilterEffect::Grayscale(0.5)],
    },
    FilterSpec {
        id: "bw",
        name: "Black & White",
        effects: &[FilterEffect::Grayscale(1.0)],
    },
    FilterSpec {
        id: "sepia",
        name: "Sepia",
        effects: &[FilterEffect::Sepia(1.0)],
    },
    FilterSpec {
        id: "warm",
        name: "Warm",
        effects: &[FilterEffect::Saturate(1.5), FilterEffect::HueRotate(10.0)],
    },
    FilterSpec {
        id: "vivid",
        name: "Vivid",
        effects: &[FilterEffect::Saturate(2.0)],
    },
    FilterSpec {
        id: "bright",
        name: "Bright",
        effects: &[
            FilterEffect::Blur(0.7),
            FilterEffect::Brightness(1.3),
            FilterEffect::Contrast(0.85),
            FilterEffect::Saturate(1.2),
            FilterEffect::Opacity(0.95),
        ],
    },
];

/// All presets in catalog order
pub fn presets() -> &'static [FilterSpec] {
    &PRESETS
}

/// Look up a preset by id
pub fn preset(id: &str) -> Option<&'static FilterSpec> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Catalog position of a preset id
pub fn preset_index(id: &str) -> Option<usize> {
    PRESETS.iter().position(|p| p.id == id)
}

/// The live preview filter, shared between the UI and render loops
///
/// Loops re-read it every frame, so a new selection takes effect on the next
/// frame drawn by every consumer.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    index: Arc<AtomicUsize>,
}

impl FilterSelection {
    pub fn new(id: &str) -> Option<Self> {
        let index = preset_index(id)?;
        Some(Self {
            index: Arc::new(AtomicUsize::new(index)),
        })
    }

    pub fn current(&self) -> &'static FilterSpec {
        PRESETS
            .get(self.index.load(Ordering::Acquire))
            .unwrap_or(&PRESETS[0])
    }

    /// Select a preset by id; unknown ids leave the selection unchanged
    pub fn select(&self, id: &str) -> Option<&'static FilterSpec> {
        let index = preset_index(id)?;
        self.index.store(index, Ordering::Release);
        Some(&PRESETS[index])
    }
}

type Matrix = [[f32; 3]; 3];

/// Per-pixel operation compiled from a primitive
#[derive(Debug, Clone, Copy)]
enum PixelOp {
    Color(Matrix),
    Linear { slope: f32, intercept: f32 },
    Alpha(f32),
}

impl PixelOp {
    fn from_effect(effect: FilterEffect) -> Option<Self> {
        Some(match effect {
            FilterEffect::Grayscale(a) => PixelOp::Color(grayscale_matrix(a)),
            FilterEffect::Sepia(a) => PixelOp::Color(sepia_matrix(a)),
            FilterEffect::Saturate(s) => PixelOp::Color(saturate_matrix(s)),
            FilterEffect::HueRotate(deg) => PixelOp::Color(hue_rotate_matrix(deg)),
            FilterEffect::Brightness(b) => PixelOp::Linear {
                slope: b,
                intercept: 0.0,
            },
            FilterEffect::Contrast(c) => PixelOp::Linear {
                slope: c,
                intercept: 0.5 - 0.5 * c,
            },
            FilterEffect::Opacity(o) => PixelOp::Alpha(o.clamp(0.0, 1.0)),
            FilterEffect::Blur(_) => return None,
        })
    }

    #[inline]
    fn apply(&self, rgba: &mut [f32; 4]) {
        match *self {
            PixelOp::Color(m) => {
                let [r, g, b, _] = *rgba;
                for (out, row) in rgba.iter_mut().zip(m.iter()) {
                    *out = (row[0] * r + row[1] * g + row[2] * b).clamp(0.0, 1.0);
                }
            }
            PixelOp::Linear { slope, intercept } => {
                for c in rgba.iter_mut().take(3) {
                    *c = (*c * slope + intercept).clamp(0.0, 1.0);
                }
            }
            PixelOp::Alpha(o) => rgba[3] *= o,
        }
    }
}

/// Run `effects` over `image`, fusing consecutive per-pixel primitives into one pass
pub fn apply_effects(effects: &[FilterEffect], image: &mut RgbaImage) {
    let mut pending: Vec<PixelOp> = Vec::with_capacity(effects.len());

    for effect in effects {
        match PixelOp::from_effect(*effect) {
            Some(op) => pending.push(op),
            None => {
                run_pixel_ops(&pending, image);
                pending.clear();
                match *effect {
                    FilterEffect::Blur(radius) if radius > 0.0 => {
                        *image = image::imageops::blur(image, radius);
                    }
                    _ => {}
                }
            }
        }
    }

    run_pixel_ops(&pending, image);
}

fn run_pixel_ops(ops: &[PixelOp], image: &mut RgbaImage) {
    if ops.is_empty() {
        return;
    }

    for pixel in image.pixels_mut() {
        let mut rgba = [
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
            pixel[3] as f32 / 255.0,
        ];
        for op in ops {
            op.apply(&mut rgba);
        }
        for (dst, v) in pixel.0.iter_mut().zip(rgba) {
            *dst = (v * 255.0).round() as u8;
        }
    }
}

fn grayscale_matrix(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
        [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
    ]
}

fn sepia_matrix(amount: f32) -> Matrix {
    let a = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
        [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
        [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
    ]
}

fn saturate_matrix(s: f32) -> Matrix {
    let s = s.max(0.0);
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

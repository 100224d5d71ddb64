// SPDX-License-Identifier: GPL-3.0-only

//! Live filter previews
//!
//! One small surface per catalog preset, all redrawn from the same camera
//! frame on every display tick. The loop keeps itself alive only while the
//! source is ready; once it goes away the loop ends, and the owner restarts it
//! through [`PreviewBank::ensure_running`] when the source is ready again.
//!
//! Orientation is read fresh on every tick, so a flip reaches all
//! thumbnails on the next frame.

use crate::backends::camera::{FrameLoop, FrameTask, FrameTick, LoopAction, SharedOrientation, SourceHandle};
use crate::constants::surfaces;
use crate::media::filters::{self, FilterSpec};
use crate::media::renderer::render_frame;
use crate::media::surface::RenderSurface;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Frame loop task name
pub const PREVIEW_TASK: &str = "preview-bank";

struct PreviewSlot {
    filter: &'static FilterSpec,
    surface: RenderSurface,
}

struct PreviewShared {
    slots: Mutex<Vec<PreviewSlot>>,
    running: AtomicBool,
    frames: AtomicU64,
}

/// Thumbnail surfaces for the whole preset catalog
#[derive(Clone)]
pub struct PreviewBank {
    source: SourceHandle,
    orientation: SharedOrientation,
    shared: Arc<PreviewShared>,
}

impl PreviewBank {
    /// Bank with the default thumbnail size
    pub fn new(source: SourceHandle, orientation: SharedOrientation) -> Self {
        Self::with_size(
            source,
            orientation,
            (surfaces::PREVIEW_WIDTH, surfaces::PREVIEW_HEIGHT),
        )
    }

    pub fn with_size(source: SourceHandle, orientation: SharedOrientation, size: (u32, u32)) -> Self {
        let slots = filters::presets()
            .iter()
            .map(|filter| PreviewSlot {
                filter,
                surface: RenderSurface::new(size.0, size.1),
            })
            .collect();
        Self {
            source,
            orientation,
            shared: Arc::new(PreviewShared {
                slots: Mutex::new(slots),
                running: AtomicBool::new(false),
                frames: AtomicU64::new(0),
            }),
        }
    }

    /// Start the render loop if the source is ready and it is not running
    ///
    /// Returns true when a loop was scheduled by this call.
    pub fn ensure_running(&self, frame_loop: &mut FrameLoop) -> bool {
        if !self.source.is_ready() {
            return false;
        }
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!(presets = filters::presets().len(), "Starting preview loop");
        frame_loop.schedule(Box::new(PreviewTask {
            bank: self.clone(),
            scratch: RenderSurface::new(0, 0),
        }));
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Ticks on which the thumbnails were redrawn
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    /// Current pixels of every thumbnail, in catalog order
    pub fn snapshots(&self) -> Vec<(&'static FilterSpec, RgbaImage)> {
        let Ok(slots) = self.shared.slots.lock() else {
            return Vec::new();
        };
        slots
            .iter()
            .map(|slot| (slot.filter, slot.surface.image().clone()))
            .collect()
    }

    /// Current pixels of one preset's thumbnail
    pub fn snapshot(&self, id: &str) -> Option<RgbaImage> {
        let slots = self.shared.slots.lock().ok()?;
        slots
            .iter()
            .find(|slot| slot.filter.id == id)
            .map(|slot| slot.surface.image().clone())
    }

    fn render_all(&self, scratch: &mut RenderSurface) -> bool {
        let frame = self.source.current_frame();
        let orientation = self.orientation.get();
        let Ok(mut slots) = self.shared.slots.lock() else {
            return false;
        };
        let mut drew = false;
        for slot in slots.iter_mut() {
            drew |= render_frame(
                frame.as_deref(),
                orientation,
                slot.filter,
                scratch,
                &mut slot.surface,
            );
        }
        drew
    }
}

struct PreviewTask {
    bank: PreviewBank,
    scratch: RenderSurface,
}

impl FrameTask for PreviewTask {
    fn name(&self) -> &str {
        PREVIEW_TASK
    }

    fn on_frame(&mut self, tick: &FrameTick) -> LoopAction {
        if !self.bank.source.is_ready() {
            debug!(frame = tick.index, "Source not ready, preview loop ending");
            self.bank.shared.running.store(false, Ordering::Release);
            return LoopAction::Stop;
        }
        if self.bank.render_all(&mut self.scratch) {
            self.bank.shared.frames.fetch_add(1, Ordering::Relaxed);
        }
        LoopAction::Continue
    }
}

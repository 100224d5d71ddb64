// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer encoder backend
//!
//! Produces real containers (fragmented MP4, WebM, Matroska) when the host
//! has the necessary plugins. The recording surface is pushed into an
//! `appsrc` and the muxed output is pulled from an `appsink`:
//!
//! ```text
//! appsrc (RGBA) ! videoconvert ! <encoder> [! <parser>] ! <muxer> ! appsink
//! ```
//!
//! Muxers run in streaming mode so every buffer leaving the appsink is a
//! self-contained piece of the final file. Audio is not muxed.

use super::{
    ContainerFormat, EncoderBackend, EncoderEvent, EncoderSession, EncoderSettings, EncoderState,
    EncoderStateHandle, OutputFormat, SurfaceStream, VideoCodec,
};
use crate::backends::camera::CaptureThread;
use crate::constants::{BitratePreset, timing};
use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Software H.264 encoders, preferred first
const H264_ENCODERS: [&str; 2] = ["x264enc", "openh264enc"];

/// Check if a specific GStreamer element is available
pub fn is_element_available(element_name: &str) -> bool {
    gst::ElementFactory::find(element_name).is_some()
}

/// Element names making up one encoding branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chain {
    encoder: &'static str,
    parser: Option<&'static str>,
    muxer: &'static str,
}

fn chain_for(format: OutputFormat) -> Option<Chain> {
    let (encoder, parser) = match format.codec {
        VideoCodec::H264 => (
            H264_ENCODERS.into_iter().find(|e| is_element_available(e))?,
            Some("h264parse"),
        ),
        VideoCodec::Vp8 => ("vp8enc", None),
        VideoCodec::Jpeg => return None,
    };
    let muxer = match (format.container, format.codec) {
        (ContainerFormat::Mp4, _) => "mp4mux",
        (ContainerFormat::WebM, VideoCodec::H264) => "matroskamux",
        (ContainerFormat::WebM, _) => "webmmux",
        (ContainerFormat::MotionJpeg, _) => return None,
    };

    let available = is_element_available(encoder)
        && is_element_available(muxer)
        && parser.is_none_or(is_element_available)
        && is_element_available("appsrc")
        && is_element_available("appsink")
        && is_element_available("videoconvert");
    available.then_some(Chain {
        encoder,
        parser,
        muxer,
    })
}

pub struct GstBackend {
    settings: EncoderSettings,
    formats: Vec<OutputFormat>,
}

impl GstBackend {
    /// Initialize GStreamer and probe for usable encoder chains
    pub fn new(settings: EncoderSettings) -> Result<Self, String> {
        gst::init().map_err(|e| format!("Failed to initialize GStreamer: {}", e))?;

        let formats: Vec<OutputFormat> = [
            OutputFormat::MP4_H264,
            OutputFormat::WEBM_H264,
            OutputFormat::WEBM_VP8,
        ]
        .into_iter()
        .filter(|f| chain_for(*f).is_some())
        .collect();

        if formats.is_empty() {
            return Err("no usable encoder/muxer elements installed".to_string());
        }
        for format in &formats {
            debug!(format = %format, "GStreamer format available");
        }
        Ok(Self { settings, formats })
    }
}

impl EncoderBackend for GstBackend {
    fn name(&self) -> &str {
        "gstreamer"
    }

    fn supported_formats(&self) -> Vec<OutputFormat> {
        self.formats.clone()
    }

    fn create_session(
        &self,
        stream: SurfaceStream,
        format: OutputFormat,
    ) -> Result<Box<dyn EncoderSession>, RecordingError> {
        let chain = chain_for(format)
            .ok_or_else(|| RecordingError::UnsupportedOutputFormat(format.to_string()))?;
        let session = GstSession::new(stream, format, chain, self.settings.quality)
            .map_err(RecordingError::PipelineError)?;
        Ok(Box::new(session))
    }
}

pub struct GstSession {
    format: OutputFormat,
    stream: SurfaceStream,
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    state: EncoderStateHandle,
    events: UnboundedReceiver<EncoderEvent>,
    sender: Option<UnboundedSender<EncoderEvent>>,
    worker: Option<CaptureThread>,
}

impl GstSession {
    fn new(
        stream: SurfaceStream,
        format: OutputFormat,
        chain: Chain,
        quality: BitratePreset,
    ) -> Result<Self, String> {
        let (width, height) = stream.surface.dimensions();
        let make = |name: &str| {
            gst::ElementFactory::make(name)
                .build()
                .map_err(|e| format!("Failed to create {}: {}", name, e))
        };

        let src_element = make("appsrc")?;
        let convert = make("videoconvert")?;
        let encoder = make(chain.encoder)?;
        let parser = chain.parser.map(make).transpose()?;
        let muxer = make(chain.muxer)?;
        let sink_element = make("appsink")?;

        let appsrc = src_element
            .clone()
            .dynamic_cast::<gst_app::AppSrc>()
            .map_err(|_| "Failed to cast to AppSrc")?;
        let appsink = sink_element
            .clone()
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| "Failed to cast to AppSink")?;

        let caps = gst_video::VideoInfo::builder(gst_video::VideoFormat::Rgba, width, height)
            .fps(gst::Fraction::new(stream.fps as i32, 1))
            .build()
            .and_then(|info| info.to_caps())
            .map_err(|e| format!("Invalid surface caps: {}", e))?;
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);
        appsrc.set_is_live(true);
        appsrc.set_do_timestamp(true);

        configure_encoder(&encoder, chain.encoder, quality, width);
        configure_muxer(&muxer, chain.muxer);

        appsink.set_property("sync", false);
        appsink.set_property("emit-signals", false);

        let (sender, events) = mpsc::unbounded_channel();
        let data_sender = sender.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    let _ = data_sender.send(EncoderEvent::Data(map.as_slice().to_vec()));
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        let mut elements = vec![src_element, convert, encoder];
        elements.extend(parser);
        elements.push(muxer);
        elements.push(sink_element);

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many(&elements)
            .map_err(|e| format!("Failed to add elements to pipeline: {}", e))?;
        gst::Element::link_many(&elements)
            .map_err(|e| format!("Failed to link encoder chain: {}", e))?;

        info!(
            format = %format,
            encoder = chain.encoder,
            muxer = chain.muxer,
            width,
            height,
            "GStreamer encoder pipeline created"
        );

        Ok(Self {
            format,
            stream,
            pipeline,
            appsrc,
            state: EncoderStateHandle::new(),
            events,
            sender: Some(sender),
            worker: None,
        })
    }
}

impl EncoderSession for GstSession {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn start(&mut self) -> Result<(), RecordingError> {
        let sender = self
            .sender
            .take()
            .ok_or_else(|| RecordingError::StartFailed("session already started".into()))?;

        if !self.stream.audio.is_empty() {
            warn!(
                tracks = self.stream.audio.len(),
                "Audio muxing not available; recording video only"
            );
        }

        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
        self.state.set(EncoderState::Recording);

        let feeder = Feeder {
            stream: self.stream.clone(),
            pipeline: self.pipeline.clone(),
            appsrc: self.appsrc.clone(),
            state: self.state.clone(),
            sender,
        };
        self.worker = Some(CaptureThread::spawn(
            "gst-encoder-feed",
            Arc::new(AtomicBool::new(false)),
            move |stop| {
                feeder.run(&stop);
                Ok(())
            },
        ));
        Ok(())
    }

    fn stop(&mut self) {
        if !self
            .state
            .transition(EncoderState::Recording, EncoderState::Stopping)
        {
            return;
        }
        if let Some(worker) = &self.worker {
            worker.request_stop();
        }
    }

    fn state_handle(&self) -> EncoderStateHandle {
        self.state.clone()
    }

    fn try_next_event(&mut self) -> Option<EncoderEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for GstSession {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Pushes composited frames into the pipeline until stopped, then drains it
struct Feeder {
    stream: SurfaceStream,
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    state: EncoderStateHandle,
    sender: UnboundedSender<EncoderEvent>,
}

impl Feeder {
    fn run(self, stop: &AtomicBool) {
        let interval = self.stream.frame_interval();
        let bus = self.pipeline.bus();
        let mut seen = 0u64;
        let mut pushed = 0u64;

        loop {
            let stopping = stop.load(Ordering::SeqCst);

            if let Some((generation, image)) = self.stream.surface.sample_newer(seen) {
                seen = generation;
                let buffer = gst::Buffer::from_mut_slice(image.into_raw());
                match self.appsrc.push_buffer(buffer) {
                    Ok(_) => pushed += 1,
                    Err(e) => {
                        let _ = self
                            .sender
                            .send(EncoderEvent::Error(format!("push failed: {:?}", e)));
                    }
                }
            }

            if let Some(bus) = &bus {
                while let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error]) {
                    if let gst::MessageView::Error(err) = msg.view() {
                        error!(error = %err.error(), "GStreamer error while recording");
                        let _ = self.sender.send(EncoderEvent::Error(err.error().to_string()));
                    }
                }
            }

            if stopping {
                break;
            }
            std::thread::sleep(interval);
        }

        debug!(frames = pushed, "Sending EOS to encoder pipeline");
        if let Err(e) = self.appsrc.end_of_stream() {
            warn!(error = ?e, "Failed to send EOS");
        }

        if let Some(bus) = &bus {
            let timeout = gst::ClockTime::from_mseconds(timing::FINALIZE_TIMEOUT.as_millis() as u64);
            match bus.timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error]) {
                Some(msg) => {
                    if let gst::MessageView::Error(err) = msg.view() {
                        let _ = self.sender.send(EncoderEvent::Error(err.error().to_string()));
                    }
                }
                None => warn!("Encoder pipeline did not reach EOS in time"),
            }
        }

        let _ = self.pipeline.set_state(gst::State::Null);
        self.state.set(EncoderState::Inactive);
        let _ = self.sender.send(EncoderEvent::Stopped);
    }
}

fn configure_encoder(encoder: &gst::Element, name: &str, quality: BitratePreset, width: u32) {
    let bitrate = quality.bitrate_kbps(width);
    match name {
        "x264enc" => {
            encoder.set_property_from_str("tune", "zerolatency");
            encoder.set_property_from_str("speed-preset", "veryfast");
            encoder.set_property("bitrate", bitrate);
        }
        "openh264enc" => {
            encoder.set_property_from_str("rate-control", "bitrate");
            encoder.set_property("bitrate", bitrate * 1000);
            encoder.set_property_from_str("usage-type", "camera");
        }
        "vp8enc" => {
            encoder.set_property("target-bitrate", (bitrate * 1000) as i32);
            encoder.set_property("deadline", 1i64);
        }
        _ => {}
    }
    debug!(encoder = name, bitrate_kbps = bitrate, "Configured encoder");
}

fn configure_muxer(muxer: &gst::Element, name: &str) {
    match name {
        "mp4mux" => {
            // Fragmented output so chunks are playable without a final moov rewrite
            muxer.set_property("fragment-duration", 1000u32);
            muxer.set_property("streamable", true);
        }
        "webmmux" | "matroskamux" => {
            muxer.set_property("streamable", true);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_jpeg_has_no_gst_chain() {
        let _ = gst::init();
        assert!(chain_for(OutputFormat::MOTION_JPEG).is_none());
    }

    #[test]
    fn test_backend_probe_runs() {
        // Hosts without plugins report an error instead of panicking
        if let Ok(backend) = GstBackend::new(EncoderSettings::default()) {
            assert!(!backend.supported_formats().contains(&OutputFormat::MOTION_JPEG));
        }
    }
}

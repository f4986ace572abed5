// Video encoder backend: FFmpeg through video-rs, or an "unavailable" stand-in when
// the `video-rs` feature is off.
use crate::export::CapturedFrame;
use anyhow::Result;
use std::path::Path;

/// Output codecs used by the exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    Vp9,
    Vp8,
}

impl VideoCodec {
    /// MIME type of the container/codec pair.
    pub fn mime(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "video/mp4",
            VideoCodec::Vp9 => "video/webm;codecs=vp9",
            VideoCodec::Vp8 => "video/webm;codecs=vp8",
        }
    }
}

/// Configuration for video encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub width: usize,
    pub height: usize,
    pub fps: u32,
    pub codec: VideoCodec,
    /// Target (and cap) bitrate in bits per second.
    pub bitrate: Option<usize>,
    /// Move the MP4 index to the front of the file.
    pub fast_start: bool,
}

impl EncoderSettings {
    /// H.264 / yuv420p with fast start, for MP4.
    pub fn preset_h264_yuv420p(w: usize, h: usize, fps: u32) -> Self {
        Self {
            width: w,
            height: h,
            fps,
            codec: VideoCodec::H264,
            bitrate: None,
            fast_start: true,
        }
    }

    /// Rounds the frame size up to even dimensions for 4:2:0 chroma subsampling.
    pub fn even_size(self) -> Self {
        let (width, height) = even_dimensions(self.width, self.height);
        Self {
            width,
            height,
            ..self
        }
    }

    /// VP9/VP8 with a bitrate cap, for WebM.
    pub fn preset_webm(w: usize, h: usize, fps: u32, codec: VideoCodec, bitrate: usize) -> Self {
        Self {
            width: w,
            height: h,
            fps,
            codec,
            bitrate: Some(bitrate),
            fast_start: false,
        }
    }
}

/// `(w, h)` rounded up to the next even numbers.
pub fn even_dimensions(w: usize, h: usize) -> (usize, usize) {
    (w + (w & 1), h + (h & 1))
}

/// Destination for encoded frames.
///
/// The FFmpeg [`Encoder`] is the production sink. It is not `Send`, so it must be
/// created on the thread that drives it.
pub trait VideoSink {
    /// Encodes one frame presented at `time` seconds.
    fn encode(&mut self, frame: &CapturedFrame, time: f64) -> Result<()>;

    /// Flushes and finalizes the output.
    fn finish(self: Box<Self>) -> Result<()>;
}

#[cfg(feature = "video-rs")]
mod real {
    use super::*;
    use ndarray::ArrayView3;
    use video_rs::ffmpeg::{self, codec, format, software, Dictionary};

    impl VideoCodec {
        fn ffmpeg_id(&self) -> codec::Id {
            match self {
                VideoCodec::H264 => codec::Id::H264,
                VideoCodec::Vp9 => codec::Id::VP9,
                VideoCodec::Vp8 => codec::Id::VP8,
            }
        }
    }

    /// Whether FFmpeg was built with an encoder for `codec`.
    pub fn codec_available(target: VideoCodec) -> bool {
        ffmpeg::init().is_ok() && codec::encoder::find(target.ffmpeg_id()).is_some()
    }

    /// A video-only encoder wrapping `ffmpeg-next` (via `video-rs` bindings).
    pub struct Encoder {
        output: format::context::Output,
        video_idx: usize,
        video_encoder: codec::encoder::video::Encoder,
        scaler: software::scaling::Context,
        // Pre-allocated buffers
        rgba_frame: ffmpeg::util::frame::Video,
        yuv_frame: ffmpeg::util::frame::Video,
    }

    impl Encoder {
        /// Initializes the encoder and output file.
        pub fn new(path: &Path, settings: &EncoderSettings) -> Result<Self> {
            ffmpeg::init().map_err(|e| anyhow::anyhow!("FFmpeg init failed: {}", e))?;

            let mut output = format::output(&path)?;

            let global_header = output
                .format()
                .flags()
                .contains(format::flag::Flags::GLOBAL_HEADER);

            let codec_v = codec::encoder::find(settings.codec.ffmpeg_id())
                .ok_or(anyhow::anyhow!("{} encoder not found", settings.codec.mime()))?;
            tracing::info!(codec = settings.codec.mime(), "[Encoder] opening");

            let mut v_encoder = codec::context::Context::new_with_codec(codec_v)
                .encoder()
                .video()?;

            v_encoder.set_height(settings.height as u32);
            v_encoder.set_width(settings.width as u32);
            v_encoder.set_format(format::Pixel::YUV420P);
            v_encoder.set_time_base((1, 90000));
            v_encoder.set_frame_rate(Some((settings.fps as i32, 1)));
            if let Some(bitrate) = settings.bitrate {
                v_encoder.set_bit_rate(bitrate);
                v_encoder.set_max_bit_rate(bitrate);
            }

            if global_header {
                v_encoder.set_flags(codec::flag::Flags::GLOBAL_HEADER);
            }

            let v_encoder = v_encoder.open_as(codec_v)?;
            let mut o_stream_v = output.add_stream(codec_v)?;
            o_stream_v.set_parameters(&v_encoder);
            let video_idx = o_stream_v.index();

            let scaler = software::scaling::Context::get(
                format::Pixel::RGBA,
                settings.width as u32,
                settings.height as u32,
                format::Pixel::YUV420P,
                settings.width as u32,
                settings.height as u32,
                software::scaling::flag::Flags::BILINEAR,
            )?;

            if settings.fast_start {
                let mut options = Dictionary::new();
                options.set("movflags", "faststart");
                output.write_header_with(options)?;
            } else {
                output.write_header()?;
            }

            let rgba_frame = ffmpeg::util::frame::Video::new(
                format::Pixel::RGBA,
                settings.width as u32,
                settings.height as u32,
            );
            let yuv_frame = ffmpeg::util::frame::Video::new(
                format::Pixel::YUV420P,
                settings.width as u32,
                settings.height as u32,
            );

            Ok(Self {
                output,
                video_idx,
                video_encoder: v_encoder,
                scaler,
                rgba_frame,
                yuv_frame,
            })
        }

        fn write_video_packets(&mut self) -> Result<()> {
            let stream_tb = self
                .output
                .stream(self.video_idx)
                .ok_or(anyhow::anyhow!("video stream missing"))?
                .time_base();
            let mut packet = codec::packet::Packet::empty();
            while self.video_encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(self.video_idx);
                packet.rescale_ts(self.video_encoder.time_base(), stream_tb);
                packet.write_interleaved(&mut self.output)?;
            }
            Ok(())
        }

        /// Encodes a video frame.
        ///
        /// `frame_array` must be RGBA (height, width, 4).
        pub fn encode_array(&mut self, frame_array: ArrayView3<u8>, time: f64) -> Result<()> {
            let (h, w, c) = frame_array.dim();
            anyhow::ensure!(c == 4, "expected RGBA frame, got {} channels", c);

            let stride = self.rgba_frame.stride(0);
            let width_bytes = w * 4;
            let src = frame_array
                .as_slice()
                .ok_or(anyhow::anyhow!("frame is not contiguous"))?;

            if stride == width_bytes {
                self.rgba_frame.data_mut(0)[..src.len()].copy_from_slice(src);
            } else {
                for y in 0..h {
                    let src_row = &src[y * width_bytes..(y + 1) * width_bytes];
                    let dest_row =
                        &mut self.rgba_frame.data_mut(0)[y * stride..y * stride + width_bytes];
                    dest_row.copy_from_slice(src_row);
                }
            }

            self.scaler.run(&self.rgba_frame, &mut self.yuv_frame)?;

            let pts = (time * 90000.0).round() as i64;
            self.yuv_frame.set_pts(Some(pts));

            self.video_encoder.send_frame(&self.yuv_frame)?;
            self.write_video_packets()?;
            Ok(())
        }
    }

    impl VideoSink for Encoder {
        fn encode(&mut self, frame: &CapturedFrame, time: f64) -> Result<()> {
            let array = frame.as_array()?;
            self.encode_array(array, time)
        }

        /// Finalizes the stream, flushing buffers and writing trailers.
        fn finish(mut self: Box<Self>) -> Result<()> {
            self.video_encoder.send_eof()?;
            self.write_video_packets()?;
            self.output.write_trailer()?;
            Ok(())
        }
    }
}

#[cfg(feature = "video-rs")]
pub use real::*;

#[cfg(not(feature = "video-rs"))]
mod unavailable {
    use super::*;

    pub fn codec_available(_codec: VideoCodec) -> bool {
        false
    }

    /// Placeholder that refuses to open; built without the `video-rs` feature.
    pub struct Encoder;

    impl Encoder {
        pub fn new(_path: &Path, settings: &EncoderSettings) -> Result<Self> {
            Err(anyhow::anyhow!(
                "{} encoding requires the `video-rs` feature",
                settings.codec.mime()
            ))
        }
    }

    impl VideoSink for Encoder {
        fn encode(&mut self, _frame: &CapturedFrame, _time: f64) -> Result<()> {
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(not(feature = "video-rs"))]
pub use unavailable::*;

/// Whether an FFmpeg backend was compiled in at all.
pub fn backend_available() -> bool {
    cfg!(feature = "video-rs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_sides_round_up() {
        assert_eq!(even_dimensions(405, 720), (406, 720));
        assert_eq!(even_dimensions(720, 405), (720, 406));
        assert_eq!(even_dimensions(1280, 720), (1280, 720));
        assert_eq!(even_dimensions(1, 1), (2, 2));
    }

    #[test]
    fn presets_can_be_evened() {
        let settings = EncoderSettings::preset_h264_yuv420p(405, 721, 30).even_size();
        assert_eq!((settings.width, settings.height), (406, 722));
        assert!(settings.fast_start);
        assert_eq!(settings.codec, VideoCodec::H264);
    }
}

use super::*;
use crate::foundation::color::Color;
use crate::foundation::core::{Canvas, Fps};

#[test]
fn parses_version_banner() {
    let banner = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers\nbuilt with gcc 13";
    assert_eq!(parse_ffmpeg_version(banner).as_deref(), Some("6.1.1-3ubuntu5"));
    assert_eq!(parse_ffmpeg_version("ffmpeg version n7.0").as_deref(), Some("n7.0"));
    assert_eq!(parse_ffmpeg_version("avconv version 12"), None);
    assert_eq!(parse_ffmpeg_version(""), None);
}

#[test]
fn odd_sizes_are_rejected_before_spawning() {
    let cfg = EncoderConfig::new(
        "out/never.mp4",
        Canvas::new(11, 10).unwrap(),
        Fps::new(30).unwrap(),
    );
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::default());
    assert!(matches!(
        enc.open(&cfg),
        Err(EyeCandyError::Configuration(_))
    ));
}

#[test]
fn submit_requires_open() {
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::default());
    let frame = FrameBuffer::filled(Canvas::new(2, 2).unwrap(), Color::BLACK);
    assert!(matches!(
        enc.submit(Arc::new(frame)),
        Err(EyeCandyError::EncoderIo(_))
    ));
    assert!(enc.check_completed().unwrap().is_empty());
    enc.abort();
    enc.abort();
}

#[test]
fn missing_binary_is_unavailable() {
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts {
        ffmpeg_path: PathBuf::from("/nonexistent/eyecandy-ffmpeg"),
        video_codec: "libx264".to_owned(),
    });
    assert!(matches!(
        enc.probe(),
        Err(EyeCandyError::EncoderUnavailable(_))
    ));
}

use super::*;

#[test]
fn fps_rejects_zero() {
    let err = Fps::new(0).unwrap_err();
    assert!(matches!(err, EyeCandyError::Configuration(_)));
}

#[test]
fn fps_conversions() {
    let fps = Fps::new(30).unwrap();
    assert_eq!(fps.get(), 30);
    assert_eq!(fps.secs_to_frames_round(4.0), 120);
    assert_eq!(fps.secs_to_frames_round(0.51), 15);
    assert!((fps.frames_to_secs(15) - 0.5).abs() < 1e-12);
    assert_eq!(fps.tick_interval(), std::time::Duration::from_secs_f64(1.0 / 30.0));
}

#[test]
fn canvas_validation_and_geometry() {
    assert!(Canvas::new(0, 10).is_err());
    let c = Canvas::new(30, 40).unwrap();
    assert!((c.diagonal() - 50.0).abs() < 1e-12);
    assert_eq!(c.rgba_len(), 30 * 40 * 4);
}

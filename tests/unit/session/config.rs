use super::*;

#[test]
fn defaults_are_valid() {
    let cfg = RunConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.poll_interval(), Duration::from_millis(30));
    assert_eq!(cfg.batch_size, 50);
    assert_eq!(cfg.reload_threshold, 25);
}

#[test]
fn partial_json_fills_in_defaults() {
    let cfg: RunConfig =
        serde_json::from_str(r#"{"seed": 9, "width": 640, "height": 480, "generation_slice": {"max_millis": 5}}"#)
            .unwrap();
    assert_eq!(cfg.seed, 9);
    assert_eq!(cfg.canvas().unwrap(), Canvas::new(640, 480).unwrap());
    assert_eq!(cfg.fps, 60);
    assert_eq!(cfg.generation_slice.max_millis, 5);
    assert_eq!(cfg.generation_slice.max_stimuli, 500);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<RunConfig>(r#"{"fsp": 30}"#).is_err());
}

#[test]
fn invalid_parameters_are_configuration_errors() {
    let cases: Vec<(&str, Box<dyn Fn(&mut RunConfig)>)> = vec![
        ("fps", Box::new(|c| c.fps = 0)),
        ("non-zero", Box::new(|c| c.width = 0)),
        ("even", Box::new(|c| c.height = 481)),
        ("limit_seconds", Box::new(|c| c.limit_seconds = -1.0)),
        ("limit_seconds", Box::new(|c| c.limit_seconds = f64::NAN)),
        ("batch_size", Box::new(|c| c.batch_size = 0)),
        ("reload_threshold", Box::new(|c| c.reload_threshold = 50)),
        ("poll_interval_ms", Box::new(|c| c.poll_interval_ms = 0)),
        ("output_name", Box::new(|c| c.output_name = "  ".to_owned())),
        ("render_threads", Box::new(|c| c.render_threads = Some(0))),
    ];
    for (needle, mutate) in cases {
        let mut cfg = RunConfig::default();
        mutate(&mut cfg);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, EyeCandyError::Configuration(_)), "{needle}: {err}");
        assert!(err.to_string().contains(needle), "{needle}: {err}");
    }
}

#[test]
fn loads_from_a_file() {
    let dir = std::env::temp_dir().join(format!("eyecandy-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run.json");
    std::fs::write(&path, r#"{"fps": 30, "output_name": "x"}"#).unwrap();
    let cfg = RunConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.fps().unwrap().get(), 30);
    assert!(RunConfig::from_json_file(&dir.join("missing.json")).is_err());
    std::fs::remove_dir_all(&dir).unwrap();
}

use super::*;
use crate::program::engine::ProgramEngine;
use crate::stimulus::spec::{StimulusKind, StimulusSpec, StimulusTag};

fn canvas() -> Canvas {
    Canvas::new(640, 480).unwrap()
}

fn run(source: &str, seed: u32) -> Vec<StimulusSpec> {
    let mut engine = ProgramEngine::compile(&DeclarativeHost, source, seed, canvas()).unwrap();
    engine.initialize().unwrap();
    engine.map(|s| s.unwrap()).collect()
}

fn run_err(source: &str) -> ProgramError {
    let mut engine = match ProgramEngine::compile(&DeclarativeHost, source, 1, canvas()) {
        Ok(engine) => engine,
        Err(crate::foundation::error::EyeCandyError::Program(p)) => return p,
        Err(other) => panic!("unexpected error: {other}"),
    };
    engine.initialize().unwrap();
    for item in engine {
        if let Err(crate::foundation::error::EyeCandyError::Program(p)) = item {
            return p;
        }
    }
    panic!("program did not fail");
}

#[test]
fn repeat_and_group_expand_in_order() {
    let src = r#"{
        "metadata": {"name": "basic", "version": "0.1.0"},
        "body": [
            {"repeat": {"times": 2, "body": [
                {"stimulus": {"stimulusType": "WAIT", "lifespan": 1}},
                {"group": {"metadata": {"cohort": "a"}, "body": [
                    {"stimulus": {"stimulusType": "SOLID", "lifespan": 0.5, "backgroundColor": "gray"}}
                ]}}
            ]}}
        ]
    }"#;
    let out = run(src, 1);
    let tags: Vec<StimulusTag> = out.iter().map(StimulusSpec::tag).collect();
    assert_eq!(
        tags,
        vec![
            StimulusTag::Wait,
            StimulusTag::Solid,
            StimulusTag::Wait,
            StimulusTag::Solid
        ]
    );
    assert_eq!(out[1].metadata().get("cohort").map(String::as_str), Some("a"));
    assert!(out[0].metadata().is_empty());
}

#[test]
fn for_binds_each_value_and_window_vars_are_predefined() {
    let src = r#"{"body": [
        {"for": {"var": "w", "values": [10, 20, 30], "body": [
            {"stimulus": {
                "stimulusType": "BAR", "lifespan": {"$div": [{"$var": "windowWidth"}, 640]},
                "speed": 100, "width": {"$var": "w"}, "angle": 0, "barColor": "white"
            }}
        ]}}
    ]}"#;
    let out = run(src, 1);
    let widths: Vec<f64> = out
        .iter()
        .map(|s| match s.kind() {
            StimulusKind::Bar { width, .. } => *width,
            _ => panic!("expected bar"),
        })
        .collect();
    assert_eq!(widths, vec![10.0, 20.0, 30.0]);
    assert!(out.iter().all(|s| s.lifespan() == 1.0));
}

#[test]
fn for_value_is_resolved_once_per_iteration() {
    let src = r#"{"body": [
        {"for": {"var": "x", "values": [{"$uniform": [0, 1e6]}, {"$uniform": [0, 1e6]}], "body": [
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 1, "metadata": {"x": {"$var": "x"}}}},
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 1, "metadata": {"x": {"$var": "x"}}}}
        ]}}
    ]}"#;
    let xs: Vec<String> = run(src, 3)
        .iter()
        .map(|s| s.metadata()["x"].clone())
        .collect();
    assert_eq!(xs.len(), 4);
    assert_eq!(xs[0], xs[1]);
    assert_eq!(xs[2], xs[3]);
    assert_ne!(xs[0], xs[2]);

    // Two draws in total: the second iteration sees the generator's second value.
    let mut rng = crate::program::random::DeterministicRandom::new(3);
    let first = rng.uniform01() * 1e6;
    let second = rng.uniform01() * 1e6;
    assert_eq!(xs[0].parse::<f64>().unwrap(), first);
    assert_eq!(xs[2].parse::<f64>().unwrap(), second);
}

#[test]
fn shuffle_is_a_seeded_permutation_of_units() {
    let src = r#"{"body": [
        {"shuffle": {"times": 3, "body": [
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 1}},
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 2}}
        ]}}
    ]}"#;
    let a: Vec<f64> = run(src, 42).iter().map(StimulusSpec::lifespan).collect();
    let b: Vec<f64> = run(src, 42).iter().map(StimulusSpec::lifespan).collect();
    assert_eq!(a, b);

    let mut sorted = a.clone();
    sorted.sort_by(f64::total_cmp);
    assert_eq!(sorted, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);

    let differs = (0..20u32).any(|seed| {
        run(src, seed)
            .iter()
            .map(StimulusSpec::lifespan)
            .collect::<Vec<_>>()
            != a
    });
    assert!(differs);
}

#[test]
fn expressions_are_deterministic_per_seed() {
    let src = r#"{"body": [
        {"repeat": {"times": 5, "body": [
            {"stimulus": {
                "stimulusType": "WAIT",
                "lifespan": {"$div": [{"$randi": [30, 45]}, 60]},
                "metadata": {"group": "$uuid", "pick": {"$choice": ["x", "y", "z"]}}
            }}
        ]}}
    ]}"#;
    let a = run(src, 7);
    let b = run(src, 7);
    assert_eq!(a, b);
    for s in &a {
        let frames = s.lifespan() * 60.0;
        assert!((30.0..45.0).contains(&frames.round()));
        assert_eq!(s.metadata()["group"].len(), 36);
        assert!(["x", "y", "z"].contains(&s.metadata()["pick"].as_str()));
    }
}

#[test]
fn integrity_flashes_precede_unblocked_stimuli() {
    let src = r#"{
        "integrity": {"every_secs": 5},
        "body": [
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 3}},
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 3}},
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 3, "metadata": {"block": true}}},
            {"stimulus": {"stimulusType": "WAIT", "lifespan": 3}}
        ]
    }"#;
    let out = run(src, 1);
    let labels: Vec<Option<&str>> = out
        .iter()
        .map(|s| s.metadata().get("label").map(String::as_str))
        .collect();
    // flash, s0, s1, s2 (blocked), flash, s3
    assert_eq!(out.len(), 10);
    assert_eq!(&labels[0..3], &[Some("integrity"); 3]);
    assert!(labels[3..6].iter().all(Option::is_none));
    assert_eq!(&labels[6..9], &[Some("integrity"); 3]);
    assert_eq!(out[1].tag(), StimulusTag::Solid);
    assert_eq!(out[1].background_color(), crate::foundation::color::Color::WHITE);
    assert_eq!(
        out[0].metadata()["group"],
        out[2].metadata()["group"],
    );
    assert_ne!(out[0].metadata()["group"], out[6].metadata()["group"]);
}

#[test]
fn malformed_text_is_a_syntax_error() {
    let err = run_err("{\"body\": [");
    assert_eq!(err.name, "SyntaxError");
    assert!(err.stack.starts_with("<program>:"));

    let err = run_err(r#"{"body": [{"loop": {}}]}"#);
    assert_eq!(err.name, "SyntaxError");
}

#[test]
fn bad_template_reports_a_type_error_with_path() {
    let err = run_err(
        r#"{"body": [{"repeat": {"times": 1, "body": [
            {"stimulus": {"stimulusType": "WAIT", "lifespan": "long"}}
        ]}}]}"#,
    );
    assert_eq!(err.name, "TypeError");
    assert_eq!(err.stack, "body[0].repeat.body[0].stimulus");
}

#[test]
fn unknown_variable_is_a_reference_error() {
    let err = run_err(
        r#"{"body": [{"stimulus": {"stimulusType": "WAIT", "lifespan": {"$var": "nope"}}}]}"#,
    );
    assert_eq!(err.name, "ReferenceError");
    assert!(err.message.contains("nope"));
}

#[test]
fn empty_randi_range_is_a_range_error() {
    let err = run_err(
        r#"{"body": [{"stimulus": {"stimulusType": "WAIT", "lifespan": {"$randi": [3, 3]}}}]}"#,
    );
    assert_eq!(err.name, "RangeError");
}

#[test]
fn empty_program_is_immediately_done() {
    assert!(run(r#"{"body": []}"#, 1).is_empty());
    assert!(run(r#"{"body": [{"repeat": {"times": 0, "body": [{"stimulus": {"stimulusType": "WAIT", "lifespan": 1}}]}}]}"#, 1).is_empty());
}

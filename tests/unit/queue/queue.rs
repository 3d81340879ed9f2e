use crate::foundation::core::{Canvas, Fps};
use crate::program::declarative::DeclarativeHost;
use crate::program::engine::ProgramEngine;
use crate::queue::plan::{RunPlan, format_duration};
use crate::queue::stimulus_queue::{GenerationSlice, GenerationStatus, StimulusQueue};
use std::io::Write;
use std::sync::{Arc, Mutex};

fn engine(source: &str) -> ProgramEngine {
    let canvas = Canvas::new(64, 64).unwrap();
    let mut engine = ProgramEngine::compile(&DeclarativeHost, source, 1, canvas).unwrap();
    engine.initialize().unwrap();
    engine
}

fn waits(lifespans: &[f64]) -> String {
    let body: Vec<String> = lifespans
        .iter()
        .map(|l| format!(r#"{{"stimulus": {{"stimulusType": "WAIT", "lifespan": {l}}}}}"#))
        .collect();
    format!(r#"{{"body": [{}]}}"#, body.join(","))
}

#[test]
fn duration_accounting_matches_lifespans() {
    let mut e = engine(&waits(&[2.0, 0.5, 1.5]));
    let mut q = StimulusQueue::new(0.0);
    let status = q.generate_all(&mut e, &GenerationSlice::default()).unwrap();
    assert_eq!(status, GenerationStatus::Exhausted);
    assert_eq!(q.total_duration_secs(), 4.0);
    let fps = Fps::new(30).unwrap();
    assert_eq!(q.expected_frame_count(fps), 120);

    let plan = RunPlan::new(Canvas::new(64, 64).unwrap(), fps, 4.0, 3, None);
    assert_eq!(plan.expected_frame_count, 120);
}

#[test]
fn cap_keeps_the_crossing_stimulus() {
    let mut e = engine(&waits(&[1.0, 1.0, 1.0, 1.0]));
    let mut q = StimulusQueue::new(1.5);
    let status = q.generate_all(&mut e, &GenerationSlice::default()).unwrap();
    assert_eq!(status, GenerationStatus::Capped);
    assert_eq!(q.len(), 2);
    assert_eq!(q.total_duration_secs(), 2.0);
}

#[test]
fn slices_bound_the_work_per_call() {
    let mut e = engine(&waits(&[0.1; 7]));
    let mut q = StimulusQueue::new(0.0);
    let slice = GenerationSlice {
        max_stimuli: 3,
        max_millis: 10_000,
    };
    let (s1, st1) = q.generate_slice(&mut e, &slice).unwrap();
    assert_eq!((s1, st1.pulled), (GenerationStatus::InProgress, 3));
    let (s2, _) = q.generate_slice(&mut e, &slice).unwrap();
    assert_eq!(s2, GenerationStatus::InProgress);
    let (s3, st3) = q.generate_slice(&mut e, &slice).unwrap();
    assert_eq!((s3, st3.pulled), (GenerationStatus::Exhausted, 1));
    assert_eq!(q.generated(), 7);

    let (again, st) = q.generate_slice(&mut e, &slice).unwrap();
    assert_eq!((again, st.pulled), (GenerationStatus::Exhausted, 0));
}

#[test]
fn batches_drain_fifo_until_exhausted() {
    let lifespans: Vec<f64> = (1..=5).map(f64::from).collect();
    let mut e = engine(&waits(&lifespans));
    let mut q = StimulusQueue::new(0.0);
    q.generate_all(&mut e, &GenerationSlice::default()).unwrap();

    let first: Vec<f64> = q.take_batch(2).iter().map(|s| s.lifespan()).collect();
    let second: Vec<f64> = q.take_batch(2).iter().map(|s| s.lifespan()).collect();
    assert_eq!(first, vec![1.0, 2.0]);
    assert_eq!(second, vec![3.0, 4.0]);
    assert!(!q.is_exhausted());
    assert_eq!(q.take_batch(50).len(), 1);
    assert!(q.is_exhausted());
    assert!(q.take_batch(50).is_empty());
}

#[test]
fn collects_image_set() {
    let src = r#"{"body": [
        {"stimulus": {"stimulusType": "IMAGE", "lifespan": 1, "image": "a.png"}},
        {"stimulus": {"stimulusType": "IMAGE", "lifespan": 1, "image": "b.png"}},
        {"stimulus": {"stimulusType": "IMAGE", "lifespan": 1, "image": "a.png"}}
    ]}"#;
    let mut e = engine(src);
    let mut q = StimulusQueue::new(0.0);
    q.generate_all(&mut e, &GenerationSlice::default()).unwrap();
    let images: Vec<&str> = q.images().iter().map(String::as_str).collect();
    assert_eq!(images, vec!["a.png", "b.png"]);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn stim_log_writes_one_json_line_per_stimulus() {
    let buf = SharedBuf::default();
    let mut e = engine(&waits(&[1.0, 2.0]));
    let mut q = StimulusQueue::new(0.0).with_stim_log(Box::new(buf.clone()));
    q.generate_all(&mut e, &GenerationSlice::default()).unwrap();

    let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let v: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(v["stimulusType"], "WAIT");
    assert_eq!(v["lifespan"], 2.0);
}

#[test]
fn program_errors_stop_generation() {
    let src = r#"{"body": [
        {"stimulus": {"stimulusType": "WAIT", "lifespan": 1}},
        {"stimulus": {"stimulusType": "WAIT", "lifespan": {"$var": "missing"}}}
    ]}"#;
    let mut e = engine(src);
    let mut q = StimulusQueue::new(0.0);
    let err = q
        .generate_all(&mut e, &GenerationSlice::default())
        .unwrap_err();
    assert!(err.is_program());
    assert_eq!(q.len(), 1);
}

#[test]
fn duration_summary_layout() {
    assert_eq!(format_duration(3, 4.0), "3 total, 4.0 sec");
    assert_eq!(format_duration(10, 125.5), "10 total, 2 mins, 5.5 sec");
    assert_eq!(format_duration(1, 3661.0), "1 total, 1 hours, 1 mins, 1.0 sec");
    assert_eq!(format_duration(1, 3600.0), "1 total, 1 hours, 0 mins, 0.0 sec");
}

use super::*;
use std::collections::VecDeque;

struct Scripted {
    metadata: ProgramMetadata,
    steps: VecDeque<Result<ProgramNext, ProgramError>>,
    init_calls: usize,
}

impl ProgramSession for Scripted {
    fn metadata(&self) -> &ProgramMetadata {
        &self.metadata
    }

    fn initialize(&mut self) -> Result<(), ProgramError> {
        self.init_calls += 1;
        Ok(())
    }

    fn next(&mut self) -> Result<ProgramNext, ProgramError> {
        self.steps
            .pop_front()
            .unwrap_or_else(|| Ok(ProgramNext::done(0)))
    }
}

struct ScriptedHost(Vec<Result<ProgramNext, ProgramError>>);

impl ProgramHost for ScriptedHost {
    fn compile(
        &self,
        _source: &str,
        _seed: u32,
        _canvas: Canvas,
    ) -> Result<Box<dyn ProgramSession>, ProgramError> {
        Ok(Box::new(Scripted {
            metadata: ProgramMetadata::new(),
            steps: self.0.clone().into(),
            init_calls: 0,
        }))
    }
}

struct RejectingHost;

impl ProgramHost for RejectingHost {
    fn compile(
        &self,
        _source: &str,
        _seed: u32,
        _canvas: Canvas,
    ) -> Result<Box<dyn ProgramSession>, ProgramError> {
        Err(ProgramError::new("SyntaxError", "unexpected token", "<program>:1"))
    }
}

fn canvas() -> Canvas {
    Canvas::new(64, 64).unwrap()
}

fn wait(l: f64) -> Result<ProgramNext, ProgramError> {
    Ok(ProgramNext::yielded(0, StimulusSpec::wait(l).unwrap()))
}

#[test]
fn next_before_initialize_is_rejected() {
    let host = ScriptedHost(vec![wait(1.0)]);
    let mut engine = ProgramEngine::compile(&host, "", 1, canvas()).unwrap();
    assert!(matches!(
        engine.next_step(),
        Err(EyeCandyError::Configuration(_))
    ));
}

#[test]
fn initialize_is_accepted_once() {
    let host = ScriptedHost(vec![]);
    let mut engine = ProgramEngine::compile(&host, "", 1, canvas()).unwrap();
    engine.initialize().unwrap();
    assert!(engine.initialize().is_err());
}

#[test]
fn indices_count_up_and_done_is_sticky() {
    let host = ScriptedHost(vec![wait(1.0), wait(2.0)]);
    let mut engine = ProgramEngine::compile(&host, "", 7, canvas()).unwrap();
    engine.initialize().unwrap();

    let a = engine.next_step().unwrap();
    let b = engine.next_step().unwrap();
    assert_eq!((a.done, a.stimulus_index), (false, 0));
    assert_eq!((b.done, b.stimulus_index), (false, 1));
    assert_eq!(b.value.unwrap().lifespan(), 2.0);

    for _ in 0..3 {
        let d = engine.next_step().unwrap();
        assert!(d.done);
        assert!(d.value.is_none());
        assert_eq!(d.stimulus_index, 2);
    }
    assert!(engine.is_done());
    assert_eq!(engine.yielded(), 2);
}

#[test]
fn error_poisons_the_cursor() {
    let host = ScriptedHost(vec![
        wait(1.0),
        Err(ProgramError::new("RangeError", "bad range", "body[1]")),
        wait(3.0),
    ]);
    let mut engine = ProgramEngine::compile(&host, "", 1, canvas()).unwrap();
    engine.initialize().unwrap();
    engine.next_step().unwrap();

    let err = engine.next_step().unwrap_err();
    let EyeCandyError::Program(p) = err else {
        panic!("expected program error");
    };
    assert_eq!(p.name, "RangeError");
    assert!(engine.next_step().is_err());
    assert!(engine.next().is_none());
}

#[test]
fn missing_value_is_a_type_error() {
    let host = ScriptedHost(vec![Ok(ProgramNext {
        done: false,
        stimulus_index: 0,
        value: None,
    })]);
    let mut engine = ProgramEngine::compile(&host, "", 1, canvas()).unwrap();
    engine.initialize().unwrap();
    let err = engine.next_step().unwrap_err();
    assert!(err.is_program());
    assert!(err.to_string().contains("TypeError"));
}

#[test]
fn compile_errors_surface_as_program_errors() {
    let err = ProgramEngine::compile(&RejectingHost, "{", 1, canvas()).unwrap_err();
    let EyeCandyError::Program(p) = err else {
        panic!("expected program error");
    };
    assert_eq!(p.name, "SyntaxError");
    assert!(p.report().contains("Stack: <program>:1"));
}

#[test]
fn iterates_as_a_lazy_sequence() {
    let host = ScriptedHost(vec![wait(1.0), wait(2.0), wait(3.0)]);
    let mut engine = ProgramEngine::compile(&host, "", 1, canvas()).unwrap();
    engine.initialize().unwrap();
    let lifespans: Vec<f64> = engine
        .by_ref()
        .map(|s| s.unwrap().lifespan())
        .collect();
    assert_eq!(lifespans, vec![1.0, 2.0, 3.0]);
    assert!(engine.is_done());
}

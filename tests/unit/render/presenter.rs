use super::*;
use crate::foundation::color::Color;

struct Batches {
    batches: VecDeque<Vec<StimulusSpec>>,
    calls: usize,
}

impl Batches {
    fn new(batches: Vec<Vec<StimulusSpec>>) -> Self {
        Self {
            batches: batches.into(),
            calls: 0,
        }
    }
}

impl StimulusSource for Batches {
    fn next_batch(&mut self) -> EyeCandyResult<Vec<StimulusSpec>> {
        self.calls += 1;
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

fn presenter(threshold: usize) -> Presenter {
    Presenter::new(Canvas::new(2, 2).unwrap(), Fps::new(10).unwrap(), 1, threshold)
}

fn solid(secs: f64, shade: u8) -> StimulusSpec {
    StimulusSpec::solid(secs, Color::gray(shade)).unwrap()
}

fn drain(p: &mut Presenter, source: &mut dyn StimulusSource) -> Vec<u8> {
    let mut shades = Vec::new();
    while let Some(f) = p.next_frame(source).unwrap() {
        shades.push(f.data[0]);
    }
    shades
}

#[test]
fn each_stimulus_is_shown_for_its_frame_count() {
    let mut source = Batches::new(vec![vec![solid(0.2, 1), solid(0.3, 2)]]);
    let mut p = presenter(0);
    assert_eq!(p.state(), PresenterState::Starting);
    assert_eq!(drain(&mut p, &mut source), vec![1, 1, 2, 2, 2]);
    assert!(p.is_complete());
    assert_eq!(p.frames_drawn(), 5);
    assert!(p.next_frame(&mut source).unwrap().is_none());
}

#[test]
fn zero_frame_stimuli_are_skipped() {
    let mut source = Batches::new(vec![vec![solid(0.0, 9), solid(0.1, 3), solid(0.01, 9)]]);
    let mut p = presenter(0);
    assert_eq!(drain(&mut p, &mut source), vec![3]);
}

#[test]
fn refills_only_at_the_reload_threshold() {
    let first: Vec<StimulusSpec> = (0..4).map(|i| solid(0.1, i)).collect();
    let second: Vec<StimulusSpec> = (4..6).map(|i| solid(0.1, i)).collect();
    let mut source = Batches::new(vec![first, second]);
    let mut p = presenter(2);

    p.next_frame(&mut source).unwrap();
    assert_eq!(source.calls, 1);
    assert_eq!(p.queued(), 3);

    p.next_frame(&mut source).unwrap();
    assert_eq!(source.calls, 1, "three queued is above the threshold");
    p.next_frame(&mut source).unwrap();
    assert_eq!(source.calls, 2);

    assert_eq!(drain(&mut p, &mut source), vec![3, 4, 5]);
    assert_eq!(source.calls, 3);
}

#[test]
fn age_advances_by_one_frame_per_draw() {
    fn paint_age(spec: &StimulusSpec, _: &DrawContext<'_>, f: &mut FrameBuffer) -> EyeCandyResult<()> {
        f.data[0] = (spec.age() * 100.0).round() as u8;
        Ok(())
    }
    let table = DrawTable::standard().with_entry(crate::stimulus::spec::StimulusTag::Wait, paint_age);
    let mut p = presenter(0).with_draw_table(table);
    let mut source: VecDeque<StimulusSpec> = [StimulusSpec::wait(0.3).unwrap()].into();
    assert_eq!(drain(&mut p, &mut source), vec![0, 10, 20]);
}

#[test]
fn empty_source_completes_immediately() {
    let mut p = presenter(25);
    let mut source = VecDeque::<StimulusSpec>::new();
    assert!(p.next_frame(&mut source).unwrap().is_none());
    assert_eq!(p.state(), PresenterState::Complete);
}

use super::*;
use crate::foundation::core::Fps;
use crate::stimulus::spec::StimulusSpec;
use std::collections::VecDeque;

fn surface(startup: u64) -> HeadlessSurface {
    let canvas = Canvas::new(2, 2).unwrap();
    let presenter = Presenter::new(canvas, Fps::new(10).unwrap(), 0, 25);
    HeadlessSurface::new(presenter, canvas, startup)
}

fn program() -> VecDeque<StimulusSpec> {
    [StimulusSpec::solid(0.2, Color::WHITE).unwrap()].into()
}

#[test]
fn startup_frames_precede_presentation() {
    let mut s = surface(3);
    let mut source = program();
    let kinds: Vec<(TickKind, Option<u64>)> = (0..7)
        .map(|_| {
            let t = s.tick(&mut source).unwrap();
            (t.kind, t.first_live)
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (TickKind::PreRoll, None),
            (TickKind::PreRoll, None),
            (TickKind::PreRoll, None),
            (TickKind::Live, Some(3)),
            (TickKind::Live, None),
            (TickKind::Idle, None),
            (TickKind::Idle, None),
        ]
    );
    assert!(s.is_idle());
    assert_eq!(s.produced(), 7);
    assert_eq!(s.first_live(), Some(3));
}

#[test]
fn padding_shifts_the_reported_first_live_frame() {
    let mut s = surface(1).with_padding(DEFAULT_PREROLL_PADDING_FRAMES);
    let mut source = program();
    s.tick(&mut source).unwrap();
    let live = s.tick(&mut source).unwrap();
    assert_eq!(live.index, 1);
    assert_eq!(live.first_live, Some(3));
    assert_eq!(live.frame.pixel(0, 0), Some([255, 255, 255, 255]));
}

use super::*;
use crate::stimulus::spec::{FixationPoint, ImageScale};

fn canvas(w: u32, h: u32) -> Canvas {
    Canvas::new(w, h).unwrap()
}

fn ctx(canvas: Canvas, images: &ImageCache) -> DrawContext<'_> {
    DrawContext {
        canvas,
        fps: Fps::new(60).unwrap(),
        seed: 7,
        stimulus_index: 0,
        frame: 0,
        images,
    }
}

#[test]
fn solid_and_wait_fill_the_background() {
    let images = ImageCache::default();
    let table = DrawTable::standard();
    let c = canvas(4, 2);
    let solid = StimulusSpec::solid(1.0, Color::rgb(10, 20, 30)).unwrap();
    let f = table.render(&solid, &ctx(c, &images)).unwrap();
    assert!(f.data.chunks_exact(4).all(|p| p == [10, 20, 30, 255]));

    let wait = StimulusSpec::wait(1.0).unwrap();
    let f = table.render(&wait, &ctx(c, &images)).unwrap();
    assert!(f.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

#[test]
fn bar_reaches_the_center_after_half_a_diagonal() {
    let images = ImageCache::default();
    let c = canvas(20, 10);
    let speed = c.diagonal() / 2.0;
    let mut bar = StimulusSpec::new(
        2.0,
        None,
        StimulusKind::Bar {
            speed,
            width: 4.0,
            angle: 0.0,
            bar_color: Color::WHITE,
        },
    )
    .unwrap();

    let start = DrawTable::standard().render(&bar, &ctx(c, &images)).unwrap();
    assert!(start.data.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));

    bar.advance_age(1.0);
    let f = DrawTable::standard().render(&bar, &ctx(c, &images)).unwrap();
    assert_eq!(f.pixel(9, 5), Some([0, 0, 0, 255]));
    assert_eq!(f.pixel(10, 0), Some([255, 255, 255, 255]));
    assert_eq!(f.pixel(13, 9), Some([255, 255, 255, 255]));
    assert_eq!(f.pixel(14, 5), Some([0, 0, 0, 255]));
}

#[test]
fn unrotated_checkerboard_is_anchored_at_the_origin() {
    let images = ImageCache::default();
    let board = StimulusSpec::new(
        1.0,
        None,
        StimulusKind::Checkerboard {
            color: Color::WHITE,
            alternate_color: Color::BLACK,
            size: 2.0,
            angle: 0.0,
        },
    )
    .unwrap();
    let f = DrawTable::standard()
        .render(&board, &ctx(canvas(4, 4), &images))
        .unwrap();
    assert_eq!(f.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(f.pixel(1, 1), Some([255, 255, 255, 255]));
    assert_eq!(f.pixel(2, 0), Some([0, 0, 0, 255]));
    assert_eq!(f.pixel(0, 2), Some([0, 0, 0, 255]));
    assert_eq!(f.pixel(3, 3), Some([255, 255, 255, 255]));
}

#[test]
fn chirp_starts_at_full_amplitude_around_mid_gray() {
    assert_eq!(chirp_value(0.0, 1.0, 5.0, 127.5, 127.5, 2.0, 0.0), 255);
    assert_eq!(chirp_value(0.0, 1.0, 5.0, 127.5, 127.5, 2.0, PI), 0);
    assert_eq!(chirp_value(3.0, 1.0, 5.0, 0.0, 0.0, 2.0, 0.0), 128);
}

#[test]
fn sinusoidal_grating_stays_between_background_and_bar_color() {
    let images = ImageCache::default();
    let spec = StimulusSpec::new(
        1.0,
        Some(Color::gray(40)),
        StimulusKind::SinusoidalGrating {
            speed: 10.0,
            width: 8.0,
            angle: 0.3,
            bar_color: Color::gray(200),
        },
    )
    .unwrap();
    let f = DrawTable::standard()
        .render(&spec, &ctx(canvas(32, 16), &images))
        .unwrap();
    let values: Vec<u8> = f.data.chunks_exact(4).map(|p| p[0]).collect();
    assert!(values.iter().all(|v| (40..=200).contains(v)));
    assert!(values.iter().any(|&v| v < 60));
    assert!(values.iter().any(|&v| v > 180));
}

#[test]
fn white_noise_is_reproducible_per_frame() {
    let images = ImageCache::default();
    let spec = StimulusSpec::new(
        1.0,
        None,
        StimulusKind::WhiteNoise {
            rows: 4,
            cols: 4,
            color: Color::WHITE,
        },
    )
    .unwrap();
    let c = canvas(8, 8);
    let table = DrawTable::standard();
    let a = table.render(&spec, &ctx(c, &images)).unwrap();
    let b = table.render(&spec, &ctx(c, &images)).unwrap();
    assert_eq!(a, b);

    let next = DrawContext {
        frame: 1,
        ..ctx(c, &images)
    };
    assert_ne!(a, table.render(&spec, &next).unwrap());

    // Each grid cell covers a 2x2 block.
    assert_eq!(a.pixel(0, 0), a.pixel(1, 1));
    assert_eq!(noise_value(1, 2, 3, 4), noise_value(1, 2, 3, 4));
}

#[test]
fn image_is_placed_from_the_cache() {
    let mut images = ImageCache::default();
    images.insert("red.png", image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255])));
    let c = canvas(4, 4);

    let centered = StimulusSpec::new(
        1.0,
        None,
        StimulusKind::Image {
            image: "red.png".to_owned(),
            fixation_point: None,
            scale: ImageScale::Uniform(1.0),
        },
    )
    .unwrap();
    let f = DrawTable::standard().render(&centered, &ctx(c, &images)).unwrap();
    assert_eq!(f.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(f.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(f.pixel(2, 2), Some([0, 0, 0, 255]));

    let shifted = StimulusSpec::new(
        1.0,
        None,
        StimulusKind::Image {
            image: "red.png".to_owned(),
            fixation_point: Some(FixationPoint { x: 0.0, y: 0.0 }),
            scale: ImageScale::Uniform(1.0),
        },
    )
    .unwrap();
    let f = DrawTable::standard().render(&shifted, &ctx(c, &images)).unwrap();
    assert_eq!(f.pixel(1, 1), Some([0, 0, 0, 255]));
    assert_eq!(f.pixel(2, 2), Some([255, 0, 0, 255]));
    assert_eq!(f.pixel(3, 3), Some([255, 0, 0, 255]));
}

#[test]
fn missing_image_is_an_error() {
    let images = ImageCache::default();
    let spec = StimulusSpec::new(
        1.0,
        None,
        StimulusKind::Image {
            image: "nope.png".to_owned(),
            fixation_point: None,
            scale: ImageScale::default(),
        },
    )
    .unwrap();
    let err = DrawTable::standard()
        .render(&spec, &ctx(canvas(2, 2), &images))
        .unwrap_err();
    assert!(err.to_string().contains("nope.png"));
}

#[test]
fn entries_can_be_replaced() {
    fn paint_red(_: &StimulusSpec, _: &DrawContext<'_>, f: &mut FrameBuffer) -> EyeCandyResult<()> {
        for p in f.data.chunks_exact_mut(4) {
            p.copy_from_slice(&[255, 0, 0, 255]);
        }
        Ok(())
    }
    let images = ImageCache::default();
    let table = DrawTable::standard().with_entry(StimulusTag::Wait, paint_red);
    let f = table
        .render(&StimulusSpec::wait(1.0).unwrap(), &ctx(canvas(2, 2), &images))
        .unwrap();
    assert_eq!(f.pixel(1, 1), Some([255, 0, 0, 255]));
}

use super::*;
use crate::foundation::core::{Canvas, Fps};

#[test]
fn artifact_paths_share_the_run_name() {
    let layout = OutputLayout::new("/tmp/renders", "run1");
    assert_eq!(layout.dir(), Path::new("/tmp/renders/run1"));
    assert_eq!(layout.video(), PathBuf::from("/tmp/renders/run1/run1.mp4"));
    assert_eq!(layout.stimuli(), PathBuf::from("/tmp/renders/run1/run1.stim"));
    assert_eq!(layout.info(), PathBuf::from("/tmp/renders/run1/run1.info.json"));
    assert_eq!(
        layout.program(),
        PathBuf::from("/tmp/renders/run1/run1.program.json")
    );
}

#[test]
fn writes_info_and_program() {
    let root = std::env::temp_dir().join(format!("eyecandy-output-{}", std::process::id()));
    let layout = OutputLayout::new(&root, "r");
    let plan = RunPlan::new(
        Canvas::new(4, 2).unwrap(),
        Fps::new(30).unwrap(),
        4.0,
        3,
        Some(layout.video()),
    );
    let info = RunInfo::new("demo", ProgramMetadata::new(), 5, &plan, "3 total, 4.0 sec".to_owned())
        .with_encoder(EncoderInfo {
            name: "memory".to_owned(),
            version: "1".to_owned(),
        });
    layout.write_info(&info).unwrap();
    layout.write_program("{\"body\": []}").unwrap();

    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(layout.info()).unwrap()).unwrap();
    assert_eq!(v["expected_frame_count"], 120);
    assert_eq!(v["seed"], 5);
    assert_eq!(v["encoder"]["name"], "memory");
    assert_eq!(
        std::fs::read_to_string(layout.program()).unwrap(),
        "{\"body\": []}"
    );

    let mut w = layout.stim_writer().unwrap();
    w.write_all(b"x\n").unwrap();
    w.flush().unwrap();
    drop(w);
    assert_eq!(std::fs::read_to_string(layout.stimuli()).unwrap(), "x\n");
    std::fs::remove_dir_all(&root).unwrap();
}

use crate::encode::encoder::EncoderInfo;
use crate::foundation::error::EyeCandyResult;
use crate::program::host::ProgramMetadata;
use crate::queue::plan::RunPlan;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Artifact paths of one run, all under `<root>/<name>/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
    name: String,
}

impl OutputLayout {
    /// Layout for run `name` under `root`.
    pub fn new(root: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dir: root.as_ref().join(&name),
            name,
        }
    }

    /// Run directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<name>.mp4`.
    pub fn video(&self) -> PathBuf {
        self.file("mp4")
    }

    /// `<name>.stim`, one JSON stimulus per line.
    pub fn stimuli(&self) -> PathBuf {
        self.file("stim")
    }

    /// `<name>.info.json`.
    pub fn info(&self) -> PathBuf {
        self.file("info.json")
    }

    /// `<name>.program.json`, a copy of the program source.
    pub fn program(&self) -> PathBuf {
        self.file("program.json")
    }

    fn file(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{ext}", self.name))
    }

    /// Create the run directory and its parents.
    pub fn create_dir(&self) -> EyeCandyResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output directory '{}'", self.dir.display()))?;
        Ok(())
    }

    /// Buffered writer for the `.stim` log, truncating any previous one.
    pub fn stim_writer(&self) -> EyeCandyResult<Box<dyn Write + Send>> {
        self.create_dir()?;
        let path = self.stimuli();
        let f = File::create(&path).with_context(|| format!("create '{}'", path.display()))?;
        Ok(Box::new(BufWriter::new(f)))
    }

    /// Copy the program source next to the video.
    pub fn write_program(&self, source: &str) -> EyeCandyResult<()> {
        self.create_dir()?;
        let path = self.program();
        std::fs::write(&path, source).with_context(|| format!("write '{}'", path.display()))?;
        Ok(())
    }

    /// Write the run info as pretty JSON.
    pub fn write_info(&self, info: &RunInfo) -> EyeCandyResult<()> {
        self.create_dir()?;
        let path = self.info();
        let text = serde_json::to_string_pretty(info)?;
        std::fs::write(&path, text).with_context(|| format!("write '{}'", path.display()))?;
        Ok(())
    }
}

/// Contents of `<name>.info.json`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunInfo {
    /// Program name from the run config.
    pub program_name: String,
    /// Metadata declared by the program.
    pub program_metadata: ProgramMetadata,
    /// Seed the stimuli were generated with.
    pub seed: u32,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Frame rate.
    pub fps: u32,
    /// Stimuli generated.
    pub stimulus_count: u64,
    /// Summed stimulus lifespan.
    pub total_duration_secs: f64,
    /// Frames the video should contain.
    pub expected_frame_count: u64,
    /// Generation summary line.
    pub summary: String,
    /// Encoder probe result; absent for dry runs.
    pub encoder: Option<EncoderInfo>,
}

impl RunInfo {
    /// Run info for a finished generation pass.
    pub fn new(
        program_name: impl Into<String>,
        program_metadata: ProgramMetadata,
        seed: u32,
        plan: &RunPlan,
        summary: String,
    ) -> Self {
        Self {
            program_name: program_name.into(),
            program_metadata,
            seed,
            width: plan.canvas.width,
            height: plan.canvas.height,
            fps: plan.fps.get(),
            stimulus_count: plan.stimulus_count,
            total_duration_secs: plan.total_duration_secs,
            expected_frame_count: plan.expected_frame_count,
            summary,
            encoder: None,
        }
    }

    /// Attach the encoder probe result.
    pub fn with_encoder(mut self, encoder: EncoderInfo) -> Self {
        self.encoder = Some(encoder);
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/output.rs"]
mod tests;

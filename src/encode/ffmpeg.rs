use crate::encode::encoder::{
    EncoderConfig, EncoderInfo, FrameId, VideoEncoder, ensure_parent_dir,
};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::render::frame::FrameBuffer;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

/// Options for [`FfmpegEncoder`].
#[derive(Clone, Debug)]
pub struct FfmpegEncoderOpts {
    /// Executable to run; a bare name is looked up on `PATH`.
    pub ffmpeg_path: PathBuf,
    /// Value passed to `-c:v`.
    pub video_codec: String,
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_owned(),
        }
    }
}

type FrameMsg = (FrameId, Arc<FrameBuffer>);

/// Encoder that spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
///
/// A writer thread consumes submitted frames in order and reports each id once its bytes are
/// in the pipe. stderr is drained on its own thread and attached to close errors.
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,

    child: Option<Child>,
    frames_tx: Option<mpsc::Sender<FrameMsg>>,
    done_rx: Option<mpsc::Receiver<FrameId>>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<EncoderConfig>,
    next_id: u64,
}

impl FfmpegEncoder {
    /// Encoder running ffmpeg as configured by `opts`.
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self {
            opts,
            child: None,
            frames_tx: None,
            done_rx: None,
            writer: None,
            stderr_drain: None,
            cfg: None,
            next_id: 0,
        }
    }

    fn command(&self, cfg: &EncoderConfig) -> Command {
        let mut cmd = Command::new(&self.opts.ffmpeg_path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if cfg.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
            "-r",
            &cfg.fps.get().to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            &self.opts.video_codec,
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);
        cmd
    }

    fn join_stderr(&mut self) -> String {
        match self.stderr_drain.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_owned(),
            _ => String::new(),
        }
    }

    fn writer_failure(&mut self) -> EyeCandyError {
        let reason = match self.writer.take().map(JoinHandle::join) {
            Some(Ok(Err(e))) => e.to_string(),
            Some(Err(_)) => "ffmpeg writer thread panicked".to_owned(),
            _ => "ffmpeg writer stopped".to_owned(),
        };
        EyeCandyError::encoder_io(format!("failed to write frame to ffmpeg stdin: {reason}"))
    }
}

/// Extract `X` from a `ffmpeg version X ...` banner.
pub fn parse_ffmpeg_version(text: &str) -> Option<String> {
    let mut words = text.lines().next()?.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("ffmpeg"), Some("version"), Some(v)) => Some(v.to_owned()),
        _ => None,
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn probe(&mut self) -> EyeCandyResult<EncoderInfo> {
        let path = self.opts.ffmpeg_path.display().to_string();
        let out = Command::new(&self.opts.ffmpeg_path)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                EyeCandyError::encoder_unavailable(format!("could not run '{path}': {e}"))
            })?;
        if !out.status.success() {
            return Err(EyeCandyError::encoder_unavailable(format!(
                "'{path} -version' exited with status {}",
                out.status
            )));
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        let version = parse_ffmpeg_version(&stdout).ok_or_else(|| {
            EyeCandyError::encoder_unavailable(format!(
                "'{path}' does not look like ffmpeg: {}",
                stdout.lines().next().unwrap_or_default()
            ))
        })?;
        tracing::info!(%version, "ffmpeg available");
        Ok(EncoderInfo {
            name: "ffmpeg".to_owned(),
            version,
        })
    }

    #[tracing::instrument(skip(self), fields(out = %cfg.out_path.display()))]
    fn open(&mut self, cfg: &EncoderConfig) -> EyeCandyResult<()> {
        if self.child.is_some() {
            return Err(EyeCandyError::encoder_io("ffmpeg encoder is already open"));
        }
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;
        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(EyeCandyError::encoder_io(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        let mut child = self.command(cfg).spawn().map_err(|e| {
            EyeCandyError::encoder_unavailable(format!(
                "failed to spawn '{}': {e}",
                self.opts.ffmpeg_path.display()
            ))
        })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EyeCandyError::encoder_io("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EyeCandyError::encoder_io("failed to open ffmpeg stderr (unexpected)"))?;

        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        let (frames_tx, frames_rx) = mpsc::channel::<FrameMsg>();
        let (done_tx, done_rx) = mpsc::channel::<FrameId>();
        let writer = std::thread::Builder::new()
            .name("eyecandy-ffmpeg-writer".to_owned())
            .spawn(move || -> std::io::Result<()> {
                for (id, frame) in frames_rx {
                    stdin.write_all(&frame.data)?;
                    drop(frame);
                    if done_tx.send(id).is_err() {
                        break;
                    }
                }
                stdin.flush()
            })
            .map_err(|e| EyeCandyError::encoder_io(format!("failed to spawn writer thread: {e}")))?;

        self.child = Some(child);
        self.frames_tx = Some(frames_tx);
        self.done_rx = Some(done_rx);
        self.writer = Some(writer);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg.clone());
        self.next_id = 0;
        Ok(())
    }

    fn submit(&mut self, frame: Arc<FrameBuffer>) -> EyeCandyResult<FrameId> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| EyeCandyError::encoder_io("ffmpeg encoder not open"))?;
        if !frame.matches(cfg.canvas) {
            return Err(EyeCandyError::encoder_io(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
            )));
        }
        let Some(tx) = self.frames_tx.as_ref() else {
            return Err(EyeCandyError::encoder_io("ffmpeg encoder is already finalized"));
        };
        let id = FrameId(self.next_id);
        if tx.send((id, frame)).is_err() {
            return Err(self.writer_failure());
        }
        self.next_id += 1;
        Ok(id)
    }

    fn check_completed(&mut self) -> EyeCandyResult<Vec<FrameId>> {
        let Some(rx) = self.done_rx.as_ref() else {
            return Ok(Vec::new());
        };
        let mut done = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(id) => done.push(id),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if self.frames_tx.is_some() {
                        self.done_rx = None;
                        return Err(self.writer_failure());
                    }
                    break;
                }
            }
        }
        Ok(done)
    }

    fn close(&mut self) -> EyeCandyResult<()> {
        drop(self.frames_tx.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| EyeCandyError::encoder_io("ffmpeg encoder not open"))?;

        let write_res = match self.writer.take().map(JoinHandle::join) {
            Some(Ok(res)) => res.map_err(|e| e.to_string()),
            Some(Err(_)) => Err("ffmpeg writer thread panicked".to_owned()),
            None => Ok(()),
        };
        let status = child.wait().map_err(|e| {
            EyeCandyError::encoder_io(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr = self.join_stderr();
        self.done_rx = None;
        self.cfg = None;

        if !status.success() {
            return Err(EyeCandyError::encoder_io(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        write_res
            .map_err(|e| EyeCandyError::encoder_io(format!("ffmpeg stdin write failed: {e}")))?;
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.frames_tx.take());
        self.done_rx = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "ffmpeg kill failed");
            }
            let _ = child.wait();
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
        let _ = self.join_stderr();
        self.cfg = None;
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

impl std::fmt::Debug for FfmpegEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEncoder")
            .field("opts", &self.opts)
            .field("open", &self.child.is_some())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;

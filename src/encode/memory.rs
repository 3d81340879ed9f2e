use crate::encode::encoder::{EncoderConfig, EncoderInfo, FrameId, VideoEncoder};
use crate::foundation::error::{EyeCandyError, EyeCandyResult};
use crate::render::frame::FrameBuffer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// When an [`InMemoryEncoder`] reports submitted frames as done.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Every frame is complete at the next `check_completed`.
    #[default]
    Immediate,
    /// Frames stay in flight until completed through the [`MemoryEncoderHandle`].
    Manual,
}

#[derive(Debug, Default)]
struct MemoryState {
    mode: CompletionMode,
    probe_error: Option<String>,
    open_error: Option<String>,
    config: Option<EncoderConfig>,
    frames: Vec<(FrameId, Arc<FrameBuffer>)>,
    in_flight: Vec<FrameId>,
    ready: Vec<FrameId>,
    next_id: u64,
    opens: u32,
    closes: u32,
    aborts: u32,
}

/// Encoder that keeps frames in memory, for tests and dry pipelines.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEncoder {
    state: Arc<Mutex<MemoryState>>,
}

/// Shared view into an [`InMemoryEncoder`] that outlives the boxed encoder.
#[derive(Debug, Clone)]
pub struct MemoryEncoderHandle {
    state: Arc<Mutex<MemoryState>>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryEncoder {
    /// Working encoder completing frames per `mode`.
    pub fn new(mode: CompletionMode) -> Self {
        let enc = Self::default();
        lock(&enc.state).mode = mode;
        enc
    }

    /// Encoder whose `probe` fails with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let enc = Self::default();
        lock(&enc.state).probe_error = Some(reason.into());
        enc
    }

    /// Encoder whose `open` fails with `reason`.
    pub fn failing_open(reason: impl Into<String>) -> Self {
        let enc = Self::default();
        lock(&enc.state).open_error = Some(reason.into());
        enc
    }

    /// Handle for inspecting and completing frames after the encoder is boxed.
    pub fn handle(&self) -> MemoryEncoderHandle {
        MemoryEncoderHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl VideoEncoder for InMemoryEncoder {
    fn probe(&mut self) -> EyeCandyResult<EncoderInfo> {
        match &lock(&self.state).probe_error {
            Some(reason) => Err(EyeCandyError::encoder_unavailable(reason.clone())),
            None => Ok(EncoderInfo {
                name: "memory".to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            }),
        }
    }

    fn open(&mut self, cfg: &EncoderConfig) -> EyeCandyResult<()> {
        let mut st = lock(&self.state);
        if let Some(reason) = &st.open_error {
            return Err(EyeCandyError::encoder_io(reason.clone()));
        }
        if st.config.is_some() {
            return Err(EyeCandyError::encoder_io("memory encoder is already open"));
        }
        st.config = Some(cfg.clone());
        st.frames.clear();
        st.in_flight.clear();
        st.ready.clear();
        st.next_id = 0;
        st.opens += 1;
        Ok(())
    }

    fn submit(&mut self, frame: Arc<FrameBuffer>) -> EyeCandyResult<FrameId> {
        let mut st = lock(&self.state);
        let Some(cfg) = &st.config else {
            return Err(EyeCandyError::encoder_io("memory encoder not open"));
        };
        if !frame.matches(cfg.canvas) {
            return Err(EyeCandyError::encoder_io("frame size mismatch"));
        }
        let id = FrameId(st.next_id);
        st.next_id += 1;
        st.frames.push((id, frame));
        match st.mode {
            CompletionMode::Immediate => st.ready.push(id),
            CompletionMode::Manual => st.in_flight.push(id),
        }
        Ok(id)
    }

    fn check_completed(&mut self) -> EyeCandyResult<Vec<FrameId>> {
        Ok(std::mem::take(&mut lock(&self.state).ready))
    }

    fn close(&mut self) -> EyeCandyResult<()> {
        let mut st = lock(&self.state);
        if st.config.take().is_none() {
            return Err(EyeCandyError::encoder_io("memory encoder not open"));
        }
        st.closes += 1;
        Ok(())
    }

    fn abort(&mut self) {
        let mut st = lock(&self.state);
        st.config = None;
        st.in_flight.clear();
        st.ready.clear();
        st.aborts += 1;
    }
}

impl MemoryEncoderHandle {
    /// Every frame submitted since the last `open`, in submission order.
    pub fn frames(&self) -> Vec<Arc<FrameBuffer>> {
        lock(&self.state)
            .frames
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect()
    }

    /// Frames submitted since the last `open`.
    pub fn submitted(&self) -> usize {
        lock(&self.state).frames.len()
    }

    /// Ids submitted but not yet completed (manual mode).
    pub fn in_flight(&self) -> Vec<FrameId> {
        lock(&self.state).in_flight.clone()
    }

    /// Mark `ids` complete, in the given order.
    pub fn complete(&self, ids: &[FrameId]) {
        let mut st = lock(&self.state);
        for id in ids {
            if let Some(pos) = st.in_flight.iter().position(|x| x == id) {
                st.in_flight.remove(pos);
                st.ready.push(*id);
            }
        }
    }

    /// Mark every in-flight frame complete.
    pub fn complete_all(&self) {
        let mut st = lock(&self.state);
        let ids = std::mem::take(&mut st.in_flight);
        st.ready.extend(ids);
    }

    /// `true` between `open` and `close`/`abort`.
    pub fn is_open(&self) -> bool {
        lock(&self.state).config.is_some()
    }

    /// Settings of the open output.
    pub fn config(&self) -> Option<EncoderConfig> {
        lock(&self.state).config.clone()
    }

    /// Successful `open` calls.
    pub fn opens(&self) -> u32 {
        lock(&self.state).opens
    }

    /// `close` calls.
    pub fn closes(&self) -> u32 {
        lock(&self.state).closes
    }

    /// `abort` calls.
    pub fn aborts(&self) -> u32 {
        lock(&self.state).aborts
    }
}

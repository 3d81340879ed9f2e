use crate::foundation::color::Color;
use crate::foundation::core::Canvas;
use crate::foundation::error::{EyeCandyError, EyeCandyResult};

/// One rendered frame: straight-alpha RGBA8, row-major, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Opaque frame filled with `color`.
    pub fn filled(canvas: Canvas, color: Color) -> Self {
        let px = color.to_opaque_rgba();
        let mut data = Vec::with_capacity(canvas.rgba_len());
        for _ in 0..(canvas.width as usize * canvas.height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
        }
    }

    /// Wrap raw RGBA8 bytes, checking the length.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> EyeCandyResult<Self> {
        let want = width as usize * height as usize * 4;
        if data.len() != want {
            return Err(EyeCandyError::configuration(format!(
                "frame data is {} bytes, expected {want} for {width}x{height} rgba",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// RGBA at `(x, y)`; `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// `true` when the frame has the given dimensions.
    pub fn matches(&self, canvas: Canvas) -> bool {
        self.width == canvas.width && self.height == canvas.height
    }
}

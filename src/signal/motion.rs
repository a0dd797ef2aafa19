//! Motion signal extraction from consecutive luminance frames.

use ndarray::Array2;

use crate::domain::BoundingBox;
use crate::{Result, TriageError};

/// A single-channel luminance frame.
///
/// Pixel values are in the 0..=255 range regardless of the source bit depth,
/// so motion magnitudes are comparable across capture devices.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Array2<f32>,
}

impl Frame {
    /// Wrap an existing luminance plane (rows x columns).
    pub fn from_luminance(pixels: Array2<f32>) -> Self {
        Self { pixels }
    }

    /// Build a luminance frame from interleaved 8-bit RGB data.
    ///
    /// Uses the ITU-R BT.601 weights (0.299, 0.587, 0.114). Fails if the
    /// data length does not match `width * height * 3`.
    pub fn from_rgb8(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        if data.len() != width * height * 3 {
            return Err(TriageError::FrameShape(format!(
                "expected {} bytes for {}x{} RGB frame, got {}",
                width * height * 3,
                width,
                height,
                data.len()
            )));
        }

        let mut pixels = Array2::<f32>::zeros((height, width));
        for y in 0..height {
            for x in 0..width {
                let i = (y * width + x) * 3;
                let r = data[i] as f32;
                let g = data[i + 1] as f32;
                let b = data[i + 2] as f32;
                pixels[[y, x]] = 0.299 * r + 0.587 * g + 0.114 * b;
            }
        }
        Ok(Self { pixels })
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Borrow the luminance plane
    pub fn pixels(&self) -> &Array2<f32> {
        &self.pixels
    }
}

/// Mean absolute per-pixel intensity difference between two frames,
/// restricted to a rectangular region.
///
/// The region is clamped to the bounds of both frames. An empty
/// intersection (zero area, region fully outside the frames, or degenerate
/// coordinates) yields 0.0; this is an insufficient-signal condition, not
/// an error.
pub fn motion_magnitude(previous: &Frame, current: &Frame, region: &BoundingBox) -> f64 {
    let height = previous.height().min(current.height());
    let width = previous.width().min(current.width());

    let x1 = region.x1.max(0.0).floor() as usize;
    let y1 = region.y1.max(0.0).floor() as usize;
    let x2 = (region.x2.min(width as f64).ceil() as usize).min(width);
    let y2 = (region.y2.min(height as f64).ceil() as usize).min(height);

    if x1 >= x2 || y1 >= y2 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    for y in y1..y2 {
        for x in x1..x2 {
            let diff = previous.pixels[[y, x]] - current.pixels[[y, x]];
            sum += diff.abs() as f64;
        }
    }

    sum / ((x2 - x1) * (y2 - y1)) as f64
}

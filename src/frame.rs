//! Camera frames as delivered by the event channel.
//!
//! The controller treats pixel data as opaque: frames are stored, counted and
//! rolled back, never reduced. Decoding from the real-time display socket happens
//! upstream.

use crate::error::{AppResult, DarkHoleError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest frame accepted, in pixels (4096 x 4096).
pub const MAX_FRAME_PIXELS: usize = 4096 * 4096;

/// A decoded camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Sequence number assigned by the camera.
    pub frame_number: u64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major pixel data, `width * height` values.
    pub pixels: Vec<u16>,
    /// When the frame was handed to the controller.
    pub received_at: DateTime<Utc>,
}

impl Frame {
    /// Create a frame, checking that the pixel buffer matches the declared shape.
    pub fn new(frame_number: u64, width: u32, height: u32, pixels: Vec<u16>) -> AppResult<Self> {
        let frame = Self {
            frame_number,
            width,
            height,
            pixels,
            received_at: Utc::now(),
        };
        frame.check_shape()?;
        Ok(frame)
    }

    /// Number of pixels a `width` x `height` frame holds, if within [`MAX_FRAME_PIXELS`].
    pub fn pixel_count(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .filter(|&n| n <= MAX_FRAME_PIXELS)
    }

    /// Check that the pixel buffer matches the declared shape.
    ///
    /// Fields are public, so frames built by hand or deserialized are checked
    /// again before they are stored.
    pub fn check_shape(&self) -> AppResult<()> {
        let (width, height) = (self.width, self.height);
        let Some(expected) = Self::pixel_count(width, height) else {
            return Err(DarkHoleError::InvalidFrame(format!(
                "frame {}: {width}x{height} exceeds {MAX_FRAME_PIXELS} pixels",
                self.frame_number
            )));
        };
        if self.pixels.len() != expected {
            return Err(DarkHoleError::InvalidFrame(format!(
                "frame {}: expected {expected} pixels for {width}x{height}, got {}",
                self.frame_number,
                self.pixels.len()
            )));
        }
        Ok(())
    }

    /// A frame of the given shape with every pixel set to `value`.
    ///
    /// The caller bounds the shape, see [`pixel_count`](Self::pixel_count).
    pub fn filled(frame_number: u64, width: u32, height: u32, value: u16) -> Self {
        Self {
            frame_number,
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
            received_at: Utc::now(),
        }
    }

    /// Image dimensions as `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_pixel_count() {
        let err = Frame::new(7, 4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(err, DarkHoleError::InvalidFrame(_)));
        assert!(err.to_string().contains("expected 16 pixels"));
    }

    #[test]
    fn rejects_hand_built_frame_with_wrong_buffer() {
        let mut frame = Frame::filled(3, 64, 64, 0);
        frame.pixels.clear();
        assert!(matches!(frame.check_shape(), Err(DarkHoleError::InvalidFrame(_))));
    }

    #[test]
    fn pixel_count_is_bounded() {
        assert_eq!(Frame::pixel_count(4096, 4096), Some(MAX_FRAME_PIXELS));
        assert_eq!(Frame::pixel_count(4097, 4096), None);
        assert_eq!(Frame::pixel_count(u32::MAX, u32::MAX), None);
        assert!(Frame::new(0, 5000, 5000, Vec::new()).is_err());
    }

    #[test]
    fn filled_frame_has_expected_shape() {
        let frame = Frame::filled(1, 8, 2, 100);
        assert_eq!(frame.resolution(), (8, 2));
        assert_eq!(frame.pixels.len(), 16);
        assert!(frame.pixels.iter().all(|&p| p == 100));
    }
}

//! Command scripts for replaying a session without the control framework.
//!
//! A script is a sequence of dispatcher command lines (see [`crate::command`])
//! interleaved with synthetic frame events:
//!
//! ```text
//! # comments and blank lines are skipped
//! INIT
//! SETMODE res=LOW axis=single pol=combined
//! GETSKY
//! FRAME 64 64 120      # width height [fill value]
//! GETSCIENCE 30 0
//! FRAME 64 64
//! STOP
//! ```
//!
//! Frames are numbered in script order starting at 0.

use crate::command::Command;
use crate::error::{AppResult, DarkHoleError};
use crate::frame::{Frame, MAX_FRAME_PIXELS};
use std::fs;
use std::path::Path;

/// One step of a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// A dispatcher command.
    Command(Command),
    /// A frame delivered on the event channel.
    Frame(Frame),
}

/// Read and parse a script file.
pub fn load_script<P: AsRef<Path>>(path: P) -> AppResult<Vec<ScriptStep>> {
    let text = fs::read_to_string(path)?;
    parse_script(&text)
}

/// Parse a whole script; errors name the offending line.
pub fn parse_script(text: &str) -> AppResult<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    let mut next_frame = 0u64;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let at_line = |e: DarkHoleError| match e {
            DarkHoleError::InvalidCommand(msg) => {
                DarkHoleError::InvalidCommand(format!("line {}: {msg}", index + 1))
            }
            other => other,
        };

        let mut tokens = line.split_whitespace();
        if tokens.next().is_some_and(|verb| verb.eq_ignore_ascii_case("FRAME")) {
            let args: Vec<&str> = tokens.collect();
            let frame = parse_frame(next_frame, &args).map_err(at_line)?;
            next_frame += 1;
            steps.push(ScriptStep::Frame(frame));
        } else {
            steps.push(ScriptStep::Command(line.parse().map_err(at_line)?));
        }
    }

    Ok(steps)
}

fn parse_frame(frame_number: u64, args: &[&str]) -> AppResult<Frame> {
    let number = |raw: &str| {
        raw.parse::<u32>()
            .map_err(|_| DarkHoleError::InvalidCommand(format!("'{raw}' is not a frame dimension")))
    };
    let (width, height, fill) = match args {
        [w, h] => (number(*w)?, number(*h)?, 0),
        [w, h, fill] => {
            let fill = fill.parse::<u16>().map_err(|_| {
                DarkHoleError::InvalidCommand(format!("'{fill}' is not a 16-bit pixel value"))
            })?;
            (number(*w)?, number(*h)?, fill)
        }
        _ => {
            return Err(DarkHoleError::InvalidCommand(
                "FRAME needs <width> <height> [fill]".to_string(),
            ))
        }
    };
    if width == 0 || height == 0 {
        return Err(DarkHoleError::InvalidCommand(
            "FRAME dimensions must be non-zero".to_string(),
        ));
    }
    if Frame::pixel_count(width, height).is_none() {
        return Err(DarkHoleError::InvalidCommand(format!(
            "FRAME {width}x{height} exceeds {MAX_FRAME_PIXELS} pixels"
        )));
    }
    Ok(Frame::filled(frame_number, width, height, fill))
}

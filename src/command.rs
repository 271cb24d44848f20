//! Dispatcher command grammar.
//!
//! One command per line, verb first, case-insensitive:
//!
//! ```text
//! INIT
//! SETMODE INS.SPEC.RES=LOW INS.AXIS=single INS.POLA=combined
//! GETSKY
//! GETSCIENCE 30.0 -2.5
//! STOP
//! STATUS
//! ```
//!
//! `SETMODE` takes `key=value` pairs verbatim; which keys matter is decided by
//! configuration, not here. `GETSCIENCE` takes the fiber offset in mas.

use crate::error::{AppResult, DarkHoleError};
use crate::fiber::FiberPosition;
use crate::observing::ObParameterSet;
use std::fmt;
use std::str::FromStr;

/// A command from the external dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Reset the session.
    Init,
    /// Set the observing mode from an OB parameter set.
    SetMode(ObParameterSet),
    /// Start a sky acquisition.
    GetSky,
    /// Start a science acquisition at a fiber position.
    GetScience(FiberPosition),
    /// Abort the acquisition in progress.
    Stop,
    /// Report status and cache sizes.
    Status,
}

impl Command {
    /// Verb as it appears on the wire.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Init => "INIT",
            Command::SetMode(_) => "SETMODE",
            Command::GetSky => "GETSKY",
            Command::GetScience(_) => "GETSCIENCE",
            Command::Stop => "STOP",
            Command::Status => "STATUS",
        }
    }
}

impl FromStr for Command {
    type Err = DarkHoleError;

    fn from_str(line: &str) -> AppResult<Self> {
        let mut tokens = line.split_whitespace();
        let verb = tokens
            .next()
            .ok_or_else(|| DarkHoleError::InvalidCommand("empty command".to_string()))?;
        let args: Vec<&str> = tokens.collect();

        let command = match verb.to_ascii_uppercase().as_str() {
            "INIT" => Command::Init,
            "GETSKY" => Command::GetSky,
            "STOP" => Command::Stop,
            "STATUS" => Command::Status,
            "SETMODE" => Command::SetMode(parse_ob_parameters(&args)?),
            "GETSCIENCE" => Command::GetScience(parse_position(&args)?),
            other => {
                return Err(DarkHoleError::InvalidCommand(format!(
                    "unknown command '{other}'"
                )))
            }
        };

        let takes_args = matches!(command, Command::SetMode(_) | Command::GetScience(_));
        if !takes_args && !args.is_empty() {
            return Err(DarkHoleError::InvalidCommand(format!(
                "{} takes no arguments",
                command.verb()
            )));
        }
        Ok(command)
    }
}

fn parse_ob_parameters(args: &[&str]) -> AppResult<ObParameterSet> {
    if args.is_empty() {
        return Err(DarkHoleError::InvalidCommand(
            "SETMODE needs key=value parameters".to_string(),
        ));
    }
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(DarkHoleError::InvalidCommand(format!(
                "SETMODE parameter '{arg}' is not key=value"
            ))),
        })
        .collect()
}

fn parse_position(args: &[&str]) -> AppResult<FiberPosition> {
    let [x, y] = args else {
        return Err(DarkHoleError::InvalidCommand(format!(
            "GETSCIENCE needs <x_mas> <y_mas>, got {} argument(s)",
            args.len()
        )));
    };
    let coordinate = |raw: &str| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                DarkHoleError::InvalidCommand(format!(
                    "fiber offset '{raw}' is not a finite number"
                ))
            })
    };
    Ok(FiberPosition::new(coordinate(*x)?, coordinate(*y)?))
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetMode(ob) => {
                write!(f, "SETMODE")?;
                for (key, value) in ob {
                    write!(f, " {key}={value}")?;
                }
                Ok(())
            }
            Command::GetScience(p) => write!(f, "GETSCIENCE {} {}", p.x, p.y),
            other => write!(f, "{}", other.verb()),
        }
    }
}

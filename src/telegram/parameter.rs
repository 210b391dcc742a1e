//! Telegram parameter keys.

use std::fmt;
use std::str::FromStr;

/// Highest sub-parameter index of the indexed keys.
pub const MAX_SUB_PARAMETER: u8 = 16;

/// Key of a telegram parameter.
///
/// The indexed keys carry `0` for the main parameter and `1..=16` for the
/// functional parameters (`target` vs. `target01`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    Current(u8),
    Target(u8),
    Countdown(u8),
    Min(u8),
    Max(u8),
    Type,
    Nodes,
    Source,
    Priority,
    Velocity,
    State,
    Error,
    ErrorInfo,
}

const INDEXED: [(&str, fn(u8) -> Parameter); 5] = [
    ("current", Parameter::Current),
    ("target", Parameter::Target),
    ("countdown", Parameter::Countdown),
    ("min", Parameter::Min),
    ("max", Parameter::Max),
];

impl Parameter {
    fn indexed(self) -> Option<(&'static str, u8)> {
        match self {
            Self::Current(i) => Some(("current", i)),
            Self::Target(i) => Some(("target", i)),
            Self::Countdown(i) => Some(("countdown", i)),
            Self::Min(i) => Some(("min", i)),
            Self::Max(i) => Some(("max", i)),
            _ => None,
        }
    }

    /// Whether an indexed key is within `0..=16`.
    pub fn is_valid(self) -> bool {
        self.indexed().map_or(true, |(_, i)| i <= MAX_SUB_PARAMETER)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((prefix, index)) = self.indexed() {
            return if index == 0 {
                f.write_str(prefix)
            } else {
                write!(f, "{prefix}{index:02}")
            };
        }
        let name = match self {
            Self::Type => "type",
            Self::Nodes => "nodes",
            Self::Source => "source",
            Self::Priority => "priority",
            Self::Velocity => "velocity",
            Self::State => "state",
            Self::Error => "error",
            Self::ErrorInfo => "error-info",
            _ => unreachable!("indexed keys handled above"),
        };
        f.write_str(name)
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let fixed = match key.as_str() {
            "type" => Some(Self::Type),
            "nodes" => Some(Self::Nodes),
            "source" => Some(Self::Source),
            "priority" => Some(Self::Priority),
            "velocity" => Some(Self::Velocity),
            "state" => Some(Self::State),
            "error" => Some(Self::Error),
            "error-info" | "errorinfo" | "error_info" => Some(Self::ErrorInfo),
            _ => None,
        };
        if let Some(parameter) = fixed {
            return Ok(parameter);
        }

        for (prefix, build) in INDEXED {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() {
                return Ok(build(0));
            }
            if rest.len() <= 2 && rest.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index @ 1..=MAX_SUB_PARAMETER) = rest.parse::<u8>() {
                    return Ok(build(index));
                }
            }
        }

        Err(format!("unknown parameter: {s}"))
    }
}

//! Host-facing telegram format.
//!
//! A telegram is a URI exchanged with the host automation system:
//!
//! ```text
//! mode://scope[/name | :id][?key=value&...][#action]
//! ```
//!
//! - `mode` is `request`, `response` or `info`
//! - `scope` is `node`, `group` or `scene`
//! - a name takes precedence over the identifier when formatting
//! - parameters are emitted in key order, unknown keys are dropped on parse

mod parameter;

pub use parameter::{Parameter, MAX_SUB_PARAMETER};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::datagram::WireEnum;
use crate::error::{Error, Result};
use crate::types::{Scope, UNSET_ID};

/// Bytes escaped in the name segment. Spaces stay readable.
const NAME: &AsciiSet = &CONTROLS.add(b'%').add(b'?').add(b'#');

/// Bytes escaped in query values.
const VALUE: &AsciiSet = &CONTROLS.add(b'%').add(b'&').add(b'#').add(b'+').add(b'=');

/// Bytes escaped in the action fragment.
const ACTION: &AsciiSet = &CONTROLS.add(b'%');

/// Direction of a telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Host asks the gateway to act.
    Request,
    /// Gateway reports a state.
    Response,
    /// Host asks for the catalog contents.
    Info,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "response" => Ok(Self::Response),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// A parsed or constructed telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    pub mode: Option<Mode>,
    pub scope: Option<Scope>,
    /// Identifier within the scope, `255` when unset.
    pub identifier: u8,
    pub name: String,
    parameters: BTreeMap<Parameter, String>,
    pub action: String,
}

impl Default for Telegram {
    fn default() -> Self {
        Self {
            mode: None,
            scope: None,
            identifier: UNSET_ID,
            name: String::new(),
            parameters: BTreeMap::new(),
            action: String::new(),
        }
    }
}

impl Telegram {
    pub fn new(mode: Mode, scope: Scope) -> Self {
        Self {
            mode: Some(mode),
            scope: Some(scope),
            ..Self::default()
        }
    }

    pub fn with_identifier(mut self, identifier: u8) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_parameter(mut self, key: Parameter, value: impl ToString) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Set a parameter; a blank value removes the key.
    pub fn set_parameter(&mut self, key: Parameter, value: impl ToString) {
        let value = value.to_string();
        if value.trim().is_empty() {
            self.parameters.remove(&key);
        } else {
            self.parameters.insert(key, value);
        }
    }

    pub fn parameter(&self, key: Parameter) -> Option<&str> {
        self.parameters.get(&key).map(String::as_str)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (Parameter, &str)> {
        self.parameters.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Enumeration parameter by case-insensitive name or raw value.
    pub fn param_enum<E: WireEnum>(&self, key: Parameter, default: E) -> E {
        let Some(value) = self.parameter(key).map(str::trim) else {
            return default;
        };
        E::from_name(value)
            .or_else(|| value.parse::<u64>().ok().and_then(E::from_raw))
            .unwrap_or(default)
    }

    /// Numeric parameter, `default` when missing or malformed.
    pub fn param_u16(&self, key: Parameter, default: u16) -> u16 {
        self.parameter(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Parse a telegram. Blank or malformed input yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let url = match Url::parse(text) {
            Ok(url) => url,
            // Identifiers beyond the port range stay unset
            Err(url::ParseError::InvalidPort) => Url::parse(&without_port(text)?).ok()?,
            Err(_) => return None,
        };

        let mut telegram = Self {
            mode: url.scheme().parse().ok(),
            scope: url.host_str().and_then(|host| host.parse().ok()),
            ..Self::default()
        };

        if let Some(id) = url.port().and_then(|port| u8::try_from(port).ok()) {
            telegram.identifier = id;
        }

        let path = url.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        telegram.name = percent_decode_str(path).decode_utf8_lossy().into_owned();

        for (key, value) in url.query_pairs() {
            if let Ok(key) = key.parse::<Parameter>() {
                telegram.set_parameter(key, value);
            }
        }

        if let Some(fragment) = url.fragment() {
            telegram.action = percent_decode_str(fragment).decode_utf8_lossy().into_owned();
        }

        Some(telegram)
    }
}

/// `text` with the port removed from its authority.
fn without_port(text: &str) -> Option<String> {
    let start = text.find("://")? + 3;
    let end = text[start..]
        .find(|c| matches!(c, '/' | '?' | '#'))
        .map_or(text.len(), |i| start + i);
    let colon = start + text[start..end].rfind(':')?;
    Some(format!("{}{}", &text[..colon], &text[end..]))
}

impl FromStr for Telegram {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::UnsupportedTelegram(s.to_string()))
    }
}

impl fmt::Display for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}",
            self.mode.map_or("none", Mode::as_str),
            self.scope.map_or("none", Scope::as_str)
        )?;

        if !self.name.trim().is_empty() {
            write!(f, "/{}", utf8_percent_encode(&self.name, NAME))?;
        } else if self.identifier != UNSET_ID {
            write!(f, ":{}", self.identifier)?;
        }

        for (i, (key, value)) in self.parameters.iter().enumerate() {
            let separator = if i == 0 { '?' } else { '&' };
            write!(f, "{separator}{key}={}", utf8_percent_encode(value, VALUE))?;
        }

        if !self.action.trim().is_empty() {
            write!(f, "#{}", utf8_percent_encode(&self.action, ACTION))?;
        }

        Ok(())
    }
}

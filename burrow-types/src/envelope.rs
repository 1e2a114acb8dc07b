//! Envelope - the text body every tunnel endpoint answers with.
//!
//! Bodies are a tag, a colon, and a tag-specific payload:
//!
//! ```text
//! OK:<text>        acknowledgement (session id on connect, "Sent." on push)
//! ERROR:<text>     human-readable failure reason
//! DATA:<base64>    binary payload (challenge on auth, remote bytes on pull)
//! QUIT:<text>      the remote socket is gone, with the reason
//! ```
//!
//! Errors are carried in the body, so every envelope is served as HTTP 200.

use base64::Engine;

use crate::{WireError, BASE64};

const TAG_OK: &str = "OK";
const TAG_ERROR: &str = "ERROR";
const TAG_DATA: &str = "DATA";
const TAG_QUIT: &str = "QUIT";

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Request succeeded, with a text result.
    Ok(String),
    /// Request failed, with a reason.
    Error(String),
    /// Binary payload.
    Data(Vec<u8>),
    /// Terminal event for a session, with a reason.
    Quit(String),
}

impl Envelope {
    /// Render the envelope as a response body.
    pub fn encode(&self) -> String {
        match self {
            Envelope::Ok(text) => format!("{TAG_OK}:{text}"),
            Envelope::Error(reason) => format!("{TAG_ERROR}:{reason}"),
            Envelope::Data(bytes) => format!("{TAG_DATA}:{}", BASE64.encode(bytes)),
            Envelope::Quit(reason) => format!("{TAG_QUIT}:{reason}"),
        }
    }

    /// Parse a response body.
    pub fn decode(body: &str) -> Result<Self, WireError> {
        let (tag, rest) = body
            .split_once(':')
            .ok_or_else(|| WireError::UnknownTag(truncate(body)))?;

        match tag {
            TAG_OK => Ok(Envelope::Ok(rest.to_string())),
            TAG_ERROR => Ok(Envelope::Error(rest.to_string())),
            TAG_DATA => Ok(Envelope::Data(BASE64.decode(rest.trim())?)),
            TAG_QUIT => Ok(Envelope::Quit(rest.to_string())),
            _ => Err(WireError::UnknownTag(truncate(body))),
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(32).collect()
}

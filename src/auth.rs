//! CHAP credential directives
//!
//! `IncomingUser` lines hold the credentials an initiator must present to the
//! target; `OutgoingUser` lines hold the credentials the target presents back
//! for mutual CHAP. Both appear globally (discovery sessions) and inside
//! target blocks.

use crate::document::first_token;
use crate::error::{IetError, IetResult};

/// Direction of a CHAP credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Initiator authenticates to the target
    Incoming,
    /// Target authenticates to the initiator (mutual CHAP)
    Outgoing,
}

impl CredentialKind {
    /// Directive keyword used in the config file
    pub fn directive(&self) -> &'static str {
        match self {
            CredentialKind::Incoming => "IncomingUser",
            CredentialKind::Outgoing => "OutgoingUser",
        }
    }

    pub fn from_directive(s: &str) -> Option<Self> {
        match s {
            "IncomingUser" => Some(CredentialKind::Incoming),
            "OutgoingUser" => Some(CredentialKind::Outgoing),
            _ => None,
        }
    }
}

/// CHAP username and secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapCredentials {
    pub username: String,
    pub secret: String,
}

impl ChapCredentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Format as a config line, e.g. `IncomingUser joe secret`
    ///
    /// Usernames and secrets are whitespace-delimited in the file, so neither
    /// may be empty or contain whitespace.
    pub fn to_directive(&self, kind: CredentialKind) -> IetResult<String> {
        for (what, value) in [("username", &self.username), ("secret", &self.secret)] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(IetError::Invalid(format!(
                    "CHAP {} must be a single non-empty word, got {:?}",
                    what, value
                )));
            }
        }
        Ok(format!("{} {} {}", kind.directive(), self.username, self.secret))
    }

    /// Parse an `IncomingUser` / `OutgoingUser` line
    pub fn parse(line: &str) -> Option<(CredentialKind, Self)> {
        let kind = CredentialKind::from_directive(first_token(line)?)?;
        let mut tokens = line.split_whitespace().skip(1);
        let username = tokens.next()?;
        let secret = tokens.next()?;
        if tokens.next().is_some() {
            return None;
        }
        Some((kind, Self::new(username, secret)))
    }
}

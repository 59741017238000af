//! Credentials and joined session data.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Longest password `SKSETPWD` accepts.
pub const MAX_PASSWORD_LEN: usize = 32;

/// B-Route authentication credentials issued by the utility.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Authentication ID.
    #[serde(alias = "rbid")]
    pub id: String,
    /// Password.
    #[serde(alias = "rbpwd")]
    pub password: String,
}

impl Credentials {
    /// Creates credentials from an ID and a password.
    #[must_use]
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
        }
    }

    /// Checks that both values can be sent as a single command argument.
    pub fn validate(&self) -> Result<()> {
        validate_token("id", &self.id)?;
        validate_token("password", &self.password)?;
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(Error::InvalidCredentials {
                reason: format!(
                    "password is {} chars, maximum {MAX_PASSWORD_LEN}",
                    self.password.len()
                ),
            });
        }
        Ok(())
    }
}

fn validate_token(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidCredentials {
            reason: format!("{name} is empty"),
        });
    }
    if !value.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(Error::InvalidCredentials {
            reason: format!("{name} must be printable ASCII without spaces"),
        });
    }
    Ok(())
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The meter's network, as registered in the modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Logical channel, verbatim from the scan.
    pub channel: String,
    /// PAN ID, verbatim from the scan.
    pub pan_id: String,
    /// 64-bit MAC address of the meter.
    pub mac: String,
}

/// A joined B-Route session.
///
/// Only produced once the PANA handshake has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Credentials used for the join.
    pub credentials: Credentials,
    /// Logical channel.
    pub channel: String,
    /// PAN ID.
    pub pan_id: String,
    /// 64-bit MAC address of the meter.
    pub mac: String,
    /// IPv6 link-local address of the meter.
    pub ipv6: String,
}

impl Session {
    /// Creates a session from a registered peer and its resolved address.
    #[must_use]
    pub fn new(credentials: Credentials, peer: Peer, ipv6: String) -> Self {
        Self {
            credentials,
            channel: peer.channel,
            pan_id: peer.pan_id,
            mac: peer.mac,
            ipv6,
        }
    }
}

//! Command vocabulary of the Wi-SUN modem (SKSTACK IP).
//!
//! Commands are sent to the modem as single ASCII lines. Synchronous commands
//! are echoed back and then answered by an `OK` or `FAIL ER<nn>` status line;
//! `SKSCAN` and `SKJOIN` are followed by asynchronous `EVENT` lines instead.

use std::fmt;

/// UDP port of the ECHONET Lite service.
pub const ECHONET_PORT: u16 = 0x0E1A;

/// Channel mask covering every channel for `SKSCAN`.
pub const SCAN_CHANNEL_MASK: &str = "FFFFFFFF";

/// Active scan with information element, required for B-Route.
pub const SCAN_MODE_ACTIVE: u8 = 2;

/// Modem virtual registers written during the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Logical channel number (`S2`).
    Channel,
    /// PAN ID (`S3`).
    PanId,
}

impl Register {
    /// Returns the register name used on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Channel => "S2",
            Self::PanId => "S3",
        }
    }
}

/// Commands used to join the meter's PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Registers the B-Route password (`SKSETPWD`).
    SetPassword(&'a str),
    /// Registers the B-Route authentication ID (`SKSETRBID`).
    SetRouteBId(&'a str),
    /// Starts an active scan with the given duration exponent (`SKSCAN`).
    ActiveScan { duration: u8 },
    /// Writes a virtual register (`SKSREG`).
    SetRegister {
        register: Register,
        value: &'a str,
    },
    /// Converts a 64-bit MAC address into an IPv6 link-local address (`SKLL64`).
    LinkLocalAddress(&'a str),
    /// Starts the PANA authentication sequence (`SKJOIN`).
    Join(&'a str),
}

impl Command<'_> {
    /// Returns the command keyword.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetPassword(_) => "SKSETPWD",
            Self::SetRouteBId(_) => "SKSETRBID",
            Self::ActiveScan { .. } => "SKSCAN",
            Self::SetRegister { .. } => "SKSREG",
            Self::LinkLocalAddress(_) => "SKLL64",
            Self::Join(_) => "SKJOIN",
        }
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Password length is given as a hex digit count
            Self::SetPassword(password) => {
                write!(f, "SKSETPWD {:X} {password}", password.len())
            }
            Self::SetRouteBId(id) => write!(f, "SKSETRBID {id}"),
            Self::ActiveScan { duration } => {
                write!(f, "SKSCAN {SCAN_MODE_ACTIVE} {SCAN_CHANNEL_MASK} {duration}")
            }
            Self::SetRegister { register, value } => {
                write!(f, "SKSREG {} {value}", register.name())
            }
            Self::LinkLocalAddress(mac) => write!(f, "SKLL64 {mac}"),
            Self::Join(address) => write!(f, "SKJOIN {address}"),
        }
    }
}

/// Builds the text prefix of a `SKSENDTO` request.
///
/// Format:
/// ```text
/// SKSENDTO <handle:1> <ipv6> <port:04X> <security:1> <len:04X> <payload...>
/// ```
/// The binary payload is appended directly after the trailing space.
#[must_use]
pub fn send_to_header(address: &str, payload_len: u16) -> String {
    format!("SKSENDTO 1 {address} {ECHONET_PORT:04X} 1 {payload_len:04X} ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_commands() {
        assert_eq!(
            Command::SetPassword("0123456789AB").to_string(),
            "SKSETPWD C 0123456789AB"
        );
        assert_eq!(
            Command::SetRouteBId("00112233445566778899AABBCCDDEEFF").to_string(),
            "SKSETRBID 00112233445566778899AABBCCDDEEFF"
        );
    }

    #[test]
    fn test_scan_command() {
        assert_eq!(
            Command::ActiveScan { duration: 6 }.to_string(),
            "SKSCAN 2 FFFFFFFF 6"
        );
    }

    #[test]
    fn test_register_commands() {
        let channel = Command::SetRegister {
            register: Register::Channel,
            value: "39",
        };
        let pan = Command::SetRegister {
            register: Register::PanId,
            value: "8888",
        };
        assert_eq!(channel.to_string(), "SKSREG S2 39");
        assert_eq!(pan.to_string(), "SKSREG S3 8888");
        assert_eq!(pan.name(), "SKSREG");
    }

    #[test]
    fn test_address_commands() {
        assert_eq!(
            Command::LinkLocalAddress("001D129012345678").to_string(),
            "SKLL64 001D129012345678"
        );
        assert_eq!(
            Command::Join("FE80:0000:0000:0000:021D:1290:1234:5678").to_string(),
            "SKJOIN FE80:0000:0000:0000:021D:1290:1234:5678"
        );
    }

    #[test]
    fn test_send_to_header() {
        assert_eq!(
            send_to_header("FE80:0000:0000:0000:021D:1290:1234:5678", 0x18),
            "SKSENDTO 1 FE80:0000:0000:0000:021D:1290:1234:5678 0E1A 1 0018 "
        );
    }
}

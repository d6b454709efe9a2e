//! Completed sysex frames.
//!
//! Firmware reports and strings are handled here; every other sub-command
//! goes to the generic sysex callback untouched.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::Decode;
use crate::callbacks::Callbacks;
use crate::codec::join_7bit;
use crate::encoder::Encoder;
use crate::parser::SysexFrame;
use crate::protocol::{REPORT_FIRMWARE, STRING_DATA};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// A sysex frame with no sub-command.
    Empty,
    Truncated { expected_at_least: usize, found: usize },
    UnknownPinMode(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty sysex frame"),
            DecodeError::Truncated { expected_at_least, found } => write!(
                f,
                "expected at least {} bytes, found {}",
                expected_at_least, found
            ),
            DecodeError::UnknownPinMode(m) => write!(f, "unknown pin mode {:#04x}", m),
        }
    }
}

/// Name and version the device reports for `REPORT_FIRMWARE`. Not the same as
/// the protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareIdentity {
    pub name: String,
    pub major: u8,
    pub minor: u8,
}

impl FirmwareIdentity {
    pub fn new(name: impl Into<String>, major: u8, minor: u8) -> FirmwareIdentity {
        FirmwareIdentity {
            name: name.into(),
            major,
            minor,
        }
    }
}

/// Decodes the payload of a firmware report: major, minor, then the name as
/// 7-bit pairs.
impl<'a> Decode<'a> for FirmwareIdentity {
    type Error = DecodeError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        match data {
            [major, minor, name @ ..] => Ok(FirmwareIdentity {
                name: decode_string(name),
                major: *major,
                minor: *minor,
            }),
            _ => Err(DecodeError::Truncated {
                expected_at_least: 2,
                found: data.len(),
            }),
        }
    }
}

/// Joins 7-bit pairs back into characters, stopping at the first NUL. A
/// trailing odd byte is ignored.
pub fn decode_string(data: &[u8]) -> String {
    let bytes: Vec<u8> = data
        .chunks_exact(2)
        .map(|pair| join_7bit(pair[0], pair[1]) as u8)
        .take_while(|c| *c != 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn dispatch<W: embedded_io::Write>(
    frame: SysexFrame<'_>,
    callbacks: &mut Callbacks,
    firmware: Option<&FirmwareIdentity>,
    out: &mut Encoder<'_, W>,
) -> Result<(), W::Error> {
    match frame.command {
        REPORT_FIRMWARE => match firmware {
            Some(identity) => out.send_firmware(identity)?,
            None => log::debug!("firmware report requested before identity was set"),
        },
        STRING_DATA => {
            if frame.payload.len() < 2 {
                return Ok(());
            }
            let text = decode_string(frame.payload);
            log::trace!("string message {:?}", text);
            callbacks.string_data(&text);
        }
        command => {
            log::trace!("sysex {:#04x}, {} bytes", command, frame.payload.len());
            callbacks.sysex(command, frame.payload);
        }
    }
    Ok(())
}

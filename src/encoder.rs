//! Outgoing messages.

use embedded_io::Write;

use crate::Encode;
use crate::codec::{encode_packed14, encode_packed32, encode_packed64, split_7bit};
use crate::protocol::*;
use crate::sysex::FirmwareIdentity;

/// `REPORT_VERSION` followed by the protocol major and minor version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionReport;

impl Encode for VersionReport {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), W::Error> {
        out.write_all(&[REPORT_VERSION, PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION])
    }
}

/// An analog value. Pins above 15 don't fit the channel nibble and are sent
/// as an `EXTENDED_ANALOG` sysex instead, with the pin cut to 7 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogReport {
    pub pin: u8,
    pub value: u16,
}

impl Encode for AnalogReport {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), W::Error> {
        let (lsb, msb) = split_7bit(self.value);
        if self.pin <= 15 {
            let cmd = CommandByte::with_channel(ANALOG_MESSAGE, self.pin);
            out.write_all(&[u8::from(cmd), lsb, msb])
        } else {
            out.write_all(&[START_SYSEX, EXTENDED_ANALOG, self.pin & 0x7F, lsb, msb, END_SYSEX])
        }
    }
}

/// The pins of one port as a 14-bit bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalPortReport {
    pub port: u8,
    pub bits: u16,
}

impl Encode for DigitalPortReport {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), W::Error> {
        let cmd = CommandByte::with_channel(DIGITAL_MESSAGE, self.port);
        let (lsb, msb) = split_7bit(self.bits);
        out.write_all(&[u8::from(cmd), lsb, msb])
    }
}

/// A sysex frame whose data bytes are each sent as two 7-bit bytes. The
/// command is cut to 7 bits so it can't close the frame early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sysex<'a> {
    pub command: u8,
    pub data: &'a [u8],
}

impl Encode for Sysex<'_> {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), W::Error> {
        out.write_all(&[START_SYSEX, self.command & 0x7F])?;
        write_pairs(out, self.data)?;
        out.write_all(&[END_SYSEX])
    }
}

/// Version bytes are cut to 7 bits.
pub struct FirmwareReport<'a>(pub &'a FirmwareIdentity);

impl Encode for FirmwareReport<'_> {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), W::Error> {
        out.write_all(&[START_SYSEX, REPORT_FIRMWARE, self.0.major & 0x7F, self.0.minor & 0x7F])?;
        write_pairs(out, self.0.name.as_bytes())?;
        out.write_all(&[END_SYSEX])
    }
}

fn write_pairs<W: Write>(out: &mut W, data: &[u8]) -> Result<(), W::Error> {
    for b in data {
        let (lsb, msb) = split_7bit(*b as u16);
        out.write_all(&[lsb, msb])?;
    }
    Ok(())
}

/// Writes messages onto a borrowed output stream.
pub struct Encoder<'w, W: Write> {
    out: &'w mut W,
}

impl<'w, W: Write> Encoder<'w, W> {
    pub fn new(out: &'w mut W) -> Encoder<'w, W> {
        Encoder { out }
    }

    pub fn send<M: Encode>(&mut self, message: &M) -> Result<(), W::Error> {
        message.encode(&mut *self.out)
    }

    pub fn print_version(&mut self) -> Result<(), W::Error> {
        self.send(&VersionReport)
    }

    pub fn send_firmware(&mut self, identity: &FirmwareIdentity) -> Result<(), W::Error> {
        self.send(&FirmwareReport(identity))?;
        self.out.flush()
    }

    pub fn send_analog(&mut self, pin: u8, value: u16) -> Result<(), W::Error> {
        self.send(&AnalogReport { pin, value })
    }

    pub fn send_digital_port(&mut self, port: u8, bits: u16) -> Result<(), W::Error> {
        self.send(&DigitalPortReport { port, bits })
    }

    pub fn send_sysex(&mut self, command: u8, data: &[u8]) -> Result<(), W::Error> {
        self.send(&Sysex { command, data })?;
        self.out.flush()
    }

    pub fn send_string(&mut self, text: &str) -> Result<(), W::Error> {
        self.send_sysex(STRING_DATA, text.as_bytes())
    }

    /// Sends `text` followed by `code` in lowercase hex, as one string.
    pub fn send_string_with_code(&mut self, text: &str, code: u32) -> Result<(), W::Error> {
        self.start_sysex()?;
        self.write_byte(STRING_DATA)?;
        write_pairs(&mut *self.out, text.as_bytes())?;
        let mut digits = [0u8; 8];
        let mut n = 0;
        let mut rest = code;
        loop {
            digits[n] = b"0123456789abcdef"[(rest & 0xF) as usize];
            n += 1;
            rest >>= 4;
            if rest == 0 {
                break;
            }
        }
        digits[..n].reverse();
        write_pairs(&mut *self.out, &digits[..n])?;
        self.end_sysex()
    }

    pub fn send_packed_u14(&mut self, value: u16) -> Result<(), W::Error> {
        self.out.write_all(&encode_packed14(value))
    }

    pub fn send_packed_u32(&mut self, value: u32) -> Result<(), W::Error> {
        self.out.write_all(&encode_packed32(value))
    }

    pub fn send_packed_u64(&mut self, value: u64) -> Result<(), W::Error> {
        self.out.write_all(&encode_packed64(value))
    }

    pub fn start_sysex(&mut self) -> Result<(), W::Error> {
        self.write_byte(START_SYSEX)
    }

    /// Closes a frame opened with [`Encoder::start_sysex`] and flushes.
    pub fn end_sysex(&mut self) -> Result<(), W::Error> {
        self.write_byte(END_SYSEX)?;
        self.out.flush()
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), W::Error> {
        self.out.write_all(&[byte])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), W::Error> {
        self.out.write_all(bytes)
    }

    pub fn flush(&mut self) -> Result<(), W::Error> {
        self.out.flush()
    }
}

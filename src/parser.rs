//! Incoming byte state machine.
//!
//! Bytes are fed one at a time with [`Parser::feed`]. Every byte is checked
//! in the same order whatever the parser is doing:
//!
//! 1. `SYSTEM_RESET` drops all state.
//! 2. Inside a sysex, `END_SYSEX` closes the frame and anything else is
//!    collected. A frame that fills the buffer is discarded.
//! 3. While arguments are pending, data bytes are stored back to front.
//! 4. Anything else starts a new command.

use heapless::Vec;

use crate::Decode;
use crate::codec::join_7bit;
use crate::config::MAX_SYSEX_CAPACITY;
use crate::protocol::*;
use crate::sysex::DecodeError;

/// A complete sysex frame without its delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysexFrame<'a> {
    pub command: u8,
    pub payload: &'a [u8],
}

impl<'a> Decode<'a> for SysexFrame<'a> {
    type Error = DecodeError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let (&command, payload) = data.split_first().ok_or(DecodeError::Empty)?;
        Ok(SysexFrame { command, payload })
    }
}

/// A semantically complete message produced by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    SystemReset,
    ReportVersion,
    DigitalWrite { port: u8, value: u16 },
    ReportAnalog { channel: u8, enable: bool },
    ReportDigital { port: u8, enable: bool },
    /// Raw mode byte, validated by whoever applies it.
    SetPinMode { pin: u8, mode: u8 },
    SetPinValue { pin: u8, value: u8 },
    /// Analog writes arrive here too, repacked as `EXTENDED_ANALOG`.
    Sysex(SysexFrame<'a>),
    /// A sysex frame outgrew the buffer and was dropped.
    Overflow { discarded: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Idle,
    AwaitingArgs { command: u8, remaining: u8, channel: u8 },
    InSysex,
}

#[derive(Debug, Clone)]
pub struct Parser {
    state: ParseState,
    buffer: Vec<u8, MAX_SYSEX_CAPACITY>,
    // filled back to front, see `complete`
    args: [u8; 2],
    limit: usize,
}

impl Parser {
    /// `limit` bounds the sysex buffer and is clamped to
    /// [`MAX_SYSEX_CAPACITY`].
    pub fn new(limit: usize) -> Parser {
        Parser {
            state: ParseState::Idle,
            buffer: Vec::new(),
            args: [0; 2],
            limit: limit.min(MAX_SYSEX_CAPACITY),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.buffer.clear();
        self.args = [0; 2];
    }

    /// True while inside a sysex frame or waiting for arguments.
    pub fn is_parsing_message(&self) -> bool {
        self.state != ParseState::Idle
    }

    pub fn in_sysex(&self) -> bool {
        self.state == ParseState::InSysex
    }

    /// Number of sysex bytes collected so far.
    pub fn buffered(&self) -> usize {
        match self.state {
            ParseState::InSysex => self.buffer.len(),
            _ => 0,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<Message<'_>> {
        if byte == SYSTEM_RESET {
            self.reset();
            return Some(Message::SystemReset);
        }
        match self.state {
            ParseState::InSysex => self.collect_sysex(byte),
            ParseState::AwaitingArgs { command, remaining, channel }
                if remaining > 0 && byte < 0x80 =>
            {
                let remaining = remaining - 1;
                if let Some(slot) = self.args.get_mut(remaining as usize) {
                    *slot = byte;
                }
                if remaining > 0 {
                    self.state = ParseState::AwaitingArgs { command, remaining, channel };
                    return None;
                }
                self.state = ParseState::Idle;
                self.complete(command, channel)
            }
            _ => self.start_command(byte),
        }
    }

    /// Appends whole 4-byte groups of `chunk` while inside a sysex frame and
    /// returns how many bytes were taken.
    ///
    /// A group is only taken when none of its bytes has the high bit set and
    /// the buffer stays below the overflow limit, so the result is the same as
    /// feeding the bytes one by one.
    pub fn absorb_sysex_words(&mut self, chunk: &[u8]) -> usize {
        if self.state != ParseState::InSysex {
            return 0;
        }
        let mut taken = 0;
        for word in chunk.chunks_exact(4) {
            let packed = match word {
                [a, b, c, d] => u32::from_ne_bytes([*a, *b, *c, *d]),
                _ => break,
            };
            if packed & 0x8080_8080 != 0 || self.buffer.len() + 4 >= self.limit {
                break;
            }
            if self.buffer.extend_from_slice(word).is_err() {
                break;
            }
            taken += 4;
        }
        taken
    }

    fn collect_sysex(&mut self, byte: u8) -> Option<Message<'_>> {
        if byte == END_SYSEX {
            self.state = ParseState::Idle;
            return match SysexFrame::decode(&self.buffer) {
                Ok(frame) => Some(Message::Sysex(frame)),
                Err(_) => {
                    log::debug!("dropping empty sysex frame");
                    None
                }
            };
        }
        if self.buffer.push(byte).is_err() || self.buffer.len() >= self.limit {
            let discarded = self.buffer.len();
            self.reset();
            return Some(Message::Overflow { discarded });
        }
        None
    }

    fn start_command(&mut self, byte: u8) -> Option<Message<'_>> {
        let cmd = CommandByte::from(byte);
        let channel = cmd.channel_nibble().unwrap_or(0);
        match cmd.command() {
            ANALOG_MESSAGE | DIGITAL_MESSAGE | SET_PIN_MODE | SET_DIGITAL_PIN_VALUE => {
                self.state = ParseState::AwaitingArgs {
                    command: cmd.command(),
                    remaining: 2,
                    channel,
                };
                None
            }
            REPORT_ANALOG | REPORT_DIGITAL => {
                self.state = ParseState::AwaitingArgs {
                    command: cmd.command(),
                    remaining: 1,
                    channel,
                };
                None
            }
            START_SYSEX => {
                self.buffer.clear();
                self.state = ParseState::InSysex;
                None
            }
            REPORT_VERSION => Some(Message::ReportVersion),
            other => {
                log::trace!("ignoring command byte {:#04x}", other);
                None
            }
        }
    }

    fn complete(&mut self, command: u8, channel: u8) -> Option<Message<'_>> {
        // a0 is the last byte received: the MSB of a pair, or the only argument
        let [a0, a1] = self.args;
        let message = match command {
            ANALOG_MESSAGE => {
                self.buffer.clear();
                // the buffer's fixed capacity always holds these four bytes
                let _ = self.buffer.extend_from_slice(&[EXTENDED_ANALOG, channel, a1, a0]);
                let frame = SysexFrame::decode(&self.buffer).ok()?;
                Message::Sysex(frame)
            }
            DIGITAL_MESSAGE => Message::DigitalWrite {
                port: channel,
                value: join_7bit(a1, a0),
            },
            SET_PIN_MODE => Message::SetPinMode { pin: a1, mode: a0 },
            SET_DIGITAL_PIN_VALUE => Message::SetPinValue { pin: a1, value: a0 },
            REPORT_ANALOG => Message::ReportAnalog {
                channel,
                enable: a0 != 0,
            },
            REPORT_DIGITAL => Message::ReportDigital {
                port: channel,
                enable: a0 != 0,
            },
            _ => return None,
        };
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec as StdVec;

    use super::*;

    fn feed_all(parser: &mut Parser, bytes: &[u8]) -> StdVec<std::string::String> {
        let mut out = StdVec::new();
        for b in bytes {
            if let Some(m) = parser.feed(*b) {
                out.push(std::format!("{:?}", m));
            }
        }
        out
    }

    #[test]
    fn digital_write_channel_zero() {
        let mut p = Parser::new(64);
        assert_eq!(p.feed(0x90), None);
        assert_eq!(p.feed(0x01), None);
        assert_eq!(p.feed(0x00), Some(Message::DigitalWrite { port: 0, value: 1 }));
        assert!(!p.is_parsing_message());
    }

    #[test]
    fn analog_write_is_repacked() {
        let mut p = Parser::new(64);
        p.feed(0xE3);
        p.feed(0x7F);
        let m = p.feed(0x01);
        assert_eq!(
            m,
            Some(Message::Sysex(SysexFrame {
                command: EXTENDED_ANALOG,
                payload: &[3, 0x7F, 0x01],
            }))
        );
    }

    #[test]
    fn arguments_fill_back_to_front() {
        let mut p = Parser::new(64);
        p.feed(SET_PIN_MODE);
        p.feed(13);
        assert_eq!(p.feed(0x01), Some(Message::SetPinMode { pin: 13, mode: 1 }));

        p.feed(SET_DIGITAL_PIN_VALUE);
        p.feed(5);
        assert_eq!(p.feed(1), Some(Message::SetPinValue { pin: 5, value: 1 }));
    }

    #[test]
    fn report_enable_single_argument() {
        let mut p = Parser::new(64);
        p.feed(0xC2);
        assert_eq!(p.feed(1), Some(Message::ReportAnalog { channel: 2, enable: true }));
        p.feed(0xD1);
        assert_eq!(p.feed(0), Some(Message::ReportDigital { port: 1, enable: false }));
    }

    #[test]
    fn sysex_frame_collected() {
        let mut p = Parser::new(64);
        let seen = feed_all(&mut p, &[START_SYSEX, 0x10, 1, 2, 3]);
        assert!(seen.is_empty());
        assert!(p.in_sysex());
        assert_eq!(p.buffered(), 4);
        assert_eq!(
            p.feed(END_SYSEX),
            Some(Message::Sysex(SysexFrame { command: 0x10, payload: &[1, 2, 3] }))
        );
        assert!(!p.is_parsing_message());
    }

    #[test]
    fn empty_sysex_is_dropped() {
        let mut p = Parser::new(64);
        assert!(feed_all(&mut p, &[START_SYSEX, END_SYSEX]).is_empty());
        assert!(!p.is_parsing_message());
    }

    #[test]
    fn reset_preempts_sysex_and_arguments() {
        let mut p = Parser::new(64);
        feed_all(&mut p, &[START_SYSEX, 0x10, 1, 2]);
        assert_eq!(p.feed(SYSTEM_RESET), Some(Message::SystemReset));
        assert!(!p.is_parsing_message());
        // the old frame is gone, its end byte is now meaningless
        assert_eq!(p.feed(END_SYSEX), None);

        p.feed(DIGITAL_MESSAGE);
        p.feed(1);
        assert_eq!(p.feed(SYSTEM_RESET), Some(Message::SystemReset));
        assert_eq!(p.feed(0), None);
    }

    #[test]
    fn overflow_discards_frame() {
        let mut p = Parser::new(8);
        p.feed(START_SYSEX);
        for _ in 0..7 {
            assert_eq!(p.feed(0x01), None);
        }
        assert_eq!(p.feed(0x01), Some(Message::Overflow { discarded: 8 }));
        assert!(!p.is_parsing_message());
        assert_eq!(p.feed(END_SYSEX), None);
    }

    #[test]
    fn version_request_is_immediate() {
        let mut p = Parser::new(64);
        assert_eq!(p.feed(REPORT_VERSION), Some(Message::ReportVersion));
    }

    #[test]
    fn unknown_bytes_are_ignored() {
        let mut p = Parser::new(64);
        assert!(feed_all(&mut p, &[0x00, 0x42, 0xA5, 0xF8, 0xFA]).is_empty());
        assert!(!p.is_parsing_message());
    }

    #[test]
    fn command_mid_arguments_starts_over() {
        let mut p = Parser::new(64);
        p.feed(DIGITAL_MESSAGE);
        p.feed(0x05);
        p.feed(0xC4);
        assert_eq!(p.feed(1), Some(Message::ReportAnalog { channel: 4, enable: true }));
    }

    #[test]
    fn absorb_only_inside_sysex() {
        let mut p = Parser::new(64);
        assert_eq!(p.absorb_sysex_words(&[1, 2, 3, 4]), 0);
        p.feed(START_SYSEX);
        assert_eq!(p.absorb_sysex_words(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), 8);
        assert_eq!(p.absorb_sysex_words(&[1, 2, END_SYSEX, 4]), 0);
        assert_eq!(p.buffered(), 8);
    }

    #[test]
    fn absorb_stops_before_limit() {
        let mut p = Parser::new(8);
        p.feed(START_SYSEX);
        // 4 fits, a second group would reach the limit of 8
        assert_eq!(p.absorb_sysex_words(&[0; 8]), 4);
        assert_eq!(p.absorb_sysex_words(&[0; 8]), 0);
        for _ in 0..3 {
            assert_eq!(p.feed(0), None);
        }
        assert_eq!(p.feed(0), Some(Message::Overflow { discarded: 8 }));
    }

    #[test]
    fn limit_is_clamped_to_capacity() {
        assert_eq!(Parser::new(16).limit(), 16);
        assert_eq!(Parser::new(1000).limit(), MAX_SYSEX_CAPACITY);
    }

    #[test]
    fn unknown_command_mid_arguments_keeps_them() {
        let mut p = Parser::new(64);
        p.feed(DIGITAL_MESSAGE);
        p.feed(0x05);
        assert_eq!(p.feed(0xF8), None);
        assert!(p.is_parsing_message());
        assert_eq!(p.feed(0x00), Some(Message::DigitalWrite { port: 0, value: 5 }));
    }

    #[test]
    fn sysex_mid_arguments_drops_them() {
        let mut p = Parser::new(64);
        p.feed(DIGITAL_MESSAGE);
        p.feed(0x05);
        assert_eq!(p.feed(START_SYSEX), None);
        assert!(p.in_sysex());
        let frame = Message::Sysex(SysexFrame { command: 0x10, payload: &[] });
        assert_eq!(feed_all(&mut p, &[0x10, END_SYSEX]), [std::format!("{:?}", frame)]);
        // the data byte that would have completed the digital write is now stray
        assert_eq!(p.feed(0x00), None);
        assert!(!p.is_parsing_message());
    }
}

//! The protocol engine.
//!
//! [`Firmata`] owns the parser, the pin table, the callbacks and both halves
//! of the transport. It is driven by [`Firmata::poll`], which never blocks.
//! All state persists between calls, so an engine shared across threads must
//! sit behind a single lock.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use embedded_hal_nb::serial::{Read, Write};

use crate::callbacks::{Callback, Callbacks, Category};
use crate::config::{Config, ConfigError, Ingestion};
use crate::encoder::Encoder;
use crate::parser::{Message, Parser};
use crate::pins::{PinError, PinTable};
use crate::protocol::PinMode;
use crate::serial::{BufferedRx, BufferedTx, TxError};
use crate::sysex::{self, FirmwareIdentity};

/// Sent to the peer when a sysex frame outgrows the buffer.
pub const DISCARD_NOTICE: &str = "Discarding input message, out of buffer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError<ReadError, WriteError> {
    Read(ReadError),
    Write(WriteError),
    Pin(PinError),
}

impl<Er, Ew> From<PinError> for EngineError<Er, Ew> {
    fn from(value: PinError) -> Self {
        EngineError::Pin(value)
    }
}

impl<Er, Ew> From<TxError<Ew>> for EngineError<Er, Ew> {
    fn from(value: TxError<Ew>) -> Self {
        EngineError::Write(value.0)
    }
}

impl<Er: fmt::Debug, Ew: fmt::Debug> fmt::Display for EngineError<Er, Ew> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Read(e) => write!(f, "transport read failed: {:?}", e),
            EngineError::Write(e) => write!(f, "transport write failed: {:?}", e),
            EngineError::Pin(e) => write!(f, "{}", e),
        }
    }
}

pub type Result<T, Tx, Rx> =
    core::result::Result<T, EngineError<<Rx as embedded_hal_nb::serial::ErrorType>::Error, <Tx as embedded_hal_nb::serial::ErrorType>::Error>>;

pub struct Firmata<Tx: Write, Rx: Read> {
    tx: BufferedTx<Tx>,
    rx: BufferedRx<Rx>,
    parser: Parser,
    pins: PinTable,
    callbacks: Callbacks,
    firmware: Option<FirmwareIdentity>,
    config: Config,
    scratch: Vec<u8>,
}

impl<Tx: Write, Rx: Read> Firmata<Tx, Rx> {
    pub fn new(tx: Tx, rx: Rx, config: Config) -> core::result::Result<Firmata<Tx, Rx>, ConfigError> {
        config.validate()?;
        Ok(Firmata {
            tx: BufferedTx::new(tx),
            rx: BufferedRx::new(rx),
            parser: Parser::new(config.max_data_bytes),
            pins: PinTable::new(config.total_pins),
            callbacks: Callbacks::new(),
            firmware: None,
            config,
            scratch: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tx(&self) -> &Tx {
        self.tx.get_ref()
    }

    pub fn rx_mut(&mut self) -> &mut Rx {
        &mut self.rx.rx
    }

    /// Gives the transport back. Bytes still queued on either side are lost.
    pub fn release(self) -> (Tx, Rx) {
        (self.tx.into_inner(), self.rx.rx)
    }

    /// Announces the protocol version, then the firmware identity if one is
    /// set. Call once the link is up.
    pub fn begin(&mut self) -> Result<(), Tx, Rx> {
        self.print_version()?;
        self.print_firmware_version()
    }

    pub fn set_firmware_name_and_version(&mut self, name: impl Into<String>, major: u8, minor: u8) {
        self.firmware = Some(FirmwareIdentity::new(name, major, minor));
    }

    pub fn firmware(&self) -> Option<&FirmwareIdentity> {
        self.firmware.as_ref()
    }

    // ---- input ----

    /// Consumes everything the transport has buffered and returns the number
    /// of bytes processed. Returns `Ok(0)` when there is nothing to read.
    pub fn poll(&mut self) -> Result<usize, Tx, Rx> {
        match self.config.ingestion {
            Ingestion::ByteWise => {
                let mut consumed = 0;
                loop {
                    match embedded_hal_nb::serial::Read::read(&mut self.rx) {
                        Ok(byte) => {
                            self.parse(byte)?;
                            consumed += 1;
                        }
                        Err(nb::Error::WouldBlock) => return Ok(consumed),
                        Err(nb::Error::Other(e)) => return Err(EngineError::Read(e)),
                    }
                }
            }
            Ingestion::Chunked { chunk_size } => {
                let mut consumed = 0;
                loop {
                    if self.rx.fill(chunk_size).map_err(EngineError::Read)? == 0 {
                        return Ok(consumed);
                    }
                    let mut chunk = core::mem::take(&mut self.scratch);
                    chunk.clear();
                    chunk.extend_from_slice(self.rx.slice());
                    let (processed, result) = self.feed_chunk(&chunk);
                    self.scratch = chunk;
                    // bytes after a failed dispatch stay queued, as they do byte-wise
                    self.rx.consume(processed);
                    result?;
                    consumed += processed;
                }
            }
        }
    }

    /// Feeds one byte through the state machine and dispatches whatever it
    /// completes.
    pub fn parse(&mut self, byte: u8) -> Result<(), Tx, Rx> {
        let Firmata {
            tx,
            parser,
            pins,
            callbacks,
            firmware,
            ..
        } = self;
        if let Some(message) = parser.feed(byte) {
            let mut session = Session {
                out: tx,
                pins,
                callbacks,
                firmware: firmware.as_ref(),
            };
            session.dispatch(message)?;
        }
        Ok(())
    }

    /// Same as calling [`Firmata::parse`] on every byte, but sysex payloads
    /// are copied four bytes at a time where possible.
    pub fn parse_chunk(&mut self, chunk: &[u8]) -> Result<(), Tx, Rx> {
        self.feed_chunk(chunk).1
    }

    /// Returns how many bytes of `chunk` were processed. On error that count
    /// includes the byte whose dispatch failed.
    fn feed_chunk(&mut self, chunk: &[u8]) -> (usize, Result<(), Tx, Rx>) {
        let mut pos = 0;
        while pos < chunk.len() {
            pos += self.parser.absorb_sysex_words(&chunk[pos..]);
            if let Some(&byte) = chunk.get(pos) {
                pos += 1;
                if let Err(e) = self.parse(byte) {
                    return (pos, Err(e));
                }
            }
        }
        (pos, Ok(()))
    }

    /// Drops any half parsed message without notifying anyone.
    pub fn reset_parser(&mut self) {
        self.parser.reset();
    }

    /// Same as receiving `SYSTEM_RESET`. Meant for transports that detect a
    /// fresh connection.
    pub fn system_reset(&mut self) {
        self.parser.reset();
        self.callbacks.system_reset();
    }

    pub fn is_parsing_message(&self) -> bool {
        self.parser.is_parsing_message()
    }

    // ---- callbacks ----

    pub fn attach(&mut self, callback: Callback) {
        self.callbacks.attach(callback);
    }

    pub fn detach(&mut self, category: Category) {
        self.callbacks.detach(category);
    }

    /// Asks the scheduler, if one is attached, to wait `millis`.
    pub fn delay_task(&mut self, millis: u32) {
        self.callbacks.delay_task(millis);
    }

    // ---- pins ----

    pub fn pin_mode(&self, pin: u8) -> core::result::Result<PinMode, PinError> {
        self.pins.mode(pin)
    }

    /// Applies `mode` and tells the pin mode callback, unless the pin is
    /// ignored.
    pub fn set_pin_mode(&mut self, pin: u8, mode: PinMode) -> core::result::Result<(), PinError> {
        apply_pin_mode(&mut self.pins, &mut self.callbacks, pin, mode)
    }

    pub fn pin_state(&self, pin: u8) -> core::result::Result<i32, PinError> {
        self.pins.state(pin)
    }

    pub fn set_pin_state(&mut self, pin: u8, state: i32) -> core::result::Result<(), PinError> {
        self.pins.set_state(pin, state)
    }

    // ---- output ----

    pub fn encoder(&mut self) -> Encoder<'_, BufferedTx<Tx>> {
        Encoder::new(&mut self.tx)
    }

    pub fn print_version(&mut self) -> Result<(), Tx, Rx> {
        Ok(self.encoder().print_version()?)
    }

    /// No-op until a firmware identity has been set.
    pub fn print_firmware_version(&mut self) -> Result<(), Tx, Rx> {
        if let Some(identity) = self.firmware.as_ref() {
            Encoder::new(&mut self.tx).send_firmware(identity)?;
        }
        Ok(())
    }

    pub fn send_analog(&mut self, pin: u8, value: u16) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_analog(pin, value)?)
    }

    pub fn send_digital_port(&mut self, port: u8, bits: u16) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_digital_port(port, bits)?)
    }

    pub fn send_sysex(&mut self, command: u8, data: &[u8]) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_sysex(command, data)?)
    }

    pub fn send_string(&mut self, text: &str) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_string(text)?)
    }

    pub fn send_string_with_code(&mut self, text: &str, code: u32) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_string_with_code(text, code)?)
    }

    pub fn send_packed_u14(&mut self, value: u16) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_packed_u14(value)?)
    }

    pub fn send_packed_u32(&mut self, value: u32) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_packed_u32(value)?)
    }

    pub fn send_packed_u64(&mut self, value: u64) -> Result<(), Tx, Rx> {
        Ok(self.encoder().send_packed_u64(value)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Tx, Rx> {
        Ok(self.encoder().write_bytes(bytes)?)
    }

    /// Output bytes the transport has not taken yet.
    pub fn pending_output(&self) -> usize {
        self.tx.pending()
    }

    /// Pushes queued output to the transport. Bytes the transport can't take
    /// yet stay queued.
    pub fn flush(&mut self) -> Result<(), Tx, Rx> {
        Ok(self.encoder().flush()?)
    }
}

impl<Tx: Write, Rx: Read> fmt::Debug for Firmata<Tx, Rx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firmata")
            .field("parser", &self.parser)
            .field("pins", &self.pins)
            .field("callbacks", &self.callbacks)
            .field("firmware", &self.firmware)
            .field("config", &self.config)
            .finish()
    }
}

fn apply_pin_mode(
    pins: &mut PinTable,
    callbacks: &mut Callbacks,
    pin: u8,
    mode: PinMode,
) -> core::result::Result<(), PinError> {
    if pins.set_mode(pin, mode)? {
        callbacks.pin_mode(pin, mode);
    } else {
        log::debug!("pin {} is ignored, keeping its mode", pin);
    }
    Ok(())
}

/// Borrowed view of the engine used while a parsed message is alive.
struct Session<'e, W: embedded_io::Write> {
    out: &'e mut W,
    pins: &'e mut PinTable,
    callbacks: &'e mut Callbacks,
    firmware: Option<&'e FirmwareIdentity>,
}

impl<W: embedded_io::Write> Session<'_, W> {
    fn dispatch(&mut self, message: Message<'_>) -> core::result::Result<(), W::Error> {
        log::trace!("dispatching {:?}", message);
        match message {
            Message::SystemReset => self.callbacks.system_reset(),
            Message::ReportVersion => Encoder::new(&mut *self.out).print_version()?,
            Message::DigitalWrite { port, value } => self.callbacks.digital_write(port, value),
            Message::ReportAnalog { channel, enable } => {
                self.callbacks.report_analog(channel, enable)
            }
            Message::ReportDigital { port, enable } => self.callbacks.report_digital(port, enable),
            Message::SetPinMode { pin, mode } => match PinMode::try_from(mode) {
                Ok(mode) => {
                    if let Err(e) = apply_pin_mode(self.pins, self.callbacks, pin, mode) {
                        log::debug!("dropping pin mode change: {}", e);
                    }
                }
                Err(e) => log::debug!("dropping pin mode change for pin {}: {}", pin, e),
            },
            Message::SetPinValue { pin, value } => self.callbacks.pin_value(pin, value),
            Message::Sysex(frame) => sysex::dispatch(
                frame,
                self.callbacks,
                self.firmware,
                &mut Encoder::new(&mut *self.out),
            )?,
            Message::Overflow { discarded } => {
                log::warn!("discarding sysex message after {} bytes, out of buffer", discarded);
                Encoder::new(&mut *self.out).send_string(DISCARD_NOTICE)?;
            }
        }
        Ok(())
    }
}

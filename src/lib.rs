//! Firmata protocol engine.
//!
//! A byte oriented engine that turns a duplex serial stream into Firmata
//! messages and back. Incoming bytes run through a [`Parser`] state machine,
//! completed messages are dispatched to the [`Callback`]s attached to a
//! [`Firmata`] instance, and outgoing reports are written with an [`Encoder`].
//!
//! The engine is single threaded and never blocks: [`Firmata::poll`] consumes
//! whatever the transport has buffered and returns.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod callbacks;
pub mod codec;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod parser;
pub mod pins;
pub mod protocol;
pub mod serial;
pub mod sysex;

#[cfg(test)]
mod testing;

/// Writes a message onto an outgoing byte stream.
pub trait Encode {
    fn encode<W: embedded_io::Write>(&self, out: &mut W) -> Result<(), W::Error>;
}

pub trait Decode<'a> where Self: Sized {
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use callbacks::{Callback, Callbacks, Category};
pub use config::{Config, ConfigError, Ingestion};
pub use encoder::Encoder;
pub use engine::{EngineError, Firmata};
pub use parser::{Message, Parser, SysexFrame};
pub use pins::{PinError, PinTable};
pub use protocol::{CommandByte, PinMode};
pub use sysex::{DecodeError, FirmwareIdentity};

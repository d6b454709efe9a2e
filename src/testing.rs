//! In-memory transports for tests.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::vec::Vec;

use embedded_hal_nb::serial::{ErrorType, Read, Write};

#[derive(Debug, Default)]
pub struct TxBuffer(pub Vec<u8>);

impl TxBuffer {
    pub fn new() -> TxBuffer {
        TxBuffer(Vec::new())
    }
}

impl ErrorType for TxBuffer {
    type Error = Infallible;
}

impl Write for TxBuffer {
    fn write(&mut self, c: u8) -> nb::Result<(), Infallible> {
        self.0.push(c);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ReadBuffer(pub VecDeque<u8>);

impl ReadBuffer {
    pub fn from_iter(data: impl IntoIterator<Item = u8>) -> ReadBuffer {
        ReadBuffer(data.into_iter().collect())
    }

    pub fn push(&mut self, data: &[u8]) {
        self.0.extend(data.iter().copied());
    }
}

impl ErrorType for ReadBuffer {
    type Error = Infallible;
}

impl Read for ReadBuffer {
    fn read(&mut self) -> nb::Result<u8, Infallible> {
        self.0.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// Accepts `budget` bytes, then blocks.
#[derive(Debug)]
pub struct StallingTx {
    pub sent: Vec<u8>,
    pub budget: usize,
}

impl StallingTx {
    pub fn accepting(budget: usize) -> StallingTx {
        StallingTx {
            sent: Vec::new(),
            budget,
        }
    }
}

impl ErrorType for StallingTx {
    type Error = Infallible;
}

impl Write for StallingTx {
    fn write(&mut self, c: u8) -> nb::Result<(), Infallible> {
        if self.sent.len() >= self.budget {
            return Err(nb::Error::WouldBlock);
        }
        self.sent.push(c);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}

/// A receive half that fails with a serial error.
#[derive(Debug)]
pub struct BrokenRx;

impl ErrorType for BrokenRx {
    type Error = embedded_hal_nb::serial::ErrorKind;
}

impl Read for BrokenRx {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        Err(nb::Error::Other(embedded_hal_nb::serial::ErrorKind::Noise))
    }
}

/// Fails the first `failures` writes, then accepts everything.
#[derive(Debug)]
pub struct BrokenTx {
    pub sent: Vec<u8>,
    pub failures: usize,
}

impl BrokenTx {
    pub fn failing(failures: usize) -> BrokenTx {
        BrokenTx {
            sent: Vec::new(),
            failures,
        }
    }
}

impl ErrorType for BrokenTx {
    type Error = embedded_hal_nb::serial::ErrorKind;
}

impl Write for BrokenTx {
    fn write(&mut self, c: u8) -> nb::Result<(), Self::Error> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(nb::Error::Other(embedded_hal_nb::serial::ErrorKind::Other));
        }
        self.sent.push(c);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

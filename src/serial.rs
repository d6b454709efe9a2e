//! Buffered halves of a non-blocking serial transport.
//!
//! The engine reads through [`BufferedRx`], which keeps received bytes queued
//! until the parser has actually consumed them, and writes through
//! [`BufferedTx`], which keeps whatever the transport refuses for the next
//! flush.

use alloc::collections::VecDeque;
use embedded_hal_nb::serial::{Error, ErrorKind, ErrorType, Read, Write};

#[derive(Debug)]
pub struct BufferedRx<Rx: Read> {
    pub rx: Rx,
    queue: VecDeque<u8>,
}

impl<Rx: Read> BufferedRx<Rx> {
    pub fn new(rx: Rx) -> BufferedRx<Rx> {
        BufferedRx {
            rx,
            queue: VecDeque::new(),
        }
    }

    /// Tops the queue up to `limit` bytes, stopping early when the transport
    /// has nothing more. Returns the queue length.
    pub fn fill(&mut self, limit: usize) -> Result<usize, Rx::Error> {
        while self.queue.len() < limit {
            match self.rx.read() {
                Ok(byte) => self.queue.push_back(byte),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
        Ok(self.queue.len())
    }

    /// Queued bytes, oldest first.
    pub fn slice(&mut self) -> &[u8] {
        self.queue.make_contiguous()
    }

    /// Drops up to `amount` bytes from the front once they are processed.
    pub fn consume(&mut self, amount: usize) {
        let amount = amount.min(self.queue.len());
        self.queue.drain(..amount);
    }
}

impl<Rx: Read> ErrorType for BufferedRx<Rx> {
    type Error = Rx::Error;
}

impl<Rx: Read> Read for BufferedRx<Rx> {
    fn read(&mut self) -> nb::Result<u8, Rx::Error> {
        if self.queue.is_empty() {
            self.fill(1).map_err(nb::Error::Other)?;
        }
        self.queue.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// Transmit half used as an [`embedded_io::Write`] sink by the encoder.
///
/// Written bytes are queued, then pushed out for as long as the transport
/// takes them. Whatever it refuses stays queued, counted by
/// [`BufferedTx::pending`], and goes out on the next write or flush. A
/// transport error is returned to the caller with the bytes still queued.
#[derive(Debug)]
pub struct BufferedTx<Tx: Write> {
    tx: Tx,
    queue: VecDeque<u8>,
}

impl<Tx: Write> BufferedTx<Tx> {
    pub fn new(tx: Tx) -> BufferedTx<Tx> {
        BufferedTx {
            tx,
            queue: VecDeque::new(),
        }
    }

    pub fn get_ref(&self) -> &Tx {
        &self.tx
    }

    pub fn into_inner(self) -> Tx {
        self.tx
    }

    /// Bytes queued but not yet taken by the transport.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Hands queued bytes to the transport until it blocks. A byte only
    /// leaves the queue once the transport accepted it.
    fn push_out(&mut self) -> Result<(), TxError<Tx::Error>> {
        while let Some(&byte) = self.queue.front() {
            match self.tx.write(byte) {
                Ok(()) => {
                    self.queue.pop_front();
                }
                Err(nb::Error::WouldBlock) => {
                    log::trace!("transport busy, {} bytes pending", self.queue.len());
                    return Ok(());
                }
                Err(nb::Error::Other(e)) => return Err(TxError(e)),
            }
        }
        match self.tx.flush() {
            Ok(()) | Err(nb::Error::WouldBlock) => Ok(()),
            Err(nb::Error::Other(e)) => Err(TxError(e)),
        }
    }
}

/// A transmit failure reported by the serial transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxError<E>(pub E);

impl<E: Error> embedded_io::Error for TxError<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            ErrorKind::Overrun => embedded_io::ErrorKind::OutOfMemory,
            ErrorKind::Parity | ErrorKind::FrameFormat | ErrorKind::Noise => {
                embedded_io::ErrorKind::InvalidData
            }
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl<Tx: Write> embedded_io::ErrorType for BufferedTx<Tx> {
    type Error = TxError<Tx::Error>;
}

impl<Tx: Write> embedded_io::Write for BufferedTx<Tx> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, TxError<Tx::Error>> {
        self.queue.extend(buf.iter().copied());
        self.push_out()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), TxError<Tx::Error>> {
        self.push_out()
    }
}

#[cfg(test)]
mod tests {
    use embedded_io::Write as _;

    use super::*;
    use crate::testing::{BrokenTx, ReadBuffer, StallingTx, TxBuffer};

    #[test]
    fn fill_stops_at_limit() {
        let mut rx = BufferedRx::new(ReadBuffer::from_iter(0..10u8));
        assert_eq!(rx.fill(4), Ok(4));
        assert_eq!(rx.slice(), &[0, 1, 2, 3]);
        rx.consume(3);
        assert_eq!(rx.fill(100), Ok(7));
        assert_eq!(rx.slice(), &[3, 4, 5, 6, 7, 8, 9]);
        rx.consume(100);
        assert_eq!(rx.fill(100), Ok(0));
    }

    #[test]
    fn read_takes_queued_bytes_first() {
        let mut rx = BufferedRx::new(ReadBuffer::from_iter([7, 8]));
        assert_eq!(rx.fill(1), Ok(1));
        rx.rx.push(&[9]);
        assert_eq!(rx.read(), Ok(7));
        assert_eq!(rx.read(), Ok(8));
        assert_eq!(rx.read(), Ok(9));
        assert_eq!(rx.read(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn write_reaches_transport() {
        let mut tx = BufferedTx::new(TxBuffer::new());
        tx.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(tx.get_ref().0, [1, 2, 3]);
        assert_eq!(tx.pending(), 0);
    }

    #[test]
    fn refused_bytes_stay_pending() {
        let mut tx = BufferedTx::new(StallingTx::accepting(2));
        tx.write_all(&[1, 2, 3, 4]).unwrap();
        assert_eq!(tx.get_ref().sent, [1, 2]);
        assert_eq!(tx.pending(), 2);

        tx.tx.budget = 10;
        tx.flush().unwrap();
        assert_eq!(tx.get_ref().sent, [1, 2, 3, 4]);
        assert_eq!(tx.pending(), 0);
    }

    #[test]
    fn transport_errors_surface_and_keep_the_byte() {
        let mut tx = BufferedTx::new(BrokenTx::failing(1));
        let err = tx.write_all(&[1, 2]).unwrap_err();
        assert_eq!(err, TxError(ErrorKind::Other));
        assert_eq!(embedded_io::Error::kind(&err), embedded_io::ErrorKind::Other);
        assert_eq!(tx.pending(), 2);

        tx.flush().unwrap();
        assert_eq!(tx.get_ref().sent, [1, 2]);
    }
}

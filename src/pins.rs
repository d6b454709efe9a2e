use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::protocol::PinMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    OutOfRange { pin: u8, total: usize },
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinError::OutOfRange { pin, total } => {
                write!(f, "pin {} out of range, board has {} pins", pin, total)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Pin {
    mode: PinMode,
    state: i32,
}

/// Mode and last known value of every pin on the board.
#[derive(Debug, Clone)]
pub struct PinTable {
    pins: Vec<Pin>,
}

impl PinTable {
    pub fn new(total: usize) -> PinTable {
        PinTable {
            pins: vec![Pin::default(); total],
        }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn mode(&self, pin: u8) -> Result<PinMode, PinError> {
        self.get(pin).map(|p| p.mode)
    }

    pub fn state(&self, pin: u8) -> Result<i32, PinError> {
        self.get(pin).map(|p| p.state)
    }

    /// Changes the mode and zeroes the state. Pins in [`PinMode::Ignore`] are
    /// left alone, in which case this returns `Ok(false)`.
    pub fn set_mode(&mut self, pin: u8, mode: PinMode) -> Result<bool, PinError> {
        let p = self.get_mut(pin)?;
        if p.mode == PinMode::Ignore {
            return Ok(false);
        }
        p.state = 0;
        p.mode = mode;
        Ok(true)
    }

    /// Records a value a driver already applied.
    pub fn set_state(&mut self, pin: u8, state: i32) -> Result<(), PinError> {
        self.get_mut(pin)?.state = state;
        Ok(())
    }

    fn get(&self, pin: u8) -> Result<&Pin, PinError> {
        let total = self.pins.len();
        self.pins
            .get(pin as usize)
            .ok_or(PinError::OutOfRange { pin, total })
    }

    fn get_mut(&mut self, pin: u8) -> Result<&mut Pin, PinError> {
        let total = self.pins.len();
        self.pins
            .get_mut(pin as usize)
            .ok_or(PinError::OutOfRange { pin, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_mode_zeroes_state() {
        let mut t = PinTable::new(4);
        t.set_state(2, 99).unwrap();
        assert_eq!(t.set_mode(2, PinMode::Output), Ok(true));
        assert_eq!(t.mode(2), Ok(PinMode::Output));
        assert_eq!(t.state(2), Ok(0));
    }

    #[test]
    fn ignore_locks_pin() {
        let mut t = PinTable::new(4);
        t.set_mode(1, PinMode::Ignore).unwrap();
        t.set_state(1, 7).unwrap();
        assert_eq!(t.set_mode(1, PinMode::Output), Ok(false));
        assert_eq!(t.mode(1), Ok(PinMode::Ignore));
        assert_eq!(t.state(1), Ok(7));
    }

    #[test]
    fn out_of_range_fails_fast() {
        let mut t = PinTable::new(4);
        let err = PinError::OutOfRange { pin: 4, total: 4 };
        assert_eq!(t.mode(4), Err(err));
        assert_eq!(t.set_state(4, 1), Err(err));
        assert_eq!(t.set_mode(4, PinMode::Input), Err(err));
    }
}

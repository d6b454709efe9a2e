//! Handler slots for decoded messages.
//!
//! Each [`Category`] holds at most one handler. Attaching replaces whatever
//! was there, and invoking an empty slot does nothing.

use alloc::boxed::Box;

use crate::protocol::PinMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    DigitalWrite,
    ReportAnalog,
    ReportDigital,
    PinMode,
    PinValue,
    SystemReset,
    StringData,
    Sysex,
    DelayTask,
}

/// A handler together with the category it answers to.
pub enum Callback {
    /// `(port, 14-bit port value)`
    DigitalWrite(Box<dyn FnMut(u8, u16)>),
    /// `(analog channel, enabled)`
    ReportAnalog(Box<dyn FnMut(u8, bool)>),
    /// `(port, enabled)`
    ReportDigital(Box<dyn FnMut(u8, bool)>),
    PinMode(Box<dyn FnMut(u8, PinMode)>),
    /// `(pin, value)`
    PinValue(Box<dyn FnMut(u8, u8)>),
    SystemReset(Box<dyn FnMut()>),
    StringData(Box<dyn FnMut(&str)>),
    /// `(sub-command, payload)` for every sysex the engine does not handle itself
    Sysex(Box<dyn FnMut(u8, &[u8])>),
    /// Milliseconds the scheduler should wait
    DelayTask(Box<dyn FnMut(u32)>),
}

impl Callback {
    pub fn digital_write(f: impl FnMut(u8, u16) + 'static) -> Callback {
        Callback::DigitalWrite(Box::new(f))
    }

    pub fn report_analog(f: impl FnMut(u8, bool) + 'static) -> Callback {
        Callback::ReportAnalog(Box::new(f))
    }

    pub fn report_digital(f: impl FnMut(u8, bool) + 'static) -> Callback {
        Callback::ReportDigital(Box::new(f))
    }

    pub fn pin_mode(f: impl FnMut(u8, PinMode) + 'static) -> Callback {
        Callback::PinMode(Box::new(f))
    }

    pub fn pin_value(f: impl FnMut(u8, u8) + 'static) -> Callback {
        Callback::PinValue(Box::new(f))
    }

    pub fn system_reset(f: impl FnMut() + 'static) -> Callback {
        Callback::SystemReset(Box::new(f))
    }

    pub fn string_data(f: impl FnMut(&str) + 'static) -> Callback {
        Callback::StringData(Box::new(f))
    }

    pub fn sysex(f: impl FnMut(u8, &[u8]) + 'static) -> Callback {
        Callback::Sysex(Box::new(f))
    }

    pub fn delay_task(f: impl FnMut(u32) + 'static) -> Callback {
        Callback::DelayTask(Box::new(f))
    }

    pub fn category(&self) -> Category {
        match self {
            Callback::DigitalWrite(_) => Category::DigitalWrite,
            Callback::ReportAnalog(_) => Category::ReportAnalog,
            Callback::ReportDigital(_) => Category::ReportDigital,
            Callback::PinMode(_) => Category::PinMode,
            Callback::PinValue(_) => Category::PinValue,
            Callback::SystemReset(_) => Category::SystemReset,
            Callback::StringData(_) => Category::StringData,
            Callback::Sysex(_) => Category::Sysex,
            Callback::DelayTask(_) => Category::DelayTask,
        }
    }
}

impl core::fmt::Debug for Callback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Callback").field(&self.category()).finish()
    }
}

#[derive(Default)]
pub struct Callbacks {
    digital_write: Option<Box<dyn FnMut(u8, u16)>>,
    report_analog: Option<Box<dyn FnMut(u8, bool)>>,
    report_digital: Option<Box<dyn FnMut(u8, bool)>>,
    pin_mode: Option<Box<dyn FnMut(u8, PinMode)>>,
    pin_value: Option<Box<dyn FnMut(u8, u8)>>,
    system_reset: Option<Box<dyn FnMut()>>,
    string_data: Option<Box<dyn FnMut(&str)>>,
    sysex: Option<Box<dyn FnMut(u8, &[u8])>>,
    delay_task: Option<Box<dyn FnMut(u32)>>,
}

impl Callbacks {
    pub fn new() -> Callbacks {
        Callbacks::default()
    }

    pub fn attach(&mut self, callback: Callback) {
        match callback {
            Callback::DigitalWrite(f) => self.digital_write = Some(f),
            Callback::ReportAnalog(f) => self.report_analog = Some(f),
            Callback::ReportDigital(f) => self.report_digital = Some(f),
            Callback::PinMode(f) => self.pin_mode = Some(f),
            Callback::PinValue(f) => self.pin_value = Some(f),
            Callback::SystemReset(f) => self.system_reset = Some(f),
            Callback::StringData(f) => self.string_data = Some(f),
            Callback::Sysex(f) => self.sysex = Some(f),
            Callback::DelayTask(f) => self.delay_task = Some(f),
        }
    }

    pub fn detach(&mut self, category: Category) {
        match category {
            Category::DigitalWrite => self.digital_write = None,
            Category::ReportAnalog => self.report_analog = None,
            Category::ReportDigital => self.report_digital = None,
            Category::PinMode => self.pin_mode = None,
            Category::PinValue => self.pin_value = None,
            Category::SystemReset => self.system_reset = None,
            Category::StringData => self.string_data = None,
            Category::Sysex => self.sysex = None,
            Category::DelayTask => self.delay_task = None,
        }
    }

    pub fn is_attached(&self, category: Category) -> bool {
        match category {
            Category::DigitalWrite => self.digital_write.is_some(),
            Category::ReportAnalog => self.report_analog.is_some(),
            Category::ReportDigital => self.report_digital.is_some(),
            Category::PinMode => self.pin_mode.is_some(),
            Category::PinValue => self.pin_value.is_some(),
            Category::SystemReset => self.system_reset.is_some(),
            Category::StringData => self.string_data.is_some(),
            Category::Sysex => self.sysex.is_some(),
            Category::DelayTask => self.delay_task.is_some(),
        }
    }

    pub fn digital_write(&mut self, port: u8, value: u16) {
        if let Some(f) = self.digital_write.as_mut() {
            f(port, value);
        }
    }

    pub fn report_analog(&mut self, channel: u8, enable: bool) {
        if let Some(f) = self.report_analog.as_mut() {
            f(channel, enable);
        }
    }

    pub fn report_digital(&mut self, port: u8, enable: bool) {
        if let Some(f) = self.report_digital.as_mut() {
            f(port, enable);
        }
    }

    pub fn pin_mode(&mut self, pin: u8, mode: PinMode) {
        if let Some(f) = self.pin_mode.as_mut() {
            f(pin, mode);
        }
    }

    pub fn pin_value(&mut self, pin: u8, value: u8) {
        if let Some(f) = self.pin_value.as_mut() {
            f(pin, value);
        }
    }

    pub fn system_reset(&mut self) {
        if let Some(f) = self.system_reset.as_mut() {
            f();
        }
    }

    pub fn string_data(&mut self, text: &str) {
        if let Some(f) = self.string_data.as_mut() {
            f(text);
        }
    }

    pub fn sysex(&mut self, command: u8, payload: &[u8]) {
        if let Some(f) = self.sysex.as_mut() {
            f(command, payload);
        }
    }

    pub fn delay_task(&mut self, millis: u32) {
        if let Some(f) = self.delay_task.as_mut() {
            f(millis);
        }
    }
}

impl core::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Callbacks")
            .field("digital_write", &self.digital_write.is_some())
            .field("report_analog", &self.report_analog.is_some())
            .field("report_digital", &self.report_digital.is_some())
            .field("pin_mode", &self.pin_mode.is_some())
            .field("pin_value", &self.pin_value.is_some())
            .field("system_reset", &self.system_reset.is_some())
            .field("string_data", &self.string_data.is_some())
            .field("sysex", &self.sysex.is_some())
            .field("delay_task", &self.delay_task.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn attach_replaces_previous_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cbs = Callbacks::new();

        let s = seen.clone();
        cbs.attach(Callback::digital_write(move |p, v| s.borrow_mut().push(("first", p, v))));
        let s = seen.clone();
        cbs.attach(Callback::digital_write(move |p, v| s.borrow_mut().push(("second", p, v))));

        cbs.digital_write(1, 2);
        assert_eq!(*seen.borrow(), [("second", 1, 2)]);
    }

    #[test]
    fn detach_clears_only_its_category() {
        let hits = Rc::new(RefCell::new(0));
        let mut cbs = Callbacks::new();
        let h = hits.clone();
        cbs.attach(Callback::system_reset(move || *h.borrow_mut() += 1));
        cbs.attach(Callback::delay_task(|_| {}));

        cbs.detach(Category::DelayTask);
        assert!(cbs.is_attached(Category::SystemReset));
        assert!(!cbs.is_attached(Category::DelayTask));

        cbs.system_reset();
        cbs.detach(Category::SystemReset);
        cbs.system_reset();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn empty_slots_are_no_ops() {
        let mut cbs = Callbacks::new();
        cbs.sysex(0x10, &[1, 2]);
        cbs.string_data("x");
        cbs.pin_mode(0, PinMode::Output);
    }

    #[test]
    fn category_follows_variant() {
        assert_eq!(Callback::sysex(|_, _| {}).category(), Category::Sysex);
        assert_eq!(Callback::pin_value(|_, _| {}).category(), Category::PinValue);
    }
}

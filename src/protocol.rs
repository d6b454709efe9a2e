use bilge::prelude::*;

use crate::sysex::DecodeError;

pub const PROTOCOL_MAJOR_VERSION: u8 = 2;
pub const PROTOCOL_MINOR_VERSION: u8 = 7;
pub const PROTOCOL_BUGFIX_VERSION: u8 = 0;

// Command bytes (0x80-0xFF)
/// Digital port data, 14 bits split over two data bytes
pub const DIGITAL_MESSAGE: u8 = 0x90;
/// Analog pin data (or PWM), pins 0-15 only
pub const ANALOG_MESSAGE: u8 = 0xE0;
pub const REPORT_ANALOG: u8 = 0xC0;
pub const REPORT_DIGITAL: u8 = 0xD0;
pub const SET_PIN_MODE: u8 = 0xF4;
pub const SET_DIGITAL_PIN_VALUE: u8 = 0xF5;
pub const REPORT_VERSION: u8 = 0xF9;
/// Preempts everything, whatever the parser is doing
pub const SYSTEM_RESET: u8 = 0xFF;
pub const START_SYSEX: u8 = 0xF0;
pub const END_SYSEX: u8 = 0xF7;

// Sysex sub-commands (0x00-0x7F). 0x00-0x0F are left to user defined commands.
pub const SERIAL_MESSAGE: u8 = 0x60;
pub const ENCODER_DATA: u8 = 0x61;
pub const ACCELSTEPPER_DATA: u8 = 0x62;
pub const REPORT_DIGITAL_PIN: u8 = 0x63;
/// Analog reporting for channels above 15
pub const EXTENDED_REPORT_ANALOG: u8 = 0x64;
pub const REPORT_FEATURES: u8 = 0x65;
pub const SPI_DATA: u8 = 0x68;
pub const ANALOG_MAPPING_QUERY: u8 = 0x69;
pub const ANALOG_MAPPING_RESPONSE: u8 = 0x6A;
pub const CAPABILITY_QUERY: u8 = 0x6B;
pub const CAPABILITY_RESPONSE: u8 = 0x6C;
pub const PIN_STATE_QUERY: u8 = 0x6D;
pub const PIN_STATE_RESPONSE: u8 = 0x6E;
/// Analog write to any pin, or analog input from a pin above 15
pub const EXTENDED_ANALOG: u8 = 0x6F;
pub const SERVO_CONFIG: u8 = 0x70;
/// A string with 14 bits per character
pub const STRING_DATA: u8 = 0x71;
pub const STEPPER_DATA: u8 = 0x72;
pub const ONEWIRE_DATA: u8 = 0x73;
pub const DHTSENSOR_DATA: u8 = 0x74;
pub const SHIFT_DATA: u8 = 0x75;
pub const I2C_REQUEST: u8 = 0x76;
pub const I2C_REPLY: u8 = 0x77;
pub const I2C_CONFIG: u8 = 0x78;
pub const REPORT_FIRMWARE: u8 = 0x79;
pub const SAMPLING_INTERVAL: u8 = 0x7A;
pub const SCHEDULER_DATA: u8 = 0x7B;
pub const ANALOG_CONFIG: u8 = 0x7C;
pub const FREQUENCY_COMMAND: u8 = 0x7D;
pub const SYSEX_NON_REALTIME: u8 = 0x7E;
pub const SYSEX_REALTIME: u8 = 0x7F;

/// Command bytes below 0xF0 address one of 16 channels in their low nibble.
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq, Eq)]
pub struct CommandByte {
    channel: u4,
    opcode: u4,
}

impl CommandByte {
    /// Builds `command | channel`, keeping only the low nibble of `channel`.
    pub fn with_channel(command: u8, channel: u8) -> CommandByte {
        CommandByte::new(u4::new(channel & 0x0F), u4::new(command >> 4))
    }

    /// The command with any channel stripped.
    pub fn command(&self) -> u8 {
        if self.has_channel() {
            self.opcode().value() << 4
        } else {
            self.value
        }
    }

    /// `None` for the 0xF0-0xFF system commands.
    pub fn channel_nibble(&self) -> Option<u8> {
        self.has_channel().then(|| self.channel().value())
    }

    fn has_channel(&self) -> bool {
        self.value < 0xF0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PinMode {
    #[default]
    Input = 0x00,
    Output = 0x01,
    Analog = 0x02,
    Pwm = 0x03,
    Servo = 0x04,
    Shift = 0x05,
    I2c = 0x06,
    OneWire = 0x07,
    Stepper = 0x08,
    Encoder = 0x09,
    Serial = 0x0A,
    PullUp = 0x0B,
    Spi = 0x0C,
    Sonar = 0x0D,
    Tone = 0x0E,
    Dht = 0x0F,
    Frequency = 0x10,
    /// Locks the pin: further mode changes are dropped.
    Ignore = 0x7F,
}

impl TryFrom<u8> for PinMode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use PinMode::*;
        let mode = match value {
            0x00 => Input,
            0x01 => Output,
            0x02 => Analog,
            0x03 => Pwm,
            0x04 => Servo,
            0x05 => Shift,
            0x06 => I2c,
            0x07 => OneWire,
            0x08 => Stepper,
            0x09 => Encoder,
            0x0A => Serial,
            0x0B => PullUp,
            0x0C => Spi,
            0x0D => Sonar,
            0x0E => Tone,
            0x0F => Dht,
            0x10 => Frequency,
            0x7F => Ignore,
            other => return Err(DecodeError::UnknownPinMode(other)),
        };
        Ok(mode)
    }
}

impl From<PinMode> for u8 {
    fn from(mode: PinMode) -> u8 {
        mode as u8
    }
}

use core::fmt;

/// Sysex buffer size for small boards.
pub const MAX_DATA_BYTES: usize = 64;
/// Largest sysex buffer. Payload lengths are byte indexed, so this must stay
/// below 256.
pub const MAX_SYSEX_CAPACITY: usize = 252;
/// Smallest buffer that still holds a repacked analog write.
pub const MIN_DATA_BYTES: usize = 8;
/// Raw read size paired with [`MAX_SYSEX_CAPACITY`] on large memory boards.
pub const LARGE_MEM_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_TOTAL_PINS: usize = 20;
/// Pin numbers travel as single data bytes.
pub const MAX_TOTAL_PINS: usize = 128;

/// How [`crate::Firmata::poll`] pulls bytes from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingestion {
    /// One byte at a time through the state machine.
    ByteWise,
    /// Read up to `chunk_size` bytes, fast-scanning sysex payloads four bytes
    /// at a time.
    Chunked { chunk_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_data_bytes: usize,
    pub ingestion: Ingestion,
    pub total_pins: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    BufferSize { requested: usize, min: usize, max: usize },
    ChunkTooSmall { requested: usize },
    PinCount { requested: usize, max: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BufferSize { requested, min, max } => write!(
                f,
                "sysex buffer of {} bytes outside {}..={}",
                requested, min, max
            ),
            ConfigError::ChunkTooSmall { requested } => {
                write!(f, "chunk size {} is smaller than one 4-byte group", requested)
            }
            ConfigError::PinCount { requested, max } => {
                write!(f, "{} pins requested, at most {} addressable", requested, max)
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_data_bytes: MAX_DATA_BYTES,
            ingestion: Ingestion::ByteWise,
            total_pins: DEFAULT_TOTAL_PINS,
        }
    }
}

impl Config {
    /// Big sysex buffer fed by chunked reads.
    pub fn large_memory() -> Self {
        Config {
            max_data_bytes: MAX_SYSEX_CAPACITY,
            ingestion: Ingestion::Chunked {
                chunk_size: LARGE_MEM_CHUNK_SIZE,
            },
            total_pins: DEFAULT_TOTAL_PINS,
        }
    }

    pub fn with_max_data_bytes(mut self, max_data_bytes: usize) -> Self {
        self.max_data_bytes = max_data_bytes;
        self
    }

    pub fn with_ingestion(mut self, ingestion: Ingestion) -> Self {
        self.ingestion = ingestion;
        self
    }

    pub fn with_total_pins(mut self, total_pins: usize) -> Self {
        self.total_pins = total_pins;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_DATA_BYTES..=MAX_SYSEX_CAPACITY).contains(&self.max_data_bytes) {
            return Err(ConfigError::BufferSize {
                requested: self.max_data_bytes,
                min: MIN_DATA_BYTES,
                max: MAX_SYSEX_CAPACITY,
            });
        }
        if let Ingestion::Chunked { chunk_size } = self.ingestion {
            if chunk_size < 4 {
                return Err(ConfigError::ChunkTooSmall { requested: chunk_size });
            }
        }
        if self.total_pins == 0 || self.total_pins > MAX_TOTAL_PINS {
            return Err(ConfigError::PinCount {
                requested: self.total_pins,
                max: MAX_TOTAL_PINS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
        assert_eq!(Config::large_memory().validate(), Ok(()));
        assert_eq!(Config::default().max_data_bytes, 64);
    }

    #[test]
    fn rejects_oversized_buffer() {
        let c = Config::default().with_max_data_bytes(300);
        assert_eq!(
            c.validate(),
            Err(ConfigError::BufferSize { requested: 300, min: 8, max: 252 })
        );
    }

    #[test]
    fn rejects_tiny_chunks_and_bad_pin_counts() {
        let c = Config::default().with_ingestion(Ingestion::Chunked { chunk_size: 2 });
        assert_eq!(c.validate(), Err(ConfigError::ChunkTooSmall { requested: 2 }));
        let c = Config::default().with_total_pins(0);
        assert!(matches!(c.validate(), Err(ConfigError::PinCount { .. })));
        let c = Config::default().with_total_pins(129);
        assert!(matches!(c.validate(), Err(ConfigError::PinCount { .. })));
    }
}

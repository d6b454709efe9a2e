//! 7-bit safe integer packing.
//!
//! Every byte with the high bit set is a command on the wire, so numbers
//! travel as groups of 7 bits, least significant group first. None of these
//! functions can fail: input wider than the wire format is truncated.

/// Splits the low 14 bits of `value` into `(lsb, msb)`.
pub const fn split_7bit(value: u16) -> (u8, u8) {
    ((value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8)
}

/// Inverse of [`split_7bit`].
pub const fn join_7bit(lsb: u8, msb: u8) -> u16 {
    (lsb & 0x7F) as u16 | (((msb & 0x7F) as u16) << 7)
}

pub const fn encode_packed14(value: u16) -> [u8; 2] {
    let (lsb, msb) = split_7bit(value);
    [lsb, msb]
}

pub const fn decode_packed14(bytes: &[u8; 2]) -> u16 {
    join_7bit(bytes[0], bytes[1])
}

/// Packs a `u32` into five bytes. The last byte only carries the top 4 bits.
pub const fn encode_packed32(value: u32) -> [u8; 5] {
    [
        (value & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 21) & 0x7F) as u8,
        ((value >> 28) & 0x0F) as u8,
    ]
}

pub const fn decode_packed32(bytes: &[u8; 5]) -> u32 {
    (bytes[0] & 0x7F) as u32
        | ((bytes[1] & 0x7F) as u32) << 7
        | ((bytes[2] & 0x7F) as u32) << 14
        | ((bytes[3] & 0x7F) as u32) << 21
        | ((bytes[4] & 0x7F) as u32) << 28
}

/// Low half first, then the high half, each as a packed `u32`.
pub fn encode_packed64(value: u64) -> [u8; 10] {
    let mut out = [0; 10];
    let (low, high) = out.split_at_mut(5);
    low.copy_from_slice(&encode_packed32(value as u32));
    high.copy_from_slice(&encode_packed32((value >> 32) as u32));
    out
}

pub fn decode_packed64(bytes: &[u8; 10]) -> u64 {
    let mut low = [0; 5];
    let mut high = [0; 5];
    low.copy_from_slice(&bytes[..5]);
    high.copy_from_slice(&bytes[5..]);
    decode_packed32(&low) as u64 | (decode_packed32(&high) as u64) << 32
}

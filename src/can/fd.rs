//! CAN FD data length codes.
//!
//! DLC 0..=8 map to the same number of bytes. Above that the mapping is
//! non-linear: 9 -> 12, 10 -> 16, 11 -> 20, 12 -> 24, 13 -> 32, 14 -> 48 and
//! 15 -> 64 bytes. Classic CAN frames cap at 8 bytes whatever the DLC says.

/// Largest CAN FD payload in bytes.
pub const MAX_FD_DATA_LEN: usize = 64;

/// Largest classic CAN payload in bytes.
pub const MAX_CLASSIC_DATA_LEN: usize = 8;

/// Payload length encoded by `dlc`.
#[inline]
pub const fn dlc_to_len(dlc: u8, fd: bool) -> usize {
    match dlc {
        0..=8 => dlc as usize,
        _ if !fd => MAX_CLASSIC_DATA_LEN,
        9 => 12,
        10 => 16,
        11 => 20,
        12 => 24,
        13 => 32,
        14 => 48,
        _ => MAX_FD_DATA_LEN,
    }
}

/// Smallest DLC whose payload holds `len` bytes.
#[inline]
pub const fn len_to_dlc(len: usize) -> u8 {
    match len {
        0..=8 => len as u8,
        9..=12 => 9,
        13..=16 => 10,
        17..=20 => 11,
        21..=24 => 12,
        25..=32 => 13,
        33..=48 => 14,
        _ => 15,
    }
}

use alloc::vec::Vec;
use core::fmt;

use super::fd::{MAX_FD_DATA_LEN, dlc_to_len, len_to_dlc};

/// Bit 31 of a message id marks a 29-bit extended identifier.
pub const CAN_EXTENDED_FLAG: u32 = 0x8000_0000;
/// Mask of the identifier bits.
pub const CAN_ID_MASK: u32 = 0x1FFF_FFFF;

/// Kind of a CAN error frame, as stored in `CAN_ErrorFrame.ErrorType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CanErrorType {
    #[default]
    Unknown,
    BitError,
    FormError,
    BitStuffingError,
    CrcError,
    AckError,
}

impl CanErrorType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => CanErrorType::BitError,
            2 => CanErrorType::FormError,
            3 => CanErrorType::BitStuffingError,
            4 => CanErrorType::CrcError,
            5 => CanErrorType::AckError,
            _ => CanErrorType::Unknown,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            CanErrorType::Unknown => 0,
            CanErrorType::BitError => 1,
            CanErrorType::FormError => 2,
            CanErrorType::BitStuffingError => 3,
            CanErrorType::CrcError => 4,
            CanErrorType::AckError => 5,
        }
    }
}

/// One CAN or CAN FD frame as logged by a bus logger.
///
/// ```
/// use mdf_rs::can::CanMessage;
///
/// let mut msg = CanMessage::new();
/// msg.set_message_id(0x123);
/// msg.set_extended_id(false);
/// msg.set_data_bytes(&[1, 2, 3, 4, 5, 6, 7, 8]);
/// assert_eq!(msg.dlc(), 8);
/// assert_eq!(msg.can_id(), 0x123);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanMessage {
    message_id: u32,
    dlc: u8,
    data: Vec<u8>,
    bus_channel: u8,
    timestamp: u64,
    crc: u32,
    dir: bool,
    remote: bool,
    brs: bool,
    esi: bool,
    edl: bool,
    error_type: CanErrorType,
}

impl CanMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier including the extended flag in bit 31.
    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    /// Sets the identifier. Ids above 11 bits, or with bit 31 set, become
    /// extended ids.
    pub fn set_message_id(&mut self, id: u32) {
        self.message_id = id;
        if id & CAN_ID_MASK > 0x7FF {
            self.message_id |= CAN_EXTENDED_FLAG;
        }
    }

    /// Identifier without the extended flag.
    pub fn can_id(&self) -> u32 {
        self.message_id & CAN_ID_MASK
    }

    pub fn extended_id(&self) -> bool {
        self.message_id & CAN_EXTENDED_FLAG != 0
    }

    pub fn set_extended_id(&mut self, extended: bool) {
        if extended {
            self.message_id |= CAN_EXTENDED_FLAG;
        } else {
            self.message_id &= !CAN_EXTENDED_FLAG;
        }
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// Sets the DLC (0..=15). The payload is left as is; remote frames carry
    /// a DLC without data.
    pub fn set_dlc(&mut self, dlc: u8) {
        self.dlc = dlc.min(15);
    }

    /// Payload length the DLC stands for.
    pub fn dlc_length(&self) -> usize {
        dlc_to_len(self.dlc, self.edl)
    }

    /// Number of payload bytes.
    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    pub fn data_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Sets the payload (at most 64 bytes) and the matching DLC. Payloads
    /// longer than 8 bytes mark the frame as CAN FD.
    pub fn set_data_bytes(&mut self, data: &[u8]) {
        let len = data.len().min(MAX_FD_DATA_LEN);
        self.data = data[..len].to_vec();
        self.dlc = len_to_dlc(len);
        if len > 8 {
            self.edl = true;
        }
    }

    pub fn bus_channel(&self) -> u8 {
        self.bus_channel
    }

    pub fn set_bus_channel(&mut self, channel: u8) {
        self.bus_channel = channel;
    }

    /// Absolute time in ns since 1970, or the time relative to the start of
    /// the measurement when read back from a file.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, ns: u64) {
        self.timestamp = ns;
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn set_crc(&mut self, crc: u32) {
        self.crc = crc;
    }

    /// True for transmitted frames, false for received ones.
    pub fn dir(&self) -> bool {
        self.dir
    }

    pub fn set_dir(&mut self, transmit: bool) {
        self.dir = transmit;
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn set_remote(&mut self, remote: bool) {
        self.remote = remote;
    }

    /// Bit rate switch (CAN FD).
    pub fn brs(&self) -> bool {
        self.brs
    }

    pub fn set_brs(&mut self, brs: bool) {
        self.brs = brs;
    }

    /// Error state indicator (CAN FD).
    pub fn esi(&self) -> bool {
        self.esi
    }

    pub fn set_esi(&mut self, esi: bool) {
        self.esi = esi;
    }

    /// Extended data length, i.e. a CAN FD frame.
    pub fn edl(&self) -> bool {
        self.edl
    }

    pub fn set_edl(&mut self, edl: bool) {
        self.edl = edl;
    }

    pub fn error_type(&self) -> CanErrorType {
        self.error_type
    }

    pub fn set_error_type(&mut self, error_type: CanErrorType) {
        self.error_type = error_type;
    }
}

impl fmt::Display for CanMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extended_id() {
            write!(f, "{:08X}x", self.can_id())?;
        } else {
            write!(f, "{:03X}", self.can_id())?;
        }
        write!(f, " [{}]", self.dlc)?;
        for byte in &self.data {
            write!(f, " {byte:02X}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "can")]
impl CanMessage {
    /// Copies id, payload and the remote flag of an `embedded_can` frame.
    pub fn from_frame<F: embedded_can::Frame>(frame: &F) -> Self {
        let mut msg = CanMessage::new();
        match frame.id() {
            embedded_can::Id::Standard(id) => msg.message_id = u32::from(id.as_raw()),
            embedded_can::Id::Extended(id) => msg.message_id = id.as_raw() | CAN_EXTENDED_FLAG,
        }
        msg.remote = frame.is_remote_frame();
        if msg.remote {
            msg.dlc = frame.dlc().min(15) as u8;
        } else {
            msg.set_data_bytes(frame.data());
        }
        msg
    }

    /// Builds an `embedded_can` frame; `None` when the id is out of range or
    /// the payload does not fit a classic frame.
    pub fn to_frame<F: embedded_can::Frame>(&self) -> Option<F> {
        let id: embedded_can::Id = if self.extended_id() {
            embedded_can::ExtendedId::new(self.can_id())?.into()
        } else {
            embedded_can::StandardId::new(u16::try_from(self.can_id()).ok()?)?.into()
        };
        if self.remote {
            F::new_remote(id, usize::from(self.dlc))
        } else {
            F::new(id, &self.data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_flag_follows_the_id() {
        let mut msg = CanMessage::new();
        msg.set_message_id(0x123);
        assert!(!msg.extended_id());
        msg.set_message_id(0x1234_5678);
        assert!(msg.extended_id());
        assert_eq!(msg.can_id(), 0x1234_5678);
        msg.set_extended_id(false);
        assert_eq!(msg.message_id(), 0x1234_5678);
    }

    #[test]
    fn payload_sets_dlc() {
        let mut msg = CanMessage::new();
        msg.set_data_bytes(&[0xAA; 12]);
        assert_eq!(msg.dlc(), 9);
        assert!(msg.edl());
        msg.set_dlc(15);
        assert_eq!(msg.dlc_length(), 64);
        assert_eq!(msg.data_length(), 12);
    }

    #[test]
    fn display_is_candump_like() {
        let mut msg = CanMessage::new();
        msg.set_message_id(0x7FF);
        msg.set_data_bytes(&[1, 2]);
        assert_eq!(alloc::format!("{msg}"), "7FF [2] 01 02");
    }
}

//! Enumerations shared by the object model, the reader and the writer.
//!
//! Each enum maps to the numeric code stored in MDF4 blocks; MDF3 codes are
//! translated where the MDF3 reader and writer need them.

/// Functional role of a channel (`cn_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChannelType {
    #[default]
    FixedLength,
    VariableLength,
    Master,
    VirtualMaster,
    Sync,
    MaxLength,
    VirtualData,
    Unknown(u8),
}

impl ChannelType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ChannelType::FixedLength,
            1 => ChannelType::VariableLength,
            2 => ChannelType::Master,
            3 => ChannelType::VirtualMaster,
            4 => ChannelType::Sync,
            5 => ChannelType::MaxLength,
            6 => ChannelType::VirtualData,
            other => ChannelType::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ChannelType::FixedLength => 0,
            ChannelType::VariableLength => 1,
            ChannelType::Master => 2,
            ChannelType::VirtualMaster => 3,
            ChannelType::Sync => 4,
            ChannelType::MaxLength => 5,
            ChannelType::VirtualData => 6,
            ChannelType::Unknown(code) => code,
        }
    }

    pub fn is_master(self) -> bool {
        matches!(self, ChannelType::Master | ChannelType::VirtualMaster)
    }

    /// Virtual channels occupy no bytes in the record.
    pub fn is_virtual(self) -> bool {
        matches!(self, ChannelType::VirtualMaster | ChannelType::VirtualData)
    }
}

/// Synchronisation domain of a master or sync channel (`cn_sync_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SyncType {
    #[default]
    None,
    Time,
    Angle,
    Distance,
    Index,
    Unknown(u8),
}

impl SyncType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SyncType::None,
            1 => SyncType::Time,
            2 => SyncType::Angle,
            3 => SyncType::Distance,
            4 => SyncType::Index,
            other => SyncType::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            SyncType::None => 0,
            SyncType::Time => 1,
            SyncType::Angle => 2,
            SyncType::Distance => 3,
            SyncType::Index => 4,
            SyncType::Unknown(code) => code,
        }
    }
}

/// Kind of source described by a source information block (`si_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceType {
    #[default]
    Other,
    Ecu,
    Bus,
    IoDevice,
    Tool,
    User,
}

impl SourceType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => SourceType::Ecu,
            2 => SourceType::Bus,
            3 => SourceType::IoDevice,
            4 => SourceType::Tool,
            5 => SourceType::User,
            _ => SourceType::Other,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            SourceType::Other => 0,
            SourceType::Ecu => 1,
            SourceType::Bus => 2,
            SourceType::IoDevice => 3,
            SourceType::Tool => 4,
            SourceType::User => 5,
        }
    }
}

/// Bus of a source information block (`si_bus_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceBus {
    #[default]
    None,
    Other,
    Can,
    Lin,
    Most,
    FlexRay,
    Kline,
    Ethernet,
    Usb,
}

impl SourceBus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => SourceBus::Other,
            2 => SourceBus::Can,
            3 => SourceBus::Lin,
            4 => SourceBus::Most,
            5 => SourceBus::FlexRay,
            6 => SourceBus::Kline,
            7 => SourceBus::Ethernet,
            8 => SourceBus::Usb,
            _ => SourceBus::None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            SourceBus::None => 0,
            SourceBus::Other => 1,
            SourceBus::Can => 2,
            SourceBus::Lin => 3,
            SourceBus::Most => 4,
            SourceBus::FlexRay => 5,
            SourceBus::Kline => 6,
            SourceBus::Ethernet => 7,
            SourceBus::Usb => 8,
        }
    }
}

/// Bus selection of a bus logger; values combine into a `u16` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MdfBusType {
    Can,
    Lin,
    FlexRay,
    Most,
    Ethernet,
}

impl MdfBusType {
    pub const ALL: [MdfBusType; 5] = [
        MdfBusType::Can,
        MdfBusType::Lin,
        MdfBusType::FlexRay,
        MdfBusType::Most,
        MdfBusType::Ethernet,
    ];

    pub fn mask(self) -> u16 {
        match self {
            MdfBusType::Can => 0x01,
            MdfBusType::Lin => 0x02,
            MdfBusType::FlexRay => 0x04,
            MdfBusType::Most => 0x08,
            MdfBusType::Ethernet => 0x10,
        }
    }

    /// Prefix used for bus logging group and channel names.
    pub fn prefix(self) -> &'static str {
        match self {
            MdfBusType::Can => "CAN",
            MdfBusType::Lin => "LIN",
            MdfBusType::FlexRay => "FLX",
            MdfBusType::Most => "MOST",
            MdfBusType::Ethernet => "ETH",
        }
    }

    pub fn source_bus(self) -> SourceBus {
        match self {
            MdfBusType::Can => SourceBus::Can,
            MdfBusType::Lin => SourceBus::Lin,
            MdfBusType::FlexRay => SourceBus::FlexRay,
            MdfBusType::Most => SourceBus::Most,
            MdfBusType::Ethernet => SourceBus::Ethernet,
        }
    }

    pub fn from_source_bus(bus: SourceBus) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.source_bus() == bus)
    }

    /// Bus of a bus logging group named `<PREFIX>_...`.
    pub fn from_group_name(name: &str) -> Option<Self> {
        let (prefix, _) = name.split_once('_')?;
        Self::ALL.into_iter().find(|b| b.prefix() == prefix)
    }

    /// The buses enabled in `mask`.
    pub fn from_mask(mask: u16) -> impl Iterator<Item = MdfBusType> {
        Self::ALL.into_iter().filter(move |b| mask & b.mask() != 0)
    }
}

/// Array semantics of a channel array (`ca_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayType {
    #[default]
    Array,
    ScalingAxis,
    LookUp,
    IntervalAxis,
    ClassificationResult,
}

impl ArrayType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ArrayType::ScalingAxis,
            2 => ArrayType::LookUp,
            3 => ArrayType::IntervalAxis,
            4 => ArrayType::ClassificationResult,
            _ => ArrayType::Array,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Where the elements of a channel array are stored (`ca_storage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayStorage {
    #[default]
    CnTemplate,
    CgTemplate,
    DgTemplate,
}

impl ArrayStorage {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ArrayStorage::CgTemplate,
            2 => ArrayStorage::DgTemplate,
            _ => ArrayStorage::CnTemplate,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// `ev_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventType {
    RecordingPeriod,
    RecordingInterrupt,
    AcquisitionInterrupt,
    StartRecording,
    StopRecording,
    Trigger,
    #[default]
    Marker,
}

impl EventType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => EventType::RecordingPeriod,
            1 => EventType::RecordingInterrupt,
            2 => EventType::AcquisitionInterrupt,
            3 => EventType::StartRecording,
            4 => EventType::StopRecording,
            5 => EventType::Trigger,
            _ => EventType::Marker,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// `ev_sync_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventSyncType {
    #[default]
    Seconds,
    Radians,
    Meters,
    Index,
}

impl EventSyncType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            2 => EventSyncType::Radians,
            3 => EventSyncType::Meters,
            4 => EventSyncType::Index,
            _ => EventSyncType::Seconds,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            EventSyncType::Seconds => 1,
            EventSyncType::Radians => 2,
            EventSyncType::Meters => 3,
            EventSyncType::Index => 4,
        }
    }
}

/// `ev_range_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RangeType {
    #[default]
    Point,
    RangeStart,
    RangeEnd,
}

impl RangeType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => RangeType::RangeStart,
            2 => RangeType::RangeEnd,
            _ => RangeType::Point,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// `ev_cause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventCause {
    #[default]
    Other,
    Error,
    Tool,
    Script,
    User,
}

impl EventCause {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => EventCause::Error,
            2 => EventCause::Tool,
            3 => EventCause::Script,
            4 => EventCause::User,
            _ => EventCause::Other,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_codes() {
        for code in 0..=6 {
            assert_eq!(ChannelType::from_u8(code).to_u8(), code);
        }
        assert_eq!(ChannelType::from_u8(9), ChannelType::Unknown(9));
        assert!(ChannelType::VirtualMaster.is_master());
        assert!(!ChannelType::MaxLength.is_virtual());
    }

    #[test]
    fn bus_mask_selection() {
        let buses: Vec<_> = MdfBusType::from_mask(0x01 | 0x10).collect();
        assert_eq!(buses, vec![MdfBusType::Can, MdfBusType::Ethernet]);
        assert_eq!(MdfBusType::from_mask(0).count(), 0);
    }

    #[test]
    fn event_sync_type_starts_at_one() {
        assert_eq!(EventSyncType::Seconds.to_u8(), 1);
        assert_eq!(EventSyncType::from_u8(4), EventSyncType::Index);
    }
}

// Bus logging layout and the CAN sample path.
use alloc::format;
use alloc::string::ToString;

use crate::blocks::DataType;
use crate::blocks::channel_group_block::{CG_FLAG_BUS_EVENT, CG_FLAG_PLAIN_BUS_EVENT};
use crate::can::CanMessage;
use crate::logging::mdf_log;
use crate::model::ChannelGroup;
use crate::types::{ChannelType, MdfBusType, SourceType, SyncType};
use crate::{Error, Result};

use super::{MdfWrite, MdfWriter, StorageType, WriteState};

/// Kind of frame a bus logging group stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Data,
    Remote,
    Error,
    Overload,
}

impl FrameKind {
    fn suffix(self) -> &'static str {
        match self {
            FrameKind::Data => "DataFrame",
            FrameKind::Remote => "RemoteFrame",
            FrameKind::Error => "ErrorFrame",
            FrameKind::Overload => "OverloadFrame",
        }
    }
}

const CAN_FRAMES: [FrameKind; 4] = [
    FrameKind::Data,
    FrameKind::Remote,
    FrameKind::Error,
    FrameKind::Overload,
];

fn add_signal(cg: &mut ChannelGroup, field: &str, data_type: DataType, bits: u32) -> u64 {
    let name = format!("{}.{field}", cg.name());
    let cn = cg.create_channel();
    cn.set_name(&name);
    cn.set_data_type(data_type);
    cn.set_bit_count(bits);
    cn.index()
}

fn add_payload(cg: &mut ChannelGroup, storage: StorageType, max_length: u32) {
    let data_length = add_signal(cg, "DataLength", DataType::UnsignedIntegerLE, 8);
    let name = format!("{}.DataBytes", cg.name());
    let cn = cg.create_channel();
    cn.set_name(&name);
    cn.set_data_type(DataType::ByteArray);
    match storage {
        StorageType::FixedLength => {
            cn.set_channel_type(ChannelType::FixedLength);
            cn.set_bit_count(max_length * 8);
        }
        StorageType::Vlsd => cn.set_channel_type(ChannelType::VariableLength),
        StorageType::Mlsd => {
            cn.set_channel_type(ChannelType::MaxLength);
            cn.set_bit_count(max_length * 8);
            cn.set_length_channel(data_length);
        }
    }
}

fn build_group(cg: &mut ChannelGroup, bus: MdfBusType, kind: Option<FrameKind>, storage: StorageType, max_length: u32) {
    let name = match kind {
        Some(kind) => format!("{}_{}", bus.prefix(), kind.suffix()),
        None => format!("{}_Frame", bus.prefix()),
    };
    cg.set_name(&name);
    cg.set_bus_type(Some(bus));
    cg.set_flags(CG_FLAG_BUS_EVENT | CG_FLAG_PLAIN_BUS_EVENT);
    cg.set_path_separator(u16::from(b'.'));

    let si = cg.create_source_information();
    si.set_name(bus.prefix());
    si.set_path(bus.prefix());
    si.set_source_type(SourceType::Bus);
    si.set_bus(bus.source_bus());

    let time = cg.create_channel();
    time.set_name("t");
    time.set_channel_type(ChannelType::Master);
    time.set_sync_type(SyncType::Time);
    time.set_data_type(DataType::FloatLE);
    time.set_bit_count(64);
    time.set_unit("s");

    add_signal(cg, "BusChannel", DataType::UnsignedIntegerLE, 8);
    if kind == Some(FrameKind::Overload) {
        add_signal(cg, "Dir", DataType::UnsignedIntegerLE, 1);
        return;
    }
    add_signal(cg, "ID", DataType::UnsignedIntegerLE, 32);
    add_signal(cg, "IDE", DataType::UnsignedIntegerLE, 1);
    add_signal(cg, "DLC", DataType::UnsignedIntegerLE, 8);
    if kind == Some(FrameKind::Remote) {
        add_signal(cg, "DataLength", DataType::UnsignedIntegerLE, 8);
    } else {
        add_payload(cg, storage, max_length);
    }
    add_signal(cg, "Dir", DataType::UnsignedIntegerLE, 1);
    if bus == MdfBusType::Can {
        add_signal(cg, "BRS", DataType::UnsignedIntegerLE, 1);
        add_signal(cg, "ESI", DataType::UnsignedIntegerLE, 1);
        add_signal(cg, "EDL", DataType::UnsignedIntegerLE, 1);
    }
    add_signal(cg, "CRC", DataType::UnsignedIntegerLE, 32);
    if kind == Some(FrameKind::Error) {
        add_signal(cg, "ErrorType", DataType::UnsignedIntegerLE, 8);
    }
}

fn stage_can_message(cg: &mut ChannelGroup, msg: &CanMessage) {
    for cn in cg.channels_mut() {
        let Some(field) = cn.name().rsplit_once('.').map(|(_, f)| f.to_string()) else {
            continue;
        };
        match field.as_str() {
            "ID" => cn.set_channel_value(msg.can_id(), true),
            "IDE" => cn.set_channel_value(u8::from(msg.extended_id()), true),
            "DLC" => cn.set_channel_value(msg.dlc(), true),
            "DataLength" => cn.set_channel_value(msg.data_length() as u64, true),
            "DataBytes" => cn.set_channel_value_bytes(msg.data_bytes(), true),
            "BusChannel" => cn.set_channel_value(msg.bus_channel(), true),
            "Dir" => cn.set_channel_value(u8::from(msg.dir()), true),
            "BRS" => cn.set_channel_value(u8::from(msg.brs()), true),
            "ESI" => cn.set_channel_value(u8::from(msg.esi()), true),
            "EDL" => cn.set_channel_value(u8::from(msg.edl()), true),
            "CRC" => cn.set_channel_value(msg.crc(), true),
            "ErrorType" => cn.set_channel_value(msg.error_type().to_u8(), true),
            _ => {}
        }
    }
}

impl<W: MdfWrite> MdfWriter<W> {
    /// Creates the data groups, channel groups and channels for logging the
    /// buses selected with [`MdfWriter::set_bus_type`].
    ///
    /// CAN gets one group per frame kind (`CAN_DataFrame`, `CAN_RemoteFrame`,
    /// `CAN_ErrorFrame`, `CAN_OverloadFrame`); other buses get a single
    /// `<BUS>_Frame` group. Signal channels are named `<group>.<field>`.
    pub fn create_bus_log_configuration(&mut self) -> Result<()> {
        self.expect_state(WriteState::Create, "create_bus_log_configuration")?;
        if self.settings.bus_type == 0 {
            return Err(Error::InvalidState("no bus type selected".into()));
        }
        if !self.file.is_mdf4() {
            return Err(Error::UnsupportedFeature("bus logging needs MDF4".into()));
        }
        let storage = self.settings.storage_type;
        let max_length = self.settings.max_length;
        for bus in MdfBusType::from_mask(self.settings.bus_type) {
            let dg = self.file.create_data_group();
            dg.set_description(&format!("{} bus", bus.prefix()));
            if bus == MdfBusType::Can {
                for kind in CAN_FRAMES {
                    build_group(dg.create_channel_group(), bus, Some(kind), storage, max_length);
                }
            } else {
                build_group(dg.create_channel_group(), bus, None, storage, max_length);
            }
            mdf_log!(
                Debug,
                "MdfWriter::create_bus_log_configuration",
                "{} bus: {} channel groups, payload {storage:?}",
                bus.prefix(),
                dg.channel_groups().len()
            );
        }
        Ok(())
    }

    /// Stores `msg` as one sample of the bus logging group `cg_index` at
    /// `time` (ns since 1970).
    pub fn save_can_message(&mut self, cg_index: u64, time: u64, msg: &CanMessage) -> Result<()> {
        let Some(cg) = self.channel_group_mut(cg_index) else {
            return Err(Error::NotFound(format!("channel group {cg_index}")));
        };
        stage_can_message(cg, msg);
        self.save_sample(cg_index, time)
    }
}

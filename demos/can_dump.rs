//! Writes a short CAN capture and dumps it in candump style.
//!
//! Run with: `cargo run --example can_dump` to log and dump a generated
//! capture, or `cargo run --example can_dump -- capture.mf4` to dump an
//! existing bus log.

use std::path::{Path, PathBuf};

use mdf_rs::{
    CanBusObserver, CanMessage, MdfBusType, MdfReader, MdfWriter, Result, StorageType, WriterType,
};

fn main() -> Result<()> {
    env_logger::init();
    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = std::env::temp_dir().join("can_dump.mf4");
            write_capture(&path)?;
            path
        }
    };
    dump(&path)
}

fn write_capture(path: &Path) -> Result<()> {
    let mut writer = MdfWriter::new(WriterType::BusLogger);
    writer.init(path)?;
    writer.set_bus_type(MdfBusType::Can.mask());
    writer.set_storage_type(StorageType::Mlsd);
    writer.set_max_length(64);
    writer.header_mut().set_author("can_dump");
    writer.header_mut().set_description("generated capture");
    writer.create_bus_log_configuration()?;
    let Some(group) = writer
        .file()
        .data_groups()
        .iter()
        .flat_map(|dg| dg.channel_groups())
        .find(|cg| cg.name() == "CAN_DataFrame")
        .map(|cg| cg.index())
    else {
        return Ok(());
    };

    let start = 1_700_000_000_000_000_000;
    writer.init_measurement()?;
    writer.start_measurement(start)?;
    for i in 0..20u64 {
        let mut msg = CanMessage::new();
        msg.set_message_id(if i % 2 == 0 { 0x100 } else { 0x18FE_F100 });
        msg.set_extended_id(i % 2 == 1);
        msg.set_bus_channel(1);
        let payload: Vec<u8> = (0..8).map(|b| (i as u8).wrapping_mul(16).wrapping_add(b)).collect();
        msg.set_data_bytes(&payload);
        msg.set_dlc(8);
        writer.save_can_message(group, start + i * 10_000_000, &msg)?;
    }
    writer.stop_measurement(start + 200_000_000)?;
    writer.finalize()
}

fn dump(path: &Path) -> Result<()> {
    let mut reader = MdfReader::new(path);
    if !reader.is_ok() {
        eprintln!("{} is not an MDF file", path.display());
        return Ok(());
    }
    reader.read_everything_but_data()?;
    let start = reader.header().map_or(0, |hd| hd.start_time());

    for position in 0..reader.data_group_count() {
        reader.read_data(position)?;
        let Some(dg) = reader.data_group(position) else {
            continue;
        };
        for cg in dg.channel_groups().iter().filter(|cg| cg.is_bus_event()) {
            let Ok(observer) = CanBusObserver::new(dg, cg) else {
                continue;
            };
            for msg in observer.can_messages().into_iter().flatten() {
                println!("{}", candump_line(start, &msg));
            }
        }
    }
    Ok(())
}

/// `(seconds.micros) canN ID#DATA`, extended identifiers in 8 hex digits.
fn candump_line(start: u64, msg: &CanMessage) -> String {
    let ns = start + msg.timestamp();
    let id = if msg.extended_id() {
        format!("{:08X}", msg.can_id())
    } else {
        format!("{:03X}", msg.can_id())
    };
    let data: String = msg.data_bytes().iter().map(|b| format!("{b:02X}")).collect();
    format!(
        "({}.{:06}) can{} {id}#{data}",
        ns / 1_000_000_000,
        ns % 1_000_000_000 / 1_000,
        msg.bus_channel()
    )
}

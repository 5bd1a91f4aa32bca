use mdf_rs::{
    CanBusObserver, CanErrorType, CanMessage, ChannelObserver, MdfBusType, MdfReader, MdfWriter,
    Result, StorageType, WriterType,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn frame_group(writer: &MdfWriter, name: &str) -> u64 {
    writer
        .file()
        .data_groups()
        .iter()
        .flat_map(|dg| dg.channel_groups())
        .find(|cg| cg.name() == name)
        .map(|cg| cg.index())
        .expect("bus logging group")
}

#[test]
fn can_frame_roundtrip() -> Result<()> {
    init_logging();
    let path = std::env::temp_dir().join("mdf_rs_can.mf4");
    let _ = std::fs::remove_file(&path);

    let mut writer = MdfWriter::new(WriterType::BusLogger);
    writer.init(&path)?;
    writer.set_bus_type(MdfBusType::Can.mask());
    writer.set_storage_type(StorageType::FixedLength);
    writer.create_bus_log_configuration()?;
    let data_frames = frame_group(&writer, "CAN_DataFrame");
    let error_frames = frame_group(&writer, "CAN_ErrorFrame");

    writer.init_measurement()?;
    writer.start_measurement(1_000_000_000)?;

    let payload = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    let mut msg = CanMessage::new();
    msg.set_message_id(0x123);
    msg.set_extended_id(false);
    msg.set_dlc(8);
    msg.set_data_bytes(&payload);
    msg.set_bus_channel(1);
    writer.save_can_message(data_frames, 1_000_500_000, &msg)?;

    let mut error = CanMessage::new();
    error.set_message_id(0x1ABC_DEF0);
    error.set_error_type(CanErrorType::FormError);
    writer.save_can_message(error_frames, 1_001_000_000, &error)?;

    writer.stop_measurement(1_002_000_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::new(&path);
    assert!(reader.is_finalized()?);
    reader.read_data(0)?;
    let dg = reader.data_group(0).expect("CAN data group");

    let cg = dg.channel_group_by_name("CAN_DataFrame").expect("data frames");
    assert_eq!(cg.nof_samples(), 1);
    let id = ChannelObserver::new(dg, cg, cg.channel_by_name("CAN_DataFrame.ID").expect("ID"))?;
    assert_eq!(id.eng_value(0), Some(f64::from(0x123)));
    let bytes = ChannelObserver::new(
        dg,
        cg,
        cg.channel_by_name("CAN_DataFrame.DataBytes").expect("DataBytes"),
    )?;
    assert_eq!(bytes.eng_bytes(0).as_deref(), Some(&payload[..]));

    let observer = CanBusObserver::new(dg, cg)?;
    let read = observer.can_message(0).expect("message");
    assert_eq!(read.can_id(), 0x123);
    assert!(!read.extended_id());
    assert_eq!(read.dlc(), 8);
    assert_eq!(read.data_bytes(), &payload);
    assert_eq!(read.bus_channel(), 1);
    // 0.5 ms after the measurement start.
    assert!(read.timestamp().abs_diff(500_000) <= 1, "{}", read.timestamp());

    let cg = dg.channel_group_by_name("CAN_ErrorFrame").expect("error frames");
    let read = CanBusObserver::new(dg, cg)?.can_message(0).expect("error frame");
    assert!(read.extended_id());
    assert_eq!(read.can_id(), 0x1ABC_DEF0);
    assert_eq!(read.error_type(), CanErrorType::FormError);

    let remote = dg.channel_group_by_name("CAN_RemoteFrame").expect("remote frames");
    assert_eq!(remote.nof_samples(), 0);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn mlsd_frames_keep_their_length() -> Result<()> {
    init_logging();
    let mut writer = MdfWriter::in_memory(WriterType::BusLogger);
    writer.set_bus_type(MdfBusType::Can.mask());
    writer.set_storage_type(StorageType::Mlsd);
    writer.set_max_length(64);
    writer.create_bus_log_configuration()?;
    let group = writer.file().data_groups()[0].channel_groups()[0].index();

    writer.init_measurement()?;
    writer.start_measurement(0)?;
    let payloads: Vec<Vec<u8>> = [0usize, 3, 8, 12, 64]
        .iter()
        .map(|&n| (0..n).map(|b| b as u8).collect())
        .collect();
    for (i, payload) in payloads.iter().enumerate() {
        let mut msg = CanMessage::new();
        msg.set_message_id(0x100 + i as u32);
        msg.set_data_bytes(payload);
        writer.save_can_message(group, i as u64 * 1_000, &msg)?;
    }
    writer.stop_measurement(10_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_data(0)?;
    let dg = reader.data_group(0).expect("data group");
    let cg = dg.channel_group_by_name("CAN_DataFrame").expect("data frames");
    let observer = CanBusObserver::new(dg, cg)?;
    assert_eq!(observer.nof_samples(), payloads.len());
    for (i, payload) in payloads.iter().enumerate() {
        let msg = observer.can_message(i).expect("message");
        assert_eq!(msg.data_bytes(), &payload[..], "sample {i}");
        assert_eq!(msg.edl(), payload.len() > 8);
    }
    Ok(())
}

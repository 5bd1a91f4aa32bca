use mdf_rs::{
    ETag, ETagValue, EventCause, EventType, MdfReader, MdfWriter, RangeType, Result, WriterType,
};

#[test]
fn header_attachments_events_and_history_roundtrip() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let content_path = std::env::temp_dir().join("mdf_rs_attachment.txt");
    std::fs::write(&content_path, b"hello")?;
    let content_name = content_path.to_string_lossy().into_owned();

    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    {
        let header = writer.header_mut();
        header.set_author("Ingrid");
        header.set_project("Brake test");
        header.set_description("cold start & warm-up");
        header.set_recorder_index(3);
        header
            .create_metadata()
            .add_property(ETag::new("vehicle", ETagValue::String("V17".into())));

        let fh = header.create_file_history();
        fh.set_tool_name("bench");
        fh.set_tool_vendor("lab");
        fh.set_tool_version("2.1");
        fh.set_user_name("operator");
        fh.set_description("configured");

        let at = header.create_attachment();
        at.set_file_name(&content_name);
        at.set_file_type("text/plain");
        at.set_embedded(true);
        at.set_compressed(true);

        let ev = header.create_event();
        ev.set_name("Trigger");
        ev.set_event_type(EventType::Trigger);
        ev.set_cause(EventCause::User);
        ev.set_pre_trig(0.5);
        ev.set_sync_value(20);
        ev.set_sync_factor(0.1);
    }
    writer.create_data_group()?.create_channel_group();

    writer.init_measurement()?;
    writer.start_measurement(0)?;
    writer.stop_measurement(1_000_000)?;

    let ev = writer.header_mut().create_event();
    ev.set_name("Stop");
    ev.set_event_type(EventType::Marker);
    ev.set_range_type(RangeType::RangeEnd);
    writer.finalize()?;
    std::fs::remove_file(&content_path)?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_everything_but_data()?;
    let header = reader.header().expect("header");
    assert_eq!(header.author(), "Ingrid");
    assert_eq!(header.project(), "Brake test");
    assert_eq!(header.description(), "cold start & warm-up");
    assert_eq!(header.recorder_index(), 3);
    let md = header.metadata().expect("header properties");
    assert_eq!(md.property_as_string("vehicle").as_deref(), Some("V17"));

    let fh = header
        .file_histories()
        .iter()
        .find(|fh| fh.tool_name() == "bench")
        .expect("caller history");
    assert_eq!(fh.tool_vendor(), "lab");
    assert_eq!(fh.tool_version(), "2.1");
    assert_eq!(fh.user_name(), "operator");
    assert_eq!(fh.description(), "configured");
    assert!(header.file_histories().iter().any(|fh| fh.tool_name() == "mdf-rs"));

    let at = &header.attachments()[0];
    assert!(at.is_embedded());
    assert!(at.is_compressed());
    assert_eq!(at.file_type(), "text/plain");
    assert_eq!(at.embedded_data(), b"hello");
    assert_eq!(at.md5().as_deref(), Some("5d41402abc4b2a76b9719d911017c592"));

    let events = header.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name(), "Trigger");
    assert_eq!(events[0].event_type(), EventType::Trigger);
    assert_eq!(events[0].cause(), EventCause::User);
    assert_eq!(events[0].pre_trig(), 0.5);
    assert_eq!(events[0].sync_value(), 20);
    assert_eq!(events[1].name(), "Stop");
    assert_eq!(events[1].range_type(), RangeType::RangeEnd);
    Ok(())
}

#[test]
fn missing_file_is_not_ok() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut reader = MdfReader::new(std::env::temp_dir().join("mdf_rs_does_not_exist.mf4"));
    assert!(!reader.is_ok());
    assert!(reader.read_everything_but_data().is_err());
    assert!(reader.data_group(0).is_none());
}

#[test]
fn closed_reader_refuses_reads_until_reopened() -> Result<()> {
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    writer.create_data_group()?.create_channel_group();
    writer.init_measurement()?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_measurement_info()?;
    assert_eq!(reader.data_group_count(), 1);
    reader.close();
    assert!(!reader.is_open());
    assert!(matches!(reader.read_header(), Err(mdf_rs::Error::ReaderClosed)));
    reader.open()?;
    reader.read_header()?;
    Ok(())
}

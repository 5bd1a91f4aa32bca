use std::path::PathBuf;

use mdf_rs::{
    ChannelObserver, ChannelType, DataType, FlushPolicy, MdfReader, MdfWriter, Result,
    StorageType, SyncType, WriteState, WriterType,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn temp_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    let _ = std::fs::remove_file(&path);
    path
}

/// Adds a master time channel plus an unsigned 16 bit "Signal" channel and
/// returns the channel group index.
fn add_signal_group(writer: &mut MdfWriter) -> Result<u64> {
    let dg = writer.create_data_group()?;
    let cg = dg.create_channel_group();
    cg.set_name("Signals");
    let master = cg.create_channel();
    master.set_name("Master");
    master.set_channel_type(ChannelType::Master);
    master.set_sync_type(SyncType::Time);
    master.set_data_type(DataType::FloatLE);
    master.set_bit_count(64);
    master.set_unit("s");
    let signal = cg.create_channel();
    signal.set_name("Signal");
    signal.set_data_type(DataType::UnsignedIntegerLE);
    signal.set_bit_count(16);
    Ok(cg.index())
}

fn save_ramp(writer: &mut MdfWriter, group: u64, count: u16) -> Result<()> {
    for i in 0..count {
        if let Some(cn) = writer
            .channel_group_mut(group)
            .and_then(|cg| cg.channel_by_name_mut("Signal"))
        {
            cn.set_channel_value(i, true);
        }
        writer.save_sample(group, u64::from(i) * 10_000_000)?;
    }
    Ok(())
}

fn observer_values(reader: &MdfReader, name: &str) -> Result<Vec<Option<f64>>> {
    let dg = reader.data_group(0).expect("data group 0");
    let cg = &dg.channel_groups()[0];
    let cn = cg.channel_by_name(name).expect("channel");
    Ok(ChannelObserver::new(dg, cg, cn)?.eng_values())
}

#[test]
fn mdf4_master_and_signal_roundtrip() -> Result<()> {
    init_logging();
    let path = temp_file("mdf_rs_basic.mf4");

    let mut writer = MdfWriter::new(WriterType::Mdf4Basic);
    assert!(writer.init(&path)?);
    writer.header_mut().set_author("Test Author");
    let group = add_signal_group(&mut writer)?;
    writer.init_measurement()?;
    writer.start_measurement(0)?;
    save_ramp(&mut writer, group, 10)?;
    writer.stop_measurement(100_000_000)?;
    writer.finalize()?;
    assert_eq!(writer.state(), WriteState::Finalize);

    let mut reader = MdfReader::new(&path);
    assert!(reader.is_ok());
    assert!(reader.is_finalized()?);
    reader.read_everything_but_data()?;
    assert_eq!(reader.header().map(|h| h.author().to_string()).as_deref(), Some("Test Author"));
    reader.read_data(0)?;

    let dg = reader.data_group(0).expect("data group 0");
    let cg = &dg.channel_groups()[0];
    assert_eq!(cg.nof_samples(), 10);
    let signal = ChannelObserver::new(dg, cg, cg.channel_by_name("Signal").expect("Signal"))?;
    assert_eq!(signal.nof_samples(), 10);
    assert!(signal.valid_list().iter().all(|v| *v));
    let expected: Vec<Option<f64>> = (0..10).map(|i| Some(f64::from(i))).collect();
    assert_eq!(signal.eng_values(), expected);

    let master = observer_values(&reader, "Master")?;
    for (i, value) in master.iter().enumerate() {
        let value = value.expect("master value");
        assert!((value - i as f64 * 0.01).abs() < 1e-9, "sample {i}: {value}");
    }

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn file_reads_unfinalized_until_finalize() -> Result<()> {
    init_logging();
    let path = temp_file("mdf_rs_unfinalized.mf4");

    let mut writer = MdfWriter::new(WriterType::Mdf4Basic);
    writer.init(&path)?;
    writer.set_flush_policy(FlushPolicy::Manual);
    let group = add_signal_group(&mut writer)?;
    writer.init_measurement()?;
    writer.start_measurement(0)?;
    save_ramp(&mut writer, group, 5)?;
    writer.flush()?;

    // Everything flushed so far is readable while the measurement runs.
    let mut reader = MdfReader::new(&path);
    assert!(!reader.is_finalized()?);
    reader.read_data(0)?;
    assert_eq!(observer_values(&reader, "Signal")?.len(), 5);

    writer.stop_measurement(50_000_000)?;
    assert!(!MdfReader::new(&path).is_finalized()?);
    writer.finalize()?;
    assert!(MdfReader::new(&path).is_finalized()?);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn object_indices_strictly_increase() -> Result<()> {
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    let mut indices = vec![writer.file().header().index()];
    for _ in 0..2 {
        let dg = writer.create_data_group()?;
        indices.push(dg.index());
        let cg = dg.create_channel_group();
        indices.push(cg.index());
        for _ in 0..3 {
            indices.push(cg.create_channel().index());
        }
    }
    assert!(indices.windows(2).all(|w| w[0] < w[1]), "{indices:?}");
    Ok(())
}

#[test]
fn clear_data_drops_loaded_samples() -> Result<()> {
    init_logging();
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    let group = add_signal_group_in_memory(&mut writer)?;
    writer.init_measurement()?;
    writer.start_measurement(0)?;
    for i in 0..4u16 {
        stage(&mut writer, group, i);
        writer.save_sample(group, u64::from(i))?;
    }
    writer.stop_measurement(10)?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_data(0)?;
    let dg = reader.data_group_mut(0).expect("data group 0");
    assert!(dg.is_read());
    assert_eq!(dg.channel_groups()[0].nof_loaded_samples(), 4);
    dg.clear_data();
    assert!(!dg.is_read());
    assert_eq!(dg.channel_groups()[0].nof_loaded_samples(), 0);
    assert_eq!(dg.channel_groups()[0].nof_samples(), 4);

    reader.read_data(0)?;
    assert_eq!(observer_values(&reader, "Signal")?.len(), 4);
    Ok(())
}

fn add_signal_group_in_memory(writer: &mut MdfWriter<mdf_rs::VecWriter>) -> Result<u64> {
    let cg = writer.create_data_group()?.create_channel_group();
    let master = cg.create_channel();
    master.set_name("Master");
    master.set_channel_type(ChannelType::Master);
    master.set_sync_type(SyncType::Time);
    master.set_data_type(DataType::FloatLE);
    let signal = cg.create_channel();
    signal.set_name("Signal");
    signal.set_data_type(DataType::UnsignedIntegerLE);
    signal.set_bit_count(16);
    Ok(cg.index())
}

fn stage(writer: &mut MdfWriter<mdf_rs::VecWriter>, group: u64, value: u16) {
    if let Some(cn) = writer
        .channel_group_mut(group)
        .and_then(|cg| cg.channel_by_name_mut("Signal"))
    {
        cn.set_channel_value(value, true);
    }
}

#[test]
fn byte_payloads_under_every_storage_type() -> Result<()> {
    init_logging();
    for storage in [StorageType::FixedLength, StorageType::Vlsd, StorageType::Mlsd] {
        let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
        writer.set_storage_type(storage);
        writer.set_max_length(16);
        let cg = writer.create_data_group()?.create_channel_group();
        cg.set_name("Payloads");
        let master = cg.create_channel();
        master.set_name("t");
        master.set_channel_type(ChannelType::Master);
        master.set_sync_type(SyncType::Time);
        master.set_data_type(DataType::FloatLE);
        let length = cg.create_channel();
        length.set_name("Length");
        length.set_data_type(DataType::UnsignedIntegerLE);
        length.set_bit_count(8);
        let length_index = length.index();
        let payload = cg.create_channel();
        payload.set_name("Payload");
        payload.set_data_type(DataType::ByteArray);
        match storage {
            StorageType::FixedLength => payload.set_bit_count(16 * 8),
            StorageType::Vlsd => payload.set_channel_type(ChannelType::VariableLength),
            StorageType::Mlsd => {
                payload.set_channel_type(ChannelType::MaxLength);
                payload.set_length_channel(length_index);
            }
        }
        let group = cg.index();

        writer.init_measurement()?;
        writer.start_measurement(0)?;
        let samples: Vec<Vec<u8>> = (1..=12u8).map(|n| (0..n).collect()).collect();
        for (i, bytes) in samples.iter().enumerate() {
            let cg = writer.channel_group_mut(group).expect("group");
            if let Some(cn) = cg.channel_by_name_mut("Length") {
                cn.set_channel_value(bytes.len() as u8, true);
            }
            if let Some(cn) = cg.channel_by_name_mut("Payload") {
                cn.set_channel_value_bytes(bytes, true);
            }
            writer.save_sample(group, i as u64 * 1_000)?;
        }
        writer.stop_measurement(1_000_000)?;
        writer.finalize()?;

        let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
        reader.read_data(0)?;
        let dg = reader.data_group(0).expect("data group 0");
        let cg = dg.channel_group_by_name("Payloads").expect("group");
        assert_eq!(cg.nof_samples(), 12, "{storage:?}");
        let observer = ChannelObserver::new(dg, cg, cg.channel_by_name("Payload").expect("Payload"))?;
        for (i, bytes) in samples.iter().enumerate() {
            let read = observer.eng_bytes(i).expect("payload");
            match storage {
                // Fixed slots are padded to their full width.
                StorageType::FixedLength => assert_eq!(&read[..bytes.len()], &bytes[..]),
                _ => assert_eq!(&read, bytes, "{storage:?} sample {i}"),
            }
        }
    }
    Ok(())
}

#[test]
fn compressed_file_reads_back() -> Result<()> {
    init_logging();
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    writer.set_compress_data(true);
    writer.set_flush_policy(FlushPolicy::EveryNRecords(100));
    let group = add_signal_group_in_memory(&mut writer)?;
    writer.init_measurement()?;
    writer.start_measurement(0)?;
    for i in 0..250u16 {
        stage(&mut writer, group, i);
        writer.save_sample(group, u64::from(i) * 1_000_000)?;
    }
    writer.stop_measurement(1_000_000_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_data(0)?;
    let values = observer_values(&reader, "Signal")?;
    assert_eq!(values.len(), 250);
    assert_eq!(values[249], Some(249.0));
    Ok(())
}

#[test]
fn pre_trigger_samples_precede_the_start() -> Result<()> {
    init_logging();
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    writer.set_pre_trig_time(0.5);
    let group = add_signal_group_in_memory(&mut writer)?;
    writer.init_measurement()?;
    for i in 0..10u16 {
        stage(&mut writer, group, i);
        writer.save_sample(group, u64::from(i) * 100_000_000)?;
    }
    writer.start_measurement(1_000_000_000)?;
    stage(&mut writer, group, 10);
    writer.save_sample(group, 1_000_000_000)?;
    writer.stop_measurement(1_100_000_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_data(0)?;
    // 0.5 s before the start keeps the samples from 0.5 s to 0.9 s.
    let signal = observer_values(&reader, "Signal")?;
    assert_eq!(signal, vec![Some(5.0), Some(6.0), Some(7.0), Some(8.0), Some(9.0), Some(10.0)]);
    let master = observer_values(&reader, "Master")?;
    let first = master[0].expect("master");
    assert!((first + 0.5).abs() < 1e-9);
    assert_eq!(master[5], Some(0.0));
    Ok(())
}

#[test]
fn append_adds_data_groups_behind_existing_ones() -> Result<()> {
    init_logging();
    let path = temp_file("mdf_rs_append.mf4");

    let mut first = MdfWriter::new(WriterType::Mdf4Basic);
    assert!(first.init(&path)?);
    let group = add_signal_group(&mut first)?;
    first.init_measurement()?;
    first.start_measurement(0)?;
    save_ramp(&mut first, group, 3)?;
    first.stop_measurement(30_000_000)?;
    first.finalize()?;

    let mut second = MdfWriter::new(WriterType::Mdf4Basic);
    assert!(!second.init(&path)?);
    assert!(!second.is_file_new());
    assert_eq!(second.file().data_groups().len(), 1);
    let group = add_signal_group(&mut second)?;
    second.init_measurement()?;
    second.start_measurement(0)?;
    save_ramp(&mut second, group, 7)?;
    second.stop_measurement(70_000_000)?;
    second.finalize()?;

    let mut reader = MdfReader::new(&path);
    assert!(reader.is_finalized()?);
    reader.read_everything_but_data()?;
    assert_eq!(reader.data_group_count(), 2);
    assert!(reader.header().expect("header").file_histories().len() >= 2);
    reader.read_data(0)?;
    reader.read_data(1)?;
    let counts: Vec<u64> = (0..2)
        .map(|p| reader.data_group(p).expect("dg").channel_groups()[0].nof_samples())
        .collect();
    assert_eq!(counts, [3, 7]);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn mdf3_basic_roundtrip() -> Result<()> {
    init_logging();
    let path = temp_file("mdf_rs_basic.mdf");

    let mut writer = MdfWriter::new(WriterType::Mdf3Basic);
    writer.init(&path)?;
    writer.header_mut().set_project("Bench");
    let group = add_signal_group(&mut writer)?;
    writer.init_measurement()?;
    writer.start_measurement(0)?;
    save_ramp(&mut writer, group, 10)?;
    writer.stop_measurement(100_000_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::new(&path);
    reader.read_data(0)?;
    let file = reader.file().expect("file");
    assert!(!file.is_mdf4());
    assert!(file.is_finalized());
    assert_eq!(file.header().project(), "Bench");
    let expected: Vec<Option<f64>> = (0..10).map(|i| Some(f64::from(i))).collect();
    assert_eq!(observer_values(&reader, "Signal")?, expected);

    std::fs::remove_file(path)?;
    Ok(())
}

#[test]
fn vlsd_values_stay_with_their_samples() -> Result<()> {
    init_logging();
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    let cg = writer.create_data_group()?.create_channel_group();
    cg.set_name("Notes");
    let master = cg.create_channel();
    master.set_name("t");
    master.set_channel_type(ChannelType::Master);
    master.set_sync_type(SyncType::Time);
    master.set_data_type(DataType::FloatLE);
    let text = cg.create_channel();
    text.set_name("Text");
    text.set_channel_type(ChannelType::VariableLength);
    text.set_data_type(DataType::StringUtf8);
    let group = cg.index();

    writer.init_measurement()?;
    writer.start_measurement(0)?;
    for (i, note) in [None, None, Some("second"), Some("third")].into_iter().enumerate() {
        if let Some(note) = note
            && let Some(cn) = writer
                .channel_group_mut(group)
                .and_then(|cg| cg.channel_by_name_mut("Text"))
        {
            cn.set_channel_value(note, true);
        }
        writer.save_sample(group, i as u64 * 1_000)?;
    }
    writer.stop_measurement(10_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_data(0)?;
    let dg = reader.data_group(0).expect("data group");
    let cg = dg.channel_group_by_name("Notes").expect("group");
    assert_eq!(cg.nof_samples(), 4);
    let observer = ChannelObserver::new(dg, cg, cg.channel_by_name("Text").expect("Text"))?;
    let texts: Vec<Option<String>> = (0..4).map(|s| observer.eng_text(s)).collect();
    assert_eq!(
        texts,
        [None, None, Some("second".to_string()), Some("third".to_string())]
    );
    Ok(())
}

#[test]
fn oversized_max_length_payload_is_rejected() -> Result<()> {
    init_logging();
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    writer.set_max_length(4);
    let cg = writer.create_data_group()?.create_channel_group();
    let payload = cg.create_channel();
    payload.set_name("Payload");
    payload.set_data_type(DataType::ByteArray);
    payload.set_channel_type(ChannelType::MaxLength);
    let group = cg.index();

    writer.init_measurement()?;
    let cg = writer.channel_group_mut(group).expect("group");
    assert_eq!(cg.channel_by_name("Payload").expect("Payload").data_bytes(), 4);
    writer.start_measurement(0)?;

    let stage = |writer: &mut MdfWriter<mdf_rs::VecWriter>, bytes: &[u8]| {
        if let Some(cn) = writer
            .channel_group_mut(group)
            .and_then(|cg| cg.channel_by_name_mut("Payload"))
        {
            cn.set_channel_value_bytes(bytes, true);
        }
    };
    stage(&mut writer, &[1, 2, 3, 4]);
    writer.save_sample(group, 0)?;
    stage(&mut writer, &[1, 2, 3, 4, 5]);
    assert!(matches!(
        writer.save_sample(group, 1_000),
        Err(mdf_rs::Error::CodecError(_))
    ));
    Ok(())
}

use mdf_rs::{
    ChannelConversion, ChannelObserver, ChannelType, ConversionType, DataType, DecodedValue,
    MdfReader, MdfWriter, Result, SyncType, VecWriter, WriterType,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn linear_conversion() -> Result<()> {
    let mut cc = ChannelConversion::default();
    cc.set_conversion_type(ConversionType::Linear);
    cc.set_parameter(0, 1.5);
    cc.set_parameter(1, 2.0);
    let eng = cc.convert(&DecodedValue::UnsignedInteger(10))?;
    assert_eq!(eng.as_f64(), Some(21.5));
    Ok(())
}

#[test]
fn interpolated_table_conversion() -> Result<()> {
    let mut cc = ChannelConversion::default();
    cc.set_conversion_type(ConversionType::ValueToValueInterpolation);
    for (i, p) in [0.0, 0.0, 10.0, 100.0, 20.0, 50.0].into_iter().enumerate() {
        cc.set_parameter(i, p);
    }
    let at = |x: f64| cc.convert_to_f64(&DecodedValue::Float(x));
    assert_eq!(at(5.0)?, Some(50.0));
    assert_eq!(at(15.0)?, Some(75.0));
    // Outside the table the edge values hold.
    assert_eq!(at(-3.0)?, Some(0.0));
    assert_eq!(at(99.0)?, Some(50.0));
    Ok(())
}

#[test]
fn range_conversions() -> Result<()> {
    let mut numeric = ChannelConversion::default();
    numeric.set_conversion_type(ConversionType::ValueRangeToValue);
    for (i, p) in [0.0, 9.0, 1.0, 10.0, 19.0, 2.0, -1.0].into_iter().enumerate() {
        numeric.set_parameter(i, p);
    }
    assert_eq!(numeric.convert_to_f64(&DecodedValue::SignedInteger(12))?, Some(2.0));
    assert_eq!(numeric.convert_to_f64(&DecodedValue::SignedInteger(40))?, Some(-1.0));

    let mut text = ChannelConversion::default();
    text.set_conversion_type(ConversionType::ValueRangeToText);
    for (i, p) in [0.0, 49.0, 50.0, 100.0].into_iter().enumerate() {
        text.set_parameter(i, p);
    }
    text.set_text_reference(0, "low");
    text.set_text_reference(1, "high");
    text.set_text_reference(2, "out of range");
    let eng = |x: u64| text.convert(&DecodedValue::UnsignedInteger(x));
    assert_eq!(eng(10)?.as_text(), Some("low"));
    assert_eq!(eng(75)?.as_text(), Some("high"));
    assert_eq!(eng(500)?.as_text(), Some("out of range"));
    Ok(())
}

fn stage(writer: &mut MdfWriter<VecWriter>, group: u64, name: &str, value: u8) {
    if let Some(cn) = writer
        .channel_group_mut(group)
        .and_then(|cg| cg.channel_by_name_mut(name))
    {
        cn.set_channel_value(value, true);
    }
}

#[test]
fn conversions_survive_a_file_roundtrip() -> Result<()> {
    init_logging();
    for writer_type in [WriterType::Mdf4Basic, WriterType::Mdf3Basic] {
        let mut writer = MdfWriter::in_memory(writer_type);
        let cg = writer.create_data_group()?.create_channel_group();
        let master = cg.create_channel();
        master.set_name("t");
        master.set_channel_type(ChannelType::Master);
        master.set_sync_type(SyncType::Time);
        master.set_data_type(DataType::FloatLE);

        let scaled = cg.create_channel();
        scaled.set_name("Scaled");
        scaled.set_data_type(DataType::UnsignedIntegerLE);
        scaled.set_bit_count(8);
        scaled.set_unit("degC");
        let cc = scaled.create_conversion();
        cc.set_conversion_type(ConversionType::Linear);
        cc.set_parameter(0, -40.0);
        cc.set_parameter(1, 0.5);

        let state = cg.create_channel();
        state.set_name("State");
        state.set_data_type(DataType::UnsignedIntegerLE);
        state.set_bit_count(8);
        let cc = state.create_conversion();
        cc.set_conversion_type(ConversionType::ValueRangeToText);
        cc.set_parameter(0, 0.0);
        cc.set_parameter(1, 0.0);
        cc.set_parameter(2, 1.0);
        cc.set_parameter(3, 5.0);
        cc.set_text_reference(0, "Off");
        cc.set_text_reference(1, "On");
        cc.set_text_reference(2, "Fault");
        let group = cg.index();

        writer.init_measurement()?;
        writer.start_measurement(0)?;
        for (i, (raw, state)) in [(80u8, 0u8), (100, 3), (120, 9)].into_iter().enumerate() {
            stage(&mut writer, group, "Scaled", raw);
            stage(&mut writer, group, "State", state);
            writer.save_sample(group, i as u64 * 1_000_000)?;
        }
        writer.stop_measurement(10_000_000)?;
        writer.finalize()?;

        let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
        reader.read_data(0)?;
        let dg = reader.data_group(0).expect("data group");
        let cg = &dg.channel_groups()[0];

        let scaled = cg.channel_by_name("Scaled").expect("Scaled");
        assert_eq!(scaled.unit(), "degC", "{writer_type:?}");
        let observer = ChannelObserver::new(dg, cg, scaled)?;
        assert_eq!(observer.eng_values(), vec![Some(0.0), Some(10.0), Some(20.0)], "{writer_type:?}");
        assert_eq!(observer.channel_values(), vec![Some(80.0), Some(100.0), Some(120.0)]);

        let observer = ChannelObserver::new(dg, cg, cg.channel_by_name("State").expect("State"))?;
        let texts: Vec<Option<String>> = (0..3).map(|s| observer.eng_text(s)).collect();
        assert_eq!(
            texts,
            [Some("Off".to_string()), Some("On".to_string()), Some("Fault".to_string())],
            "{writer_type:?}"
        );
    }
    Ok(())
}

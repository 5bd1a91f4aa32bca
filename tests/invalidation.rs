use mdf_rs::blocks::channel_block::{CN_FLAG_ALL_INVALID, CN_FLAG_INVAL_BIT_VALID};
use mdf_rs::codec::check_value_validity;
use mdf_rs::{ChannelObserver, ChannelType, DataType, MdfReader, MdfWriter, Result, SyncType, WriterType};

#[test]
fn all_invalid_flag_wins_over_bits() {
    let record = [0x00, 0x00, 0x00];
    assert!(!check_value_validity(&record, 2, CN_FLAG_ALL_INVALID, 0));
    assert!(!check_value_validity(
        &record,
        2,
        CN_FLAG_ALL_INVALID | CN_FLAG_INVAL_BIT_VALID,
        0
    ));
}

#[test]
fn channels_without_invalidation_bit_are_valid() {
    let record = [0x00, 0x00, 0xFF];
    assert!(check_value_validity(&record, 2, 0, 0));
}

#[test]
fn bit_position_selects_byte_and_bit() {
    // Two data bytes, then invalidation bytes 0b0010_0001 and 0b0000_0010.
    let record = [0x12, 0x34, 0x21, 0x02];
    assert!(!check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 0));
    assert!(check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 1));
    assert!(!check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 5));
    assert!(check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 8));
    assert!(!check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 9));
}

#[test]
fn missing_invalidation_bytes_read_as_valid() {
    let record = [0x12, 0x34];
    assert!(check_value_validity(&record, 2, CN_FLAG_INVAL_BIT_VALID, 0));
}

#[test]
fn invalid_samples_roundtrip() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    let cg = writer.create_data_group()?.create_channel_group();
    let t = cg.create_channel();
    t.set_name("t");
    t.set_channel_type(ChannelType::Master);
    t.set_sync_type(SyncType::Time);
    t.set_data_type(DataType::FloatLE);
    for name in ["A", "B"] {
        let cn = cg.create_channel();
        cn.set_name(name);
        cn.set_data_type(DataType::SignedIntegerLE);
        cn.set_bit_count(16);
        cn.set_flags(CN_FLAG_INVAL_BIT_VALID);
    }
    let group = cg.index();

    writer.init_measurement()?;
    writer.start_measurement(0)?;
    for i in 0..6i16 {
        let cg = writer.channel_group_mut(group).expect("group");
        if let Some(cn) = cg.channel_by_name_mut("A") {
            cn.set_channel_value(i, i % 2 == 0);
        }
        if let Some(cn) = cg.channel_by_name_mut("B") {
            cn.set_channel_value(-i, i < 3);
        }
        writer.save_sample(group, i as u64 * 1_000)?;
    }
    writer.stop_measurement(6_000)?;
    writer.finalize()?;

    let mut reader = MdfReader::from_bytes(writer.into_inner().expect("sink").into_inner());
    reader.read_data(0)?;
    let dg = reader.data_group(0).expect("data group");
    let cg = &dg.channel_groups()[0];
    assert_eq!(cg.invalidation_bytes(), 1);

    let a = ChannelObserver::new(dg, cg, cg.channel_by_name("A").expect("A"))?;
    assert_eq!(a.valid_list(), &[true, false, true, false, true, false]);
    assert_eq!(a.eng_value(2), Some(2.0));
    assert_eq!(a.eng_value(1), None);

    let b = ChannelObserver::new(dg, cg, cg.channel_by_name("B").expect("B"))?;
    assert_eq!(b.valid_list(), &[true, true, true, false, false, false]);
    assert_eq!(b.eng_value(2), Some(-2.0));
    Ok(())
}

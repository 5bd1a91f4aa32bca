//! Record codec and writer throughput.
//!
//! Run with: cargo bench --bench codec_benchmark

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mdf_rs::codec::{ChannelLayout, decode_channel_value, encode_channel_value};
use mdf_rs::{ChannelType, DataType, DecodedValue, FlushPolicy, MdfWriter, SyncType, WriterType};

const RECORDS: usize = 10_000;

fn layouts() -> Vec<(&'static str, ChannelLayout, DecodedValue)> {
    vec![
        ("u8", ChannelLayout::new(DataType::UnsignedIntegerLE, 0, 0, 8), DecodedValue::UnsignedInteger(200)),
        ("u12_bit3", ChannelLayout::new(DataType::UnsignedIntegerLE, 1, 3, 12), DecodedValue::UnsignedInteger(0xABC)),
        ("i32_be", ChannelLayout::new(DataType::SignedIntegerBE, 4, 0, 32), DecodedValue::SignedInteger(-123_456)),
        ("f64", ChannelLayout::new(DataType::FloatLE, 8, 0, 64), DecodedValue::Float(3.25)),
        ("bytes8", ChannelLayout::new(DataType::ByteArray, 16, 0, 64), DecodedValue::ByteArray(vec![1, 2, 3, 4, 5, 6, 7, 8])),
    ]
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(RECORDS as u64));
    for (name, layout, value) in layouts() {
        let mut record = vec![0u8; 24];
        group.bench_with_input(BenchmarkId::new("encode", name), &layout, |b, layout| {
            b.iter(|| {
                for _ in 0..RECORDS {
                    encode_channel_value(black_box(&mut record), layout, black_box(&value)).ok();
                }
            })
        });

        let mut record = vec![0u8; 24];
        encode_channel_value(&mut record, &layout, &value).ok();
        group.bench_with_input(BenchmarkId::new("decode", name), &layout, |b, layout| {
            b.iter(|| {
                for _ in 0..RECORDS {
                    black_box(decode_channel_value(black_box(&record), layout));
                }
            })
        });
    }
    group.finish();
}

fn write_ramp(compress: bool) -> mdf_rs::Result<usize> {
    let mut writer = MdfWriter::in_memory(WriterType::Mdf4Basic);
    writer.set_compress_data(compress);
    writer.set_flush_policy(FlushPolicy::EveryNRecords(1_000));
    let cg = writer.create_data_group()?.create_channel_group();
    let t = cg.create_channel();
    t.set_name("t");
    t.set_channel_type(ChannelType::Master);
    t.set_sync_type(SyncType::Time);
    t.set_data_type(DataType::FloatLE);
    let v = cg.create_channel();
    v.set_name("v");
    v.set_data_type(DataType::UnsignedIntegerLE);
    v.set_bit_count(32);
    let group = cg.index();

    writer.init_measurement()?;
    writer.start_measurement(0)?;
    for i in 0..RECORDS as u32 {
        if let Some(cn) = writer.channel_group_mut(group).and_then(|cg| cg.channel_by_name_mut("v")) {
            cn.set_channel_value(i, true);
        }
        writer.save_sample(group, u64::from(i) * 1_000)?;
    }
    writer.stop_measurement(RECORDS as u64 * 1_000)?;
    writer.finalize()?;
    Ok(writer.into_inner().map_or(0, |w| w.len()))
}

fn bench_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer");
    group.throughput(Throughput::Elements(RECORDS as u64));
    for (name, compress) in [("dt", false), ("dz", true)] {
        group.bench_function(BenchmarkId::new("save_sample", name), |b| {
            b.iter(|| black_box(write_ramp(compress).ok()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_codec, bench_writer);
criterion_main!(benches);

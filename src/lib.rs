#![forbid(unsafe_code)]

//! # mdf-rs
//!
//! A Rust library for reading and writing ASAM MDF (Measurement Data Format)
//! files, versions 3.x and 4.x.
//!
//! MDF stores time series recorded by measurement and calibration tools,
//! data loggers and bus analysers: sampled signals, raw bus frames and the
//! information needed to turn raw values into engineering values.
//!
//! ## Features
//!
//! - **Reading**: [`MdfReader`] parses MDF3 and MDF4 files level by level
//!   (header, structure, everything but data, samples of one data group)
//! - **Observing**: [`ChannelObserver`] and [`CanBusObserver`] give per-sample
//!   raw, engineering and text values, and CAN frames
//! - **Writing**: [`MdfWriter`] runs a measurement through the states
//!   Create, Init, StartMeas, StopMeas and Finalize, with pre-trigger
//!   buffering, compression and periodic flushing
//! - **Bus logging**: ready-made CAN, LIN, FlexRay, MOST and Ethernet layouts
//! - **Conversions**: linear, rational, algebraic, tables, ranges, text maps,
//!   bitfields, polynomial, exponential and logarithmic
//!
//! ## Quick Start
//!
//! ### Reading an MDF file
//!
//! ```no_run
//! use mdf_rs::{MdfReader, ChannelObserver, Result};
//!
//! fn main() -> Result<()> {
//!     let mut reader = MdfReader::new("recording.mf4");
//!     reader.read_everything_but_data()?;
//!     for position in 0..reader.data_group_count() {
//!         reader.read_data(position)?;
//!         let Some(dg) = reader.data_group(position) else { continue };
//!         for cg in dg.channel_groups() {
//!             for cn in cg.channels() {
//!                 let observer = ChannelObserver::new(dg, cg, cn)?;
//!                 let valid = observer.valid_list().iter().filter(|v| **v).count();
//!                 println!("{}: {valid} valid samples", observer.name());
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Logging CAN frames
//!
//! ```no_run
//! use mdf_rs::{CanMessage, MdfBusType, MdfWriter, Result, WriterType};
//!
//! fn main() -> Result<()> {
//!     let mut writer = MdfWriter::new(WriterType::BusLogger);
//!     writer.init("bus.mf4")?;
//!     writer.set_bus_type(MdfBusType::Can.mask());
//!     writer.create_bus_log_configuration()?;
//!     let frames = writer.file().data_groups()[0].channel_groups()[0].index();
//!
//!     writer.init_measurement()?;
//!     writer.start_measurement(0)?;
//!     let mut msg = CanMessage::new();
//!     msg.set_message_id(0x123);
//!     msg.set_data_bytes(&[1, 2, 3, 4, 5, 6, 7, 8]);
//!     writer.save_can_message(frames, 1_000_000, &msg)?;
//!     writer.stop_measurement(2_000_000)?;
//!     writer.finalize()
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`blocks`] | MDF4 block structures (for advanced use) |
//! | [`mdf3`] | MDF3 block structures |
//! | [`model`] | In-memory object model shared by reader and writer |
//! | [`codec`] | Raw record value encoding and decoding |
//! | [`conversion`] | Raw to engineering value conversions |
//! | [`reader`] | [`MdfReader`] and the observers |
//! | [`writer`] | [`MdfWriter`] and its byte sinks |
//! | [`can`] | [`CanMessage`] and CAN FD length codes |
//! | [`logging`] | Diagnostic callbacks |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `core::result::Result<T, Error>`. Diagnostics that do not abort an
//! operation go to the [`log`] facade and the [`logging`] callbacks.

extern crate alloc;

pub mod blocks;
pub mod can;
pub mod codec;
pub mod conversion;
pub mod error;
pub mod logging;
pub mod mdf3;
pub mod model;
pub mod reader;
pub mod types;
pub mod writer;

pub use blocks::DataType;
pub use can::{CanErrorType, CanMessage};
pub use codec::{CanOpenDate, CanOpenTime, DecodedValue};
pub use conversion::{ConversionType, EngValue};
pub use error::{Error, Result};
pub use logging::MdfLogSeverity;
pub use model::{
    Attachment, Channel, ChannelArray, ChannelConversion, ChannelGroup, ConversionRef, DataGroup,
    ETag, ETagDataType, ETagValue, Event, FileHistory, Header, MdfFile, MetaData,
    SourceInformation,
};
pub use reader::{CanBusObserver, ChannelObserver, MdfReader, create_channel_observer_for_channel_group};
pub use types::{
    ArrayStorage, ArrayType, ChannelType, EventCause, EventSyncType, EventType, MdfBusType,
    RangeType, SourceBus, SourceType, SyncType,
};
pub use writer::{
    FileWriter, FlushPolicy, MdfWrite, MdfWriter, StorageType, StreamingConfig, VecWriter,
    WriteState, WriterType,
};

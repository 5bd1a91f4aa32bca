//! Error types for MDF operations.
//!
//! This module defines the [`Error`] enum which represents all failures that
//! can occur when reading, writing, decoding, or converting MDF data.
//!
//! # Example
//!
//! ```no_run
//! use mdf_rs::{MdfReader, Error, Result};
//!
//! fn first_group_name(path: &str) -> Result<String> {
//!     let mut reader = MdfReader::new(path);
//!     if !reader.is_ok() {
//!         return Err(Error::FileIdentifierError(path.to_string()));
//!     }
//!     reader.read_measurement_info()?;
//!     let dg = reader
//!         .data_group(0)
//!         .ok_or_else(|| Error::NotFound("data group 0".into()))?;
//!     match dg.channel_groups().first() {
//!         Some(cg) => Ok(cg.name().to_string()),
//!         None => Err(Error::NotFound("channel group".into())),
//!     }
//! }
//! ```

use core::fmt;

use alloc::string::String;

/// Errors that can occur during MDF file operations.
#[derive(Debug)]
pub enum Error {
    /// Buffer provided for parsing was too small.
    ///
    /// This typically indicates file corruption or an incomplete read.
    TooShortBuffer {
        /// Actual number of bytes available
        actual: usize,
        /// Minimum number of bytes required
        expected: usize,
        /// Source file where the error was detected
        file: &'static str,
        /// Line number where the error was detected
        line: u32,
    },

    /// The file identifier is neither "MDF     " nor "UnFinMF ".
    FileIdentifierError(String),

    /// The MDF version is not supported (3.x and 4.x are).
    FileVersioningError(String),

    /// A block identifier did not match the expected value.
    BlockIDError {
        /// The identifier that was found
        actual: String,
        /// The identifier that was expected
        expected: String,
    },

    /// An I/O error occurred while reading or writing the file.
    IOError(std::io::Error),

    /// The version string in the identification block could not be parsed.
    InvalidVersionString(String),

    /// Failed to link blocks together during file writing.
    BlockLinkError(String),

    /// Failed to serialize or deserialize a block.
    BlockSerializationError(String),

    /// A conversion chain exceeded the maximum allowed depth.
    ConversionChainTooDeep {
        /// The maximum depth that was exceeded
        max_depth: usize,
    },

    /// A cycle was detected in a conversion chain.
    ConversionChainCycle {
        /// The address where the cycle was detected
        address: u64,
    },

    /// A conversion was evaluated with a parameter list of the wrong shape.
    ConversionParameterError {
        /// Conversion kind being evaluated
        conversion: String,
        /// Minimum or exact parameter count required
        expected: usize,
        /// Parameter count actually present
        actual: usize,
    },

    /// An algebraic formula could not be parsed or evaluated.
    FormulaError(String),

    /// A value could not be encoded into (or decoded from) a record.
    CodecError(String),

    /// An operation was called in a state that does not allow it.
    InvalidState(String),

    /// A requested object does not exist.
    NotFound(String),

    /// The file uses a feature that is not compiled in or not supported.
    UnsupportedFeature(String),

    /// A log callback could not be installed.
    CallbackError(String),

    /// The reader was closed; call `open()` before reading again.
    ReaderClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooShortBuffer {
                actual,
                expected,
                file,
                line,
            } => write!(
                f,
                "Buffer too small at {file}:{line}: need at least {expected} bytes, got {actual}"
            ),
            Error::FileIdentifierError(id) => {
                write!(
                    f,
                    r#"Invalid file identifier: Expected "MDF     " or "UnFinMF ", found {id}"#
                )
            }
            Error::FileVersioningError(ver) => {
                write!(f, "Unsupported MDF version: {ver}")
            }
            Error::BlockIDError { actual, expected } => {
                write!(
                    f,
                    "Invalid block identifier: Expected {expected:?}, got {actual:?}"
                )
            }
            Error::IOError(e) => write!(f, "I/O error: {e}"),
            Error::InvalidVersionString(s) => write!(f, "Invalid version string: {s}"),
            Error::BlockLinkError(s) => write!(f, "Block linking error: {s}"),
            Error::BlockSerializationError(s) => write!(f, "Block serialization error: {s}"),
            Error::ConversionChainTooDeep { max_depth } => {
                write!(
                    f,
                    "Conversion chain too deep: maximum depth of {max_depth} exceeded"
                )
            }
            Error::ConversionChainCycle { address } => {
                write!(
                    f,
                    "Conversion chain cycle detected at block address {address:#x}"
                )
            }
            Error::ConversionParameterError {
                conversion,
                expected,
                actual,
            } => write!(
                f,
                "{conversion} conversion needs {expected} parameters, found {actual}"
            ),
            Error::FormulaError(s) => write!(f, "Formula error: {s}"),
            Error::CodecError(s) => write!(f, "Codec error: {s}"),
            Error::InvalidState(s) => write!(f, "Invalid state: {s}"),
            Error::NotFound(s) => write!(f, "Not found: {s}"),
            Error::UnsupportedFeature(s) => write!(f, "Unsupported feature: {s}"),
            Error::CallbackError(s) => write!(f, "Log callback error: {s}"),
            Error::ReaderClosed => write!(f, "Reader is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

/// A specialized Result type for MDF operations.
pub type Result<T> = core::result::Result<T, Error>;

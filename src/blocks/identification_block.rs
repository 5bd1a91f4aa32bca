// identification_block.rs
use super::ID_BLOCK_SIZE;
use crate::{
    Error, Result,
    blocks::common::{read_u16, validate_buffer_size},
};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// File identifier of a finalized file.
pub const FINALIZED_FILE_ID: &str = "MDF     ";
/// File identifier of a file whose writer has not finalized it yet.
pub const UNFINALIZED_FILE_ID: &str = "UnFinMF ";

/// Unfinalized flag: cycle counters of CG/CA blocks need an update.
pub const UNFIN_UPDATE_CG_COUNTER: u16 = 0x0001;
/// Unfinalized flag: the length of the last DT block needs an update.
pub const UNFIN_UPDATE_LAST_DT_LENGTH: u16 = 0x0004;
/// Unfinalized flag: the last DL block needs an update.
pub const UNFIN_UPDATE_LAST_DL: u16 = 0x0010;

/// Identification Block: the 64 bytes at file offset 0, shared by MDF3 and MDF4.
///
/// ```text
///  0  file id        char[8]  "MDF     " / "UnFinMF "
///  8  format version char[8]  "4.10    " / "3.30    "
/// 16  program id     char[8]
/// 24  byte order     u16      MDF3 only, 0 = little endian
/// 26  float format   u16      MDF3 only, 0 = IEEE 754
/// 28  version        u16      e.g. 410
/// 30  code page      u16      MDF3 only
/// 60  standard unfinalized flags u16
/// 62  custom unfinalized flags   u16
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationBlock {
    pub file_id: String,
    pub format_version: String,
    pub program_id: String,
    pub byte_order: u16,
    pub float_format: u16,
    pub version_number: u16,
    pub code_page: u16,
    pub unfinalized_flags: u16,
    pub custom_flags: u16,
}

impl Default for IdentificationBlock {
    fn default() -> Self {
        Self::new(410, "mdf-rs")
    }
}

fn padded(source: &str, target: &mut [u8]) {
    let src = source.as_bytes();
    let len = src.len().min(target.len());
    target[..len].copy_from_slice(&src[..len]);
    for byte in target.iter_mut().skip(len) {
        *byte = b' ';
    }
}

impl IdentificationBlock {
    /// Builds a finalized identification for `version` (e.g. 330 or 410).
    pub fn new(version: u16, program_id: &str) -> Self {
        Self {
            file_id: FINALIZED_FILE_ID.to_string(),
            format_version: alloc::format!("{}.{:02}", version / 100, version % 100),
            program_id: program_id.to_string(),
            byte_order: 0,
            float_format: 0,
            version_number: version,
            code_page: 0,
            unfinalized_flags: 0,
            custom_flags: 0,
        }
    }

    pub fn is_mdf4(&self) -> bool {
        self.version_number >= 400
    }

    pub fn is_finalized(&self) -> bool {
        self.file_id.starts_with("MDF")
    }

    /// Switches the identification to the unfinalized form with `flags` pending.
    pub fn mark_unfinalized(&mut self, flags: u16) {
        self.file_id = UNFINALIZED_FILE_ID.to_string();
        self.unfinalized_flags = flags;
        self.custom_flags = 0;
    }

    pub fn mark_finalized(&mut self) {
        self.file_id = FINALIZED_FILE_ID.to_string();
        self.unfinalized_flags = 0;
        self.custom_flags = 0;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = alloc::vec![0u8; ID_BLOCK_SIZE];
        padded(&self.file_id, &mut buffer[0..8]);
        padded(&self.format_version, &mut buffer[8..16]);
        padded(&self.program_id, &mut buffer[16..24]);
        if !self.is_mdf4() {
            buffer[24..26].copy_from_slice(&self.byte_order.to_le_bytes());
            buffer[26..28].copy_from_slice(&self.float_format.to_le_bytes());
            buffer[30..32].copy_from_slice(&self.code_page.to_le_bytes());
        }
        buffer[28..30].copy_from_slice(&self.version_number.to_le_bytes());
        buffer[60..62].copy_from_slice(&self.unfinalized_flags.to_le_bytes());
        buffer[62..64].copy_from_slice(&self.custom_flags.to_le_bytes());
        Ok(buffer)
    }

    /// Parses and validates the identification block.
    ///
    /// Fails with [`Error::FileIdentifierError`] for non-MDF content and with
    /// [`Error::FileVersioningError`] for versions other than 3.x and 4.x.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        validate_buffer_size(bytes, ID_BLOCK_SIZE)?;
        let file_id = String::from_utf8_lossy(&bytes[0..8]).into_owned();
        if file_id != FINALIZED_FILE_ID && file_id != UNFINALIZED_FILE_ID {
            return Err(Error::FileIdentifierError(file_id));
        }

        let format_version = String::from_utf8_lossy(&bytes[8..16])
            .trim_end_matches(['\0', ' '])
            .to_string();
        let program_id = String::from_utf8_lossy(&bytes[16..24])
            .trim_end_matches(['\0', ' '])
            .to_string();

        let mut version_number = read_u16(bytes, 28);
        if version_number == 0 {
            version_number = parse_version_string(&format_version)?;
        }
        if !(300..500).contains(&version_number) {
            return Err(Error::FileVersioningError(format_version));
        }

        Ok(Self {
            file_id,
            format_version,
            program_id,
            byte_order: read_u16(bytes, 24),
            float_format: read_u16(bytes, 26),
            version_number,
            code_page: read_u16(bytes, 30),
            unfinalized_flags: read_u16(bytes, 60),
            custom_flags: read_u16(bytes, 62),
        })
    }
}

/// Parses "4.10" into 410.
fn parse_version_string(text: &str) -> Result<u16> {
    let mut parts = text.trim().splitn(2, '.');
    let major = parts.next().and_then(|p| p.trim().parse::<u16>().ok());
    let minor = parts.next().and_then(|p| p.trim().parse::<u16>().ok());
    match (major, minor) {
        (Some(major), Some(minor)) => Ok(major * 100 + minor),
        _ => Err(Error::InvalidVersionString(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfinalized_round_trip() {
        let mut id = IdentificationBlock::new(410, "test");
        id.mark_unfinalized(UNFIN_UPDATE_CG_COUNTER | UNFIN_UPDATE_LAST_DT_LENGTH);
        let bytes = id.to_bytes().unwrap();
        assert_eq!(&bytes[0..8], b"UnFinMF ");
        let parsed = IdentificationBlock::from_bytes(&bytes).unwrap();
        assert!(!parsed.is_finalized());
        assert_eq!(parsed.unfinalized_flags, 0x0005);
        assert_eq!(parsed.format_version, "4.10");
    }

    #[test]
    fn mdf3_keeps_byte_order_fields() {
        let mut id = IdentificationBlock::new(330, "test");
        id.code_page = 1252;
        let parsed = IdentificationBlock::from_bytes(&id.to_bytes().unwrap()).unwrap();
        assert!(!parsed.is_mdf4());
        assert_eq!(parsed.code_page, 1252);
        assert_eq!(parsed.byte_order, 0);
    }

    #[test]
    fn rejects_foreign_files() {
        let bytes = [b'X'; 64];
        assert!(matches!(
            IdentificationBlock::from_bytes(&bytes),
            Err(Error::FileIdentifierError(_))
        ));
    }

    #[test]
    fn version_string_fallback() {
        assert_eq!(parse_version_string("3.00").unwrap(), 300);
        assert!(parse_version_string("abc").is_err());
    }
}

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use super::{parse_block_header, push_block_header, push_link, read_link};
use crate::blocks::{read_f64, read_fixed_str, read_u16, validate_buffer_size, write_fixed_str};
use crate::{Error, Result};

const CC3_FIXED_SIZE: usize = 46;
const FORMULA_WIDTH: usize = 256;
const VTAB_TEXT_WIDTH: usize = 32;

/// Type specific payload of an MDF3 conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cc3Parameters {
    /// 1:1, date and time conversions.
    None,
    /// Formula parameters; for the table conversions (types 1 and 2) the
    /// flattened `(raw, physical)` pairs.
    Values(Vec<f64>),
    /// ASAM-MCD2 text formula (type 10).
    Formula(String),
    /// Value to text pairs (type 11).
    ValueTexts(Vec<(f64, String)>),
    /// Range to text triples (type 12); the first entry is the default whose
    /// bounds are ignored.
    RangeTexts(Vec<(f64, f64, u64)>),
}

/// MDF3 conversion block.
///
/// ```text
///   4 value range valid   u16
///   6 min, max            f64 each
///  22 unit                char[20]
///  42 conversion type     u16
///  44 parameter count     u16
///  46 type specific data
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cc3Block {
    pub range_valid: bool,
    pub min: f64,
    pub max: f64,
    pub unit: String,
    pub conversion_type: u16,
    pub parameters: Cc3Parameters,
}

impl Default for Cc3Block {
    fn default() -> Self {
        Self {
            range_valid: false,
            min: 0.0,
            max: 0.0,
            unit: String::new(),
            conversion_type: 65535,
            parameters: Cc3Parameters::None,
        }
    }
}

fn values_count(conversion_type: u16, count: usize) -> Option<usize> {
    match conversion_type {
        0 | 6 | 7 | 8 | 9 => Some(count),
        1 | 2 => Some(count * 2),
        _ => None,
    }
}

impl Cc3Block {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let size = parse_block_header(bytes, "CC")?;
        validate_buffer_size(bytes, CC3_FIXED_SIZE)?;
        let body = &bytes[..size.max(CC3_FIXED_SIZE)];
        let conversion_type = read_u16(body, 42);
        let count = read_u16(body, 44) as usize;

        let parameters = if let Some(n) = values_count(conversion_type, count) {
            validate_buffer_size(body, CC3_FIXED_SIZE + n * 8)?;
            Cc3Parameters::Values(
                (0..n)
                    .map(|i| read_f64(body, CC3_FIXED_SIZE + i * 8))
                    .collect(),
            )
        } else {
            match conversion_type {
                10 => {
                    let width = (body.len() - CC3_FIXED_SIZE).min(FORMULA_WIDTH);
                    Cc3Parameters::Formula(read_fixed_str(body, CC3_FIXED_SIZE, width))
                }
                11 => {
                    let entry = 8 + VTAB_TEXT_WIDTH;
                    validate_buffer_size(body, CC3_FIXED_SIZE + count * entry)?;
                    Cc3Parameters::ValueTexts(
                        (0..count)
                            .map(|i| {
                                let at = CC3_FIXED_SIZE + i * entry;
                                (
                                    read_f64(body, at),
                                    read_fixed_str(body, at + 8, VTAB_TEXT_WIDTH),
                                )
                            })
                            .collect(),
                    )
                }
                12 => {
                    validate_buffer_size(body, CC3_FIXED_SIZE + count * 20)?;
                    Cc3Parameters::RangeTexts(
                        (0..count)
                            .map(|i| {
                                let at = CC3_FIXED_SIZE + i * 20;
                                (
                                    read_f64(body, at),
                                    read_f64(body, at + 8),
                                    read_link(body, at + 16),
                                )
                            })
                            .collect(),
                    )
                }
                _ => Cc3Parameters::None,
            }
        };

        Ok(Self {
            range_valid: read_u16(body, 4) != 0,
            min: read_f64(body, 6),
            max: read_f64(body, 14),
            unit: read_fixed_str(body, 22, 20),
            conversion_type,
            parameters,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        let count = match &self.parameters {
            Cc3Parameters::None => 0,
            Cc3Parameters::Values(values) => {
                for v in values {
                    payload.extend_from_slice(&v.to_le_bytes());
                }
                if matches!(self.conversion_type, 1 | 2) {
                    if values.len() % 2 != 0 {
                        return Err(Error::BlockSerializationError(format!(
                            "table conversion needs value pairs, got {} values",
                            values.len()
                        )));
                    }
                    values.len() / 2
                } else {
                    values.len()
                }
            }
            Cc3Parameters::Formula(formula) => {
                write_fixed_str(&mut payload, formula, FORMULA_WIDTH);
                0
            }
            Cc3Parameters::ValueTexts(entries) => {
                for (value, text) in entries {
                    payload.extend_from_slice(&value.to_le_bytes());
                    write_fixed_str(&mut payload, text, VTAB_TEXT_WIDTH);
                }
                entries.len()
            }
            Cc3Parameters::RangeTexts(entries) => {
                for (lower, upper, text_addr) in entries {
                    payload.extend_from_slice(&lower.to_le_bytes());
                    payload.extend_from_slice(&upper.to_le_bytes());
                    push_link(&mut payload, *text_addr)?;
                }
                entries.len()
            }
        };
        let count = u16::try_from(count).map_err(|_| {
            Error::BlockSerializationError(format!("{count} conversion entries exceed MDF3 limits"))
        })?;

        let mut buffer = Vec::with_capacity(CC3_FIXED_SIZE + payload.len());
        push_block_header(&mut buffer, "CC", CC3_FIXED_SIZE + payload.len())?;
        buffer.extend_from_slice(&u16::from(self.range_valid).to_le_bytes());
        buffer.extend_from_slice(&self.min.to_le_bytes());
        buffer.extend_from_slice(&self.max.to_le_bytes());
        write_fixed_str(&mut buffer, &self.unit, 20);
        buffer.extend_from_slice(&self.conversion_type.to_le_bytes());
        buffer.extend_from_slice(&count.to_le_bytes());
        buffer.extend_from_slice(&payload);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_round_trip() {
        let cc = Cc3Block {
            unit: "rpm".into(),
            conversion_type: 0,
            parameters: Cc3Parameters::Values(alloc::vec![10.0, 0.5]),
            ..Cc3Block::default()
        };
        let bytes = cc.to_bytes().unwrap();
        assert_eq!(bytes.len(), 46 + 16);
        assert_eq!(read_u16(&bytes, 44), 2);
        assert_eq!(Cc3Block::from_bytes(&bytes).unwrap(), cc);
    }

    #[test]
    fn table_counts_pairs() {
        let cc = Cc3Block {
            conversion_type: 1,
            parameters: Cc3Parameters::Values(alloc::vec![0.0, 0.0, 10.0, 100.0]),
            ..Cc3Block::default()
        };
        let bytes = cc.to_bytes().unwrap();
        assert_eq!(read_u16(&bytes, 44), 2);
        assert_eq!(Cc3Block::from_bytes(&bytes).unwrap(), cc);
    }

    #[test]
    fn text_tables_round_trip() {
        let vtab = Cc3Block {
            conversion_type: 11,
            parameters: Cc3Parameters::ValueTexts(alloc::vec![
                (0.0, "off".into()),
                (1.0, "on".into())
            ]),
            ..Cc3Block::default()
        };
        assert_eq!(Cc3Block::from_bytes(&vtab.to_bytes().unwrap()).unwrap(), vtab);

        let range = Cc3Block {
            conversion_type: 12,
            parameters: Cc3Parameters::RangeTexts(alloc::vec![(0.0, 0.0, 0x90), (1.0, 5.0, 0xA0)]),
            ..Cc3Block::default()
        };
        assert_eq!(Cc3Block::from_bytes(&range.to_bytes().unwrap()).unwrap(), range);

        let formula = Cc3Block {
            conversion_type: 10,
            parameters: Cc3Parameters::Formula("X*2+1".into()),
            ..Cc3Block::default()
        };
        assert_eq!(Cc3Block::from_bytes(&formula.to_bytes().unwrap()).unwrap(), formula);
    }
}

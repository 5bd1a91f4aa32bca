//! Text producing and text consuming conversions.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{EngValue, convert_at_depth};
use crate::codec::DecodedValue;
use crate::model::{ChannelConversion, ConversionRef};
use crate::{Error, Result};

fn shape_error(kind: &str, expected: usize, actual: usize) -> Error {
    Error::ConversionParameterError {
        conversion: kind.to_string(),
        expected,
        actual,
    }
}

/// Resolves a table entry: text is returned as is, a nested conversion is
/// applied to the raw value, an empty link keeps the raw value.
fn resolve(entry: &ConversionRef, raw: &DecodedValue, x: f64, depth: usize) -> Result<EngValue> {
    match entry {
        ConversionRef::Text(text) => Ok(EngValue::Text(text.clone())),
        ConversionRef::Conversion(cc) => convert_at_depth(cc, raw, depth + 1),
        ConversionRef::Empty => Ok(EngValue::Float(x)),
    }
}

/// Keys are the parameters; references hold one entry per key plus a default.
pub fn value_to_text(cc: &ChannelConversion, raw: &DecodedValue, x: f64, depth: usize) -> Result<EngValue> {
    let keys = &cc.parameters;
    if cc.references.len() != keys.len() + 1 {
        return Err(shape_error("value to text", keys.len() + 1, cc.references.len()));
    }
    let index = keys.iter().position(|&k| k == x).unwrap_or(keys.len());
    resolve(&cc.references[index], raw, x, depth)
}

/// Parameters are `[min, max]` pairs; references hold one entry per range
/// plus a default.
pub fn value_range_to_text(
    cc: &ChannelConversion,
    raw: &DecodedValue,
    x: f64,
    depth: usize,
) -> Result<EngValue> {
    let p = &cc.parameters;
    if p.len() % 2 != 0 || cc.references.len() != p.len() / 2 + 1 {
        return Err(shape_error(
            "value range to text",
            p.len() / 2 + 1,
            cc.references.len(),
        ));
    }
    let n = p.len() / 2;
    let index = (0..n)
        .find(|&i| x >= p[2 * i] && x <= p[2 * i + 1])
        .unwrap_or(n);
    resolve(&cc.references[index], raw, x, depth)
}

/// References are the text keys; parameters hold one value per key plus a
/// default.
pub fn text_to_value(cc: &ChannelConversion, input: &str) -> Result<f64> {
    let p = &cc.parameters;
    if p.len() != cc.references.len() + 1 {
        return Err(shape_error("text to value", cc.references.len() + 1, p.len()));
    }
    let index = cc
        .references
        .iter()
        .position(|r| r.as_text() == Some(input))
        .unwrap_or(cc.references.len());
    Ok(p[index])
}

/// References are `(key, value)` text pairs followed by a default; an empty
/// default keeps the input.
pub fn text_to_text(cc: &ChannelConversion, input: &str) -> Result<String> {
    let refs = &cc.references;
    if refs.len() % 2 != 1 {
        return Err(shape_error("text to text", refs.len() + 1, refs.len()));
    }
    let n = refs.len() / 2;
    let hit = (0..n).find(|&i| refs[2 * i].as_text() == Some(input));
    let entry = match hit {
        Some(i) => &refs[2 * i + 1],
        None => &refs[2 * n],
    };
    Ok(entry.as_text().unwrap_or(input).to_string())
}

/// Each parameter is a bit mask (stored as raw `u64` bits) paired with a
/// nested value-to-text conversion; the results are joined with `|`.
pub fn bitfield_to_text(cc: &ChannelConversion, raw: &DecodedValue, depth: usize) -> Result<EngValue> {
    if cc.references.len() != cc.parameters.len() {
        return Err(shape_error(
            "bitfield to text",
            cc.parameters.len(),
            cc.references.len(),
        ));
    }
    let value = match raw {
        DecodedValue::UnsignedInteger(v) => *v,
        DecodedValue::SignedInteger(v) => *v as u64,
        other => other.as_f64().map(|f| f as u64).unwrap_or(0),
    };

    let mut parts = Vec::new();
    for (mask, entry) in cc.parameters.iter().zip(&cc.references) {
        let masked = value & mask.to_bits();
        let text = match entry {
            ConversionRef::Conversion(nested) => {
                match convert_at_depth(nested, &DecodedValue::UnsignedInteger(masked), depth + 1)? {
                    EngValue::Text(t) if !nested.name.is_empty() => format!("{} = {t}", nested.name),
                    EngValue::Text(t) => t,
                    EngValue::Float(_) => continue,
                }
            }
            ConversionRef::Text(t) if masked != 0 => t.clone(),
            _ => continue,
        };
        if !text.is_empty() {
            parts.push(text);
        }
    }
    Ok(EngValue::Text(parts.join("|")))
}

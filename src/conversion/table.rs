//! Numeric lookup tables.

use crate::model::ChannelConversion;
use crate::{Error, Result};

use alloc::string::ToString;

fn pairs(cc: &ChannelConversion, kind: &str) -> Result<usize> {
    let len = cc.parameters.len();
    if len < 2 || len % 2 != 0 {
        return Err(Error::ConversionParameterError {
            conversion: kind.to_string(),
            expected: if len < 2 { 2 } else { len + 1 },
            actual: len,
        });
    }
    Ok(len / 2)
}

/// Value to value with linear interpolation between the bracketing keys.
/// Inputs outside the table take the first or last value.
pub fn value_to_value_interpolated(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let n = pairs(cc, "value to value with interpolation")?;
    let p = &cc.parameters;
    let key = |i: usize| p[2 * i];
    let value = |i: usize| p[2 * i + 1];

    if x <= key(0) {
        return Ok(value(0));
    }
    if x >= key(n - 1) {
        return Ok(value(n - 1));
    }
    for i in 0..n - 1 {
        let (k0, k1) = (key(i), key(i + 1));
        if x >= k0 && x <= k1 {
            if k1 == k0 {
                return Ok(value(i));
            }
            let t = (x - k0) / (k1 - k0);
            return Ok(value(i) + t * (value(i + 1) - value(i)));
        }
    }
    Ok(value(n - 1))
}

/// Value to value without interpolation: the value of the exact key or of
/// the nearest key below the input; inputs below the table take the first.
pub fn value_to_value(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let n = pairs(cc, "value to value")?;
    let p = &cc.parameters;
    let mut result = p[1];
    for i in 0..n {
        if p[2 * i] <= x {
            result = p[2 * i + 1];
        } else {
            break;
        }
    }
    Ok(result)
}

/// `[min, max, value]` triplets tested in order, first match wins, the
/// trailing parameter is the default.
pub fn value_range_to_value(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let p = &cc.parameters;
    if p.is_empty() || (p.len() - 1) % 3 != 0 {
        return Err(Error::ConversionParameterError {
            conversion: "value range to value".to_string(),
            expected: (p.len().saturating_sub(1) / 3) * 3 + 1,
            actual: p.len(),
        });
    }
    let n = (p.len() - 1) / 3;
    Ok((0..n)
        .find(|&i| x >= p[3 * i] && x <= p[3 * i + 1])
        .map(|i| p[3 * i + 2])
        .unwrap_or(p[3 * n]))
}

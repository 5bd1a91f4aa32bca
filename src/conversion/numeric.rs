//! Closed-form conversions: linear, rational and the MDF3 legacy families.

use super::expect_parameters;
use crate::Result;
use crate::model::ChannelConversion;

pub fn linear(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let p = expect_parameters(cc, "linear", 2)?;
    Ok(p[1] * x + p[0])
}

/// `(p0 x² + p1 x + p2) / (p3 x² + p4 x + p5)`; a zero denominator gives NaN.
pub fn rational(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let p = expect_parameters(cc, "rational", 6)?;
    let numerator = p[0] * x * x + p[1] * x + p[2];
    let denominator = p[3] * x * x + p[4] * x + p[5];
    if denominator == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(numerator / denominator)
}

/// MDF3 polynomial: `(p1 - p3 (x - p4 - p5)) / (p2 (x - p4 - p5) - p0)`.
pub fn polynomial(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let p = expect_parameters(cc, "polynomial", 6)?;
    let shifted = x - p[4] - p[5];
    let denominator = p[2] * shifted - p[0];
    if denominator == 0.0 {
        return Ok(f64::NAN);
    }
    Ok((p[1] - p[3] * shifted) / denominator)
}

/// MDF3 exponential. With `p3 == 0`: `ln(((x - p6) p5 - p2) / p0) / p1`,
/// with `p0 == 0`: `ln((p2 / (x - p6) - p5) / p3) / p4`.
pub fn exponential(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let p = expect_parameters(cc, "exponential", 7)?;
    let value = if p[3] == 0.0 {
        (((x - p[6]) * p[5] - p[2]) / p[0]).ln() / p[1]
    } else if p[0] == 0.0 {
        ((p[2] / (x - p[6]) - p[5]) / p[3]).ln() / p[4]
    } else {
        f64::NAN
    };
    Ok(value)
}

/// MDF3 logarithmic. With `p3 == 0`: `exp(((x - p6) p5 - p2) / p0) / p1`,
/// with `p0 == 0`: `exp((p2 / (x - p6) - p5) / p3) / p4`.
pub fn logarithmic(cc: &ChannelConversion, x: f64) -> Result<f64> {
    let p = expect_parameters(cc, "logarithmic", 7)?;
    let value = if p[3] == 0.0 {
        (((x - p[6]) * p[5] - p[2]) / p[0]).exp() / p[1]
    } else if p[0] == 0.0 {
        ((p[2] / (x - p[6]) - p[5]) / p[3]).exp() / p[4]
    } else {
        f64::NAN
    };
    Ok(value)
}

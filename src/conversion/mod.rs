//! Conversion engine: raw channel values to engineering values.
//!
//! Conversions are evaluated on demand. The parameter list of a conversion is
//! only checked when it is applied, so a malformed conversion in a file does
//! not prevent reading it; callers that need a number regardless (such as
//! [`crate::ChannelObserver`]) map the error to NaN.

mod formula;
mod numeric;
mod table;
mod text;
mod types;

pub use formula::eval_formula;
pub use types::ConversionType;

use alloc::string::{String, ToString};
use core::fmt;

use crate::codec::{CanOpenDate, CanOpenTime, DecodedValue};
use crate::model::ChannelConversion;
use crate::{Error, Result};

/// Nesting limit for conversions referencing conversions.
pub const MAX_CONVERSION_DEPTH: usize = 20;

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum EngValue {
    Float(f64),
    Text(String),
}

impl EngValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EngValue::Float(v) => Some(*v),
            EngValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EngValue::Text(t) => Some(t),
            EngValue::Float(_) => None,
        }
    }
}

impl fmt::Display for EngValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngValue::Float(v) => write!(f, "{v}"),
            EngValue::Text(t) => f.write_str(t),
        }
    }
}

/// Returns the parameter list when it has exactly `count` entries.
pub(crate) fn expect_parameters<'a>(
    cc: &'a ChannelConversion,
    kind: &str,
    count: usize,
) -> Result<&'a [f64]> {
    if cc.parameters.len() != count {
        return Err(Error::ConversionParameterError {
            conversion: kind.to_string(),
            expected: count,
            actual: cc.parameters.len(),
        });
    }
    Ok(&cc.parameters)
}

fn numeric_input(raw: &DecodedValue) -> Result<f64> {
    raw.as_f64()
        .ok_or_else(|| Error::CodecError("conversion needs a numeric raw value".to_string()))
}

fn text_input(raw: &DecodedValue) -> String {
    match raw {
        DecodedValue::String(s) => s.clone(),
        other => other.as_f64().map(|v| v.to_string()).unwrap_or_default(),
    }
}

fn date_time_ns(raw: &DecodedValue, date: bool) -> Result<f64> {
    let ns = match raw {
        DecodedValue::CanOpenDate(d) => Some(d.to_unix_ns()),
        DecodedValue::CanOpenTime(t) => Some(t.to_unix_ns()),
        DecodedValue::ByteArray(bytes) if date => CanOpenDate::from_bytes(bytes).map(|d| d.to_unix_ns()),
        DecodedValue::ByteArray(bytes) => CanOpenTime::from_bytes(bytes).map(|t| t.to_unix_ns()),
        _ => None,
    };
    ns.map(|ns| ns as f64)
        .ok_or_else(|| Error::CodecError("date/time conversion needs a CANopen value".to_string()))
}

/// Applies `cc` to `raw`.
pub fn convert(cc: &ChannelConversion, raw: &DecodedValue) -> Result<EngValue> {
    convert_at_depth(cc, raw, 0)
}

pub(crate) fn convert_at_depth(
    cc: &ChannelConversion,
    raw: &DecodedValue,
    depth: usize,
) -> Result<EngValue> {
    if depth > MAX_CONVERSION_DEPTH {
        return Err(Error::ConversionChainTooDeep {
            max_depth: MAX_CONVERSION_DEPTH,
        });
    }

    let value = match cc.conversion_type {
        ConversionType::Identity => match raw {
            DecodedValue::String(s) => EngValue::Text(s.clone()),
            other => EngValue::Float(numeric_input(other)?),
        },
        ConversionType::Linear => EngValue::Float(numeric::linear(cc, numeric_input(raw)?)?),
        ConversionType::Rational => EngValue::Float(numeric::rational(cc, numeric_input(raw)?)?),
        ConversionType::Algebraic => {
            EngValue::Float(eval_formula(&cc.formula, numeric_input(raw)?)?)
        }
        ConversionType::ValueToValueInterpolation => EngValue::Float(
            table::value_to_value_interpolated(cc, numeric_input(raw)?)?,
        ),
        ConversionType::ValueToValue => {
            EngValue::Float(table::value_to_value(cc, numeric_input(raw)?)?)
        }
        ConversionType::ValueRangeToValue => {
            EngValue::Float(table::value_range_to_value(cc, numeric_input(raw)?)?)
        }
        ConversionType::ValueToText => text::value_to_text(cc, raw, numeric_input(raw)?, depth)?,
        ConversionType::ValueRangeToText => {
            text::value_range_to_text(cc, raw, numeric_input(raw)?, depth)?
        }
        ConversionType::TextToValue => EngValue::Float(text::text_to_value(cc, &text_input(raw))?),
        ConversionType::TextToText => EngValue::Text(text::text_to_text(cc, &text_input(raw))?),
        ConversionType::BitfieldToText => text::bitfield_to_text(cc, raw, depth)?,
        ConversionType::Polynomial => {
            EngValue::Float(numeric::polynomial(cc, numeric_input(raw)?)?)
        }
        ConversionType::Exponential => {
            EngValue::Float(numeric::exponential(cc, numeric_input(raw)?)?)
        }
        ConversionType::Logarithmic => {
            EngValue::Float(numeric::logarithmic(cc, numeric_input(raw)?)?)
        }
        ConversionType::Date => EngValue::Float(date_time_ns(raw, true)?),
        ConversionType::Time => EngValue::Float(date_time_ns(raw, false)?),
        ConversionType::Unknown(code) => {
            return Err(Error::UnsupportedFeature(alloc::format!(
                "conversion type {code}"
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversion(kind: ConversionType, parameters: &[f64]) -> ChannelConversion {
        let mut cc = ChannelConversion::default();
        cc.set_conversion_type(kind);
        for (i, p) in parameters.iter().enumerate() {
            cc.set_parameter(i, *p);
        }
        cc
    }

    fn eval(cc: &ChannelConversion, x: f64) -> f64 {
        cc.convert(&DecodedValue::Float(x))
            .unwrap()
            .as_f64()
            .unwrap()
    }

    #[test]
    fn linear_triples() {
        for (p0, p1, x) in [(0.0, 1.0, 5.0), (10.0, 0.5, 4.0), (-3.0, 2.0, -1.5)] {
            let cc = conversion(ConversionType::Linear, &[p0, p1]);
            assert_eq!(eval(&cc, x), p1 * x + p0);
        }
    }

    #[test]
    fn identity_passes_numbers_and_text() {
        let cc = ChannelConversion::default();
        assert_eq!(
            cc.convert(&DecodedValue::UnsignedInteger(42)).unwrap(),
            EngValue::Float(42.0)
        );
        assert_eq!(
            cc.convert(&DecodedValue::String("on".into())).unwrap(),
            EngValue::Text("on".into())
        );
    }

    #[test]
    fn rational_and_zero_denominator() {
        // (x² + 0x + 0) / (0x² + 0x + 2)
        let cc = conversion(ConversionType::Rational, &[1.0, 0.0, 0.0, 0.0, 0.0, 2.0]);
        assert_eq!(eval(&cc, 4.0), 8.0);
        let cc = conversion(ConversionType::Rational, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(eval(&cc, 4.0).is_nan());
    }

    #[test]
    fn interpolation_hits_keys_and_blends_between() {
        let cc = conversion(
            ConversionType::ValueToValueInterpolation,
            &[0.0, 0.0, 10.0, 100.0, 20.0, 400.0],
        );
        assert_eq!(eval(&cc, 0.0), 0.0);
        assert_eq!(eval(&cc, 10.0), 100.0);
        assert_eq!(eval(&cc, 20.0), 400.0);
        assert_eq!(eval(&cc, 5.0), 50.0);
        assert_eq!(eval(&cc, 15.0), 250.0);
        assert_eq!(eval(&cc, -5.0), 0.0);
        assert_eq!(eval(&cc, 99.0), 400.0);
    }

    #[test]
    fn table_without_interpolation_snaps_below() {
        let cc = conversion(ConversionType::ValueToValue, &[0.0, 1.0, 10.0, 2.0, 20.0, 3.0]);
        assert_eq!(eval(&cc, 10.0), 2.0);
        assert_eq!(eval(&cc, 19.9), 2.0);
        assert_eq!(eval(&cc, -1.0), 1.0);
        assert_eq!(eval(&cc, 25.0), 3.0);
    }

    #[test]
    fn range_to_value_with_default() {
        let cc = conversion(
            ConversionType::ValueRangeToValue,
            &[0.0, 9.0, 1.0, 10.0, 19.0, 2.0, -1.0],
        );
        assert_eq!(eval(&cc, 0.0), 1.0);
        assert_eq!(eval(&cc, 9.0), 1.0);
        assert_eq!(eval(&cc, 12.0), 2.0);
        assert_eq!(eval(&cc, 50.0), -1.0);
    }

    #[test]
    fn malformed_parameters_fail_when_used() {
        let cc = conversion(ConversionType::Linear, &[1.0]);
        assert!(matches!(
            cc.convert(&DecodedValue::Float(1.0)),
            Err(Error::ConversionParameterError {
                expected: 2,
                actual: 1,
                ..
            })
        ));
        let cc = conversion(ConversionType::ValueRangeToValue, &[0.0, 1.0]);
        assert!(cc.convert(&DecodedValue::Float(1.0)).is_err());
        let cc = conversion(ConversionType::ValueToValueInterpolation, &[1.0, 2.0, 3.0]);
        assert!(cc.convert(&DecodedValue::Float(1.0)).is_err());
    }

    #[test]
    fn value_to_text_with_nested_default() {
        let mut cc = conversion(ConversionType::ValueToText, &[0.0, 1.0]);
        cc.set_text_reference(0, "Off");
        cc.set_text_reference(1, "On");
        let mut fallback = cc.new_conversion();
        fallback.set_conversion_type(ConversionType::Linear);
        fallback.set_parameter(0, 0.0);
        fallback.set_parameter(1, 10.0);
        cc.set_conversion_reference(2, fallback);

        assert_eq!(
            cc.convert(&DecodedValue::UnsignedInteger(1)).unwrap(),
            EngValue::Text("On".into())
        );
        assert_eq!(
            cc.convert(&DecodedValue::UnsignedInteger(7)).unwrap(),
            EngValue::Float(70.0)
        );
    }

    #[test]
    fn range_to_text() {
        let mut cc = conversion(ConversionType::ValueRangeToText, &[0.0, 10.0, 11.0, 20.0]);
        cc.set_text_reference(0, "low");
        cc.set_text_reference(1, "high");
        cc.set_text_reference(2, "out of range");
        let text = |x: f64| cc.convert(&DecodedValue::Float(x)).unwrap().to_string();
        assert_eq!(text(10.0), "low");
        assert_eq!(text(15.0), "high");
        assert_eq!(text(25.0), "out of range");
    }

    #[test]
    fn text_tables() {
        let mut to_value = conversion(ConversionType::TextToValue, &[1.0, 2.0, -1.0]);
        to_value.set_text_reference(0, "one");
        to_value.set_text_reference(1, "two");
        assert_eq!(
            to_value
                .convert(&DecodedValue::String("two".into()))
                .unwrap(),
            EngValue::Float(2.0)
        );
        assert_eq!(
            to_value
                .convert(&DecodedValue::String("zero".into()))
                .unwrap(),
            EngValue::Float(-1.0)
        );

        let mut to_text = conversion(ConversionType::TextToText, &[]);
        to_text.set_text_reference(0, "ja");
        to_text.set_text_reference(1, "yes");
        to_text.references.push(crate::model::ConversionRef::Empty);
        assert_eq!(
            to_text.convert(&"ja".into()).unwrap(),
            EngValue::Text("yes".into())
        );
        assert_eq!(
            to_text.convert(&"nein".into()).unwrap(),
            EngValue::Text("nein".into())
        );
    }

    #[test]
    fn bitfield_text() {
        let mut cc = conversion(ConversionType::BitfieldToText, &[]);
        cc.set_parameter_as_u64(0, 0x01);
        cc.set_parameter_as_u64(1, 0x06);
        let mut low = cc.new_conversion();
        low.set_name("enabled");
        low.set_conversion_type(ConversionType::ValueToText);
        low.set_parameter(0, 1.0);
        low.set_text_reference(0, "yes");
        low.set_text_reference(1, "no");
        let mut mode = cc.new_conversion();
        mode.set_conversion_type(ConversionType::ValueToText);
        mode.set_parameter(0, 4.0);
        mode.set_text_reference(0, "sport");
        mode.set_text_reference(1, "");
        cc.set_conversion_reference(0, low);
        cc.set_conversion_reference(1, mode);

        assert_eq!(
            cc.convert(&DecodedValue::UnsignedInteger(0x05)).unwrap(),
            EngValue::Text("enabled = yes|sport".into())
        );
    }

    #[test]
    fn legacy_forms() {
        // x = 3 shifts to 2: (4 - 0 * 2) / (1 * 2 - 0)
        let poly = conversion(ConversionType::Polynomial, &[0.0, 4.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(eval(&poly, 3.0), 2.0);

        let log = conversion(
            ConversionType::Logarithmic,
            &[1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
        assert!((eval(&log, 1.0) - 1.0_f64.exp()).abs() < 1e-12);

        let exp = conversion(
            ConversionType::Exponential,
            &[1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
        assert!((eval(&exp, 1.0_f64.exp()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn algebraic_formula() {
        let mut cc = conversion(ConversionType::Algebraic, &[]);
        cc.set_formula("X * 2 + 1");
        assert_eq!(eval(&cc, 3.0), 7.0);
        cc.set_formula("X +");
        assert!(matches!(
            cc.convert(&DecodedValue::Float(1.0)),
            Err(Error::FormulaError(_))
        ));
    }

    #[test]
    fn depth_is_limited() {
        let mut cc = conversion(ConversionType::ValueToText, &[]);
        for _ in 0..(MAX_CONVERSION_DEPTH + 2) {
            let mut outer = cc.new_conversion();
            outer.set_conversion_type(ConversionType::ValueToText);
            outer.set_conversion_reference(0, cc);
            cc = outer;
        }
        assert!(matches!(
            cc.convert(&DecodedValue::Float(1.0)),
            Err(Error::ConversionChainTooDeep { .. })
        ));
    }

    #[test]
    fn date_conversion_reads_canopen_bytes() {
        let date = CanOpenDate {
            day: 1,
            month: 1,
            year: 2020,
            ..Default::default()
        };
        let cc = conversion(ConversionType::Date, &[]);
        let value = cc
            .convert(&DecodedValue::ByteArray(date.to_bytes().to_vec()))
            .unwrap();
        assert_eq!(value, EngValue::Float(1_577_836_800e9));
    }
}

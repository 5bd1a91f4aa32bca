/// Kind of a channel conversion.
///
/// The first twelve variants are the MDF4 `cc_type` codes; the legacy forms
/// only exist in MDF3 files and are evaluated the same way in both versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConversionType {
    /// 1:1, the raw value is the engineering value.
    #[default]
    Identity,
    /// `y = p1 * x + p0`
    Linear,
    /// `(p0 x² + p1 x + p2) / (p3 x² + p4 x + p5)`
    Rational,
    /// Text formula in the variable `X`.
    Algebraic,
    /// Value to value table with linear interpolation.
    ValueToValueInterpolation,
    /// Value to value table without interpolation.
    ValueToValue,
    /// `[min, max, value]` triplets plus a default value.
    ValueRangeToValue,
    ValueToText,
    ValueRangeToText,
    TextToValue,
    TextToText,
    BitfieldToText,
    /// MDF3 polynomial, six parameters.
    Polynomial,
    /// MDF3 exponential, seven parameters.
    Exponential,
    /// MDF3 logarithmic, seven parameters.
    Logarithmic,
    /// MDF3 ASAM-MCD2 date (CANopen DATE structure).
    Date,
    /// MDF3 ASAM-MCD2 time (CANopen TIME structure).
    Time,
    Unknown(u16),
}

impl ConversionType {
    pub fn from_mdf4(value: u8) -> Self {
        match value {
            0 => ConversionType::Identity,
            1 => ConversionType::Linear,
            2 => ConversionType::Rational,
            3 => ConversionType::Algebraic,
            4 => ConversionType::ValueToValueInterpolation,
            5 => ConversionType::ValueToValue,
            6 => ConversionType::ValueRangeToValue,
            7 => ConversionType::ValueToText,
            8 => ConversionType::ValueRangeToText,
            9 => ConversionType::TextToValue,
            10 => ConversionType::TextToText,
            11 => ConversionType::BitfieldToText,
            other => ConversionType::Unknown(other as u16),
        }
    }

    /// MDF4 code, `None` for the MDF3-only forms.
    pub fn to_mdf4(self) -> Option<u8> {
        match self {
            ConversionType::Identity => Some(0),
            ConversionType::Linear => Some(1),
            ConversionType::Rational => Some(2),
            ConversionType::Algebraic => Some(3),
            ConversionType::ValueToValueInterpolation => Some(4),
            ConversionType::ValueToValue => Some(5),
            ConversionType::ValueRangeToValue => Some(6),
            ConversionType::ValueToText => Some(7),
            ConversionType::ValueRangeToText => Some(8),
            ConversionType::TextToValue => Some(9),
            ConversionType::TextToText => Some(10),
            ConversionType::BitfieldToText => Some(11),
            _ => None,
        }
    }

    pub fn from_mdf3(value: u16) -> Self {
        match value {
            0 => ConversionType::Linear,
            1 => ConversionType::ValueToValueInterpolation,
            2 => ConversionType::ValueToValue,
            6 => ConversionType::Polynomial,
            7 => ConversionType::Exponential,
            8 => ConversionType::Logarithmic,
            9 => ConversionType::Rational,
            10 => ConversionType::Algebraic,
            11 => ConversionType::ValueToText,
            12 => ConversionType::ValueRangeToText,
            132 => ConversionType::Date,
            133 => ConversionType::Time,
            65535 => ConversionType::Identity,
            other => ConversionType::Unknown(other),
        }
    }

    /// MDF3 code, `None` for the MDF4-only forms.
    pub fn to_mdf3(self) -> Option<u16> {
        match self {
            ConversionType::Linear => Some(0),
            ConversionType::ValueToValueInterpolation => Some(1),
            ConversionType::ValueToValue => Some(2),
            ConversionType::Polynomial => Some(6),
            ConversionType::Exponential => Some(7),
            ConversionType::Logarithmic => Some(8),
            ConversionType::Rational => Some(9),
            ConversionType::Algebraic => Some(10),
            ConversionType::ValueToText => Some(11),
            ConversionType::ValueRangeToText => Some(12),
            ConversionType::Date => Some(132),
            ConversionType::Time => Some(133),
            ConversionType::Identity => Some(65535),
            _ => None,
        }
    }

    /// Conversions whose engineering value is text.
    pub fn yields_text(self) -> bool {
        matches!(
            self,
            ConversionType::ValueToText
                | ConversionType::ValueRangeToText
                | ConversionType::TextToText
                | ConversionType::BitfieldToText
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in 0..=11u8 {
            assert_eq!(ConversionType::from_mdf4(code).to_mdf4(), Some(code));
        }
        for code in [0u16, 1, 2, 6, 7, 8, 9, 10, 11, 12, 132, 133, 65535] {
            assert_eq!(ConversionType::from_mdf3(code).to_mdf3(), Some(code));
        }
        assert_eq!(ConversionType::Polynomial.to_mdf4(), None);
        assert_eq!(ConversionType::TextToText.to_mdf3(), None);
    }
}

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{IndexSource, MetaData};
use crate::Result;
use crate::codec::DecodedValue;
use crate::conversion::{self, ConversionType, EngValue};

/// A text or nested-conversion entry of a table conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionRef {
    Text(String),
    Conversion(Box<ChannelConversion>),
    /// An unset link; for defaults this means "keep the input".
    Empty,
}

impl ConversionRef {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConversionRef::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Raw to engineering value mapping attached to a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConversion {
    pub(crate) index: u64,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) unit: String,
    pub(crate) conversion_type: ConversionType,
    pub(crate) precision: Option<u8>,
    pub(crate) range: Option<(f64, f64)>,
    pub(crate) status_string: bool,
    pub(crate) formula: String,
    pub(crate) parameters: Vec<f64>,
    pub(crate) references: Vec<ConversionRef>,
    pub(crate) inverse: Option<Box<ChannelConversion>>,
    pub(crate) metadata: Option<MetaData>,
    pub(crate) index_source: IndexSource,
}

/// A detached conversion with its own index counter.
impl Default for ChannelConversion {
    fn default() -> Self {
        Self::new(&IndexSource::default())
    }
}

impl ChannelConversion {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next(), index_source)
    }

    pub(crate) fn with_index(index: u64, index_source: &IndexSource) -> Self {
        Self {
            index,
            name: String::new(),
            description: String::new(),
            unit: String::new(),
            conversion_type: ConversionType::Identity,
            precision: None,
            range: None,
            status_string: false,
            formula: String::new(),
            parameters: Vec::new(),
            references: Vec::new(),
            inverse: None,
            metadata: None,
            index_source: index_source.clone(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn set_unit(&mut self, unit: &str) {
        self.unit = unit.to_string();
    }

    pub fn conversion_type(&self) -> ConversionType {
        self.conversion_type
    }

    pub fn set_conversion_type(&mut self, conversion_type: ConversionType) {
        self.conversion_type = conversion_type;
    }

    pub fn is_precision_used(&self) -> bool {
        self.precision.is_some()
    }

    /// Number of decimals to display, when set.
    pub fn precision(&self) -> Option<u8> {
        self.precision
    }

    pub fn set_precision(&mut self, decimals: u8) {
        self.precision = Some(decimals);
    }

    pub fn is_range_used(&self) -> bool {
        self.range.is_some()
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    pub fn set_range(&mut self, min: f64, max: f64) {
        self.range = Some((min, max));
    }

    /// The MDF4 `cc_flags` derived from the optional fields.
    pub fn flags(&self) -> u16 {
        use crate::blocks::conversion_block::{
            CC_FLAG_PRECISION_VALID, CC_FLAG_RANGE_VALID, CC_FLAG_STATUS_STRING,
        };
        let mut flags = 0;
        if self.precision.is_some() {
            flags |= CC_FLAG_PRECISION_VALID;
        }
        if self.range.is_some() {
            flags |= CC_FLAG_RANGE_VALID;
        }
        if self.status_string {
            flags |= CC_FLAG_STATUS_STRING;
        }
        flags
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn set_formula(&mut self, formula: &str) {
        self.formula = formula.to_string();
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn nof_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter(&self, index: usize) -> Option<f64> {
        self.parameters.get(index).copied()
    }

    /// Parameter reinterpreted as raw bits (bit masks of bitfield conversions).
    pub fn parameter_as_u64(&self, index: usize) -> Option<u64> {
        self.parameter(index).map(f64::to_bits)
    }

    /// Sets parameter `index`, growing the list with zeros when needed.
    pub fn set_parameter(&mut self, index: usize, value: f64) {
        if self.parameters.len() <= index {
            self.parameters.resize(index + 1, 0.0);
        }
        self.parameters[index] = value;
    }

    pub fn set_parameter_as_u64(&mut self, index: usize, value: u64) {
        self.set_parameter(index, f64::from_bits(value));
    }

    pub fn references(&self) -> &[ConversionRef] {
        &self.references
    }

    pub fn reference(&self, index: usize) -> Option<&ConversionRef> {
        self.references.get(index)
    }

    fn slot(&mut self, index: usize) -> &mut ConversionRef {
        if self.references.len() <= index {
            self.references.resize(index + 1, ConversionRef::Empty);
        }
        &mut self.references[index]
    }

    /// Sets text reference `index` (table texts, defaults, text keys).
    pub fn set_text_reference(&mut self, index: usize, text: &str) {
        *self.slot(index) = ConversionRef::Text(text.to_string());
    }

    /// A fresh conversion sharing this file's index counter, to be placed
    /// with [`ChannelConversion::set_conversion_reference`].
    pub fn new_conversion(&self) -> ChannelConversion {
        ChannelConversion::new(&self.index_source)
    }

    pub fn set_conversion_reference(&mut self, index: usize, conversion: ChannelConversion) {
        *self.slot(index) = ConversionRef::Conversion(Box::new(conversion));
    }

    pub fn conversion_reference_mut(&mut self, index: usize) -> Option<&mut ChannelConversion> {
        match self.references.get_mut(index) {
            Some(ConversionRef::Conversion(cc)) => Some(cc),
            _ => None,
        }
    }

    pub fn inverse(&self) -> Option<&ChannelConversion> {
        self.inverse.as_deref()
    }

    pub fn create_inverse(&mut self) -> &mut ChannelConversion {
        let source = self.index_source.clone();
        self.inverse
            .get_or_insert_with(|| Box::new(ChannelConversion::new(&source)))
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }

    /// Applies the conversion to a raw value.
    ///
    /// Parameter lists are only validated here; a list of the wrong shape
    /// fails with [`crate::Error::ConversionParameterError`].
    pub fn convert(&self, raw: &DecodedValue) -> Result<EngValue> {
        conversion::convert(self, raw)
    }

    /// Numeric engineering value; text results yield `None`.
    pub fn convert_to_f64(&self, raw: &DecodedValue) -> Result<Option<f64>> {
        Ok(self.convert(raw)?.as_f64())
    }
}

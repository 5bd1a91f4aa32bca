use alloc::vec::Vec;

use super::{IndexSource, MetaData};
use crate::types::{ArrayStorage, ArrayType};

/// Flag: the dimension sizes change at run time.
pub const CA_FLAG_DYNAMIC_SIZE: u32 = 0x0001;
/// Flag: the array is an input quantity.
pub const CA_FLAG_INPUT_QUANTITY: u32 = 0x0002;
/// Flag: the array is an output quantity.
pub const CA_FLAG_OUTPUT_QUANTITY: u32 = 0x0004;
/// Flag: the array is a comparison quantity.
pub const CA_FLAG_COMPARISON_QUANTITY: u32 = 0x0008;
/// Flag: the array has an axis.
pub const CA_FLAG_AXIS: u32 = 0x0010;
/// Flag: the axis is fixed.
pub const CA_FLAG_FIXED_AXIS: u32 = 0x0020;
/// Flag: the array is stored in inverse (column major) layout.
pub const CA_FLAG_INVERSE_LAYOUT: u32 = 0x0040;
/// Flag: the scaling is left open ended.
pub const CA_FLAG_LEFT_OPEN_INTERVAL: u32 = 0x0080;

/// Multi-dimensional layout of a channel's values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelArray {
    pub(crate) index: u64,
    pub(crate) array_type: ArrayType,
    pub(crate) storage: ArrayStorage,
    pub(crate) flags: u32,
    pub(crate) byte_offset_base: i32,
    pub(crate) inval_bit_pos_base: u32,
    pub(crate) dimensions: Vec<u64>,
    pub(crate) metadata: Option<MetaData>,
}

impl ChannelArray {
    pub(crate) fn new(index_source: &IndexSource) -> Self {
        Self::with_index(index_source.next())
    }

    pub(crate) fn with_index(index: u64) -> Self {
        Self {
            index,
            array_type: ArrayType::Array,
            storage: ArrayStorage::CnTemplate,
            flags: 0,
            byte_offset_base: 0,
            inval_bit_pos_base: 0,
            dimensions: Vec::new(),
            metadata: None,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn array_type(&self) -> ArrayType {
        self.array_type
    }

    pub fn set_array_type(&mut self, array_type: ArrayType) {
        self.array_type = array_type;
    }

    pub fn storage(&self) -> ArrayStorage {
        self.storage
    }

    pub fn set_storage(&mut self, storage: ArrayStorage) {
        self.storage = storage;
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.flags = flags;
    }

    pub fn byte_offset_base(&self) -> i32 {
        self.byte_offset_base
    }

    pub fn set_byte_offset_base(&mut self, base: i32) {
        self.byte_offset_base = base;
    }

    pub fn inval_bit_pos_base(&self) -> u32 {
        self.inval_bit_pos_base
    }

    pub fn set_inval_bit_pos_base(&mut self, base: u32) {
        self.inval_bit_pos_base = base;
    }

    pub fn dimensions(&self) -> &[u64] {
        &self.dimensions
    }

    pub fn nof_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    pub fn set_dimensions(&mut self, dimensions: &[u64]) {
        self.dimensions = dimensions.to_vec();
    }

    /// Number of elements, the product of all dimension sizes.
    pub fn nof_elements(&self) -> u64 {
        if self.dimensions.is_empty() {
            return 0;
        }
        self.dimensions.iter().product()
    }

    pub fn metadata(&self) -> Option<&MetaData> {
        self.metadata.as_ref()
    }

    pub fn create_metadata(&mut self) -> &mut MetaData {
        self.metadata.get_or_insert_with(MetaData::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_count() {
        let mut ca = ChannelArray::with_index(1);
        assert_eq!(ca.nof_elements(), 0);
        ca.set_dimensions(&[3, 4]);
        assert_eq!(ca.nof_elements(), 12);
        assert_eq!(ca.nof_dimensions(), 2);
    }
}

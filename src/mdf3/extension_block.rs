use alloc::string::String;
use alloc::vec::Vec;

use super::{parse_block_header, push_block_header};
use crate::blocks::{read_fixed_str, read_u16, read_u32, validate_buffer_size, write_fixed_str};
use crate::{Error, Result};

/// Extension type: ECU described by a DIM module.
pub const CE3_TYPE_DIM: u16 = 2;
/// Extension type: Vector CAN message.
pub const CE3_TYPE_VECTOR_CAN: u16 = 19;

/// MDF3 channel extension block, the MDF3 form of source information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ce3Block {
    Dim {
        module: u16,
        address: u32,
        description: String,
        ecu_id: String,
    },
    VectorCan {
        can_id: u32,
        can_channel: u32,
        message_name: String,
        sender_name: String,
    },
}

impl Ce3Block {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        parse_block_header(bytes, "CE")?;
        validate_buffer_size(bytes, 6)?;
        match read_u16(bytes, 4) {
            CE3_TYPE_DIM => {
                validate_buffer_size(bytes, 124)?;
                Ok(Ce3Block::Dim {
                    module: read_u16(bytes, 6),
                    address: read_u32(bytes, 8),
                    description: read_fixed_str(bytes, 12, 80),
                    ecu_id: read_fixed_str(bytes, 92, 32),
                })
            }
            CE3_TYPE_VECTOR_CAN => {
                validate_buffer_size(bytes, 86)?;
                Ok(Ce3Block::VectorCan {
                    can_id: read_u32(bytes, 6),
                    can_channel: read_u32(bytes, 10),
                    message_name: read_fixed_str(bytes, 14, 36),
                    sender_name: read_fixed_str(bytes, 50, 36),
                })
            }
            other => Err(Error::UnsupportedFeature(alloc::format!(
                "MDF3 channel extension type {other}"
            ))),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match self {
            Ce3Block::Dim {
                module,
                address,
                description,
                ecu_id,
            } => {
                push_block_header(&mut buffer, "CE", 124)?;
                buffer.extend_from_slice(&CE3_TYPE_DIM.to_le_bytes());
                buffer.extend_from_slice(&module.to_le_bytes());
                buffer.extend_from_slice(&address.to_le_bytes());
                write_fixed_str(&mut buffer, description, 80);
                write_fixed_str(&mut buffer, ecu_id, 32);
            }
            Ce3Block::VectorCan {
                can_id,
                can_channel,
                message_name,
                sender_name,
            } => {
                push_block_header(&mut buffer, "CE", 86)?;
                buffer.extend_from_slice(&CE3_TYPE_VECTOR_CAN.to_le_bytes());
                buffer.extend_from_slice(&can_id.to_le_bytes());
                buffer.extend_from_slice(&can_channel.to_le_bytes());
                write_fixed_str(&mut buffer, message_name, 36);
                write_fixed_str(&mut buffer, sender_name, 36);
            }
        }
        Ok(buffer)
    }
}

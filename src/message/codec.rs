//! Payload Codec
//!
//! Converts typed request/response objects to and from the opaque `blob` of a
//! `ServiceMessage`. JSON is the default; bincode matches the compact framing used on
//! the UDP transport.

use crate::error::CommandError;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadCodec {
    #[default]
    Json,
    Bincode,
}

impl PayloadCodec {
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CommandError> {
        match self {
            PayloadCodec::Json => Ok(serde_json::to_vec(value)?),
            PayloadCodec::Bincode => Ok(bincode::serialize(value)?),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CommandError> {
        match self {
            PayloadCodec::Json => Ok(serde_json::from_slice(bytes)?),
            PayloadCodec::Bincode => Ok(bincode::deserialize(bytes)?),
        }
    }
}

use crate::message::{WsRequest, WsResponse};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Empty frame")]
    EmptyFrame,
}

/// Envelope codec used by the connection manager.
///
/// Encoding happens before the connection lock is taken, so implementations
/// must be cheap to share across tasks.
pub trait Codec: Send + Sync {
    fn encode(&self, request: &WsRequest) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, data: &[u8]) -> Result<WsResponse, CodecError>;
}

/// JSON codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, request: &WsRequest) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(request)?)
    }

    fn decode(&self, data: &[u8]) -> Result<WsResponse, CodecError> {
        if data.is_empty() {
            return Err(CodecError::EmptyFrame);
        }
        Ok(serde_json::from_slice(data)?)
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstructionError {
    #[error("instruction id does not match its content")]
    IdMismatch,

    #[error("invalid signature on instruction {id}")]
    InvalidSignature { id: String },

    #[error("malformed {field} address: {value}")]
    MalformedAddress { field: &'static str, value: String },

    #[error("nonce must be at least 1")]
    ZeroNonce,

    #[error("empty instruction kind tag")]
    EmptyKind,

    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
}

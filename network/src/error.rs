use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("frame payload of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    #[error("codec failure: {0}")]
    Codec(String),

    #[error("peer {0} is unreachable")]
    PeerUnreachable(String),
}

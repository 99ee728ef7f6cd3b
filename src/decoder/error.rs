use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("log too short: {0} bytes, header needs {1}")]
    TooShort(usize, usize),
    #[error("bad header: {0}")]
    BadHeader(&'static str),
    #[error("unsupported log version {0}")]
    UnsupportedVersion(u8),
    #[error("truncated frame: {0} trailing bytes after frame {1}")]
    TruncatedFrame(usize, usize),
}

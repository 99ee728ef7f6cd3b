mod error;
mod format;
mod sample;

pub use error::DecodeError;
pub use format::decode;
pub use sample::{DecodedLog, GeoPosition, Sample};

pub mod error;
pub mod formations;
pub mod logs;

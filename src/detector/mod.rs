mod detector;
mod events;

pub use detector::{descent_rates, detect};
pub use events::{DetectedEvents, EventKind, JumpEvent};

//! Download Engine
//!
//! - [`Transfer`]: one resumable download and its worker
//! - [`Registry`]: the owning collection, id allocation, lifecycle operations
//! - [`StopSignal`]: per-run cooperative cancellation

mod registry;
mod signal;
mod transfer;

pub use registry::*;
pub use signal::*;
pub use transfer::Transfer;

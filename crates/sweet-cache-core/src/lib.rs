//! sweet-cache-core: Core contracts and types for the sweet-cache library
//!
//! This crate holds the pieces every tier agrees on: the store and cache
//! contracts, the value provider contract, the entry and result types, the
//! clock abstraction and the monitoring hooks.

mod clock;
mod error;
mod traits;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;

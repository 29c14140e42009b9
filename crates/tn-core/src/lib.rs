//! tn-core: stable foundation for tanknet.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real, finiteness and length checks, norms)
//! - grid (grid shape, tank indices, state-vector block layout)
//! - error (shared error types)

pub mod error;
pub mod grid;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TnError, TnResult};
pub use grid::*;
pub use numeric::*;
pub use units::*;

//! Banded linear algebra for tank network steps.
//!
//! The tank network couples every tank only to itself and its upstream
//! neighbours, so all operators are banded. This crate stores only the band,
//! factorizes it without pivoting, and provides central differences for
//! checking Jacobian-vector products.

pub mod banded;
pub mod error;
pub mod jacobian;

pub use banded::{BandedLu, BandedMatrix, factorize};
pub use error::{SolverError, SolverResult};
pub use jacobian::central_difference_jvp;

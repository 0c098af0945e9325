//! Symbolic differentiation, polynomial helpers and numeric integration.

mod derivative;
mod integral;
mod polynomial;

pub use derivative::differentiate;
pub use integral::{simpson, INTERVALS};
pub use polynomial::{annotate, polynomial_degree};

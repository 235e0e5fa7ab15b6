//! Command implementations for pki-ops

pub mod benchmark;
pub mod crl;
pub mod rotate;

pub use benchmark::run_benchmark;
pub use crl::run_crl;
pub use rotate::run_rotate;

//! Shared infrastructure.

pub mod interner;

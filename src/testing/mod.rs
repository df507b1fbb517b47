//! Helpers for testing applications that put their routes behind a gate.

pub mod assertions;
#[cfg(test)]
pub mod fixtures;
pub mod setup;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod models;
pub mod traits;

pub use models::error::QuoterError;

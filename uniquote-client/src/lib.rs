#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod builder;
pub mod cli;
pub mod config;
pub mod engine;

#[cfg(test)]
pub mod test_fixtures;

pub use builder::QuoterBuilder;
pub use config::QuoterSettings;
pub use engine::{
    watcher::{QuoteChanged, WatchedQuote},
    QuoterEngine,
};

pub mod buffer;
pub mod clock;
pub mod config;
pub mod day;
pub mod db;
pub mod error;
pub mod logger;
pub mod persister;
pub mod platform;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod tracker;

#[cfg(test)]
mod test_utils;

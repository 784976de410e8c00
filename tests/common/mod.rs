#![allow(dead_code)]

pub mod fixtures;
pub mod recording_logger;
pub mod strategies;

pub use fixtures::*;

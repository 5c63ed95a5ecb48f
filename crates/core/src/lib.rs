#![forbid(unsafe_code)]

pub mod error;
pub mod filter;
pub mod model;
pub mod numbers;
pub mod time;
pub mod verify;

pub use time::Clock;

pub mod backend;
pub mod board;
pub mod config;
pub mod errors;
pub mod logging;

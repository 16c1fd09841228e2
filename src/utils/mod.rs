//! Shared helpers: logging setup, timing, text shaping

pub mod logger;
pub mod text;
pub mod timer;

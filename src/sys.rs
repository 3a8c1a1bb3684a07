//! Interfaces to the host windowing environment, plus headless stand-ins.

pub mod geometry;
pub mod prompt;
pub mod screen;
pub mod window_server;

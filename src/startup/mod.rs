//! Startup logging

pub mod logger;

pub use logger::StartupLogger;

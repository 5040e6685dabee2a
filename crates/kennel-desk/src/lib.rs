pub mod boarding;
pub mod config;
pub mod error;
pub mod telemetry;

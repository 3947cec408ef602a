//! BatterySense library
//!
//! Battery analytics and notification throttling: sensing, health and usage
//! analysis, predictions, and the polling service that ties them together.

pub mod analytics;
pub mod core;
pub mod db;
pub mod hardware;
pub mod monitor;
pub mod notifications;

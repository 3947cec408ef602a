//! Battery analytics
//!
//! - Health/wear estimation from capacity and cycle count
//! - Usage analysis over the rolling history
//! - Time-to-threshold predictions
//! - Live tips for the current snapshot

pub mod advice;
pub mod health;
pub mod predictor;
pub mod usage;

pub use advice::{current_tips, Tip};
pub use health::{capacity_percent, health_report, health_score, wear_percent, HealthReport, HealthTier};
pub use predictor::{
    estimated_time_remaining, predict_charging_time_to_full, predict_optimal_charge_time,
    ChargeTimeHint, Predictions,
};
pub use usage::{
    analyze_battery_usage, drain_rate_series, extract_charging_sessions, ChargingFrequency,
    DrainSample, Recommendation, RecommendationKind, UsageAnalysis,
};

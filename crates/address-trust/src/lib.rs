//! Evidence aggregation and confidence scoring for self-declared addresses.
//!
//! Independent, individually weak evidence signals (grid match, delivery and
//! device activity, documentary coverage, community confirmation, landmark
//! language, geospatial precision) are combined into an Address Confidence
//! Score, a Validation Level, reason codes, suggestions, and risk metrics.
//! The [`calibration`] module validates and recalibrates the combination
//! against a labeled ground-truth corpus.

pub mod calibration;
pub mod config;
pub mod corpus;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod geo;
pub mod linguistic;
pub mod scoring;
pub mod telemetry;

pub use domain::{Address, Coordinate, ValidationLevel};
pub use scoring::{ScoreResult, ScoringEngine};

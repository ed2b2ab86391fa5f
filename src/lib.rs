//! Tunergia comparador engine
//!
//! Client-side savings recalculation for tariff comparisons: power-rule
//! validation, ascending-power auto-correction, cost reconstruction from
//! edited contracted power, and webhook payload normalization.

pub mod core;
pub mod payload;
pub mod recalc;
pub mod session;

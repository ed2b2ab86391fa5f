//! Comparison session state
//!
//! Holds the pristine comparison received from invoice analysis together
//! with the snapshot recalculated from user-edited power values. Every
//! recalculation starts from the pristine data, so repeated edits replace
//! the previous snapshot instead of stacking on top of it.

use crate::core::{Analysis, Comparison, PowerVector, ValidationReport};
use crate::recalc::RecalcEngine;
use chrono::Utc;

/// Power-adjustment state of a session
///
/// The adjusted snapshot and the power vector it was derived from live in
/// the same variant.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Showing the comparison exactly as received
    Original,
    /// Showing a snapshot recalculated from an edited power vector
    Adjusted {
        data: Comparison,
        overlay: PowerVector,
    },
}

/// One analyzed invoice and its power-adjustment lifecycle
///
/// The comparison captured at construction is never modified; reset is
/// always possible and every recalculation is a fresh computation from it.
pub struct ComparisonSession {
    /// Pristine comparison captured before any edits
    original: Comparison,
    /// Current adjustment state
    state: SessionState,
    /// Unix timestamp of when the comparison was received
    received_at: i64,
}

impl ComparisonSession {
    /// Start a session for a freshly received comparison
    pub fn new(comparison: Comparison) -> Self {
        Self {
            original: comparison,
            state: SessionState::Original,
            received_at: Utc::now().timestamp(),
        }
    }

    /// The comparison as received, before any edits
    pub fn original(&self) -> &Comparison {
        &self.original
    }

    /// The comparison currently shown, adjusted snapshot if one exists
    pub fn current(&self) -> &Comparison {
        match &self.state {
            SessionState::Original => &self.original,
            SessionState::Adjusted { data, .. } => data,
        }
    }

    /// Current adjustment state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether an adjusted snapshot is being shown
    pub fn is_adjusted(&self) -> bool {
        matches!(self.state, SessionState::Adjusted { .. })
    }

    /// The edited power vector behind the adjusted snapshot, if any
    pub fn adjusted_power(&self) -> Option<&PowerVector> {
        match &self.state {
            SessionState::Original => None,
            SessionState::Adjusted { overlay, .. } => Some(overlay),
        }
    }

    /// When the comparison was received, as a Unix timestamp
    pub fn received_at(&self) -> i64 {
        self.received_at
    }

    /// Validate the edited power vector and recalculate the comparison
    ///
    /// On success the session moves to the adjusted state and the new
    /// snapshot is returned. On validation failure the full error list is
    /// returned and the session keeps whatever it was showing before.
    pub fn recalculate(
        &mut self,
        engine: &RecalcEngine,
        new_power: &PowerVector,
    ) -> Result<&Comparison, ValidationReport> {
        let report = engine.validate_power_values(
            new_power,
            &self.original.tarifa_acceso,
            self.original.num_power_periods,
        );
        if !report.is_valid {
            return Err(report);
        }

        let mut data = self.original.clone();
        data.top_3_offers = engine.recalculate_offers_with_power(&self.original, new_power);
        data.potencia_contratada = *new_power;
        data.analysis = data
            .top_3_offers
            .first()
            .map(Analysis::from_best_offer)
            .unwrap_or_default();

        log::debug!(
            "Recalculated comparison with edited power, best savings {:.2}",
            data.analysis.best_savings
        );

        self.state = SessionState::Adjusted {
            data,
            overlay: *new_power,
        };
        Ok(self.current())
    }

    /// Discard the adjusted snapshot and show the original again
    pub fn reset(&mut self) {
        if self.is_adjusted() {
            log::debug!("Session reset to original comparison");
        }
        self.state = SessionState::Original;
    }
}

//! Savings recalculation engine for tariff comparisons
//!
//! Recomputes offer costs from edited contracted-power values:
//! - Power-rule validation per access tariff (ascending, max power, P6 floor, positivity)
//! - Best-effort ascending auto-correction
//! - Cost-chain reconstruction and descending-savings re-ranking

use crate::core::{
    Comparison, CurrentBill, Offer, PowerVector, TariffTable, ValidationReport, MAX_PERIODS,
};

/// Fixed billing-period day count used for the power term, all tariffs
pub const AVG_POWER_DAYS: f64 = 30.0;

/// Spanish electricity tax rate (impuesto especial sobre la electricidad)
pub const IMPUESTO_ELECTRICO_RATE: f64 = 0.0511270000;

/// VAT rate applied on top of the taxed subtotal
pub const IVA_RATE: f64 = 0.21;

/// Round a monetary value to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Engine that validates contracted power and recomputes offer savings
pub struct RecalcEngine {
    rules: TariffTable,
}

impl RecalcEngine {
    /// Create a new engine with the given tariff rule table
    pub fn new(rules: &TariffTable) -> Self {
        Self {
            rules: rules.clone(),
        }
    }

    /// Update the tariff rule table
    pub fn update_rules(&mut self, rules: &TariffTable) {
        self.rules = rules.clone();
    }

    /// Validate edited power values against the tariff's rule set
    ///
    /// Accumulates every violation instead of stopping at the first, so the
    /// caller can surface the full list at once. Unrecognized tariff codes
    /// are validated against the default rule set.
    pub fn validate_power_values(
        &self,
        powers: &PowerVector,
        tarifa: &str,
        period_count: usize,
    ) -> ValidationReport {
        let rule = self.rules.rules_for(tarifa);
        let period_count = period_count.min(MAX_PERIODS);
        let mut errors = Vec::new();

        if rule.ascending {
            for period in 2..=period_count {
                let prev = powers.get(period - 1);
                let curr = powers.get(period);
                if curr < prev {
                    errors.push(format!(
                        "P{} ({} kW) debe ser \u{2265} P{} ({} kW)",
                        period,
                        curr,
                        period - 1,
                        prev
                    ));
                }
            }
        }

        if let Some(max) = rule.max_power {
            for period in 1..=period_count {
                let value = powers.get(period);
                if value > max {
                    errors.push(format!(
                        "P{} ({} kW) supera el m\u{00E1}ximo de {} kW para la tarifa {}",
                        period, value, max, tarifa
                    ));
                }
            }
        }

        if let Some(min) = rule.min_p6 {
            if period_count >= 6 {
                let p6 = powers.get(6);
                if p6 < min {
                    errors.push(format!(
                        "P6 ({} kW) debe ser \u{2265} {} kW para la tarifa {}",
                        p6, min, tarifa
                    ));
                }
            }
        }

        for period in 1..=period_count {
            if powers.get(period) <= 0.0 {
                errors.push(format!("P{} debe ser mayor que 0 kW", period));
            }
        }

        ValidationReport::from_errors(errors)
    }

    /// Auto-correct a power vector so it satisfies the tariff's rule set
    ///
    /// One left-to-right pass raises each period to its immediate
    /// predecessor, then the P6 floor is applied, then every period is
    /// clamped down to the tariff maximum. The clamp runs last so a raise
    /// can itself be clamped back. Returns a new vector; the input is not
    /// modified. This helper is not called by the recalculation path.
    pub fn enforce_ascending_power(
        &self,
        powers: &PowerVector,
        period_count: usize,
        tarifa: &str,
    ) -> PowerVector {
        let rule = self.rules.rules_for(tarifa);
        let period_count = period_count.min(MAX_PERIODS);
        let mut adjusted = *powers;

        for period in 2..=period_count {
            let prev = adjusted.get(period - 1);
            if adjusted.get(period) < prev {
                adjusted.set(period, prev);
            }
        }

        if let Some(min) = rule.min_p6 {
            if period_count >= 6 && adjusted.get(6) < min {
                adjusted.set(6, min);
            }
        }

        if let Some(max) = rule.max_power {
            for period in 1..=period_count {
                if adjusted.get(period) > max {
                    adjusted.set(period, max);
                }
            }
        }

        adjusted
    }

    /// Recompute every offer's cost chain from a validated power vector
    ///
    /// Energy cost is carried through unchanged; only the power term is
    /// rebuilt. The returned list is sorted by descending savings, stable
    /// on ties. The input comparison is not modified, and the caller is
    /// expected to refresh its analysis block from the first element.
    pub fn recalculate_offers_with_power(
        &self,
        comparison: &Comparison,
        new_power: &PowerVector,
    ) -> Vec<Offer> {
        let period_count = comparison.num_power_periods.min(MAX_PERIODS);

        let mut offers: Vec<Offer> = comparison
            .top_3_offers
            .iter()
            .map(|offer| {
                self.recalculate_offer(offer, new_power, period_count, &comparison.current_bill)
            })
            .collect();

        offers.sort_by(|a, b| {
            b.savings
                .partial_cmp(&a.savings)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        offers
    }

    // Private helpers

    /// Rebuild one offer's cost chain from the edited power vector
    ///
    /// Per-period figures are rounded to 2 decimals for storage only; the
    /// running sum and the subtotal/tax/IVA chain stay unrounded until the
    /// final total. Savings derive from the rounded total, and the annual
    /// figure from the rounded monthly savings.
    fn recalculate_offer(
        &self,
        offer: &Offer,
        new_power: &PowerVector,
        period_count: usize,
        bill: &CurrentBill,
    ) -> Offer {
        let mut result = offer.clone();

        let mut power_costs = [0.0; MAX_PERIODS];
        let mut total_power_cost = 0.0;
        for period in 1..=period_count {
            let unit_price = offer.potencia_precios[period - 1];
            let cost = new_power.get(period) * AVG_POWER_DAYS * unit_price;
            power_costs[period - 1] = round2(cost);
            total_power_cost += cost;
        }

        let subtotal = offer.total_energy_cost + total_power_cost;
        let impuesto = subtotal * IMPUESTO_ELECTRICO_RATE;
        let with_extras = subtotal + impuesto + bill.alquiller;
        let iva = with_extras * IVA_RATE;
        let total = round2(with_extras + iva);

        let savings = round2(bill.total - total);
        let savings_percent = if bill.total > 0.0 {
            round2(savings / bill.total * 100.0)
        } else {
            0.0
        };

        result.power_costs = power_costs;
        result.total_power_cost = round2(total_power_cost);
        result.impuesto_electrico = round2(impuesto);
        result.iva = round2(iva);
        result.total = total;
        result.savings = savings;
        result.savings_percent = savings_percent;
        result.monthly_savings = savings;
        result.annual_savings = round2(savings * 12.0);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Analysis, PowerRule};

    fn engine() -> RecalcEngine {
        RecalcEngine::new(&TariffTable::default())
    }

    fn sample_offer(compania: &str, energy_cost: f64, pot_prices: &[f64]) -> Offer {
        let mut potencia_precios = [0.0; MAX_PERIODS];
        potencia_precios[..pot_prices.len()].copy_from_slice(pot_prices);
        Offer {
            compania: compania.to_string(),
            producto: "Plan Estable".to_string(),
            total_energy_cost: energy_cost,
            potencia_precios,
            ..Offer::default()
        }
    }

    fn sample_comparison(offers: Vec<Offer>) -> Comparison {
        Comparison {
            current_bill: CurrentBill {
                total: 100.0,
                alquiller: 5.0,
            },
            top_3_offers: offers,
            num_energy_periods: 3,
            num_power_periods: 2,
            tarifa_acceso: "2.0TD".to_string(),
            analysis: Analysis::default(),
            cups: None,
            potencia_contratada: PowerVector::from_periods(&[4.0, 2.0]),
        }
    }

    #[test]
    fn test_round2() {
        assert!((round2(66.845083) - 66.85).abs() < f64::EPSILON);
        assert!((round2(2.4438706) - 2.44).abs() < f64::EPSILON);
        assert!((round2(7.0) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validation_idempotent() {
        let engine = engine();
        let power = PowerVector::from_periods(&[10.0, 9.0, 11.0, 11.0, 11.0, 16.0]);

        let first = engine.validate_power_values(&power, "3.0TD", 6);
        let second = engine.validate_power_values(&power, "3.0TD", 6);

        assert_eq!(first, second);
    }

    #[test]
    fn test_ascending_violation_detected() {
        let engine = engine();
        let power = PowerVector::from_periods(&[10.0, 9.0, 11.0, 11.0, 11.0, 16.0]);

        let report = engine.validate_power_values(&power, "3.0TD", 6);

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0], "P2 (9 kW) debe ser \u{2265} P1 (10 kW)");
    }

    #[test]
    fn test_max_power_boundary() {
        let engine = engine();

        let at_limit = PowerVector::from_periods(&[15.0, 15.0]);
        assert!(engine.validate_power_values(&at_limit, "2.0TD", 2).is_valid);

        let over = PowerVector::from_periods(&[15.01, 15.01]);
        let report = engine.validate_power_values(&over, "2.0TD", 2);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(
            report.errors[0],
            "P1 (15.01 kW) supera el m\u{00E1}ximo de 15 kW para la tarifa 2.0TD"
        );
        assert_eq!(
            report.errors[1],
            "P2 (15.01 kW) supera el m\u{00E1}ximo de 15 kW para la tarifa 2.0TD"
        );
    }

    #[test]
    fn test_zero_power_rejected() {
        let engine = engine();

        let power = PowerVector::from_periods(&[4.6, 0.0]);
        let report = engine.validate_power_values(&power, "2.0TD", 2);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0], "P2 debe ser mayor que 0 kW");

        // A zero mid-period under 3.0TD trips the ascending check too.
        let power = PowerVector::from_periods(&[10.0, 10.0, 0.0, 10.0, 10.0, 15.1]);
        let report = engine.validate_power_values(&power, "3.0TD", 6);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0], "P3 (0 kW) debe ser \u{2265} P2 (10 kW)");
        assert_eq!(report.errors[1], "P3 debe ser mayor que 0 kW");
    }

    #[test]
    fn test_unknown_tariff_validated_with_default_rules() {
        let engine = engine();
        let power = PowerVector::from_periods(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0]);

        let report = engine.validate_power_values(&power, "9.9ZZ", 6);

        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(
            report.errors[0],
            "P6 (10 kW) debe ser \u{2265} 15.1 kW para la tarifa 9.9ZZ"
        );
    }

    #[test]
    fn test_updated_rules_change_validation() {
        let mut engine = engine();
        let power = PowerVector::from_periods(&[16.0, 16.0]);

        assert!(!engine.validate_power_values(&power, "2.0TD", 2).is_valid);

        // A regulatory cap change arrives as a fresh rule table.
        let mut table = TariffTable::default();
        table.td_20.max_power = Some(20.0);
        engine.update_rules(&table);

        assert!(engine.validate_power_values(&power, "2.0TD", 2).is_valid);
    }

    #[test]
    fn test_enforce_raises_only_against_predecessor() {
        let engine = engine();
        let power = PowerVector::from_periods(&[10.0, 9.0, 11.0, 11.0, 11.0, 16.0]);

        let adjusted = engine.enforce_ascending_power(&power, 6, "3.0TD");

        assert!((adjusted.get(1) - 10.0).abs() < 0.001);
        assert!((adjusted.get(2) - 10.0).abs() < 0.001);
        assert!((adjusted.get(3) - 11.0).abs() < 0.001);
        assert!((adjusted.get(6) - 16.0).abs() < 0.001);
        assert!((power.get(2) - 9.0).abs() < 0.001);
    }

    #[test]
    fn test_enforce_propagates_raises_forward() {
        let engine = engine();
        let power = PowerVector::from_periods(&[5.0, 3.0, 4.0, 4.0, 4.0, 16.0]);

        let adjusted = engine.enforce_ascending_power(&power, 6, "3.0TD");

        assert!((adjusted.get(2) - 5.0).abs() < 0.001);
        assert!((adjusted.get(3) - 5.0).abs() < 0.001);
        assert!((adjusted.get(4) - 5.0).abs() < 0.001);
        assert!((adjusted.get(5) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_enforce_raises_p6_to_floor() {
        let engine = engine();
        let power = PowerVector::from_periods(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0]);

        let adjusted = engine.enforce_ascending_power(&power, 6, "3.0TD");

        assert!((adjusted.get(6) - 15.1).abs() < 0.001);
    }

    #[test]
    fn test_enforce_clamps_after_raising() {
        let table = TariffTable {
            td_30: PowerRule {
                max_power: Some(14.0),
                min_p6: Some(15.1),
                period_count: 6,
                ascending: true,
            },
            ..TariffTable::default()
        };
        let engine = RecalcEngine::new(&table);
        let power = PowerVector::from_periods(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0]);

        let adjusted = engine.enforce_ascending_power(&power, 6, "3.0TD");

        assert!((adjusted.get(6) - 14.0).abs() < 0.001);
    }

    #[test]
    fn test_enforce_clamps_to_max() {
        let engine = engine();
        let power = PowerVector::from_periods(&[14.0, 17.5]);

        let adjusted = engine.enforce_ascending_power(&power, 2, "2.0TD");

        assert!((adjusted.get(1) - 14.0).abs() < 0.001);
        assert!((adjusted.get(2) - 15.0).abs() < 0.001);
    }

    #[test]
    fn test_recalculation_arithmetic() {
        let engine = engine();
        let comparison = sample_comparison(vec![sample_offer("Iberdrola", 40.0, &[0.05, 0.03])]);
        let power = PowerVector::from_periods(&[4.0, 2.0]);

        let offers = engine.recalculate_offers_with_power(&comparison, &power);
        let offer = &offers[0];

        assert!((offer.power_costs[0] - 6.0).abs() < 0.001);
        assert!((offer.power_costs[1] - 1.8).abs() < 0.001);
        assert!((offer.total_power_cost - 7.8).abs() < 0.001);
        assert!((offer.total_energy_cost - 40.0).abs() < 0.001);
        assert!((offer.impuesto_electrico - 2.44).abs() < 0.001);
        assert!((offer.iva - 11.6).abs() < 0.001);
        assert!((offer.total - 66.85).abs() < 0.001);
        assert!((offer.savings - 33.15).abs() < 0.001);
        assert!((offer.savings_percent - 33.15).abs() < 0.001);
        assert!((offer.monthly_savings - 33.15).abs() < 0.001);
        assert!((offer.annual_savings - 397.80).abs() < 0.001);
    }

    #[test]
    fn test_energy_cost_never_recomputed() {
        let engine = engine();
        let mut offer = sample_offer("Endesa", 52.37, &[0.05, 0.03]);
        offer.energia_precios[0] = 0.18;
        let comparison = sample_comparison(vec![offer]);
        let power = PowerVector::from_periods(&[9.2, 9.2]);

        let offers = engine.recalculate_offers_with_power(&comparison, &power);

        assert!((offers[0].total_energy_cost - 52.37).abs() < f64::EPSILON);
        assert!((offers[0].energia_precios[0] - 0.18).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ranking_stable_on_equal_savings() {
        let engine = engine();
        let worse = sample_offer("CompA", 60.0, &[0.08, 0.05]);
        let tied_first = sample_offer("CompB", 40.0, &[0.05, 0.03]);
        let tied_second = sample_offer("CompC", 40.0, &[0.05, 0.03]);
        let comparison = sample_comparison(vec![worse, tied_first, tied_second]);
        let power = PowerVector::from_periods(&[4.0, 2.0]);

        let offers = engine.recalculate_offers_with_power(&comparison, &power);

        assert_eq!(offers[0].compania, "CompB");
        assert_eq!(offers[1].compania, "CompC");
        assert_eq!(offers[2].compania, "CompA");
        assert!(offers[2].savings < offers[0].savings);
    }

    #[test]
    fn test_zero_bill_total_gives_zero_percent() {
        let engine = engine();
        let mut comparison = sample_comparison(vec![sample_offer("Endesa", 40.0, &[0.05, 0.03])]);
        comparison.current_bill.total = 0.0;
        let power = PowerVector::from_periods(&[4.0, 2.0]);

        let offers = engine.recalculate_offers_with_power(&comparison, &power);

        assert!((offers[0].savings_percent - 0.0).abs() < f64::EPSILON);
        assert!(offers[0].savings < 0.0);
    }
}

//! Common types shared across the engine

use serde::{Deserialize, Serialize};

/// Maximum number of billing periods across all access tariffs
pub const MAX_PERIODS: usize = 6;

/// Regulatory access-tariff classification
///
/// Determines the applicable power rule set. Codes outside this enum exist
/// in the wild; rule lookups resolve them to the named default tariff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TariffCode {
    /// Low-voltage supplies up to 15 kW (2 power periods)
    #[serde(rename = "2.0TD")]
    Td20,
    /// Low-voltage supplies above 15 kW (6 power periods)
    #[serde(rename = "3.0TD")]
    Td30,
    /// High-voltage supplies (6 power periods)
    #[serde(rename = "6.1TD")]
    Td61,
}

impl TariffCode {
    /// Parse an access-tariff code as it appears in the webhook payload
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "2.0TD" => Some(Self::Td20),
            "3.0TD" => Some(Self::Td30),
            "6.1TD" => Some(Self::Td61),
            _ => None,
        }
    }

    /// The code as it appears in payloads and on invoices
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Td20 => "2.0TD",
            Self::Td30 => "3.0TD",
            Self::Td61 => "6.1TD",
        }
    }
}

impl std::fmt::Display for TariffCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contracted power per billing period (P1..P6), in kW
///
/// Periods beyond a tariff's period count stay at 0 and are ignored by
/// every operation that receives the period count alongside the vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerVector([f64; MAX_PERIODS]);

impl PowerVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from per-period values starting at P1
    ///
    /// Entries beyond P6 are ignored; missing trailing periods stay at 0.
    pub fn from_periods(values: &[f64]) -> Self {
        let mut periods = [0.0; MAX_PERIODS];
        for (index, value) in values.iter().take(MAX_PERIODS).enumerate() {
            periods[index] = *value;
        }
        Self(periods)
    }

    /// Value for a 1-based period index
    ///
    /// Panics if `period` is outside 1..=6; an out-of-range period is a
    /// caller bug, not a user-correctable condition.
    pub fn get(&self, period: usize) -> f64 {
        assert!(
            (1..=MAX_PERIODS).contains(&period),
            "period index {} out of range",
            period
        );
        self.0[period - 1]
    }

    /// Set the value for a 1-based period index
    ///
    /// Panics if `period` is outside 1..=6.
    pub fn set(&mut self, period: usize, value: f64) {
        assert!(
            (1..=MAX_PERIODS).contains(&period),
            "period index {} out of range",
            period
        );
        self.0[period - 1] = value;
    }
}

/// Baseline invoice the offers are compared against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentBill {
    /// Current monthly cost, EUR
    #[serde(default)]
    pub total: f64,
    /// Equipment rental monthly charge, EUR (field spelled as the webhook
    /// sends it)
    #[serde(default)]
    pub alquiller: f64,
}

/// A candidate product returned by the invoice analysis
///
/// Unit prices and `total_energy_cost` come from the backend and are never
/// recomputed here; the cost breakdown fields are overwritten whenever the
/// engine recalculates the offer for an edited power vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Supplier name
    #[serde(default)]
    pub compania: String,
    /// Product/plan name
    #[serde(default)]
    pub producto: String,
    /// Energy unit prices per period, EUR/kWh (payload `energia_p1..p6`)
    #[serde(default)]
    pub energia_precios: [f64; MAX_PERIODS],
    /// Power unit prices per period, EUR/kW/day (payload `pot_1..pot_6`)
    #[serde(default)]
    pub potencia_precios: [f64; MAX_PERIODS],
    /// Energy term cost for the billing period, EUR; fixed input, carried
    /// through recalculation unchanged
    #[serde(default)]
    pub total_energy_cost: f64,
    /// Power term cost per period, EUR (payload `power_cost_p1..p6`)
    #[serde(default)]
    pub power_costs: [f64; MAX_PERIODS],
    /// Power term total, EUR
    #[serde(default)]
    pub total_power_cost: f64,
    /// Electricity tax on the energy+power subtotal, EUR
    #[serde(default)]
    pub impuesto_electrico: f64,
    /// VAT, EUR
    #[serde(default)]
    pub iva: f64,
    /// Invoice total under this offer, EUR
    #[serde(default)]
    pub total: f64,
    /// Monthly savings against the current bill, EUR
    #[serde(default)]
    pub savings: f64,
    /// Savings as a percentage of the current bill total
    #[serde(default)]
    pub savings_percent: f64,
    /// Savings projected over twelve months, EUR
    #[serde(default)]
    pub annual_savings: f64,
    /// Alias of `savings` kept for the results view
    #[serde(default)]
    pub monthly_savings: f64,
}

/// Summary of the best offer in a comparison
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub best_savings: f64,
    #[serde(default)]
    pub best_savings_percent: f64,
    #[serde(default)]
    pub annual_savings_estimate: f64,
}

impl Analysis {
    /// Rebuild the summary from the top-ranked offer
    pub fn from_best_offer(offer: &Offer) -> Self {
        Self {
            best_savings: offer.savings,
            best_savings_percent: offer.savings_percent,
            annual_savings_estimate: offer.annual_savings,
        }
    }
}

/// One analyzed invoice with its competing offers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub current_bill: CurrentBill,
    pub top_3_offers: Vec<Offer>,
    /// Energy periods billed under this tariff (3 for 2.0TD, else 6)
    pub num_energy_periods: usize,
    /// Power periods billed under this tariff (2 for 2.0TD, else 6)
    pub num_power_periods: usize,
    /// Raw access-tariff code as received, e.g. "3.0TD"
    pub tarifa_acceso: String,
    #[serde(default)]
    pub analysis: Analysis,
    /// Supply-point identifier; opaque to the engine
    #[serde(default)]
    pub cups: Option<String>,
    /// Contracted power on the analyzed bill; seed values for power edits
    #[serde(default)]
    pub potencia_contratada: PowerVector,
}

/// Outcome of validating a power vector against its tariff rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub is_valid: bool,
    /// Every violation found, in check order; callers must surface all of
    /// them, not just the first
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }
}

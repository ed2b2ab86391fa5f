//! Webhook payload parsing
//!
//! The invoice-analysis webhook wraps its comparison in several envelope
//! shapes depending on the caller (`datos`, `data.datos`, first array
//! element, or the bare object). The single normalization function lives
//! here so call sites never branch on envelope shape themselves.

use crate::core::{
    Analysis, Comparison, CurrentBill, Error, Offer, PowerVector, Result, TariffCode,
    DEFAULT_TARIFF, MAX_PERIODS,
};
use serde_json::Value;

/// Parse a raw webhook response body into a comparison
pub fn parse_comparison_str(raw: &str) -> Result<Comparison> {
    let value: Value = serde_json::from_str(raw)?;
    parse_comparison(&value)
}

/// Parse an already-deserialized webhook response into a comparison
///
/// Missing `current_bill` or a missing or empty `top_3_offers` list is a
/// contract violation upstream and is rejected rather than defaulted.
pub fn parse_comparison(value: &Value) -> Result<Comparison> {
    let datos = unwrap_envelope(value);

    let bill = datos
        .get("current_bill")
        .ok_or_else(|| Error::Payload("missing current_bill".to_string()))?;
    let offers = datos
        .get("top_3_offers")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Payload("missing top_3_offers".to_string()))?;
    if offers.is_empty() {
        return Err(Error::Payload("top_3_offers is empty".to_string()));
    }

    let tarifa_acceso = datos
        .get("tarifa_acceso")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TARIFF.as_str())
        .trim()
        .to_string();

    let (default_energy, default_power) = default_period_counts(&tarifa_acceso);
    let num_energy_periods = parse_period_count(datos.get("num_energy_periods"), default_energy);
    let num_power_periods = parse_period_count(datos.get("num_power_periods"), default_power);

    let top_3_offers: Vec<Offer> = offers
        .iter()
        .map(|offer| parse_offer(offer, num_energy_periods, num_power_periods))
        .collect();

    let analysis = datos
        .get("analysis")
        .map(parse_analysis)
        .unwrap_or_default();

    let cups = datos
        .get("cups")
        .and_then(Value::as_str)
        .map(str::to_string);

    log::debug!(
        "Parsed comparison payload: {} offers, tarifa {}",
        top_3_offers.len(),
        tarifa_acceso
    );

    Ok(Comparison {
        current_bill: parse_current_bill(bill),
        top_3_offers,
        num_energy_periods,
        num_power_periods,
        tarifa_acceso,
        analysis,
        cups,
        potencia_contratada: parse_power_vector(datos),
    })
}

/// Strip whichever envelope the webhook wrapped the comparison in
///
/// Tries `datos`, then `data.datos`, then `[0].datos`, and finally falls
/// back to the value itself.
pub fn unwrap_envelope(value: &Value) -> &Value {
    if let Some(datos) = value.get("datos") {
        return datos;
    }
    if let Some(datos) = value.get("data").and_then(|data| data.get("datos")) {
        return datos;
    }
    if let Some(datos) = value.get(0).and_then(|first| first.get("datos")) {
        return datos;
    }
    value
}

/// Coerce a JSON field to f64, defaulting to 0.0
///
/// Numbers pass through; strings are parsed after normalizing a decimal
/// comma; anything else coerces to 0.0. This coercion applies to webhook
/// payload fields only, never inside the recalculation math.
pub fn parse_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_period_count(value: Option<&Value>, default: usize) -> usize {
    let count = match value {
        Some(v) => {
            let parsed = parse_number(Some(v));
            if parsed >= 1.0 {
                parsed as usize
            } else {
                default
            }
        }
        None => default,
    };
    count.min(MAX_PERIODS)
}

/// Period counts used when the payload omits them
fn default_period_counts(tarifa: &str) -> (usize, usize) {
    match TariffCode::parse(tarifa) {
        Some(TariffCode::Td20) => (3, 2),
        _ => (6, 6),
    }
}

fn parse_current_bill(value: &Value) -> CurrentBill {
    CurrentBill {
        total: parse_number(value.get("total")),
        alquiller: parse_number(value.get("alquiller")),
    }
}

fn parse_offer(value: &Value, num_energy: usize, num_power: usize) -> Offer {
    let mut offer = Offer {
        compania: string_field(value, "compania"),
        producto: string_field(value, "producto"),
        total_energy_cost: parse_number(value.get("total_energy_cost")),
        total_power_cost: parse_number(value.get("total_power_cost")),
        impuesto_electrico: parse_number(value.get("impuesto_electrico")),
        iva: parse_number(value.get("iva")),
        total: parse_number(value.get("total")),
        savings: parse_number(value.get("savings")),
        savings_percent: parse_number(value.get("savings_percent")),
        annual_savings: parse_number(value.get("annual_savings")),
        monthly_savings: parse_number(value.get("monthly_savings")),
        ..Offer::default()
    };

    for period in 1..=num_energy {
        offer.energia_precios[period - 1] =
            parse_number(value.get(format!("energia_p{}", period)));
    }
    for period in 1..=num_power {
        offer.potencia_precios[period - 1] = parse_number(value.get(format!("pot_{}", period)));
        offer.power_costs[period - 1] =
            parse_number(value.get(format!("power_cost_p{}", period)));
    }

    offer
}

fn parse_analysis(value: &Value) -> Analysis {
    Analysis {
        best_savings: parse_number(value.get("best_savings")),
        best_savings_percent: parse_number(value.get("best_savings_percent")),
        annual_savings_estimate: parse_number(value.get("annual_savings_estimate")),
    }
}

fn parse_power_vector(datos: &Value) -> PowerVector {
    let mut powers = PowerVector::new();
    for period in 1..=MAX_PERIODS {
        powers.set(period, parse_number(datos.get(format!("potencia_p{}", period))));
    }
    powers
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

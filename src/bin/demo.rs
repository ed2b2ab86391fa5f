//! Tunergia Comparador - Demo CLI
//!
//! Demonstration of the recalculation engine: parses a webhook comparison
//! payload, edits contracted power, and shows validation, auto-correction,
//! recalculated savings, and reset.

// Import from our library
use tunergia_comparador_lib::core::{Config, Offer, PowerVector};
use tunergia_comparador_lib::payload::parse_comparison_str;
use tunergia_comparador_lib::recalc::RecalcEngine;
use tunergia_comparador_lib::session::ComparisonSession;

/// Invoice-analysis response as the webhook delivers it (data.datos envelope)
const SAMPLE_RESPONSE: &str = r#"{
  "data": {
    "datos": {
      "current_bill": { "total": 470.00, "alquiller": 9.45 },
      "tarifa_acceso": "3.0TD",
      "num_energy_periods": 6,
      "num_power_periods": 6,
      "cups": "ES0021000008742656ZF",
      "potencia_p1": 15.0, "potencia_p2": 15.0, "potencia_p3": 15.0,
      "potencia_p4": 15.0, "potencia_p5": 15.0, "potencia_p6": 16.5,
      "top_3_offers": [
        {
          "compania": "TotalEnergies",
          "producto": "A Tu Aire Pro",
          "energia_p1": 0.132, "energia_p2": 0.121, "energia_p3": 0.109,
          "energia_p4": 0.101, "energia_p5": 0.094, "energia_p6": 0.087,
          "pot_1": 0.071, "pot_2": 0.043, "pot_3": 0.031,
          "pot_4": 0.027, "pot_5": 0.019, "pot_6": 0.012,
          "total_energy_cost": 231.70,
          "total_power_cost": 91.89,
          "total": 423.00,
          "savings": 47.00,
          "savings_percent": 10.00,
          "annual_savings": 564.00,
          "monthly_savings": 47.00
        },
        {
          "compania": "Iberdrola",
          "producto": "Plan Estable",
          "energia_p1": 0.139, "energia_p2": 0.127, "energia_p3": 0.112,
          "energia_p4": 0.104, "energia_p5": 0.097, "energia_p6": 0.089,
          "pot_1": 0.082, "pot_2": 0.049, "pot_3": 0.036,
          "pot_4": 0.031, "pot_5": 0.022, "pot_6": 0.014,
          "total_energy_cost": 228.40,
          "total_power_cost": 105.93,
          "total": 436.66,
          "savings": 33.34,
          "savings_percent": 7.09,
          "annual_savings": 400.08,
          "monthly_savings": 33.34
        },
        {
          "compania": "Endesa",
          "producto": "\u00danica Empresas",
          "energia_p1": 0.141, "energia_p2": 0.129, "energia_p3": 0.115,
          "energia_p4": 0.106, "energia_p5": 0.099, "energia_p6": 0.091,
          "pot_1": 0.095, "pot_2": 0.058, "pot_3": 0.041,
          "pot_4": 0.033, "pot_5": 0.024, "pot_6": 0.012,
          "total_energy_cost": 224.90,
          "total_power_cost": 118.89,
          "total": 448.69,
          "savings": 21.31,
          "savings_percent": 4.53,
          "annual_savings": 255.72,
          "monthly_savings": 21.31
        }
      ],
      "analysis": {
        "best_savings": 47.00,
        "best_savings_percent": 10.00,
        "annual_savings_estimate": 564.00
      }
    }
  }
}"#;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("==============================================");
    println!("   Tunergia Comparador - Demo CLI");
    println!("==============================================\n");

    // 1. Load the tariff rule table
    println!("[1/5] Loading tariff configuration...");
    let config = match Config::load() {
        Ok(c) => {
            println!("      Loaded rule table from config file");
            c
        }
        Err(e) => {
            println!("      Could not load config: {}", e);
            println!("      Using built-in defaults...");
            Config::default()
        }
    };
    for (name, rule) in [
        ("2.0TD", &config.tarifas.td_20),
        ("3.0TD", &config.tarifas.td_30),
        ("6.1TD", &config.tarifas.td_61),
    ] {
        println!(
            "      {}: {} periods, ascending={}, max={:?}, min P6={:?}",
            name, rule.period_count, rule.ascending, rule.max_power, rule.min_p6
        );
    }
    println!();

    // 2. Parse the webhook payload
    println!("[2/5] Parsing invoice-analysis payload...");
    let comparison = parse_comparison_str(SAMPLE_RESPONSE)?;
    println!(
        "      Tarifa: {} ({} power periods)",
        comparison.tarifa_acceso, comparison.num_power_periods
    );
    if let Some(cups) = &comparison.cups {
        println!("      CUPS: {}", cups);
    }
    println!(
        "      Current bill: {:.2} \u{20AC}/month (alquiler {:.2} \u{20AC})",
        comparison.current_bill.total, comparison.current_bill.alquiller
    );
    println!(
        "      Contracted power: {}\n",
        format_power(&comparison.potencia_contratada, comparison.num_power_periods)
    );

    // 3. Start a session and show the ranking as received
    println!("[3/5] Offers as received...");
    let engine = RecalcEngine::new(&config.tarifas);
    let mut session = ComparisonSession::new(comparison);
    println!("      Session started: {}", session.received_at());
    print_offers(&session.current().top_3_offers);
    println!();

    // 4. Edit contracted power
    println!("[4/5] Editing contracted power...\n");

    // First attempt breaks the ascending rule and the P6 floor
    let bad_edit = PowerVector::from_periods(&[15.0, 14.0, 15.0, 15.0, 15.0, 14.0]);
    println!(
        "      Attempt: {}",
        format_power(&bad_edit, session.current().num_power_periods)
    );
    match session.recalculate(&engine, &bad_edit) {
        Ok(_) => println!("      Unexpectedly accepted"),
        Err(report) => {
            println!("      Rejected with {} error(s):", report.errors.len());
            for error in &report.errors {
                println!("        - {}", error);
            }
        }
    }
    println!();

    // Auto-correction raises the offending periods instead
    let corrected = engine.enforce_ascending_power(
        &bad_edit,
        session.current().num_power_periods,
        &session.current().tarifa_acceso,
    );
    println!(
        "      Auto-corrected: {}",
        format_power(&corrected, session.current().num_power_periods)
    );
    println!();

    // Second attempt lowers power across the board, which is valid
    let good_edit = PowerVector::from_periods(&[10.0, 10.0, 10.0, 10.0, 10.0, 15.1]);
    println!(
        "      Attempt: {}",
        format_power(&good_edit, session.current().num_power_periods)
    );
    match session.recalculate(&engine, &good_edit) {
        Ok(snapshot) => {
            println!("      Accepted, offers recalculated:\n");
            print_offers(&snapshot.top_3_offers);
            println!();
            println!(
                "      Best savings: {:.2} \u{20AC}/month ({:.2}%), {:.2} \u{20AC}/year",
                snapshot.analysis.best_savings,
                snapshot.analysis.best_savings_percent,
                snapshot.analysis.annual_savings_estimate
            );
        }
        Err(report) => {
            for error in &report.errors {
                println!("        - {}", error);
            }
        }
    }
    println!("      Showing adjusted snapshot: {}\n", session.is_adjusted());

    // 5. Reset to the comparison as received
    println!("[5/5] Resetting to original...");
    session.reset();
    println!(
        "      Showing adjusted snapshot: {}",
        session.is_adjusted()
    );
    println!(
        "      Best savings back to {:.2} \u{20AC}/month\n",
        session.current().analysis.best_savings
    );

    println!("==============================================");
    println!("   Demo complete");
    println!("==============================================");

    Ok(())
}

/// Print a ranked offer table
fn print_offers(offers: &[Offer]) {
    println!("      ---------------------------------------------------------------------");
    println!("      #  Compania        Producto                Total     Ahorro   Ahorro %");
    println!("      ---------------------------------------------------------------------");
    for (index, offer) in offers.iter().enumerate() {
        println!(
            "      {}  {:<15} {:<20} {:>8.2} {:>10.2} {:>10.2}",
            index + 1,
            offer.compania,
            offer.producto,
            offer.total,
            offer.savings,
            offer.savings_percent
        );
    }
    println!("      ---------------------------------------------------------------------");
}

/// Format the active periods of a power vector
fn format_power(powers: &PowerVector, period_count: usize) -> String {
    (1..=period_count)
        .map(|period| format!("P{}={}", period, powers.get(period)))
        .collect::<Vec<_>>()
        .join(" ")
}

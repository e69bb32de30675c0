use super::error::Result;
use super::execution::unit_processor::UnitResult;
use super::scenario::Product;
use super::state::ProductionSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use uuid::Uuid;

/// Per-order breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub product: String,
    pub quantity: u32,
    pub units_passed: u32,
    pub units_blocked: u32,
    pub disruptions: u32,
    pub target_cycle_time: f64,
    /// `None` when no unit of the order was inspected
    pub average_cycle_time: Option<f64>,
}

impl OrderSummary {
    pub fn from_results(product: &Product, results: &[UnitResult]) -> Self {
        let cycle_times: Vec<f64> = results.iter().filter_map(|r| r.cycle_time_seconds).collect();
        let average_cycle_time = if cycle_times.is_empty() {
            None
        } else {
            Some(cycle_times.iter().sum::<f64>() / cycle_times.len() as f64)
        };
        Self {
            product: product.name.clone(),
            quantity: results.len() as u32,
            units_passed: results.iter().filter(|r| r.passed()).count() as u32,
            units_blocked: results.iter().filter(|r| r.blocked).count() as u32,
            disruptions: results.iter().filter(|r| r.disruption.is_some()).count() as u32,
            target_cycle_time: product.cycle_time_seconds,
            average_cycle_time,
        }
    }
}

/// Final outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_units: u32,
    pub units_completed: u32,
    pub quality_checks_passed: u32,
    pub disruptions_handled: u32,
    pub blocked_units: Vec<u32>,
    /// `quality_checks_passed / total_units`
    pub success_rate: f64,
    pub simulated_seconds: f64,
    pub orders: Vec<OrderSummary>,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: &'a SummaryReport,
    state: &'a ProductionSnapshot,
}

impl SummaryReport {
    /// Write the summary and the final state as pretty JSON
    pub fn write_json(&self, path: impl AsRef<Path>, state: &ProductionSnapshot) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(
            writer,
            &ReportDocument {
                summary: self,
                state,
            },
        )?;
        log::info!("[Report] Written to {}", path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "Total units: {}", self.total_units)?;
        writeln!(
            f,
            "Quality checks: {}/{}",
            self.quality_checks_passed, self.total_units
        )?;
        writeln!(f, "Disruptions handled: {}", self.disruptions_handled)?;
        if !self.blocked_units.is_empty() {
            let units: Vec<String> = self.blocked_units.iter().map(u32::to_string).collect();
            writeln!(f, "Blocked units: {}", units.join(", "))?;
        }
        writeln!(f, "Success rate: {:.0}%", self.success_rate * 100.0)?;
        writeln!(f, "Simulation time: {} seconds", self.simulated_seconds)?;
        for order in &self.orders {
            let average = order
                .average_cycle_time
                .map(|a| format!("{:.1}s", a))
                .unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "  {} x{}: {} passed, {} blocked, {} disrupted, avg cycle {} (target {}s)",
                order.product,
                order.quantity,
                order.units_passed,
                order.units_blocked,
                order.disruptions,
                average,
                order.target_cycle_time
            )?;
        }
        Ok(())
    }
}

use crate::core::equipment_registry::EquipmentRegistry;
use crate::core::error::{CellError, Result};
use crate::core::scenario::ScenarioCatalog;
use crate::core::state::ProductionState;
use serde::Serialize;
use std::fmt;

/// Structured view of the order queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPlan {
    pub lines: Vec<OrderLine>,
    pub total_units: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub product: String,
    pub quantity: u32,
    pub description: String,
}

impl fmt::Display for OrderPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .lines
            .iter()
            .map(|l| format!("{}x {}", l.quantity, l.product))
            .collect();
        write!(f, "{} units ({})", self.total_units, parts.join(", "))
    }
}

pub fn parse_production_orders(catalog: &ScenarioCatalog) -> OrderPlan {
    let lines: Vec<OrderLine> = catalog
        .orders()
        .iter()
        .map(|o| OrderLine {
            product: o.product.clone(),
            quantity: o.quantity,
            description: o.description.clone(),
        })
        .collect();
    OrderPlan {
        total_units: catalog.total_units(),
        lines,
    }
}

/// Step plan for one product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManufacturingSequence {
    pub product: String,
    pub steps: Vec<String>,
    pub cycle_time_seconds: f64,
    pub required_tools: Vec<String>,
}

impl fmt::Display for ManufacturingSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (est. {}s, tools: {})",
            self.product,
            self.steps.join(" → "),
            self.cycle_time_seconds,
            self.required_tools.join(", ")
        )
    }
}

pub fn generate_manufacturing_sequence(
    catalog: &ScenarioCatalog,
    product: &str,
) -> Result<ManufacturingSequence> {
    let product = catalog.product(product)?;
    Ok(ManufacturingSequence {
        product: product.name.clone(),
        steps: product.steps.clone(),
        cycle_time_seconds: product.cycle_time_seconds,
        required_tools: product.required_tools.clone(),
    })
}

/// Robot chosen to run a unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotAssignment {
    pub robot: String,
    pub station: String,
    pub capabilities: Vec<String>,
}

impl fmt::Display for RobotAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} ({})",
            self.robot,
            self.station,
            self.capabilities.join(", ")
        )
    }
}

/// Pick a robot for `product`. Fails with `ResourceExhausted` when no robot is operational.
pub fn coordinate_robots(
    catalog: &ScenarioCatalog,
    registry: &EquipmentRegistry,
    product: &str,
    unit: u32,
) -> Result<RobotAssignment> {
    let product = catalog.product(product)?;
    let robot = registry
        .assign_robot(product)
        .ok_or(CellError::ResourceExhausted { unit })?;
    Ok(RobotAssignment {
        robot: robot.id.clone(),
        station: robot.station.clone(),
        capabilities: robot
            .work_capabilities()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub units_completed: u32,
    pub total_units: u32,
    pub disruptions_handled: u32,
    pub quality_checks_passed: u32,
}

impl ProgressReport {
    pub fn percentage(&self) -> f64 {
        if self.total_units == 0 {
            0.0
        } else {
            self.units_completed as f64 / self.total_units as f64 * 100.0
        }
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} units ({:.0}%), {} disruption(s) handled, {} quality check(s) passed",
            self.units_completed,
            self.total_units,
            self.percentage(),
            self.disruptions_handled,
            self.quality_checks_passed
        )
    }
}

pub fn track_production_progress(state: &ProductionState) -> ProgressReport {
    ProgressReport {
        units_completed: state.current_unit(),
        total_units: state.total_units(),
        disruptions_handled: state.disruptions_handled(),
        quality_checks_passed: state.quality_checks_passed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EquipmentStatus;

    const SCENARIO: &str = include_str!("../../../scenarios/manufacturing_scenario.json");

    #[test]
    fn test_parse_orders_totals_quantities() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let plan = parse_production_orders(&catalog);
        assert_eq!(plan.total_units, 5);
        assert_eq!(plan.total_units, catalog.total_units());
        assert_eq!(plan.to_string(), "5 units (3x Widget-A, 2x Widget-B)");
    }

    #[test]
    fn test_sequence_for_unknown_product() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let seq = generate_manufacturing_sequence(&catalog, "Widget-B").unwrap();
        assert_eq!(seq.steps[1], "weld");
        assert!(seq.to_string().contains("pick_component → weld"));
        assert!(generate_manufacturing_sequence(&catalog, "Gizmo").is_err());
    }

    #[test]
    fn test_coordinate_reports_exhaustion() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let mut registry = EquipmentRegistry::from_catalog(&catalog);
        let assignment = coordinate_robots(&catalog, &registry, "Widget-A", 1).unwrap();
        assert_eq!(assignment.robot, "robot_1");
        assert!(!assignment.capabilities.contains(&"robot".to_string()));

        registry.set_status("robot_1", EquipmentStatus::Failed).unwrap();
        registry.set_status("robot_2", EquipmentStatus::Failed).unwrap();
        assert!(matches!(
            coordinate_robots(&catalog, &registry, "Widget-A", 4),
            Err(CellError::ResourceExhausted { unit: 4 })
        ));
    }

    #[test]
    fn test_progress_percentage() {
        let mut state = ProductionState::new(4);
        state.advance_unit("Widget-A").unwrap();
        let report = track_production_progress(&state);
        assert_eq!(report.percentage(), 25.0);
        assert!(report.to_string().starts_with("1/4 units (25%)"));
    }
}

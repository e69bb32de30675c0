use crate::core::equipment_registry::EquipmentRegistry;
use crate::core::error::{CellError, Result};
use crate::core::execution::config::SimulationConfig;
use crate::core::scenario::{Disruption, ScenarioCatalog};
use crate::core::types::DisruptionKind;
use serde::Serialize;
use std::fmt;

/// First disruption scheduled at `unit`, in catalog order
pub fn detect_anomalies(catalog: &ScenarioCatalog, unit: u32) -> Option<&Disruption> {
    catalog.disruptions_at(unit).into_iter().next()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryOption {
    pub description: String,
    pub selected: bool,
}

/// Recovery plan for one disruption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryStrategy {
    pub kind: DisruptionKind,
    pub options: Vec<RecoveryOption>,
    pub recommendation: String,
    /// Robot taking over from a failed one
    pub alternate: Option<String>,
    /// Material source used instead of the depleted one
    pub fallback_source: Option<String>,
    /// `None` when recovery needs maintenance and has no bounded duration
    pub estimated_recovery_seconds: Option<f64>,
}

impl RecoveryStrategy {
    /// No alternate robot could be found; the unit cannot run
    pub fn is_blocked(&self) -> bool {
        self.kind == DisruptionKind::EquipmentFailure && self.alternate.is_none()
    }

    pub fn selected(&self) -> Option<&RecoveryOption> {
        self.options.iter().find(|o| o.selected)
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Recovery strategy for {}:", self.kind)?;
        for (i, option) in self.options.iter().enumerate() {
            let mark = if option.selected { " (selected)" } else { "" };
            writeln!(f, "  Option {}: {}{}", i + 1, option.description, mark)?;
        }
        write!(f, "  Recommendation: {}", self.recommendation)?;
        match self.estimated_recovery_seconds {
            Some(seconds) => write!(f, "\n  Estimated recovery time: {}s", seconds),
            None => write!(f, "\n  Estimated recovery time: pending maintenance"),
        }
    }
}

fn option(description: impl Into<String>, selected: bool) -> RecoveryOption {
    RecoveryOption {
        description: description.into(),
        selected,
    }
}

pub fn generate_recovery_strategy(
    disruption: &Disruption,
    registry: &EquipmentRegistry,
    config: &SimulationConfig,
) -> RecoveryStrategy {
    match disruption {
        Disruption::EquipmentFailure { target, .. } => {
            let alternate = registry
                .first_operational_robot_except(target)
                .map(|e| e.id.clone());
            match alternate {
                Some(robot) => RecoveryStrategy {
                    kind: DisruptionKind::EquipmentFailure,
                    options: vec![
                        option(format!("Switch to alternate robot {}", robot), true),
                        option("Manual intervention (20min delay)", false),
                    ],
                    recommendation: format!("Reallocate tasks to {}", robot),
                    alternate: Some(robot),
                    fallback_source: None,
                    estimated_recovery_seconds: Some(config.equipment_failure_delay_seconds),
                },
                None => RecoveryStrategy {
                    kind: DisruptionKind::EquipmentFailure,
                    options: vec![option(format!("Request maintenance for {}", target), true)],
                    recommendation: "Request maintenance; no operational robot remains".to_string(),
                    alternate: None,
                    fallback_source: None,
                    estimated_recovery_seconds: None,
                },
            }
        }
        Disruption::MaterialShortage { .. } => RecoveryStrategy {
            kind: DisruptionKind::MaterialShortage,
            options: vec![option(
                format!("Backup inventory in {}", config.fallback_material_source),
                true,
            )],
            recommendation: "Use backup materials".to_string(),
            alternate: None,
            fallback_source: Some(config.fallback_material_source.clone()),
            estimated_recovery_seconds: Some(config.material_shortage_delay_seconds),
        },
        Disruption::HumanIntervention {
            duration_seconds, ..
        } => RecoveryStrategy {
            kind: DisruptionKind::HumanIntervention,
            options: vec![option("Emergency stop and wait for clearance", true)],
            recommendation: "Pause all robot motion".to_string(),
            alternate: None,
            fallback_source: None,
            estimated_recovery_seconds: Some(*duration_seconds),
        },
    }
}

/// Safety settings in force at one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyValidation {
    pub location: String,
    pub restricted: bool,
    pub human_detection_distance: f64,
    pub emergency_stop_time: f64,
    pub violations: Vec<String>,
}

impl SafetyValidation {
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for SafetyValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Safety at {}{}: detection distance {}m, emergency stop {}s, ",
            self.location,
            if self.restricted { " (restricted zone)" } else { "" },
            self.human_detection_distance,
            self.emergency_stop_time
        )?;
        if self.is_compliant() {
            write!(f, "all safety protocols maintained")
        } else {
            write!(f, "violations: {}", self.violations.join("; "))
        }
    }
}

/// Check the safety protocols for a station or restricted zone.
///
/// `location` must be a restricted zone or the station of some equipment.
pub fn validate_safety_protocols(
    catalog: &ScenarioCatalog,
    location: &str,
) -> Result<SafetyValidation> {
    let protocols = catalog.safety_protocols();
    let restricted = protocols.restricted_zones.iter().any(|z| z == location);
    let known_station = catalog.equipment_iter().any(|e| e.station == location);
    if !restricted && !known_station {
        return Err(CellError::not_found("location", location));
    }

    let mut violations = Vec::new();
    if !(protocols.human_detection_distance > 0.0) {
        violations.push("human detection distance must be positive".to_string());
    }
    if !(protocols.emergency_stop_time > 0.0) {
        violations.push("emergency stop time must be positive".to_string());
    }

    Ok(SafetyValidation {
        location: location.to_string(),
        restricted,
        human_detection_distance: protocols.human_detection_distance,
        emergency_stop_time: protocols.emergency_stop_time,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EquipmentStatus;

    const SCENARIO: &str = include_str!("../../../scenarios/manufacturing_scenario.json");

    fn setup() -> (ScenarioCatalog, EquipmentRegistry, SimulationConfig) {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let registry = EquipmentRegistry::from_catalog(&catalog);
        (catalog, registry, SimulationConfig::default())
    }

    #[test]
    fn test_detect_returns_first_in_catalog_order() {
        let (catalog, _, _) = setup();
        assert_eq!(
            detect_anomalies(&catalog, 2).map(|d| d.kind()),
            Some(DisruptionKind::EquipmentFailure)
        );
        assert!(detect_anomalies(&catalog, 1).is_none());
        assert!(detect_anomalies(&catalog, 5).is_none());
    }

    #[test]
    fn test_equipment_failure_selects_alternate() {
        let (catalog, mut registry, config) = setup();
        let failure = detect_anomalies(&catalog, 2).unwrap().clone();
        registry.set_status("robot_1", EquipmentStatus::Failed).unwrap();

        let strategy = generate_recovery_strategy(&failure, &registry, &config);
        assert_eq!(strategy.alternate.as_deref(), Some("robot_2"));
        assert_eq!(strategy.estimated_recovery_seconds, Some(5.0));
        assert!(!strategy.is_blocked());
        assert!(strategy.selected().unwrap().description.contains("robot_2"));
    }

    #[test]
    fn test_equipment_failure_without_alternate_blocks() {
        let (catalog, mut registry, config) = setup();
        let failure = detect_anomalies(&catalog, 2).unwrap().clone();
        registry.set_status("robot_2", EquipmentStatus::Failed).unwrap();

        let strategy = generate_recovery_strategy(&failure, &registry, &config);
        assert!(strategy.is_blocked());
        assert_eq!(strategy.estimated_recovery_seconds, None);
        assert!(strategy.to_string().contains("pending maintenance"));
    }

    #[test]
    fn test_shortage_always_uses_fallback_source() {
        let (catalog, registry, config) = setup();
        let shortage = detect_anomalies(&catalog, 3).unwrap().clone();
        let strategy = generate_recovery_strategy(&shortage, &registry, &config);
        assert_eq!(strategy.fallback_source.as_deref(), Some("bin_3"));
        assert_eq!(strategy.estimated_recovery_seconds, Some(15.0));
    }

    #[test]
    fn test_human_intervention_uses_duration() {
        let (catalog, registry, config) = setup();
        let intervention = detect_anomalies(&catalog, 4).unwrap().clone();
        let strategy = generate_recovery_strategy(&intervention, &registry, &config);
        assert_eq!(strategy.estimated_recovery_seconds, Some(20.0));
    }

    #[test]
    fn test_safety_validation() {
        let (catalog, _, _) = setup();
        let welding = validate_safety_protocols(&catalog, "welding_station").unwrap();
        assert!(welding.restricted);
        assert!(welding.is_compliant());

        let line = validate_safety_protocols(&catalog, "transfer_line").unwrap();
        assert!(!line.restricted);

        assert!(matches!(
            validate_safety_protocols(&catalog, "paint_booth"),
            Err(CellError::NotFound { kind: "location", .. })
        ));
    }
}

use crate::core::equipment_registry::EquipmentRegistry;
use crate::core::error::Result;
use crate::core::scenario::ScenarioCatalog;
use crate::core::state::ProductionState;
use serde::Serialize;
use std::fmt;

/// Cycle-time and pass-rate analysis over the most recent inspections of a product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QualityTrend {
    Insufficient { needed: usize, available: usize },
    Analysis {
        product: String,
        batch_size: usize,
        average_cycle_time: f64,
        target_cycle_time: f64,
        passed: usize,
    },
}

impl QualityTrend {
    pub fn pass_rate(&self) -> Option<f64> {
        match self {
            QualityTrend::Analysis {
                batch_size, passed, ..
            } if *batch_size > 0 => Some(*passed as f64 / *batch_size as f64),
            _ => None,
        }
    }

    /// Seconds by which the batch average exceeded the target, if it did
    pub fn overrun_seconds(&self) -> Option<f64> {
        match self {
            QualityTrend::Analysis {
                average_cycle_time,
                target_cycle_time,
                ..
            } if average_cycle_time > target_cycle_time => {
                Some(average_cycle_time - target_cycle_time)
            }
            _ => None,
        }
    }
}

impl fmt::Display for QualityTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTrend::Insufficient { needed, available } => write!(
                f,
                "Insufficient data for trend analysis (need {} units, have {})",
                needed, available
            ),
            QualityTrend::Analysis {
                average_cycle_time,
                target_cycle_time,
                ..
            } => write!(
                f,
                "Average cycle time: {:.0}s (target: {}s)",
                average_cycle_time, target_cycle_time
            ),
        }
    }
}

pub fn analyze_quality_trends(
    catalog: &ScenarioCatalog,
    state: &ProductionState,
    product: &str,
    batch_size: usize,
) -> Result<QualityTrend> {
    let profile = catalog.product(product)?;
    let records: Vec<_> = state.inspections_for(product).collect();
    if batch_size == 0 || records.len() < batch_size {
        return Ok(QualityTrend::Insufficient {
            needed: batch_size,
            available: records.len(),
        });
    }

    let recent = &records[records.len() - batch_size..];
    let total: f64 = recent.iter().map(|r| r.cycle_time_seconds).sum();
    Ok(QualityTrend::Analysis {
        product: profile.name.clone(),
        batch_size,
        average_cycle_time: total / batch_size as f64,
        target_cycle_time: profile.cycle_time_seconds,
        passed: recent.iter().filter(|r| r.passed).count(),
    })
}

/// What a recommendation is about
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImprovementTopic {
    EquipmentFailure { robot: String },
    MaterialShortage { material: String },
    CycleTime { overrun_seconds: f64 },
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Improvement {
    pub recommendation: String,
    pub impact: String,
    pub priority: Priority,
}

impl fmt::Display for Improvement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (impact: {}, priority: {})",
            self.recommendation, self.impact, self.priority
        )
    }
}

pub fn suggest_process_improvements(topic: &ImprovementTopic) -> Improvement {
    match topic {
        ImprovementTopic::EquipmentFailure { robot } => Improvement {
            recommendation: format!("Schedule preventive maintenance for {}", robot),
            impact: "reduce cycle time variance by ~5s".to_string(),
            priority: Priority::High,
        },
        ImprovementTopic::MaterialShortage { material } => Improvement {
            recommendation: format!("Increase material buffer stock for {}", material),
            impact: "prevent supply chain delays".to_string(),
            priority: Priority::Medium,
        },
        ImprovementTopic::CycleTime { overrun_seconds } => Improvement {
            recommendation: format!(
                "Review robot path planning ({:.0}s over target)",
                overrun_seconds
            ),
            impact: "potential 10% cycle time reduction".to_string(),
            priority: Priority::Medium,
        },
        ImprovementTopic::General => Improvement {
            recommendation: "Continue monitoring production metrics".to_string(),
            impact: "no immediate action required".to_string(),
            priority: Priority::Low,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaintenanceUrgency {
    /// Fewer than 50 cycles left
    Urgent,
    /// Fewer than 150 cycles left
    Soon,
    Healthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceForecast {
    pub robot: String,
    pub cycles_completed: u64,
    pub threshold: u64,
    pub remaining: i64,
    pub urgency: MaintenanceUrgency,
}

impl fmt::Display for MaintenanceForecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let advice = match self.urgency {
            MaintenanceUrgency::Urgent => "URGENT: schedule maintenance within 50 cycles",
            MaintenanceUrgency::Soon => "schedule maintenance soon (within 150 cycles)",
            MaintenanceUrgency::Healthy => "healthy, monitor regularly",
        };
        write!(
            f,
            "{} at {} cycles (maintenance due at {}): {}",
            self.robot, self.cycles_completed, self.threshold, advice
        )
    }
}

pub fn predict_maintenance_needs(
    registry: &EquipmentRegistry,
    robot: &str,
    threshold: u64,
) -> Result<MaintenanceForecast> {
    let equipment = registry.get(robot)?;
    let remaining = threshold as i64 - equipment.cycles_completed as i64;
    let urgency = if remaining < 50 {
        MaintenanceUrgency::Urgent
    } else if remaining < 150 {
        MaintenanceUrgency::Soon
    } else {
        MaintenanceUrgency::Healthy
    };
    Ok(MaintenanceForecast {
        robot: equipment.id.clone(),
        cycles_completed: equipment.cycles_completed,
        threshold,
        remaining,
        urgency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::InspectionRecord;
    use chrono::Utc;

    const SCENARIO: &str = include_str!("../../../scenarios/manufacturing_scenario.json");

    fn inspection(unit: u32, product: &str, cycle: f64, passed: bool) -> InspectionRecord {
        InspectionRecord {
            unit,
            product: product.to_string(),
            deviation: 0.02,
            tolerance: 0.1,
            passed,
            cycle_time_seconds: cycle,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_trend_needs_full_batch() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let mut state = ProductionState::new(5);
        state.append_inspection(inspection(1, "Widget-A", 46.0, true));
        let trend = analyze_quality_trends(&catalog, &state, "Widget-A", 3).unwrap();
        assert_eq!(trend, QualityTrend::Insufficient { needed: 3, available: 1 });
        assert_eq!(trend.pass_rate(), None);
    }

    #[test]
    fn test_trend_averages_recent_batch_only() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let mut state = ProductionState::new(5);
        state.append_inspection(inspection(1, "Widget-A", 100.0, true));
        state.append_inspection(inspection(2, "Widget-B", 61.0, true));
        state.append_inspection(inspection(3, "Widget-A", 44.0, true));
        state.append_inspection(inspection(4, "Widget-A", 50.0, false));

        let trend = analyze_quality_trends(&catalog, &state, "Widget-A", 2).unwrap();
        assert_eq!(trend.overrun_seconds(), Some(2.0));
        assert_eq!(trend.pass_rate(), Some(0.5));
        assert_eq!(trend.to_string(), "Average cycle time: 47s (target: 45s)");
    }

    #[test]
    fn test_trend_unknown_product() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let state = ProductionState::new(1);
        assert!(analyze_quality_trends(&catalog, &state, "Gizmo", 1).is_err());
    }

    #[test]
    fn test_improvement_priorities() {
        let failure = suggest_process_improvements(&ImprovementTopic::EquipmentFailure {
            robot: "robot_1".into(),
        });
        assert_eq!(failure.priority, Priority::High);
        assert!(failure.recommendation.contains("robot_1"));

        let shortage = suggest_process_improvements(&ImprovementTopic::MaterialShortage {
            material: "component_B".into(),
        });
        assert_eq!(shortage.priority, Priority::Medium);
        assert_eq!(
            suggest_process_improvements(&ImprovementTopic::General).priority,
            Priority::Low
        );
    }

    #[test]
    fn test_maintenance_urgency_bands() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let mut registry = EquipmentRegistry::from_catalog(&catalog);

        let forecast = predict_maintenance_needs(&registry, "robot_2", 500).unwrap();
        assert_eq!(forecast.remaining, 117);
        assert_eq!(forecast.urgency, MaintenanceUrgency::Soon);
        assert!(forecast.to_string().starts_with("robot_2 at 383 cycles (maintenance due at 500)"));

        assert_eq!(
            predict_maintenance_needs(&registry, "robot_1", 500).unwrap().urgency,
            MaintenanceUrgency::Healthy
        );
        assert_eq!(
            predict_maintenance_needs(&registry, "robot_2", 400).unwrap().urgency,
            MaintenanceUrgency::Urgent
        );

        registry.record_cycle("robot_2").unwrap();
        assert_eq!(predict_maintenance_needs(&registry, "robot_2", 500).unwrap().remaining, 116);
        assert!(predict_maintenance_needs(&registry, "robot_7", 500).is_err());
    }
}

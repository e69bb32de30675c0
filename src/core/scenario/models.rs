use crate::core::types::{DisruptionKind, EquipmentStatus};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product the cell can build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Filled from the catalog key after loading
    #[serde(skip)]
    pub name: String,
    pub steps: Vec<String>,
    pub cycle_time_seconds: f64,
    pub required_tools: Vec<String>,
    /// Maximum allowed dimensional deviation in millimetres
    pub quality_tolerance: f64,
}

impl Product {
    /// Capability prefixes implied by the step names (`pick_component` -> `pick`)
    pub fn required_capabilities(&self) -> Vec<String> {
        let mut caps: Vec<String> = Vec::new();
        for step in &self.steps {
            let prefix = step.split('_').next().unwrap_or(step).to_string();
            if !caps.contains(&prefix) {
                caps.push(prefix);
            }
        }
        caps
    }
}

/// A robot or other resource in the cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(skip)]
    pub id: String,
    pub status: EquipmentStatus,
    pub station: String,
    pub capabilities: Vec<String>,
    pub cycles_completed: u64,
}

impl Equipment {
    /// Robot-tagged equipment carries the `robot` capability; documents that
    /// omit the tag are matched on the id instead.
    pub fn is_robot(&self) -> bool {
        self.capabilities.iter().any(|c| c == "robot") || self.id.contains("robot")
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Work capabilities, without the `robot` tag itself
    pub fn work_capabilities(&self) -> Vec<&str> {
        self.capabilities
            .iter()
            .map(String::as_str)
            .filter(|c| *c != "robot")
            .collect()
    }
}

fn unknown_description() -> String {
    "Unknown".to_string()
}

/// A scripted deviation tied to a 1-based global unit index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Disruption {
    EquipmentFailure {
        occurs_at_unit: u32,
        target: String,
        severity: String,
        #[serde(default = "unknown_description")]
        description: String,
    },
    MaterialShortage {
        occurs_at_unit: u32,
        target: String,
        severity: String,
        #[serde(default = "unknown_description")]
        description: String,
    },
    HumanIntervention {
        occurs_at_unit: u32,
        location: String,
        reason: String,
        duration_seconds: f64,
    },
}

impl Disruption {
    pub fn occurs_at_unit(&self) -> u32 {
        match self {
            Disruption::EquipmentFailure { occurs_at_unit, .. }
            | Disruption::MaterialShortage { occurs_at_unit, .. }
            | Disruption::HumanIntervention { occurs_at_unit, .. } => *occurs_at_unit,
        }
    }

    pub fn kind(&self) -> DisruptionKind {
        match self {
            Disruption::EquipmentFailure { .. } => DisruptionKind::EquipmentFailure,
            Disruption::MaterialShortage { .. } => DisruptionKind::MaterialShortage,
            Disruption::HumanIntervention { .. } => DisruptionKind::HumanIntervention,
        }
    }

    /// Equipment, material, or location the disruption hits
    pub fn target(&self) -> &str {
        match self {
            Disruption::EquipmentFailure { target, .. }
            | Disruption::MaterialShortage { target, .. } => target,
            Disruption::HumanIntervention { location, .. } => location,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Disruption::EquipmentFailure { description, .. }
            | Disruption::MaterialShortage { description, .. } => description,
            Disruption::HumanIntervention { reason, .. } => reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub product: String,
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
}

/// Accuracy/threshold metadata for a sensor; other keys are kept verbatim
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSpec {
    #[serde(default)]
    pub accuracy: Option<Value>,
    #[serde(default)]
    pub threshold: Option<Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl SensorSpec {
    pub fn accuracy_text(&self) -> String {
        display_value(self.accuracy.as_ref())
    }

    pub fn threshold_text(&self) -> String {
        display_value(self.threshold.as_ref())
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "n/a".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyProtocols {
    /// Metres
    pub human_detection_distance: f64,
    /// Seconds
    pub emergency_stop_time: f64,
    pub restricted_zones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityStandards {
    pub surface_finish: String,
    pub inspection_points: u32,
}

/// Raw scenario document as found on disk. Every top-level key is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDocument {
    pub production_orders: Vec<ProductionOrder>,
    pub products: IndexMap<String, Product>,
    pub equipment: IndexMap<String, Equipment>,
    pub sensors: IndexMap<String, SensorSpec>,
    pub disruptions: Vec<Disruption>,
    pub safety_protocols: SafetyProtocols,
    pub quality_standards: QualityStandards,
}

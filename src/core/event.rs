use super::types::{AgentRole, DisruptionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One exception event, appended to the incident log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: Uuid,
    pub kind: DisruptionKind,
    pub unit: u32,
    pub details: String,
    /// What the cell did about it, e.g. the alternate robot that took over
    pub resolution: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

impl IncidentRecord {
    pub fn new(
        kind: DisruptionKind,
        unit: u32,
        details: impl Into<String>,
        resolution: impl Into<String>,
        resolved: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            unit,
            details: details.into(),
            resolution: resolution.into(),
            timestamp: Utc::now(),
            resolved,
        }
    }
}

/// Audit entry for an action taken by one of the cell roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub role: AgentRole,
    pub action: String,
    pub context: Value,
    pub timestamp: DateTime<Utc>,
}

impl AgentAction {
    pub fn new(role: AgentRole, action: impl Into<String>, context: Value) -> Self {
        Self {
            role,
            action: action.into(),
            context,
            timestamp: Utc::now(),
        }
    }
}

/// Snapshot of the synthetic sensors for one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub unit: u32,
    /// Millimetres
    pub position: f64,
    /// Newtons
    pub force: f64,
    /// Degrees Celsius
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

/// Result of one quality inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub unit: u32,
    pub product: String,
    /// Millimetres
    pub deviation: f64,
    pub tolerance: f64,
    pub passed: bool,
    /// Cycle time attributed to the inspected unit
    pub cycle_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Display for SensorReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Position={:.2}mm, Force={:.1}N, Temp={:.1}°C",
            self.position, self.force, self.temperature
        )
    }
}

use serde::{Deserialize, Serialize};

/// The four roles staffing the manufacturing cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planning,
    RobotControl,
    Quality,
    ExceptionHandler,
    /// Cell-level messages that belong to no agent
    System,
}

impl AgentRole {
    /// Label used as the transcript prefix
    pub fn label(&self) -> &'static str {
        match self {
            AgentRole::Planning => "Planning Agent",
            AgentRole::RobotControl => "Robot Control",
            AgentRole::Quality => "Quality Agent",
            AgentRole::ExceptionHandler => "Exception Agent",
            AgentRole::System => "System",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Operational status of a piece of equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    Operational,
    Failed,
    Maintenance,
}

impl EquipmentStatus {
    pub fn is_operational(&self) -> bool {
        *self == EquipmentStatus::Operational
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            EquipmentStatus::Operational => "operational",
            EquipmentStatus::Failed => "failed",
            EquipmentStatus::Maintenance => "maintenance",
        };
        write!(f, "{}", text)
    }
}

/// Discriminant of a scripted disruption, used in logs and records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionKind {
    EquipmentFailure,
    MaterialShortage,
    HumanIntervention,
}

impl DisruptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisruptionKind::EquipmentFailure => "equipment_failure",
            DisruptionKind::MaterialShortage => "material_shortage",
            DisruptionKind::HumanIntervention => "human_intervention",
        }
    }
}

impl std::fmt::Display for DisruptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserializes_lowercase() {
        let status: EquipmentStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, EquipmentStatus::Failed);
        assert!(!status.is_operational());
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(AgentRole::ExceptionHandler.to_string(), "Exception Agent");
        assert_eq!(AgentRole::RobotControl.label(), "Robot Control");
    }

    #[test]
    fn test_kind_matches_wire_name() {
        let kind: DisruptionKind = serde_json::from_str("\"human_intervention\"").unwrap();
        assert_eq!(kind.as_str(), "human_intervention");
    }
}

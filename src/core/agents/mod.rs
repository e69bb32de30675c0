//! Read-only tools for the four cell roles.
//!
//! Each tool takes the catalog, registry, or state by shared reference and
//! returns a typed result with a `Display` rendering, so the same calls back
//! both the built-in narration and external agent runtimes.

pub mod exception;
pub mod planning;
pub mod quality;
pub mod robot_control;

pub use exception::{
    detect_anomalies, generate_recovery_strategy, validate_safety_protocols, RecoveryStrategy,
    SafetyValidation,
};
pub use planning::{
    coordinate_robots, generate_manufacturing_sequence, parse_production_orders,
    track_production_progress, ManufacturingSequence, OrderPlan, ProgressReport, RobotAssignment,
};
pub use quality::{
    analyze_quality_trends, predict_maintenance_needs, suggest_process_improvements,
    ImprovementTopic, MaintenanceForecast, MaintenanceUrgency, QualityTrend,
};
pub use robot_control::{
    check_human_proximity, emergency_stop, step_base_duration, translate_to_motion_primitives,
    ProximityStatus,
};

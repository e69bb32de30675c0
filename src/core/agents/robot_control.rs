use crate::core::scenario::{Disruption, ScenarioCatalog};
use crate::core::state::ProductionState;
use serde::Serialize;
use std::fmt;

/// Distance at which a person is reported when a human intervention fires (m)
pub const DETECTED_HUMAN_DISTANCE_M: f64 = 1.5;

const GENERIC_PRIMITIVES: &[&str] = &["move", "execute", "return"];

/// Low-level motion sequence for a manufacturing step. Unknown steps get a
/// three-primitive generic sequence.
pub fn translate_to_motion_primitives(step: &str) -> &'static [&'static str] {
    match step {
        "pick_component" => &["move_to_bin", "open_gripper", "approach", "close_gripper", "lift"],
        "assemble" => &["move_to_assembly", "position", "apply_force", "verify_fit"],
        "weld" => &["move_to_weld", "position", "ignite_torch", "weld_seam", "cool_down"],
        "quality_check" => &["move_to_inspection", "scan", "measure", "validate"],
        "place_finished" => &["move_to_output", "position", "open_gripper", "retract"],
        _ => GENERIC_PRIMITIVES,
    }
}

/// Nominal execution time of a step before jitter
pub fn step_base_duration(step: &str) -> f64 {
    if step.contains("pick") {
        3.0
    } else {
        5.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProximityStatus {
    Clear { location: String },
    HumanDetected {
        location: String,
        distance_m: f64,
        safe_threshold_m: f64,
    },
}

impl ProximityStatus {
    pub fn requires_stop(&self) -> bool {
        matches!(self, ProximityStatus::HumanDetected { .. })
    }
}

impl fmt::Display for ProximityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProximityStatus::Clear { location } => {
                write!(f, "{}: clear (safe distance maintained)", location)
            }
            ProximityStatus::HumanDetected {
                location,
                distance_m,
                safe_threshold_m,
            } => write!(
                f,
                "Human detected at {}m from robot at {} (safe threshold: {}m)",
                distance_m, location, safe_threshold_m
            ),
        }
    }
}

/// Whether a scripted human intervention is active at `location` for the current unit
pub fn check_human_proximity(
    catalog: &ScenarioCatalog,
    state: &ProductionState,
    location: &str,
) -> ProximityStatus {
    let detected = catalog
        .disruptions_at(state.current_unit())
        .into_iter()
        .any(|d| matches!(d, Disruption::HumanIntervention { location: l, .. } if l == location));

    if detected {
        ProximityStatus::HumanDetected {
            location: location.to_string(),
            distance_m: DETECTED_HUMAN_DISTANCE_M,
            safe_threshold_m: catalog.safety_protocols().human_detection_distance,
        }
    } else {
        ProximityStatus::Clear {
            location: location.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyStop {
    pub reason: String,
    pub stop_time_seconds: f64,
}

impl fmt::Display for EmergencyStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EMERGENCY STOP activated ({}), motion halted within {}s",
            self.reason, self.stop_time_seconds
        )
    }
}

pub fn emergency_stop(catalog: &ScenarioCatalog, reason: &str) -> EmergencyStop {
    EmergencyStop {
        reason: reason.to_string(),
        stop_time_seconds: catalog.safety_protocols().emergency_stop_time,
    }
}

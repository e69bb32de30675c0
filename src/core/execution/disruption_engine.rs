use super::config::SimulationConfig;
use super::context::CellContext;
use crate::core::agents::{
    check_human_proximity, emergency_stop, generate_recovery_strategy, validate_safety_protocols,
};
use crate::core::error::{CellError, Result};
use crate::core::event::IncidentRecord;
use crate::core::scenario::Disruption;
use crate::core::types::{AgentRole, EquipmentStatus};
use log::{debug, info, warn};
use serde_json::json;

/// What happened when a scripted disruption fired
#[derive(Debug, Clone, PartialEq)]
pub struct DisruptionOutcome {
    pub disruption: Disruption,
    /// Seconds added to the unit's cycle time
    pub delay_seconds: f64,
    /// No robot is left to run the unit
    pub blocked: bool,
    pub alternate: Option<String>,
    /// Part of the delay already spent holding the clock
    pub held_seconds: f64,
}

/// Detects and resolves the disruption scheduled at a unit
#[derive(Debug, Clone)]
pub struct DisruptionEngine {
    config: SimulationConfig,
}

impl DisruptionEngine {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Handle the first disruption scheduled at `unit`, if any.
    ///
    /// Each call that finds a disruption increments `disruptions_handled` once
    /// and appends exactly one incident record.
    pub fn evaluate(
        &self,
        unit: u32,
        ctx: &mut CellContext<'_>,
    ) -> Result<Option<DisruptionOutcome>> {
        let scheduled = ctx.catalog.disruptions_at(unit);
        let Some(disruption) = scheduled.first().map(|d| (*d).clone()) else {
            debug!("[DisruptionEngine] No disruption at unit {}", unit);
            return Ok(None);
        };
        for extra in scheduled.iter().skip(1) {
            warn!(
                "[DisruptionEngine] Ignoring additional {} at unit {}; only the first disruption per unit is handled",
                extra.kind(),
                unit
            );
        }

        info!("[DisruptionEngine] {} at unit {}", disruption.kind(), unit);
        ctx.record(
            AgentRole::ExceptionHandler,
            "detect_anomaly",
            json!({ "unit": unit, "type": disruption.kind(), "target": disruption.target() }),
        );
        ctx.say(AgentRole::ExceptionHandler, "ANOMALY DETECTED!");
        ctx.say(AgentRole::ExceptionHandler, format!("→ Type: {}", disruption.kind()));

        let outcome = match &disruption {
            Disruption::EquipmentFailure {
                target,
                severity,
                description,
                ..
            } => self.equipment_failure(unit, &disruption, target, severity, description, ctx)?,
            Disruption::MaterialShortage {
                target, description, ..
            } => self.material_shortage(unit, &disruption, target, description, ctx),
            Disruption::HumanIntervention {
                location,
                reason,
                duration_seconds,
                ..
            } => self.human_intervention(unit, &disruption, location, reason, *duration_seconds, ctx)?,
        };

        ctx.state.record_disruption_handled();
        Ok(Some(outcome))
    }

    fn equipment_failure(
        &self,
        unit: u32,
        disruption: &Disruption,
        target: &str,
        severity: &str,
        description: &str,
        ctx: &mut CellContext<'_>,
    ) -> Result<DisruptionOutcome> {
        ctx.say(AgentRole::ExceptionHandler, format!("→ Target: {}", target));
        ctx.say(AgentRole::ExceptionHandler, format!("→ {}", description));
        ctx.say(
            AgentRole::ExceptionHandler,
            format!("→ Severity: {}", severity.to_uppercase()),
        );

        match ctx.registry.set_status(target, EquipmentStatus::Failed) {
            Ok(()) => {}
            Err(CellError::NotFound { .. }) => {
                warn!("[DisruptionEngine] Failure target {} is not in the equipment table", target);
            }
            Err(e) => return Err(e),
        }

        let strategy = generate_recovery_strategy(disruption, ctx.registry, &self.config);
        ctx.say(AgentRole::ExceptionHandler, "Generating recovery strategy...");
        for (i, option) in strategy.options.iter().enumerate() {
            let mark = if option.selected { " ✓ SELECTED" } else { "" };
            ctx.say(
                AgentRole::ExceptionHandler,
                format!("→ Option {}: {}{}", i + 1, option.description, mark),
            );
        }
        ctx.record(
            AgentRole::ExceptionHandler,
            "generate_recovery",
            json!({ "unit": unit, "type": disruption.kind(), "alternate": strategy.alternate }),
        );

        match strategy.alternate {
            Some(alternate) => {
                let delay = self.config.equipment_failure_delay_seconds;
                ctx.say(AgentRole::Planning, "Adapting plan for equipment failure...");
                ctx.say(
                    AgentRole::Planning,
                    format!("→ Reallocate tasks from {} to {} (+{}s per unit)", target, alternate, delay),
                );
                ctx.say(
                    AgentRole::RobotControl,
                    format!("Resuming with {}, adapting motion to its configuration", alternate),
                );
                ctx.record(
                    AgentRole::Planning,
                    "reallocate_tasks",
                    json!({ "unit": unit, "from": target, "to": alternate }),
                );
                ctx.state.append_incident(IncidentRecord::new(
                    disruption.kind(),
                    unit,
                    format!("{} failed: {}", target, description),
                    format!("tasks reallocated to {}", alternate),
                    true,
                ));
                Ok(DisruptionOutcome {
                    disruption: disruption.clone(),
                    delay_seconds: delay,
                    blocked: false,
                    alternate: Some(alternate),
                    held_seconds: 0.0,
                })
            }
            None => {
                warn!(
                    "[DisruptionEngine] No operational robot left after {} failed at unit {}",
                    target, unit
                );
                ctx.say(
                    AgentRole::Planning,
                    format!("→ No alternate robot available; request maintenance for {}", target),
                );
                ctx.record(
                    AgentRole::Planning,
                    "request_maintenance",
                    json!({ "unit": unit, "equipment": target }),
                );
                ctx.state.append_incident(IncidentRecord::new(
                    disruption.kind(),
                    unit,
                    format!("{} failed: {}", target, description),
                    format!("maintenance requested for {}", target),
                    false,
                ));
                Ok(DisruptionOutcome {
                    disruption: disruption.clone(),
                    delay_seconds: 0.0,
                    blocked: true,
                    alternate: None,
                    held_seconds: 0.0,
                })
            }
        }
    }

    fn material_shortage(
        &self,
        unit: u32,
        disruption: &Disruption,
        material: &str,
        cause: &str,
        ctx: &mut CellContext<'_>,
    ) -> DisruptionOutcome {
        let depleted = &self.config.depleted_material_source;
        let fallback = &self.config.fallback_material_source;
        let delay = self.config.material_shortage_delay_seconds;

        ctx.say(
            AgentRole::ExceptionHandler,
            format!("→ Material: {} stock depleted", material),
        );
        ctx.say(
            AgentRole::ExceptionHandler,
            format!("→ Cause: {}", cause),
        );
        ctx.say(AgentRole::ExceptionHandler, "Checking alternate material sources...");
        ctx.say(
            AgentRole::ExceptionHandler,
            format!("→ Found: backup inventory in {} ✓ SELECTED", fallback),
        );
        ctx.say(AgentRole::Planning, "Adapting plan for material shortage...");
        ctx.say(
            AgentRole::Planning,
            format!("→ Updating material source: {} → {}", depleted, fallback),
        );
        ctx.say(AgentRole::Planning, format!("→ Estimated delay: +{}s for retrieval", delay));
        ctx.say(AgentRole::RobotControl, "Retrieving from alternate location...");

        ctx.record(
            AgentRole::Planning,
            "switch_material_source",
            json!({ "unit": unit, "material": material, "from": depleted, "to": fallback }),
        );
        ctx.state.append_incident(IncidentRecord::new(
            disruption.kind(),
            unit,
            format!("{} depleted: {}", material, cause),
            format!("material taken from {}", fallback),
            true,
        ));

        DisruptionOutcome {
            disruption: disruption.clone(),
            delay_seconds: delay,
            blocked: false,
            alternate: None,
            held_seconds: 0.0,
        }
    }

    fn human_intervention(
        &self,
        unit: u32,
        disruption: &Disruption,
        location: &str,
        reason: &str,
        duration_seconds: f64,
        ctx: &mut CellContext<'_>,
    ) -> Result<DisruptionOutcome> {
        ctx.say(AgentRole::ExceptionHandler, format!("→ Location: {}", location));
        ctx.say(AgentRole::ExceptionHandler, format!("→ Reason: {}", reason));
        let proximity = check_human_proximity(ctx.catalog, ctx.state, location);
        debug!("[DisruptionEngine] Proximity {}", proximity);
        ctx.say(AgentRole::ExceptionHandler, format!("→ {}", proximity));
        ctx.record(
            AgentRole::RobotControl,
            "check_proximity",
            json!({ "unit": unit, "location": location, "stop": proximity.requires_stop() }),
        );

        ctx.say(AgentRole::ExceptionHandler, "Activating safety protocols...");
        match validate_safety_protocols(ctx.catalog, location) {
            Ok(validation) => ctx.say(AgentRole::ExceptionHandler, format!("→ {}", validation)),
            Err(CellError::NotFound { .. }) => {
                warn!("[DisruptionEngine] {} is not a known station or restricted zone", location);
            }
            Err(e) => return Err(e),
        }

        let stop = emergency_stop(ctx.catalog, reason);
        ctx.say(AgentRole::RobotControl, stop.to_string());
        ctx.say(AgentRole::RobotControl, "→ All robot motion halted, waiting for human clearance...");
        ctx.say(AgentRole::Planning, "Production paused for safety, ready to resume when safe");
        ctx.record(
            AgentRole::RobotControl,
            "emergency_stop",
            json!({ "unit": unit, "location": location, "stop_time_seconds": stop.stop_time_seconds }),
        );

        ctx.clock.hold(duration_seconds, ctx.token)?;

        ctx.say(
            AgentRole::ExceptionHandler,
            format!("Human cleared work area ({}s elapsed)", duration_seconds),
        );
        ctx.say(AgentRole::ExceptionHandler, "→ Safety protocols maintained, logging incident for review");
        ctx.say(AgentRole::RobotControl, "Resuming operations...");
        ctx.state.append_incident(IncidentRecord::new(
            disruption.kind(),
            unit,
            format!("{} at {}", reason, location),
            format!("emergency stop, cleared after {}s", duration_seconds),
            true,
        ));

        Ok(DisruptionOutcome {
            disruption: disruption.clone(),
            delay_seconds: duration_seconds,
            blocked: false,
            alternate: None,
            held_seconds: duration_seconds,
        })
    }
}

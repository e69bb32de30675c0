use super::config::SimulationConfig;
use super::context::CellContext;
use super::disruption_engine::{DisruptionEngine, DisruptionOutcome};
use crate::core::agents::{
    coordinate_robots, step_base_duration, translate_to_motion_primitives,
};
use crate::core::error::{CellError, Result};
use crate::core::event::{InspectionRecord, SensorReading};
use crate::core::scenario::Product;
use crate::core::types::{AgentRole, DisruptionKind};
use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;
use serde_json::json;

/// What happened to one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
    /// 1-based global index
    pub unit: u32,
    /// 1-based index within the order
    pub local_unit: u32,
    pub product: String,
    pub disruption: Option<DisruptionKind>,
    pub robot: Option<String>,
    pub primitives: Vec<String>,
    pub sensor_reading: Option<SensorReading>,
    pub inspection: Option<InspectionRecord>,
    pub cycle_time_seconds: Option<f64>,
    pub blocked: bool,
}

impl UnitResult {
    fn new(unit: u32, local_unit: u32, product: &str) -> Self {
        Self {
            unit,
            local_unit,
            product: product.to_string(),
            disruption: None,
            robot: None,
            primitives: Vec::new(),
            sensor_reading: None,
            inspection: None,
            cycle_time_seconds: None,
            blocked: false,
        }
    }

    pub fn passed(&self) -> bool {
        self.inspection.as_ref().map_or(false, |i| i.passed)
    }
}

/// Runs a single unit: disruption check, robot execution, inspection
pub struct UnitProcessor {
    config: SimulationConfig,
    disruptions: DisruptionEngine,
    rng: StdRng,
    position: Uniform<f64>,
    force: Uniform<f64>,
    temperature: Uniform<f64>,
}

impl UnitProcessor {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            disruptions: DisruptionEngine::new(config.clone()),
            config,
            rng,
            position: Uniform::new(0.0, 100.0),
            force: Uniform::new(20.0, 50.0),
            temperature: Uniform::new(20.0, 25.0),
        }
    }

    /// Process global unit `unit` (the `local_unit`-th of its order).
    ///
    /// The caller has already advanced the production state to `unit`.
    pub fn process_unit(
        &mut self,
        product: &Product,
        unit: u32,
        local_unit: u32,
        ctx: &mut CellContext<'_>,
    ) -> Result<UnitResult> {
        let mut result = UnitResult::new(unit, local_unit, &product.name);

        let cycle_time = match self.disruptions.evaluate(unit, ctx)? {
            Some(outcome) => {
                result.disruption = Some(outcome.disruption.kind());
                result.robot = outcome.alternate.clone();
                if outcome.blocked {
                    self.block(unit, &mut result, ctx);
                    return Ok(result);
                }
                self.recover(product, &outcome, ctx)
            }
            None => match self.execute(product, unit, &mut result, ctx) {
                Ok(cycle_time) => cycle_time,
                Err(CellError::ResourceExhausted { .. }) => {
                    self.block(unit, &mut result, ctx);
                    return Ok(result);
                }
                Err(e) => return Err(e),
            },
        };

        self.inspect(product, unit, cycle_time, &mut result, ctx)?;
        Ok(result)
    }

    fn block(&self, unit: u32, result: &mut UnitResult, ctx: &mut CellContext<'_>) {
        warn!("[UnitProcessor] Unit {} blocked: no operational robot", unit);
        result.blocked = true;
        ctx.state.record_blocked_unit(unit);
        ctx.say(
            AgentRole::Planning,
            format!("Unit {} blocked: no operational robot available", unit),
        );
        ctx.record(AgentRole::Planning, "block_unit", json!({ "unit": unit }));
    }

    /// Account for a disrupted unit; normal execution is skipped
    fn recover(
        &self,
        product: &Product,
        outcome: &DisruptionOutcome,
        ctx: &mut CellContext<'_>,
    ) -> f64 {
        let cycle_time = product.cycle_time_seconds + outcome.delay_seconds;
        ctx.clock.advance(cycle_time - outcome.held_seconds);
        debug!(
            "[UnitProcessor] Disrupted unit cycle time {}s ({}s recovery)",
            cycle_time, outcome.delay_seconds
        );
        cycle_time
    }

    /// Normal path: assign a robot, translate, sense, and execute the leading steps
    fn execute(
        &mut self,
        product: &Product,
        unit: u32,
        result: &mut UnitResult,
        ctx: &mut CellContext<'_>,
    ) -> Result<f64> {
        let assignment = coordinate_robots(ctx.catalog, ctx.registry, &product.name, unit)?;
        ctx.record(
            AgentRole::Planning,
            "coordinate_robots",
            json!({ "unit": unit, "robot": assignment.robot }),
        );
        debug!("[UnitProcessor] Unit {} assigned to {}", unit, assignment);

        let steps: Vec<&String> = product
            .steps
            .iter()
            .take(self.config.executed_steps_per_unit)
            .collect();

        ctx.say(AgentRole::RobotControl, "Translating tasks to motion primitives...");
        for step in &steps {
            let primitives = translate_to_motion_primitives(step);
            ctx.say(AgentRole::RobotControl, format!("→ {}", primitives.join(" | ")));
            result
                .primitives
                .extend(primitives.iter().map(|p| p.to_string()));
        }
        ctx.record(
            AgentRole::RobotControl,
            "translate_motion",
            json!({ "unit": unit, "primitives": result.primitives }),
        );

        let reading = SensorReading {
            unit,
            position: self.rng.sample(&self.position),
            force: self.rng.sample(&self.force),
            temperature: self.rng.sample(&self.temperature),
            timestamp: Utc::now(),
        };
        ctx.say(AgentRole::RobotControl, format!("Reading sensors: {}", reading));
        let accuracy = ctx
            .catalog
            .sensor("position_sensor")
            .map(|s| s.accuracy_text())
            .unwrap_or_else(|_| "n/a".to_string());
        let threshold = ctx
            .catalog
            .sensor("force_sensor")
            .map(|s| s.threshold_text())
            .unwrap_or_else(|_| "n/a".to_string());
        ctx.say(
            AgentRole::RobotControl,
            format!("→ Position accuracy {}, force threshold {}", accuracy, threshold),
        );
        ctx.state.append_sensor_reading(reading.clone());
        result.sensor_reading = Some(reading);

        let mut jitter_total = 0.0;
        let mut executed = 0.0;
        for step in &steps {
            let jitter = f64::from(self.rng.gen_range(-1i32..=2));
            let duration = step_base_duration(step) + jitter;
            jitter_total += jitter;
            executed += duration;
            ctx.say(
                AgentRole::RobotControl,
                format!("Executing: {}... ✓ ({}s)", step, duration),
            );
        }
        ctx.record(
            AgentRole::RobotControl,
            "execute_motion",
            json!({ "unit": unit, "robot": assignment.robot, "seconds": executed }),
        );

        let cycles = ctx.registry.record_cycle(&assignment.robot)?;
        debug!("[UnitProcessor] {} at {} cycles", assignment.robot, cycles);
        result.robot = Some(assignment.robot);

        let cycle_time = product.cycle_time_seconds + jitter_total;
        ctx.clock.advance(cycle_time);
        Ok(cycle_time)
    }

    fn inspect(
        &mut self,
        product: &Product,
        unit: u32,
        cycle_time: f64,
        result: &mut UnitResult,
        ctx: &mut CellContext<'_>,
    ) -> Result<()> {
        let upper = self.config.quality_policy.deviation_factor() * product.quality_tolerance;
        let deviation = self.rng.gen_range(0.0..upper);
        let passed = deviation <= product.quality_tolerance;
        let standards = ctx.catalog.quality_standards();

        ctx.say(
            AgentRole::Quality,
            format!("Inspecting {} Unit {}...", product.name, unit),
        );
        ctx.say(
            AgentRole::Quality,
            format!(
                "{} Dimensions: {} ({:.2}mm deviation, tolerance {}mm, {} points)",
                if passed { "✓" } else { "✗" },
                if passed { "within tolerance" } else { "out of tolerance" },
                deviation,
                product.quality_tolerance,
                standards.inspection_points
            ),
        );
        ctx.say(
            AgentRole::Quality,
            format!("✓ Surface finish: {}", standards.surface_finish),
        );

        if passed {
            ctx.state.record_quality_pass()?;
            ctx.say(AgentRole::Quality, "✓ PASS");
        } else {
            info!("[UnitProcessor] Unit {} failed inspection ({:.3}mm)", unit, deviation);
            ctx.say(AgentRole::Quality, "✗ FAIL");
        }

        let record = InspectionRecord {
            unit,
            product: product.name.clone(),
            deviation,
            tolerance: product.quality_tolerance,
            passed,
            cycle_time_seconds: cycle_time,
            timestamp: Utc::now(),
        };
        ctx.state.append_cycle_time(cycle_time);
        ctx.state.append_inspection(record.clone());
        ctx.record(
            AgentRole::Quality,
            "inspect_unit",
            json!({ "unit": unit, "deviation": deviation, "passed": passed }),
        );

        result.cycle_time_seconds = Some(cycle_time);
        result.inspection = Some(record);
        Ok(())
    }
}

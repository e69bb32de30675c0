use super::config::{ClockMode, SimulationConfig};
use super::context::CellContext;
use super::unit_processor::{UnitProcessor, UnitResult};
use crate::core::agents::{
    analyze_quality_trends, generate_manufacturing_sequence, parse_production_orders,
    predict_maintenance_needs, suggest_process_improvements, track_production_progress,
    ImprovementTopic,
};
use crate::core::clock::{CancellationToken, Clock, SimulatedClock, WallClock};
use crate::core::equipment_registry::EquipmentRegistry;
use crate::core::error::{CellError, Result};
use crate::core::event::AgentAction;
use crate::core::report::{OrderSummary, SummaryReport};
use crate::core::scenario::{Disruption, Product, ScenarioCatalog};
use crate::core::state::ProductionState;
use crate::core::transcript::Transcript;
use crate::core::types::AgentRole;
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// Where the orchestrator is in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorPhase {
    Idle,
    ProcessingOrder,
    ProcessingUnit,
    BatchAnalysis,
    Changeover,
    Complete,
}

impl OrchestratorPhase {
    pub fn can_transition_to(self, next: OrchestratorPhase) -> bool {
        use OrchestratorPhase::*;
        matches!(
            (self, next),
            (Idle, ProcessingOrder)
                | (ProcessingOrder, ProcessingUnit)
                | (ProcessingUnit, ProcessingUnit)
                | (ProcessingUnit, BatchAnalysis)
                | (BatchAnalysis, Changeover)
                | (BatchAnalysis, ProcessingOrder)
                | (BatchAnalysis, Complete)
                | (Changeover, ProcessingOrder)
        )
    }
}

/// Drives a scenario through planning, execution, inspection and changeover.
///
/// Owns the run state; collaborators read it through [`state`](Self::state).
pub struct ProductionOrchestrator {
    run_id: Uuid,
    catalog: ScenarioCatalog,
    config: SimulationConfig,
    registry: EquipmentRegistry,
    state: ProductionState,
    clock: Box<dyn Clock>,
    token: CancellationToken,
    processor: UnitProcessor,
    phase: OrchestratorPhase,
    phase_history: Vec<OrchestratorPhase>,
}

impl ProductionOrchestrator {
    /// Create an orchestrator for one run of `catalog`
    ///
    /// # Arguments
    /// * `catalog` - The validated scenario to run
    /// * `config` - Simulation settings; validated here
    ///
    /// # Returns
    /// An idle orchestrator, or `CellError::Configuration` if `config` is invalid
    pub fn new(catalog: ScenarioCatalog, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let clock: Box<dyn Clock> = match config.clock_mode {
            ClockMode::Simulated => Box::new(SimulatedClock::new()),
            ClockMode::WallClock { time_scale } => Box::new(WallClock::new(time_scale)),
        };
        let run_id = Uuid::new_v4();
        info!(
            "[Orchestrator] Run {} with {} unit(s), {:?} clock",
            run_id,
            catalog.total_units(),
            config.clock_mode
        );

        Ok(Self {
            run_id,
            registry: EquipmentRegistry::from_catalog(&catalog),
            state: ProductionState::new(catalog.total_units()),
            processor: UnitProcessor::new(config.clone()),
            clock,
            token: CancellationToken::new(),
            catalog,
            config,
            phase: OrchestratorPhase::Idle,
            phase_history: vec![OrchestratorPhase::Idle],
        })
    }

    /// Use an externally owned cancellation token
    ///
    /// # Arguments
    /// * `token` - Token shared with whoever may stop the run
    ///
    /// # Returns
    /// The orchestrator, now observing `token`
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Token that stops the run between units or during a hold
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Identifier stamped on the report and log lines of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Counters and histories accumulated so far
    pub fn state(&self) -> &ProductionState {
        &self.state
    }

    /// Live equipment statuses, including failures raised during the run
    pub fn registry(&self) -> &EquipmentRegistry {
        &self.registry
    }

    /// Scenario being run; never mutated
    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Current phase of the run
    pub fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`
    pub fn phase_history(&self) -> &[OrchestratorPhase] {
        &self.phase_history
    }

    fn transition(&mut self, next: OrchestratorPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(CellError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        debug!("[Orchestrator] {:?} -> {:?}", self.phase, next);
        self.phase = next;
        self.phase_history.push(next);
        Ok(())
    }

    fn record(&mut self, role: AgentRole, action: &str, context: serde_json::Value) {
        self.state
            .append_action(AgentAction::new(role, action, context));
    }

    /// Run every order to completion
    ///
    /// # Arguments
    /// * `transcript` - Receives every agent line and banner in order
    ///
    /// # Returns
    /// The summary report, or the first error. A cancellation returns
    /// `CellError::Cancelled` carrying the number of fully finished units.
    pub fn run(&mut self, transcript: &mut dyn Transcript) -> Result<SummaryReport> {
        if self.phase != OrchestratorPhase::Idle {
            return Err(CellError::InvalidTransition {
                from: self.phase,
                to: OrchestratorPhase::ProcessingOrder,
            });
        }
        let started_at = Utc::now();

        transcript.on_line(AgentRole::System, "Initializing manufacturing cell...");
        transcript.on_line(
            AgentRole::System,
            &format!("Sensors: {} active", self.catalog.sensors().len()),
        );
        transcript.on_line(
            AgentRole::System,
            &format!(
                "Robots: {} operational",
                self.registry.operational_robot_count()
            ),
        );
        transcript.on_line(AgentRole::System, "System ready");

        let plan = parse_production_orders(&self.catalog);
        transcript.on_line(AgentRole::Planning, &format!("Production plan: {}", plan));
        self.record(
            AgentRole::Planning,
            "parse_orders",
            json!({ "total_units": plan.total_units }),
        );

        let orders = self.catalog.orders().to_vec();
        let mut order_summaries = Vec::with_capacity(orders.len());

        for (index, order) in orders.iter().enumerate() {
            self.transition(OrchestratorPhase::ProcessingOrder)?;
            let product = self.catalog.product(&order.product)?.clone();

            info!(
                "[Orchestrator] Order {}: {} x{}",
                index + 1,
                product.name,
                order.quantity
            );
            transcript.on_line(
                AgentRole::Planning,
                &format!(
                    "Starting {} production ({} units)",
                    product.name, order.quantity
                ),
            );
            let sequence = generate_manufacturing_sequence(&self.catalog, &product.name)?;
            transcript.on_line(AgentRole::Planning, &format!("→ Sequence: {}", sequence));

            let results = self.process_order(&product, order.quantity, transcript)?;

            self.transition(OrchestratorPhase::BatchAnalysis)?;
            self.analyze_batch(&product, &results, transcript)?;
            order_summaries.push(OrderSummary::from_results(&product, &results));

            if let Some(next) = orders.get(index + 1) {
                if next.product != order.product {
                    self.transition(OrchestratorPhase::Changeover)?;
                    let next_product = self.catalog.product(&next.product)?.clone();
                    self.changeover(&product, &next_product, transcript);
                }
            }
        }

        self.transition(OrchestratorPhase::Complete)?;
        let report = SummaryReport {
            run_id: self.run_id,
            started_at,
            finished_at: Utc::now(),
            total_units: self.state.total_units(),
            units_completed: self.state.current_unit(),
            quality_checks_passed: self.state.quality_checks_passed(),
            disruptions_handled: self.state.disruptions_handled(),
            blocked_units: self.state.blocked_units().to_vec(),
            success_rate: self.state.success_rate(),
            simulated_seconds: self.clock.elapsed_seconds(),
            orders: order_summaries,
        };

        transcript.on_banner("PRODUCTION COMPLETE");
        transcript.on_line(AgentRole::Planning, "All production orders completed");
        transcript.on_line(
            AgentRole::Planning,
            &format!("→ Total units: {}", plan),
        );
        transcript.on_line(
            AgentRole::Planning,
            &format!("→ Disruptions handled: {}", report.disruptions_handled),
        );
        transcript.on_line(
            AgentRole::Planning,
            &format!("→ Overall success rate: {:.0}%", report.success_rate * 100.0),
        );
        transcript.on_line(
            AgentRole::Planning,
            &format!("→ Simulation time: {} seconds", report.simulated_seconds),
        );
        info!(
            "[Orchestrator] Run {} complete: {}/{} passed",
            self.run_id, report.quality_checks_passed, report.total_units
        );

        Ok(report)
    }

    fn process_order(
        &mut self,
        product: &Product,
        quantity: u32,
        transcript: &mut dyn Transcript,
    ) -> Result<Vec<UnitResult>> {
        let mut results = Vec::with_capacity(quantity as usize);

        for local_unit in 1..=quantity {
            if self.token.is_cancelled() {
                warn!("[Orchestrator] Cancelled before unit {}", self.state.current_unit() + 1);
                return Err(CellError::Cancelled {
                    completed_units: self.state.current_unit(),
                });
            }
            self.transition(OrchestratorPhase::ProcessingUnit)?;
            let unit = self.state.advance_unit(&product.name)?;
            transcript.on_banner(&format!(
                "PRODUCT: {} (Unit {}/{})",
                product.name,
                unit,
                self.state.total_units()
            ));

            let mut ctx = CellContext {
                catalog: &self.catalog,
                registry: &mut self.registry,
                state: &mut self.state,
                clock: self.clock.as_mut(),
                token: &self.token,
                transcript: &mut *transcript,
            };
            let result = self
                .processor
                .process_unit(product, unit, local_unit, &mut ctx)
                .map_err(|e| match e {
                    CellError::Cancelled { .. } => CellError::Cancelled {
                        completed_units: unit - 1,
                    },
                    other => other,
                })?;

            debug!("[Orchestrator] {}", track_production_progress(&self.state));
            results.push(result);
        }

        Ok(results)
    }

    /// Quality review after an order: cycle time vs target, pass rate,
    /// improvements from the batch's incidents, and robot maintenance outlook
    fn analyze_batch(
        &mut self,
        product: &Product,
        results: &[UnitResult],
        transcript: &mut dyn Transcript,
    ) -> Result<()> {
        let (Some(first), Some(last)) = (results.first(), results.last()) else {
            return Ok(());
        };
        transcript.on_line(
            AgentRole::Quality,
            &format!("Analyzing {} batch ({} units)...", product.name, results.len()),
        );

        let inspected = results.iter().filter(|r| r.inspection.is_some()).count();
        let trend = analyze_quality_trends(&self.catalog, &self.state, &product.name, inspected)?;
        transcript.on_line(AgentRole::Quality, &format!("→ {}", trend));
        let pass_rate = results.iter().filter(|r| r.passed()).count() as f64
            / results.len() as f64
            * 100.0;
        transcript.on_line(
            AgentRole::Quality,
            &format!("→ Quality pass rate: {:.0}%", pass_rate),
        );

        let mut topics = Vec::new();
        let mut failed_robots = Vec::new();
        for incident in self
            .state
            .incidents()
            .iter()
            .filter(|i| i.unit >= first.unit && i.unit <= last.unit)
        {
            match self.catalog.disruptions_at(incident.unit).first() {
                Some(Disruption::EquipmentFailure { target, .. }) => {
                    let alternate = results
                        .iter()
                        .find(|r| r.unit == incident.unit)
                        .and_then(|r| r.robot.clone());
                    failed_robots.push((target.clone(), alternate));
                    topics.push(ImprovementTopic::EquipmentFailure {
                        robot: target.clone(),
                    });
                }
                Some(Disruption::MaterialShortage { target, .. }) => {
                    topics.push(ImprovementTopic::MaterialShortage {
                        material: target.clone(),
                    });
                }
                Some(Disruption::HumanIntervention { .. }) | None => {}
            }
        }
        if let Some(overrun) = trend.overrun_seconds() {
            topics.push(ImprovementTopic::CycleTime {
                overrun_seconds: overrun,
            });
        }
        if topics.is_empty() {
            topics.push(ImprovementTopic::General);
        }
        for topic in &topics {
            let improvement = suggest_process_improvements(topic);
            transcript.on_line(
                AgentRole::Quality,
                &format!("PROCESS IMPROVEMENT: {}", improvement),
            );
        }

        let mut robots: Vec<String> = Vec::new();
        for robot in results.iter().filter_map(|r| r.robot.clone()) {
            if !robots.contains(&robot) {
                robots.push(robot);
            }
        }
        for robot in &robots {
            match predict_maintenance_needs(
                &self.registry,
                robot,
                self.config.maintenance_threshold_cycles,
            ) {
                Ok(forecast) => transcript.on_line(
                    AgentRole::Quality,
                    &format!("PREDICTIVE MAINTENANCE: {}", forecast),
                ),
                Err(CellError::NotFound { .. }) => {
                    warn!("[Orchestrator] No maintenance data for {}", robot)
                }
                Err(e) => return Err(e),
            }
        }

        for (failed, alternate) in &failed_robots {
            transcript.on_line(AgentRole::Planning, "Feedback received from Quality Agent");
            transcript.on_line(
                AgentRole::Planning,
                &format!("→ Noted: {} needs maintenance", failed),
            );
            match alternate {
                Some(alternate) => transcript.on_line(
                    AgentRole::Planning,
                    &format!("→ Adjusting: future tasks remain on {} until repair", alternate),
                ),
                None => transcript.on_line(
                    AgentRole::Planning,
                    "→ Adjusting: production waits for maintenance",
                ),
            }
        }

        self.record(
            AgentRole::Quality,
            "analyze_batch",
            json!({
                "product": product.name,
                "units": results.len(),
                "pass_rate": pass_rate,
                "improvements": topics.len(),
            }),
        );
        Ok(())
    }

    /// Reconfigure the cell from `current` to `next`
    fn changeover(&mut self, current: &Product, next: &Product, transcript: &mut dyn Transcript) {
        transcript.on_banner(&format!(
            "PRODUCT CHANGEOVER: {} → {}",
            current.name, next.name
        ));
        transcript.on_line(AgentRole::Planning, "Managing product changeover...");

        let current_caps = current.required_capabilities();
        for capability in next
            .required_capabilities()
            .iter()
            .filter(|c| !current_caps.contains(c))
        {
            transcript.on_line(
                AgentRole::Planning,
                &format!("→ {} requires {} capability", next.name, capability),
            );
        }

        let assigned = self.registry.assign_robot(next).map(|r| (r.id.clone(), r.station.clone()));
        match &assigned {
            Some((robot, station)) => transcript.on_line(
                AgentRole::Planning,
                &format!("→ Assigning to {} ({})", robot, station),
            ),
            None => {
                warn!("[Orchestrator] No operational robot for {}", next.name);
                transcript.on_line(
                    AgentRole::Planning,
                    &format!("→ No operational robot available for {}", next.name),
                );
            }
        }

        let removed: Vec<&str> = current
            .required_tools
            .iter()
            .filter(|t| !next.required_tools.contains(t))
            .map(String::as_str)
            .collect();
        let added: Vec<&str> = next
            .required_tools
            .iter()
            .filter(|t| !current.required_tools.contains(t))
            .map(String::as_str)
            .collect();
        if removed.is_empty() && added.is_empty() {
            transcript.on_line(AgentRole::RobotControl, "No tool change required");
        } else {
            transcript.on_line(
                AgentRole::RobotControl,
                &format!(
                    "Reconfiguring tools: {} → {}",
                    if removed.is_empty() { "-".to_string() } else { removed.join(", ") },
                    if added.is_empty() { "-".to_string() } else { added.join(", ") }
                ),
            );
        }

        let seconds = self.config.changeover_seconds;
        self.clock.advance(seconds);
        transcript.on_line(
            AgentRole::RobotControl,
            &format!("✓ Tool changeover complete ({}s)", seconds),
        );
        self.record(
            AgentRole::Planning,
            "changeover",
            json!({
                "from": current.name,
                "to": next.name,
                "robot": assigned.map(|(robot, _)| robot),
                "tools_removed": removed,
                "tools_added": added,
                "seconds": seconds,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::execution::config::QualityPolicy;
    use crate::core::transcript::RecordingTranscript;
    use crate::core::types::EquipmentStatus;
    use OrchestratorPhase::*;

    const SCENARIO: &str = include_str!("../../../scenarios/manufacturing_scenario.json");

    fn orchestrator(json: &str) -> ProductionOrchestrator {
        let catalog = ScenarioCatalog::from_json_str(json).unwrap();
        ProductionOrchestrator::new(catalog, SimulationConfig::default().with_random_seed(Some(11)))
            .unwrap()
    }

    #[test]
    fn test_transition_table() {
        assert!(Idle.can_transition_to(ProcessingOrder));
        assert!(ProcessingUnit.can_transition_to(ProcessingUnit));
        assert!(BatchAnalysis.can_transition_to(Complete));
        assert!(!Idle.can_transition_to(Complete));
        assert!(!Complete.can_transition_to(ProcessingOrder));
        assert!(!Changeover.can_transition_to(ProcessingUnit));
        assert!(!ProcessingOrder.can_transition_to(BatchAnalysis));
    }

    #[test]
    fn test_complete_entered_once() {
        let mut orch = orchestrator(SCENARIO);
        let mut transcript = RecordingTranscript::new();
        orch.run(&mut transcript).unwrap();

        assert_eq!(orch.phase(), Complete);
        let history = orch.phase_history();
        assert_eq!(history.iter().filter(|p| **p == Complete).count(), 1);
        assert_eq!(history.iter().filter(|p| **p == Changeover).count(), 1);
        assert_eq!(history.iter().filter(|p| **p == ProcessingUnit).count(), 5);
    }

    #[test]
    fn test_second_run_rejected() {
        let mut orch = orchestrator(SCENARIO);
        let mut transcript = RecordingTranscript::new();
        orch.run(&mut transcript).unwrap();
        assert!(matches!(
            orch.run(&mut transcript),
            Err(CellError::InvalidTransition { from: Complete, .. })
        ));
    }

    #[test]
    fn test_changeover_uses_product_data() {
        let mut orch = orchestrator(SCENARIO);
        let mut transcript = RecordingTranscript::new();
        orch.run(&mut transcript).unwrap();

        let lines = transcript.render();
        assert!(lines.contains("Widget-B requires weld capability"));
        assert!(lines.contains("Reconfiguring tools: assembly_tool → welding_tool"));
        assert!(lines.contains("Assigning to robot_2 (welding_station)"));
        assert!(lines.contains("Tool changeover complete (10s)"));
    }

    #[test]
    fn test_batch_analysis_reflects_incidents() {
        let mut orch = orchestrator(SCENARIO);
        let mut transcript = RecordingTranscript::new();
        orch.run(&mut transcript).unwrap();

        let quality = transcript.lines_for(AgentRole::Quality);
        assert!(quality
            .iter()
            .any(|l| l.contains("Schedule preventive maintenance for robot_1")));
        assert!(quality
            .iter()
            .any(|l| l.contains("Increase material buffer stock for component_B")));
        assert!(quality
            .iter()
            .any(|l| l.starts_with("PREDICTIVE MAINTENANCE: robot_2 at 383 cycles")));
        assert!(transcript
            .lines_for(AgentRole::Planning)
            .contains(&"→ Adjusting: future tasks remain on robot_2 until repair"));
    }

    #[test]
    fn test_cancel_before_start() {
        let mut orch = orchestrator(SCENARIO);
        orch.cancellation_token().cancel();
        let mut transcript = RecordingTranscript::new();
        assert!(matches!(
            orch.run(&mut transcript),
            Err(CellError::Cancelled { completed_units: 0 })
        ));
        assert_eq!(orch.state().current_unit(), 0);
        assert_ne!(orch.phase(), Complete);
    }

    #[test]
    fn test_all_robots_down_blocks_units_but_completes() {
        let mut doc: serde_json::Value = serde_json::from_str(SCENARIO).unwrap();
        doc["disruptions"] = serde_json::json!([]);
        doc["equipment"]["robot_1"]["status"] = "failed".into();
        doc["equipment"]["robot_2"]["status"] = "maintenance".into();
        let mut orch = orchestrator(&doc.to_string());
        let mut transcript = RecordingTranscript::new();
        let report = orch.run(&mut transcript).unwrap();

        assert_eq!(report.blocked_units, vec![1, 2, 3, 4, 5]);
        assert_eq!(report.quality_checks_passed, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(orch.phase(), Complete);
        assert!(!orch.registry().get("robot_2").unwrap().status.is_operational());
        assert_eq!(
            orch.registry().get("robot_1").unwrap().status,
            EquipmentStatus::Failed
        );
    }

    #[test]
    fn test_infinite_quality_factor_rejected() {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let config = SimulationConfig::default()
            .with_quality_policy(QualityPolicy::Widened { factor: f64::INFINITY });
        assert!(matches!(
            ProductionOrchestrator::new(catalog, config),
            Err(CellError::Configuration(_))
        ));
    }

    #[test]
    fn test_untimeable_hold_aborts_run() {
        let mut doc: serde_json::Value = serde_json::from_str(SCENARIO).unwrap();
        doc["disruptions"] = serde_json::json!([{
            "type": "human_intervention",
            "occurs_at_unit": 1,
            "location": "welding_station",
            "reason": "Operator entering cell",
            "duration_seconds": 1e300
        }]);
        let catalog = ScenarioCatalog::from_json_str(&doc.to_string()).unwrap();
        let config = SimulationConfig::default()
            .with_random_seed(Some(11))
            .with_clock_mode(ClockMode::WallClock { time_scale: 1.0 });
        let mut orch = ProductionOrchestrator::new(catalog, config).unwrap();
        let mut transcript = RecordingTranscript::new();

        assert!(matches!(
            orch.run(&mut transcript),
            Err(CellError::Configuration(_))
        ));
        assert_ne!(orch.phase(), Complete);
    }

    #[test]
    fn test_simulated_time_accounts_cycles_and_changeover() {
        let mut orch = orchestrator(SCENARIO);
        let mut transcript = RecordingTranscript::new();
        let report = orch.run(&mut transcript).unwrap();
        let cycles: f64 = orch.state().cycle_times().iter().sum();
        assert!((report.simulated_seconds - (cycles + 10.0)).abs() < 1e-9);
    }
}

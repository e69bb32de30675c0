use super::error::{CellError, Result};
use super::event::{AgentAction, IncidentRecord, InspectionRecord, SensorReading};
use serde::{Deserialize, Serialize};

/// Run-wide counters and append-only logs.
///
/// Owned by the orchestrator and handed to components by `&mut`. Counters only
/// grow and log entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct ProductionState {
    current_unit: u32,
    total_units: u32,
    current_product: Option<String>,
    disruptions_handled: u32,
    quality_checks_passed: u32,
    cycle_times: Vec<f64>,
    incidents: Vec<IncidentRecord>,
    agent_actions: Vec<AgentAction>,
    sensor_readings: Vec<SensorReading>,
    inspections: Vec<InspectionRecord>,
    blocked_units: Vec<u32>,
}

impl ProductionState {
    /// Create an empty state for a run of `total_units`
    pub fn new(total_units: u32) -> Self {
        Self {
            total_units,
            ..Self::default()
        }
    }

    /// Move to the next global unit and return its 1-based index
    pub fn advance_unit(&mut self, product: &str) -> Result<u32> {
        if self.current_unit >= self.total_units {
            return Err(CellError::InvariantViolation(format!(
                "unit {} would exceed total of {}",
                self.current_unit + 1,
                self.total_units
            )));
        }
        self.current_unit += 1;
        self.current_product = Some(product.to_string());
        Ok(self.current_unit)
    }

    pub fn record_quality_pass(&mut self) -> Result<()> {
        if self.quality_checks_passed >= self.current_unit {
            return Err(CellError::InvariantViolation(format!(
                "quality pass {} would exceed current unit {}",
                self.quality_checks_passed + 1,
                self.current_unit
            )));
        }
        self.quality_checks_passed += 1;
        Ok(())
    }

    pub fn record_disruption_handled(&mut self) {
        self.disruptions_handled += 1;
    }

    pub fn record_blocked_unit(&mut self, unit: u32) {
        self.blocked_units.push(unit);
    }

    pub fn append_cycle_time(&mut self, seconds: f64) {
        self.cycle_times.push(seconds);
    }

    pub fn append_incident(&mut self, record: IncidentRecord) {
        self.incidents.push(record);
    }

    pub fn append_action(&mut self, record: AgentAction) {
        self.agent_actions.push(record);
    }

    pub fn append_sensor_reading(&mut self, record: SensorReading) {
        self.sensor_readings.push(record);
    }

    pub fn append_inspection(&mut self, record: InspectionRecord) {
        self.inspections.push(record);
    }

    pub fn current_unit(&self) -> u32 {
        self.current_unit
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn current_product(&self) -> Option<&str> {
        self.current_product.as_deref()
    }

    pub fn disruptions_handled(&self) -> u32 {
        self.disruptions_handled
    }

    pub fn quality_checks_passed(&self) -> u32 {
        self.quality_checks_passed
    }

    pub fn cycle_times(&self) -> &[f64] {
        &self.cycle_times
    }

    pub fn incidents(&self) -> &[IncidentRecord] {
        &self.incidents
    }

    pub fn agent_actions(&self) -> &[AgentAction] {
        &self.agent_actions
    }

    pub fn sensor_readings(&self) -> &[SensorReading] {
        &self.sensor_readings
    }

    pub fn inspections(&self) -> &[InspectionRecord] {
        &self.inspections
    }

    /// Inspections of `product`, most recent last
    pub fn inspections_for<'a>(&'a self, product: &'a str) -> impl Iterator<Item = &'a InspectionRecord> {
        self.inspections.iter().filter(move |r| r.product == product)
    }

    pub fn blocked_units(&self) -> &[u32] {
        &self.blocked_units
    }

    /// Fraction of all planned units that passed inspection
    pub fn success_rate(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        self.quality_checks_passed as f64 / self.total_units as f64
    }

    /// Serializable copy of the state, for reports and external readers
    pub fn snapshot(&self) -> ProductionSnapshot {
        ProductionSnapshot {
            current_unit: self.current_unit,
            total_units: self.total_units,
            current_product: self.current_product.clone(),
            disruptions_handled: self.disruptions_handled,
            quality_checks_passed: self.quality_checks_passed,
            cycle_times: self.cycle_times.clone(),
            incidents: self.incidents.clone(),
            agent_actions: self.agent_actions.clone(),
            sensor_readings: self.sensor_readings.clone(),
            inspections: self.inspections.clone(),
            blocked_units: self.blocked_units.clone(),
        }
    }
}

/// Point-in-time copy of [`ProductionState`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionSnapshot {
    pub current_unit: u32,
    pub total_units: u32,
    pub current_product: Option<String>,
    pub disruptions_handled: u32,
    pub quality_checks_passed: u32,
    pub cycle_times: Vec<f64>,
    pub incidents: Vec<IncidentRecord>,
    pub agent_actions: Vec<AgentAction>,
    pub sensor_readings: Vec<SensorReading>,
    pub inspections: Vec<InspectionRecord>,
    pub blocked_units: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_unit_counts_up() {
        let mut state = ProductionState::new(3);
        assert_eq!(state.advance_unit("Widget-A").unwrap(), 1);
        assert_eq!(state.advance_unit("Widget-A").unwrap(), 2);
        assert_eq!(state.current_product(), Some("Widget-A"));
        assert_eq!(state.advance_unit("Widget-B").unwrap(), 3);
        assert_eq!(state.current_product(), Some("Widget-B"));
    }

    #[test]
    fn test_advance_unit_never_exceeds_total() {
        let mut state = ProductionState::new(1);
        state.advance_unit("Widget-A").unwrap();
        assert!(matches!(
            state.advance_unit("Widget-A"),
            Err(CellError::InvariantViolation(_))
        ));
        assert_eq!(state.current_unit(), 1);
    }

    #[test]
    fn test_quality_pass_bounded_by_current_unit() {
        let mut state = ProductionState::new(2);
        assert!(state.record_quality_pass().is_err());
        state.advance_unit("Widget-A").unwrap();
        state.record_quality_pass().unwrap();
        assert!(state.record_quality_pass().is_err());
        assert_eq!(state.quality_checks_passed(), 1);
    }

    #[test]
    fn test_success_rate() {
        let mut state = ProductionState::new(4);
        assert_eq!(state.success_rate(), 0.0);
        for _ in 0..2 {
            state.advance_unit("Widget-A").unwrap();
            state.record_quality_pass().unwrap();
        }
        assert!((state.success_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(ProductionState::new(0).success_rate(), 0.0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut state = ProductionState::new(2);
        state.append_cycle_time(47.0);
        let snapshot = state.snapshot();
        state.append_cycle_time(50.0);
        assert_eq!(snapshot.cycle_times, vec![47.0]);
        assert_eq!(state.cycle_times().len(), 2);
    }
}

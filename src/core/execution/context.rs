use crate::core::clock::{CancellationToken, Clock};
use crate::core::equipment_registry::EquipmentRegistry;
use crate::core::event::AgentAction;
use crate::core::scenario::ScenarioCatalog;
use crate::core::state::ProductionState;
use crate::core::transcript::Transcript;
use crate::core::types::AgentRole;
use serde_json::Value;

/// Everything a unit of work reads or writes, borrowed for the length of one call.
///
/// The orchestrator owns the pieces and lends them out; there is exactly one
/// writer of the state at any time.
pub struct CellContext<'a> {
    pub catalog: &'a ScenarioCatalog,
    pub registry: &'a mut EquipmentRegistry,
    pub state: &'a mut ProductionState,
    pub clock: &'a mut dyn Clock,
    pub token: &'a CancellationToken,
    pub transcript: &'a mut dyn Transcript,
}

impl<'a> CellContext<'a> {
    /// Narrate a line for `role`
    pub fn say(&mut self, role: AgentRole, line: impl AsRef<str>) {
        self.transcript.on_line(role, line.as_ref());
    }

    /// Append an audit record for an action taken by `role`
    pub fn record(&mut self, role: AgentRole, action: &str, context: Value) {
        self.state.append_action(AgentAction::new(role, action, context));
    }
}

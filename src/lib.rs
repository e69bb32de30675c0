pub mod core;

// Re-export commonly used types
pub use crate::core::clock::{CancellationToken, Clock, SimulatedClock, WallClock};
pub use crate::core::equipment_registry::EquipmentRegistry;
pub use crate::core::error::{CellError, Result};
pub use crate::core::execution::{
    ClockMode, OrchestratorPhase, ProductionOrchestrator, QualityPolicy, SimulationConfig,
};
pub use crate::core::report::{OrderSummary, SummaryReport};
pub use crate::core::scenario::{Disruption, ScenarioCatalog};
pub use crate::core::state::{ProductionSnapshot, ProductionState};
pub use crate::core::transcript::{RecordingTranscript, StdoutTranscript, Transcript};
pub use crate::core::types::{AgentRole, DisruptionKind, EquipmentStatus};

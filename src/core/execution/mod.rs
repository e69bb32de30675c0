pub mod config;
pub mod context;
pub mod disruption_engine;
pub mod orchestrator;
pub mod unit_processor;

// Re-export commonly used types
pub use config::{ClockMode, QualityPolicy, SimulationConfig};
pub use context::CellContext;
pub use disruption_engine::{DisruptionEngine, DisruptionOutcome};
pub use orchestrator::{OrchestratorPhase, ProductionOrchestrator};
pub use unit_processor::{UnitProcessor, UnitResult};

pub mod agents;
pub mod clock;
pub mod equipment_registry;
pub mod error;
pub mod event;
pub mod execution;
pub mod report;
pub mod scenario;
pub mod state;
pub mod transcript;
pub mod types;

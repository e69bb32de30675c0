pub mod catalog;
pub mod models;

pub use catalog::ScenarioCatalog;
pub use models::{
    Disruption, Equipment, Product, ProductionOrder, QualityStandards, SafetyProtocols,
    ScenarioDocument, SensorSpec,
};

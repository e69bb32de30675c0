use super::models::{
    Disruption, Equipment, Product, ProductionOrder, QualityStandards, SafetyProtocols,
    ScenarioDocument, SensorSpec,
};
use crate::core::error::{CellError, Result};
use indexmap::IndexMap;
use log::{debug, info};
use std::path::Path;

/// Read-only view over a loaded scenario document.
///
/// The catalog is never mutated during a run. Equipment status changes go
/// through [`EquipmentRegistry`](crate::core::equipment_registry::EquipmentRegistry),
/// which starts from a copy of the catalog's equipment table.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    orders: Vec<ProductionOrder>,
    products: IndexMap<String, Product>,
    equipment: IndexMap<String, Equipment>,
    sensors: IndexMap<String, SensorSpec>,
    disruptions: Vec<Disruption>,
    safety_protocols: SafetyProtocols,
    quality_standards: QualityStandards,
    total_units: u32,
}

impl ScenarioCatalog {
    /// Load and validate a scenario from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CellError::Configuration(format!("cannot read scenario {}: {}", path.display(), e))
        })?;
        info!("[Scenario] Loading {}", path.display());
        Self::from_json_str(&text)
    }

    /// Parse and validate a scenario from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: ScenarioDocument = serde_json::from_str(text)
            .map_err(|e| CellError::Configuration(format!("malformed scenario document: {}", e)))?;
        Self::from_document(document)
    }

    /// Validate an already-parsed document and take ownership of it
    pub fn from_document(mut document: ScenarioDocument) -> Result<Self> {
        for (name, product) in document.products.iter_mut() {
            product.name = name.clone();
        }
        for (id, equipment) in document.equipment.iter_mut() {
            equipment.id = id.clone();
        }

        let mut catalog = Self {
            orders: document.production_orders,
            products: document.products,
            equipment: document.equipment,
            sensors: document.sensors,
            disruptions: document.disruptions,
            safety_protocols: document.safety_protocols,
            quality_standards: document.quality_standards,
            total_units: 0,
        };
        catalog.total_units = catalog.validate()?;

        debug!(
            "[Scenario] {} order(s), {} product(s), {} equipment, {} disruption(s)",
            catalog.orders.len(),
            catalog.products.len(),
            catalog.equipment.len(),
            catalog.disruptions.len()
        );
        Ok(catalog)
    }

    /// Check the document and return the total unit count across all orders
    fn validate(&self) -> Result<u32> {
        if self.orders.is_empty() {
            return Err(CellError::Configuration(
                "production_orders must not be empty".to_string(),
            ));
        }

        let mut total: u32 = 0;
        for order in &self.orders {
            if order.quantity == 0 {
                return Err(CellError::Configuration(format!(
                    "order for {} must have a positive quantity",
                    order.product
                )));
            }
            if !self.products.contains_key(&order.product) {
                return Err(CellError::Configuration(format!(
                    "order references unknown product '{}'",
                    order.product
                )));
            }
            total = total.checked_add(order.quantity).ok_or_else(|| {
                CellError::Configuration("total units overflow".to_string())
            })?;
        }

        for product in self.products.values() {
            if product.steps.is_empty() {
                return Err(CellError::Configuration(format!(
                    "product {} has no steps",
                    product.name
                )));
            }
            if !(product.cycle_time_seconds > 0.0) {
                return Err(CellError::Configuration(format!(
                    "product {} must have a positive cycle_time_seconds",
                    product.name
                )));
            }
            if !(product.quality_tolerance > 0.0) {
                return Err(CellError::Configuration(format!(
                    "product {} must have a positive quality_tolerance",
                    product.name
                )));
            }
        }

        for disruption in &self.disruptions {
            if disruption.occurs_at_unit() == 0 {
                return Err(CellError::Configuration(format!(
                    "{} disruption must occur at unit 1 or later",
                    disruption.kind()
                )));
            }
            if let Disruption::HumanIntervention {
                duration_seconds, ..
            } = disruption
            {
                if *duration_seconds < 0.0 {
                    return Err(CellError::Configuration(
                        "human_intervention duration_seconds must not be negative".to_string(),
                    ));
                }
            }
        }

        Ok(total)
    }

    pub fn product(&self, name: &str) -> Result<&Product> {
        self.products
            .get(name)
            .ok_or_else(|| CellError::not_found("product", name))
    }

    pub fn equipment(&self, name: &str) -> Result<&Equipment> {
        self.equipment
            .get(name)
            .ok_or_else(|| CellError::not_found("equipment", name))
    }

    pub fn sensor(&self, name: &str) -> Result<&SensorSpec> {
        self.sensors
            .get(name)
            .ok_or_else(|| CellError::not_found("sensor", name))
    }

    /// All disruptions scheduled at `unit`, in catalog order
    pub fn disruptions_at(&self, unit: u32) -> Vec<&Disruption> {
        self.disruptions
            .iter()
            .filter(|d| d.occurs_at_unit() == unit)
            .collect()
    }

    pub fn disruptions(&self) -> &[Disruption] {
        &self.disruptions
    }

    pub fn orders(&self) -> &[ProductionOrder] {
        &self.orders
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Equipment in document order
    pub fn equipment_iter(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.values()
    }

    pub fn sensors(&self) -> &IndexMap<String, SensorSpec> {
        &self.sensors
    }

    pub fn safety_protocols(&self) -> &SafetyProtocols {
        &self.safety_protocols
    }

    pub fn quality_standards(&self) -> &QualityStandards {
        &self.quality_standards
    }

    /// Sum of all order quantities, checked when the catalog was loaded
    pub fn total_units(&self) -> u32 {
        self.total_units
    }
}

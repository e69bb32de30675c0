use super::error::{CellError, Result};
use super::scenario::{Equipment, Product, ScenarioCatalog};
use super::types::EquipmentStatus;
use indexmap::IndexMap;
use log::{debug, warn};

/// Mutable equipment table for one run.
///
/// Starts as a copy of the catalog's equipment and keeps its iteration order,
/// so "first match" selections follow the scenario document.
#[derive(Debug, Clone)]
pub struct EquipmentRegistry {
    equipment: IndexMap<String, Equipment>,
}

impl EquipmentRegistry {
    /// Create a registry seeded from the catalog
    pub fn from_catalog(catalog: &ScenarioCatalog) -> Self {
        let equipment = catalog
            .equipment_iter()
            .map(|e| (e.id.clone(), e.clone()))
            .collect();
        Self { equipment }
    }

    /// Get equipment by id
    pub fn get(&self, id: &str) -> Result<&Equipment> {
        self.equipment
            .get(id)
            .ok_or_else(|| CellError::not_found("equipment", id))
    }

    /// All equipment in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.values()
    }

    /// Robot-tagged equipment in catalog order
    pub fn robots(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.values().filter(|e| e.is_robot())
    }

    /// Set the status of a piece of equipment. Status changes are the only
    /// mutation besides the cycle counter.
    pub fn set_status(&mut self, id: &str, status: EquipmentStatus) -> Result<()> {
        let equipment = self
            .equipment
            .get_mut(id)
            .ok_or_else(|| CellError::not_found("equipment", id))?;
        debug!("[Registry] {} status {} -> {}", id, equipment.status, status);
        equipment.status = status;
        Ok(())
    }

    /// Count one completed cycle on the given equipment
    pub fn record_cycle(&mut self, id: &str) -> Result<u64> {
        let equipment = self
            .equipment
            .get_mut(id)
            .ok_or_else(|| CellError::not_found("equipment", id))?;
        equipment.cycles_completed += 1;
        Ok(equipment.cycles_completed)
    }

    /// First operational robot other than `excluded`
    pub fn first_operational_robot_except(&self, excluded: &str) -> Option<&Equipment> {
        self.robots()
            .find(|e| e.id != excluded && e.status.is_operational())
    }

    /// Choose a robot for a product: the first operational robot covering every
    /// step capability, falling back to the first operational robot.
    pub fn assign_robot(&self, product: &Product) -> Option<&Equipment> {
        let required = product.required_capabilities();
        let capable = self.robots().find(|e| {
            e.status.is_operational() && required.iter().all(|cap| e.has_capability(cap))
        });

        capable.or_else(|| {
            let fallback = self.robots().find(|e| e.status.is_operational());
            if let Some(robot) = fallback {
                warn!(
                    "[Registry] No robot covers {:?} for {}; falling back to {}",
                    required, product.name, robot.id
                );
            }
            fallback
        })
    }

    pub fn operational_robot_count(&self) -> usize {
        self.robots().filter(|e| e.status.is_operational()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = include_str!("../../scenarios/manufacturing_scenario.json");

    fn registry() -> (ScenarioCatalog, EquipmentRegistry) {
        let catalog = ScenarioCatalog::from_json_str(SCENARIO).unwrap();
        let registry = EquipmentRegistry::from_catalog(&catalog);
        (catalog, registry)
    }

    #[test]
    fn test_robots_exclude_untagged_equipment() {
        let (_, registry) = registry();
        let ids: Vec<&str> = registry.robots().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["robot_1", "robot_2"]);
    }

    #[test]
    fn test_assign_prefers_capable_robot() {
        let (catalog, registry) = registry();
        let widget_a = catalog.product("Widget-A").unwrap();
        let widget_b = catalog.product("Widget-B").unwrap();
        assert_eq!(registry.assign_robot(widget_a).unwrap().id, "robot_1");
        assert_eq!(registry.assign_robot(widget_b).unwrap().id, "robot_2");
    }

    #[test]
    fn test_failed_robot_is_skipped() {
        let (catalog, mut registry) = registry();
        registry.set_status("robot_1", EquipmentStatus::Failed).unwrap();
        let widget_a = catalog.product("Widget-A").unwrap();
        assert_eq!(registry.assign_robot(widget_a).unwrap().id, "robot_2");
        assert_eq!(registry.operational_robot_count(), 1);
        assert!(registry.first_operational_robot_except("robot_2").is_none());
    }

    #[test]
    fn test_no_robot_when_all_failed() {
        let (catalog, mut registry) = registry();
        registry.set_status("robot_1", EquipmentStatus::Failed).unwrap();
        registry.set_status("robot_2", EquipmentStatus::Failed).unwrap();
        assert!(registry.assign_robot(catalog.product("Widget-B").unwrap()).is_none());
    }

    #[test]
    fn test_registry_does_not_touch_catalog() {
        let (catalog, mut registry) = registry();
        registry.set_status("robot_1", EquipmentStatus::Failed).unwrap();
        registry.record_cycle("robot_2").unwrap();
        assert!(catalog.equipment("robot_1").unwrap().status.is_operational());
        assert_eq!(catalog.equipment("robot_2").unwrap().cycles_completed, 383);
        assert_eq!(registry.get("robot_2").unwrap().cycles_completed, 384);
    }

    #[test]
    fn test_unknown_equipment() {
        let (_, mut registry) = registry();
        assert!(registry.set_status("robot_9", EquipmentStatus::Failed).is_err());
        assert!(registry.record_cycle("robot_9").is_err());
    }
}

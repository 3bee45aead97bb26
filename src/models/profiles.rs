//! Species, substrate and task-template catalogs.
//!
//! The engine's numeric policy lives here as plain data with overridable
//! defaults: which species pairs must not transition on the same day,
//! how long each substrate sterilizes and cools, and what a task of each
//! type costs in time and labor. The numbers come from facility SOPs and
//! are tunable per deployment — nothing in the engine re-derives them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{TaskPriority, TaskType};

/// Cultivation profile for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Catalog key, e.g. `oyster`.
    pub species: String,
    /// Preferred substrate; keys into the substrate catalog.
    pub substrate: String,
    /// Minimum days between incubation start and fruiting transition.
    pub min_incubation_days: i64,
    /// Minimum days between fruiting transition and harvest.
    pub min_fruiting_days: i64,
    /// Acceptable incubation air temperature, °C (min, max).
    pub incubation_temp_c: (f64, f64),
    /// Acceptable fruiting air temperature, °C (min, max).
    pub fruiting_temp_c: (f64, f64),
    /// Expected kilograms per hour of harvest labor.
    pub yield_per_labor_hour_kg: f64,
}

impl SpeciesProfile {
    /// Creates a profile with generic mid-range defaults.
    pub fn new(species: impl Into<String>, substrate: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            substrate: substrate.into(),
            min_incubation_days: 14,
            min_fruiting_days: 7,
            incubation_temp_c: (20.0, 24.0),
            fruiting_temp_c: (15.0, 20.0),
            yield_per_labor_hour_kg: 1.5,
        }
    }

    /// Sets the minimum stage durations.
    pub fn with_stage_minimums(mut self, incubation_days: i64, fruiting_days: i64) -> Self {
        self.min_incubation_days = incubation_days;
        self.min_fruiting_days = fruiting_days;
        self
    }

    /// Sets the incubation temperature range.
    pub fn with_incubation_temp(mut self, min_c: f64, max_c: f64) -> Self {
        self.incubation_temp_c = (min_c, max_c);
        self
    }

    /// Sets the fruiting temperature range.
    pub fn with_fruiting_temp(mut self, min_c: f64, max_c: f64) -> Self {
        self.fruiting_temp_c = (min_c, max_c);
        self
    }

    /// Sets the expected yield per harvest labor hour.
    pub fn with_yield_rate(mut self, kg_per_labor_hour: f64) -> Self {
        self.yield_per_labor_hour_kg = kg_per_labor_hour;
        self
    }
}

/// Species catalog: profiles plus the fixed incompatibility table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCatalog {
    profiles: HashMap<String, SpeciesProfile>,
    /// Unordered species pairs that must not share transition days.
    incompatible: Vec<(String, String)>,
}

impl SpeciesCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            incompatible: Vec::new(),
        }
    }

    /// The standard catalog: five production species and the SOP
    /// incompatibility pairs (aggressive sporulators kept away from
    /// slower colonizers on shared transition days).
    pub fn standard() -> Self {
        Self::new()
            .with_profile(
                SpeciesProfile::new("oyster", "straw")
                    .with_stage_minimums(14, 6)
                    .with_incubation_temp(20.0, 24.0)
                    .with_fruiting_temp(15.0, 20.0)
                    .with_yield_rate(2.5),
            )
            .with_profile(
                SpeciesProfile::new("shiitake", "hardwood-sawdust")
                    .with_stage_minimums(45, 10)
                    .with_incubation_temp(20.0, 24.0)
                    .with_fruiting_temp(12.0, 18.0)
                    .with_yield_rate(1.2),
            )
            .with_profile(
                SpeciesProfile::new("lions-mane", "hardwood-sawdust")
                    .with_stage_minimums(18, 10)
                    .with_incubation_temp(21.0, 24.0)
                    .with_fruiting_temp(15.0, 21.0)
                    .with_yield_rate(1.8),
            )
            .with_profile(
                SpeciesProfile::new("king-oyster", "masters-mix")
                    .with_stage_minimums(21, 9)
                    .with_incubation_temp(20.0, 24.0)
                    .with_fruiting_temp(13.0, 18.0)
                    .with_yield_rate(2.0),
            )
            .with_profile(
                SpeciesProfile::new("reishi", "hardwood-sawdust")
                    .with_stage_minimums(30, 21)
                    .with_incubation_temp(24.0, 28.0)
                    .with_fruiting_temp(24.0, 28.0)
                    .with_yield_rate(0.8),
            )
            .with_incompatible("oyster", "lions-mane")
            .with_incompatible("oyster", "shiitake")
            .with_incompatible("reishi", "shiitake")
    }

    /// Adds or replaces a profile.
    pub fn with_profile(mut self, profile: SpeciesProfile) -> Self {
        self.profiles.insert(profile.species.clone(), profile);
        self
    }

    /// Declares an unordered incompatible pair.
    pub fn with_incompatible(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.incompatible.push((a.into(), b.into()));
        self
    }

    /// Looks up a profile by species key (exact match).
    pub fn profile(&self, species: &str) -> Option<&SpeciesProfile> {
        self.profiles.get(species)
    }

    /// Whether two species form an incompatible pair, in either order.
    pub fn incompatible(&self, a: &str, b: &str) -> bool {
        self.incompatible
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Sterilization and cooling minimums for one substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateProfile {
    /// Catalog key, e.g. `straw`.
    pub substrate: String,
    /// Minimum sterilization (or pasteurization) time, hours.
    pub sterilize_hours: f64,
    /// Minimum cooling time before inoculation, hours.
    pub cooling_hours: f64,
}

impl SubstrateProfile {
    pub fn new(substrate: impl Into<String>, sterilize_hours: f64, cooling_hours: f64) -> Self {
        Self {
            substrate: substrate.into(),
            sterilize_hours,
            cooling_hours,
        }
    }
}

/// Substrate catalog with SOP defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateCatalog {
    profiles: HashMap<String, SubstrateProfile>,
}

impl SubstrateCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// The standard catalog: pasteurized straw plus three sterilized
    /// blends.
    pub fn standard() -> Self {
        Self::new()
            .with_profile(SubstrateProfile::new("straw", 2.0, 8.0))
            .with_profile(SubstrateProfile::new("hardwood-sawdust", 2.5, 12.0))
            .with_profile(SubstrateProfile::new("masters-mix", 3.0, 12.0))
            .with_profile(SubstrateProfile::new("grain", 2.5, 10.0))
    }

    /// Adds or replaces a profile.
    pub fn with_profile(mut self, profile: SubstrateProfile) -> Self {
        self.profiles.insert(profile.substrate.clone(), profile);
        self
    }

    /// Looks up a profile by substrate key.
    pub fn profile(&self, substrate: &str) -> Option<&SubstrateProfile> {
        self.profiles.get(substrate)
    }
}

impl Default for SubstrateCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Default duration, labor, priority and equipment per task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub task_type: TaskType,
    pub duration_hours: f64,
    pub labor_hours: f64,
    pub priority: TaskPriority,
    pub equipment_ids: Vec<String>,
}

impl TaskTemplate {
    /// A neutral one-hour template.
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            duration_hours: 1.0,
            labor_hours: 1.0,
            priority: TaskPriority::Normal,
            equipment_ids: Vec::new(),
        }
    }

    /// Sets duration and labor.
    pub fn with_effort(mut self, duration_hours: f64, labor_hours: f64) -> Self {
        self.duration_hours = duration_hours;
        self.labor_hours = labor_hours;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a required piece of equipment.
    pub fn with_equipment(mut self, equipment_id: impl Into<String>) -> Self {
        self.equipment_ids.push(equipment_id.into());
        self
    }
}

/// Template table used by the task generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplates {
    templates: HashMap<TaskType, TaskTemplate>,
}

impl TaskTemplates {
    /// An empty table. Unknown types fall back to a one-hour template.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// The standard SOP effort table.
    pub fn standard() -> Self {
        Self::new()
            .with_template(
                TaskTemplate::new(TaskType::SubstratePrep)
                    .with_effort(6.0, 4.0)
                    .with_priority(TaskPriority::High)
                    .with_equipment("sterilizer"),
            )
            .with_template(
                TaskTemplate::new(TaskType::Inoculation)
                    .with_effort(4.0, 4.0)
                    .with_priority(TaskPriority::High)
                    .with_equipment("flow-hood"),
            )
            .with_template(TaskTemplate::new(TaskType::IncubationTransition).with_effort(2.0, 1.5))
            .with_template(TaskTemplate::new(TaskType::FruitingTransition).with_effort(2.0, 1.5))
            .with_template(TaskTemplate::new(TaskType::Misting).with_effort(1.0, 1.0))
            .with_template(TaskTemplate::new(TaskType::Co2Adjustment).with_effort(0.5, 0.5))
            .with_template(
                TaskTemplate::new(TaskType::Harvest)
                    .with_effort(6.0, 6.0)
                    .with_priority(TaskPriority::High)
                    .with_equipment("harvest-cart"),
            )
            .with_template(
                TaskTemplate::new(TaskType::Cleaning)
                    .with_effort(3.0, 2.5)
                    .with_priority(TaskPriority::High),
            )
            .with_template(
                TaskTemplate::new(TaskType::EquipmentMaintenance)
                    .with_effort(2.0, 2.0)
                    .with_priority(TaskPriority::Low),
            )
            .with_template(
                TaskTemplate::new(TaskType::Monitoring)
                    .with_effort(1.0, 1.0)
                    .with_priority(TaskPriority::Low),
            )
            .with_template(TaskTemplate::new(TaskType::SpeciesReset).with_effort(3.0, 2.0))
    }

    /// Adds or replaces a template.
    pub fn with_template(mut self, template: TaskTemplate) -> Self {
        self.templates.insert(template.task_type, template);
        self
    }

    /// Returns the template for a type, or the neutral fallback.
    pub fn get(&self, task_type: TaskType) -> TaskTemplate {
        self.templates
            .get(&task_type)
            .cloned()
            .unwrap_or_else(|| TaskTemplate::new(task_type))
    }
}

impl Default for TaskTemplates {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatibility_is_unordered() {
        let catalog = SpeciesCatalog::standard();
        assert!(catalog.incompatible("oyster", "lions-mane"));
        assert!(catalog.incompatible("lions-mane", "oyster"));
        assert!(!catalog.incompatible("oyster", "king-oyster"));
        assert!(!catalog.incompatible("oyster", "oyster"));
    }

    #[test]
    fn test_standard_profiles_present() {
        let catalog = SpeciesCatalog::standard();
        let shiitake = catalog.profile("shiitake").unwrap();
        assert_eq!(shiitake.substrate, "hardwood-sawdust");
        assert_eq!(shiitake.min_incubation_days, 45);
        assert!(catalog.profile("portobello").is_none());
    }

    #[test]
    fn test_catalog_override() {
        let catalog = SpeciesCatalog::standard()
            .with_profile(SpeciesProfile::new("oyster", "masters-mix").with_yield_rate(3.0))
            .with_incompatible("oyster", "king-oyster");
        assert_eq!(catalog.profile("oyster").unwrap().substrate, "masters-mix");
        assert!(catalog.incompatible("king-oyster", "oyster"));
    }

    #[test]
    fn test_substrate_minimums() {
        let catalog = SubstrateCatalog::standard();
        let straw = catalog.profile("straw").unwrap();
        assert_eq!(straw.sterilize_hours, 2.0);
        assert_eq!(straw.cooling_hours, 8.0);
    }

    #[test]
    fn test_template_fallback_is_neutral() {
        let templates = TaskTemplates::new();
        let t = templates.get(TaskType::Misting);
        assert_eq!(t.duration_hours, 1.0);
        assert_eq!(t.labor_hours, 1.0);
        assert_eq!(t.priority, TaskPriority::Normal);
        assert!(t.equipment_ids.is_empty());
    }

    #[test]
    fn test_standard_templates() {
        let templates = TaskTemplates::standard();
        let prep = templates.get(TaskType::SubstratePrep);
        assert_eq!(prep.duration_hours, 6.0);
        assert_eq!(prep.equipment_ids, vec!["sterilizer".to_string()]);
        assert_eq!(prep.priority, TaskPriority::High);
    }
}

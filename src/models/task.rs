//! Workflow task model.
//!
//! A task is the atomic unit of facility work produced by the task
//! generator: one sterilization run, one inoculation session, one harvest
//! pass. Tasks are immutable once generated — concrete timing lives on
//! [`ScheduledTask`](super::ScheduledTask), and a task never learns about
//! the schedule it ends up in.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::TaskId;

/// Kind of facility work a task performs.
///
/// The vocabulary is closed on purpose: conflict detectors and policy
/// checks match on these tags exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    /// Mix, hydrate and sterilize substrate.
    SubstratePrep,
    /// Introduce spawn into cooled substrate.
    Inoculation,
    /// Move a batch into incubation conditions.
    IncubationTransition,
    /// Move a batch into fruiting conditions.
    FruitingTransition,
    /// Humidity pass over fruiting rooms.
    Misting,
    /// CO2 setpoint adjustment.
    Co2Adjustment,
    /// Pick mature fruiting bodies.
    Harvest,
    /// Clean and sanitize a room or work area.
    Cleaning,
    /// Preventive equipment maintenance.
    EquipmentMaintenance,
    /// Routine batch inspection.
    Monitoring,
    /// Clear and reset a room between species runs.
    SpeciesReset,
}

impl TaskType {
    /// Kebab-case tag as used in descriptions and log payloads.
    pub fn tag(&self) -> &'static str {
        match self {
            TaskType::SubstratePrep => "substrate-prep",
            TaskType::Inoculation => "inoculation",
            TaskType::IncubationTransition => "incubation-transition",
            TaskType::FruitingTransition => "fruiting-transition",
            TaskType::Misting => "misting",
            TaskType::Co2Adjustment => "co2-adjustment",
            TaskType::Harvest => "harvest",
            TaskType::Cleaning => "cleaning",
            TaskType::EquipmentMaintenance => "equipment-maintenance",
            TaskType::Monitoring => "monitoring",
            TaskType::SpeciesReset => "species-reset",
        }
    }

    /// Lifecycle stage this kind of work belongs to by default.
    pub fn default_stage(&self) -> LifecycleStage {
        match self {
            TaskType::SubstratePrep => LifecycleStage::Preparation,
            TaskType::Inoculation => LifecycleStage::Inoculation,
            TaskType::IncubationTransition | TaskType::Monitoring => LifecycleStage::Incubation,
            TaskType::FruitingTransition | TaskType::Misting | TaskType::Co2Adjustment => {
                LifecycleStage::Fruiting
            }
            TaskType::Harvest => LifecycleStage::Harvest,
            TaskType::Cleaning | TaskType::EquipmentMaintenance | TaskType::SpeciesReset => {
                LifecycleStage::Turnaround
            }
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Scheduling priority. Ordered: `Low < Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Cultivation lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStage {
    Preparation,
    Inoculation,
    Incubation,
    Fruiting,
    Harvest,
    Turnaround,
}

/// An atomic unit of facility work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    /// Unique task identifier.
    pub id: TaskId,
    /// Kind of work.
    pub task_type: TaskType,
    /// Species this task serves, if species-specific.
    pub species: Option<String>,
    /// Room the task runs in, if bound to one.
    pub room: Option<String>,
    /// Facility the task belongs to.
    pub facility: Option<String>,
    /// Lifecycle stage override; the task type's stage applies otherwise.
    pub stage: Option<LifecycleStage>,
    /// Estimated wall-clock duration in hours.
    pub duration_hours: f64,
    /// Estimated labor in person-hours.
    pub labor_hours: f64,
    /// Equipment the task occupies for its whole duration.
    pub equipment_ids: Vec<String>,
    /// Tasks that must end before this one starts.
    pub depends_on: Vec<TaskId>,
    /// Scheduling priority.
    pub priority: TaskPriority,
    /// Human-readable reason this task exists.
    pub rationale: String,
}

impl WorkflowTask {
    /// Creates a task with the given ID and type. Duration and labor
    /// default to one hour each.
    pub fn new(id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: TaskId::new(id),
            task_type,
            species: None,
            room: None,
            facility: None,
            stage: None,
            duration_hours: 1.0,
            labor_hours: 1.0,
            equipment_ids: Vec::new(),
            depends_on: Vec::new(),
            priority: TaskPriority::Normal,
            rationale: String::new(),
        }
    }

    /// Sets the species this task serves.
    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    /// Sets the room the task runs in.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Sets the facility the task belongs to.
    pub fn with_facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    /// Overrides the lifecycle stage.
    pub fn with_stage(mut self, stage: LifecycleStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the estimated duration in hours.
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.duration_hours = hours;
        self
    }

    /// Sets the estimated labor in person-hours.
    pub fn with_labor_hours(mut self, hours: f64) -> Self {
        self.labor_hours = hours;
        self
    }

    /// Adds a piece of equipment the task occupies.
    pub fn with_equipment(mut self, equipment_id: impl Into<String>) -> Self {
        self.equipment_ids.push(equipment_id.into());
        self
    }

    /// Adds a dependency: the referenced task must end first.
    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        self.depends_on.push(TaskId::new(task_id));
        self
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the rationale.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Effective lifecycle stage: the override, or the type's default.
    pub fn lifecycle_stage(&self) -> LifecycleStage {
        self.stage.unwrap_or_else(|| self.task_type.default_stage())
    }

    /// Whether this task has dependencies.
    pub fn has_dependencies(&self) -> bool {
        !self.depends_on.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = WorkflowTask::new("t1", TaskType::SubstratePrep)
            .with_species("oyster")
            .with_room("room-1")
            .with_facility("north")
            .with_duration_hours(6.0)
            .with_labor_hours(4.0)
            .with_equipment("sterilizer")
            .with_dependency("t0")
            .with_priority(TaskPriority::High)
            .with_rationale("Sterilize straw for oyster batch 1");

        assert_eq!(task.id, TaskId::new("t1"));
        assert_eq!(task.task_type, TaskType::SubstratePrep);
        assert_eq!(task.species.as_deref(), Some("oyster"));
        assert_eq!(task.room.as_deref(), Some("room-1"));
        assert_eq!(task.duration_hours, 6.0);
        assert_eq!(task.depends_on, vec![TaskId::new("t0")]);
        assert!(task.has_dependencies());
    }

    #[test]
    fn test_default_stage_by_type() {
        assert_eq!(
            TaskType::SubstratePrep.default_stage(),
            LifecycleStage::Preparation
        );
        assert_eq!(TaskType::Misting.default_stage(), LifecycleStage::Fruiting);
        assert_eq!(
            TaskType::Cleaning.default_stage(),
            LifecycleStage::Turnaround
        );

        let task = WorkflowTask::new("t1", TaskType::Harvest);
        assert_eq!(task.lifecycle_stage(), LifecycleStage::Harvest);

        let task = task.with_stage(LifecycleStage::Turnaround);
        assert_eq!(task.lifecycle_stage(), LifecycleStage::Turnaround);
    }

    #[test]
    fn test_priority_is_ordered() {
        assert!(TaskPriority::Low < TaskPriority::Normal);
        assert!(TaskPriority::Normal < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Critical);
    }

    #[test]
    fn test_task_type_serializes_kebab_case() {
        let json = serde_json::to_string(&TaskType::SubstratePrep).unwrap();
        assert_eq!(json, "\"substrate-prep\"");
        let json = serde_json::to_string(&TaskType::Co2Adjustment).unwrap();
        assert_eq!(json, "\"co2-adjustment\"");
    }
}

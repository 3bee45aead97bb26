//! Task generation.
//!
//! Expands a production request into the flat list of atomic work items
//! a cultivation cycle needs. Each species line yields one task chain
//! per batch (substrate preparation through species reset), and each
//! facility gets recurring cleaning plus one maintenance round.
//! Generation is deterministic given the same request and ID generator;
//! nothing here knows about time — concrete placement is the schedule
//! builder's job.

use std::sync::Arc;

use tracing::debug;

use crate::ids::IdGenerator;
use crate::models::{
    SpeciesCatalog, SpeciesPlan, TaskPriority, TaskTemplates, TaskType, WorkflowRequest,
    WorkflowTask,
};

/// Expands requests into workflow tasks.
pub struct TaskGenerator {
    templates: TaskTemplates,
    catalog: SpeciesCatalog,
    ids: Arc<dyn IdGenerator>,
}

impl TaskGenerator {
    /// Creates a generator with the standard template and species
    /// catalogs.
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            templates: TaskTemplates::standard(),
            catalog: SpeciesCatalog::standard(),
            ids,
        }
    }

    /// Overrides the effort templates.
    pub fn with_templates(mut self, templates: TaskTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Overrides the species catalog.
    pub fn with_catalog(mut self, catalog: SpeciesCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Expands a request into atomic work items.
    ///
    /// An empty request (no species lines, no facilities) yields an
    /// empty list; the caller decides how to report that.
    pub fn generate(&self, request: &WorkflowRequest) -> Vec<WorkflowTask> {
        let mut tasks = Vec::new();

        for plan in &request.species_plans {
            for batch in 1..=plan.batch_count.max(1) {
                self.generate_batch(request, plan, batch, &mut tasks);
            }
        }
        for facility in &request.facility_ids {
            self.generate_facility_upkeep(request, facility, &mut tasks);
        }

        debug!(
            request_id = %request.id,
            task_count = tasks.len(),
            "expanded request into workflow tasks"
        );
        tasks
    }

    /// One full cultivation chain for a species batch.
    fn generate_batch(
        &self,
        request: &WorkflowRequest,
        plan: &SpeciesPlan,
        batch: u32,
        out: &mut Vec<WorkflowTask>,
    ) {
        let label = format!("{} batch {}", plan.species, batch);
        let substrate = self
            .catalog
            .profile(&plan.species)
            .map(|p| p.substrate.clone())
            .unwrap_or_else(|| "substrate".to_string());

        let prep = self
            .line_task(TaskType::SubstratePrep, plan)
            .with_rationale(format!("Sterilize {substrate} for {label}"));
        let inoculate = self
            .line_task(TaskType::Inoculation, plan)
            .with_dependency(prep.id.as_str())
            .with_rationale(format!("Inoculate cooled {substrate} with {} spawn", plan.species));
        let incubate = self
            .line_task(TaskType::IncubationTransition, plan)
            .with_dependency(inoculate.id.as_str())
            .with_rationale(format!("Move {label} into incubation"));
        let fruit = self
            .line_task(TaskType::FruitingTransition, plan)
            .with_dependency(incubate.id.as_str())
            .with_rationale(format!("Move {label} into fruiting conditions"));
        let misting = self
            .line_task(TaskType::Misting, plan)
            .with_dependency(fruit.id.as_str())
            .with_rationale(format!("Humidity pass for {label}"));
        let co2 = self
            .line_task(TaskType::Co2Adjustment, plan)
            .with_dependency(fruit.id.as_str())
            .with_rationale(format!("Adjust CO2 setpoint for {label} fruiting"));

        let mut monitoring = self
            .line_task(TaskType::Monitoring, plan)
            .with_dependency(incubate.id.as_str())
            .with_rationale(format!("Inspect {label} for contamination"));
        if request.weighting.minimize_labor {
            let trimmed = monitoring.labor_hours / 2.0;
            monitoring = monitoring.with_labor_hours(trimmed);
        }

        let mut harvest = self
            .line_task(TaskType::Harvest, plan)
            .with_dependency(fruit.id.as_str())
            .with_rationale(format!("Harvest {label}"));
        if request.weighting.prioritize_yield {
            harvest = harvest.with_priority(TaskPriority::Critical);
        }

        let reset = self
            .line_task(TaskType::SpeciesReset, plan)
            .with_dependency(harvest.id.as_str())
            .with_rationale(format!("Clear and reset {} after {label}", plan.room));

        out.extend([
            prep, inoculate, incubate, fruit, misting, co2, monitoring, harvest, reset,
        ]);
    }

    /// Facility-level upkeep: one cleaning task per started week of the
    /// window (so the builder can hold the cleaning cadence) plus one
    /// maintenance round.
    fn generate_facility_upkeep(
        &self,
        request: &WorkflowRequest,
        facility: &str,
        out: &mut Vec<WorkflowTask>,
    ) {
        let weeks = ((request.window.days_spanned() + 6) / 7).max(1);
        for week in 1..=weeks {
            out.push(
                self.upkeep_task(TaskType::Cleaning, facility)
                    .with_rationale(format!("Sanitize shared areas of {facility} (week {week})")),
            );
        }
        out.push(
            self.upkeep_task(TaskType::EquipmentMaintenance, facility)
                .with_rationale(format!("Preventive maintenance round at {facility}")),
        );
    }

    /// A species-line task stamped from its template.
    fn line_task(&self, task_type: TaskType, plan: &SpeciesPlan) -> WorkflowTask {
        let template = self.templates.get(task_type);
        let mut task = WorkflowTask::new(self.ids.fresh("task"), task_type)
            .with_species(plan.species.as_str())
            .with_room(plan.room.as_str())
            .with_duration_hours(template.duration_hours)
            .with_labor_hours(template.labor_hours)
            .with_priority(template.priority);
        if !plan.facility.is_empty() {
            task = task.with_facility(plan.facility.as_str());
        }
        for equipment in &template.equipment_ids {
            task = task.with_equipment(equipment.as_str());
        }
        task
    }

    /// A facility-level task stamped from its template.
    fn upkeep_task(&self, task_type: TaskType, facility: &str) -> WorkflowTask {
        let template = self.templates.get(task_type);
        let mut task = WorkflowTask::new(self.ids.fresh("task"), task_type)
            .with_facility(facility)
            .with_duration_hours(template.duration_hours)
            .with_labor_hours(template.labor_hours)
            .with_priority(template.priority);
        for equipment in &template.equipment_ids {
            task = task.with_equipment(equipment.as_str());
        }
        task
    }
}

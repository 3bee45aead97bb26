//! Production request model.
//!
//! A [`WorkflowRequest`] is the engine's sole inbound contract: which
//! facilities run, which species go into which rooms, the capacity
//! constraints, the planning window, and how to weight competing goals.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::DateRange;

/// One species batch line in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesPlan {
    /// Species to cultivate (catalog key, e.g. `oyster`).
    pub species: String,
    /// Room the line runs in.
    pub room: String,
    /// Facility the room belongs to.
    pub facility: String,
    /// Number of batches to run back to back.
    pub batch_count: u32,
    /// Harvest target for the whole line, in kilograms.
    pub target_yield_kg: f64,
}

impl SpeciesPlan {
    /// Creates a single-batch line with no yield target.
    pub fn new(species: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            species: species.into(),
            room: room.into(),
            facility: String::new(),
            batch_count: 1,
            target_yield_kg: 0.0,
        }
    }

    /// Sets the facility.
    pub fn with_facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = facility.into();
        self
    }

    /// Sets the batch count.
    pub fn with_batch_count(mut self, batches: u32) -> Self {
        self.batch_count = batches;
        self
    }

    /// Sets the harvest target.
    pub fn with_target_yield(mut self, kg: f64) -> Self {
        self.target_yield_kg = kg;
        self
    }
}

/// Inclusive temperature bounds for a room, in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBounds {
    pub min_c: f64,
    pub max_c: f64,
}

impl TemperatureBounds {
    pub fn new(min_c: f64, max_c: f64) -> Self {
        Self { min_c, max_c }
    }

    /// Whether a required `(min, max)` range overlaps these bounds.
    pub fn admits(&self, required: (f64, f64)) -> bool {
        required.0 <= self.max_c && self.min_c <= required.1
    }
}

/// Capacity constraints a request runs under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    /// Labor available per calendar day, in person-hours.
    pub labor_hours_available: f64,
    /// Equipment IDs the facility can allocate.
    pub available_equipment: Vec<String>,
    /// Maximum concurrent tasks per room. Undeclared rooms are
    /// unconstrained.
    pub room_capacity: HashMap<String, usize>,
    /// Controlled temperature bounds per room. Undeclared rooms are
    /// unconstrained.
    pub room_temperature: HashMap<String, TemperatureBounds>,
    /// Cost per person-hour, used for labor cost estimates.
    pub labor_rate: f64,
}

impl ConstraintSet {
    /// Creates a constraint set with the given daily labor ceiling.
    pub fn new(labor_hours_available: f64) -> Self {
        Self {
            labor_hours_available,
            available_equipment: Vec::new(),
            room_capacity: HashMap::new(),
            room_temperature: HashMap::new(),
            labor_rate: 20.0,
        }
    }

    /// Adds a piece of allocatable equipment.
    pub fn with_equipment(mut self, equipment_id: impl Into<String>) -> Self {
        self.available_equipment.push(equipment_id.into());
        self
    }

    /// Declares a room's concurrent-task capacity.
    pub fn with_room_capacity(mut self, room: impl Into<String>, capacity: usize) -> Self {
        self.room_capacity.insert(room.into(), capacity);
        self
    }

    /// Declares a room's temperature bounds.
    pub fn with_room_temperature(
        mut self,
        room: impl Into<String>,
        bounds: TemperatureBounds,
    ) -> Self {
        self.room_temperature.insert(room.into(), bounds);
        self
    }

    /// Sets the labor rate.
    pub fn with_labor_rate(mut self, rate_per_hour: f64) -> Self {
        self.labor_rate = rate_per_hour;
        self
    }
}

impl Default for ConstraintSet {
    /// One standard shift of labor per day.
    fn default() -> Self {
        Self::new(8.0)
    }
}

/// Goal weighting toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeightingFlags {
    /// Raise harvest tasks to critical priority.
    pub prioritize_yield: bool,
    /// Trim labor estimates on routine monitoring work.
    pub minimize_labor: bool,
}

/// A production request: facilities, species lines, constraints, window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    /// Caller-supplied request identifier.
    pub id: String,
    /// Facilities in scope.
    pub facility_ids: Vec<String>,
    /// Species batch lines.
    pub species_plans: Vec<SpeciesPlan>,
    /// Capacity constraints.
    pub constraints: ConstraintSet,
    /// Planning window.
    pub window: DateRange,
    /// Goal weighting.
    pub weighting: WeightingFlags,
}

impl WorkflowRequest {
    /// Creates a request over the given window with default constraints.
    pub fn new(id: impl Into<String>, window: DateRange) -> Self {
        Self {
            id: id.into(),
            facility_ids: Vec::new(),
            species_plans: Vec::new(),
            constraints: ConstraintSet::default(),
            window,
            weighting: WeightingFlags::default(),
        }
    }

    /// Adds a facility.
    pub fn with_facility(mut self, facility_id: impl Into<String>) -> Self {
        self.facility_ids.push(facility_id.into());
        self
    }

    /// Adds a species line.
    pub fn with_species_plan(mut self, plan: SpeciesPlan) -> Self {
        self.species_plans.push(plan);
        self
    }

    /// Sets the constraint set.
    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the weighting flags.
    pub fn with_weighting(mut self, weighting: WeightingFlags) -> Self {
        self.weighting = weighting;
        self
    }

    /// A request with nothing to generate work for.
    pub fn is_empty(&self) -> bool {
        self.species_plans.is_empty() && self.facility_ids.is_empty()
    }
}

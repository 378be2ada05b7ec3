//! Step bookkeeping
//!
//! Tracks what the runtime reported as available, which step the client
//! has selected, and the stack of composite steps that were entered but
//! not yet completed. Locations are cached beside both, because a step's
//! location is only fetchable while the runtime still lists it.

use std::collections::HashMap;

use tracing::debug;

use stepwise_core::{Location, Result, Step, StepwiseError};

#[derive(Debug, Default)]
pub struct StepManager {
    available: Vec<Step>,
    selected: Option<Step>,
    /// Entered composites, innermost last
    stack: Vec<Step>,
    /// Locations of the currently available steps, keyed by step id
    available_locations: HashMap<String, Option<Location>>,
    /// Locations of the stacked composites, parallel to `stack`
    stack_locations: Vec<Option<Location>>,
}

impl StepManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one runtime report into the step state.
    ///
    /// An empty `completed` list means a composite was just entered: the
    /// selected step moves onto the stack together with its cached
    /// location. Otherwise at least one atomic step ran, and stacked
    /// composites whose ids were reported completed are popped, innermost
    /// first. Either way the available list is replaced and the first
    /// reported step becomes the selection.
    pub fn update(&mut self, available: Vec<Step>, completed: &[String]) {
        if completed.is_empty() {
            if let Some(selected) = self.selected.take() {
                let location = self
                    .available_locations
                    .get(&selected.id)
                    .cloned()
                    .flatten();
                debug!(step = %selected.id, "entered composite step");
                self.stack.push(selected);
                self.stack_locations.push(location);
            }
        } else {
            let mut remaining: Vec<&str> = completed.iter().map(String::as_str).collect();
            loop {
                let Some(top_id) = self.stack.last().map(|step| step.id.clone()) else {
                    break;
                };
                let Some(position) = remaining.iter().position(|id| *id == top_id) else {
                    break;
                };
                remaining.remove(position);
                self.available_locations.remove(&top_id);
                debug!(step = %top_id, "composite step completed");
                self.stack.pop();
                self.stack_locations.pop();
            }
        }

        self.selected = available.first().cloned();
        self.available = available;
        self.available_locations.clear();
    }

    /// Override the default selection
    ///
    /// # Errors
    ///
    /// Returns an error when `id` is not among the available steps.
    pub fn select(&mut self, id: &str) -> Result<bool> {
        let step = self
            .available
            .iter()
            .find(|step| step.id == id)
            .cloned()
            .ok_or_else(|| {
                StepwiseError::invalid_request(format!("step '{id}' is not available"))
            })?;
        let changed = self.selected.as_ref().map(|s| s.id.as_str()) != Some(id);
        self.selected = Some(step);
        Ok(changed)
    }

    pub fn cache_location(&mut self, step_id: &str, location: Option<Location>) {
        self.available_locations
            .insert(step_id.to_string(), location);
    }

    #[must_use]
    pub fn location_of(&self, step_id: &str) -> Option<Location> {
        self.available_locations.get(step_id).cloned().flatten()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Step> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn available(&self) -> &[Step] {
        &self.available
    }

    #[must_use]
    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    #[must_use]
    pub fn stack_top(&self) -> Option<&Step> {
        self.stack.last()
    }

    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Stacked composites with their cached locations, innermost first
    #[must_use]
    pub fn stack_frames(&self) -> Vec<(Step, Option<Location>)> {
        self.stack
            .iter()
            .cloned()
            .zip(self.stack_locations.iter().cloned())
            .rev()
            .collect()
    }
}

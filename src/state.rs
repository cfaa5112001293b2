use std::collections::HashMap;

// Running maxima for one element, each paired with the step it was first reached
#[derive(Debug, Clone, PartialEq)]
pub struct MaxState {
    pub max_metric: f64,
    pub max_depth: f64,
    pub max_speed: f64,
    pub step_metric: usize,
    pub step_depth: usize,
    pub step_speed: usize,
}

impl MaxState {
    pub fn new(depth: f64, speed: f64, metric: f64, step: usize) -> Self {
        MaxState {
            max_metric: metric,
            max_depth: depth,
            max_speed: speed,
            step_metric: step,
            step_depth: step,
            step_speed: step,
        }
    }

    /// Each quantity moves independently, and only on a strictly larger value.
    pub fn update(&mut self, depth: f64, speed: f64, metric: f64, step: usize) {
        if metric > self.max_metric {
            self.max_metric = metric;
            self.step_metric = step;
        }
        if depth > self.max_depth {
            self.max_depth = depth;
            self.step_depth = step;
        }
        if speed > self.max_speed {
            self.max_speed = speed;
            self.step_speed = step;
        }
    }
}

/// Per-element maxima across every processed timestep. Holds one entry per
/// distinct element id, however many timesteps are fed through it.
#[derive(Debug, Default)]
pub struct MaximaTracker {
    states: HashMap<String, MaxState>,
}

impl MaximaTracker {
    pub fn new() -> Self {
        MaximaTracker {
            states: HashMap::new(),
        }
    }

    pub fn update(&mut self, id: &str, depth: f64, speed: f64, metric: f64, step: usize) {
        match self.states.get_mut(id) {
            Some(state) => state.update(depth, speed, metric, step),
            None => {
                self.states
                    .insert(id.to_string(), MaxState::new(depth, speed, metric, step));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&MaxState> {
        self.states.get(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Entries ordered by element id.
    pub fn sorted(&self) -> Vec<(&str, &MaxState)> {
        let mut entries: Vec<_> = self
            .states
            .iter()
            .map(|(id, state)| (id.as_str(), state))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

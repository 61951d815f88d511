/// Event and payload counters for the debug overlay.
#[derive(Debug, Default, Clone)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_payloads: usize,
    pub num_errors: usize,
    /// Last action taken (e.g. "navigate_forward").
    pub last_action: String,
    /// Generation of the most recent payload.
    pub generation: u64,
}

impl DebugState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn on_event(&mut self, action: &str) {
        self.num_events += 1;
        self.last_action = action.to_string();
    }

    pub fn on_payload(&mut self, generation: u64) {
        self.num_payloads += 1;
        self.generation = generation;
    }

    pub fn on_error(&mut self) {
        self.num_errors += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "events={} payloads={} errors={} gen={} last_action={}",
            self.num_events, self.num_payloads, self.num_errors, self.generation, self.last_action
        )
    }
}

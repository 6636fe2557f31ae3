/// Driver settings. Tick size is fixed at [`crate::TICK_MS`] and not part of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Instance name for logging
    pub name: String,
    /// Size of command channel buffer
    pub command_buffer_size: usize,
    /// Size of event channel buffer
    pub event_buffer_size: usize,
}

impl DriverConfig {
    pub fn new(name: impl Into<String>) -> Self {
        DriverConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_command_buffer_size(mut self, size: usize) -> Self {
        self.command_buffer_size = size;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            name: "playlist".to_string(),
            command_buffer_size: 100,
            event_buffer_size: 100,
        }
    }
}

use crate::probe::ShellProbe;
use crate::store::ConfigStore;
use crate::view::{render_state, PanelView};
use crate::{TaskItem, ViewState};
use std::sync::Arc;
use tracing::debug;

/// Surface the panel is drawn on. Messages travel the other way, through the
/// `Inbound` channel the host was handed.
pub trait PanelHost: Send + Sync {
    fn render(&mut self, view: &PanelView);
}

/// Partial state; only the fields that are `Some` are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub loaded_file_name: Option<String>,
    pub is_processing: Option<bool>,
    pub tasks: Option<Vec<TaskItem>>,
    pub last_error: Option<Option<String>>,
}

impl StateUpdate {
    pub fn file(mut self, name: impl Into<String>) -> Self {
        self.loaded_file_name = Some(name.into());
        self
    }

    pub fn processing(mut self, value: bool) -> Self {
        self.is_processing = Some(value);
        self
    }

    pub fn tasks(mut self, tasks: Vec<TaskItem>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn error(mut self, error: Option<String>) -> Self {
        self.last_error = Some(error);
        self
    }

    fn apply(self, state: &mut ViewState) {
        if let Some(name) = self.loaded_file_name {
            state.loaded_file_name = name;
        }
        if let Some(value) = self.is_processing {
            state.is_processing = value;
        }
        if let Some(tasks) = self.tasks {
            state.tasks = tasks;
        }
        if let Some(error) = self.last_error {
            state.last_error = error;
        }
        if state.loaded_file_name.is_empty() {
            state.tasks.clear();
        }
    }
}

/// Owns the view model and redraws the host from it.
pub struct PanelController {
    state: ViewState,
    host: Box<dyn PanelHost>,
    probe: Arc<dyn ShellProbe>,
    store: Arc<dyn ConfigStore>,
}

impl PanelController {
    /// Starts from the file name the store remembers, with no tasks.
    pub fn new(
        host: Box<dyn PanelHost>,
        probe: Arc<dyn ShellProbe>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        let state = ViewState::with_file(store.loaded_file_name());
        Self {
            state,
            host,
            probe,
            store,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Probes for the configured service's command.
    pub async fn cli_available(&self) -> bool {
        let service = self.store.agent_service();
        self.probe.is_available(service.command()).await
    }

    /// Builds the view from current state and a fresh probe result, then
    /// hands it to the host. Nothing is cached between calls.
    pub async fn render(&mut self) -> PanelView {
        let service = self.store.agent_service();
        let cli_available = if self.state.needs_probe() {
            self.cli_available().await
        } else {
            true
        };
        let view = render_state(&self.state, service, cli_available);
        debug!(
            mode = view.mode().label(),
            file = %self.state.loaded_file_name,
            tasks = self.state.tasks.len(),
            processing = self.state.is_processing,
            "render panel"
        );
        self.host.render(&view);
        view
    }

    pub async fn update_state(&mut self, update: StateUpdate) -> PanelView {
        update.apply(&mut self.state);
        self.render().await
    }

    /// Drops tasks and the processing flag. The loaded file stays.
    pub fn clear_tasks(&mut self) {
        self.state.tasks.clear();
        self.state.is_processing = false;
        self.state.last_error = None;
    }
}

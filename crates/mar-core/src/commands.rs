use crate::executor::{Executor, ExecutorError};
use crate::message::{Command, PanelMessage};
use crate::panel::{PanelController, StateUpdate};
use crate::store::ConfigKey;
use crate::{base_name, TaskItem, ViewState, CONTEXT_FILE_LOADED, SETTINGS_NAMESPACE};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const SELECT_LABEL: &str = "Select YAML";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub label: &'static str,
    pub extensions: &'static [&'static str],
}

pub const YAML_FILTER: FileFilter = FileFilter {
    label: "YAML",
    extensions: &["yml", "yaml"],
};

impl FileFilter {
    pub fn matches(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

/// Host facilities the commands call into besides drawing.
#[async_trait]
pub trait HostServices: Send {
    /// Single-selection file prompt. `None` when the user dismissed it.
    async fn pick_file(&mut self, filter: &FileFilter, open_label: &str) -> Option<PathBuf>;
    /// Shows the host's settings surface scoped to `namespace`.
    async fn open_settings(&mut self, namespace: &str);
    fn set_context(&mut self, key: &str, value: bool);
    fn notify(&mut self, message: &str);
}

/// Everything the serving loop accepts from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(PanelMessage),
    Command(Command),
    ConfigChanged,
}

#[derive(Debug)]
pub struct RunOutcome {
    generation: u64,
    result: Result<Vec<TaskItem>, ExecutorError>,
}

enum LoopEvent {
    Inbound(Inbound),
    Finished(RunOutcome),
}

/// The four panel commands plus the loop that serialises them.
///
/// Runs are single-flight. Selecting or clearing a file starts a new run
/// generation, and results from an older generation are dropped.
pub struct CommandLayer {
    panel: PanelController,
    services: Box<dyn HostServices>,
    executor: Arc<dyn Executor>,
    generation: u64,
    outcome_tx: mpsc::UnboundedSender<RunOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<RunOutcome>,
}

impl CommandLayer {
    pub fn new(
        panel: PanelController,
        services: Box<dyn HostServices>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            panel,
            services,
            executor,
            generation: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn state(&self) -> &ViewState {
        self.panel.state()
    }

    pub async fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Message(message) => self.handle_message(message).await,
            Inbound::Command(command) => self.dispatch(command).await,
            Inbound::ConfigChanged => {
                self.panel.render().await;
            }
        }
    }

    pub async fn handle_message(&mut self, message: PanelMessage) {
        match message.command() {
            Some(command) => self.dispatch(command).await,
            None => debug!(?message, "ignoring unknown panel message"),
        }
    }

    pub async fn dispatch(&mut self, command: Command) {
        info!(command = command.id(), "dispatch");
        match command {
            Command::SelectFile => self.select_file().await,
            Command::ClearFile => self.clear_file().await,
            Command::RunAgent => self.run_agent().await,
            Command::OpenSettings => self.open_settings().await,
        }
    }

    pub async fn select_file(&mut self) {
        let Some(path) = self.services.pick_file(&YAML_FILTER, SELECT_LABEL).await else {
            debug!("file dialog dismissed");
            return;
        };
        if !YAML_FILTER.matches(&path) {
            self.services
                .notify(&format!("Not a YAML file: {}", path.display()));
            return;
        }

        let display = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| base_name(&display));

        self.persist_file_name(&file_name);
        self.generation += 1;
        self.panel.clear_tasks();
        self.panel
            .update_state(StateUpdate::default().file(file_name))
            .await;
        self.services.set_context(CONTEXT_FILE_LOADED, true);
        self.services.notify(&format!("Loaded: {display}"));
    }

    pub async fn clear_file(&mut self) {
        self.persist_file_name("");
        self.generation += 1;
        self.panel.clear_tasks();
        self.panel
            .update_state(StateUpdate::default().file(""))
            .await;
        self.services.set_context(CONTEXT_FILE_LOADED, false);
    }

    /// Starts a run for the loaded file. Does nothing without a loaded file,
    /// while a run is already in flight, or while the panel would show the
    /// service command as missing.
    pub async fn run_agent(&mut self) {
        let state = self.panel.state();
        if !state.is_loaded() {
            debug!("run requested without a task file");
            return;
        }
        if state.is_processing {
            debug!("run already in flight");
            return;
        }
        let file_name = state.loaded_file_name.clone();
        if state.needs_probe() && !self.panel.cli_available().await {
            debug!(file = %file_name, "agent command not on PATH; run refused");
            return;
        }

        let generation = self.generation;
        info!(file = %file_name, generation, "starting agent run");
        self.services.notify("Running agents...");
        self.panel
            .update_state(StateUpdate::default().processing(true).error(None))
            .await;

        let executor = Arc::clone(&self.executor);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = executor.run(&file_name).await;
            if tx.send(RunOutcome { generation, result }).is_err() {
                debug!(generation, "serving loop gone; dropping agent run result");
            }
        });
    }

    pub async fn open_settings(&mut self) {
        self.services.open_settings(SETTINGS_NAMESPACE).await;
    }

    /// Waits for the next run to report back.
    pub async fn next_outcome(&mut self) -> Option<RunOutcome> {
        self.outcome_rx.recv().await
    }

    pub async fn finish_run(&mut self, outcome: RunOutcome) {
        if outcome.generation != self.generation || !self.panel.state().is_processing {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                "dropping stale agent run result"
            );
            return;
        }

        match outcome.result {
            Ok(tasks) => {
                info!(tasks = tasks.len(), "agent run finished");
                self.panel
                    .update_state(StateUpdate::default().tasks(tasks).processing(false))
                    .await;
            }
            Err(err) => {
                warn!(error = %err, "agent run failed");
                self.services.notify(&err.to_string());
                self.panel
                    .update_state(
                        StateUpdate::default()
                            .processing(false)
                            .error(Some(err.to_string())),
                    )
                    .await;
            }
        }
    }

    /// Serves host events and run completions one at a time until the host
    /// drops its sender. Returns the final view state.
    pub async fn serve(mut self, mut inbound: mpsc::Receiver<Inbound>) -> ViewState {
        let loaded = self.panel.state().is_loaded();
        self.services.set_context(CONTEXT_FILE_LOADED, loaded);
        self.panel.render().await;

        loop {
            let event = tokio::select! {
                maybe = inbound.recv() => match maybe {
                    Some(event) => LoopEvent::Inbound(event),
                    None => break,
                },
                Some(outcome) = self.outcome_rx.recv() => LoopEvent::Finished(outcome),
            };
            match event {
                LoopEvent::Inbound(event) => self.handle(event).await,
                LoopEvent::Finished(outcome) => self.finish_run(outcome).await,
            }
        }

        debug!("panel host closed; serving loop stopped");
        self.panel.state().clone()
    }

    fn persist_file_name(&mut self, name: &str) {
        if let Err(err) = self.panel.store().set(ConfigKey::LoadedFileName, name) {
            warn!(
                key = ConfigKey::LoadedFileName.as_str(),
                error = %err,
                "failed to persist setting"
            );
            self.services
                .notify(&format!("Could not save settings: {err}"));
        }
    }
}

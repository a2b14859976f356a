use crate::{AgentService, TaskItem, TaskStatus, ViewState};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    Empty,
    Unavailable,
    Loaded,
}

impl PanelMode {
    pub fn label(self) -> &'static str {
        match self {
            PanelMode::Empty => "empty",
            PanelMode::Unavailable => "unavailable",
            PanelMode::Loaded => "loaded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub id: String,
    pub description: String,
    pub check: String,
    pub status: TaskStatus,
}

impl From<&TaskItem> for TaskCard {
    fn from(task: &TaskItem) -> Self {
        Self {
            id: task.id.clone(),
            description: task.description.clone(),
            check: task.check_content.clone(),
            status: task.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCard {
    pub file_name: String,
    pub service: AgentService,
    pub is_processing: bool,
    pub actions_enabled: bool,
    pub error: Option<String>,
}

/// What the host has to draw. Built by [`render_state`], never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    Empty,
    Unavailable {
        file_name: String,
        service: AgentService,
        command: String,
    },
    Loaded {
        status: StatusCard,
        tasks: Vec<TaskCard>,
    },
}

impl PanelView {
    pub fn mode(&self) -> PanelMode {
        match self {
            PanelView::Empty => PanelMode::Empty,
            PanelView::Unavailable { .. } => PanelMode::Unavailable,
            PanelView::Loaded { .. } => PanelMode::Loaded,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            PanelView::Empty => None,
            PanelView::Unavailable { file_name, .. } => Some(file_name.as_str()),
            PanelView::Loaded { status, .. } => Some(status.file_name.as_str()),
        }
    }

    pub fn tasks(&self) -> &[TaskCard] {
        match self {
            PanelView::Loaded { tasks, .. } => tasks.as_slice(),
            _ => &[],
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, PanelView::Loaded { status, .. } if status.is_processing)
    }
}

/// Maps state onto one of the three panel modes.
///
/// Precedence: no file is always `Empty`; a loaded file whose service command
/// is missing and that has no tasks yet is `Unavailable`; everything else is
/// `Loaded`.
pub fn render_state(state: &ViewState, service: AgentService, cli_available: bool) -> PanelView {
    if !state.is_loaded() {
        return PanelView::Empty;
    }

    if !cli_available && state.tasks.is_empty() {
        return PanelView::Unavailable {
            file_name: state.loaded_file_name.clone(),
            service,
            command: service.command().to_string(),
        };
    }

    PanelView::Loaded {
        status: StatusCard {
            file_name: state.loaded_file_name.clone(),
            service,
            is_processing: state.is_processing,
            actions_enabled: !state.is_processing,
            error: state.last_error.clone(),
        },
        tasks: state.tasks.iter().map(TaskCard::from).collect(),
    }
}

/// Plain-text markup of the panel, one card per block.
impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelView::Empty => {
                writeln!(f, "[ Select YAML ]")
            }
            PanelView::Unavailable {
                file_name, command, ..
            } => {
                writeln!(f, "! {file_name}")?;
                writeln!(f, "  `{command}` command not found on PATH")?;
                writeln!(f, "  actions: [clear]")
            }
            PanelView::Loaded { status, tasks } => {
                let icon = if status.is_processing { "~" } else { "*" };
                writeln!(f, "{icon} {} ({})", status.file_name, status.service)?;
                let actions = if status.actions_enabled {
                    "actions: [clear] [run]"
                } else {
                    "actions: (running)"
                };
                writeln!(f, "  {actions}")?;
                if let Some(error) = &status.error {
                    writeln!(f, "  error: {error}")?;
                }
                for (idx, task) in tasks.iter().enumerate() {
                    writeln!(f)?;
                    writeln!(
                        f,
                        "{}. ({}) [{}] {}",
                        idx + 1,
                        task.status,
                        task.id,
                        task.description
                    )?;
                    if !task.check.is_empty() {
                        writeln!(f, "   check: {}", task.check)?;
                    }
                }
                Ok(())
            }
        }
    }
}

pub mod commands;
pub mod executor;
pub mod message;
pub mod panel;
pub mod probe;
pub mod store;
pub mod view;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Settings namespace shown by the host's settings surface.
pub const SETTINGS_NAMESPACE: &str = "multi-agent-runner";
/// Context flag telling the host whether a task file is loaded.
pub const CONTEXT_FILE_LOADED: &str = "multiAgentRunnerYamlLoaded";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub check_content: String,
    #[serde(default)]
    pub status: TaskStatus,
}

impl TaskItem {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        check_content: impl Into<String>,
        status: TaskStatus,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            check_content: check_content.into(),
            status,
        }
    }
}

/// In-memory state driving the panel.
///
/// `tasks` is only populated while `loaded_file_name` is set, and
/// `is_processing` disables the panel's actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub loaded_file_name: String,
    pub is_processing: bool,
    pub tasks: Vec<TaskItem>,
    pub last_error: Option<String>,
}

impl ViewState {
    pub fn with_file(name: impl Into<String>) -> Self {
        Self {
            loaded_file_name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.loaded_file_name.is_empty()
    }

    /// Only a loaded panel without tasks can fall into the unavailable mode,
    /// so that is the only case worth probing the service command for.
    pub fn needs_probe(&self) -> bool {
        self.is_loaded() && self.tasks.is_empty()
    }
}

/// Backing CLI integration an agent run is dispatched to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AgentService {
    #[default]
    Copilot,
    ClaudeCode,
}

impl AgentService {
    pub const ALL: [AgentService; 2] = [AgentService::Copilot, AgentService::ClaudeCode];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentService::Copilot => "copilot",
            AgentService::ClaudeCode => "claude-code",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentService::Copilot => "GitHub Copilot CLI",
            AgentService::ClaudeCode => "Claude Code",
        }
    }

    /// Executable that has to be on PATH for this service to run.
    pub fn command(&self) -> &'static str {
        match self {
            AgentService::Copilot => "copilot",
            AgentService::ClaudeCode => "claude",
        }
    }
}

impl fmt::Display for AgentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentService {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "copilot" => Ok(AgentService::Copilot),
            "claude-code" | "claude_code" | "claude" => Ok(AgentService::ClaudeCode),
            other => Err(format!("Unknown agent service: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    #[serde(default)]
    pub loaded_file_name: String,
    #[serde(default, deserialize_with = "deserialize_service")]
    pub agent_service: AgentService,
}

/// Unknown service names fall back to the default instead of rejecting the
/// whole settings file.
fn deserialize_service<'de, D>(deserializer: D) -> Result<AgentService, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_default())
}

/// Returns the final path component, accepting both separator styles.
pub fn base_name(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_item_uses_camel_case_keys() {
        let item = TaskItem::new("TEST-001", "desc", "check", TaskStatus::Running);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["checkContent"], "check");
        assert_eq!(value["status"], "running");
    }

    #[test]
    fn probe_only_needed_for_loaded_panel_without_tasks() {
        let mut state = ViewState::default();
        assert!(!state.needs_probe());
        state.loaded_file_name = "plan.yaml".to_string();
        assert!(state.needs_probe());
        state.tasks.push(TaskItem::new("a", "b", "c", TaskStatus::Pending));
        assert!(!state.needs_probe());
    }

    #[test]
    fn persisted_config_tolerates_unknown_service() {
        let config: PersistedConfig =
            toml::from_str("loadedFileName = \"plan.yaml\"\nagentService = \"mystery\"\n")
                .unwrap();
        assert_eq!(config.loaded_file_name, "plan.yaml");
        assert_eq!(config.agent_service, AgentService::Copilot);

        let config: PersistedConfig = toml::from_str("agentService = \"claude-code\"").unwrap();
        assert_eq!(config.agent_service, AgentService::ClaudeCode);
        assert!(config.loaded_file_name.is_empty());
    }

    #[test]
    fn base_name_handles_both_separators() {
        assert_eq!(base_name("/home/me/plan.yaml"), "plan.yaml");
        assert_eq!(base_name("C:\\work\\tasks.yml"), "tasks.yml");
        assert_eq!(base_name("plan.yaml"), "plan.yaml");
        assert_eq!(base_name("dir/"), "dir");
    }
}

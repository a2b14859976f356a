use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Messages posted by the rendered panel. Only the kind is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelMessage {
    SelectYaml,
    RunAgent,
    ClearYaml,
    OpenSettings,
    #[serde(other)]
    Unknown,
}

impl PanelMessage {
    /// Decodes a posted message. Anything unrecognised becomes `Unknown`.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or(PanelMessage::Unknown)
    }

    pub fn command(&self) -> Option<Command> {
        match self {
            PanelMessage::SelectYaml => Some(Command::SelectFile),
            PanelMessage::RunAgent => Some(Command::RunAgent),
            PanelMessage::ClearYaml => Some(Command::ClearFile),
            PanelMessage::OpenSettings => Some(Command::OpenSettings),
            PanelMessage::Unknown => None,
        }
    }
}

/// Named actions exposed to the host's command registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SelectFile,
    ClearFile,
    RunAgent,
    OpenSettings,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Command::SelectFile,
        Command::ClearFile,
        Command::RunAgent,
        Command::OpenSettings,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Command::SelectFile => "multi-agent-runner.selectYaml",
            Command::ClearFile => "multi-agent-runner.clearYaml",
            Command::RunAgent => "multi-agent-runner.runAgent",
            Command::OpenSettings => "multi-agent-runner.openSettings",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Command::SelectFile => "Select task file",
            Command::ClearFile => "Clear task file",
            Command::RunAgent => "Run agents",
            Command::OpenSettings => "Open settings",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Command {
    type Err = String;

    /// Accepts the full id or the part after the namespace.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let short = trimmed
            .strip_prefix("multi-agent-runner.")
            .unwrap_or(trimmed);
        match short {
            "selectYaml" => Ok(Command::SelectFile),
            "clearYaml" => Ok(Command::ClearFile),
            "runAgent" => Ok(Command::RunAgent),
            "openSettings" => Ok(Command::OpenSettings),
            other => Err(format!("Unknown command: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_decode() {
        assert_eq!(
            PanelMessage::from_json(r#"{"type":"selectYaml"}"#),
            PanelMessage::SelectYaml
        );
        assert_eq!(
            PanelMessage::from_json(r#"{"type":"runAgent"}"#),
            PanelMessage::RunAgent
        );
        assert_eq!(
            PanelMessage::from_json(r#"{"type":"clearYaml","extra":1}"#),
            PanelMessage::ClearYaml
        );
        assert_eq!(
            PanelMessage::from_json(r#"{"type":"openSettings"}"#),
            PanelMessage::OpenSettings
        );
    }

    #[test]
    fn unknown_or_malformed_messages_decode_to_unknown() {
        assert_eq!(
            PanelMessage::from_json(r#"{"type":"deleteEverything"}"#),
            PanelMessage::Unknown
        );
        assert_eq!(PanelMessage::from_json("not json"), PanelMessage::Unknown);
        assert_eq!(PanelMessage::from_json(r#"{"kind":"runAgent"}"#), PanelMessage::Unknown);
        assert_eq!(PanelMessage::Unknown.command(), None);
    }

    #[test]
    fn encoding_matches_decoding() {
        for message in [
            PanelMessage::SelectYaml,
            PanelMessage::RunAgent,
            PanelMessage::ClearYaml,
            PanelMessage::OpenSettings,
        ] {
            let encoded = serde_json::to_string(&message).unwrap();
            assert_eq!(PanelMessage::from_json(&encoded), message);
        }
    }

    #[test]
    fn messages_map_one_to_one_onto_commands() {
        assert_eq!(PanelMessage::SelectYaml.command(), Some(Command::SelectFile));
        assert_eq!(PanelMessage::RunAgent.command(), Some(Command::RunAgent));
        assert_eq!(PanelMessage::ClearYaml.command(), Some(Command::ClearFile));
        assert_eq!(
            PanelMessage::OpenSettings.command(),
            Some(Command::OpenSettings)
        );
    }

    #[test]
    fn command_ids_parse_back() {
        for command in Command::ALL {
            assert_eq!(command.id().parse::<Command>(), Ok(command));
        }
        assert_eq!("runAgent".parse::<Command>(), Ok(Command::RunAgent));
        assert!("multi-agent-runner.helloWorld".parse::<Command>().is_err());
    }
}

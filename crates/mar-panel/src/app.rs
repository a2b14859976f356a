use crate::host::HostRequest;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mar_core::commands::{FileFilter, Inbound};
use mar_core::message::{Command, PanelMessage};
use mar_core::store::{ConfigKey, ConfigStore};
use mar_core::view::PanelView;
use mar_core::{AgentService, CONTEXT_FILE_LOADED};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Directory browser standing in for a native file dialog.
#[derive(Debug)]
pub struct FilePicker {
    pub dir: PathBuf,
    pub entries: Vec<PickerEntry>,
    pub selected: usize,
    pub filter: FileFilter,
    pub open_label: String,
    pub error: Option<String>,
    reply: Option<oneshot::Sender<Option<PathBuf>>>,
}

impl FilePicker {
    pub fn open(
        dir: PathBuf,
        filter: FileFilter,
        open_label: String,
        reply: oneshot::Sender<Option<PathBuf>>,
    ) -> Self {
        let mut picker = Self {
            dir,
            entries: Vec::new(),
            selected: 0,
            filter,
            open_label,
            error: None,
            reply: Some(reply),
        };
        picker.reload();
        picker
    }

    fn reload(&mut self) {
        self.selected = 0;
        match list_dir(&self.dir, &self.filter) {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(err) => {
                self.entries.clear();
                self.error = Some(format!("{}: {err}", self.dir.display()));
            }
        }
        if let Some(parent) = self.dir.parent() {
            self.entries.insert(
                0,
                PickerEntry {
                    name: "..".to_string(),
                    path: parent.to_path_buf(),
                    is_dir: true,
                },
            );
        }
    }

    fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    fn enter_dir(&mut self, path: PathBuf) {
        self.dir = path;
        self.reload();
    }

    fn go_up(&mut self) {
        if let Some(parent) = self.dir.parent().map(Path::to_path_buf) {
            self.enter_dir(parent);
        }
    }

    /// Returns true once the picker has answered and should close.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.finish(None);
                true
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                false
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                false
            }
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                self.go_up();
                false
            }
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                let Some(entry) = self.entries.get(self.selected).cloned() else {
                    return false;
                };
                if entry.is_dir {
                    self.enter_dir(entry.path);
                    false
                } else {
                    self.finish(Some(entry.path));
                    true
                }
            }
            _ => false,
        }
    }

    fn finish(&mut self, choice: Option<PathBuf>) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(choice);
        }
    }
}

/// Commands whose id contains `input`, in registry order.
pub fn palette_matches(input: &str) -> Vec<Command> {
    let needle = input.trim().to_lowercase();
    Command::ALL
        .into_iter()
        .filter(|command| command.id().to_lowercase().contains(&needle))
        .collect()
}

/// Sub-directories first, then files the filter accepts. Hidden entries are
/// skipped.
pub fn list_dir(dir: &Path, filter: &FileFilter) -> std::io::Result<Vec<PickerEntry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            dirs.push(PickerEntry {
                name,
                path,
                is_dir: true,
            });
        } else if filter.matches(&path) {
            files.push(PickerEntry {
                name,
                path,
                is_dir: false,
            });
        }
    }
    dirs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    dirs.extend(files);
    Ok(dirs)
}

#[derive(Debug)]
pub struct SettingsDialog {
    pub namespace: String,
    pub selected: usize,
    reply: Option<oneshot::Sender<()>>,
}

impl SettingsDialog {
    fn close(&mut self) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(());
        }
    }
}

#[derive(Debug)]
pub enum Mode {
    Normal,
    PickFile(FilePicker),
    Settings(SettingsDialog),
    Palette(String),
}

pub struct App {
    pub view: Option<PanelView>,
    pub mode: Mode,
    pub notice: Option<String>,
    pub spinner_tick: usize,
    context: HashMap<String, bool>,
    store: Arc<dyn ConfigStore>,
    start_dir: PathBuf,
    should_quit: bool,
}

impl App {
    pub fn new(store: Arc<dyn ConfigStore>, start_dir: PathBuf) -> Self {
        Self {
            view: None,
            mode: Mode::Normal,
            notice: None,
            spinner_tick: 0,
            context: HashMap::new(),
            store,
            start_dir,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn service(&self) -> AgentService {
        self.store.agent_service()
    }

    pub fn file_loaded(&self) -> bool {
        self.context
            .get(CONTEXT_FILE_LOADED)
            .copied()
            .unwrap_or(false)
    }

    pub fn is_processing(&self) -> bool {
        self.view.as_ref().is_some_and(PanelView::is_processing)
    }

    /// Run is offered only on a loaded panel whose actions are enabled.
    pub fn can_run(&self) -> bool {
        matches!(
            &self.view,
            Some(PanelView::Loaded { status, .. }) if status.actions_enabled
        )
    }

    pub fn on_tick(&mut self) {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
    }

    pub fn apply_request(&mut self, request: HostRequest) {
        match request {
            HostRequest::Render(view) => self.view = Some(view),
            HostRequest::PickFile {
                filter,
                open_label,
                reply,
            } => {
                let dir = self.picker_start_dir();
                self.mode = Mode::PickFile(FilePicker::open(dir, filter, open_label, reply));
            }
            HostRequest::OpenSettings { namespace, reply } => {
                let current = self.service();
                let selected = AgentService::ALL
                    .iter()
                    .position(|service| *service == current)
                    .unwrap_or(0);
                self.mode = Mode::Settings(SettingsDialog {
                    namespace,
                    selected,
                    reply: Some(reply),
                });
            }
            HostRequest::SetContext { key, value } => {
                debug!(key = %key, value, "context flag");
                self.context.insert(key, value);
            }
            HostRequest::Notify(message) => self.notice = Some(message),
        }
    }

    /// Maps a key press onto an event for the serving loop, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Inbound> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        if let Mode::PickFile(picker) = &mut self.mode {
            if picker.handle_key(key) {
                self.mode = Mode::Normal;
            }
            return None;
        }

        match self.mode {
            Mode::PickFile(_) => None,
            Mode::Settings(_) => self.handle_settings_key(key),
            Mode::Palette(_) => self.handle_palette_key(key),
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<Inbound> {
        let message = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return None;
            }
            KeyCode::Char(':') => {
                self.mode = Mode::Palette(String::new());
                return None;
            }
            KeyCode::Char('o') => PanelMessage::SelectYaml,
            KeyCode::Enter if !self.file_loaded() => PanelMessage::SelectYaml,
            KeyCode::Char('r') if self.file_loaded() && self.can_run() => {
                PanelMessage::RunAgent
            }
            KeyCode::Char('c') if self.file_loaded() => PanelMessage::ClearYaml,
            KeyCode::Char('s') => PanelMessage::OpenSettings,
            _ => return None,
        };
        self.notice = None;
        Some(Inbound::Message(message))
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> Option<Inbound> {
        let Mode::Settings(dialog) = &mut self.mode else {
            return None;
        };
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                dialog.selected = (dialog.selected + 1).min(AgentService::ALL.len() - 1);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                dialog.selected = dialog.selected.saturating_sub(1);
                None
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                dialog.close();
                self.mode = Mode::Normal;
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let service = AgentService::ALL[dialog.selected];
                dialog.close();
                self.mode = Mode::Normal;
                match self.store.set(ConfigKey::AgentService, service.as_str()) {
                    Ok(()) => {
                        self.notice = Some(format!("Agent service: {}", service.label()));
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to save agent service");
                        self.notice = Some(format!("Could not save settings: {err}"));
                    }
                }
                Some(Inbound::ConfigChanged)
            }
            _ => None,
        }
    }

    fn handle_palette_key(&mut self, key: KeyEvent) -> Option<Inbound> {
        let Mode::Palette(input) = &mut self.mode else {
            return None;
        };
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                None
            }
            KeyCode::Backspace => {
                input.pop();
                None
            }
            KeyCode::Char(ch) => {
                input.push(ch);
                None
            }
            KeyCode::Enter => {
                let parsed = input.parse::<Command>();
                self.mode = Mode::Normal;
                match parsed {
                    Ok(command) => Some(Inbound::Command(command)),
                    Err(err) => {
                        self.notice = Some(err);
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Completes any open dialog so the serving loop is not left waiting.
    pub fn dismiss_dialogs(&mut self) {
        match &mut self.mode {
            Mode::PickFile(picker) => picker.finish(None),
            Mode::Settings(dialog) => dialog.close(),
            _ => {}
        }
        self.mode = Mode::Normal;
    }

    fn picker_start_dir(&self) -> PathBuf {
        if self.start_dir.is_dir() {
            self.start_dir.clone()
        } else {
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mar_core::commands::YAML_FILTER;
    use mar_core::store::MemoryStore;
    use mar_core::view::render_state;
    use mar_core::ViewState;

    fn mark_loaded(app: &mut App, value: bool) {
        app.apply_request(HostRequest::SetContext {
            key: CONTEXT_FILE_LOADED.to_string(),
            value,
        });
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_in(dir: &Path) -> (App, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (App::new(store.clone(), dir.to_path_buf()), store)
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("specs")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("b-plan.yml"), "tasks: []").unwrap();
        fs::write(dir.path().join("A-plan.YAML"), "tasks: []").unwrap();
        fs::write(dir.path().join("notes.md"), "# notes").unwrap();
        fs::write(dir.path().join("specs/inner.yaml"), "tasks: []").unwrap();
        dir
    }

    #[test]
    fn list_dir_shows_dirs_then_matching_files() {
        let dir = fixture_dir();
        let names: Vec<String> = list_dir(dir.path(), &YAML_FILTER)
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["specs", "A-plan.YAML", "b-plan.yml"]);
    }

    #[test]
    fn picker_descends_and_replies_with_file() {
        let dir = fixture_dir();
        let (mut app, _) = app_in(dir.path());
        let (reply, mut rx) = oneshot::channel();
        app.apply_request(HostRequest::PickFile {
            filter: YAML_FILTER,
            open_label: "Select YAML".to_string(),
            reply,
        });
        assert!(matches!(app.mode, Mode::PickFile(_)));

        // "..", then "specs"
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        match &app.mode {
            Mode::PickFile(picker) => assert_eq!(picker.dir, dir.path().join("specs")),
            other => panic!("picker closed early: {other:?}"),
        }

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(
            rx.try_recv().unwrap(),
            Some(dir.path().join("specs").join("inner.yaml"))
        );
    }

    #[test]
    fn escape_dismisses_picker() {
        let dir = fixture_dir();
        let (mut app, _) = app_in(dir.path());
        let (reply, mut rx) = oneshot::channel();
        app.apply_request(HostRequest::PickFile {
            filter: YAML_FILTER,
            open_label: "Select YAML".to_string(),
            reply,
        });
        assert_eq!(app.handle_key(key(KeyCode::Esc)), None);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(rx.try_recv().unwrap(), None);
        assert!(!app.should_quit());
    }

    #[test]
    fn run_and_clear_need_a_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(dir.path());
        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), None);
        assert_eq!(app.handle_key(key(KeyCode::Char('c'))), None);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('o'))),
            Some(Inbound::Message(PanelMessage::SelectYaml))
        );

        mark_loaded(&mut app, true);
        app.view = Some(render_state(
            &ViewState::with_file("plan.yaml"),
            AgentService::Copilot,
            true,
        ));
        assert_eq!(
            app.handle_key(key(KeyCode::Char('r'))),
            Some(Inbound::Message(PanelMessage::RunAgent))
        );
        assert_eq!(
            app.handle_key(key(KeyCode::Char('c'))),
            Some(Inbound::Message(PanelMessage::ClearYaml))
        );
    }

    #[test]
    fn run_key_is_ignored_when_command_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(dir.path());
        mark_loaded(&mut app, true);
        app.apply_request(HostRequest::Render(render_state(
            &ViewState::with_file("plan.yaml"),
            AgentService::Copilot,
            false,
        )));

        assert!(!app.can_run());
        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), None);
        assert_eq!(
            app.handle_key(key(KeyCode::Char('c'))),
            Some(Inbound::Message(PanelMessage::ClearYaml))
        );
    }

    #[test]
    fn run_key_is_ignored_while_processing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(dir.path());
        mark_loaded(&mut app, true);
        let mut state = ViewState::with_file("plan.yaml");
        state.is_processing = true;
        app.apply_request(HostRequest::Render(render_state(
            &state,
            AgentService::Copilot,
            true,
        )));

        assert!(app.is_processing());
        assert!(!app.can_run());
        assert_eq!(app.handle_key(key(KeyCode::Char('r'))), None);
    }

    #[test]
    fn palette_lists_matching_commands() {
        assert_eq!(palette_matches("").len(), Command::ALL.len());
        assert_eq!(palette_matches("RUN"), vec![Command::RunAgent]);
        assert_eq!(
            palette_matches("yaml"),
            vec![Command::SelectFile, Command::ClearFile]
        );
        assert!(palette_matches("deploy").is_empty());
    }

    #[test]
    fn settings_dialog_writes_store_and_reports_change() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, store) = app_in(dir.path());
        let (reply, mut rx) = oneshot::channel();
        app.apply_request(HostRequest::OpenSettings {
            namespace: "multi-agent-runner".to_string(),
            reply,
        });

        app.handle_key(key(KeyCode::Down));
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Inbound::ConfigChanged)
        );
        assert_eq!(store.agent_service(), AgentService::ClaudeCode);
        assert!(rx.try_recv().is_ok());
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn palette_parses_command_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(dir.path());
        app.handle_key(key(KeyCode::Char(':')));
        for ch in "multi-agent-runner.runAgent".chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            Some(Inbound::Command(Command::RunAgent))
        );

        app.handle_key(key(KeyCode::Char(':')));
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.handle_key(key(KeyCode::Enter)), None);
        assert_eq!(app.notice.as_deref(), Some("Unknown command: x"));
    }

    #[test]
    fn dismiss_dialogs_answers_pending_requests() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(dir.path());
        let (reply, mut rx) = oneshot::channel();
        app.apply_request(HostRequest::OpenSettings {
            namespace: "multi-agent-runner".to_string(),
            reply,
        });
        app.dismiss_dialogs();
        assert!(rx.try_recv().is_ok());
    }
}

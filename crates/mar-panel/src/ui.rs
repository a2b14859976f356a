use crate::app::{palette_matches, App, FilePicker, Mode, SettingsDialog};
use crate::theme::{self, icons};
use mar_core::view::{PanelView, StatusCard, TaskCard};
use mar_core::AgentService;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let area = f.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, layout[0]);
    match &app.view {
        None => render_waiting(f, layout[1]),
        Some(PanelView::Empty) => render_empty(f, layout[1]),
        Some(PanelView::Unavailable {
            file_name, command, ..
        }) => render_unavailable(f, file_name, command, layout[1]),
        Some(PanelView::Loaded { status, tasks }) => {
            render_loaded(f, app, status, tasks, layout[1])
        }
    }
    render_footer(f, app, layout[2]);

    match &app.mode {
        Mode::Normal => {}
        Mode::PickFile(picker) => render_picker(f, picker, area),
        Mode::Settings(dialog) => render_settings(f, app, dialog, area),
        Mode::Palette(input) => render_palette(f, input, area),
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" Multi-Agent Runner ", theme::HEADER_STYLE),
        Span::styled(
            format!("[{}]", app.service().label()),
            Style::default().fg(theme::MUTED),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_waiting(f: &mut Frame, area: Rect) {
    let p = Paragraph::new("Loading...").style(Style::default().fg(theme::MUTED));
    f.render_widget(p, area);
}

fn render_empty(f: &mut Frame, area: Rect) {
    let card = centered_rect(50, 30, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ACCENT));
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("[ Select YAML ]", theme::SELECTED_STYLE)),
        Line::from(""),
        Line::from(Span::styled(
            "press o to choose a task file",
            Style::default().fg(theme::MUTED),
        )),
    ];
    let p = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(p, card);
}

fn render_unavailable(f: &mut Frame, file_name: &str, command: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} {file_name} ", icons::WARNING))
        .border_style(Style::default().fg(theme::WARN));
    let text = vec![
        Line::from(vec![
            Span::styled(
                format!("`{command}`"),
                Style::default()
                    .fg(theme::WARN)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" command not found on PATH"),
        ]),
        Line::from(vec![
            Span::styled("[c]", Style::default().fg(Color::Cyan)),
            Span::raw(" clear"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Install it, or pick another agent service with s.",
            Style::default().fg(theme::MUTED),
        )),
    ];
    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn render_loaded(f: &mut Frame, app: &App, status: &StatusCard, tasks: &[TaskCard], area: Rect) {
    let status_height = if status.error.is_some() { 5 } else { 4 };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(status_height), Constraint::Min(0)])
        .split(area);

    let indicator = if status.is_processing {
        Span::styled(
            format!("{} running", theme::spinner_frame(app.spinner_tick)),
            Style::default().fg(theme::ACCENT),
        )
    } else {
        Span::styled("idle", Style::default().fg(theme::MUTED))
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{} ", icons::FILE), Style::default().fg(theme::ACCENT)),
            Span::styled(
                status.file_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            indicator,
        ]),
        Line::from(action_spans(status.actions_enabled)),
    ];
    if let Some(error) = &status.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(theme::ERROR),
        )));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", status.service))
        .border_style(Style::default().fg(theme::ACCENT));
    f.render_widget(Paragraph::new(lines).block(block), layout[0]);

    let tasks_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Tasks ({}) ", tasks.len()));
    if tasks.is_empty() {
        let hint = if status.is_processing {
            "Waiting for agents..."
        } else {
            "No tasks yet. Press r to run agents."
        };
        let p = Paragraph::new(Span::styled(hint, Style::default().fg(theme::MUTED)))
            .block(tasks_block);
        f.render_widget(p, layout[1]);
        return;
    }

    let items: Vec<ListItem> = tasks.iter().map(task_item).collect();
    f.render_widget(List::new(items).block(tasks_block), layout[1]);
}

fn action_spans(enabled: bool) -> Vec<Span<'static>> {
    if !enabled {
        return vec![Span::styled(
            "actions disabled while agents run",
            Style::default().fg(theme::MUTED),
        )];
    }
    vec![
        Span::styled("[c]", Style::default().fg(Color::Cyan)),
        Span::raw(" clear  "),
        Span::styled("[r]", Style::default().fg(Color::Cyan)),
        Span::raw(" run"),
    ]
}

fn task_item(task: &TaskCard) -> ListItem<'static> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{} ", icons::DOT),
            Style::default().fg(theme::status_color(task.status)),
        ),
        Span::styled(format!(" {} ", task.id), theme::id_badge_style(task.status)),
        Span::raw(" "),
        Span::raw(task.description.clone()),
    ])];
    if !task.check.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("    check: {}", task.check),
            Style::default().fg(theme::MUTED),
        )));
    }
    lines.push(Line::from(""));
    ListItem::new(lines)
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(notice) = &app.notice {
        Line::from(Span::styled(notice.clone(), Style::default().fg(theme::WARN)))
    } else {
        let mut hints = vec!["o open"];
        if app.file_loaded() {
            if app.can_run() {
                hints.push("r run");
            }
            hints.push("c clear");
        }
        hints.extend(["s settings", ": command", "q quit"]);
        Line::from(Span::styled(
            hints.join("  "),
            Style::default().fg(theme::MUTED),
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_picker(f: &mut Frame, picker: &FilePicker, area: Rect) {
    let modal = centered_rect(70, 70, area);
    f.render_widget(Clear, modal);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " {} ({}: {}) ",
            picker.open_label,
            picker.filter.label,
            picker.filter.extensions.join(", ")
        ))
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(modal);
    f.render_widget(block, modal);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    let header = match &picker.error {
        Some(error) => Span::styled(error.clone(), Style::default().fg(theme::ERROR)),
        None => Span::styled(
            picker.dir.display().to_string(),
            Style::default().fg(theme::MUTED),
        ),
    };
    f.render_widget(Paragraph::new(header), layout[0]);

    let items: Vec<ListItem> = picker
        .entries
        .iter()
        .map(|entry| {
            if entry.is_dir {
                ListItem::new(Span::styled(
                    format!("{}{}", entry.name, icons::DIR),
                    Style::default().fg(theme::ACCENT),
                ))
            } else {
                ListItem::new(entry.name.clone())
            }
        })
        .collect();
    let mut state = ListState::default();
    state.select(Some(picker.selected));
    let list = List::new(items).highlight_style(theme::SELECTED_STYLE);
    f.render_stateful_widget(list, layout[1], &mut state);
}

fn render_settings(f: &mut Frame, app: &App, dialog: &SettingsDialog, area: Rect) {
    let modal = centered_rect(50, 40, area);
    f.render_widget(Clear, modal);
    let current = app.service();
    let items: Vec<ListItem> = AgentService::ALL
        .iter()
        .map(|service| {
            let marker = if *service == current { "(*)" } else { "( )" };
            ListItem::new(format!(
                "{marker} {}  `{}`",
                service.label(),
                service.command()
            ))
        })
        .collect();
    let mut state = ListState::default();
    state.select(Some(dialog.selected));
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Settings: {} ", dialog.namespace))
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(theme::SELECTED_STYLE);
    f.render_stateful_widget(list, modal, &mut state);
}

fn render_palette(f: &mut Frame, input: &str, area: Rect) {
    let matches = palette_matches(input);
    let modal = centered_rect(60, 40, area);
    let modal = Rect {
        height: modal.height.min(3 + matches.len() as u16),
        ..modal
    };
    f.render_widget(Clear, modal);
    let mut lines = vec![Line::from(format!(":{input}"))];
    lines.extend(matches.into_iter().map(|command| {
        Line::from(vec![
            Span::styled(command.id(), Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("  {}", command.title()),
                Style::default().fg(theme::MUTED),
            ),
        ])
    }));
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Command ")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(p, modal);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use quantbot_controller::{Dashboard, DashboardView, NoticeLevel};
use quantbot_core::{ConfigKey, Control, ParamGroup, TradingConfig};
use quantbot_engine_client::EngineAction;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Config,
    Positions,
    Orders,
}

impl Tab {
    const ALL: [Self; 3] = [Self::Config, Self::Positions, Self::Orders];

    const fn next(self) -> Self {
        match self {
            Self::Config => Self::Positions,
            Self::Positions => Self::Orders,
            Self::Orders => Self::Config,
        }
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Config => "Configuration",
            Self::Positions => "Positions",
            Self::Orders => "Orders",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Config => 0,
            Self::Positions => 1,
            Self::Orders => 2,
        }
    }
}

enum InputMode {
    Normal,
    Editing(ConfigKey),
}

struct App {
    dashboard: Arc<Dashboard>,
    view: DashboardView,
    tab: Tab,
    selected: usize,
    input: Input,
    input_mode: InputMode,
    messages: Vec<String>,
}

impl App {
    fn new(dashboard: Arc<Dashboard>) -> Self {
        Self {
            dashboard,
            view: DashboardView::default(),
            tab: Tab::Config,
            selected: 0,
            input: Input::default(),
            input_mode: InputMode::Normal,
            messages: vec!["TUI started. Press 's' to start/stop, 'q' to quit".to_string()],
        }
    }

    fn add_message(&mut self, msg: String) {
        self.messages.push(msg);
        if self.messages.len() > 10 {
            self.messages.remove(0);
        }
    }

    fn selected_key(&self) -> ConfigKey {
        ConfigKey::ALL[self.selected.min(ConfigKey::ALL.len() - 1)]
    }

    /// Pulls the controller's view and logs the notice left by the last action.
    async fn sync(&mut self) {
        let view = self.dashboard.snapshot().await;
        if let Some(notice) = &view.notice {
            let prefix = match notice.level {
                NoticeLevel::Success => "✓",
                NoticeLevel::Error => "✗",
            };
            self.add_message(format!("{prefix} {}", notice.text));
        }
        self.view = view;
    }

    async fn update(&mut self, key: ConfigKey, value: Value) {
        self.dashboard.update_config(key, value).await;
        self.sync().await;
    }
}

/// Next value for a toggle, or `None` for other controls.
fn flipped_value(key: ConfigKey, config: &TradingConfig) -> Option<Value> {
    match key.control() {
        Control::Toggle => Some(json!(!config.value_of(key).as_bool().unwrap_or(false))),
        _ => None,
    }
}

/// Slider value moved by `steps`, or `None` for other controls.
fn stepped_value(key: ConfigKey, config: &TradingConfig, steps: i32) -> Option<Value> {
    let current = config.value_of(key).as_f64()?;
    key.step_value(current, steps)
}

pub async fn run(dashboard: Arc<Dashboard>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(dashboard.clone());
    app.dashboard.fetch_all().await;
    app.sync().await;

    let res = run_app(&mut terminal, &mut app).await;

    dashboard.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {err:?}");
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('s') => {
                    app.dashboard.toggle().await;
                    app.sync().await;
                }
                KeyCode::Char('r') => {
                    app.dashboard.execute(EngineAction::Refresh).await;
                    app.sync().await;
                }
                KeyCode::Char('g') => {
                    app.dashboard.execute(EngineAction::RunStrategy).await;
                    app.sync().await;
                }
                KeyCode::Tab => app.tab = app.tab.next(),
                KeyCode::Down if app.tab == Tab::Config => {
                    if app.selected < ConfigKey::ALL.len() - 1 {
                        app.selected += 1;
                    }
                }
                KeyCode::Up if app.tab == Tab::Config => {
                    app.selected = app.selected.saturating_sub(1);
                }
                KeyCode::Char(' ') if app.tab == Tab::Config => {
                    let param = app.selected_key();
                    if let Some(value) = app
                        .view
                        .config
                        .as_ref()
                        .and_then(|c| flipped_value(param, c))
                    {
                        app.update(param, value).await;
                    }
                }
                KeyCode::Left | KeyCode::Right if app.tab == Tab::Config => {
                    let param = app.selected_key();
                    let steps = if key.code == KeyCode::Left { -1 } else { 1 };
                    if let Some(value) = app
                        .view
                        .config
                        .as_ref()
                        .and_then(|c| stepped_value(param, c, steps))
                    {
                        app.update(param, value).await;
                    }
                }
                KeyCode::Enter if app.tab == Tab::Config => {
                    let param = app.selected_key();
                    if param.control() == Control::ReadOnly {
                        app.add_message(format!("{param} is read-only"));
                    } else {
                        let current = app
                            .view
                            .config
                            .as_ref()
                            .map(|c| match c.value_of(param) {
                                Value::String(s) => s,
                                other => other.to_string(),
                            })
                            .unwrap_or_default();
                        app.input = Input::new(current);
                        app.input_mode = InputMode::Editing(param);
                    }
                }
                _ => {}
            },
            InputMode::Editing(config_key) => match key.code {
                KeyCode::Enter => {
                    let raw = app.input.value().to_string();
                    app.dashboard
                        .update_config_raw(config_key.as_str(), &raw)
                        .await;
                    app.sync().await;
                    app.input.reset();
                    app.input_mode = InputMode::Normal;
                }
                KeyCode::Esc => {
                    app.input.reset();
                    app.input_mode = InputMode::Normal;
                }
                _ => {
                    app.input.handle_event(&Event::Key(key));
                }
            },
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    // Header
    let (badge, badge_color) = if app.view.is_running() {
        ("RUNNING", Color::Green)
    } else {
        ("STOPPED", Color::Red)
    };
    let status = app.view.status.unwrap_or_default();
    let max_trades = app.view.config.as_ref().map_or(0, |c| c.max_trades);
    let mut header = vec![
        Span::styled(
            "QuantBot Dashboard  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(badge, Style::default().fg(badge_color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "   Runs: {}   Open trades: {}   Max trades: {}",
            status.run_count, status.total_trades_open, max_trades
        )),
    ];
    if app.view.keepalive_active {
        header.push(Span::styled("   keep-alive", Style::default().fg(Color::DarkGray)));
    }
    if app.view.loading {
        header.push(Span::styled("   working...", Style::default().fg(Color::Yellow)));
    }
    let title = Paragraph::new(Line::from(header))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    // Tabs
    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .select(app.tab.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(tabs, chunks[1]);

    // Body
    if !app.view.is_ready() {
        let loading = Paragraph::new("Loading dashboard...")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(loading, chunks[2]);
    } else {
        match app.tab {
            Tab::Config => render_config(f, app, chunks[2]),
            Tab::Positions => render_records(
                f,
                &app.view.positions,
                "Open Positions",
                "No active positions",
                chunks[2],
            ),
            Tab::Orders => render_records(
                f,
                &app.view.orders,
                "Recent Orders",
                "No recent orders",
                chunks[2],
            ),
        }
    }

    // Messages
    let messages: Vec<ListItem> = app
        .messages
        .iter()
        .map(|m| ListItem::new(m.as_str()))
        .collect();
    let messages_widget =
        List::new(messages).block(Block::default().borders(Borders::ALL).title("Messages"));
    f.render_widget(messages_widget, chunks[3]);

    // Input/Help
    let (msg, style) = match app.input_mode {
        InputMode::Normal => (
            vec![
                Span::styled("s", Style::default().fg(Color::Green)),
                Span::raw(" start/stop  "),
                Span::styled("r", Style::default().fg(Color::Yellow)),
                Span::raw(" refresh  "),
                Span::styled("g", Style::default().fg(Color::Yellow)),
                Span::raw(" run strategy  "),
                Span::styled("Tab", Style::default().fg(Color::Yellow)),
                Span::raw(" switch  "),
                Span::styled("space/←/→/Enter", Style::default().fg(Color::Yellow)),
                Span::raw(" edit  "),
                Span::styled("q", Style::default().fg(Color::Red)),
                Span::raw(" quit"),
            ],
            Style::default(),
        ),
        InputMode::Editing(key) => (
            vec![
                Span::raw(format!("{key} = ")),
                Span::styled(app.input.value(), Style::default().fg(Color::Yellow)),
                Span::raw("   (Enter to save, Esc to cancel)"),
            ],
            Style::default().fg(Color::Yellow),
        ),
    };
    let help = Paragraph::new(Line::from(msg))
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[4]);
}

fn render_config(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let Some(config) = app.view.config.as_ref() else {
        return;
    };
    let selected = app.selected_key();

    let mut items: Vec<ListItem> = Vec::new();
    for group in ParamGroup::ALL {
        items.push(
            ListItem::new(group.title())
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        );
        for key in group.keys() {
            let style = if key == selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if key == selected { ">" } else { " " };
            items.push(
                ListItem::new(format!(
                    "{marker} {:<32} {}",
                    key.label(),
                    key.format_display(config)
                ))
                .style(style),
            );
        }
    }

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Configuration"));
    f.render_widget(list, area);
}

fn render_records(
    f: &mut Frame,
    records: &[Value],
    title: &str,
    empty: &str,
    area: ratatui::layout::Rect,
) {
    let body = if records.is_empty() {
        empty.to_string()
    } else {
        records
            .iter()
            .map(|r| serde_json::to_string_pretty(r).unwrap_or_else(|_| r.to_string()))
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    let paragraph = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(paragraph, area);
}

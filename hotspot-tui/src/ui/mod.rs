/*!
 * Hotspot TUI Interface
 * Network, image crop and env file panels
 */

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Rectangle},
        Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap,
    },
    Frame,
};

use crate::app::{App, SavedDetail, StatusKind, Tab};

// Conservative color palette
const BLUE: Color = Color::Rgb(100, 149, 237);
const GRAY: Color = Color::Rgb(128, 128, 128);
const WHITE: Color = Color::Rgb(255, 255, 255);
const GREEN: Color = Color::Rgb(34, 139, 34);
const RED: Color = Color::Rgb(220, 20, 60);
const AMBER: Color = Color::Rgb(255, 191, 0);

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Length(1), // Connectivity
            Constraint::Min(8),    // Active tab
            Constraint::Length(3), // Status + help
        ])
        .split(f.area());

    render_tabs(f, chunks[0], app);
    render_connectivity(f, chunks[1], app);
    match app.tab {
        Tab::Network => render_network_tab(f, chunks[2], app),
        Tab::Images => render_images_tab(f, chunks[2], app),
        Tab::Environment => render_env_tab(f, chunks[2], app),
    }
    render_footer(f, chunks[3], app);

    if app.prompt.is_some() {
        render_prompt(f, app);
    }
}

fn panel(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title.into())
        .border_style(Style::default().fg(GRAY))
}

fn label(name: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", name), Style::default().fg(GRAY)),
        Span::styled(value.into(), Style::default().fg(WHITE)),
    ])
}

fn selectable<'a>(content: impl Into<Line<'a>>, selected: bool) -> ListItem<'a> {
    let prefix = if selected { "▶ " } else { "  " };
    let mut line: Line = content.into();
    line.spans.insert(0, Span::raw(prefix));
    if selected {
        ListItem::new(line).style(Style::default().bg(BLUE).fg(WHITE))
    } else {
        ListItem::new(line)
    }
}

fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(panel("Hotspot Connection Setter"))
        .style(Style::default().fg(GRAY))
        .highlight_style(Style::default().fg(BLUE).add_modifier(Modifier::BOLD));

    f.render_widget(tabs, area);
}

fn render_connectivity(f: &mut Frame, area: Rect, app: &App) {
    let (indicator, color) = if app.online {
        ("● Internet: online", GREEN)
    } else {
        ("○ Internet: offline", RED)
    };

    let line = Line::from(vec![
        Span::styled(indicator, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(&app.backend_note, Style::default().fg(GRAY)),
    ]);

    f.render_widget(Paragraph::new(line), area);
}

fn render_network_tab(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let records = app.scan_cache.records();
    let items: Vec<ListItem> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let content = Line::from(vec![
                Span::styled(record.ssid.clone(), Style::default().fg(WHITE)),
                Span::styled(
                    format!("  {} · {}", record.signal, record.security),
                    Style::default().fg(GRAY),
                ),
            ]);
            selectable(content, i == app.selected_network)
        })
        .collect();

    if items.is_empty() {
        let hint = if app.scan_cache.has_scanned() {
            "No networks parsed.\n\nWi-Fi may be disabled, there may be no wireless interface, or the command output format differs.\n\nPress [o] for the raw command output."
        } else {
            "Press [s] to scan for Wi-Fi networks."
        };
        let paragraph = Paragraph::new(hint)
            .block(panel("Available Wi-Fi networks"))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, chunks[0]);
    } else {
        f.render_widget(List::new(items).block(panel("Available Wi-Fi networks")), chunks[0]);
    }

    render_network_details(f, chunks[1], app);
}

fn render_network_details(f: &mut Frame, area: Rect, app: &App) {
    let (title, body) = if app.show_raw {
        ("Raw command output", app.scan_cache.raw_output().to_string())
    } else if let Some(diagnostic) = &app.last_diagnostic {
        ("Last connection attempt", diagnostic.clone())
    } else {
        ("Connection", String::new())
    };

    let mut lines = Vec::new();
    if let Some(record) = app.selected_record() {
        lines.push(Line::from(vec![
            Span::styled("Selected SSID: ", Style::default().fg(GRAY)),
            Span::styled(record.ssid.clone(), Style::default().fg(WHITE).add_modifier(Modifier::BOLD)),
        ]));
        lines.push(label("Signal", record.signal.clone()));
        lines.push(label("Security", record.security.clone()));
        lines.push(Line::from(""));
    }
    lines.extend(body.lines().map(|l| Line::from(l.to_string())));

    let paragraph = Paragraph::new(lines)
        .block(panel(title))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_images_tab(f: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    render_sources(f, left[0], app);
    render_gallery(f, left[1], app);
    render_crop_canvas(f, columns[1], app);
}

fn render_sources(f: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = app
        .sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let marker = if i == app.selected_source { "▶ " } else { "  " };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(source.name.clone(), Style::default().fg(WHITE)),
                Span::styled(format!("  {}x{}", source.width(), source.height()), Style::default().fg(GRAY)),
            ])
        })
        .collect();

    if let Some((_, state)) = app.current_crop() {
        lines.push(Line::from(""));
        lines.push(label("Crop", format!("{} x {}", state.crop_width, state.crop_height)));
        lines.push(label("Offset", format!("({}, {})", state.x, state.y)));
        lines.push(label("Range", format!("x 0..={}  y 0..={}", state.max_x(), state.max_y())));
        lines.push(label("Step", app.config.crop.step.to_string()));
    } else {
        lines.push(Line::from("Open an image with [O] to crop it."));
    }

    let title = format!("Images ({} x {} crop)", app.config.crop.width, app.config.crop.height);
    f.render_widget(Paragraph::new(lines).block(panel(title)), area);
}

fn render_gallery(f: &mut Frame, area: Rect, app: &App) {
    let title = format!("Saved images · {}", app.config.storage.output_dir.display());

    if !app.gallery_available() {
        let paragraph = Paragraph::new("No internet connection detected.\n\nViewing saved images is disabled until a connection is available. Press [i] to re-check.")
            .style(Style::default().fg(GRAY))
            .block(panel(title))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
        return;
    }

    if app.saved_images.is_empty() {
        let paragraph = Paragraph::new("No saved images found in the output folder yet.")
            .style(Style::default().fg(GRAY))
            .block(panel(title))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .saved_images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let modified = image
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let content = Line::from(vec![
                Span::raw(image.name.clone()),
                Span::styled(format!("  {}", modified), Style::default().fg(GRAY)),
            ]);
            selectable(content, i == app.selected_saved)
        })
        .collect();

    let mut block = panel(title);
    if let Some(detail) = saved_detail_line(app) {
        block = block.title_bottom(detail);
    }
    f.render_widget(List::new(items).block(block), area);
}

fn saved_detail_line(app: &App) -> Option<Line<'static>> {
    let image = app.selected_saved_image()?;
    let size = Span::styled(format!(" {} ", human_size(image.size_bytes)), Style::default().fg(GRAY));
    let detail = match app.saved_detail.as_ref()? {
        SavedDetail::Dimensions { width, height } => {
            Span::styled(format!(" {} x {} px ", width, height), Style::default().fg(WHITE))
        }
        SavedDetail::Unreadable(message) => Span::styled(format!(" {} ", message), Style::default().fg(RED)),
    };
    Some(Line::from(vec![detail, size]))
}

fn human_size(bytes: u64) -> String {
    match bytes {
        0..=1023 => format!("{} B", bytes),
        1024..=1_048_575 => format!("{:.1} KiB", bytes as f64 / 1024.0),
        _ => format!("{:.1} MiB", bytes as f64 / 1_048_576.0),
    }
}

fn render_crop_canvas(f: &mut Frame, area: Rect, app: &App) {
    let Some((source, state)) = app.current_crop() else {
        let paragraph = Paragraph::new("No image loaded")
            .alignment(Alignment::Center)
            .block(panel("Selection"));
        f.render_widget(paragraph, area);
        return;
    };

    let width = f64::from(source.width());
    let height = f64::from(source.height());
    // Canvas y grows upwards; image y grows downwards.
    let crop_bottom = f64::from(source.height() - state.y - state.crop_height);

    let canvas = Canvas::default()
        .block(panel(format!("Selection · {}", source.name)))
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            ctx.draw(&Rectangle {
                x: 0.0,
                y: 0.0,
                width,
                height,
                color: GRAY,
            });
            ctx.draw(&Rectangle {
                x: f64::from(state.x),
                y: crop_bottom,
                width: f64::from(state.crop_width),
                height: f64::from(state.crop_height),
                color: RED,
            });
        });

    f.render_widget(canvas, area);
}

fn render_env_tab(f: &mut Frame, area: Rect, app: &App) {
    let title = format!("Environment · {}", app.env.path().display());

    if app.env.is_empty() {
        let paragraph = Paragraph::new("No entries. Press [a] to add one.")
            .style(Style::default().fg(GRAY))
            .block(panel(title));
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .env
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let key_style = if entry.key.trim().is_empty() {
                Style::default().fg(AMBER)
            } else {
                Style::default().fg(WHITE).add_modifier(Modifier::BOLD)
            };
            let key = if entry.key.trim().is_empty() { "<empty key>".to_string() } else { entry.key.clone() };
            let content = Line::from(vec![
                Span::styled(key, key_style),
                Span::styled("=", Style::default().fg(GRAY)),
                Span::raw(entry.value.clone()),
            ]);
            selectable(content, i == app.selected_env)
        })
        .collect();

    f.render_widget(List::new(items).block(panel(title)), area);
}

fn help_text(tab: Tab) -> &'static str {
    match tab {
        Tab::Network => "[s] Scan  [↑↓] Select  [Enter] Connect  [o] Raw output",
        Tab::Images => "[O] Open  [[ ]] Switch  [x] Close  [←↑↓→] Move  [c] Center  [s] Save  [p] Preview  [j/k] Saved  [d] Delete",
        Tab::Environment => "[a] Add  [e] Edit  [d] Remove  [w] Save  [r] Reload",
    }
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let status = match &app.status {
        Some(message) => {
            let color = match message.kind {
                StatusKind::Info => WHITE,
                StatusKind::Success => GREEN,
                StatusKind::Warning => AMBER,
                StatusKind::Error => RED,
            };
            Line::from(Span::styled(message.text.clone(), Style::default().fg(color)))
        }
        None => Line::from(""),
    };
    let help = Line::from(vec![
        Span::styled(help_text(app.tab), Style::default().fg(GRAY)),
        Span::styled("  [Tab] Switch tab  [i] Check internet  [q] Quit", Style::default().fg(GRAY)),
    ]);

    let paragraph = Paragraph::new(vec![status, help]).block(Block::default().borders(Borders::TOP));
    f.render_widget(paragraph, area);
}

fn render_prompt(f: &mut Frame, app: &App) {
    let Some(prompt) = &app.prompt else {
        return;
    };

    let area = centered(f.area(), 60, 3);
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll = app.input.visual_scroll(inner_width);

    let shown = if prompt.is_secret() {
        "*".repeat(app.input.value().chars().count())
    } else {
        app.input.value().to_string()
    };
    let input = Paragraph::new(shown)
        .scroll((0, scroll as u16))
        .block(Block::default().borders(Borders::ALL).title(prompt.title()).border_style(Style::default().fg(BLUE)));

    f.render_widget(Clear, area);
    f.render_widget(input, area);
    f.set_cursor_position((
        area.x + 1 + (app.input.visual_cursor().saturating_sub(scroll)) as u16,
        area.y + 1,
    ));
}

fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

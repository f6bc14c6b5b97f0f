//! Ratatui-based order form.
//!
//! The TUI shows an order form on the left and, on the right, the predicted
//! price and outcome, the transformed feature vector and a price-vs-quantity
//! sensitivity chart. Every edit re-runs the inference service.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::service::{InferenceService, Prediction, SensitivityField};
use crate::domain::{COUNTRY_CODES, ItemType, MONTH_NAMES, RawOrderRecord, Status};
use crate::error::{AppError, TransformError};
use crate::transform::AppliedRow;

mod plotters_chart;

use plotters_chart::SensitivityChart;

const SWEEP_STEPS: usize = 60;

/// Years offered by the date pickers.
const FORM_YEARS: (i32, i32) = (2020, 2025);

/// Start the TUI against a bundle directory.
pub fn run(bundle_dir: &Path) -> Result<(), AppError> {
    // Load before touching the terminal so a missing bundle prints normally.
    let service = InferenceService::load(bundle_dir)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(service, bundle_dir.to_path_buf());
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Form rows, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Quantity,
    Customer,
    Country,
    Application,
    Thickness,
    Width,
    ProductRef,
    ItemYear,
    ItemMonth,
    ItemDay,
    DeliveryYear,
    DeliveryMonth,
    DeliveryDay,
    Status,
    ItemType,
}

impl Field {
    const ALL: [Field; 15] = [
        Field::Quantity,
        Field::Customer,
        Field::Country,
        Field::Application,
        Field::Thickness,
        Field::Width,
        Field::ProductRef,
        Field::ItemYear,
        Field::ItemMonth,
        Field::ItemDay,
        Field::DeliveryYear,
        Field::DeliveryMonth,
        Field::DeliveryDay,
        Field::Status,
        Field::ItemType,
    ];

    fn label(self) -> &'static str {
        match self {
            Field::Quantity => "Quantity (t)",
            Field::Customer => "Customer",
            Field::Country => "Country",
            Field::Application => "Application",
            Field::Thickness => "Thickness (mm)",
            Field::Width => "Width (mm)",
            Field::ProductRef => "Product ref",
            Field::ItemYear => "Item year",
            Field::ItemMonth => "Item month",
            Field::ItemDay => "Item day",
            Field::DeliveryYear => "Delivery year",
            Field::DeliveryMonth => "Delivery month",
            Field::DeliveryDay => "Delivery day",
            Field::Status => "Status",
            Field::ItemType => "Item type",
        }
    }

    /// Closed lists cycle with ←/→ and are never typed.
    fn is_closed_list(self) -> bool {
        matches!(self, Field::Country | Field::Status | Field::ItemType) || self.date_part().is_some()
    }

    /// Which date this row edits (`true` for delivery) and which part of it.
    fn date_part(self) -> Option<(bool, DatePart)> {
        match self {
            Field::ItemYear => Some((false, DatePart::Year)),
            Field::ItemMonth => Some((false, DatePart::Month)),
            Field::ItemDay => Some((false, DatePart::Day)),
            Field::DeliveryYear => Some((true, DatePart::Year)),
            Field::DeliveryMonth => Some((true, DatePart::Month)),
            Field::DeliveryDay => Some((true, DatePart::Day)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatePart {
    Year,
    Month,
    Day,
}

/// Step one part of a date, wrapping within its list. The day is clamped to
/// the length of the resulting month.
fn cycle_date(date: NaiveDate, part: DatePart, delta: i32) -> NaiveDate {
    let (mut year, mut month, mut day) = (date.year(), date.month(), date.day());
    match part {
        DatePart::Year => {
            let (lo, hi) = FORM_YEARS;
            year = lo + (year.clamp(lo, hi) - lo + delta).rem_euclid(hi - lo + 1);
        }
        DatePart::Month => month = (month as i32 - 1 + delta).rem_euclid(12) as u32 + 1,
        DatePart::Day => {
            let n = days_in_month(year, month) as i32;
            day = (day as i32 - 1 + delta).rem_euclid(n) as u32 + 1;
        }
    }
    let day = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day())
}

fn display_date_part(date: NaiveDate, part: DatePart) -> String {
    match part {
        DatePart::Year => date.year().to_string(),
        DatePart::Month => MONTH_NAMES[date.month0() as usize].0.to_string(),
        DatePart::Day => format!("{} ({})", date.day(), date.weekday()),
    }
}

/// Form values. Always complete; the service still validates them.
#[derive(Debug, Clone, PartialEq)]
struct OrderForm {
    quantity: f64,
    customer: i64,
    country_idx: usize,
    application: i64,
    thickness: f64,
    width: f64,
    product_ref: i64,
    item_date: NaiveDate,
    delivery_date: NaiveDate,
    status: Status,
    item_type: ItemType,
}

impl Default for OrderForm {
    fn default() -> Self {
        let item_date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default();
        Self {
            quantity: 1.0,
            customer: 10000,
            country_idx: 0,
            application: 3,
            thickness: 2.5,
            width: 1000.0,
            product_ref: 150000,
            item_date,
            delivery_date: item_date + chrono::Duration::days(10),
            status: Status::Offerable,
            item_type: ItemType::W,
        }
    }
}

impl OrderForm {
    fn country(&self) -> (&'static str, i64) {
        COUNTRY_CODES[self.country_idx % COUNTRY_CODES.len()]
    }

    fn to_raw(&self) -> RawOrderRecord {
        RawOrderRecord {
            id: Some("tui".to_string()),
            quantity: Some(self.quantity),
            customer: Some(self.customer),
            country: Some(self.country().1),
            status: Some(self.status.label().to_string()),
            item_type: Some(self.item_type.label().to_string()),
            application: Some(self.application),
            thickness: Some(self.thickness),
            width: Some(self.width),
            product_ref: Some(self.product_ref),
            item_date: Some(self.item_date),
            delivery_date: Some(self.delivery_date),
            selling_price: None,
        }
    }

    fn display(&self, field: Field) -> String {
        if let Some((delivery, part)) = field.date_part() {
            return display_date_part(self.date(delivery), part);
        }
        match field {
            Field::Quantity => format!("{:.2}", self.quantity),
            Field::Customer => self.customer.to_string(),
            Field::Country => {
                let (name, code) = self.country();
                format!("{name} ({code})")
            }
            Field::Application => self.application.to_string(),
            Field::Thickness => format!("{:.2}", self.thickness),
            Field::Width => format!("{:.0}", self.width),
            Field::ProductRef => self.product_ref.to_string(),
            Field::Status => self.status.label().to_string(),
            Field::ItemType => self.item_type.label().to_string(),
            _ => String::new(),
        }
    }

    fn date(&self, delivery: bool) -> NaiveDate {
        if delivery { self.delivery_date } else { self.item_date }
    }

    /// ←/→: cycle closed lists (date parts included) and step numbers.
    /// Numeric fields stay >= 0.
    fn adjust(&mut self, field: Field, delta: i32) {
        let d = f64::from(delta);
        if let Some((delivery, part)) = field.date_part() {
            let date = cycle_date(self.date(delivery), part, delta);
            if delivery {
                self.delivery_date = date;
            } else {
                self.item_date = date;
            }
            return;
        }
        match field {
            Field::Quantity => self.quantity = (self.quantity + d).max(0.0),
            Field::Customer => self.customer = (self.customer + i64::from(delta)).max(0),
            Field::Country => {
                let n = COUNTRY_CODES.len() as i32;
                self.country_idx = (self.country_idx as i32 + delta).rem_euclid(n) as usize;
            }
            Field::Application => self.application = (self.application + i64::from(delta)).max(0),
            Field::Thickness => self.thickness = ((self.thickness + 0.1 * d) * 100.0).round().max(0.0) / 100.0,
            Field::Width => self.width = (self.width + 10.0 * d).max(0.0),
            Field::ProductRef => self.product_ref = (self.product_ref + i64::from(delta)).max(0),
            Field::Status => {
                self.status = if delta >= 0 { self.status.next() } else { self.status.prev() };
            }
            Field::ItemType => {
                self.item_type = if delta >= 0 { self.item_type.next() } else { self.item_type.prev() };
            }
            _ => {}
        }
    }

    /// Apply typed text to a numeric field.
    fn set_text(&mut self, field: Field, text: &str) -> Result<(), String> {
        let text = text.trim();
        let non_negative = |v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(v)
            } else {
                Err(format!("{} must be a number >= 0", field.label()))
            }
        };
        let parse_f64 = || text.parse::<f64>().map_err(|_| format!("'{text}' is not a number"));
        let parse_i64 = || text.parse::<i64>().map_err(|_| format!("'{text}' is not an integer"));
        match field {
            Field::Quantity => self.quantity = non_negative(parse_f64()?)?,
            Field::Thickness => self.thickness = non_negative(parse_f64()?)?,
            Field::Width => self.width = non_negative(parse_f64()?)?,
            Field::Customer => self.customer = parse_i64()?,
            Field::Application => self.application = parse_i64()?,
            Field::ProductRef => self.product_ref = parse_i64()?,
            _ => {}
        }
        Ok(())
    }
}

struct App {
    service: InferenceService,
    bundle_dir: PathBuf,
    form: OrderForm,
    selected: usize,
    /// Text buffer while a field is being typed.
    editing: Option<String>,
    status: String,
    result: Option<Result<(Prediction, AppliedRow), TransformError>>,
    sweep: Vec<(f64, f64)>,
}

impl App {
    fn new(service: InferenceService, bundle_dir: PathBuf) -> Self {
        let mut app = Self {
            service,
            bundle_dir,
            form: OrderForm::default(),
            selected: 0,
            editing: None,
            status: String::new(),
            result: None,
            sweep: Vec::new(),
        };
        app.refresh();
        app.status = format!("Loaded bundle from {}", app.bundle_dir.display());
        app
    }

    fn field(&self) -> Field {
        Field::ALL[self.selected]
    }

    /// Re-run inference for the current form.
    fn refresh(&mut self) {
        let raw = self.form.to_raw();
        self.result = Some(self.service.predict_traced(&raw));

        let hi = (self.form.quantity * 2.0).max(10.0);
        self.sweep = self
            .service
            .price_sensitivity(&raw, SensitivityField::Quantity, (0.0, hi), SWEEP_STEPS)
            .unwrap_or_default();
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing.is_some() {
            self.handle_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(Field::ALL.len() - 1),
            KeyCode::Left | KeyCode::Right => {
                let delta = if code == KeyCode::Right { 1 } else { -1 };
                let field = self.field();
                self.form.adjust(field, delta);
                self.refresh();
                self.status = format!("{}: {}", field.label(), self.form.display(field));
            }
            KeyCode::Enter => {
                let field = self.field();
                if field.is_closed_list() {
                    self.status = format!("{} is a list; use ←/→.", field.label());
                } else {
                    self.editing = Some(self.form.display(field));
                    self.status = format!("Editing {}. Enter to apply, Esc to cancel.", field.label());
                }
            }
            KeyCode::Char('d') => self.write_debug(),
            _ => {}
        }
        false
    }

    fn handle_edit(&mut self, code: KeyCode) {
        let Some(buffer) = self.editing.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let text = std::mem::take(buffer);
                self.editing = None;
                let field = self.field();
                match self.form.set_text(field, &text) {
                    Ok(()) => {
                        self.refresh();
                        self.status = format!("{}: {}", field.label(), self.form.display(field));
                    }
                    Err(msg) => self.status = msg,
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '/' | ' ') => {
                buffer.push(c);
            }
            _ => {}
        }
    }

    fn write_debug(&mut self) {
        let raw = self.form.to_raw();
        self.status = match self.service.predict_traced(&raw) {
            Ok((prediction, applied)) => {
                match crate::debug::write_debug_dump(
                    Path::new("debug"),
                    self.service.bundle(),
                    &raw,
                    &applied,
                    &prediction,
                ) {
                    Ok(path) => format!("Wrote debug dump: {}", path.display()),
                    Err(err) => format!("Debug write failed: {err}"),
                }
            }
            Err(err) => format!("Nothing to dump: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(40), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_form(frame, body[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0)])
            .split(body[1]);
        self.draw_prediction(frame, right[0]);

        let lower = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(44), Constraint::Min(0)])
            .split(right[1]);
        self.draw_features(frame, lower[0]);
        self.draw_chart(frame, lower[1]);

        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let bundle = self.service.bundle();
        let line = Line::from(vec![
            Span::styled("copper", Style::default().fg(Color::Cyan)),
            Span::raw(" price + Won/NotWin"),
            Span::styled(
                format!(
                    "  | bundle {} | {} columns | trained {}",
                    self.bundle_dir.display(),
                    bundle.transform.width(),
                    bundle.created_at.format("%Y-%m-%d %H:%M")
                ),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = Field::ALL
            .iter()
            .enumerate()
            .map(|(i, &field)| {
                let value = match &self.editing {
                    Some(buffer) if i == self.selected => format!("{buffer}_"),
                    _ => self.form.display(field),
                };
                let marker = if field.is_closed_list() { "‹›" } else { "  " };
                ListItem::new(format!("{:<15} {marker} {value}", field.label()))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Order").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_prediction(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Prediction").borders(Borders::ALL);
        let lines = match &self.result {
            Some(Ok((p, _))) => {
                let color = if p.win_probability >= 0.5 { Color::Green } else { Color::Red };
                vec![
                    Line::from(vec![
                        Span::raw("Selling price: "),
                        Span::styled(format!("{:.2}", p.price), Style::default().add_modifier(Modifier::BOLD)),
                    ]),
                    Line::from(vec![
                        Span::raw("Outcome:       "),
                        Span::styled(p.outcome.display_name(), Style::default().fg(color)),
                    ]),
                    Line::from(format!("P(win):        {:.3}", p.win_probability)),
                    Line::from(Span::styled(
                        format!("lead time {} days", (self.form.delivery_date - self.form.item_date).num_days()),
                        Style::default().fg(Color::Gray),
                    )),
                ]
            }
            Some(Err(err)) => vec![Line::from(Span::styled(
                format!("Rejected: {err}"),
                Style::default().fg(Color::Red),
            ))],
            None => vec![Line::from("No prediction yet.")],
        };
        frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
    }

    fn draw_features(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = match &self.result {
            Some(Ok((_, applied))) => applied
                .columns
                .iter()
                .zip(&applied.scaled)
                .map(|(name, v)| ListItem::new(format!("{name:<28} {v:>10.4}")))
                .collect(),
            _ => vec![ListItem::new("-")],
        };
        let list = List::new(items).block(Block::default().title("Features (scaled)").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Price vs quantity").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let current = match &self.result {
            Some(Ok((p, _))) => Some((self.form.quantity, p.price)),
            _ => None,
        };
        let Some((x_bounds, y_bounds)) = chart_bounds(&self.sweep, current) else {
            let msg = Paragraph::new("No sensitivity data.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = SensitivityChart {
            curve: &self.sweep,
            current,
            x_bounds,
            y_bounds,
            x_label: SensitivityField::Quantity.label(),
            y_label: "price",
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Padded bounds covering the sweep and the current point.
fn chart_bounds(curve: &[(f64, f64)], current: Option<(f64, f64)>) -> Option<([f64; 2], [f64; 2])> {
    let points = curve.iter().copied().chain(current);
    let (mut x0, mut x1, mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in points.filter(|(x, y)| x.is_finite() && y.is_finite()) {
        x0 = x0.min(x);
        x1 = x1.max(x);
        y0 = y0.min(y);
        y1 = y1.max(y);
    }
    if !(x0.is_finite() && x1 > x0) || !y0.is_finite() {
        return None;
    }
    let pad = ((y1 - y0).abs() * 0.05).max(1.0);
    Some(([x0, x1], [y0 - pad, y1 + pad]))
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = format!("{x_val:.1}");
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.0}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new(SensitivityField::Quantity.label())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{raw_order, trained_bundle};

    #[test]
    fn default_form_is_the_reference_order() {
        let expected = RawOrderRecord {
            id: Some("tui".to_string()),
            ..raw_order()
        };
        assert_eq!(OrderForm::default().to_raw(), expected);
    }

    #[test]
    fn closed_lists_cycle() {
        let mut form = OrderForm::default();
        form.adjust(Field::Country, -1);
        assert_eq!(form.country(), COUNTRY_CODES[COUNTRY_CODES.len() - 1]);
        form.adjust(Field::Status, 1);
        assert_eq!(form.status, Status::Offered);
        form.adjust(Field::ItemType, 1);
        assert_eq!(form.item_type, ItemType::Wi);
    }

    #[test]
    fn numbers_step_and_stay_non_negative() {
        let mut form = OrderForm::default();
        form.adjust(Field::Quantity, -1);
        form.adjust(Field::Quantity, -1);
        assert_eq!(form.quantity, 0.0);
        form.adjust(Field::Thickness, 1);
        assert!((form.thickness - 2.6).abs() < 1e-9);
        form.adjust(Field::Width, -200);
        assert_eq!(form.width, 0.0);
    }

    #[test]
    fn date_parts_are_closed_lists() {
        let mut form = OrderForm::default();
        assert!(Field::ItemMonth.is_closed_list());
        assert_eq!(form.display(Field::ItemMonth), "January");
        assert_eq!(form.display(Field::ItemDay), "15 (Mon)");

        form.adjust(Field::ItemMonth, -1);
        assert_eq!(form.item_date.to_string(), "2024-12-15");
        assert_eq!(form.display(Field::ItemMonth), "December");

        // 31 January stepped to February clamps to the month's end.
        form.delivery_date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        form.adjust(Field::DeliveryMonth, 1);
        assert_eq!(form.delivery_date.to_string(), "2024-02-29");
        form.adjust(Field::DeliveryDay, 1);
        assert_eq!(form.delivery_date.to_string(), "2024-02-01");

        form.adjust(Field::ItemYear, 1);
        assert_eq!(form.display(Field::ItemYear), "2025");
        form.adjust(Field::ItemYear, 1);
        assert_eq!(form.display(Field::ItemYear), "2020");
    }

    #[test]
    fn typed_values_are_checked() {
        let mut form = OrderForm::default();
        form.set_text(Field::Width, "1250").unwrap();
        assert_eq!(form.width, 1250.0);
        assert!(form.set_text(Field::Width, "-3").is_err());
        assert!(form.set_text(Field::Customer, "abc").is_err());
        form.set_text(Field::ItemMonth, "March").unwrap();
        assert_eq!(form.item_date.month(), 1);
    }

    #[test]
    fn edits_refresh_the_prediction() {
        let mut app = App::new(InferenceService::from_bundle(trained_bundle()), PathBuf::from("mem"));
        assert!(matches!(app.result, Some(Ok(_))));
        assert_eq!(app.sweep.len(), SWEEP_STEPS);

        app.selected = Field::ALL.iter().position(|&f| f == Field::Width).unwrap();
        assert!(!app.handle_key(KeyCode::Enter));
        assert_eq!(app.editing.as_deref(), Some("1000"));
        for _ in 0..4 {
            app.handle_key(KeyCode::Backspace);
        }
        for c in "2000".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        assert_eq!(app.editing.as_deref(), Some("2000"));
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.form.width, 2000.0);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn bounds_cover_curve_and_point() {
        let curve = [(0.0, 100.0), (10.0, 120.0)];
        let (x, y) = chart_bounds(&curve, Some((12.0, 90.0))).unwrap();
        assert_eq!(x, [0.0, 12.0]);
        assert!(y[0] < 90.0 && y[1] > 120.0);
        assert!(chart_bounds(&[], None).is_none());
    }
}

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use milpay_flow::{cents, FlowCategory, FormState, PayBreakdown, PayContext};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;

/// Focusable form fields. Row fields only exist once the row is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Grade,
    Years,
    Dependents,
    Zip,
    Contribution,
    ExpenseLabel(usize),
    ExpenseAmount(usize),
    IncomeLabel(usize),
    IncomeAmount(usize),
}

pub struct App<'a> {
    context: &'a PayContext,
    pub form: FormState,
    pub focus: Field,
    pub breakdown: Option<PayBreakdown>,
}

impl<'a> App<'a> {
    pub fn new(context: &'a PayContext) -> Self {
        let mut app = Self {
            context,
            form: FormState::default(),
            focus: Field::Grade,
            breakdown: None,
        };
        app.recompute();
        app
    }

    /// Every change re-resolves from scratch; nothing is carried over
    pub fn recompute(&mut self) {
        self.breakdown = self.context.resolver().resolve(&self.form.to_inputs());
    }

    pub fn focus_order(&self) -> Vec<Field> {
        let mut order = vec![
            Field::Grade,
            Field::Years,
            Field::Dependents,
            Field::Zip,
            Field::Contribution,
        ];
        for i in 0..self.form.expenses.revealed() {
            order.push(Field::ExpenseLabel(i));
            order.push(Field::ExpenseAmount(i));
        }
        for i in 0..self.form.incomes.revealed() {
            order.push(Field::IncomeLabel(i));
            order.push(Field::IncomeAmount(i));
        }
        order
    }

    pub fn next_field(&mut self) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(i + 1) % order.len()];
    }

    pub fn previous_field(&mut self) {
        let order = self.focus_order();
        let i = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(i + order.len() - 1) % order.len()];
    }

    pub fn add_expense(&mut self) {
        if self.form.expenses.reveal() {
            self.focus = Field::ExpenseLabel(self.form.expenses.revealed() - 1);
        }
    }

    pub fn add_income(&mut self) {
        if self.form.incomes.reveal() {
            self.focus = Field::IncomeLabel(self.form.incomes.revealed() - 1);
        }
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Zip => Some(&mut self.form.zip_code),
            Field::ExpenseLabel(i) => self.form.expenses.row_mut(i).map(|r| &mut r.label),
            Field::ExpenseAmount(i) => self.form.expenses.row_mut(i).map(|r| &mut r.amount),
            Field::IncomeLabel(i) => self.form.incomes.row_mut(i).map(|r| &mut r.label),
            Field::IncomeAmount(i) => self.form.incomes.row_mut(i).map(|r| &mut r.amount),
            _ => None,
        }
    }

    fn step(&mut self, forward: bool) {
        match self.focus {
            Field::Grade => {
                self.form.grade = if forward {
                    self.form.grade.next()
                } else {
                    self.form.grade.previous()
                };
            }
            Field::Years => {
                let years = self.context.reference.service_years().to_vec();
                self.form.step_years(forward, &years);
            }
            Field::Dependents => self.form.toggle_dependents(),
            Field::Contribution => self.form.step_contribution(if forward { 1 } else { -1 }),
            _ => {}
        }
    }

    fn type_char(&mut self, c: char) {
        match self.focus {
            Field::Zip => self.form.push_zip_char(c),
            Field::Dependents if c == ' ' => self.form.toggle_dependents(),
            _ => {
                if let Some(text) = self.focused_text() {
                    text.push(c);
                }
            }
        }
    }

    /// Returns true when the user asked to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Char('c') if ctrl => return true,
            KeyCode::Char('e') if ctrl => self.add_expense(),
            KeyCode::Char('n') if ctrl => self.add_income(),
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.previous_field(),
            KeyCode::Right => self.step(true),
            KeyCode::Left => self.step(false),
            KeyCode::Backspace => {
                if let Some(text) = self.focused_text() {
                    text.pop();
                }
            }
            KeyCode::Char(c) if !ctrl => self.type_char(c),
            _ => return false,
        }

        self.recompute();
        false
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(38), // Inputs
            Constraint::Percentage(62), // Breakdown
        ])
        .split(chunks[1]);

    render_form(f, content_chunks[0], app);
    render_breakdown(f, content_chunks[1], app);

    render_status_bar(f, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "Military Pay Flow",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Rates {}", app.context.rates.fiscal_year),
            Style::default().fg(Color::White),
        ),
    ];

    if let Some(breakdown) = &app.breakdown {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("↑ {:.2}", cents(breakdown.total_income())),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("↓ {:.2}", cents(breakdown.total_outflow())),
            Style::default().fg(Color::Red),
        ));
        spans.push(Span::raw("  "));

        let net = breakdown.net_remaining();
        let color = if net < 0.0 { Color::Red } else { Color::Cyan };
        spans.push(Span::styled(format!("= {:.2}", cents(net)), Style::default().fg(color)));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn field_line<'s>(label: &'s str, value: String, focused: bool) -> Line<'s> {
    let value_style = if focused {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    Line::from(vec![
        Span::styled(format!("{:<14}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, value_style),
    ])
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let focused = |field: Field| app.focus == field;

    let mut lines = vec![
        field_line("Rank", format!("◀ {} ▶", form.grade), focused(Field::Grade)),
        field_line(
            "Years",
            format!("◀ {} ▶", form.years_of_service),
            focused(Field::Years),
        ),
        field_line(
            "Dependents",
            if form.has_dependents { "Yes".to_string() } else { "No".to_string() },
            focused(Field::Dependents),
        ),
        field_line("Zip Code", format!("{:_<5}", form.zip_code), focused(Field::Zip)),
        field_line(
            "TSP %",
            format!("◀ {}% ▶", form.contribution_percent),
            focused(Field::Contribution),
        ),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "Monthly Expenses ({}/{})",
                form.expenses.revealed(),
                form.expenses.capacity()
            ),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    ];

    for (i, row) in form.expenses.visible().iter().enumerate() {
        lines.push(field_line("  name", row.label.clone(), focused(Field::ExpenseLabel(i))));
        lines.push(field_line("  amount", row.amount.clone(), focused(Field::ExpenseAmount(i))));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "Additional Income ({}/{})",
            form.incomes.revealed(),
            form.incomes.capacity()
        ),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )));

    for (i, row) in form.incomes.visible().iter().enumerate() {
        lines.push(field_line("  name", row.label.clone(), focused(Field::IncomeLabel(i))));
        lines.push(field_line("  amount", row.amount.clone(), focused(Field::IncomeAmount(i))));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Inputs "),
    );

    f.render_widget(panel, area);
}

/// Proportional bar, scaled so total income fills `width`
fn bar(amount: f64, scale: f64, width: usize) -> String {
    if scale <= 0.0 {
        return String::new();
    }
    let filled = ((amount / scale) * width as f64).round().clamp(0.0, width as f64) as usize;
    "█".repeat(filled)
}

fn render_breakdown(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Where it goes ");

    let Some(breakdown) = &app.breakdown else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No breakdown for these inputs.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "  Check the zip code and that the rank has pay at these years.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(block);
        f.render_widget(empty, area);
        return;
    };

    let header_cells = ["Item", "Amount", "Flow", ""].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let scale = breakdown.total_income();
    let bar_width = area.width.saturating_sub(64).max(8) as usize;
    let labels: Vec<&str> = breakdown.items().iter().map(|i| i.label.as_str()).collect();

    let rows = breakdown.items().iter().enumerate().map(|(index, item)| {
        let color = match item.category {
            FlowCategory::Income => Color::Green,
            FlowCategory::Deduction => Color::Red,
            FlowCategory::PassThrough => Color::Cyan,
        };

        // Feeders point at their target, outflows at their source
        let flow = match item.link {
            Some(link) if link.from == index => format!("→ {}", labels[link.to]),
            Some(link) => format!("← {}", labels[link.from]),
            None => String::new(),
        };

        Row::new(vec![
            Cell::from(truncate(&item.label, 24)),
            Cell::from(format!("{:>10.2}", cents(item.amount))).style(Style::default().fg(color)),
            Cell::from(truncate(&flow, 24)),
            Cell::from(bar(item.amount, scale, bar_width)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(12),
            Constraint::Length(26),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(block);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let status_spans = vec![
        Span::raw(" "),
        key("Tab/↑/↓"),
        Span::raw(" Field | "),
        key("◀/▶"),
        Span::raw(" Change | "),
        key("Ctrl+E"),
        Span::raw(" Add Expense | "),
        key("Ctrl+N"),
        Span::raw(" Add Income | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

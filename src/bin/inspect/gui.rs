use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Chart, Dataset, GraphType},
    Frame, Terminal,
};
use std::{error::Error, io, time::Duration};

struct App<'a> {
    left: &'a [(f64, f64)],
    right: &'a [(f64, f64)],
    x_max: f64,
    y_max: f64,
}

pub fn engage_gui(
    left: &[(f64, f64)],
    right: &[(f64, f64)],
    window_ms: f64,
) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let y_max = left
        .iter()
        .chain(right)
        .map(|&(_, y)| y.abs())
        .fold(0.0, f64::max)
        .max(1e-6);
    let app = App {
        left,
        right,
        x_max: window_ms,
        y_max,
    };
    let res = run_app(&mut terminal, &app);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    return Ok(());
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let x_labels: Vec<Span> = [0.0, app.x_max / 2.0, app.x_max]
        .iter()
        .map(|x| Span::from(format!("{:.0}", x)))
        .collect();
    let y_labels: Vec<Span> = [-app.y_max, 0.0, app.y_max]
        .iter()
        .map(|y| Span::from(format!("{:.3}", y)))
        .collect();

    let chart = Chart::new(vec![
        Dataset::default()
            .name("Left")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(app.left),
        Dataset::default()
            .name("Right")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(app.right),
    ])
    .block(Block::default().title("Impulse response onset ('q' to quit)"))
    .x_axis(
        Axis::default()
            .title(Span::styled("Time [ms]", Style::default().fg(Color::White)))
            .style(Style::default().fg(Color::White))
            .bounds([0.0, app.x_max])
            .labels(x_labels),
    )
    .y_axis(
        Axis::default()
            .title(Span::styled("Amplitude", Style::default().fg(Color::White)))
            .style(Style::default().fg(Color::White))
            .bounds([-app.y_max, app.y_max])
            .labels(y_labels),
    );

    f.render_widget(chart, f.size());
}

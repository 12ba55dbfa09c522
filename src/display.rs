// Display Module - hosts that show (or store) finished frames
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{debug, info};
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::bitmap::Bitmap;
use crate::types::{Button, HostEvent, Rgb};

/// Whatever receives finished frames from the render loop
pub trait Display {
    fn present(&mut self, screen: &Bitmap, frame: u64) -> Result<()>;

    /// Next pending input event, never blocking
    fn poll_event(&mut self) -> Result<Option<HostEvent>> {
        Ok(None)
    }

    fn set_palette(&mut self, _ink: Rgb, _paper: Rgb) {}
}

// No output device; only keeps track of what went by
#[derive(Default)]
pub struct HeadlessDisplay {
    pub frames: u64,
    pub last_checksum: u64,
}

impl Display for HeadlessDisplay {
    fn present(&mut self, screen: &Bitmap, frame: u64) -> Result<()> {
        self.frames = frame;
        self.last_checksum = screen.checksum();
        if frame % 500 == 0 {
            debug!("frame {} checksum {:016x}", frame, self.last_checksum);
        }
        Ok(())
    }
}

/// Writes every frame as frame_NNNNN.png into a directory
pub struct PngDumpDisplay {
    dir: PathBuf,
    ink: Rgb,
    paper: Rgb,
}

impl PngDumpDisplay {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        info!("Writing frames to {}", dir.display());
        Ok(PngDumpDisplay {
            dir: dir.to_path_buf(),
            ink: Rgb::BLACK,
            paper: Rgb::WHITE,
        })
    }

    pub fn frame_path(&self, frame: u64) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", frame))
    }
}

impl Display for PngDumpDisplay {
    fn present(&mut self, screen: &Bitmap, frame: u64) -> Result<()> {
        screen.save_png(&self.frame_path(frame), self.ink, self.paper)
    }

    fn set_palette(&mut self, ink: Rgb, paper: Rgb) {
        self.ink = ink;
        self.paper = paper;
    }
}

/// Renders a 1-bit bitmap with half-block glyphs, two pixel rows per cell
pub struct ScreenView<'a> {
    pub screen: &'a Bitmap,
    pub ink: Rgb,
    pub paper: Rgb,
}

impl<'a> ScreenView<'a> {
    /// Cells needed to show the whole bitmap
    pub fn size(screen: &Bitmap) -> (u16, u16) {
        (screen.width() as u16, ((screen.height() + 1) / 2) as u16)
    }

    fn color(&self, x: usize, y: usize) -> Color {
        let rgb = if self.screen.pixel(x, y) { self.paper } else { self.ink };
        Color::Rgb(rgb.r, rgb.g, rgb.b)
    }
}

impl<'a> Widget for ScreenView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cols, rows) = Self::size(self.screen);
        for cy in 0..rows.min(area.height) {
            for cx in 0..cols.min(area.width) {
                let (x, y) = (cx as usize, cy as usize * 2);
                let top = self.color(x, y);
                let bottom = if y + 1 < self.screen.height() {
                    self.color(x, y + 1)
                } else {
                    Color::Reset
                };
                buf.get_mut(area.x + cx, area.y + cy)
                    .set_char('▀')
                    .set_fg(top)
                    .set_bg(bottom);
            }
        }
    }
}

// Center a `width` x `height` box inside `area`, clipped to it
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Terminal preview standing in for the watch window
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    ink: Rgb,
    paper: Rgb,
    started: Instant,
    restored: bool,
}

impl TerminalDisplay {
    pub fn new() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        Ok(TerminalDisplay {
            terminal,
            ink: Rgb::BLACK,
            paper: Rgb::WHITE,
            started: Instant::now(),
            restored: false,
        })
    }

    /// Put the terminal back the way we found it
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.terminal.show_cursor()?;
        disable_raw_mode()?;
        self.terminal.backend_mut().execute(LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

impl Display for TerminalDisplay {
    fn present(&mut self, screen: &Bitmap, frame: u64) -> Result<()> {
        let (ink, paper) = (self.ink, self.paper);
        let fps = frame as f64 / self.started.elapsed().as_secs_f64().max(f64::EPSILON);

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(10),   // Screen
                    Constraint::Length(3), // Footer
                ])
                .split(f.size());

            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "thumpa",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw("   "),
                Span::styled("q, Esc or Ctrl+C to quit", Style::default().fg(Color::Gray)),
            ]))
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(header, chunks[0]);

            let (cols, rows) = ScreenView::size(screen);
            f.render_widget(
                ScreenView { screen, ink, paper },
                centered(chunks[1], cols, rows),
            );

            let footer = Paragraph::new(format!(
                "frame {:>8}   {:>6.1} fps   {}x{}",
                frame,
                fps,
                screen.width(),
                screen.height()
            ))
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(footer, chunks[2]);
        })?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<HostEvent>> {
        while event::poll(Duration::from_millis(0))? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            return Ok(match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(HostEvent::Quit),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(HostEvent::Quit)
                }
                KeyCode::Up => Some(HostEvent::Button(Button::Up)),
                KeyCode::Down => Some(HostEvent::Button(Button::Down)),
                _ => continue,
            });
        }
        Ok(None)
    }

    fn set_palette(&mut self, ink: Rgb, paper: Rgb) {
        self.ink = ink;
        self.paper = paper;
    }
}

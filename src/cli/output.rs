//! Terminal styling shared by every command.

use std::io::{IsTerminal, Write};

use ansi_term::{Colour, Style};

use crate::{storage::preferences::Theme, utils::percentage::Percentage};

/// How good a score or a progress value is. Drives colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Good,
    Medium,
    Poor,
}

impl Grade {
    /// Bands used for the live focus score.
    pub fn from_focus_score(score: f64) -> Grade {
        if score > 70. {
            Grade::Good
        } else if score > 40. {
            Grade::Medium
        } else {
            Grade::Poor
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    theme: Theme,
    enabled: bool,
}

impl Palette {
    /// Colours are dropped when stdout is not a terminal.
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            enabled: std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self {
            theme: Theme::default(),
            enabled: false,
        }
    }

    pub fn heading(&self, text: &str) -> String {
        let colour = match self.theme {
            Theme::Dark => Colour::Cyan,
            Theme::Light => Colour::Blue,
        };
        self.paint(colour.bold(), text)
    }

    pub fn accent(&self, text: &str) -> String {
        let colour = match self.theme {
            Theme::Dark => Colour::Purple,
            Theme::Light => Colour::Fixed(55),
        };
        self.paint(colour.normal(), text)
    }

    pub fn muted(&self, text: &str) -> String {
        let colour = match self.theme {
            Theme::Dark => Colour::Fixed(245),
            Theme::Light => Colour::Fixed(240),
        };
        self.paint(colour.normal(), text)
    }

    pub fn graded(&self, grade: Grade, text: &str) -> String {
        let colour = match grade {
            Grade::Good => Colour::Green,
            Grade::Medium => Colour::Yellow,
            Grade::Poor => Colour::Red,
        };
        self.paint(colour.bold(), text)
    }

    /// Highlighted banner used for notices.
    pub fn banner(&self, text: &str) -> String {
        let style = match self.theme {
            Theme::Dark => Colour::Black.on(Colour::Cyan).bold(),
            Theme::Light => Colour::White.on(Colour::Blue).bold(),
        };
        self.paint(style, &format!(" {text} "))
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            style.paint(text).to_string()
        } else {
            text.to_owned()
        }
    }
}

/// Fixed width bar. Values above 100% fill the bar.
pub fn progress_bar(percentage: Percentage, width: usize) -> String {
    let filled = ((*percentage.capped() / 100.) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    )
}

/// Overwrites the current terminal line with `line`.
pub fn redraw_line(out: &mut impl Write, line: &str) -> std::io::Result<()> {
    write!(out, "\r\x1b[2K{line}")?;
    out.flush()
}

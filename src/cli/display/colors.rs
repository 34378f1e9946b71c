//! Color theme for CLI output

use super::icons::StatusIcon;
use colored::{Color, Colorize};

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

impl ColorTheme {
    pub fn success_line(&self, message: &str) -> String {
        format!(" {}  {}", StatusIcon::SUCCESS.color(self.success), message.color(self.success))
    }

    pub fn warning_line(&self, message: &str) -> String {
        format!(" {}  {}", StatusIcon::WARNING.color(self.warning), message.color(self.warning))
    }

    pub fn error_line(&self, message: &str) -> String {
        format!(" {}  {}", StatusIcon::ERROR.color(self.error), message.color(self.error))
    }

    pub fn info_line(&self, message: &str) -> String {
        format!(" {}  {}", StatusIcon::INFO.color(self.info), message)
    }

    pub fn hint_line(&self, hint: &str) -> String {
        hint.color(self.muted).to_string()
    }
}

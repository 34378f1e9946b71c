//! Status icons for CLI output

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    pub const SUCCESS: &'static str = "✓";

    pub const WARNING: &'static str = "!";

    pub const ERROR: &'static str = "x";

    /// Informational messages
    pub const INFO: &'static str = "i";
}

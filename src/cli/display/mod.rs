//! Display module for formatted CLI output

pub mod colors;
pub mod icons;

pub use colors::ColorTheme;
pub use icons::StatusIcon;

/// Prints a success line to stdout
pub fn success(message: &str) {
    println!("{}", ColorTheme::default().success_line(message));
}

pub fn information(message: &str) {
    println!("{}", ColorTheme::default().info_line(message));
}

pub fn warning(message: &str) {
    eprintln!("{}", ColorTheme::default().warning_line(message));
}

/// Prints an error and its hint to stderr
pub fn error(message: &str, hint: Option<&str>) {
    let theme = ColorTheme::default();
    eprintln!("{}", theme.error_line(message));
    if let Some(hint) = hint {
        eprintln!("    {}", theme.hint_line(hint));
    }
}

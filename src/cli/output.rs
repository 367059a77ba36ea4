//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// One affected node, indented
pub fn node_line(key: i64, name: &str, lft: i64, rgt: i64, depth: u32, active: bool) {
    let coords = format!("[{lft}, {rgt}] depth {depth}").dimmed();
    if active {
        println!("  {} {} {}", key.to_string().cyan(), name, coords);
    } else {
        println!("  {} {} {} {}", key.to_string().cyan(), name, coords, "(inactive)".yellow());
    }
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented key/value detail
pub fn field(label: &str, value: &(impl std::fmt::Display + ?Sized)) {
    println!("  {:<14} {}", format!("{label}:").green(), value);
}

/// Print plain output (no color, for markup and data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

//! UI utilities for command output.

use crossterm::style::Stylize;

/// Calculate display width of a string (accounting for wide chars like emoji).
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

/// Print a section header with box drawing characters.
pub fn print_header(title: &str) {
    let inner_width: usize = 58;
    let total_padding = inner_width.saturating_sub(display_width(title));
    let left_pad = total_padding / 2;
    let right_pad = total_padding - left_pad;

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(inner_width)).dark_cyan());
    println!(
        "{}",
        format!(
            "║{}{}{}║",
            " ".repeat(left_pad),
            title,
            " ".repeat(right_pad)
        )
        .dark_cyan()
    );
    println!("{}", format!("╚{}╝", "═".repeat(inner_width)).dark_cyan());
    println!();
}

/// Print a small section title.
pub fn print_section(title: &str) {
    println!();
    println!("  {} {}", "▸".dark_cyan(), title.white().bold());
    println!("  {}", "─".repeat(50).dark_grey());
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<14} {}", format!("{}:", key).dark_grey(), value);
}

/// Print a yes/no value in green or red.
pub fn print_kv_flag(key: &str, value: bool) {
    let styled = if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    };
    println!("  {:<14} {}", format!("{}:", key).dark_grey(), styled);
}

/// Print a table header.
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {}", header.white().bold());
    let separator: String = columns
        .iter()
        .map(|(_, width)| "─".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {}", separator.dark_grey());
}

/// Print a table row.
pub fn print_table_row(columns: &[(&str, usize)]) {
    let row: String = columns
        .iter()
        .map(|(val, width)| format!("{:<width$}", val, width = width))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  {}", row);
}

/// Print an empty state message.
pub fn print_empty(msg: &str) {
    println!();
    println!("  {}", msg.dark_grey().italic());
    println!();
}

/// Print a hint/tip message.
pub fn print_hint(msg: &str) {
    println!("  {} {}", "💡".yellow(), msg.dark_grey());
}

/// 可选字段显示为 "-"
pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

use colored::*;
use reachr_core::metrics::RunSummary;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;

/// Events on this target are written without a level symbol.
pub const PRINT_TARGET: &str = "reachr::print";

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, "{msg}");
}

pub fn banner(q_level: u8) {
    if q_level > 0 {
        return;
    }

    let text_content: String = format!("⟦ REACHR v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═"
        .repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2)
        .bright_black();

    print(&format!("{}{}{}", sep, text, sep));
}

pub fn header(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = UnicodeWidthStr::width(formatted.as_str());

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn fat_separator() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR);
    print(&format!("{}", sep));
}

pub fn aligned_line(key: &str, value: ColoredString, key_width: usize) {
    let dots: String = ".".repeat((key_width + 1).saturating_sub(key.len()));
    let colon: String = format!(
        "{}{}",
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value));
}

/// Prints key/value pairs with the colons lined up.
pub fn aligned_lines(pairs: &[(&str, ColoredString)]) {
    let key_width: usize = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in pairs {
        aligned_line(key, value.clone(), key_width);
    }
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    let message: String = format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT));
    print(&message);
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}{}", space, msg, space));
}

/// End-of-run report. The three summary lines are always printed, even with `-qq`.
pub fn summary(summary: &RunSummary, interrupted: bool, q_level: u8) {
    if q_level < 2 {
        fat_separator();
    }
    if interrupted && q_level == 0 {
        centerln(&format!("{}", "interrupted, partial results".color(colors::WARNING)));
    }

    for line in summary.to_string().lines() {
        print(line);
    }

    if q_level == 0 && summary.good == 0 && summary.probed > 0 {
        centerln(&format!("{}", "no address answered".color(colors::WARNING)));
    }
    if q_level < 2 {
        fat_separator();
    }
}

/// Colours a count the way the summary does.
pub fn count(n: u64) -> ColoredString {
    if n > 0 {
        n.to_string().color(colors::GOOD).bold()
    } else {
        n.to_string().color(colors::TEXT_DEFAULT)
    }
}

//! Terminal rendering: toasts and plain column tables.

use colored::Colorize;
use error_common::{Notifier, Toast, ToastLevel};

/// Prints toasts to stderr so stdout stays clean for data.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        eprintln!("{}", format_toast(&toast));
    }
}

pub fn format_toast(toast: &Toast) -> String {
    match toast.level {
        ToastLevel::Success => format!("{} {}", "✔".green(), toast.message.green()),
        ToastLevel::Info => format!("{} {}", "ℹ".cyan(), toast.message),
        ToastLevel::Warning => format!("{} {}", "!".yellow(), toast.message.yellow()),
        ToastLevel::Error => format!("{} {}", "✖".red(), toast.message.red()),
    }
}

/// Column-aligned table with a bold header row
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(i) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = line(self.headers.as_slice()).bold().to_string();
        for row in &self.rows {
            out.push('\n');
            out.push_str(&line(row.as_slice()));
        }
        out
    }

    pub fn print(&self, empty_message: &str) {
        if self.is_empty() {
            println!("{}", empty_message.dimmed());
        } else {
            println!("{}", self.render());
        }
    }
}

/// `Page 2 of 5 (43 total)`
pub fn page_footer(page: u32, total_pages: u32, total: u64) -> String {
    format!("Page {page} of {} ({total} total)", total_pages.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_aligns_columns() {
        colored::control::set_override(false);
        let mut table = Table::new(["Name", "Price"]);
        table.row(["CBC", "500"]).row(["Lipid Profile", "850"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["Name           Price", "CBC            500", "Lipid Profile  850"]);
    }

    #[test]
    fn test_toast_formatting() {
        colored::control::set_override(false);
        assert_eq!(format_toast(&Toast::error("Please select a doctor")), "✖ Please select a doctor");
        assert_eq!(format_toast(&Toast::success("Report generated")), "✔ Report generated");
    }

    #[test]
    fn test_page_footer() {
        assert_eq!(page_footer(1, 0, 0), "Page 1 of 1 (0 total)");
        assert_eq!(page_footer(2, 5, 43), "Page 2 of 5 (43 total)");
    }
}

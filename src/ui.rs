//! Terminal tables.
//!
//! ```rust
//! let mut table = kiln::ui::Table::new(&["Recipe", "Depends on"]);
//! table.add_row(vec!["all".to_string(), "clean".to_string()]);
//! table.print();
//! ```

use colored::*;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    /// Visible width of each column, ignoring ANSI color codes.
    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|h| console::measure_text_width(h))
            .collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(console::measure_text_width(&flatten(cell)));
            }
        }
        widths
    }

    /// Render with box-drawing borders, shrinking the widest columns (never
    /// below 8) until the table fits `max_width`.
    pub fn render(&self, max_width: usize) -> Vec<String> {
        if self.headers.is_empty() {
            return Vec::new();
        }

        let mut widths = self.column_widths();
        let overhead = 3 + 3 * widths.len();
        while overhead + widths.iter().sum::<usize>() > max_width {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= 8 {
                break;
            }
            widths[idx] -= 1;
        }

        let border = |left: &str, mid: &str, right: &str| -> String {
            let cells: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}", left, cells.join(mid), right)
        };
        let line = |cells: &[String], bold: bool| -> String {
            let mut out = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let text = console::truncate_str(&flatten(cell), width, "...").to_string();
                let pad = width.saturating_sub(console::measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                out.push_str(&format!(" {}{} │", text, " ".repeat(pad)));
            }
            out
        };

        let mut lines = vec![
            border("┌", "┬", "┐"),
            line(self.headers.as_slice(), true),
            border("├", "┼", "┤"),
        ];
        lines.extend(self.rows.iter().map(|row| line(row.as_slice(), false)));
        lines.push(border("└", "┴", "┘"));
        lines
    }

    pub fn print(&self) {
        let (_, cols) = console::Term::stdout().size();
        for line in self.render(cols as usize) {
            println!("{}", line);
        }
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

//! Terminal tables and summaries

use colored::*;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::api::models::PreviewSummary;
use crate::import::{ImportResults, ResultStatus};

const MAX_CELL_WIDTH: usize = 40;

/// Plain column-aligned table
#[derive(Debug, Default)]
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

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let w = cell.width().min(MAX_CELL_WIDTH);
                match widths.get_mut(i) {
                    Some(existing) => *existing = (*existing).max(w),
                    None => widths.push(w),
                }
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();

        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad(h, *w).bold().to_string())
            .collect();
        out.push_str(header.join("  ").trim_end());
        out.push('\n');

        let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        out.push_str(&rule.join("  ").dimmed().to_string());
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| pad(&truncate(row.get(i).map(String::as_str).unwrap_or(""), *w), *w))
                .collect();
            out.push_str(cells.join("  ").trim_end());
            out.push('\n');
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

/// Cut to `width` display columns, marking the cut with an ellipsis
fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

pub fn print_step(number: u8, label: &str) {
    println!();
    println!("{} {}", format!("[{}/4]", number).cyan().bold(), label.bold());
}

pub fn print_preview_summary(summary: &PreviewSummary) {
    println!(
        "  {} accounts in template: {} new, {} already present",
        summary.total_accounts.to_string().bold(),
        summary.new_accounts.to_string().green(),
        summary.skipped_accounts.to_string().yellow()
    );
}

pub fn print_results(results: &ImportResults) {
    let status = match results.status {
        ResultStatus::Completed => "completed".green().bold(),
        ResultStatus::Failed => "failed".red().bold(),
    };
    println!("Import {}", status);
    println!("  Total:   {}", results.total);
    println!("  Created: {}", results.created.to_string().green());
    println!("  Skipped: {}", results.skipped.to_string().yellow());
    println!("  Failed:  {}", results.failed.to_string().red());
    if let Some(message) = &results.error_message {
        println!("  {}", message.red());
    }
}

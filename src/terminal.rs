//! Terminal rendering of the pages.
//!
//! Status lines go to stderr so stdout only carries page content
//! (profile, caption, tables) and can be piped.

use crate::models::{Caption, EndpointStat, User};
use crate::pages::{Control, ImagePreview, Page, StatusKind, UserRow, View};
use rustyline::DefaultEditor;

pub struct TerminalView {
    assume_yes: bool,
    last_redirect: Option<Page>,
}

impl TerminalView {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            last_redirect: None,
        }
    }

    /// Page the controller last asked to navigate to.
    pub fn last_redirect(&self) -> Option<Page> {
        self.last_redirect
    }
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

fn render_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Render rows as a left-aligned table with a header line.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let dashes: Vec<&str> = dashes.iter().map(String::as_str).collect();

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(render_row(headers, &widths));
    out.push(render_row(&dashes, &widths));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(render_row(&cells, &widths));
    }
    out.join("\n")
}

impl View for TerminalView {
    fn show_status(&mut self, kind: StatusKind, message: &str) {
        match kind {
            StatusKind::Info => eprintln!("{}", message),
            StatusKind::Success => eprintln!("✓ {}", message),
            StatusKind::Error => eprintln!("✗ {}", message),
        }
    }

    fn set_control_enabled(&mut self, control: Control, enabled: bool) {
        tracing::trace!(?control, enabled, "control state");
    }

    fn redirect(&mut self, page: Page) {
        eprintln!("→ {}", page);
        self.last_redirect = Some(page);
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                tracing::warn!(error = %e, "no terminal for confirmation");
                return false;
            }
        };
        match editor.readline(&format!("{} [y/N] ", prompt)) {
            Ok(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn render_profile(&mut self, user: &User) {
        println!("Username:  {}", user.username);
        if let Some(email) = &user.email {
            println!("Email:     {}", email);
        }
        println!("Roles:     {}", user.role_names().join(", "));
        println!("API calls: {}", user.api_calls);
    }

    fn show_admin_link(&mut self, visible: bool) {
        if visible {
            println!("Admin:     memecap admin");
        }
    }

    fn render_preview(&mut self, preview: &ImagePreview) {
        eprintln!(
            "Image: {} ({}, {})",
            preview.file_name,
            preview.content_type,
            format_size(preview.size)
        );
    }

    fn render_caption(&mut self, caption: &Caption) {
        println!("{}", caption.caption);
        eprintln!("API calls used: {}", caption.api_calls);
    }

    fn render_users(&mut self, rows: &[UserRow]) {
        let table: Vec<Vec<String>> = rows
            .iter()
            .map(|r| {
                let actions = if r.can_promote {
                    "promote, delete"
                } else {
                    "delete"
                };
                vec![
                    r.id.to_string(),
                    r.username.clone(),
                    r.email.clone(),
                    r.roles.join(","),
                    r.api_calls.to_string(),
                    actions.to_string(),
                ]
            })
            .collect();
        println!("Users");
        println!(
            "{}",
            format_table(&["ID", "USERNAME", "EMAIL", "ROLES", "API CALLS", "ACTIONS"], &table)
        );
        println!();
    }

    fn render_stats(&mut self, stats: &[EndpointStat]) {
        let table: Vec<Vec<String>> = stats
            .iter()
            .map(|s| vec![s.method.clone(), s.endpoint.clone(), s.request_count.to_string()])
            .collect();
        println!("Endpoint stats");
        println!("{}", format_table(&["METHOD", "ENDPOINT", "REQUESTS"], &table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_table_aligns_columns() {
        let rows = vec![
            vec!["1".to_string(), "alice".to_string()],
            vec!["42".to_string(), "bo".to_string()],
        ];
        let table = format_table(&["ID", "NAME"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  NAME");
        assert_eq!(lines[1], "--  -----");
        assert_eq!(lines[2], "1   alice");
        assert_eq!(lines[3], "42  bo");
    }

    #[test]
    fn test_assume_yes_confirms() {
        let mut view = TerminalView::new(true);
        assert!(view.confirm("Delete bob?"));
    }

    #[test]
    fn test_redirect_is_remembered() {
        let mut view = TerminalView::new(false);
        view.redirect(Page::Login);
        assert_eq!(view.last_redirect(), Some(Page::Login));
    }
}

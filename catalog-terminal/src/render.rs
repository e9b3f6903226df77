//! Plain-text rendering of the catalog page.

use catalog_flow::{
    FormVariant, FormView, PageView, SortDirection,
    list_view::{CatalogRow, TableHeader},
};
use std::fmt::Write;

pub fn render_page(view: &PageView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.heading);
    if view.busy {
        let _ = writeln!(out, "Loading...");
    }

    if let Some(banner) = view.error_banner {
        let _ = writeln!(out, "{banner}");
    } else {
        if let Some(total) = &view.total {
            let _ = writeln!(out, "{total}");
        }
        out.push_str(&render_table(&view.header, &view.rows));
    }

    if let Some(form) = &view.form {
        out.push('\n');
        out.push_str(&render_form(form));
    }
    out
}

fn sort_marker(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "^",
        SortDirection::Descending => "v",
    }
}

pub fn render_table(header: &TableHeader, rows: &[CatalogRow]) -> String {
    let mut labels: Vec<String> = header.columns.iter().map(|c| c.to_string()).collect();
    labels[header.sort_column] = format!(
        "{} {}",
        labels[header.sort_column],
        sort_marker(header.direction)
    );

    let cells: Vec<[&str; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.id.as_str(),
                row.title.as_str(),
                row.score.as_str(),
                row.company.as_str(),
            ]
        })
        .collect();

    let id_width = cells.iter().map(|c| c[0].chars().count()).max().unwrap_or(0).max(2);
    let widths = [0usize, 1, 2].map(|column| {
        cells
            .iter()
            .map(|c| c[column + 1].chars().count())
            .chain(std::iter::once(labels[column].chars().count()))
            .max()
            .unwrap_or(0)
    });

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<id_width$}  {:<w0$}  {:>w1$}  {:<w2$}",
        "Id",
        labels[0],
        labels[1],
        labels[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    );
    for (row, cell) in rows.iter().zip(&cells) {
        let marker = if row.selected { ">" } else { " " };
        let line = format!(
            "{marker} {:<id_width$}  {:<w0$}  {:>w1$}  {:<w2$}",
            cell[0],
            cell[1],
            cell[2],
            cell[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

pub fn render_form(form: &FormView) -> String {
    let mut body = Vec::new();
    body.push(form.title.clone());
    body.push(format!("Score: {}", form.score));
    if let Some(error) = &form.score_error {
        body.push(format!("  ! {error}"));
    }
    body.push(format!("Comment: {}", form.comment));
    if let Some(error) = &form.comment_error {
        body.push(format!("  ! {error}"));
    }

    let mut submit = if form.submit_enabled {
        "[Submit]".to_string()
    } else {
        "[Submit (disabled)]".to_string()
    };
    if form.busy {
        submit.push_str(" submitting...");
    }
    body.push(submit);

    if let Some(failure) = form.failure_message {
        body.push(failure.to_string());
    }
    if let Some(message) = &form.response_message {
        body.push(message.clone());
    }

    match form.variant {
        FormVariant::Inline => body.into_iter().map(|l| l + "\n").collect(),
        FormVariant::Modal if !form.open => String::new(),
        FormVariant::Modal => boxed(&body),
    }
}

const CLOSE_CONTROL: &str = "[x]";

fn boxed(lines: &[String]) -> String {
    // The title shares its row with the close control and a separating space.
    let title = lines
        .first()
        .map(|l| l.chars().count() + 1 + CLOSE_CONTROL.len())
        .unwrap_or(0);
    let inner = lines
        .iter()
        .skip(1)
        .map(|l| l.chars().count())
        .chain([title, 12])
        .max()
        .unwrap_or(12);

    let mut out = String::new();
    let _ = writeln!(out, "+{}+", "-".repeat(inner + 2));
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            let width = inner - CLOSE_CONTROL.len();
            let _ = writeln!(out, "| {line:<width$}{CLOSE_CONTROL} |");
            let _ = writeln!(out, "|{}|", "-".repeat(inner + 2));
        } else {
            let _ = writeln!(out, "| {line:<inner$} |");
        }
    }
    let _ = writeln!(out, "+{}+", "-".repeat(inner + 2));
    out
}

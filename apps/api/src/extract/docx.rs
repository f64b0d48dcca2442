use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

use super::ExtractError;

/// Body text of a Word document, one line per paragraph. Table cells are read
/// row by row so skills grids and two-column layouts are not lost.
pub(super) fn extract_text(content: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(content)
        .map_err(|e| ExtractError::Unreadable(format!("Word document parsing failed: {e}")))?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(t) => collect_table(t, &mut lines),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn collect_table(table: &Table, lines: &mut Vec<String>) {
    for TableChild::TableRow(row) in &table.rows {
        let mut cells = Vec::new();
        for TableRowChild::TableCell(cell) in &row.cells {
            for content in &cell.children {
                if let TableCellContent::Paragraph(p) = content {
                    let text = paragraph_text(p);
                    if !text.trim().is_empty() {
                        cells.push(text);
                    }
                }
            }
        }
        if !cells.is_empty() {
            lines.push(cells.join(" | "));
        }
    }
}

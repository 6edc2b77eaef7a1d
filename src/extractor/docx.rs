//! DOCX 로더
//!
//! docx-rs로 본문 문단과 표 셀 텍스트를 줄 단위로 추출합니다.

use std::path::PathBuf;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

use crate::error::{IngestError, Result};
use crate::knowledge::Document;

use super::DocumentLoader;

/// Word 문서 로더: 파일 하나 → 문서 하나
pub struct DocxLoader {
    path: PathBuf,
}

impl DocxLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLoader for DocxLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let bytes = std::fs::read(&self.path).map_err(|e| IngestError::io(&self.path, e))?;
        let docx = docx_rs::read_docx(&bytes)
            .map_err(|e| IngestError::file_parse(&self.path, e.to_string()))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
                DocumentChild::Table(t) => lines.extend(table_lines(t)),
                _ => {}
            }
        }

        let content = lines.join("\n");
        Ok(vec![Document::new(
            content,
            self.path.to_string_lossy().into_owned(),
        )])
    }
}

/// 문단 내 run 텍스트 연결
fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

/// 표의 각 행을 셀 구분자 ` | `로 한 줄로
#[allow(irrefutable_let_patterns)]
fn table_lines(table: &Table) -> Vec<String> {
    let mut lines = Vec::new();
    for child in &table.rows {
        let TableChild::TableRow(row) = child else {
            continue;
        };
        let mut cells = Vec::new();
        for cell_child in &row.cells {
            if let TableRowChild::TableCell(cell) = cell_child {
                let text = cell
                    .children
                    .iter()
                    .filter_map(|content| match content {
                        TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                cells.push(text);
            }
        }
        lines.push(cells.join(" | "));
    }
    lines
}

// ============================================================================
// Tests
// ============================================================================

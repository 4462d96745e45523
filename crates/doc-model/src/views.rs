//! Read-only projections of a [`Document`] for text panels.

use crate::model::{Document, Page};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn of(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Self::High
        } else if confidence >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One-decimal percentage, e.g. `0.97` as `"97.0%"`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub index: u32,
    pub lines: usize,
    pub paragraphs: usize,
    pub tables: usize,
    pub form_fields: usize,
    pub entities: usize,
    pub checkboxes: usize,
}

impl PageSummary {
    pub fn of(page: &Page) -> Self {
        Self {
            index: page.index,
            lines: page.lines.len(),
            paragraphs: page.paragraphs.len(),
            tables: page.tables.len(),
            form_fields: page.form_fields.len(),
            entities: page.entities.len(),
            checkboxes: page.checkboxes.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRow {
    pub name: String,
    pub content: String,
    pub normalized_value: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSection {
    pub name: String,
    pub fields: Vec<FieldRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub page: u32,
    pub table: u32,
    pub header: Vec<Vec<String>>,
    pub body: Vec<Vec<String>>,
}

impl Document {
    pub fn page_summaries(&self) -> Vec<PageSummary> {
        self.pages.iter().map(PageSummary::of).collect()
    }

    /// Entities and key/value pairs flattened into named rows.
    ///
    /// Sections are present only when non-empty. Rows come from every
    /// decoded entity and form field, placed on the page or not; a field
    /// without key text is listed as `(unnamed)`.
    pub fn formatted_fields(&self) -> Vec<FieldSection> {
        let mut sections = Vec::new();
        if !self.entity_rows.is_empty() {
            sections.push(FieldSection {
                name: "Entities".to_owned(),
                fields: self.entity_rows.clone(),
            });
        }
        if !self.form_field_rows.is_empty() {
            sections.push(FieldSection {
                name: "Form Fields".to_owned(),
                fields: self.form_field_rows.clone(),
            });
        }
        sections
    }

    /// Text grids of every decoded table, one entry per source cell.
    pub fn tables(&self) -> &[TableView] {
        &self.table_views
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_confidence_with_one_decimal() {
        assert_eq!(format_confidence(0.97), "97.0%");
        assert_eq!(format_confidence(1.0), "100.0%");
        assert_eq!(format_confidence(0.0), "0.0%");
        assert_eq!(format_confidence(0.8456), "84.6%");
    }

    #[test]
    fn confidence_levels_use_ninety_and_seventy_thresholds() {
        assert_eq!(ConfidenceLevel::of(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::of(0.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::of(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::of(0.69), ConfidenceLevel::Low);
    }
}

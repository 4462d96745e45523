use crate::style::style;
use doc_model::{format_confidence, AnnotationItem, Category, ItemExtra, ItemId, Page};

/// Characters of item content shown in a tooltip before it is cut.
pub const TOOLTIP_CONTENT_CHARS: usize = 100;

const LABEL_MAX_CHARS: usize = 30;
const LABEL_KEEP_CHARS: usize = 27;

/// Cuts `text` to `keep` characters plus an ellipsis when it exceeds `max`.
fn shorten(text: &str, max: usize, keep: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }

    let mut short: String = text.chars().take(keep).collect();
    short.push_str("...");
    short
}

/// Hover text for an item: category, content, confidence, then details.
///
/// Form-field links are resolved on `page` only. A side that was never
/// placed falls back to its source text; a link that does not resolve drops
/// the `key → value` line.
pub fn tooltip(item: &AnnotationItem, page: &Page) -> String {
    let mut lines = vec![style(item.category).display_name.to_owned()];

    let content = item.content.trim();
    if !content.is_empty() {
        lines.push(shorten(content, TOOLTIP_CONTENT_CHARS, TOOLTIP_CONTENT_CHARS));
    }
    lines.push(format!("Confidence: {}", format_confidence(item.confidence)));

    match &item.extra {
        ItemExtra::None => {}
        ItemExtra::TableSummary { rows, columns, .. } => {
            lines.push(format!("Size: {rows} rows x {columns} cols"));
        }
        ItemExtra::TableCell { row, column, row_span, column_span, header, .. } => {
            let kind = if *header { "Header cell" } else { "Cell" };
            lines.push(format!("{kind}: row {}, column {}", row + 1, column + 1));
            if *row_span > 1 || *column_span > 1 {
                lines.push(format!("Span: {row_span} x {column_span}"));
            }
        }
        ItemExtra::FormField { role, key_id, value_id, key_text, value_text } => {
            lines.push(format!("Role: {}", role.as_str()));
            let key = field_side(page, *key_id, key_text.as_deref());
            let value = field_side(page, *value_id, value_text.as_deref());
            if let (Some(key), Some(value)) = (key, value) {
                lines.push(format!("{key} → {value}"));
            }
        }
        ItemExtra::Entity { entity_type, normalized_value } => {
            if !entity_type.is_empty() {
                lines.push(format!("Type: {entity_type}"));
            }
            if let Some(normalized) = normalized_value {
                lines.push(format!("Normalized: {normalized}"));
            }
        }
        ItemExtra::Checkbox { state, key } => {
            lines.push(format!("State: {}", state.as_str()));
            if let Some(key) = key {
                lines.push(format!("Key: {key}"));
            }
        }
    }

    lines.join("\n")
}

fn field_side<'a>(page: &'a Page, id: Option<ItemId>, text: Option<&'a str>) -> Option<&'a str> {
    match id {
        Some(id) => page.item(id).map(|item| item.content.as_str()),
        None => text,
    }
}

/// Short text drawn on an item's label plate.
pub fn label(item: &AnnotationItem) -> String {
    match (&item.category, &item.extra) {
        (Category::TextLine, _) => {
            shorten(item.content.trim(), LABEL_MAX_CHARS, LABEL_KEEP_CHARS)
        }
        (Category::Paragraph, _) => "Paragraph".to_owned(),
        (_, ItemExtra::TableSummary { rows, columns, .. }) => format!("Table {rows}x{columns}"),
        (_, ItemExtra::TableCell { row, column, .. }) => format!("R{}C{}", row + 1, column + 1),
        (_, ItemExtra::FormField { role, .. }) => match role {
            doc_model::FieldRole::Key => "KV Key".to_owned(),
            doc_model::FieldRole::Value => "KV Value".to_owned(),
        },
        (Category::FormField, _) => "Form Field".to_owned(),
        (_, ItemExtra::Entity { entity_type, .. }) if !entity_type.is_empty() => {
            entity_type.clone()
        }
        (Category::Entity, _) => "Entity".to_owned(),
        (_, ItemExtra::Checkbox { state, .. }) => format!("CB: {}", state.as_str()),
        (Category::Checkbox, _) => "CB: unknown".to_owned(),
        (Category::Table, _) => "Table".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{CheckboxState, FieldRole};
    use std::sync::Arc;

    fn item(seq: u32, category: Category, content: &str, extra: ItemExtra) -> AnnotationItem {
        AnnotationItem {
            id: ItemId { page: 0, seq },
            category,
            geometry: Vec::new(),
            content: content.to_owned(),
            confidence: 0.97,
            extra,
        }
    }

    fn field(seq: u32, role: FieldRole, content: &str, key: u32, value: u32) -> AnnotationItem {
        let extra = ItemExtra::FormField {
            role,
            key_id: Some(ItemId { page: 0, seq: key }),
            value_id: Some(ItemId { page: 0, seq: value }),
            key_text: None,
            value_text: None,
        };
        item(seq, Category::FormField, content, extra)
    }

    #[test]
    fn text_line_tooltip_has_content_and_confidence() {
        let line = item(0, Category::TextLine, "INVOICE", ItemExtra::None);

        assert_eq!(tooltip(&line, &Page::default()), "Text Lines\nINVOICE\nConfidence: 97.0%");
    }

    #[test]
    fn long_content_is_truncated_in_tooltip() {
        let line = item(0, Category::TextLine, &"x".repeat(150), ItemExtra::None);
        let text = tooltip(&line, &Page::default());
        let content = text.lines().nth(1).expect("content line");

        assert_eq!(content.chars().count(), TOOLTIP_CONTENT_CHARS + 3);
        assert!(content.ends_with("..."));
    }

    #[test]
    fn form_field_tooltip_links_key_to_value() {
        let key = Arc::new(field(0, FieldRole::Key, "Name:", 0, 1));
        let value = Arc::new(field(1, FieldRole::Value, "Ada", 0, 1));
        let page = Page { form_fields: vec![key.clone(), value], ..Page::default() };

        let text = tooltip(&key, &page);
        assert!(text.contains("Role: key"));
        assert!(text.ends_with("Name: → Ada"), "{text}");
    }

    #[test]
    fn unresolvable_form_field_link_omits_arrow() {
        let key = Arc::new(field(0, FieldRole::Key, "Name:", 0, 7));
        let page = Page { form_fields: vec![key.clone()], ..Page::default() };

        assert!(!tooltip(&key, &page).contains('→'));
    }

    #[test]
    fn cross_page_link_is_treated_as_unresolvable() {
        let key = Arc::new(AnnotationItem {
            extra: ItemExtra::FormField {
                role: FieldRole::Key,
                key_id: Some(ItemId { page: 0, seq: 0 }),
                value_id: Some(ItemId { page: 1, seq: 0 }),
                key_text: Some("Name:".to_owned()),
                value_text: Some("Ada".to_owned()),
            },
            ..field(0, FieldRole::Key, "Name:", 0, 0)
        });
        let page = Page { form_fields: vec![key.clone()], ..Page::default() };

        assert!(!tooltip(&key, &page).contains('→'));
    }

    #[test]
    fn unplaced_key_falls_back_to_its_text() {
        let extra = ItemExtra::FormField {
            role: FieldRole::Value,
            key_id: None,
            value_id: Some(ItemId { page: 0, seq: 0 }),
            key_text: Some("Name:".to_owned()),
            value_text: Some("Ada".to_owned()),
        };
        let value = Arc::new(item(0, Category::FormField, "Ada", extra));
        let page = Page { form_fields: vec![value.clone()], ..Page::default() };

        assert!(tooltip(&value, &page).ends_with("Name: → Ada"));
    }

    #[test]
    fn labels_follow_category_conventions() {
        let long = item(0, Category::TextLine, &"a".repeat(31), ItemExtra::None);
        let table = item(
            1,
            Category::Table,
            "",
            ItemExtra::TableSummary { table: 0, rows: 3, columns: 4 },
        );
        let checkbox = item(
            2,
            Category::Checkbox,
            "",
            ItemExtra::Checkbox { state: CheckboxState::Checked, key: None },
        );
        let entity = item(
            3,
            Category::Entity,
            "",
            ItemExtra::Entity { entity_type: String::new(), normalized_value: None },
        );

        assert_eq!(label(&long), format!("{}...", "a".repeat(27)));
        assert_eq!(label(&table), "Table 3x4");
        assert_eq!(label(&checkbox), "CB: checked");
        assert_eq!(label(&entity), "Entity");
        assert_eq!(label(&field(4, FieldRole::Value, "", 0, 4)), "KV Value");
    }
}

use crate::views::{FieldRow, TableView};
use geometry::NormalizedPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    TextLine,
    Paragraph,
    Table,
    FormField,
    Entity,
    Checkbox,
}

impl Category {
    /// Back-to-front stacking order. Later categories win hit-tests on overlap.
    pub const DRAW_ORDER: [Category; 6] = [
        Category::TextLine,
        Category::Paragraph,
        Category::Table,
        Category::FormField,
        Category::Entity,
        Category::Checkbox,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextLine => "text-line",
            Self::Paragraph => "paragraph",
            Self::Table => "table",
            Self::FormField => "form-field",
            Self::Entity => "entity",
            Self::Checkbox => "checkbox",
        }
    }

    pub fn draw_rank(self) -> usize {
        match self {
            Self::TextLine => 0,
            Self::Paragraph => 1,
            Self::Table => 2,
            Self::FormField => 3,
            Self::Entity => 4,
            Self::Checkbox => 5,
        }
    }

    fn bit(self) -> u8 {
        1 << self.draw_rank()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "text-line" | "text-lines" | "text" | "line" | "lines" => Ok(Self::TextLine),
            "paragraph" | "paragraphs" => Ok(Self::Paragraph),
            "table" | "tables" => Ok(Self::Table),
            "form-field" | "form-fields" | "formfields" | "kv" => Ok(Self::FormField),
            "entity" | "entities" => Ok(Self::Entity),
            "checkbox" | "checkboxes" => Ok(Self::Checkbox),
            _ => Err(UnknownCategory(value.to_owned())),
        }
    }
}

/// Set of categories, iterated in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CategorySet(u8);

impl CategorySet {
    pub fn all() -> Self {
        Category::DRAW_ORDER.into_iter().collect()
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn insert(&mut self, category: Category) {
        self.0 |= category.bit();
    }

    pub fn remove(&mut self, category: Category) {
        self.0 &= !category.bit();
    }

    pub fn without(mut self, category: Category) -> Self {
        self.remove(category);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::DRAW_ORDER.into_iter().filter(|category| self.contains(*category))
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<T: IntoIterator<Item = Category>>(iter: T) -> Self {
        let mut set = Self::empty();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

/// Identity of an item, unique within a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub page: u32,
    pub seq: u32,
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}:{}", self.page, self.seq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckboxState {
    Checked,
    Unchecked,
    Unknown,
}

impl CheckboxState {
    /// Maps service labels such as `filled_checkbox` onto the tri-state.
    pub fn from_source(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();

        if label.starts_with("unfilled") || label == "unchecked" {
            Self::Unchecked
        } else if label.starts_with("filled") || label == "checked" {
            Self::Checked
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checked => "checked",
            Self::Unchecked => "unchecked",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Key,
    Value,
}

impl FieldRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Value => "value",
        }
    }
}

/// Category-specific metadata carried by an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ItemExtra {
    None,
    TableSummary {
        table: u32,
        rows: u32,
        columns: u32,
    },
    TableCell {
        table: u32,
        row: u32,
        column: u32,
        row_span: u32,
        column_span: u32,
        header: bool,
    },
    /// Either link may be `None` when that side could not be placed; the
    /// text of both sides is kept regardless.
    FormField {
        role: FieldRole,
        key_id: Option<ItemId>,
        value_id: Option<ItemId>,
        key_text: Option<String>,
        value_text: Option<String>,
    },
    Entity {
        entity_type: String,
        normalized_value: Option<String>,
    },
    Checkbox {
        state: CheckboxState,
        key: Option<String>,
    },
}

/// One detected page element with normalized geometry.
///
/// `geometry` always holds at least three distinct vertices in `[0, 1]`,
/// ordered clockwise from the top-left-most vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationItem {
    pub id: ItemId,
    pub category: Category,
    pub geometry: Vec<NormalizedPoint>,
    pub content: String,
    pub confidence: f64,
    pub extra: ItemExtra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDimension {
    pub width: f64,
    pub height: f64,
    pub unit: Option<String>,
}

impl PageDimension {
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Page {
    pub index: u32,
    pub dimension: Option<PageDimension>,
    pub lines: Vec<Arc<AnnotationItem>>,
    pub paragraphs: Vec<Arc<AnnotationItem>>,
    pub tables: Vec<Arc<AnnotationItem>>,
    pub form_fields: Vec<Arc<AnnotationItem>>,
    pub entities: Vec<Arc<AnnotationItem>>,
    pub checkboxes: Vec<Arc<AnnotationItem>>,
}

impl Page {
    pub fn items(&self, category: Category) -> &[Arc<AnnotationItem>] {
        match category {
            Category::TextLine => &self.lines,
            Category::Paragraph => &self.paragraphs,
            Category::Table => &self.tables,
            Category::FormField => &self.form_fields,
            Category::Entity => &self.entities,
            Category::Checkbox => &self.checkboxes,
        }
    }

    pub(crate) fn items_mut(&mut self, category: Category) -> &mut Vec<Arc<AnnotationItem>> {
        match category {
            Category::TextLine => &mut self.lines,
            Category::Paragraph => &mut self.paragraphs,
            Category::Table => &mut self.tables,
            Category::FormField => &mut self.form_fields,
            Category::Entity => &mut self.entities,
            Category::Checkbox => &mut self.checkboxes,
        }
    }

    /// Every item on the page, in draw order.
    pub fn iter_items(&self) -> impl Iterator<Item = &Arc<AnnotationItem>> + '_ {
        Category::DRAW_ORDER.into_iter().flat_map(move |category| self.items(category).iter())
    }

    pub fn item_count(&self) -> usize {
        Category::DRAW_ORDER.into_iter().map(|category| self.items(category).len()).sum()
    }

    /// Resolves an id on this page. Ids that name another page never resolve.
    pub fn item(&self, id: ItemId) -> Option<&Arc<AnnotationItem>> {
        if id.page != self.index {
            return None;
        }

        self.iter_items().find(|item| item.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub page: Option<u32>,
    pub category: Option<Category>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.page, self.category) {
            (Some(page), Some(category)) => write!(f, "page {page} {category}: {}", self.message),
            (Some(page), None) => write!(f, "page {page}: {}", self.message),
            (None, Some(category)) => write!(f, "{category}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Non-fatal problems collected while parsing or rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(
        &mut self,
        page: Option<u32>,
        category: Option<Category>,
        message: impl Into<String>,
    ) {
        let warning = Warning { page, category, message: message.into() };
        tracing::warn!(target: "docai", "{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Parsed analysis result. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) pages: Vec<Page>,
    pub(crate) text: String,
    pub(crate) raw: serde_json::Value,
    pub(crate) diagnostics: Diagnostics,
    // Text views are built from the raw rows, so items skipped for lack of
    // geometry still appear in them.
    pub(crate) entity_rows: Vec<FieldRow>,
    pub(crate) form_field_rows: Vec<FieldRow>,
    pub(crate) table_views: Vec<TableView>,
}

impl Document {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Full recognized text of the document.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The response exactly as received, for a raw view.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(Page::item_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip_through_from_str() {
        for category in Category::DRAW_ORDER {
            assert_eq!(category.as_str().parse::<Category>().expect("known"), category);
        }

        assert_eq!("form_fields".parse::<Category>().expect("alias"), Category::FormField);
        assert_eq!("Text".parse::<Category>().expect("alias"), Category::TextLine);
        assert!("barcode".parse::<Category>().is_err());
    }

    #[test]
    fn category_set_iterates_in_draw_order() {
        let set: CategorySet = [Category::Checkbox, Category::TextLine, Category::Table]
            .into_iter()
            .collect();

        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Category::TextLine, Category::Table, Category::Checkbox]
        );
        assert!(!set.without(Category::Table).contains(Category::Table));
        assert_eq!(CategorySet::all().iter().count(), 6);
        assert!(CategorySet::empty().is_empty());
    }

    #[test]
    fn checkbox_state_maps_service_labels() {
        assert_eq!(CheckboxState::from_source("filled_checkbox"), CheckboxState::Checked);
        assert_eq!(CheckboxState::from_source("unfilled_checkbox"), CheckboxState::Unchecked);
        assert_eq!(CheckboxState::from_source("Checked"), CheckboxState::Checked);
        assert_eq!(CheckboxState::from_source("maybe"), CheckboxState::Unknown);
    }

    #[test]
    fn page_item_lookup_rejects_foreign_page_ids() {
        let item = Arc::new(AnnotationItem {
            id: ItemId { page: 0, seq: 3 },
            category: Category::FormField,
            geometry: Vec::new(),
            content: "Name".to_owned(),
            confidence: 1.0,
            extra: ItemExtra::None,
        });
        let page = Page { index: 0, form_fields: vec![item], ..Page::default() };

        assert!(page.item(ItemId { page: 0, seq: 3 }).is_some());
        assert!(page.item(ItemId { page: 1, seq: 3 }).is_none());
        assert!(page.item(ItemId { page: 0, seq: 4 }).is_none());
    }

    #[test]
    fn warning_display_includes_location() {
        let warning = Warning {
            page: Some(2),
            category: Some(Category::Entity),
            message: "degenerate polygon".to_owned(),
        };

        assert_eq!(warning.to_string(), "page 2 entity: degenerate polygon");
    }
}

use crate::error::ParseError;
use crate::model::{
    AnnotationItem, Category, CheckboxState, Diagnostics, Document, FieldRole, ItemExtra, ItemId,
    Page, PageDimension,
};
use crate::raw::{
    RawBlock, RawBoundingPoly, RawDimension, RawEntity, RawFormField, RawLayout, RawTable,
    RawTableRow, RawTextAnchor, RawTextSegment,
};
use crate::views::{FieldRow, TableView};
use geometry::{normalize_polygon, rect_polygon, union_bounds, NormalizedPoint};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse(serde_json::from_str(input)?)
}

pub fn parse_slice(input: &[u8]) -> Result<Document, ParseError> {
    parse(serde_json::from_slice(input)?)
}

/// Builds a [`Document`] from a raw analysis response.
///
/// Fails only when the page list is missing, empty, or not made of objects.
/// Items that cannot be decoded or placed are skipped and recorded in
/// [`Document::diagnostics`].
pub fn parse(raw: Value) -> Result<Document, ParseError> {
    let body = document_body(&raw)?;

    let raw_pages = match body.get("pages") {
        None | Some(Value::Null) => return Err(ParseError::malformed("missing page list")),
        Some(Value::Array(pages)) if pages.is_empty() => {
            return Err(ParseError::malformed("page list is empty"))
        }
        Some(Value::Array(pages)) => pages,
        Some(_) => return Err(ParseError::malformed("page list is not an array")),
    };

    let text = body.get("text").and_then(Value::as_str).unwrap_or_default().to_owned();
    let mut parser = Parser {
        text: text.chars().collect(),
        diagnostics: Diagnostics::new(),
        entity_rows: Vec::new(),
        form_field_rows: Vec::new(),
        table_views: Vec::new(),
    };

    let mut pages = Vec::with_capacity(raw_pages.len());
    for (index, raw_page) in raw_pages.iter().enumerate() {
        let index = u32::try_from(index).map_err(|_| ParseError::malformed("too many pages"))?;
        let Value::Object(object) = raw_page else {
            return Err(ParseError::malformed_page(index, "page is not an object"));
        };
        pages.push(parser.page(index, object));
    }

    for value in parser.collection(body, "entities", None, Category::Entity) {
        parser.document_entity(&mut pages, value);
    }

    let pages: Vec<Page> = pages.into_iter().map(|builder| builder.page).collect();
    let Parser { diagnostics, entity_rows, form_field_rows, table_views, .. } = parser;

    tracing::debug!(
        pages = pages.len(),
        items = pages.iter().map(Page::item_count).sum::<usize>(),
        warnings = diagnostics.len(),
        "parsed analysis result"
    );

    Ok(Document { pages, text, raw, diagnostics, entity_rows, form_field_rows, table_views })
}

/// Accepts either the document itself or a response wrapping it.
fn document_body(raw: &Value) -> Result<&Map<String, Value>, ParseError> {
    let Value::Object(root) = raw else {
        return Err(ParseError::malformed("expected a JSON object at the top level"));
    };

    if !root.contains_key("pages") {
        if let Some(Value::Object(document)) = root.get("document") {
            return Ok(document);
        }
    }

    Ok(root)
}

struct Parser {
    text: Vec<char>,
    diagnostics: Diagnostics,
    entity_rows: Vec<FieldRow>,
    form_field_rows: Vec<FieldRow>,
    table_views: Vec<TableView>,
}

impl Parser {
    fn page(&mut self, index: u32, object: &Map<String, Value>) -> PageBuilder {
        let dimension = self.dimension(index, object.get("dimension"));
        let mut page = PageBuilder::new(index, dimension);

        // Lines first: anchored items elsewhere on the page fall back to their bounds.
        for value in self.collection(object, "lines", Some(index), Category::TextLine) {
            self.line(&mut page, value);
        }
        for value in self.collection(object, "paragraphs", Some(index), Category::Paragraph) {
            self.paragraph(&mut page, value);
        }
        let mut table_index = 0;
        for value in self.collection(object, "tables", Some(index), Category::Table) {
            if self.table(&mut page, value, table_index) {
                table_index += 1;
            }
        }
        for value in self.collection(object, "formFields", Some(index), Category::FormField) {
            self.form_field(&mut page, value);
        }
        for value in self.collection(object, "visualElements", Some(index), Category::Checkbox) {
            self.visual_element(&mut page, value);
        }
        for value in self.collection(object, "entities", Some(index), Category::Entity) {
            let entity = self.decode::<RawEntity>(value, Some(index), Some(Category::Entity));
            if let Some(entity) = entity {
                let row = self.entity_row(&entity);
                self.entity(&mut page, entity, row);
            }
        }

        page
    }

    fn collection<'v>(
        &mut self,
        object: &'v Map<String, Value>,
        key: &str,
        page: Option<u32>,
        category: Category,
    ) -> &'v [Value] {
        match object.get(key) {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.diagnostics.warn(page, Some(category), format!("'{key}' is not an array"));
                &[]
            }
        }
    }

    fn decode<T: DeserializeOwned>(
        &mut self,
        value: &Value,
        page: Option<u32>,
        category: Option<Category>,
    ) -> Option<T> {
        match T::deserialize(value) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                self.diagnostics.warn(page, category, format!("skipped undecodable item: {error}"));
                None
            }
        }
    }

    fn dimension(&mut self, page: u32, value: Option<&Value>) -> Option<PageDimension> {
        let value = value.filter(|value| !value.is_null())?;
        let raw: RawDimension = self.decode(value, Some(page), None)?;
        let dimension = PageDimension { width: raw.width, height: raw.height, unit: raw.unit };

        dimension.is_usable().then_some(dimension)
    }

    fn place(
        &mut self,
        page: &PageBuilder,
        category: Category,
        poly: Option<&RawBoundingPoly>,
        anchor: Option<&RawTextAnchor>,
    ) -> Option<Vec<NormalizedPoint>> {
        match page.geometry(poly, anchor) {
            Ok(geometry) => Some(geometry),
            Err(reason) => {
                self.diagnostics.warn(Some(page.index()), Some(category), reason);
                None
            }
        }
    }

    fn layout(
        &mut self,
        layout: Option<RawLayout>,
        page: &PageBuilder,
        category: Category,
    ) -> Option<RawLayout> {
        if layout.is_none() {
            self.diagnostics.warn(Some(page.index()), Some(category), "item has no layout");
        }
        layout
    }

    fn line(&mut self, page: &mut PageBuilder, value: &Value) {
        let category = Category::TextLine;
        let Some(block) = self.decode::<RawBlock>(value, Some(page.index()), Some(category)) else {
            return;
        };
        let Some(layout) = self.layout(block.layout, page, category) else {
            return;
        };
        let Some(geometry) = self.place(page, category, layout.bounding_poly.as_ref(), None) else {
            return;
        };

        if let Some(anchor) = &layout.text_anchor {
            if !anchor.text_segments.is_empty() {
                page.anchored_lines.push(AnchoredLine {
                    segments: anchor.text_segments.clone(),
                    geometry: geometry.clone(),
                });
            }
        }

        let content = self.anchor_text(layout.text_anchor.as_ref());
        page.push(category, geometry, content, confidence(layout.confidence), ItemExtra::None);
    }

    fn paragraph(&mut self, page: &mut PageBuilder, value: &Value) {
        let category = Category::Paragraph;
        let Some(block) = self.decode::<RawBlock>(value, Some(page.index()), Some(category)) else {
            return;
        };
        let Some(layout) = self.layout(block.layout, page, category) else {
            return;
        };
        let anchor = layout.text_anchor.as_ref();
        let polygon = layout.bounding_poly.as_ref();
        let Some(geometry) = self.place(page, category, polygon, anchor) else {
            return;
        };

        let content = self.anchor_text(anchor);
        page.push(category, geometry, content, confidence(layout.confidence), ItemExtra::None);
    }

    /// Returns whether the value decoded as a table, so table numbering skips
    /// undecodable entries.
    fn table(&mut self, page: &mut PageBuilder, value: &Value, table: u32) -> bool {
        let category = Category::Table;
        let Some(raw) = self.decode::<RawTable>(value, Some(page.index()), Some(category)) else {
            return false;
        };

        let rows = raw.header_rows.iter().chain(&raw.body_rows);
        let columns = rows
            .clone()
            .map(|row| row.cells.iter().map(|cell| span(cell.col_span)).sum::<u32>())
            .max()
            .unwrap_or(0);
        let row_count = u32::try_from(rows.clone().count()).unwrap_or(u32::MAX);

        if let Some(layout) = self.layout(raw.layout.clone(), page, category) {
            let anchor = layout.text_anchor.as_ref();
            let polygon = layout.bounding_poly.as_ref();
            if let Some(geometry) = self.place(page, category, polygon, anchor) {
                page.push(
                    category,
                    geometry,
                    format!("Table ({row_count} rows x {columns} cols)"),
                    confidence(layout.confidence),
                    ItemExtra::TableSummary { table, rows: row_count, columns },
                );
            }
        }

        let header_count = raw.header_rows.len();
        let header = self.text_grid(&raw.header_rows);
        let body = self.text_grid(&raw.body_rows);
        self.table_views.push(TableView { page: page.index(), table, header, body });

        for (row, cells) in rows.enumerate() {
            let row = u32::try_from(row).unwrap_or(u32::MAX);
            let header = (row as usize) < header_count;
            let mut column = 0u32;

            for cell in &cells.cells {
                let row_span = span(cell.row_span);
                let column_span = span(cell.col_span);

                if let Some(layout) = self.layout(cell.layout.clone(), page, category) {
                    let anchor = layout.text_anchor.as_ref();
                    let poly = layout.bounding_poly.as_ref();
                    if let Some(geometry) = self.place(page, category, poly, anchor) {
                        let content = self.anchor_text(anchor);
                        page.push(
                            category,
                            geometry,
                            content,
                            confidence(layout.confidence),
                            ItemExtra::TableCell {
                                table,
                                row,
                                column,
                                row_span,
                                column_span,
                                header,
                            },
                        );
                    }
                }

                column = column.saturating_add(column_span);
            }
        }

        true
    }

    /// Cell text by row, taken from the layouts whether or not the cells
    /// can be placed.
    fn text_grid(&self, rows: &[RawTableRow]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|cell| {
                        self.anchor_text(cell.layout.as_ref().and_then(|l| l.text_anchor.as_ref()))
                    })
                    .collect()
            })
            .collect()
    }

    fn form_field(&mut self, page: &mut PageBuilder, value: &Value) {
        let category = Category::FormField;
        let Some(field) = self.decode::<RawFormField>(value, Some(page.index()), Some(category))
        else {
            return;
        };

        if field.field_name.is_none() && field.field_value.is_none() {
            self.diagnostics.warn(
                Some(page.index()),
                Some(category),
                "form field has neither key nor value",
            );
            return;
        }

        let key_text =
            field.field_name.as_ref().map(|layout| self.anchor_text(layout.text_anchor.as_ref()));
        let value_text = field
            .field_value
            .as_ref()
            .map(|value| self.anchor_text(value.layout.text_anchor.as_ref()));

        let row_confidence = field
            .field_name
            .as_ref()
            .or(field.field_value.as_ref().map(|value| &value.layout))
            .and_then(|layout| layout.confidence);
        self.form_field_rows.push(FieldRow {
            name: key_text
                .clone()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "(unnamed)".to_owned()),
            content: value_text.clone().unwrap_or_default(),
            normalized_value: None,
            confidence: confidence(row_confidence),
        });

        let key = field.field_name.as_ref().and_then(|layout| {
            let anchor = layout.text_anchor.as_ref();
            let geometry = self.place(page, category, layout.bounding_poly.as_ref(), anchor)?;
            Some((layout, geometry))
        });
        let value = field.field_value.as_ref().and_then(|value| {
            let layout = &value.layout;
            let anchor = layout.text_anchor.as_ref();
            let geometry = self.place(page, category, layout.bounding_poly.as_ref(), anchor)?;
            Some((layout, geometry))
        });

        let key_id = key.is_some().then(|| page.reserve_id());
        let value_id = value.is_some().then(|| page.reserve_id());
        let extra = |role| ItemExtra::FormField {
            role,
            key_id,
            value_id,
            key_text: key_text.clone(),
            value_text: value_text.clone(),
        };

        if let (Some((layout, geometry)), Some(id)) = (key, key_id) {
            page.insert(AnnotationItem {
                id,
                category,
                geometry,
                content: key_text.clone().unwrap_or_default(),
                confidence: confidence(layout.confidence),
                extra: extra(FieldRole::Key),
            });
        }

        let value_type = field
            .value_type
            .as_deref()
            .or_else(|| field.field_value.as_ref().and_then(|value| value.value_type.as_deref()));

        if let (Some((layout, geometry)), Some(id)) = (value, value_id) {
            let content = value_text.clone().unwrap_or_default();
            let value_confidence = confidence(layout.confidence);

            if let Some(value_type) =
                value_type.filter(|kind| kind.to_ascii_lowercase().contains("checkbox"))
            {
                page.push(
                    Category::Checkbox,
                    geometry.clone(),
                    content.clone(),
                    value_confidence,
                    ItemExtra::Checkbox {
                        state: CheckboxState::from_source(value_type),
                        key: key_text.clone().filter(|text| !text.is_empty()),
                    },
                );
            }

            page.insert(AnnotationItem {
                id,
                category,
                geometry,
                content,
                confidence: value_confidence,
                extra: extra(FieldRole::Value),
            });
        }
    }

    fn visual_element(&mut self, page: &mut PageBuilder, value: &Value) {
        let category = Category::Checkbox;
        let Some(block) = self.decode::<RawBlock>(value, Some(page.index()), Some(category)) else {
            return;
        };
        let Some(kind) = block.kind.filter(|kind| kind.to_ascii_lowercase().contains("checkbox"))
        else {
            return;
        };
        let Some(layout) = self.layout(block.layout, page, category) else {
            return;
        };
        let anchor = layout.text_anchor.as_ref();
        let polygon = layout.bounding_poly.as_ref();
        let Some(geometry) = self.place(page, category, polygon, anchor) else {
            return;
        };

        let content = self.anchor_text(anchor);
        page.push(
            category,
            geometry,
            content,
            confidence(layout.confidence),
            ItemExtra::Checkbox { state: CheckboxState::from_source(&kind), key: None },
        );
    }

    fn document_entity(&mut self, pages: &mut [PageBuilder], value: &Value) {
        let Some(entity) = self.decode::<RawEntity>(value, None, Some(Category::Entity)) else {
            return;
        };
        let row = self.entity_row(&entity);

        let target = entity
            .page_anchor
            .as_ref()
            .and_then(|anchor| anchor.page_refs.first())
            .map_or(0, |page_ref| page_ref.page);

        let Some(page) = usize::try_from(target).ok().and_then(|index| pages.get_mut(index)) else {
            self.diagnostics.warn(
                u32::try_from(target).ok(),
                Some(Category::Entity),
                format!("entity routed to missing page {target}"),
            );
            self.entity_rows.push(row);
            return;
        };

        self.entity(page, entity, row);
    }

    /// Text of an entity for the fields view, independent of its placement.
    fn entity_row(&self, entity: &RawEntity) -> FieldRow {
        let content = match entity.mention_text.as_deref().map(str::trim) {
            Some(mention) if !mention.is_empty() => mention.to_owned(),
            _ => self.anchor_text(entity.text_anchor.as_ref()),
        };
        let normalized_value = entity
            .normalized_value
            .as_ref()
            .and_then(|value| value.text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned);

        FieldRow {
            name: entity.kind.clone().unwrap_or_default(),
            content,
            normalized_value,
            confidence: confidence(entity.confidence),
        }
    }

    fn entity(&mut self, page: &mut PageBuilder, entity: RawEntity, row: FieldRow) {
        let category = Category::Entity;
        let poly = entity
            .page_anchor
            .as_ref()
            .and_then(|anchor| anchor.page_refs.first())
            .and_then(|page_ref| page_ref.bounding_poly.as_ref());
        let anchor = entity.text_anchor.as_ref();
        let placed = self.place(page, category, poly, anchor);
        self.entity_rows.push(row.clone());
        let Some(geometry) = placed else {
            return;
        };

        let FieldRow { name, content, normalized_value, confidence: row_confidence } = row;
        page.push(
            category,
            geometry,
            content,
            row_confidence,
            ItemExtra::Entity { entity_type: name, normalized_value },
        );
    }

    /// Concatenates the document text slices named by the anchor, falling
    /// back to the anchor's inline content.
    fn anchor_text(&self, anchor: Option<&RawTextAnchor>) -> String {
        let Some(anchor) = anchor else {
            return String::new();
        };

        let len = i64::try_from(self.text.len()).unwrap_or(i64::MAX);
        let mut content = String::new();
        for segment in &anchor.text_segments {
            let start = segment.start_index.clamp(0, len) as usize;
            let end = segment.end_index.clamp(0, len) as usize;
            if start < end {
                content.extend(&self.text[start..end]);
            }
        }

        let trimmed = content.trim();
        if trimmed.is_empty() {
            anchor.content.as_deref().map(str::trim).unwrap_or_default().to_owned()
        } else {
            trimmed.to_owned()
        }
    }
}

struct AnchoredLine {
    segments: Vec<RawTextSegment>,
    geometry: Vec<NormalizedPoint>,
}

impl AnchoredLine {
    fn overlaps(&self, segments: &[RawTextSegment]) -> bool {
        self.segments.iter().any(|own| {
            segments
                .iter()
                .any(|other| own.start_index < other.end_index && other.start_index < own.end_index)
        })
    }
}

struct PageBuilder {
    page: Page,
    next_seq: u32,
    anchored_lines: Vec<AnchoredLine>,
}

impl PageBuilder {
    fn new(index: u32, dimension: Option<PageDimension>) -> Self {
        Self {
            page: Page { index, dimension, ..Page::default() },
            next_seq: 0,
            anchored_lines: Vec::new(),
        }
    }

    fn index(&self) -> u32 {
        self.page.index
    }

    fn reserve_id(&mut self) -> ItemId {
        let id = ItemId { page: self.page.index, seq: self.next_seq };
        self.next_seq += 1;
        id
    }

    fn push(
        &mut self,
        category: Category,
        geometry: Vec<NormalizedPoint>,
        content: String,
        confidence: f64,
        extra: ItemExtra,
    ) -> ItemId {
        let id = self.reserve_id();
        self.insert(AnnotationItem { id, category, geometry, content, confidence, extra });
        id
    }

    fn insert(&mut self, item: AnnotationItem) {
        self.page.items_mut(item.category).push(Arc::new(item));
    }

    /// Resolves item geometry in priority order: normalized vertices, pixel
    /// vertices over the page dimension, then the bounds of anchored lines.
    fn geometry(
        &self,
        poly: Option<&RawBoundingPoly>,
        anchor: Option<&RawTextAnchor>,
    ) -> Result<Vec<NormalizedPoint>, String> {
        if let Some(poly) = poly {
            if !poly.normalized_vertices.is_empty() {
                let points: Vec<NormalizedPoint> = poly
                    .normalized_vertices
                    .iter()
                    .map(|vertex| NormalizedPoint::new(vertex.x, vertex.y))
                    .collect();
                return normalize_polygon(&points).map_err(|error| error.to_string());
            }

            if !poly.vertices.is_empty() {
                let Some(dimension) = &self.page.dimension else {
                    return Err("pixel vertices on a page without a usable dimension".to_owned());
                };
                let points: Vec<NormalizedPoint> = poly
                    .vertices
                    .iter()
                    .map(|v| NormalizedPoint::new(v.x / dimension.width, v.y / dimension.height))
                    .collect();
                return normalize_polygon(&points).map_err(|error| error.to_string());
            }
        }

        let Some(anchor) = anchor.filter(|anchor| !anchor.text_segments.is_empty()) else {
            return Err("item has no geometry".to_owned());
        };

        let matching = self
            .anchored_lines
            .iter()
            .filter(|line| line.overlaps(&anchor.text_segments))
            .map(|line| line.geometry.as_slice());
        let Some((min, max)) = union_bounds(matching) else {
            return Err("text anchor matches no line on the page".to_owned());
        };

        normalize_polygon(&rect_polygon(min, max)).map_err(|error| error.to_string())
    }
}

fn confidence(raw: Option<f64>) -> f64 {
    match raw {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => 1.0,
    }
}

fn span(raw: Option<i64>) -> u32 {
    raw.and_then(|value| u32::try_from(value).ok()).filter(|value| *value > 0).unwrap_or(1)
}

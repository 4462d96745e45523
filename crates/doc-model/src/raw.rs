//! Wire shapes of the analysis service response.
//!
//! Only the pieces the model reads are declared; unknown fields are ignored.
//! Each collection item is decoded on its own so one bad item can be skipped.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawLayout {
    pub text_anchor: Option<RawTextAnchor>,
    pub confidence: Option<f64>,
    pub bounding_poly: Option<RawBoundingPoly>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawTextAnchor {
    pub text_segments: Vec<RawTextSegment>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawTextSegment {
    #[serde(deserialize_with = "int64")]
    pub start_index: i64,
    #[serde(deserialize_with = "int64")]
    pub end_index: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawBoundingPoly {
    pub normalized_vertices: Vec<RawVertex>,
    pub vertices: Vec<RawVertex>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawVertex {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawDimension {
    pub width: f64,
    pub height: f64,
    pub unit: Option<String>,
}

/// Lines, paragraphs and visual elements all reduce to a layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawBlock {
    pub layout: Option<RawLayout>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawTable {
    pub layout: Option<RawLayout>,
    pub header_rows: Vec<RawTableRow>,
    pub body_rows: Vec<RawTableRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawTableRow {
    pub cells: Vec<RawTableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawTableCell {
    pub layout: Option<RawLayout>,
    #[serde(deserialize_with = "int64_opt")]
    pub row_span: Option<i64>,
    #[serde(deserialize_with = "int64_opt")]
    pub col_span: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawFormField {
    pub field_name: Option<RawLayout>,
    pub field_value: Option<RawFieldValue>,
    pub value_type: Option<String>,
}

/// A field value is a layout with an optional value type beside it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawFieldValue {
    #[serde(flatten)]
    pub layout: RawLayout,
    pub value_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawEntity {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub mention_text: Option<String>,
    pub confidence: Option<f64>,
    pub text_anchor: Option<RawTextAnchor>,
    pub normalized_value: Option<RawNormalizedValue>,
    pub page_anchor: Option<RawPageAnchor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawNormalizedValue {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawPageAnchor {
    pub page_refs: Vec<RawPageRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawPageRef {
    #[serde(deserialize_with = "int64")]
    pub page: i64,
    pub bounding_poly: Option<RawBoundingPoly>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Int64 {
    Number(i64),
    Text(String),
}

fn int64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(int64_opt(deserializer)?.unwrap_or(0))
}

/// Accepts the protobuf-JSON int64 encoding: a number, a decimal string, or null.
fn int64_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Int64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int64::Number(value)) => Ok(Some(value)),
        Some(Int64::Text(text)) => {
            text.trim().parse().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_segments_accept_string_and_number_indices() {
        let anchor: RawTextAnchor = serde_json::from_value(json!({
            "textSegments": [{ "startIndex": "4", "endIndex": 11 }, { "endIndex": "3" }]
        }))
        .expect("anchor should decode");

        assert_eq!(anchor.text_segments[0].start_index, 4);
        assert_eq!(anchor.text_segments[0].end_index, 11);
        assert_eq!(anchor.text_segments[1].start_index, 0);
        assert_eq!(anchor.text_segments[1].end_index, 3);
    }

    #[test]
    fn non_numeric_index_is_a_decode_error() {
        let decoded = serde_json::from_value::<RawTextSegment>(json!({ "startIndex": "four" }));
        assert!(decoded.is_err());
    }

    #[test]
    fn field_value_keeps_layout_and_value_type() {
        let field: RawFormField = serde_json::from_value(json!({
            "fieldName": { "confidence": 0.9 },
            "fieldValue": {
                "confidence": 0.8,
                "valueType": "filled_checkbox",
                "boundingPoly": { "normalizedVertices": [{ "x": 0.1 }, { "x": 0.2, "y": 0.3 }] }
            }
        }))
        .expect("form field should decode");

        let value = field.field_value.expect("value present");
        assert_eq!(value.value_type.as_deref(), Some("filled_checkbox"));
        assert_eq!(value.layout.confidence, Some(0.8));
        let poly = value.layout.bounding_poly.expect("poly present");
        assert_eq!(poly.normalized_vertices[0].y, 0.0);
    }
}

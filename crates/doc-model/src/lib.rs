//! Typed, page-indexed view of a document-analysis result.
//!
//! [`parse`] normalizes the service's nested response into [`AnnotationItem`]s
//! that share one geometry form, so rendering never looks at the wire schema.

mod error;
mod model;
mod parse;
mod raw;
mod views;

pub use error::ParseError;
pub use model::{
    AnnotationItem, Category, CategorySet, CheckboxState, Diagnostics, Document, FieldRole,
    ItemExtra, ItemId, Page, PageDimension, UnknownCategory, Warning,
};
pub use parse::{parse, parse_slice, parse_str};
pub use views::{
    format_confidence, ConfidenceLevel, FieldRow, FieldSection, PageSummary, TableView,
};

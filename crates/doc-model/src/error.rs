#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("analysis result is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed analysis result: {reason}{}", page_suffix(.page))]
    Malformed { reason: String, page: Option<u32> },
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into(), page: None }
    }

    pub(crate) fn malformed_page(page: u32, reason: impl Into<String>) -> Self {
        Self::Malformed { reason: reason.into(), page: Some(page) }
    }
}

fn page_suffix(page: &Option<u32>) -> String {
    match page {
        Some(page) => format!(" (page {page})"),
        None => String::new(),
    }
}

//! API handlers module

pub mod correlations;
pub mod embedding;
pub mod health;
pub mod search;

use paperlens_common::errors::AppError;
use paperlens_common::DocumentResponse;
use paperlens_search::FilterBuilder;
use serde::Serialize;
use validator::ValidationErrors;

/// Body shared by search and correlation responses
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub total_results: usize,
    pub results: Vec<DocumentResponse>,
    pub processing_time_ms: u64,
}

impl ResultsResponse {
    pub fn new(results: Vec<DocumentResponse>, processing_time_ms: u64) -> Self {
        Self {
            total_results: results.len(),
            results,
            processing_time_ms,
        }
    }
}

/// Build engine filters from the `filter_*` query parameters.
///
/// Categories arrive comma separated (`cs.CV,cs.LG`).
pub fn filter_builder(
    categories: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> FilterBuilder {
    let categories = categories.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>()
    });

    FilterBuilder::new()
        .categories(categories)
        .start_date(start_date.map(str::to_string))
        .end_date(end_date.map(str::to_string))
}

/// Map `validator` failures onto the API error, naming the first bad field
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|f| f.to_string());
    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}

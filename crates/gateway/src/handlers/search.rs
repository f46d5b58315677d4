//! Search handler

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::time::Instant;
use validator::Validate;

use super::{filter_builder, validation_error, ResultsResponse};
use crate::AppState;
use paperlens_common::errors::Result;

/// `GET /v1/search` query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Comma separated category codes
    #[serde(default)]
    pub filter_categories: Option<String>,

    #[serde(default)]
    pub filter_start_date: Option<String>,

    #[serde(default)]
    pub filter_end_date: Option<String>,
}

/// Hybrid search over the corpus
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ResultsResponse>> {
    let start = Instant::now();

    params.validate().map_err(validation_error)?;

    let filters = filter_builder(
        params.filter_categories.as_deref(),
        params.filter_start_date.as_deref(),
        params.filter_end_date.as_deref(),
    );
    let results = state.engine.search(&params.query, &filters).await?;

    Ok(Json(ResultsResponse::new(
        results,
        start.elapsed().as_millis() as u64,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_length_is_validated() {
        let params = SearchParams {
            query: String::new(),
            filter_categories: None,
            filter_start_date: None,
            filter_end_date: None,
        };
        let err = validation_error(params.validate().unwrap_err());
        assert_eq!(err.status_code().as_u16(), 400);

        let params = SearchParams {
            query: "x".repeat(1001),
            filter_categories: None,
            filter_start_date: None,
            filter_end_date: None,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_deserialize_from_query_string() {
        let uri: axum::http::Uri =
            "/v1/search?query=object%20detection&filter_categories=cs.CV,cs.LG&filter_start_date=2024-01-01"
                .parse()
                .unwrap();
        let Query(params) = Query::<SearchParams>::try_from_uri(&uri).unwrap();

        assert_eq!(params.query, "object detection");
        assert_eq!(params.filter_categories.as_deref(), Some("cs.CV,cs.LG"));
        assert_eq!(params.filter_end_date, None);
        assert!(params.validate().is_ok());
    }
}

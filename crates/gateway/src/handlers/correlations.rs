//! Related-document handler

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::time::Instant;
use validator::Validate;

use super::{filter_builder, validation_error, ResultsResponse};
use crate::AppState;
use paperlens_common::errors::Result;

/// `GET /v1/correlations/{doc_id}` query parameters
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CorrelationParams {
    /// Number of related documents, engine default when absent
    #[validate(range(min = 1, max = 50))]
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub filter_categories: Option<String>,

    #[serde(default)]
    pub filter_start_date: Option<String>,

    #[serde(default)]
    pub filter_end_date: Option<String>,
}

/// Documents related to `doc_id`, never including `doc_id` itself
pub async fn correlations(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(params): Query<CorrelationParams>,
) -> Result<Json<ResultsResponse>> {
    let start = Instant::now();

    params.validate().map_err(validation_error)?;

    let filters = filter_builder(
        params.filter_categories.as_deref(),
        params.filter_start_date.as_deref(),
        params.filter_end_date.as_deref(),
    );
    let results = state
        .engine
        .correlations(&doc_id, params.limit, &filters)
        .await?;

    Ok(Json(ResultsResponse::new(
        results,
        start.elapsed().as_millis() as u64,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperlens_common::errors::AppError;

    #[test]
    fn test_limit_range() {
        for limit in [0, 51] {
            let params = CorrelationParams {
                limit: Some(limit),
                ..Default::default()
            };
            let err = validation_error(params.validate().unwrap_err());
            assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "limit"));
        }

        assert!(CorrelationParams::default().validate().is_ok());
        let params = CorrelationParams {
            limit: Some(50),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_limit_parses_from_query_string() {
        let uri: axum::http::Uri = "/v1/correlations/2401.00001?limit=5&filter_end_date=2024-03-31"
            .parse()
            .unwrap();
        let Query(params) = Query::<CorrelationParams>::try_from_uri(&uri).unwrap();
        assert_eq!(params.limit, Some(5));
        assert_eq!(params.filter_end_date.as_deref(), Some("2024-03-31"));
    }
}

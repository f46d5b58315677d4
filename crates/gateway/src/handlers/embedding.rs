//! Query embedding handler

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::AppState;
use paperlens_common::errors::Result;
use paperlens_search::Engine;

/// `GET /v1/embedding` query parameters
#[derive(Debug, Deserialize, Validate)]
pub struct EmbeddingParams {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

/// Vector the search pipeline would use for `query`
pub async fn embedding(
    State(state): State<AppState>,
    Query(params): Query<EmbeddingParams>,
) -> Result<Json<EmbeddingResponse>> {
    embed_query(&state.engine, params).await.map(Json)
}

async fn embed_query(engine: &Engine, params: EmbeddingParams) -> Result<EmbeddingResponse> {
    params.validate().map_err(validation_error)?;
    let embedding = engine.embed(&params.query).await?;
    Ok(EmbeddingResponse { embedding })
}

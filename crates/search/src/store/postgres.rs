//! PostgreSQL document store
//!
//! Lexical retrieval uses PostgreSQL full-text search (`ts_rank_cd`), semantic
//! retrieval uses pgvector cosine distance. Documents live in a single table:
//!
//! ```sql
//! CREATE TABLE documents (
//!     id        text PRIMARY KEY,
//!     content   text NOT NULL,
//!     meta      jsonb NOT NULL,
//!     embedding vector(1024)
//! );
//! ```

use super::DocumentStore;
use crate::filter::{Condition, ConditionOperator, Filter, FilterField, FilterValue};
use paperlens_common::db::DbPool;
use paperlens_common::errors::{AppError, Result};
use paperlens_common::{Document, DocumentMeta};
use sea_orm::{DbBackend, DbErr, FromQueryResult, Statement, Value};
use tracing::{debug, warn};

const CATEGORY_ARRAY: &str = "string_to_array(d.meta->>'categories', ' ')";

/// Document store backed by PostgreSQL + pgvector
#[derive(Clone)]
pub struct PgDocumentStore {
    db: DbPool,
    table: String,
}

impl PgDocumentStore {
    /// Create a store reading from `table`.
    ///
    /// The table name is interpolated into SQL, so only plain (optionally
    /// schema-qualified) identifiers are accepted.
    pub fn new(db: DbPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_plain_identifier(&table) {
            return Err(AppError::Configuration {
                message: format!("invalid documents table name: {:?}", table),
            });
        }
        Ok(Self { db, table })
    }

    fn lexical_sql(&self, filter_sql: &str) -> String {
        format!(
            r#"
            SELECT
                d.id,
                d.content,
                d.meta,
                d.embedding::text AS embedding,
                ts_rank_cd(
                    to_tsvector('english', d.content),
                    plainto_tsquery('english', $1),
                    32 -- Normalize by document length
                )::float8 AS score
            FROM {table} d
            WHERE to_tsvector('english', d.content) @@ plainto_tsquery('english', $1){filter}
            ORDER BY score DESC
            LIMIT $2
            "#,
            table = self.table,
            filter = filter_sql
        )
    }

    fn semantic_sql(&self, filter_sql: &str) -> String {
        format!(
            r#"
            SELECT
                d.id,
                d.content,
                d.meta,
                d.embedding::text AS embedding,
                (1 - (d.embedding <=> $1::vector))::float8 AS score
            FROM {table} d
            WHERE d.embedding IS NOT NULL{filter}
            ORDER BY d.embedding <=> $1::vector
            LIMIT $2
            "#,
            table = self.table,
            filter = filter_sql
        )
    }

    fn exact_sql(&self) -> String {
        format!(
            r#"
            SELECT
                d.id,
                d.content,
                d.meta,
                d.embedding::text AS embedding,
                NULL::float8 AS score
            FROM {table} d
            WHERE d.id = $1
            LIMIT 1
            "#,
            table = self.table
        )
    }

    /// Run a document query, retrying once if the connection was lost
    async fn fetch(&self, op: &'static str, sql: String, values: Vec<Value>) -> Result<Vec<Document>> {
        let statement = Statement::from_sql_and_values(DbBackend::Postgres, sql, values);

        let rows = match DocumentRow::find_by_statement(statement.clone())
            .all(self.db.read())
            .await
        {
            Ok(rows) => rows,
            Err(err) if is_connection_error(&err) => {
                warn!(op, error = %err, "Document store connection failed, retrying once");
                DocumentRow::find_by_statement(statement)
                    .all(self.db.read())
                    .await
                    .map_err(|e| AppError::RetrievalError {
                        message: format!("{} failed after retry: {}", op, e),
                    })?
            }
            Err(err) => {
                return Err(AppError::RetrievalError {
                    message: format!("{} failed: {}", op, err),
                })
            }
        };

        debug!(op, rows = rows.len(), "Document store query complete");
        rows.into_iter().map(DocumentRow::into_document).collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn search_lexical(
        &self,
        query: &str,
        filter: Option<&Filter>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        let mut values: Vec<Value> = vec![query.to_string().into(), sql_limit(top_k).into()];
        let filter_sql = compile_filter(filter, &mut values)?;

        self.fetch("lexical search", self.lexical_sql(&filter_sql), values)
            .await
    }

    async fn search_semantic(
        &self,
        embedding: &[f32],
        filter: Option<&Filter>,
        top_k: usize,
    ) -> Result<Vec<Document>> {
        let mut values: Vec<Value> = vec![vector_literal(embedding).into(), sql_limit(top_k).into()];
        let filter_sql = compile_filter(filter, &mut values)?;

        self.fetch("semantic search", self.semantic_sql(&filter_sql), values)
            .await
    }

    async fn search_by_id_exact(&self, id: &str) -> Result<Option<Document>> {
        let docs = self
            .fetch("exact lookup", self.exact_sql(), vec![id.to_string().into()])
            .await?;
        Ok(docs.into_iter().next())
    }
}

/// Query result row
#[derive(Debug, FromQueryResult)]
struct DocumentRow {
    id: String,
    content: String,
    meta: serde_json::Value,
    embedding: Option<String>,
    score: Option<f64>,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document> {
        let meta: DocumentMeta =
            serde_json::from_value(self.meta).map_err(|e| AppError::RetrievalError {
                message: format!("document {} has malformed metadata: {}", self.id, e),
            })?;

        let embedding = self
            .embedding
            .as_deref()
            .map(parse_vector)
            .transpose()
            .map_err(|e| AppError::RetrievalError {
                message: format!("document {} has malformed embedding: {}", self.id, e),
            })?;

        Ok(Document {
            id: self.id,
            content: self.content,
            meta,
            embedding,
            score: self.score.map(|s| s as f32),
        })
    }
}

fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}

fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// `LIMIT` parameter; sizes past `i64::MAX` mean "no practical bound"
fn sql_limit(top_k: usize) -> i64 {
    i64::try_from(top_k).unwrap_or(i64::MAX)
}

/// Format an embedding as a pgvector text literal, e.g. `[0.1,0.2]`
fn vector_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Parse pgvector's text output back into floats
fn parse_vector(text: &str) -> std::result::Result<Vec<f32>, String> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("expected [..] vector literal, got {:?}", text))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| format!("bad component {:?}: {}", part, e))
        })
        .collect()
}

/// Compile a filter into ` AND ...` clauses, appending bind values.
///
/// Placeholders continue numbering after the values already present.
fn compile_filter(filter: Option<&Filter>, values: &mut Vec<Value>) -> Result<String> {
    let Some(filter) = filter else {
        return Ok(String::new());
    };

    let mut sql = String::new();
    for condition in &filter.conditions {
        sql.push_str(" AND ");
        sql.push_str(&compile_condition(condition, values)?);
    }
    Ok(sql)
}

fn compile_condition(condition: &Condition, values: &mut Vec<Value>) -> Result<String> {
    let mut bind = |value: &str| {
        values.push(value.to_string().into());
        format!("${}", values.len())
    };

    let clause = match (condition.field, condition.operator, &condition.value) {
        (FilterField::Id, ConditionOperator::Eq, FilterValue::Text(id)) => {
            format!("d.id = {}", bind(id))
        }
        (FilterField::Id, ConditionOperator::In, FilterValue::List(ids)) => {
            if ids.is_empty() {
                "FALSE".to_string()
            } else {
                let params: Vec<String> = ids.iter().map(|id| bind(id)).collect();
                format!("d.id IN ({})", params.join(", "))
            }
        }
        (FilterField::Datestamp, op, FilterValue::Text(date)) => {
            let cmp = match op {
                ConditionOperator::Eq => "=",
                ConditionOperator::Gte => ">=",
                ConditionOperator::Lte => "<=",
                ConditionOperator::In => return Err(unsupported(condition)),
            };
            format!("d.meta->>'datestamp' {} {}", cmp, bind(date))
        }
        (FilterField::Categories, ConditionOperator::In, FilterValue::List(categories)) => {
            if categories.is_empty() {
                "FALSE".to_string()
            } else {
                let params: Vec<String> = categories.iter().map(|c| bind(c)).collect();
                format!("{} && ARRAY[{}]::text[]", CATEGORY_ARRAY, params.join(", "))
            }
        }
        (FilterField::Categories, ConditionOperator::Eq, FilterValue::Text(category)) => {
            format!("{} = ANY({})", bind(category), CATEGORY_ARRAY)
        }
        _ => return Err(unsupported(condition)),
    };

    Ok(clause)
}

fn unsupported(condition: &Condition) -> AppError {
    AppError::RetrievalError {
        message: format!(
            "unsupported filter condition: {:?} {:?} {:?}",
            condition.field, condition.operator, condition.value
        ),
    }
}

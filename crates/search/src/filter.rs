//! Structured filters handed to the document store
//!
//! A [`Filter`] is an AND over an ordered list of conditions. Its serialized
//! form is the store's filter dialect:
//!
//! ```json
//! {"operator":"AND","conditions":[{"field":"meta.datestamp","operator":">=","value":"2024-01-01"}]}
//! ```
//!
//! "No filter" is expressed as `Option::<Filter>::None`, never as an AND of
//! zero conditions.

use chrono::NaiveDate;
use paperlens_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Boolean operator joining the conditions of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
}

/// Document fields a condition can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterField {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "meta.datestamp")]
    Datestamp,
    #[serde(rename = "meta.categories")]
    Categories,
}

/// Comparison operator of a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: FilterField,
    pub operator: ConditionOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub operator: LogicalOperator,
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching exactly one document id
    pub fn id_equals(id: &str) -> Self {
        Self {
            operator: LogicalOperator::And,
            conditions: vec![Condition {
                field: FilterField::Id,
                operator: ConditionOperator::Eq,
                value: FilterValue::Text(id.to_string()),
            }],
        }
    }
}

/// Optional category and date constraints of a request.
///
/// Deserializes directly from request parameters. Empty strings and an empty
/// category list are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterBuilder {
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(mut self, categories: Option<Vec<String>>) -> Self {
        self.categories = categories;
        self
    }

    pub fn start_date(mut self, start_date: Option<String>) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn end_date(mut self, end_date: Option<String>) -> Self {
        self.end_date = end_date;
        self
    }

    fn present_start(&self) -> Option<&str> {
        self.start_date.as_deref().filter(|d| !d.is_empty())
    }

    fn present_end(&self) -> Option<&str> {
        self.end_date.as_deref().filter(|d| !d.is_empty())
    }

    fn present_categories(&self) -> Option<&[String]> {
        self.categories.as_deref().filter(|c| !c.is_empty())
    }

    /// Check that dates are ISO `YYYY-MM-DD` and the range is not inverted
    pub fn validate(&self) -> Result<()> {
        let parse = |field: &str, value: &str| {
            NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| AppError::Validation {
                message: format!("{} must be an ISO date (YYYY-MM-DD), got {:?}", field, value),
                field: Some(field.to_string()),
            })
        };

        let start = self
            .present_start()
            .map(|d| parse("filter_start_date", d))
            .transpose()?;
        let end = self
            .present_end()
            .map(|d| parse("filter_end_date", d))
            .transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::Validation {
                    message: format!("filter_start_date {} is after filter_end_date {}", start, end),
                    field: Some("filter_start_date".to_string()),
                });
            }
        }

        Ok(())
    }

    /// Build the filter, or `None` when no constraint is present.
    ///
    /// Conditions are always emitted in the order start date, end date,
    /// categories, so equal inputs give identical filters.
    pub fn build(&self) -> Option<Filter> {
        let mut conditions = Vec::with_capacity(3);

        if let Some(start) = self.present_start() {
            conditions.push(Condition {
                field: FilterField::Datestamp,
                operator: ConditionOperator::Gte,
                value: FilterValue::Text(start.to_string()),
            });
        }

        if let Some(end) = self.present_end() {
            conditions.push(Condition {
                field: FilterField::Datestamp,
                operator: ConditionOperator::Lte,
                value: FilterValue::Text(end.to_string()),
            });
        }

        if let Some(categories) = self.present_categories() {
            conditions.push(Condition {
                field: FilterField::Categories,
                operator: ConditionOperator::In,
                value: FilterValue::List(categories.to_vec()),
            });
        }

        if conditions.is_empty() {
            return None;
        }

        Some(Filter {
            operator: LogicalOperator::And,
            conditions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_constraints_is_absent() {
        assert_eq!(FilterBuilder::new().build(), None);
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let builder = FilterBuilder::new()
            .categories(Some(vec![]))
            .start_date(Some(String::new()))
            .end_date(Some(String::new()));
        assert_eq!(builder.build(), None);
    }

    #[test]
    fn test_categories_only() {
        let filter = FilterBuilder::new()
            .categories(Some(vec!["cs.CV".to_string()]))
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "operator": "AND",
                "conditions": [
                    {"field": "meta.categories", "operator": "in", "value": ["cs.CV"]}
                ]
            })
        );
    }

    #[test]
    fn test_all_constraints_in_fixed_order() {
        let filter = FilterBuilder::new()
            .categories(Some(vec!["cs.CV".to_string()]))
            .end_date(Some("2024-03-31".to_string()))
            .start_date(Some("2024-01-01".to_string()))
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "operator": "AND",
                "conditions": [
                    {"field": "meta.datestamp", "operator": ">=", "value": "2024-01-01"},
                    {"field": "meta.datestamp", "operator": "<=", "value": "2024-03-31"},
                    {"field": "meta.categories", "operator": "in", "value": ["cs.CV"]}
                ]
            })
        );
    }

    #[test]
    fn test_build_is_byte_identical_for_equal_inputs() {
        let builder = FilterBuilder::new()
            .categories(Some(vec!["cs.CV".to_string(), "cs.LG".to_string()]))
            .start_date(Some("2024-01-01".to_string()));

        let first = serde_json::to_string(&builder.build()).unwrap();
        let second = serde_json::to_string(&builder.clone().build()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_id_equals() {
        assert_eq!(
            serde_json::to_value(Filter::id_equals("2408.03001")).unwrap(),
            json!({
                "operator": "AND",
                "conditions": [{"field": "id", "operator": "==", "value": "2408.03001"}]
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_dates() {
        let builder = FilterBuilder::new().start_date(Some("01/02/2024".to_string()));
        assert!(matches!(
            builder.validate(),
            Err(AppError::Validation { field: Some(ref f), .. }) if f == "filter_start_date"
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let builder = FilterBuilder::new()
            .start_date(Some("2024-04-01".to_string()))
            .end_date(Some("2024-03-31".to_string()));
        assert!(builder.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_open_ranges() {
        let builder = FilterBuilder::new().end_date(Some("2024-03-31".to_string()));
        assert!(builder.validate().is_ok());
        assert!(FilterBuilder::new().validate().is_ok());
    }

    #[test]
    fn test_filter_round_trips_through_store_dialect() {
        let raw = r#"{"operator":"AND","conditions":[{"field":"meta.categories","operator":"in","value":["cs.AI"]}]}"#;
        let filter: Filter = serde_json::from_str(raw).unwrap();
        assert_eq!(filter.conditions[0].value, FilterValue::List(vec!["cs.AI".to_string()]));
        assert_eq!(serde_json::to_string(&filter).unwrap(), raw);
    }
}

//! Bulk query definitions and the submission reply.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::{BulkOperationId, BulkOperationState};

/// A remote query fragment to run as a bulk operation.
///
/// The client does not validate the query; syntax errors come back from
/// the platform as user errors at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkQuery(String);

impl BulkQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    /// All products with id and title.
    pub fn products() -> Self {
        Self::new(
            r#"
{
  products {
    edges {
      node {
        id
        title
      }
    }
  }
}
"#,
        )
    }

    /// All product variants. Nested connection, so child lines carry `__parentId`.
    pub fn variants() -> Self {
        Self::new(
            r#"
{
  products {
    edges {
      node {
        id
        title
        variants {
          edges {
            node {
              id
              title
              sku
              price
              inventoryQuantity
            }
          }
        }
      }
    }
  }
}
"#,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BulkQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.trim().fmt(f)
    }
}

/// The operation created by a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedOperation {
    pub id: BulkOperationId,
    pub status: BulkOperationState,
}

/// A validation error reported by the platform for the submitted query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Reply of `bulkOperationRunQuery`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(rename = "bulkOperation", default)]
    pub operation: Option<SubmittedOperation>,

    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

impl SubmitResponse {
    pub fn accepted(id: BulkOperationId) -> Self {
        Self {
            operation: Some(SubmittedOperation {
                id,
                status: BulkOperationState::Created,
            }),
            user_errors: Vec::new(),
        }
    }

    pub fn rejected(user_errors: Vec<UserError>) -> Self {
        Self {
            operation: None,
            user_errors,
        }
    }
}

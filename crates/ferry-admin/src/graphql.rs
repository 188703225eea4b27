//! GraphQL wire types: cursor-paginated connections and mutation `userErrors`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AdminError;

/// A cursor-paginated connection: `{edges: [{node, cursor}], pageInfo: {hasNextPage}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Cursor to pass as `after` for the next page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if !self.page_info.has_next_page {
            return None;
        }
        self.page_info
            .end_cursor
            .as_deref()
            .or_else(|| self.edges.last().map(|e| e.cursor.as_str()))
    }

    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|e| e.node)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
    #[serde(default)]
    pub cursor: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// One entry of a mutation payload's `userErrors` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Pull `data.<root>` out of a GraphQL response and deserialize it.
pub fn data_at<T: DeserializeOwned>(response: &Value, root: &str) -> Result<T, AdminError> {
    let node = response
        .get("data")
        .and_then(|d| d.get(root))
        .filter(|v| !v.is_null())
        .ok_or_else(|| AdminError::InvalidResponse(format!("missing data.{} in response", root)))?;
    Ok(serde_json::from_value(node.clone())?)
}

/// The `userErrors` of mutation payload `data.<mutation>`. Empty when absent.
pub fn user_errors(response: &Value, mutation: &str) -> Vec<UserError> {
    response
        .get("data")
        .and_then(|d| d.get(mutation))
        .and_then(|p| p.get("userErrors"))
        .and_then(|e| serde_json::from_value(e.clone()).ok())
        .unwrap_or_default()
}

/// Join user errors into one message line.
pub fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

//! Row API client for the hosted database (PostgREST dialect).
//!
//! Requests run with the signed-in user's access token so the server-side
//! row policies apply. Callers still filter by owner explicitly.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::util::compact_text;
use crate::{Error, Result};

/// Error code returned when a single-row request matched nothing.
const NO_ROWS_CODE: &str = "PGRST116";
const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Column selection, equality filters and ordering for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    columns: String,
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }
}

impl TableQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Restrict rows to `column = value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((column.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    /// Query-string pairs in the row API's filter syntax.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{value}")));
        }
        if let Some((column, order)) = &self.order {
            let direction = match order {
                Order::Ascending => "asc",
                Order::Descending => "desc",
            };
            pairs.push(("order".to_string(), format!("{column}.{direction}")));
        }
        pairs
    }

    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }
}

#[derive(Clone)]
pub struct PostgrestClient {
    rest_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl PostgrestClient {
    pub fn new(config: &BackendConfig, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::NotSignedIn);
        }
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.supabase_anon_key.clone(),
            access_token,
            client: Client::builder().build()?,
        })
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> Result<Vec<T>> {
        let request = self
            .request(self.client.get(self.table_url(table)))
            .query(&query.to_query_pairs());
        self.send_json(request).await
    }

    /// Fetch exactly one row; zero rows is `Error::NotFound`.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> Result<T> {
        let request = self
            .request(self.client.get(self.table_url(table)))
            .header("Accept", SINGLE_OBJECT)
            .query(&query.to_query_pairs());
        self.send_json(request).await
    }

    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(self.client.post(self.table_url(table)))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        self.send_json(request).await
    }

    pub async fn update<B, T>(&self, table: &str, query: &TableQuery, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        require_filters(table, query)?;
        let request = self
            .request(self.client.patch(self.table_url(table)))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&query.to_query_pairs())
            .json(body);
        self.send_json(request).await
    }

    /// Insert, or merge into the row with the same primary key.
    pub async fn upsert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(self.client.post(self.table_url(table)))
            .header("Prefer", MERGE_DUPLICATES)
            .json(body);
        self.send_json(request).await
    }

    /// Delete matching rows and return how many were removed.
    pub async fn delete(&self, table: &str, query: &TableQuery) -> Result<usize> {
        require_filters(table, query)?;
        let request = self
            .request(self.client.delete(self.table_url(table)))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&query.to_query_pairs());
        let rows: Vec<serde_json::Value> = self.send_json(request).await?;
        Ok(rows.len())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table.trim_matches('/'))
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_table_error(status, &body));
        }
        let body = response.text().await?;
        tracing::debug!("Row API responded with {} bytes", body.len());
        Ok(serde_json::from_str(&body)?)
    }
}

/// Updates and deletes without a filter would touch every visible row.
fn require_filters(table: &str, query: &TableQuery) -> Result<()> {
    if query.has_filters() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Refusing unfiltered write to table '{table}'"
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PostgrestErrorResponse {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

pub(crate) fn parse_table_error(status: StatusCode, body: &str) -> Error {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        let code = payload
            .code
            .unwrap_or_else(|| status.as_u16().to_string());
        let mut message = payload
            .message
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        if let Some(details) = payload.details.filter(|value| !value.trim().is_empty()) {
            message = format!("{message} ({})", details.trim());
        }
        if let Some(hint) = payload.hint.filter(|value| !value.trim().is_empty()) {
            message = format!("{message}; hint: {}", hint.trim());
        }
        if code == NO_ROWS_CODE {
            return Error::NotFound(message);
        }
        return Error::Table { code, message };
    }

    Error::Table {
        code: status.as_u16().to_string(),
        message: if body.trim().is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            compact_text(body)
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pairs(query: &TableQuery) -> Vec<String> {
        query
            .to_query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }

    #[test]
    fn query_builds_filters_and_order() {
        let query = TableQuery::new()
            .eq("user_id1", "user-a")
            .eq("id", 7)
            .order("created_at", Order::Descending);
        assert_eq!(
            pairs(&query),
            vec![
                "select=*",
                "user_id1=eq.user-a",
                "id=eq.7",
                "order=created_at.desc",
            ]
        );
    }

    #[test]
    fn query_with_columns_and_ascending_order() {
        let query = TableQuery::new()
            .columns("avatar_url,full_name")
            .order("id", Order::Ascending);
        assert_eq!(
            pairs(&query),
            vec!["select=avatar_url,full_name", "order=id.asc"]
        );
        assert!(!query.has_filters());
    }

    #[test]
    fn unfiltered_writes_are_refused() {
        assert!(require_filters("notes", &TableQuery::new()).is_err());
        assert!(require_filters("notes", &TableQuery::new().eq("id", 1)).is_ok());
    }

    #[test]
    fn no_rows_error_maps_to_not_found() {
        let error = parse_table_error(
            StatusCode::NOT_ACCEPTABLE,
            r#"{"code":"PGRST116","details":"The result contains 0 rows","hint":null,"message":"JSON object requested, multiple (or no) rows returned"}"#,
        );
        assert!(matches!(error, Error::NotFound(message) if message.contains("0 rows")));
    }

    #[test]
    fn policy_rejection_keeps_code_and_hint() {
        let error = parse_table_error(
            StatusCode::FORBIDDEN,
            r#"{"code":"42501","details":null,"hint":"check policies","message":"new row violates row-level security policy"}"#,
        );
        match error {
            Error::Table { code, message } => {
                assert_eq!(code, "42501");
                assert_eq!(
                    message,
                    "new row violates row-level security policy; hint: check policies"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_compacted() {
        let error = parse_table_error(StatusCode::BAD_GATEWAY, "  upstream down  ");
        match error {
            Error::Table { code, message } => {
                assert_eq!(code, "502");
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

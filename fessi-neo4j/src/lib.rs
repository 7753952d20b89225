//! Graph store backed by Neo4j, talking to its HTTP transactional Cypher endpoint.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use fessi_core::{
    model::{Facility, WasteItem, WasteStream},
    ports::{GraphSession, GraphStats, GraphStore, StoreError, StreamLink, Upsert},
};

const MERGE_WASTE_ITEM: &str = "\
MERGE (w:WasteItem {name: $name})
ON CREATE SET w.uid = $uid, w.created_at = datetime($at)
ON MATCH SET w.updated_at = datetime($at)";

const MERGE_STREAM_LINK: &str = "\
MATCH (w:WasteItem {name: $item_name})
MERGE (s:WasteStream {name: $stream_name})
ON CREATE SET s.uid = $stream_uid, s.created_at = datetime($at)
MERGE (w)-[r:DISPOSED_IN]->(s)
ON CREATE SET r.created_at = datetime($at)
RETURN s.name AS stream";

const LINK_FACILITY: &str = "\
MATCH (w:WasteItem {name: $item_name})
MATCH (f:Facility {name: $facility_name})
MERGE (w)-[r:DISPOSED_AT]->(f)
ON CREATE SET r.created_at = datetime($at)
RETURN f.name AS facility";

const MERGE_FACILITY: &str = "\
MERGE (f:Facility {uid: $uid})
ON CREATE SET
    f.name = $name,
    f.address = $address,
    f.opening_hours = $opening_hours,
    f.contact = $contact,
    f.additional_info = $additional_info,
    f.link = $link,
    f.created_at = datetime($at)
ON MATCH SET
    f.address = CASE WHEN $address <> '' THEN $address ELSE f.address END,
    f.opening_hours = CASE WHEN $opening_hours <> '' THEN $opening_hours ELSE f.opening_hours END,
    f.contact = CASE WHEN $contact <> '' THEN $contact ELSE f.contact END,
    f.additional_info = CASE WHEN $additional_info <> '' THEN $additional_info ELSE f.additional_info END,
    f.link = CASE WHEN $link <> '' THEN $link ELSE f.link END,
    f.updated_at = datetime($at)";

const FACILITY_NAMES: &str = "MATCH (f:Facility) RETURN f.name AS name";
const LABELS: &str = "CALL db.labels() YIELD label RETURN label";
const COUNT_RELATIONSHIPS: &str = "MATCH ()-[r]->() RETURN count(r) AS count";
const CLEAR_ALL: &str = "MATCH (n) DETACH DELETE n";
const PING: &str = "RETURN 1 AS ok";

#[derive(Debug, Clone)]
/// Connection settings for a Neo4j server.
pub struct Neo4jConfig {
    /// Base HTTP URI, e.g. `http://localhost:7474`.
    pub uri: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_owned(),
            user: "neo4j".to_owned(),
            password: "neo4j_dev".to_owned(),
            database: "neo4j".to_owned(),
        }
    }
}

/// Request body for the transactional endpoint.
#[derive(Debug, Serialize)]
struct TxRequest<'req> {
    statements: &'req [Statement<'req>],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Statement<'req> {
    statement: &'req str,
    parameters: Value,
    include_stats: bool,
}

impl<'req> Statement<'req> {
    fn new(statement: &'req str, parameters: Value) -> Self {
        Self {
            statement,
            parameters,
            include_stats: true,
        }
    }

    fn bare(statement: &'req str) -> Self {
        Self::new(statement, json!({}))
    }
}

/// Response of the transactional endpoint.
#[derive(Debug, Default, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
    // only present while a transaction is open
    #[serde(default)]
    commit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
    #[serde(default)]
    stats: QueryStats,
}

#[derive(Debug, Deserialize)]
struct RowData {
    #[serde(default)]
    row: Vec<Value>,
}

/// Counters reported with `includeStats`; we only need the creations.
#[derive(Debug, Default, Deserialize)]
struct QueryStats {
    #[serde(default)]
    nodes_created: u64,
    #[serde(default)]
    relationships_created: u64,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: String,
    message: String,
}

impl TxResponse {
    /// Turn the first reported server error into a [`StoreError`].
    fn check(self) -> Result<Self, StoreError> {
        if let Some(error) = self.errors.first() {
            return Err(StoreError::Query {
                code: error.code.clone(),
                message: error.message.clone(),
            });
        }
        Ok(self)
    }

    fn into_single(self) -> Result<StatementResult, StoreError> {
        self.results
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("response has no statement result".to_owned()))
    }

    /// Transaction URL, derived from the commit URL handed out on `begin`.
    fn transaction_url(&self) -> Result<String, StoreError> {
        self.commit
            .as_deref()
            .and_then(|commit| commit.strip_suffix("/commit"))
            .map(str::to_owned)
            .ok_or_else(|| StoreError::Decode("missing commit URL for transaction".to_owned()))
    }
}

impl StatementResult {
    fn column_values(&self, column: &str) -> Result<impl Iterator<Item = &Value>, StoreError> {
        let index = self
            .columns
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| StoreError::Decode(format!("missing column {column:?}")))?;
        Ok(self.data.iter().filter_map(move |data| data.row.get(index)))
    }

    fn strings(&self, column: &str) -> Result<Vec<String>, StoreError> {
        self.column_values(column)?
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| StoreError::Decode(format!("{column} is not a string: {value}")))
            })
            .collect()
    }

    fn first_count(&self, column: &str) -> Result<u64, StoreError> {
        self.column_values(column)?
            .next()
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::Decode(format!("missing count in column {column:?}")))
    }

    fn has_rows(&self) -> bool {
        !self.data.is_empty()
    }
}

fn upsert_from(created: u64) -> Upsert {
    if created > 0 {
        Upsert::Created
    } else {
        Upsert::Matched
    }
}

/// Backtick-quote a label for interpolation into Cypher.
fn quote_label(label: &str) -> String {
    format!("`{}`", label.replace('`', "``"))
}

fn transport(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.status() == Some(StatusCode::UNAUTHORIZED) {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Transport(Box::new(err))
    }
}

/// Thin HTTP client bound to one server and database.
#[derive(Debug, Clone)]
struct Neo4jClient {
    http: Client,
    config: Arc<Neo4jConfig>,
}

impl Neo4jClient {
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/db/{}/{path}",
            self.config.uri.trim_end_matches('/'),
            self.config.database
        )
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.basic_auth(&self.config.user, Some(&self.config.password))
    }

    async fn post(&self, url: &str, statements: &[Statement<'_>]) -> Result<TxResponse, StoreError> {
        let req = self
            .authorized(self.http.post(url))
            .json(&TxRequest { statements });
        fetch_json::<TxResponse>(req).await?.check()
    }

    /// Run a single statement in its own auto-committed transaction.
    async fn run(&self, statement: Statement<'_>) -> Result<StatementResult, StoreError> {
        self.post(&self.endpoint("tx/commit"), &[statement])
            .await?
            .into_single()
    }
}

/// Graph store talking to a Neo4j server.
pub struct Neo4jStore {
    client: Neo4jClient,
}

impl Neo4jStore {
    /// Create a store bound to the given HTTP client and server settings.
    #[must_use]
    pub fn new(http: Client, config: Neo4jConfig) -> Self {
        Self {
            client: Neo4jClient {
                http,
                config: Arc::new(config),
            },
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn verify_connectivity(&self) -> Result<(), StoreError> {
        self.client.run(Statement::bare(PING)).await?;
        info!(uri = %self.client.config.uri, "connected to Neo4j");
        Ok(())
    }

    async fn facility_names(&self) -> Result<HashSet<String>, StoreError> {
        let result = self.client.run(Statement::bare(FACILITY_NAMES)).await?;
        Ok(result.strings("name")?.into_iter().collect())
    }

    async fn begin(&self) -> Result<Box<dyn GraphSession>, StoreError> {
        let response = self.client.post(&self.client.endpoint("tx"), &[]).await?;
        let tx_url = response.transaction_url()?;
        debug!(%tx_url, "transaction opened");
        Ok(Box::new(Neo4jSession {
            client: self.client.clone(),
            tx_url,
        }))
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        let labels = self.client.run(Statement::bare(LABELS)).await?.strings("label")?;

        let mut node_counts = BTreeMap::new();
        for label in labels {
            let statement = format!("MATCH (n:{}) RETURN count(n) AS count", quote_label(&label));
            let count = self
                .client
                .run(Statement::bare(&statement))
                .await?
                .first_count("count")?;
            node_counts.insert(label, count);
        }

        let relationship_count = self
            .client
            .run(Statement::bare(COUNT_RELATIONSHIPS))
            .await?
            .first_count("count")?;

        Ok(GraphStats {
            node_counts,
            relationship_count,
        })
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        warn!("clearing all data from Neo4j");
        self.client.run(Statement::bare(CLEAR_ALL)).await?;
        info!("all data cleared from Neo4j");
        Ok(())
    }
}

/// Open HTTP transaction.
///
/// Dropping it without `commit` or `rollback` sends nothing. The server keeps
/// the transaction and its locks until its idle timeout expires.
struct Neo4jSession {
    client: Neo4jClient,
    tx_url: String,
}

impl Neo4jSession {
    async fn run(&self, statement: Statement<'_>) -> Result<StatementResult, StoreError> {
        self.client
            .post(&self.tx_url, &[statement])
            .await?
            .into_single()
    }
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn merge_waste_item(
        &mut self,
        item: &WasteItem,
        at: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        let result = self
            .run(Statement::new(
                MERGE_WASTE_ITEM,
                json!({
                    "name": item.name,
                    "uid": item.uid.0,
                    "at": at.to_rfc3339(),
                }),
            ))
            .await?;
        Ok(upsert_from(result.stats.nodes_created))
    }

    async fn merge_stream_link(
        &mut self,
        item_name: &str,
        stream: WasteStream,
        at: DateTime<Utc>,
    ) -> Result<StreamLink, StoreError> {
        let result = self
            .run(Statement::new(
                MERGE_STREAM_LINK,
                json!({
                    "item_name": item_name,
                    "stream_name": stream.as_str(),
                    "stream_uid": stream.uid().0,
                    "at": at.to_rfc3339(),
                }),
            ))
            .await?;
        if !result.has_rows() {
            return Err(StoreError::Internal(format!(
                "waste item {item_name:?} does not exist"
            )));
        }
        Ok(StreamLink {
            stream: upsert_from(result.stats.nodes_created),
            relationship: upsert_from(result.stats.relationships_created),
        })
    }

    async fn link_facility(
        &mut self,
        item_name: &str,
        facility_name: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Upsert>, StoreError> {
        let result = self
            .run(Statement::new(
                LINK_FACILITY,
                json!({
                    "item_name": item_name,
                    "facility_name": facility_name,
                    "at": at.to_rfc3339(),
                }),
            ))
            .await?;
        Ok(result
            .has_rows()
            .then(|| upsert_from(result.stats.relationships_created)))
    }

    async fn merge_facility(
        &mut self,
        facility: &Facility,
        at: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        let result = self
            .run(Statement::new(
                MERGE_FACILITY,
                json!({
                    "uid": facility.uid().0,
                    "name": facility.name,
                    "address": facility.address,
                    "opening_hours": facility.opening_hours,
                    "contact": facility.contact,
                    "additional_info": facility.additional_info,
                    "link": facility.link,
                    "at": at.to_rfc3339(),
                }),
            ))
            .await?;
        Ok(upsert_from(result.stats.nodes_created))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let commit_url = format!("{}/commit", self.tx_url);
        self.client.post(&commit_url, &[]).await?;
        debug!(tx_url = %self.tx_url, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let req = self.client.authorized(self.client.http.delete(&self.tx_url));
        fetch_json::<TxResponse>(req).await?.check()?;
        debug!(tx_url = %self.tx_url, "transaction rolled back");
        Ok(())
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, StoreError> {
    req.send()
        .await
        .map_err(transport)?
        .error_for_status()
        .map_err(transport)?
        .json()
        .await
        .map_err(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> TxResponse {
        serde_json::from_str(body).expect("valid response body")
    }

    #[test]
    fn server_errors_become_query_errors() {
        let body = r#"{"results": [], "errors": [
            {"code": "Neo.ClientError.Statement.SyntaxError", "message": "Invalid input"}
        ]}"#;
        let err = response(body).check().expect_err("server reported an error");
        assert!(matches!(
            err,
            StoreError::Query { ref code, .. } if code == "Neo.ClientError.Statement.SyntaxError"
        ));
    }

    #[test]
    fn decodes_rows_and_stats() {
        let body = r#"{"results": [{
            "columns": ["name"],
            "data": [{"row": ["Wertstoffhof Nord"], "meta": [null]}, {"row": ["Sperrmüll"], "meta": [null]}],
            "stats": {"contains_updates": true, "nodes_created": 1, "relationships_created": 0}
        }], "errors": []}"#;
        let result = response(body).check().expect("no errors").into_single().expect("one result");
        assert_eq!(
            result.strings("name").expect("string column"),
            vec!["Wertstoffhof Nord".to_owned(), "Sperrmüll".to_owned()]
        );
        assert_eq!(upsert_from(result.stats.nodes_created), Upsert::Created);
        assert_eq!(upsert_from(result.stats.relationships_created), Upsert::Matched);
    }

    #[test]
    fn reads_counts_and_rejects_missing_columns() {
        let body = r#"{"results": [{"columns": ["count"], "data": [{"row": [42]}]}], "errors": []}"#;
        let result = response(body).into_single().expect("one result");
        assert_eq!(result.first_count("count").expect("count"), 42);
        assert!(matches!(result.strings("name"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn transaction_url_comes_from_commit_url() {
        let body = r#"{"commit": "http://localhost:7474/db/neo4j/tx/7/commit", "results": [], "errors": []}"#;
        assert_eq!(
            response(body).transaction_url().expect("open transaction"),
            "http://localhost:7474/db/neo4j/tx/7"
        );
        assert!(response("{}").transaction_url().is_err());
    }

    #[test]
    fn statements_serialize_in_endpoint_format() {
        let statements = [Statement::new(PING, json!({"a": 1}))];
        let body = serde_json::to_value(TxRequest {
            statements: &statements,
        })
        .expect("serializable");
        assert_eq!(
            body,
            json!({"statements": [{"statement": PING, "parameters": {"a": 1}, "includeStats": true}]})
        );
    }

    #[test]
    fn labels_are_quoted() {
        assert_eq!(quote_label("WasteItem"), "`WasteItem`");
        assert_eq!(quote_label("we`ird"), "`we``ird`");
    }

    #[test]
    fn endpoint_joins_uri_and_database() {
        let client = Neo4jClient {
            http: Client::new(),
            config: Arc::new(Neo4jConfig {
                uri: "http://db:7474/".to_owned(),
                ..Neo4jConfig::default()
            }),
        };
        assert_eq!(client.endpoint("tx/commit"), "http://db:7474/db/neo4j/tx/commit");
    }
}

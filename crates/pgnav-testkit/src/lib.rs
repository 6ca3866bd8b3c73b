// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use percent_encoding::percent_decode_str;
use serde_json::{Value, json};
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ColumnFixture {
    pub name: &'static str,
    pub column_type: &'static str,
    pub constraints: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct TableFixture {
    pub name: &'static str,
    pub columns: Vec<ColumnFixture>,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct SchemaFixture {
    pub name: &'static str,
    pub tables: Vec<TableFixture>,
    pub views: Vec<&'static str>,
    pub indexes: Vec<(&'static str, &'static str)>,
}

/// In-memory stand-in for a pgweb database.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub database: String,
    pub schemas: Vec<SchemaFixture>,
}

const fn column(
    name: &'static str,
    column_type: &'static str,
    constraints: &'static [&'static str],
) -> ColumnFixture {
    ColumnFixture {
        name,
        column_type,
        constraints,
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            database: "shop".to_owned(),
            schemas: vec![
                SchemaFixture {
                    name: "public",
                    tables: vec![
                        TableFixture {
                            name: "customers",
                            columns: vec![
                                column("id", "integer", &["PRIMARY KEY"]),
                                column("name", "text", &[]),
                                column("email", "text", &["UNIQUE"]),
                            ],
                            rows: vec![
                                json!({"id": 1, "name": "Avery Walker", "email": "avery@example.com"}),
                                json!({"id": 2, "name": "Jordan Hill", "email": null}),
                            ],
                        },
                        TableFixture {
                            name: "orders",
                            columns: vec![
                                column("id", "integer", &["PRIMARY KEY"]),
                                column("customer_id", "integer", &["FOREIGN KEY"]),
                                column("total_cents", "bigint", &[]),
                                column("tags", "text[]", &[]),
                            ],
                            rows: vec![
                                json!({"id": 10, "customer_id": 1, "total_cents": 4599, "tags": ["gift", "rush"]}),
                                json!({"id": 11, "customer_id": 2, "total_cents": 1250, "tags": []}),
                            ],
                        },
                        TableFixture {
                            name: "order items",
                            columns: vec![
                                column("order_id", "integer", &["PRIMARY KEY", "FOREIGN KEY"]),
                                column("sku", "text", &["PRIMARY KEY"]),
                            ],
                            rows: vec![],
                        },
                    ],
                    views: vec!["active_customers"],
                    indexes: vec![
                        ("customers_pkey", "customers"),
                        ("customers_email_key", "customers"),
                        ("orders_pkey", "orders"),
                    ],
                },
                SchemaFixture {
                    name: "reporting",
                    tables: vec![TableFixture {
                        name: "monthly_revenue",
                        columns: vec![
                            column("month", "date", &[]),
                            column("revenue_cents", "bigint", &[]),
                        ],
                        rows: vec![
                            json!({"month": "2026-01-01", "revenue_cents": 120000}),
                            json!({"month": "2026-02-01", "revenue_cents": 98000}),
                        ],
                    }],
                    views: vec![],
                    indexes: vec![],
                },
            ],
        }
    }
}

impl Catalog {
    pub fn schema(&self, name: &str) -> Option<&SchemaFixture> {
        self.schemas.iter().find(|schema| schema.name == name)
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&TableFixture> {
        self.schema(schema)?
            .tables
            .iter()
            .find(|fixture| fixture.name == table)
    }
}

/// A canned reply: status, body, and whether the body is JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub json: bool,
}

impl Reply {
    fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: value.to_string(),
            json: true,
        }
    }

    fn text(status: u16, message: &str) -> Self {
        Self {
            status,
            body: format!("{message}\n"),
            json: false,
        }
    }
}

/// Mutable server state shared with the request thread.
#[derive(Debug)]
pub struct DemoState {
    pub catalog: Catalog,
    pub connected: bool,
    pub requests: Vec<String>,
}

impl DemoState {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            connected: true,
            requests: Vec::new(),
        }
    }

    /// Answers one request the way pgweb would.
    pub fn handle(&mut self, method: &Method, url: &str, body: &str) -> Reply {
        self.requests.push(format!("{} {url}", method.as_str()));
        let path = url.split('?').next().unwrap_or_default();
        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (method, segments.as_slice()) {
            (Method::Post, ["connect"]) => self.connect(body),
            (Method::Get, ["validate"]) => self.validate(),
            (Method::Post, ["close"]) => self.close(),
            (method, ["connect" | "close" | "query"]) if *method != Method::Post => {
                Reply::text(405, "This endpoint accepts only POST calls")
            }
            _ if !self.connected => {
                Reply::text(400, "No active connection. Call POST /connect first")
            }
            (Method::Post, ["query"]) => self.query(body),
            (Method::Get, ["schemas"]) => Reply::json(
                200,
                json!({
                    "schemas": self.catalog.schemas.iter().map(|schema| schema.name).collect::<Vec<_>>(),
                }),
            ),
            (Method::Get, ["schemas", schema, kind]) => self.schema_listing(schema, kind),
            (Method::Get, ["schemas", schema, "tables", table, kind]) => {
                self.table_detail(schema, table, kind)
            }
            (Method::Get, _) => Reply::text(404, "404 page not found"),
            _ => Reply::text(405, "This call only supports GET methods"),
        }
    }

    fn connect(&mut self, body: &str) -> Reply {
        let parsed: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(error) => {
                return Reply::text(400, &format!("Failed to decode request body: {error}"));
            }
        };
        let database = parsed
            .get("database")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if database.is_empty() {
            return Reply::text(400, "Invalid connection parameters: database is required");
        }
        self.connected = true;
        self.catalog.database = database.to_owned();
        Reply::json(
            202,
            json!({"message": format!("Connected to database {database}")}),
        )
    }

    fn validate(&self) -> Reply {
        if !self.connected {
            return Reply::text(400, "No active connection. Call POST /connect first");
        }
        Reply::json(
            200,
            json!({"message": format!("Database {} connection is healthy", self.catalog.database)}),
        )
    }

    fn close(&mut self) -> Reply {
        if !self.connected {
            return Reply::text(400, "No active connection to close");
        }
        self.connected = false;
        Reply::json(
            200,
            json!({"message": "Database connection closed successfully"}),
        )
    }

    /// Unknown schemas list nothing, like an empty catalog query.
    fn schema_listing(&self, schema: &str, kind: &str) -> Reply {
        let fixture = self.catalog.schema(schema);
        match kind {
            "tables" => {
                let tables: Vec<&str> = fixture
                    .map(|fixture| fixture.tables.iter().map(|table| table.name).collect())
                    .unwrap_or_default();
                Reply::json(
                    200,
                    json!({"schema": schema, "count": tables.len(), "tables": tables}),
                )
            }
            "views" => {
                let views = fixture.map(|fixture| fixture.views.clone()).unwrap_or_default();
                Reply::json(
                    200,
                    json!({"schema": schema, "count": views.len(), "views": views}),
                )
            }
            "indexes" => {
                let indexes: Vec<Value> = fixture
                    .map(|fixture| {
                        fixture
                            .indexes
                            .iter()
                            .map(|(index, table)| json!({"index": index, "table": table}))
                            .collect()
                    })
                    .unwrap_or_default();
                Reply::json(
                    200,
                    json!({"schema": schema, "count": indexes.len(), "indexes": indexes}),
                )
            }
            _ => Reply::text(404, "404 page not found"),
        }
    }

    fn table_detail(&self, schema: &str, table: &str, kind: &str) -> Reply {
        let Some(fixture) = self.catalog.table(schema, table) else {
            return Reply::text(
                500,
                &format!("Failed fetching table data: relation \"{schema}.{table}\" does not exist"),
            );
        };
        match kind {
            "columns" => Reply::json(
                200,
                json!({
                    "schema": schema,
                    "table": table,
                    "columns": fixture
                        .columns
                        .iter()
                        .map(|column| json!({
                            "name": column.name,
                            "type": column.column_type,
                            "constraints": column.constraints,
                        }))
                        .collect::<Vec<_>>(),
                }),
            ),
            "data" => Reply::json(
                200,
                json!({"schema": schema, "table": table, "rows": fixture.rows}),
            ),
            _ => Reply::text(404, "404 page not found"),
        }
    }

    /// Understands `SELECT * FROM [schema.]table` and treats other
    /// data-changing statements as executed with no rows touched.
    fn query(&self, body: &str) -> Reply {
        let query = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("query").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_default();
        let query = query.trim().trim_end_matches(';');
        if query.is_empty() {
            return Reply::text(400, "query is required");
        }

        let words: Vec<&str> = query.split_whitespace().collect();
        let verb = words.first().map(|word| word.to_ascii_lowercase()).unwrap_or_default();
        match verb.as_str() {
            "select" => self.select(&words),
            "insert" | "update" | "delete" => Reply::json(
                200,
                json!({"rows_affected": 0, "result": "statement executed"}),
            ),
            _ => Reply::text(
                400,
                &format!(
                    "Failed executing query: pq: syntax error at or near \"{}\"",
                    words.first().copied().unwrap_or_default()
                ),
            ),
        }
    }

    fn select(&self, words: &[&str]) -> Reply {
        let from = words
            .iter()
            .position(|word| word.eq_ignore_ascii_case("from"))
            .and_then(|index| words.get(index + 1));
        let Some(relation) = from else {
            return Reply::json(200, json!({"columns": ["?column?"], "rows": [{"?column?": 1}]}));
        };
        let relation = relation.trim_matches('"');
        let (schema, table) = relation.split_once('.').unwrap_or(("public", relation));
        match self.catalog.table(schema, table) {
            Some(fixture) => Reply::json(
                200,
                json!({
                    "columns": fixture.columns.iter().map(|column| column.name).collect::<Vec<_>>(),
                    "rows": fixture.rows,
                }),
            ),
            None => Reply::text(
                400,
                &format!("Failed executing query: pq: relation \"{relation}\" does not exist"),
            ),
        }
    }
}

/// pgweb look-alike served from a background thread on an ephemeral port.
pub struct DemoApi {
    base_url: String,
    server: Arc<Server>,
    state: Arc<Mutex<DemoState>>,
    worker: Option<JoinHandle<()>>,
}

impl DemoApi {
    pub fn start() -> Result<Self> {
        Self::start_with(Catalog::default())
    }

    pub fn start_with(catalog: Catalog) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start demo pgweb server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let state = Arc::new(Mutex::new(DemoState::new(catalog)));

        let worker = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("pgnav-demo-api".to_owned())
                .spawn(move || serve(&server, &state))
                .context("spawn demo server thread")?
        };

        debug!(%base_url, "demo pgweb server listening");
        Ok(Self {
            base_url,
            server,
            state,
            worker: Some(worker),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every request served so far as `METHOD /path`.
    pub fn requests(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }
}

impl Drop for DemoApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve(server: &Server, state: &Mutex<DemoState>) {
    for request in server.incoming_requests() {
        respond(request, state);
    }
}

fn respond(mut request: Request, state: &Mutex<DemoState>) {
    let mut body = String::new();
    if let Err(error) = request.as_reader().read_to_string(&mut body) {
        debug!(%error, "read demo request body");
    }

    let reply = match state.lock() {
        Ok(mut state) => state.handle(request.method(), request.url(), &body),
        Err(_) => Reply::text(500, "demo state poisoned"),
    };

    let content_type = if reply.json {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };
    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response = response.with_header(header);
    }
    if let Err(error) = request.respond(response) {
        debug!(%error, "write demo response");
    }
}

#[cfg(test)]
mod tests {
    use super::{Catalog, DemoApi, DemoState};
    use serde_json::Value;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tiny_http::Method;

    fn state() -> DemoState {
        DemoState::new(Catalog::default())
    }

    fn json(body: &str) -> Value {
        serde_json::from_str(body).expect("json body")
    }

    #[test]
    fn schemas_lists_catalog_in_order() {
        let reply = state().handle(&Method::Get, "/schemas", "");
        assert_eq!(reply.status, 200);
        assert_eq!(json(&reply.body)["schemas"], serde_json::json!(["public", "reporting"]));
    }

    #[test]
    fn path_segments_are_percent_decoded() {
        let reply = state().handle(
            &Method::Get,
            "/schemas/public/tables/order%20items/columns",
            "",
        );
        assert_eq!(reply.status, 200);
        let body = json(&reply.body);
        assert_eq!(body["table"], "order items");
        assert_eq!(body["columns"][0]["constraints"][1], "FOREIGN KEY");
    }

    #[test]
    fn listings_use_keyed_shapes_with_count() {
        let mut state = state();
        let views = json(&state.handle(&Method::Get, "/schemas/public/views", "").body);
        assert_eq!(views["count"], 1);
        let indexes = json(&state.handle(&Method::Get, "/schemas/reporting/indexes", "").body);
        assert_eq!(indexes["indexes"], serde_json::json!([]));
    }

    #[test]
    fn unknown_table_is_a_plain_text_error() {
        let reply = state().handle(&Method::Get, "/schemas/public/tables/nope/data", "");
        assert_eq!(reply.status, 500);
        assert!(!reply.json);
        assert!(reply.body.contains("does not exist"));
    }

    #[test]
    fn close_then_browse_requires_reconnect() {
        let mut state = state();
        assert_eq!(state.handle(&Method::Post, "/close", "").status, 200);
        assert_eq!(state.handle(&Method::Get, "/schemas", "").status, 400);
        assert_eq!(state.handle(&Method::Post, "/close", "").status, 400);

        let reply = state.handle(&Method::Post, "/connect", r#"{"database":"analytics"}"#);
        assert_eq!(reply.status, 202);
        assert_eq!(state.handle(&Method::Get, "/schemas", "").status, 200);
        let healthy = json(&state.handle(&Method::Get, "/validate", "").body);
        assert_eq!(healthy["message"], "Database analytics connection is healthy");
    }

    #[test]
    fn query_supports_select_and_statements() {
        let mut state = state();
        let rows = json(
            &state
                .handle(&Method::Post, "/query", r#"{"query":"SELECT * FROM reporting.monthly_revenue;"}"#)
                .body,
        );
        assert_eq!(rows["columns"], serde_json::json!(["month", "revenue_cents"]));

        let affected = json(
            &state
                .handle(&Method::Post, "/query", r#"{"query":"delete from orders"}"#)
                .body,
        );
        assert_eq!(affected["rows_affected"], 0);

        let error = state.handle(&Method::Post, "/query", r#"{"query":"selec 1"}"#);
        assert_eq!(error.status, 400);
        assert!(error.body.contains("syntax error"));

        assert_eq!(state.handle(&Method::Post, "/query", r#"{"query":"  "}"#).status, 400);
    }

    #[test]
    fn demo_server_answers_over_http() -> anyhow::Result<()> {
        let api = DemoApi::start()?;
        let address = api.base_url().trim_start_matches("http://").to_owned();
        let mut stream = TcpStream::connect(&address)?;
        write!(
            stream,
            "GET /schemas HTTP/1.1\r\nHost: {address}\r\nAccept: application/json\r\nConnection: close\r\n\r\n"
        )?;
        let mut response = String::new();
        stream.read_to_string(&mut response)?;

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""schemas":["public","reporting"]"#));
        assert_eq!(api.requests(), vec!["GET /schemas".to_owned()]);
        Ok(())
    }
}

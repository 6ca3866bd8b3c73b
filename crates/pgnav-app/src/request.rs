// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::Scope;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKey {
    Connect,
    Validate,
    Close,
    Schemas,
    Tables,
    Views,
    Indexes,
    Columns,
    TableData,
    Query,
}

impl TargetKey {
    pub const ALL: [Self; 10] = [
        Self::Connect,
        Self::Validate,
        Self::Close,
        Self::Schemas,
        Self::Tables,
        Self::Views,
        Self::Indexes,
        Self::Columns,
        Self::TableData,
        Self::Query,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Validate => "validate",
            Self::Close => "close",
            Self::Schemas => "schemas",
            Self::Tables => "tables",
            Self::Views => "views",
            Self::Indexes => "indexes",
            Self::Columns => "columns",
            Self::TableData => "table-data",
            Self::Query => "query",
        }
    }

    /// Responses for scoped keys describe the selection they were requested
    /// under and go stale once that part of it changes.
    pub const fn scope(self) -> Option<Scope> {
        match self {
            Self::Tables | Self::Views | Self::Indexes => Some(Scope::Schema),
            Self::Columns | Self::TableData => Some(Scope::Table),
            Self::Connect
            | Self::Validate
            | Self::Close
            | Self::Schemas
            | Self::Query => None,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKey {
    type Err = RequestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| RequestError::UnknownTargetKey(value.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Schema,
    Table,
}

impl Missing {
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Schema => "Select a schema first",
            Self::Table => "Select a table first",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("{}", .0.hint())]
    PreconditionUnmet(Missing),
    #[error("{0}")]
    TransportFailure(String),
    #[error("{0}")]
    MalformedResponse(String),
    #[error("unknown target key {0:?}")]
    UnknownTargetKey(String),
}

pub const PARSE_FAILURE_MESSAGE: &str = "Failed parsing response JSON";

impl RequestError {
    /// Text for the notification channel. Unknown target keys are a wiring
    /// defect and are logged instead of shown.
    pub fn notification(&self) -> Option<String> {
        match self {
            Self::PreconditionUnmet(missing) => Some(missing.hint().to_owned()),
            Self::TransportFailure(message) => Some(message.clone()),
            Self::MalformedResponse(_) => Some(PARSE_FAILURE_MESSAGE.to_owned()),
            Self::UnknownTargetKey(_) => None,
        }
    }
}

/// A request as declared by the UI: a path template plus where its response
/// should go.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub template: String,
    pub method: Method,
    pub target: Option<TargetKey>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(template: impl Into<String>, target: TargetKey) -> Self {
        Self {
            template: template.into(),
            method: Method::Get,
            target: Some(target),
            body: None,
        }
    }

    pub fn post(template: impl Into<String>, target: TargetKey, body: Option<Value>) -> Self {
        Self {
            template: template.into(),
            method: Method::Post,
            target: Some(target),
            body,
        }
    }

    pub fn without_target(mut self) -> Self {
        self.target = None;
        self
    }

    pub fn connect(params: &ConnectionParams) -> Self {
        Self::post("/connect", TargetKey::Connect, serde_json::to_value(params).ok())
    }

    pub fn validate() -> Self {
        Self::get("/validate", TargetKey::Validate)
    }

    pub fn close() -> Self {
        Self::post("/close", TargetKey::Close, None)
    }

    pub fn query(sql: &str) -> Self {
        Self::post(
            "/query",
            TargetKey::Query,
            Some(serde_json::json!({ "query": sql })),
        )
    }
}

/// The data regions the browser knows how to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Refresh {
    Schemas,
    Tables,
    Views,
    Indexes,
    Columns,
    TableData,
}

impl Refresh {
    pub const fn template(self) -> &'static str {
        match self {
            Self::Schemas => "/schemas",
            Self::Tables => "/schemas/{schema}/tables",
            Self::Views => "/schemas/{schema}/views",
            Self::Indexes => "/schemas/{schema}/indexes",
            Self::Columns => "/schemas/{schema}/tables/{table}/columns",
            Self::TableData => "/schemas/{schema}/tables/{table}/data",
        }
    }

    pub const fn target(self) -> TargetKey {
        match self {
            Self::Schemas => TargetKey::Schemas,
            Self::Tables => TargetKey::Tables,
            Self::Views => TargetKey::Views,
            Self::Indexes => TargetKey::Indexes,
            Self::Columns => TargetKey::Columns,
            Self::TableData => TargetKey::TableData,
        }
    }

    pub fn descriptor(self) -> RequestDescriptor {
        RequestDescriptor::get(self.template(), self.target())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: bool,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5432,
            username: "postgres".to_owned(),
            password: String::new(),
            database: "postgres".to_owned(),
            ssl_mode: false,
        }
    }
}

/// Travels with a request so its completion can be routed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: u64,
    pub target: Option<TargetKey>,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub url: String,
    pub method: Method,
    pub accept: &'static str,
    pub body: Option<Value>,
    pub ticket: Ticket,
}

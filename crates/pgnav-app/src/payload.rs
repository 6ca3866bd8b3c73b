// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{RequestError, TargetKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// One row of table data or query output, keyed by column name.
pub type DataRow = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexInfo {
    pub index: String,
    #[serde(default)]
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub column_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Affected(i64),
    Rows {
        columns: Vec<String>,
        rows: Vec<DataRow>,
    },
}

/// A response body decoded according to the target key it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Connect { message: Option<String> },
    Validate { message: Option<String> },
    Close { message: Option<String> },
    Schemas(Vec<String>),
    Tables {
        schema: Option<String>,
        tables: Vec<String>,
    },
    Views(Vec<String>),
    Indexes(Vec<IndexInfo>),
    Columns(Vec<ColumnInfo>),
    TableData(Vec<DataRow>),
    Query(QueryResult),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemasBody {
    #[serde(default, deserialize_with = "null_as_empty")]
    schemas: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TablesBody {
    schema: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    tables: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ViewItem {
    Name(String),
    Described { view: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ViewsBody {
    Bare(Vec<ViewItem>),
    Keyed {
        #[serde(default, deserialize_with = "null_as_empty")]
        views: Vec<ViewItem>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IndexesBody {
    Bare(Vec<IndexInfo>),
    Keyed {
        #[serde(default, deserialize_with = "null_as_empty")]
        indexes: Vec<IndexInfo>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ColumnsBody {
    #[serde(default, deserialize_with = "null_as_empty")]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RowsBody {
    #[serde(default, deserialize_with = "null_as_empty")]
    rows: Vec<DataRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryBody {
    rows_affected: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    columns: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    rows: Vec<DataRow>,
}

impl Payload {
    pub fn decode(target: TargetKey, value: Value) -> Result<Self, RequestError> {
        // A `null` body is treated like an empty object so every field defaults.
        let value = if value.is_null() {
            Value::Object(Map::new())
        } else {
            value
        };

        let payload = match target {
            TargetKey::Connect => Self::Connect {
                message: parse::<MessageBody>(target, value)?.message,
            },
            TargetKey::Validate => Self::Validate {
                message: parse::<MessageBody>(target, value)?.message,
            },
            TargetKey::Close => Self::Close {
                message: parse::<MessageBody>(target, value)?.message,
            },
            TargetKey::Schemas => Self::Schemas(parse::<SchemasBody>(target, value)?.schemas),
            TargetKey::Tables => {
                let body = parse::<TablesBody>(target, value)?;
                Self::Tables {
                    schema: body.schema.filter(|schema| !schema.is_empty()),
                    tables: body.tables,
                }
            }
            TargetKey::Views => {
                let items = match parse::<ViewsBody>(target, value)? {
                    ViewsBody::Bare(items) | ViewsBody::Keyed { views: items } => items,
                };
                Self::Views(
                    items
                        .into_iter()
                        .map(|item| match item {
                            ViewItem::Name(name) | ViewItem::Described { view: name } => name,
                        })
                        .collect(),
                )
            }
            TargetKey::Indexes => match parse::<IndexesBody>(target, value)? {
                IndexesBody::Bare(items) | IndexesBody::Keyed { indexes: items } => {
                    Self::Indexes(items)
                }
            },
            TargetKey::Columns => Self::Columns(parse::<ColumnsBody>(target, value)?.columns),
            TargetKey::TableData => Self::TableData(parse::<RowsBody>(target, value)?.rows),
            TargetKey::Query => {
                let body = parse::<QueryBody>(target, value)?;
                Self::Query(match body.rows_affected {
                    Some(count) => QueryResult::Affected(count),
                    None => QueryResult::Rows {
                        columns: body.columns,
                        rows: body.rows,
                    },
                })
            }
        };
        Ok(payload)
    }
}

/// Collections sent as `null` read as empty, the same as when they are missing.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse<T: DeserializeOwned>(target: TargetKey, value: Value) -> Result<T, RequestError> {
    serde_json::from_value(value).map_err(|error| {
        RequestError::MalformedResponse(format!("decode {target} response: {error}"))
    })
}

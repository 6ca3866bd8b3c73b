// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ColumnInfo, DataRow, IndexInfo, QueryResult, Refresh, Selection};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub const NO_SCHEMAS: &str = "No schemas.";
pub const NO_TABLES: &str = "No tables.";
pub const NO_DATA: &str = "No data.";
pub const NO_INDEXES: &str = "No indexes.";
pub const NO_COLUMNS: &str = "No columns.";
pub const NO_ROWS: &str = "No rows.";
pub const LOADING: &str = "Loading…";
pub const NULL_MARKER: &str = "NULL";
pub const NO_CONSTRAINTS: &str = "—";
pub const DELIMITER: &str = ", ";
pub const COLUMN_HEADERS: [&str; 3] = ["Name", "Type", "Constraints"];

/// Display regions, one per kind of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionId {
    ConnectBanner,
    Schemas,
    Tables,
    Views,
    Indexes,
    Columns,
    TableData,
    QueryResult,
}

impl RegionId {
    pub const ALL: [Self; 8] = [
        Self::ConnectBanner,
        Self::Schemas,
        Self::Tables,
        Self::Views,
        Self::Indexes,
        Self::Columns,
        Self::TableData,
        Self::QueryResult,
    ];

    pub const fn title(self) -> &'static str {
        match self {
            Self::ConnectBanner => "connection",
            Self::Schemas => "schemas",
            Self::Tables => "tables",
            Self::Views => "views",
            Self::Indexes => "indexes",
            Self::Columns => "columns",
            Self::TableData => "data",
            Self::QueryResult => "query result",
        }
    }
}

impl Refresh {
    pub const fn region(self) -> RegionId {
        match self {
            Self::Schemas => RegionId::Schemas,
            Self::Tables => RegionId::Tables,
            Self::Views => RegionId::Views,
            Self::Indexes => RegionId::Indexes,
            Self::Columns => RegionId::Columns,
            Self::TableData => RegionId::TableData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellView {
    Text(String),
    Null,
}

impl CellView {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(value) => value,
            Self::Null => NULL_MARKER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellView>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub label: String,
    pub annotation: Option<String>,
    pub active: bool,
}

impl ItemView {
    fn plain(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            annotation: None,
            active: false,
        }
    }
}

/// The full content of one region. Rendering always replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionView {
    Placeholder(String),
    Items(Vec<ItemView>),
    Table(TableView),
    Message(String),
}

impl RegionView {
    pub fn placeholder(text: &str) -> Self {
        Self::Placeholder(text.to_owned())
    }

    pub fn items(&self) -> &[ItemView] {
        match self {
            Self::Items(items) => items,
            _ => &[],
        }
    }
}

pub fn schema_chip(selection: &Selection) -> String {
    if selection.has_schema() {
        format!("Schema: {}", selection.schema)
    } else {
        "No schema selected".to_owned()
    }
}

pub fn table_chip(selection: &Selection) -> String {
    if selection.has_table() {
        format!("Table: {}", selection.table)
    } else {
        "No table selected".to_owned()
    }
}

fn selectable_items(names: &[String], active: &str, empty: &str) -> RegionView {
    if names.is_empty() {
        return RegionView::placeholder(empty);
    }
    RegionView::Items(
        names
            .iter()
            .map(|name| ItemView {
                label: name.clone(),
                annotation: None,
                active: !active.is_empty() && name == active,
            })
            .collect(),
    )
}

pub fn render_schemas(names: &[String], selection: &Selection) -> RegionView {
    selectable_items(names, &selection.schema, NO_SCHEMAS)
}

pub fn render_tables(names: &[String], selection: &Selection) -> RegionView {
    selectable_items(names, &selection.table, NO_TABLES)
}

pub fn render_views(names: &[String]) -> RegionView {
    if names.is_empty() {
        return RegionView::placeholder(NO_DATA);
    }
    RegionView::Items(names.iter().map(ItemView::plain).collect())
}

pub fn render_indexes(indexes: &[IndexInfo]) -> RegionView {
    if indexes.is_empty() {
        return RegionView::placeholder(NO_INDEXES);
    }
    RegionView::Items(
        indexes
            .iter()
            .map(|index| ItemView {
                label: index.index.clone(),
                annotation: Some(index.table.clone()),
                active: false,
            })
            .collect(),
    )
}

pub fn render_columns(columns: &[ColumnInfo]) -> RegionView {
    if columns.is_empty() {
        return RegionView::placeholder(NO_COLUMNS);
    }
    RegionView::Table(TableView {
        columns: COLUMN_HEADERS.iter().map(|header| (*header).to_owned()).collect(),
        rows: columns
            .iter()
            .map(|column| {
                let constraints = if column.constraints.is_empty() {
                    NO_CONSTRAINTS.to_owned()
                } else {
                    column.constraints.join(DELIMITER)
                };
                vec![
                    CellView::Text(column.name.clone()),
                    CellView::Text(column.column_type.clone()),
                    CellView::Text(constraints),
                ]
            })
            .collect(),
    })
}

/// Table preview rows carry no column list; the first row's keys stand in.
pub fn render_table_data(rows: &[DataRow]) -> RegionView {
    let Some(first) = rows.first() else {
        return RegionView::placeholder(NO_ROWS);
    };
    let columns: Vec<String> = first.keys().cloned().collect();
    render_result_table(&columns, rows)
}

pub fn render_query(result: &QueryResult) -> RegionView {
    match result {
        QueryResult::Affected(count) => RegionView::Message(format!("{count} row(s) affected.")),
        QueryResult::Rows { columns, rows } => render_result_table(columns, rows),
    }
}

pub fn render_result_table(columns: &[String], rows: &[DataRow]) -> RegionView {
    if columns.is_empty() {
        return RegionView::placeholder(NO_DATA);
    }
    RegionView::Table(TableView {
        columns: columns.to_vec(),
        rows: rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| format_cell(row.get(column)))
                    .collect()
            })
            .collect(),
    })
}

pub fn format_cell(value: Option<&Value>) -> CellView {
    match value {
        None | Some(Value::Null) => CellView::Null,
        Some(Value::Array(items)) => CellView::Text(
            items
                .iter()
                .map(scalar_text)
                .collect::<Vec<_>>()
                .join(DELIMITER),
        ),
        Some(other) => CellView::Text(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Current content of every region the host lays out. Regions outside the
/// layout never receive content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regions {
    layout: BTreeSet<RegionId>,
    content: BTreeMap<RegionId, RegionView>,
}

impl Default for Regions {
    fn default() -> Self {
        Self::with_layout(RegionId::ALL)
    }
}

impl Regions {
    pub fn with_layout(layout: impl IntoIterator<Item = RegionId>) -> Self {
        Self {
            layout: layout.into_iter().collect(),
            content: BTreeMap::new(),
        }
    }

    pub fn contains(&self, region: RegionId) -> bool {
        self.layout.contains(&region)
    }

    pub fn get(&self, region: RegionId) -> Option<&RegionView> {
        self.content.get(&region)
    }

    pub fn replace(&mut self, region: RegionId, view: RegionView) {
        if self.contains(region) {
            self.content.insert(region, view);
        }
    }

    /// Marks the item labelled `label` active and clears its siblings.
    pub fn mark_active(&mut self, region: RegionId, label: &str) {
        if let Some(RegionView::Items(items)) = self.content.get_mut(&region) {
            for item in items {
                item.active = item.label == label;
            }
        }
    }
}

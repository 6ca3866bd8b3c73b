// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Snapshot of what the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub api_base: String,
    pub schema: String,
    pub table: String,
}

impl Selection {
    pub fn has_schema(&self) -> bool {
        !self.schema.is_empty()
    }

    pub fn has_table(&self) -> bool {
        !self.table.is_empty()
    }
}

/// What part of the selection a response depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Schema,
    Table,
}

/// Owns the selection. `table` is only meaningful while `schema` is set, so
/// every schema change clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionStore {
    current: Selection,
    schema_generation: u64,
    table_generation: u64,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl SelectionStore {
    pub fn new(api_base: &str) -> Self {
        let api_base = if api_base.trim().is_empty() {
            DEFAULT_API_BASE
        } else {
            api_base.trim()
        };
        Self {
            current: Selection {
                api_base: api_base.to_owned(),
                schema: String::new(),
                table: String::new(),
            },
            schema_generation: 0,
            table_generation: 0,
        }
    }

    pub fn get(&self) -> &Selection {
        &self.current
    }

    /// Counts changes to the part of the selection named by `scope`;
    /// requests remember the value they were issued under. A table change
    /// leaves the schema generation alone, a schema change bumps both.
    pub fn generation(&self, scope: Scope) -> u64 {
        match scope {
            Scope::Schema => self.schema_generation,
            Scope::Table => self.table_generation,
        }
    }

    pub fn set_api_base(&mut self, value: &str) {
        self.current.api_base = value.to_owned();
    }

    pub fn set_schema(&mut self, value: &str) {
        self.current.schema = value.to_owned();
        self.current.table.clear();
        self.schema_generation = self.schema_generation.wrapping_add(1);
        self.table_generation = self.table_generation.wrapping_add(1);
    }

    pub fn set_table(&mut self, value: &str) {
        self.current.table = value.to_owned();
        self.table_generation = self.table_generation.wrapping_add(1);
    }
}

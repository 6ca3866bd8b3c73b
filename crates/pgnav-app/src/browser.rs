// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    Completion, LOADING, Missing, NotificationChannel, Payload, PreparedRequest, Refresh, RegionId,
    RegionView, Regions, RequestDescriptor, RequestError, Selection, SelectionStore, TargetKey,
    Ticket, dispatch, render_columns, render_indexes, render_query, render_schemas,
    render_table_data, render_tables, render_views, rewrite, schema_chip, table_chip,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between startup and the automatic schema-list load.
pub const STARTUP_DELAY: Duration = Duration::from_millis(500);

const SCHEMA_CASCADE: [Refresh; 3] = [Refresh::Tables, Refresh::Views, Refresh::Indexes];
const TABLE_CASCADE: [Refresh; 2] = [Refresh::Columns, Refresh::TableData];

/// Hands prepared requests to whatever performs HTTP.
pub trait RequestSink {
    fn submit(&mut self, request: PreparedRequest) -> Result<(), RequestError>;
}

impl RequestSink for Vec<PreparedRequest> {
    fn submit(&mut self, request: PreparedRequest) -> Result<(), RequestError> {
        self.push(request);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Rendered(TargetKey),
    Stale(TargetKey),
    Unrendered,
    Failed,
}

/// The selection state machine: rewrites requests against the current
/// selection, applies responses to regions, and cascades selection changes
/// into dependent refreshes.
#[derive(Debug, Clone)]
pub struct Browser {
    selection: SelectionStore,
    regions: Regions,
    notifications: NotificationChannel,
    next_ticket: u64,
    booted: bool,
}

impl Browser {
    pub fn new(api_base: &str) -> Self {
        Self::with_regions(api_base, Regions::default())
    }

    pub fn with_regions(api_base: &str, regions: Regions) -> Self {
        Self {
            selection: SelectionStore::new(api_base),
            regions,
            notifications: NotificationChannel::default(),
            next_ticket: 0,
            booted: false,
        }
    }

    pub fn selection(&self) -> &Selection {
        self.selection.get()
    }

    pub fn regions(&self) -> &Regions {
        &self.regions
    }

    pub fn notifications(&self) -> &NotificationChannel {
        &self.notifications
    }

    pub fn schema_chip(&self) -> String {
        schema_chip(self.selection.get())
    }

    pub fn table_chip(&self) -> String {
        table_chip(self.selection.get())
    }

    pub fn notify(&mut self, message: &str) {
        self.notifications.show(message);
    }

    /// Issues the schema-list load the first time it is called.
    pub fn boot(&mut self, sink: &mut impl RequestSink) -> bool {
        if self.booted {
            return false;
        }
        self.booted = true;
        self.refresh(Refresh::Schemas, sink);
        true
    }

    /// Stores a new API base and returns it for persisting. Blank input is
    /// rejected so the base never becomes empty.
    pub fn set_api_base(&mut self, raw: &str) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() {
            self.notify("API base must not be empty");
            return None;
        }
        self.selection.set_api_base(value);
        self.notify("API base updated");
        Some(value.to_owned())
    }

    pub fn select_schema(&mut self, schema: &str, sink: &mut impl RequestSink) {
        self.selection.set_schema(schema);
        self.regions.mark_active(RegionId::Schemas, schema);
        self.regions
            .replace(RegionId::Tables, RegionView::placeholder(LOADING));
        for refresh in SCHEMA_CASCADE {
            self.refresh(refresh, sink);
        }
    }

    pub fn select_table(&mut self, table: &str, sink: &mut impl RequestSink) {
        if !self.selection.get().has_schema() {
            self.report(&RequestError::PreconditionUnmet(Missing::Schema));
            return;
        }
        self.selection.set_table(table);
        self.regions.mark_active(RegionId::Tables, table);
        for refresh in TABLE_CASCADE {
            self.refresh(refresh, sink);
        }
    }

    /// Reloads one region. Regions missing from the layout are skipped.
    pub fn refresh(&mut self, refresh: Refresh, sink: &mut impl RequestSink) -> Option<Ticket> {
        if !self.regions.contains(refresh.region()) {
            debug!(?refresh, "region not laid out; skipping refresh");
            return None;
        }
        self.request(&refresh.descriptor(), sink)
    }

    pub fn run_query(&mut self, sql: &str, sink: &mut impl RequestSink) -> Option<Ticket> {
        let sql = sql.trim();
        if sql.is_empty() {
            self.notify("Query must not be empty");
            return None;
        }
        self.request(&RequestDescriptor::query(sql), sink)
    }

    /// Rewrites `descriptor` against the selection and submits it. Blocked
    /// requests never reach the sink and leave exactly one notification.
    pub fn request(
        &mut self,
        descriptor: &RequestDescriptor,
        sink: &mut impl RequestSink,
    ) -> Option<Ticket> {
        let ticket = self.issue_ticket(descriptor.target);
        let prepared = match rewrite(descriptor, self.selection.get(), ticket) {
            Ok(prepared) => prepared,
            Err(error) => {
                debug!(template = %descriptor.template, %error, "request blocked");
                self.report(&error);
                return None;
            }
        };

        debug!(
            id = ticket.id,
            method = prepared.method.as_str(),
            url = %prepared.url,
            "submitting request"
        );
        if let Err(error) = sink.submit(prepared) {
            self.report(&error);
            return None;
        }
        Some(ticket)
    }

    /// Applies a finished request. Failures always notify; successful
    /// responses for a selection that has since changed are dropped.
    pub fn complete(&mut self, ticket: Ticket, completion: &Completion) -> CompletionOutcome {
        let payload = match dispatch(ticket.target, completion) {
            Ok(Some(payload)) => payload,
            Ok(None) => return CompletionOutcome::Unrendered,
            Err(error) => {
                self.report(&error);
                return CompletionOutcome::Failed;
            }
        };

        let Some(target) = ticket.target else {
            return CompletionOutcome::Unrendered;
        };
        let current = target.scope().map(|scope| self.selection.generation(scope));
        if current.is_some_and(|generation| generation != ticket.generation) {
            debug!(id = ticket.id, %target, "dropping stale response");
            return CompletionOutcome::Stale(target);
        }

        self.apply(payload);
        CompletionOutcome::Rendered(target)
    }

    fn apply(&mut self, payload: Payload) {
        let selection = self.selection.get();
        match payload {
            Payload::Connect { message } => {
                let text = non_blank(message).unwrap_or_else(|| "Connected".to_owned());
                self.regions
                    .replace(RegionId::ConnectBanner, RegionView::Message(text));
            }
            Payload::Validate { message } => {
                let text = non_blank(message);
                self.notify(text.as_deref().unwrap_or("Connection healthy"));
            }
            Payload::Close { message } => {
                self.regions.replace(
                    RegionId::ConnectBanner,
                    RegionView::placeholder("Not connected"),
                );
                let text = non_blank(message);
                self.notify(text.as_deref().unwrap_or("Connection closed"));
            }
            Payload::Schemas(names) => {
                let view = render_schemas(&names, selection);
                self.regions.replace(RegionId::Schemas, view);
            }
            Payload::Tables { schema, tables } => {
                if schema.as_deref().is_some_and(|echoed| echoed != selection.schema) {
                    debug!(?schema, current = %selection.schema, "tables response names another schema");
                }
                let view = render_tables(&tables, selection);
                self.regions.replace(RegionId::Tables, view);
            }
            Payload::Views(names) => self.regions.replace(RegionId::Views, render_views(&names)),
            Payload::Indexes(indexes) => self
                .regions
                .replace(RegionId::Indexes, render_indexes(&indexes)),
            Payload::Columns(columns) => self
                .regions
                .replace(RegionId::Columns, render_columns(&columns)),
            Payload::TableData(rows) => self
                .regions
                .replace(RegionId::TableData, render_table_data(&rows)),
            Payload::Query(result) => self
                .regions
                .replace(RegionId::QueryResult, render_query(&result)),
        }
    }

    fn issue_ticket(&mut self, target: Option<TargetKey>) -> Ticket {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let generation = target
            .and_then(TargetKey::scope)
            .map(|scope| self.selection.generation(scope))
            .unwrap_or_default();
        Ticket {
            id: self.next_ticket,
            target,
            generation,
        }
    }

    fn report(&mut self, error: &RequestError) {
        match error.notification() {
            Some(message) => self.notify(&message),
            None => warn!(%error, "request error without user-facing message"),
        }
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|text| !text.trim().is_empty())
}

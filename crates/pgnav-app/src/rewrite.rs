// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Missing, PreparedRequest, RequestDescriptor, RequestError, Selection, Ticket};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

pub const ACCEPT_JSON: &str = "application/json";

const SCHEMA_PLACEHOLDER: &str = "{schema}";
const TABLE_PLACEHOLDER: &str = "{table}";

// Same unreserved set as JavaScript's encodeURIComponent.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Fills `{schema}` and `{table}` from the selection. A placeholder whose
/// value is not selected yet blocks the whole request.
pub fn resolve_template(template: &str, selection: &Selection) -> Result<String, RequestError> {
    let mut path = template.to_owned();
    if path.contains(SCHEMA_PLACEHOLDER) {
        if !selection.has_schema() {
            return Err(RequestError::PreconditionUnmet(Missing::Schema));
        }
        path = path.replace(SCHEMA_PLACEHOLDER, &encode_segment(&selection.schema));
    }
    if path.contains(TABLE_PLACEHOLDER) {
        if !selection.has_table() {
            return Err(RequestError::PreconditionUnmet(Missing::Table));
        }
        path = path.replace(TABLE_PLACEHOLDER, &encode_segment(&selection.table));
    }
    Ok(path)
}

pub fn is_absolute_http(path: &str) -> bool {
    let lower = path.chars().take(6).collect::<String>().to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:")
}

pub fn build_api_url(api_base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        api_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn rewrite(
    descriptor: &RequestDescriptor,
    selection: &Selection,
    ticket: Ticket,
) -> Result<PreparedRequest, RequestError> {
    let path = resolve_template(&descriptor.template, selection)?;
    let url = if is_absolute_http(&path) {
        path
    } else {
        build_api_url(&selection.api_base, &path)
    };

    Ok(PreparedRequest {
        url,
        method: descriptor.method,
        accept: ACCEPT_JSON,
        body: descriptor.body.clone(),
        ticket,
    })
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use pgnav_app::{Completion, Method, PreparedRequest};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes prepared requests against a pgweb server.
#[derive(Debug, Clone)]
pub struct Client {
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            bail!("api.timeout must be positive");
        }
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self { timeout, http })
    }

    /// Performs `request` and reports how it ended. Non-2xx responses keep
    /// their body so the caller can show the server's message.
    pub fn execute(&self, request: &PreparedRequest) -> Completion {
        let builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };
        let builder = builder.header(ACCEPT, request.accept);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = match builder.send() {
            Ok(response) => response,
            Err(error) => {
                return Completion::Transport {
                    error: self.transport_error(&request.url, &error),
                };
            }
        };

        let status = response.status().as_u16();
        debug!(id = request.ticket.id, status, url = %request.url, "request finished");
        match response.text() {
            Ok(body) => Completion::Response { status, body },
            Err(error) => Completion::Transport {
                error: format!("read response from {}: {error}", origin(&request.url)),
            },
        }
    }

    fn transport_error(&self, url: &str, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            return format!(
                "request to {} timed out after {}s -- raise api.timeout or check the server",
                origin(url),
                self.timeout.as_secs_f32()
            );
        }
        connection_error(url, error)
    }
}

/// Checks that `raw` is an absolute http(s) URL usable as the API base.
pub fn validate_api_base(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("API base must not be empty; pass a URL like http://localhost:8080");
    }
    let url = Url::parse(trimmed).with_context(|| format!("parse API base {trimmed:?}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(anyhow!(
                "API base {trimmed:?} uses unsupported scheme {other}; use http or https"
            ));
        }
    }
    if url.host_str().is_none() {
        bail!("API base {trimmed:?} has no host");
    }
    Ok(url)
}

fn connection_error(url: &str, error: &reqwest::Error) -> String {
    format!(
        "cannot reach {} -- start pgweb or update the API base ({error})",
        origin(url)
    )
}

fn origin(url: &str) -> String {
    Url::parse(url)
        .map(|parsed| parsed.origin().ascii_serialization())
        .unwrap_or_else(|_| url.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{Client, origin, validate_api_base};
    use std::time::Duration;

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Client::new(Duration::ZERO).is_err());
    }

    #[test]
    fn origin_drops_path_and_query() {
        assert_eq!(
            origin("http://db.local:8081/schemas/public/tables?x=1"),
            "http://db.local:8081"
        );
        assert_eq!(origin("not a url"), "not a url");
    }

    #[test]
    fn api_base_must_be_http() {
        assert!(validate_api_base("http://localhost:8080").is_ok());
        assert!(validate_api_base("HTTPS://example.com/pgweb/").is_ok());
        assert!(validate_api_base("ftp://example.com").is_err());
        assert!(validate_api_base("localhost:8080/api").is_err());
        assert!(validate_api_base("  ").is_err());
    }
}

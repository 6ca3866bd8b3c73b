// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pgnav_api::Client;
use pgnav_app::{Completion, ConnectionParams, PreparedRequest};
use pgnav_prefs::PrefStore;
use pgnav_tui::InternalEvent;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Wires the TUI to the pgweb HTTP client and the prefs store.
pub struct ApiRuntime {
    client: Client,
    prefs: PrefStore,
    connection_defaults: ConnectionParams,
}

impl ApiRuntime {
    pub fn new(client: Client, prefs: PrefStore, connection_defaults: ConnectionParams) -> Self {
        Self {
            client,
            prefs,
            connection_defaults,
        }
    }
}

impl pgnav_tui::AppRuntime for ApiRuntime {
    fn execute(&mut self, request: &PreparedRequest) -> Completion {
        self.client.execute(request)
    }

    fn save_api_base(&mut self, api_base: &str) -> Result<()> {
        pgnav_api::validate_api_base(api_base)?;
        self.prefs.put_api_base(api_base)
    }

    fn connection_defaults(&self) -> ConnectionParams {
        self.connection_defaults.clone()
    }

    fn spawn_request(&mut self, request: PreparedRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("pgnav-request-{}", request.ticket.id))
            .spawn(move || {
                let ticket = request.ticket;
                let completion = client.execute(&request);
                if tx
                    .send(InternalEvent::Completed { ticket, completion })
                    .is_err()
                {
                    debug!(id = ticket.id, "UI gone before request finished");
                }
            })
            .context("spawn request thread")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::Result;
    use pgnav_api::Client;
    use pgnav_app::{Completion, ConnectionParams, Method, PreparedRequest, Ticket};
    use pgnav_prefs::PrefStore;
    use pgnav_testkit::DemoApi;
    use pgnav_tui::{AppRuntime, InternalEvent};
    use std::sync::mpsc;
    use std::time::Duration;

    fn runtime() -> Result<ApiRuntime> {
        let prefs = PrefStore::open_memory()?;
        prefs.bootstrap()?;
        Ok(ApiRuntime::new(
            Client::new(Duration::from_secs(5))?,
            prefs,
            ConnectionParams {
                database: "shop".to_owned(),
                ..ConnectionParams::default()
            },
        ))
    }

    fn schemas_request(base_url: &str, id: u64) -> PreparedRequest {
        PreparedRequest {
            url: format!("{base_url}/schemas"),
            method: Method::Get,
            accept: pgnav_app::ACCEPT_JSON,
            body: None,
            ticket: Ticket {
                id,
                target: None,
                generation: 0,
            },
        }
    }

    #[test]
    fn execute_reaches_demo_server() -> Result<()> {
        let api = DemoApi::start()?;
        let mut runtime = runtime()?;
        let completion = runtime.execute(&schemas_request(api.base_url(), 1));
        assert!(completion.is_success(), "{completion:?}");
        assert_eq!(api.requests(), vec!["GET /schemas"]);
        Ok(())
    }

    #[test]
    fn spawned_request_reports_through_channel() -> Result<()> {
        let api = DemoApi::start()?;
        let mut runtime = runtime()?;
        let (tx, rx) = mpsc::channel();
        runtime.spawn_request(schemas_request(api.base_url(), 7), tx)?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        let InternalEvent::Completed { ticket, completion } = event else {
            panic!("expected completion event");
        };
        assert_eq!(ticket.id, 7);
        let Completion::Response { status, body } = completion else {
            panic!("expected HTTP response");
        };
        assert_eq!(status, 200);
        assert!(body.contains("reporting"));
        Ok(())
    }

    #[test]
    fn save_api_base_persists_valid_urls_only() -> Result<()> {
        let mut runtime = runtime()?;
        runtime.save_api_base("http://pgweb.internal:8081")?;
        assert_eq!(
            runtime.prefs.get_api_base()?.as_deref(),
            Some("http://pgweb.internal:8081")
        );

        let error = runtime
            .save_api_base("not a url")
            .expect_err("invalid URL should not be saved");
        assert!(format!("{error:#}").contains("parse API base"));
        assert_eq!(
            runtime.prefs.get_api_base()?.as_deref(),
            Some("http://pgweb.internal:8081")
        );
        Ok(())
    }

    #[test]
    fn connection_defaults_come_from_construction() -> Result<()> {
        let runtime = runtime()?;
        assert_eq!(runtime.connection_defaults().database, "shop");
        Ok(())
    }
}

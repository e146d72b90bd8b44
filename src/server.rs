//! HTTP surface: the dashboard at `/` and the mark-read action at `/read/`.

use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpListener, TcpStream},
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::{
    domain::RepoFilter,
    github::NotificationSource,
    markdown::MarkdownRenderer,
    microserver::{self, HttpRequest, HttpResponse},
    pipeline,
    view::PageTemplate,
};

/// Upstream answers for a successful repository mark-read.
const RESET_CONTENT: u16 = 205;
const ACCEPTED: u16 = 202;

/// How long a connection may stay silent before its thread gives up on it.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by every connection.
pub struct Dashboard {
    source: Arc<dyn NotificationSource>,
    filter: RepoFilter,
    template: PageTemplate,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn NotificationSource>,
        filter: RepoFilter,
        template: PageTemplate,
    ) -> Self {
        Self {
            source,
            filter,
            template,
        }
    }

    pub fn route(&self, request: &HttpRequest) -> HttpResponse {
        let (path, query) = request.path_and_query();
        info!(method = %request.method, path, "request");

        let response = match (request.method.as_str(), path) {
            ("GET", "/") => self.handle_dashboard(),
            ("GET", "/read/" | "/read") => self.handle_mark_read(query),
            (_, "/" | "/read/" | "/read") => self.error_page(405, "Only GET is supported"),
            _ => self.error_page(404, "Not found"),
        };
        with_security_headers(response)
    }

    fn handle_dashboard(&self) -> HttpResponse {
        let renderer = MarkdownRenderer::new();
        match pipeline::aggregate(self.source.as_ref(), &renderer, &self.filter, Utc::now()) {
            Ok(view) => HttpResponse::html(200, self.template.dashboard(&view).into_string()),
            Err(err) => {
                error!("dashboard failed: {err}");
                self.error_page(502, &err.to_string())
            }
        }
    }

    fn handle_mark_read(&self, query: &str) -> HttpResponse {
        let Some(raw) = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "time")
            .map(|(_, value)| value.into_owned())
        else {
            return self.error_page(400, "Missing time parameter");
        };

        let last_read_at = match DateTime::parse_from_rfc3339(&raw) {
            Ok(time) => time.with_timezone(&Utc),
            Err(err) => {
                warn!(time = %raw, "rejecting mark-read: {err}");
                return self.error_page(400, &format!("Invalid RFC3339 timestamp {raw:?}"));
            }
        };

        let (owner, name) = (&self.filter.owner, &self.filter.name);
        match self
            .source
            .mark_repository_read(owner, name, last_read_at)
        {
            Ok(RESET_CONTENT | ACCEPTED) => {
                info!(repo = %self.filter.full_name(), %last_read_at, "marked read");
                HttpResponse::redirect("/")
            }
            Ok(status) => {
                error!(status, "mark-read answered with unexpected status");
                self.error_page(502, &format!("GitHub answered mark-read with {status}"))
            }
            Err(err) => {
                error!("mark-read failed: {err}");
                self.error_page(502, &err.to_string())
            }
        }
    }

    fn error_page(&self, status: u16, message: &str) -> HttpResponse {
        HttpResponse::html(status, self.template.error(status, message).into_string())
    }

    fn handle_connection(&self, stream: &mut (impl Read + Write)) {
        let response = match microserver::read_request(stream) {
            Ok(Some(request)) => self.route(&request),
            Ok(None) => return,
            Err(err) => {
                warn!("malformed request: {err}");
                with_security_headers(self.error_page(400, &err.to_string()))
            }
        };

        // The client may already be gone.
        if let Err(err) = microserver::write_response(stream, &response) {
            warn!("failed to write response: {err}");
        }
    }
}

fn with_security_headers(response: HttpResponse) -> HttpResponse {
    response
        .with_header("X-Content-Type-Options", "nosniff")
        .with_header("X-Frame-Options", "DENY")
}

/// Bounds how long an idle peer can hold a connection thread.
fn prepare_stream(stream: &TcpStream) -> io::Result<()> {
    stream.set_read_timeout(Some(READ_TIMEOUT))
}

/// Binds `addr` and serves each connection on its own thread.
pub fn run_server(addr: &str, dashboard: Dashboard) -> Result<()> {
    let listener = TcpListener::bind(addr).with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    let dashboard = Arc::new(dashboard);
    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = prepare_stream(&stream) {
                    warn!("failed to configure connection: {err}");
                    continue;
                }
                let dashboard = Arc::clone(&dashboard);
                thread::spawn(move || {
                    dashboard.handle_connection(&mut stream);
                    let _ = stream.shutdown(Shutdown::Write);
                });
            }
            Err(err) => warn!("accept error: {err}"),
        }
    }
    Ok(())
}

//! HTTP front-end (tiny_http), one request at a time.
//!
//! Маршруты:
//!   GET  /                          -> форма регистрации
//!   POST /                          -> регистрация (x-www-form-urlencoded)
//!   GET  /student/{student_id}      -> профиль | 404 "Student not found!"
//!   GET  /static/qrcodes/{filename} -> PNG
//!   GET  /health                    -> "OK"
//!   GET  /metrics                   -> Prometheus text
//!
//! `route()` is a pure function of (app, method, url, body) so it can be tested
//! without sockets; `HttpServer` only moves bytes between tiny_http and `route()`.

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use percent_encoding::percent_decode_str;
use std::io::Read;
use std::net::SocketAddr;
use tiny_http::{Header, Request, Response, Server};

use crate::app::{App, AppError, RegistrationForm};
use crate::consts::{NOT_FOUND_BODY, QR_URL_PREFIX};
use crate::metrics;
use crate::views;

const CT_HTML: &str = "text/html; charset=utf-8";
const CT_TEXT: &str = "text/plain; charset=utf-8";
const CT_PNG: &str = "image/png";
const CT_PROM: &str = "text/plain; version=0.0.4";

/// A fully built response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: CT_HTML,
            body: body.into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: CT_TEXT,
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }
}

impl From<AppError> for Reply {
    fn from(e: AppError) -> Self {
        let status = e.status();
        if status >= 500 {
            error!("request failed: {}", e);
            Reply::text(status, "Internal Server Error")
        } else {
            metrics::record_bad_request();
            warn!("bad request: {}", e);
            Reply::text(status, &e.to_string())
        }
    }
}

fn not_found() -> Reply {
    Reply::text(404, "not found\n")
}

fn method_not_allowed() -> Reply {
    Reply::text(405, "method not allowed\n")
}

fn register(app: &App, body: &[u8]) -> Result<Reply, AppError> {
    let student = RegistrationForm::from_urlencoded(body)?.validate()?;
    let reg = app.register(student)?;
    Ok(Reply::html(
        200,
        views::result_page(
            &reg.filename,
            &reg.record.name,
            &reg.record.grade,
            &reg.profile_url,
        ),
    ))
}

fn profile(app: &App, student_id: &str) -> Result<Reply, AppError> {
    match app.view_profile(student_id)? {
        Some(rec) => Ok(Reply::html(200, views::student_page(&rec))),
        None => Ok(Reply::text(404, NOT_FOUND_BODY)),
    }
}

fn qr_image(app: &App, encoded: &str) -> Result<Reply, AppError> {
    let name = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|_| AppError::BadRequest("file name is not valid UTF-8".to_string()))?;
    match app.read_qr(&name)? {
        Some(bytes) => Ok(Reply {
            status: 200,
            content_type: CT_PNG,
            body: bytes,
        }),
        None => Ok(not_found()),
    }
}

fn metrics_text(app: &App) -> Reply {
    Reply {
        status: 200,
        content_type: CT_PROM,
        body: metrics::snapshot()
            .to_prometheus(app.record_count())
            .into_bytes(),
    }
}

/// Dispatch one request.
pub fn route(app: &App, method: &str, url: &str, body: &[u8]) -> Reply {
    metrics::record_http_request();
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or("");
    let get = method == "GET" || method == "HEAD";

    let res = match path {
        "/" => match method {
            "GET" | "HEAD" => Ok(Reply::html(200, views::index_page())),
            "POST" => register(app, body),
            _ => Ok(method_not_allowed()),
        },
        "/health" | "/ready" if get => Ok(Reply::text(200, "OK\n")),
        "/metrics" if get => Ok(metrics_text(app)),
        p if p.starts_with("/student/") => {
            let raw = &p["/student/".len()..];
            if raw.is_empty() || raw.contains('/') {
                Ok(not_found())
            } else if !get {
                Ok(method_not_allowed())
            } else {
                match percent_decode_str(raw).decode_utf8() {
                    Ok(id) => profile(app, &id),
                    Err(_) => Err(AppError::BadRequest(
                        "student id is not valid UTF-8".to_string(),
                    )),
                }
            }
        }
        p if p.starts_with(QR_URL_PREFIX) => {
            let name = &p[QR_URL_PREFIX.len()..];
            if !get {
                Ok(method_not_allowed())
            } else {
                qr_image(app, name)
            }
        }
        _ => Ok(not_found()),
    };
    res.unwrap_or_else(Reply::from)
}

pub struct HttpServer {
    server: Server,
    app: App,
}

impl HttpServer {
    pub fn bind(addr: &str, app: App) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
        Ok(Self { server, app })
    }

    /// Bound socket address (useful when binding port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Block for one request and answer it.
    pub fn handle_next(&self) -> Result<()> {
        let rq = self
            .server
            .recv()
            .map_err(|e| anyhow!("http recv: {}", e))?;
        self.respond(rq)
    }

    /// Serve forever. Receive errors are logged and skipped.
    pub fn run(&self) -> Result<()> {
        if let Some(addr) = self.local_addr() {
            info!("studentqr listening on {}", addr);
        }
        loop {
            if let Err(e) = self.handle_next() {
                warn!("{:#}", e);
            }
        }
    }

    fn respond(&self, mut rq: Request) -> Result<()> {
        let method = rq.method().as_str().to_string();
        let url = rq.url().to_string();

        let mut body = Vec::new();
        let reply = match rq.as_reader().read_to_end(&mut body) {
            Ok(_) => route(&self.app, &method, &url, &body),
            Err(e) => Reply::from(AppError::BadRequest(format!("read body: {}", e))),
        };
        debug!("{} {} -> {} ({} B)", method, url, reply.status, reply.body.len());

        let mut resp = Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(ct) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            resp.add_header(ct);
        }
        rq.respond(resp)
            .map_err(|e| anyhow!("http respond {} {}: {}", method, url, e))
    }
}

//! Echo request handler.
//!
//! Handles one HTTP request:
//! - Require POST and a Content-Length header
//! - Read exactly that many bytes and decode them as UTF-8
//! - Stamp an [`EchoRecord`], append it to the journal
//! - Return the same JSON text as the response body
//!
//! Failures map to a status code via [`EchoError::status`] and never
//! propagate to the connection. The decoded message is also printed to an
//! [`EchoOutput`]; a broken output is logged and otherwise ignored.

use crate::error::EchoError;
use crate::journal::Journal;
use crate::record::{server_label, EchoRecord};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::fmt::Display;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Destination for operator-visible output, normally stdout
pub type EchoOutput = Arc<Mutex<dyn Write + Send>>;

/// Write one line to `output`. Write errors are logged, never raised.
pub fn print_line(output: &Mutex<dyn Write + Send>, line: &str) {
    let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        warn!(error = %e, "Failed to write output line");
    }
}

/// Addresses captured once per accepted connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client_ip: IpAddr,
    pub server: String,
}

impl ConnectionInfo {
    pub fn new(peer: SocketAddr, local: io::Result<SocketAddr>) -> Self {
        ConnectionInfo {
            client_ip: peer.ip(),
            server: server_label(local),
        }
    }
}

/// Serve one request. Always yields a response.
pub async fn handle_request<B>(
    req: Request<B>,
    conn: Arc<ConnectionInfo>,
    journal: Arc<Journal>,
    output: EchoOutput,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    if req.method() != Method::POST {
        debug!(method = %req.method(), path = %req.uri().path(), "Unsupported method");
        return Ok(text_response(
            StatusCode::NOT_IMPLEMENTED,
            format!("Unsupported method ({})", req.method()),
        ));
    }

    match echo(req, &conn, &journal, &output).await {
        Ok(json) => Ok(json_response(json)),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                warn!(error = %e, client = %conn.client_ip, "Echo failed");
            } else {
                debug!(error = %e, client = %conn.client_ip, "Rejected request");
            }
            Ok(text_response(status, e.to_string()))
        }
    }
}

/// Read, record and journal a POST body, returning the record's JSON.
async fn echo<B>(
    req: Request<B>,
    conn: &ConnectionInfo,
    journal: &Journal,
    output: &Mutex<dyn Write + Send>,
) -> Result<String, EchoError>
where
    B: Body,
    B::Error: Display,
{
    let length = content_length(&req)?;

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| EchoError::BodyRead(e.to_string()))?
        .to_bytes();

    if body.len() != length {
        return Err(EchoError::BodyRead(format!(
            "expected {length} bytes, received {}",
            body.len()
        )));
    }

    let message = String::from_utf8(body.to_vec())?;
    print_line(output, &message);

    let record = EchoRecord::new(message, conn.client_ip, conn.server.clone());
    let json = record.to_json()?;
    journal.append(&json).await?;

    info!(client = %conn.client_ip, bytes = length, "Echoed message");
    Ok(json)
}

/// Parse the Content-Length header.
fn content_length<B>(req: &Request<B>) -> Result<usize, EchoError> {
    let value = req
        .headers()
        .get(CONTENT_LENGTH)
        .ok_or(EchoError::MissingContentLength)?;

    let text = value.to_str().map_err(|_| {
        EchoError::InvalidContentLength(String::from_utf8_lossy(value.as_bytes()).into_owned())
    })?;

    text.trim()
        .parse()
        .map_err(|_| EchoError::InvalidContentLength(text.to_string()))
}

fn json_response(json: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(json)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text_response(status: StatusCode, message: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

//! The echo record written to the journal and returned to the client.

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use serde::Serialize;
use std::io;
use std::net::{IpAddr, SocketAddr};

/// Placeholder used when the local socket address cannot be read.
pub const UNKNOWN_SERVER: &str = "unknown";

/// One echoed request.
///
/// Field order is part of the output format: serde serializes fields in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoRecord {
    /// RFC 3339 local time with numeric offset, second precision
    pub timestamp: String,
    /// Decoded request body
    pub message: String,
    /// Peer IP of the TCP connection
    pub client_ip: String,
    /// `<ip>:<port>` of the local endpoint, or `unknown`
    pub server: String,
}

impl EchoRecord {
    /// Build a record stamped with the current local time.
    pub fn new(message: String, client_ip: IpAddr, server: String) -> Self {
        Self::at(&Local::now(), message, client_ip, server)
    }

    /// Build a record stamped with the given time.
    pub fn at<Tz>(time: &DateTime<Tz>, message: String, client_ip: IpAddr, server: String) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        EchoRecord {
            timestamp: format_timestamp(time),
            message,
            client_ip: client_ip.to_string(),
            server,
        }
    }

    /// Render as JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS+HH:MM`.
///
/// UTC is rendered as `+00:00`, never `Z`.
pub fn format_timestamp<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Render the local endpoint for the `server` field.
///
/// IPv6 addresses are written without brackets, matching `<ip>:<port>`.
pub fn server_label(local: io::Result<SocketAddr>) -> String {
    match local {
        Ok(addr) => format!("{}:{}", addr.ip(), addr.port()),
        Err(_) => UNKNOWN_SERVER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use std::net::Ipv4Addr;

    fn sample() -> EchoRecord {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let time = offset.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        EchoRecord::at(
            &time,
            "hello".to_string(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7)),
            "0.0.0.0:8000".to_string(),
        )
    }

    #[test]
    fn test_timestamp_has_offset_and_seconds() {
        assert_eq!(sample().timestamp, "2024-01-15T10:30:00-05:00");
    }

    #[test]
    fn test_timestamp_utc_uses_numeric_offset() {
        let time = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 59).unwrap();
        assert_eq!(format_timestamp(&time), "2024-06-01T00:00:59+00:00");
    }

    #[test]
    fn test_timestamp_drops_subseconds() {
        let time = Local::now();
        let formatted = format_timestamp(&time);
        // 19 chars of date/time followed by a six char offset
        assert_eq!(formatted.len(), 25, "{formatted}");
        assert!(!formatted.contains('.'));
    }

    #[test]
    fn test_json_layout() {
        let json = sample().to_json().unwrap();
        let expected = "{\n  \"timestamp\": \"2024-01-15T10:30:00-05:00\",\n  \"message\": \"hello\",\n  \"client_ip\": \"192.168.1.7\",\n  \"server\": \"0.0.0.0:8000\"\n}";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_json_escapes_message() {
        let mut record = sample();
        record.message = "line one\n\"quoted\" \u{e9}".to_string();
        let json = record.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], "line one\n\"quoted\" \u{e9}");
    }

    #[test]
    fn test_server_label() {
        let addr: SocketAddr = "127.0.0.1:4242".parse().unwrap();
        assert_eq!(server_label(Ok(addr)), "127.0.0.1:4242");

        let addr: SocketAddr = "[::1]:4242".parse().unwrap();
        assert_eq!(server_label(Ok(addr)), "::1:4242");

        let err = io::Error::new(io::ErrorKind::NotConnected, "gone");
        assert_eq!(server_label(Err(err)), UNKNOWN_SERVER);
    }
}

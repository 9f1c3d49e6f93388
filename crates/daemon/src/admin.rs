//! HTTP admin surface (§4.10): a single GET handler on the monitor port,
//! layered over the same query/reload entry points the binary protocol and
//! signals use.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::index::IndexSlot;
use crate::query;

/// Serves the admin HTTP endpoint on `listener` until the process exits.
pub async fn serve(listener: TcpListener, slot: Arc<IndexSlot>, max_depth: usize, default_index_path: PathBuf) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tracing::debug!(%addr, "admin connection accepted");
                let slot = Arc::clone(&slot);
                let default_index_path = default_index_path.clone();
                tokio::spawn(async move {
                    if let Err(error) = handle(stream, &slot, max_depth, &default_index_path).await {
                        tracing::debug!(%error, "admin connection error");
                    }
                });
            }
            Err(error) => tracing::warn!(%error, "admin accept failed"),
        }
    }
}

async fn handle(mut stream: TcpStream, slot: &IndexSlot, max_depth: usize, default_index_path: &std::path::Path) -> std::io::Result<()> {
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let Some(target) = request_target(&request) else {
        return write_response(&mut stream, "400 Bad Request", "bad request").await;
    };

    let params = parse_query_string(target);
    match params.get("opt").map(String::as_str) {
        Some("get") => {
            let key = params.get("key").cloned().unwrap_or_default();
            let number: u32 = params.get("number").and_then(|n| n.parse().ok()).unwrap_or(0);
            let epoch = slot.current().await;
            let names = query::query(&epoch, &key, number, max_depth);
            if names.is_empty() {
                return write_status(&mut stream, "204 No Content").await;
            }
            let body = names.join("\n");
            write_response(&mut stream, "200 OK", &body).await
        }
        Some("reload") => {
            let path = params.get("indexpath").map(PathBuf::from).unwrap_or_else(|| default_index_path.to_owned());
            match slot.reload(&path).await {
                Ok(()) => write_response(&mut stream, "200 OK", "reloaded").await,
                Err(error) => {
                    // A busy reload is informational (retry later); a load
                    // failure is reported back as the request's own failure.
                    let status = match error.severity() {
                        core::error::Severity::Informational => "409 Conflict",
                        _ => "503 Service Unavailable",
                    };
                    write_response(&mut stream, status, &error.to_string()).await
                }
            }
        }
        _ => write_response(&mut stream, "400 Bad Request", "unknown opt").await,
    }
}

fn request_target(request: &str) -> Option<&str> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    if method != "GET" {
        return None;
    }
    parts.next()
}

fn parse_query_string(target: &str) -> std::collections::HashMap<String, String> {
    let query = target.split_once('?').map_or("", |(_, q)| q);
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((percent_decode(key), percent_decode(value)))
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    // Percent-escapes can split a multi-byte UTF-8 character across several
    // `%XX` triplets (query text here is CJK prefix text), so raw bytes are
    // accumulated and decoded once rather than per escape.
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match c {
            '+' => out.push(b' '),
            '%' => {
                let hi = chars.next();
                let lo = chars.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => match u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                        Ok(byte) => out.push(byte),
                        Err(_) => out.extend_from_slice(b"%"),
                    },
                    _ => out.push(b'%'),
                }
            }
            other => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned())
}

async fn write_status(stream: &mut TcpStream, status: &str) -> std::io::Result<()> {
    let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    stream.write_all(response.as_bytes()).await
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_opt_and_params_from_request_target() {
        let params = parse_query_string("/?opt=get&key=bei%20jing&number=5");
        assert_eq!(params.get("opt").unwrap(), "get");
        assert_eq!(params.get("key").unwrap(), "bei jing");
        assert_eq!(params.get("number").unwrap(), "5");
    }

    #[test]
    fn extracts_target_from_request_line() {
        let target = request_target("GET /?opt=reload&indexpath=/tmp/b.bin HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(target, "/?opt=reload&indexpath=/tmp/b.bin");
    }

    #[test]
    fn non_get_method_is_rejected() {
        assert!(request_target("POST / HTTP/1.1\r\n\r\n").is_none());
    }

    #[test]
    fn plus_decodes_to_space() {
        assert_eq!(percent_decode("a+b"), "a b");
    }

    #[test]
    fn multi_byte_utf8_escape_decodes_to_the_original_character() {
        // 北 is E5 8C 97 in UTF-8; each byte must combine before decoding,
        // not be interpreted as its own Latin-1 code point.
        assert_eq!(percent_decode("%E5%8C%97"), "北");
    }

    #[test]
    fn query_string_with_cjk_percent_escapes_round_trips() {
        let params = parse_query_string("/?opt=get&key=%E5%8C%97%E4%BA%AC");
        assert_eq!(params.get("key").unwrap(), "北京");
    }
}

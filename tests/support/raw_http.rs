//! Hand-written HTTP responses for cases a mock server cannot express, such
//! as a body that stops short of its advertised length.

#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What happens to the connection after the body bytes are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterBody {
    /// Close the socket, truncating the body.
    Close,
    /// Keep the socket open without sending anything more.
    Stall,
}

/// Serves a single `200 OK` that advertises `advertised_len` bytes but sends
/// only `body`.
///
/// Returns the base URL. The server task ends with the test runtime.
pub fn serve_short_body(
    listener: TcpListener,
    advertised_len: usize,
    body: Vec<u8>,
    after_body: AfterBody,
) -> String {
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/octet-stream\r\ncontent-length: {advertised_len}\r\n\r\n"
        );
        if socket.write_all(head.as_bytes()).await.is_err()
            || socket.write_all(&body).await.is_err()
            || socket.flush().await.is_err()
        {
            return;
        }

        if after_body == AfterBody::Stall {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    });
    base_url
}

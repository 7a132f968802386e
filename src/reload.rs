//! Live-reload plumbing for the development server.
//!
//! Browsers connect a WebSocket to `/_r`; after every rebuild the watcher
//! broadcasts an empty text message and the page script reloads itself. The
//! handshake is done by hand on top of the upgraded HTTP connection, which
//! keeps the reload channel on the same port as the site.

use std::collections::VecDeque;

use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use tiny_http::{Header, Request, Response};
use tungstenite::{Message, WebSocket, handshake::derive_accept_key, protocol::Role};

type Client = WebSocket<Box<dyn tiny_http::ReadWrite + Send>>;

/// Connected reload clients.
///
/// Clients are only ever written to. A send failure means the browser went
/// away, so the socket is dropped on the spot instead of being tracked.
#[derive(Default)]
pub struct ReloadHub {
    clients: Mutex<VecDeque<Client>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, client: Client) {
        self.clients.lock().push_back(client);
    }

    /// Broadcast a reload signal, pruning dead connections.
    ///
    /// Returns how many clients are still connected afterwards.
    pub fn notify_all(&self) -> usize {
        let mut clients = self.clients.lock();
        clients.retain_mut(|client| client.send(Message::text("")).is_ok());
        clients.len()
    }
}

/// Complete the WebSocket handshake over a raw HTTP request.
///
/// Consumes the request, answers `101 Switching Protocols` and hands back
/// the socket wrapped in a server-role WebSocket.
pub fn accept_websocket(request: Request) -> Result<Client> {
    let key = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Sec-WebSocket-Key"))
        .map(|header| header.value.clone())
        .ok_or_else(|| anyhow!("websocket request without Sec-WebSocket-Key"))?;

    let accept = derive_accept_key(key.as_str().as_bytes());
    let header = Header::from_bytes(&b"Sec-WebSocket-Accept"[..], accept.as_bytes())
        .map_err(|_| anyhow!("invalid Sec-WebSocket-Accept value"))?;
    let response = Response::empty(101).with_header(header);

    // tiny_http writes the response with Upgrade/Connection headers attached
    // and yields the underlying stream.
    let stream = request.upgrade("websocket", response);
    Ok(WebSocket::from_raw_socket(stream, Role::Server, None))
}

// ============================================================================
// Tests
// ============================================================================

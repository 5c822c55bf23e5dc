use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;

use super::{ChannelEvent, StreamChannel};
use crate::error::TransportError;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Stream-mode channel over a WebSocket.
///
/// Frames go out as binary messages; detector results come back as text.
/// Reads block for at most the poll interval given at connect time.
pub struct WsChannel {
    socket: Socket,
    closed: bool,
}

impl WsChannel {
    pub fn connect(url: &Url, poll: Duration) -> Result<Self, TransportError> {
        let (socket, response) = tungstenite::connect(url.as_str())?;
        log::info!(
            "stream channel open: {} (http {})",
            url.path(),
            response.status()
        );
        set_read_timeout(&socket, poll)?;
        Ok(Self {
            socket,
            closed: false,
        })
    }
}

fn set_read_timeout(socket: &Socket, poll: Duration) -> Result<(), TransportError> {
    let timeout = Some(poll.max(Duration::from_millis(1)));
    let result = match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout),
        MaybeTlsStream::Rustls(tls) => tls.sock.set_read_timeout(timeout),
        _ => Ok(()),
    };
    result.map_err(|e| TransportError::Network(format!("set read timeout: {}", e)))
}

impl StreamChannel for WsChannel {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Network("stream channel closed".into()));
        }
        self.socket.send(Message::Binary(frame)).map_err(|e| {
            self.closed = true;
            TransportError::from(e)
        })
    }

    fn recv(&mut self) -> Result<Option<ChannelEvent>, TransportError> {
        if self.closed {
            return Ok(Some(ChannelEvent::Closed));
        }
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Some(ChannelEvent::Message(text.into_bytes()))),
            Ok(Message::Binary(bytes)) => Ok(Some(ChannelEvent::Message(bytes))),
            Ok(Message::Close(frame)) => {
                log::info!("stream channel closed by peer: {:?}", frame);
                self.closed = true;
                Ok(Some(ChannelEvent::Closed))
            }
            // Ping/pong are answered inside tungstenite.
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.closed = true;
                Ok(Some(ChannelEvent::Closed))
            }
            Err(e) => {
                self.closed = true;
                Err(e.into())
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.socket.close(None) {
            log::debug!("stream close: {}", e);
        }
        // Best effort: push the close frame out without waiting for the reply.
        let _ = self.socket.flush();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.close();
    }
}

//! WebSocket progress transport.
//!
//! tungstenite is blocking, so every connection runs on a blocking task:
//! the socket is switched to nonblocking mode and polled, text frames are
//! pushed into a bounded channel, and the returned stream drains it.
//! Dropping the stream stops the reader and closes the socket.

use crate::config::models::ControllerConfig;
use crate::progress::transport::{ChannelError, FrameStream, ProgressTransport};
use af_protocol::progress_models::Verbosity;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

const SOCKET_IDLE_SLEEP: Duration = Duration::from_millis(40);
const SOCKET_BUFFER_CAPACITY: usize = 256;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Connects to `{base_url}/executions/{execution_id}`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    base_url: String,
    client_id: String,
}

impl WebSocketTransport {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(&config.progress_url, &config.client_id)
    }

    /// Connection URL for one execution.
    pub fn endpoint(&self, execution_id: &str, verbosity: Verbosity) -> String {
        format!(
            "{}/executions/{}?client_id={}&verbosity={}",
            self.base_url,
            urlencoding::encode(execution_id),
            urlencoding::encode(&self.client_id),
            verbosity.as_str()
        )
    }
}

#[async_trait]
impl ProgressTransport for WebSocketTransport {
    async fn connect(
        &self,
        execution_id: &str,
        verbosity: Verbosity,
    ) -> Result<FrameStream, ChannelError> {
        let url = self.endpoint(execution_id, verbosity);
        debug!(url = %url, "Opening progress socket");

        let mut socket = tokio::task::spawn_blocking(move || tungstenite::connect(url.as_str()))
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?
            .map(|(socket, _)| socket)
            .map_err(|e| ChannelError::Connect(e.to_string()))?;

        set_socket_nonblocking(&mut socket)?;

        let (tx, mut rx) = mpsc::channel(SOCKET_BUFFER_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let reader_stop = Arc::clone(&stop);
        tokio::task::spawn_blocking(move || read_frames(socket, tx, &reader_stop));

        let guard = StopOnDrop(stop);
        let stream: FrameStream = Box::pin(async_stream::stream! {
            let _guard = guard;
            while let Some(frame) = rx.recv().await {
                yield frame;
            }
        });
        Ok(stream)
    }
}

/// Signals the reader to stop when the frame stream is dropped.
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

fn read_frames(
    mut socket: Socket,
    tx: mpsc::Sender<Result<String, ChannelError>>,
    stop: &AtomicBool,
) {
    loop {
        if stop.load(Ordering::Relaxed) || tx.is_closed() {
            let _ = socket.close(None);
            let _ = socket.flush();
            break;
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if tx.blocking_send(Ok(text.to_string())).is_err() {
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = socket.send(Message::Pong(payload));
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
            Ok(Message::Close(_)) => break,
            Err(tungstenite::Error::Io(err))
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                thread::sleep(SOCKET_IDLE_SLEEP);
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                break
            }
            Err(err) => {
                warn!(error = %err, "Progress socket read failed");
                let _ = tx.blocking_send(Err(ChannelError::Read(err.to_string())));
                break;
            }
        }
    }
}

fn set_socket_nonblocking(socket: &mut Socket) -> Result<(), ChannelError> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_nonblocking(true),
        MaybeTlsStream::Rustls(stream) => stream.sock.set_nonblocking(true),
        _ => Ok(()),
    }
    .map_err(|e| ChannelError::Connect(format!("failed to configure progress socket: {e}")))
}

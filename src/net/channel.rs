//! Realtime channel collaborator.
//!
//! The session only sees [`Transport::connect`], [`Channel::send`],
//! [`Channel::close`] and a stream of [`ChannelSignal`]s. Reconnection policy
//! lives in the session, not here, so a voluntary close can never re-arm it.
//!
//! All WebSocket logic is gated behind `#[cfg(feature = "browser")]`.

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

/// Lifecycle and traffic notifications from one channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelSignal {
    /// The channel finished its handshake.
    Open,
    /// An inbound event.
    Message {
        /// Event name from the envelope.
        event: String,
        /// Event payload.
        data: Value,
    },
    /// The channel is gone; no further signals follow.
    Closed {
        /// Human-readable cause.
        reason: String,
    },
    /// A transient transport error; a `Closed` may or may not follow.
    Error(String),
}

/// Handler receiving every signal of one channel.
pub type SignalHandler = Rc<dyn Fn(ChannelSignal)>;

/// Failure to open a channel.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The transport refused the URL or could not start connecting.
    #[error("channel open failed: {0}")]
    Open(String),
}

/// One open duplex channel.
pub trait Channel {
    /// Send `event` with `data`. Returns `false` when the channel is gone.
    fn send(&self, event: &str, data: &Value) -> bool;
    /// Close the channel. Safe to call more than once.
    fn close(&self);
}

/// Factory for channels.
pub trait Transport {
    /// Start connecting to `url` with `params` as query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Open`] when connecting cannot even start.
    fn connect(
        &self,
        url: &str,
        params: &BTreeMap<String, String>,
        on_signal: SignalHandler,
    ) -> Result<Box<dyn Channel>, ChannelError>;
}

/// Decode one text frame into a signal. Malformed frames yield `None`.
#[must_use]
pub fn decode_signal(text: &str) -> Option<ChannelSignal> {
    match super::types::Envelope::decode(text) {
        Ok(envelope) => Some(ChannelSignal::Message { event: envelope.event, data: envelope.data }),
        Err(err) => {
            log::warn!("waitroom: dropping malformed channel frame: {err}");
            None
        }
    }
}

/// Encode an outbound event as channel text.
#[must_use]
pub fn encode_event(event: &str, data: &Value) -> Option<String> {
    let envelope = super::types::Envelope { event: event.to_owned(), data: data.clone() };
    match envelope.encode() {
        Ok(text) => Some(text),
        Err(err) => {
            log::warn!("waitroom: failed to encode {event}: {err}");
            None
        }
    }
}

/// WebSocket transport speaking JSON text envelopes via `gloo-net`.
#[cfg(feature = "browser")]
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

#[cfg(feature = "browser")]
fn url_with_query(url: &str, params: &BTreeMap<String, String>) -> String {
    if params.is_empty() {
        return url.to_owned();
    }
    let query = params
        .iter()
        .map(|(k, v)| {
            let k = String::from(js_sys::encode_uri_component(k));
            let v = String::from(js_sys::encode_uri_component(v));
            format!("{k}={v}")
        })
        .collect::<Vec<_>>()
        .join("&");
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{query}")
}

#[cfg(feature = "browser")]
struct WsChannel {
    tx: futures::channel::mpsc::UnboundedSender<String>,
    close: std::cell::RefCell<Option<futures::channel::oneshot::Sender<()>>>,
}

#[cfg(feature = "browser")]
impl Channel for WsChannel {
    fn send(&self, event: &str, data: &Value) -> bool {
        encode_event(event, data).is_some_and(|text| self.tx.unbounded_send(text).is_ok())
    }

    fn close(&self) {
        if let Some(close) = self.close.borrow_mut().take()
            && close.send(()).is_err()
        {
            log::debug!("waitroom: channel task already finished");
        }
        self.tx.close_channel();
    }
}

#[cfg(feature = "browser")]
impl Transport for WsTransport {
    fn connect(
        &self,
        url: &str,
        params: &BTreeMap<String, String>,
        on_signal: SignalHandler,
    ) -> Result<Box<dyn Channel>, ChannelError> {
        use futures::channel::{mpsc, oneshot};
        use gloo_net::websocket::futures::WebSocket;

        let url = url_with_query(url, params);
        let ws = WebSocket::open(&url).map_err(|e| ChannelError::Open(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded::<String>();
        let (close_tx, close_rx) = oneshot::channel::<()>();

        wasm_bindgen_futures::spawn_local(run_socket(ws, rx, close_rx, on_signal));

        Ok(Box::new(WsChannel { tx, close: std::cell::RefCell::new(Some(close_tx)) }))
    }
}

/// Drive one socket until it drops or is closed from our side.
#[cfg(feature = "browser")]
async fn run_socket(
    ws: gloo_net::websocket::futures::WebSocket,
    mut rx: futures::channel::mpsc::UnboundedReceiver<String>,
    close_rx: futures::channel::oneshot::Receiver<()>,
    on_signal: SignalHandler,
) {
    use futures::{SinkExt, StreamExt};
    use gloo_net::websocket::{Message, State};

    // Hold back `Open` until the handshake completes so a refused connection
    // reads as a failed attempt rather than a successful one.
    loop {
        match ws.state() {
            State::Open => break,
            State::Connecting => gloo_timers::future::sleep(std::time::Duration::from_millis(50)).await,
            State::Closing | State::Closed => {
                on_signal(ChannelSignal::Closed { reason: "handshake failed".to_owned() });
                return;
            }
        }
    }
    on_signal(ChannelSignal::Open);

    let (mut ws_write, mut ws_read) = ws.split();

    let send_task = async {
        while let Some(text) = rx.next().await {
            if ws_write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        "send side closed".to_owned()
    };

    let recv_task = async {
        while let Some(msg) = ws_read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Some(signal) = decode_signal(&text) {
                        on_signal(signal);
                    }
                }
                Ok(Message::Bytes(_)) => log::debug!("waitroom: ignoring binary channel frame"),
                Err(e) => {
                    on_signal(ChannelSignal::Error(e.to_string()));
                    return format!("receive error: {e}");
                }
            }
        }
        "closed by server".to_owned()
    };

    let io_task = async {
        match futures::future::select(Box::pin(send_task), Box::pin(recv_task)).await {
            futures::future::Either::Left((reason, _)) | futures::future::Either::Right((reason, _)) => reason,
        }
    };

    let reason = match futures::future::select(Box::pin(io_task), close_rx).await {
        futures::future::Either::Left((reason, _)) => reason,
        futures::future::Either::Right(_) => "closed by client".to_owned(),
    };
    on_signal(ChannelSignal::Closed { reason });
}

//! Prover client: sequence-number correlation and event fan-out
//!
//! [`Server`] owns one connection at a time. Requests go out tagged with a
//! fresh `seq_num` and park a oneshot in the pending map; inbound frames are
//! routed by their `response` field, either resolving the matching pending
//! entry or fanning out on the typed event buses. The raw frame stream stays
//! observable so the session can tunnel every frame to the infoview, whose
//! own client allocates sequence numbers independently; responses to those
//! requests show up here with unknown numbers and are deliberately ignored.

mod transport;
mod tunnel;

pub use transport::{Connection, Transport, TransportError};
pub use tunnel::TunnelTransport;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use eyre::{Result, WrapErr, bail};
use proofview_core::{Event, Message, ServerStatus, Subscription};
use proofview_proto::{
    AllHoleCommandsResponse, CompletionResponse, HoleResponse, InfoResponse, ProverError,
    ProverRequest, RequestFrame, ResponseFrame, SearchResponse, SymbolResponse,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{trace, warn};

type Body = serde_json::Map<String, Value>;
type PendingMap = HashMap<u64, oneshot::Sender<Result<Body, ProverError>>>;

struct ConnectionState {
    conn: Arc<dyn Connection>,
    _subs: Vec<Subscription>,
}

/// Client for one prover server.
pub struct Server {
    transport: Box<dyn Transport>,
    state: Mutex<Option<ConnectionState>>,
    seq: AtomicU64,
    pending: Arc<Mutex<PendingMap>>,
    /// Every inbound frame, verbatim, before any routing.
    pub frames: Event<Value>,
    /// Full diagnostic list replacements.
    pub all_messages: Event<Vec<Message>>,
    /// Prover task activity updates.
    pub status_changed: Event<ServerStatus>,
    /// Fires each time a connection is (re)established.
    pub restarted: Event<()>,
    /// Transport-level failures.
    pub error: Event<TransportError>,
}

impl Server {
    pub fn new(transport: Box<dyn Transport>) -> Server {
        Server {
            transport,
            state: Mutex::new(None),
            seq: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(HashMap::new())),
            frames: Event::new(),
            all_messages: Event::new(),
            status_changed: Event::new(),
            restarted: Event::new(),
            error: Event::new(),
        }
    }

    /// Opens a connection, replacing (and disposing) any existing one.
    /// Pending requests of the old connection are rejected.
    pub fn connect(&self) -> Result<()> {
        self.drop_connection();
        let conn = self
            .transport
            .connect()
            .wrap_err("failed to open prover connection")?;
        let subs = self.attach(&conn);
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = Some(ConnectionState { conn, _subs: subs });
        }
        self.restarted.fire(&());
        Ok(())
    }

    fn attach(&self, conn: &Arc<dyn Connection>) -> Vec<Subscription> {
        let pending = Arc::clone(&self.pending);
        let frames = self.frames.clone();
        let all_messages = self.all_messages.clone();
        let status_changed = self.status_changed.clone();
        let frame_sub = conn.frames().on(move |frame: &Value| {
            frames.fire(frame);
            route_frame(frame, &pending, &all_messages, &status_changed);
        });

        let pending = Arc::clone(&self.pending);
        let error = self.error.clone();
        let error_sub = conn.errors().on(move |err: &TransportError| {
            error.fire(err);
            reject_all(
                &pending,
                &ProverError::new(format!("connection error: {}", err.message)),
            );
        });

        vec![frame_sub, error_sub]
    }

    fn drop_connection(&self) {
        let prev = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.take()
        };
        if let Some(prev) = prev {
            prev.conn.dispose();
            reject_all(&self.pending, &ProverError::new("disposed"));
        }
    }

    pub fn alive(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.as_ref().is_some_and(|s| s.conn.alive())
    }

    /// Writes a frame to the connection without registering a pending entry.
    /// Used for tunneled requests whose sequence numbers belong to the
    /// infoview's client.
    pub fn send_raw(&self, frame: &Value) -> Result<()> {
        let conn = {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match state.as_ref() {
                Some(s) => Arc::clone(&s.conn),
                None => bail!("not connected"),
            }
        };
        conn.send(frame)
    }

    pub fn dispose(&self) {
        self.drop_connection();
        self.frames.dispose();
        self.all_messages.dispose();
        self.status_changed.dispose();
        self.restarted.dispose();
        self.error.dispose();
    }

    async fn request(&self, request: ProverRequest) -> Result<Body, ProverError> {
        let seq_num = self.seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.insert(seq_num, tx);
        }
        let frame = RequestFrame { seq_num, request };
        let outcome = serde_json::to_value(&frame)
            .map_err(|err| ProverError::new(format!("unserializable request: {err}")))
            .and_then(|value| {
                self.send_raw(&value)
                    .map_err(|err| ProverError::new(err.to_string()))
            });
        if let Err(err) = outcome {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.remove(&seq_num);
            return Err(err);
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ProverError::new("disposed")),
        }
    }

    async fn query<T: DeserializeOwned>(&self, request: ProverRequest) -> Result<T, ProverError> {
        let body = self.request(request).await?;
        serde_json::from_value(Value::Object(body))
            .map_err(|err| ProverError::new(format!("malformed response: {err}")))
    }

    // ========================================================================
    // Typed commands
    // ========================================================================

    pub async fn info(
        &self,
        file_name: &str,
        line: u32,
        column: u32,
    ) -> Result<InfoResponse, ProverError> {
        self.query(ProverRequest::Info {
            file_name: file_name.to_owned(),
            line,
            column,
        })
        .await
    }

    pub async fn complete(
        &self,
        file_name: &str,
        line: u32,
        column: u32,
    ) -> Result<CompletionResponse, ProverError> {
        self.query(ProverRequest::Complete {
            file_name: file_name.to_owned(),
            line,
            column,
            skip_completions: None,
        })
        .await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse, ProverError> {
        self.query(ProverRequest::Search {
            query: query.to_owned(),
        })
        .await
    }

    pub async fn symbols(&self, file_name: &str) -> Result<SymbolResponse, ProverError> {
        self.query(ProverRequest::Symbols {
            file_name: file_name.to_owned(),
        })
        .await
    }

    pub async fn all_hole_commands(
        &self,
        file_name: &str,
    ) -> Result<AllHoleCommandsResponse, ProverError> {
        self.query(ProverRequest::AllHoleCommands {
            file_name: file_name.to_owned(),
        })
        .await
    }

    pub async fn hole(
        &self,
        file_name: &str,
        line: u32,
        column: u32,
        action: &str,
    ) -> Result<HoleResponse, ProverError> {
        self.query(ProverRequest::Hole {
            file_name: file_name.to_owned(),
            line,
            column,
            action: action.to_owned(),
        })
        .await
    }

    /// Replaces the prover's view of a file. `None` makes it re-read from
    /// disk.
    pub async fn sync(&self, file_name: &str, content: Option<String>) -> Result<(), ProverError> {
        self.request(ProverRequest::Sync {
            file_name: file_name.to_owned(),
            content,
        })
        .await?;
        Ok(())
    }
}

fn route_frame(
    frame: &Value,
    pending: &Mutex<PendingMap>,
    all_messages: &Event<Vec<Message>>,
    status_changed: &Event<ServerStatus>,
) {
    let parsed: ResponseFrame = match serde_json::from_value(frame.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            trace!(%err, "ignoring unrecognized prover frame");
            return;
        }
    };
    match parsed {
        ResponseFrame::Ok(ok) => {
            let tx = {
                let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                pending.remove(&ok.seq_num)
            };
            match tx {
                Some(tx) => {
                    let _ = tx.send(Ok(ok.body));
                }
                None => trace!(seq_num = ok.seq_num, "response to a foreign request"),
            }
        }
        ResponseFrame::Error(err) => match err.seq_num {
            Some(seq_num) => {
                let tx = {
                    let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
                    pending.remove(&seq_num)
                };
                match tx {
                    Some(tx) => {
                        let _ = tx.send(Err(ProverError::new(err.message)));
                    }
                    None => trace!(seq_num, "error for a foreign request"),
                }
            }
            None => warn!(message = %err.message, "global prover error"),
        },
        ResponseFrame::AllMessages(frame) => all_messages.fire(&frame.msgs),
        ResponseFrame::CurrentTasks(status) => status_changed.fire(&status),
    }
}

fn reject_all(pending: &Mutex<PendingMap>, error: &ProverError) {
    let senders: Vec<_> = {
        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.drain().map(|(_, tx)| tx).collect()
    };
    for tx in senders {
        let _ = tx.send(Err(error.clone()));
    }
}

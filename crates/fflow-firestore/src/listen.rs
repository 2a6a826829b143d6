//! Streaming `listen` support.
//!
//! The REST listen endpoint answers with one long-lived JSON array of
//! `ListenResponse` objects. Bytes arrive in arbitrary chunks, so objects
//! are first cut out of the byte stream, then folded into the set of
//! documents matching the target. A full snapshot is emitted each time
//! the server reports the target consistent after a change. Streams the
//! server closes are reopened from the last resume token.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use tracing::{debug, warn};

use fflow_models::{sort_newest_first, Document as CatalogDocument, Query};

use crate::client::{FirestoreClient, LISTEN_TARGET_ID};
use crate::convert::document_from_firestore;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::{record_listen_reconnect, record_snapshot};
use crate::store::SnapshotStream;
use crate::types::{Document, ListenResponse, TargetChange};

/// Cuts complete top-level JSON objects out of a chunked JSON array.
///
/// Separators, whitespace and the enclosing brackets are skipped. Braces
/// inside string literals are ignored.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buf: Vec<u8>,
    pos: usize,
    depth: usize,
    start: usize,
    in_string: bool,
    escaped: bool,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every object completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while self.pos < self.buf.len() {
            let b = self.buf[self.pos];
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
            } else if self.depth > 0 {
                match b {
                    b'"' => self.in_string = true,
                    b'{' | b'[' => self.depth += 1,
                    b'}' | b']' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            frames.push(self.buf[self.start..=self.pos].to_vec());
                        }
                    }
                    _ => {}
                }
            } else if b == b'{' {
                self.depth = 1;
                self.start = self.pos;
            }
            self.pos += 1;
        }

        // Drop consumed bytes, keeping a partial object if one is open.
        let consumed = if self.depth > 0 { self.start } else { self.buf.len() };
        self.buf.drain(..consumed);
        self.pos -= consumed;
        self.start = 0;

        frames
    }

    /// Bytes held for an incomplete object.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Documents currently matching one listen target.
#[derive(Debug)]
pub struct WatchState {
    docs: HashMap<String, Document>,
    current: bool,
    /// Set when the held documents changed since the last snapshot. Starts
    /// set so the first consistent point always yields a snapshot.
    dirty: bool,
    resume_token: Option<String>,
}

impl Default for WatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchState {
    pub fn new() -> Self {
        Self {
            docs: HashMap::new(),
            current: false,
            dirty: true,
            resume_token: None,
        }
    }

    /// Token to resume from after the stream is reopened.
    pub fn resume_token(&self) -> Option<&str> {
        self.resume_token.as_deref()
    }

    /// A new stream was opened. Held documents stay; the target is not
    /// consistent again until the server says so.
    pub fn restart(&mut self) {
        self.current = false;
    }

    /// Apply one response. Returns a snapshot when the target is consistent
    /// and the documents changed since the previous snapshot.
    pub fn apply(
        &mut self,
        response: ListenResponse,
    ) -> FirestoreResult<Option<Vec<CatalogDocument>>> {
        if let Some(change) = response.target_change {
            return self.apply_target_change(change);
        }

        if let Some(change) = response.document_change {
            let name = change.document.name.clone().unwrap_or_default();
            if change.target_ids.contains(&LISTEN_TARGET_ID) {
                self.docs.insert(name, change.document);
                self.dirty = true;
            } else if change.removed_target_ids.contains(&LISTEN_TARGET_ID) {
                self.remove(&name);
            }
        } else if let Some(removed) = response.document_delete.or(response.document_remove) {
            self.remove(&removed.document);
        } else if let Some(filter) = response.filter {
            let expected = filter.count.unwrap_or(0);
            if usize::try_from(expected).ok() != Some(self.docs.len()) {
                warn!(
                    expected,
                    held = self.docs.len(),
                    "Listen existence filter mismatch"
                );
            }
        }

        Ok(None)
    }

    fn remove(&mut self, name: &str) {
        if self.docs.remove(name).is_some() {
            self.dirty = true;
        }
    }

    fn apply_target_change(
        &mut self,
        change: TargetChange,
    ) -> FirestoreResult<Option<Vec<CatalogDocument>>> {
        if let Some(cause) = &change.cause {
            if cause.code.unwrap_or(0) != 0 {
                return Err(FirestoreError::ListenFailed(
                    cause.message.clone().unwrap_or_else(|| "target error".to_string()),
                ));
            }
        }

        let change_type = change.target_change_type.as_deref();
        if change_type != Some("RESET") {
            if let Some(token) = change.resume_token.as_deref().filter(|t| !t.is_empty()) {
                self.resume_token = Some(token.to_string());
            }
        }

        match change_type {
            Some("REMOVE") => Err(FirestoreError::ListenFailed(
                "target removed by server".to_string(),
            )),
            Some("CURRENT") => {
                self.current = true;
                Ok(None)
            }
            // The server resends the full result set after a reset.
            Some("RESET") => {
                self.docs.clear();
                self.current = false;
                self.dirty = true;
                self.resume_token = None;
                Ok(None)
            }
            Some("ADD") => Ok(None),
            // NO_CHANGE is omitted on the wire. With no target ids and a read
            // time it marks a globally consistent point.
            None | Some("NO_CHANGE") => {
                let consistent =
                    change.target_ids.is_empty() && self.current && change.read_time.is_some();
                if consistent && self.dirty {
                    let snapshot = self.snapshot()?;
                    self.dirty = false;
                    Ok(Some(snapshot))
                } else {
                    Ok(None)
                }
            }
            Some(other) => {
                debug!(change_type = other, "Ignoring unknown target change");
                Ok(None)
            }
        }
    }

    /// All held documents, newest first.
    pub fn snapshot(&self) -> FirestoreResult<Vec<CatalogDocument>> {
        let mut docs = self
            .docs
            .values()
            .map(document_from_firestore)
            .collect::<FirestoreResult<Vec<_>>>()?;
        sort_newest_first(&mut docs);
        Ok(docs)
    }
}

/// Pause before reopening a stream that closed without delivering anything.
const IDLE_RECONNECT_DELAY: Duration = Duration::from_millis(500);

enum Phase {
    Connect,
    Streaming(BoxStream<'static, reqwest::Result<Vec<u8>>>),
    Done,
}

struct Driver {
    client: FirestoreClient,
    collection: String,
    query: Query,
    phase: Phase,
    splitter: FrameSplitter,
    state: WatchState,
    ready: VecDeque<FirestoreResult<Vec<CatalogDocument>>>,
    /// Whether the open stream has delivered any response yet.
    received: bool,
}

impl Driver {
    async fn next_snapshot(&mut self) -> Option<FirestoreResult<Vec<CatalogDocument>>> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }

            let chunk = match &mut self.phase {
                Phase::Done => return None,
                Phase::Connect => {
                    let resume_token = self.state.resume_token().map(str::to_string);
                    let opened = self
                        .client
                        .open_listen(&self.collection, &self.query, resume_token.as_deref())
                        .await;
                    match opened {
                        Ok(response) => {
                            debug!(
                                collection = %self.collection,
                                resumed = resume_token.is_some(),
                                "Listen stream opened"
                            );
                            let body = response.bytes_stream().map(|c| c.map(|b| b.to_vec()));
                            self.state.restart();
                            self.splitter = FrameSplitter::new();
                            self.received = false;
                            self.phase = Phase::Streaming(body.boxed());
                        }
                        Err(e) => {
                            self.phase = Phase::Done;
                            return Some(Err(e));
                        }
                    }
                    continue;
                }
                Phase::Streaming(body) => body.next().await,
            };

            match chunk {
                Some(Ok(bytes)) => self.consume(&bytes),
                Some(Err(e)) => {
                    warn!(collection = %self.collection, error = %e, "Listen stream interrupted");
                    self.reconnect().await;
                }
                None => {
                    debug!(collection = %self.collection, "Listen stream closed by server");
                    self.reconnect().await;
                }
            }
        }
    }

    /// Go back to connecting; the next open resumes from the last token.
    async fn reconnect(&mut self) {
        if !self.received {
            tokio::time::sleep(IDLE_RECONNECT_DELAY).await;
        }
        record_listen_reconnect(&self.collection);
        self.phase = Phase::Connect;
    }

    fn consume(&mut self, bytes: &[u8]) {
        for frame in self.splitter.push(bytes) {
            self.received = true;
            let applied = serde_json::from_slice::<ListenResponse>(&frame)
                .map_err(FirestoreError::from)
                .and_then(|response| self.state.apply(response));

            match applied {
                Ok(Some(snapshot)) => {
                    record_snapshot(&self.collection);
                    self.ready.push_back(Ok(snapshot));
                }
                Ok(None) => {}
                Err(e) => {
                    self.ready.push_back(Err(e));
                    self.phase = Phase::Done;
                    return;
                }
            }
        }
    }
}

/// Snapshot stream for `query` on `collection`.
///
/// The connection is opened on first poll and closed when the stream is
/// dropped. When the server closes the stream it is reopened from the
/// last resume token. The stream ends after its first error: a rejected
/// (re)open, a target removed by the server or an unreadable response.
pub fn watch(client: FirestoreClient, collection: &str, query: Query) -> SnapshotStream {
    let driver = Driver {
        client,
        collection: collection.to_string(),
        query,
        phase: Phase::Connect,
        splitter: FrameSplitter::new(),
        state: WatchState::new(),
        ready: VecDeque::new(),
        received: false,
    };

    stream::unfold(driver, |mut driver| async move {
        driver.next_snapshot().await.map(|item| (item, driver))
    })
    .boxed()
}

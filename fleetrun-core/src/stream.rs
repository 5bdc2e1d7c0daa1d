//! Live log tailing over server-sent events.
//!
//! One long-lived connection per run, addressed by run id and authenticated
//! via query parameters (the EventSource transport cannot attach headers).
//! Each event's payload is log text with carriage-return/newline escaped as
//! literal two-character sequences; a named `done` event signals normal
//! completion. A transport error closes the connection and surfaces one
//! notice; there is no automatic reconnect, since the full log text is also
//! available on the non-streaming run record.

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{FleetrunError, FleetrunResult};

/// Connection lifecycle. `Closed` and `Errored` are terminal; re-opening
/// means constructing a new stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Closed,
    Errored,
}

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name from the `event:` field; unnamed events carry `None`.
    pub name: Option<String>,
    pub data: String,
}

/// Incremental SSE frame parser. Fed raw transport bytes, yields complete
/// events at each blank-line boundary. Carries partial lines across feeds.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: String,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a transport chunk and return every event it completes, in
    /// arrival order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));
        let mut events = Vec::new();

        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.data_lines
                    .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else if let Some(rest) = line.strip_prefix("event:") {
                self.event_name = Some(rest.trim().to_string());
            }
            // Comment lines (":") and reserved fields (id, retry) are
            // currently unused by this client.
        }

        events
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event_name.is_none() && self.data_lines.is_empty() {
            return None;
        }
        Some(SseEvent {
            name: self.event_name.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        })
    }
}

/// Undo the wire escaping: literal `\r` / `\n` two-character sequences back
/// to control characters. The origin only escapes those two; every other
/// byte, including a lone backslash, passes through untouched.
pub fn unescape_chunk(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('r') => {
                    chars.next();
                    out.push('\r');
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// What a consumed event meant for the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// Log text was appended to the buffer.
    Appended,
    /// The run finished; carries the final status text.
    Done(String),
}

/// Accumulated tail state for one run: the ordered log buffer and the
/// lifecycle position. Pure with respect to the transport, so the append
/// and termination rules are testable without a socket.
#[derive(Debug)]
pub struct LogTail {
    run_id: i64,
    state: StreamState,
    buffer: String,
}

impl LogTail {
    pub fn new(run_id: i64) -> Self {
        Self {
            run_id,
            state: StreamState::Idle,
            buffer: String::new(),
        }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The unescaped log accumulated so far, exactly in append order.
    pub fn log(&self) -> &str {
        &self.buffer
    }

    /// Apply one parsed event. Unnamed events append; `done` closes.
    pub fn apply(&mut self, event: SseEvent) -> FleetrunResult<TailEvent> {
        match event.name.as_deref() {
            None => {
                self.buffer.push_str(&unescape_chunk(&event.data));
                Ok(TailEvent::Appended)
            }
            Some("done") => {
                info!(run_id = self.run_id, status = %event.data, "log stream completed");
                self.state = StreamState::Closed;
                Ok(TailEvent::Done(event.data))
            }
            Some("error") => {
                self.state = StreamState::Errored;
                Err(FleetrunError::StreamErrorEvent {
                    run_id: self.run_id,
                    message: event.data,
                })
            }
            Some(other) => {
                // Reserved event names: ignored, not fatal.
                debug!(run_id = self.run_id, event = other, "ignoring reserved event");
                Ok(TailEvent::Appended)
            }
        }
    }

    fn mark(&mut self, state: StreamState) {
        self.state = state;
    }

    /// Hard reset on forced close: the buffer is tenant-scoped and must
    /// never bleed into another view.
    pub fn close_and_clear(&mut self) {
        self.buffer.clear();
        self.state = StreamState::Closed;
    }
}

type ByteStream = futures::stream::BoxStream<'static, reqwest::Result<Vec<u8>>>;

/// A live tailing connection: transport plus tail state.
pub struct LogStream {
    tail: LogTail,
    parser: SseParser,
    body: Option<ByteStream>,
    queued: std::collections::VecDeque<SseEvent>,
}

impl LogStream {
    /// Open the streaming connection for a run. Auth token and project id
    /// ride in the URL query, per the transport's header constraint.
    pub async fn connect(api: &ApiClient, run_id: i64) -> FleetrunResult<LogStream> {
        let mut tail = LogTail::new(run_id);
        tail.mark(StreamState::Connecting);

        let url = api.stream_url(run_id);
        debug!(run_id, "opening log stream");
        let response = api
            .http()
            .get(url)
            .send()
            .await
            .map_err(|e| FleetrunError::StreamConnect {
                run_id,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FleetrunError::StreamConnect {
                run_id,
                message: format!("server answered {}", response.status()),
            });
        }

        tail.mark(StreamState::Streaming);
        Ok(LogStream {
            tail,
            parser: SseParser::new(),
            body: Some(
                response
                    .bytes_stream()
                    .map(|result| result.map(|chunk| chunk.to_vec()))
                    .boxed(),
            ),
            queued: std::collections::VecDeque::new(),
        })
    }

    pub fn run_id(&self) -> i64 {
        self.tail.run_id()
    }

    pub fn state(&self) -> StreamState {
        self.tail.state()
    }

    pub fn log(&self) -> &str {
        self.tail.log()
    }

    /// Pull the next tail event. Returns `None` once the stream has ended
    /// (after `done` or exhaustion). A transport failure releases the
    /// connection and surfaces exactly one error.
    pub async fn next_event(&mut self) -> FleetrunResult<Option<TailEvent>> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                let applied = self.tail.apply(event);
                if matches!(applied, Ok(TailEvent::Done(_)) | Err(_)) {
                    self.body = None;
                }
                return applied.map(Some);
            }

            if self.tail.state() != StreamState::Streaming {
                return Ok(None);
            }

            let Some(body) = self.body.as_mut() else {
                return Ok(None);
            };

            match body.next().await {
                Some(Ok(chunk)) => {
                    for event in self.parser.feed(&chunk) {
                        self.queued.push_back(event);
                    }
                }
                Some(Err(e)) => {
                    warn!(run_id = self.tail.run_id(), error = %e, "log stream interrupted");
                    self.body = None;
                    self.tail.mark(StreamState::Errored);
                    return Err(FleetrunError::StreamInterrupted {
                        run_id: self.tail.run_id(),
                        message: e.to_string(),
                    });
                }
                None => {
                    // Server closed without a done event; treat as closed,
                    // the full log remains available on the run record.
                    self.body = None;
                    self.tail.mark(StreamState::Closed);
                    return Ok(None);
                }
            }
        }
    }

    /// Synchronously drop the connection and clear the buffer.
    pub fn force_close(&mut self) {
        self.body = None;
        self.tail.close_and_clear();
    }
}

/// Owner of the single allowed live stream.
///
/// Opening a stream for a new run first force-closes any existing
/// connection, so two live sockets can never append concurrently. A project
/// switch is a cancellation signal: close and clear before anything else
/// runs.
#[derive(Default)]
pub struct StreamManager {
    active: Option<LogStream>,
}

impl StreamManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stream for `run_id`, replacing any active one.
    pub async fn open(&mut self, api: &ApiClient, run_id: i64) -> FleetrunResult<&mut LogStream> {
        self.close();
        let stream = LogStream::connect(api, run_id).await?;
        Ok(self.active.insert(stream))
    }

    pub fn active(&self) -> Option<&LogStream> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut LogStream> {
        self.active.as_mut()
    }

    pub fn active_run(&self) -> Option<i64> {
        self.active.as_ref().map(|s| s.run_id())
    }

    /// Force-close the active stream, if any. Returns whether one was open.
    pub fn close(&mut self) -> bool {
        match self.active.take() {
            Some(mut stream) => {
                stream.force_close();
                true
            }
            None => false,
        }
    }

    /// Project switch: hard close, buffer cleared, before the next refresh
    /// is issued.
    pub fn on_project_changed(&mut self) {
        if self.close() {
            info!("closed active log stream on project switch");
        }
    }
}

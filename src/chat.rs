//! Chat session: one JSON-lines TCP connection to the message relay,
//! mirrored into a bounded display buffer.
//!
//! A background reader thread parses inbound envelopes; heartbeats are
//! consumed without ever reaching the display. The UI thread writes
//! outbound lines directly and only takes short locks to snapshot state.
//! Nothing reconnects on its own: a dropped link stays dropped until the
//! user asks for a redial. Every dial carries a generation number; a
//! reader left over from a replaced dial touches neither the display nor
//! the writer slot.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{display_name, ChatSettings};

pub const DISPLAY_BUFFER: usize = 50;

pub const EMOJI: &[&str] = &[
    "🙂", "😊", "😛", "😋", "😇", "😁", "😃", "😎", "👀", "😳", "😥", "😔", "😢", "😰", "😱", "😨",
];

// ── Wire envelopes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Message,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize)]
pub struct Outbound {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub data: String,
    pub username: String,
    pub channel: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Inbound {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub channel: String,
}

// ── Display state ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub username: String,
    pub text: String,
    pub stamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Offline,
    Connecting,
    Online,
    Dropped(String),
}

#[derive(Debug, Default)]
struct ChatState {
    messages: VecDeque<ChatMessage>,
    status: LinkStatus,
    channel_heard: Option<String>,
}

type SharedState = Arc<Mutex<ChatState>>;

fn set_status(state: &Mutex<ChatState>, status: LinkStatus) {
    if let Ok(mut guard) = state.lock() {
        guard.status = status;
    }
}

// One inbound line. Anything that does not parse as an envelope is
// dropped on the floor; the relay mixes service chatter into the stream.
fn ingest_line(state: &Mutex<ChatState>, line: &str) {
    let Ok(envelope) = serde_json::from_str::<Inbound>(line) else {
        return;
    };
    if envelope.kind != EnvelopeKind::Message {
        return;
    }
    let Ok(mut guard) = state.lock() else {
        return;
    };
    if !envelope.channel.is_empty() {
        guard.channel_heard = Some(envelope.channel);
    }
    guard.messages.push_back(ChatMessage {
        username: envelope.username,
        text: envelope.data,
        stamp: chrono::Local::now().format("%H:%M").to_string(),
    });
    while guard.messages.len() > DISPLAY_BUFFER {
        guard.messages.pop_front();
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct ChatSession {
    state: SharedState,
    /// Write half; the reader thread owns a clone of the stream
    writer: Arc<Mutex<Option<TcpStream>>>,
    closed: Arc<AtomicBool>,
    /// Bumped on every dial; a reader whose number no longer matches is stale.
    generation: Arc<AtomicU64>,
    settings: ChatSettings,
}

impl ChatSession {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            state: SharedState::default(),
            writer: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            settings,
        }
    }

    /// Dial the relay on a background thread and start the reader loop.
    pub fn connect(&self) {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        set_status(&self.state, LinkStatus::Connecting);

        let state = Arc::clone(&self.state);
        let writer = Arc::clone(&self.writer);
        let closed = Arc::clone(&self.closed);
        let generation = Arc::clone(&self.generation);
        let my_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = std::thread::Builder::new()
            .name("playdesk-chat-reader".into())
            .spawn(move || {
                let current = || generation.load(Ordering::SeqCst) == my_gen;
                let stream = match TcpStream::connect(addr.as_str()) {
                    Ok(s) => s,
                    Err(e) => {
                        append_chat_debug_line(&format!("connect {addr} failed: {e}"));
                        if current() {
                            set_status(&state, LinkStatus::Dropped(format!("connect failed: {e}")));
                        }
                        return;
                    }
                };
                // The window may have closed, or a newer dial may have
                // replaced this one, while we were dialing.
                if closed.load(Ordering::SeqCst) || !current() {
                    return;
                }
                let read_half = match stream.try_clone() {
                    Ok(s) => s,
                    Err(e) => {
                        if current() {
                            set_status(&state, LinkStatus::Dropped(format!("socket clone failed: {e}")));
                        }
                        return;
                    }
                };
                if let Ok(mut slot) = writer.lock() {
                    if !current() {
                        return;
                    }
                    *slot = Some(stream);
                    set_status(&state, LinkStatus::Online);
                }
                append_chat_debug_line(&format!("connected to {addr}"));

                let mut reader = BufReader::new(read_half);
                let mut line = String::new();
                let reason = loop {
                    line.clear();
                    match reader.read_line(&mut line) {
                        Ok(0) => break "closed by server".to_string(),
                        Ok(_) => {
                            if !current() {
                                break String::new();
                            }
                            ingest_line(&state, line.trim_end());
                        }
                        Err(e) => break format!("read failed: {e}"),
                    }
                };
                // Only the reader of the current dial may tear the link down.
                // The check sits inside the lock so it cannot interleave with
                // a fresh reader installing its stream.
                if let Ok(mut slot) = writer.lock() {
                    if current() {
                        set_status(&state, LinkStatus::Dropped(reason));
                        *slot = None;
                    }
                }
                append_chat_debug_line(&format!("reader for {addr} stopped"));
            });
    }

    /// Redial after a drop. Does nothing while the link is up or dialing.
    pub fn reconnect(&self) {
        if matches!(self.status(), LinkStatus::Online | LinkStatus::Connecting) {
            return;
        }
        self.connect();
    }

    pub fn send(&self, text: &str) -> Result<()> {
        let envelope = Outbound {
            kind: EnvelopeKind::Message,
            data: text.to_string(),
            username: display_name(),
            channel: self.settings.channel.clone(),
            key: self.settings.key.clone(),
        };
        let json = serde_json::to_string(&envelope)?;
        let Ok(mut slot) = self.writer.lock() else {
            return Err(anyhow!("chat writer lock poisoned"));
        };
        let Some(stream) = slot.as_mut() else {
            return Err(anyhow!("not connected"));
        };
        if let Err(e) = stream.write_all(json.as_bytes()).and_then(|_| stream.write_all(b"\n")) {
            *slot = None;
            set_status(&self.state, LinkStatus::Dropped(format!("send failed: {e}")));
            return Err(e.into());
        }
        Ok(())
    }

    /// Shut the socket down; the reader thread winds down on its own.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.writer.lock() {
            if let Some(stream) = slot.take() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.state
            .lock()
            .map(|g| g.status.clone())
            .unwrap_or(LinkStatus::Offline)
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state
            .lock()
            .map(|g| g.messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn channel_heard(&self) -> Option<String> {
        self.state.lock().ok().and_then(|g| g.channel_heard.clone())
    }
}

// ── Debug log ─────────────────────────────────────────────────────────────────

fn chat_debug_path() -> std::path::PathBuf {
    std::env::var_os("PLAYDESK_CHAT_DEBUG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp/playdesk_chat.log"))
}

fn append_chat_debug_line(line: &str) {
    if std::env::var_os("PLAYDESK_CHAT_DEBUG").is_none() {
        return;
    }
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(chat_debug_path())
    else {
        return;
    };
    let _ = writeln!(file, "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_line(n: usize) -> String {
        format!(
            r#"{{"type":"message","data":"msg {n}","username":"molly","channel":"Rambler channel"}}"#
        )
    }

    fn wait_for_online(session: &ChatSession) {
        for _ in 0..200 {
            if session.status() == LinkStatus::Online {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        panic!("link never came online: {:?}", session.status());
    }

    #[test]
    fn display_buffer_holds_fifty_and_evicts_oldest() {
        let state = SharedState::default();
        for n in 0..51 {
            ingest_line(&state, &message_line(n));
        }
        let guard = state.lock().unwrap();
        assert_eq!(guard.messages.len(), DISPLAY_BUFFER);
        assert_eq!(guard.messages.front().unwrap().text, "msg 1");
        assert_eq!(guard.messages.back().unwrap().text, "msg 50");
    }

    #[test]
    fn heartbeats_never_reach_the_display() {
        let state = SharedState::default();
        ingest_line(
            &state,
            r#"{"type":"heartbeat","data":"","username":"The Server","channel":""}"#,
        );
        assert!(state.lock().unwrap().messages.is_empty());
    }

    #[test]
    fn junk_lines_are_ignored() {
        let state = SharedState::default();
        ingest_line(&state, "not json at all");
        ingest_line(&state, r#"{"type":"notification","data":"x"}"#);
        ingest_line(&state, r#"{"data":"no type"}"#);
        assert!(state.lock().unwrap().messages.is_empty());
    }

    #[test]
    fn inbound_envelope_parses_with_missing_fields() {
        let parsed: Inbound = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(parsed.kind, EnvelopeKind::Heartbeat);
        assert!(parsed.data.is_empty());
        assert!(parsed.username.is_empty());
    }

    #[test]
    fn outbound_envelope_matches_the_wire_shape() {
        let envelope = Outbound {
            kind: EnvelopeKind::Message,
            data: "hi there".into(),
            username: "molly".into(),
            channel: "Rambler channel".into(),
            key: "abc123".into(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"type":"message","data":"hi there","username":"molly","channel":"Rambler channel","key":"abc123"}"#
        );
    }

    #[test]
    fn channel_stamp_follows_the_latest_message() {
        let state = SharedState::default();
        ingest_line(
            &state,
            r#"{"type":"message","data":"a","username":"x","channel":"alpha"}"#,
        );
        ingest_line(
            &state,
            r#"{"type":"message","data":"b","username":"y","channel":"beta"}"#,
        );
        assert_eq!(
            state.lock().unwrap().channel_heard.as_deref(),
            Some("beta")
        );
    }

    #[test]
    fn send_without_a_connection_reports_an_error() {
        let session = ChatSession::new(ChatSettings::default());
        assert!(session.send("hello").is_err());
    }

    #[test]
    fn stale_reader_leaves_a_reconnected_link_alone() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = ChatSession::new(ChatSettings {
            host: "127.0.0.1".into(),
            port,
            ..ChatSettings::default()
        });

        session.connect();
        let (first_peer, _) = listener.accept().unwrap();
        wait_for_online(&session);

        // A failed send clears the writer and marks the link dropped while
        // the first reader is still blocked on its socket.
        *session.writer.lock().unwrap() = None;
        set_status(&session.state, LinkStatus::Dropped("send failed: broken pipe".into()));

        session.reconnect();
        let (_second_peer, _) = listener.accept().unwrap();
        wait_for_online(&session);

        // The first reader now unblocks and winds down; the fresh link
        // must come through untouched.
        drop(first_peer);
        for _ in 0..20 {
            std::thread::sleep(std::time::Duration::from_millis(10));
            assert_eq!(session.status(), LinkStatus::Online);
        }
        assert!(session.writer.lock().unwrap().is_some());
    }
}

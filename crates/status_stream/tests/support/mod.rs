#![allow(dead_code)]

use std::{
    io::Cursor,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use status_stream::{DiagnosticKind, DiagnosticSink, Event, EventStream, SessionState};
use tokio::io::{AsyncRead, ReadBuf};

pub fn status_line(n: usize) -> String {
    format!(
        r#"{{"id":{n},"id_str":"{n}","text":"status {n}","user":{{"name":"user {n}","screen_name":"u{n}"}},"created_at":"Wed Aug 27 13:08:45 +0000 2008"}}"#
    )
}

pub fn ndjson<S: AsRef<str>>(lines: &[S]) -> Cursor<Vec<u8>> {
    let mut bytes = Vec::new();
    for line in lines {
        bytes.extend_from_slice(line.as_ref().as_bytes());
        bytes.extend_from_slice(b"\r\n");
    }
    Cursor::new(bytes)
}

pub fn status_id(event: &Event) -> u64 {
    match event {
        Event::Status(status) => status.id.expect("fixture statuses carry ids"),
        other => panic!("expected status event, got {other:?}"),
    }
}

pub async fn collect_ids(events: &EventStream) -> Vec<u64> {
    let mut ids = Vec::new();
    while let Ok(event) = events.next_event().await {
        ids.push(status_id(&event));
    }
    ids
}

pub async fn wait_for_state(events: &EventStream, state: SessionState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while events.state() < state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {state:?}"));
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    seen: Arc<Mutex<Vec<(DiagnosticKind, String)>>>,
}

impl RecordingSink {
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.seen.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn details(&self, kind: DiagnosticKind) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(seen, _)| *seen == kind)
            .map(|(_, detail)| detail.clone())
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, kind: DiagnosticKind, detail: &str) {
        self.seen.lock().unwrap().push((kind, detail.to_string()));
    }
}

/// Serves `data`, then fails every later read with a connection reset.
pub struct FailingReader {
    data: Cursor<Vec<u8>>,
}

impl FailingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
        }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let remaining = self.data.get_ref().len() as u64 - self.data.position();
        if remaining == 0 {
            return Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by upstream",
            )));
        }
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

//! Server-sent events in both directions: reading `data:` lines out of an
//! upstream response and relaying text fragments to our own clients.

use std::{collections::VecDeque, convert::Infallible, pin::Pin};

use axum::{
    body::Bytes,
    response::sse::{Event, Sse},
};
use futures_util::{Stream, StreamExt, stream};
use serde_json::json;
use tracing::error;

use crate::remote::{RemoteServiceError, TextStream};

pub const DONE: &str = "[DONE]";

struct DataLines {
    upstream: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    ready: VecDeque<String>,
    finished: bool,
}

impl DataLines {
    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.accept(&line);
        }
    }

    fn flush(&mut self) {
        let rest = std::mem::take(&mut self.buffer);
        self.accept(&rest);
    }

    fn accept(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some(data) = line.strip_prefix("data:") {
            self.ready.push_back(data.strip_prefix(' ').unwrap_or(data).to_owned());
        }
    }
}

/// Payloads of the `data:` lines in an event stream, in order.
///
/// Lines may be split across chunks. Comments, `event:` and `id:` lines are dropped.
pub fn data_lines<S>(
    service: &'static str,
    upstream: S,
) -> impl Stream<Item = Result<String, RemoteServiceError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let lines = DataLines {
        upstream: Box::pin(upstream),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(lines, move |mut lines| async move {
        loop {
            if let Some(data) = lines.ready.pop_front() {
                return Some((Ok(data), lines));
            }
            if lines.finished {
                return None;
            }

            match lines.upstream.next().await {
                Some(Ok(chunk)) => lines.push(&chunk),
                Some(Err(source)) => {
                    lines.finished = true;
                    lines.ready.clear();
                    return Some((Err(RemoteServiceError::Http { service, source }), lines));
                }
                None => {
                    lines.finished = true;
                    lines.flush();
                }
            }
        }
    })
}

/// Re-emits fragments as `data: {"content": ..}` events followed by `data: [DONE]`.
///
/// An upstream failure mid-answer is logged and ends the stream without `[DONE]`.
pub fn relay(
    fragments: TextStream,
    kind: Option<&'static str>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    Sse::new(relay_events(fragments, kind))
}

fn relay_events(
    fragments: TextStream,
    kind: Option<&'static str>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream::unfold(Some(fragments), move |fragments| async move {
        let mut fragments = fragments?;
        match fragments.next().await {
            Some(Ok(content)) => {
                let payload = match kind {
                    Some(kind) => json!({ "content": content, "type": kind }),
                    None => json!({ "content": content }),
                };
                let event = Event::default().data(payload.to_string());
                Some((Ok::<Event, Infallible>(event), Some(fragments)))
            }
            Some(Err(err)) => {
                error!("upstream stream failed: {err}");
                None
            }
            None => Some((Ok(Event::default().data(DONE)), None)),
        }
    })
}

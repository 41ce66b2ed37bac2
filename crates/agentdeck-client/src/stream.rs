//! Run-stream transport: a typed, cancellable event channel over SSE.
//!
//! `RunStream` owns one underlying connection for its lifetime. The reader
//! task forwards decoded events in server emission order and ends after the
//! first terminal event; connection failures and malformed payloads are
//! delivered as `Error`-status events instead of surfacing synchronously, so
//! the consumer handles every failure through the same path.

use futures::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::types::RunEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct RunStream {
    events: mpsc::Receiver<RunEvent>,
    reader: Option<JoinHandle<()>>,
    closed: bool,
}

impl RunStream {
    pub(crate) fn open(http: reqwest::Client, url: String) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_run_stream(http, url, event_tx));
        Self {
            events: event_rx,
            reader: Some(reader),
            closed: false,
        }
    }

    /// A stream fed directly from a channel instead of the network. Used by
    /// consumers that stand in a fake backend.
    #[must_use]
    pub fn from_receiver(events: mpsc::Receiver<RunEvent>) -> Self {
        Self {
            events,
            reader: None,
            closed: false,
        }
    }

    /// Next event in server emission order. `None` once the stream is closed
    /// or the server ended it without a terminal event.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Idempotent; safe after the peer already closed. No event is delivered
    /// after this returns.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.events.close();
        while self.events.try_recv().is_ok() {}
        self.closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_run_stream(http: reqwest::Client, url: String, events: mpsc::Sender<RunEvent>) {
    let response = match http
        .get(&url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(error) => {
            deliver(&events, RunEvent::transport_error(format!(
                "stream connect failed: {error}"
            )))
            .await;
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        deliver(&events, RunEvent::transport_error(format!(
            "stream rejected ({status}): {body}"
        )))
        .await;
        return;
    }

    let mut chunks = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                deliver(&events, RunEvent::transport_error(format!(
                    "stream read failed: {error}"
                )))
                .await;
                return;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(frame) = next_frame(&mut buffer) {
            let Some(data) = frame_data(&frame) else {
                continue;
            };
            let event = match serde_json::from_str::<RunEvent>(&data) {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!(error = %error, payload = %data, "run-stream payload decode failed");
                    deliver(&events, RunEvent::transport_error(format!(
                        "malformed event: {error}"
                    )))
                    .await;
                    return;
                }
            };
            let terminal = event.status.is_terminal();
            if events.send(event).await.is_err() {
                // Consumer closed; drop the connection.
                return;
            }
            if terminal {
                return;
            }
        }
    }
    // Server ended the stream without a terminal event; the closed channel is
    // the consumer's signal.
}

async fn deliver(events: &mpsc::Sender<RunEvent>, event: RunEvent) {
    let _ = events.send(event).await;
}

/// Splits one SSE frame (terminated by a blank line) off the front of the
/// buffer. Partial frames stay buffered until the next chunk arrives.
fn next_frame(buffer: &mut String) -> Option<String> {
    let pos = buffer.find("\n\n")?;
    let frame = buffer[..pos].to_string();
    buffer.drain(..pos + 2);
    Some(frame)
}

/// Joins the payload of the frame's `data:` lines; `None` for frames with no
/// data (comments, keep-alives).
fn frame_data(frame: &str) -> Option<String> {
    let mut data = String::new();
    for line in frame.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
        }
    }
    if data.is_empty() { None } else { Some(data) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunStatus;

    #[test]
    fn frames_split_on_blank_lines_across_chunks() {
        let mut buffer = String::new();
        buffer.push_str("data: {\"status\":");
        assert!(next_frame(&mut buffer).is_none());

        buffer.push_str(" \"success\", \"node\": \"coder\"}\n\ndata: partial");
        let frame = next_frame(&mut buffer).expect("first frame complete");
        assert_eq!(frame, "data: {\"status\": \"success\", \"node\": \"coder\"}");
        assert_eq!(buffer, "data: partial");
        assert!(next_frame(&mut buffer).is_none());
    }

    #[test]
    fn frame_data_skips_comments_and_handles_crlf() {
        assert_eq!(frame_data(": keep-alive"), None);
        assert_eq!(
            frame_data("data: {\"status\":\"complete\"}\r"),
            Some("{\"status\":\"complete\"}".to_string())
        );
        assert_eq!(
            frame_data("event: message\ndata: one\ndata: two"),
            Some("one\ntwo".to_string())
        );
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let mut stream = RunStream::from_receiver(event_rx);

        for node in ["architect", "coder"] {
            event_tx
                .try_send(RunEvent {
                    node: Some(node.to_string()),
                    status: RunStatus::Progress,
                    message: None,
                    plan: None,
                })
                .expect("queued");
        }
        drop(event_tx);

        let first = stream.recv().await.expect("first event");
        assert_eq!(first.node.as_deref(), Some("architect"));
        let second = stream.recv().await.expect("second event");
        assert_eq!(second.node.as_deref(), Some("coder"));
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_discards_buffered_events() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let mut stream = RunStream::from_receiver(event_rx);
        event_tx
            .try_send(RunEvent::transport_error("late"))
            .expect("queued");

        stream.close();
        assert!(stream.is_closed());
        assert!(stream.recv().await.is_none());

        stream.close();
        assert!(stream.is_closed());
        assert!(stream.recv().await.is_none());
    }
}

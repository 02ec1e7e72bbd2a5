//! SSE decoding for streamed assistant jobs.
//!
//! The job stream endpoint emits server-sent events: chunks are buffered,
//! split on `\n\n`, and each `data:` payload is parsed into an
//! [`AssistantStreamEvent`]. A trailing partial event stays in the buffer
//! until the next chunk arrives.

use cr_domain::error::{Error, Result};
use cr_domain::stream::{AssistantStreamEvent, BoxStream};
use serde::Deserialize;

/// Extract complete `data:` payloads from an SSE buffer.
///
/// SSE events are delimited by `\n\n`. Each event block may contain
/// `event:`, `data:`, `id:`, or `retry:` lines; only `data:` lines carry
/// the job payload. The buffer is drained in-place.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2); // remove the \n\n delimiter

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Wire shape of one streamed job event.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Delta {
        text: String,
    },
    Completed,
    Failed {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Parse one `data:` payload into a stream event.
///
/// The `[DONE]` sentinel (emitted by some service versions after the
/// terminal event) is swallowed.
fn parse_data(data: &str) -> Option<Result<AssistantStreamEvent>> {
    if data == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<WireEvent>(data) {
        Ok(WireEvent::Delta { text }) => Some(Ok(AssistantStreamEvent::Delta { text })),
        Ok(WireEvent::Completed) => Some(Ok(AssistantStreamEvent::Completed)),
        Ok(WireEvent::Failed { reason }) => Some(Ok(AssistantStreamEvent::Failed {
            reason: reason.unwrap_or_else(|| "unspecified failure".into()),
        })),
        Err(e) => Some(Err(Error::UpstreamUnavailable(format!(
            "unparseable stream event: {e}: {data}"
        )))),
    }
}

/// Build a job event stream from an SSE `reqwest::Response`.
///
/// The stream buffers incoming chunks, drains complete SSE events, flushes
/// the remaining buffer when the body closes, and stops after the first
/// terminal event. If the body closes without a terminal event, a
/// `Completed` is synthesized so consumers always observe one.
pub(crate) fn job_event_stream(
    response: reqwest::Response,
) -> BoxStream<'static, Result<AssistantStreamEvent>> {
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut terminal_seen = false;

        'outer: loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));

                    for data in drain_data_lines(&mut buffer) {
                        if let Some(event) = parse_data(&data) {
                            let is_terminal = matches!(
                                &event,
                                Ok(AssistantStreamEvent::Completed)
                                    | Ok(AssistantStreamEvent::Failed { .. })
                            );
                            yield event;
                            if is_terminal {
                                terminal_seen = true;
                                break 'outer;
                            }
                        }
                    }
                }
                Ok(None) => {
                    // Body closed — flush any trailing partial event.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            if let Some(event) = parse_data(&data) {
                                let is_terminal = matches!(
                                    &event,
                                    Ok(AssistantStreamEvent::Completed)
                                        | Ok(AssistantStreamEvent::Failed { .. })
                                );
                                yield event;
                                if is_terminal {
                                    terminal_seen = true;
                                }
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(Error::UpstreamUnavailable(e.to_string()));
                    break;
                }
            }
        }

        if !terminal_seen {
            yield Ok(AssistantStreamEvent::Completed);
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

//! Server-sent-event framing for streamed completions.
//!
//! Chunks are buffered, split on `\n\n`, and each `data:` payload is fed
//! to a wire-format parser returning zero or more [`StreamEvent`]s.

use crate::util::from_reqwest;
use pl_domain::error::Result;
use pl_domain::stream::{BoxStream, StreamEvent};

/// Pull every complete event's `data:` payloads out of `buffer`, leaving a
/// trailing partial event in place. `event:`, `id:` and `retry:` lines
/// are ignored, as are empty payloads.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(end) = buffer.find("\n\n") {
        let block: String = buffer.drain(..end + 2).collect();
        payloads.extend(
            block
                .lines()
                .filter_map(|line| line.trim().strip_prefix("data:"))
                .map(str::trim)
                .filter(|data| !data.is_empty())
                .map(String::from),
        );
    }

    payloads
}

/// Turn an SSE response body into a [`BoxStream`] of parsed events.
///
/// A `Done` is appended when the parser never produced one, so consumers
/// can rely on every stream ending in `Done` or `Error`.
pub(crate) fn sse_response_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_seen = false;

        loop {
            let finished = match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    false
                }
                Ok(None) => {
                    // Flush a final event the server did not terminate.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                    }
                    true
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            };

            for data in drain_data_lines(&mut buffer) {
                for event in parse_data(&data) {
                    done_seen |= matches!(event, Ok(StreamEvent::Done { .. }));
                    yield event;
                }
            }

            if finished {
                break;
            }
        }

        if !done_seen {
            yield Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            });
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_events_are_drained() {
        let mut buf = String::from("event: message\ndata: first\n\ndata: second\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["first", "second"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_event_waits_for_more_bytes() {
        let mut buf = String::from("data: chunk1");
        assert!(drain_data_lines(&mut buf).is_empty());
        assert_eq!(buf, "data: chunk1");

        buf.push_str("\n\ndata: [DONE]\n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["chunk1", "[DONE]"]);
    }

    #[test]
    fn non_data_and_empty_lines_are_skipped() {
        let mut buf = String::from("id: 42\nretry: 5000\ndata: \n\ndata:   {\"k\":1}  \n\n");
        assert_eq!(drain_data_lines(&mut buf), vec!["{\"k\":1}"]);
    }
}

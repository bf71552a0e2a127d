//! Turns a chunked response body into a lazy sequence of [`StreamEvent`]s.
//!
//! Chunk boundaries may fall anywhere, including inside a multi-byte
//! character, so bytes are buffered until a full line is available. Lines
//! prefixed with `data: ` are parsed as JSON events; anything that fails to
//! parse is logged and skipped. Dropping the returned stream drops the body.

use async_stream::stream;
use futures_util::{Stream, StreamExt, pin_mut};
use shared::models::StreamEvent;
use tracing::{debug, warn};

use crate::api::{ClientError, ClientResult};

pub const DATA_PREFIX: &str = "data: ";

/// Decodes `body` into events.
///
/// A transport error is yielded once and ends the sequence. Reaching the end
/// of the body yields nothing further.
pub fn decode_events<S, B>(body: S) -> impl Stream<Item = ClientResult<StreamEvent>>
where
    S: Stream<Item = Result<B, ClientError>>,
    B: AsRef<[u8]>,
{
    stream! {
        pin_mut!(body);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(newline) = buffer.iter().position(|&byte| byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(event) = parse_line(&line[..line.len() - 1]) {
                    yield Ok(event);
                }
            }
        }

        if !buffer.is_empty() {
            if let Some(event) = parse_line(&buffer) {
                yield Ok(event);
            }
        }
    }
}

/// Parses one complete line; `None` for non-data lines and malformed frames.
pub fn parse_line(raw: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches('\r');
    let payload = line.strip_prefix(DATA_PREFIX)?;

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => {
            debug!(kind = event.kind(), "decoded stream event");
            Some(event)
        }
        Err(err) => {
            warn!(error = %err, payload, "dropping malformed stream frame");
            None
        }
    }
}

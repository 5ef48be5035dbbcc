//! Transport controller: one POST, one event stream, one terminal result.
mod config;

pub use config::{ClientConfig, DEFAULT_TIMEOUT};

use std::fmt;

use futures::{Stream, StreamExt as _};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use tracing::{Instrument as _, debug, info, info_span, warn};

use crate::errors::StreamError;
use crate::frame::FrameDecoder;
use crate::payload::DecodedEvent;
use crate::pipeline::{EventSink, PipelineMachine, PipelineRun, Tee};
use crate::request::{ENHANCE_ENDPOINT, EnhanceRequest};

/// Maximum characters of an error response body kept for diagnostics.
pub const ERROR_BODY_LIMIT: usize = 500;

/// Streaming client for the pipeline backend.
///
/// Holds no per-request state: every call owns its own decoder and run, so one
/// client can serve concurrent invocations.
#[derive(Clone)]
pub struct SseClient {
    client: reqwest::Client,
    config: ClientConfig,
    headers: HeaderMap,
}

impl SseClient {
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        if config.base_url.is_empty() {
            return Err(StreamError::Config("base_url must not be empty".into()));
        }
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| StreamError::Config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| StreamError::Config(format!("invalid value for header {name}: {e}")))?;
            headers.append(name, value);
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            headers,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Posts `body` and feeds every decoded event to `sink` as it arrives.
    ///
    /// Resolves once the server closes the stream. Rejects on transport failure,
    /// non-success status (before any frame is parsed) or when the configured
    /// timeout elapses first; in that case the connection is dropped.
    pub async fn post_sse<B, S>(
        &self,
        endpoint: &str,
        body: &B,
        sink: &mut S,
    ) -> Result<(), StreamError>
    where
        B: serde::Serialize + ?Sized,
        S: EventSink + ?Sized,
    {
        let url = self.config.endpoint_url(endpoint);
        let budget = self.config.timeout;
        match tokio::time::timeout(budget, self.exchange(&url, body, sink)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %url, timeout_secs = budget.as_secs(), "stream timed out");
                Err(StreamError::Timeout { after: budget })
            }
        }
    }

    /// Runs the enhancement pipeline and returns the finished run.
    ///
    /// Each event updates the run first and is then handed to `sink`.
    /// Logs emitted while the stream is read sit inside an `enhance` span carrying the run id.
    pub async fn enhance<S>(
        &self,
        request: &EnhanceRequest,
        sink: &mut S,
    ) -> Result<PipelineRun, StreamError>
    where
        S: EventSink + ?Sized,
    {
        request.validate()?;
        let mut machine = PipelineMachine::new();
        let span = info_span!("enhance", run_id = %machine.run_id());
        span.in_scope(|| {
            info!(search = request.agent_config.enable_search, "starting enhancement");
        });
        {
            let mut tee = Tee {
                first: &mut machine,
                second: sink,
            };
            self.post_sse(ENHANCE_ENDPOINT, request, &mut tee)
                .instrument(span.clone())
                .await?;
        }
        let run = machine.finish();
        span.in_scope(|| {
            info!(result_len = run.result().len(), failed = run.error().is_some(), "enhancement stream closed");
        });
        Ok(run)
    }

    /// Collects every decoded event of one stream.
    pub async fn collect_events<B>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Vec<DecodedEvent>, StreamError>
    where
        B: serde::Serialize + ?Sized,
    {
        let mut events = Vec::new();
        let mut sink = |event: &DecodedEvent| events.push(event.clone());
        self.post_sse(endpoint, body, &mut sink).await?;
        Ok(events)
    }

    async fn exchange<B, S>(&self, url: &str, body: &B, sink: &mut S) -> Result<(), StreamError>
    where
        B: serde::Serialize + ?Sized,
        S: EventSink + ?Sized,
    {
        let mut http_req = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .headers(self.headers.clone())
            .json(body);
        if let Some(token) = &self.config.bearer_token {
            http_req = http_req.bearer_auth(token);
        }
        debug!(url = %url, "sending streaming request");

        let response = http_req
            .send()
            .await
            .map_err(|e| StreamError::transport(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(url = %url, status = status.as_u16(), "non-success response");
            return Err(StreamError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, ERROR_BODY_LIMIT),
            });
        }

        pump_frames(response.bytes_stream(), sink).await.map(|_| ())
    }
}

/// Drives a decoder with a byte stream, delivering events to `sink`.
///
/// Returns the number of events delivered.
pub(crate) async fn pump_frames<St, E, S>(bytes: St, sink: &mut S) -> Result<usize, StreamError>
where
    St: Stream<Item = Result<bytes::Bytes, E>>,
    E: fmt::Display,
    S: EventSink + ?Sized,
{
    let mut bytes = std::pin::pin!(bytes);
    let mut decoder = FrameDecoder::new();
    let mut delivered = 0_usize;
    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| StreamError::transport(format!("stream read failed: {e}")))?;
        for frame in decoder.push_chunk(&chunk) {
            sink.on_event(&DecodedEvent::from(frame));
            delivered += 1;
        }
    }
    if let Some(tail) = decoder.finish() {
        warn!(
            bytes = tail.len(),
            "stream closed mid-line; dropping unterminated partial line"
        );
    }
    debug!(events = delivered, "stream ended");
    Ok(delivered)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&'static str]) -> Vec<Result<bytes::Bytes, String>> {
        parts
            .iter()
            .map(|p| Ok(bytes::Bytes::from_static(p.as_bytes())))
            .collect()
    }

    #[tokio::test]
    async fn pump_delivers_events_in_order() {
        let mut seen = Vec::new();
        let mut sink = |event: &DecodedEvent| seen.push(event.clone());
        let delivered = pump_frames(
            stream::iter(chunks(&[
                "event: agent1_start\nda",
                "ta: {}\n\nevent: agent1_complete\ndata: {\"duration_ms\":1}\n",
                "data: not-json\n",
            ])),
            &mut sink,
        )
        .await
        .expect("pump");
        assert_eq!(delivered, 3);
        assert_eq!(seen[0].event, "agent1_start");
        assert_eq!(seen[1].data["duration_ms"], 1);
        assert_eq!(seen[2].raw_text(), Some("not-json"));
    }

    #[tokio::test]
    async fn pump_propagates_read_errors() {
        let items = vec![
            Ok(bytes::Bytes::from_static(b"data: a\n")),
            Err("connection reset".to_string()),
        ];
        let mut count = 0;
        let mut sink = |_: &DecodedEvent| count += 1;
        let err = pump_frames(stream::iter(items), &mut sink)
            .await
            .expect_err("read error");
        assert!(matches!(err, StreamError::Transport { message } if message.contains("connection reset")));
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn pump_drops_unterminated_tail() {
        let mut count = 0;
        let mut sink = |_: &DecodedEvent| count += 1;
        let delivered = pump_frames(stream::iter(chunks(&["data: a\ndata: b"])), &mut sink)
            .await
            .expect("pump");
        assert_eq!(delivered, 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn invalid_custom_header_is_config_error() {
        let result = SseClient::new(ClientConfig::new("http://localhost").header("bad header", "v"));
        assert!(matches!(result, Err(StreamError::Config(_))));
    }

    #[test]
    fn empty_base_url_is_config_error() {
        assert!(matches!(
            SseClient::new(ClientConfig::new("  /")),
            Err(StreamError::Config(_))
        ));
    }
}

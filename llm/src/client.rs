use crate::error::LlmError;
use bytes::Bytes;
use futures::stream::Stream;
use futures::{
    StreamExt,
    stream::{self},
};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Debug, fmt::Display, pin::Pin};
use tracing::{Level, event, instrument, warn};

#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
}

pub type BoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Headers OpenAI-compatible services use to announce the limit that was hit
const RATE_LIMIT_HEADERS: [&str; 2] = ["x-ratelimit-limit-requests", "x-ratelimit-limit-tokens"];

impl Client {
    pub fn with_headers(headers: HeaderMap) -> anyhow::Result<Self> {
        Ok(Client {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
        })
    }

    #[instrument(level = "trace", skip(self, request))]
    pub async fn post<U, S, T>(&self, url: U, request: &S) -> anyhow::Result<T>
    where
        U: reqwest::IntoUrl + Debug,
        S: Serialize + Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(url).json(request).send().await?;
        let response = check_status(response).await?;
        let text = response.text().await?;
        event!(Level::TRACE, response = text);

        Ok(serde_json::from_str::<T>(&text)?)
    }

    /// POST a request and decode the response body as a line-oriented event stream.
    ///
    /// `process` maps each raw line to the JSON payload it carries, or `None`
    /// to skip the line (comments, keep-alives, terminators).
    #[instrument(level = "trace", skip(self, request, process))]
    pub async fn post_stream<U, S, F, T>(
        &self,
        url: U,
        request: &S,
        process: F,
    ) -> anyhow::Result<BoxedStream<anyhow::Result<T>>>
    where
        U: reqwest::IntoUrl + Debug,
        S: Serialize + Sized,
        T: DeserializeOwned + Send + 'static,
        F: Fn(&str) -> Option<&str> + 'static + Send,
    {
        let response = self.client.post(url).json(request).send().await?;
        let response = check_status(response).await?;
        Ok(decode_lines(response.bytes_stream(), process))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let limit = rate_limit_header(response.headers());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(LlmError::RateLimited {
            limit,
            message: body,
        })
    } else {
        Err(LlmError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

fn rate_limit_header(headers: &HeaderMap) -> Option<String> {
    RATE_LIMIT_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Split a byte stream into lines and parse each processed line as `T`.
///
/// Bytes are buffered until a full line arrives, so multi-byte characters
/// split across network chunks decode intact. Lines that fail to parse are
/// logged and skipped; a transport error is forwarded as an `Err` item.
pub(crate) fn decode_lines<B, E, F, T>(bytes: B, process: F) -> BoxedStream<anyhow::Result<T>>
where
    B: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
    F: Fn(&str) -> Option<&str> + 'static + Send,
    T: DeserializeOwned + Send + 'static,
{
    let buffered_stream = bytes.scan(Vec::<u8>::new(), move |buffer, chunk| {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let err = anyhow::Error::from(LlmError::Stream(e.to_string()));
                return futures::future::ready(Some(vec![Err(err)]));
            }
        };

        buffer.extend_from_slice(&chunk);

        let mut messages: Vec<anyhow::Result<T>> = vec![];
        let mut last_newline_pos = 0;

        while let Some(offset) = buffer[last_newline_pos..].iter().position(|b| *b == b'\n') {
            let end = last_newline_pos + offset;
            let line = String::from_utf8_lossy(&buffer[last_newline_pos..end]).into_owned();
            last_newline_pos = end + 1;

            if let Some(processed) = process(&line) {
                if !processed.trim().is_empty() {
                    match serde_json::from_str::<T>(processed) {
                        Ok(event) => messages.push(Ok(event)),
                        Err(e) => warn!("Failed to parse stream line: {}: {}", processed, e),
                    }
                }
            }
        }

        // Keep incomplete line in buffer
        buffer.drain(..last_newline_pos);

        futures::future::ready(Some(messages))
    });

    Box::pin(buffered_stream.flat_map(stream::iter))
}

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Status line and body of one (possibly ranged) GET.
///
/// `content_length` is the length of this response's body;
/// `total_size` is the full object size taken from `Content-Range`, which
/// only partial-content and range-not-satisfiable responses carry.
pub struct RangedResponse<E> {
    pub status: u16,
    pub content_length: Option<u64>,
    pub total_size: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, E>>,
}

/// Asynchronous HTTP client abstraction.
///
/// The minimal surface the transfer engine needs: one GET that may carry a
/// byte-range start. Implementations handle redirects and connection
/// management themselves.
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + 'static;

    /// Issue a GET for `url`, with `Range: bytes=<offset>-` when `offset`
    /// is nonzero.
    ///
    /// Non-2xx statuses are not transport failures: the engine interprets
    /// the status code itself, so implementations must return the response
    /// rather than erroring on 4xx/5xx.
    fn get(
        &self,
        url: &str,
        offset: u64,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<RangedResponse<Self::Error>, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use futures_util::StreamExt;

    /// Production HTTP client backed by `reqwest`.
    ///
    /// Redirects are followed by the underlying client. No request timeout
    /// is set: a transfer may legitimately take arbitrary time.
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
            let client = reqwest::Client::builder().user_agent(user_agent).build()?;
            Ok(Self { client })
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(
            &self,
            url: &str,
            offset: u64,
            headers: &[(String, String)],
        ) -> Result<RangedResponse<Self::Error>, Self::Error> {
            let mut request = self.client.get(url);
            if offset > 0 {
                request = request.header(reqwest::header::RANGE, format!("bytes={offset}-"));
            }
            for (key, value) in headers {
                request = request.header(key, value);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let content_length = response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            let total_size = response
                .headers()
                .get(reqwest::header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(content_range_total);

            Ok(RangedResponse {
                status,
                content_length,
                total_size,
                body: response.bytes_stream().boxed(),
            })
        }
    }

    /// Total from `bytes <start>-<end>/<total>` or `bytes */<total>`.
    fn content_range_total(value: &str) -> Option<u64> {
        value.rsplit('/').next()?.trim().parse().ok()
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream;
use tempfile::tempdir;

use hauler_fetch::{
    FetchError, FetchOptions, FetchOutcome, Fetcher, HttpClient, Progress, RangedResponse,
};

#[derive(Debug)]
struct MockError(String);

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockError {}

/// Serves a fixed byte array in 7-byte chunks, with knobs for refusing
/// ranges, cutting a call's stream short, overstating the declared length,
/// and forcing a status code.
struct ScriptedServer {
    data: Vec<u8>,
    honor_ranges: bool,
    /// Per-call scripts: cut the stream after this many bytes, then fail.
    cut_after: Mutex<Vec<Option<usize>>>,
    /// Added to the declared Content-Length without serving the bytes.
    overstate_by: u64,
    force_status: Option<u16>,
    calls: AtomicUsize,
}

impl ScriptedServer {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            honor_ranges: true,
            cut_after: Mutex::new(Vec::new()),
            overstate_by: 0,
            force_status: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpClient for ScriptedServer {
    type Error = MockError;

    async fn get(
        &self,
        _url: &str,
        offset: u64,
        _headers: &[(String, String)],
    ) -> Result<RangedResponse<MockError>, MockError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let cut = self.cut_after.lock().unwrap().get(call).copied().flatten();
        let total = self.data.len() as u64;

        if let Some(status) = self.force_status {
            return Ok(RangedResponse {
                status,
                content_length: None,
                total_size: None,
                body: Box::pin(stream::empty()),
            });
        }

        let (status, start, total_size) = if offset > 0 && self.honor_ranges {
            if offset >= total {
                return Ok(RangedResponse {
                    status: 416,
                    content_length: None,
                    total_size: Some(total),
                    body: Box::pin(stream::empty()),
                });
            }
            (206, offset as usize, Some(total))
        } else {
            (200, 0, None)
        };

        let declared = (self.data.len() - start) as u64 + self.overstate_by;
        let mut served = self.data[start..].to_vec();
        if let Some(cut) = cut {
            served.truncate(cut);
        }

        let mut items: Vec<Result<Bytes, MockError>> = served
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if cut.is_some() {
            items.push(Err(MockError("connection reset".into())));
        }

        Ok(RangedResponse {
            status,
            content_length: Some(declared),
            total_size,
            body: Box::pin(stream::iter(items)),
        })
    }
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn fresh_download_writes_all_bytes() {
    let data = payload(100);
    let server = ScriptedServer::new(data.clone());
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");

    let outcome = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Completed {
            bytes_fetched: 100,
            len: 100
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn interrupted_transfer_resumes_to_identical_bytes() {
    let data = payload(100);
    let server = ScriptedServer::new(data.clone());
    *server.cut_after.lock().unwrap() = vec![Some(13), None];
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");

    let err = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
    // The bytes that landed before the failure stay as the resume cursor.
    assert_eq!(std::fs::read(&dest).unwrap(), &data[..13]);

    let outcome = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FetchOutcome::Completed {
            bytes_fetched: 87,
            len: 100
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn resume_appends_from_existing_partial() {
    let data = payload(100);
    let server = ScriptedServer::new(data.clone());
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");
    std::fs::write(&dest, &data[..20]).unwrap();

    let outcome = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Completed {
            bytes_fetched: 80,
            len: 100
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn server_ignoring_range_restarts_fresh() {
    let data = payload(50);
    let mut server = ScriptedServer::new(data.clone());
    server.honor_ranges = false;
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");
    std::fs::write(&dest, b"stale bytes from some other attempt").unwrap();

    let outcome = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Completed {
            bytes_fetched: 50,
            len: 50
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn complete_file_short_circuits_without_streaming() {
    let data = payload(64);
    let server = ScriptedServer::new(data.clone());
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");
    std::fs::write(&dest, &data).unwrap();

    let outcome = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::AlreadyComplete { len: 64 });
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn auth_demand_is_surfaced_not_retried() {
    let mut server = ScriptedServer::new(payload(10));
    server.force_status = Some(401);
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");

    let err = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::AuthRequired(401)));
    assert_eq!(fetcher.client().calls(), 1);
}

#[tokio::test]
async fn size_mismatch_leaves_file_for_next_attempt() {
    let data = payload(40);
    let mut server = ScriptedServer::new(data.clone());
    server.overstate_by = 10;
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");

    let err = fetcher
        .fetch("http://x/file.zip", &dest, FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::SizeMismatch {
            expected: 50,
            actual: 40
        }
    ));
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn progress_reports_cumulative_position() {
    let data = payload(100);
    let server = ScriptedServer::new(data.clone());
    let fetcher = Fetcher::new(server);
    let dir = tempdir().unwrap();
    let dest = dir.path().join("artifact.zip");
    std::fs::write(&dest, &data[..30]).unwrap();

    let seen: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let options = FetchOptions::default()
        .on_progress(Arc::new(move |p: &Progress| sink.lock().unwrap().push(p.clone())));

    fetcher
        .fetch("http://x/file.zip", &dest, options)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let positions: Vec<u64> = seen.iter().map(|p| p.bytes_received).collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    // Resumed reporting starts at the on-disk offset, not zero.
    assert!(positions.iter().all(|&p| p >= 30));
    assert_eq!(positions.last(), Some(&100));
    assert_eq!(seen.last().unwrap().percentage(), Some(100.0));
}

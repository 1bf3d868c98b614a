//! Batch orchestrator.
//!
//! Uploads a list of items one after another, aggregates byte progress
//! across the whole batch, isolates per-file failures and cleans up open
//! server sessions on cancellation.

use std::sync::{Arc, Mutex, PoisonError};

use seeker_transfer::{GlobalProgress, UploadItem};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::UploadApi;
use crate::error::UploadError;
use crate::scanner::total_size;
use crate::session::{ActiveSessions, FileUpload};
use crate::types::{BatchResult, FileResult, UploadEvent, UploadOptions};

/// Orchestrates one upload batch.
///
/// Create one orchestrator per batch: its cancellation token cannot be
/// reset.
pub struct UploadOrchestrator {
    api: Arc<dyn UploadApi>,
    options: UploadOptions,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    progress_tx: Arc<watch::Sender<f64>>,
    cancel: CancellationToken,
    sessions: ActiveSessions,
    cleanup: Mutex<Vec<JoinHandle<()>>>,
}

impl UploadOrchestrator {
    /// Creates an orchestrator with the default chunk size and concurrency.
    pub fn new(api: Arc<dyn UploadApi>) -> Self {
        Self::with_options(api, UploadOptions::default())
    }

    pub fn with_options(api: Arc<dyn UploadApi>, options: UploadOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (progress_tx, _) = watch::channel(0.0);
        Self {
            api,
            options,
            events_tx,
            events_rx: Some(events_rx),
            progress_tx: Arc::new(progress_tx),
            cancel: CancellationToken::new(),
            sessions: ActiveSessions::new(),
            cleanup: Mutex::new(Vec::new()),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are only sent once the receiver has been taken. The batch
    /// waits for room in the channel, so the receiver must be drained
    /// while [`upload`](Self::upload) runs.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Raw transfer progress of the batch, 0–100.
    ///
    /// Holds the latest value only and never moves backwards.
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress_tx.subscribe()
    }

    /// Returns the cancellation token for this batch.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the batch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Upload ids currently open on the server.
    pub fn active_sessions(&self) -> Vec<String> {
        self.sessions.snapshot()
    }

    /// Uploads `items` into `destination`, in order.
    ///
    /// A failing file is recorded and the batch continues. Cancellation
    /// stops the batch, requests cleanup of every open session in the
    /// background and returns [`UploadError::Cancelled`].
    pub async fn upload(
        &self,
        destination: &str,
        items: Vec<UploadItem>,
    ) -> Result<BatchResult, UploadError> {
        let progress = Arc::new(GlobalProgress::new(total_size(&items)));
        let tx = Arc::clone(&self.progress_tx);
        progress.on_progress(Box::new(move |percent| {
            tx.send_if_modified(|current| {
                if percent > *current {
                    *current = percent;
                    true
                } else {
                    false
                }
            });
        }));

        info!(
            destination = %destination,
            files = items.len(),
            total_bytes = progress.total(),
            "upload batch started"
        );

        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.abort_batch().await;
                return Err(UploadError::Cancelled);
            }

            self.emit(UploadEvent::FileStarted {
                index,
                total,
                name: item.name().to_string(),
            })
            .await;

            let mut file = FileUpload::new(
                self.api.as_ref(),
                self.options,
                &self.cancel,
                &self.sessions,
            );

            match file.run(destination, item, &progress).await {
                Ok(path) => {
                    debug!(file = item.name(), path = %path, "file uploaded");
                    self.emit(UploadEvent::FileCompleted {
                        name: item.name().to_string(),
                    })
                    .await;
                    results.push(FileResult::succeeded(item.name()));
                }
                Err(e) if e.is_cancelled() => {
                    self.abort_batch().await;
                    return Err(e);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    error!(file = item.name(), error = %err_msg, "file upload failed");

                    // Count the whole file so the batch percentage keeps moving.
                    progress.add(item.size());

                    self.emit(UploadEvent::FileFailed {
                        name: item.name().to_string(),
                        error: err_msg.clone(),
                    })
                    .await;
                    results.push(FileResult::failed(item.name(), err_msg));
                }
            }
        }

        let batch = BatchResult::from_results(results);
        info!(
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            "upload batch finished"
        );
        Ok(batch)
    }

    /// Waits for every background cleanup request spawned so far.
    pub async fn wait_for_cleanup(&self) {
        let handles = std::mem::take(
            &mut *self.cleanup.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn abort_batch(&self) {
        self.discard_sessions();
        self.emit(UploadEvent::Cancelled).await;
    }

    /// Asks the server to discard every open session, without waiting.
    fn discard_sessions(&self) {
        let ids = self.sessions.drain();
        warn!(open_sessions = ids.len(), "upload batch cancelled");

        let mut cleanup = self.cleanup.lock().unwrap_or_else(PoisonError::into_inner);
        for upload_id in ids {
            let api = Arc::clone(&self.api);
            cleanup.push(tokio::spawn(async move {
                match api.cancel_upload(&upload_id).await {
                    Ok(resp) if resp.success => {
                        debug!(upload_id = %upload_id, "upload session discarded");
                    }
                    Ok(_) => {
                        warn!(upload_id = %upload_id, "server refused to discard upload session");
                    }
                    Err(e) => {
                        warn!(upload_id = %upload_id, error = %e, "failed to discard upload session");
                    }
                }
            }));
        }
    }

    async fn emit(&self, event: UploadEvent) {
        if self.events_rx.is_some() {
            return;
        }
        if self.events_tx.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiFuture;
    use bytes::Bytes;
    use seeker_protocol::{
        CancelUploadResponse, FinalizeUploadRequest, FinalizeUploadResponse, InitUploadRequest,
        InitUploadResponse,
    };
    use seeker_transfer::ChunkProgress;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Init(InitUploadRequest),
        Chunk(String, u64, usize),
        Finalize(FinalizeUploadRequest),
        Cancel(String),
    }

    /// Mock server. Calls are recorded when the request future is first
    /// polled, like a real request that is only sent once awaited.
    #[derive(Default)]
    struct MockApi {
        calls: Mutex<Vec<Call>>,
        next_id: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        chunk_delay: Duration,
        slow_chunks: HashMap<u64, Duration>,
        fail_chunks_of: Option<String>,
        fail_finalize_of: Option<String>,
        cancel_after_chunk: Mutex<Option<(String, u64, CancellationToken)>>,
    }

    impl MockApi {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn cancel_after(&self, upload_id: &str, index: u64, token: CancellationToken) {
            *self.cancel_after_chunk.lock().unwrap() = Some((upload_id.into(), index, token));
        }
    }

    impl UploadApi for MockApi {
        fn init_upload(&self, req: &InitUploadRequest) -> ApiFuture<'_, InitUploadResponse> {
            let req = req.clone();
            Box::pin(async move {
                self.record(Call::Init(req));
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(InitUploadResponse {
                    success: true,
                    upload_id: Some(format!("up-{n}")),
                    error: None,
                })
            })
        }

        fn upload_chunk(
            &self,
            upload_id: &str,
            chunk_index: u64,
            data: Bytes,
            progress: Arc<ChunkProgress>,
        ) -> ApiFuture<'_, ()> {
            let upload_id = upload_id.to_string();
            Box::pin(async move {
                self.record(Call::Chunk(upload_id.clone(), chunk_index, data.len()));
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                // Fragmented, duplicated and regressing transport reports.
                let len = data.len() as u64;
                progress.observe(len / 3);
                progress.observe(len / 3);
                progress.observe(len * 2 / 3);
                progress.observe(len / 4);

                let delay = self
                    .slow_chunks
                    .get(&chunk_index)
                    .copied()
                    .unwrap_or(self.chunk_delay);
                tokio::time::sleep(delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if self.fail_chunks_of.as_deref() == Some(upload_id.as_str()) {
                    return Err(UploadError::Api {
                        status: 500,
                        message: "disk full".into(),
                    });
                }

                let trigger = self.cancel_after_chunk.lock().unwrap().clone();
                if let Some((id, index, token)) = trigger
                    && id == upload_id
                    && index == chunk_index
                {
                    token.cancel();
                }
                Ok(())
            })
        }

        fn finalize_upload(
            &self,
            req: &FinalizeUploadRequest,
        ) -> ApiFuture<'_, FinalizeUploadResponse> {
            let req = req.clone();
            Box::pin(async move {
                let fail = self.fail_finalize_of.as_deref() == Some(req.filename.as_str());
                let path = format!("{}/{}", req.path, req.filename);
                self.record(Call::Finalize(req));
                if fail {
                    return Ok(FinalizeUploadResponse {
                        success: false,
                        path: None,
                        error: Some("assembly failed".into()),
                    });
                }
                Ok(FinalizeUploadResponse {
                    success: true,
                    path: Some(path),
                    error: None,
                })
            })
        }

        fn cancel_upload(&self, upload_id: &str) -> ApiFuture<'_, CancelUploadResponse> {
            let upload_id = upload_id.to_string();
            Box::pin(async move {
                self.record(Call::Cancel(upload_id));
                Ok(CancelUploadResponse { success: true })
            })
        }
    }

    fn small_chunks(chunk_size: usize) -> UploadOptions {
        UploadOptions {
            chunk_size,
            concurrency: 4,
        }
    }

    async fn drain(mut rx: mpsc::Receiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn twenty_five_mib_file_uses_three_chunks() {
        let api = Arc::new(MockApi::default());
        let orch = UploadOrchestrator::new(api.clone());
        let progress = orch.progress();

        let item = UploadItem::from_bytes("big.bin", vec![0u8; 25 * 1024 * 1024]);
        let batch = orch.upload("/data", vec![item]).await.unwrap();
        assert!(batch.success);
        assert_eq!(batch.results, vec![FileResult::succeeded("big.bin")]);

        let calls = api.calls();
        let inits: Vec<_> = calls.iter().filter(|c| matches!(c, Call::Init(_))).collect();
        assert_eq!(inits.len(), 1);
        assert!(matches!(inits[0], Call::Init(r) if r.total_chunks == 3));

        let mut lens: Vec<usize> = calls
            .iter()
            .filter_map(|c| match c {
                Call::Chunk(_, _, len) => Some(*len),
                _ => None,
            })
            .collect();
        lens.sort_unstable();
        let mib = 1024 * 1024;
        assert_eq!(lens, vec![5 * mib, 10 * mib, 10 * mib]);

        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::Finalize(_))).count(),
            1
        );
        assert!(matches!(calls.last(), Some(Call::Finalize(_))));
        assert_eq!(*progress.borrow(), 100.0);
    }

    #[tokio::test]
    async fn second_finalize_failure_is_isolated() {
        let api = Arc::new(MockApi {
            fail_finalize_of: Some("b.txt".into()),
            ..Default::default()
        });
        let orch = UploadOrchestrator::with_options(api.clone(), small_chunks(4));

        let items = vec![
            UploadItem::from_bytes("a.txt", b"hello".to_vec()),
            UploadItem::from_bytes("b.txt", b"world".to_vec()),
        ];
        let batch = orch.upload("/docs", items).await.unwrap();

        assert!(!batch.success);
        assert_eq!(
            batch.results,
            vec![
                FileResult::succeeded("a.txt"),
                FileResult::failed("b.txt", "assembly failed"),
            ]
        );
    }

    #[tokio::test]
    async fn chunk_failure_does_not_stop_later_files() {
        let api = Arc::new(MockApi {
            fail_chunks_of: Some("up-1".into()),
            ..Default::default()
        });
        let mut orch = UploadOrchestrator::with_options(api.clone(), small_chunks(4));
        let rx = orch.take_events().unwrap();

        let items = vec![
            UploadItem::from_bytes("a", vec![1u8; 8]),
            UploadItem::from_bytes("b", vec![2u8; 8]),
        ];
        let batch = orch.upload("/", items).await.unwrap();

        assert!(!batch.success);
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(
            batch.results[0].error.as_deref(),
            Some("server returned 500: disk full")
        );
        assert!(batch.results[1].success);

        let calls = api.calls();
        assert!(!calls.contains(&Call::Finalize(FinalizeUploadRequest {
            upload_id: "up-1".into(),
            path: "/".into(),
            filename: "a".into(),
        })));
        assert!(calls.iter().any(|c| matches!(c, Call::Finalize(r) if r.upload_id == "up-2")));

        drop(orch);
        let events = drain(rx).await;
        assert!(events.contains(&UploadEvent::FileFailed {
            name: "a".into(),
            error: "server returned 500: disk full".into(),
        }));
        assert!(events.contains(&UploadEvent::FileCompleted { name: "b".into() }));
    }

    #[tokio::test]
    async fn failed_file_counts_its_full_size() {
        let api = Arc::new(MockApi {
            fail_chunks_of: Some("up-1".into()),
            ..Default::default()
        });
        let mut orch = UploadOrchestrator::with_options(api.clone(), small_chunks(100));
        let mut rx = orch.take_events().unwrap();
        let mut progress = orch.progress();

        let items = vec![
            UploadItem::from_bytes("a", vec![1u8; 10]),
            UploadItem::from_bytes("b", vec![2u8; 30]),
        ];
        let (batch, at_failure) = tokio::join!(orch.upload("/", items), async {
            loop {
                match rx.recv().await {
                    Some(UploadEvent::FileFailed { .. }) => break *progress.borrow_and_update(),
                    Some(_) => {}
                    None => panic!("batch ended without a failure"),
                }
            }
        });
        assert_eq!(batch.unwrap().succeeded(), 1);

        // By the time the failure is reported all of file `a` (10 of 40
        // bytes) is counted.
        assert!(at_failure >= 25.0);
        assert_eq!(*progress.borrow(), 100.0);
    }

    #[tokio::test]
    async fn cancel_after_first_of_three_chunks() {
        let api = Arc::new(MockApi {
            chunk_delay: Duration::from_secs(30),
            slow_chunks: HashMap::from([(0, Duration::from_millis(1))]),
            ..Default::default()
        });
        let mut orch = UploadOrchestrator::with_options(api.clone(), small_chunks(10));
        api.cancel_after("up-1", 0, orch.cancel_token());
        let rx = orch.take_events().unwrap();

        let item = UploadItem::from_bytes("movie.mkv", vec![9u8; 25]);
        let err = orch.upload("/videos", vec![item]).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(orch.active_sessions().is_empty());

        orch.wait_for_cleanup().await;
        let calls = api.calls();
        assert!(calls.contains(&Call::Cancel("up-1".into())));
        assert!(!calls.iter().any(|c| matches!(c, Call::Finalize(_))));

        drop(orch);
        let events = drain(rx).await;
        assert_eq!(events.last(), Some(&UploadEvent::Cancelled));
    }

    #[tokio::test]
    async fn cancel_mid_batch_skips_later_files() {
        let api = Arc::new(MockApi::default());
        let orch = UploadOrchestrator::with_options(api.clone(), small_chunks(64));
        api.cancel_after("up-1", 0, orch.cancel_token());

        let items = vec![
            UploadItem::from_bytes("a", vec![1u8; 16]),
            UploadItem::from_bytes("b", vec![2u8; 16]),
            UploadItem::from_bytes("c", vec![3u8; 16]),
        ];
        let err = orch.upload("/", items).await.unwrap_err();
        assert!(err.is_cancelled());
        orch.wait_for_cleanup().await;

        let calls = api.calls();
        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::Init(_))).count(),
            1
        );
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::Chunk(id, _, _) if id != "up-1")));
        assert!(!calls.iter().any(|c| matches!(c, Call::Finalize(_))));
        assert_eq!(calls.last(), Some(&Call::Cancel("up-1".into())));
    }

    #[tokio::test]
    async fn pre_cancelled_batch_makes_no_requests() {
        let api = Arc::new(MockApi::default());
        let mut orch = UploadOrchestrator::new(api.clone());
        let rx = orch.take_events().unwrap();
        orch.cancel();

        let items = vec![UploadItem::from_bytes("a", vec![1u8; 4])];
        let err = orch.upload("/", items).await.unwrap_err();
        assert!(err.is_cancelled());
        orch.wait_for_cleanup().await;
        assert!(api.calls().is_empty());

        drop(orch);
        assert_eq!(drain(rx).await, vec![UploadEvent::Cancelled]);
    }

    #[tokio::test]
    async fn relative_path_reaches_finalize() {
        let api = Arc::new(MockApi::default());
        let orch = UploadOrchestrator::new(api.clone());

        let item = UploadItem::from_bytes("a.jpg", vec![1u8; 3])
            .with_relative_path("/photos\\2024/a.jpg");
        orch.upload("/media", vec![item]).await.unwrap();

        let expected = FinalizeUploadRequest {
            upload_id: "up-1".into(),
            path: "/media/photos/2024".into(),
            filename: "a.jpg".into(),
        };
        assert!(api.calls().contains(&Call::Finalize(expected)));
    }

    #[tokio::test]
    async fn chunk_requests_are_bounded() {
        let api = Arc::new(MockApi {
            chunk_delay: Duration::from_millis(5),
            ..Default::default()
        });
        let orch = UploadOrchestrator::with_options(api.clone(), small_chunks(1));

        let item = UploadItem::from_bytes("a", vec![0u8; 12]);
        let batch = orch.upload("/", vec![item]).await.unwrap();
        assert!(batch.success);
        assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 4);
        assert_eq!(
            api.calls().iter().filter(|c| matches!(c, Call::Chunk(..))).count(),
            12
        );
    }

    #[tokio::test]
    async fn events_follow_file_order() {
        let api = Arc::new(MockApi::default());
        let mut orch = UploadOrchestrator::new(api.clone());
        let rx = orch.take_events().unwrap();

        let items = vec![
            UploadItem::from_bytes("one", vec![1u8; 2]),
            UploadItem::from_bytes("two", vec![2u8; 2]),
        ];
        orch.upload("/", items).await.unwrap();
        drop(orch);

        assert_eq!(
            drain(rx).await,
            vec![
                UploadEvent::FileStarted {
                    index: 0,
                    total: 2,
                    name: "one".into(),
                },
                UploadEvent::FileCompleted { name: "one".into() },
                UploadEvent::FileStarted {
                    index: 1,
                    total: 2,
                    name: "two".into(),
                },
                UploadEvent::FileCompleted { name: "two".into() },
            ]
        );
    }

    #[tokio::test]
    async fn many_small_chunks_keep_every_lifecycle_event() {
        let api = Arc::new(MockApi::default());
        let mut orch = UploadOrchestrator::with_options(api.clone(), small_chunks(1));
        let mut rx = orch.take_events().unwrap();
        let mut progress = orch.progress();

        let items: Vec<_> = (0..3)
            .map(|i| UploadItem::from_bytes(format!("f{i}"), vec![0u8; 400]))
            .collect();
        let (batch, events) = tokio::join!(orch.upload("/", items), async {
            let mut events = Vec::new();
            let mut last = 0.0;
            while events.len() < 6 {
                tokio::select! {
                    Some(event) = rx.recv() => events.push(event),
                    Ok(()) = progress.changed() => {
                        let now = *progress.borrow_and_update();
                        assert!(now >= last);
                        last = now;
                    }
                }
            }
            events
        });
        assert!(batch.unwrap().success);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, UploadEvent::FileCompleted { .. }))
                .count(),
            3
        );
        assert_eq!(*progress.borrow(), 100.0);
    }

    #[tokio::test]
    async fn untaken_receiver_does_not_block_the_batch() {
        let api = Arc::new(MockApi::default());
        let orch = UploadOrchestrator::new(api.clone());

        let items: Vec<_> = (0..300)
            .map(|i| UploadItem::from_bytes(format!("f{i}"), vec![1u8; 2]))
            .collect();
        let batch = tokio::time::timeout(Duration::from_secs(10), orch.upload("/", items))
            .await
            .expect("batch stalled")
            .unwrap();
        assert_eq!(batch.succeeded(), 300);
    }

    #[tokio::test]
    async fn empty_batch_succeeds() {
        let api = Arc::new(MockApi::default());
        let orch = UploadOrchestrator::new(api.clone());
        let batch = orch.upload("/", Vec::new()).await.unwrap();
        assert!(batch.success);
        assert!(batch.results.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn take_events_once() {
        let mut orch = UploadOrchestrator::new(Arc::new(MockApi::default()));
        assert!(orch.take_events().is_some());
        assert!(orch.take_events().is_none());
    }
}

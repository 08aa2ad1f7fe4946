// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion orchestration — run one export at a time on a blocking worker and
// report its progress as `CoreEvent`s.
//
// State machine: Idle -> Running -> {Succeeded, Failed} -> (acknowledge) -> Idle.
// The worker records the terminal state before it sends `Finished`, so a
// receiver that sees `Finished` also sees the terminal status.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::types::{ConversionOutcome, ConversionStatus, CoreEvent, ExportRequest, ProgressEvent, RunId};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::export::{Exporter, ProgressSink, run_export};

/// Forwards exporter events onto the presentation channel.
///
/// A closed channel is not an error: the export still runs to completion.
pub struct ChannelSink {
    events: UnboundedSender<CoreEvent>,
}

impl ChannelSink {
    pub fn new(events: UnboundedSender<CoreEvent>) -> Self {
        Self { events }
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, event: ProgressEvent) {
        let _ = self.events.send(CoreEvent::Progress(event));
    }

    fn on_log(&self, message: &str) {
        let _ = self.events.send(CoreEvent::Log(message.to_string()));
    }
}

#[derive(Debug, Default)]
struct RunState {
    status: ConversionStatus,
    run_id: Option<RunId>,
    outcome: Option<ConversionOutcome>,
}

/// A started conversion.
pub struct RunHandle {
    pub id: RunId,
    join: JoinHandle<ConversionOutcome>,
}

impl RunHandle {
    /// Wait for the worker and return its outcome.
    pub async fn wait(self) -> ConversionOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => ConversionOutcome::failed(&BindwerkError::Worker(err.to_string())),
        }
    }
}

/// Owns the conversion state machine.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    state: Arc<Mutex<RunState>>,
    /// Fixed exporter; `None` picks one from the request's output format.
    exporter: Option<Arc<dyn Exporter>>,
}

impl Default for ConversionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionOrchestrator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::default())),
            exporter: None,
        }
    }

    /// Orchestrator that always runs `exporter`, whatever the output format.
    pub fn with_exporter(exporter: Arc<dyn Exporter>) -> Self {
        Self {
            exporter: Some(exporter),
            ..Self::new()
        }
    }

    pub fn status(&self) -> ConversionStatus {
        self.lock().status
    }

    /// Id of the current or most recent run.
    pub fn run_id(&self) -> Option<RunId> {
        self.lock().run_id
    }

    /// Outcome of the last run, until acknowledged.
    pub fn last_outcome(&self) -> Option<ConversionOutcome> {
        self.lock().outcome.clone()
    }

    /// Validate `request` and start it on a blocking worker.
    ///
    /// Rejected without side effects when a run is active or unacknowledged,
    /// when the request is invalid, or when no Tokio runtime is available.
    pub fn start(&self, request: ExportRequest, events: UnboundedSender<CoreEvent>) -> Result<RunHandle> {
        let mut state = self.lock();
        if state.status != ConversionStatus::Idle {
            warn!(status = ?state.status, "Conversion request rejected: run in progress");
            return Err(BindwerkError::ConversionInProgress);
        }
        request.validate()?;
        let runtime = Handle::try_current().map_err(|_| BindwerkError::NoRuntime)?;

        let id = RunId::new();
        state.status = ConversionStatus::Running;
        state.run_id = Some(id);
        state.outcome = None;
        drop(state);

        info!(
            run = %id,
            format = ?request.output_format,
            images = request.entries.len(),
            output = %request.output_path.display(),
            "Conversion started"
        );

        let shared = Arc::clone(&self.state);
        let exporter = self.exporter.clone();
        let join = runtime.spawn(async move {
            let sink = ChannelSink::new(events.clone());
            let worker = tokio::task::spawn_blocking(move || match exporter {
                Some(exporter) => exporter.export(&request, &sink),
                None => run_export(&request, &sink),
            });

            let outcome = match worker.await {
                Ok(Ok(result)) => {
                    info!(run = %id, written = result.items_written, skipped = result.items_skipped, "Conversion succeeded");
                    ConversionOutcome::Succeeded(result)
                }
                Ok(Err(err)) => {
                    error!(run = %id, %err, "Conversion failed");
                    ConversionOutcome::failed(&err)
                }
                Err(join_err) => {
                    error!(run = %id, %join_err, "Conversion worker died");
                    ConversionOutcome::failed(&BindwerkError::Worker(join_err.to_string()))
                }
            };

            {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                state.status = outcome.status();
                state.outcome = Some(outcome.clone());
            }
            let _ = events.send(CoreEvent::Finished(outcome.clone()));
            outcome
        });

        Ok(RunHandle { id, join })
    }

    /// Return a terminal state to Idle. Returns whether anything changed.
    pub fn acknowledge(&self) -> bool {
        let mut state = self.lock();
        if !state.status.is_terminal() {
            return false;
        }
        state.status = ConversionStatus::Idle;
        state.outcome = None;
        true
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::mpsc as std_mpsc;

    use bindwerk_core::types::{ErrorClass, ExportResult, ImageEntry, OutputFormat, PagedMode};
    use chrono::Utc;
    use image::{Rgb, RgbImage};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    /// Exporter that blocks until released, then reports one written item.
    struct GateExporter {
        release: Mutex<std_mpsc::Receiver<()>>,
    }

    impl Exporter for GateExporter {
        fn export(&self, request: &ExportRequest, sink: &dyn ProgressSink) -> Result<ExportResult> {
            let _ = self.release.lock().unwrap().recv();
            sink.on_progress(ProgressEvent {
                index: 0,
                total: 1,
                label: "gate".to_string(),
            });
            Ok(ExportResult {
                output_path: request.output_path.clone(),
                output_format: request.output_format,
                output_size_bytes: 1,
                items_written: 1,
                items_skipped: 0,
                source_bytes: 1,
                completed_at: Utc::now(),
            })
        }
    }

    struct PanicExporter;

    impl Exporter for PanicExporter {
        fn export(&self, _: &ExportRequest, _: &dyn ProgressSink) -> Result<ExportResult> {
            panic!("exporter blew up");
        }
    }

    fn request_for(dir: &Path) -> ExportRequest {
        let path = dir.join("a.png");
        RgbImage::from_pixel(4, 4, Rgb([9, 9, 9])).save(&path).unwrap();
        let size = std::fs::metadata(&path).unwrap().len();
        ExportRequest::paged(vec![ImageEntry::new(path, size)], dir.join("out.pdf"), PagedMode::Lossless)
    }

    fn dummy_request() -> ExportRequest {
        ExportRequest::paged(
            vec![ImageEntry::new(PathBuf::from("x.png"), 1)],
            PathBuf::from("x.pdf"),
            PagedMode::Lossless,
        )
    }

    async fn drain(mut rx: UnboundedReceiver<CoreEvent>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let finished = matches!(event, CoreEvent::Finished(_));
            events.push(event);
            if finished {
                break;
            }
        }
        events
    }

    #[tokio::test]
    async fn empty_request_is_rejected_and_state_stays_idle() {
        let orchestrator = ConversionOrchestrator::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let request = ExportRequest::paged(Vec::new(), "out.pdf", PagedMode::Lossless);

        let err = orchestrator.start(request, tx).err().unwrap();
        assert!(matches!(err, BindwerkError::EmptyCatalog));
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(orchestrator.status(), ConversionStatus::Idle);
        assert!(orchestrator.run_id().is_none());
    }

    #[tokio::test]
    async fn real_export_finishes_with_success() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = ConversionOrchestrator::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = orchestrator.start(request_for(dir.path()), tx).unwrap();
        let events = drain(rx).await;

        assert!(events.iter().any(|e| matches!(e, CoreEvent::Progress(p) if p.index == 0)));
        assert!(events.iter().any(|e| matches!(e, CoreEvent::Log(_))));
        match events.last() {
            Some(CoreEvent::Finished(ConversionOutcome::Succeeded(result))) => {
                assert_eq!(result.output_format, OutputFormat::PagedDocument);
                assert_eq!(result.items_written, 1);
            }
            other => panic!("unexpected final event {other:?}"),
        }
        // Terminal state is visible as soon as Finished arrives.
        assert_eq!(orchestrator.status(), ConversionStatus::Succeeded);
        assert!(matches!(handle.wait().await, ConversionOutcome::Succeeded(_)));
        assert!(dir.path().join("out.pdf").exists());
    }

    #[tokio::test]
    async fn second_start_while_running_is_rejected() {
        let (release_tx, release_rx) = std_mpsc::channel();
        let orchestrator = ConversionOrchestrator::with_exporter(Arc::new(GateExporter {
            release: Mutex::new(release_rx),
        }));
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = orchestrator.start(dummy_request(), tx.clone()).unwrap();
        assert_eq!(orchestrator.status(), ConversionStatus::Running);

        let err = orchestrator.start(dummy_request(), tx).err().unwrap();
        assert!(matches!(err, BindwerkError::ConversionInProgress));
        assert_eq!(orchestrator.run_id(), Some(handle.id));

        release_tx.send(()).unwrap();
        let events = drain(rx).await;
        assert!(matches!(events.last(), Some(CoreEvent::Finished(ConversionOutcome::Succeeded(_)))));
        assert_eq!(orchestrator.status(), ConversionStatus::Succeeded);

        // Unacknowledged terminal state still blocks new runs.
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            orchestrator.start(dummy_request(), tx).err(),
            Some(BindwerkError::ConversionInProgress)
        ));
    }

    #[tokio::test]
    async fn acknowledge_returns_to_idle() {
        let (release_tx, release_rx) = std_mpsc::channel();
        let orchestrator = ConversionOrchestrator::with_exporter(Arc::new(GateExporter {
            release: Mutex::new(release_rx),
        }));
        assert!(!orchestrator.acknowledge());

        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = orchestrator.start(dummy_request(), tx).unwrap();
        assert!(!orchestrator.acknowledge());
        release_tx.send(()).unwrap();
        handle.wait().await;

        assert!(orchestrator.last_outcome().is_some());
        assert!(orchestrator.acknowledge());
        assert_eq!(orchestrator.status(), ConversionStatus::Idle);
        assert!(orchestrator.last_outcome().is_none());
    }

    #[tokio::test]
    async fn fatal_export_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = ConversionOrchestrator::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let request = ExportRequest::paged(
            vec![ImageEntry::new(dir.path().join("missing.png"), 0)],
            dir.path().join("out.pdf"),
            PagedMode::Lossless,
        );

        orchestrator.start(request, tx).unwrap();
        let events = drain(rx).await;
        match events.last() {
            Some(CoreEvent::Finished(ConversionOutcome::Failed { class, .. })) => {
                assert_eq!(*class, ErrorClass::Fatal)
            }
            other => panic!("unexpected final event {other:?}"),
        }
        assert_eq!(orchestrator.status(), ConversionStatus::Failed);
    }

    #[tokio::test]
    async fn panicking_worker_becomes_failed() {
        let orchestrator = ConversionOrchestrator::with_exporter(Arc::new(PanicExporter));
        let (tx, rx) = mpsc::unbounded_channel();

        orchestrator.start(dummy_request(), tx).unwrap();
        let events = drain(rx).await;
        assert!(matches!(
            events.last(),
            Some(CoreEvent::Finished(ConversionOutcome::Failed {
                class: ErrorClass::Fatal,
                ..
            }))
        ));
        assert_eq!(orchestrator.status(), ConversionStatus::Failed);
    }

    #[test]
    fn start_without_runtime_is_rejected() {
        let orchestrator = ConversionOrchestrator::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = orchestrator.start(dummy_request(), tx).err().unwrap();
        assert!(matches!(err, BindwerkError::NoRuntime));
        assert_eq!(orchestrator.status(), ConversionStatus::Idle);
    }
}

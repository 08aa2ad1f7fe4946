// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session — the core-facing interface used by the front end.
//
// Owns the catalog and the conversion orchestrator. Every catalog change is
// published as `CatalogUpdated`; scan diagnostics and export progress arrive
// on the same channel.

use std::path::{Path, PathBuf};

use bindwerk_core::AppConfig;
use bindwerk_core::error::{BindwerkError, Result};
use bindwerk_core::types::{ConversionStatus, CoreEvent, DeckLayout, ExportRequest, OutputFormat, PagedMode, ScanFilter};
use bindwerk_document::catalog::with_output_extension;
use bindwerk_document::{ConversionOrchestrator, ImageCatalog, RunHandle};
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::state::ViewState;

pub struct Session {
    config: AppConfig,
    catalog: ImageCatalog,
    orchestrator: ConversionOrchestrator,
    events: UnboundedSender<CoreEvent>,
}

impl Session {
    pub fn new(config: AppConfig, events: UnboundedSender<CoreEvent>) -> Self {
        Self {
            config,
            catalog: ImageCatalog::default(),
            orchestrator: ConversionOrchestrator::new(),
            events,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    pub fn status(&self) -> ConversionStatus {
        self.orchestrator.status()
    }

    pub fn view_state(&self, selection: &[usize]) -> ViewState {
        let outcome = self.orchestrator.last_outcome();
        ViewState::derive(&self.catalog, selection, self.status(), outcome.as_ref())
    }

    /// Replace the catalog with the images in `directory`. Returns the new count.
    pub fn request_scan(&mut self, directory: &Path, filter: ScanFilter) -> usize {
        let report = ImageCatalog::scan(directory, filter);
        for diagnostic in &report.diagnostics {
            self.emit(CoreEvent::Log(diagnostic.clone()));
        }
        info!(
            directory = %directory.display(),
            found = report.catalog.len(),
            ignored = report.ignored,
            "Catalog replaced"
        );
        self.catalog = report.catalog;
        self.publish_catalog();
        self.catalog.len()
    }

    /// Returns the selection after the move.
    pub fn request_move_up(&mut self, selected: &[usize]) -> Result<Vec<usize>> {
        self.ensure_editable()?;
        let selection = self.catalog.move_up(selected);
        self.publish_catalog();
        Ok(selection)
    }

    /// Returns the selection after the move.
    pub fn request_move_down(&mut self, selected: &[usize]) -> Result<Vec<usize>> {
        self.ensure_editable()?;
        let selection = self.catalog.move_down(selected);
        self.publish_catalog();
        Ok(selection)
    }

    /// Returns how many entries were removed.
    pub fn request_remove(&mut self, indices: &[usize]) -> Result<usize> {
        self.ensure_editable()?;
        let removed = self.catalog.remove_at(indices);
        if removed > 0 {
            self.publish_catalog();
        }
        Ok(removed)
    }

    /// Start converting the current catalog.
    ///
    /// Without `output_path` the output is derived from the first image. An
    /// explicit path whose extension does not name `format` has it replaced.
    pub fn request_export(
        &self,
        format: OutputFormat,
        output_path: Option<PathBuf>,
        paged_mode: PagedMode,
        deck_layout: DeckLayout,
    ) -> Result<RunHandle> {
        let output_path = match output_path {
            Some(path) if !path.as_os_str().is_empty() && OutputFormat::from_path(&path) != Some(format) => {
                with_output_extension(&path, format)
            }
            Some(path) => path,
            None => self
                .catalog
                .default_output_path(format, &self.config.output_suffix)
                .unwrap_or_default(),
        };
        let entries = self.catalog.entries().to_vec();
        let request = match format {
            OutputFormat::PagedDocument => ExportRequest::paged(entries, output_path, paged_mode),
            OutputFormat::SlideDeck => ExportRequest::deck(entries, output_path, deck_layout),
        };
        self.orchestrator.start(request, self.events.clone())
    }

    /// Return a finished conversion to Idle.
    pub fn acknowledge(&self) -> bool {
        self.orchestrator.acknowledge()
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.status() == ConversionStatus::Running {
            return Err(BindwerkError::ConversionInProgress);
        }
        Ok(())
    }

    fn publish_catalog(&self) {
        self.emit(CoreEvent::CatalogUpdated(self.catalog.entries().to_vec()));
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.events.send(event);
    }
}

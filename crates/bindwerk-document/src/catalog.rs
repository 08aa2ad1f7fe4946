// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image catalog — the ordered list of images that becomes the page/slide order.
//
// A catalog is rebuilt wholesale by every scan and is otherwise only edited by
// adjacent swaps and index-based removal. Nothing here writes to disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use bindwerk_core::types::{ImageEntry, OutputFormat, ScanFilter};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::image::probe_dimensions;

/// Outcome of a folder scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub catalog: ImageCatalog,
    /// Regular files that were present but not admitted by the filter.
    pub ignored: usize,
    /// Problems worth showing to the user (missing folder, unreadable entry).
    pub diagnostics: Vec<String>,
}

/// Ordered, duplicate-free list of images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCatalog {
    entries: Vec<ImageEntry>,
}

impl ImageCatalog {
    /// Build a catalog from entries already in the desired order.
    ///
    /// Later duplicates of a path are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = ImageEntry>) -> Self {
        let mut seen = BTreeSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.path.clone()))
            .collect();
        Self { entries }
    }

    // -- Scanning -------------------------------------------------------------

    /// Enumerate the images directly inside `directory`.
    ///
    /// Subdirectories are not descended into. The result is sorted ascending by
    /// path regardless of the order the filesystem reports entries in. A missing
    /// or non-directory path yields an empty catalog and a diagnostic.
    #[instrument(skip_all, fields(directory = %directory.as_ref().display(), ?filter))]
    pub fn scan(directory: impl AsRef<Path>, filter: ScanFilter) -> ScanReport {
        let directory = directory.as_ref();
        let mut report = ScanReport::default();

        if !directory.is_dir() {
            let msg = format!("not a folder: {}", directory.display());
            warn!("{msg}");
            report.diagnostics.push(msg);
            return report;
        }

        // Identity is the absolute path; resolve the folder once so every
        // entry shares the same prefix.
        let root = directory
            .canonicalize()
            .unwrap_or_else(|_| directory.to_path_buf());

        let mut found: BTreeMap<PathBuf, ImageEntry> = BTreeMap::new();
        for item in WalkDir::new(&root).min_depth(1).max_depth(1) {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    report.diagnostics.push(format!("skipped unreadable entry: {err}"));
                    continue;
                }
            };
            let path = item.path();
            if !path.is_file() {
                continue;
            }

            let admitted = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| filter.allows(ext));
            if !admitted {
                report.ignored += 1;
                continue;
            }

            if found.contains_key(path) {
                continue;
            }
            let size_bytes = match path.metadata() {
                Ok(meta) => meta.len(),
                Err(err) => {
                    report
                        .diagnostics
                        .push(format!("cannot stat {}: {err}", path.display()));
                    continue;
                }
            };
            let mut entry = ImageEntry::new(path, size_bytes);
            match probe_dimensions(path) {
                Ok((width, height)) => entry = entry.with_dimensions(width, height),
                Err(err) => debug!(%err, "dimensions unavailable"),
            }
            found.insert(path.to_path_buf(), entry);
        }

        report.catalog = Self {
            entries: found.into_values().collect(),
        };
        info!(
            images = report.catalog.len(),
            ignored = report.ignored,
            "Scan complete"
        );
        report
    }

    // -- Accessors ------------------------------------------------------------

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageEntry> {
        self.entries.get(index)
    }

    /// Sum of the on-disk sizes of every entry.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size_bytes).sum()
    }

    /// List lines, numbered from 1.
    pub fn display_labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.display_label(index))
            .collect()
    }

    // -- Reordering -----------------------------------------------------------

    /// Move every selected entry one slot toward the front.
    ///
    /// An entry at index 0 stays put, and so does a selected entry directly
    /// behind one that stayed. Returns the selection remapped to follow the
    /// moved entries.
    pub fn move_up(&mut self, selected: &[usize]) -> Vec<usize> {
        let selection = normalise_selection(selected, self.len());
        let mut remapped = Vec::with_capacity(selection.len());
        // First slot a selected entry may not move into.
        let mut pinned_until = 0usize;

        for index in selection {
            if index == pinned_until {
                pinned_until = index + 1;
                remapped.push(index);
            } else {
                self.entries.swap(index, index - 1);
                remapped.push(index - 1);
            }
        }
        remapped
    }

    /// Move every selected entry one slot toward the back.
    ///
    /// Mirror image of [`ImageCatalog::move_up`].
    pub fn move_down(&mut self, selected: &[usize]) -> Vec<usize> {
        let selection = normalise_selection(selected, self.len());
        let mut remapped = Vec::with_capacity(selection.len());
        let mut pinned_from = self.len();

        for index in selection.into_iter().rev() {
            if index + 1 == pinned_from {
                pinned_from = index;
                remapped.push(index);
            } else {
                self.entries.swap(index, index + 1);
                remapped.push(index + 1);
            }
        }
        remapped.sort_unstable();
        remapped
    }

    /// Delete the entries at `indices`, highest index first.
    ///
    /// Returns how many entries were removed.
    pub fn remove_at(&mut self, indices: &[usize]) -> usize {
        let selection = normalise_selection(indices, self.len());
        for &index in selection.iter().rev() {
            self.entries.remove(index);
        }
        selection.len()
    }

    // -- Output naming --------------------------------------------------------

    /// `<folder of first image>/<stem of first image><suffix>.<ext>`.
    pub fn default_output_path(&self, format: OutputFormat, suffix: &str) -> Option<PathBuf> {
        let first = self.entries.first()?;
        let stem = first.path.file_stem()?.to_string_lossy();
        let dir = first.path.parent().unwrap_or_else(|| Path::new(""));
        Some(dir.join(format!("{stem}{suffix}.{}", format.extension())))
    }
}

/// Replace the extension of an output path to match `format`.
pub fn with_output_extension(path: &Path, format: OutputFormat) -> PathBuf {
    path.with_extension(format.extension())
}

/// Every index in `0..total` that is not in `selected`.
pub fn reverse_selection(selected: &[usize], total: usize) -> Vec<usize> {
    let chosen: BTreeSet<usize> = selected.iter().copied().collect();
    (0..total).filter(|index| !chosen.contains(index)).collect()
}

/// Every index in `0..total`.
pub fn select_all(total: usize) -> Vec<usize> {
    (0..total).collect()
}

/// Sorted, de-duplicated, in-range indices.
fn normalise_selection(selected: &[usize], len: usize) -> Vec<usize> {
    let set: BTreeSet<usize> = selected.iter().copied().filter(|&i| i < len).collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn catalog_of(names: &[&str]) -> ImageCatalog {
        ImageCatalog::from_entries(
            names
                .iter()
                .map(|name| ImageEntry::new(format!("/imgs/{name}"), 1)),
        )
    }

    fn names(catalog: &ImageCatalog) -> Vec<String> {
        catalog.entries().iter().map(ImageEntry::file_name).collect()
    }

    #[test]
    fn scan_keeps_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(3, 2, Rgb([9, 9, 9]))
            .save(dir.path().join("b.png"))
            .unwrap();
        std::fs::write(dir.path().join("c.JPG"), b"not really a jpeg").unwrap();
        std::fs::write(dir.path().join("a.tiff"), b"II*\0").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("deck.pdf"), b"%PDF").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();
        std::fs::write(dir.path().join("nested.png").join("inner.png"), b"x").unwrap();

        let report = ImageCatalog::scan(dir.path(), ScanFilter::All);
        assert_eq!(names(&report.catalog), ["a.tiff", "b.png", "c.JPG"]);
        assert_eq!(report.ignored, 2);
        assert!(report.diagnostics.is_empty());

        let png = report.catalog.get(1).unwrap();
        assert_eq!(png.dimensions(), Some((3, 2)));
        assert!(png.path.is_absolute());
        // Unreadable headers are not a scan failure.
        assert_eq!(report.catalog.get(2).unwrap().dimensions(), None);
    }

    #[test]
    fn scan_honours_named_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1.png", "2.jpeg", "3.tif", "4.bmp", "5.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let png_jpg = ImageCatalog::scan(dir.path(), ScanFilter::PngJpg).catalog;
        assert_eq!(names(&png_jpg), ["1.png", "2.jpeg"]);
        let tif = ImageCatalog::scan(dir.path(), ScanFilter::Tif).catalog;
        assert_eq!(names(&tif), ["3.tif"]);
        let bmp = ImageCatalog::scan(dir.path(), ScanFilter::Bmp).catalog;
        assert_eq!(names(&bmp), ["4.bmp"]);
    }

    #[test]
    fn scan_of_missing_folder_is_empty_with_diagnostic() {
        let report = ImageCatalog::scan("/no/such/folder", ScanFilter::All);
        assert!(report.catalog.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn scan_of_a_file_is_empty_with_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();
        let report = ImageCatalog::scan(&file, ScanFilter::All);
        assert!(report.catalog.is_empty());
        assert!(!report.diagnostics.is_empty());
    }

    #[test]
    fn from_entries_drops_duplicate_paths() {
        let catalog = catalog_of(&["a.png", "b.png", "a.png"]);
        assert_eq!(names(&catalog), ["a.png", "b.png"]);
    }

    #[test]
    fn move_up_at_front_is_noop() {
        let mut catalog = catalog_of(&["a", "b", "c"]);
        let selection = catalog.move_up(&[0]);
        assert_eq!(names(&catalog), ["a", "b", "c"]);
        assert_eq!(selection, [0]);
    }

    #[test]
    fn move_down_at_back_is_noop() {
        let mut catalog = catalog_of(&["a", "b", "c"]);
        let selection = catalog.move_down(&[2]);
        assert_eq!(names(&catalog), ["a", "b", "c"]);
        assert_eq!(selection, [2]);
    }

    #[test]
    fn contiguous_block_moves_together() {
        let mut catalog = catalog_of(&["a", "b", "c", "d"]);
        let selection = catalog.move_up(&[2, 1]);
        assert_eq!(names(&catalog), ["b", "c", "a", "d"]);
        assert_eq!(selection, [0, 1]);

        let selection = catalog.move_down(&selection);
        assert_eq!(names(&catalog), ["a", "b", "c", "d"]);
        assert_eq!(selection, [1, 2]);
    }

    #[test]
    fn non_contiguous_selection_moves_each_by_one() {
        let mut catalog = catalog_of(&["a", "b", "c", "d", "e"]);
        let selection = catalog.move_up(&[1, 3]);
        assert_eq!(names(&catalog), ["b", "a", "d", "c", "e"]);
        assert_eq!(selection, [0, 2]);

        let mut catalog = catalog_of(&["a", "b", "c", "d", "e"]);
        let selection = catalog.move_down(&[0, 2]);
        assert_eq!(names(&catalog), ["b", "a", "d", "c", "e"]);
        assert_eq!(selection, [1, 3]);
    }

    #[test]
    fn pinned_entries_block_their_selected_neighbours() {
        let mut catalog = catalog_of(&["a", "b", "c", "d"]);
        let selection = catalog.move_up(&[0, 1, 3]);
        assert_eq!(names(&catalog), ["a", "b", "d", "c"]);
        assert_eq!(selection, [0, 1, 2]);

        let mut catalog = catalog_of(&["a", "b", "c", "d"]);
        let selection = catalog.move_down(&[0, 2, 3]);
        assert_eq!(names(&catalog), ["b", "a", "c", "d"]);
        assert_eq!(selection, [1, 2, 3]);
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut catalog = catalog_of(&["a", "b"]);
        assert_eq!(catalog.move_up(&[1, 9]), [0]);
        assert_eq!(names(&catalog), ["b", "a"]);
        assert_eq!(catalog.remove_at(&[7]), 0);
    }

    #[test]
    fn remove_at_keeps_relative_order() {
        let mut catalog = catalog_of(&["a", "b", "c", "d", "e"]);
        let removed = catalog.remove_at(&[3, 1, 3]);
        assert_eq!(removed, 2);
        assert_eq!(names(&catalog), ["a", "c", "e"]);
    }

    #[test]
    fn reverse_selection_returns_complement() {
        assert_eq!(reverse_selection(&[0, 2], 5), [1, 3, 4]);
        assert_eq!(reverse_selection(&[], 3), [0, 1, 2]);
        assert_eq!(reverse_selection(&[0, 1, 2], 3), Vec::<usize>::new());
        assert_eq!(select_all(3), [0, 1, 2]);
    }

    #[test]
    fn default_output_path_derives_from_first_image() {
        let catalog = catalog_of(&["scan01.tif", "scan02.tif"]);
        assert_eq!(
            catalog.default_output_path(OutputFormat::PagedDocument, "_merged"),
            Some(PathBuf::from("/imgs/scan01_merged.pdf"))
        );
        assert_eq!(ImageCatalog::default().default_output_path(OutputFormat::SlideDeck, "_x"), None);
        assert_eq!(
            with_output_extension(Path::new("/out/scan01_merged.pdf"), OutputFormat::SlideDeck),
            PathBuf::from("/out/scan01_merged.pptx")
        );
    }
}

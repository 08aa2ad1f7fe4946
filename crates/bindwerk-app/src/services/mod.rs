// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command line to the bindwerk backend crates.
//
// `Session` owns the catalog and the conversion orchestrator and reports every
// change as a `CoreEvent`; the front end only renders what it receives.

pub mod config;
pub mod data_dir;
pub mod session;

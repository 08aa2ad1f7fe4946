// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where Bindwerk looks for its settings file.

use std::ffi::OsString;
use std::path::PathBuf;

/// Bindwerk's settings directory. Never created; when it is missing the
/// defaults apply.
pub fn config_dir() -> PathBuf {
    settings_root(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME")).join("bindwerk")
}

/// An empty `XDG_CONFIG_HOME` counts as unset. Without either variable the
/// working directory is used.
fn settings_root(xdg_config_home: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match (xdg_config_home.filter(|v| !v.is_empty()), home) {
        (Some(xdg), _) => PathBuf::from(xdg),
        (None, Some(home)) => PathBuf::from(home).join(".config"),
        (None, None) => PathBuf::from("."),
    }
}

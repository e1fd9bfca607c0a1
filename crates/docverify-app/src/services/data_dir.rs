// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// Return the DocVerify data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir(|key| std::env::var(key).ok()).join("docverify");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn base_dir(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    // XDG data dir, then ~/.local/share
    if let Some(xdg) = lookup("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Some(home) = lookup("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

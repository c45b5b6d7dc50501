// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-printer capability snapshot.

use std::collections::HashMap;

use platen_core::{Media, PrinterOption, option_group};

/// The options and media sizes a backend declared for one printer.
///
/// Built once from a successful capability fetch and treated as immutable
/// for the printer's remaining lifetime; repeated fetches could return the
/// backend's values in a different order, so callers must always see the
/// first snapshot.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: HashMap<String, PrinterOption>,
    media: HashMap<String, Media>,
}

impl OptionSet {
    /// Assemble a snapshot from backend-reported parts, filling in display
    /// groups for options the backend left ungrouped.
    pub fn from_parts(options: Vec<PrinterOption>, media: Vec<Media>) -> Self {
        let options = options
            .into_iter()
            .map(|mut opt| {
                if opt.group.is_empty() {
                    opt.group = option_group(&opt.name).to_string();
                }
                (opt.name.clone(), opt)
            })
            .collect();
        let media = media.into_iter().map(|m| (m.name.clone(), m)).collect();
        Self { options, media }
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn media_count(&self) -> usize {
        self.media.len()
    }

    pub fn option(&self, name: &str) -> Option<&PrinterOption> {
        self.options.get(name)
    }

    pub fn media(&self, name: &str) -> Option<&Media> {
        self.media.get(name)
    }

    pub fn options(&self) -> impl Iterator<Item = &PrinterOption> {
        self.options.values()
    }

    pub fn media_sizes(&self) -> impl Iterator<Item = &Media> {
        self.media.values()
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Platen print-dialog frontend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite identity of a printer: no two printers in a registry may share
/// the same `(printer_id, backend_name)` pair.
///
/// Used directly as a map key; the `#`-separated textual form survives only
/// in the on-disk formats (default-printers files, pickle records).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrinterKey {
    pub printer_id: String,
    pub backend_name: String,
}

impl PrinterKey {
    pub fn new(printer_id: impl Into<String>, backend_name: impl Into<String>) -> Self {
        Self {
            printer_id: printer_id.into(),
            backend_name: backend_name.into(),
        }
    }
}

impl std::fmt::Display for PrinterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.printer_id, self.backend_name)
    }
}

/// Basic printer fields carried by a backend's printer-added notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterBasicInfo {
    pub id: String,
    pub name: String,
    pub info: String,
    pub location: String,
    pub make_and_model: String,
    pub accepting_jobs: bool,
    pub state: String,
    pub backend_name: String,
}

/// One printer option as declared by a backend: default value plus the
/// ordered list of supported values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterOption {
    pub name: String,
    /// Display group; resolved from [`option_group`] when the backend does
    /// not supply one.
    pub group: String,
    pub default_value: String,
    pub supported_values: Vec<String>,
}

/// A media size supported by a printer, in device units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub name: String,
    pub width: i32,
    pub length: i32,
    /// One margin set per supported print-area configuration.
    pub margins: Vec<Margin>,
}

/// Print-area margins for a media size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// A job as reported by a single backend. The backend does not repeat its
/// own name in every record; the registry stamps it when aggregating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendJob {
    pub job_id: String,
    pub title: String,
    pub printer_id: String,
    pub user: String,
    pub state: String,
    pub submitted_at: DateTime<Utc>,
    pub size: i64,
}

/// A job record in a cross-backend aggregation snapshot. Read-only; a fresh
/// aggregation call replaces the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub printer_id: String,
    pub backend_name: String,
    pub user: String,
    pub state: String,
    pub submitted_at: DateTime<Utc>,
    pub size: i64,
}

impl JobRecord {
    /// Stamp a backend-reported job with the backend it came from.
    pub fn from_backend(job: BackendJob, backend_name: &str) -> Self {
        Self {
            job_id: job.job_id,
            title: job.title,
            printer_id: job.printer_id,
            backend_name: backend_name.to_string(),
            user: job.user,
            state: job.state,
            submitted_at: job.submitted_at,
            size: job.size,
        }
    }
}

// ---------------------------------------------------------------------------
// Standard names
// ---------------------------------------------------------------------------

/// Standard IPP option names. Use these when adding settings.
pub mod option {
    pub const COPIES: &str = "copies";
    pub const COLLATE: &str = "multiple-document-handling";
    pub const MEDIA: &str = "media";
    pub const MEDIA_TYPE: &str = "media-type";
    pub const SIDES: &str = "sides";
    pub const NUMBER_UP: &str = "number-up";
    pub const PAGE_SET: &str = "page-set";
    pub const PAGE_RANGES: &str = "page-ranges";
    pub const ORIENTATION: &str = "orientation-requested";
    pub const PRINT_SCALING: &str = "print-scaling";
    pub const COLOR_MODE: &str = "print-color-mode";
    pub const PRINT_QUALITY: &str = "print-quality";
    pub const RESOLUTION: &str = "printer-resolution";
    pub const FINISHINGS: &str = "finishings";
    pub const OUTPUT_BIN: &str = "output-bin";
    pub const JOB_NAME: &str = "job-name";
    pub const JOB_PRIORITY: &str = "job-priority";
    pub const JOB_HOLD_UNTIL: &str = "job-hold-until";
}

/// Display group names for dialog layout.
pub mod group {
    pub const MEDIA: &str = "Media";
    pub const COPIES: &str = "Copies";
    pub const COLOR: &str = "Color";
    pub const SCALING: &str = "Scaling";
    pub const QUALITY: &str = "Output Quality";
    pub const PAGE_MGMT: &str = "Page Management";
    pub const JOB_MGMT: &str = "Job Management";
    pub const FINISHINGS: &str = "Finishings";
    pub const ADVANCED: &str = "Advanced";
}

/// Printer state strings reported by backends.
pub mod printer_state {
    pub const IDLE: &str = "idle";
    pub const PRINTING: &str = "printing";
    pub const STOPPED: &str = "stopped";
}

/// Job state strings reported by backends.
pub mod job_state {
    pub const ABORTED: &str = "Aborted";
    pub const CANCELLED: &str = "Cancelled";
    pub const COMPLETED: &str = "Completed";
    pub const HELD: &str = "Held";
    pub const PENDING: &str = "Pending";
    pub const PRINTING: &str = "Printing";
    pub const STOPPED: &str = "Stopped";
}

/// Prefix table matching common option names to display groups.
const GROUP_TABLE: &[(&str, &str)] = &[
    (option::COPIES, group::COPIES),
    (option::COLLATE, group::COPIES),
    (option::MEDIA, group::MEDIA),
    (option::SIDES, group::PAGE_MGMT),
    (option::NUMBER_UP, group::PAGE_MGMT),
    (option::PAGE_SET, group::PAGE_MGMT),
    (option::PAGE_RANGES, group::PAGE_MGMT),
    (option::ORIENTATION, group::PAGE_MGMT),
    (option::PRINT_SCALING, group::SCALING),
    ("position", group::SCALING),
    ("ipp-attribute-fidelity", group::SCALING),
    (option::COLOR_MODE, group::COLOR),
    (option::PRINT_QUALITY, group::QUALITY),
    (option::RESOLUTION, group::QUALITY),
    (option::FINISHINGS, group::FINISHINGS),
    (option::OUTPUT_BIN, group::FINISHINGS),
    ("page-delivery", group::FINISHINGS),
    (option::JOB_NAME, group::JOB_MGMT),
    ("job-sheets", group::JOB_MGMT),
    (option::JOB_PRIORITY, group::JOB_MGMT),
    ("billing-info", group::JOB_MGMT),
    (option::JOB_HOLD_UNTIL, group::JOB_MGMT),
];

/// Resolve the display group for an option name by prefix match.
///
/// Unknown options land in [`group::ADVANCED`]. Note `media` matches
/// `media-type` and friends by prefix, which is the intended behavior.
pub fn option_group(option_name: &str) -> &'static str {
    GROUP_TABLE
        .iter()
        .find(|(prefix, _)| option_name.starts_with(prefix))
        .map(|(_, g)| *g)
        .unwrap_or(group::ADVANCED)
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seams over the inter-process bus.
//
// The registry never talks to the bus directly; it goes through these
// traits, so the wire transport (and its argument marshalling) stays
// swappable and tests can run against in-memory fakes. All calls are
// blocking; the transport enforces the per-call timeout hint from
// `FrontendConfig`, and the library never retries on its own.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;

use platen_core::{BackendJob, Media, PrinterBasicInfo, PrinterOption, Result};

/// Name of the printer-added backend notification.
pub const SIGNAL_PRINTER_ADDED: &str = "PrinterAdded";

/// Name of the printer-removed backend notification.
pub const SIGNAL_PRINTER_REMOVED: &str = "PrinterRemoved";

/// A lifecycle notification published by a backend.
#[derive(Debug, Clone)]
pub enum BackendNotification {
    PrinterAdded(PrinterBasicInfo),
    PrinterRemoved {
        printer_id: String,
        backend_name: String,
    },
}

/// Signals a frontend broadcasts to all backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendSignal {
    /// The dialog is going away; backends may stop listing for it.
    StopListing,
    /// Ask backends to re-send their printer lists.
    RefreshBackend,
    HideRemotePrinters,
    UnhideRemotePrinters,
    HideTemporaryPrinters,
    UnhideTemporaryPrinters,
}

impl FrontendSignal {
    /// On-bus signal name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StopListing => "StopListing",
            Self::RefreshBackend => "RefreshBackend",
            Self::HideRemotePrinters => "HideRemotePrinters",
            Self::UnhideRemotePrinters => "UnhideRemotePrinters",
            Self::HideTemporaryPrinters => "HideTemporaryPrinters",
            Self::UnhideTemporaryPrinters => "UnhideTemporaryPrinters",
        }
    }
}

/// A connection to the session bus, owned by one frontend instance.
pub trait BusConnection: Send + Sync {
    /// The connection's unique bus identity (distinct from the well-known
    /// dialog name). Required by the pickle protocol.
    fn unique_name(&self) -> Result<String>;

    /// Build a proxy for the backend service registered under
    /// `service_name` at `object_path`.
    fn open_backend(&self, service_name: &str, object_path: &str) -> Result<Arc<dyn BackendProxy>>;

    /// Subscribe to a backend notification by name, with no further
    /// filtering. Notifications arrive on the returned channel; the sender
    /// side is dropped when the connection closes.
    fn subscribe(&self, signal_name: &str) -> Result<mpsc::Receiver<BackendNotification>>;

    /// Broadcast a frontend signal to all backends.
    fn emit(&self, signal: FrontendSignal) -> Result<()>;

    /// Close the connection. Subscription channels disconnect, which ends
    /// the registry's listener threads.
    fn close(&self) -> Result<()>;
}

/// Blocking proxy to one backend process.
///
/// Every method maps to one bus call and blocks the calling thread until
/// the backend replies or the transport's timeout fires.
pub trait BackendProxy: Send + Sync + std::fmt::Debug {
    /// Wake the backend and ask it to start listing printers.
    fn activate(&self) -> Result<()>;

    /// The backend's own notion of its default printer id.
    fn get_default_printer(&self) -> Result<String>;

    fn is_accepting_jobs(&self, printer_id: &str) -> Result<bool>;

    fn get_printer_state(&self, printer_id: &str) -> Result<String>;

    /// Full capability snapshot for a printer: options plus media sizes.
    fn get_all_options(&self, printer_id: &str) -> Result<(Vec<PrinterOption>, Vec<Media>)>;

    /// Jobs known to this backend, for all printers and users.
    fn get_all_jobs(&self, active_only: bool) -> Result<Vec<BackendJob>>;

    fn get_active_jobs_count(&self, printer_id: &str) -> Result<u32>;

    /// Submit a file for printing with the given settings pairs. When
    /// `final_path` is set the backend prints into that file instead of a
    /// device. Returns the created job id.
    fn print_file(
        &self,
        printer_id: &str,
        file_path: &Path,
        settings: &[(String, String)],
        final_path: Option<&Path>,
    ) -> Result<String>;

    /// Cancel a job. `Ok(false)` means the backend refused (e.g. the job
    /// already completed); `Err` means the call itself failed.
    fn cancel_job(&self, job_id: &str, printer_id: &str) -> Result<bool>;

    /// Ask the backend to stay alive although no dialog currently holds it.
    fn keep_alive(&self) -> Result<()>;

    /// Transfer state ownership from a previous (possibly dead) dialog,
    /// identified by its unique bus name, to this connection.
    fn replace(&self, previous_identity: &str) -> Result<()>;

    fn human_option_name(&self, option_name: &str) -> Result<String>;

    fn human_choice_name(&self, option_name: &str, choice_name: &str) -> Result<String>;
}

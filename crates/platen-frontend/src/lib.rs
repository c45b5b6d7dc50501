// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platen Frontend — the live half of the print-dialog protocol: backend
// discovery over the session bus, the shared printer registry, lazy
// capability caching, default-printer resolution, job aggregation, and the
// pickle/resurrect handoff between dialog processes. The bus itself is
// reached through the trait seams in [`transport`].

pub mod backend;
pub mod options;
pub mod pickle;
pub mod printer;
pub mod registry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::BackendHandle;
pub use options::OptionSet;
pub use pickle::{PickleRecord, pickle_printer, resurrect_printer};
pub use printer::{DetailsCallback, Printer};
pub use registry::{DefaultScope, Frontend, NoopListener, PrinterListener};
pub use transport::{BackendNotification, BackendProxy, BusConnection, FrontendSignal};

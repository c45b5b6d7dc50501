// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The frontend registry: the set of activated backends and the set of
// printers they advertise.
//
// Backend map, printer map, and the last-saved-settings snapshot form one
// shared-mutable-state unit behind a single mutex, so lookups, insertions,
// and removals are linearizable and no observer can see a printer count
// that disagrees with the map. Backend notifications are drained by
// listener threads spawned at connect time; caller operations run on the
// caller's thread.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use platen_core::config::{BACKEND_PREFIX, DEFAULT_PRINTERS_FILE, PRINT_SETTINGS_FILE};
use platen_core::{Error, FrontendConfig, JobRecord, PrinterBasicInfo, PrinterKey, Result, Settings};

use crate::backend::{BackendHandle, descriptor_backend_name, open_backend_from_descriptor};
use crate::printer::Printer;
use crate::transport::{
    BackendNotification, BusConnection, FrontendSignal, SIGNAL_PRINTER_ADDED,
    SIGNAL_PRINTER_REMOVED,
};

/// Which default-printers file an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultScope {
    User,
    System,
}

impl std::fmt::Display for DefaultScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::System => "system",
        })
    }
}

/// Observer for printer lifecycle events.
///
/// Methods fire on the registry's listener thread for bus-delivered events,
/// or on the caller's thread for direct `add_printer`/`remove_printer`
/// calls, after the registry mutation is visible.
pub trait PrinterListener: Send + Sync {
    fn printer_added(&self, _printer: &Arc<Printer>) {}
    fn printer_removed(&self, _printer: &Arc<Printer>) {}
}

/// Listener that ignores all events.
pub struct NoopListener;

impl PrinterListener for NoopListener {}

/// Registry state guarded as one unit.
struct RegistryState {
    /// Backend name → handle. `BTreeMap` so tier-5 default resolution picks
    /// the same backend on every run.
    backends: BTreeMap<String, BackendHandle>,
    /// Composite key → printer; the printer count is this map's size.
    printers: BTreeMap<PrinterKey, Arc<Printer>>,
    /// Settings snapshot loaded from disk at construction, used to seed new
    /// printers. `None` after `ignore_saved_settings`.
    last_saved_settings: Option<Settings>,
}

/// The frontend: owns backend handles, the printer set, and the caller's
/// event observer.
pub struct Frontend {
    config: FrontendConfig,
    connection: Arc<dyn BusConnection>,
    listener: Arc<dyn PrinterListener>,
    state: Mutex<RegistryState>,
    signal_threads: Mutex<Vec<JoinHandle<()>>>,
    /// Back-reference for the signal listener threads; they upgrade per
    /// event, so dropping the last caller `Arc` ends them even without an
    /// explicit disconnect.
    weak_self: Weak<Frontend>,
}

impl Frontend {
    /// Build a registry. Loads the last-saved settings snapshot from the
    /// user config dir; its absence is normal for a first run.
    pub fn new(
        config: FrontendConfig,
        connection: Arc<dyn BusConnection>,
        listener: Arc<dyn PrinterListener>,
    ) -> Arc<Self> {
        let last_saved_settings = config
            .user_config_dir()
            .map(|dir| dir.join(PRINT_SETTINGS_FILE))
            .and_then(|path| Settings::load(&path).ok());
        if let Some(settings) = &last_saved_settings {
            debug!(count = settings.len(), "previous settings restored");
        }

        Arc::new_cyclic(|weak_self| Self {
            config,
            connection,
            listener,
            state: Mutex::new(RegistryState {
                backends: BTreeMap::new(),
                printers: BTreeMap::new(),
                last_saved_settings,
            }),
            signal_threads: Mutex::new(Vec::new()),
            weak_self: weak_self.clone(),
        })
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// The connection's unique bus identity; needed by the pickle protocol.
    pub fn bus_identity(&self) -> Result<String> {
        self.connection.unique_name()
    }

    /// Forget the settings snapshot loaded at construction, so new printers
    /// start from empty settings.
    pub fn ignore_saved_settings(&self) {
        info!("ignoring previously saved settings");
        self.lock_state().last_saved_settings = None;
    }

    // -- connection lifecycle -----------------------------------------------

    /// Subscribe to printer lifecycle notifications and discover backends.
    ///
    /// Spawns one listener thread per subscription; the threads exit when
    /// the connection closes.
    pub fn connect(&self) -> Result<()> {
        for signal in [SIGNAL_PRINTER_ADDED, SIGNAL_PRINTER_REMOVED] {
            let receiver = self.connection.subscribe(signal)?;
            self.spawn_signal_listener(signal, receiver);
        }
        let discovered = self.discover_backends()?;
        info!(backends = discovered, "frontend connected");
        Ok(())
    }

    /// Tell backends this dialog is going away, close the connection, and
    /// join the listener threads. Must not be called from a listener
    /// callback.
    pub fn disconnect(&self) -> Result<()> {
        if let Err(e) = self.connection.emit(FrontendSignal::StopListing) {
            warn!(error = %e, "could not announce disconnect to backends");
        }
        self.connection.close()?;

        let threads = std::mem::take(&mut *self.signal_threads.lock().expect("threads lock poisoned"));
        for handle in threads {
            let _ = handle.join();
        }
        info!("frontend disconnected");
        Ok(())
    }

    fn spawn_signal_listener(
        &self,
        signal: &'static str,
        receiver: mpsc::Receiver<BackendNotification>,
    ) {
        let weak = self.weak_self.clone();
        let handle = std::thread::Builder::new()
            .name(format!("platen-signal-{signal}"))
            .spawn(move || {
                while let Ok(notification) = receiver.recv() {
                    let Some(frontend) = weak.upgrade() else {
                        break;
                    };
                    match notification {
                        BackendNotification::PrinterAdded(basic) => {
                            if let Err(e) = frontend.add_printer(basic) {
                                warn!(error = %e, "dropping printer-added notification");
                            }
                        }
                        BackendNotification::PrinterRemoved {
                            printer_id,
                            backend_name,
                        } => {
                            frontend.remove_printer(&printer_id, &backend_name);
                        }
                    }
                }
                debug!(signal, "signal listener finished");
            });
        match handle {
            Ok(handle) => self
                .signal_threads
                .lock()
                .expect("threads lock poisoned")
                .push(handle),
            Err(e) => warn!(signal, error = %e, "could not spawn signal listener"),
        }
    }

    // -- backend discovery --------------------------------------------------

    /// Scan the backend descriptor directory, open a proxy per descriptor,
    /// and activate each backend. A descriptor that cannot be read or
    /// proxied is logged and skipped; a missing directory means zero
    /// backends, not an error. Re-discovering a name replaces its handle.
    pub fn discover_backends(&self) -> Result<usize> {
        let dir = &self.config.backend_info_dir;
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(dir = %dir.display(), "no backend descriptor directory");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let mut discovered = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "unreadable directory entry");
                    continue;
                }
            };
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(name) = descriptor_backend_name(&file_name) else {
                continue;
            };

            match open_backend_from_descriptor(self.connection.as_ref(), dir, &file_name) {
                Ok(proxy) => {
                    info!(backend = name, "backend discovered");
                    let handle = BackendHandle {
                        name: name.to_string(),
                        proxy: Arc::clone(&proxy),
                    };
                    self.lock_state().backends.insert(name.to_string(), handle);
                    discovered += 1;

                    if let Err(e) = proxy.activate() {
                        warn!(backend = name, error = %e, "backend activation failed");
                    }
                }
                Err(e) => {
                    warn!(backend = name, error = %e, "skipping backend descriptor");
                }
            }
        }
        Ok(discovered)
    }

    /// Number of known backends.
    pub fn backend_count(&self) -> usize {
        self.lock_state().backends.len()
    }

    /// Names of known backends, in deterministic order.
    pub fn backend_names(&self) -> Vec<String> {
        self.lock_state().backends.keys().cloned().collect()
    }

    // -- printer set --------------------------------------------------------

    /// Insert a printer from a backend's printer-added payload.
    ///
    /// Fails when the declared backend is not registered, leaving the
    /// printer set untouched. New printers are seeded with the last-saved
    /// settings snapshot. The observer fires after the insertion is
    /// visible.
    pub fn add_printer(&self, basic: PrinterBasicInfo) -> Result<Arc<Printer>> {
        if basic.id.is_empty() || basic.backend_name.is_empty() {
            return Err(Error::InvalidArgument(
                "printer id and backend name must be non-empty".into(),
            ));
        }

        let printer = {
            let mut state = self.lock_state();
            let Some(handle) = state.backends.get(&basic.backend_name) else {
                return Err(Error::backend(
                    &basic.backend_name,
                    format!("cannot add printer {}: backend not registered", basic.id),
                ));
            };
            let proxy = Arc::clone(&handle.proxy);

            let mut settings = Settings::new();
            if let Some(saved) = &state.last_saved_settings {
                settings.merge_from(saved);
            }

            let printer =
                Printer::from_basic_info(basic, proxy, settings, self.config.clone());
            state.printers.insert(printer.key(), Arc::clone(&printer));
            printer
        };

        info!(printer = %printer.key(), "printer added");
        self.listener.printer_added(&printer);
        Ok(printer)
    }

    /// Remove a printer by composite key, returning it. `None` when no such
    /// printer exists — removal racing addition is expected and not an
    /// error. The observer fires after the removal is visible.
    pub fn remove_printer(&self, printer_id: &str, backend_name: &str) -> Option<Arc<Printer>> {
        let key = PrinterKey::new(printer_id, backend_name);
        let removed = self.lock_state().printers.remove(&key);
        match &removed {
            Some(printer) => {
                info!(printer = %key, "printer removed");
                self.listener.printer_removed(printer);
            }
            None => debug!(printer = %key, "printer-removed for unknown printer"),
        }
        removed
    }

    /// Exact-match lookup by composite key. A miss is a normal outcome.
    pub fn find_printer(&self, printer_id: &str, backend_name: &str) -> Option<Arc<Printer>> {
        if printer_id.is_empty() || backend_name.is_empty() {
            warn!("find_printer called with empty identifiers");
            return None;
        }
        let key = PrinterKey::new(printer_id, backend_name);
        self.lock_state().printers.get(&key).cloned()
    }

    /// Number of known printers; always equals the printer map's size.
    pub fn printer_count(&self) -> usize {
        self.lock_state().printers.len()
    }

    /// Snapshot of all known printers, in deterministic key order.
    pub fn printers(&self) -> Vec<Arc<Printer>> {
        self.lock_state().printers.values().cloned().collect()
    }

    // -- default printer ----------------------------------------------------

    /// Ask one backend for its default printer and resolve it in the
    /// registry. Unknown backend names fall back to opening the backend's
    /// descriptor directly.
    pub fn default_printer_for_backend(&self, backend_name: &str) -> Option<Arc<Printer>> {
        let proxy = self
            .lock_state()
            .backends
            .get(backend_name)
            .map(|handle| Arc::clone(&handle.proxy));
        let proxy = match proxy {
            Some(proxy) => proxy,
            None => {
                let file_name = format!("{BACKEND_PREFIX}{backend_name}");
                match open_backend_from_descriptor(
                    self.connection.as_ref(),
                    &self.config.backend_info_dir,
                    &file_name,
                ) {
                    Ok(proxy) => proxy,
                    Err(e) => {
                        debug!(backend = backend_name, error = %e, "no such backend");
                        return None;
                    }
                }
            }
        };

        match proxy.get_default_printer() {
            Ok(printer_id) => self.find_printer(&printer_id, backend_name),
            Err(e) => {
                warn!(backend = backend_name, error = %e, "default-printer query failed");
                None
            }
        }
    }

    /// Resolve the most preferred default printer.
    ///
    /// Tiers, in strict order, stopping at the first success:
    /// 1. entries of the user default-printers file, in file order;
    /// 2. entries of the system default-printers file;
    /// 3. the "CUPS" backend's own default;
    /// 4. the "FILE" backend's own default;
    /// 5. the default of the first backend in name order;
    /// 6. the first printer in key order.
    ///
    /// `None` only when the registry holds zero backends or zero printers.
    pub fn default_printer(&self) -> Option<Arc<Printer>> {
        {
            let state = self.lock_state();
            if state.backends.is_empty() || state.printers.is_empty() {
                warn!("no backends or printers while resolving default printer");
                return None;
            }
        }

        for path in [
            self.scope_file(DefaultScope::User),
            self.scope_file(DefaultScope::System),
        ]
        .into_iter()
        .flatten()
        {
            for (printer_id, backend_name) in load_default_printers(&path) {
                if let Some(printer) = self.find_printer(&printer_id, &backend_name) {
                    return Some(printer);
                }
            }
        }
        debug!("no configured default printer resolved; falling back");

        for backend_name in ["CUPS", "FILE"] {
            if let Some(printer) = self.default_printer_for_backend(backend_name) {
                return Some(printer);
            }
        }

        let first_backend = self.lock_state().backends.keys().next().cloned();
        if let Some(backend_name) = first_backend {
            if let Some(printer) = self.default_printer_for_backend(&backend_name) {
                return Some(printer);
            }
        }

        self.lock_state().printers.values().next().cloned()
    }

    /// Persist a printer as the scope's default: its entry moves to (or is
    /// inserted at) the first line of the scope's `default-printers` file;
    /// other entries keep their relative order; no duplicate survives.
    pub fn set_default_printer(&self, scope: DefaultScope, printer: &Printer) -> Result<()> {
        let path = self
            .scope_file(scope)
            .ok_or_else(|| Error::NotFound(format!("{scope} config directory unavailable")))?;

        let target = (printer.id().to_string(), printer.backend_name().to_string());
        let mut entries = load_default_printers(&path);
        entries.retain(|entry| entry != &target);
        entries.insert(0, target);

        let mut out = String::new();
        for (printer_id, backend_name) in &entries {
            out.push_str(&format!("{printer_id}#{backend_name}\n"));
        }
        std::fs::write(&path, out)?;

        info!(printer = %printer.key(), %scope, "default printer saved");
        Ok(())
    }

    fn scope_file(&self, scope: DefaultScope) -> Option<PathBuf> {
        let dir = match scope {
            DefaultScope::User => self.config.user_config_dir(),
            DefaultScope::System => self.config.system_config_dir(),
        }?;
        Some(dir.join(DEFAULT_PRINTERS_FILE))
    }

    // -- jobs ---------------------------------------------------------------

    /// Aggregate job lists from every backend.
    ///
    /// Backends are queried independently; one that fails contributes zero
    /// jobs and never aborts the aggregation. Per-backend order is
    /// preserved in the concatenation.
    pub fn all_jobs(&self, active_only: bool) -> Vec<JobRecord> {
        let handles: Vec<BackendHandle> = self.lock_state().backends.values().cloned().collect();

        let mut jobs = Vec::new();
        for handle in handles {
            match handle.proxy.get_all_jobs(active_only) {
                Ok(list) => {
                    debug!(backend = %handle.name, jobs = list.len(), "job listing succeeded");
                    jobs.extend(
                        list.into_iter()
                            .map(|job| JobRecord::from_backend(job, &handle.name)),
                    );
                }
                Err(e) => {
                    warn!(backend = %handle.name, error = %e,
                          "job listing failed; backend contributes no jobs");
                }
            }
        }
        jobs
    }

    // -- broadcast signals --------------------------------------------------

    /// Ask all backends to re-send their printer lists.
    pub fn refresh_printer_list(&self) -> Result<()> {
        self.connection.emit(FrontendSignal::RefreshBackend)
    }

    pub fn hide_remote_printers(&self) -> Result<()> {
        self.connection.emit(FrontendSignal::HideRemotePrinters)
    }

    pub fn unhide_remote_printers(&self) -> Result<()> {
        self.connection.emit(FrontendSignal::UnhideRemotePrinters)
    }

    pub fn hide_temporary_printers(&self) -> Result<()> {
        self.connection.emit(FrontendSignal::HideTemporaryPrinters)
    }

    pub fn unhide_temporary_printers(&self) -> Result<()> {
        self.connection.emit(FrontendSignal::UnhideTemporaryPrinters)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry lock poisoned")
    }
}

/// Parse a default-printers file: one `printer_id#backend_name` per line.
/// A missing file yields no entries; malformed lines are skipped.
fn load_default_printers(path: &std::path::Path) -> Vec<(String, String)> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                return None;
            }
            match line.split_once('#') {
                Some((printer_id, backend_name))
                    if !printer_id.is_empty() && !backend_name.is_empty() =>
                {
                    Some((printer_id.to_string(), backend_name.to_string()))
                }
                _ => {
                    warn!(path = %path.display(), line, "skipping malformed default-printer entry");
                    None
                }
            }
        })
        .collect()
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One addressable printer, exposed by exactly one backend.
//
// A printer carries its backend proxy, a lazily-fetched capability
// snapshot, and the user's settings store. Printers are shared as
// `Arc<Printer>`: the registry, the dialog, and any in-flight capability
// fetch each hold their own reference, so removing a printer from the
// registry never invalidates a pending fetch.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, info, warn};

use platen_core::config::PRINT_SETTINGS_FILE;
use platen_core::{
    Error, FrontendConfig, Media, PrinterBasicInfo, PrinterKey, PrinterOption, Result, Settings,
};

use crate::options::OptionSet;
use crate::transport::BackendProxy;

/// Completion callback for [`Printer::acquire_details`]. The flag is `true`
/// when the capability snapshot is available.
pub type DetailsCallback = Box<dyn FnOnce(&Printer, bool) + Send + 'static>;

/// Pending async capability fetch bookkeeping.
#[derive(Default)]
struct FetchState {
    in_flight: bool,
    waiters: Vec<DetailsCallback>,
}

pub struct Printer {
    id: String,
    name: String,
    info: String,
    location: String,
    make_and_model: String,
    backend_name: String,
    state: Mutex<String>,
    accepting_jobs: AtomicBool,
    proxy: Arc<dyn BackendProxy>,
    config: FrontendConfig,
    /// Capability snapshot; populated at most once per printer lifetime.
    options: Mutex<Option<Arc<OptionSet>>>,
    fetch: Mutex<FetchState>,
    settings: Mutex<Settings>,
    /// Back-reference to the owning `Arc`, handed to fetch threads so a
    /// pending fetch keeps the printer alive past registry removal.
    weak_self: Weak<Printer>,
}

impl Printer {
    pub(crate) fn from_basic_info(
        basic: PrinterBasicInfo,
        proxy: Arc<dyn BackendProxy>,
        settings: Settings,
        config: FrontendConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            id: basic.id,
            name: basic.name,
            info: basic.info,
            location: basic.location,
            make_and_model: basic.make_and_model,
            backend_name: basic.backend_name,
            state: Mutex::new(basic.state),
            accepting_jobs: AtomicBool::new(basic.accepting_jobs),
            proxy,
            config,
            options: Mutex::new(None),
            fetch: Mutex::new(FetchState::default()),
            settings: Mutex::new(settings),
            weak_self: weak_self.clone(),
        })
    }

    // -- identity and metadata ----------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn make_and_model(&self) -> &str {
        &self.make_and_model
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn key(&self) -> PrinterKey {
        PrinterKey::new(&self.id, &self.backend_name)
    }

    /// Last known state string (as delivered at discovery or by the most
    /// recent [`refresh_state`](Self::refresh_state)).
    pub fn state(&self) -> String {
        self.state.lock().expect("state lock poisoned").clone()
    }

    /// Last known accepting-jobs flag.
    pub fn accepting_jobs(&self) -> bool {
        self.accepting_jobs.load(Ordering::Relaxed)
    }

    /// Ask the backend for the current state and update the cached value.
    pub fn refresh_state(&self) -> Result<String> {
        let state = self
            .proxy
            .get_printer_state(&self.id)
            .map_err(|e| self.backend_err("get state", e))?;
        *self.state.lock().expect("state lock poisoned") = state.clone();
        Ok(state)
    }

    /// Ask the backend whether the printer accepts jobs and update the
    /// cached flag.
    pub fn refresh_accepting_jobs(&self) -> Result<bool> {
        let accepting = self
            .proxy
            .is_accepting_jobs(&self.id)
            .map_err(|e| self.backend_err("is accepting jobs", e))?;
        self.accepting_jobs.store(accepting, Ordering::Relaxed);
        Ok(accepting)
    }

    /// Snapshot of the basic fields, e.g. for pickling.
    pub fn basic_info(&self) -> PrinterBasicInfo {
        PrinterBasicInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            info: self.info.clone(),
            location: self.location.clone(),
            make_and_model: self.make_and_model.clone(),
            accepting_jobs: self.accepting_jobs(),
            state: self.state(),
            backend_name: self.backend_name.clone(),
        }
    }

    pub(crate) fn proxy(&self) -> &Arc<dyn BackendProxy> {
        &self.proxy
    }

    // -- capability cache ---------------------------------------------------

    /// The capability snapshot, fetching it synchronously on first use.
    ///
    /// Once a fetch has succeeded the same snapshot is returned for the
    /// printer's remaining lifetime without touching the backend: the
    /// memoization is a correctness requirement, since a re-fetch could
    /// observe the backend's values in a different order. A failed fetch
    /// leaves the cache empty so a later call may retry.
    pub fn all_options(&self) -> Result<Arc<OptionSet>> {
        if let Some(set) = self.cached_options() {
            return Ok(set);
        }

        let (options, media) = self
            .proxy
            .get_all_options(&self.id)
            .map_err(|e| self.backend_err("get all options", e))?;
        let fetched = Arc::new(OptionSet::from_parts(options, media));

        // If a concurrent fetch won the race, its snapshot stays.
        let mut guard = self.options.lock().expect("options lock poisoned");
        let set = guard.get_or_insert(fetched).clone();
        debug!(printer = %self.key(), options = set.option_count(), "capabilities cached");
        Ok(set)
    }

    /// Fetch the capability snapshot asynchronously.
    ///
    /// When the snapshot is already cached the callback runs *synchronously
    /// on the calling thread*, before this function returns — callers must
    /// not assume it always fires later. Otherwise the callback fires
    /// exactly once on the printer's fetch thread, after the backend
    /// replies or the call fails. Concurrent calls while a fetch is in
    /// flight do not issue extra backend requests; their callbacks are
    /// queued onto the same fetch.
    pub fn acquire_details(&self, callback: DetailsCallback) {
        if self.cached_options().is_some() {
            callback(self, true);
            return;
        }

        {
            let mut fetch = self.fetch.lock().expect("fetch lock poisoned");
            // Re-check under the fetch lock: a fetch may have completed
            // between the cache probe and here.
            if self.cached_options().is_some() {
                drop(fetch);
                callback(self, true);
                return;
            }
            fetch.waiters.push(callback);
            if fetch.in_flight {
                return;
            }
            fetch.in_flight = true;
        }

        // The fetch thread owns its own `Arc`, so the printer survives a
        // registry removal until every callback has been delivered.
        let Some(printer) = self.weak_self.upgrade() else {
            self.finish_fetch(false);
            return;
        };
        let spawned = std::thread::Builder::new()
            .name(format!("platen-fetch-{}", self.id))
            .spawn(move || {
                let ok = match printer.proxy.get_all_options(&printer.id) {
                    Ok((options, media)) => {
                        let fetched = Arc::new(OptionSet::from_parts(options, media));
                        let mut guard = printer.options.lock().expect("options lock poisoned");
                        guard.get_or_insert(fetched);
                        true
                    }
                    Err(e) => {
                        warn!(printer = %printer.key(), error = %e, "async capability fetch failed");
                        false
                    }
                };
                printer.finish_fetch(ok);
            });

        if let Err(e) = spawned {
            error!(printer = %self.key(), error = %e, "could not spawn capability fetch thread");
            self.finish_fetch(false);
        }
    }

    /// Deliver queued callbacks exactly once and clear the in-flight flag.
    fn finish_fetch(&self, ok: bool) {
        let waiters = {
            let mut fetch = self.fetch.lock().expect("fetch lock poisoned");
            fetch.in_flight = false;
            std::mem::take(&mut fetch.waiters)
        };
        for callback in waiters {
            callback(self, ok);
        }
    }

    fn cached_options(&self) -> Option<Arc<OptionSet>> {
        self.options.lock().expect("options lock poisoned").clone()
    }

    /// Look up one option, fetching capabilities on first use.
    pub fn option(&self, name: &str) -> Option<PrinterOption> {
        self.all_options().ok()?.option(name).cloned()
    }

    /// The backend-declared default value for an option.
    pub fn default_value(&self, name: &str) -> Option<String> {
        Some(self.option(name)?.default_value)
    }

    /// A media size supported by the printer.
    pub fn media(&self, name: &str) -> Option<Media> {
        self.all_options().ok()?.media(name).cloned()
    }

    /// Width and length of a media size, in device units.
    pub fn media_size(&self, name: &str) -> Option<(i32, i32)> {
        self.media(name).map(|m| (m.width, m.length))
    }

    /// Margin sets for a media size; empty when the size is unknown.
    pub fn media_margins(&self, name: &str) -> Vec<platen_core::Margin> {
        self.media(name).map(|m| m.margins).unwrap_or_default()
    }

    // -- settings -----------------------------------------------------------

    /// Set a user-chosen option value, replacing any previous choice.
    pub fn add_setting(&self, name: &str, value: &str) {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .set(name, value);
    }

    /// Clear a user-chosen value. `false` when nothing was set.
    pub fn clear_setting(&self, name: &str) -> bool {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .clear(name)
    }

    /// The user-chosen value for an option, if any.
    pub fn setting(&self, name: &str) -> Option<String> {
        self.settings
            .lock()
            .expect("settings lock poisoned")
            .get(name)
            .map(String::from)
    }

    /// The effective value for an option: the user's setting when present,
    /// else the backend's default, else `None`.
    pub fn current_value(&self, name: &str) -> Option<String> {
        if let Some(value) = self.setting(name) {
            return Some(value);
        }
        self.default_value(name)
    }

    /// Copy of the settings store.
    pub fn settings_snapshot(&self) -> Settings {
        self.settings.lock().expect("settings lock poisoned").clone()
    }

    // -- jobs ---------------------------------------------------------------

    /// Submit a file for printing with the current settings. On success the
    /// settings are also persisted as the dialog-wide last-saved snapshot.
    pub fn print_file(&self, file_path: &Path) -> Result<String> {
        let job_id = self.submit(file_path, None)?;
        self.save_settings_snapshot();
        Ok(job_id)
    }

    /// Submit a file to be printed into another file (e.g. print-to-PDF
    /// backends) instead of a device.
    pub fn print_file_to(&self, file_path: &Path, final_path: &Path) -> Result<String> {
        let final_path = std::path::absolute(final_path)?;
        self.submit(file_path, Some(&final_path))
    }

    fn submit(&self, file_path: &Path, final_path: Option<&Path>) -> Result<String> {
        let file_path = std::path::absolute(file_path)?;
        let pairs = self
            .settings
            .lock()
            .expect("settings lock poisoned")
            .pairs();

        let job_id = self
            .proxy
            .print_file(&self.id, &file_path, &pairs, final_path)
            .map_err(|e| self.backend_err("print file", e))?;
        if job_id.is_empty() {
            return Err(Error::backend(
                &self.backend_name,
                format!("no job created for {} on {}", file_path.display(), self.id),
            ));
        }

        info!(printer = %self.key(), job_id = %job_id, "file submitted for printing");
        Ok(job_id)
    }

    /// Cancel a job on this printer. `Ok(false)` means the backend refused
    /// (the job may already be finished); `Err` means the call failed.
    pub fn cancel_job(&self, job_id: &str) -> Result<bool> {
        if job_id.is_empty() {
            return Err(Error::InvalidArgument("empty job id".into()));
        }
        self.proxy
            .cancel_job(job_id, &self.id)
            .map_err(|e| self.backend_err("cancel job", e))
    }

    /// Number of active (pending + held + printing) jobs on this printer.
    pub fn active_jobs_count(&self) -> Result<u32> {
        self.proxy
            .get_active_jobs_count(&self.id)
            .map_err(|e| self.backend_err("active jobs count", e))
    }

    // -- display names ------------------------------------------------------

    /// Human-readable name for an option; falls back to the raw name when
    /// the backend cannot translate it.
    pub fn human_option_name(&self, option_name: &str) -> String {
        match self.proxy.human_option_name(option_name) {
            Ok(name) => name,
            Err(e) => {
                debug!(option = option_name, error = %e, "no human-readable option name");
                option_name.to_string()
            }
        }
    }

    /// Human-readable name for an option choice; falls back to the raw
    /// choice name.
    pub fn human_choice_name(&self, option_name: &str, choice_name: &str) -> String {
        match self.proxy.human_choice_name(option_name, choice_name) {
            Ok(name) => name,
            Err(e) => {
                debug!(option = option_name, choice = choice_name, error = %e,
                       "no human-readable choice name");
                choice_name.to_string()
            }
        }
    }

    // -- internals ----------------------------------------------------------

    /// Persist the settings store as the user's last-saved snapshot. Best
    /// effort: a dialog that cannot write its config dir still prints.
    fn save_settings_snapshot(&self) {
        let Some(dir) = self.config.user_config_dir() else {
            warn!("no user config directory; settings snapshot not saved");
            return;
        };
        let path = dir.join(PRINT_SETTINGS_FILE);
        if let Err(e) = self.settings_snapshot().save(&path) {
            warn!(path = %path.display(), error = %e, "could not save settings snapshot");
        }
    }

    fn backend_err(&self, what: &str, cause: Error) -> Error {
        Error::backend(
            &self.backend_name,
            format!("{what} for printer {}: {cause}", self.id),
        )
    }
}

impl std::fmt::Debug for Printer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer")
            .field("id", &self.id)
            .field("backend_name", &self.backend_name)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("accepting_jobs", &self.accepting_jobs())
            .finish_non_exhaustive()
    }
}

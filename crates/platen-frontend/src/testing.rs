// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory transport fakes shared by the crate's tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use platen_core::config::BACKEND_PREFIX;
use platen_core::{
    BackendJob, Error, FrontendConfig, Margin, Media, PrinterBasicInfo, PrinterOption, Result,
};

use crate::registry::{Frontend, NoopListener, PrinterListener};
use crate::transport::{BackendNotification, BackendProxy, BusConnection, FrontendSignal};

/// Scriptable stand-in for one backend process.
#[derive(Debug, Default)]
pub struct MockBackend {
    pub name: String,
    pub state: Mutex<String>,
    default_printer: Mutex<Option<String>>,
    options: Mutex<Vec<PrinterOption>>,
    media: Mutex<Vec<Media>>,
    jobs: Mutex<Vec<BackendJob>>,
    options_delay: Mutex<Duration>,
    pub next_job_id: Mutex<String>,
    pub fail_options: AtomicBool,
    pub fail_jobs: AtomicBool,
    pub fail_human: AtomicBool,
    pub fail_replace: AtomicBool,
    pub activate_calls: AtomicUsize,
    pub option_calls: AtomicUsize,
    pub keep_alive_calls: AtomicUsize,
    pub replaced_with: Mutex<Option<String>>,
    pub printed: Mutex<Vec<(String, PathBuf, Vec<(String, String)>)>>,
    pub cancelled: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new("idle".into()),
            next_job_id: Mutex::new("job-0".into()),
            ..Default::default()
        }
    }

    pub fn with_option(mut self, name: &str, default: &str, supported: &[&str]) -> Self {
        self.options.get_mut().expect("options lock").push(PrinterOption {
            name: name.into(),
            group: String::new(),
            default_value: default.into(),
            supported_values: supported.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_media(mut self, name: &str, width: i32, length: i32) -> Self {
        self.media.get_mut().expect("media lock").push(Media {
            name: name.into(),
            width,
            length,
            margins: vec![Margin { left: 300, right: 300, top: 300, bottom: 300 }],
        });
        self
    }

    pub fn with_options_delay(mut self, delay: Duration) -> Self {
        *self.options_delay.get_mut().expect("delay lock") = delay;
        self
    }

    pub fn set_default_printer(&self, printer_id: &str) {
        *self.default_printer.lock().expect("default lock") = Some(printer_id.into());
    }

    pub fn clear_default_printer(&self) {
        *self.default_printer.lock().expect("default lock") = None;
    }

    pub fn push_job(&self, job_id: &str, printer_id: &str) {
        self.jobs.lock().expect("jobs lock").push(BackendJob {
            job_id: job_id.into(),
            title: format!("doc-{job_id}"),
            printer_id: printer_id.into(),
            user: "jdoe".into(),
            state: "Pending".into(),
            submitted_at: chrono::Utc::now(),
            size: 1024,
        });
    }

    fn unavailable(&self, what: &str) -> Error {
        Error::backend(&self.name, what)
    }
}

impl BackendProxy for MockBackend {
    fn activate(&self) -> Result<()> {
        self.activate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_default_printer(&self) -> Result<String> {
        self.default_printer
            .lock()
            .expect("default lock")
            .clone()
            .ok_or_else(|| self.unavailable("no default printer configured"))
    }

    fn is_accepting_jobs(&self, _printer_id: &str) -> Result<bool> {
        Ok(true)
    }

    fn get_printer_state(&self, _printer_id: &str) -> Result<String> {
        Ok(self.state.lock().expect("state lock").clone())
    }

    fn get_all_options(&self, _printer_id: &str) -> Result<(Vec<PrinterOption>, Vec<Media>)> {
        let delay = *self.options_delay.lock().expect("delay lock");
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.option_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_options.load(Ordering::SeqCst) {
            return Err(self.unavailable("options query failed"));
        }
        Ok((
            self.options.lock().expect("options lock").clone(),
            self.media.lock().expect("media lock").clone(),
        ))
    }

    fn get_all_jobs(&self, _active_only: bool) -> Result<Vec<BackendJob>> {
        if self.fail_jobs.load(Ordering::SeqCst) {
            return Err(self.unavailable("job listing failed"));
        }
        Ok(self.jobs.lock().expect("jobs lock").clone())
    }

    fn get_active_jobs_count(&self, _printer_id: &str) -> Result<u32> {
        Ok(self.jobs.lock().expect("jobs lock").len() as u32)
    }

    fn print_file(
        &self,
        printer_id: &str,
        file_path: &Path,
        settings: &[(String, String)],
        _final_path: Option<&Path>,
    ) -> Result<String> {
        self.printed.lock().expect("printed lock").push((
            printer_id.into(),
            file_path.to_path_buf(),
            settings.to_vec(),
        ));
        Ok(self.next_job_id.lock().expect("job id lock").clone())
    }

    fn cancel_job(&self, job_id: &str, printer_id: &str) -> Result<bool> {
        self.cancelled
            .lock()
            .expect("cancelled lock")
            .push((job_id.into(), printer_id.into()));
        Ok(true)
    }

    fn keep_alive(&self) -> Result<()> {
        self.keep_alive_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn replace(&self, previous_identity: &str) -> Result<()> {
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(self.unavailable("replace refused"));
        }
        *self.replaced_with.lock().expect("replaced lock") = Some(previous_identity.into());
        Ok(())
    }

    fn human_option_name(&self, option_name: &str) -> Result<String> {
        if self.fail_human.load(Ordering::SeqCst) {
            return Err(self.unavailable("no translation"));
        }
        Ok(titlecase(option_name))
    }

    fn human_choice_name(&self, _option_name: &str, choice_name: &str) -> Result<String> {
        if self.fail_human.load(Ordering::SeqCst) {
            return Err(self.unavailable("no translation"));
        }
        Ok(titlecase(choice_name))
    }
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// In-memory session bus: registered services, subscription channels, and a
/// record of emitted frontend signals.
#[derive(Default)]
pub struct MockConnection {
    unique: String,
    pub fail_unique: AtomicBool,
    services: Mutex<HashMap<String, Arc<MockBackend>>>,
    senders: Mutex<Vec<(String, mpsc::Sender<BackendNotification>)>>,
    pub emitted: Mutex<Vec<FrontendSignal>>,
}

impl MockConnection {
    pub fn new(unique: &str) -> Self {
        Self {
            unique: unique.into(),
            ..Default::default()
        }
    }

    pub fn register(&self, service_name: &str, backend: Arc<MockBackend>) {
        self.services
            .lock()
            .expect("services lock")
            .insert(service_name.into(), backend);
    }

    pub fn service(&self, service_name: &str) -> Option<Arc<MockBackend>> {
        self.services.lock().expect("services lock").get(service_name).cloned()
    }

    /// Deliver a notification to every subscriber of `signal_name`.
    pub fn send(&self, signal_name: &str, notification: BackendNotification) {
        for (name, sender) in self.senders.lock().expect("senders lock").iter() {
            if name == signal_name {
                let _ = sender.send(notification.clone());
            }
        }
    }
}

impl BusConnection for MockConnection {
    fn unique_name(&self) -> Result<String> {
        if self.fail_unique.load(Ordering::SeqCst) {
            return Err(Error::NotFound("unique bus name".into()));
        }
        Ok(self.unique.clone())
    }

    fn open_backend(&self, service_name: &str, _object_path: &str) -> Result<Arc<dyn BackendProxy>> {
        self.service(service_name)
            .map(|backend| backend as Arc<dyn BackendProxy>)
            .ok_or_else(|| Error::backend(service_name, "no such service on the bus"))
    }

    fn subscribe(&self, signal_name: &str) -> Result<mpsc::Receiver<BackendNotification>> {
        let (tx, rx) = mpsc::channel();
        self.senders
            .lock()
            .expect("senders lock")
            .push((signal_name.into(), tx));
        Ok(rx)
    }

    fn emit(&self, signal: FrontendSignal) -> Result<()> {
        self.emitted.lock().expect("emitted lock").push(signal);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        // Dropping the senders disconnects every subscription channel.
        self.senders.lock().expect("senders lock").clear();
        Ok(())
    }
}

/// A registry wired to a mock bus and scratch config directories.
pub struct TestBed {
    _dir: tempfile::TempDir,
    pub config: FrontendConfig,
    pub connection: Arc<MockConnection>,
    pub listener: Arc<dyn PrinterListener>,
    pub frontend: Arc<Frontend>,
}

impl TestBed {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = FrontendConfig {
            instance_name: None,
            backend_info_dir: dir.path().join("backends"),
            user_config_dir: Some(dir.path().join("user")),
            system_config_dir: Some(dir.path().join("system")),
            call_timeout: Duration::from_secs(5),
        };
        std::fs::create_dir_all(&config.backend_info_dir).expect("create backend dir");

        let connection = Arc::new(MockConnection::new(":1.42"));
        let listener: Arc<dyn PrinterListener> = Arc::new(NoopListener);
        let frontend = Frontend::new(config.clone(), connection.clone(), listener.clone());
        Self {
            _dir: dir,
            config,
            connection,
            listener,
            frontend,
        }
    }

    /// A registry with the given backends installed and discovered.
    pub fn with_backends(names: &[&str]) -> Self {
        let bed = Self::new();
        for name in names {
            bed.install_backend(name);
        }
        bed.frontend.discover_backends().expect("discover backends");
        bed
    }

    /// Swap the event listener, rebuilding the frontend.
    pub fn with_listener(mut self, listener: Arc<dyn PrinterListener>) -> Self {
        self.listener = listener;
        self.reload_frontend()
    }

    /// Rebuild the frontend from the (possibly modified) config. Discovered
    /// backends are lost; call `discover_backends` again if needed.
    pub fn reload_frontend(mut self) -> Self {
        self.frontend = Frontend::new(
            self.config.clone(),
            self.connection.clone(),
            self.listener.clone(),
        );
        self
    }

    /// Write a backend descriptor and register its mock service. Does not
    /// run discovery.
    pub fn install_backend(&self, name: &str) -> Arc<MockBackend> {
        let service = format!("{BACKEND_PREFIX}{name}");
        std::fs::write(
            self.config.backend_info_dir.join(&service),
            "/org/openprinting/PrintBackend\n",
        )
        .expect("write descriptor");
        let backend = Arc::new(MockBackend::new(name));
        self.connection.register(&service, backend.clone());
        backend
    }

    /// The mock behind a previously installed backend.
    pub fn backend(&self, name: &str) -> Arc<MockBackend> {
        self.connection
            .service(&format!("{BACKEND_PREFIX}{name}"))
            .expect("backend not installed")
    }
}

/// Printer-added payload with plausible test values.
pub fn basic_info(id: &str, backend: &str) -> PrinterBasicInfo {
    PrinterBasicInfo {
        id: id.into(),
        name: format!("Printer {id}"),
        info: "test printer".into(),
        location: "lab".into(),
        make_and_model: "ACME LaserJet 9000".into(),
        accepting_jobs: true,
        state: "idle".into(),
        backend_name: backend.into(),
    }
}

/// Frontend config rooted in a fresh scratch directory that outlives the
/// test (printers hold the config by value).
pub fn test_config() -> FrontendConfig {
    static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);
    let root = std::env::temp_dir().join(format!(
        "platen-test-{}-{}",
        std::process::id(),
        DIR_SEQ.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&root).expect("create scratch dir");
    FrontendConfig {
        instance_name: None,
        backend_info_dir: root.join("backends"),
        user_config_dir: Some(root.join("user")),
        system_config_dir: Some(root.join("system")),
        call_timeout: Duration::from_secs(5),
    }
}

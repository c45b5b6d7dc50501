// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The pickle/resurrect protocol: hand a live, backend-attached printer from
// one dialog process to another, later one.
//
// A pickle is a flat record: the pickling dialog's unique bus identity, the
// printer's backend name and basic fields, and its settings block. The
// delimiter format lives entirely in `PickleRecord`; nothing else in the
// crate splits these lines. Capabilities are deliberately absent — they can
// change between sessions, so a resurrected printer re-fetches them from
// the live backend.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use platen_core::config::BACKEND_PREFIX;
use platen_core::{Error, FrontendConfig, PrinterBasicInfo, Result, Settings};

use crate::backend::open_backend_from_descriptor;
use crate::printer::Printer;
use crate::registry::Frontend;
use crate::transport::BusConnection;

/// Decoded form of a pickle file.
#[derive(Debug, Clone, PartialEq)]
pub struct PickleRecord {
    /// Unique bus identity of the dialog that wrote the pickle. Passed to
    /// the backend's `replace` call so it can transfer state ownership.
    pub previous_identity: String,
    pub basic: PrinterBasicInfo,
    pub settings: Settings,
}

impl PickleRecord {
    /// Encode to the flat pickle format: one `value#` line per field, the
    /// accepting flag as `0`/`1`, then the settings block.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for field in [
            &self.previous_identity,
            &self.basic.backend_name,
            &self.basic.id,
            &self.basic.name,
            &self.basic.location,
            &self.basic.info,
            &self.basic.make_and_model,
            &self.basic.state,
        ] {
            out.push_str(&format!("{field}#\n"));
        }
        out.push_str(&format!("{}\n", u8::from(self.basic.accepting_jobs)));
        out.push_str(&self.settings.encode());
        out
    }

    /// Decode a pickle file's contents. `origin` is used for error context.
    pub fn decode(text: &str, origin: &Path) -> Result<Self> {
        let mut lines = text.lines();

        let previous_identity = next_field(&mut lines, origin, "bus identity")?;
        let backend_name = next_field(&mut lines, origin, "backend name")?;
        let id = next_field(&mut lines, origin, "printer id")?;
        let name = next_field(&mut lines, origin, "printer name")?;
        let location = next_field(&mut lines, origin, "location")?;
        let info = next_field(&mut lines, origin, "info")?;
        let make_and_model = next_field(&mut lines, origin, "make and model")?;
        let state = next_field(&mut lines, origin, "state")?;

        let accepting_line = lines.next().ok_or_else(|| truncated(origin, "accepting flag"))?;
        let accepting_jobs = match accepting_line.trim() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(Error::Malformed {
                    path: origin.to_path_buf(),
                    reason: format!("invalid accepting flag {other:?}"),
                });
            }
        };

        let settings = Settings::decode_stream(&mut lines, origin)?;

        if previous_identity.is_empty() || backend_name.is_empty() || id.is_empty() {
            return Err(Error::Malformed {
                path: origin.to_path_buf(),
                reason: "empty identity, backend, or printer id".into(),
            });
        }

        Ok(Self {
            previous_identity,
            basic: PrinterBasicInfo {
                id,
                name,
                info,
                location,
                make_and_model,
                accepting_jobs,
                state,
                backend_name,
            },
            settings,
        })
    }
}

/// Serialize a printer (and its settings) to `path` so another process can
/// resurrect it.
///
/// The backend is asked to stay alive first, so it does not exit in the
/// window where no dialog holds it. Nothing is written unless the parent
/// registry's bus identity can be determined.
pub fn pickle_printer(printer: &Printer, path: &Path, frontend: &Frontend) -> Result<()> {
    printer.proxy().keep_alive().map_err(|e| {
        Error::backend(
            printer.backend_name(),
            format!("keep-alive before pickling {}: {e}", printer.id()),
        )
    })?;

    let previous_identity = frontend.bus_identity()?;

    let record = PickleRecord {
        previous_identity,
        basic: printer.basic_info(),
        settings: printer.settings_snapshot(),
    };

    let path = std::path::absolute(path)?;
    std::fs::write(&path, record.encode())?;
    info!(printer = %printer.key(), path = %path.display(), "printer pickled");
    Ok(())
}

/// Reconstruct a live printer from a pickle file.
///
/// Opens a fresh proxy for the named backend from its descriptor and sends
/// `replace` with the previous dialog's identity, so the backend transfers
/// state ownership to this connection. The options cache starts empty: an
/// absent, truncated, or unreattachable pickle yields an error, never a
/// crash.
pub fn resurrect_printer(
    path: &Path,
    connection: Arc<dyn BusConnection>,
    config: &FrontendConfig,
) -> Result<Arc<Printer>> {
    let path = std::path::absolute(path)?;
    let text = std::fs::read_to_string(&path)?;
    let record = PickleRecord::decode(&text, &path)?;
    debug!(
        printer = %record.basic.id,
        backend = %record.basic.backend_name,
        previous = %record.previous_identity,
        "resurrecting printer"
    );

    let file_name = format!("{BACKEND_PREFIX}{}", record.basic.backend_name);
    let proxy =
        open_backend_from_descriptor(connection.as_ref(), &config.backend_info_dir, &file_name)?;
    proxy.replace(&record.previous_identity).map_err(|e| {
        Error::backend(
            &record.basic.backend_name,
            format!("replace previous dialog {}: {e}", record.previous_identity),
        )
    })?;

    let printer =
        Printer::from_basic_info(record.basic, proxy, record.settings, config.clone());
    info!(printer = %printer.key(), "printer resurrected");
    Ok(printer)
}

fn next_field(lines: &mut std::str::Lines<'_>, origin: &Path, what: &str) -> Result<String> {
    let line = lines.next().ok_or_else(|| truncated(origin, what))?;
    Ok(line.split('#').next().unwrap_or_default().to_string())
}

fn truncated(origin: &Path, what: &str) -> Error {
    Error::Malformed {
        path: origin.to_path_buf(),
        reason: format!("truncated before {what}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{TestBed, basic_info};

    fn sample_record() -> PickleRecord {
        let mut settings = Settings::new();
        settings.set("copies", "2");
        settings.set("sides", "two-sided-long");
        settings.set("media", "iso_a4_210x297mm");
        PickleRecord {
            previous_identity: ":1.97".into(),
            basic: basic_info("pr9", "CUPS"),
            settings,
        }
    }

    #[test]
    fn record_codec_round_trip() {
        let record = sample_record();
        let decoded =
            PickleRecord::decode(&record.encode(), Path::new("test")).expect("decode");
        assert_eq!(decoded, record);
    }

    #[test]
    fn truncated_records_are_rejected() {
        let record = sample_record();
        let encoded = record.encode();

        // Chop the record at every line boundary; none of the prefixes may
        // decode successfully.
        let lines: Vec<&str> = encoded.lines().collect();
        for cut in 0..lines.len() {
            let partial = lines[..cut].join("\n");
            let err = PickleRecord::decode(&partial, Path::new("test")).unwrap_err();
            assert!(matches!(err, Error::Malformed { .. }), "cut at line {cut}");
        }
    }

    #[test]
    fn pickle_then_resurrect_round_trip() {
        let bed = TestBed::with_backends(&["CUPS"]);
        let printer = bed.frontend.add_printer(basic_info("pr1", "CUPS")).expect("add");
        printer.add_setting("copies", "2");
        printer.add_setting("sides", "two-sided-long");
        printer.add_setting("media", "iso_a4_210x297mm");

        let pickle_path = bed.config.user_config_dir().expect("dir").join("picked-printer");
        pickle_printer(&printer, &pickle_path, &bed.frontend).expect("pickle");

        let backend = bed.backend("CUPS");
        assert_eq!(backend.keep_alive_calls.load(Ordering::SeqCst), 1);

        // A different dialog process: same descriptor dir, fresh connection.
        let resurrected =
            resurrect_printer(&pickle_path, bed.connection.clone(), &bed.config).expect("resurrect");

        assert_eq!(resurrected.id(), "pr1");
        assert_eq!(resurrected.backend_name(), "CUPS");
        assert_eq!(resurrected.setting("copies").as_deref(), Some("2"));
        assert_eq!(resurrected.setting("sides").as_deref(), Some("two-sided-long"));
        assert_eq!(resurrected.setting("media").as_deref(), Some("iso_a4_210x297mm"));

        // The backend was told which dialog it replaces.
        assert_eq!(
            backend.replaced_with.lock().expect("replaced lock").as_deref(),
            Some(":1.42")
        );

        // Capabilities were not restored from disk: no fetch has happened.
        assert_eq!(backend.option_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pickle_without_bus_identity_writes_nothing() {
        let bed = TestBed::with_backends(&["CUPS"]);
        let printer = bed.frontend.add_printer(basic_info("pr1", "CUPS")).expect("add");

        bed.connection.fail_unique.store(true, Ordering::SeqCst);
        let pickle_path = bed.config.user_config_dir().expect("dir").join("picked-printer");
        assert!(pickle_printer(&printer, &pickle_path, &bed.frontend).is_err());
        assert!(!pickle_path.exists());
    }

    #[test]
    fn resurrect_from_missing_file_is_an_error() {
        let bed = TestBed::with_backends(&["CUPS"]);
        let err = resurrect_printer(
            Path::new("/no/such/pickle"),
            bed.connection.clone(),
            &bed.config,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn resurrect_fails_when_backend_cannot_be_reattached() {
        let bed = TestBed::with_backends(&["CUPS"]);
        let printer = bed.frontend.add_printer(basic_info("pr1", "CUPS")).expect("add");

        let pickle_path = bed.config.user_config_dir().expect("dir").join("picked-printer");
        pickle_printer(&printer, &pickle_path, &bed.frontend).expect("pickle");

        bed.backend("CUPS").fail_replace.store(true, Ordering::SeqCst);
        let err = resurrect_printer(&pickle_path, bed.connection.clone(), &bed.config).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable { .. }));
    }
}

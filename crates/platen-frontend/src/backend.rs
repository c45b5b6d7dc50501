// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend handles and descriptor files.
//
// Each installed backend drops one descriptor file into the backend info
// directory. The filename is the backend's bus service name
// (`org.openprinting.Backend.<name>`); the file content is the object path
// the service exports.

use std::path::Path;
use std::sync::Arc;

use platen_core::config::BACKEND_PREFIX;
use platen_core::{Error, Result};

use crate::transport::{BackendProxy, BusConnection};

/// A connection to one backend process. Exactly one handle exists per
/// distinct backend name within a registry.
#[derive(Clone)]
pub struct BackendHandle {
    pub name: String,
    pub proxy: Arc<dyn BackendProxy>,
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Extract the backend name from a descriptor filename, if it carries the
/// backend prefix.
pub fn descriptor_backend_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(BACKEND_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Read a descriptor file and open a proxy for the backend it describes.
///
/// The descriptor's first whitespace-delimited token is the object path.
/// Any failure (unreadable file, empty descriptor, proxy construction)
/// surfaces as `BackendUnavailable`, so discovery can skip the entry and
/// keep scanning.
pub fn open_backend_from_descriptor(
    connection: &dyn BusConnection,
    info_dir: &Path,
    file_name: &str,
) -> Result<Arc<dyn BackendProxy>> {
    let path = info_dir.join(file_name);
    let contents = std::fs::read_to_string(&path).map_err(|e| {
        Error::backend(file_name, format!("descriptor {}: {e}", path.display()))
    })?;
    let object_path = contents
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::backend(file_name, format!("empty descriptor {}", path.display())))?;
    connection.open_backend(file_name, object_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnection;

    #[test]
    fn descriptor_name_requires_prefix() {
        assert_eq!(
            descriptor_backend_name("org.openprinting.Backend.CUPS"),
            Some("CUPS")
        );
        assert_eq!(descriptor_backend_name("org.openprinting.Backend."), None);
        assert_eq!(descriptor_backend_name("README"), None);
    }

    #[test]
    fn missing_descriptor_is_backend_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let connection = MockConnection::new("1.42");
        let err = open_backend_from_descriptor(
            &connection,
            dir.path(),
            "org.openprinting.Backend.CUPS",
        )
        .unwrap_err();
        assert!(matches!(err, platen_core::Error::BackendUnavailable { .. }));
    }

    #[test]
    fn empty_descriptor_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file_name = "org.openprinting.Backend.CUPS";
        std::fs::write(dir.path().join(file_name), "  \n").expect("write");

        let connection = MockConnection::new("1.42");
        let err = open_backend_from_descriptor(&connection, dir.path(), file_name).unwrap_err();
        assert!(matches!(err, platen_core::Error::BackendUnavailable { .. }));
    }
}

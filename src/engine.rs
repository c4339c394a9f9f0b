//! Native engine discovery: the pdfium shared library and the `pdf2htmlEX`
//! executable.
//!
//! Nothing here downloads anything. A service that cannot find its native
//! dependencies must refuse to start, so every lookup either resolves to
//! something that exists on disk or returns an error naming what is missing.
//!
//! ## pdfium lookup order
//!
//! 1. the explicit path from [`crate::ConversionConfig::pdfium_library`]
//!    (must exist),
//! 2. `PDFIUM_LIB_PATH`,
//! 3. the platform library name in the working directory
//!    (`./libpdfium.so`, `./libpdfium.dylib`, `./pdfium.dll`),
//! 4. the system library search path.

use crate::error::Pdf2HtmlError;
use pdfium_render::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit pdfium library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Executable name of the external converter.
pub const PDF2HTMLEX: &str = "pdf2htmlEX";

/// Where the pdfium library will be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumLibrary {
    /// A specific shared library file.
    Path(PathBuf),
    /// Whatever the dynamic loader finds on the system search path.
    System,
}

impl PdfiumLibrary {
    /// Resolve the library location from the explicit path, the process
    /// environment and the working directory.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, Pdf2HtmlError> {
        let local = PathBuf::from(Pdfium::pdfium_platform_library_name_at_path("./"));
        Self::locate_with(explicit, std::env::var_os(PDFIUM_LIB_ENV), &local)
    }

    fn locate_with(
        explicit: Option<&Path>,
        env_path: Option<OsString>,
        local: &Path,
    ) -> Result<Self, Pdf2HtmlError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Pdf2HtmlError::PdfiumBindingFailed(format!(
                    "configured library '{}' does not exist",
                    path.display()
                )));
            }
            return Ok(PdfiumLibrary::Path(path.to_path_buf()));
        }

        if let Some(env_path) = env_path.filter(|p| !p.is_empty()) {
            let p = PathBuf::from(env_path);
            if p.exists() {
                return Ok(PdfiumLibrary::Path(p));
            }
            warn!(
                "{} '{}' not found; falling back to default lookup",
                PDFIUM_LIB_ENV,
                p.display()
            );
        }

        if local.exists() {
            return Ok(PdfiumLibrary::Path(local.to_path_buf()));
        }

        Ok(PdfiumLibrary::System)
    }

    /// Load the library and initialise pdfium.
    pub fn bind(&self) -> Result<Pdfium, Pdf2HtmlError> {
        let bindings = match self {
            PdfiumLibrary::Path(path) => Pdfium::bind_to_library(path),
            PdfiumLibrary::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Pdf2HtmlError::PdfiumBindingFailed(format!("{self}: {e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl std::fmt::Display for PdfiumLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfiumLibrary::Path(p) => write!(f, "{}", p.display()),
            PdfiumLibrary::System => f.write_str("system library"),
        }
    }
}

/// Locate and bind pdfium in one step.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, Pdf2HtmlError> {
    let library = PdfiumLibrary::locate(explicit)?;
    debug!("Binding pdfium from {}", library);
    library.bind()
}

/// Prove that pdfium loads, returning where it was found.
///
/// Blocking; call from `spawn_blocking` inside async code.
pub fn probe_pdfium(explicit: Option<&Path>) -> Result<PdfiumLibrary, Pdf2HtmlError> {
    let library = PdfiumLibrary::locate(explicit)?;
    library.bind()?;
    info!("pdfium available ({})", library);
    Ok(library)
}

/// Find `name` in the directories of a `PATH`-style list.
pub fn find_executable(name: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Resolve the `pdf2htmlEX` executable: the explicit path if given,
/// otherwise a `PATH` search.
pub fn locate_pdf2htmlex(explicit: Option<&Path>) -> Result<PathBuf, Pdf2HtmlError> {
    if let Some(path) = explicit {
        if is_executable(path) {
            return Ok(path.to_path_buf());
        }
        return Err(Pdf2HtmlError::ExternalToolMissing {
            tool: PDF2HTMLEX.to_string(),
            hint: format!("'{}' is not an executable file.", path.display()),
        });
    }

    find_executable(PDF2HTMLEX, std::env::var_os("PATH")).ok_or_else(|| {
        Pdf2HtmlError::ExternalToolMissing {
            tool: PDF2HTMLEX.to_string(),
            hint: "Install pdf2htmlEX on PATH or set PDF2HTMLEX_BIN.".to_string(),
        }
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

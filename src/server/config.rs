//! Process configuration for the HTTP service.
//!
//! Read once at startup from the environment. Parsing is lenient: a
//! malformed value is logged and replaced by its default so a typo in a
//! deployment manifest never prevents the service from starting. The only
//! startup failures are the ones [`crate::server`] treats as fatal.

use crate::config::{ConversionConfig, ConverterKind};
use crate::error::Pdf2HtmlError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const DEFAULT_APP_NAME: &str = "pdf2html";

/// Service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address. `HOST`, default `0.0.0.0`.
    pub host: IpAddr,
    /// Listening port. `PORT`, default 8080.
    pub port: u16,
    /// Runtime worker threads and concurrent conversion slots. `WORKERS`, default 1.
    pub workers: usize,
    /// Application name reported in logs and `/health`. `FLASK_APP`.
    pub app_name: String,
    /// `CONVERTER`, or `USE_ALTERNATIVE_CONVERTER` for the overlay backend.
    pub converter: ConverterKind,
    /// Per-request deadline in seconds, 0 disables it. `TIMEOUT`, default 120.
    pub timeout_secs: u64,
    /// Request body limit in MiB. `MAX_UPLOAD_MB`, default 50.
    pub max_upload_mb: usize,
    /// `SCRATCH_DIR`; created at startup.
    pub scratch_dir: Option<PathBuf>,
    /// Refuse to run as uid 0. `REQUIRE_NON_ROOT`.
    pub require_non_root: bool,
    /// `PDFIUM_LIB_PATH`.
    pub pdfium_library: Option<PathBuf>,
    /// `PDF2HTMLEX_BIN`.
    pub pdf2htmlex_bin: Option<PathBuf>,
    /// Overlay raster resolution. `DPI`, default 150.
    pub dpi: u32,
    /// JSON log lines. `LOG_FORMAT=json`.
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            app_name: DEFAULT_APP_NAME.to_string(),
            converter: ConverterKind::Native,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            scratch_dir: None,
            require_non_root: false,
            pdfium_library: None,
            pdf2htmlex_bin: None,
            dpi: 150,
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let alternative = get("USE_ALTERNATIVE_CONVERTER")
            .map(|v| parse_flag("USE_ALTERNATIVE_CONVERTER", &v, false))
            .unwrap_or(false);
        let converter = match get("CONVERTER") {
            Some(v) => parse_or("CONVERTER", &v, defaults.converter),
            None if alternative => ConverterKind::Overlay,
            None => defaults.converter,
        };

        Self {
            host: get("HOST").map_or(defaults.host, |v| parse_or("HOST", &v, defaults.host)),
            port: get("PORT").map_or(defaults.port, |v| {
                parse_positive("PORT", &v, defaults.port)
            }),
            workers: get("WORKERS").map_or(defaults.workers, |v| {
                let workers = parse_positive("WORKERS", &v, defaults.workers);
                if workers > MAX_WORKERS {
                    warn!("WORKERS {} exceeds {}, capping", workers, MAX_WORKERS);
                    MAX_WORKERS
                } else {
                    workers
                }
            }),
            app_name: get("FLASK_APP").map_or(defaults.app_name, |v| v.trim().to_string()),
            converter,
            timeout_secs: get("TIMEOUT").map_or(defaults.timeout_secs, |v| {
                parse_or("TIMEOUT", &v, defaults.timeout_secs)
            }),
            max_upload_mb: get("MAX_UPLOAD_MB").map_or(defaults.max_upload_mb, |v| {
                parse_positive("MAX_UPLOAD_MB", &v, defaults.max_upload_mb)
            }),
            scratch_dir: get("SCRATCH_DIR").map(PathBuf::from),
            require_non_root: get("REQUIRE_NON_ROOT")
                .map_or(false, |v| parse_flag("REQUIRE_NON_ROOT", &v, false)),
            pdfium_library: get("PDFIUM_LIB_PATH").map(PathBuf::from),
            pdf2htmlex_bin: get("PDF2HTMLEX_BIN").map(PathBuf::from),
            dpi: get("DPI").map_or(defaults.dpi, |v| {
                let dpi = parse_or("DPI", &v, defaults.dpi);
                if (72..=400).contains(&dpi) {
                    dpi
                } else {
                    warn!("DPI {} outside 72–400, using {}", dpi, defaults.dpi);
                    defaults.dpi
                }
            }),
            log_json: get("LOG_FORMAT").is_some_and(|v| v.trim().eq_ignore_ascii_case("json")),
        }
    }

    /// The socket address to bind.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Request body limit in bytes.
    pub fn max_body_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Per-request deadline, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Library configuration for the conversions this service runs.
    ///
    /// The request deadline is enforced by the HTTP layer, so the library's
    /// own timeout stays disabled.
    pub fn conversion_config(&self) -> Result<ConversionConfig, Pdf2HtmlError> {
        let mut builder = ConversionConfig::builder()
            .converter(self.converter)
            .dpi(self.dpi);
        if let Some(ref dir) = self.scratch_dir {
            builder = builder.scratch_dir(dir);
        }
        if let Some(ref lib) = self.pdfium_library {
            builder = builder.pdfium_library(lib);
        }
        if let Some(ref bin) = self.pdf2htmlex_bin {
            builder = builder.pdf2htmlex_bin(bin);
        }
        builder.build()
    }

    /// Log the effective configuration.
    pub fn log_summary(&self) {
        info!(
            app = %self.app_name,
            address = %self.addr(),
            workers = self.workers,
            converter = %self.converter,
            timeout_secs = self.timeout_secs,
            max_upload_mb = self.max_upload_mb,
            scratch_dir = ?self.scratch_dir,
            require_non_root = self.require_non_root,
            log_json = self.log_json,
            "Effective configuration"
        );
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!("Invalid {} value '{}', using default {}", key, raw, default);
            default
        }
    }
}

fn parse_positive<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy + PartialOrd + Default,
{
    let v = parse_or(key, raw, default);
    if v > T::default() {
        v
    } else {
        warn!("{} must be greater than zero, using default {}", key, default);
        default
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn parse_flag(key: &str, raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("Invalid {} value '{}', using default {}", key, raw, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let c = config_from(&[]);
        assert_eq!(c, ServerConfig::default());
        assert_eq!(c.addr().to_string(), "0.0.0.0:8080");
        assert_eq!(c.workers, 1);
        assert_eq!(c.app_name, "pdf2html");
    }

    #[test]
    fn port_and_workers_are_read() {
        let c = config_from(&[("PORT", "9090"), ("WORKERS", "4")]);
        assert_eq!(c.port, 9090);
        assert_eq!(c.workers, 4);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let c = config_from(&[
            ("PORT", "eighty"),
            ("WORKERS", "0"),
            ("TIMEOUT", "-5"),
            ("MAX_UPLOAD_MB", "0"),
            ("DPI", "9000"),
        ]);
        assert_eq!(c.port, DEFAULT_PORT);
        assert_eq!(c.workers, DEFAULT_WORKERS);
        assert_eq!(c.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(c.max_upload_mb, DEFAULT_MAX_UPLOAD_MB);
        assert_eq!(c.dpi, 150);
    }

    #[test]
    fn workers_are_capped() {
        assert_eq!(config_from(&[("WORKERS", "100000")]).workers, MAX_WORKERS);
        assert_eq!(config_from(&[("WORKERS", "1024")]).workers, 1024);
    }

    #[test]
    fn port_zero_and_out_of_range_fall_back() {
        assert_eq!(config_from(&[("PORT", "0")]).port, DEFAULT_PORT);
        assert_eq!(config_from(&[("PORT", "70000")]).port, DEFAULT_PORT);
        assert_eq!(config_from(&[("PORT", " 3000 ")]).port, 3000);
    }

    #[test]
    fn alternative_flag_selects_overlay() {
        let c = config_from(&[("USE_ALTERNATIVE_CONVERTER", "true")]);
        assert_eq!(c.converter, ConverterKind::Overlay);
        let c = config_from(&[("USE_ALTERNATIVE_CONVERTER", "0")]);
        assert_eq!(c.converter, ConverterKind::Native);
    }

    #[test]
    fn explicit_converter_wins() {
        let c = config_from(&[
            ("USE_ALTERNATIVE_CONVERTER", "1"),
            ("CONVERTER", "pdf2htmlex"),
        ]);
        assert_eq!(c.converter, ConverterKind::Pdf2HtmlEx);
    }

    #[test]
    fn app_name_and_flags() {
        let c = config_from(&[
            ("FLASK_APP", "main:app"),
            ("REQUIRE_NON_ROOT", "YES"),
            ("LOG_FORMAT", "JSON"),
            ("HOST", "127.0.0.1"),
        ]);
        assert_eq!(c.app_name, "main:app");
        assert!(c.require_non_root);
        assert!(c.log_json);
        assert_eq!(c.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn timeout_zero_disables_deadline() {
        assert!(config_from(&[("TIMEOUT", "0")]).request_timeout().is_none());
        assert_eq!(
            config_from(&[]).request_timeout(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn conversion_config_carries_engine_settings() {
        let c = config_from(&[
            ("CONVERTER", "overlay"),
            ("DPI", "200"),
            ("SCRATCH_DIR", "/tmp/scratch"),
            ("PDFIUM_LIB_PATH", "/opt/libpdfium.so"),
        ]);
        let conv = c.conversion_config().unwrap();
        assert_eq!(conv.converter, ConverterKind::Overlay);
        assert_eq!(conv.dpi, 200);
        assert_eq!(conv.scratch_dir, Some(PathBuf::from("/tmp/scratch")));
        assert_eq!(conv.pdfium_library, Some(PathBuf::from("/opt/libpdfium.so")));
        assert!(conv.timeout().is_none());
    }

    #[test]
    fn body_limit_in_bytes() {
        assert_eq!(config_from(&[("MAX_UPLOAD_MB", "2")]).max_body_bytes(), 2 * 1024 * 1024);
    }
}

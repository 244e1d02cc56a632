//! Centralized configuration for StudentQR.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - AppConfig::from_env() reads SQR_* variables; unparseable values keep the default.
//! - Fluent `with_*` setters so the CLI (and tests) can override specific fields.
//!
//! The public host is part of the configuration: it is resolved once at startup
//! (see `net::resolve`) and then handed to the handler layer as a plain value.

use std::fmt;
use std::path::PathBuf;

use crate::consts::{
    CSV_FILE, DEFAULT_BIND_HOST, DEFAULT_PORT, QR_BORDER, QR_BOX_SIZE, QR_DIR, QR_MIN_MODULES,
};
use crate::qr::{parse_color, side_px, EcLevel};

/// Top-level configuration for the service and the CLI.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Interface to bind the HTTP server on.
    /// Env: SQR_BIND_HOST (default "0.0.0.0")
    pub bind_host: String,

    /// Listening port; also used in generated profile URLs.
    /// Env: SQR_PORT (default 5000)
    pub port: u16,

    /// Host placed into profile URLs. None => resolve the routable local address.
    /// Env: SQR_PUBLIC_HOST
    pub public_host: Option<String>,

    /// Path to the CSV record store.
    /// Env: SQR_CSV_PATH (default "students.csv")
    pub csv_path: PathBuf,

    /// Directory for generated QR images.
    /// Env: SQR_QR_DIR (default "static/qrcodes")
    pub qr_dir: PathBuf,

    /// Module size in pixels.
    /// Env: SQR_QR_BOX_SIZE (default 12)
    pub qr_box_size: u32,

    /// Quiet zone width in modules.
    /// Env: SQR_QR_BORDER (default 4)
    pub qr_border: u32,

    /// Error-correction level.
    /// Env: SQR_QR_EC = L|M|Q|H (default H)
    pub qr_ec_level: EcLevel,

    /// Dark module color, RGB.
    /// Env: SQR_QR_FILL = "black" | "#rrggbb" (default black)
    pub qr_fill: [u8; 3],

    /// Light module color, RGB.
    /// Env: SQR_QR_BACK = "white" | "#rrggbb" (default white)
    pub qr_back: [u8; 3],

    /// Take an exclusive fs2 lock around CSV appends.
    /// Env: SQR_LOCK_APPENDS = 0|1|true|false (default false)
    pub lock_appends: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            public_host: None,
            csv_path: PathBuf::from(CSV_FILE),
            qr_dir: PathBuf::from(QR_DIR),
            qr_box_size: QR_BOX_SIZE,
            qr_border: QR_BORDER,
            qr_ec_level: EcLevel::H,
            qr_fill: [0, 0, 0],
            qr_back: [255, 255, 255],
            lock_appends: false,
        }
    }
}

fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

fn env_nonempty(v: &str) -> Option<String> {
    let s = v.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env`, but with an injectable variable source (tests use a map).
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        // ----- HTTP -----
        if let Some(v) = get("SQR_BIND_HOST").as_deref().and_then(env_nonempty) {
            cfg.bind_host = v;
        }
        if let Some(v) = get("SQR_PORT") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.port = n;
            }
        }
        if let Some(v) = get("SQR_PUBLIC_HOST") {
            cfg.public_host = env_nonempty(&v);
        }

        // ----- storage -----
        if let Some(v) = get("SQR_CSV_PATH").as_deref().and_then(env_nonempty) {
            cfg.csv_path = PathBuf::from(v);
        }
        if let Some(v) = get("SQR_QR_DIR").as_deref().and_then(env_nonempty) {
            cfg.qr_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SQR_LOCK_APPENDS") {
            cfg.lock_appends = env_flag(&v);
        }

        // ----- QR rendering -----
        // Размеры, при которых даже минимальный QR не влезает в QR_MAX_SIDE, отбрасываем.
        if let Some(v) = get("SQR_QR_BOX_SIZE") {
            if let Ok(n) = v.trim().parse::<u32>() {
                if n > 0 && side_px(QR_MIN_MODULES, n, cfg.qr_border).is_some() {
                    cfg.qr_box_size = n;
                }
            }
        }
        if let Some(v) = get("SQR_QR_BORDER") {
            if let Ok(n) = v.trim().parse::<u32>() {
                if side_px(QR_MIN_MODULES, cfg.qr_box_size, n).is_some() {
                    cfg.qr_border = n;
                }
            }
        }
        if let Some(v) = get("SQR_QR_EC") {
            if let Ok(level) = v.parse::<EcLevel>() {
                cfg.qr_ec_level = level;
            }
        }
        if let Some(v) = get("SQR_QR_FILL") {
            if let Some(rgb) = parse_color(&v) {
                cfg.qr_fill = rgb;
            }
        }
        if let Some(v) = get("SQR_QR_BACK") {
            if let Some(rgb) = parse_color(&v) {
                cfg.qr_back = rgb;
            }
        }

        cfg
    }

    // ----- fluent setters (builder-style) -----

    pub fn with_bind_host<S: Into<String>>(mut self, host: S) -> Self {
        self.bind_host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_public_host<S: Into<String>>(mut self, host: Option<S>) -> Self {
        self.public_host = host.map(Into::into);
        self
    }

    pub fn with_csv_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.csv_path = path.into();
        self
    }

    pub fn with_qr_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.qr_dir = dir.into();
        self
    }

    pub fn with_qr_box_size(mut self, px: u32) -> Self {
        self.qr_box_size = px.max(1);
        self
    }

    pub fn with_qr_border(mut self, modules: u32) -> Self {
        self.qr_border = modules;
        self
    }

    pub fn with_qr_ec_level(mut self, level: EcLevel) -> Self {
        self.qr_ec_level = level;
        self
    }

    pub fn with_lock_appends(mut self, on: bool) -> Self {
        self.lock_appends = on;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }

    /// Address string for `tiny_http::Server::http`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AppConfig {{ \
             bind: {}:{}, \
             public_host: {}, \
             csv_path: {}, \
             qr_dir: {}, \
             qr: {}px/{} border/ec {}, \
             lock_appends: {} \
             }}",
            self.bind_host,
            self.port,
            self.public_host.as_deref().unwrap_or("auto(resolve)"),
            self.csv_path.display(),
            self.qr_dir.display(),
            self.qr_box_size,
            self.qr_border,
            self.qr_ec_level,
            self.lock_appends,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_on_disk_layout() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
        assert_eq!(cfg.csv_path, PathBuf::from("students.csv"));
        assert_eq!(cfg.qr_dir, PathBuf::from("static/qrcodes"));
        assert_eq!(cfg.qr_ec_level, EcLevel::H);
        assert!(!cfg.lock_appends);
    }

    #[test]
    fn env_overrides_and_bad_values_ignored() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SQR_PORT", "8080"),
            ("SQR_PUBLIC_HOST", "school.local"),
            ("SQR_QR_BOX_SIZE", "not-a-number"),
            ("SQR_QR_EC", "m"),
            ("SQR_LOCK_APPENDS", "yes"),
            ("SQR_QR_FILL", "#112233"),
        ]));
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.public_host.as_deref(), Some("school.local"));
        assert_eq!(cfg.qr_box_size, QR_BOX_SIZE);
        assert_eq!(cfg.qr_ec_level, EcLevel::M);
        assert!(cfg.lock_appends);
        assert_eq!(cfg.qr_fill, [0x11, 0x22, 0x33]);
    }

    #[test]
    fn oversized_qr_settings_keep_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SQR_QR_BOX_SIZE", "4294967295"),
            ("SQR_QR_BORDER", "2147483647"),
        ]));
        assert_eq!(cfg.qr_box_size, QR_BOX_SIZE);
        assert_eq!(cfg.qr_border, QR_BORDER);

        let cfg = AppConfig::from_lookup(lookup(&[
            ("SQR_QR_BOX_SIZE", "20"),
            ("SQR_QR_BORDER", "10"),
        ]));
        assert_eq!(cfg.qr_box_size, 20);
        assert_eq!(cfg.qr_border, 10);
    }

    #[test]
    fn blank_public_host_means_resolve() {
        let cfg = AppConfig::from_lookup(lookup(&[("SQR_PUBLIC_HOST", "   ")]));
        assert!(cfg.public_host.is_none());
    }
}

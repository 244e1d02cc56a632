//! Handler layer: registration and profile lookup.
//!
//! Transport-agnostic. `http` maps requests onto these calls, the CLI calls them
//! directly. The public host is passed in at construction time and never changes.

use anyhow::Context;
use log::{debug, info};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::consts::QR_EXT;
use crate::ident::{IdSource, RandomIds};
use crate::metrics;
use crate::net;
use crate::qr::{self, QrOptions};
use crate::store::{RecordStore, StudentRecord};

/// Handler-level failure, mapped to an HTTP status by the server.
#[derive(Debug)]
pub enum AppError {
    /// A required form field is absent.
    MissingField(&'static str),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> u16 {
        match self {
            AppError::MissingField(_) | AppError::BadRequest(_) => 400,
            AppError::Internal(_) => 500,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingField(name) => write!(f, "Missing form field: {}", name),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(e) => write!(f, "internal error: {:#}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Internal(e) => {
                let src: &(dyn std::error::Error + 'static) = e.as_ref();
                Some(src)
            }
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

/// Raw form as submitted; every field optional until validated.
#[derive(Debug, Default, Deserialize)]
pub struct RegistrationForm {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub contact: Option<String>,
}

impl RegistrationForm {
    /// Parse an `application/x-www-form-urlencoded` body. Unknown keys are ignored.
    pub fn from_urlencoded(body: &[u8]) -> Result<Self, AppError> {
        serde_urlencoded::from_bytes(body)
            .map_err(|e| AppError::BadRequest(format!("malformed form body: {}", e)))
    }

    /// Presence check only; empty values are accepted as submitted.
    pub fn validate(self) -> Result<NewStudent, AppError> {
        Ok(NewStudent {
            name: self.name.ok_or(AppError::MissingField("name"))?,
            grade: self.grade.ok_or(AppError::MissingField("grade"))?,
            contact: self.contact.ok_or(AppError::MissingField("contact"))?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub grade: String,
    pub contact: String,
}

/// Result of a successful registration.
#[derive(Clone, Debug)]
pub struct Registration {
    pub record: StudentRecord,
    /// QR image file name (inside the QR directory).
    pub filename: String,
    pub profile_url: String,
}

/// `{name}_{grade}_{id}.png`, spaces -> '_'.
/// Path separators are replaced as well so the name stays inside the QR directory.
pub fn qr_filename(name: &str, grade: &str, student_id: &str) -> String {
    format!("{}_{}_{}.{}", name, grade, student_id, QR_EXT)
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            _ => c,
        })
        .collect()
}

/// A file name we are willing to serve from the QR directory.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

pub struct App {
    store: RecordStore,
    ids: Box<dyn IdSource>,
    qr_dir: PathBuf,
    qr: QrOptions,
    public_host: String,
    port: u16,
}

impl App {
    /// Build from config; resolves the public host unless configured explicitly.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let host = match &cfg.public_host {
            Some(h) => h.clone(),
            None => net::resolve().to_string(),
        };
        Self::new(cfg, host)
    }

    pub fn new(cfg: &AppConfig, public_host: String) -> Self {
        Self {
            store: RecordStore::open(cfg.csv_path.clone()).with_lock_appends(cfg.lock_appends),
            ids: Box::new(RandomIds),
            qr_dir: cfg.qr_dir.clone(),
            qr: QrOptions {
                ec_level: cfg.qr_ec_level,
                box_size: cfg.qr_box_size,
                border: cfg.qr_border,
                fill: cfg.qr_fill,
                background: cfg.qr_back,
            },
            public_host,
            port: cfg.port,
        }
    }

    pub fn with_id_source(mut self, ids: Box<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Prepare on-disk layout: QR directory and the store with its header.
    pub fn init(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.qr_dir)
            .with_context(|| format!("create qr dir {}", self.qr_dir.display()))?;
        self.store.init()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn public_host(&self) -> &str {
        &self.public_host
    }

    pub fn profile_url(&self, student_id: &str) -> String {
        format!(
            "http://{}:{}/student/{}",
            self.public_host, self.port, student_id
        )
    }

    /// Mint an id, append the row, render the QR code.
    pub fn register(&self, s: NewStudent) -> Result<Registration, AppError> {
        let record = StudentRecord {
            student_id: self.ids.generate(),
            name: s.name,
            grade: s.grade,
            contact: s.contact,
        };
        self.store.append(&record)?;

        let profile_url = self.profile_url(&record.student_id);
        let filename = qr_filename(&record.name, &record.grade, &record.student_id);
        let dest = self.qr_dir.join(&filename);
        qr::render(&profile_url, &dest, &self.qr)?;

        metrics::record_registration();
        info!(
            "registered student {} (grade {}) -> {}",
            record.student_id, record.grade, filename
        );
        Ok(Registration {
            record,
            filename,
            profile_url,
        })
    }

    pub fn view_profile(&self, student_id: &str) -> Result<Option<StudentRecord>, AppError> {
        let found = self.store.find(student_id)?;
        metrics::record_lookup(found.is_some());
        debug!(
            "lookup {}: {}",
            student_id,
            if found.is_some() { "found" } else { "missing" }
        );
        Ok(found)
    }

    /// Path of a generated QR image, if the name is safe and the file exists.
    pub fn qr_path(&self, filename: &str) -> Option<PathBuf> {
        if !is_safe_filename(filename) {
            return None;
        }
        let p = self.qr_dir.join(filename);
        if p.is_file() {
            Some(p)
        } else {
            None
        }
    }

    /// Read a generated QR image.
    pub fn read_qr(&self, filename: &str) -> Result<Option<Vec<u8>>, AppError> {
        let Some(p) = self.qr_path(filename) else {
            return Ok(None);
        };
        let bytes = std::fs::read(&p)
            .with_context(|| format!("read qr {}", p.display()))
            .map_err(AppError::from)?;
        Ok(Some(bytes))
    }

    /// Row count for diagnostics; errors are reported as missing.
    pub fn record_count(&self) -> Option<u64> {
        match self.store.count() {
            Ok(n) => Some(n),
            Err(e) => {
                debug!("count records: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn filename_replaces_spaces_and_separators() {
        assert_eq!(qr_filename("Asha Rao", "5 B", "id"), "Asha_Rao_5_B_id.png");
        assert_eq!(qr_filename("../etc", "x/y", "id"), ".._etc_x_y_id.png");
    }

    #[test]
    fn safe_filename_rules() {
        assert!(is_safe_filename("Asha_5_id.png"));
        assert!(is_safe_filename(".._etc_x_y_id.png"));
        assert!(!is_safe_filename("../students.csv"));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("a/b.png"));
        assert!(!is_safe_filename(""));
    }

    #[test]
    fn form_validation_reports_first_missing_field() {
        let f = RegistrationForm::from_urlencoded(b"name=Asha&contact=a%40b.c").unwrap();
        match f.validate() {
            Err(AppError::MissingField(name)) => assert_eq!(name, "grade"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn form_decodes_plus_and_percent() {
        let f = RegistrationForm::from_urlencoded(
            b"name=Asha+Rao&grade=5&contact=asha%40example.com&extra=1",
        )
        .unwrap();
        let s = f.validate().unwrap();
        assert_eq!(s.name, "Asha Rao");
        assert_eq!(s.contact, "asha@example.com");
    }

    #[test]
    fn empty_value_counts_as_present() {
        let f = RegistrationForm::from_urlencoded(b"name=&grade=5&contact=x").unwrap();
        assert_eq!(f.validate().unwrap().name, "");
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(AppError::MissingField("name").status(), 400);
        assert_eq!(AppError::Internal(anyhow!("boom")).status(), 500);
        assert_eq!(
            AppError::MissingField("grade").to_string(),
            "Missing form field: grade"
        );
    }
}

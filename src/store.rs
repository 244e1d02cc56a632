//! Record store: append-only CSV table of students.
//!
//! Формат:
//!   student_id,name,grade,contact   <- заголовок, всегда первой строкой
//!   <uuid>,<name>,<grade>,<contact> <- по строке на регистрацию
//!
//! - append(): дописывает строку в конец; создаёт файл с заголовком при отсутствии.
//!   Проверки уникальности нет, отката при частичной записи нет.
//! - find(): линейный скан с начала, первое совпадение по student_id.
//!   Отсутствующий файл == "не найдено" (не ошибка). Строки неверной ширины
//!   (обрыв записи) читаются как есть, нечитаемые пропускаются с warn!.
//!   Ошибка открытия файла — ошибка.

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::consts::CSV_HEADER;
use crate::lock::acquire_exclusive_lock;

/// One registered student. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    pub name: String,
    pub grade: String,
    pub contact: String,
}

impl StudentRecord {
    /// Columns by position; missing trailing fields read as "".
    fn from_row(row: &StringRecord) -> Self {
        let field = |i: usize| row.get(i).unwrap_or("").to_string();
        Self {
            student_id: field(0),
            name: field(1),
            grade: field(2),
            contact: field(3),
        }
    }
}

/// Summary for `studentqr status`.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub records: u64,
    pub bytes: u64,
}

#[derive(Clone, Debug)]
pub struct RecordStore {
    path: PathBuf,
    lock_appends: bool,
}

impl RecordStore {
    /// Handle to the table at `path`. No I/O happens here.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock_appends: false,
        }
    }

    pub fn with_lock_appends(mut self, on: bool) -> Self {
        self.lock_appends = on;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create parent directory and the table with its header if absent. Idempotent.
    pub fn init(&self) -> Result<()> {
        self.open_for_append().map(|_| ())
    }

    /// Open in append mode; write the header when the file is new (or empty).
    fn open_for_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store dir {}", parent.display()))?;
            }
        }
        let f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open store {}", self.path.display()))?;
        let len = f
            .metadata()
            .with_context(|| format!("stat store {}", self.path.display()))?
            .len();
        if len > 0 {
            return Ok(f);
        }

        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(f);
        wtr.write_record(CSV_HEADER)
            .with_context(|| format!("write header to {}", self.path.display()))?;
        let f = wtr
            .into_inner()
            .map_err(|e| anyhow!("flush header {}: {}", self.path.display(), e.error()))?;
        debug!("store: created {} with header", self.path.display());
        Ok(f)
    }

    /// Append one row at the end of the table.
    pub fn append(&self, rec: &StudentRecord) -> Result<()> {
        let _guard = if self.lock_appends {
            Some(acquire_exclusive_lock(&self.path)?)
        } else {
            None
        };

        let f = self.open_for_append()?;
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(f);
        wtr.serialize(rec)
            .with_context(|| format!("append row to {}", self.path.display()))?;
        let f = wtr
            .into_inner()
            .map_err(|e| anyhow!("flush row {}: {}", self.path.display(), e.error()))?;
        f.sync_data()
            .with_context(|| format!("sync store {}", self.path.display()))?;
        Ok(())
    }

    /// Reader over the table, or None if the file does not exist.
    /// Rows of any width are accepted: a torn write must not hide later rows.
    fn reader(&self) -> Result<Option<csv::Reader<File>>> {
        match File::open(&self.path) {
            Ok(f) => Ok(Some(
                csv::ReaderBuilder::new()
                    .has_headers(true)
                    .flexible(true)
                    .from_reader(f),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("open store {}", self.path.display()))
            }
        }
    }

    /// Next readable row; unparseable ones are logged and skipped.
    /// I/O errors are returned.
    fn next_row(&self, rdr: &mut csv::Reader<File>, row: &mut StringRecord) -> Result<bool> {
        loop {
            match rdr.read_record(row) {
                Ok(more) => return Ok(more),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                    return Err(e)
                        .with_context(|| format!("read store {}", self.path.display()));
                }
                Err(e) => {
                    warn!("store: skipping unreadable row in {}: {}", self.path.display(), e);
                }
            }
        }
    }

    /// First row whose student_id equals `student_id`, scanning in file order.
    pub fn find(&self, student_id: &str) -> Result<Option<StudentRecord>> {
        let Some(mut rdr) = self.reader()? else {
            debug!(
                "store: {} does not exist yet, treating '{}' as not found",
                self.path.display(),
                student_id
            );
            return Ok(None);
        };
        let mut row = StringRecord::new();
        while self.next_row(&mut rdr, &mut row)? {
            if row.get(0) == Some(student_id) {
                return Ok(Some(StudentRecord::from_row(&row)));
            }
        }
        Ok(None)
    }

    /// All rows in file order. Short rows come back with empty trailing fields.
    pub fn records(&self) -> Result<Vec<StudentRecord>> {
        let Some(mut rdr) = self.reader()? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        let mut row = StringRecord::new();
        while self.next_row(&mut rdr, &mut row)? {
            out.push(StudentRecord::from_row(&row));
        }
        Ok(out)
    }

    /// Number of data rows (header excluded); 0 if the table does not exist.
    pub fn count(&self) -> Result<u64> {
        let Some(mut rdr) = self.reader()? else {
            return Ok(0);
        };
        let mut n = 0u64;
        let mut row = StringRecord::new();
        while self.next_row(&mut rdr, &mut row)? {
            n += 1;
        }
        Ok(n)
    }

    pub fn status(&self) -> Result<StoreStatus> {
        let (exists, bytes) = match std::fs::metadata(&self.path) {
            Ok(m) => (true, m.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => (false, 0),
            Err(e) => {
                return Err(e).with_context(|| format!("stat store {}", self.path.display()))
            }
        };
        Ok(StoreStatus {
            path: self.path.clone(),
            exists,
            records: self.count()?,
            bytes,
        })
    }
}

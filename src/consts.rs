//! Общие константы: формат таблицы, пути по умолчанию, сетевые параметры.

// -------- Record store (CSV) --------
pub const CSV_FILE: &str = "students.csv";
pub const CSV_HEADER: [&str; 4] = ["student_id", "name", "grade", "contact"];
/// Suffix appended to the CSV path for the optional append lock.
pub const LOCK_SUFFIX: &str = ".lock";

// -------- QR artifacts --------
pub const QR_DIR: &str = "static/qrcodes";
/// URL prefix under which QR images are served.
pub const QR_URL_PREFIX: &str = "/static/qrcodes/";
pub const QR_EXT: &str = "png";
pub const QR_BOX_SIZE: u32 = 12;
pub const QR_BORDER: u32 = 4;
/// Upper bound on the rendered image side, in pixels.
pub const QR_MAX_SIDE: u32 = 16384;
/// Version 1 symbol: 21x21 modules.
pub const QR_MIN_MODULES: u32 = 21;

// -------- HTTP --------
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const NOT_FOUND_BODY: &str = "Student not found!";

// -------- Address resolver --------
// Адрес заведомо недостижим: UDP connect() пакетов не шлёт, нужен только выбор маршрута.
pub const ROUTE_TARGET: &str = "10.255.255.255:1";

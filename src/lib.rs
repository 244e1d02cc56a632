#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;
pub mod metrics;

// Хранилище и его примитивы
pub mod lock;
pub mod store;
pub mod ident;

// QR и сеть
pub mod qr;
pub mod net;

// Обработчики, HTML, HTTP, CLI
pub mod app;
pub mod views;
pub mod http;
pub mod cli;

// Удобные реэкспорты
pub use app::{App, AppError, NewStudent, Registration, RegistrationForm};
pub use config::AppConfig;
pub use http::{route, HttpServer, Reply};
pub use ident::{IdSource, RandomIds, SequentialIds};
pub use qr::{EcLevel, QrOptions};
pub use store::{RecordStore, StoreStatus, StudentRecord};

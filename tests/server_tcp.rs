use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};

use StudentQR::{App, AppConfig, HttpServer};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("sqrtest-tcp-{prefix}-{pid}-{t}-{id}"))
}

/// Minimal HTTP/1.0 client: returns (status, body).
fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> Result<(u16, String)> {
    let mut s = TcpStream::connect(addr)?;
    s.set_read_timeout(Some(Duration::from_secs(10)))?;
    let req = format!(
        "{method} {path} HTTP/1.0\r\n\
         Host: {addr}\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    s.write_all(req.as_bytes())?;
    let mut raw = Vec::new();
    s.read_to_end(&mut raw)?;
    let text = String::from_utf8_lossy(&raw).to_string();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| anyhow!("bad status line in {:?}", text))?;
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    Ok((status, body))
}

#[test]
fn register_and_lookup_over_tcp() -> Result<()> {
    let root = unique_root("e2e");
    let cfg = AppConfig::default()
        .with_bind_host("127.0.0.1")
        .with_port(0)
        .with_csv_path(root.join("students.csv"))
        .with_qr_dir(root.join("qrcodes"))
        .with_qr_box_size(1);
    let app = App::new(&cfg, "127.0.0.1".to_string());
    app.init()?;

    let server = HttpServer::bind(&cfg.bind_addr(), app)?;
    let addr = server
        .local_addr()
        .ok_or_else(|| anyhow!("server has no ip address"))?;

    // Сервер обрабатывает ровно 3 запроса и выходит.
    let handle = thread::spawn(move || -> Result<()> {
        for _ in 0..3 {
            server.handle_next()?;
        }
        Ok(())
    });

    let (status, html) = request(
        addr,
        "POST",
        "/",
        "name=Asha&grade=5&contact=asha%40example.com",
    )?;
    assert_eq!(status, 200, "body: {html}");
    let marker = "/student/";
    let start = html.find(marker).expect("profile link") + marker.len();
    let id = html[start..start + 36].to_string();

    let (status, body) = request(addr, "GET", &format!("/student/{id}"), "")?;
    assert_eq!(status, 200);
    assert!(body.contains("asha@example.com"));

    let (status, body) = request(
        addr,
        "GET",
        "/student/00000000-0000-0000-0000-000000000000",
        "",
    )?;
    assert_eq!(status, 404);
    assert_eq!(body, "Student not found!");

    handle
        .join()
        .map_err(|_| anyhow!("server thread panicked"))??;
    Ok(())
}

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;

use crate::app::{App, NewStudent};
use crate::config::AppConfig;
use crate::consts::NOT_FOUND_BODY;
use crate::http::HttpServer;

#[derive(Parser, Debug)]
#[command(
    name = "studentqr",
    version,
    about = "Student registration with QR-linked profile pages",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run the HTTP server (config from SQR_* env, flags override)
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Host to embed in profile URLs instead of the resolved address
        #[arg(long)]
        public_host: Option<String>,
    },
    /// Register a student from the command line (same path as POST /)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        contact: String,
        #[arg(long)]
        json: bool,
    },
    /// Look up a student by id
    Show {
        #[arg(long)]
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Record store summary
    Status {
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    run_with(cli.cmd, AppConfig::from_env())
}

pub fn run_with(cmd: Cmd, cfg: AppConfig) -> Result<()> {
    match cmd {
        Cmd::Serve {
            bind,
            port,
            public_host,
        } => {
            let mut cfg = cfg;
            if let Some(b) = bind {
                cfg = cfg.with_bind_host(b);
            }
            if let Some(p) = port {
                cfg = cfg.with_port(p);
            }
            if public_host.is_some() {
                cfg = cfg.with_public_host(public_host);
            }
            serve(cfg.build())
        }

        Cmd::Register {
            name,
            grade,
            contact,
            json,
        } => {
            let app = App::from_config(&cfg);
            app.init()?;
            let reg = app
                .register(NewStudent {
                    name,
                    grade,
                    contact,
                })
                .map_err(|e| anyhow!("{}", e))?;
            if json {
                let v = json!({
                    "student_id": reg.record.student_id,
                    "filename": reg.filename,
                    "qr_path": cfg.qr_dir.join(&reg.filename),
                    "profile_url": reg.profile_url,
                });
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                println!("REGISTERED {}", reg.record.student_id);
                println!("qr:      {}", cfg.qr_dir.join(&reg.filename).display());
                println!("profile: {}", reg.profile_url);
            }
            Ok(())
        }

        Cmd::Show { id, json } => {
            // Просмотр не резолвит адрес: URL профиля здесь не нужен.
            let app = App::new(&cfg, cfg.public_host.clone().unwrap_or_default());
            let found = app.view_profile(&id).map_err(|e| anyhow!("{}", e))?;
            match (found, json) {
                (Some(rec), true) => println!("{}", serde_json::to_string_pretty(&rec)?),
                (Some(rec), false) => {
                    println!("FOUND '{}'", rec.student_id);
                    println!("name:    {}", rec.name);
                    println!("grade:   {}", rec.grade);
                    println!("contact: {}", rec.contact);
                }
                (None, true) => println!("null"),
                (None, false) => println!("{}", NOT_FOUND_BODY),
            }
            Ok(())
        }

        Cmd::Status { json } => {
            let app = App::new(&cfg, cfg.public_host.clone().unwrap_or_default());
            let st = app.store().status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&st)?);
            } else {
                println!("store:   {}", st.path.display());
                println!("exists:  {}", st.exists);
                println!("records: {}", st.records);
                println!("bytes:   {}", st.bytes);
            }
            Ok(())
        }
    }
}

fn serve(cfg: AppConfig) -> Result<()> {
    info!("{}", cfg);
    let app = App::from_config(&cfg);
    app.init()?;
    info!(
        "profile URLs: http://{}:{}/student/<id>",
        app.public_host(),
        cfg.port
    );
    let server = HttpServer::bind(&cfg.bind_addr(), app)?;
    server.run()
}

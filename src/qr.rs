//! QR code image generator.
//!
//! `render(text, dest, &opts)` кодирует строку в QR-матрицу (минимальная подходящая
//! версия) и пишет PNG поверх существующего файла. Растеризация своя: размер модуля,
//! ширина рамки и цвета задаются опциями, а не фиксированным quiet zone библиотеки.

use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use qrcode::types::Color;
use qrcode::QrCode;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::consts::{QR_BORDER, QR_BOX_SIZE, QR_MAX_SIDE};
use crate::metrics;

/// One of the four standard error-correction levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    fn to_qrcode(self) -> qrcode::EcLevel {
        match self {
            EcLevel::L => qrcode::EcLevel::L,
            EcLevel::M => qrcode::EcLevel::M,
            EcLevel::Q => qrcode::EcLevel::Q,
            EcLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for EcLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(EcLevel::L),
            "M" => Ok(EcLevel::M),
            "Q" => Ok(EcLevel::Q),
            "H" => Ok(EcLevel::H),
            other => Err(anyhow!("unknown error-correction level '{}'", other)),
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        };
        f.write_str(s)
    }
}

/// Rendering options.
#[derive(Debug, Clone)]
pub struct QrOptions {
    pub ec_level: EcLevel,
    /// Pixels per module.
    pub box_size: u32,
    /// Quiet zone width, in modules.
    pub border: u32,
    pub fill: [u8; 3],
    pub background: [u8; 3],
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::H,
            box_size: QR_BOX_SIZE,
            border: QR_BORDER,
            fill: [0, 0, 0],
            background: [255, 255, 255],
        }
    }
}

/// Parse "black" / "white" / "#rrggbb" (also without '#').
pub fn parse_color(s: &str) -> Option<[u8; 3]> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "black" => return Some([0, 0, 0]),
        "white" => return Some([255, 255, 255]),
        _ => {}
    }
    let hex = s.strip_prefix('#').unwrap_or(&s);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let mut out = [0u8; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// Image side for a `modules`-wide symbol, or None on overflow or above QR_MAX_SIDE.
pub fn side_px(modules: u32, box_size: u32, border: u32) -> Option<u32> {
    let side = border
        .checked_mul(2)?
        .checked_add(modules)?
        .checked_mul(box_size)?;
    (side <= QR_MAX_SIDE).then_some(side)
}

/// Encode `text` and rasterize it into an RGB image.
pub fn encode(text: &str, opts: &QrOptions) -> Result<RgbImage> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), opts.ec_level.to_qrcode())
        .map_err(|e| anyhow!("qr encode ({} B, ec {}): {}", text.len(), opts.ec_level, e))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let box_size = opts.box_size.max(1);
    let side = side_px(modules, box_size, opts.border).ok_or_else(|| {
        anyhow!(
            "qr image too large: {} modules, box {} px, border {} (max side {} px)",
            modules,
            box_size,
            opts.border,
            QR_MAX_SIDE
        )
    })?;

    let img: RgbImage = ImageBuffer::from_fn(side, side, |x, y| {
        let mx = x / box_size;
        let my = y / box_size;
        let dark = mx >= opts.border
            && my >= opts.border
            && mx < opts.border + modules
            && my < opts.border + modules
            && colors[((my - opts.border) * modules + (mx - opts.border)) as usize] == Color::Dark;
        if dark {
            Rgb(opts.fill)
        } else {
            Rgb(opts.background)
        }
    });
    Ok(img)
}

/// Encode `text` and write a PNG at `dest` (overwrites).
pub fn render(text: &str, dest: &Path, opts: &QrOptions) -> Result<()> {
    let img = encode(text, opts)?;
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create qr dir {}", parent.display()))?;
        }
    }
    img.save_with_format(dest, ImageFormat::Png)
        .with_context(|| format!("write qr png {}", dest.display()))?;
    metrics::record_qr_render();
    log::debug!(
        "qr: wrote {} ({}x{} px) for {} B payload",
        dest.display(),
        img.width(),
        img.height(),
        text.len()
    );
    Ok(())
}

//! File boundary: decoding targets, loading run configs, and writing results
//! as SVG, PNG or a resumable JSON snapshot.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use log::info;

use crate::engine::{Canvas, Model, RunConfig, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("i/o error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported output format for {0} (expected .png, .svg or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("image {path} has no pixels")]
    EmptyImage { path: PathBuf },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io { path: path.to_path_buf(), source }
}

// ---------- Input ----------

/// Decode `path` to RGBA8. Images wider or taller than `max_size` are
/// downscaled to fit, keeping the aspect ratio; smaller ones are left alone.
pub fn load_target(path: &Path, max_size: u32) -> Result<Canvas, ExportError> {
    let mut img = image::open(path)?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(ExportError::EmptyImage { path: path.to_path_buf() });
    }
    if max_size > 0 && (w > max_size || h > max_size) {
        img = img.thumbnail(max_size, max_size);
        let (tw, th) = img.dimensions();
        info!("resized {}x{} -> {}x{}", w, h, tw, th);
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    Canvas::from_rgba(w as usize, h as usize, rgba.into_raw())
        .ok_or_else(|| ExportError::EmptyImage { path: path.to_path_buf() })
}

pub fn load_run_config(path: &Path) -> Result<RunConfig, ExportError> {
    let text = fs::read_to_string(path).map_err(io_err(path))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, ExportError> {
    let text = fs::read_to_string(path).map_err(io_err(path))?;
    Ok(serde_json::from_str(&text)?)
}

// ---------- Output ----------

/// SVG at twice the canvas size, shifted half a pixel so vertices land on
/// pixel centres.
pub fn to_svg(model: &Model) -> String {
    let (w, h) = (2 * model.width(), 2 * model.height());
    let bg = model.background();
    let mut out = String::new();
    let _ = writeln!(out, r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{w}" height="{h}">"#);
    let _ = writeln!(
        out,
        r##"<rect x="0" y="0" width="{w}" height="{h}" fill="#{:02x}{:02x}{:02x}" />"##,
        bg.r, bg.g, bg.b
    );
    let _ = writeln!(out, r#"<g transform="scale({:.6}) translate(0.5 0.5)">"#, 2.0);
    for polygon in model.polygons() {
        let c = polygon.color();
        let points: Vec<String> = polygon.vertices().iter().map(|v| format!("{},{}", v.x, v.y)).collect();
        let _ = writeln!(
            out,
            r##"<polygon fill="#{:02x}{:02x}{:02x}" fill-opacity="{:.6}" points="{}"/>"##,
            c.r,
            c.g,
            c.b,
            c.a as f64 / 255.0,
            points.join(" ")
        );
    }
    out.push_str("</g>\n</svg>\n");
    out
}

pub fn save_svg(path: &Path, model: &Model) -> Result<(), ExportError> {
    fs::write(path, to_svg(model)).map_err(io_err(path))
}

/// PNG of the composited canvas at native size.
pub fn save_png(path: &Path, model: &Model) -> Result<(), ExportError> {
    let canvas = model.render();
    image::save_buffer_with_format(
        path,
        canvas.pixels(),
        canvas.width() as u32,
        canvas.height() as u32,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )?;
    Ok(())
}

pub fn save_snapshot(path: &Path, model: &Model) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(&model.snapshot())?;
    fs::write(path, json).map_err(io_err(path))
}

/// Write `model` in the format named by the file extension.
pub fn save(path: &Path, model: &Model) -> Result<(), ExportError> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("svg") => save_svg(path, model),
        Some("png") => save_png(path, model),
        Some("json") => save_snapshot(path, model),
        _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
    }?;
    info!("wrote {}", path.display());
    Ok(())
}

//! Summary image rendering.
//!
//! Draws a fixed 600x400 PNG with the record total, the refresh timestamp
//! and the top five countries by estimated GDP, then writes it to the
//! cache path. Rendering is best-effort: the caller logs failures and the
//! refresh result is unaffected.

use crate::error::RenderError;
use crate::models::{Country, CountryStats};
use ab_glyph::{FontRef, PxScale};
use chrono::{DateTime, Utc};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::fs;
use std::path::Path;

pub const SUMMARY_WIDTH: u32 = 600;
pub const SUMMARY_HEIGHT: u32 = 400;

// Dark slate background, white text.
const BACKGROUND: Rgb<u8> = Rgb([0x1e, 0x29, 0x3b]);
const FOREGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Render the summary for one refresh pass and write it to `path`,
/// replacing any previous image. The write goes through a sibling temp
/// file and a rename so readers never see a torn file.
pub fn render_summary(
    stats: &CountryStats,
    top: &[Country],
    generated_at: DateTime<Utc>,
    path: &Path,
) -> Result<(), RenderError> {
    let font = FontRef::try_from_slice(FONT_BYTES).map_err(|_| RenderError::InvalidFont)?;
    let scale = PxScale::from(16.0);

    let mut canvas = RgbImage::from_pixel(SUMMARY_WIDTH, SUMMARY_HEIGHT, BACKGROUND);

    let line = |canvas: &mut RgbImage, y: i32, text: &str| {
        draw_text_mut(canvas, FOREGROUND, 20, y, scale, &font, text);
    };

    line(
        &mut canvas,
        20,
        &format!("Total Countries: {}", stats.total),
    );
    line(
        &mut canvas,
        50,
        &format!("Last Refresh: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
    );
    line(&mut canvas, 80, "Top 5 by Estimated GDP:");

    let mut y = 100;
    for country in top.iter().take(5) {
        let gdp_text = country
            .estimated_gdp
            .map_or_else(|| "N/A".to_string(), |gdp| format!("{gdp:.2}"));
        line(&mut canvas, y, &format!("{}: {}", country.name, gdp_text));
        y += 25;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("png.tmp");
    canvas.save_with_format(&tmp, image::ImageFormat::Png)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

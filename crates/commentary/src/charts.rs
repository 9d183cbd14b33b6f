//! Match chart rendering.
//!
//! Charts are plain bar plots on a dark background with no text, sized for
//! a picture-in-picture overlay.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use pitchcast_match_model::{Ball, ChartPaths, MatchData};

pub const RUN_RATE: &str = "run_rate";
pub const MANHATTAN: &str = "manhattan";
pub const PARTNERSHIP: &str = "partnership";

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 600;
const MARGIN: u32 = 60;

const BACKGROUND: Rgb<u8> = Rgb([28, 28, 28]);
const PLOT: Rgb<u8> = Rgb([44, 44, 44]);
const AXIS: Rgb<u8> = Rgb([200, 200, 200]);
const PRIMARY: Rgb<u8> = Rgb([0, 168, 232]);
const SECONDARY: Rgb<u8> = Rgb([244, 208, 63]);
const ACCENT: Rgb<u8> = Rgb([231, 76, 60]);
const SUCCESS: Rgb<u8> = Rgb([46, 204, 113]);

/// Errors that can occur while rendering charts.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Draws the run's chart images into one output directory.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    /// Create a renderer, creating `output_dir` if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ChartError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|e| ChartError::Io {
            path: output_dir.clone(),
            source: e,
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render every chart the match data supports.
    ///
    /// The partnership chart is skipped when there is no partnership.
    pub fn render_all(&self, data: &MatchData) -> Result<ChartPaths, ChartError> {
        let mut charts = ChartPaths::new();

        charts.insert(RUN_RATE, self.save(RUN_RATE, &run_rate_chart(data))?);
        charts.insert(MANHATTAN, self.save(MANHATTAN, &manhattan_chart(data))?);
        if let Some(img) = partnership_chart(data) {
            charts.insert(PARTNERSHIP, self.save(PARTNERSHIP, &img)?);
        }

        tracing::info!(count = charts.len(), dir = %self.output_dir.display(), "Charts rendered");
        Ok(charts)
    }

    fn save(&self, name: &str, img: &RgbImage) -> Result<PathBuf, ChartError> {
        let path = self.output_dir.join(format!("{name}.png"));
        img.save(&path).map_err(|e| ChartError::Encode {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(chart = name, path = %path.display(), "Chart written");
        Ok(path)
    }
}

/// Cumulative run rate per over, with the required rate as a horizontal line.
pub fn run_rate_chart(data: &MatchData) -> RgbImage {
    let rates = data.cumulative_run_rates();
    let values: Vec<f64> = rates.iter().map(|(_, r)| *r).collect();
    let max = values
        .iter()
        .copied()
        .fold(data.run_rate.required, f64::max);

    let mut img = canvas();
    draw_bars(&mut img, &values, max, |i| {
        if values[i] >= data.run_rate.required {
            SUCCESS
        } else {
            PRIMARY
        }
    });
    draw_reference_line(&mut img, data.run_rate.required, max, ACCENT);
    img
}

/// Runs per over; wicket overs carry a marker above the bar.
pub fn manhattan_chart(data: &MatchData) -> RgbImage {
    let values: Vec<f64> = data.recent_overs.iter().map(|o| o.runs as f64).collect();
    let max = values.iter().copied().fold(0.0, f64::max);

    let mut img = canvas();
    let tops = draw_bars(&mut img, &values, max, |i| over_color(values[i]));

    for (over, (cx, top)) in data.recent_overs.iter().zip(tops) {
        let took_wicket =
            over.wickets > 0 || over.balls.iter().any(|b| matches!(b, Ball::Wicket(_)));
        if took_wicket {
            draw_filled_circle_mut(&mut img, (cx, top - 18), 10, ACCENT);
        }
    }

    if !values.is_empty() {
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        draw_reference_line(&mut img, avg, max, PRIMARY);
    }
    img
}

/// Runs per partnership, or `None` when there are no partnerships.
pub fn partnership_chart(data: &MatchData) -> Option<RgbImage> {
    if data.partnerships.is_empty() {
        return None;
    }
    let values: Vec<f64> = data.partnerships.iter().map(|p| p.runs as f64).collect();
    let max = values.iter().copied().fold(0.0, f64::max);

    let mut img = canvas();
    draw_bars(&mut img, &values, max, |_| PRIMARY);
    Some(img)
}

fn over_color(runs: f64) -> Rgb<u8> {
    if runs >= 10.0 {
        SUCCESS
    } else if runs >= 7.0 {
        SECONDARY
    } else {
        ACCENT
    }
}

fn canvas() -> RgbImage {
    let mut img = ImageBuffer::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    draw_filled_rect_mut(
        &mut img,
        Rect::at(MARGIN as i32, MARGIN as i32).of_size(WIDTH - 2 * MARGIN, HEIGHT - 2 * MARGIN),
        PLOT,
    );

    let left = MARGIN as f32;
    let bottom = (HEIGHT - MARGIN) as f32;
    draw_line_segment_mut(&mut img, (left, bottom), ((WIDTH - MARGIN) as f32, bottom), AXIS);
    draw_line_segment_mut(&mut img, (left, MARGIN as f32), (left, bottom), AXIS);
    img
}

/// Height in pixels for `value` on a plot scaled to `max`.
fn bar_height(value: f64, max: f64) -> u32 {
    let plot_height = (HEIGHT - 2 * MARGIN) as f64;
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    // Leave headroom for markers above the tallest bar.
    ((value / max) * plot_height * 0.85).round() as u32
}

/// Draw evenly spaced bars; returns `(center_x, top_y)` for each bar.
fn draw_bars(
    img: &mut RgbImage,
    values: &[f64],
    max: f64,
    color: impl Fn(usize) -> Rgb<u8>,
) -> Vec<(i32, i32)> {
    if values.is_empty() {
        return Vec::new();
    }

    let plot_width = WIDTH - 2 * MARGIN;
    let slot = plot_width / values.len() as u32;
    let bar_width = (slot * 3 / 5).max(1);
    let bottom = (HEIGHT - MARGIN) as i32;

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = MARGIN + slot * i as u32 + (slot - bar_width) / 2;
            let height = bar_height(*value, max);
            let top = bottom - height as i32;
            if height > 0 {
                draw_filled_rect_mut(
                    img,
                    Rect::at(x as i32, top).of_size(bar_width, height),
                    color(i),
                );
            }
            ((x + bar_width / 2) as i32, top)
        })
        .collect()
}

fn draw_reference_line(img: &mut RgbImage, value: f64, max: f64, color: Rgb<u8>) {
    let y = ((HEIGHT - MARGIN) - bar_height(value, max)) as f32;
    draw_line_segment_mut(img, (MARGIN as f32, y), ((WIDTH - MARGIN) as f32, y), color);
    draw_line_segment_mut(
        img,
        (MARGIN as f32, y - 1.0),
        ((WIDTH - MARGIN) as f32, y - 1.0),
        color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_writes_pngs() {
        let dir = std::env::temp_dir().join("pitchcast_test_charts");
        let _ = std::fs::remove_dir_all(&dir);

        let renderer = ChartRenderer::new(&dir).unwrap();
        let charts = renderer.render_all(&MatchData::sample()).unwrap();

        assert_eq!(charts.len(), 3);
        for name in [RUN_RATE, MANHATTAN, PARTNERSHIP] {
            let path = charts.get(name).unwrap();
            assert!(path.exists(), "{name} missing");
            let img = image::open(path).unwrap();
            assert_eq!(img.width(), WIDTH);
            assert_eq!(img.height(), HEIGHT);
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partnership_skipped_without_data() {
        let mut data = MatchData::sample();
        data.partnerships.clear();
        assert!(partnership_chart(&data).is_none());
    }

    #[test]
    fn test_manhattan_colors_by_runs() {
        let img = manhattan_chart(&MatchData::sample());
        let bottom = HEIGHT - MARGIN - 2;
        let slot = (WIDTH - 2 * MARGIN) / 3;
        let center = |i: u32| MARGIN + slot * i + slot / 2;

        // Overs score 14, 9 and 12.
        assert_eq!(*img.get_pixel(center(0), bottom), SUCCESS);
        assert_eq!(*img.get_pixel(center(1), bottom), SECONDARY);
        assert_eq!(*img.get_pixel(center(2), bottom), SUCCESS);
    }

    #[test]
    fn test_bar_height_scales_and_clamps() {
        assert_eq!(bar_height(0.0, 10.0), 0);
        assert_eq!(bar_height(5.0, 0.0), 0);
        assert!(bar_height(10.0, 10.0) > bar_height(5.0, 10.0));
        assert!(bar_height(10.0, 10.0) < HEIGHT - 2 * MARGIN);
    }

    #[test]
    fn test_empty_overs_draws_blank_plot() {
        let mut data = MatchData::sample();
        data.recent_overs.clear();
        let img = manhattan_chart(&data);
        assert_eq!(*img.get_pixel(WIDTH / 2, HEIGHT / 2), PLOT);
    }
}

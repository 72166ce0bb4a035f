//! Chart rendering
//!
//! Rasterizes labelled values as bar, line or pie PNG images: filled
//! shapes on a white canvas. The request's `title`, `x_label` and `y_label`
//! are kept on the returned [`Graph`](crate::research::state::Graph) record
//! but are not drawn into the image.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const MARGIN: u32 = 60;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const BAR: Rgb<u8> = Rgb([135, 206, 235]);
const LINE: Rgb<u8> = Rgb([0, 128, 0]);

const PIE_PALETTE: [Rgb<u8>; 8] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
];

/// A labelled value to plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub name: String,
    pub value: f64,
}

impl DataPoint {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Supported chart shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "pie" => Ok(ChartKind::Pie),
            _ => Err(ChartError::UnsupportedKind(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Unsupported chart_type '{0}'. Choose 'bar', 'line', or 'pie'.")]
    UnsupportedKind(String),

    #[error("No data points to plot")]
    EmptyData,

    #[error("Failed to create chart directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode chart image: {0}")]
    Image(#[from] image::ImageError),
}

/// Everything needed to draw one chart
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub title: String,
    /// Raw kind as requested; validated at render time
    pub kind: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<DataPoint>,
    pub file_name: String,
}

/// Turns a chart request into an image file
pub trait ChartRenderer: Send + Sync {
    /// Render the chart and return the written file's path
    fn render(&self, request: &ChartRequest) -> Result<PathBuf, ChartError>;
}

/// PNG renderer writing into a fixed output directory
#[derive(Debug, Clone)]
pub struct ImageChartRenderer {
    output_dir: PathBuf,
}

impl ImageChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ChartRenderer for ImageChartRenderer {
    fn render(&self, request: &ChartRequest) -> Result<PathBuf, ChartError> {
        let kind: ChartKind = request.kind.parse()?;
        if request.points.is_empty() {
            return Err(ChartError::EmptyData);
        }

        let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
        match kind {
            ChartKind::Bar => draw_bars(&mut canvas, &request.points),
            ChartKind::Line => draw_line(&mut canvas, &request.points),
            ChartKind::Pie => draw_pie(&mut canvas, &request.points)?,
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(&request.file_name);
        canvas.save(&path)?;

        info!(kind = %kind, points = request.points.len(), path = %path.display(), "Chart rendered");
        Ok(path)
    }
}

fn plot_height() -> u32 {
    HEIGHT - 2 * MARGIN
}

fn max_value(points: &[DataPoint]) -> f64 {
    let max = points
        .iter()
        .map(|p| p.value)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max
    } else {
        1.0
    }
}

/// Pixel row for a value, with zero at the baseline
fn value_to_y(value: f64, max: f64) -> u32 {
    let clamped = if value.is_finite() { value.clamp(0.0, max) } else { 0.0 };
    let offset = (clamped / max * plot_height() as f64).round() as u32;
    HEIGHT - MARGIN - offset
}

fn draw_axes(canvas: &mut RgbImage) {
    let baseline = HEIGHT - MARGIN;
    fill_rect(canvas, MARGIN, baseline, WIDTH - MARGIN, baseline + 2, AXIS);
    fill_rect(canvas, MARGIN - 2, MARGIN, MARGIN, baseline + 2, AXIS);
}

fn draw_bars(canvas: &mut RgbImage, points: &[DataPoint]) {
    draw_axes(canvas);
    let max = max_value(points);
    let slot = (WIDTH - 2 * MARGIN) / points.len() as u32;
    let gap = (slot / 5).max(1);

    for (i, point) in points.iter().enumerate() {
        let x0 = MARGIN + i as u32 * slot + gap;
        let x1 = MARGIN + (i as u32 + 1) * slot - gap;
        let top = value_to_y(point.value, max);
        fill_rect(canvas, x0, top, x1.max(x0 + 1), HEIGHT - MARGIN, BAR);
    }
    debug!(bars = points.len(), "Drew bar chart");
}

fn draw_line(canvas: &mut RgbImage, points: &[DataPoint]) {
    draw_axes(canvas);
    let max = max_value(points);
    let span = WIDTH - 2 * MARGIN;
    let step = if points.len() > 1 {
        span as f64 / (points.len() - 1) as f64
    } else {
        0.0
    };

    let coords: Vec<(i64, i64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = MARGIN as f64 + i as f64 * step;
            (x.round() as i64, value_to_y(p.value, max) as i64)
        })
        .collect();

    for pair in coords.windows(2) {
        draw_segment(canvas, pair[0], pair[1], LINE);
    }
    for &(x, y) in &coords {
        fill_rect(
            canvas,
            (x - 4).max(0) as u32,
            (y - 4).max(0) as u32,
            (x + 5) as u32,
            (y + 5) as u32,
            LINE,
        );
    }
    debug!(points = points.len(), "Drew line chart");
}

fn draw_pie(canvas: &mut RgbImage, points: &[DataPoint]) -> Result<(), ChartError> {
    let values: Vec<f64> = points
        .iter()
        .map(|p| if p.value.is_finite() { p.value.max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(ChartError::EmptyData);
    }

    // Cumulative slice boundaries as fractions of a full turn
    let mut bounds = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for v in &values {
        acc += v / total;
        bounds.push(acc);
    }

    let cx = WIDTH as f64 / 2.0;
    let cy = HEIGHT as f64 / 2.0;
    let radius = (HEIGHT - 2 * MARGIN) as f64 / 2.0;
    let tau = std::f64::consts::TAU;

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        if dx * dx + dy * dy > radius * radius {
            continue;
        }
        let fraction = (dy.atan2(dx) + tau) % tau / tau;
        let slice = bounds
            .iter()
            .position(|b| fraction <= *b)
            .unwrap_or(values.len() - 1);
        *pixel = PIE_PALETTE[slice % PIE_PALETTE.len()];
    }
    debug!(slices = values.len(), "Drew pie chart");
    Ok(())
}

/// Fill the half-open rectangle [x0, x1) x [y0, y1), clipped to the canvas
fn fill_rect(canvas: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let (w, h) = canvas.dimensions();
    for y in y0.min(h)..y1.min(h) {
        for x in x0.min(w)..x1.min(w) {
            canvas.put_pixel(x, y, color);
        }
    }
}

/// Bresenham line, three pixels thick
fn draw_segment(canvas: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (w, h) = canvas.dimensions();
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        for oy in -1..=1 {
            let py = y + oy;
            if x >= 0 && py >= 0 && (x as u32) < w && (py as u32) < h {
                canvas.put_pixel(x as u32, py as u32, color);
            }
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

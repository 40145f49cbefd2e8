//! Bilinear resampling and the high/low detail pair.

use crate::{ElevationError, Grid};
use geometa::Config;
use log::debug;

/// Returns the length of an axis of `len` samples scaled by `scale`.
///
/// Rounds half to even, never below one sample.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn output_len(len: usize, scale: f64) -> usize {
    ((len as f64 * scale).round_ties_even() as usize).max(1)
}

/// Source taps for one output index along an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Taps {
    lo: usize,
    hi: usize,
    /// Weight of `hi`.
    t: f64,
}

/// Maps each of `out_len` output indices onto `in_len` input samples.
///
/// First and last samples of both axes coincide, so the output spans
/// exactly the same extent as the input.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn taps(in_len: usize, out_len: usize) -> Vec<Taps> {
    let last = (in_len - 1) as f64;
    let step = if out_len > 1 {
        last / (out_len - 1) as f64
    } else {
        0.0
    };
    (0..out_len)
        .map(|i| {
            let src = (i as f64 * step).clamp(0.0, last);
            let lo = src.floor() as usize;
            let hi = (lo + 1).min(in_len - 1);
            Taps {
                lo,
                hi,
                t: src - lo as f64,
            }
        })
        .collect()
}

/// Resamples `grid` by `scale` on both axes with order-1 (bilinear)
/// interpolation.
///
/// Output values are convex combinations of input samples, so they
/// never leave the input's value range. A [`Grid`] always holds at
/// least one sample, so every axis has a tap to read from.
pub fn zoom(grid: &Grid, scale: f64) -> Grid {
    let height = output_len(grid.height(), scale);
    let width = output_len(grid.width(), scale);
    let rows = taps(grid.height(), height);
    let cols = taps(grid.width(), width);

    let mut samples = Vec::with_capacity(height * width);
    for r in &rows {
        for c in &cols {
            let top = lerp(grid.get(r.lo, c.lo), grid.get(r.lo, c.hi), c.t);
            let bottom = lerp(grid.get(r.hi, c.lo), grid.get(r.hi, c.hi), c.t);
            #[allow(clippy::cast_possible_truncation)]
            samples.push(((1.0 - r.t) * top + r.t * bottom) as f32);
        }
    }
    debug!(
        "resampled {}x{} -> {height}x{width}",
        grid.height(),
        grid.width()
    );
    Grid::from_samples(height, width, samples)
        .expect("sample count matches output dimensions by construction")
}

fn lerp(a: f32, b: f32, t: f64) -> f64 {
    (1.0 - t) * f64::from(a) + t * f64::from(b)
}

/// Returns the uniform scale keeping both axes within `max_high_res`.
#[allow(clippy::cast_precision_loss)]
pub fn high_scale(height: usize, width: usize, max_high_res: usize) -> f64 {
    let cap = max_high_res as f64;
    1.0_f64.min(cap / height as f64).min(cap / width as f64)
}

/// The two detail levels of one elevation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrids {
    pub high: Grid,
    pub low: Grid,

    /// Lowest sample of the dense source grid.
    pub min_elev: f32,

    /// Highest sample of the dense source grid.
    pub max_elev: f32,
}

impl ElevationGrids {
    /// Derives both levels from a dense, NaN-free grid.
    ///
    /// The low level is resampled from `dense` directly rather than
    /// from the high level.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(dense: &Grid, config: &Config) -> Result<Self, ElevationError> {
        config.validate()?;
        let (min_elev, max_elev) = dense.min_max().ok_or(ElevationError::NoData)?;

        let scale = high_scale(dense.height(), dense.width(), config.max_high_res);
        let high = if scale < 1.0 {
            zoom(dense, scale)
        } else {
            dense.clone()
        };
        let low = zoom(dense, scale / config.low_factor as f64);

        Ok(Self {
            high,
            low,
            min_elev,
            max_elev,
        })
    }
}

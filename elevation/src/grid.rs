use crate::ElevationError;
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    mem::size_of,
    path::Path,
};

/// A dense, row-major `height × width` grid of elevation samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    height: usize,
    width: usize,
    samples: Vec<f32>,
}

impl Grid {
    /// Returns a grid of zeros. Both dimensions must be non-zero.
    pub(crate) fn zeroed(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            samples: vec![0.0; height * width],
        }
    }

    /// Wraps row-major `samples`.
    ///
    /// Empty grids are rejected; every grid has at least one sample.
    pub fn from_samples(
        height: usize,
        width: usize,
        samples: Vec<f32>,
    ) -> Result<Self, ElevationError> {
        if height == 0 || width == 0 {
            return Err(ElevationError::Shape(format!(
                "empty {height}x{width} grid"
            )));
        }
        if samples.len() != height * width {
            return Err(ElevationError::Shape(format!(
                "{} samples for a {height}x{width} grid",
                samples.len()
            )));
        }
        Ok(Self {
            height,
            width,
            samples,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.samples[row * self.width + col]
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut f32 {
        &mut self.samples[row * self.width + col]
    }

    pub fn nan_count(&self) -> usize {
        self.samples.iter().filter(|v| v.is_nan()).count()
    }

    /// Replaces every NaN with the mean of all other samples and
    /// returns how many were replaced.
    ///
    /// The fill value is a single global mean. That is fine for a
    /// handful of holes but flattens terrain where data is missing in
    /// bulk.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn fill_nan_with_mean(&mut self) -> Result<usize, ElevationError> {
        let (sum, n) = self
            .samples
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0_f64, 0_usize), |(sum, n), &v| (sum + f64::from(v), n + 1));
        let missing = self.samples.len() - n;
        if missing == 0 {
            return Ok(0);
        }
        if n == 0 {
            return Err(ElevationError::NoData);
        }
        let mean = (sum / n as f64) as f32;
        debug!("filling {missing} NaN samples with {mean}");
        for v in self.samples.iter_mut().filter(|v| v.is_nan()) {
            *v = mean;
        }
        Ok(missing)
    }

    /// Returns (lowest, highest) sample, ignoring NaN.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.samples
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Writes samples as headerless little-endian `f32`, row-major.
    pub fn write_raw<P: AsRef<Path>>(&self, path: P) -> Result<(), ElevationError> {
        let mut wtr = BufWriter::new(File::create(path.as_ref())?);
        for &sample in &self.samples {
            wtr.write_f32::<LE>(sample)?;
        }
        wtr.flush()?;
        debug!(
            "wrote {}x{} grid to {:?}",
            self.height,
            self.width,
            path.as_ref()
        );
        Ok(())
    }

    /// Reads a grid written by [`Grid::write_raw`].
    ///
    /// The file carries no header, so the caller supplies the
    /// dimensions; a file whose length disagrees is rejected.
    pub fn read_raw<P: AsRef<Path>>(
        path: P,
        height: usize,
        width: usize,
    ) -> Result<Self, ElevationError> {
        let path = path.as_ref();
        let expected = (height * width * size_of::<f32>()) as u64;
        let actual = path.metadata()?.len();
        if actual != expected {
            return Err(ElevationError::GridLen {
                path: path.to_owned(),
                expected,
                actual,
            });
        }
        let mut rdr = BufReader::new(File::open(path)?);
        let mut samples = Vec::with_capacity(height * width);
        for _ in 0..(height * width) {
            samples.push(rdr.read_f32::<LE>()?);
        }
        Self::from_samples(height, width, samples)
    }
}

//! Sparse elevation matrices.

use crate::{npy::NpyArray, ElevationError, Grid};
use log::debug;
use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};
use zip::{result::ZipError, ZipArchive};

/// One explicitly stored sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triplet {
    pub row: usize,
    pub col: usize,
    pub value: f32,
}

/// A `height × width` matrix whose unlisted entries are zero.
///
/// Zero is a property of the storage, not a "no data" marker: sources
/// that need missing-value semantics must store NaN explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    /// Number of (rows, columns).
    shape: (usize, usize),

    entries: Vec<Triplet>,
}

impl SparseMatrix {
    /// Returns a matrix of `shape` (rows, columns) holding `entries`.
    pub fn new(shape: (usize, usize), entries: Vec<Triplet>) -> Result<Self, ElevationError> {
        let (height, width) = shape;
        if height == 0 || width == 0 {
            return Err(ElevationError::Shape(format!(
                "empty shape {height}x{width}"
            )));
        }
        if let Some(t) = entries
            .iter()
            .find(|t| t.row >= height || t.col >= width)
        {
            return Err(ElevationError::Shape(format!(
                "entry ({}, {}) outside {height}x{width}",
                t.row, t.col
            )));
        }
        Ok(Self { shape, entries })
    }

    /// Reads an archive written by `scipy.sparse.save_npz`.
    ///
    /// CSR, CSC, COO, BSR and DIA layouts are understood.
    pub fn load_npz<P: AsRef<Path>>(path: P) -> Result<Self, ElevationError> {
        debug!("loading {:?}", path.as_ref());
        let file = BufReader::new(File::open(path)?);
        Self::from_npz(file)
    }

    pub fn from_npz<R: Read + Seek>(rdr: R) -> Result<Self, ElevationError> {
        let mut archive = ZipArchive::new(rdr)?;
        let format = member(&mut archive, "format")?.to_text()?;
        let shape = match member(&mut archive, "shape")?.to_indices()?[..] {
            [height, width] => (height, width),
            ref other => {
                return Err(ElevationError::Shape(format!(
                    "expected 2 dimensions, got {}",
                    other.len()
                )))
            }
        };
        let data = member(&mut archive, "data")?;

        let entries = match format.as_str() {
            "csr" | "csc" => {
                let [_] = dims::<1>(&data, "data")?;
                let data = data.to_f32()?;
                let indices = member(&mut archive, "indices")?.to_indices()?;
                let indptr = member(&mut archive, "indptr")?.to_indices()?;
                if format == "csr" {
                    compressed(&indptr, &indices, &data, shape.0)?
                        .into_iter()
                        .map(|(row, col, value)| Triplet { row, col, value })
                        .collect()
                } else {
                    compressed(&indptr, &indices, &data, shape.1)?
                        .into_iter()
                        .map(|(col, row, value)| Triplet { row, col, value })
                        .collect()
                }
            }
            "coo" => {
                let [_] = dims::<1>(&data, "data")?;
                let data = data.to_f32()?;
                let rows = member(&mut archive, "row")?.to_indices()?;
                let cols = member(&mut archive, "col")?.to_indices()?;
                if rows.len() != data.len() || cols.len() != data.len() {
                    return Err(ElevationError::Shape(format!(
                        "coo arrays disagree: {} rows, {} cols, {} values",
                        rows.len(),
                        cols.len(),
                        data.len()
                    )));
                }
                rows.into_iter()
                    .zip(cols)
                    .zip(data)
                    .map(|((row, col), value)| Triplet { row, col, value })
                    .collect()
            }
            "bsr" => {
                let block = dims::<3>(&data, "data")?;
                let data = data.to_f32()?;
                let indices = member(&mut archive, "indices")?.to_indices()?;
                let indptr = member(&mut archive, "indptr")?.to_indices()?;
                blocks(&indptr, &indices, &data, block, shape)?
            }
            "dia" => {
                let [diagonals, stored] = dims::<2>(&data, "data")?;
                let data = data.to_f32()?;
                let offsets = member(&mut archive, "offsets")?.to_offsets()?;
                if offsets.len() != diagonals {
                    return Err(ElevationError::Shape(format!(
                        "{} offsets for {diagonals} diagonals",
                        offsets.len()
                    )));
                }
                diagonal(&offsets, &data, stored, shape)
            }
            other => return Err(ElevationError::SparseFormat(other.to_string())),
        };

        Self::new(shape, entries)
    }

    /// Returns (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Returns the number of explicitly stored entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Returns the dense equivalent of this matrix.
    ///
    /// Unlisted cells are zero and duplicate entries accumulate, as
    /// scipy's `toarray` does.
    pub fn densify(&self) -> Grid {
        let (height, width) = self.shape;
        let mut grid = Grid::zeroed(height, width);
        for &Triplet { row, col, value } in &self.entries {
            *grid.get_mut(row, col) += value;
        }
        grid
    }
}

/// Reads `{name}.npy` out of an npz archive.
fn member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<NpyArray, ElevationError> {
    let entry = match archive.by_name(&format!("{name}.npy")) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ElevationError::MissingArray(name.to_string())),
        Err(e) => return Err(e.into()),
    };
    NpyArray::read(entry)
}

/// Returns the dimensions of `array`, which must have exactly `N`.
fn dims<const N: usize>(array: &NpyArray, name: &str) -> Result<[usize; N], ElevationError> {
    <[usize; N]>::try_from(array.shape()).map_err(|_| {
        ElevationError::Shape(format!(
            "{name} array has shape {:?}, expected {N} dimensions",
            array.shape()
        ))
    })
}

/// Expands block sparse row arrays into triplets.
///
/// `[count, block_rows, block_cols]` is the shape of `data`.
fn blocks(
    indptr: &[usize],
    indices: &[usize],
    data: &[f32],
    [count, block_rows, block_cols]: [usize; 3],
    (height, width): (usize, usize),
) -> Result<Vec<Triplet>, ElevationError> {
    if block_rows == 0
        || block_cols == 0
        || height % block_rows != 0
        || width % block_cols != 0
    {
        return Err(ElevationError::Shape(format!(
            "{block_rows}x{block_cols} blocks do not tile {height}x{width}"
        )));
    }
    let block_len = block_rows * block_cols;
    let ids: Vec<usize> = (0..count).collect();
    let mut entries = Vec::with_capacity(data.len());
    for (block_row, block_col, k) in compressed(indptr, indices, &ids, height / block_rows)? {
        let block = &data[k * block_len..(k + 1) * block_len];
        for (i, &value) in block.iter().enumerate() {
            entries.push(Triplet {
                row: block_row * block_rows + i / block_cols,
                col: block_col * block_cols + i % block_cols,
                value,
            });
        }
    }
    Ok(entries)
}

/// Expands diagonal storage into triplets.
///
/// Row `d` of `data` holds diagonal `offsets[d]`, indexed by column:
/// `data[d][j]` lands at `(j - offsets[d], j)`. Positions outside the
/// matrix are padding and dropped.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn diagonal(
    offsets: &[i64],
    data: &[f32],
    stored: usize,
    (height, width): (usize, usize),
) -> Vec<Triplet> {
    let mut entries = Vec::new();
    for (d, &offset) in offsets.iter().enumerate() {
        for col in 0..stored.min(width) {
            let row = col as i64 - offset;
            if (0..height as i64).contains(&row) {
                entries.push(Triplet {
                    row: row as usize,
                    col,
                    value: data[d * stored + col],
                });
            }
        }
    }
    entries
}

/// Expands compressed sparse (CSR/CSC/BSR) arrays into
/// `(major, minor, value)` triples.
fn compressed<T: Copy>(
    indptr: &[usize],
    indices: &[usize],
    data: &[T],
    major_len: usize,
) -> Result<Vec<(usize, usize, T)>, ElevationError> {
    if indptr.len() != major_len + 1 {
        return Err(ElevationError::Shape(format!(
            "indptr has {} entries, expected {}",
            indptr.len(),
            major_len + 1
        )));
    }
    if indices.len() != data.len() {
        return Err(ElevationError::Shape(format!(
            "{} indices for {} values",
            indices.len(),
            data.len()
        )));
    }
    if indptr.windows(2).any(|w| w[0] > w[1]) || indptr.last() != Some(&data.len()) {
        return Err(ElevationError::Shape("indptr is not a valid offset table".into()));
    }
    Ok(indptr
        .windows(2)
        .enumerate()
        .flat_map(|(major, w)| (w[0]..w[1]).map(move |k| (major, indices[k], data[k])))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{SparseMatrix, Triplet};
    use crate::{npy::encode, ElevationError};
    use byteorder::{LittleEndian as LE, WriteBytesExt};
    use std::io::{Cursor, Write};
    use zip::{write::FileOptions, ZipWriter};

    fn f32_le(values: &[f32]) -> Vec<u8> {
        let mut body = Vec::new();
        for &v in values {
            body.write_f32::<LE>(v).unwrap();
        }
        body
    }

    fn i32_le(values: &[i32]) -> Vec<u8> {
        let mut body = Vec::new();
        for &v in values {
            body.write_i32::<LE>(v).unwrap();
        }
        body
    }

    fn i64_le(values: &[i64]) -> Vec<u8> {
        let mut body = Vec::new();
        for &v in values {
            body.write_i64::<LE>(v).unwrap();
        }
        body
    }

    /// Builds an in-memory npz archive from `(name, npy bytes)` pairs.
    fn npz(members: &[(&str, Vec<u8>)]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in members {
            zip.start_file(format!("{name}.npy"), FileOptions::default())
                .unwrap();
            zip.write_all(bytes).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_empty_matrix_densifies_to_zeros() {
        let matrix = SparseMatrix::new((3, 5), vec![]).unwrap();
        let grid = matrix.densify();
        assert_eq!((grid.height(), grid.width()), (3, 5));
        assert!(grid.samples().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_duplicates_accumulate() {
        let matrix = SparseMatrix::new(
            (2, 2),
            vec![
                Triplet { row: 1, col: 0, value: 2.0 },
                Triplet { row: 1, col: 0, value: 3.0 },
                Triplet { row: 0, col: 1, value: f32::NAN },
            ],
        )
        .unwrap();
        let grid = matrix.densify();
        assert_eq!(grid.get(1, 0), 5.0);
        assert_eq!(grid.get(0, 0), 0.0);
        assert!(grid.get(0, 1).is_nan());
    }

    #[test]
    fn test_rejects_out_of_bounds_entries() {
        let entry = Triplet { row: 0, col: 2, value: 1.0 };
        assert!(matches!(
            SparseMatrix::new((2, 2), vec![entry]),
            Err(ElevationError::Shape(_))
        ));
        assert!(SparseMatrix::new((0, 2), vec![]).is_err());
    }

    #[test]
    fn test_csr_npz() {
        // [[0, 1, 0],
        //  [2, 0, 3]]
        let archive = npz(&[
            ("format", encode("|S3", &[], b"csr")),
            ("shape", encode("<i8", &[2], &i64_le(&[2, 3]))),
            ("data", encode("<f4", &[3], &f32_le(&[1.0, 2.0, 3.0]))),
            ("indices", encode("<i4", &[3], &i32_le(&[1, 0, 2]))),
            ("indptr", encode("<i4", &[3], &i32_le(&[0, 1, 3]))),
        ]);
        let matrix = SparseMatrix::from_npz(archive).unwrap();
        assert_eq!(matrix.shape(), (2, 3));
        assert_eq!(matrix.nnz(), 3);
        assert_eq!(matrix.densify().samples(), &[0.0, 1.0, 0.0, 2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_csc_npz() {
        // Same matrix as above, column-major.
        let archive = npz(&[
            ("format", encode("|S3", &[], b"csc")),
            ("shape", encode("<i8", &[2], &i64_le(&[2, 3]))),
            ("data", encode("<f4", &[3], &f32_le(&[2.0, 1.0, 3.0]))),
            ("indices", encode("<i4", &[3], &i32_le(&[1, 0, 1]))),
            ("indptr", encode("<i4", &[4], &i32_le(&[0, 1, 2, 3]))),
        ]);
        let matrix = SparseMatrix::from_npz(archive).unwrap();
        assert_eq!(matrix.densify().samples(), &[0.0, 1.0, 0.0, 2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_coo_npz() {
        let archive = npz(&[
            ("format", encode("|S3", &[], b"coo")),
            ("shape", encode("<i8", &[2], &i64_le(&[2, 3]))),
            ("data", encode("<f4", &[2], &f32_le(&[7.0, 8.0]))),
            ("row", encode("<i4", &[2], &i32_le(&[0, 1]))),
            ("col", encode("<i4", &[2], &i32_le(&[2, 1]))),
        ]);
        let grid = SparseMatrix::from_npz(archive).unwrap().densify();
        assert_eq!(grid.get(0, 2), 7.0);
        assert_eq!(grid.get(1, 1), 8.0);
    }

    #[test]
    fn test_bsr_npz() {
        // [[1, 2, 0, 0],
        //  [3, 4, 0, 0],
        //  [0, 0, 5, 6],
        //  [0, 0, 7, 8]] in 2x2 blocks.
        let archive = npz(&[
            ("format", encode("|S3", &[], b"bsr")),
            ("shape", encode("<i8", &[2], &i64_le(&[4, 4]))),
            (
                "data",
                encode(
                    "<f4",
                    &[2, 2, 2],
                    &f32_le(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
                ),
            ),
            ("indices", encode("<i4", &[2], &i32_le(&[0, 1]))),
            ("indptr", encode("<i4", &[3], &i32_le(&[0, 1, 2]))),
        ]);
        let grid = SparseMatrix::from_npz(archive).unwrap().densify();
        assert_eq!(
            grid.samples(),
            &[
                1.0, 2.0, 0.0, 0.0, //
                3.0, 4.0, 0.0, 0.0, //
                0.0, 0.0, 5.0, 6.0, //
                0.0, 0.0, 7.0, 8.0,
            ]
        );
    }

    #[test]
    fn test_bsr_blocks_must_tile() {
        let archive = npz(&[
            ("format", encode("|S3", &[], b"bsr")),
            ("shape", encode("<i8", &[2], &i64_le(&[3, 4]))),
            ("data", encode("<f4", &[1, 2, 2], &f32_le(&[1.0; 4]))),
            ("indices", encode("<i4", &[1], &i32_le(&[0]))),
            ("indptr", encode("<i4", &[2], &i32_le(&[0, 1]))),
        ]);
        assert!(matches!(
            SparseMatrix::from_npz(archive),
            Err(ElevationError::Shape(_))
        ));
    }

    #[test]
    fn test_dia_npz() {
        // Main diagonal [1, 2, 3] and the one below it [4, 5]:
        // [[1, 0, 0],
        //  [4, 2, 0],
        //  [0, 5, 3]]
        // Sub-diagonal values are stored by column; the last slot pads.
        let archive = npz(&[
            ("format", encode("|S3", &[], b"dia")),
            ("shape", encode("<i8", &[2], &i64_le(&[3, 3]))),
            (
                "data",
                encode("<f4", &[2, 3], &f32_le(&[1.0, 2.0, 3.0, 4.0, 5.0, 9.0])),
            ),
            ("offsets", encode("<i4", &[2], &i32_le(&[0, -1]))),
        ]);
        let matrix = SparseMatrix::from_npz(archive).unwrap();
        assert_eq!(matrix.nnz(), 5);
        assert_eq!(
            matrix.densify().samples(),
            &[1.0, 0.0, 0.0, 4.0, 2.0, 0.0, 0.0, 5.0, 3.0]
        );
    }

    #[test]
    fn test_unsupported_and_missing() {
        let archive = npz(&[
            ("format", encode("|S3", &[], b"lil")),
            ("shape", encode("<i8", &[2], &i64_le(&[2, 3]))),
            ("data", encode("<f4", &[0], &[])),
        ]);
        assert!(matches!(
            SparseMatrix::from_npz(archive),
            Err(ElevationError::SparseFormat(f)) if f == "lil"
        ));

        let archive = npz(&[("format", encode("|S3", &[], b"csr"))]);
        assert!(matches!(
            SparseMatrix::from_npz(archive),
            Err(ElevationError::MissingArray(name)) if name == "shape"
        ));
    }

    #[test]
    fn test_bad_indptr() {
        let archive = npz(&[
            ("format", encode("|S3", &[], b"csr")),
            ("shape", encode("<i8", &[2], &i64_le(&[2, 3]))),
            ("data", encode("<f4", &[1], &f32_le(&[1.0]))),
            ("indices", encode("<i4", &[1], &i32_le(&[0]))),
            ("indptr", encode("<i4", &[3], &i32_le(&[0, 2, 1]))),
        ]);
        assert!(matches!(
            SparseMatrix::from_npz(archive),
            Err(ElevationError::Shape(_))
        ));
    }
}

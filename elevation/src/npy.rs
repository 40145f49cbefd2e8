//! Reader for NumPy `.npy` arrays, the members of scipy's sparse `.npz`
//! archives.
//!
//! Only what `scipy.sparse.save_npz` produces is supported: C-order
//! (or 1-D) arrays of fixed-width numbers, plus fixed-width byte
//! strings for the `format` member.
//!
//! # References
//!
//! 1. [NPY format](https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html)

use crate::ElevationError;
use byteorder::{BigEndian as BE, ByteOrder, LittleEndian as LE, ReadBytesExt};
use std::io::Read;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Float,
    Int,
    Uint,
    Bool,
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    big_endian: bool,
    kind: Kind,
    /// Bytes per element.
    size: usize,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, ElevationError> {
        let err = || ElevationError::Npy(format!("unsupported dtype {descr:?}"));
        let mut chars = descr.chars();
        let big_endian = match chars.next() {
            Some('<' | '|') => false,
            Some('>') => true,
            Some('=') => cfg!(target_endian = "big"),
            _ => return Err(err()),
        };
        let kind = match chars.next() {
            Some('f') => Kind::Float,
            Some('i') => Kind::Int,
            Some('u') => Kind::Uint,
            Some('b') => Kind::Bool,
            Some('S') => Kind::Bytes,
            _ => return Err(err()),
        };
        let size: usize = chars.as_str().parse().map_err(|_| err())?;
        match (kind, size) {
            (Kind::Float, 4 | 8) | (Kind::Int | Kind::Uint, 1 | 2 | 4 | 8) | (Kind::Bool, 1) => (),
            (Kind::Bytes, n) if n > 0 => (),
            _ => return Err(err()),
        }
        Ok(Self {
            big_endian,
            kind,
            size,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scalar {
    Float(f64),
    Int(i64),
    Uint(u64),
}

/// A decoded `.npy` array: header plus raw element bytes.
pub(crate) struct NpyArray {
    shape: Vec<usize>,
    dtype: Dtype,
    body: Vec<u8>,
}

impl NpyArray {
    pub(crate) fn read<R: Read>(mut rdr: R) -> Result<Self, ElevationError> {
        let mut magic = [0_u8; 6];
        rdr.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ElevationError::Npy("bad magic".into()));
        }
        let major = rdr.read_u8()?;
        let _minor = rdr.read_u8()?;
        let header_len = match major {
            1 => usize::from(rdr.read_u16::<LE>()?),
            2 | 3 => rdr.read_u32::<LE>()? as usize,
            v => return Err(ElevationError::Npy(format!("unknown version {v}"))),
        };
        let mut header = vec![0_u8; header_len];
        rdr.read_exact(&mut header)?;
        let header = String::from_utf8(header)
            .map_err(|_| ElevationError::Npy("header is not text".into()))?;

        let dtype = Dtype::parse(quoted(dict_value(&header, "descr")?)?)?;
        let fortran_order = dict_value(&header, "fortran_order")?.starts_with("True");
        let shape = parse_shape(dict_value(&header, "shape")?)?;
        if fortran_order && shape.len() > 1 {
            return Err(ElevationError::Npy("fortran order arrays".into()));
        }

        let byte_len = shape
            .iter()
            .try_fold(dtype.size, |acc, &dim| acc.checked_mul(dim))
            .and_then(|len| u64::try_from(len).ok())
            .ok_or_else(|| ElevationError::Npy(format!("shape {shape:?} is too large")))?;
        // The declared size is untrusted; only allocate for bytes read.
        let mut body = Vec::new();
        rdr.by_ref().take(byte_len).read_to_end(&mut body)?;
        if body.len() as u64 != byte_len {
            return Err(ElevationError::Npy(format!(
                "body holds {} of {byte_len} bytes",
                body.len()
            )));
        }
        Ok(Self { shape, dtype, body })
    }

    pub(crate) fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the elements as `f32`, the way `ndarray.astype(float32)`
    /// would.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub(crate) fn to_f32(&self) -> Result<Vec<f32>, ElevationError> {
        Ok(self
            .scalars()?
            .into_iter()
            .map(|s| match s {
                Scalar::Float(v) => v as f32,
                Scalar::Int(v) => v as f32,
                Scalar::Uint(v) => v as f32,
            })
            .collect())
    }

    /// Returns integer elements as indices.
    pub(crate) fn to_indices(&self) -> Result<Vec<usize>, ElevationError> {
        self.scalars()?
            .into_iter()
            .map(|s| match s {
                Scalar::Int(v) => usize::try_from(v).ok(),
                Scalar::Uint(v) => usize::try_from(v).ok(),
                Scalar::Float(_) => None,
            })
            .map(|idx| idx.ok_or_else(|| ElevationError::Npy("invalid index element".into())))
            .collect()
    }

    /// Returns integer elements as signed offsets.
    pub(crate) fn to_offsets(&self) -> Result<Vec<i64>, ElevationError> {
        self.scalars()?
            .into_iter()
            .map(|s| match s {
                Scalar::Int(v) => Some(v),
                Scalar::Uint(v) => i64::try_from(v).ok(),
                Scalar::Float(_) => None,
            })
            .map(|off| off.ok_or_else(|| ElevationError::Npy("invalid offset element".into())))
            .collect()
    }

    /// Returns a byte string array as text, NUL padding removed.
    pub(crate) fn to_text(&self) -> Result<String, ElevationError> {
        if self.dtype.kind != Kind::Bytes {
            return Err(ElevationError::Npy("expected a byte string".into()));
        }
        let end = self
            .body
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.body.len());
        String::from_utf8(self.body[..end].to_vec())
            .map_err(|_| ElevationError::Npy("byte string is not text".into()))
    }

    fn scalars(&self) -> Result<Vec<Scalar>, ElevationError> {
        match self.dtype {
            Dtype {
                kind: Kind::Bytes, ..
            } => Err(ElevationError::Npy("byte strings are not numeric".into())),
            Dtype {
                big_endian: true, ..
            } => Ok(self.scalars_with::<BE>()),
            _ => Ok(self.scalars_with::<LE>()),
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn scalars_with<E: ByteOrder>(&self) -> Vec<Scalar> {
        let Dtype { kind, size, .. } = self.dtype;
        self.body
            .chunks_exact(size)
            .map(|raw| match (kind, size) {
                (Kind::Float, 4) => Scalar::Float(f64::from(E::read_f32(raw))),
                (Kind::Float, _) => Scalar::Float(E::read_f64(raw)),
                (Kind::Int, 1) => Scalar::Int(i64::from(raw[0] as i8)),
                (Kind::Int, 2) => Scalar::Int(i64::from(E::read_i16(raw))),
                (Kind::Int, 4) => Scalar::Int(i64::from(E::read_i32(raw))),
                (Kind::Int, _) => Scalar::Int(E::read_i64(raw)),
                (Kind::Uint | Kind::Bool, 1) => Scalar::Uint(u64::from(raw[0])),
                (_, 2) => Scalar::Uint(u64::from(E::read_u16(raw))),
                (_, 4) => Scalar::Uint(u64::from(E::read_u32(raw))),
                _ => Scalar::Uint(E::read_u64(raw)),
            })
            .collect()
    }
}

/// Returns the text following `'key':` in a header dict literal.
fn dict_value<'a>(header: &'a str, key: &str) -> Result<&'a str, ElevationError> {
    let needle = format!("'{key}':");
    let start = header
        .find(&needle)
        .ok_or_else(|| ElevationError::Npy(format!("header lacks {key:?}")))?;
    Ok(header[start + needle.len()..].trim_start())
}

/// Returns the contents of the single-quoted literal at the start of `s`.
fn quoted(s: &str) -> Result<&str, ElevationError> {
    s.strip_prefix('\'')
        .and_then(|rest| rest.find('\'').map(|end| &rest[..end]))
        .ok_or_else(|| ElevationError::Npy(format!("expected a quoted string at {s:?}")))
}

/// Parses a tuple literal such as `()`, `(3,)` or `(2, 3)`.
fn parse_shape(s: &str) -> Result<Vec<usize>, ElevationError> {
    let err = || ElevationError::Npy(format!("bad shape at {s:?}"));
    let inner = s.strip_prefix('(').ok_or_else(err)?;
    let end = inner.find(')').ok_or_else(err)?;
    inner[..end]
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| dim.trim_end_matches('L').parse::<usize>().map_err(|_| err()))
        .collect()
}

/// Encodes a version 1.0 `.npy` file.
#[cfg(test)]
pub(crate) fn encode(descr: &str, shape: &[usize], body: &[u8]) -> Vec<u8> {
    use byteorder::WriteBytesExt;
    let shape = match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
    while (MAGIC.len() + 4 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');
    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&[1, 0]);
    out.write_u16::<LE>(u16::try_from(header.len()).unwrap())
        .unwrap();
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(body);
    out
}

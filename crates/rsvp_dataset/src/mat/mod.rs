//! MATLAB Level 5 MAT-file codec.
//!
//! The dataset is distributed as MAT v5 files: a 128-byte header followed by
//! a stream of tagged data elements. Each variable is an `miMATRIX` element,
//! usually wrapped in a zlib-deflated `miCOMPRESSED` element. Only numeric
//! arrays are decoded; other classes are skipped.

mod reader;
mod writer;

use std::path::Path;

use ndarray::{Array2, ShapeBuilder};
use thiserror::Error;

pub use writer::MatWriter;

/// Length of the fixed file header.
pub const HEADER_LEN: usize = 128;
/// Length of the descriptive text at the start of the header.
pub const HEADER_TEXT_LEN: usize = 116;
pub(crate) const HEADER_MAGIC: &[u8] = b"MATLAB 5.0 MAT-file";
pub(crate) const VERSION: u16 = 0x0100;
/// Array flags bit marking a complex array.
pub(crate) const FLAG_COMPLEX: u32 = 0x0800;

/// Errors raised while decoding or encoding a MAT-file.
#[derive(Error, Debug)]
pub enum MatError {
    #[error("invalid header: {0}")]
    Header(String),

    #[error("truncated at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed element at byte {offset}: {message}")]
    Element { offset: usize, message: String },

    #[error("decompression failed at byte {offset}: {message}")]
    Decompress { offset: usize, message: String },

    #[error("shape mismatch for '{name}': dims {dims:?} but {len} values")]
    Shape {
        name: String,
        dims: Vec<usize>,
        len: usize,
    },

    #[error("variable {name} is missing")]
    Missing { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte order declared by the header's endian indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Data element types (`miINT8` .. `miUTF32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DataType {
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Single = 7,
    Double = 9,
    Int64 = 12,
    UInt64 = 13,
    Matrix = 14,
    Compressed = 15,
    Utf8 = 16,
    Utf16 = 17,
    Utf32 = 18,
}

impl DataType {
    pub fn from_u32(v: u32) -> Option<Self> {
        use DataType::*;
        Some(match v {
            1 => Int8,
            2 => UInt8,
            3 => Int16,
            4 => UInt16,
            5 => Int32,
            6 => UInt32,
            7 => Single,
            9 => Double,
            12 => Int64,
            13 => UInt64,
            14 => Matrix,
            15 => Compressed,
            16 => Utf8,
            17 => Utf16,
            18 => Utf32,
            _ => return None,
        })
    }

    /// Width in bytes of one value, for the numeric storage types.
    pub fn numeric_width(self) -> Option<usize> {
        use DataType::*;
        match self {
            Int8 | UInt8 => Some(1),
            Int16 | UInt16 => Some(2),
            Int32 | UInt32 | Single => Some(4),
            Double | Int64 | UInt64 => Some(8),
            Matrix | Compressed | Utf8 | Utf16 | Utf32 => None,
        }
    }
}

/// Array classes (`mxCELL_CLASS` .. `mxUINT64_CLASS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArrayClass {
    Cell = 1,
    Struct = 2,
    Object = 3,
    Char = 4,
    Sparse = 5,
    Double = 6,
    Single = 7,
    Int8 = 8,
    UInt8 = 9,
    Int16 = 10,
    UInt16 = 11,
    Int32 = 12,
    UInt32 = 13,
    Int64 = 14,
    UInt64 = 15,
}

impl ArrayClass {
    pub fn from_u8(v: u8) -> Option<Self> {
        use ArrayClass::*;
        Some(match v {
            1 => Cell,
            2 => Struct,
            3 => Object,
            4 => Char,
            5 => Sparse,
            6 => Double,
            7 => Single,
            8 => Int8,
            9 => UInt8,
            10 => Int16,
            11 => UInt16,
            12 => Int32,
            13 => UInt32,
            14 => Int64,
            15 => UInt64,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        (self as u8) >= ArrayClass::Double as u8
    }
}

/// A decoded numeric variable. Values are widened to `f64` and kept in
/// MATLAB's column-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatArray {
    name: String,
    class: ArrayClass,
    dims: Vec<usize>,
    data: Vec<f64>,
    complex: bool,
}

impl MatArray {
    pub fn new(
        name: impl Into<String>,
        class: ArrayClass,
        dims: Vec<usize>,
        data: Vec<f64>,
    ) -> Result<Self, MatError> {
        let name = name.into();
        let expected = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if dims.len() < 2 || expected != Some(data.len()) {
            return Err(MatError::Shape {
                name,
                dims,
                len: data.len(),
            });
        }
        Ok(Self {
            name,
            class,
            dims,
            data,
            complex: false,
        })
    }

    pub(crate) fn with_complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ArrayClass {
        self.class
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// True if the stored array had an imaginary part. Only the real part
    /// is kept.
    pub fn is_complex(&self) -> bool {
        self.complex
    }

    pub fn rows(&self) -> usize {
        self.dims[0]
    }

    /// Columns, with any trailing dimensions folded in.
    pub fn cols(&self) -> usize {
        self.dims[1..].iter().product()
    }

    /// Raw column-major values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.data.get(col * self.rows() + row).copied()
    }

    /// Copy one row out of the column-major storage.
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.rows() {
            return None;
        }
        Some(self.data.iter().skip(row).step_by(self.rows()).copied().collect())
    }

    /// Convert into a row-major `rows x cols` matrix.
    pub fn into_array2(self) -> Result<Array2<f64>, MatError> {
        let shape = (self.rows(), self.cols());
        let len = self.data.len();
        let array = Array2::from_shape_vec(shape.f(), self.data).map_err(|_| MatError::Shape {
            name: self.name,
            dims: self.dims,
            len,
        })?;
        Ok(array.as_standard_layout().into_owned())
    }
}

/// The numeric variables of one MAT-file, in file order.
#[derive(Debug, Clone)]
pub struct MatFile {
    header_text: String,
    endian: Endian,
    variables: Vec<MatArray>,
}

impl MatFile {
    /// Decode every numeric variable in `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MatError> {
        reader::read(bytes, None)
    }

    /// Decode only the named variables; others are skipped without
    /// converting their data.
    pub fn from_bytes_selected(bytes: &[u8], names: &[&str]) -> Result<Self, MatError> {
        reader::read(bytes, Some(names))
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, MatError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn header_text(&self) -> &str {
        &self.header_text
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.iter().map(|v| v.name())
    }

    pub fn variable(&self, name: &str) -> Option<&MatArray> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Like [`variable`](Self::variable), but a missing name is an error.
    pub fn require(&self, name: &str) -> Result<&MatArray, MatError> {
        self.variable(name).ok_or_else(|| MatError::Missing {
            name: name.to_string(),
        })
    }

    /// Move a variable out of the file, avoiding a copy of its data.
    pub fn take(&mut self, name: &str) -> Option<MatArray> {
        let index = self.variables.iter().position(|v| v.name == name)?;
        Some(self.variables.remove(index))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

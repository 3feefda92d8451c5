use std::io::Write;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::{Array2, Axis};

use super::{ArrayClass, DataType, Endian, MatError, HEADER_TEXT_LEN, VERSION};

struct PendingVar {
    name: String,
    rows: usize,
    cols: usize,
    /// Column-major.
    data: Vec<f64>,
    storage: DataType,
}

/// Writes numeric `double` matrices as a Level 5 MAT-file.
///
/// Values can be stored in a narrower type, as MATLAB does for integral
/// doubles; conversion uses `as` casts, so out-of-range values saturate.
pub struct MatWriter {
    endian: Endian,
    compress: bool,
    variables: Vec<PendingVar>,
}

impl Default for MatWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MatWriter {
    pub fn new() -> Self {
        Self {
            endian: Endian::Little,
            compress: false,
            variables: Vec::new(),
        }
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Wrap each variable in a zlib-compressed element.
    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Add a `rows x cols` matrix given in column-major order.
    pub fn add(self, name: impl Into<String>, rows: usize, cols: usize, data: Vec<f64>) -> Self {
        self.add_as(name, rows, cols, data, DataType::Double)
    }

    pub fn add_as(
        mut self,
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        data: Vec<f64>,
        storage: DataType,
    ) -> Self {
        self.variables.push(PendingVar {
            name: name.into(),
            rows,
            cols,
            data,
            storage,
        });
        self
    }

    pub fn add_array(self, name: impl Into<String>, array: &Array2<f64>) -> Self {
        let (rows, cols) = array.dim();
        let data = array
            .axis_iter(Axis(1))
            .flat_map(|col| col.to_vec())
            .collect();
        self.add(name, rows, cols, data)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MatError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), MatError> {
        match self.endian {
            Endian::Little => self.write_all::<LittleEndian, W>(writer),
            Endian::Big => self.write_all::<BigEndian, W>(writer),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MatError> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_to(&mut file)?;
        file.flush()?;
        Ok(())
    }

    fn write_all<B: ByteOrder, W: Write>(&self, writer: &mut W) -> Result<(), MatError> {
        let mut text = format!(
            "MATLAB 5.0 MAT-file, Platform: {}, Created by: rsvp_dataset",
            std::env::consts::OS
        )
        .into_bytes();
        text.resize(HEADER_TEXT_LEN, b' ');
        writer.write_all(&text)?;
        writer.write_all(&[0u8; 8])?;
        writer.write_u16::<B>(VERSION)?;
        writer.write_u16::<B>(u16::from_be_bytes(*b"MI"))?;

        for var in &self.variables {
            let element = encode_matrix::<B>(var)?;
            if self.compress {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&element)?;
                let deflated = encoder.finish()?;
                writer.write_u32::<B>(DataType::Compressed as u32)?;
                writer.write_u32::<B>(byte_len(deflated.len(), &var.name)?)?;
                writer.write_all(&deflated)?;
            } else {
                writer.write_all(&element)?;
            }
        }
        Ok(())
    }
}

fn byte_len(len: usize, name: &str) -> Result<u32, MatError> {
    u32::try_from(len).map_err(|_| MatError::Element {
        offset: 0,
        message: format!("variable '{name}' exceeds 4 GiB"),
    })
}

fn pad8(buf: &mut Vec<u8>, nbytes: usize) {
    buf.resize(buf.len() + (8 - nbytes % 8) % 8, 0);
}

fn encode_matrix<B: ByteOrder>(var: &PendingVar) -> Result<Vec<u8>, MatError> {
    let name = var.name.as_bytes();
    if name.is_empty() || !var.name.is_ascii() {
        return Err(MatError::Element {
            offset: 0,
            message: format!("invalid variable name {:?}", var.name),
        });
    }
    if var.rows.checked_mul(var.cols) != Some(var.data.len()) {
        return Err(MatError::Shape {
            name: var.name.clone(),
            dims: vec![var.rows, var.cols],
            len: var.data.len(),
        });
    }
    let dim = |d: usize| {
        i32::try_from(d).map_err(|_| MatError::Element {
            offset: 0,
            message: format!("dimension {d} of '{}' does not fit miINT32", var.name),
        })
    };
    let width = var.storage.numeric_width().ok_or_else(|| MatError::Element {
        offset: 0,
        message: format!("{:?} is not a numeric storage type", var.storage),
    })?;

    let mut payload = Vec::new();

    payload.write_u32::<B>(DataType::UInt32 as u32)?;
    payload.write_u32::<B>(8)?;
    payload.write_u32::<B>(ArrayClass::Double as u32)?;
    payload.write_u32::<B>(0)?;

    payload.write_u32::<B>(DataType::Int32 as u32)?;
    payload.write_u32::<B>(8)?;
    payload.write_i32::<B>(dim(var.rows)?)?;
    payload.write_i32::<B>(dim(var.cols)?)?;

    if name.len() <= 4 {
        payload.write_u32::<B>(((name.len() as u32) << 16) | DataType::Int8 as u32)?;
        payload.extend_from_slice(name);
        payload.resize(payload.len() + 4 - name.len(), 0);
    } else {
        payload.write_u32::<B>(DataType::Int8 as u32)?;
        payload.write_u32::<B>(byte_len(name.len(), &var.name)?)?;
        payload.extend_from_slice(name);
        pad8(&mut payload, name.len());
    }

    let nbytes = var.data.len() * width;
    payload.write_u32::<B>(var.storage as u32)?;
    payload.write_u32::<B>(byte_len(nbytes, &var.name)?)?;
    for &v in &var.data {
        match var.storage {
            DataType::Double => payload.write_f64::<B>(v)?,
            DataType::Single => payload.write_f32::<B>(v as f32)?,
            DataType::Int8 => payload.write_i8(v as i8)?,
            DataType::UInt8 => payload.write_u8(v as u8)?,
            DataType::Int16 => payload.write_i16::<B>(v as i16)?,
            DataType::UInt16 => payload.write_u16::<B>(v as u16)?,
            DataType::Int32 => payload.write_i32::<B>(v as i32)?,
            DataType::UInt32 => payload.write_u32::<B>(v as u32)?,
            DataType::Int64 => payload.write_i64::<B>(v as i64)?,
            DataType::UInt64 => payload.write_u64::<B>(v as u64)?,
            other => {
                return Err(MatError::Element {
                    offset: 0,
                    message: format!("{other:?} is not a numeric storage type"),
                })
            }
        }
    }
    pad8(&mut payload, nbytes);

    let mut element = Vec::with_capacity(payload.len() + 8);
    element.write_u32::<B>(DataType::Matrix as u32)?;
    element.write_u32::<B>(byte_len(payload.len(), &var.name)?)?;
    element.extend_from_slice(&payload);
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mat::{MatFile, HEADER_LEN};

    fn matrix() -> Array2<f64> {
        Array2::from_shape_fn((3, 5), |(r, c)| (r * 10 + c) as f64 - 7.25)
    }

    #[test]
    fn test_header_layout() {
        let le = MatWriter::new().to_bytes().unwrap();
        assert_eq!(le.len(), HEADER_LEN);
        assert_eq!(&le[126..128], b"IM");
        assert_eq!(&le[124..126], &[0x00, 0x01]);

        let be = MatWriter::new().endian(Endian::Big).to_bytes().unwrap();
        assert_eq!(&be[126..128], b"MI");
        assert_eq!(&be[124..126], &[0x01, 0x00]);
    }

    #[test]
    fn test_endianness_and_compression_agree() {
        let m = matrix();
        let variants = [
            (Endian::Little, false),
            (Endian::Little, true),
            (Endian::Big, false),
            (Endian::Big, true),
        ];
        for (endian, compress) in variants {
            let bytes = MatWriter::new()
                .endian(endian)
                .compressed(compress)
                .add_array("EEGdata1", &m)
                .to_bytes()
                .unwrap();
            let mut file = MatFile::from_bytes(&bytes).unwrap();
            assert_eq!(file.endian(), endian);
            let decoded = file.take("EEGdata1").unwrap().into_array2().unwrap();
            assert_eq!(decoded, m, "endian {endian:?} compressed {compress}");
        }
    }

    #[test]
    fn test_narrow_storage() {
        let bytes = MatWriter::new()
            .add_as("lbl", 2, 2, vec![1.0, 2.0, 2.0, 1.0], DataType::UInt8)
            .add_as("pos", 1, 3, vec![-4.0, 70000.0, 5.0], DataType::Int32)
            .to_bytes()
            .unwrap();
        let file = MatFile::from_bytes(&bytes).unwrap();
        assert_eq!(file.variable("lbl").unwrap().as_slice(), &[1.0, 2.0, 2.0, 1.0]);
        assert_eq!(file.variable("pos").unwrap().as_slice(), &[-4.0, 70000.0, 5.0]);
        assert_eq!(file.variable("pos").unwrap().class(), ArrayClass::Double);
    }

    #[test]
    fn test_rejects_bad_variables() {
        assert!(MatWriter::new().add("x", 2, 2, vec![0.0; 3]).to_bytes().is_err());
        assert!(MatWriter::new().add("", 1, 1, vec![0.0]).to_bytes().is_err());
        assert!(MatWriter::new()
            .add_as("x", 1, 1, vec![0.0], DataType::Matrix)
            .to_bytes()
            .is_err());
    }
}

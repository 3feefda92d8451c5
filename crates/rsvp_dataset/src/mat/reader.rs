use std::io::Read;
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use tracing::{debug, trace};

use super::{
    ArrayClass, DataType, Endian, MatArray, MatError, MatFile, FLAG_COMPLEX, HEADER_LEN,
    HEADER_MAGIC, HEADER_TEXT_LEN, VERSION,
};

pub(super) fn read(bytes: &[u8], only: Option<&[&str]>) -> Result<MatFile, MatError> {
    let (header_text, endian) = read_header(bytes)?;
    let body = &bytes[HEADER_LEN..];
    let mut variables = Vec::new();
    match endian {
        Endian::Little => {
            Decoder::<LittleEndian>::new(only).read_stream(body, HEADER_LEN, &mut variables)?
        }
        Endian::Big => {
            Decoder::<BigEndian>::new(only).read_stream(body, HEADER_LEN, &mut variables)?
        }
    }
    debug!(
        count = variables.len(),
        ?endian,
        "decoded MAT-file variables"
    );
    Ok(MatFile {
        header_text,
        endian,
        variables,
    })
}

fn read_header(bytes: &[u8]) -> Result<(String, Endian), MatError> {
    if bytes.len() < HEADER_LEN {
        return Err(MatError::Truncated {
            offset: 0,
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }

    let text = &bytes[..HEADER_TEXT_LEN];
    if !text.starts_with(HEADER_MAGIC) {
        // v7.3 files are HDF5 containers with a MATLAB text preamble.
        let preview = String::from_utf8_lossy(&text[..24]).into_owned();
        return Err(MatError::Header(format!(
            "not a Level 5 MAT-file (header starts with {preview:?})"
        )));
    }

    let endian = match &bytes[126..128] {
        b"IM" => Endian::Little,
        b"MI" => Endian::Big,
        other => {
            return Err(MatError::Header(format!(
                "unknown endian indicator {other:?}"
            )))
        }
    };

    let version = match endian {
        Endian::Little => LittleEndian::read_u16(&bytes[124..126]),
        Endian::Big => BigEndian::read_u16(&bytes[124..126]),
    };
    if version != VERSION {
        return Err(MatError::Header(format!("unsupported version {version:#06x}")));
    }

    let header_text = String::from_utf8_lossy(text)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string();
    Ok((header_text, endian))
}

/// One tagged data element. `offset` is the absolute position of its tag,
/// for error messages.
struct Element<'a> {
    ty: u32,
    data: &'a [u8],
    offset: usize,
}

/// Walks a sequence of tagged elements in a byte slice.
struct Elements<'a, B> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
    _order: PhantomData<B>,
}

impl<'a, B: ByteOrder> Elements<'a, B> {
    fn new(buf: &'a [u8], base: usize) -> Self {
        Self {
            buf,
            pos: 0,
            base,
            _order: PhantomData,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MatError> {
        let available = self.buf.len() - self.pos;
        if n > available {
            return Err(MatError::Truncated {
                offset: self.base + self.pos,
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn next_element(&mut self) -> Result<Option<Element<'a>>, MatError> {
        if self.pos == self.buf.len() {
            return Ok(None);
        }
        let offset = self.base + self.pos;
        let first = B::read_u32(self.take(4)?);

        // Small element: byte count in the upper half, payload in the
        // following four bytes.
        let small_len = (first >> 16) as usize;
        if small_len != 0 {
            if small_len > 4 {
                return Err(MatError::Element {
                    offset,
                    message: format!("small element claims {small_len} bytes"),
                });
            }
            let payload = self.take(4)?;
            return Ok(Some(Element {
                ty: first & 0xFFFF,
                data: &payload[..small_len],
                offset,
            }));
        }

        let nbytes = B::read_u32(self.take(4)?) as usize;
        let data = self.take(nbytes)?;
        if first != DataType::Compressed as u32 {
            self.skip_padding(nbytes)?;
        }
        Ok(Some(Element {
            ty: first,
            data,
            offset,
        }))
    }

    /// Elements are aligned to 8 bytes. The padding of the last element in a
    /// buffer may be omitted.
    fn skip_padding(&mut self, nbytes: usize) -> Result<(), MatError> {
        let pad = (8 - nbytes % 8) % 8;
        let remaining = self.buf.len() - self.pos;
        if remaining == 0 {
            return Ok(());
        }
        self.take(pad).map(|_| ())
    }

    fn expect_element(&mut self, what: &str, parent: usize) -> Result<Element<'a>, MatError> {
        self.next_element()?.ok_or_else(|| MatError::Element {
            offset: parent,
            message: format!("matrix is missing its {what}"),
        })
    }
}

struct Decoder<'n, B> {
    only: Option<&'n [&'n str]>,
    _order: PhantomData<B>,
}

impl<'n, B: ByteOrder> Decoder<'n, B> {
    fn new(only: Option<&'n [&'n str]>) -> Self {
        Self {
            only,
            _order: PhantomData,
        }
    }

    fn wanted(&self, name: &str) -> bool {
        self.only.map_or(true, |names| names.contains(&name))
    }

    fn read_stream(
        &self,
        buf: &[u8],
        base: usize,
        out: &mut Vec<MatArray>,
    ) -> Result<(), MatError> {
        let mut elements = Elements::<B>::new(buf, base);
        while let Some(element) = elements.next_element()? {
            match DataType::from_u32(element.ty) {
                Some(DataType::Matrix) => {
                    if let Some(array) = self.read_matrix(&element)? {
                        out.push(array);
                    }
                }
                Some(DataType::Compressed) => {
                    let inflated = inflate(&element)?;
                    trace!(
                        offset = element.offset,
                        compressed = element.data.len(),
                        inflated = inflated.len(),
                        "inflated element"
                    );
                    // Offsets inside the inflated stream are reported
                    // relative to the compressed element.
                    self.read_stream(&inflated, element.offset, out)?;
                }
                _ => {
                    trace!(offset = element.offset, ty = element.ty, "skipping top-level element");
                }
            }
        }
        Ok(())
    }

    fn read_matrix(&self, element: &Element<'_>) -> Result<Option<MatArray>, MatError> {
        if element.data.is_empty() {
            return Ok(None);
        }
        let mut parts = Elements::<B>::new(element.data, element.offset + 8);

        let flags = parts.expect_element("array flags", element.offset)?;
        if flags.ty != DataType::UInt32 as u32 || flags.data.len() != 8 {
            return Err(MatError::Element {
                offset: flags.offset,
                message: "array flags must be 8 bytes of miUINT32".to_string(),
            });
        }
        let flag_word = B::read_u32(&flags.data[..4]);
        let class_code = (flag_word & 0xFF) as u8;
        let complex = flag_word & FLAG_COMPLEX != 0;

        // Opaque arrays (class 17) carry no dimensions element.
        let class = match ArrayClass::from_u8(class_code) {
            Some(class) if class.is_numeric() => class,
            other => {
                debug!(
                    offset = element.offset,
                    class = ?other,
                    code = class_code,
                    "skipping non-numeric variable"
                );
                return Ok(None);
            }
        };

        let dims_el = parts.expect_element("dimensions", element.offset)?;
        let dims = read_dims::<B>(&dims_el)?;

        let name_el = parts.expect_element("name", element.offset)?;
        if name_el.ty != DataType::Int8 as u32 {
            return Err(MatError::Element {
                offset: name_el.offset,
                message: "array name must be miINT8".to_string(),
            });
        }
        let name = String::from_utf8(name_el.data.to_vec()).map_err(|_| MatError::Element {
            offset: name_el.offset,
            message: "array name is not valid UTF-8".to_string(),
        })?;

        if !self.wanted(&name) {
            debug!(%name, "skipping unselected variable");
            return Ok(None);
        }

        let count = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| MatError::Element {
                offset: dims_el.offset,
                message: format!("dimensions {dims:?} overflow"),
            })?;

        let real = parts.expect_element("real part", element.offset)?;
        let data = read_numeric::<B>(&real, count)?;
        if complex {
            let imag = parts.expect_element("imaginary part", element.offset)?;
            read_numeric::<B>(&imag, count)?;
        }

        trace!(%name, ?dims, ?class, "decoded variable");
        Ok(Some(MatArray::new(name, class, dims, data)?.with_complex(complex)))
    }
}

fn inflate(element: &Element<'_>) -> Result<Vec<u8>, MatError> {
    let mut inflated = Vec::new();
    ZlibDecoder::new(element.data)
        .read_to_end(&mut inflated)
        .map_err(|e| MatError::Decompress {
            offset: element.offset,
            message: e.to_string(),
        })?;
    Ok(inflated)
}

fn read_dims<B: ByteOrder>(element: &Element<'_>) -> Result<Vec<usize>, MatError> {
    let malformed = |message: String| MatError::Element {
        offset: element.offset,
        message,
    };
    if element.ty != DataType::Int32 as u32 {
        return Err(malformed("dimensions must be miINT32".to_string()));
    }
    if element.data.len() < 8 || element.data.len() % 4 != 0 {
        return Err(malformed(format!(
            "dimensions element has {} bytes",
            element.data.len()
        )));
    }
    element
        .data
        .chunks_exact(4)
        .map(|chunk| {
            let d = B::read_i32(chunk);
            usize::try_from(d).map_err(|_| malformed(format!("negative dimension {d}")))
        })
        .collect()
}

/// Decode a numeric element into `count` values. The storage type may be
/// narrower than the array class.
fn read_numeric<B: ByteOrder>(element: &Element<'_>, count: usize) -> Result<Vec<f64>, MatError> {
    let not_numeric = || MatError::Element {
        offset: element.offset,
        message: format!("type {} cannot hold numeric data", element.ty),
    };
    let ty = DataType::from_u32(element.ty);
    let width = ty.and_then(DataType::numeric_width).ok_or_else(not_numeric)?;
    let src = element.data;
    if count.checked_mul(width) != Some(src.len()) {
        return Err(MatError::Element {
            offset: element.offset,
            message: format!(
                "expected {count} values of {width} bytes, found {} bytes",
                src.len()
            ),
        });
    }

    fn widen<T: Copy + Default, F: Fn(&[u8], &mut [T])>(
        src: &[u8],
        count: usize,
        read_into: F,
        to_f64: fn(T) -> f64,
    ) -> Vec<f64> {
        let mut values = vec![T::default(); count];
        read_into(src, &mut values);
        values.into_iter().map(to_f64).collect()
    }

    let values = match ty {
        Some(DataType::Double) => {
            let mut values = vec![0f64; count];
            B::read_f64_into(src, &mut values);
            values
        }
        Some(DataType::Single) => widen(src, count, B::read_f32_into, f64::from),
        Some(DataType::Int8) => src.iter().map(|&b| b as i8 as f64).collect(),
        Some(DataType::UInt8) => src.iter().map(|&b| b as f64).collect(),
        Some(DataType::Int16) => widen(src, count, B::read_i16_into, f64::from),
        Some(DataType::UInt16) => widen(src, count, B::read_u16_into, f64::from),
        Some(DataType::Int32) => widen(src, count, B::read_i32_into, f64::from),
        Some(DataType::UInt32) => widen(src, count, B::read_u32_into, f64::from),
        Some(DataType::Int64) => widen(src, count, B::read_i64_into, |v: i64| v as f64),
        Some(DataType::UInt64) => widen(src, count, B::read_u64_into, |v: u64| v as f64),
        _ => return Err(not_numeric()),
    };
    Ok(values)
}

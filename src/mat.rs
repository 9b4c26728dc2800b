//! This module reads MATLAB Level 5 `.mat` containers, the intermediate
//! format the AIR database tooling exports. A file has the following
//! structure:
//!
//! - A 128 byte header: 116 bytes of descriptive text, an 8 byte subsystem
//!   offset, a 2 byte version, and a 2 byte endian indicator which reads as
//!   `IM` when the file is little-endian.
//! - A sequence of tagged data elements. A full tag is two little-endian
//!   `u32`s (element type, payload size) followed by the payload, padded to
//!   an 8 byte boundary. Elements of 4 bytes or fewer may instead use the
//!   small element form, where the size lives in the upper half of the
//!   first word and the payload in the second.
//! - Arrays are `miMATRIX` elements whose payload is itself a sequence of
//!   sub-elements: array flags, dimensions, name, and the real part.
//!
//! Only real numeric arrays are decoded; character, cell, struct, sparse,
//! and complex arrays are skipped. Values are kept in MATLAB's column-major
//! order and the accessors do the index arithmetic.

use log::debug;
use nom::{
    bytes::complete::take,
    error::{Error as NomError, ErrorKind},
    number::complete::le_u32,
    Err as NomErr, Finish, IResult,
};
use std::{fmt, fs::File, io::Read, path::Path};

// Element types from the Level 5 format documentation.
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

// Array classes. Numeric classes run from mxDOUBLE (6) to mxUINT64 (15).
const MX_DOUBLE_CLASS: u32 = 6;
const MX_UINT64_CLASS: u32 = 15;

const HEADER_LEN: usize = 128;
const COMPLEX_FLAG: u32 = 0x0800;

/// Everything that can go wrong while loading a container. All of these
/// count as load failures to the batch layer: the record is skipped and
/// the cause logged.
#[derive(Debug)]
pub enum MatError {
    /// The file could not be read at all.
    Io(std::io::Error),

    /// The file is shorter than a header or the endian indicator is not
    /// one of the two defined values.
    BadHeader,

    /// The file is big-endian (`MI` indicator), which this reader does
    /// not support.
    BigEndian,

    /// The file stores its arrays in `miCOMPRESSED` elements. Re-export
    /// without compression (`scipy.io.savemat` default, MATLAB `save -v6`).
    Compressed,

    /// The element stream is truncated or structurally invalid.
    Parse(String),
}

impl fmt::Display for MatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatError::Io(e) => write!(f, "io error: {}", e),
            MatError::BadHeader => write!(f, "not a MAT level 5 file"),
            MatError::BigEndian => write!(f, "big-endian MAT files are not supported"),
            MatError::Compressed => write!(
                f,
                "compressed MAT elements are not supported; re-export uncompressed"
            ),
            MatError::Parse(what) => write!(f, "malformed MAT element stream: {}", what),
        }
    }
}

impl std::error::Error for MatError {}

impl From<std::io::Error> for MatError {
    fn from(value: std::io::Error) -> Self {
        MatError::Io(value)
    }
}

/// One named numeric array, values in column-major order as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MatArray {
    name: String,
    dims: Vec<usize>,
    data: Vec<f64>,
}

impl MatArray {
    /// The variable name the array was saved under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The array dimensions, as stored. MATLAB arrays always have at
    /// least two.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// The raw values in column-major order.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// The value of a one-element array, however many singleton dimensions
    /// it is wrapped in. `None` if the array holds more than one value.
    pub fn scalar(&self) -> Option<f64> {
        if self.data.len() == 1 {
            Some(self.data[0])
        } else {
            None
        }
    }

    /// Element of a 3-D array at `(i, j, k)`, doing the column-major index
    /// arithmetic. `None` if the array is not 3-D or the index is out of
    /// bounds.
    pub fn get3(&self, i: usize, j: usize, k: usize) -> Option<f64> {
        match self.dims.as_slice() {
            &[d0, d1, d2] if i < d0 && j < d1 && k < d2 => {
                self.data.get(i + d0 * (j + d1 * k)).copied()
            }
            _ => None,
        }
    }
}

/// A parsed container: the named numeric arrays of one `.mat` file.
#[derive(Debug, Clone, PartialEq)]
pub struct MatFile {
    arrays: Vec<MatArray>,
}

impl MatFile {
    /// Reads and parses the container at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MatError> {
        let mut handle = File::open(path)?;
        Self::from_file(&mut handle)
    }

    /// Reads and parses a container from any [Read] source.
    pub fn from_file(file: &mut impl Read) -> Result<Self, MatError> {
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        Self::parse(&raw)
    }

    /// Parses a container from bytes already in memory.
    pub fn parse(raw: &[u8]) -> Result<Self, MatError> {
        if raw.len() < HEADER_LEN {
            return Err(MatError::BadHeader);
        }
        match &raw[126..128] {
            b"IM" => {}
            b"MI" => return Err(MatError::BigEndian),
            _ => return Err(MatError::BadHeader),
        }

        let mut arrays = Vec::new();
        let mut rest = &raw[HEADER_LEN..];
        while !rest.is_empty() {
            let (next, element) = parse_raw_element(rest)
                .finish()
                .map_err(|e: NomError<&[u8]>| {
                    MatError::Parse(format!("{:?} at byte {}", e.code, offset(raw, e.input)))
                })?;

            match element.data_type {
                MI_COMPRESSED => return Err(MatError::Compressed),
                MI_MATRIX => match parse_matrix(element.payload) {
                    Ok(Some(array)) => arrays.push(array),
                    Ok(None) => {}
                    Err(what) => return Err(MatError::Parse(what)),
                },
                other => {
                    debug!("skipping non-matrix element of type {}", other);
                }
            }
            rest = next;
        }

        Ok(MatFile { arrays })
    }

    /// Looks up an array by the name it was saved under.
    pub fn array(&self, name: &str) -> Option<&MatArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    /// The names of all decoded arrays, in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(|a| a.name.as_str())
    }
}

fn offset(whole: &[u8], rest: &[u8]) -> usize {
    whole.len() - rest.len()
}

struct RawElement<'a> {
    data_type: u32,
    payload: &'a [u8],
}

/// Parses one tagged element, handling both the full and the small form,
/// and consumes the padding that keeps the stream 8-byte aligned.
fn parse_raw_element(i: &[u8]) -> IResult<&[u8], RawElement> {
    let (i, word) = le_u32(i)?;
    if word >> 16 != 0 {
        // Small element: size in the upper half, payload in the next word.
        let data_type = word & 0xFFFF;
        let nbytes = (word >> 16) as usize;
        let (i, payload) = take(4usize)(i)?;
        if nbytes > 4 {
            return Err(NomErr::Failure(NomError::new(i, ErrorKind::Verify)));
        }
        Ok((
            i,
            RawElement {
                data_type,
                payload: &payload[..nbytes],
            },
        ))
    } else {
        let (i, nbytes) = le_u32(i)?;
        let (i, payload) = take(nbytes as usize)(i)?;
        // The final element of a file may omit its trailing pad.
        let pad = (8 - nbytes as usize % 8) % 8;
        let (i, _) = take(pad.min(i.len()))(i)?;
        Ok((
            i,
            RawElement {
                data_type: word,
                payload,
            },
        ))
    }
}

/// Decodes one `miMATRIX` payload into a named array, or `None` for array
/// kinds this reader does not handle.
fn parse_matrix(payload: &[u8]) -> Result<Option<MatArray>, String> {
    let (rest, flags) = sub_element(payload, "array flags")?;
    if flags.data_type != MI_UINT32 || flags.payload.len() < 8 {
        return Err("array flags element has the wrong type or size".to_string());
    }
    let flags_word = u32::from_le_bytes(flags.payload[..4].try_into().unwrap());
    let class = flags_word & 0xFF;
    let complex = flags_word & COMPLEX_FLAG != 0;

    let (rest, dims_el) = sub_element(rest, "dimensions")?;
    if dims_el.data_type != MI_INT32 || dims_el.payload.len() % 4 != 0 {
        return Err("dimensions element has the wrong type or size".to_string());
    }
    let dims: Vec<usize> = dims_el
        .payload
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()).max(0) as usize)
        .collect();

    let (rest, name_el) = sub_element(rest, "array name")?;
    if name_el.data_type != MI_INT8 {
        return Err("array name element has the wrong type".to_string());
    }
    let name = String::from_utf8_lossy(name_el.payload).into_owned();

    if !(MX_DOUBLE_CLASS..=MX_UINT64_CLASS).contains(&class) || complex {
        debug!(
            "skipping array {:?}: class {} complex {}",
            name, class, complex
        );
        return Ok(None);
    }

    let (_, data_el) = sub_element(rest, "real part")?;
    let data = match widen(data_el.data_type, data_el.payload) {
        Some(values) => values,
        None => {
            debug!(
                "skipping array {:?}: unsupported payload type {}",
                name, data_el.data_type
            );
            return Ok(None);
        }
    };

    let expected: usize = dims.iter().product();
    if data.len() != expected {
        return Err(format!(
            "array {:?} holds {} values but its dimensions {:?} need {}",
            name,
            data.len(),
            dims,
            expected
        ));
    }

    Ok(Some(MatArray { name, dims, data }))
}

fn sub_element<'a>(i: &'a [u8], what: &str) -> Result<(&'a [u8], RawElement<'a>), String> {
    parse_raw_element(i)
        .finish()
        .map_err(|_: NomError<&[u8]>| format!("truncated {} sub-element", what))
}

/// Widens a numeric payload to `f64`s, or `None` for payload types this
/// reader does not handle.
fn widen(data_type: u32, payload: &[u8]) -> Option<Vec<f64>> {
    fn exact<const W: usize>(payload: &[u8], f: impl Fn([u8; W]) -> f64) -> Option<Vec<f64>> {
        if payload.len() % W != 0 {
            return None;
        }
        Some(
            payload
                .chunks_exact(W)
                .map(|c| f(c.try_into().unwrap()))
                .collect(),
        )
    }

    match data_type {
        MI_DOUBLE => exact(payload, f64::from_le_bytes),
        MI_SINGLE => exact(payload, |b: [u8; 4]| f64::from(f32::from_le_bytes(b))),
        MI_INT8 => exact(payload, |b: [u8; 1]| f64::from(b[0] as i8)),
        MI_UINT8 => exact(payload, |b: [u8; 1]| f64::from(b[0])),
        MI_INT16 => exact(payload, |b: [u8; 2]| f64::from(i16::from_le_bytes(b))),
        MI_UINT16 => exact(payload, |b: [u8; 2]| f64::from(u16::from_le_bytes(b))),
        MI_INT32 => exact(payload, |b: [u8; 4]| f64::from(i32::from_le_bytes(b))),
        MI_UINT32 => exact(payload, |b: [u8; 4]| f64::from(u32::from_le_bytes(b))),
        _ => None,
    }
}

/// Builds synthetic MAT containers for tests across the crate.
#[cfg(test)]
pub(crate) mod matgen {
    use super::*;

    /// Serializes named double arrays (dims + column-major values) into a
    /// complete little-endian Level 5 container.
    pub fn mat_bytes(arrays: &[(&str, &[usize], &[f64])]) -> Vec<u8> {
        let mut out = header();
        for &(name, dims, values) in arrays {
            push_matrix(&mut out, name, dims, values);
        }
        out
    }

    pub fn header() -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN];
        let text = b"MATLAB 5.0 MAT-file, written by air2sofa tests";
        out[..text.len()].copy_from_slice(text);
        for b in out[text.len()..116].iter_mut() {
            *b = b' ';
        }
        out[124..126].copy_from_slice(&0x0100u16.to_le_bytes());
        out[126..128].copy_from_slice(b"IM");
        out
    }

    pub fn push_matrix(out: &mut Vec<u8>, name: &str, dims: &[usize], values: &[f64]) {
        assert_eq!(dims.iter().product::<usize>(), values.len());
        let mut body = Vec::new();

        push_element(&mut body, MI_UINT32, &{
            let mut p = MX_DOUBLE_CLASS.to_le_bytes().to_vec();
            p.extend_from_slice(&0u32.to_le_bytes());
            p
        });
        push_element(&mut body, MI_INT32, &{
            let mut p = Vec::new();
            for &d in dims {
                p.extend_from_slice(&(d as i32).to_le_bytes());
            }
            p
        });
        push_element(&mut body, MI_INT8, name.as_bytes());
        push_element(&mut body, MI_DOUBLE, &{
            let mut p = Vec::new();
            for &v in values {
                p.extend_from_slice(&v.to_le_bytes());
            }
            p
        });

        push_element(out, MI_MATRIX, &body);
    }

    fn push_element(out: &mut Vec<u8>, data_type: u32, payload: &[u8]) {
        out.extend_from_slice(&data_type.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        let pad = (8 - payload.len() % 8) % 8;
        out.extend_from_slice(&vec![0u8; pad]);
    }
}

//! Extraction of one AIR measurement from a parsed `.mat` container into
//! a validated [RirRecord]. All input checking happens here: required
//! variables, scalar shapes, the `(1, 2, N)` impulse response layout, and
//! a positive sampling rate. Downstream stages can assume a well-formed
//! record.

use crate::mat::{MatArray, MatError, MatFile};
use ndarray::Array3;
use std::{fmt, path::Path};

/// The variables an AIR intermediate file must carry.
const REQUIRED_FIELDS: [&str; 7] = ["IR", "fs", "room", "rir_no", "azimuth", "head", "rir_type"];

/// One binaural impulse response measurement with its metadata, shaped
/// `(measurement, channel, sample)` with exactly one measurement and the
/// two channels ordered (left, right).
#[derive(Debug, Clone, PartialEq)]
pub struct RirRecord {
    /// Impulse response samples, `(1, 2, N)`.
    pub ir: Array3<f64>,
    /// Sampling rate in hertz, strictly positive.
    pub sampling_rate_hz: f64,
    /// AIR room id.
    pub room: i32,
    /// 1-based measurement number within the room.
    pub rir_no: i32,
    /// Source azimuth in the AIR convention (0 = left, 90 = front).
    pub azimuth_deg: f64,
    /// Whether the dummy head was mounted during capture.
    pub head: bool,
    /// Capture type tag (1 binaural, 2 phone).
    pub rir_type: i32,
}

/// Why a container could not be turned into a [RirRecord].
#[derive(Debug)]
pub enum RecordError {
    /// The container itself failed to load or parse.
    Load(MatError),

    /// A required variable is missing from the container.
    MissingField(&'static str),

    /// A metadata variable holds more than one value.
    NotScalar(&'static str),

    /// The impulse response is not shaped `(1, 2, N)`.
    BadShape(Vec<usize>),

    /// The sampling rate is zero, negative, or not a number.
    BadSamplingRate(f64),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordError::Load(e) => write!(f, "{}", e),
            RecordError::MissingField(name) => {
                write!(f, "container has no variable {:?}", name)
            }
            RecordError::NotScalar(name) => {
                write!(f, "variable {:?} is not a scalar", name)
            }
            RecordError::BadShape(dims) => {
                write!(f, "IR has shape {:?}, expected (1, 2, N)", dims)
            }
            RecordError::BadSamplingRate(fs) => {
                write!(f, "sampling rate {} is not positive", fs)
            }
        }
    }
}

impl std::error::Error for RecordError {}

impl From<MatError> for RecordError {
    fn from(value: MatError) -> Self {
        RecordError::Load(value)
    }
}

impl RirRecord {
    /// Loads and validates the record stored at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        Self::from_mat(&MatFile::from_path(path)?)
    }

    /// Extracts and validates the record from an already parsed container.
    pub fn from_mat(mat: &MatFile) -> Result<Self, RecordError> {
        for name in REQUIRED_FIELDS {
            if mat.array(name).is_none() {
                return Err(RecordError::MissingField(name));
            }
        }

        let ir = extract_ir(mat.array("IR").ok_or(RecordError::MissingField("IR"))?)?;
        let sampling_rate_hz = scalar(mat, "fs")?;
        if !sampling_rate_hz.is_finite() || sampling_rate_hz <= 0.0 {
            return Err(RecordError::BadSamplingRate(sampling_rate_hz));
        }

        Ok(RirRecord {
            ir,
            sampling_rate_hz,
            room: int_scalar(mat, "room")?,
            rir_no: int_scalar(mat, "rir_no")?,
            azimuth_deg: scalar(mat, "azimuth")?,
            head: int_scalar(mat, "head")? == 1,
            rir_type: int_scalar(mat, "rir_type")?,
        })
    }

    /// Number of samples per channel.
    pub fn samples(&self) -> usize {
        self.ir.dim().2
    }
}

fn scalar(mat: &MatFile, name: &'static str) -> Result<f64, RecordError> {
    mat.array(name)
        .ok_or(RecordError::MissingField(name))?
        .scalar()
        .ok_or(RecordError::NotScalar(name))
}

/// Integer metadata arrives as doubles; round like the original tooling
/// rather than truncating.
fn int_scalar(mat: &MatFile, name: &'static str) -> Result<i32, RecordError> {
    Ok(scalar(mat, name)?.round() as i32)
}

/// Checks the `(1, 2, N)` shape and rearranges the column-major payload
/// into a row-major array.
fn extract_ir(array: &MatArray) -> Result<Array3<f64>, RecordError> {
    let n = match array.dims() {
        &[1, 2, n] if n >= 1 => n,
        dims => return Err(RecordError::BadShape(dims.to_vec())),
    };
    let values = array.values();
    // Column-major (1, 2, N): element (0, r, s) lives at r + 2 * s.
    Ok(Array3::from_shape_fn((1, 2, n), |(_, r, s)| values[r + 2 * s]))
}

//! This module persists a [SofaDescriptor] as a SOFA file and reads
//! converted files back for inspection. SOFA containers are HDF5 files
//! with netCDF-style naming: array variables become datasets (`Data.IR`,
//! `ListenerPosition`, ...), per-variable metadata become `Type`/`Units`
//! attributes on the dataset, and the global metadata become attributes
//! on the root group.

use crate::descriptor::SofaDescriptor;
use hdf5::{types::VarLenUnicode, File, Location};
use ndarray::{arr1, Array3, ArrayD, Ix3};
use std::{fmt, path::Path};

/// Failures while writing or reading a SOFA container. At the batch
/// boundary these are write errors: the record is reported failed and the
/// batch moves on.
#[derive(Debug)]
pub enum SofaError {
    /// The underlying HDF5 library rejected an operation.
    Hdf5(hdf5::Error),

    /// A metadata string could not be stored (interior NUL byte).
    BadString(String),

    /// A read-back impulse response is not a binaural `(M, 2, N)` array.
    BadShape(Vec<usize>),

    /// A read-back file is missing sample data this tool always writes.
    MissingData(&'static str),
}

impl fmt::Display for SofaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SofaError::Hdf5(e) => write!(f, "hdf5 error: {}", e),
            SofaError::BadString(s) => write!(f, "cannot store string {:?}", s),
            SofaError::BadShape(dims) => {
                write!(f, "Data.IR has shape {:?}, expected (M, 2, N)", dims)
            }
            SofaError::MissingData(what) => write!(f, "file has no usable {}", what),
        }
    }
}

impl std::error::Error for SofaError {}

impl From<hdf5::Error> for SofaError {
    fn from(value: hdf5::Error) -> Self {
        SofaError::Hdf5(value)
    }
}

/// Writes a descriptor to `path` as a `SingleRoomSRIR` SOFA file. If
/// anything fails midway the partial output is removed, so a failed record
/// never leaves a half-written container behind.
pub fn write_descriptor(path: impl AsRef<Path>, desc: &SofaDescriptor) -> Result<(), SofaError> {
    let path = path.as_ref();
    let result = write_inner(path, desc);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_inner(path: &Path, desc: &SofaDescriptor) -> Result<(), SofaError> {
    let file = File::create(path)?;

    str_attr(&file, "Conventions", "SOFA")?;
    str_attr(&file, "Version", "2.1")?;
    str_attr(&file, "SOFAConventions", "SingleRoomSRIR")?;
    str_attr(&file, "SOFAConventionsVersion", "1.0")?;
    str_attr(&file, "DataType", "FIR")?;
    str_attr(&file, "RoomType", desc.room_type)?;
    str_attr(&file, "Title", &desc.title)?;
    str_attr(&file, "AuthorContact", desc.author_contact)?;
    str_attr(&file, "Organization", desc.organization)?;
    str_attr(&file, "License", desc.license)?;
    str_attr(&file, "Comment", desc.comment)?;
    str_attr(&file, "DatabaseName", desc.database_name)?;
    str_attr(&file, "DateCreated", &desc.date_created)?;
    str_attr(&file, "DateModified", &desc.date_modified)?;

    file.new_dataset_builder()
        .with_data(&desc.ir)
        .create("Data.IR")?;
    let rate = file
        .new_dataset_builder()
        .with_data(&arr1(&[desc.sampling_rate_hz]))
        .create("Data.SamplingRate")?;
    str_attr(&rate, "Units", "hertz")?;
    file.new_dataset_builder()
        .with_data(&desc.delay)
        .create("Data.Delay")?;

    let listener = file
        .new_dataset_builder()
        .with_data(&desc.listener_position)
        .create("ListenerPosition")?;
    cartesian(&listener)?;
    let listener_view = file
        .new_dataset_builder()
        .with_data(&desc.listener_view)
        .create("ListenerView")?;
    cartesian(&listener_view)?;
    file.new_dataset_builder()
        .with_data(&desc.listener_up)
        .create("ListenerUp")?;

    let receiver = file
        .new_dataset_builder()
        .with_data(&desc.receiver_position)
        .create("ReceiverPosition")?;
    cartesian(&receiver)?;
    let receiver_view = file
        .new_dataset_builder()
        .with_data(&desc.receiver_view)
        .create("ReceiverView")?;
    cartesian(&receiver_view)?;
    file.new_dataset_builder()
        .with_data(&desc.receiver_up)
        .create("ReceiverUp")?;
    let descriptions: Vec<VarLenUnicode> = desc
        .receiver_descriptions
        .iter()
        .map(|d| unicode(d))
        .collect::<Result<_, _>>()?;
    file.new_dataset_builder()
        .with_data(&arr1(&descriptions))
        .create("ReceiverDescriptions")?;

    let source = file
        .new_dataset_builder()
        .with_data(&desc.source_position)
        .create("SourcePosition")?;
    str_attr(&source, "Type", "spherical")?;
    str_attr(&source, "Units", "degree, degree, metre")?;
    let source_view = file
        .new_dataset_builder()
        .with_data(&desc.source_view)
        .create("SourceView")?;
    cartesian(&source_view)?;
    file.new_dataset_builder()
        .with_data(&desc.source_up)
        .create("SourceUp")?;

    let emitter = file
        .new_dataset_builder()
        .with_data(&desc.emitter_position)
        .create("EmitterPosition")?;
    cartesian(&emitter)?;

    Ok(())
}

/// The sample data read back from a converted file for inspection.
#[derive(Debug, Clone)]
pub struct SofaIr {
    /// Impulse response, `(M, 2, N)`.
    pub ir: Array3<f64>,
    /// Sampling rate in hertz.
    pub sampling_rate_hz: f64,
    /// The file's title attribute, when present.
    pub title: Option<String>,
}

/// Reads the impulse response, sampling rate, and title of a SOFA file.
pub fn read_ir(path: impl AsRef<Path>) -> Result<SofaIr, SofaError> {
    let file = File::open(path)?;

    let raw: ArrayD<f64> = file.dataset("Data.IR")?.read_dyn::<f64>()?;
    let dims = raw.shape().to_vec();
    let ir = raw
        .into_dimensionality::<Ix3>()
        .map_err(|_| SofaError::BadShape(dims.clone()))?;
    if ir.dim().1 != 2 {
        return Err(SofaError::BadShape(dims));
    }

    let rate = file.dataset("Data.SamplingRate")?.read_1d::<f64>()?;
    let sampling_rate_hz = rate
        .first()
        .copied()
        .ok_or(SofaError::MissingData("sampling rate"))?;

    let title = file
        .attr("Title")
        .ok()
        .and_then(|a| a.read_scalar::<VarLenUnicode>().ok())
        .map(|t| t.as_str().to_owned());

    Ok(SofaIr {
        ir,
        sampling_rate_hz,
        title,
    })
}

fn unicode(value: &str) -> Result<VarLenUnicode, SofaError> {
    value
        .parse::<VarLenUnicode>()
        .map_err(|_| SofaError::BadString(value.to_owned()))
}

fn str_attr(location: &Location, name: &str, value: &str) -> Result<(), SofaError> {
    let attr = location.new_attr::<VarLenUnicode>().create(name)?;
    attr.write_scalar(&unicode(value)?)?;
    Ok(())
}

fn cartesian(location: &Location) -> Result<(), SofaError> {
    str_attr(location, "Type", "cartesian")?;
    str_attr(location, "Units", "metre")
}

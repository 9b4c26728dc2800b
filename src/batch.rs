//! The conversion pipeline and its batch driver. A record is loaded,
//! extracted, resolved against the tables, built into a descriptor, and
//! serialized; the batch driver runs that pipeline over every matching
//! file in a directory, converts every per-record failure into a logged
//! skip, and reports how many conversions succeeded. A failed record
//! never aborts the rest of the batch.

use crate::descriptor::SofaDescriptor;
use crate::record::{RecordError, RirRecord};
use crate::sofa::{self, SofaError};
use crate::tables::LookupError;
use globset::Glob;
use log::{info, warn};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Settings for one batch run, mirroring the converter's CLI surface.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory holding the input `.mat` files.
    pub in_dir: PathBuf,
    /// Directory the `.sofa` files are written to, created on demand.
    pub out_dir: PathBuf,
    /// Glob pattern the input file names must match.
    pub pattern: String,
    /// Rewrite outputs that already exist instead of skipping them.
    pub overwrite: bool,
}

/// What a batch run accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records converted, including outputs that already existed.
    pub converted: usize,
    /// Files matched and attempted.
    pub attempted: usize,
}

/// How a single record was completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new output file was written.
    Written(PathBuf),
    /// The output already existed and overwriting was off; counts as a
    /// success without touching the file.
    AlreadyExists(PathBuf),
}

/// Any failure of the per-record pipeline, unified so the batch driver
/// can log and skip uniformly.
#[derive(Debug)]
pub enum ConvertError {
    /// Loading or validating the input record failed.
    Record(RecordError),
    /// The room/measurement pair has no distance table entry.
    Lookup(LookupError),
    /// Serializing the descriptor failed.
    Write(SofaError),
    /// Directory handling around the conversion failed.
    Io(std::io::Error),
    /// The batch file pattern does not parse as a glob.
    Pattern(globset::Error),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConvertError::Record(e) => write!(f, "{}", e),
            ConvertError::Lookup(e) => write!(f, "{}", e),
            ConvertError::Write(e) => write!(f, "{}", e),
            ConvertError::Io(e) => write!(f, "{}", e),
            ConvertError::Pattern(e) => write!(f, "bad file pattern: {}", e),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<RecordError> for ConvertError {
    fn from(value: RecordError) -> Self {
        ConvertError::Record(value)
    }
}

impl From<LookupError> for ConvertError {
    fn from(value: LookupError) -> Self {
        ConvertError::Lookup(value)
    }
}

impl From<SofaError> for ConvertError {
    fn from(value: SofaError) -> Self {
        ConvertError::Write(value)
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(value: std::io::Error) -> Self {
        ConvertError::Io(value)
    }
}

impl From<globset::Error> for ConvertError {
    fn from(value: globset::Error) -> Self {
        ConvertError::Pattern(value)
    }
}

impl ConvertError {
    /// The tag the batch log prefixes a skipped record with.
    fn log_tag(&self) -> &'static str {
        match self {
            ConvertError::Record(RecordError::Load(_)) => "FAIL-load",
            ConvertError::Record(_) | ConvertError::Lookup(_) => "SKIP",
            ConvertError::Write(_) | ConvertError::Io(_) => "FAIL-write",
            ConvertError::Pattern(_) => "FAIL",
        }
    }
}

/// Converts a single `.mat` file into a `.sofa` file in `out_dir`. The
/// output name is derived from the record's metadata, so re-running the
/// conversion finds its own previous output.
pub fn convert_one(
    mat_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    overwrite: bool,
) -> Result<Outcome, ConvertError> {
    let record = RirRecord::from_path(mat_path)?;
    let descriptor = SofaDescriptor::from_record(&record)?;

    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    let out_path = out_dir.join(descriptor.file_name());

    if !overwrite && out_path.exists() {
        return Ok(Outcome::AlreadyExists(out_path));
    }

    sofa::write_descriptor(&out_path, &descriptor)?;
    Ok(Outcome::Written(out_path))
}

/// Runs the pipeline over every file in `in_dir` whose name matches the
/// pattern, in sorted order. Per-record failures are logged and counted;
/// only a bad pattern or an unreadable input directory fail the run
/// itself. Zero matching files is a warning, not an error.
pub fn run_batch(options: &BatchOptions) -> Result<BatchSummary, ConvertError> {
    let matcher = Glob::new(&options.pattern)?.compile_matcher();

    let mut inputs: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(&options.in_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && matcher.is_match(Path::new(&entry.file_name())) {
            inputs.push(entry.path());
        }
    }
    inputs.sort();

    if inputs.is_empty() {
        warn!(
            "no files matching {} in {}",
            options.pattern,
            options.in_dir.display()
        );
        return Ok(BatchSummary {
            converted: 0,
            attempted: 0,
        });
    }

    let mut converted = 0;
    for path in &inputs {
        match convert_one(path, &options.out_dir, options.overwrite) {
            Ok(Outcome::Written(out)) => {
                info!("[OK] {}", out.display());
                converted += 1;
            }
            Ok(Outcome::AlreadyExists(out)) => {
                info!("[EXISTS] {}", out.display());
                converted += 1;
            }
            Err(e) => {
                warn!("[{}] {} | {}", e.log_tag(), path.display(), e);
            }
        }
    }

    Ok(BatchSummary {
        converted,
        attempted: inputs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::testrec::TestRecord;
    use std::time::SystemTime;

    /// Five convertible records with distinct azimuths, so their derived
    /// output names are distinct too.
    fn valid_records() -> Vec<(String, Vec<u8>)> {
        [0.0, 15.0, 30.0, 45.0, 60.0]
            .iter()
            .enumerate()
            .map(|(i, &azimuth)| {
                let spec = TestRecord {
                    azimuth,
                    ..Default::default()
                };
                (format!("air_{}.mat", i), spec.bytes())
            })
            .collect()
    }

    fn expected_names() -> Vec<String> {
        [90.0, 75.0, 60.0, 45.0, 30.0]
            .iter()
            .map(|az| format!("AIR_room5_stairway_3m_az{}_binaural_head.sofa", az))
            .collect()
    }

    fn populate(in_dir: &Path) {
        for (name, bytes) in valid_records() {
            fs::write(in_dir.join(name), bytes).unwrap();
        }
        // Two records the pipeline must reject: one unreadable container,
        // one with a wrong measurement count.
        fs::write(in_dir.join("garbage.mat"), b"not a mat file").unwrap();
        let bad_shape = crate::mat::matgen::mat_bytes(&[
            ("IR", &[2, 2, 8], &vec![0.0; 32]),
            ("fs", &[1, 1], &[48000.0]),
            ("room", &[1, 1], &[5.0]),
            ("rir_no", &[1, 1], &[3.0]),
            ("azimuth", &[1, 1], &[0.0]),
            ("head", &[1, 1], &[1.0]),
            ("rir_type", &[1, 1], &[1.0]),
        ]);
        fs::write(in_dir.join("bad_shape.mat"), bad_shape).unwrap();
    }

    fn options(in_dir: &Path, out_dir: &Path) -> BatchOptions {
        BatchOptions {
            in_dir: in_dir.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            pattern: "*.mat".to_string(),
            overwrite: false,
        }
    }

    #[test]
    fn batch_converts_valid_and_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("mats");
        let out_dir = dir.path().join("sofas");
        fs::create_dir(&in_dir).unwrap();
        populate(&in_dir);

        let summary = run_batch(&options(&in_dir, &out_dir)).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                converted: 5,
                attempted: 7
            }
        );

        let mut written: Vec<String> = fs::read_dir(&out_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        let mut expected = expected_names();
        expected.sort();
        assert_eq!(written, expected);
    }

    #[test]
    fn rerun_without_overwrite_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("mats");
        let out_dir = dir.path().join("sofas");
        fs::create_dir(&in_dir).unwrap();
        populate(&in_dir);

        let opts = options(&in_dir, &out_dir);
        run_batch(&opts).unwrap();
        let stamps: Vec<SystemTime> = expected_names()
            .iter()
            .map(|n| fs::metadata(out_dir.join(n)).unwrap().modified().unwrap())
            .collect();

        let summary = run_batch(&opts).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                converted: 5,
                attempted: 7
            }
        );
        let after: Vec<SystemTime> = expected_names()
            .iter()
            .map(|n| fs::metadata(out_dir.join(n)).unwrap().modified().unwrap())
            .collect();
        assert_eq!(stamps, after);
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 5);
    }

    #[test]
    fn empty_match_is_a_warning_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("mats");
        fs::create_dir(&in_dir).unwrap();

        let summary = run_batch(&options(&in_dir, &dir.path().join("sofas"))).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                converted: 0,
                attempted: 0
            }
        );
    }

    #[test]
    fn pattern_narrows_the_input_set() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("mats");
        let out_dir = dir.path().join("sofas");
        fs::create_dir(&in_dir).unwrap();
        populate(&in_dir);

        let mut opts = options(&in_dir, &out_dir);
        opts.pattern = "air_0*.mat".to_string();
        let summary = run_batch(&opts).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                converted: 1,
                attempted: 1
            }
        );
    }

    #[test]
    fn convert_one_rejects_unknown_room_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let spec = TestRecord {
            room: 9.0,
            ..Default::default()
        };
        let mat_path = dir.path().join("bathroom.mat");
        fs::write(&mat_path, spec.bytes()).unwrap();

        let out_dir = dir.path().join("sofas");
        let err = convert_one(&mat_path, &out_dir, false).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Lookup(LookupError::UnknownRoom(9))
        ));
        // Rejected before any output work: not even the directory exists.
        assert!(!out_dir.exists());
    }

    #[test]
    fn overwrite_rewrites_an_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let mat_path = dir.path().join("rec.mat");
        fs::write(&mat_path, TestRecord::default().bytes()).unwrap();
        let out_dir = dir.path().join("sofas");

        let first = convert_one(&mat_path, &out_dir, false).unwrap();
        let path = match first {
            Outcome::Written(p) => p,
            other => panic!("expected a write, got {:?}", other),
        };
        assert_eq!(
            convert_one(&mat_path, &out_dir, false).unwrap(),
            Outcome::AlreadyExists(path.clone())
        );
        assert_eq!(
            convert_one(&mat_path, &out_dir, true).unwrap(),
            Outcome::Written(path)
        );
    }
}

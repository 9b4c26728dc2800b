//! This module assembles the full `SingleRoomSRIR` field bundle for one
//! measurement: fixed listener and receiver geometry, the source placed
//! from the resolved distance and converted azimuth, passthrough sample
//! data, and the provenance strings. A [SofaDescriptor] is built once per
//! record and handed to the serializer unchanged.

use crate::angles::air_to_sofa_azimuth;
use crate::record::RirRecord;
use crate::tables::{fmt_num, rir_no_to_distance, rir_type_label, room_label, LookupError};
use chrono::Local;
use ndarray::{arr2, Array2, Array3};

/// Lateral offset of each ear microphone from the listener origin, in
/// metres. The AIR documentation does not publish the exact spacing of
/// the dummy head capsules, so a nominal half head width is used.
pub const RECEIVER_OFFSET_M: f64 = 0.09;

/// Fixed provenance strings carried by every converted file.
pub const AUTHOR_CONTACT: &str = "Takamichi-lab";
const ORGANIZATION: &str = "Takamichi-lab";
const LICENSE: &str = "Research use; RIRs from AIR DB";
const COMMENT: &str = "Converted from AIR v1.4 (Aachen IR DB)";
const DATABASE_NAME: &str = "Aachen Impulse Response (AIR)";
const ROOM_TYPE: &str = "dae";

/// The assembled `SingleRoomSRIR` contents for one measurement: a single
/// stationary listener at the origin, two receivers at symmetric lateral
/// offsets, one point source in spherical coordinates, and a point
/// emitter. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SofaDescriptor {
    /// Impulse response samples, `(1, 2, N)`, passed through unchanged.
    pub ir: Array3<f64>,
    /// Sampling rate in hertz.
    pub sampling_rate_hz: f64,
    /// Per-channel delay, zeros `(1, 2)`.
    pub delay: Array2<f64>,

    /// Listener at the spatial origin, `(1, 3)` cartesian metres.
    pub listener_position: Array2<f64>,
    /// Listener facing, `+x`.
    pub listener_view: Array2<f64>,
    /// Listener up vector, `+z`.
    pub listener_up: Array2<f64>,

    /// Receiver positions `(2, 3, 1)`, left at `-x`, right at `+x`.
    pub receiver_position: Array3<f64>,
    /// Per-receiver facing, inherited from the listener.
    pub receiver_view: Array3<f64>,
    /// Per-receiver up vector, inherited from the listener.
    pub receiver_up: Array3<f64>,
    /// Channel labels, always `["left", "right"]`.
    pub receiver_descriptions: [&'static str; 2],

    /// Source in spherical coordinates `(1, 3)`: azimuth and elevation in
    /// degrees, distance in metres.
    pub source_position: Array2<f64>,
    /// Source facing, cartesian.
    pub source_view: Array2<f64>,
    /// Source up vector, cartesian.
    pub source_up: Array2<f64>,

    /// Point emitter collocated with the source origin, zeros `(1, 3, 1)`.
    pub emitter_position: Array3<f64>,

    /// Human-readable description of the measurement.
    pub title: String,
    /// Contact string for the converted dataset.
    pub author_contact: &'static str,
    /// Producing organization.
    pub organization: &'static str,
    /// Usage terms of the underlying data.
    pub license: &'static str,
    /// Conversion provenance note.
    pub comment: &'static str,
    /// Name of the source database.
    pub database_name: &'static str,
    /// SOFA room type tag.
    pub room_type: &'static str,
    /// Wall-clock build time, `YYYY-MM-DD HH:MM:SS`.
    pub date_created: String,
    /// Same stamp as [SofaDescriptor::date_created] at conversion time.
    pub date_modified: String,

    file_name: String,
}

impl SofaDescriptor {
    /// Resolves the measurement distance, converts the azimuth, and builds
    /// the descriptor. The distance lookup is the only way this can fail;
    /// the record itself was validated on extraction.
    pub fn from_record(record: &RirRecord) -> Result<Self, LookupError> {
        let distance = rir_no_to_distance(record.room, record.rir_no)?;
        let azimuth = air_to_sofa_azimuth(record.azimuth_deg);

        let room = room_label(record.room);
        let kind = rir_type_label(record.rir_type);
        let title = format!(
            "AIR room={} ({}), {} m, az={}°, {}{} (SRIR)",
            record.room,
            room,
            fmt_num(distance),
            fmt_num(azimuth),
            kind,
            if record.head { " +head" } else { "" },
        );
        let file_name = format!(
            "AIR_room{}_{}_{}m_az{}_{}{}.sofa",
            record.room,
            room,
            fmt_num(distance),
            fmt_num(azimuth),
            kind,
            if record.head { "_head" } else { "" },
        );

        let mut receiver_position = Array3::zeros((2, 3, 1));
        receiver_position[[0, 0, 0]] = -RECEIVER_OFFSET_M;
        receiver_position[[1, 0, 0]] = RECEIVER_OFFSET_M;
        let mut receiver_view = Array3::zeros((2, 3, 1));
        let mut receiver_up = Array3::zeros((2, 3, 1));
        for r in 0..2 {
            receiver_view[[r, 0, 0]] = 1.0;
            receiver_up[[r, 2, 0]] = 1.0;
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        Ok(SofaDescriptor {
            ir: record.ir.clone(),
            sampling_rate_hz: record.sampling_rate_hz,
            delay: Array2::zeros((1, 2)),

            listener_position: Array2::zeros((1, 3)),
            listener_view: arr2(&[[1.0, 0.0, 0.0]]),
            listener_up: arr2(&[[0.0, 0.0, 1.0]]),

            receiver_position,
            receiver_view,
            receiver_up,
            receiver_descriptions: ["left", "right"],

            source_position: arr2(&[[azimuth, 0.0, distance]]),
            source_view: arr2(&[[1.0, 0.0, 0.0]]),
            source_up: arr2(&[[0.0, 0.0, 1.0]]),

            emitter_position: Array3::zeros((1, 3, 1)),

            title,
            author_contact: AUTHOR_CONTACT,
            organization: ORGANIZATION,
            license: LICENSE,
            comment: COMMENT,
            database_name: DATABASE_NAME,
            room_type: ROOM_TYPE,
            date_created: now.clone(),
            date_modified: now,

            file_name,
        })
    }

    /// The deterministic output filename for this measurement. Re-running
    /// a conversion reproduces it exactly, which is what makes the
    /// overwrite-skip logic safe.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

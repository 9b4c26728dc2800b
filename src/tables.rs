//! Static lookup tables for the AIR database: which distances were measured
//! in which room, the human-readable room names, and the labels for the
//! capture types. All of it is fixed configuration data baked in at compile
//! time; nothing here mutates.

use std::fmt;

/// Measurement distances in metres per room, ordered by 1-based `rir_no`.
/// Rooms 6 through 10 appear in the AIR documentation but their distance
/// tables were never published, so they are deliberately absent here.
const BOOTH_DISTANCES: &[f64] = &[0.5, 1.0, 1.5];
const OFFICE_DISTANCES: &[f64] = &[1.0, 2.0, 3.0];
const MEETING_DISTANCES: &[f64] = &[1.45, 1.7, 1.9, 2.25, 2.8];
const LECTURE_DISTANCES: &[f64] = &[2.25, 4.0, 5.56, 7.1, 8.68, 10.2];
const STAIRWAY_DISTANCES: &[f64] = &[1.0, 2.0, 3.0];
const AULA_CAROLINA_DISTANCES: &[f64] = &[1.0, 2.0, 3.0, 5.0, 15.0, 20.0];

/// Errors from resolving a `(room, rir_no)` pair against the distance
/// tables. Either the room has no table at all, or the measurement number
/// is outside the table for a room we do know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The room id has no distance table entry.
    UnknownRoom(i32),

    /// The measurement number is outside `1..=max` for this room.
    RirNoOutOfRange {
        /// Room whose table was consulted.
        room: i32,
        /// The offending 1-based measurement number.
        rir_no: i32,
        /// Number of measurements the room's table actually holds.
        max: usize,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LookupError::UnknownRoom(room) => {
                write!(f, "room={} is not in the distance table", room)
            }
            LookupError::RirNoOutOfRange { room, rir_no, max } => {
                write!(
                    f,
                    "rir_no={} out of range for room={} (1..{})",
                    rir_no, room, max
                )
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Returns the distance table for a room, or `None` for rooms without one.
pub fn room_distances(room: i32) -> Option<&'static [f64]> {
    match room {
        1 => Some(BOOTH_DISTANCES),
        2 => Some(OFFICE_DISTANCES),
        3 => Some(MEETING_DISTANCES),
        4 => Some(LECTURE_DISTANCES),
        5 => Some(STAIRWAY_DISTANCES),
        11 => Some(AULA_CAROLINA_DISTANCES),
        _ => None,
    }
}

/// Resolves a room and 1-based measurement number to the source-to-listener
/// distance in metres.
pub fn rir_no_to_distance(room: i32, rir_no: i32) -> Result<f64, LookupError> {
    let table = room_distances(room).ok_or(LookupError::UnknownRoom(room))?;
    if rir_no < 1 || rir_no as usize > table.len() {
        return Err(LookupError::RirNoOutOfRange {
            room,
            rir_no,
            max: table.len(),
        });
    }
    Ok(table[rir_no as usize - 1])
}

/// The published name of a room, if the AIR documentation has one.
pub fn room_name(room: i32) -> Option<&'static str> {
    match room {
        1 => Some("booth"),
        2 => Some("office"),
        3 => Some("meeting"),
        4 => Some("lecture"),
        5 => Some("stairway"),
        6 => Some("stairway1"),
        7 => Some("stairway2"),
        8 => Some("corridor"),
        9 => Some("bathroom"),
        10 => Some("lecture1"),
        11 => Some("aula_carolina"),
        _ => None,
    }
}

/// Room name with a synthesized `room{N}` fallback, so titles and filenames
/// can be generated for any id.
pub fn room_label(room: i32) -> String {
    match room_name(room) {
        Some(name) => name.to_string(),
        None => format!("room{}", room),
    }
}

/// Label for the capture type tag: 1 is a binaural (dummy head or HATS)
/// measurement, 2 is a mock-up phone capture, anything else falls back to
/// `type{N}`.
pub fn rir_type_label(rir_type: i32) -> String {
    match rir_type {
        1 => "binaural".to_string(),
        2 => "phone".to_string(),
        n => format!("type{}", n),
    }
}

/// Shortest decimal rendering of a number, the `%g` style used in titles
/// and filenames: `3.0` prints as `3`, `1.45` stays `1.45`.
pub fn fmt_num(x: f64) -> String {
    format!("{}", x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_entry_resolves_exactly() {
        for room in [1, 2, 3, 4, 5, 11] {
            let table = room_distances(room).unwrap();
            for (i, &expected) in table.iter().enumerate() {
                let got = rir_no_to_distance(room, (i + 1) as i32).unwrap();
                assert_eq!(got, expected, "room={} rir_no={}", room, i + 1);
            }
        }
    }

    #[test]
    fn known_distances_spot_checks() {
        assert_eq!(rir_no_to_distance(1, 1).unwrap(), 0.5);
        assert_eq!(rir_no_to_distance(3, 5).unwrap(), 2.8);
        assert_eq!(rir_no_to_distance(4, 3).unwrap(), 5.56);
        assert_eq!(rir_no_to_distance(5, 3).unwrap(), 3.0);
        assert_eq!(rir_no_to_distance(11, 6).unwrap(), 20.0);
    }

    #[test]
    fn unknown_rooms_are_lookup_errors() {
        for room in [0, -1, 6, 7, 8, 9, 10, 12, 99] {
            assert_eq!(
                rir_no_to_distance(room, 1),
                Err(LookupError::UnknownRoom(room)),
                "room={}",
                room
            );
        }
    }

    #[test]
    fn out_of_range_rir_no_is_a_range_error() {
        for rir_no in [0, -1, 4, 100] {
            assert_eq!(
                rir_no_to_distance(5, rir_no),
                Err(LookupError::RirNoOutOfRange {
                    room: 5,
                    rir_no,
                    max: 3
                }),
                "rir_no={}",
                rir_no
            );
        }
    }

    #[test]
    fn room_labels_fall_back_to_synthesized_names() {
        assert_eq!(room_label(5), "stairway");
        assert_eq!(room_label(11), "aula_carolina");
        assert_eq!(room_label(42), "room42");
    }

    #[test]
    fn rir_type_labels() {
        assert_eq!(rir_type_label(1), "binaural");
        assert_eq!(rir_type_label(2), "phone");
        assert_eq!(rir_type_label(3), "type3");
        assert_eq!(rir_type_label(-7), "type-7");
    }

    #[test]
    fn fmt_num_drops_trailing_zeros() {
        assert_eq!(fmt_num(3.0), "3");
        assert_eq!(fmt_num(1.45), "1.45");
        assert_eq!(fmt_num(15.0), "15");
        assert_eq!(fmt_num(0.5), "0.5");
        assert_eq!(fmt_num(-90.0), "-90");
    }
}

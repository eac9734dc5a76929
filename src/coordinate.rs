//! Degrees/minutes/seconds to signed decimal degrees.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Degrees, minutes and seconds as unsigned magnitudes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl Dms {
    pub fn new(degrees: f64, minutes: f64, seconds: f64) -> Dms {
        Dms {
            degrees,
            minutes,
            seconds,
        }
    }
}

/// GPS reference letter as stored next to a coordinate in EXIF.
///
/// Anything but an uppercase N/S/E/W is kept as `Other` and never negates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
    Other(char),
}

impl Hemisphere {
    pub fn from_letter(letter: char) -> Hemisphere {
        match letter {
            'N' => Hemisphere::North,
            'S' => Hemisphere::South,
            'E' => Hemisphere::East,
            'W' => Hemisphere::West,
            other => Hemisphere::Other(other),
        }
    }

    fn is_negative(self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
            Hemisphere::Other(c) => *c,
        };
        write!(f, "{}", letter)
    }
}

/// A decimal latitude/longitude pair.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Signed decimal degrees for a DMS coordinate. No range checking.
pub fn to_decimal(coordinate: Dms, direction: Hemisphere) -> f64 {
    let decimal =
        coordinate.degrees + coordinate.minutes / 60.0 + coordinate.seconds / 3600.0;
    if direction.is_negative() {
        -decimal
    } else {
        decimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero_in_every_hemisphere() {
        for letter in ['N', 'S', 'E', 'W'] {
            let value = to_decimal(Dms::new(0.0, 0.0, 0.0), Hemisphere::from_letter(letter));
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn south_and_west_are_negative() {
        let dms = Dms::new(45.0, 30.0, 0.0);

        assert_eq!(to_decimal(dms, Hemisphere::North), 45.5);
        assert_eq!(to_decimal(dms, Hemisphere::South), -45.5);
        assert_eq!(to_decimal(dms, Hemisphere::East), 45.5);
        assert_eq!(to_decimal(dms, Hemisphere::West), -45.5);
    }

    #[test]
    fn seconds_contribute() {
        let value = to_decimal(Dms::new(10.0, 0.0, 36.0), Hemisphere::North);

        assert!((value - 10.01).abs() < 1e-12);
    }

    #[test]
    fn unknown_letter_passes_through() {
        let hemisphere = Hemisphere::from_letter('X');

        assert_eq!(hemisphere, Hemisphere::Other('X'));
        assert_eq!(to_decimal(Dms::new(12.0, 0.0, 0.0), hemisphere), 12.0);
    }

    #[test]
    fn lowercase_letters_are_not_hemispheres() {
        let south = Hemisphere::from_letter('s');

        assert_eq!(south, Hemisphere::Other('s'));
        assert_eq!(south.to_string(), "s");
        assert_eq!(to_decimal(Dms::new(45.0, 30.0, 0.0), south), 45.5);
        assert_eq!(
            to_decimal(Dms::new(45.0, 30.0, 0.0), Hemisphere::from_letter('w')),
            45.5
        );
    }
}

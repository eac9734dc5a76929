use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use chrono::NaiveDateTime;
use exif::{Exif, In, Tag, Value};
use serde::{Deserialize, Serialize};

use crate::coordinate::{self, Coordinates, Dms, Hemisphere};
use crate::error::MetadataError;

pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

// Long tags nobody reads back from the dump
const SKIPPED_TAGS: [&str; 4] = ["XPComment", "XPKeywords", "BodySerialNumber", "MakerNote"];

/// Raw GPS fields as they sit in the EXIF GPS IFD.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RawGps {
    pub latitude: Dms,
    pub latitude_ref: Hemisphere,
    pub longitude: Dms,
    pub longitude_ref: Hemisphere,
}

impl RawGps {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: coordinate::to_decimal(self.latitude, self.latitude_ref),
            longitude: coordinate::to_decimal(self.longitude, self.longitude_ref),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub file_name: String,
    #[serde(rename = "date")]
    pub timestamp: NaiveDateTime,
    pub gps: RawGps,
}

/// Everything extracted from one photo. This is also the audit record.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PhotoMetadata {
    #[serde(flatten)]
    pub record: PhotoRecord,
    pub tags: BTreeMap<String, String>,
}

pub trait MetadataSource {
    fn extract(&self, path: &Path) -> Result<PhotoMetadata, MetadataError>;
}

/// Reads metadata with kamadak-exif.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifMetadataSource;

impl MetadataSource for ExifMetadataSource {
    fn extract(&self, path: &Path) -> Result<PhotoMetadata, MetadataError> {
        let file = File::open(path).map_err(|source| MetadataError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut bufreader = BufReader::new(&file);
        let exif = exif::Reader::new()
            .read_from_container(&mut bufreader)
            .map_err(|source| MetadataError::Exif {
                path: path.to_path_buf(),
                source,
            })?;

        let datetime = required(&exif, path, Tag::DateTime, "DateTime")?;
        let timestamp =
            parse_timestamp(datetime).ok_or_else(|| MetadataError::InvalidTimestamp {
                path: path.to_path_buf(),
                value: ascii_text(datetime).unwrap_or_default(),
            })?;

        let invalid = |reason: &str| MetadataError::InvalidGps {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let gps = RawGps {
            latitude: dms_from_value(required(&exif, path, Tag::GPSLatitude, "GPSLatitude")?)
                .ok_or_else(|| invalid("latitude is not a DMS triple"))?,
            latitude_ref: hemisphere_from_value(required(
                &exif,
                path,
                Tag::GPSLatitudeRef,
                "GPSLatitudeRef",
            )?)
            .ok_or_else(|| invalid("latitude reference is empty"))?,
            longitude: dms_from_value(required(&exif, path, Tag::GPSLongitude, "GPSLongitude")?)
                .ok_or_else(|| invalid("longitude is not a DMS triple"))?,
            longitude_ref: hemisphere_from_value(
                required(&exif, path, Tag::GPSLongitudeRef, "GPSLongitudeRef")?,
            )
            .ok_or_else(|| invalid("longitude reference is empty"))?,
        };

        let tags = exif
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .map(|f| (f.tag.to_string(), f.display_value().to_string()))
            .filter(|(name, _)| !SKIPPED_TAGS.contains(&name.as_str()))
            .collect();

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(PhotoMetadata {
            record: PhotoRecord {
                file_name,
                timestamp,
                gps,
            },
            tags,
        })
    }
}

fn required<'e>(
    exif: &'e Exif,
    path: &Path,
    tag: Tag,
    name: &'static str,
) -> Result<&'e Value, MetadataError> {
    exif.get_field(tag, In::PRIMARY)
        .map(|f| &f.value)
        .ok_or_else(|| MetadataError::MissingTag {
            path: path.to_path_buf(),
            tag: name,
        })
}

fn ascii_text(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| bytes.iter().map(|byte| *byte as char).collect()),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = ascii_text(value)?;
    NaiveDateTime::parse_from_str(text.trim_end_matches('\0').trim(), EXIF_DATE_FORMAT).ok()
}

fn hemisphere_from_value(value: &Value) -> Option<Hemisphere> {
    ascii_text(value)?
        .chars()
        .find(|c| !c.is_whitespace() && *c != '\0')
        .map(Hemisphere::from_letter)
}

fn dms_from_value(value: &Value) -> Option<Dms> {
    match value {
        Value::Rational(parts) if parts.len() >= 3 => Some(Dms::new(
            parts[0].to_f64(),
            parts[1].to_f64(),
            parts[2].to_f64(),
        )),
        Value::SRational(parts) if parts.len() >= 3 => Some(Dms::new(
            parts[0].to_f64().abs(),
            parts[1].to_f64().abs(),
            parts[2].to_f64().abs(),
        )),
        _ => None,
    }
}

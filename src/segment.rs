//! Grouping of time-ordered photos into visits.
//!
//! Every photo is compared against the timestamp of the *first* photo of the
//! run. A photo further away than the threshold opens a new visit, which is
//! named by reverse geocoding that photo's position. Visits whose names
//! collide are merged, and the photo then joins whichever visit was created
//! last.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::coordinate::Coordinates;
use crate::error::GeocodeError;
use crate::geocode::{GeocodeService, PlaceNameResolver};
use crate::photo_metadata::PhotoRecord;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Visit {
    pub label: String,
    /// Position of the photo that opened the visit.
    pub coordinates: Coordinates,
    /// Baseline the gap test measured against.
    pub anchor: NaiveDateTime,
    pub files: Vec<String>,
}

pub struct VisitSegmenter<'a, G> {
    resolver: &'a PlaceNameResolver<G>,
    threshold: TimeDelta,
}

impl<'a, G: GeocodeService> VisitSegmenter<'a, G> {
    pub fn new(resolver: &'a PlaceNameResolver<G>, threshold: TimeDelta) -> VisitSegmenter<'a, G> {
        VisitSegmenter {
            resolver,
            threshold,
        }
    }

    /// Partitions `records` into visits in creation order. The first
    /// geocoding failure aborts the whole pass.
    pub fn segment(&self, records: &[PhotoRecord]) -> Result<Vec<Visit>, GeocodeError> {
        let mut visits: Vec<Visit> = Vec::new();
        let Some(anchor) = records.first().map(|record| record.timestamp) else {
            return Ok(visits);
        };

        for (index, record) in records.iter().enumerate() {
            let gap = (record.timestamp - anchor).abs();
            if index == 0 || gap > self.threshold {
                let label = self.resolver.resolve(&record.gps)?;
                if visits.iter().any(|visit| visit.label == label) {
                    tracing::debug!("{} rejoins existing place {:?}", record.file_name, label);
                } else {
                    tracing::debug!("{} opens visit {:?}", record.file_name, label);
                    visits.push(Visit {
                        label,
                        coordinates: record.gps.coordinates(),
                        anchor,
                        files: Vec::new(),
                    });
                }
            }

            // Always the most recently created visit, even after a merge
            if let Some(visit) = visits.last_mut() {
                visit.files.push(record.file_name.clone());
            }
        }

        Ok(visits)
    }
}

/// Place label to file names, in the order places were first seen.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrganizationPlan {
    groups: Vec<(String, Vec<String>)>,
}

impl OrganizationPlan {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(label, files)| (label.as_str(), files.as_slice()))
    }

    pub fn files(&self, label: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, files)| files.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|(_, files)| files.len()).sum()
    }
}

impl From<Vec<Visit>> for OrganizationPlan {
    fn from(visits: Vec<Visit>) -> Self {
        let mut plan = OrganizationPlan::default();
        for visit in visits {
            match plan.groups.iter_mut().find(|(label, _)| *label == visit.label) {
                Some((_, files)) => files.extend(visit.files),
                None => plan.groups.push((visit.label, visit.files)),
            }
        }
        plan
    }
}

impl Serialize for OrganizationPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (label, files) in &self.groups {
            map.serialize_entry(label, files)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::geocode::tests::{gps_at, FakeGeocoder};

    fn at_minute(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + TimeDelta::minutes(minute)
    }

    fn photo(name: &str, minute: i64, latitude: f64) -> PhotoRecord {
        PhotoRecord {
            file_name: name.to_string(),
            timestamp: at_minute(minute),
            gps: gps_at(latitude),
        }
    }

    fn places() -> PlaceNameResolver<FakeGeocoder> {
        PlaceNameResolver::new(
            FakeGeocoder::default()
                .with_place(10, "1", "1 Park Ave")
                .with_place(20, "2", "2 Lake Rd")
                .with_place(30, "3", "3 Hill St"),
        )
    }

    fn plan_of(records: &[PhotoRecord]) -> OrganizationPlan {
        let resolver = places();
        let segmenter = VisitSegmenter::new(&resolver, TimeDelta::minutes(30));
        OrganizationPlan::from(segmenter.segment(records).unwrap())
    }

    #[test]
    fn empty_input_has_no_visits() {
        let resolver = places();
        let segmenter = VisitSegmenter::new(&resolver, TimeDelta::minutes(30));

        assert!(segmenter.segment(&[]).unwrap().is_empty());
    }

    #[test]
    fn single_photo_is_one_visit() {
        let resolver = places();
        let segmenter = VisitSegmenter::new(&resolver, TimeDelta::minutes(30));

        let visits = segmenter.segment(&[photo("A", 0, 10.0)]).unwrap();

        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].label, "Park Ave");
        assert_eq!(visits[0].files, vec!["A"]);
        assert_eq!(visits[0].anchor, at_minute(0));
        assert_eq!(visits[0].coordinates.latitude, 10.0);
    }

    #[test]
    fn gap_beyond_threshold_splits() {
        let plan = plan_of(&[photo("A", 0, 10.0), photo("B", 31, 20.0)]);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.files("Park Ave").unwrap(), ["A"]);
        assert_eq!(plan.files("Lake Rd").unwrap(), ["B"]);
    }

    #[test]
    fn gap_within_threshold_stays() {
        let plan = plan_of(&[photo("A", 0, 10.0), photo("B", 29, 20.0)]);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.files("Park Ave").unwrap(), ["A", "B"]);
    }

    #[test]
    fn gap_equal_to_threshold_stays() {
        let plan = plan_of(&[photo("A", 0, 10.0), photo("B", 30, 20.0)]);

        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn gap_just_past_threshold_splits() {
        let mut late = photo("B", 30, 20.0);
        late.timestamp += TimeDelta::milliseconds(500);

        let plan = plan_of(&[photo("A", 0, 10.0), late]);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.files("Lake Rd").unwrap(), ["B"]);
    }

    #[test]
    fn gap_is_measured_from_first_photo() {
        // 25 minutes between B and C, but C is 50 minutes after A
        let plan = plan_of(&[
            photo("A", 0, 10.0),
            photo("B", 25, 10.0),
            photo("C", 50, 20.0),
        ]);

        assert_eq!(plan.files("Park Ave").unwrap(), ["A", "B"]);
        assert_eq!(plan.files("Lake Rd").unwrap(), ["C"]);
    }

    #[test]
    fn earlier_timestamps_count_by_absolute_gap() {
        let plan = plan_of(&[photo("A", 60, 10.0), photo("B", 0, 20.0)]);

        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn three_photo_scenario() {
        let plan = plan_of(&[
            photo("A", 0, 10.0),
            photo("B", 10, 10.0),
            photo("C", 40, 20.0),
        ]);

        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(json, r#"{"Park Ave":["A","B"],"Lake Rd":["C"]}"#);
    }

    #[test]
    fn colliding_label_joins_last_created_visit() {
        let plan = plan_of(&[
            photo("A", 0, 10.0),
            photo("B", 40, 20.0),
            photo("C", 80, 10.0),
        ]);

        assert_eq!(plan.labels().collect::<Vec<_>>(), ["Park Ave", "Lake Rd"]);
        assert_eq!(plan.files("Park Ave").unwrap(), ["A"]);
        assert_eq!(plan.files("Lake Rd").unwrap(), ["B", "C"]);
    }

    #[test]
    fn every_file_lands_in_exactly_one_visit() {
        let records: Vec<PhotoRecord> = (0..12)
            .map(|i| {
                let latitude = [10.0, 20.0, 30.0][i % 3];
                photo(&format!("IMG_{:04}", i), (i as i64) * 17, latitude)
            })
            .collect();

        let plan = plan_of(&records);

        let mut seen = HashSet::new();
        for (_, files) in plan.iter() {
            for file in files {
                assert!(seen.insert(file.clone()), "{} placed twice", file);
            }
        }
        assert_eq!(seen.len(), records.len());
        assert_eq!(plan.file_count(), records.len());
    }

    #[test]
    fn geocode_failure_aborts() {
        let resolver = places();
        let segmenter = VisitSegmenter::new(&resolver, TimeDelta::minutes(30));

        let err = segmenter
            .segment(&[photo("A", 0, 10.0), photo("B", 45, 80.0)])
            .unwrap_err();

        assert!(matches!(err, GeocodeError::NoResults));
    }

    #[test]
    fn only_new_visits_are_geocoded() {
        let resolver = places();
        let segmenter = VisitSegmenter::new(&resolver, TimeDelta::minutes(30));

        segmenter
            .segment(&[photo("A", 0, 10.0), photo("B", 5, 10.0), photo("C", 10, 10.0)])
            .unwrap();

        assert_eq!(resolver.service().calls.borrow().len(), 1);
    }
}

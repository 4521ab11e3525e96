//! Purpose: In-memory catalog of locations with postal-code lookup and nearest-city search.
//! Exports: `LocationCatalog`.
//! Role: Sole owner of every `Location`; indexes refer to records by position.
//! Invariants: Record ids are unique; postal-code collisions resolve to the last record.
//! Invariants: A memoized nearest neighbor is never the record itself and never changes.
//! Notes: Interior mutability (`RefCell`/`Cell`) keeps queries on `&self`; not `Sync`.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::decode::{DecodedTable, decode_table_str};
use crate::core::error::{Error, ErrorKind};
use crate::core::location::{Location, REQUIRED_COLUMNS};
use crate::core::source::read_dataset;

const DEFAULT_SEPARATOR: char = ',';

#[derive(Debug)]
pub struct LocationCatalog {
    locations: Vec<Location>,
    by_postal_code: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    nearest: RefCell<HashMap<usize, usize>>,
    postal_code_collisions: usize,
    distance_evaluations: Cell<u64>,
}

impl LocationCatalog {
    pub fn new(locations: Vec<Location>) -> Result<Self, Error> {
        let mut by_id = HashMap::with_capacity(locations.len());
        let mut by_postal_code = HashMap::new();
        let mut postal_code_collisions = 0;

        for (index, location) in locations.iter().enumerate() {
            match by_id.entry(location.id.clone()) {
                Entry::Occupied(_) => {
                    return Err(Error::new(ErrorKind::MalformedInput)
                        .with_message(format!("duplicate record id {:?}", location.id))
                        .with_field(crate::core::location::ID));
                }
                Entry::Vacant(slot) => {
                    slot.insert(index);
                }
            }

            for code in &location.postal_codes {
                if let Some(previous) = by_postal_code.insert(code.clone(), index) {
                    postal_code_collisions += 1;
                    warn!(
                        postal_code = %code,
                        previous_id = %locations[previous].id,
                        id = %location.id,
                        "postal code claimed by more than one record; keeping the later one"
                    );
                }
            }
        }

        Ok(Self {
            locations,
            by_postal_code,
            by_id,
            nearest: RefCell::new(HashMap::new()),
            postal_code_collisions,
            distance_evaluations: Cell::new(0),
        })
    }

    /// Validates the header before building records, so a header-only dataset
    /// with missing columns is rejected too.
    pub fn from_table(table: DecodedTable) -> Result<Self, Error> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|&column| !table.has_column(column))
            .collect();
        if !missing.is_empty() {
            return Err(Error::new(ErrorKind::MalformedInput)
                .with_message(format!("header is missing columns: {}", missing.join(", ")))
                .with_line(1));
        }

        let locations = table
            .records()
            .iter()
            .map(Location::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(locations)
    }

    pub fn from_csv_str(text: &str) -> Result<Self, Error> {
        Self::from_delimited_str(text, DEFAULT_SEPARATOR)
    }

    pub fn from_delimited_str(text: &str, separator: char) -> Result<Self, Error> {
        Self::from_table(decode_table_str(text, separator)?)
    }

    pub fn open(path: &Path) -> Result<Self, Error> {
        Self::open_with_separator(path, DEFAULT_SEPARATOR)
    }

    pub fn open_with_separator(path: &Path, separator: char) -> Result<Self, Error> {
        let text = read_dataset(path)?;
        let catalog = Self::from_delimited_str(&text, separator).map_err(|err| {
            if err.path().is_some() {
                err
            } else {
                err.with_path(path)
            }
        })?;
        info!(
            path = %path.display(),
            locations = catalog.len(),
            postal_codes = catalog.postal_code_count(),
            "loaded location catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn postal_code_count(&self) -> usize {
        self.by_postal_code.len()
    }

    /// Number of index entries that were overwritten by a later record.
    pub fn postal_code_collisions(&self) -> usize {
        self.postal_code_collisions
    }

    /// Distance computations performed by nearest-neighbor scans so far.
    pub fn distance_evaluations(&self) -> u64 {
        self.distance_evaluations.get()
    }

    pub fn lookup_by_postal_code(&self, code: &str) -> Result<&Location, Error> {
        self.position_of(code).map(|index| &self.locations[index])
    }

    pub fn lookup_by_id(&self, id: &str) -> Result<&Location, Error> {
        self.by_id
            .get(id)
            .map(|&index| &self.locations[index])
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound).with_message(format!("no location with id {id:?}"))
            })
    }

    pub fn nearest_to(&self, code: &str) -> Result<&Location, Error> {
        let origin = self.position_of(code)?;
        let nearest = self.nearest_position(origin)?;
        Ok(&self.locations[nearest])
    }

    /// Like `nearest_to`, also returning the distance in miles.
    pub fn nearest_with_distance(&self, code: &str) -> Result<(&Location, f64), Error> {
        let origin = self.position_of(code)?;
        let nearest = &self.locations[self.nearest_position(origin)?];
        Ok((nearest, self.locations[origin].distance_to(nearest)))
    }

    fn position_of(&self, code: &str) -> Result<usize, Error> {
        self.by_postal_code.get(code).copied().ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message(format!("no location for postal code {code:?}"))
        })
    }

    fn nearest_position(&self, origin: usize) -> Result<usize, Error> {
        if let Some(&cached) = self.nearest.borrow().get(&origin) {
            debug!(id = %self.locations[origin].id, "nearest location served from memo");
            return Ok(cached);
        }

        let source = &self.locations[origin];
        let mut best: Option<(usize, f64)> = None;
        for (index, candidate) in self.locations.iter().enumerate() {
            if index == origin {
                continue;
            }
            let distance = source.distance_to(candidate);
            self.distance_evaluations
                .set(self.distance_evaluations.get() + 1);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }

        let Some((winner, distance)) = best else {
            return Err(Error::new(ErrorKind::NotFound)
                .with_message(format!("no other location to compare with {:?}", source.id)));
        };
        debug!(
            id = %source.id,
            nearest_id = %self.locations[winner].id,
            miles = distance,
            "computed nearest location"
        );
        self.nearest.borrow_mut().insert(origin, winner);
        Ok(winner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::LocationCatalog;
    use crate::core::error::ErrorKind;
    use crate::core::location::Location;

    fn location(id: &str, lat: f64, lng: f64, zips: &[&str]) -> Location {
        Location {
            city: format!("City {id}"),
            city_ascii: format!("City {id}"),
            state_id: "PA".to_string(),
            state_name: "Pennsylvania".to_string(),
            county_fips: "42101".to_string(),
            county_name: "Philadelphia".to_string(),
            lat,
            lng,
            population: 1000.0,
            density: 10.0,
            source: "polygon".to_string(),
            military: false,
            incorporated: true,
            timezone: "America/New_York".to_string(),
            ranking: "3".to_string(),
            postal_codes: zips.iter().map(|z| z.to_string()).collect::<BTreeSet<_>>(),
            id: id.to_string(),
        }
    }

    #[test]
    fn lookup_returns_owner_of_code() {
        let catalog = LocationCatalog::new(vec![
            location("1", 40.0, -75.0, &["10001", "10009"]),
            location("2", 41.0, -75.0, &["10002"]),
        ])
        .expect("catalog");
        let found = catalog.lookup_by_postal_code("10009").expect("found");
        assert_eq!(found.id, "1");
        assert!(found.has_postal_code("10009"));
        assert_eq!(catalog.postal_code_count(), 3);

        let err = catalog.lookup_by_postal_code("00000").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn later_record_wins_postal_code_collision() {
        let catalog = LocationCatalog::new(vec![
            location("1", 40.0, -75.0, &["10001"]),
            location("2", 41.0, -75.0, &["10001", "10002"]),
        ])
        .expect("catalog");
        assert_eq!(catalog.lookup_by_postal_code("10001").expect("found").id, "2");
        assert_eq!(catalog.postal_code_collisions(), 1);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = LocationCatalog::new(vec![
            location("1", 40.0, -75.0, &["10001"]),
            location("1", 41.0, -75.0, &["10002"]),
        ])
        .expect_err("duplicate id");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn nearest_picks_smallest_distance() {
        // ~100 miles north vs ~50 miles north of the origin
        let catalog = LocationCatalog::new(vec![
            location("x", 40.0, -75.0, &["10000"]),
            location("a", 40.0 + 100.0 / 69.09, -75.0, &["10100"]),
            location("b", 40.0 + 50.0 / 69.09, -75.0, &["10050"]),
        ])
        .expect("catalog");
        let nearest = catalog.nearest_to("10000").expect("nearest");
        assert_eq!(nearest.id, "b");

        let (nearest, miles) = catalog.nearest_with_distance("10000").expect("nearest");
        assert_eq!(nearest.id, "b");
        assert!((miles - 50.0).abs() < 0.5, "{miles}");
    }

    #[test]
    fn nearest_is_memoized() {
        let catalog = LocationCatalog::new(vec![
            location("1", 40.0, -75.0, &["10001"]),
            location("2", 40.1, -75.0, &["10002"]),
            location("3", 41.0, -75.0, &["10003"]),
        ])
        .expect("catalog");

        let first = catalog.nearest_to("10001").expect("first").id.clone();
        let after_first = catalog.distance_evaluations();
        assert_eq!(after_first, 2);

        let second = catalog.nearest_to("10001").expect("second").id.clone();
        assert_eq!(first, second);
        assert_eq!(catalog.distance_evaluations(), after_first);
    }

    #[test]
    fn nearest_excludes_self_even_with_shared_coordinates() {
        let catalog = LocationCatalog::new(vec![
            location("1", 40.0, -75.0, &["10001"]),
            location("2", 40.0, -75.0, &["10002"]),
            location("3", 40.5, -75.0, &["10003"]),
        ])
        .expect("catalog");
        assert_eq!(catalog.nearest_to("10001").expect("nearest").id, "2");
        assert_eq!(catalog.nearest_to("10002").expect("nearest").id, "1");
    }

    #[test]
    fn equidistant_candidates_keep_catalog_order() {
        // east and west mirror each other along the same parallel
        let catalog = LocationCatalog::new(vec![
            location("east", 40.0, -74.0, &["30001"]),
            location("origin", 40.0, -75.0, &["30000"]),
            location("west", 40.0, -76.0, &["30002"]),
        ])
        .expect("catalog");
        assert_eq!(catalog.nearest_to("30000").expect("nearest").id, "east");

        let reversed = LocationCatalog::new(vec![
            location("west", 40.0, -76.0, &["30002"]),
            location("origin", 40.0, -75.0, &["30000"]),
            location("east", 40.0, -74.0, &["30001"]),
        ])
        .expect("catalog");
        assert_eq!(reversed.nearest_to("30000").expect("nearest").id, "west");
    }

    #[test]
    fn single_record_has_no_neighbor() {
        let catalog =
            LocationCatalog::new(vec![location("1", 40.0, -75.0, &["10001"])]).expect("catalog");
        let err = catalog.nearest_to("10001").expect_err("no neighbor");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn unknown_code_fails_before_scanning() {
        let catalog = LocationCatalog::new(vec![
            location("1", 40.0, -75.0, &["10001"]),
            location("2", 40.1, -75.0, &["10002"]),
        ])
        .expect("catalog");
        let err = catalog.nearest_to("00000").expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(catalog.distance_evaluations(), 0);
    }

    #[test]
    fn lookup_by_id_finds_record() {
        let catalog = LocationCatalog::new(vec![location("42", 40.0, -75.0, &["10001"])])
            .expect("catalog");
        assert_eq!(catalog.lookup_by_id("42").expect("found").postal_codes.len(), 1);
        assert_eq!(
            catalog.lookup_by_id("43").expect_err("missing").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn header_must_declare_required_columns() {
        let err = LocationCatalog::from_csv_str("city,lat,lng\nX,40,-75\n")
            .expect_err("missing columns");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(err.message().expect("message").contains("zips"));
    }

    #[test]
    fn header_only_dataset_still_checks_columns() {
        let err = LocationCatalog::from_csv_str("foo,bar\n").expect_err("missing columns");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert_eq!(err.line(), Some(1));

        let catalog = LocationCatalog::from_csv_str(
            "city,state_name,lat,lng,population,density,timezone,zips,id\n",
        )
        .expect("valid empty catalog");
        assert!(catalog.is_empty());
    }

    #[test]
    fn numeric_columns_are_required_in_header() {
        let err = LocationCatalog::from_csv_str(
            "city,state_name,lat,lng,timezone,zips,id\nX,S,40,-75,tz,10001,1\n",
        )
        .expect_err("missing numeric columns");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        let message = err.message().expect("message");
        assert!(message.contains("population"), "{message}");
        assert!(message.contains("density"), "{message}");
    }

    #[test]
    fn empty_dataset_is_malformed() {
        let err = LocationCatalog::from_csv_str("").expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn open_attaches_path_to_decode_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("cities.csv");
        std::fs::write(
            &path,
            "city,state_name,lat,lng,population,density,timezone,zips,id\nX,S,oops,-75,1,1,tz,10001,1\n",
        )
        .expect("write");
        let err = LocationCatalog::open(&path).expect_err("bad lat");
        assert_eq!(err.kind(), ErrorKind::InvalidNumericField);
        assert_eq!(err.path(), Some(path.as_path()));
        assert_eq!(err.line(), Some(2));
    }
}

//! Purpose: Typed, validated city record built from one decoded row.
//! Exports: `Location`, column name constants, `REQUIRED_COLUMNS`.
//! Role: Value object owned by the catalog; never mutated after construction.
//! Invariants: Numeric fields are finite; lat ∈ [-90, 90], lng ∈ [-180, 180].
//! Invariants: Boolean columns are true only for the exact token `TRUE`.
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::core::decode::RawRecord;
use crate::core::distance::{Coordinates, haversine_miles};
use crate::core::error::{Error, ErrorKind};

pub const CITY: &str = "city";
pub const CITY_ASCII: &str = "city_ascii";
pub const STATE_ID: &str = "state_id";
pub const STATE_NAME: &str = "state_name";
pub const COUNTY_FIPS: &str = "county_fips";
pub const COUNTY_NAME: &str = "county_name";
pub const LAT: &str = "lat";
pub const LNG: &str = "lng";
pub const POPULATION: &str = "population";
pub const DENSITY: &str = "density";
pub const SOURCE: &str = "source";
pub const MILITARY: &str = "military";
pub const INCORPORATED: &str = "incorporated";
pub const TIMEZONE: &str = "timezone";
pub const RANKING: &str = "ranking";
pub const ZIPS: &str = "zips";
pub const ID: &str = "id";

/// Columns a dataset header must declare to be loadable.
pub const REQUIRED_COLUMNS: &[&str] = &[
    CITY, STATE_NAME, LAT, LNG, POPULATION, DENSITY, TIMEZONE, ZIPS, ID,
];

const TRUE_TOKEN: &str = "TRUE";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Location {
    pub city: String,
    pub city_ascii: String,
    pub state_id: String,
    pub state_name: String,
    pub county_fips: String,
    pub county_name: String,
    pub lat: f64,
    pub lng: f64,
    pub population: f64,
    pub density: f64,
    pub source: String,
    pub military: bool,
    pub incorporated: bool,
    pub timezone: String,
    pub ranking: String,
    pub postal_codes: BTreeSet<String>,
    pub id: String,
}

impl Location {
    pub fn from_raw(raw: &RawRecord) -> Result<Self, Error> {
        let text = |name: &str| raw.get(name).unwrap_or_default().trim().to_string();

        let lat = parse_number(raw, LAT)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(field_error(raw, LAT, format!("latitude {lat} is outside [-90, 90]")));
        }
        let lng = parse_number(raw, LNG)?;
        if !(-180.0..=180.0).contains(&lng) {
            return Err(field_error(raw, LNG, format!("longitude {lng} is outside [-180, 180]")));
        }

        Ok(Self {
            city: text(CITY),
            city_ascii: text(CITY_ASCII),
            state_id: text(STATE_ID),
            state_name: text(STATE_NAME),
            county_fips: text(COUNTY_FIPS),
            county_name: text(COUNTY_NAME),
            lat,
            lng,
            population: parse_number(raw, POPULATION)?,
            density: parse_number(raw, DENSITY)?,
            source: text(SOURCE),
            military: parse_flag(raw.get(MILITARY)),
            incorporated: parse_flag(raw.get(INCORPORATED)),
            timezone: text(TIMEZONE),
            ranking: text(RANKING),
            postal_codes: parse_postal_codes(raw.get(ZIPS).unwrap_or_default()),
            id: text(ID),
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    pub fn distance_to(&self, other: &Location) -> f64 {
        haversine_miles(self.coordinates(), other.coordinates())
    }

    pub fn has_postal_code(&self, code: &str) -> bool {
        self.postal_codes.contains(code)
    }

    /// `"<city> (<state_name>): <lat>, <lng>, <timezone>"`
    pub fn short_view(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}, {}, {}",
            self.city, self.state_name, self.lat, self.lng, self.timezone
        )
    }
}

fn field_error(raw: &RawRecord, field: &str, message: String) -> Error {
    Error::new(ErrorKind::InvalidNumericField)
        .with_message(message)
        .with_line(raw.line())
        .with_field(field)
}

fn parse_number(raw: &RawRecord, field: &str) -> Result<f64, Error> {
    let value = raw.get(field).unwrap_or_default().trim();
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        Ok(_) => Err(field_error(raw, field, format!("non-finite number {value:?}"))),
        Err(err) => Err(field_error(raw, field, format!("not a number: {value:?}")).with_source(err)),
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value == Some(TRUE_TOKEN)
}

fn parse_postal_codes(value: &str) -> BTreeSet<String> {
    value
        .split(' ')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

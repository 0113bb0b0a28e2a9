// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::{Error, ErrorKind};
use regex::{Captures, Regex};
use serde_derive::Serialize;
use std::fmt::{Display, self};
use std::str::FromStr;
use std::sync::OnceLock;

/// Geodetic point: latitude and longitude in degrees, altitude in kilometers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        Self::with_altitude(latitude, longitude, 0.0)
    }

    /// Builds a point, wrapping the longitude into `[-180, 180]`.
    ///
    /// Fails if a component is not finite or the latitude lies outside
    /// `[-90, 90]`.
    pub fn with_altitude(latitude: f64, longitude: f64, altitude: f64)
        -> Result<Self, Error>
    {
        if !(latitude.is_finite() && longitude.is_finite()
            && altitude.is_finite())
        {
            return Err(Error::new(ErrorKind::InvalidArgument,
                "Point coordinate values must be finite"));
        }
        if latitude.abs() > 90.0 {
            return Err(Error::new(ErrorKind::InvalidArgument,
                "Latitude must be in the [-90; 90] range"));
        }
        let longitude = if longitude.abs() > 180.0 {
            (longitude + 180.0).rem_euclid(360.0) - 180.0
        } else {
            longitude
        };
        Ok(Point {latitude, longitude, altitude})
    }

    pub fn latitude(&self) -> f64 {self.latitude}
    pub fn longitude(&self) -> f64 {self.longitude}
    pub fn altitude(&self) -> f64 {self.altitude}

    pub fn format_decimal(&self) -> String {
        let mut s = format!("{}, {}", self.latitude, self.longitude);
        if self.altitude != 0.0 {
            s.push_str(&format!(", {} km", self.altitude));
        }
        s
    }

    pub fn format_dms(&self) -> String {
        let hemisphere_lat = if self.latitude >= 0.0 {'N'} else {'S'};
        let hemisphere_lon = if self.longitude >= 0.0 {'E'} else {'W'};
        let mut s = format!("{} {}, {} {}",
            format_degrees(self.latitude.abs()), hemisphere_lat,
            format_degrees(self.longitude.abs()), hemisphere_lon);
        if self.altitude != 0.0 {
            s.push_str(&format!(", {} km", self.altitude));
        }
        s
    }

    /// `lat,lon` form sent to vendors.
    pub(crate) fn to_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.format_dms())
    }
}

impl TryFrom<(f64, f64)> for Point {
    type Error = Error;

    fn try_from((latitude, longitude): (f64, f64)) -> Result<Self, Error> {
        Point::new(latitude, longitude)
    }
}

impl TryFrom<(f64, f64, f64)> for Point {
    type Error = Error;

    fn try_from((latitude, longitude, altitude): (f64, f64, f64))
        -> Result<Self, Error>
    {
        Point::with_altitude(latitude, longitude, altitude)
    }
}

impl FromStr for Point {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let caps = point_pattern().captures(s).ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument,
                format!("Failed to create Point instance from string `{}`", s))
        })?;
        let latitude = component(&caps, "latitude")?;
        let longitude = component(&caps, "longitude")?;
        let altitude = match (caps.name("altitude"), caps.name("units")) {
            (Some(distance), Some(units)) => {
                parse_float(distance.as_str())? * kilometers_per(units.as_str())
            }
            _ => 0.0,
        };
        Point::with_altitude(latitude, longitude, altitude)
    }
}

/// Returns `[lat_max, lon_min, lat_min, lon_max]` of the box spanned by two
/// corners.
pub(crate) fn bounding_box(a: &Point, b: &Point) -> [f64; 4] {
    [
        a.latitude.max(b.latitude),
        a.longitude.min(b.longitude),
        a.latitude.min(b.latitude),
        a.longitude.max(b.longitude),
    ]
}

const FLOAT: &str = r"-?\d+(?:\.\d+)?";

fn point_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let coord = |name: &str, hemispheres: &str| format!(
            r#"(?P<{n}_front>[{h}])?[ ]*(?P<{n}_degrees>{f})(?:[°D\*\s][ ]*(?:(?P<{n}_arcminutes>{f})[′'m][ ]*)?(?:(?P<{n}_arcseconds>{f})[″"s][ ]*)?)?(?P<{n}_back>[{h}])?"#,
            n = name, h = hemispheres, f = FLOAT);
        let pattern = format!(
            r"^\s*{lat}\s*[,;/\s]\s*{lon}(?:\s*[,;/\s]\s*(?P<altitude>{f})[ ]*(?P<units>km|mi|ft|nmi|nm|m))?\s*$",
            lat = coord("latitude", "NS"),
            lon = coord("longitude", "EW"),
            f = FLOAT);
        Regex::new(&pattern).expect("point pattern is valid")
    })
}

fn component(caps: &Captures, name: &str) -> Result<f64, Error> {
    let group = |suffix: &str| {
        caps.name(&format!("{}_{}", name, suffix)).map(|m| m.as_str())
    };
    let degrees = group("degrees").ok_or_else(|| {
        Error::new(ErrorKind::InvalidArgument, format!("Missing {}", name))
    })?;
    let negative = degrees.starts_with('-');
    let mut value = parse_float(degrees)?.abs();
    if let Some(arcminutes) = group("arcminutes") {
        value += parse_float(arcminutes)?.abs() / 60.0;
    }
    if let Some(arcseconds) = group("arcseconds") {
        value += parse_float(arcseconds)?.abs() / 3600.0;
    }
    if negative {
        value = -value;
    }
    if let Some("S") | Some("W") = group("front").or_else(|| group("back")) {
        value = -value;
    }
    Ok(value)
}

fn parse_float(s: &str) -> Result<f64, Error> {
    s.parse().map_err(|e| Error::new(ErrorKind::InvalidArgument, e))
}

fn kilometers_per(units: &str) -> f64 {
    match units {
        "m" => 0.001,
        "mi" => 1.609_344,
        "ft" => 0.000_304_8,
        "nm" | "nmi" => 1.852,
        _ => 1.0,
    }
}

fn format_degrees(degrees: f64) -> String {
    let whole = degrees.trunc();
    let arcminutes = (degrees - whole) * 60.0;
    let arcseconds = (arcminutes - arcminutes.trunc()) * 60.0;
    format!("{} {}m {}s", whole as i64, arcminutes.abs().trunc() as i64,
        format_general(arcseconds.abs()))
}

// Six significant digits, trailing zeros dropped.
fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).max(0) as usize;
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

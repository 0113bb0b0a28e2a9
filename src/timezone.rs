// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::{Error, ErrorKind};
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use std::fmt::{Display, self};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

/// Timezone resolved for a point, with the provider payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Timezone {
    zone: Zone,
    raw: Value,
}

impl Timezone {
    /// Builds a timezone from an IANA name such as `America/New_York`.
    pub fn from_name(name: &str, raw: Value) -> Result<Self, Error> {
        let tz = name.parse::<Tz>().map_err(|_| {
            Error::new(ErrorKind::Parse,
                format!("Unknown timezone name `{}`", name))
        })?;
        Ok(Timezone {zone: Zone::Named(tz), raw})
    }

    pub fn from_fixed_gmt_offset(hours: f64, raw: Value) -> Result<Self, Error> {
        let seconds = (hours * 3600.0).round();
        let offset = if seconds.is_finite() {
            FixedOffset::east_opt(seconds as i32)
        } else {
            None
        };
        let offset = offset.ok_or_else(|| {
            Error::new(ErrorKind::Parse,
                format!("Invalid GMT offset of {} hours", hours))
        })?;
        Ok(Timezone {zone: Zone::Fixed(offset), raw})
    }

    pub fn zone(&self) -> &Zone {&self.zone}
    pub fn raw(&self) -> &Value {&self.raw}

    /// Offset from UTC in effect at `at`.
    pub fn utc_offset(&self, at: DateTime<Utc>) -> FixedOffset {
        match self.zone {
            Zone::Named(tz) => tz.offset_from_utc_datetime(&at.naive_utc()).fix(),
            Zone::Fixed(offset) => offset,
        }
    }
}

impl Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.zone {
            Zone::Named(tz) => f.write_str(tz.name()),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl Serialize for Timezone {
    fn serialize<S: Serializer>(&self, out: S) -> Result<S::Ok, S::Error> {
        let mut s = out.serialize_struct("Timezone", 2)?;
        s.serialize_field("zone", &self.to_string())?;
        s.serialize_field("raw", &self.raw)?;
        s.end()
    }
}

// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

use crate::Point;
use serde_derive::Serialize;
use serde_json::Value;
use std::fmt::{Display, self};

/// A geocoding result: an address, its point, and the provider payload it
/// was decoded from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Location {
    address: String,
    point: Point,
    raw: Value,
}

impl Location {
    pub fn new<S: Into<String>>(address: S, point: Point, raw: Value) -> Self {
        Location {address: address.into(), point, raw}
    }

    pub fn address(&self) -> &str {&self.address}
    pub fn point(&self) -> &Point {&self.point}
    pub fn latitude(&self) -> f64 {self.point.latitude()}
    pub fn longitude(&self) -> f64 {self.point.longitude()}
    pub fn altitude(&self) -> f64 {self.point.altitude()}

    /// Provider payload, untouched.
    pub fn raw(&self) -> &Value {&self.raw}

    pub fn into_raw(self) -> Value {self.raw}
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.address)
    }
}

// Copyright (C) 2018 Stephane Raux. Distributed under the MIT license.

#![deny(warnings)]

//! Uniform access to third-party geocoding services.
//!
//! Every provider implements [`Geocoder`]: forward geocoding of a free-form
//! query, reverse geocoding of a [`Point`] and, where the vendor offers it, a
//! timezone lookup. [`ServiceBuilder`] exposes a fallback chain of providers
//! as a small HTTP proxy.

mod client;
mod err;
mod location;
mod options;
mod point;
mod protocol;
mod service;
mod timezone;

use crate::client::Client;
pub use crate::err::{Error, ErrorKind};
pub use crate::location::Location;
pub use crate::options::{Options, Scheme};
pub use crate::point::Point;
pub use crate::protocol::{AnyGeocoder, Geocoder, Provider, ProviderConfig,
    geocoder_for_service};
pub use crate::protocol::{geonames, here, mapquest, what3words};
pub use crate::protocol::geonames::GeoNames;
pub use crate::protocol::here::Here;
pub use crate::protocol::mapquest::MapQuest;
pub use crate::protocol::what3words::What3Words;
pub use crate::service::{BoundService, Finder, ServiceBuilder};
pub use crate::timezone::{Timezone, Zone};

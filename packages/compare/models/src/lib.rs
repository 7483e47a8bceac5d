#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types shared by the FHRS/OSM reconciliation toolchain.
//!
//! Two independently maintained datasets describe the same food-serving
//! establishments: crowd-sourced map entities (OSM nodes, ways and
//! relations) and the official Food Hygiene Rating Scheme register. This
//! crate defines the typed records for both sides, the administrative
//! districts used to partition them, and the derived comparison results.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl Location {
    /// Creates a location from a longitude/latitude pair.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// An administrative district boundary.
///
/// The boundary is kept as a `GeoJSON` geometry string (`Polygon` or
/// `MultiPolygon`); the spatial crate parses it once when building its
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    /// Boundary dataset identifier.
    pub id: i32,
    /// Display name as it appears in the boundary dataset.
    pub name: String,
    /// `GeoJSON` geometry of the boundary.
    pub boundary_geojson: String,
}

/// The OSM element type of a map entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OsmKind {
    /// A single point.
    Node,
    /// An area or line built from an ordered node list.
    Way,
    /// A composite area built from member ways and nodes.
    Relation,
}

impl OsmKind {
    /// Single-letter prefix used by editor remote-control object lists
    /// (`n123`, `w45`, `r6`).
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Node => 'n',
            Self::Way => 'w',
            Self::Relation => 'r',
        }
    }
}

/// A point or area from the crowd-sourced map dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntity {
    /// OSM element id (unique per [`OsmKind`]).
    pub id: i64,
    /// OSM element type.
    pub kind: OsmKind,
    /// Representative location (the computed centroid for areas).
    pub location: Location,
    /// Value of the `fhrs:id` tag, kept verbatim.
    pub fhrs_id: Option<String>,
    /// Value of the `name` tag.
    pub name: Option<String>,
    /// Value of the `addr:postcode` tag.
    pub postcode: Option<String>,
    /// Value of the `not:addr:postcode` tag: a postcode the mapper has
    /// confirmed is *not* the correct one for this entity.
    pub not_postcode: Option<String>,
    /// District containing [`Self::location`], once assigned.
    pub district_id: Option<i32>,
}

impl MapEntity {
    /// Returns the compact `n123`/`w45`/`r6` identifier.
    #[must_use]
    pub fn ident(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.id)
    }
}

/// An establishment from the regulatory (FHRS) dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Establishment {
    /// FHRS identifier.
    pub fhrs_id: i64,
    /// Registered business name.
    pub business_name: String,
    /// First address line.
    pub address_line_1: Option<String>,
    /// Second address line.
    pub address_line_2: Option<String>,
    /// Third address line.
    pub address_line_3: Option<String>,
    /// Fourth address line.
    pub address_line_4: Option<String>,
    /// Registered postcode.
    pub postcode: Option<String>,
    /// Geocoded location, absent for establishments without coordinates.
    pub location: Option<Location>,
    /// Code of the owning local authority.
    pub local_authority_code: Option<String>,
    /// District containing [`Self::location`], once assigned.
    pub district_id: Option<i32>,
}

impl Establishment {
    /// Returns the four address lines in order.
    #[must_use]
    pub fn address_lines(&self) -> [Option<&str>; 4] {
        [
            self.address_line_1.as_deref(),
            self.address_line_2.as_deref(),
            self.address_line_3.as_deref(),
            self.address_line_4.as_deref(),
        ]
    }
}

/// The six-way outcome of comparing a map entity with an establishment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Status {
    /// Linked, and the postcodes agree (or the disagreement is overridden).
    #[serde(rename = "matched")]
    #[strum(serialize = "matched")]
    Matched,
    /// Linked, but the map postcode is missing or wrong.
    #[serde(rename = "matched_postcode_error")]
    #[strum(serialize = "matched_postcode_error")]
    MatchedPostcodeError,
    /// The map entity carries an `fhrs:id` that resolves to nothing.
    #[serde(rename = "mismatch")]
    #[strum(serialize = "mismatch")]
    Mismatch,
    /// Unlinked map entity that has a postcode.
    #[serde(rename = "OSM_with_postcode")]
    #[strum(serialize = "OSM_with_postcode")]
    OsmWithPostcode,
    /// Unlinked map entity without a postcode.
    #[serde(rename = "OSM_no_postcode")]
    #[strum(serialize = "OSM_no_postcode")]
    OsmNoPostcode,
    /// Establishment that no map entity links to.
    #[serde(rename = "FHRS")]
    #[strum(serialize = "FHRS")]
    Fhrs,
}

impl Status {
    /// All statuses in report order.
    pub const ALL: [Self; 6] = [
        Self::Matched,
        Self::MatchedPostcodeError,
        Self::Mismatch,
        Self::OsmWithPostcode,
        Self::OsmNoPostcode,
        Self::Fhrs,
    ];

    /// Whether a map entity is present for records of this status.
    #[must_use]
    pub const fn observed_in_osm(self) -> bool {
        !matches!(self, Self::Fhrs)
    }

    /// Whether an establishment is present for records of this status.
    #[must_use]
    pub const fn has_establishment(self) -> bool {
        matches!(
            self,
            Self::Matched | Self::MatchedPostcodeError | Self::Fhrs
        )
    }

    /// Whether this status represents a resolved cross-reference.
    #[must_use]
    pub const fn is_linked(self) -> bool {
        matches!(self, Self::Matched | Self::MatchedPostcodeError)
    }
}

/// Per-status record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Records with [`Status::Matched`].
    pub matched: u64,
    /// Records with [`Status::MatchedPostcodeError`].
    pub matched_postcode_error: u64,
    /// Records with [`Status::Mismatch`].
    pub mismatch: u64,
    /// Records with [`Status::OsmWithPostcode`].
    pub osm_with_postcode: u64,
    /// Records with [`Status::OsmNoPostcode`].
    pub osm_no_postcode: u64,
    /// Records with [`Status::Fhrs`].
    pub fhrs: u64,
}

impl StatusCounts {
    /// Increments the counter for `status`.
    pub const fn add(&mut self, status: Status) {
        *self.slot(status) += 1;
    }

    /// Returns the counter for `status`.
    #[must_use]
    pub const fn get(&self, status: Status) -> u64 {
        match status {
            Status::Matched => self.matched,
            Status::MatchedPostcodeError => self.matched_postcode_error,
            Status::Mismatch => self.mismatch,
            Status::OsmWithPostcode => self.osm_with_postcode,
            Status::OsmNoPostcode => self.osm_no_postcode,
            Status::Fhrs => self.fhrs,
        }
    }

    /// Sum over all statuses.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.matched
            + self.matched_postcode_error
            + self.mismatch
            + self.osm_with_postcode
            + self.osm_no_postcode
            + self.fhrs
    }

    const fn slot(&mut self, status: Status) -> &mut u64 {
        match status {
            Status::Matched => &mut self.matched,
            Status::MatchedPostcodeError => &mut self.matched_postcode_error,
            Status::Mismatch => &mut self.mismatch,
            Status::OsmWithPostcode => &mut self.osm_with_postcode,
            Status::OsmNoPostcode => &mut self.osm_no_postcode,
            Status::Fhrs => &mut self.fhrs,
        }
    }
}

impl FromIterator<Status> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = Status>>(iter: I) -> Self {
        let mut counts = Self::default();
        for status in iter {
            counts.add(status);
        }
        counts
    }
}

/// One row of the full outer join between map entities and establishments.
///
/// At least one side is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Classification of this pair.
    pub status: Status,
    /// The map side, if any.
    pub entity: Option<MapEntity>,
    /// The regulatory side, if any.
    pub establishment: Option<Establishment>,
}

impl ComparisonRecord {
    /// The district the record is reported under: the map entity's district
    /// when present, otherwise the establishment's.
    #[must_use]
    pub fn district_id(&self) -> Option<i32> {
        self.entity
            .as_ref()
            .and_then(|e| e.district_id)
            .or_else(|| self.establishment.as_ref().and_then(|e| e.district_id))
    }

    /// The map entity's location, if the map side is present.
    #[must_use]
    pub fn osm_location(&self) -> Option<Location> {
        self.entity.as_ref().map(|e| e.location)
    }

    /// The establishment's location, if present.
    #[must_use]
    pub fn fhrs_location(&self) -> Option<Location> {
        self.establishment.as_ref().and_then(|e| e.location)
    }

    /// The map location, falling back to the establishment location.
    #[must_use]
    pub fn preferred_location(&self) -> Option<Location> {
        self.osm_location().or_else(|| self.fhrs_location())
    }

    /// The map name, falling back to the business name.
    #[must_use]
    pub fn preferred_name(&self) -> Option<&str> {
        self.entity
            .as_ref()
            .and_then(|e| e.name.as_deref())
            .or_else(|| self.establishment.as_ref().map(|e| e.business_name.as_str()))
    }
}

/// A proposed cross-reference for an unlinked map entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedMatch {
    /// The unlinked map entity.
    pub entity: MapEntity,
    /// The candidate establishment.
    pub establishment: Establishment,
    /// Great-circle distance between the two locations in metres.
    pub distance_m: f64,
}

/// A linked pair whose two recorded locations are far apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistantMatch {
    /// Status of the underlying comparison record.
    pub status: Status,
    /// The map side.
    pub entity: MapEntity,
    /// The regulatory side.
    pub establishment: Establishment,
    /// Great-circle distance between the two locations in metres.
    pub distance_m: f64,
}

/// A map entity sharing its `fhrs:id` with at least one other entity in the
/// same district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    /// The entity.
    pub entity: MapEntity,
    /// Business name of the establishment the id resolves to, if any.
    pub fhrs_name: Option<String>,
}

/// An unmatched establishment with map entities sharing its postcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostcodeCandidate {
    /// The unmatched establishment.
    pub establishment: Establishment,
    /// Unlinked map entities with the identical postcode.
    pub entities: Vec<MapEntity>,
}

/// A district that holds enough data to be worth reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictSummary {
    /// District id.
    pub id: i32,
    /// Cleaned display name.
    pub name: String,
    /// Number of establishments located in the district.
    pub establishments: u64,
}

/// Match statistics for a district (or the whole country).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictStats {
    /// District id, `None` for the whole-country rollup.
    pub district_id: Option<i32>,
    /// Per-status counts.
    pub counts: StatusCounts,
    /// Records observed in the map dataset (every status except `FHRS`).
    pub total_osm: u64,
    /// Records with an establishment (`matched`, `matched_postcode_error`,
    /// `FHRS`).
    pub total_fhrs: u64,
    /// `matched + OSM_with_postcode`.
    pub osm_matched_or_postcode: u64,
    /// Percentage of establishments that are cleanly matched.
    pub matched_pct: f64,
    /// Percentage of map entities that are matched or carry a postcode.
    pub postcode_pct: f64,
}

//! Six-way status of a joined entity/establishment pair.
//!
//! Postcodes are compared after trimming surrounding whitespace; blank tag
//! values count as absent.

use fhrs_osm_compare_models::{Establishment, MapEntity, Status};

use crate::present;

/// One row of the full outer join. At least one side is always present,
/// which the variants encode directly.
#[derive(Debug, Clone, Copy)]
pub enum JoinedPair<'a> {
    /// An establishment no entity links to.
    EstablishmentOnly(&'a Establishment),
    /// An entity with no resolved establishment: either it carries no
    /// `fhrs:id`, or the id matches no known establishment.
    EntityOnly(&'a MapEntity),
    /// An entity whose `fhrs:id` resolved to this establishment.
    Linked(&'a MapEntity, &'a Establishment),
}

/// Classifies a joined pair. Total over every input.
///
/// For linked pairs the entity is `matched` when its postcode equals the
/// establishment's, when its `not:addr:postcode` override names the
/// establishment's postcode (the mapper has confirmed the register is
/// wrong), or when the register has no postcode to contradict it.
/// Otherwise it is `matched_postcode_error`.
#[must_use]
pub fn classify(pair: JoinedPair<'_>) -> Status {
    match pair {
        JoinedPair::EstablishmentOnly(_) => Status::Fhrs,
        JoinedPair::EntityOnly(entity) => {
            if present(entity.fhrs_id.as_deref()).is_some() {
                Status::Mismatch
            } else if postcode(entity.postcode.as_deref()).is_some() {
                Status::OsmWithPostcode
            } else {
                Status::OsmNoPostcode
            }
        }
        JoinedPair::Linked(entity, establishment) => {
            let osm = postcode(entity.postcode.as_deref());
            let fhrs = postcode(establishment.postcode.as_deref());
            let not_postcode = postcode(entity.not_postcode.as_deref());

            match (osm, fhrs) {
                (Some(o), Some(f)) if o == f => Status::Matched,
                (Some(_), None) => Status::Matched,
                (_, Some(f)) if not_postcode == Some(f) => Status::Matched,
                _ => Status::MatchedPostcodeError,
            }
        }
    }
}

fn postcode(value: Option<&str>) -> Option<&str> {
    present(value).map(str::trim)
}

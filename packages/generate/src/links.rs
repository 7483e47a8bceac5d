//! HTML link rendering for map popups.
//!
//! Links point at the map website, the FHRS website and the local editor's
//! remote-control endpoint (`load_object`), using the prefixes from
//! [`LinkConfig`]. Free text from either dataset is escaped before it is
//! placed in markup.

use std::borrow::Cow;

use fhrs_osm_compare::config::LinkConfig;
use fhrs_osm_compare_models::{ComparisonRecord, Establishment, MapEntity, Status};

/// Escapes text for inclusion in HTML element content or attributes.
#[must_use]
pub fn escape_html(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Map website page of `entity`.
#[must_use]
pub fn osm_url(entity: &MapEntity, links: &LinkConfig) -> String {
    format!("{}{}/{}", links.osm_url_prefix, entity.kind, entity.id)
}

/// FHRS website page of establishment `fhrs_id`.
#[must_use]
pub fn fhrs_url(fhrs_id: i64, links: &LinkConfig) -> String {
    format!("{}{fhrs_id}{}", links.fhrs_url_prefix, links.fhrs_url_suffix)
}

/// Editor remote-control URL loading `entity`, optionally adding tags.
///
/// `add_tags` is a `|`-separated (`%7C`) `key=value` list.
#[must_use]
pub fn josm_url(entity: &MapEntity, add_tags: Option<&str>, links: &LinkConfig) -> String {
    let mut url = format!(
        "{}load_object?objects={}",
        links.josm_url_prefix,
        entity.ident()
    );
    if let Some(tags) = add_tags {
        url.push_str("&addtags=");
        url.push_str(tags);
    }
    url
}

/// Tags copying an establishment's address into the map entity.
///
/// Address lines become `fixme:addr1..4` for a mapper to resolve, the
/// postcode becomes `addr:postcode`, and `source:addr` credits the
/// register. Each tag is prefixed with `%7C`, so the result can follow
/// another tag directly.
#[must_use]
pub fn add_tags_string(establishment: &Establishment) -> String {
    let lines = establishment
        .address_lines()
        .into_iter()
        .enumerate()
        .filter_map(|(n, line)| line.map(|line| format!("%7Cfixme:addr{}={line}", n + 1)));
    let postcode = establishment
        .postcode
        .iter()
        .map(|postcode| format!("%7Caddr:postcode={postcode}"));

    lines
        .chain(postcode)
        .chain(std::iter::once("%7Csource:addr=FHRS Open Data".to_string()))
        .collect()
}

/// One line of an overview popup.
///
/// Establishments nobody links to get a link to their FHRS page. Linked
/// entities missing a postcode get an editor link adding the address tags.
/// Everything else gets a plain editor link.
#[must_use]
pub fn record_description(record: &ComparisonRecord, links: &LinkConfig) -> String {
    let name = escape_html(record.preferred_name().unwrap_or_default());

    let Some(entity) = &record.entity else {
        let fhrs_id = record.establishment.as_ref().map_or(0, |e| e.fhrs_id);
        return format!(
            "{name} (<a href=\"{}\" target=\"_blank\">{}</a>)",
            fhrs_url(fhrs_id, links),
            record.status
        );
    };

    let header = format!(
        "{name} (<a href=\"{}\" target=\"_blank\">{}</a>)<br />",
        osm_url(entity, links),
        record.status
    );

    match &record.establishment {
        Some(establishment)
            if record.status == Status::MatchedPostcodeError
                && entity.postcode.as_deref().is_none_or(|p| p.trim().is_empty()) =>
        {
            let tags = add_tags_string(establishment);
            format!(
                "{header}<a href=\"{}\" target=\"_blank\">Add tags in JOSM</a>",
                escape_html(&josm_url(entity, Some(&tags), links))
            )
        }
        _ => format!(
            "{header}<a href=\"{}\" target=\"_blank\">Edit in JOSM</a>",
            escape_html(&josm_url(entity, None, links))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RUGBY, entity, establishment};

    fn addressed() -> Establishment {
        let mut e = establishment(500, "The Bell", Some("CV21 1AB"), Some(RUGBY));
        e.address_line_1 = Some("1 High Street".to_string());
        e.address_line_3 = Some("Rugby".to_string());
        e
    }

    #[test]
    fn add_tags_skip_missing_lines() {
        assert_eq!(
            add_tags_string(&addressed()),
            "%7Cfixme:addr1=1 High Street%7Cfixme:addr3=Rugby%7Caddr:postcode=CV21 1AB%7Csource:addr=FHRS Open Data"
        );
        let bare = establishment(501, "X", None, None);
        assert_eq!(add_tags_string(&bare), "%7Csource:addr=FHRS Open Data");
    }

    #[test]
    fn fhrs_only_records_link_to_the_register() {
        let record = ComparisonRecord {
            status: Status::Fhrs,
            entity: None,
            establishment: Some(addressed()),
        };
        assert_eq!(
            record_description(&record, &LinkConfig::default()),
            "The Bell (<a href=\"http://ratings.food.gov.uk/business/en-GB/500/\" target=\"_blank\">FHRS</a>)"
        );
    }

    #[test]
    fn missing_postcode_gets_add_tags_link() {
        let record = ComparisonRecord {
            status: Status::MatchedPostcodeError,
            entity: Some(entity(7, Some("500"), None, RUGBY)),
            establishment: Some(addressed()),
        };
        let text = record_description(&record, &LinkConfig::default());

        assert!(text.starts_with(
            "Entity 7 (<a href=\"http://www.openstreetmap.org/node/7\" target=\"_blank\">matched_postcode_error</a>)<br />"
        ));
        assert!(text.contains("load_object?objects=n7&amp;addtags=%7Cfixme:addr1=1 High Street"));
        assert!(text.ends_with("Add tags in JOSM</a>"));
    }

    #[test]
    fn wrong_postcode_and_unlinked_get_edit_link() {
        let links = LinkConfig::default();
        let wrong = ComparisonRecord {
            status: Status::MatchedPostcodeError,
            entity: Some(entity(7, Some("500"), Some("CV21 9ZZ"), RUGBY)),
            establishment: Some(addressed()),
        };
        let unlinked = ComparisonRecord {
            status: Status::OsmNoPostcode,
            entity: Some(entity(8, None, None, RUGBY)),
            establishment: None,
        };

        for record in [wrong, unlinked] {
            let text = record_description(&record, &links);
            assert!(text.ends_with("Edit in JOSM</a>"), "{text}");
            assert!(!text.contains("addtags"));
        }
    }

    #[test]
    fn names_are_escaped() {
        let mut e = entity(9, None, None, RUGBY);
        e.name = Some("Fish & <Chips>".to_string());
        let record = ComparisonRecord {
            status: Status::OsmNoPostcode,
            entity: Some(e),
            establishment: None,
        };
        let text = record_description(&record, &LinkConfig::default());
        assert!(text.starts_with("Fish &amp; &lt;Chips&gt; ("), "{text}");
    }
}

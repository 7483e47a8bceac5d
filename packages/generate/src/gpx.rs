//! GPX 1.0 waypoint files for field surveys.

use std::io::{self, Write};

use fhrs_osm_compare_models::{ComparisonRecord, Status};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde::Serialize;

use crate::links::escape_html;

/// Written as the `creator` attribute.
pub const CREATOR: &str = "fhrs-osm";

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/0";

/// Waypoint name used when a record has no name on the chosen side.
pub const UNNAMED: &str = "???";

/// Which dataset's location and name a waypoint takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The map entity.
    Osm,
    /// The establishment.
    Fhrs,
}

/// A status filter paired with the side its waypoints come from.
#[derive(Debug, Clone, Copy)]
pub struct GpxLayer {
    /// Records to include.
    pub status: Status,
    /// Where each waypoint is placed.
    pub side: Side,
}

/// Files written per district: establishments to find on the ground, and
/// map entities whose tags need checking.
pub const LAYERS: [GpxLayer; 4] = [
    GpxLayer {
        status: Status::Fhrs,
        side: Side::Fhrs,
    },
    GpxLayer {
        status: Status::MatchedPostcodeError,
        side: Side::Osm,
    },
    GpxLayer {
        status: Status::Mismatch,
        side: Side::Osm,
    },
    GpxLayer {
        status: Status::OsmNoPostcode,
        side: Side::Osm,
    },
];

/// A single GPX waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Rendered as [`UNNAMED`] when absent or empty.
    pub name: Option<String>,
}

/// Waypoints for `records` taken from `side`, optionally limited to one
/// status. Records without a location on that side are skipped.
#[must_use]
pub fn waypoints(
    records: &[&ComparisonRecord],
    side: Side,
    status: Option<Status>,
) -> Vec<Waypoint> {
    records
        .iter()
        .filter(|r| status.is_none_or(|s| r.status == s))
        .filter_map(|r| {
            let (location, name) = match side {
                Side::Osm => {
                    let entity = r.entity.as_ref()?;
                    (entity.location, entity.name.clone())
                }
                Side::Fhrs => {
                    let establishment = r.establishment.as_ref()?;
                    (establishment.location?, Some(establishment.business_name.clone()))
                }
            };
            Some(Waypoint {
                latitude: location.latitude,
                longitude: location.longitude,
                name,
            })
        })
        .collect()
}

/// Writes waypoints to `out` as a GPX 1.0 document.
///
/// # Errors
///
/// Returns an I/O error if writing to `out` fails.
pub fn write_gpx<W: Write>(out: W, waypoints: &[Waypoint]) -> io::Result<()> {
    let mut writer = Writer::new(out);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    newline(&mut writer, "\n")?;
    writer.write_event(Event::Start(BytesStart::from_content(
        format!("gpx version=\"1.0\" creator=\"{CREATOR}\"\n    xmlns=\"{GPX_NAMESPACE}\""),
        3,
    )))?;
    newline(&mut writer, "\n")?;

    for waypoint in waypoints {
        let latitude = waypoint.latitude.to_string();
        let longitude = waypoint.longitude.to_string();
        let name = waypoint
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map_or_else(|| UNNAMED.into(), escape_html);

        writer.write_event(Event::Start(
            BytesStart::new("wpt")
                .with_attributes([("lat", latitude.as_str()), ("lon", longitude.as_str())]),
        ))?;
        newline(&mut writer, "\n    ")?;
        writer.write_event(Event::Start(BytesStart::new("name")))?;
        writer.write_event(Event::Text(BytesText::from_escaped(name)))?;
        writer.write_event(Event::End(BytesEnd::new("name")))?;
        newline(&mut writer, "\n")?;
        writer.write_event(Event::End(BytesEnd::new("wpt")))?;
        newline(&mut writer, "\n")?;
    }

    writer.write_event(Event::End(BytesEnd::new("gpx")))
}

fn newline<W: Write>(writer: &mut Writer<W>, whitespace: &str) -> io::Result<()> {
    writer.write_event(Event::Text(BytesText::from_escaped(whitespace)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RUGBY, entity, establishment};

    fn records() -> Vec<ComparisonRecord> {
        let mut unnamed = entity(2, None, None, RUGBY);
        unnamed.name = None;
        vec![
            ComparisonRecord {
                status: Status::Fhrs,
                entity: None,
                establishment: Some(establishment(500, "Fish & Chips", None, Some(RUGBY))),
            },
            ComparisonRecord {
                status: Status::OsmNoPostcode,
                entity: Some(unnamed),
                establishment: None,
            },
            ComparisonRecord {
                status: Status::Fhrs,
                entity: None,
                establishment: Some(establishment(501, "Nowhere", None, None)),
            },
        ]
    }

    #[test]
    fn filters_by_status_and_side() {
        let records = records();
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let fhrs = waypoints(&refs, Side::Fhrs, Some(Status::Fhrs));
        assert_eq!(fhrs.len(), 1, "establishments without a location are skipped");
        assert_eq!(fhrs[0].name.as_deref(), Some("Fish & Chips"));

        assert!(waypoints(&refs, Side::Osm, Some(Status::Fhrs)).is_empty());
        assert_eq!(waypoints(&refs, Side::Osm, None).len(), 1);
    }

    fn render(waypoints: &[Waypoint]) -> String {
        let mut out = Vec::new();
        write_gpx(&mut out, waypoints).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_escaped_names_and_placeholder() {
        let gpx = render(&[
            Waypoint {
                latitude: 52.372,
                longitude: -1.263,
                name: Some("Fish & Chips".to_string()),
            },
            Waypoint {
                latitude: 52.4,
                longitude: -1.2,
                name: None,
            },
        ]);

        assert_eq!(
            gpx,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <gpx version=\"1.0\" creator=\"fhrs-osm\"\n    \
             xmlns=\"http://www.topografix.com/GPX/1/0\">\n\
             <wpt lat=\"52.372\" lon=\"-1.263\">\n    <name>Fish &amp; Chips</name>\n</wpt>\n\
             <wpt lat=\"52.4\" lon=\"-1.2\">\n    <name>???</name>\n</wpt>\n\
             </gpx>"
        );
    }

    #[test]
    fn empty_layer_is_still_a_document() {
        let gpx = render(&[]);
        assert!(gpx.ends_with("GPX/1/0\">\n</gpx>"));
    }
}

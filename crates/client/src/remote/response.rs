//! Wire format of the remote message server.
//!
//! The server answers the published-messages endpoint with a search
//! result envelope. Wire records are deliberately lenient — every field
//! is optional and unknown fields are ignored — and mapped into the
//! shared model with defaults where the model requires a value.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Deserialize;

use navwarn_core::model::{
    Area, AreaDesc, Attachment, Category, CategoryDesc, Chart, Location, LocationDesc,
    LocationType, MainType, Message, MessageDesc, Point, PointDesc, SeriesId, Status, WarningType,
};

/// Search result envelope for the published-messages endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchResult {
    pub messages: Vec<WireMessage>,
    pub start_index: i32,
    pub total: i32,
}

/// Epoch-millis timestamp as serialized by the remote server.
fn datetime(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireMessage {
    pub id: Option<i64>,
    pub created: Option<i64>,
    pub updated: Option<i64>,
    pub version: Option<i32>,
    pub series_identifier: Option<WireSeriesId>,
    #[serde(rename = "type")]
    pub warning_type: Option<String>,
    pub status: Option<String>,
    pub area: Option<WireArea>,
    pub categories: Vec<WireCategory>,
    pub locations: Vec<WireLocation>,
    pub charts: Vec<WireChart>,
    pub horizontal_datum: Option<String>,
    pub valid_from: Option<i64>,
    pub valid_to: Option<i64>,
    pub cancellation_date: Option<i64>,
    pub original_information: Option<bool>,
    pub descs: Vec<WireDesc>,
    pub attachments: Vec<WireAttachment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireSeriesId {
    pub main_type: Option<String>,
    pub authority: Option<String>,
    pub number: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireArea {
    pub id: Option<i64>,
    pub parent: Option<Box<WireArea>>,
    pub sort_order: Option<f64>,
    pub descs: Vec<WireNameDesc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireCategory {
    pub id: Option<i64>,
    pub parent: Option<Box<WireCategory>>,
    pub descs: Vec<WireNameDesc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireNameDesc {
    pub lang: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireLocation {
    #[serde(rename = "type")]
    pub location_type: Option<String>,
    pub radius: Option<i32>,
    pub points: Vec<WirePoint>,
    pub descs: Vec<WireTextDesc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WirePoint {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub index: Option<i32>,
    pub descs: Vec<WireTextDesc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireTextDesc {
    pub lang: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireChart {
    pub chart_number: Option<String>,
    pub international_number: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireDesc {
    pub lang: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub other_categories: Option<String>,
    pub time: Option<String>,
    pub vicinity: Option<String>,
    pub note: Option<String>,
    pub publication: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WireAttachment {
    pub path: Option<String>,
    pub name: Option<String>,
    pub updated: Option<i64>,
    pub size: Option<u64>,
    pub directory: Option<bool>,
}

impl WireMessage {
    /// Maps the wire record into the shared model.
    ///
    /// Records without an id are unusable and yield `None`; everything
    /// else falls back to defaults.
    pub fn into_message(self) -> Option<Message> {
        let id = self.id?;

        let warning_type = self
            .warning_type
            .as_deref()
            .and_then(WarningType::parse)
            .unwrap_or(WarningType::LocalWarning);

        let series = self.series_identifier.unwrap_or_default();
        let main_type = match series.main_type.as_deref() {
            Some("NM") => MainType::Nm,
            Some("MSI") => MainType::Msi,
            _ => warning_type.main_type(),
        };
        let year =
            series.year.or_else(|| datetime(self.valid_from).map(|d| d.year())).unwrap_or(0);
        let mut series_id =
            SeriesId::new(main_type, series.authority.unwrap_or_default(), year);
        if let Some(number) = series.number {
            series_id = series_id.with_number(number);
        }

        let mut msg = Message::new(id, series_id, warning_type);
        msg.created = datetime(self.created);
        msg.updated = datetime(self.updated).unwrap_or(DateTime::<Utc>::MIN_UTC);
        msg.version = self.version;
        msg.status = match self.status.as_deref() {
            Some("DRAFT") => Status::Draft,
            Some("EXPIRED") => Status::Expired,
            Some("CANCELLED") => Status::Cancelled,
            Some("DELETED") => Status::Deleted,
            _ => Status::Published,
        };
        msg.area = self.area.map(map_area);
        msg.categories = self.categories.into_iter().map(map_category).collect();
        msg.locations = self.locations.into_iter().map(map_location).collect();
        msg.charts = self
            .charts
            .into_iter()
            .filter_map(|c| {
                c.chart_number.map(|chart_number| Chart {
                    chart_number,
                    international_number: c.international_number,
                })
            })
            .collect();
        msg.horizontal_datum = self.horizontal_datum;
        msg.valid_from = datetime(self.valid_from);
        msg.valid_to = datetime(self.valid_to);
        msg.cancellation_date = datetime(self.cancellation_date);
        msg.original_information = self.original_information;
        msg.descs = self
            .descs
            .into_iter()
            .filter_map(|d| {
                let lang = d.lang?;
                Some(MessageDesc {
                    lang,
                    title: d.title,
                    description: d.description,
                    other_categories: d.other_categories,
                    time: d.time,
                    vicinity: d.vicinity,
                    note: d.note,
                    publication: d.publication,
                    source: d.source,
                })
            })
            .collect();
        msg.attachments = self
            .attachments
            .into_iter()
            .filter_map(|a| {
                let path = a.path?;
                let name = a.name?;
                let mut att = Attachment::new(path, name);
                att.updated = datetime(a.updated);
                att.size = a.size;
                att.directory = a.directory.unwrap_or(false);
                Some(att)
            })
            .collect();

        Some(msg)
    }
}

fn map_area(wire: WireArea) -> Area {
    let mut area = Area::new(wire.id.unwrap_or_default());
    area.sort_order = wire.sort_order.unwrap_or_default();
    area.parent = wire.parent.map(|p| Box::new(map_area(*p)));
    area.descs = wire
        .descs
        .into_iter()
        .filter_map(|d| Some(AreaDesc::new(d.lang?, d.name?)))
        .collect();
    area
}

fn map_category(wire: WireCategory) -> Category {
    let mut cat = Category::new(wire.id.unwrap_or_default());
    cat.parent = wire.parent.map(|p| Box::new(map_category(*p)));
    cat.descs = wire
        .descs
        .into_iter()
        .filter_map(|d| Some(CategoryDesc::new(d.lang?, d.name?)))
        .collect();
    cat
}

fn map_location(wire: WireLocation) -> Location {
    let location_type = match wire.location_type.as_deref() {
        Some("POINT") | Some("Point") => LocationType::Point,
        Some("POLYGON") | Some("Polygon") => LocationType::Polygon,
        _ => LocationType::Polyline,
    };

    let mut loc = Location::new(location_type);
    loc.radius = wire.radius;
    loc.points = wire
        .points
        .into_iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let mut point = Point::new(p.lat?, p.lon?, p.index.unwrap_or(i as i32 + 1));
            point.descs = p
                .descs
                .into_iter()
                .filter_map(|d| {
                    Some(PointDesc { lang: d.lang?, description: d.description })
                })
                .collect();
            Some(point)
        })
        .collect();
    loc.descs = wire
        .descs
        .into_iter()
        .filter_map(|d| Some(LocationDesc { lang: d.lang?, description: d.description }))
        .collect();
    loc.normalize();
    loc
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "startIndex": 0,
        "total": 1,
        "messages": [{
            "id": 6456,
            "updated": 1407148500000,
            "version": 3,
            "seriesIdentifier": {
                "mainType": "MSI",
                "authority": "DK",
                "number": 184,
                "year": 2014
            },
            "type": "SUBAREA_WARNING",
            "status": "PUBLISHED",
            "validFrom": 1407100000000,
            "area": {
                "id": 5,
                "descs": [{"lang": "en", "name": "The Sound"}],
                "parent": {"id": 1, "descs": [{"lang": "en", "name": "Denmark"}]}
            },
            "categories": [{"id": 20, "descs": [{"lang": "en", "name": "Wrecks"}]}],
            "locations": [{
                "type": "POLYGON",
                "points": [
                    {"lat": 55.0, "lon": 12.0, "index": 1},
                    {"lat": 55.1, "lon": 12.1, "index": 2},
                    {"lat": 55.2, "lon": 12.0, "index": 3}
                ]
            }],
            "descs": [{
                "lang": "en",
                "title": "Drifting wreck",
                "description": "<p>A wreck is adrift</p>"
            }],
            "attachments": [{
                "path": "messages/1/19/6456/wreck.jpg",
                "name": "wreck.jpg",
                "updated": 1407148500000,
                "size": 12345
            }],
            "unknownField": true
        }]
    }"#;

    #[test]
    fn test_parse_and_map_sample() {
        let result: SearchResult = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(result.total, 1);

        let msg = result.messages.into_iter().next().unwrap().into_message().unwrap();
        assert_eq!(msg.id, 6456);
        assert_eq!(msg.series_id.full_id(), "MSI-DK-184-14");
        assert_eq!(msg.warning_type, WarningType::SubareaWarning);
        assert_eq!(msg.status, Status::Published);
        assert_eq!(msg.updated.timestamp_millis(), 1_407_148_500_000);

        let area = msg.area.as_ref().unwrap();
        assert_eq!(area.id, 5);
        assert_eq!(area.parent.as_ref().unwrap().id, 1);

        assert_eq!(msg.locations[0].location_type, LocationType::Polygon);
        assert_eq!(msg.locations[0].points.len(), 3);
        assert_eq!(msg.attachments[0].name, "wreck.jpg");
        assert_eq!(msg.attachments[0].size, Some(12345));
    }

    #[test]
    fn test_record_without_id_is_dropped() {
        let wire = WireMessage::default();
        assert!(wire.into_message().is_none());
    }

    #[test]
    fn test_degenerate_polygon_demoted() {
        let json = r#"{"type": "POLYGON", "points": [{"lat": 55.0, "lon": 12.0}]}"#;
        let wire: WireLocation = serde_json::from_str(json).unwrap();
        let loc = map_location(wire);
        assert_eq!(loc.location_type, LocationType::Point);
    }

    #[test]
    fn test_main_type_derived_from_warning_type() {
        let json = r#"{"id": 1, "type": "TEMPORARY_NOTICE"}"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        let msg = wire.into_message().unwrap();
        assert_eq!(msg.series_id.main_type, MainType::Nm);
    }
}

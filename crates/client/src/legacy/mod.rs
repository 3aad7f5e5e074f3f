//! Legacy database provider.
//!
//! Composes the message list from two legacy kinds: plain warnings and
//! firing exercises, both read through the [`LegacySource`] collaborator.
//! A cheap `(id, watermark)` projection is compared before materializing
//! full messages, so an unchanged database costs one projection query
//! per refresh cycle.
//!
//! Firing exercises for the same area are merged into one message with
//! the validity window widened and the per-language time texts
//! concatenated; this quirk of the legacy editor data is preserved
//! as-is.

pub mod rows;

pub use rows::{
    ActiveKind, ActiveRow, AreaRow, CategoryRow, FiringExerciseRow, FiringPositionRow, InfoKind,
    InfoRow, PointRow, WarningRow,
};

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;

use navwarn_core::Error;
use navwarn_core::model::{
    Area, AreaDesc, Category, CategoryDesc, Chart, Localized, Location, LocationType, MainType,
    Message, Point, SeriesId, Status, WarningType,
};
use navwarn_core::store::{MessageProvider, Watermark};

/// Provider id of the legacy source.
pub const PROVIDER_ID: &str = "legacy";

/// Priority of the legacy source among registered providers.
pub const PRIORITY: i32 = 200;

/// Supported languages, in prioritized order.
pub const LANGUAGES: &[&str] = &["da", "en"];

/// Synthetic category attached to merged firing exercises.
pub const FIRING_EXERCISE_CATEGORY_ID: i64 = -1000;

static CHART_SIMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)$").expect("invalid pattern"));
static CHART_WITH_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+) \(INT (\d+)\)$").expect("invalid pattern"));

/// The legacy database boundary.
///
/// Implementations own the SQL; rows must come back in a stable,
/// consistent order across calls, since the projection is compared
/// element-wise for change detection.
pub trait LegacySource: Send + Sync {
    /// Cheap ordered projection of the active messages.
    fn active_rows(&self) -> Result<Vec<ActiveRow>, Error>;

    /// Full data of one warning, if still present.
    fn warning_row(&self, id: i64) -> Result<Option<WarningRow>, Error>;

    /// Full data of one firing exercise, if still present.
    fn firing_exercise_row(&self, id: i64) -> Result<Option<FiringExerciseRow>, Error>;
}

/// Provider for the legacy relational database.
pub struct LegacyProvider {
    source: Arc<dyn LegacySource>,
}

impl LegacyProvider {
    pub fn new(source: Arc<dyn LegacySource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl MessageProvider for LegacyProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn languages(&self) -> &[&str] {
        LANGUAGES
    }

    async fn watermarks(&self) -> Result<Option<Vec<Watermark>>, Error> {
        let rows = self.source.active_rows()?;
        Ok(Some(rows.iter().map(ActiveRow::watermark).collect()))
    }

    async fn load(&self) -> Result<Vec<Message>, Error> {
        let rows = self.source.active_rows()?;

        let mut messages: Vec<Message> = Vec::new();
        for row in rows {
            match row.kind {
                ActiveKind::Warning => match self.source.warning_row(row.id)? {
                    Some(data) => messages.push(map_warning(data)),
                    None => tracing::trace!("warning {} vanished between queries", row.id),
                },
                ActiveKind::FiringExercise => match self.source.firing_exercise_row(row.id)? {
                    Some(data) => {
                        let msg = map_firing_exercise(data);
                        merge_firing_exercise(&mut messages, msg);
                    }
                    None => {
                        tracing::trace!("firing exercise {} vanished between queries", row.id)
                    }
                },
            }
        }

        Ok(messages)
    }
}

/// Maps a legacy warning row to the shared model.
pub fn map_warning(row: WarningRow) -> Message {
    let series_id = parse_navtex_series(row.navtex_id.as_deref(), row.valid_from);

    let warning_type = match row.message_type.as_deref() {
        Some("Navtex") | Some("Navwarning") => WarningType::SubareaWarning,
        _ => WarningType::CoastalWarning,
    };

    let mut msg = Message::new(row.id, series_id, warning_type);
    msg.created = row.created;
    msg.updated = row.updated.or(row.created).unwrap_or(DateTime::<Utc>::MIN_UTC);
    msg.version = row.version;
    // Only published messages are exported from the legacy database.
    msg.status = Status::Published;
    msg.valid_from = row.valid_from;
    msg.valid_to = row.valid_to;

    // By convention the title field holds the Danish title; a "/" makes
    // it "Danish / English".
    let (title_da, title_en) = match &row.title {
        Some(title) if title.contains('/') => {
            let (da, en) = title.split_once('/').expect("checked for /");
            (Some(da.trim().to_string()), Some(en.trim().to_string()))
        }
        Some(title) => (Some(title.clone()), None),
        None => (None, None),
    };

    if defined(&title_en) || defined(&row.description_en) || defined(&row.vicinity_en) {
        let desc = msg.desc_mut("en");
        desc.title = title_en;
        desc.description = row.description_en.as_deref().map(txt_to_html);
        desc.vicinity = row.vicinity_en.clone();
    }
    if defined(&title_da) || defined(&row.description_da) || defined(&row.vicinity_da) {
        let desc = msg.desc_mut("da");
        desc.title = title_da;
        desc.description = row.description_da.as_deref().map(txt_to_html);
        desc.vicinity = row.vicinity_da.clone();
    }

    msg.area = build_area_chain(&row.areas);
    if let Some(category) = build_category_chain(&row.categories) {
        msg.categories.push(category);
    }

    if !row.points.is_empty() {
        msg.locations = build_warning_locations(row.location_type.as_deref(), &row.points);
    }

    msg
}

/// Maps a legacy firing exercise row to the shared model.
pub fn map_firing_exercise(row: FiringExerciseRow) -> Message {
    let year = row.valid_from.map(|d| d.year()).unwrap_or(0);
    let series_id = SeriesId::new(MainType::Msi, "DK", year);

    let mut msg = Message::new(row.id, series_id, WarningType::SubareaWarning);
    msg.created = row.created;
    msg.updated = row.updated.or(row.valid_from).unwrap_or(DateTime::<Utc>::MIN_UTC);
    msg.version = Some(1);
    msg.status = Status::Published;
    msg.valid_from = row.valid_from.map(rows::reset_seconds);
    msg.valid_to = row.valid_to.map(rows::reset_seconds);

    msg.desc_mut("da").title = Some("Skydeøvelser. Advarsel".to_string());
    msg.desc_mut("en").title = Some("Firing Exercises. Warning".to_string());
    format_firing_exercise_time(&mut msg, "da");
    format_firing_exercise_time(&mut msg, "en");

    msg.area = build_area_chain(&row.areas);
    msg.categories.push(firing_exercise_category());

    for info in &row.info {
        apply_info_row(&mut msg, info);
    }

    if !row.positions.is_empty() {
        let mut location = Location::new(LocationType::Polygon);
        for (i, pos) in row.positions.iter().enumerate() {
            let lat = pos.lat_degrees as f64 + pos.lat_minutes / 60.0;
            let lon = pos.lon_degrees as f64 + pos.lon_minutes / 60.0;
            location.points.push(Point::new(lat, lon, i as i32 + 1));
        }
        location.normalize();
        msg.locations.push(location);
    }

    msg
}

/// Merges a firing exercise into the list.
///
/// If an exercise for the same area already exists, the existing message
/// absorbs the new one: latest `updated` wins, the validity window is
/// widened, and each language's time text is concatenated line by line.
/// Otherwise the message is appended.
pub fn merge_firing_exercise(messages: &mut Vec<Message>, msg: Message) {
    let Some(area_id) = msg.area.as_ref().map(|a| a.id) else {
        messages.push(msg);
        return;
    };

    let existing = messages.iter_mut().find(|m| {
        m.categories.first().map(|c| c.id) == Some(FIRING_EXERCISE_CATEGORY_ID)
            && m.area.as_ref().map(|a| a.id) == Some(area_id)
    });

    let Some(existing) = existing else {
        messages.push(msg);
        return;
    };

    if msg.updated > existing.updated {
        existing.updated = msg.updated;
    }
    if let (Some(new_from), Some(old_from)) = (msg.valid_from, existing.valid_from)
        && new_from < old_from
    {
        existing.valid_from = Some(new_from);
    }
    if let (Some(new_to), Some(old_to)) = (msg.valid_to, existing.valid_to)
        && new_to > old_to
    {
        existing.valid_to = Some(new_to);
    }

    for desc in &mut existing.descs {
        let appended = msg
            .desc(&desc.lang)
            .and_then(|d| d.time.clone())
            .unwrap_or_default();
        let current = desc.time.take().unwrap_or_default();
        desc.time = Some(format!("{current}\n{appended}"));
    }
}

/// The fixed category attached to firing exercises.
pub fn firing_exercise_category() -> Category {
    let mut category = Category::new(FIRING_EXERCISE_CATEGORY_ID);
    category.descs.push(CategoryDesc::new("en", "Firing Exercises"));
    category.descs.push(CategoryDesc::new("da", "Skydeøvelser"));
    category
}

/// Extracts the series identifier from a navtex number like `DK-184-14`.
/// Rows without one fall back to the authority and the valid-from year.
fn parse_navtex_series(navtex_id: Option<&str>, valid_from: Option<DateTime<Utc>>) -> SeriesId {
    if let Some(navtex) = navtex_id {
        let parts: Vec<&str> = navtex.split('-').collect();
        if parts.len() == 3
            && let (Ok(number), Ok(year)) = (parts[1].parse::<i32>(), parts[2].parse::<i32>())
        {
            return SeriesId::new(MainType::Msi, parts[0], 2000 + year).with_number(number);
        }
    }
    let year = valid_from.map(|d| d.year()).unwrap_or(0);
    SeriesId::new(MainType::Msi, "DK", year)
}

/// Builds an owned parent chain from root-first area rows, returning the
/// leaf. Consecutive levels with identical names collapse into one; the
/// legacy data has areas listed as sub-areas of themselves.
fn build_area_chain(rows: &[AreaRow]) -> Option<Area> {
    let mut leaf: Option<Area> = None;
    let mut prev_names: Option<(Option<String>, Option<String>)> = None;

    for row in rows {
        if row.name_en.is_none() && row.name_da.is_none() {
            continue;
        }
        let names = (row.name_en.clone(), row.name_da.clone());
        if prev_names.as_ref() == Some(&names) {
            continue;
        }
        prev_names = Some(names);

        let mut area = Area::new(row.id);
        if let Some(name) = &row.name_en {
            area.descs.push(AreaDesc::new("en", name));
        }
        if let Some(name) = &row.name_da {
            area.descs.push(AreaDesc::new("da", name));
        }
        if let Some(parent) = leaf.take() {
            area.parent = Some(Box::new(parent));
        }
        leaf = Some(area);
    }

    leaf
}

/// Builds an owned parent chain from root-first category rows.
fn build_category_chain(rows: &[CategoryRow]) -> Option<Category> {
    let mut leaf: Option<Category> = None;

    for row in rows {
        if row.name_en.is_none() && row.name_da.is_none() {
            continue;
        }
        let mut category = Category::new(row.id);
        if let Some(name) = &row.name_en {
            category.descs.push(CategoryDesc::new("en", name));
        }
        if let Some(name) = &row.name_da {
            category.descs.push(CategoryDesc::new("da", name));
        }
        if let Some(parent) = leaf.take() {
            category.parent = Some(Box::new(parent));
        }
        leaf = Some(category);
    }

    leaf
}

/// Builds the locations of a warning. A `POINT` geometry carries one
/// point per location, so multiple points split into multiple locations.
fn build_warning_locations(location_type: Option<&str>, points: &[PointRow]) -> Vec<Location> {
    let location_type = match location_type {
        Some("Point") | Some("Points") => LocationType::Point,
        Some("Polygon") => LocationType::Polygon,
        _ => LocationType::Polyline,
    };

    let mut locations: Vec<Location> = Vec::new();
    for row in points {
        let needs_new = match locations.last() {
            None => true,
            Some(_) => location_type == LocationType::Point,
        };
        if needs_new {
            locations.push(Location::new(location_type));
        }
        let location = locations.last_mut().expect("location just ensured");
        location.radius = row.radius;
        location.points.push(Point::new(row.lat, row.lon, row.index));
    }

    if let Some(first) = locations.first_mut() {
        first.normalize();
    }
    locations
}

/// Copies one firing-exercise information row into the message.
fn apply_info_row(msg: &mut Message, info: &InfoRow) {
    match info.kind {
        InfoKind::Details => {
            append_description(msg, "da", None, info.text_da.as_deref());
            append_description(msg, "en", None, info.text_en.as_deref());
        }
        InfoKind::Note => {
            msg.desc_mut("da").note = info.text_da.clone();
            msg.desc_mut("en").note = info.text_en.clone();
        }
        InfoKind::Charts => {
            if let Some(text) = &info.text_da {
                msg.charts = parse_charts(text);
            }
        }
        InfoKind::Publication => {
            msg.desc_mut("da").publication = info.text_da.clone();
            msg.desc_mut("en").publication = info.text_en.clone();
        }
        InfoKind::Restriction => {
            append_description(msg, "da", Some("Forbud"), info.text_da.as_deref());
            append_description(msg, "en", Some("Restriction"), info.text_en.as_deref());
        }
        InfoKind::Signals => {
            append_description(msg, "da", Some("Skydesignaler"), info.text_da.as_deref());
            append_description(msg, "en", Some("Signals"), info.text_en.as_deref());
        }
    }
}

/// Appends a paragraph (and optional italicized subtitle) to the
/// description HTML of the given language.
fn append_description(msg: &mut Message, lang: &str, subtitle: Option<&str>, text: Option<&str>) {
    let desc = msg.desc_mut(lang);
    let mut html = desc.description.take().unwrap_or_default();

    if let Some(subtitle) = subtitle
        && !subtitle.trim().is_empty()
    {
        html.push_str(&format!("<p><i>{subtitle}</i></p>"));
    }
    if let Some(text) = text
        && !text.trim().is_empty()
    {
        html.push_str(&format!("<p>{}</p>", txt_to_html(text)));
    }

    desc.description = if html.is_empty() { None } else { Some(html) };
}

/// Parses the comma-separated chart list of a firing exercise, e.g.
/// `102, 103 (INT 1334)`.
fn parse_charts(text: &str) -> Vec<Chart> {
    let cleaned = text.replace('.', "");
    cleaned
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if let Some(caps) = CHART_WITH_INT.captures(part) {
                Some(Chart {
                    chart_number: caps[1].to_string(),
                    international_number: caps[2].parse().ok(),
                })
            } else {
                CHART_SIMPLE.captures(part).map(|caps| Chart {
                    chart_number: caps[1].to_string(),
                    international_number: None,
                })
            }
        })
        .collect()
}

/// Formats the firing-exercise time interval for one language, e.g.
/// `5 August 2014, kl. 09:00 - 17:00`.
fn format_firing_exercise_time(msg: &mut Message, lang: &str) {
    let (Some(from), Some(to)) = (msg.valid_from, msg.valid_to) else {
        return;
    };
    if !same_date(from, to) {
        return;
    }

    let prefix = if lang == "da" { "kl." } else { "hours" };
    let time = format!(
        "{}, {} {} - {}",
        from.format("%-d %B %Y"),
        prefix,
        from.format("%H:%M"),
        to.format("%H:%M")
    );
    msg.desc_mut(lang).time = Some(time);
}

/// Whether both timestamps fall on the same day; a `to` of midnight the
/// following day counts as the same day.
fn same_date(from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    if from.date_naive() == to.date_naive() {
        return true;
    }
    (to - chrono::Duration::milliseconds(1)).date_naive() == from.date_naive()
}

fn defined(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Escapes plain legacy text and turns line breaks into HTML.
fn txt_to_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn firing_exercise(id: i64, area_id: i64) -> FiringExerciseRow {
        FiringExerciseRow {
            id,
            updated: Some(dt(2014, 8, 1, 12, 0)),
            valid_from: Some(dt(2014, 8, 5, 9, 0)),
            valid_to: Some(dt(2014, 8, 5, 17, 0)),
            areas: vec![
                AreaRow { id: 1, name_en: Some("Denmark".into()), name_da: Some("Danmark".into()) },
                AreaRow {
                    id: area_id,
                    name_en: Some("Firing area".into()),
                    name_da: Some("Skydeområde".into()),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_map_warning_navtex_series() {
        let row = WarningRow {
            id: 7,
            updated: Some(dt(2014, 8, 1, 12, 0)),
            navtex_id: Some("DK-184-14".into()),
            message_type: Some("Navtex".into()),
            title: Some("Sundet / The Sound".into()),
            description_en: Some("English text\nwith a line break".into()),
            description_da: Some("Dansk tekst".into()),
            ..Default::default()
        };

        let msg = map_warning(row);
        assert_eq!(msg.series_id.full_id(), "MSI-DK-184-14");
        assert_eq!(msg.warning_type, WarningType::SubareaWarning);
        assert_eq!(msg.status, Status::Published);
        assert_eq!(msg.desc("da").unwrap().title.as_deref(), Some("Sundet"));
        assert_eq!(msg.desc("en").unwrap().title.as_deref(), Some("The Sound"));
        assert_eq!(
            msg.desc("en").unwrap().description.as_deref(),
            Some("English text<br>with a line break")
        );
    }

    #[test]
    fn test_map_warning_without_navtex_number() {
        let row = WarningRow {
            id: 7,
            valid_from: Some(dt(2014, 8, 5, 9, 0)),
            message_type: Some("Priority".into()),
            title: Some("Titel".into()),
            ..Default::default()
        };

        let msg = map_warning(row);
        assert_eq!(msg.series_id.authority, "DK");
        assert_eq!(msg.series_id.year, 2014);
        assert_eq!(msg.series_id.number, None);
        assert_eq!(msg.warning_type, WarningType::CoastalWarning);
    }

    #[test]
    fn test_area_chain_collapses_duplicate_levels() {
        let rows = vec![
            AreaRow { id: 1, name_en: Some("Denmark".into()), name_da: Some("Danmark".into()) },
            AreaRow { id: 2, name_en: Some("Denmark".into()), name_da: Some("Danmark".into()) },
            AreaRow { id: 3, name_en: Some("The Sound".into()), name_da: Some("Sundet".into()) },
        ];

        let leaf = build_area_chain(&rows).unwrap();
        assert_eq!(leaf.id, 3);
        let chain: Vec<i64> = leaf.chain().map(|a| a.id).collect();
        assert_eq!(chain, vec![3, 1]);
    }

    #[test]
    fn test_point_locations_split_per_point() {
        let points = vec![
            PointRow { index: 1, lat: 55.0, lon: 12.0, radius: Some(500) },
            PointRow { index: 2, lat: 56.0, lon: 11.0, radius: Some(500) },
        ];
        let locations = build_warning_locations(Some("Points"), &points);
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].points.len(), 1);
        assert_eq!(locations[1].points.len(), 1);
    }

    #[test]
    fn test_polyline_locations_share_points() {
        let points = vec![
            PointRow { index: 1, lat: 55.0, lon: 12.0, radius: None },
            PointRow { index: 2, lat: 56.0, lon: 11.0, radius: None },
        ];
        let locations = build_warning_locations(Some("Polyline"), &points);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].points.len(), 2);
    }

    #[test]
    fn test_parse_charts() {
        let charts = parse_charts("102, 103 (INT 1334), kortet.");
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].chart_number, "102");
        assert_eq!(charts[0].international_number, None);
        assert_eq!(charts[1].chart_number, "103");
        assert_eq!(charts[1].international_number, Some(1334));
    }

    #[test]
    fn test_map_firing_exercise() {
        let mut row = firing_exercise(11, 9);
        row.info.push(InfoRow {
            kind: InfoKind::Restriction,
            text_da: Some("Sejlads forbudt".into()),
            text_en: Some("Navigation prohibited".into()),
        });
        row.positions.push(FiringPositionRow {
            lat_degrees: 55,
            lat_minutes: 30.0,
            lon_degrees: 12,
            lon_minutes: 15.0,
        });

        let msg = map_firing_exercise(row);
        assert_eq!(msg.categories[0].id, FIRING_EXERCISE_CATEGORY_ID);
        assert_eq!(msg.desc("en").unwrap().title.as_deref(), Some("Firing Exercises. Warning"));
        assert_eq!(
            msg.desc("en").unwrap().time.as_deref(),
            Some("5 August 2014, hours 09:00 - 17:00")
        );
        assert!(
            msg.desc("en")
                .unwrap()
                .description
                .as_deref()
                .unwrap()
                .contains("<p><i>Restriction</i></p>")
        );
        assert!((msg.locations[0].points[0].lat - 55.5).abs() < 1e-9);
        assert!((msg.locations[0].points[0].lon - 12.25).abs() < 1e-9);
    }

    #[test]
    fn test_merge_firing_exercises_same_area() {
        let first = map_firing_exercise(firing_exercise(11, 9));

        let mut second_row = firing_exercise(12, 9);
        second_row.updated = Some(dt(2014, 8, 2, 12, 0));
        second_row.valid_from = Some(dt(2014, 8, 6, 9, 0));
        second_row.valid_to = Some(dt(2014, 8, 6, 17, 0));
        let second = map_firing_exercise(second_row);

        let mut messages = vec![first];
        merge_firing_exercise(&mut messages, second);

        assert_eq!(messages.len(), 1);
        let merged = &messages[0];
        assert_eq!(merged.id, 11);
        assert_eq!(merged.updated, dt(2014, 8, 2, 12, 0));
        assert_eq!(merged.valid_from, Some(dt(2014, 8, 5, 9, 0)));
        assert_eq!(merged.valid_to, Some(dt(2014, 8, 6, 17, 0)));

        let time = merged.desc("en").unwrap().time.as_deref().unwrap();
        assert_eq!(
            time,
            "5 August 2014, hours 09:00 - 17:00\n6 August 2014, hours 09:00 - 17:00"
        );
    }

    #[test]
    fn test_merge_firing_exercises_different_areas() {
        let first = map_firing_exercise(firing_exercise(11, 9));
        let second = map_firing_exercise(firing_exercise(12, 8));

        let mut messages = vec![first];
        merge_firing_exercise(&mut messages, second);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_same_date_midnight_tolerance() {
        assert!(same_date(dt(2014, 8, 5, 9, 0), dt(2014, 8, 5, 17, 0)));
        assert!(same_date(dt(2014, 8, 5, 9, 0), dt(2014, 8, 6, 0, 0)));
        assert!(!same_date(dt(2014, 8, 5, 9, 0), dt(2014, 8, 6, 0, 1)));
    }
}

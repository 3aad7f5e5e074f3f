//! Raw row types at the legacy database boundary.
//!
//! The legacy source is modeled as a collaborator returning raw rows:
//! a cheap ordered projection of active messages, plus per-message data
//! rows for the two legacy kinds (warnings and firing exercises). The
//! SQL producing these rows lives behind the [`LegacySource`] trait and
//! is out of scope here.
//!
//! [`LegacySource`]: crate::legacy::LegacySource

use chrono::{DateTime, Timelike, Utc};

use navwarn_core::store::Watermark;

/// Kind of an active legacy row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveKind {
    Warning,
    FiringExercise,
}

/// One row of the cheap active-messages projection, in upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRow {
    pub id: i64,
    pub kind: ActiveKind,
    pub updated: Option<DateTime<Utc>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl ActiveRow {
    /// The change-detection watermark of this row.
    ///
    /// Legacy firing exercises carry no change date, so their validity
    /// window (seconds reset) stands in for it.
    pub fn watermark(&self) -> Watermark {
        let updated = match self.kind {
            ActiveKind::Warning => self.updated,
            ActiveKind::FiringExercise => {
                self.valid_to.or(self.valid_from).map(reset_seconds)
            }
        };
        Watermark::new(self.id, updated.unwrap_or(DateTime::<Utc>::MIN_UTC))
    }
}

/// One level of an area chain, ordered root-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaRow {
    pub id: i64,
    pub name_en: Option<String>,
    pub name_da: Option<String>,
}

/// One level of a category chain, ordered root-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRow {
    pub id: i64,
    pub name_en: Option<String>,
    pub name_da: Option<String>,
}

/// A location point of a legacy warning.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRow {
    pub index: i32,
    pub lat: f64,
    pub lon: f64,
    pub radius: Option<i32>,
}

/// Full data of a legacy warning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarningRow {
    pub id: i64,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub version: Option<i32>,
    /// Navtex number, e.g. `DK-184-14`; absent for some legacy rows.
    pub navtex_id: Option<String>,
    /// Legacy message type name (`Navtex`, `Navwarning`, ...).
    pub message_type: Option<String>,
    /// By convention the Danish title, or `Danish / English`.
    pub title: Option<String>,
    pub description_en: Option<String>,
    pub description_da: Option<String>,
    pub vicinity_en: Option<String>,
    pub vicinity_da: Option<String>,
    /// Area chain levels, root-first.
    pub areas: Vec<AreaRow>,
    /// Category chain levels, root-first.
    pub categories: Vec<CategoryRow>,
    pub location_type: Option<String>,
    pub points: Vec<PointRow>,
}

/// Kind of a firing-exercise information row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    Details,
    Note,
    Charts,
    Publication,
    Restriction,
    Signals,
}

/// One information row of a firing exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoRow {
    pub kind: InfoKind,
    pub text_da: Option<String>,
    pub text_en: Option<String>,
}

/// A firing-area position in degrees and decimal minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct FiringPositionRow {
    pub lat_degrees: i32,
    pub lat_minutes: f64,
    pub lon_degrees: i32,
    pub lon_minutes: f64,
}

/// Full data of a legacy firing exercise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiringExerciseRow {
    pub id: i64,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    /// Area chain levels, root-first.
    pub areas: Vec<AreaRow>,
    pub info: Vec<InfoRow>,
    pub positions: Vec<FiringPositionRow>,
}

/// Zeroes the sub-minute part of a timestamp.
pub fn reset_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0).and_then(|d| d.with_nanosecond(0)).unwrap_or(dt)
}

//! The message entity and its classification enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Area, Attachment, Category, Localized, Location};

/// Main message series: maritime safety information or notices to mariners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MainType {
    Msi,
    Nm,
}

impl MainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MainType::Msi => "MSI",
            MainType::Nm => "NM",
        }
    }
}

impl fmt::Display for MainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    PermanentNotice,
    TemporaryNotice,
    PreliminaryNotice,
    MiscellaneousNotice,
    CoastalWarning,
    SubareaWarning,
    NavareaWarning,
    LocalWarning,
}

impl WarningType {
    /// The main series this warning category belongs to.
    pub fn main_type(&self) -> MainType {
        match self {
            WarningType::PermanentNotice
            | WarningType::TemporaryNotice
            | WarningType::PreliminaryNotice
            | WarningType::MiscellaneousNotice => MainType::Nm,
            WarningType::CoastalWarning
            | WarningType::SubareaWarning
            | WarningType::NavareaWarning
            | WarningType::LocalWarning => MainType::Msi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::PermanentNotice => "PERMANENT_NOTICE",
            WarningType::TemporaryNotice => "TEMPORARY_NOTICE",
            WarningType::PreliminaryNotice => "PRELIMINARY_NOTICE",
            WarningType::MiscellaneousNotice => "MISCELLANEOUS_NOTICE",
            WarningType::CoastalWarning => "COASTAL_WARNING",
            WarningType::SubareaWarning => "SUBAREA_WARNING",
            WarningType::NavareaWarning => "NAVAREA_WARNING",
            WarningType::LocalWarning => "LOCAL_WARNING",
        }
    }

    /// Parses a warning category name as accepted in filter criteria.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PERMANENT_NOTICE" => Some(WarningType::PermanentNotice),
            "TEMPORARY_NOTICE" => Some(WarningType::TemporaryNotice),
            "PRELIMINARY_NOTICE" => Some(WarningType::PreliminaryNotice),
            "MISCELLANEOUS_NOTICE" => Some(WarningType::MiscellaneousNotice),
            "COASTAL_WARNING" => Some(WarningType::CoastalWarning),
            "SUBAREA_WARNING" => Some(WarningType::SubareaWarning),
            "NAVAREA_WARNING" => Some(WarningType::NavareaWarning),
            "LOCAL_WARNING" => Some(WarningType::LocalWarning),
            _ => None,
        }
    }
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Draft,
    Published,
    Expired,
    Cancelled,
    Deleted,
}

/// Series identifier: authority, year and an optional sequence number.
///
/// Forms the human-readable short and full ids, e.g. `MSI-DK-184-14`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesId {
    pub main_type: MainType,
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i32>,
    pub year: i32,
}

impl SeriesId {
    pub fn new(main_type: MainType, authority: impl Into<String>, year: i32) -> Self {
        Self { main_type, authority: authority.into(), number: None, year }
    }

    pub fn with_number(mut self, number: i32) -> Self {
        self.number = Some(number);
        self
    }

    /// Short id without the authority, e.g. `MSI-184-14`.
    pub fn short_id(&self) -> String {
        match self.number {
            Some(n) => format!("{}-{}-{:02}", self.main_type, n, self.year % 100),
            None => format!("{}-{:02}", self.main_type, self.year % 100),
        }
    }

    /// Full id including the authority, e.g. `MSI-DK-184-14`.
    pub fn full_id(&self) -> String {
        match self.number {
            Some(n) => format!("{}-{}-{}-{:02}", self.main_type, self.authority, n, self.year % 100),
            None => format!("{}-{}-{:02}", self.main_type, self.authority, self.year % 100),
        }
    }
}

/// A sea chart referenced by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub chart_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub international_number: Option<i32>,
}

/// How a referenced message relates to this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    Reference,
    Repetition,
    Cancellation,
    Update,
}

/// A cross-reference to another message in a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub series_id: SeriesId,
    pub kind: ReferenceKind,
}

/// Localized descriptive content of a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDesc {
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// HTML body; may embed repository links that get rewritten on mirror.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_categories: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MessageDesc {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into(), ..Default::default() }
    }

    /// Whether any textual field is non-blank.
    pub fn defined(&self) -> bool {
        [
            &self.title,
            &self.description,
            &self.other_categories,
            &self.time,
            &self.vicinity,
            &self.note,
            &self.publication,
            &self.source,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// A normalized safety-information message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Change-detection watermark; monotonically non-decreasing across
    /// successive loads of the same logical message.
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    pub series_id: SeriesId,
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<Chart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_datum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_information: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descs: Vec<MessageDesc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Provider tag, stamped at ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Message {
    pub fn new(id: i64, series_id: SeriesId, warning_type: WarningType) -> Self {
        Self {
            id,
            created: None,
            updated: DateTime::<Utc>::MIN_UTC,
            version: None,
            series_id,
            warning_type,
            status: Status::Published,
            area: None,
            categories: Vec::new(),
            locations: Vec::new(),
            charts: Vec::new(),
            horizontal_datum: None,
            valid_from: None,
            valid_to: None,
            cancellation_date: None,
            references: Vec::new(),
            original_information: None,
            descs: Vec::new(),
            attachments: Vec::new(),
            provider: None,
        }
    }

    /// Returns the description for the language, creating it if absent.
    pub fn desc_mut(&mut self, lang: &str) -> &mut MessageDesc {
        if let Some(idx) = self.descs.iter().position(|d| d.lang == lang) {
            return &mut self.descs[idx];
        }
        self.descs.push(MessageDesc::new(lang));
        self.descs.last_mut().expect("desc just pushed")
    }

    /// Sorts all description lists so the given language comes first,
    /// recursing through area, categories, locations and points.
    pub fn sort_by_lang(&mut self, lang: &str) {
        self.sort_descs(lang);
        if let Some(area) = &mut self.area {
            area.sort_chain_descs(lang);
        }
        for cat in &mut self.categories {
            cat.sort_chain_descs(lang);
        }
        for loc in &mut self.locations {
            loc.sort_descs(lang);
            for pt in &mut loc.points {
                pt.sort_descs(lang);
            }
        }
    }
}

impl Localized for Message {
    type Desc = MessageDesc;

    fn descs(&self) -> &[MessageDesc] {
        &self.descs
    }

    fn descs_mut(&mut self) -> &mut Vec<MessageDesc> {
        &mut self.descs
    }

    fn desc_lang(desc: &MessageDesc) -> &str {
        &desc.lang
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_type_main_type() {
        assert_eq!(WarningType::CoastalWarning.main_type(), MainType::Msi);
        assert_eq!(WarningType::NavareaWarning.main_type(), MainType::Msi);
        assert_eq!(WarningType::TemporaryNotice.main_type(), MainType::Nm);
        assert_eq!(WarningType::PermanentNotice.main_type(), MainType::Nm);
    }

    #[test]
    fn test_warning_type_parse_roundtrip() {
        for wt in [
            WarningType::PermanentNotice,
            WarningType::TemporaryNotice,
            WarningType::PreliminaryNotice,
            WarningType::MiscellaneousNotice,
            WarningType::CoastalWarning,
            WarningType::SubareaWarning,
            WarningType::NavareaWarning,
            WarningType::LocalWarning,
        ] {
            assert_eq!(WarningType::parse(wt.as_str()), Some(wt));
        }
        assert_eq!(WarningType::parse("BOGUS"), None);
    }

    #[test]
    fn test_series_id_formatting() {
        let id = SeriesId::new(MainType::Msi, "DK", 2014).with_number(184);
        assert_eq!(id.short_id(), "MSI-184-14");
        assert_eq!(id.full_id(), "MSI-DK-184-14");

        let no_number = SeriesId::new(MainType::Nm, "DK", 2014);
        assert_eq!(no_number.full_id(), "NM-DK-14");
    }

    #[test]
    fn test_desc_defined() {
        let mut desc = MessageDesc::new("en");
        assert!(!desc.defined());
        desc.vicinity = Some("  ".to_string());
        assert!(!desc.defined());
        desc.title = Some("The Sound".to_string());
        assert!(desc.defined());
    }

    #[test]
    fn test_sort_by_lang_recurses() {
        let mut msg = Message::new(1, SeriesId::new(MainType::Msi, "DK", 2014), WarningType::CoastalWarning);
        msg.descs.push(MessageDesc::new("da"));
        msg.descs.push(MessageDesc::new("en"));

        let mut area = Area::new(5);
        area.descs.push(crate::model::AreaDesc::new("da", "Sundet"));
        area.descs.push(crate::model::AreaDesc::new("en", "The Sound"));
        msg.area = Some(area);

        msg.sort_by_lang("en");
        assert_eq!(msg.descs[0].lang, "en");
        assert_eq!(msg.area.as_ref().unwrap().descs[0].lang, "en");
    }

    #[test]
    fn test_desc_mut_creates_once() {
        let mut msg = Message::new(1, SeriesId::new(MainType::Msi, "DK", 2014), WarningType::CoastalWarning);
        msg.desc_mut("da").title = Some("Titel".to_string());
        msg.desc_mut("da").note = Some("Note".to_string());
        assert_eq!(msg.descs.len(), 1);
        assert_eq!(msg.descs[0].title.as_deref(), Some("Titel"));
        assert_eq!(msg.descs[0].note.as_deref(), Some("Note"));
    }
}

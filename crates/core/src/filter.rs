//! Message filter criteria and the filtering engine.
//!
//! A `MessageFilter` is an immutable, request-scoped value describing a
//! served view: language, detail level, and type/area/category
//! constraints. It defines a deterministic cache key and an emptiness
//! predicate used to bypass caching entirely.
//!
//! Filtering is pure: messages passing the active constraints are
//! *transformed*, not merely selected — descriptions collapse to the
//! requested language (with first-available fallback) and, in compact
//! mode, heavy fields are dropped.

use std::collections::BTreeSet;

use crate::error::Error;
use crate::model::{
    Area, Category, Localized, Location, MainType, Message, WarningType,
};

/// Filter criteria for a served message view.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFilter {
    lang: Option<String>,
    detailed: bool,
    main_types: BTreeSet<MainType>,
    types: BTreeSet<WarningType>,
    area_id: Option<i64>,
    category_id: Option<i64>,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            lang: None,
            detailed: true,
            main_types: BTreeSet::new(),
            types: BTreeSet::new(),
            area_id: None,
            category_id: None,
        }
    }
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the language to collapse descriptions to.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        self.lang = if lang.trim().is_empty() { None } else { Some(lang) };
        self
    }

    /// Sets whether to include detailed data (locations, categories,
    /// charts, references, attachments).
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Adds type constraints. Each value is either a main type (`MSI`,
    /// `NM`) or a warning category name; unknown names are rejected.
    pub fn types<'a, I>(mut self, types: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for value in types {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match value {
                "MSI" => {
                    self.main_types.insert(MainType::Msi);
                }
                "NM" => {
                    self.main_types.insert(MainType::Nm);
                }
                other => {
                    let parsed = WarningType::parse(other)
                        .ok_or_else(|| Error::InvalidCriteria(format!("unknown type {other}")))?;
                    self.types.insert(parsed);
                }
            }
        }
        Ok(self)
    }

    /// Sets the area id to filter by (matches anywhere in the parent chain).
    pub fn area(mut self, area_id: i64) -> Self {
        self.area_id = Some(area_id);
        self
    }

    /// Sets the category id to filter by (matches anywhere in any chain).
    pub fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn lang_ref(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn is_detailed(&self) -> bool {
        self.detailed
    }

    /// Whether no filtering is requested at all.
    ///
    /// Callers must check this before invoking [`filter`](Self::filter):
    /// the empty filter serves the live list directly, uncopied and
    /// uncached, while `filter` always applies language collapsing.
    pub fn is_empty(&self) -> bool {
        self.lang.is_none()
            && self.main_types.is_empty()
            && self.types.is_empty()
            && self.area_id.is_none()
            && self.category_id.is_none()
    }

    /// A key that uniquely and deterministically identifies the filter.
    ///
    /// Type sets iterate in sorted order, so logically equal filters
    /// produce byte-identical keys.
    pub fn key(&self) -> String {
        let main_types =
            self.main_types.iter().map(MainType::as_str).collect::<Vec<_>>().join("-");
        let types = self.types.iter().map(WarningType::as_str).collect::<Vec<_>>().join("-");
        format!(
            "{}_{}_{}_{}_{}_{}",
            self.lang.as_deref().unwrap_or(""),
            self.detailed,
            main_types,
            types,
            self.area_id.map(|id| id.to_string()).unwrap_or_default(),
            self.category_id.map(|id| id.to_string()).unwrap_or_default(),
        )
    }

    /// Filters and transforms the message list according to the criteria.
    pub fn filter(&self, messages: &[Message]) -> Vec<Message> {
        messages
            .iter()
            .filter(|msg| self.includes(msg))
            .map(|msg| self.transform(msg))
            .filter(|msg| !msg.descs.is_empty())
            .collect()
    }

    /// Whether the message passes all active constraints.
    fn includes(&self, msg: &Message) -> bool {
        if !self.main_types.is_empty() && !self.main_types.contains(&msg.series_id.main_type) {
            return false;
        }

        if !self.types.is_empty() && !self.types.contains(&msg.warning_type) {
            return false;
        }

        if let Some(area_id) = self.area_id {
            // A message with no area fails an active area filter.
            let found = msg.area.as_ref().is_some_and(|a| a.chain_contains(area_id));
            if !found {
                return false;
            }
        }

        if let Some(category_id) = self.category_id {
            let found = msg.categories.iter().any(|c| c.chain_contains(category_id));
            if !found {
                return false;
            }
        }

        true
    }

    /// Builds the transformed copy served for this filter.
    fn transform(&self, msg: &Message) -> Message {
        let lang = self.lang.as_deref();

        let mut out = Message::new(msg.id, msg.series_id.clone(), msg.warning_type);
        out.created = msg.created;
        out.updated = msg.updated;
        out.version = msg.version;
        out.status = msg.status;
        out.valid_from = msg.valid_from;
        out.valid_to = msg.valid_to;
        out.provider = msg.provider.clone();
        out.descs = msg.select_descs(lang);

        if self.detailed {
            out.area = msg.area.as_ref().map(|a| collapse_area(a, lang));
            out.categories = msg.categories.iter().map(|c| collapse_category(c, lang)).collect();
            out.locations = msg.locations.iter().map(|l| collapse_location(l, lang)).collect();
            out.charts = msg.charts.clone();
            out.references = msg.references.clone();
            out.attachments = msg.attachments.clone();
            out.horizontal_datum = msg.horizontal_datum.clone();
            out.cancellation_date = msg.cancellation_date;
            out.original_information = msg.original_information;
        }

        out
    }
}

fn collapse_area(area: &Area, lang: Option<&str>) -> Area {
    Area {
        id: area.id,
        parent: area.parent.as_deref().map(|p| Box::new(collapse_area(p, lang))),
        sort_order: area.sort_order,
        descs: area.select_descs(lang),
    }
}

fn collapse_category(cat: &Category, lang: Option<&str>) -> Category {
    Category {
        id: cat.id,
        parent: cat.parent.as_deref().map(|p| Box::new(collapse_category(p, lang))),
        descs: cat.select_descs(lang),
    }
}

fn collapse_location(loc: &Location, lang: Option<&str>) -> Location {
    let mut points = loc.points.clone();
    for pt in &mut points {
        pt.descs = pt.select_descs(lang);
    }
    Location {
        location_type: loc.location_type,
        radius: loc.radius,
        points,
        descs: loc.select_descs(lang),
    }
}

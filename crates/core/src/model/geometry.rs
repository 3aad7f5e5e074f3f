//! Message geometry: typed locations owning ordered point lists.

use serde::{Deserialize, Serialize};

use super::Localized;

/// Geometry kind of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Point,
    Polyline,
    Polygon,
}

/// Localized location description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationDesc {
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Localized point description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointDesc {
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single coordinate of a location, ordered by `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
    pub index: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descs: Vec<PointDesc>,
}

impl Point {
    pub fn new(lat: f64, lon: f64, index: i32) -> Self {
        Self { lat, lon, index, descs: Vec::new() }
    }
}

impl Localized for Point {
    type Desc = PointDesc;

    fn descs(&self) -> &[PointDesc] {
        &self.descs
    }

    fn descs_mut(&mut self) -> &mut Vec<PointDesc> {
        &mut self.descs
    }

    fn desc_lang(desc: &PointDesc) -> &str {
        &desc.lang
    }
}

/// A typed geometry owning an ordered list of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub location_type: LocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descs: Vec<LocationDesc>,
}

impl Location {
    pub fn new(location_type: LocationType) -> Self {
        Self { location_type, radius: None, points: Vec::new(), descs: Vec::new() }
    }

    /// Demotes degenerate geometries: a polygon needs at least three
    /// points and a polyline at least two.
    pub fn normalize(&mut self) {
        if self.location_type == LocationType::Polygon && self.points.len() < 3 {
            self.location_type = LocationType::Polyline;
        }
        if self.location_type == LocationType::Polyline && self.points.len() < 2 {
            self.location_type = LocationType::Point;
        }
    }
}

impl Localized for Location {
    type Desc = LocationDesc;

    fn descs(&self) -> &[LocationDesc] {
        &self.descs
    }

    fn descs_mut(&mut self) -> &mut Vec<LocationDesc> {
        &mut self.descs
    }

    fn desc_lang(desc: &LocationDesc) -> &str {
        &desc.lang
    }
}

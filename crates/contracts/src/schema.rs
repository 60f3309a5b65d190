//! Tabular schema definition used by the Validation Engine

use serde::{Deserialize, Serialize};

/// Semantic type of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Free text, only presence is checked
    Text,
    /// Decimal degrees, default range [-90, 90]
    Latitude,
    /// Decimal degrees, default range [-180, 180]
    Longitude,
    /// Numeric physical measurement with an optional range
    Measurement,
}

/// One required header column and its value constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,

    /// Empty values are violations when set
    #[serde(default = "default_required")]
    pub required: bool,

    /// Inclusive lower bound; kind default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive upper bound; kind default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

fn default_required() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            min: None,
            max: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Effective inclusive bounds; `None` for text columns
    pub fn bounds(&self) -> Option<(f64, f64)> {
        let (lo, hi) = match self.kind {
            ColumnKind::Text => return None,
            ColumnKind::Latitude => (-90.0, 90.0),
            ColumnKind::Longitude => (-180.0, 180.0),
            ColumnKind::Measurement => (f64::NEG_INFINITY, f64::INFINITY),
        };
        Some((self.min.unwrap_or(lo), self.max.unwrap_or(hi)))
    }
}

/// Ordered list of required columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub columns: Vec<ColumnSpec>,
}

impl SchemaConfig {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl Default for SchemaConfig {
    /// Surface weather observation layout
    fn default() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("station_id", ColumnKind::Text),
                ColumnSpec::new("observed_at", ColumnKind::Text),
                ColumnSpec::new("latitude", ColumnKind::Latitude),
                ColumnSpec::new("longitude", ColumnKind::Longitude),
                ColumnSpec::new("temperature_c", ColumnKind::Measurement).with_range(-90.0, 60.0),
                ColumnSpec::new("relative_humidity", ColumnKind::Measurement)
                    .with_range(0.0, 100.0),
                ColumnSpec::new("pressure_hpa", ColumnKind::Measurement).with_range(850.0, 1090.0),
                ColumnSpec::new("wind_speed_ms", ColumnKind::Measurement).with_range(0.0, 120.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_default_bounds() {
        let lat = ColumnSpec::new("latitude", ColumnKind::Latitude);
        assert_eq!(lat.bounds(), Some((-90.0, 90.0)));

        let lon = ColumnSpec::new("longitude", ColumnKind::Longitude).with_range(30.0, 40.0);
        assert_eq!(lon.bounds(), Some((30.0, 40.0)));

        assert_eq!(ColumnSpec::new("id", ColumnKind::Text).bounds(), None);
    }

    #[test]
    fn test_default_schema_has_coordinates() {
        let schema = SchemaConfig::default();
        let names: Vec<_> = schema.column_names().collect();
        assert!(names.contains(&"latitude"));
        assert!(names.contains(&"longitude"));
        assert_eq!(names.len(), 8);
    }
}

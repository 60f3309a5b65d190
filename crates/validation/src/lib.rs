//! # Validation
//!
//! Validation Engine for tabular meteorological payloads.
//!
//! # Example
//!
//! ```
//! use validation::Validator;
//!
//! let data = b"station_id,observed_at,latitude,longitude,temperature_c,relative_humidity,pressure_hpa,wind_speed_ms\n\
//!              TLV01,2025-01-02T03:00:00Z,32.08,34.78,21.5,64,1013.2,3.4\n";
//! let outcome = Validator::default().validate(data);
//! assert!(outcome.is_accepted());
//! ```

pub mod engine;
pub mod report;

pub use engine::Validator;
pub use report::{report_key, ErrorReport, ERROR_REPORT_SUFFIX};

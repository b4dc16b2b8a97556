use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Geographic (district) or social (tribute) taxonomy entry. Both share the
/// same shape and endpoints, distinguished by `LocationKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Location {
    pub id: i64,
    pub name: String,
}

pub type District = Location;
pub type Tribute = Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    District,
    Tribute,
}

impl LocationKind {
    pub fn base_path(&self) -> &'static str {
        match self {
            LocationKind::District => "/admins/districts",
            LocationKind::Tribute => "/admins/tributes",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::District => write!(f, "district"),
            LocationKind::Tribute => write!(f, "tribute"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct LocationRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
}

impl LocationRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }
}

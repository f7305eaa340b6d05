//! Route definitions
//!
//! A route file is `{"name": "156", "coordinates": [[lat, lng], ...]}`.
//! Extra fields (stop lists, colors) are ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// One point of a route
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "(f64, f64)")]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<(f64, f64)> for Waypoint {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Named, ordered sequence of waypoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Route {
    pub name: String,
    #[serde(rename = "coordinates")]
    pub waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(name: impl Into<String>, waypoints: Vec<Waypoint>) -> Self {
        Self {
            name: name.into(),
            waypoints,
        }
    }

    /// Load a single route file
    pub fn from_file(path: &Path) -> Result<Self> {
        match read_route(path)? {
            Some(route) => Ok(route),
            None => Err(route_error(path, "missing name or coordinates")),
        }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Load every `*.json` route in a directory, ordered by file name
///
/// Files without `name` or `coordinates`, and routes with no waypoints, are
/// skipped with a warning. Unreadable or malformed files are errors.
pub fn load_routes(dir: &Path) -> Result<Vec<Route>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();

    let mut routes = Vec::with_capacity(paths.len());
    for path in paths {
        match read_route(&path)? {
            Some(route) if !route.is_empty() => routes.push(route),
            Some(_) => tracing::warn!(path = %path.display(), "Skipping route without waypoints"),
            None => tracing::warn!(path = %path.display(), "Skipping file without name or coordinates"),
        }
    }

    tracing::info!(dir = %dir.display(), routes = routes.len(), "Routes loaded");
    Ok(routes)
}

fn read_route(path: &Path) -> Result<Option<Route>> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| route_error(path, e))?;

    if value.get("name").is_none() || value.get("coordinates").is_none() {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| route_error(path, e))
}

fn route_error(path: &Path, reason: impl ToString) -> Error {
    Error::Route {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

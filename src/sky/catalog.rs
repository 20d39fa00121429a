//! Star catalog and constellation figures.
//!
//! Catalogs are JSON documents:
//!
//! ```json
//! {
//!   "stars": [{ "id": 32349, "name": "Sirius", "ra": 101.287, "dec": -16.716, "magnitude": -1.46 }],
//!   "constellations": [{ "name": "Gemini", "edges": [[36850, 37826]] }]
//! }
//! ```
//!
//! Right ascension and declination are J2000 degrees. `constellations` may be
//! omitted or empty.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::common::utils::private_path;

const BUILTIN_CATALOG: &str = include_str!("../../assets/bright_stars.json");

static BUILTIN: OnceCell<StarCatalog> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogStar {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Right ascension in degrees.
    pub ra: f64,
    /// Declination in degrees.
    pub dec: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Constellation {
    pub name: String,
    pub edges: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StarCatalog {
    pub stars: Vec<CatalogStar>,
    #[serde(default)]
    pub constellations: Vec<Constellation>,
}

impl StarCatalog {
    /// Parse and check a JSON catalog.
    pub fn from_json(content: &str) -> Result<Self> {
        let catalog: StarCatalog =
            serde_json::from_str(content).context("Failed to parse star catalog")?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read star catalog {}", private_path(path)))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid star catalog {}", private_path(path)))
    }

    /// The bundled bright star list, parsed once per process.
    pub fn builtin() -> Result<&'static StarCatalog> {
        BUILTIN.get_or_try_init(|| Self::from_json(BUILTIN_CATALOG))
    }

    /// Load `path`, or fall back to the bundled catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<StarCatalog> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()?.clone()),
        }
    }

    /// All edges of all figures.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        self.constellations
            .iter()
            .flat_map(|c| c.edges.iter().copied())
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.stars.len());
        for star in &self.stars {
            if !seen.insert(star.id) {
                anyhow::bail!("duplicate star id {}", star.id);
            }
            if !(0.0..360.0).contains(&star.ra) {
                anyhow::bail!("star {} has right ascension {} outside [0, 360)", star.id, star.ra);
            }
            if !(-90.0..=90.0).contains(&star.dec) {
                anyhow::bail!("star {} has declination {} outside [-90, 90]", star.id, star.dec);
            }
            if !star.magnitude.is_finite() {
                anyhow::bail!("star {} has no finite magnitude", star.id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = StarCatalog::builtin().unwrap();
        assert!(catalog.stars.len() >= 40);
        assert!(catalog.stars.iter().any(|s| s.name.as_deref() == Some("Sirius")));
    }

    #[test]
    fn test_builtin_edges_reference_known_stars() {
        let catalog = StarCatalog::builtin().unwrap();
        let ids: HashSet<u32> = catalog.stars.iter().map(|s| s.id).collect();
        let edges = catalog.edges();
        assert!(!edges.is_empty());
        for (a, b) in edges {
            assert!(ids.contains(&a) && ids.contains(&b), "dangling edge {a}-{b}");
        }
    }

    #[test]
    fn test_constellations_optional() {
        let catalog = StarCatalog::from_json(
            r#"{"stars":[{"id":1,"ra":10.0,"dec":5.0,"magnitude":3.0}]}"#,
        )
        .unwrap();
        assert!(catalog.constellations.is_empty());
        assert!(catalog.edges().is_empty());
        assert_eq!(catalog.stars[0].name, None);
    }

    #[test]
    fn test_rejects_invalid_entries() {
        assert!(
            StarCatalog::from_json(r#"{"stars":[{"id":1,"ra":360.0,"dec":0.0,"magnitude":1.0}]}"#)
                .is_err()
        );
        assert!(
            StarCatalog::from_json(r#"{"stars":[{"id":1,"ra":1.0,"dec":91.0,"magnitude":1.0}]}"#)
                .is_err()
        );
        assert!(
            StarCatalog::from_json(
                r#"{"stars":[{"id":1,"ra":1.0,"dec":1.0,"magnitude":1.0},{"id":1,"ra":2.0,"dec":1.0,"magnitude":1.0}]}"#
            )
            .is_err()
        );
        assert!(StarCatalog::from_json("not json").is_err());
    }
}

//! Named graph profiles: which dimensions to draw and on what panel grid.

use crate::dimensions::{Dimension, DimensionSet};
use crate::error::{Result, VizError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// A rows × cols panel grid. Cells are numbered row-major from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Layout {
    pub rows: u8,
    pub cols: u8,
}

impl Layout {
    pub const SINGLE: Layout = Layout { rows: 1, cols: 1 };

    pub const fn new(rows: u8, cols: u8) -> Self {
        Self { rows, cols }
    }

    pub fn cells(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// `(row, col)` of cell `index`, or `None` past the last cell.
    pub fn position(&self, index: usize) -> Option<(u8, u8)> {
        if index >= self.cells() {
            return None;
        }
        let cols = self.cols as usize;
        Some(((index / cols) as u8, (index % cols) as u8))
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Immutable configuration for one graph profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// Canonical lowercase name used for look-up.
    pub name: String,
    pub layout: Layout,
    pub dimensions: DimensionSet,
}

impl Profile {
    pub fn new(name: impl Into<String>, layout: Layout, dimensions: DimensionSet) -> Self {
        Self {
            name: name.into().to_lowercase(),
            layout,
            dimensions,
        }
    }

    /// Reject profiles that cannot be composed.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| VizError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("empty name".to_string()));
        }
        if self.layout.cells() == 0 {
            return Err(invalid(format!("layout {} has no cells", self.layout)));
        }
        if self.dimensions.is_empty() {
            return Err(invalid("no dimensions".to_string()));
        }
        if self.dimensions.len() > self.layout.cells() {
            return Err(invalid(format!(
                "{} dimensions do not fit a {} layout",
                self.dimensions.len(),
                self.layout
            )));
        }
        Ok(())
    }
}

// ── Built-in data ─────────────────────────────────────────────────────────────

/// Name of the profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "simple";

fn builtin_profiles() -> Vec<Profile> {
    let single = |name: &str, dimension: Dimension| {
        Profile::new(name, Layout::SINGLE, [dimension].into_iter().collect())
    };
    vec![
        single("download", Dimension::Download),
        single("upload", Dimension::Upload),
        single("ping", Dimension::PingLatency),
        single("jitter", Dimension::PingJitter),
        single("packetloss", Dimension::PacketLoss),
        // Download / upload speed only.
        Profile::new(
            "simple",
            Layout::new(2, 1),
            [Dimension::Download, Dimension::Upload].into_iter().collect(),
        ),
        // Every dimension; the sixth cell stays empty.
        Profile::new("all", Layout::new(3, 2), DimensionSet::all()),
    ]
}

// ── ProfileCatalog ────────────────────────────────────────────────────────────

/// Validated, read-only name → profile table.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, Profile>,
}

static GLOBAL_CATALOG: OnceLock<ProfileCatalog> = OnceLock::new();

impl ProfileCatalog {
    /// Build a catalog, validating every profile.
    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for profile in profiles {
            profile.validate()?;
            if map.contains_key(&profile.name) {
                return Err(VizError::InvalidProfile {
                    name: profile.name,
                    reason: "duplicate name".to_string(),
                });
            }
            map.insert(profile.name.clone(), profile);
        }
        Ok(Self { profiles: map })
    }

    /// The built-in profiles only.
    pub fn builtin() -> Self {
        Self::from_profiles(builtin_profiles()).expect("built-in profiles are valid")
    }

    /// Process-wide built-in catalog, constructed on first use.
    pub fn global() -> &'static ProfileCatalog {
        GLOBAL_CATALOG.get_or_init(Self::builtin)
    }

    /// Case-insensitive look-up.
    pub fn get(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(&name.to_lowercase())
            .ok_or_else(|| VizError::UnknownProfile(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(&name.to_lowercase())
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// A new catalog with `profile` added. `self` is unchanged.
    pub fn with_profile(&self, profile: Profile) -> Result<Self> {
        Self::from_profiles(self.profiles.values().cloned().chain(std::iter::once(profile)))
    }
}

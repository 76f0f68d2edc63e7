//! Panel Composer: profile + series → ordered panel descriptors.
//!
//! Descriptors borrow the series they draw; nothing here mutates or
//! renders.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use viz_core::dimensions::{Dimension, ReferenceLine};
use viz_core::error::{Result, VizError};
use viz_core::formatting::default_title;
use viz_core::models::{Series, Timestamp};
use viz_core::profiles::{Layout, Profile, ProfileCatalog};

/// Figure id used when every panel shares one figure.
pub const ALL_IN_ONE_FIGURE: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionOptions {
    /// Put every panel on one figure using the profile's grid.
    pub all_in_one: bool,
    /// Display title; defaults to the series ids joined by `" vs. "`.
    pub title: Option<String>,
}

/// One series drawn on one panel.
#[derive(Debug, Clone, Copy)]
pub struct DrawEntry<'a> {
    pub series: &'a Series,
    pub label: &'a str,
    pub dimension: Dimension,
}

impl<'a> DrawEntry<'a> {
    pub fn points(&self) -> impl Iterator<Item = (Timestamp, f64)> + 'a {
        self.series.points(self.dimension)
    }
}

impl Serialize for DrawEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let points: Vec<(String, f64)> = self
            .points()
            .map(|(ts, v)| (ts.fixed_offset().to_rfc3339(), v))
            .collect();
        let mut state = serializer.serialize_struct("DrawEntry", 2)?;
        state.serialize_field("label", self.label)?;
        state.serialize_field("points", &points)?;
        state.end()
    }
}

/// Everything a renderer needs to draw one dimension across series.
#[derive(Debug, Clone, Serialize)]
pub struct PanelDescriptor<'a> {
    pub figure_id: String,
    pub figure_title: String,
    pub layout: Layout,
    /// Row-major cell index within `layout`.
    pub cell: usize,
    pub row: u8,
    pub col: u8,
    pub dimension: Dimension,
    pub title: &'static str,
    pub unit: &'static str,
    pub reference_lines: &'static [ReferenceLine],
    pub draws: Vec<DrawEntry<'a>>,
}

impl PanelDescriptor<'_> {
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

/// Panels sharing a figure id, in composition order.
#[derive(Debug, Clone)]
pub struct Figure<'p, 'a> {
    pub id: &'p str,
    pub title: &'p str,
    pub layout: Layout,
    pub panels: Vec<&'p PanelDescriptor<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Composition<'a> {
    pub title: String,
    pub profile: Profile,
    pub panels: Vec<PanelDescriptor<'a>>,
}

impl<'a> Composition<'a> {
    /// Group panels by figure, keeping first-appearance order.
    pub fn figures(&self) -> Vec<Figure<'_, 'a>> {
        let mut figures: Vec<Figure<'_, 'a>> = Vec::new();
        for panel in &self.panels {
            match figures.iter().position(|f| f.id == panel.figure_id) {
                Some(i) => figures[i].panels.push(panel),
                None => figures.push(Figure {
                    id: &panel.figure_id,
                    title: &panel.figure_title,
                    layout: panel.layout,
                    panels: vec![panel],
                }),
            }
        }
        figures
    }
}

/// Maps a profile onto series.
#[derive(Debug, Clone, Copy)]
pub struct PanelComposer<'c> {
    catalog: &'c ProfileCatalog,
}

impl PanelComposer<'static> {
    /// Composer over the process-wide built-in catalog.
    pub fn global() -> Self {
        Self::new(ProfileCatalog::global())
    }
}

impl<'c> PanelComposer<'c> {
    pub fn new(catalog: &'c ProfileCatalog) -> Self {
        Self { catalog }
    }

    /// Look the profile up, then compose. Unknown names fail before any
    /// panel is computed.
    pub fn compose_named<'a>(
        &self,
        profile_name: &str,
        series: &'a [Series],
        options: &CompositionOptions,
    ) -> Result<Composition<'a>> {
        let profile = self.catalog.get(profile_name)?;
        self.compose(profile, series, options)
    }

    pub fn compose<'a>(
        &self,
        profile: &Profile,
        series: &'a [Series],
        options: &CompositionOptions,
    ) -> Result<Composition<'a>> {
        let title = match &options.title {
            Some(title) => title.clone(),
            None => {
                let ids: Vec<&str> = series.iter().map(Series::id).collect();
                default_title(&ids)
            }
        };

        let mut panels = Vec::with_capacity(profile.dimensions.len());
        for (cell, dimension) in profile.dimensions.iter().enumerate() {
            let (figure_id, figure_title, layout, cell) = if options.all_in_one {
                (
                    ALL_IN_ONE_FIGURE.to_string(),
                    title.clone(),
                    profile.layout,
                    cell,
                )
            } else {
                (
                    dimension.key().to_string(),
                    format!("{}({})", title, dimension.key()),
                    Layout::SINGLE,
                    0,
                )
            };
            let (row, col) = layout.position(cell).ok_or_else(|| VizError::InvalidProfile {
                name: profile.name.clone(),
                reason: format!("{} dimensions do not fit a {} layout", profile.dimensions.len(), layout),
            })?;

            let draws = series
                .iter()
                .filter(|s| s.has_dimension(dimension))
                .map(|s| DrawEntry {
                    series: s,
                    label: s.label(),
                    dimension,
                })
                .collect();

            panels.push(PanelDescriptor {
                figure_id,
                figure_title,
                layout,
                cell,
                row,
                col,
                dimension,
                title: dimension.title(),
                unit: dimension.unit(),
                reference_lines: dimension.reference_lines(),
                draws,
            });
        }

        Ok(Composition {
            title,
            profile: profile.clone(),
            panels,
        })
    }
}

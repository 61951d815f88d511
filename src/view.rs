//! Render-ready payloads for the standard and fullscreen presentations.
//!
//! Both presentations read one [`ViewContent`] snapshot; a payload is that snapshot plus
//! the name of the presentation asking for it. The snapshot is rebuilt by
//! [`ViewSync::recompute`] and every rebuild bumps the generation counter.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

use crate::coerce::{CellValue, ColumnType};
use crate::color::{ColorAssignment, ColorDomain, ColorEncoder, GradientStop, LegendAnchor, ScaleKind};
use crate::dataset::{Dataset, Row};
use crate::error::ExploreError;
use crate::error_display::user_message;
use crate::window::NavigationWindow;

/// Number of stops sampled for the legend gradient bar.
pub const LEGEND_GRADIENT_STOPS: usize = 32;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    #[default]
    Scatter,
    Line,
    Bar,
    Pie,
}

impl ChartType {
    pub const ALL: [Self; 4] = [Self::Scatter, Self::Line, Self::Bar, Self::Pie];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scatter => "Scatter",
            Self::Line => "Line",
            Self::Bar => "Bar",
            Self::Pie => "Pie",
        }
    }

    /// Only scatter plots carry per-point colors.
    pub fn uses_color_column(self) -> bool {
        self == Self::Scatter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    Standard,
    Fullscreen,
}

impl Presentation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Fullscreen => "fullscreen",
        }
    }
}

/// Columns driving the chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSelection {
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    pub chart_type: ChartType,
}

impl ChartSelection {
    pub fn new(
        x: Option<String>,
        y: Option<String>,
        color: Option<String>,
        chart_type: ChartType,
    ) -> Self {
        Self {
            x,
            y,
            color,
            chart_type,
        }
    }

    fn columns(&self) -> impl Iterator<Item = &str> {
        [&self.x, &self.y, &self.color]
            .into_iter()
            .filter_map(|c| c.as_deref())
    }

    /// First selected column missing from `dataset`.
    pub fn missing_column(&self, dataset: &Dataset) -> Option<String> {
        self.columns()
            .find(|name| !dataset.has_column(name))
            .map(str::to_string)
    }
}

/// Extent of an axis over the visible rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxisDomain {
    Numeric { min: f64, max: f64 },
    /// Bounds in epoch milliseconds.
    Temporal { min: f64, max: f64 },
    /// Distinct values in first-seen order.
    Categorical { values: Vec<String> },
}

impl AxisDomain {
    fn from_cells<'a>(kind: ColumnType, cells: impl Iterator<Item = &'a CellValue>) -> Option<Self> {
        match kind {
            ColumnType::Number | ColumnType::DateTime | ColumnType::Date => {
                let (min, max) = cells
                    .filter_map(CellValue::as_plot_value)
                    .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                        None => Some((v, v)),
                        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                    })?;
                Some(if kind.is_temporal() {
                    Self::Temporal { min, max }
                } else {
                    Self::Numeric { min, max }
                })
            }
            ColumnType::Text => {
                let mut seen: HashSet<String> = HashSet::new();
                let mut values: Vec<String> = Vec::new();
                for cell in cells.filter(|c| !c.is_null()) {
                    let label = cell.to_string();
                    if seen.insert(label.clone()) {
                        values.push(label);
                    }
                }
                (!values.is_empty()).then_some(Self::Categorical { values })
            }
        }
    }
}

/// One visible row as the chart sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    /// Index into the full dataset.
    pub row: usize,
    pub x: CellValue,
    pub y: CellValue,
    pub color: ColorAssignment,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewContent {
    pub generation: u64,
    pub selection: ChartSelection,
    pub range: Range<usize>,
    pub rows: Vec<Row>,
    pub points: Vec<PlotPoint>,
    pub x_domain: Option<AxisDomain>,
    pub y_domain: Option<AxisDomain>,
    pub color_domain: Option<ColorDomain>,
    pub color_scale: Option<ScaleKind>,
    pub legend: Vec<LegendAnchor>,
    pub gradient: Vec<GradientStop>,
    pub position_label: String,
    /// User-facing message when the color column could not be used.
    pub color_error: Option<String>,
}

impl ViewContent {
    pub fn colors(&self) -> impl Iterator<Item = &ColorAssignment> {
        self.points.iter().map(|p| &p.color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewPayload<'a> {
    pub presentation: Presentation,
    #[serde(flatten)]
    pub content: &'a ViewContent,
}

impl ViewPayload<'_> {
    /// JSON for web renderers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// State the snapshot is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ViewInputs<'a> {
    pub dataset: &'a Dataset,
    pub window: &'a NavigationWindow,
    pub selection: &'a ChartSelection,
    pub encoder: &'a ColorEncoder,
    pub color_domain: Option<&'a ColorDomain>,
    pub color_error: Option<&'a ExploreError>,
}

#[derive(Debug, Clone)]
pub struct ViewSync {
    attached: BTreeSet<Presentation>,
    generation: u64,
    content: Option<ViewContent>,
}

impl Default for ViewSync {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewSync {
    /// Starts with the standard presentation attached.
    pub fn new() -> Self {
        Self {
            attached: BTreeSet::from([Presentation::Standard]),
            generation: 0,
            content: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attach(&mut self, presentation: Presentation) {
        if self.attached.insert(presentation) {
            tracing::debug!(presentation = presentation.as_str(), "presentation attached");
        }
    }

    /// Detach a presentation before its chart is discarded. Returns whether it was attached.
    pub fn teardown(&mut self, presentation: Presentation) -> bool {
        let removed = self.attached.remove(&presentation);
        if removed {
            tracing::debug!(presentation = presentation.as_str(), "presentation torn down");
        }
        removed
    }

    pub fn is_attached(&self, presentation: Presentation) -> bool {
        self.attached.contains(&presentation)
    }

    pub fn attached(&self) -> impl Iterator<Item = Presentation> + '_ {
        self.attached.iter().copied()
    }

    pub fn content(&self) -> Option<&ViewContent> {
        self.content.as_ref()
    }

    /// Payload for an attached presentation, if a snapshot exists.
    pub fn payload(&self, presentation: Presentation) -> Option<ViewPayload<'_>> {
        if !self.is_attached(presentation) {
            return None;
        }
        self.content.as_ref().map(|content| ViewPayload {
            presentation,
            content,
        })
    }

    pub fn clear(&mut self) {
        self.content = None;
        self.generation += 1;
    }

    /// Rebuild the shared snapshot. The standard presentation is always re-attached, since
    /// it is recreated whenever there is content to show.
    pub fn recompute(&mut self, inputs: ViewInputs<'_>) -> &ViewContent {
        self.attach(Presentation::Standard);
        self.generation += 1;
        let content = build_content(self.generation, inputs);
        tracing::debug!(
            generation = self.generation,
            rows = content.rows.len(),
            label = %content.position_label,
            "view recomputed"
        );
        self.content.insert(content)
    }
}

fn build_content(generation: u64, inputs: ViewInputs<'_>) -> ViewContent {
    let ViewInputs {
        dataset,
        window,
        selection,
        encoder,
        color_domain,
        color_error,
    } = inputs;

    let range = window.visible_range();
    let rows = dataset.slice(range.clone()).to_vec();

    let x_idx = selection.x.as_deref().and_then(|c| dataset.column_index(c));
    let y_idx = selection.y.as_deref().and_then(|c| dataset.column_index(c));
    let color_idx = selection
        .color
        .as_deref()
        .and_then(|c| dataset.column_index(c))
        .filter(|_| selection.chart_type.uses_color_column());
    let domain = color_domain.filter(|_| color_idx.is_some());

    let cell_at = |row: &Row, idx: Option<usize>| idx.map_or(CellValue::Null, |i| row.cell(i).clone());
    let points = rows
        .iter()
        .zip(range.clone())
        .map(|(row, index)| {
            let color = match (color_idx, domain) {
                (Some(ci), Some(d)) => row
                    .cell(ci)
                    .as_number()
                    .map(|v| encoder.color_for(v, d))
                    .unwrap_or_else(|| encoder.fallback()),
                _ => encoder.fallback(),
            };
            PlotPoint {
                row: index,
                x: cell_at(row, x_idx),
                y: cell_at(row, y_idx),
                color,
            }
        })
        .collect();

    let axis = |idx: Option<usize>| {
        let idx = idx?;
        let kind = dataset.columns()[idx].kind;
        AxisDomain::from_cells(kind, rows.iter().map(|r| r.cell(idx)))
    };

    ViewContent {
        generation,
        selection: selection.clone(),
        x_domain: axis(x_idx),
        y_domain: axis(y_idx),
        color_domain: domain.copied(),
        color_scale: domain.map(|d| encoder.kind(d)),
        legend: domain.map(|d| encoder.legend(d)).unwrap_or_default(),
        gradient: domain
            .map(|d| encoder.legend_gradient(d, LEGEND_GRADIENT_STOPS))
            .unwrap_or_default(),
        position_label: window.position_label(),
        color_error: color_error
            .filter(|_| selection.chart_type.uses_color_column())
            .map(user_message),
        range,
        rows,
        points,
    }
}

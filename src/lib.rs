use color_eyre::Result;
use std::fmt::Display;

pub mod coerce;
pub mod color;
pub mod config;
pub mod dataset;
pub mod debug;
pub mod error;
pub mod error_display;
pub mod logging;
pub mod source;
#[cfg(feature = "tui")]
pub mod tui;
pub mod view;
pub mod window;

pub use coerce::{coerce_table, CellValue, ColumnType, TypedTable};
pub use color::{
    ColorAssignment, ColorBranch, ColorDomain, ColorEncoder, ColorScheme, LegendAnchor, Palette,
    Rgb, ScaleKind,
};
pub use config::{AppConfig, ColorParser, ConfigManager};
pub use dataset::{Column, Dataset, MergeSelection, MergeStaging, Row};
pub use error::ExploreError;
pub use source::{read_csv_path, read_csv_str, CsvOptions, RawTable};
pub use view::{
    AxisDomain, ChartSelection, ChartType, PlotPoint, Presentation, ViewContent, ViewPayload,
    ViewSync,
};
pub use window::{Clamped, NavDirection, NavigationWindow};

use debug::DebugState;
use error_display::{user_message, user_message_from_report};
use view::ViewInputs;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "rowscope";

/// Inbound calls from the rendering layer. Each event is handled to completion before the
/// next one; a failed event leaves the session as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Replace the dataset with an already parsed table.
    LoadPrimary(RawTable),
    /// Replace the dataset with CSV text.
    LoadPrimaryCsv(String),
    StageMerge(RawTable),
    StageMergeCsv(String),
    SetMergeInclude(String, bool),
    SetMergeRename(String, String),
    /// Confirm with an explicit, ordered selection list.
    ConfirmMerge(Vec<MergeSelection>),
    /// Confirm with the decisions recorded on the staging.
    ConfirmStagedMerge,
    CancelMerge,
    SelectAxes {
        x: Option<String>,
        y: Option<String>,
        color: Option<String>,
    },
    SetChartType(ChartType),
    SetWindowSize(i64),
    SetWindowSizeText(String),
    SetStep(i64),
    SetStepText(String),
    Navigate(NavDirection),
    First,
    Last,
    /// Wheel input; only the sign is used.
    Scroll(f64),
    SetColorBounds(Option<f64>, Option<f64>),
    SetColorBoundsText(String, String),
    EnterFullscreen,
    ExitFullscreen,
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadPrimary(_) => "load_primary",
            Self::LoadPrimaryCsv(_) => "load_primary_csv",
            Self::StageMerge(_) => "stage_merge",
            Self::StageMergeCsv(_) => "stage_merge_csv",
            Self::SetMergeInclude(..) => "set_merge_include",
            Self::SetMergeRename(..) => "set_merge_rename",
            Self::ConfirmMerge(_) => "confirm_merge",
            Self::ConfirmStagedMerge => "confirm_staged_merge",
            Self::CancelMerge => "cancel_merge",
            Self::SelectAxes { .. } => "select_axes",
            Self::SetChartType(_) => "set_chart_type",
            Self::SetWindowSize(_) => "set_window_size",
            Self::SetWindowSizeText(_) => "set_window_size_text",
            Self::SetStep(_) => "set_step",
            Self::SetStepText(_) => "set_step_text",
            Self::Navigate(NavDirection::Forward) => "navigate_forward",
            Self::Navigate(NavDirection::Backward) => "navigate_backward",
            Self::First => "first",
            Self::Last => "last",
            Self::Scroll(_) => "scroll",
            Self::SetColorBounds(..) => "set_color_bounds",
            Self::SetColorBoundsText(..) => "set_color_bounds_text",
            Self::EnterFullscreen => "enter_fullscreen",
            Self::ExitFullscreen => "exit_fullscreen",
        }
    }
}

/// Result of a handled event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// State changed and the view snapshot was rebuilt.
    Updated,
    /// Nothing to do, e.g. navigating past a boundary.
    Unchanged,
    /// Applied after correcting a numeric field; carries an `InvalidNumericInput` whose
    /// `corrected` text should be written back into the field.
    Corrected(ExploreError),
}

/// One exploration session: dataset, pending merge, navigation window, chart selection and
/// the synchronized view. All mutation goes through [`Explorer::handle`].
pub struct Explorer {
    config: AppConfig,
    encoder: ColorEncoder,
    dataset: Option<Dataset>,
    staging: Option<MergeStaging>,
    window: NavigationWindow,
    selection: ChartSelection,
    color_bounds: (Option<f64>, Option<f64>),
    color_domain: Option<std::result::Result<ColorDomain, ExploreError>>,
    fullscreen: bool,
    view: ViewSync,
    debug: DebugState,
    status: Option<String>,
}

impl Default for Explorer {
    fn default() -> Self {
        Self::from_parts(AppConfig::default(), ColorEncoder::default())
    }
}

impl Explorer {
    /// Build a session from validated configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let encoder = config.color.encoder()?;
        Ok(Self::from_parts(config, encoder))
    }

    fn from_parts(config: AppConfig, encoder: ColorEncoder) -> Self {
        Self {
            window: NavigationWindow::from_config(&config.window),
            debug: DebugState::new(config.debug.enabled),
            config,
            encoder,
            dataset: None,
            staging: None,
            selection: ChartSelection::default(),
            color_bounds: (None, None),
            color_domain: None,
            fullscreen: false,
            view: ViewSync::new(),
            status: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn encoder(&self) -> &ColorEncoder {
        &self.encoder
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn staging(&self) -> Option<&MergeStaging> {
        self.staging.as_ref()
    }

    pub fn window(&self) -> &NavigationWindow {
        &self.window
    }

    pub fn selection(&self) -> &ChartSelection {
        &self.selection
    }

    pub fn color_bounds(&self) -> (Option<f64>, Option<f64>) {
        self.color_bounds
    }

    /// Active color domain, if a color column with numeric values is selected.
    pub fn color_domain(&self) -> Option<&ColorDomain> {
        self.color_domain.as_ref().and_then(|d| d.as_ref().ok())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn debug(&self) -> &DebugState {
        &self.debug
    }

    /// Last user-facing message (error or correction); cleared by the next clean event.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn content(&self) -> Option<&ViewContent> {
        self.view.content()
    }

    pub fn payload(&self, presentation: Presentation) -> Option<ViewPayload<'_>> {
        self.view.payload(presentation)
    }

    pub fn view(&self) -> &ViewSync {
        &self.view
    }

    /// Detach a presentation before the renderer discards its chart. A torn-down standard
    /// view comes back with the next snapshot rebuild.
    pub fn teardown(&mut self, presentation: Presentation) -> bool {
        if presentation == Presentation::Fullscreen {
            self.fullscreen = false;
        }
        self.view.teardown(presentation)
    }

    pub fn handle(&mut self, event: AppEvent) -> std::result::Result<Outcome, ExploreError> {
        let name = event.name();
        self.debug.on_event(name);
        let result = self.dispatch(event);
        match &result {
            Ok(Outcome::Corrected(notice)) => {
                tracing::info!(event = name, "{}", notice);
                self.status = Some(user_message(notice));
            }
            Ok(_) => {
                self.status = self
                    .color_domain
                    .as_ref()
                    .and_then(|d| d.as_ref().err())
                    .filter(|_| self.selection.chart_type.uses_color_column())
                    .map(user_message);
            }
            Err(err) => {
                tracing::warn!(event = name, "{}", err);
                self.debug.on_error();
                self.status = Some(user_message(err));
            }
        }
        result
    }

    fn dispatch(&mut self, event: AppEvent) -> std::result::Result<Outcome, ExploreError> {
        match event {
            AppEvent::LoadPrimary(raw) => self.load_primary(&raw),
            AppEvent::LoadPrimaryCsv(text) => {
                let raw = self.parse_csv(&text)?;
                self.load_primary(&raw)
            }
            AppEvent::StageMerge(raw) => self.stage_merge(&raw),
            AppEvent::StageMergeCsv(text) => {
                // Checked before parsing so the message points at the real problem.
                self.require_dataset()?;
                let raw = self.parse_csv(&text)?;
                self.stage_merge(&raw)
            }
            AppEvent::SetMergeInclude(column, include) => {
                self.staging_mut()?.set_include(&column, include)?;
                Ok(Outcome::Unchanged)
            }
            AppEvent::SetMergeRename(column, rename_to) => {
                self.staging_mut()?.set_rename(&column, &rename_to)?;
                Ok(Outcome::Unchanged)
            }
            AppEvent::ConfirmMerge(selections) => self.confirm_merge(&selections),
            AppEvent::ConfirmStagedMerge => {
                let selections = self
                    .staging
                    .as_ref()
                    .ok_or(ExploreError::NoMergeLoaded)?
                    .selections()
                    .to_vec();
                self.confirm_merge(&selections)
            }
            AppEvent::CancelMerge => Ok(if self.staging.take().is_some() {
                tracing::debug!("merge staging discarded");
                Outcome::Updated
            } else {
                Outcome::Unchanged
            }),
            AppEvent::SelectAxes { x, y, color } => self.select_axes(x, y, color),
            AppEvent::SetChartType(chart_type) => {
                self.require_dataset()?;
                self.selection.chart_type = chart_type;
                self.window.reset();
                self.recompute();
                Ok(Outcome::Updated)
            }
            AppEvent::SetWindowSize(n) => {
                let clamped = self.window.set_size(n);
                self.recompute();
                Ok(clamped_outcome("window size", n.to_string(), clamped))
            }
            AppEvent::SetWindowSizeText(text) => match parse_integer_field(&text) {
                Some(n) => {
                    let clamped = self.window.set_size(n);
                    self.recompute();
                    Ok(clamped_outcome("window size", text, clamped))
                }
                None => Ok(rejected_outcome("window size", text, self.window.size())),
            },
            AppEvent::SetStep(n) => {
                let clamped = self.window.set_step(n);
                self.recompute();
                Ok(clamped_outcome("step", n.to_string(), clamped))
            }
            AppEvent::SetStepText(text) => match parse_integer_field(&text) {
                Some(n) => {
                    let clamped = self.window.set_step(n);
                    self.recompute();
                    Ok(clamped_outcome("step", text, clamped))
                }
                None => Ok(rejected_outcome("step", text, self.window.step())),
            },
            AppEvent::Navigate(NavDirection::Forward) => {
                let moved = self.window.next();
                Ok(self.moved(moved))
            }
            AppEvent::Navigate(NavDirection::Backward) => {
                let moved = self.window.prev();
                Ok(self.moved(moved))
            }
            AppEvent::First => {
                let moved = self.window.first();
                Ok(self.moved(moved))
            }
            AppEvent::Last => {
                let moved = self.window.last();
                Ok(self.moved(moved))
            }
            AppEvent::Scroll(delta) => {
                let direction = if delta > 0.0 {
                    NavDirection::Forward
                } else if delta < 0.0 {
                    NavDirection::Backward
                } else {
                    return Ok(Outcome::Unchanged);
                };
                let moved = self.window.scroll(direction, self.window.wheel_speed());
                Ok(self.moved(moved))
            }
            AppEvent::SetColorBounds(min, max) => self.set_color_bounds(min, max),
            AppEvent::SetColorBoundsText(min, max) => self.set_color_bounds_text(&min, &max),
            AppEvent::EnterFullscreen => {
                self.fullscreen = true;
                self.view.attach(Presentation::Fullscreen);
                Ok(Outcome::Updated)
            }
            AppEvent::ExitFullscreen => {
                self.fullscreen = false;
                Ok(if self.view.teardown(Presentation::Fullscreen) {
                    Outcome::Updated
                } else {
                    Outcome::Unchanged
                })
            }
        }
    }

    /// Hand the payload for `presentation` to a renderer. A renderer failure is reported as
    /// [`ExploreError::Render`] and leaves the session untouched so the user can retry.
    pub fn render_with<T, E, F>(
        &mut self,
        presentation: Presentation,
        render: F,
    ) -> std::result::Result<T, ExploreError>
    where
        E: Display,
        F: FnOnce(&ViewPayload<'_>) -> std::result::Result<T, E>,
    {
        let result = match self.view.payload(presentation) {
            Some(payload) => render(&payload).map_err(|e| ExploreError::Render(e.to_string())),
            None if self.dataset.is_none() => Err(ExploreError::NoDataset),
            None => Err(ExploreError::Render(format!(
                "{} view is not attached",
                presentation.as_str()
            ))),
        };
        match &result {
            Ok(_) => {
                if let Some(content) = self.view.content() {
                    let generation = content.generation;
                    self.debug.on_payload(generation);
                }
            }
            Err(err) => {
                tracing::warn!(presentation = presentation.as_str(), "{}", err);
                self.debug.on_error();
                self.status = Some(user_message(err));
            }
        }
        result
    }

    fn parse_csv(&self, text: &str) -> std::result::Result<RawTable, ExploreError> {
        read_csv_str(text, &CsvOptions::from(&self.config.file_loading))
            .map_err(|report| match report.downcast_ref::<ExploreError>() {
                Some(err) => err.clone(),
                None => ExploreError::ParseFailure(user_message_from_report(&report, None)),
            })
    }

    fn require_dataset(&self) -> std::result::Result<&Dataset, ExploreError> {
        self.dataset.as_ref().ok_or(ExploreError::NoDataset)
    }

    fn staging_mut(&mut self) -> std::result::Result<&mut MergeStaging, ExploreError> {
        self.staging.as_mut().ok_or(ExploreError::NoMergeLoaded)
    }

    fn load_primary(&mut self, raw: &RawTable) -> std::result::Result<Outcome, ExploreError> {
        if raw.headers.is_empty() || raw.records.is_empty() {
            return Err(ExploreError::ParseFailure(
                "No data found in the CSV file".to_string(),
            ));
        }
        let dataset = Dataset::load(coerce_table(raw, &self.config.coercion));
        self.window.set_len(dataset.len());
        self.dataset = Some(dataset);
        self.staging = None;
        self.selection = ChartSelection {
            chart_type: self.selection.chart_type,
            ..ChartSelection::default()
        };
        self.color_domain = None;
        self.recompute();
        Ok(Outcome::Updated)
    }

    fn stage_merge(&mut self, raw: &RawTable) -> std::result::Result<Outcome, ExploreError> {
        let table = coerce_table(raw, &self.config.coercion);
        let staging = self.require_dataset()?.stage_merge(table)?;
        self.staging = Some(staging);
        Ok(Outcome::Updated)
    }

    fn confirm_merge(
        &mut self,
        selections: &[MergeSelection],
    ) -> std::result::Result<Outcome, ExploreError> {
        let staging = self.staging.as_ref().ok_or(ExploreError::NoMergeLoaded)?;
        let dataset = self.dataset.as_mut().ok_or(ExploreError::NoDataset)?;
        dataset.confirm_merge(staging, selections)?;
        self.staging = None;
        self.recompute();
        Ok(Outcome::Updated)
    }

    fn select_axes(
        &mut self,
        x: Option<String>,
        y: Option<String>,
        color: Option<String>,
    ) -> std::result::Result<Outcome, ExploreError> {
        let selection = ChartSelection::new(x, y, color, self.selection.chart_type);
        if let Some(missing) = selection.missing_column(self.require_dataset()?) {
            return Err(ExploreError::ColumnNotFound(missing));
        }
        self.selection = selection;
        self.window.reset();
        self.rebuild_color_domain();
        self.recompute();
        Ok(Outcome::Updated)
    }

    fn set_color_bounds(
        &mut self,
        min: Option<f64>,
        max: Option<f64>,
    ) -> std::result::Result<Outcome, ExploreError> {
        let mut notice = None;
        let mut accept = |field: &'static str, value: Option<f64>| match value {
            Some(v) if !v.is_finite() => {
                notice = Some(ExploreError::InvalidNumericInput {
                    field,
                    input: v.to_string(),
                    corrected: String::new(),
                });
                None
            }
            other => other,
        };
        let mut min = accept("color minimum", min);
        let mut max = accept("color maximum", max);
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                notice = Some(ExploreError::InvalidNumericInput {
                    field: "color bounds",
                    input: format!("{} > {}", lo, hi),
                    corrected: format!("{} to {}", hi, lo),
                });
                (min, max) = (Some(hi), Some(lo));
            }
        }
        self.apply_color_bounds(min, max);
        Ok(notice.map_or(Outcome::Updated, Outcome::Corrected))
    }

    fn set_color_bounds_text(
        &mut self,
        min_text: &str,
        max_text: &str,
    ) -> std::result::Result<Outcome, ExploreError> {
        let (current_min, current_max) = self.color_bounds;
        let mut notice = None;
        let mut read = |field: &'static str, text: &str, current: Option<f64>| {
            if text.trim().is_empty() {
                return None;
            }
            match text.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    notice = Some(ExploreError::InvalidNumericInput {
                        field,
                        input: text.to_string(),
                        corrected: current.map(|v| v.to_string()).unwrap_or_default(),
                    });
                    current
                }
            }
        };
        let min = read("color minimum", min_text, current_min);
        let max = read("color maximum", max_text, current_max);
        match self.set_color_bounds(min, max)? {
            Outcome::Corrected(swapped) => Ok(Outcome::Corrected(swapped)),
            outcome => Ok(notice.map_or(outcome, Outcome::Corrected)),
        }
    }

    fn apply_color_bounds(&mut self, min: Option<f64>, max: Option<f64>) {
        self.color_bounds = (min, max);
        tracing::debug!(min = ?min, max = ?max, "color bounds set");
        self.rebuild_color_domain();
        self.recompute();
    }

    /// Domain over every numeric cell of the color column, not just the visible window.
    fn rebuild_color_domain(&mut self) {
        let (Some(dataset), Some(column)) = (self.dataset.as_ref(), self.selection.color.as_deref())
        else {
            self.color_domain = None;
            return;
        };
        let (min, max) = self.color_bounds;
        let domain = dataset.numeric_values(column).and_then(|values| {
            ColorDomain::build(&values, min, max)
                .map_err(|_| ExploreError::NoColorData(column.to_string()))
        });
        match &domain {
            Ok(d) => tracing::debug!(column, min = d.min, max = d.max, "color domain built"),
            Err(e) => tracing::warn!(column, "{}", e),
        }
        self.color_domain = Some(domain);
    }

    fn moved(&mut self, moved: bool) -> Outcome {
        if moved {
            self.recompute();
            Outcome::Updated
        } else {
            Outcome::Unchanged
        }
    }

    fn recompute(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            self.view.clear();
            return;
        };
        let (color_domain, color_error) = match &self.color_domain {
            Some(Ok(domain)) => (Some(domain), None),
            Some(Err(err)) => (None, Some(err)),
            None => (None, None),
        };
        self.view.recompute(ViewInputs {
            dataset,
            window: &self.window,
            selection: &self.selection,
            encoder: &self.encoder,
            color_domain,
            color_error,
        });
    }
}

/// Integer field text: trimmed, parsed as a float and rounded. `None` when unreadable.
fn parse_integer_field(text: &str) -> Option<i64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
}

fn clamped_outcome(field: &'static str, input: String, clamped: Clamped<usize>) -> Outcome {
    if clamped.corrected {
        Outcome::Corrected(ExploreError::InvalidNumericInput {
            field,
            input,
            corrected: clamped.value.to_string(),
        })
    } else {
        Outcome::Updated
    }
}

fn rejected_outcome(field: &'static str, input: String, current: usize) -> Outcome {
    Outcome::Corrected(ExploreError::InvalidNumericInput {
        field,
        input,
        corrected: current.to_string(),
    })
}

//! Chart, axis, and series configuration value objects.
//!
//! Plugins describe what to render with these shapes; the host does not
//! interpret them beyond a defaulting pass that fills in grid dimensions,
//! fabricates axes for uncovered grid cells, and applies per-series display
//! defaults before a configuration is handed to a consumer.

use serde::{Deserialize, Serialize};

/// Chart display configuration returned by `get_chart_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Chart title.
    pub title: String,
    /// Subplot grid layout; derived from axis groups when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridConfig>,
    /// Axis groups, one per subplot cell.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub axes: Vec<AxisGroupConfig>,
    /// Whether X axes are linked across subplots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_x: Option<bool>,
    /// Whether Y axes are linked across subplots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_y: Option<bool>,
}

/// Subplot grid dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of grid rows.
    pub rows: u32,
    /// Number of grid columns.
    pub cols: u32,
}

/// One axis within a subplot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Axis title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Axis placement: `bottom`, `top`, `left`, or `right`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub position: String,
    /// Unit label appended to tick values.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Scale type: `linear`, `log`, or `date`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub axis_type: String,
    /// Fixed lower bound, when pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Fixed upper bound, when pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// A cell address in the subplot grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubPlot {
    /// Zero-based grid row.
    pub row: u32,
    /// Zero-based grid column.
    pub col: u32,
}

/// All axes for one subplot cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisGroupConfig {
    /// Subplot cell title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// The cell this group belongs to; cell (0,0) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subplot: Option<SubPlot>,
    /// X axes for the cell.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x_axes: Vec<AxisConfig>,
    /// Y axes for the cell.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub y_axes: Vec<AxisConfig>,
}

/// Metadata for one data series, returned by `get_series_config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Stable identifier used by `get_series_data`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Line colour as a hex string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    /// The subplot cell this series renders in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subplot: Option<SubPlot>,
    /// Line style: `solid`, `dashed`, or `dotted`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub line_type: String,
    /// Line width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f64>,
    /// Marker shape: `none`, `circle`, `square`, `triangle`, `diamond`,
    /// `cross`, or `x`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub marker_type: String,
    /// Marker size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_size: Option<f64>,
    /// Marker fill: `empty` or `solid`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub marker_fill: String,
    /// Unit label for the series values.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Whether the series starts visible.
    pub visible: Option<bool>,
    /// Title of the Y axis this series is bound to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub y_axis: String,
}

/// A file type a loader plugin can open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePattern {
    /// Human-readable description shown in file dialogs.
    pub description: String,
    /// Glob patterns, e.g. `*.csv`.
    pub patterns: Vec<String>,
}

impl SeriesConfig {
    /// Fills empty display fields with their documented defaults.
    pub fn apply_defaults(&mut self) {
        if self.subplot.is_none() {
            self.subplot = Some(SubPlot::default());
        }
        if self.line_type.is_empty() {
            self.line_type = "solid".to_owned();
        }
        if self.line_width.is_none() {
            self.line_width = Some(2.0);
        }
        if self.marker_type.is_empty() {
            self.marker_type = "none".to_owned();
        }
        if self.marker_size.is_none() {
            self.marker_size = Some(8.0);
        }
        if self.marker_fill.is_empty() {
            self.marker_fill = "solid".to_owned();
        }
        if self.visible.is_none() {
            self.visible = Some(true);
        }
    }
}

impl AxisConfig {
    /// Fills empty fields, using the supplied title and placement.
    pub fn apply_defaults(&mut self, default_title: &str, default_position: &str) {
        if self.title.is_empty() {
            self.title = default_title.to_owned();
        }
        if self.position.is_empty() {
            self.position = default_position.to_owned();
        }
        if self.axis_type.is_empty() {
            self.axis_type = "linear".to_owned();
        }
    }
}

fn default_axis(title: &str, position: &str) -> AxisConfig {
    AxisConfig {
        title: title.to_owned(),
        position: position.to_owned(),
        axis_type: "linear".to_owned(),
        ..AxisConfig::default()
    }
}

impl AxisGroupConfig {
    /// Fills the subplot address and ensures at least one axis per side.
    pub fn apply_defaults(&mut self) {
        if self.subplot.is_none() {
            self.subplot = Some(SubPlot::default());
        }
        if self.x_axes.is_empty() {
            self.x_axes.push(default_axis("X", "bottom"));
        }
        if self.y_axes.is_empty() {
            self.y_axes.push(default_axis("Y", "left"));
        }
        for (i, axis) in self.x_axes.iter_mut().enumerate() {
            let title = if i == 0 { "X".to_owned() } else { format!("X{}", i + 1) };
            axis.apply_defaults(&title, "bottom");
        }
        for (i, axis) in self.y_axes.iter_mut().enumerate() {
            let title = if i == 0 { "Y".to_owned() } else { format!("Y{}", i + 1) };
            axis.apply_defaults(&title, "left");
        }
    }
}

impl ChartConfig {
    /// Applies the full defaulting pass.
    ///
    /// Ensures at least one axis group exists, sizes the grid to cover
    /// every referenced subplot cell, fabricates default axes for grid
    /// cells no group claims, and defaults every group's axes.
    pub fn apply_defaults(&mut self) {
        if self.axes.is_empty() {
            self.axes.push(AxisGroupConfig {
                subplot: Some(SubPlot::default()),
                x_axes: vec![default_axis("X", "bottom")],
                y_axes: vec![default_axis("Y", "left")],
                ..AxisGroupConfig::default()
            });
        }

        let (mut max_row, mut max_col) = (0, 0);
        for group in &self.axes {
            let cell = group.subplot.unwrap_or_default();
            max_row = max_row.max(cell.row);
            max_col = max_col.max(cell.col);
        }

        let grid = self.grid.get_or_insert(GridConfig {
            rows: max_row + 1,
            cols: max_col + 1,
        });
        grid.rows = grid.rows.max(max_row + 1);
        grid.cols = grid.cols.max(max_col + 1);
        let (rows, cols) = (grid.rows, grid.cols);

        let claimed: std::collections::HashSet<SubPlot> = self
            .axes
            .iter()
            .map(|group| group.subplot.unwrap_or_default())
            .collect();
        for row in 0..rows {
            for col in 0..cols {
                let cell = SubPlot { row, col };
                if !claimed.contains(&cell) {
                    self.axes.push(AxisGroupConfig {
                        subplot: Some(cell),
                        x_axes: vec![default_axis("X", "bottom")],
                        y_axes: vec![default_axis("Y", "left")],
                        ..AxisGroupConfig::default()
                    });
                }
            }
        }

        for group in &mut self.axes {
            group.apply_defaults();
        }
    }
}

use crate::error::CoreError;
use crate::model::{RowId, Scorecard};
use crate::mvu::runtime::ScorecardSession;
use std::fmt::Write as _;

pub const NO_COURSE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub row: RowId,
    pub label: String,
    pub cells: Vec<u32>,
    pub total: u64,
}

/// Player × hole view of a scorecard, rebuilt from scratch on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub course: String,
    pub column_headers: Vec<String>,
    pub rows: Vec<GridRow>,
}

/// A cell edit addressed the way the session addresses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub row: RowId,
    pub hole: u32,
    pub text: String,
}

#[must_use]
pub fn derive_grid(scorecard: &Scorecard) -> GridView {
    let holes = scorecard.hole_count.holes();
    GridView {
        course: scorecard.course.clone(),
        column_headers: (1..=holes).map(|h| format!("Hole {h}")).collect(),
        rows: scorecard
            .scores
            .iter()
            .enumerate()
            .map(|(idx, row)| GridRow {
                row: RowId(idx),
                label: row.player.clone(),
                cells: row.holes().to_vec(),
                total: row.total(),
            })
            .collect(),
    }
}

impl GridView {
    /// What screens show before anything is loaded.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            course: NO_COURSE.to_string(),
            column_headers: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn hole_count(&self) -> usize {
        self.column_headers.len()
    }

    /// Translates a (row, column) position in the grid, both 0-based, into an edit.
    ///
    /// # Errors
    /// `Validation` if the position is outside the grid.
    pub fn cell_edit(
        &self,
        row_index: usize,
        column_index: usize,
        text: &str,
    ) -> Result<CellEdit, CoreError> {
        let row = self.rows.get(row_index).ok_or_else(|| {
            CoreError::Validation(format!("grid has no row {row_index}"))
        })?;
        if column_index >= self.hole_count() {
            return Err(CoreError::Validation(format!(
                "grid has no column {column_index}"
            )));
        }
        let hole = u32::try_from(column_index + 1)
            .map_err(|_| CoreError::Validation(format!("column {column_index} is too large")))?;
        Ok(CellEdit {
            row: row.row,
            hole,
            text: text.to_string(),
        })
    }

    /// Plain-text table for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.chars().count())
            .max()
            .unwrap_or(0)
            .max("Player".len());
        let mut out = String::new();
        let _ = writeln!(out, "Course Name: {}", self.course);
        let _ = write!(out, "{:>3}  {:<label_width$}", "#", "Player");
        for hole in 1..=self.hole_count() {
            let _ = write!(out, " {:>3}", format!("H{hole}"));
        }
        let _ = writeln!(out, " {:>5}", "Total");
        for (idx, row) in self.rows.iter().enumerate() {
            let _ = write!(out, "{:>3}  {:<label_width$}", idx + 1, row.label);
            for cell in &row.cells {
                let _ = write!(out, " {cell:>3}");
            }
            let _ = writeln!(out, " {:>5}", row.total);
        }
        out
    }
}

/// Applies a grid edit to the session and returns the re-derived grid.
///
/// # Errors
/// Whatever `ScorecardSession::set_score` rejects.
pub fn apply_cell_edit(session: &ScorecardSession, edit: &CellEdit) -> Result<GridView, CoreError> {
    session.set_score(edit.row, edit.hole, &edit.text)
}

use crate::model::hole_key;
use crate::mvu::session::SessionStatus;
use crate::view::grid::GridView;
use maud::{Markup, html};

#[must_use]
pub fn render_session(grid: &GridView, status: &SessionStatus) -> Markup {
    html! {
        h1 { "Session" }
        p class="session-title" { "Course Name: " (grid.course) }
        p class=(status_class(status)) { (status) }
        (render_grid(grid))
    }
}

fn status_class(status: &SessionStatus) -> &'static str {
    match status {
        SessionStatus::SaveFailed(_) | SessionStatus::LoadFailed(_) => "status status-error",
        SessionStatus::Loading { .. } | SessionStatus::Syncing => "status status-busy",
        _ => "status",
    }
}

#[must_use]
pub fn render_grid(grid: &GridView) -> Markup {
    html! {
        table class="scorecard-grid" {
            thead {
                tr {
                    th {}
                    @for header in &grid.column_headers {
                        th class="column-header" { (header) }
                    }
                    th class="column-header" { "Total" }
                }
            }
            tbody {
                @for row in &grid.rows {
                    tr data-row=(row.row.0) {
                        td class="row-label" { (row.label) }
                        @for (idx, cell) in row.cells.iter().enumerate() {
                            td {
                                input type="number" inputmode="numeric" min="0"
                                    name=(hole_key(idx as u32 + 1)) value=(cell);
                            }
                        }
                        td class="row-total" { (row.total) }
                    }
                }
            }
        }
    }
}

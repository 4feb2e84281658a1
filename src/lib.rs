pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod controller {
    pub mod scorecard;
}
pub mod mvu {
    pub mod runtime;
    pub mod session;
}
pub mod view {
    pub mod grid;
    pub mod markup;
}

pub use controller::scorecard::client::HttpScorecardClient;
pub use controller::scorecard::{
    ScorecardApi, create_scorecard, fetch_latest_scorecard, select_latest, update_scorecard,
};
pub use error::CoreError;
pub use mvu::runtime::{LoadOutcome, ScorecardSession};
pub use mvu::session::SessionStatus;
pub use view::grid::{CellEdit, GridView, derive_grid};

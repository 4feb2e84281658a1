pub mod draft;
pub mod scorecard;

pub use draft::ScorecardDraft;
pub use scorecard::{
    HoleCount, RowId, ScoreRow, Scorecard, ScorecardId, UserId, hole_key, parse_hole_key,
    parse_score,
};

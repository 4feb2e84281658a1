use crate::error::CoreError;
use crate::model::scorecard::{HoleCount, ScoreRow, Scorecard, UserId};
use chrono::{DateTime, Utc};
use serde_json::Map;

/// A round that has not been sent to the server yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorecardDraft {
    pub creator: UserId,
    pub course: String,
    pub players: Vec<String>,
    pub hole_count: HoleCount,
    pub date: DateTime<Utc>,
}

impl ScorecardDraft {
    /// Starts a draft with the creator already on the roster.
    #[must_use]
    pub fn new(creator: UserId, course: impl Into<String>, hole_count: HoleCount) -> Self {
        let players = vec![creator.as_str().to_string()];
        Self {
            creator,
            course: course.into(),
            players,
            hole_count,
            date: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    /// Appends a player; blank names are ignored. Returns whether the roster grew.
    pub fn add_player(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.players.push(name.to_string());
        true
    }

    pub fn remove_player(&mut self, index: usize) -> Option<String> {
        (index < self.players.len()).then(|| self.players.remove(index))
    }

    /// # Errors
    /// `Validation` when the course name or the roster is missing.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.course.trim().is_empty() {
            return Err(CoreError::Validation("missing facility name".into()));
        }
        if self.players.is_empty() {
            return Err(CoreError::Validation("missing players".into()));
        }
        if self.players.iter().any(|p| p.trim().is_empty()) {
            return Err(CoreError::Validation("player names must not be blank".into()));
        }
        Ok(())
    }

    /// Builds the document sent on creation: no id yet, every hole at 0.
    ///
    /// # Errors
    /// Propagates `validate`.
    pub fn into_scorecard(self) -> Result<Scorecard, CoreError> {
        self.validate()?;
        let scores = self
            .players
            .iter()
            .map(|player| ScoreRow::zeroed(player.clone(), self.hole_count))
            .collect();
        Ok(Scorecard {
            id: None,
            date: self.date,
            course: self.course.trim().to_string(),
            creator: self.creator.as_str().to_string(),
            players: self.players,
            hole_count: self.hole_count,
            scores,
            extra: Map::new(),
        })
    }
}

pub mod client;

use crate::error::CoreError;
use crate::model::{Scorecard, ScorecardDraft, ScorecardId, UserId};
use async_trait::async_trait;

/// Transport to the scorecard backend. The HTTP implementation lives in
/// [`client`]; tests substitute in-memory fakes.
#[async_trait]
pub trait ScorecardApi: Send + Sync {
    async fn list_scorecards(&self, user_id: &UserId) -> Result<Vec<Scorecard>, CoreError>;

    async fn create_scorecard(
        &self,
        user_id: &UserId,
        scorecard: &Scorecard,
    ) -> Result<Scorecard, CoreError>;

    /// Full-document overwrite. There is no version precondition: the last
    /// writer wins, which is sound only while one editor owns a scorecard.
    async fn update_scorecard(
        &self,
        id: &ScorecardId,
        scorecard: &Scorecard,
    ) -> Result<(), CoreError>;
}

/// Most recent scorecard by `date`; equal dates fall back to the greater id.
#[must_use]
pub fn select_latest(scorecards: Vec<Scorecard>) -> Option<Scorecard> {
    scorecards
        .into_iter()
        .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
}

/// # Errors
///
/// `NotFound` when the user has no scorecards, otherwise whatever the
/// transport reports.
pub async fn fetch_latest_scorecard(
    api: &dyn ScorecardApi,
    user_id: &UserId,
) -> Result<Scorecard, CoreError> {
    let scorecards = api.list_scorecards(user_id).await?;
    log::debug!("{} scorecards on record for {user_id}", scorecards.len());
    select_latest(scorecards)
        .map(Scorecard::normalized)
        .ok_or_else(|| CoreError::NotFound(format!("no scorecard found for {user_id}")))
}

/// Validates the draft, zero-fills every hole and persists it.
///
/// # Errors
///
/// `Validation` for an incomplete draft; transport errors otherwise.
pub async fn create_scorecard(
    api: &dyn ScorecardApi,
    draft: ScorecardDraft,
) -> Result<Scorecard, CoreError> {
    let creator = draft.creator.clone();
    let scorecard = draft.into_scorecard()?;
    let created = api.create_scorecard(&creator, &scorecard).await?;
    log::info!(
        "created {}-hole scorecard {:?} at {} for {creator}",
        created.hole_count,
        created.id,
        created.course
    );
    Ok(created.normalized())
}

/// # Errors
///
/// Transport errors from the backend.
pub async fn update_scorecard(
    api: &dyn ScorecardApi,
    id: &ScorecardId,
    scorecard: &Scorecard,
) -> Result<(), CoreError> {
    api.update_scorecard(id, scorecard).await
}

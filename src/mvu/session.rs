use crate::error::CoreError;
use crate::model::{RowId, Scorecard, ScorecardId, UserId, parse_score};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unloaded,
    Loading {
        user_id: UserId,
    },
    Ready,
    /// Local edits are waiting for, or riding on, a write-back.
    Syncing,
    /// The last write-back failed. Still editable; local edits are kept.
    SaveFailed(CoreError),
    LoadFailed(CoreError),
}

impl SessionStatus {
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Ready | Self::Syncing | Self::SaveFailed(_))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "no scorecard"),
            Self::Loading { user_id } => write!(f, "loading scorecard for {user_id}"),
            Self::Ready => write!(f, "saved"),
            Self::Syncing => write!(f, "saving"),
            Self::SaveFailed(e) => write!(f, "save failed: {e}"),
            Self::LoadFailed(e) => write!(f, "load failed: {e}"),
        }
    }
}

/// Identifies one write-back: which working copy it snapshots and up to which
/// local revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    pub epoch: u64,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct SaveJob {
    pub ticket: SaveTicket,
    pub id: ScorecardId,
    pub scorecard: Scorecard,
    pub coalesced_edits: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SessionModel {
    pub status: SessionStatus,
    pub user_id: Option<UserId>,
    /// Bumped by every load request; results tagged with an older value are stale.
    pub generation: u64,
    /// Generation whose result produced the current working copy.
    pub epoch: u64,
    pub scorecard: Option<Scorecard>,
    /// Count of local edits applied to the working copy.
    pub revision: u64,
    /// Highest revision the server has acknowledged.
    pub saved_revision: u64,
    /// At most one write-back is outstanding at any time.
    pub in_flight: Option<SaveTicket>,
}

impl SessionModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The working copy, but only while it is the one on display.
    #[must_use]
    pub fn current(&self) -> Option<&Scorecard> {
        if self.status.is_editable() {
            self.scorecard.as_ref()
        } else {
            None
        }
    }

    #[must_use]
    pub fn has_unsaved_edits(&self) -> bool {
        self.revision > self.saved_revision
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.has_unsaved_edits() && self.in_flight.is_none()
    }
}

#[derive(Debug, Clone)]
pub enum Msg {
    Load(UserId),
    Loaded { generation: u64, scorecard: Scorecard },
    LoadFailed { generation: u64, error: CoreError },
    SetScore { row: RowId, hole: u32, raw: String },
    Saved(SaveTicket),
    SaveFailed { ticket: SaveTicket, error: CoreError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchLatest { generation: u64, user_id: UserId },
    /// Wake the write-back worker; it snapshots whatever is current when it runs.
    ScheduleSave,
}

/// Applies one message to the model.
///
/// # Errors
///
/// Only `SetScore` can fail: `NotReady` outside an editable state, `Validation`
/// for a row or hole that does not exist. The model is unchanged on error.
pub fn update(model: &mut SessionModel, msg: Msg) -> Result<Vec<Effect>, CoreError> {
    match msg {
        Msg::Load(user_id) => {
            model.generation += 1;
            model.user_id = Some(user_id.clone());
            model.status = SessionStatus::Loading {
                user_id: user_id.clone(),
            };
            Ok(vec![Effect::FetchLatest {
                generation: model.generation,
                user_id,
            }])
        }
        Msg::Loaded {
            generation,
            scorecard,
        } => {
            if generation != model.generation {
                log::debug!(
                    "discarding scorecard from load #{generation}; load #{} is current",
                    model.generation
                );
                return Ok(vec![]);
            }
            let Some(id) = scorecard.id.clone() else {
                model.status = SessionStatus::LoadFailed(CoreError::Decode(
                    "scorecard from server has no _id".into(),
                ));
                return Ok(vec![]);
            };
            if model.has_unsaved_edits() {
                log::warn!(
                    "replacing working copy with {} unsaved edits",
                    model.revision - model.saved_revision
                );
            }
            log::info!("scorecard {id} ready ({} at {})", scorecard.course, scorecard.date);
            model.epoch = generation;
            model.scorecard = Some(scorecard.normalized());
            model.revision = 0;
            model.saved_revision = 0;
            model.status = SessionStatus::Ready;
            Ok(vec![])
        }
        Msg::LoadFailed { generation, error } => {
            if generation != model.generation {
                log::debug!("discarding failure of superseded load #{generation}: {error}");
                return Ok(vec![]);
            }
            log::warn!("load #{generation} failed: {error}");
            model.status = SessionStatus::LoadFailed(error);
            Ok(vec![])
        }
        Msg::SetScore { row, hole, raw } => {
            if !model.status.is_editable() {
                return Err(CoreError::NotReady(model.status.to_string()));
            }
            let scorecard = model
                .scorecard
                .as_mut()
                .ok_or_else(|| CoreError::NotReady("no scorecard loaded".into()))?;
            let value = parse_score(&raw);
            let previous = scorecard
                .row(row)
                .and_then(|r| r.score(hole));
            scorecard.set_score(row, hole, value)?;
            if previous == Some(value) {
                return Ok(vec![]);
            }
            model.revision += 1;
            if !matches!(model.status, SessionStatus::SaveFailed(_)) {
                model.status = SessionStatus::Syncing;
            }
            Ok(vec![Effect::ScheduleSave])
        }
        Msg::Saved(ticket) => {
            release_ticket(model, ticket);
            if ticket.epoch != model.epoch {
                return Ok(pending_save(model));
            }
            model.saved_revision = model.saved_revision.max(ticket.revision);
            if model.has_unsaved_edits() {
                return Ok(vec![Effect::ScheduleSave]);
            }
            if model.status.is_editable() {
                model.status = SessionStatus::Ready;
            }
            Ok(vec![])
        }
        Msg::SaveFailed { ticket, error } => {
            release_ticket(model, ticket);
            if ticket.epoch != model.epoch {
                log::warn!("write-back of an earlier scorecard failed: {error}");
                return Ok(pending_save(model));
            }
            if model.status.is_editable() {
                model.status = SessionStatus::SaveFailed(error);
            }
            // Edits made while the failed request was out are retried once with
            // the newer snapshot; otherwise wait for the next edit or a retry.
            if model.revision > ticket.revision {
                Ok(vec![Effect::ScheduleSave])
            } else {
                Ok(vec![])
            }
        }
    }
}

fn release_ticket(model: &mut SessionModel, ticket: SaveTicket) {
    if model.in_flight == Some(ticket) {
        model.in_flight = None;
    }
}

fn pending_save(model: &SessionModel) -> Vec<Effect> {
    if model.has_unsaved_edits() {
        vec![Effect::ScheduleSave]
    } else {
        vec![]
    }
}

/// Claims the single write-back slot and snapshots the working copy with
/// every edit made so far. `None` when a write is already out or nothing is
/// unsaved.
pub fn begin_save(model: &mut SessionModel) -> Option<SaveJob> {
    if model.in_flight.is_some() || !model.has_unsaved_edits() {
        return None;
    }
    let scorecard = model.scorecard.clone()?;
    let id = scorecard.id.clone()?;
    let ticket = SaveTicket {
        epoch: model.epoch,
        revision: model.revision,
    };
    model.in_flight = Some(ticket);
    if model.status.is_editable() {
        model.status = SessionStatus::Syncing;
    }
    Some(SaveJob {
        ticket,
        id,
        scorecard,
        coalesced_edits: model.revision - model.saved_revision,
    })
}

use crate::controller::scorecard::{ScorecardApi, fetch_latest_scorecard, update_scorecard};
use crate::error::CoreError;
use crate::identity::IdentityResolver;
use crate::model::{RowId, Scorecard, UserId};
use crate::mvu::session::{Effect, Msg, SaveJob, SessionModel, SessionStatus, begin_save, update};
use crate::view::grid::{GridView, derive_grid};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed(CoreError),
    /// A later `load` was issued before this one finished; its result was dropped.
    Superseded,
    /// No signed-in user; nothing was requested.
    NoIdentity,
}

struct Inner {
    api: Arc<dyn ScorecardApi>,
    model: Mutex<SessionModel>,
    status_tx: watch::Sender<SessionStatus>,
    save_signal: Arc<Notify>,
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Handle to the active scorecard. Cloning shares the same session.
///
/// Edits are applied synchronously; write-backs run on a background worker
/// that keeps at most one request in flight and folds every edit made in the
/// meantime into the next one.
#[derive(Clone)]
pub struct ScorecardSession {
    inner: Arc<Inner>,
}

impl ScorecardSession {
    /// Starts the write-back worker, so this must run inside a tokio runtime.
    #[must_use]
    pub fn new(api: Arc<dyn ScorecardApi>) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Unloaded);
        let inner = Arc::new(Inner {
            api,
            model: Mutex::new(SessionModel::new()),
            status_tx,
            save_signal: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
        });
        tokio::spawn(save_worker(
            Arc::downgrade(&inner),
            Arc::clone(&inner.save_signal),
            inner.shutdown.clone(),
        ));
        Self { inner }
    }

    fn lock(&self) -> MutexGuard<'_, SessionModel> {
        self.inner
            .model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, status: SessionStatus) {
        self.inner.status_tx.send_replace(status);
    }

    /// Status is published under the model lock so observers see changes in
    /// the order they were applied.
    fn dispatch(&self, msg: Msg) -> Result<Vec<Effect>, CoreError> {
        let mut model = self.lock();
        let effects = update(&mut model, msg)?;
        self.publish(model.status.clone());
        Ok(effects)
    }

    async fn run_effect(&self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::FetchLatest {
                generation,
                user_id,
            } => {
                log::info!("loading latest scorecard for {user_id} (load #{generation})");
                Some(
                    match fetch_latest_scorecard(self.inner.api.as_ref(), &user_id).await {
                        Ok(scorecard) => Msg::Loaded {
                            generation,
                            scorecard,
                        },
                        Err(error) => Msg::LoadFailed { generation, error },
                    },
                )
            }
            Effect::ScheduleSave => {
                self.inner.save_signal.notify_one();
                None
            }
        }
    }

    /// Loads the most recent scorecard of `user_id`. The last call wins: a
    /// load overtaken by a newer one returns `Superseded` and leaves the
    /// session alone.
    pub async fn load(&self, user_id: UserId) -> LoadOutcome {
        let mut generation = None;
        let mut effects = match self.dispatch(Msg::Load(user_id)) {
            Ok(effects) => effects,
            Err(e) => return LoadOutcome::Failed(e),
        };
        while let Some(effect) = effects.pop() {
            if let Effect::FetchLatest { generation: g, .. } = &effect {
                generation = Some(*g);
            }
            if let Some(msg) = self.run_effect(effect).await {
                match self.dispatch(msg) {
                    Ok(next) => effects.extend(next),
                    Err(e) => log::error!("load step rejected: {e}"),
                }
            }
        }

        let model = self.lock();
        if generation != Some(model.generation) {
            return LoadOutcome::Superseded;
        }
        match &model.status {
            SessionStatus::LoadFailed(e) => LoadOutcome::Failed(e.clone()),
            status if status.is_editable() => LoadOutcome::Loaded,
            _ => LoadOutcome::Superseded,
        }
    }

    /// Resolves the signed-in user and loads their latest scorecard.
    pub async fn load_current_user(&self, identity: &IdentityResolver) -> LoadOutcome {
        match identity.resolve_current_user() {
            Some(user_id) => self.load(user_id).await,
            None => LoadOutcome::NoIdentity,
        }
    }

    /// Sets one cell from raw text (unparseable input stores 0) and returns
    /// the refreshed grid. The write-back happens in the background.
    ///
    /// # Errors
    ///
    /// `NotReady` when no scorecard is loaded, `Validation` for a row or hole
    /// outside the scorecard.
    pub fn set_score(&self, row: RowId, hole: u32, raw: &str) -> Result<GridView, CoreError> {
        let (effects, grid) = {
            let mut model = self.lock();
            let effects = update(
                &mut model,
                Msg::SetScore {
                    row,
                    hole,
                    raw: raw.to_string(),
                },
            )?;
            let grid = model
                .current()
                .map(derive_grid)
                .ok_or_else(|| CoreError::NotReady(model.status.to_string()))?;
            self.publish(model.status.clone());
            (effects, grid)
        };
        for effect in effects {
            if matches!(effect, Effect::ScheduleSave) {
                self.inner.save_signal.notify_one();
            }
        }
        Ok(grid)
    }

    /// Asks the worker to push any unsaved edits again, e.g. after a failure.
    pub fn retry_save(&self) {
        self.inner.save_signal.notify_one();
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status.clone()
    }

    /// Status updates for display; every model change is published.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    #[must_use]
    pub fn grid(&self) -> Option<GridView> {
        self.lock().current().map(derive_grid)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<Scorecard> {
        self.lock().current().cloned()
    }

    /// Waits until every local edit has been acknowledged by the server.
    ///
    /// # Errors
    ///
    /// The write-back error when a save fails with nothing left in flight.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let mut rx = self.subscribe();
        loop {
            {
                let model = self.lock();
                if model.is_settled() {
                    return Ok(());
                }
                if let (SessionStatus::SaveFailed(e), None) = (&model.status, model.in_flight) {
                    return Err(e.clone());
                }
            }
            if rx.changed().await.is_err() {
                return Err(CoreError::Other("session closed".into()));
            }
        }
    }

    /// Stops the write-back worker. Unsaved edits stay in memory only.
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }

    fn begin_save(&self) -> Option<SaveJob> {
        let mut model = self.lock();
        let job = begin_save(&mut model)?;
        self.publish(model.status.clone());
        Some(job)
    }

    /// Sends write-backs one at a time until nothing is left to save or a
    /// failure leaves no newer edits to retry with.
    async fn drain_saves(&self) {
        while let Some(job) = self.begin_save() {
            log::info!(
                "saving scorecard {} at revision {} ({} edits)",
                job.id,
                job.ticket.revision,
                job.coalesced_edits
            );
            let msg = match update_scorecard(self.inner.api.as_ref(), &job.id, &job.scorecard).await
            {
                Ok(()) => {
                    log::debug!("scorecard {} saved", job.id);
                    Msg::Saved(job.ticket)
                }
                Err(error) => {
                    log::error!("error updating scorecard {}: {error}", job.id);
                    Msg::SaveFailed {
                        ticket: job.ticket,
                        error,
                    }
                }
            };
            match self.dispatch(msg) {
                Ok(effects) if effects.contains(&Effect::ScheduleSave) => {}
                Ok(_) => break,
                Err(e) => {
                    log::error!("write-back result rejected: {e}");
                    break;
                }
            }
        }
    }
}

async fn save_worker(session: Weak<Inner>, signal: Arc<Notify>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = signal.notified() => {}
        }
        let Some(inner) = session.upgrade() else {
            break;
        };
        ScorecardSession { inner }.drain_saves().await;
    }
    log::debug!("write-back worker stopped");
}

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusty_scorecard::model::{HoleCount, ScoreRow, Scorecard, ScorecardId, UserId};
use rusty_scorecard::{CoreError, ScorecardApi};
use serde_json::Map;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

pub fn scorecard(id: &str, creator: &str, players: &[&str], holes: HoleCount, date: &str) -> Scorecard {
    Scorecard {
        id: Some(ScorecardId::new(id)),
        date: date.parse::<DateTime<Utc>>().expect("rfc3339 date"),
        course: "Pebble Creek".to_string(),
        creator: creator.to_string(),
        players: players.iter().map(|p| (*p).to_string()).collect(),
        hole_count: holes,
        scores: players.iter().map(|p| ScoreRow::zeroed(*p, holes)).collect(),
        extra: Map::new(),
    }
}

/// Polls `cond` until it holds, yielding to other tasks in between.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

/// In-memory backend with hooks to hold and fail requests.
#[derive(Default)]
pub struct FakeApi {
    scorecards: Mutex<HashMap<String, Vec<Scorecard>>>,
    list_gates: Mutex<HashMap<String, Arc<Notify>>>,
    update_permits: Option<Arc<Semaphore>>,
    failing_updates: AtomicUsize,
    list_calls: Mutex<Vec<String>>,
    updates: Mutex<Vec<(ScorecardId, Scorecard)>>,
    started_updates: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    created: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every update waits for a permit from `release_updates`.
    pub fn with_held_updates() -> Self {
        Self {
            update_permits: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn insert(&self, user: &str, scorecard: Scorecard) {
        self.scorecards
            .lock()
            .expect("lock")
            .entry(user.to_string())
            .or_default()
            .push(scorecard);
    }

    /// The next listing for `user` blocks until the returned gate is notified.
    pub fn hold_list(&self, user: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.list_gates
            .lock()
            .expect("lock")
            .insert(user.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn release_updates(&self, n: usize) {
        if let Some(permits) = &self.update_permits {
            permits.add_permits(n);
        }
    }

    pub fn fail_next_updates(&self, n: usize) {
        self.failing_updates.store(n, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.list_calls.lock().expect("lock").clone()
    }

    pub fn updates(&self) -> Vec<(ScorecardId, Scorecard)> {
        self.updates.lock().expect("lock").clone()
    }

    pub fn started_updates(&self) -> usize {
        self.started_updates.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScorecardApi for FakeApi {
    async fn list_scorecards(&self, user_id: &UserId) -> Result<Vec<Scorecard>, CoreError> {
        self.list_calls
            .lock()
            .expect("lock")
            .push(user_id.as_str().to_string());
        let gate = self
            .list_gates
            .lock()
            .expect("lock")
            .remove(user_id.as_str());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self
            .scorecards
            .lock()
            .expect("lock")
            .get(user_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn create_scorecard(
        &self,
        user_id: &UserId,
        scorecard: &Scorecard,
    ) -> Result<Scorecard, CoreError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let mut created = scorecard.clone();
        created.id = Some(ScorecardId::new(format!("card-{n}")));
        self.insert(user_id.as_str(), created.clone());
        Ok(created)
    }

    async fn update_scorecard(
        &self,
        id: &ScorecardId,
        scorecard: &Scorecard,
    ) -> Result<(), CoreError> {
        self.started_updates.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(permits) = &self.update_permits {
            permits.acquire().await.expect("semaphore open").forget();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self.failing_updates.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_updates.store(failing - 1, Ordering::SeqCst);
            return Err(CoreError::Status {
                status: 503,
                message: "Error updating scorecard.".into(),
            });
        }

        self.updates
            .lock()
            .expect("lock")
            .push((id.clone(), scorecard.clone()));
        for cards in self.scorecards.lock().expect("lock").values_mut() {
            for card in cards.iter_mut().filter(|c| c.id.as_ref() == Some(id)) {
                *card = scorecard.clone();
            }
        }
        Ok(())
    }
}

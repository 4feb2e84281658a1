use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScorecardId(String);

impl ScorecardId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScorecardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a score row inside `Scorecard::scores`. Rows never move once a
/// scorecard exists, so the index identifies a player slot even when two
/// players share a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum HoleCount {
    Nine,
    Eighteen,
    TwentySeven,
    ThirtySix,
}

impl HoleCount {
    pub const ALL: [HoleCount; 4] = [
        HoleCount::Nine,
        HoleCount::Eighteen,
        HoleCount::TwentySeven,
        HoleCount::ThirtySix,
    ];

    #[must_use]
    pub fn holes(self) -> u32 {
        match self {
            Self::Nine => 9,
            Self::Eighteen => 18,
            Self::TwentySeven => 27,
            Self::ThirtySix => 36,
        }
    }

    /// Maps the position in the "9 / 18 / 27 / 36 hole" picker to a hole count.
    #[must_use]
    pub fn from_option_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn label(self) -> String {
        format!("{} hole", self.holes())
    }
}

impl TryFrom<u32> for HoleCount {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            9 => Ok(Self::Nine),
            18 => Ok(Self::Eighteen),
            27 => Ok(Self::TwentySeven),
            36 => Ok(Self::ThirtySix),
            other => Err(CoreError::Validation(format!(
                "hole selection must be 9, 18, 27 or 36, got {other}"
            ))),
        }
    }
}

impl From<HoleCount> for u32 {
    fn from(value: HoleCount) -> Self {
        value.holes()
    }
}

impl fmt::Display for HoleCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.holes())
    }
}

/// Parses free-form score input the way a numeric text field is read: leading
/// whitespace is skipped, the leading run of digits is taken, and anything
/// unusable (no digits, negative, overflow) becomes 0.
#[must_use]
pub fn parse_score(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if negative {
        return 0;
    }
    unsigned[..end].parse().unwrap_or(0)
}

#[must_use]
pub fn hole_key(hole: u32) -> String {
    format!("hole{hole}")
}

/// `"hole7"` -> `Some(7)`. Zero, leading zeros and signs are rejected.
#[must_use]
pub fn parse_hole_key(key: &str) -> Option<u32> {
    let digits = key.strip_prefix("hole")?;
    if digits.is_empty()
        || digits.starts_with('0')
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

fn coerce_hole_value(value: &Value) -> u32 {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                u32::try_from(v).unwrap_or(0)
            } else {
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f <= f64::from(u32::MAX) => f.trunc() as u32,
                    _ => 0,
                }
            }
        }
        Value::String(s) => parse_score(s),
        _ => 0,
    }
}

/// One player's scores, `holes[0]` being hole 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub player: String,
    holes: Vec<u32>,
    extra: Map<String, Value>,
}

impl ScoreRow {
    #[must_use]
    pub fn zeroed(player: impl Into<String>, hole_count: HoleCount) -> Self {
        Self {
            player: player.into(),
            holes: vec![0; hole_count.holes() as usize],
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn holes(&self) -> &[u32] {
        &self.holes
    }

    #[must_use]
    pub fn score(&self, hole: u32) -> Option<u32> {
        let idx = usize::try_from(hole.checked_sub(1)?).ok()?;
        self.holes.get(idx).copied()
    }

    /// Summed in `u64`; a row of 36 `u32::MAX` scores still fits.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.holes.iter().map(|&s| u64::from(s)).sum()
    }

    fn set(&mut self, hole: u32, value: u32) -> Result<(), CoreError> {
        let len = self.holes.len();
        let slot = hole
            .checked_sub(1)
            .and_then(|idx| self.holes.get_mut(idx as usize))
            .ok_or_else(|| CoreError::Validation(format!("hole {hole} is outside 1..={len}")))?;
        *slot = value;
        Ok(())
    }

    fn resize(&mut self, holes: usize) {
        self.holes.resize(holes, 0);
    }
}

impl Serialize for ScoreRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + self.holes.len() + self.extra.len()))?;
        map.serialize_entry("player", &self.player)?;
        for (idx, score) in self.holes.iter().enumerate() {
            map.serialize_entry(&format!("hole{}", idx + 1), score)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScoreRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut player = None;
        let mut holes: Vec<u32> = Vec::new();
        let mut extra = Map::new();
        for (key, value) in raw {
            if key == "player" {
                match value {
                    Value::String(name) => player = Some(name),
                    other => player = Some(other.to_string()),
                }
            } else if let Some(hole) =
                parse_hole_key(&key).filter(|&h| h <= HoleCount::ThirtySix.holes())
            {
                let idx = hole as usize - 1;
                if holes.len() <= idx {
                    holes.resize(idx + 1, 0);
                }
                holes[idx] = coerce_hole_value(&value);
            } else {
                extra.insert(key, value);
            }
        }
        let player = player.ok_or_else(|| de::Error::missing_field("player"))?;
        Ok(Self {
            player,
            holes,
            extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ScorecardId>,
    pub date: DateTime<Utc>,
    pub course: String,
    pub creator: String,
    pub players: Vec<String>,
    #[serde(rename = "holeSelection")]
    pub hole_count: HoleCount,
    pub scores: Vec<ScoreRow>,
    /// Server-side fields this client does not interpret; written back as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Scorecard {
    /// Brings a decoded document in line with the row and hole invariants:
    /// one row per player, exactly `hole_count` holes per row.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let holes = self.hole_count.holes() as usize;
        if self.scores.len() > self.players.len() {
            log::warn!(
                "scorecard {:?} has {} score rows for {} players; dropping the extra rows",
                self.id,
                self.scores.len(),
                self.players.len()
            );
            self.scores.truncate(self.players.len());
        }
        while self.scores.len() < self.players.len() {
            let player = self.players[self.scores.len()].clone();
            self.scores.push(ScoreRow::zeroed(player, self.hole_count));
        }
        for row in &mut self.scores {
            row.resize(holes);
        }
        self
    }

    #[must_use]
    pub fn row(&self, row: RowId) -> Option<&ScoreRow> {
        self.scores.get(row.0)
    }

    /// Finds the single row labelled `player`.
    ///
    /// # Errors
    /// `NotFound` when no row carries the name, `Validation` when several do.
    pub fn row_of(&self, player: &str) -> Result<RowId, CoreError> {
        let mut matches = self
            .scores
            .iter()
            .enumerate()
            .filter(|(_, row)| row.player == player)
            .map(|(idx, _)| RowId(idx));
        let first = matches
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("no player named {player}")))?;
        if matches.next().is_some() {
            return Err(CoreError::Validation(format!(
                "player name {player} is used by more than one row"
            )));
        }
        Ok(first)
    }

    /// Writes one cell; every other row and hole is left untouched.
    ///
    /// # Errors
    /// `Validation` if the row or hole does not exist on this scorecard.
    pub fn set_score(&mut self, row: RowId, hole: u32, value: u32) -> Result<(), CoreError> {
        let rows = self.scores.len();
        let target = self.scores.get_mut(row.0).ok_or_else(|| {
            CoreError::Validation(format!("{row} is outside the {rows} rows of this scorecard"))
        })?;
        target.set(hole, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_card() -> Value {
        json!({
            "_id": "66f1c0ffee",
            "date": "2024-03-15T14:02:11.000Z",
            "course": "Pebble Creek",
            "creator": "ann",
            "players": ["ann", "bo"],
            "holeSelection": 9,
            "scores": [
                {"player": "ann", "hole1": 4, "hole2": "5", "hole3": -2, "_id": "r1"},
                {"player": "bo", "hole1": 3, "hole9": 6}
            ],
            "__v": 0
        })
    }

    #[test]
    fn totals_do_not_overflow() -> Result<(), CoreError> {
        let mut row = ScoreRow::zeroed("ann", HoleCount::Nine);
        row.set(1, 4_000_000_000)?;
        row.set(2, 4_000_000_000)?;
        assert_eq!(row.total(), 8_000_000_000);
        assert!(matches!(row.set(10, 1), Err(CoreError::Validation(_))));
        Ok(())
    }

    #[test]
    fn hole_keys_beyond_the_largest_course_stay_opaque() -> Result<(), serde_json::Error> {
        let row: ScoreRow =
            serde_json::from_value(json!({"player": "a", "hole100000000": 1, "hole36": 2}))?;
        assert_eq!(row.holes().len(), 36);
        assert_eq!(row.score(36), Some(2));
        assert_eq!(row.extra.get("hole100000000"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn parse_score_follows_numeric_field_rules() {
        assert_eq!(parse_score("7"), 7);
        assert_eq!(parse_score("  12"), 12);
        assert_eq!(parse_score("5abc"), 5);
        assert_eq!(parse_score("3.9"), 3);
        assert_eq!(parse_score("+4"), 4);
        assert_eq!(parse_score("abc"), 0);
        assert_eq!(parse_score(""), 0);
        assert_eq!(parse_score("-3"), 0);
        assert_eq!(parse_score("99999999999"), 0);
    }

    #[test]
    fn hole_keys() {
        assert_eq!(hole_key(3), "hole3");
        assert_eq!(parse_hole_key("hole18"), Some(18));
        assert_eq!(parse_hole_key("hole0"), None);
        assert_eq!(parse_hole_key("hole01"), None);
        assert_eq!(parse_hole_key("hole"), None);
        assert_eq!(parse_hole_key("player"), None);
        assert_eq!(parse_hole_key("hole+1"), None);
    }

    #[test]
    fn hole_count_accepts_only_the_fixed_options() {
        assert_eq!(HoleCount::try_from(27).ok(), Some(HoleCount::TwentySeven));
        assert!(HoleCount::try_from(10).is_err());
        assert_eq!(HoleCount::from_option_index(1), Some(HoleCount::Eighteen));
        assert_eq!(HoleCount::from_option_index(4), None);
        assert_eq!(HoleCount::ThirtySix.label(), "36 hole");
    }

    #[test]
    fn decodes_wire_document_and_normalizes_rows() -> Result<(), serde_json::Error> {
        let card: Scorecard = serde_json::from_value(wire_card())?;
        let card = card.normalized();
        assert_eq!(card.id, Some(ScorecardId::new("66f1c0ffee")));
        assert_eq!(card.hole_count, HoleCount::Nine);
        assert_eq!(card.scores.len(), 2);
        assert_eq!(card.scores[0].holes(), &[4, 5, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(card.scores[1].score(9), Some(6));
        assert_eq!(card.scores[1].score(2), Some(0));
        assert_eq!(card.extra.get("__v"), Some(&json!(0)));
        Ok(())
    }

    #[test]
    fn encodes_back_with_hole_keys_and_preserved_fields() -> Result<(), serde_json::Error> {
        let card: Scorecard = serde_json::from_value(wire_card())?;
        let card = card.normalized();
        let value = serde_json::to_value(&card)?;
        assert_eq!(value["holeSelection"], json!(9));
        assert_eq!(value["_id"], json!("66f1c0ffee"));
        assert_eq!(value["__v"], json!(0));
        let row = &value["scores"][0];
        assert_eq!(row["player"], json!("ann"));
        assert_eq!(row["hole2"], json!(5));
        assert_eq!(row["hole9"], json!(0));
        assert_eq!(row["_id"], json!("r1"));
        assert!(row.get("hole10").is_none());
        Ok(())
    }

    #[test]
    fn normalize_pads_missing_rows_and_drops_surplus() -> Result<(), serde_json::Error> {
        let mut doc = wire_card();
        doc["players"] = json!(["ann", "bo", "cy"]);
        let card: Scorecard = serde_json::from_value(doc.clone())?;
        let card = card.normalized();
        assert_eq!(card.scores.len(), 3);
        assert_eq!(card.scores[2].player, "cy");
        assert_eq!(card.scores[2].total(), 0);

        doc["players"] = json!(["ann"]);
        let card: Scorecard = serde_json::from_value(doc)?;
        assert_eq!(card.normalized().scores.len(), 1);
        Ok(())
    }

    #[test]
    fn set_score_touches_only_the_addressed_row() -> Result<(), Box<dyn std::error::Error>> {
        let mut doc = wire_card();
        doc["players"] = json!(["ann", "ann"]);
        doc["scores"] = json!([{"player": "ann"}, {"player": "ann"}]);
        let mut card: Scorecard = serde_json::from_value::<Scorecard>(doc)?.normalized();

        card.set_score(RowId(1), 4, 6)?;
        assert_eq!(card.scores[0].score(4), Some(0));
        assert_eq!(card.scores[1].score(4), Some(6));
        assert!(card.set_score(RowId(2), 1, 3).is_err());
        assert!(card.set_score(RowId(0), 10, 3).is_err());
        assert!(card.set_score(RowId(0), 0, 3).is_err());
        assert!(matches!(card.row_of("ann"), Err(CoreError::Validation(_))));
        assert!(matches!(card.row_of("zed"), Err(CoreError::NotFound(_))));
        Ok(())
    }

    #[test]
    fn rejects_unknown_hole_selection() {
        let mut doc = wire_card();
        doc["holeSelection"] = json!(12);
        assert!(serde_json::from_value::<Scorecard>(doc).is_err());
    }
}

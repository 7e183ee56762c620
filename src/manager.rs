//! Manual override tracking.
//!
//! A cover is under manual control once it reports a position that the automation
//! did not ask for. From then on the coordinator leaves it alone until the reset
//! duration has passed, the user presses reset, or respecting manual overrides is
//! switched off.
//!
//! The manager never sees the commands themselves. The coordinator hands it a
//! [`DetectionContext`] describing what it last commanded and whether it is still
//! waiting for that command to land, so echoes of our own commands are never
//! classified as manual changes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::{STATE_CLOSING, STATE_OPENING};

/// Manual-control bookkeeping of one cover entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ManualOverrideRecord {
    pub is_manual: bool,
    /// When the override started, or when it was last renewed.
    pub since: Option<DateTime<Utc>>,
}

/// A reported state change of one cover entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverStateChange {
    pub entity_id: String,
    /// Raw state string, e.g. `open`, `closing`.
    pub state: Option<String>,
    /// Reported position (or tilt position for venetian blinds).
    pub position: Option<f64>,
    pub changed_at: DateTime<Utc>,
}

/// What the coordinator knows about the entity when a change arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionContext {
    /// Position the automation expects: the last commanded target, or the current
    /// computed position when nothing was commanded yet.
    pub expected: f64,
    /// A command to this entity is still in flight.
    pub waiting: bool,
    /// Differences up to and including this value are not manual.
    pub threshold: Option<u8>,
    pub ignore_intermediate: bool,
    /// Renew `since` on every further manual change.
    pub renew_on_change: bool,
}

/// Owner of the per-entity manual-control records.
#[derive(Debug, Clone)]
pub struct ManualOverrideManager {
    covers: BTreeSet<String>,
    records: BTreeMap<String, ManualOverrideRecord>,
    reset_duration: Duration,
}

impl ManualOverrideManager {
    pub fn new<I, S>(covers: I, reset_duration: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            covers: covers.into_iter().map(Into::into).collect(),
            records: BTreeMap::new(),
            reset_duration,
        }
    }

    pub fn reset_duration(&self) -> Duration {
        self.reset_duration
    }

    /// Evaluate one state change. Returns `true` if it marked the entity manual.
    pub fn handle_state_change(
        &mut self,
        change: &CoverStateChange,
        context: DetectionContext,
    ) -> bool {
        if !self.covers.contains(&change.entity_id) || context.waiting {
            return false;
        }

        if context.ignore_intermediate
            && matches!(change.state.as_deref(), Some(STATE_OPENING | STATE_CLOSING))
        {
            return false;
        }

        let Some(position) = change.position else {
            return false;
        };

        let difference = (position - context.expected).abs();
        if difference == 0.0 {
            return false;
        }
        if let Some(threshold) = context.threshold
            && difference <= f64::from(threshold)
        {
            return false;
        }

        let record = self.records.entry(change.entity_id.clone()).or_default();
        record.is_manual = true;
        if record.since.is_none() || context.renew_on_change {
            record.since = Some(change.changed_at);
        }
        true
    }

    /// Return entities whose override has run for longer than the reset duration
    /// to automatic control. Returns the entities that were reset.
    pub fn reset_if_needed(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| {
                record
                    .since
                    .is_some_and(|since| now - since > self.reset_duration)
            })
            .map(|(entity, _)| entity.clone())
            .collect();

        for entity in &expired {
            self.reset(entity);
        }
        expired
    }

    pub fn reset(&mut self, entity_id: &str) {
        self.records.remove(entity_id);
    }

    pub fn reset_all(&mut self) {
        self.records.clear();
    }

    pub fn is_manual(&self, entity_id: &str) -> bool {
        self.records
            .get(entity_id)
            .is_some_and(|record| record.is_manual)
    }

    /// Whether any cover of the group is under manual control.
    pub fn any_manual(&self) -> bool {
        self.records.values().any(|record| record.is_manual)
    }

    pub fn manual_entities(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, record)| record.is_manual)
            .map(|(entity, _)| entity.clone())
            .collect()
    }

    pub fn record(&self, entity_id: &str) -> ManualOverrideRecord {
        self.records.get(entity_id).copied().unwrap_or_default()
    }

    pub fn records(&self) -> &BTreeMap<String, ManualOverrideRecord> {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const COVER: &str = "cover.living_room";

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, hour, minute, 0).unwrap()
    }

    fn manager() -> ManualOverrideManager {
        ManualOverrideManager::new([COVER], Duration::minutes(15))
    }

    fn change(position: f64, changed_at: DateTime<Utc>) -> CoverStateChange {
        CoverStateChange {
            entity_id: COVER.to_string(),
            state: Some("open".to_string()),
            position: Some(position),
            changed_at,
        }
    }

    fn context(expected: f64) -> DetectionContext {
        DetectionContext {
            expected,
            waiting: false,
            threshold: None,
            ignore_intermediate: false,
            renew_on_change: false,
        }
    }

    #[test]
    fn test_mismatch_marks_manual() {
        let mut manager = manager();
        assert!(manager.handle_state_change(&change(40.0, at(12, 0)), context(60.0)));

        assert!(manager.is_manual(COVER));
        assert!(manager.any_manual());
        assert_eq!(manager.manual_entities(), vec![COVER.to_string()]);
        assert_eq!(manager.record(COVER).since, Some(at(12, 0)));
    }

    #[test]
    fn test_matching_position_is_not_manual() {
        let mut manager = manager();
        assert!(!manager.handle_state_change(&change(60.0, at(12, 0)), context(60.0)));
        assert!(!manager.any_manual());
        assert_eq!(manager.record(COVER), ManualOverrideRecord::default());
    }

    #[test]
    fn test_threshold_boundary() {
        let mut manager = manager();
        let mut ctx = context(60.0);
        ctx.threshold = Some(5);

        assert!(!manager.handle_state_change(&change(55.0, at(12, 0)), ctx));
        assert!(!manager.handle_state_change(&change(65.0, at(12, 0)), ctx));
        assert!(!manager.is_manual(COVER));

        assert!(manager.handle_state_change(&change(54.0, at(12, 0)), ctx));
        assert!(manager.is_manual(COVER));
    }

    #[test]
    fn test_waiting_suppresses_detection() {
        let mut manager = manager();
        let mut ctx = context(60.0);
        ctx.waiting = true;

        assert!(!manager.handle_state_change(&change(20.0, at(12, 0)), ctx));
        assert!(!manager.is_manual(COVER));
    }

    #[test]
    fn test_unknown_entity_and_missing_position_are_ignored() {
        let mut manager = manager();
        let mut other = change(20.0, at(12, 0));
        other.entity_id = "cover.kitchen".to_string();
        assert!(!manager.handle_state_change(&other, context(60.0)));

        let mut no_position = change(20.0, at(12, 0));
        no_position.position = None;
        assert!(!manager.handle_state_change(&no_position, context(60.0)));
        assert!(!manager.any_manual());
    }

    #[test]
    fn test_intermediate_states_can_be_ignored() {
        let mut manager = manager();
        let mut moving = change(35.0, at(12, 0));
        moving.state = Some("closing".to_string());

        let mut ctx = context(60.0);
        ctx.ignore_intermediate = true;
        assert!(!manager.handle_state_change(&moving, ctx));

        ctx.ignore_intermediate = false;
        assert!(manager.handle_state_change(&moving, ctx));
    }

    #[test]
    fn test_timed_reset() {
        let mut manager = manager();
        manager.handle_state_change(&change(40.0, at(12, 0)), context(60.0));

        assert!(manager.reset_if_needed(at(12, 15)).is_empty());
        assert!(manager.is_manual(COVER));

        assert_eq!(manager.reset_if_needed(at(12, 16)), vec![COVER.to_string()]);
        assert!(!manager.is_manual(COVER));
        assert_eq!(manager.record(COVER).since, None);
    }

    #[test]
    fn test_since_renewal_is_configurable() {
        let mut manager = manager();
        manager.handle_state_change(&change(40.0, at(12, 0)), context(60.0));
        manager.handle_state_change(&change(30.0, at(12, 10)), context(60.0));
        assert_eq!(manager.record(COVER).since, Some(at(12, 0)));

        let mut ctx = context(60.0);
        ctx.renew_on_change = true;
        manager.handle_state_change(&change(20.0, at(12, 10)), ctx);
        assert_eq!(manager.record(COVER).since, Some(at(12, 10)));

        // Renewed: still manual 15 minutes after the first change
        assert!(manager.reset_if_needed(at(12, 20)).is_empty());
    }

    #[test]
    fn test_explicit_resets() {
        let mut manager = ManualOverrideManager::new(
            ["cover.left", "cover.right"],
            Duration::minutes(15),
        );
        for entity in ["cover.left", "cover.right"] {
            let mut manual = change(10.0, at(12, 0));
            manual.entity_id = entity.to_string();
            manager.handle_state_change(&manual, context(60.0));
        }
        assert_eq!(manager.manual_entities().len(), 2);

        manager.reset("cover.left");
        assert_eq!(manager.manual_entities(), vec!["cover.right".to_string()]);

        manager.reset_all();
        assert!(!manager.any_manual());
        assert!(manager.records().is_empty());
    }
}

//! Placeholder event generation for goals.
//!
//! Unscheduled deliverables get spread evenly across a time window: the
//! window is cut into N equal slices and deliverable `i` starts at the
//! beginning of slice `i`. A deliverable with a minutes estimate lasts that
//! long (capped to its slice); one without an estimate fills its slice.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A deliverable waiting for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub deliverable_id: Uuid,
    pub minutes_estimate: Option<i32>,
}

/// A slot assigned to a deliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub deliverable_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Spread `requests` evenly across `[window_start, window_end)`.
///
/// Returns an empty plan when there is nothing to schedule. Fails when the
/// window is empty or inverted.
pub fn plan_placeholder_slots(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    requests: &[SlotRequest],
) -> Result<Vec<SlotAssignment>> {
    if window_end <= window_start {
        return Err(Error::InvalidInput(
            "Schedule window end must be after its start".to_string(),
        ));
    }
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let total_ms = (window_end - window_start).num_milliseconds();
    let slice_ms = total_ms / requests.len() as i64;
    if slice_ms <= 0 {
        return Err(Error::InvalidInput(
            "Schedule window is too short for the number of deliverables".to_string(),
        ));
    }

    let plan = requests
        .iter()
        .enumerate()
        .map(|(i, req)| {
            let start = window_start + Duration::milliseconds(slice_ms * i as i64);
            let length_ms = match req.minutes_estimate {
                Some(m) if m > 0 => (i64::from(m) * 60_000).min(slice_ms),
                _ => slice_ms,
            };
            SlotAssignment {
                deliverable_id: req.deliverable_id,
                start,
                end: start + Duration::milliseconds(length_ms),
            }
        })
        .collect();

    Ok(plan)
}

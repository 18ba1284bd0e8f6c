//! Slide cycle timing.
//!
//! Positions are computed from the Unix epoch, so every screen showing the
//! same playlist shows the same slide at the same moment and a restarted
//! player resumes in step.

use chrono::{DateTime, Utc};

use crate::models::{Slide, SlidePosition};

/// Position of the cycle `elapsed_seconds` after it started.
/// Slides are taken in the order given; zero durations count as one second.
pub fn position_at(slides: &[Slide], elapsed_seconds: u64) -> Option<SlidePosition> {
    let cycle_seconds: u64 = slides.iter().map(|s| u64::from(s.duration.max(1))).sum();
    if cycle_seconds == 0 {
        return None;
    }

    let mut offset = elapsed_seconds % cycle_seconds;
    for (index, slide) in slides.iter().enumerate() {
        let duration = u64::from(slide.duration.max(1));
        if offset < duration {
            return Some(SlidePosition {
                index,
                slide_id: slide.id.clone(),
                remaining_seconds: duration - offset,
                cycle_seconds,
            });
        }
        offset -= duration;
    }
    None
}

pub fn position_now(slides: &[Slide], now: DateTime<Utc>) -> Option<SlidePosition> {
    position_at(slides, now.timestamp().max(0) as u64)
}

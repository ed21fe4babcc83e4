//! From raw events to frames
//!
//! [`select_run`] picks the slice of events worth showing and [`reduce`] folds
//! it into [`Frame`]s. Both are pure.

mod frame;
mod reducer;
mod select;

pub use frame::{CallFrame, Frame, FrameError};
pub use reducer::{reduce, ReducerState};
pub use select::select_run;

use crate::event::Event;

/// Select the run and reduce it
pub fn frames_from_events(events: &[Event]) -> Vec<Frame> {
    reduce(select_run(events))
}

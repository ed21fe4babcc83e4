//! Run selection
//!
//! A snippet usually defines helpers and then calls one. Only the last
//! top-level call is worth stepping through; programs that never call a
//! function are shown in full.

use crate::event::{Event, EventPayload};

/// Contiguous slice of `events` to visualize
pub fn select_run(events: &[Event]) -> &[Event] {
    let mut depth = 0usize;
    let mut last_top_level = None;

    for (index, event) in events.iter().enumerate() {
        match event.payload {
            EventPayload::Call { .. } => {
                if depth == 0 {
                    last_top_level = Some(index);
                }
                depth += 1;
            }
            EventPayload::Return { .. } => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    match last_top_level {
        Some(start) => &events[start..],
        None => events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn call(line: i64) -> Event {
        Event::new(
            line,
            EventPayload::Call {
                name: "f".to_string(),
                args: IndexMap::new(),
            },
        )
    }

    fn ret(line: i64) -> Event {
        Event::new(line, EventPayload::Return { value: None })
    }

    fn declare(line: i64) -> Event {
        Event::new(
            line,
            EventPayload::Declare {
                vars: IndexMap::new(),
            },
        )
    }

    #[test]
    fn test_definition_only_run_is_kept_whole() {
        let events = vec![declare(1), declare(2)];
        assert_eq!(select_run(&events), &events[..]);
    }

    #[test]
    fn test_last_top_level_call_wins() {
        let events = vec![call(1), ret(2), declare(3), call(4), ret(5)];
        let lines: Vec<i64> = select_run(&events).iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn test_nested_calls_are_not_top_level() {
        let events = vec![call(1), call(2), ret(3), call(4), ret(5), ret(6)];
        assert_eq!(select_run(&events).len(), events.len());
    }

    #[test]
    fn test_empty() {
        assert!(select_run(&[]).is_empty());
    }
}

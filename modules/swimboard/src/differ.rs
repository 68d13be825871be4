use std::collections::HashSet;

use crate::types::NoticeRecord;

/// Notices in `current` whose title is absent from `previous`.
///
/// Title is the only identity: a seen title with a changed link or date is
/// not new. Repeated titles inside `current` collapse to their first
/// occurrence. Order follows `current`.
pub fn diff(current: &[NoticeRecord], previous: &[NoticeRecord]) -> Vec<NoticeRecord> {
    let mut seen: HashSet<&str> = previous.iter().map(|n| n.title.as_str()).collect();

    current
        .iter()
        .filter(|n| seen.insert(n.title.as_str()))
        .cloned()
        .collect()
}

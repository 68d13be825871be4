use std::str::FromStr;

use crate::types::NoticeRecord;

/// Which population is compared for novelty and which one is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Every parsed notice is compared and persisted.
    Off,
    /// Only keyword matches are compared and persisted.
    #[default]
    Filtered,
    /// Only keyword matches are compared; the full list is persisted.
    FullSnapshot,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(FilterMode::Off),
            "filtered" => Ok(FilterMode::Filtered),
            "full" | "full_snapshot" => Ok(FilterMode::FullSnapshot),
            other => Err(format!(
                "unknown filter mode {other:?} (expected off, filtered or full)"
            )),
        }
    }
}

/// Case-sensitive substring match on titles, OR-ed across terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFilter {
    terms: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn matches(&self, record: &NoticeRecord) -> bool {
        self.terms.iter().any(|term| record.title.contains(term.as_str()))
    }

    /// Matching records, in their original order.
    pub fn apply(&self, records: &[NoticeRecord]) -> Vec<NoticeRecord> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

/// The two populations a run works with, per `FilterMode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub compared: Vec<NoticeRecord>,
    pub persisted: Vec<NoticeRecord>,
}

pub fn select(mode: FilterMode, filter: &KeywordFilter, parsed: Vec<NoticeRecord>) -> Selection {
    match mode {
        FilterMode::Off => Selection {
            compared: parsed.clone(),
            persisted: parsed,
        },
        FilterMode::Filtered => {
            let matching = filter.apply(&parsed);
            Selection {
                compared: matching.clone(),
                persisted: matching,
            }
        }
        FilterMode::FullSnapshot => Selection {
            compared: filter.apply(&parsed),
            persisted: parsed,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(titles: &[&str]) -> Vec<NoticeRecord> {
        titles
            .iter()
            .map(|t| NoticeRecord::new(*t, "https://example.com", "2025-01-01"))
            .collect()
    }

    fn titles(records: &[NoticeRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn keywords_are_or_ed() {
        let filter = KeywordFilter::new(["신규", "초급"]);
        let records = titled(&["신규 강습 안내", "초급반 모집", "일반 공지"]);

        assert_eq!(titles(&filter.apply(&records)), vec!["신규 강습 안내", "초급반 모집"]);
    }

    #[test]
    fn match_is_case_sensitive() {
        let filter = KeywordFilter::new(["Swim"]);
        let records = titled(&["swim lessons", "Swim lessons"]);

        assert_eq!(titles(&filter.apply(&records)), vec!["Swim lessons"]);
    }

    #[test]
    fn order_is_preserved() {
        let filter = KeywordFilter::new(["반"]);
        let records = titled(&["C반", "공지", "A반", "B반"]);

        assert_eq!(titles(&filter.apply(&records)), vec!["C반", "A반", "B반"]);
    }

    #[test]
    fn empty_term_list_matches_nothing() {
        let filter = KeywordFilter::new(Vec::<String>::new());
        assert!(filter.apply(&titled(&["anything"])).is_empty());
    }

    #[test]
    fn select_full_snapshot_persists_everything() {
        let filter = KeywordFilter::new(["신규"]);
        let parsed = titled(&["신규 안내", "휴관 안내"]);

        let selection = select(FilterMode::FullSnapshot, &filter, parsed);

        assert_eq!(titles(&selection.compared), vec!["신규 안내"]);
        assert_eq!(titles(&selection.persisted), vec!["신규 안내", "휴관 안내"]);
    }

    #[test]
    fn select_filtered_persists_matches_only() {
        let filter = KeywordFilter::new(["신규"]);
        let selection = select(FilterMode::Filtered, &filter, titled(&["신규 안내", "휴관 안내"]));

        assert_eq!(selection.compared, selection.persisted);
        assert_eq!(titles(&selection.persisted), vec!["신규 안내"]);
    }

    #[test]
    fn select_off_ignores_keywords() {
        let filter = KeywordFilter::new(["신규"]);
        let selection = select(FilterMode::Off, &filter, titled(&["휴관 안내"]));

        assert_eq!(titles(&selection.compared), vec!["휴관 안내"]);
    }

    #[test]
    fn filter_mode_parses() {
        assert_eq!("OFF".parse::<FilterMode>(), Ok(FilterMode::Off));
        assert_eq!("filtered".parse::<FilterMode>(), Ok(FilterMode::Filtered));
        assert_eq!(" full ".parse::<FilterMode>(), Ok(FilterMode::FullSnapshot));
        assert!("maybe".parse::<FilterMode>().is_err());
    }
}

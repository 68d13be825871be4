use serde::{Deserialize, Serialize};

/// One bulletin entry as displayed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeRecord {
    pub title: String,
    pub link: String,
    /// Date text exactly as the board shows it (e.g. "2025-03-02").
    pub date: String,
}

impl NoticeRecord {
    pub fn new(title: impl Into<String>, link: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            date: date.into(),
        }
    }
}

/// The full notice list from the last successful run.
///
/// Serialized as a bare JSON array so the state file stays readable by
/// anything that understood the old format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub Vec<NoticeRecord>);

impl Snapshot {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn notices(&self) -> &[NoticeRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NoticeRecord>> for Snapshot {
    fn from(notices: Vec<NoticeRecord>) -> Self {
        Self(notices)
    }
}

/// Where the board lives and how its relative links resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardTarget {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub link_base: String,
    pub site_root: String,
    /// Human label used in notification headers.
    pub label: String,
}

impl BoardTarget {
    /// Wansan pool notice board on jjss.or.kr.
    pub fn wansan() -> Self {
        Self {
            url: "https://www.jjss.or.kr/reserv/planweb/board/list.9is".to_string(),
            params: vec![
                (
                    "contentUid".to_string(),
                    "ff8080816c5f9de6016cd702efc70de1".to_string(),
                ),
                (
                    "boardUid".to_string(),
                    "ff8080816d4d1c03016d85eb2aff02cd".to_string(),
                ),
                ("categoryUid2".to_string(), "C1".to_string()),
            ],
            link_base: "https://www.jjss.or.kr/reserv/planweb/board/".to_string(),
            site_root: "https://www.jjss.or.kr/".to_string(),
            label: "완산수영장".to_string(),
        }
    }

    /// Board URL with its query string, percent-encoded.
    pub fn full_url(&self) -> String {
        match url::Url::parse_with_params(&self.url, &self.params) {
            Ok(u) => u.to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wansan_full_url_keeps_param_order() {
        let url = BoardTarget::wansan().full_url();
        assert_eq!(
            url,
            "https://www.jjss.or.kr/reserv/planweb/board/list.9is\
             ?contentUid=ff8080816c5f9de6016cd702efc70de1\
             &boardUid=ff8080816d4d1c03016d85eb2aff02cd\
             &categoryUid2=C1"
        );
    }

    #[test]
    fn snapshot_serializes_as_bare_array() {
        let snapshot = Snapshot::from(vec![NoticeRecord::new("A", "https://x/1", "2025-01-01")]);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"[{"title":"A","link":"https://x/1","date":"2025-01-01"}]"#);
    }
}

//! Parses a captured-style board listing with one deleted (anchorless) row.

use std::path::Path;

use swimboard::parser::{parse, parse_report};
use swimboard::testing::{board_page, board_row, board_row_without_anchor};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {e}", path.display()))
}

#[test]
fn five_good_rows_and_one_without_anchor_yield_five_notices() {
    let html = fixture("board.html");
    let report = parse_report(&html, "https://www.jjss.or.kr/reserv/planweb/board/");

    assert_eq!(report.notices.len(), 5);
    assert_eq!(report.skipped_rows, 1);
    assert_eq!(report.anomaly, None);

    let titles: Vec<_> = report.notices.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "2025년 3월 신규 강습 회원 모집 안내",
            "초급반 추가 모집 (저녁반)",
            "3월 정기 휴관일 안내",
            "수질 검사 결과 공개",
            "자유수영 이용 시간 변경 안내",
        ]
    );
}

#[test]
fn fixture_links_are_absolute_and_dates_verbatim() {
    let notices = parse(&fixture("board.html"));

    let first = &notices[0];
    assert_eq!(
        first.link,
        "https://www.jjss.or.kr/reserv/planweb/board/view.9is?dataUid=ff80808194a1b2c3\
         &contentUid=ff8080816c5f9de6016cd702efc70de1&boardUid=ff8080816d4d1c03016d85eb2aff02cd"
    );
    assert_eq!(first.date, "2025-02-20");
    assert!(notices
        .iter()
        .all(|n| n.link.starts_with("https://www.jjss.or.kr/reserv/planweb/board/view.9is?")));
}

#[test]
fn generated_page_with_malformed_row_in_the_middle() {
    let rows = vec![
        board_row("A", "view.9is?id=1", "2025-01-01"),
        board_row("B", "view.9is?id=2", "2025-01-02"),
        board_row_without_anchor("broken", "2025-01-03"),
        board_row("C", "view.9is?id=3", "2025-01-04"),
        board_row("D", "view.9is?id=4", "2025-01-05"),
        board_row("E", "view.9is?id=5", "2025-01-06"),
    ];

    let notices = parse(&board_page(&rows));

    let titles: Vec<_> = notices.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C", "D", "E"]);
}

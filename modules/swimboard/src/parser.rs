// Board listing → NoticeRecords.
//
// The board is a plain server-rendered table:
//   <table class="bbsList bbs01"><tbody><tr>
//     <td>no</td><td>category</td><td><a href="view.9is?..."><span>title</span></a></td>
//     <td>author</td><td>date</td><td>views</td>
//   </tr>...
// Markup drifts, so anything unexpected degrades to fewer rows, never an error.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::types::{BoardTarget, NoticeRecord};

const MIN_CELLS: usize = 6;
const TITLE_CELL: usize = 2;
const DATE_CELL: usize = 4;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.bbsList.bbs01").expect("valid selector"));
static TBODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("valid selector"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("valid selector"));

/// Structural markers that were expected but not found. Not an error: the
/// board can legitimately be empty or mid-redesign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAnomaly {
    MissingTable,
    MissingBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowSkip {
    TooFewCells(usize),
    MissingAnchor,
    MissingLabel,
    MissingHref,
    EmptyTitle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub notices: Vec<NoticeRecord>,
    pub anomaly: Option<ParseAnomaly>,
    pub skipped_rows: usize,
}

impl ParseReport {
    fn anomaly(anomaly: ParseAnomaly) -> Self {
        Self {
            anomaly: Some(anomaly),
            ..Self::default()
        }
    }
}

/// Parse the Wansan board listing.
pub fn parse(html: &str) -> Vec<NoticeRecord> {
    parse_report(html, &BoardTarget::wansan().link_base).notices
}

/// Parse a board listing, resolving relative links against `link_base`.
pub fn parse_report(html: &str, link_base: &str) -> ParseReport {
    let document = Html::parse_document(html);

    let Some(table) = document.select(&TABLE).next() else {
        warn!("Notice table not found on page");
        return ParseReport::anomaly(ParseAnomaly::MissingTable);
    };

    let Some(tbody) = table.select(&TBODY).next() else {
        warn!("Notice table has no body");
        return ParseReport::anomaly(ParseAnomaly::MissingBody);
    };

    let mut report = ParseReport::default();
    for (index, row) in child_elements(tbody, "tr").enumerate() {
        match extract_row(row, link_base) {
            Ok(notice) => report.notices.push(notice),
            Err(reason) => {
                debug!(row = index, ?reason, "Skipping row");
                report.skipped_rows += 1;
            }
        }
    }

    debug!(
        notices = report.notices.len(),
        skipped = report.skipped_rows,
        "Parsed notice table"
    );
    report
}

fn extract_row(row: ElementRef<'_>, link_base: &str) -> Result<NoticeRecord, RowSkip> {
    let cells: Vec<ElementRef<'_>> = child_elements(row, "td").collect();
    if cells.len() < MIN_CELLS {
        return Err(RowSkip::TooFewCells(cells.len()));
    }

    let anchor = cells[TITLE_CELL]
        .select(&ANCHOR)
        .next()
        .ok_or(RowSkip::MissingAnchor)?;
    let label = anchor.select(&LABEL).next().ok_or(RowSkip::MissingLabel)?;
    let href = anchor
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(RowSkip::MissingHref)?;

    let title = collapse_whitespace(&label.text().collect::<String>());
    if title.is_empty() {
        return Err(RowSkip::EmptyTitle);
    }

    Ok(NoticeRecord {
        title,
        link: normalize_link(href, link_base),
        date: collapse_whitespace(&cells[DATE_CELL].text().collect::<String>()),
    })
}

fn child_elements<'a>(
    parent: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute hrefs pass through; relative ones (`./view.9is?..`,
/// `view.9is?..`, `/reserv/..`) resolve against the board directory.
pub fn normalize_link(href: &str, link_base: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    match url::Url::parse(link_base).and_then(|base| base.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => format!("{}{}", link_base, href.trim_start_matches("./")),
    }
}

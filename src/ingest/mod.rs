// src/ingest/mod.rs
pub mod extract;
pub mod providers;
pub mod timestamp;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub use extract::{extract, extract_rows, parse_rows};
pub use types::{HeadlineRecord, NewsSource, RawHeadlineRow};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "headlines_extracted_total",
            "Headline records extracted from news markup."
        );
        describe_counter!(
            "news_fetch_errors_total",
            "News collaborator fetch failures."
        );
        describe_histogram!("ingest_parse_ms", "Markup parse time in milliseconds.");
    });
}

/// Plain text of a markup fragment: entities decoded, tags stripped,
/// whitespace collapsed and trimmed.
pub fn clean_cell_text(s: &str) -> String {
    // 1) Strip tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(s, " ");

    // 2) HTML entity decode (after stripping so `&lt;b&gt;` survives as text)
    let decoded = html_escape::decode_html_entities(&stripped).to_string();

    // 3) Normalize curly quotes to ASCII
    let decoded = decoded
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. NBSP)
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

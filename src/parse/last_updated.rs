use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use super::text_from_selection::get_inner_text;
use crate::static_selector;

/// When something was last updated, if it is known at all.
///
/// `has_date` is kept next to the optional timestamp so clients can tell a
/// missing timestamp apart without inspecting `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUpdated {
    pub last_update: Option<NaiveDateTime>,
    pub has_date: bool,
}

impl From<Option<NaiveDateTime>> for LastUpdated {
    fn from(last_update: Option<NaiveDateTime>) -> Self {
        Self {
            last_update,
            has_date: last_update.is_some(),
        }
    }
}

/// Reads the "Letzte Aktualisierung" stamp from the page footer.
///
/// Any missing element or unexpected text means the page simply has no stamp.
pub fn source_last_updated(element: ElementRef<'_>) -> Option<NaiveDateTime> {
    static_selector!(COPYRIGHT_SELECTOR <- "div.copyright");
    static_selector!(INNER_DIV_SELECTOR <- "div");
    static_selector!(PARAGRAPH_SELECTOR <- "p");

    let Some(copyright) = element.select(&COPYRIGHT_SELECTOR).next() else {
        log::error!("Copyright footer not found");
        return None;
    };

    // newer pages wrap the stamp in a div, older ones in a paragraph
    let inner = copyright.select(&INNER_DIV_SELECTOR).next().or_else(|| {
        log::warn!("No div inside copyright footer, trying paragraph");
        copyright.select(&PARAGRAPH_SELECTOR).next()
    });
    let Some(inner) = inner else {
        log::error!("Copyright footer has neither div nor paragraph");
        return None;
    };

    let stamp = parse_stamp(&get_inner_text(inner));
    if stamp.is_none() {
        log::error!("No valid last updated timestamp found");
    }
    stamp
}

fn parse_stamp(text: &str) -> Option<NaiveDateTime> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"Aktualisierung:\s*(\d{2}\.\d{2}\.\d{4})\s+(\d{2}:\d{2}:\d{2})")
            .expect("regex should be valid")
    });
    let captures = re.captures(text)?;
    let date = NaiveDate::parse_from_str(&captures[1], "%d.%m.%Y").ok()?;
    let time = NaiveTime::parse_from_str(&captures[2], "%H:%M:%S").ok()?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(7, 45, 12)
            .unwrap()
    }

    #[test]
    fn test_from_inner_div() {
        let html = Html::parse_document(
            r#"<div class="copyright"><div>Letzte Aktualisierung: 04.03.2024 07:45:12</div></div>"#,
        );
        assert_eq!(source_last_updated(html.root_element()), Some(stamp()));
    }

    #[test]
    fn test_falls_back_to_paragraph() {
        let html = Html::parse_document(
            r#"<div class="copyright"><p>&copy; 2024 | Aktualisierung: 04.03.2024 07:45:12</p></div>"#,
        );
        assert_eq!(source_last_updated(html.root_element()), Some(stamp()));
    }

    #[test]
    fn test_div_wins_over_paragraph() {
        let html = Html::parse_document(
            r#"<div class="copyright">
                <p>Aktualisierung: 01.01.2020 00:00:00</p>
                <div>Letzte Aktualisierung: 04.03.2024 07:45:12</div>
            </div>"#,
        );
        assert_eq!(source_last_updated(html.root_element()), Some(stamp()));
    }

    #[test]
    fn test_missing_or_garbled_stamp() {
        let no_footer = Html::parse_document("<div>Letzte Aktualisierung: 04.03.2024 07:45:12</div>");
        assert_eq!(source_last_updated(no_footer.root_element()), None);

        let garbled =
            Html::parse_document(r#"<div class="copyright"><div>Aktualisierung: gestern</div></div>"#);
        assert_eq!(source_last_updated(garbled.root_element()), None);

        let invalid_date = Html::parse_document(
            r#"<div class="copyright"><div>Aktualisierung: 31.02.2024 07:45:12</div></div>"#,
        );
        assert_eq!(source_last_updated(invalid_date.root_element()), None);
    }

    #[test]
    fn test_last_updated_flag() {
        assert!(LastUpdated::from(Some(stamp())).has_date);
        assert_eq!(
            LastUpdated::from(None),
            LastUpdated {
                last_update: None,
                has_date: false
            }
        );
    }
}

use chrono::NaiveDateTime;
use scraper::{ElementRef, Html};

use super::daily_table::DailyTable;
use super::last_updated::source_last_updated;
use super::news_message::NewsMessage;
use super::substitution::Substitution;
use crate::config::Config;
use crate::parse::Error;
use crate::static_selector;

/// Everything extracted from one fetch of the infoscreen page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Infoscreen {
    pub substitutions: Vec<Substitution>,
    pub news: Vec<NewsMessage>,
    pub last_updated: Option<NaiveDateTime>,
}

impl Infoscreen {
    pub fn from_html(html: &str, config: &Config) -> Result<Self, Error> {
        let document = Html::parse_document(html);
        Self::from_html_element(document.root_element(), config)
    }

    /// The page is one `main-table` whose first row holds a cell per day and,
    /// when news are requested, a trailing news cell.
    ///
    /// A missing main table is the only hard failure; broken days and news blocks
    /// are logged and left out.
    pub fn from_html_element(element: ElementRef<'_>, config: &Config) -> Result<Self, Error> {
        static_selector!(MAIN_TABLE_SELECTOR <- "table.main-table");
        static_selector!(ROW_SELECTOR <- "tr");

        let last_updated = source_last_updated(element);

        let main_table = element
            .select(&MAIN_TABLE_SELECTOR)
            .next()
            .ok_or_else(|| Error::html_parse_error("Main table not found"))?;

        let Some(main_row) = main_table.select(&ROW_SELECTOR).next() else {
            log::warn!("Main table has no rows");
            return Ok(Self {
                last_updated,
                ..Self::default()
            });
        };

        let mut cells: Vec<ElementRef> = main_row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| cell.value().name() == "td")
            .collect();
        log::debug!("Found {} main table cells", cells.len());

        let news = if config.show_news {
            cells.pop().map_or_else(
                || {
                    log::warn!("News column not found");
                    vec![]
                },
                NewsMessage::all_from_html_element,
            )
        } else {
            vec![]
        };

        let substitutions = cells
            .into_iter()
            .filter_map(|cell| match DailyTable::from_html_element(cell) {
                Ok(table) => {
                    log::trace!("Parsed day column for {}", table.date());
                    Some(table.into_substitutions())
                }
                Err(e) => {
                    log::error!("Skipping day column: {e}");
                    None
                }
            })
            .flatten()
            .collect();

        Ok(Self {
            substitutions,
            news,
            last_updated,
        })
    }
}

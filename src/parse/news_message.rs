use std::fmt::Display;

use chrono::NaiveDate;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use super::text_from_selection::text_from_selection;
use crate::parse::Error;
use crate::static_selector;

/// A free-text announcement tied to a date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewsMessage {
    pub message: String,
    pub date: NaiveDate,
}

impl Display for NewsMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.date, self.message)
    }
}

impl NewsMessage {
    pub fn new(message: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            message: message.into(),
            date,
        }
    }

    /// Parses every news block inside the news column, skipping broken ones.
    pub fn all_from_html_element(element: ElementRef<'_>) -> Vec<Self> {
        static_selector!(NEWS_BLOCK_SELECTOR <- "div.news.bb_border.bb_bg_weiss");
        element
            .select(&NEWS_BLOCK_SELECTOR)
            .filter_map(|block| match Self::from_news_block(block) {
                Ok(messages) => Some(messages),
                Err(e) => {
                    log::error!("Skipping news block: {e}");
                    None
                }
            })
            .flatten()
            .collect()
    }

    /// One news block holds a date headline and a body of paragraphs separated
    /// by blank lines. Each paragraph becomes its own message.
    fn from_news_block(block: ElementRef<'_>) -> Result<Vec<Self>, Error> {
        static_selector!(HEADLINE_SELECTOR <- "p.news_headline_2");
        static_selector!(TEXT_SELECTOR <- "span.news_text");

        let date_str = text_from_selection(&HEADLINE_SELECTOR, block, "news", "headline")?;
        let date = NaiveDate::parse_from_str(&date_str, "%d.%m.%Y")?;
        let text = text_from_selection(&TEXT_SELECTOR, block, "news", "text")?;

        let text = text.replace('*', "");

        Ok(text
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .map(|paragraph| Self::new(paragraph, date))
            .collect())
    }
}

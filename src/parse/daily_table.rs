use chrono::NaiveDate;
use scraper::ElementRef;

use super::substitution::{Substitution, ROW_CELLS};
use super::text_from_selection::get_inner_text;
use crate::parse::Error;
use crate::static_selector;

/// One day column of the infoscreen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTable {
    date: NaiveDate,
    substitutions: Vec<Substitution>,
}

impl DailyTable {
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn into_substitutions(self) -> Vec<Substitution> {
        self.substitutions
    }

    /// Parses the day held by one cell of the main table.
    ///
    /// Fails only when the daily container or its date header is missing. Rows
    /// that do not fit are logged and skipped.
    pub fn from_html_element(element: ElementRef<'_>) -> Result<Self, Error> {
        static_selector!(DAILY_TABLE_SELECTOR <- "div.container.daily_table");
        static_selector!(ODD_HEADER_SELECTOR <- "div.daily_date_hdl.week_odd");
        static_selector!(EVEN_HEADER_SELECTOR <- "div.daily_date_hdl.week_even");
        static_selector!(TABLE_SELECTOR <- "table");
        static_selector!(ROW_SELECTOR <- "tr");
        static_selector!(CELL_SELECTOR <- "td");

        let daily_table = element
            .select(&DAILY_TABLE_SELECTOR)
            .next()
            .ok_or_else(|| Error::html_parse_error("Daily table not found"))?;

        // odd and even weeks only differ in styling
        let header = daily_table
            .select(&ODD_HEADER_SELECTOR)
            .next()
            .or_else(|| daily_table.select(&EVEN_HEADER_SELECTOR).next())
            .ok_or_else(|| Error::html_parse_error("Date header not found"))?;
        let date = parse_header_date(&get_inner_text(header))?;

        let Some(table) = daily_table.select(&TABLE_SELECTOR).next() else {
            log::warn!("No substitution table for {date}");
            return Ok(Self {
                date,
                substitutions: vec![],
            });
        };

        let rows = table.select(&ROW_SELECTOR).map(|row| {
            row.select(&CELL_SELECTOR)
                .map(get_inner_text)
                .collect::<Vec<_>>()
        });
        let substitutions = substitutions_from_rows(rows, date);
        log::debug!("Parsed {} substitutions for {date}", substitutions.len());

        Ok(Self {
            date,
            substitutions,
        })
    }
}

/// Reads the date out of a header like `Montag, 04.03.2024 - A-Woche`.
fn parse_header_date(text: &str) -> Result<NaiveDate, Error> {
    if text.is_empty() {
        return Err(Error::text_node_parse_error("Date header should have text inside."));
    }
    let date_str = text
        .split(',')
        .nth(1)
        .and_then(|rest| rest.split('-').next())
        .map(str::trim)
        .ok_or_else(|| Error::date_parse_error(&format!("Date header {text:?} has no date")))?;
    Ok(NaiveDate::parse_from_str(date_str, "%d.%m.%Y")?)
}

/// Turns the cell texts of a substitution table into substitutions.
///
/// The first row is the header. A row with an empty class cell continues the
/// class of the row above it.
fn substitutions_from_rows(
    rows: impl Iterator<Item = Vec<String>>,
    date: NaiveDate,
) -> Vec<Substitution> {
    let mut substitutions = vec![];
    let mut previous_class: Option<String> = None;
    for cells in rows.skip(1) {
        let mut cells: [String; ROW_CELLS] = match cells.try_into() {
            Ok(cells) => cells,
            Err(cells) => {
                log::error!(
                    "Invalid row format on {date}: {cells:?} ({} != {ROW_CELLS})",
                    cells.len()
                );
                continue;
            }
        };

        if cells[0].is_empty() {
            let Some(class_name) = &previous_class else {
                log::error!("Continuation row on {date} has no previous row: {cells:?}");
                continue;
            };
            cells[0].clone_from(class_name);
        } else {
            previous_class = Some(cells[0].clone());
        }

        substitutions.extend(Substitution::from_cells(&cells, date));
    }
    substitutions
}

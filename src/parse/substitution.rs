use std::{fmt::Display, sync::OnceLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of cells a substitution row carries on the infoscreen.
pub const ROW_CELLS: usize = 6;

/// One class-period's teacher/room change on a given day.
///
/// Two substitutions are duplicates when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Substitution {
    pub class_name: String,
    pub period: String,
    pub absent_teacher: String,
    pub substitution_teacher: String,
    pub room: String,
    pub info: String,
    // serialized as yyyy-MM-dd
    pub date: NaiveDate,
}

impl Display for Substitution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}: {}, {}, {}, {}, {}",
            self.date,
            self.class_name,
            self.period,
            self.absent_teacher,
            self.substitution_teacher,
            self.room,
            self.info
        )
    }
}

impl Substitution {
    fn with_class_name(cells: &[String; ROW_CELLS], class_name: String, date: NaiveDate) -> Self {
        Self {
            class_name,
            period: cells[1].clone(),
            absent_teacher: cells[2].clone(),
            substitution_teacher: cells[3].clone(),
            room: cells[4].clone(),
            info: cells[5].clone(),
            date,
        }
    }

    /// Converts one table row into substitutions.
    ///
    /// A class cell like `12ab` names several classes of one grade and yields one
    /// substitution per letter (`12a`, `12b`). Course names such as `Q12` and cells
    /// that do not look like `<grade><letters>` are kept as they are.
    pub fn from_cells(cells: &[String; ROW_CELLS], date: NaiveDate) -> Vec<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"^(\d+)([a-zA-Z]+)").expect("regex should be valid"));

        let class_name = &cells[0];
        if !class_name.starts_with(|c: char| c.is_ascii_digit()) {
            return vec![Self::with_class_name(cells, class_name.clone(), date)];
        }

        let Some(captures) = re.captures(class_name) else {
            log::warn!("Class name {class_name:?} has no letters, keeping it as one substitution");
            return vec![Self::with_class_name(cells, class_name.clone(), date)];
        };
        let grade = &captures[1];
        captures[2]
            .chars()
            .map(|letter| Self::with_class_name(cells, format!("{grade}{letter}"), date))
            .collect()
    }
}

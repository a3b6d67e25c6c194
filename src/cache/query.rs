use std::str::FromStr;

use chrono::NaiveDate;

use crate::{error::Error, parse::Substitution};

/// Substitution fields that can be filtered on by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubstitutionField {
    ClassName,
    AbsentTeacher,
    Info,
}

impl SubstitutionField {
    pub fn get(self, substitution: &Substitution) -> &str {
        match self {
            Self::ClassName => &substitution.class_name,
            Self::AbsentTeacher => &substitution.absent_teacher,
            Self::Info => &substitution.info,
        }
    }
}

impl FromStr for SubstitutionField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class_name" => Ok(Self::ClassName),
            "absent_teacher" | "teacher_name" => Ok(Self::AbsentTeacher),
            "info" => Ok(Self::Info),
            _ => Err(Error::InvalidProperty(s.to_owned())),
        }
    }
}

/// Restricts results to a day or a range of days.
///
/// An exact `date` overrides the range. `start` and `end` are inclusive and
/// each may be left open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateFilter {
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateFilter {
    #[cfg(test)]
    pub const fn on(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            start: None,
            end: None,
        }
    }

    #[cfg(test)]
    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            date: None,
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        if let Some(exact) = self.date {
            return date == exact;
        }
        let mut incl = true;
        incl &= self.start.map_or(true, |start_date| date >= start_date);
        incl &= self.end.map_or(true, |end_date| date <= end_date);
        incl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_field_from_str() {
        assert_eq!("class_name".parse::<SubstitutionField>().unwrap(), SubstitutionField::ClassName);
        assert_eq!(
            "teacher_name".parse::<SubstitutionField>().unwrap(),
            SubstitutionField::AbsentTeacher
        );
        assert!(matches!(
            "clas_name".parse::<SubstitutionField>(),
            Err(Error::InvalidProperty(name)) if name == "clas_name"
        ));
    }

    #[test]
    fn test_exact_date_wins() {
        let filter = DateFilter {
            date: Some(day(4)),
            start: Some(day(1)),
            end: Some(day(10)),
        };
        assert!(filter.matches(day(4)));
        assert!(!filter.matches(day(5)));
    }

    #[test]
    fn test_range_is_inclusive() {
        let filter = DateFilter::between(day(4), day(6));
        assert!(!filter.matches(day(3)));
        assert!(filter.matches(day(4)));
        assert!(filter.matches(day(6)));
        assert!(!filter.matches(day(7)));
    }

    #[test]
    fn test_open_ended_range() {
        let filter = DateFilter {
            start: Some(day(5)),
            ..DateFilter::default()
        };
        assert!(!filter.matches(day(4)));
        assert!(filter.matches(day(30)));
        assert!(DateFilter::default().matches(day(1)));
    }
}

use chrono::{Days, Local, NaiveDate};
use rand::{seq::SliceRandom, Rng};

use super::{
    identity::Credentials,
    manager::{SubstitutionData, SubstitutionManager},
};
use crate::parse::{NewsMessage, Substitution};

pub const EXAMPLE_SUBSTITUTIONS: usize = 5;
pub const EXAMPLE_NEWS: usize = 5;

const CLASSES: &[&str] = &["5a", "6b", "7c", "8a", "9d", "10b", "11a", "Q12", "Q13"];
const TEACHERS: &[&str] = &["Müller", "Schmidt", "Schneider", "Fischer", "Weber", "Wagner"];
const ROOMS: &[&str] = &["101", "102", "E04", "Turnhalle", "Aula", "---"];
const INFOS: &[&str] = &["entfällt", "Raumänderung", "Vertretung", "Aufgaben im Lernportal", ""];
const NEWS: &[&str] = &[
    "Der Wandertag findet bei jedem Wetter statt.",
    "Die Bibliothek ist heute geschlossen.",
    "Elternsprechtag am Donnerstag ab 16 Uhr.",
    "Bitte an die Rückgabe der Bücher denken.",
    "Die Mensa bietet ab sofort ein vegetarisches Menü an.",
    "Probe der Schulband in der Aula.",
];

fn pick<'a>(rng: &mut impl Rng, values: &[&'a str]) -> &'a str {
    values.choose(rng).copied().unwrap_or_default()
}

fn random_date(rng: &mut impl Rng, today: NaiveDate) -> NaiveDate {
    today
        .checked_add_days(Days::new(rng.gen_range(0..3)))
        .unwrap_or(today)
}

impl SubstitutionData {
    /// Random demo data dated today through two days ahead.
    pub fn example() -> Self {
        let mut rng = rand::thread_rng();
        let today = Local::now().date_naive();

        let substitutions = (0..EXAMPLE_SUBSTITUTIONS)
            .map(|_| Substitution {
                class_name: pick(&mut rng, CLASSES).to_owned(),
                period: rng.gen_range(1..=10).to_string(),
                absent_teacher: pick(&mut rng, TEACHERS).to_owned(),
                substitution_teacher: pick(&mut rng, TEACHERS).to_owned(),
                room: pick(&mut rng, ROOMS).to_owned(),
                info: pick(&mut rng, INFOS).to_owned(),
                date: random_date(&mut rng, today),
            })
            .collect();
        let news = (0..EXAMPLE_NEWS)
            .map(|_| NewsMessage::new(pick(&mut rng, NEWS), random_date(&mut rng, today)))
            .collect();

        Self::new(substitutions, news, Some(Local::now().naive_local()))
    }
}

impl SubstitutionManager {
    /// A store of random demo data for the `example` login; never cached or refreshed.
    pub fn example(refresh_interval: chrono::Duration) -> Self {
        Self::new(
            Credentials::new("example", "example"),
            refresh_interval,
            SubstitutionData::example(),
        )
    }
}

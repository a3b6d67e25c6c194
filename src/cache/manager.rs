use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use futures_locks::RwLock;
use tokio::sync::Mutex;

use super::{
    identity::{Credentials, Identity},
    query::{DateFilter, SubstitutionField},
};
use crate::{
    config::Config,
    fetch::{infoscreen_url, PageFetcher},
    parse::{Infoscreen, LastUpdated, NewsMessage, Substitution},
};

/// One immutable load of a tenant's infoscreen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubstitutionData {
    substitutions: Vec<Substitution>,
    news: Vec<NewsMessage>,
    info_portal_updated: Option<NaiveDateTime>,
    cached_at: Option<DateTime<Local>>,
}

impl SubstitutionData {
    /// Builds a snapshot stamped with the current time, dropping duplicate
    /// substitutions.
    pub fn new(
        mut substitutions: Vec<Substitution>,
        news: Vec<NewsMessage>,
        info_portal_updated: Option<NaiveDateTime>,
    ) -> Self {
        let mut seen = HashSet::with_capacity(substitutions.len());
        substitutions.retain(|sub| seen.insert(sub.clone()));
        Self {
            substitutions,
            news,
            info_portal_updated,
            cached_at: Some(Local::now()),
        }
    }

    pub async fn load<F: PageFetcher + ?Sized>(
        fetcher: &F,
        config: &Config,
        credentials: &Credentials,
    ) -> crate::Result<Self> {
        let url = infoscreen_url(config)?;
        let html = fetcher.fetch_page(&url, credentials).await?;
        let page = Infoscreen::from_html(&html, config)?;
        Ok(page.into())
    }

    #[inline]
    #[must_use]
    pub fn time_since_refresh(&self) -> Option<chrono::Duration> {
        self.cached_at
            .map(|cached_at| Local::now().signed_duration_since(cached_at))
    }

    #[inline]
    #[must_use]
    pub fn needs_refresh(&self, refresh_interval: chrono::Duration) -> bool {
        self.time_since_refresh()
            .map_or(true, |since| since > refresh_interval)
    }

    fn substitutions_where(
        &self,
        keep: impl Fn(&Substitution) -> bool,
        filter: &DateFilter,
    ) -> Vec<Substitution> {
        let mut out: Vec<_> = self
            .substitutions
            .iter()
            .filter(|sub| filter.matches(sub.date) && keep(sub))
            .cloned()
            .collect();
        out.sort_by_key(|sub| sub.date);
        out
    }

    fn news_where(&self, keep: impl Fn(&NewsMessage) -> bool) -> Vec<NewsMessage> {
        let mut out: Vec<_> = self.news.iter().filter(|n| keep(n)).cloned().collect();
        out.sort_by_key(|n| n.date);
        out
    }
}

impl From<Infoscreen> for SubstitutionData {
    fn from(page: Infoscreen) -> Self {
        Self::new(page.substitutions, page.news, page.last_updated)
    }
}

/// Cached infoscreen data of one identity.
///
/// Readers take a snapshot and never see a refresh half done: a refresh builds
/// a complete new [`SubstitutionData`] and swaps it in under the write lock.
/// Only one refresh runs per store at a time.
#[derive(Debug)]
pub struct SubstitutionManager {
    identity: Identity,
    credentials: Credentials,
    refresh_interval: chrono::Duration,
    data: RwLock<Arc<SubstitutionData>>,
    refreshing: Mutex<()>,
}

impl SubstitutionManager {
    pub fn new(
        credentials: Credentials,
        refresh_interval: chrono::Duration,
        data: SubstitutionData,
    ) -> Self {
        Self {
            identity: credentials.identity(),
            credentials,
            refresh_interval,
            data: RwLock::new(Arc::new(data)),
            refreshing: Mutex::new(()),
        }
    }

    /// Fetches and parses the infoscreen for a first time.
    pub async fn load<F: PageFetcher + ?Sized>(
        fetcher: &F,
        config: &Config,
        credentials: Credentials,
    ) -> crate::Result<Self> {
        let data = SubstitutionData::load(fetcher, config, &credentials).await?;
        Ok(Self::new(credentials, config.refresh_interval(), data))
    }

    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub async fn snapshot(&self) -> Arc<SubstitutionData> {
        Arc::clone(&*self.data.read().await)
    }

    pub async fn needs_refresh(&self) -> bool {
        self.snapshot().await.needs_refresh(self.refresh_interval)
    }

    /// Re-fetches the infoscreen and replaces all data on success.
    ///
    /// On failure the previous data stays in place and `false` is returned.
    pub async fn refresh<F: PageFetcher + ?Sized>(&self, fetcher: &F, config: &Config) -> bool {
        let _guard = self.refreshing.lock().await;
        self.refresh_locked(fetcher, config).await
    }

    /// Refreshes only if the data is stale, returning whether it did.
    ///
    /// Callers racing on the same stale store trigger a single fetch; the rest
    /// find fresh data once they get the lock.
    pub async fn maybe_refresh<F: PageFetcher + ?Sized>(&self, fetcher: &F, config: &Config) -> bool {
        let _guard = self.refreshing.lock().await;
        if !self.needs_refresh().await {
            return false;
        }
        self.refresh_locked(fetcher, config).await
    }

    async fn refresh_locked<F: PageFetcher + ?Sized>(&self, fetcher: &F, config: &Config) -> bool {
        match SubstitutionData::load(fetcher, config, &self.credentials).await {
            Ok(data) => {
                log::info!(
                    "Refreshed {}: {} substitutions, {} news",
                    self.identity,
                    data.substitutions.len(),
                    data.news.len()
                );
                *self.data.write().await = Arc::new(data);
                true
            }
            Err(e) => {
                log::warn!("Error while refreshing {}, keeping cached data: {e}", self.identity);
                false
            }
        }
    }

    pub async fn get_all_substitutions(&self, filter: &DateFilter) -> Vec<Substitution> {
        self.snapshot().await.substitutions_where(|_| true, filter)
    }

    pub async fn get_substitutions_where(
        &self,
        field: SubstitutionField,
        value: &str,
        filter: &DateFilter,
    ) -> Vec<Substitution> {
        self.snapshot()
            .await
            .substitutions_where(|sub| field.get(sub) == value, filter)
    }

    /// Like [`Self::get_substitutions_where`] with the field given by name.
    pub async fn get_substitutions_with_property(
        &self,
        property: &str,
        value: &str,
        filter: &DateFilter,
    ) -> crate::Result<Vec<Substitution>> {
        let field = property.parse()?;
        Ok(self.get_substitutions_where(field, value, filter).await)
    }

    pub async fn get_substitutions_for_class(
        &self,
        class_name: &str,
        filter: &DateFilter,
    ) -> Vec<Substitution> {
        self.get_substitutions_where(SubstitutionField::ClassName, class_name, filter)
            .await
    }

    pub async fn get_all_news_messages(&self) -> Vec<NewsMessage> {
        self.snapshot().await.news_where(|_| true)
    }

    pub async fn get_news_messages_for_date(&self, date: NaiveDate) -> Vec<NewsMessage> {
        self.snapshot().await.news_where(|n| n.date == date)
    }

    pub async fn get_news_messages_for_today(&self) -> Vec<NewsMessage> {
        self.get_news_messages_for_date(Local::now().date_naive())
            .await
    }

    pub async fn get_last_internal_update(&self) -> LastUpdated {
        self.snapshot()
            .await
            .cached_at
            .map(|cached_at| cached_at.naive_local())
            .into()
    }

    pub async fn get_last_info_portal_update(&self) -> LastUpdated {
        self.snapshot().await.info_portal_updated.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ScriptedFetcher;
    use crate::error::Error;
    use std::fs;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sub(class_name: &str, absent: &str, info: &str, date: NaiveDate) -> Substitution {
        Substitution {
            class_name: class_name.to_owned(),
            period: "1".to_owned(),
            absent_teacher: absent.to_owned(),
            substitution_teacher: "Vertretung".to_owned(),
            room: "101".to_owned(),
            info: info.to_owned(),
            date,
        }
    }

    fn manager(data: SubstitutionData) -> SubstitutionManager {
        SubstitutionManager::new(
            Credentials::new("max", "geheim"),
            chrono::Duration::minutes(5),
            data,
        )
    }

    fn sample() -> SubstitutionManager {
        manager(SubstitutionData::new(
            vec![
                sub("10a", "Smith", "entfällt", day(6)),
                sub("9b", "Jones", "Raumänderung", day(4)),
                sub("10a", "Jones", "entfällt", day(4)),
                sub("7c", "Smith", "", day(5)),
            ],
            vec![
                NewsMessage::new("später", day(5)),
                NewsMessage::new("früher", day(1)),
                NewsMessage::new("heute", Local::now().date_naive()),
            ],
            Some(day(4).and_hms_opt(7, 45, 12).unwrap()),
        ))
    }

    #[test]
    fn test_duplicates_removed() {
        let data = SubstitutionData::new(
            vec![
                sub("12a", "Smith", "entfällt", day(4)),
                sub("12a", "Smith", "entfällt", day(4)),
                sub("12a", "Smith", "entfällt", day(5)),
            ],
            vec![],
            None,
        );
        assert_eq!(data.substitutions.len(), 2);
    }

    #[tokio::test]
    async fn test_all_substitutions_sorted() {
        let subs = sample().get_all_substitutions(&DateFilter::default()).await;
        let dates: Vec<_> = subs.iter().map(|s| s.date).collect();
        assert_eq!(dates, [day(4), day(4), day(5), day(6)]);
        // stable: load order kept between equal dates
        assert_eq!(subs[0].class_name, "9b");
        assert_eq!(subs[1].class_name, "10a");
    }

    #[tokio::test]
    async fn test_date_filters() {
        let manager = sample();
        let on_day = manager.get_all_substitutions(&DateFilter::on(day(4))).await;
        assert_eq!(on_day.len(), 2);
        assert!(on_day.iter().all(|s| s.date == day(4)));

        let range = manager
            .get_all_substitutions(&DateFilter::between(day(5), day(6)))
            .await;
        let dates: Vec<_> = range.iter().map(|s| s.date).collect();
        assert_eq!(dates, [day(5), day(6)]);
    }

    #[tokio::test]
    async fn test_property_filters() {
        let manager = sample();
        let class = manager
            .get_substitutions_for_class("10a", &DateFilter::default())
            .await;
        let dates: Vec<_> = class.iter().map(|s| s.date).collect();
        assert_eq!(dates, [day(4), day(6)]);

        let teacher = manager
            .get_substitutions_with_property("absent_teacher", "Smith", &DateFilter::on(day(5)))
            .await
            .unwrap();
        assert_eq!(teacher.len(), 1);
        assert_eq!(teacher[0].class_name, "7c");

        let info = manager
            .get_substitutions_where(SubstitutionField::Info, "entfällt", &DateFilter::default())
            .await;
        assert_eq!(info.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_property_is_error() {
        let err = sample()
            .get_substitutions_with_property("room", "101", &DateFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProperty(name) if name == "room"));
    }

    #[tokio::test]
    async fn test_news_queries() {
        let manager = sample();
        let all: Vec<_> = manager
            .get_all_news_messages()
            .await
            .into_iter()
            .map(|n| n.date)
            .collect();
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);

        let on_day = manager.get_news_messages_for_date(day(5)).await;
        assert_eq!(on_day, vec![NewsMessage::new("später", day(5))]);

        let today = manager.get_news_messages_for_today().await;
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].message, "heute");
    }

    #[tokio::test]
    async fn test_last_updated() {
        let manager = sample();
        let portal = manager.get_last_info_portal_update().await;
        assert!(portal.has_date);
        assert_eq!(portal.last_update, Some(day(4).and_hms_opt(7, 45, 12).unwrap()));

        let internal = manager.get_last_internal_update().await;
        assert!(internal.has_date);

        let empty = manager_without_stamp();
        assert_eq!(empty.get_last_internal_update().await, LastUpdated::from(None));
        assert!(empty.needs_refresh().await);
    }

    fn manager_without_stamp() -> SubstitutionManager {
        manager(SubstitutionData::default())
    }

    #[tokio::test]
    async fn test_load_dedups_parsed_page() {
        let html = fs::read_to_string("./src/parse/html_examples/infoscreen.html").unwrap();
        let fetcher = ScriptedFetcher::serving(html);
        let manager =
            SubstitutionManager::load(&fetcher, &Config::default(), Credentials::new("max", "geheim"))
                .await
                .unwrap();
        let subs = manager.get_all_substitutions(&DateFilter::default()).await;
        // 12ab appears twice on the page
        assert_eq!(subs.len(), 6);
        assert!(!manager.needs_refresh().await);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_data() {
        let manager = sample();
        let before = manager.snapshot().await;
        let fetcher = ScriptedFetcher::failing();

        assert!(!manager.refresh(&fetcher, &Config::default()).await);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(*manager.snapshot().await, *before);
        assert_eq!(
            manager.get_all_substitutions(&DateFilter::default()).await.len(),
            4
        );
    }

    #[tokio::test]
    async fn test_unparseable_refresh_keeps_data() {
        let manager = sample();
        let fetcher = ScriptedFetcher::serving("<html><body>Wartungsarbeiten</body></html>");
        assert!(!manager.refresh(&fetcher, &Config::default()).await);
        assert_eq!(manager.get_all_news_messages().await.len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_replaces_everything() {
        let manager = sample();
        let html = fs::read_to_string("./src/parse/html_examples/infoscreen.html").unwrap();
        let fetcher = ScriptedFetcher::serving(html);
        assert!(manager.refresh(&fetcher, &Config::default()).await);

        let classes: Vec<_> = manager
            .get_all_substitutions(&DateFilter::on(day(5)))
            .await
            .into_iter()
            .map(|s| s.class_name)
            .collect();
        assert_eq!(classes, ["Q12", "7c"]);
        assert_eq!(manager.get_all_news_messages().await.len(), 3);
        assert_eq!(
            manager.get_news_messages_for_date(day(1)).await[0].message,
            "First item"
        );
    }

    #[tokio::test]
    async fn test_maybe_refresh_skips_fresh_data() {
        let manager = sample();
        let fetcher = ScriptedFetcher::failing();
        assert!(!manager.maybe_refresh(&fetcher, &Config::default()).await);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_readers_during_refresh() {
        let manager = sample();
        let html = fs::read_to_string("./src/parse/html_examples/infoscreen.html").unwrap();
        let fetcher = ScriptedFetcher::serving(html);
        let config = Config::default();
        tokio_scoped::scope(|s| {
            let mut scope = s;
            scope.spawn(async {
                assert!(manager.refresh(&fetcher, &config).await);
            });
            for _ in 0..10 {
                scope = scope.spawn(async {
                    let len = manager
                        .get_all_substitutions(&DateFilter::default())
                        .await
                        .len();
                    // either the old or the new snapshot, never a mix
                    assert!(len == 4 || len == 6, "unexpected len {len}");
                });
            }
        });
        assert_eq!(
            manager.get_all_substitutions(&DateFilter::default()).await.len(),
            6
        );
    }
}

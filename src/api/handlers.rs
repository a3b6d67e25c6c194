use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{auth::BasicAuth, ApiError};
use crate::{
    cache::{DateFilter, SubstitutionField, SubstitutionManager, SubstitutionUpdater},
    fetch::PageFetcher,
    parse::{LastUpdated, NewsMessage, Substitution},
};

type Updater<F> = State<Arc<SubstitutionUpdater<F>>>;

async fn manager<F: PageFetcher>(
    updater: &SubstitutionUpdater<F>,
    BasicAuth(credentials): BasicAuth,
) -> Result<Arc<SubstitutionManager>, ApiError> {
    Ok(updater.get_or_create(credentials).await?)
}

pub async fn auth_check<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
) -> Result<Json<Value>, ApiError> {
    manager(&updater, auth).await?;
    Ok(Json(json!({ "message": "Authentication successful" })))
}

/// Filters of `GET /substitutions`.
///
/// At most one value filter applies, checked in the order class, teacher, info,
/// then the generic `property`/`value` pair. Date filters combine with any of them.
/// `absent_teacher` is only used when `teacher_name` is absent.
#[derive(Debug, Default, Deserialize)]
pub struct SubstitutionQuery {
    class_name: Option<String>,
    teacher_name: Option<String>,
    absent_teacher: Option<String>,
    info: Option<String>,
    property: Option<String>,
    value: Option<String>,
    date: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl SubstitutionQuery {
    fn date_filter(&self) -> DateFilter {
        DateFilter {
            date: self.date,
            start: self.start_date,
            end: self.end_date,
        }
    }

    fn teacher(&self) -> Option<&String> {
        self.teacher_name.as_ref().or(self.absent_teacher.as_ref())
    }
}

pub async fn substitutions<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
    query: Result<Query<SubstitutionQuery>, QueryRejection>,
) -> Result<Json<Vec<Substitution>>, ApiError> {
    let Query(query) = query?;
    let manager = manager(&updater, auth).await?;
    let dates = query.date_filter();

    let subs = if let Some(class_name) = &query.class_name {
        manager.get_substitutions_for_class(class_name, &dates).await
    } else if let Some(teacher) = query.teacher() {
        manager
            .get_substitutions_where(SubstitutionField::AbsentTeacher, teacher, &dates)
            .await
    } else if let Some(info) = &query.info {
        manager
            .get_substitutions_where(SubstitutionField::Info, info, &dates)
            .await
    } else if let Some(property) = &query.property {
        let value = query.value.as_deref().unwrap_or_default();
        manager
            .get_substitutions_with_property(property, value, &dates)
            .await?
    } else {
        manager.get_all_substitutions(&dates).await
    };
    Ok(Json(subs))
}

pub async fn all_news<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
) -> Result<Json<Vec<NewsMessage>>, ApiError> {
    let manager = manager(&updater, auth).await?;
    Ok(Json(manager.get_all_news_messages().await))
}

pub async fn today_news<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
) -> Result<Json<Vec<NewsMessage>>, ApiError> {
    let manager = manager(&updater, auth).await?;
    Ok(Json(manager.get_news_messages_for_today().await))
}

pub async fn news_for_date<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
    date: Result<Path<NaiveDate>, PathRejection>,
) -> Result<Json<Vec<NewsMessage>>, ApiError> {
    let Path(date) = date?;
    let manager = manager(&updater, auth).await?;
    Ok(Json(manager.get_news_messages_for_date(date).await))
}

pub async fn last_updated<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
) -> Result<Json<LastUpdated>, ApiError> {
    let manager = manager(&updater, auth).await?;
    Ok(Json(manager.get_last_info_portal_update().await))
}

pub async fn internal_last_updated<F: PageFetcher>(
    State(updater): Updater<F>,
    auth: BasicAuth,
) -> Result<Json<LastUpdated>, ApiError> {
    let manager = manager(&updater, auth).await?;
    Ok(Json(manager.get_last_internal_update().await))
}

pub async fn refresh<F: PageFetcher>(
    State(updater): Updater<F>,
    BasicAuth(credentials): BasicAuth,
) -> Result<Json<Value>, ApiError> {
    let (manager, refreshed) = updater.refresh_now(credentials).await?;
    Ok(Json(json!({
        "refreshed": refreshed,
        "last_updated": manager.get_last_internal_update().await,
    })))
}

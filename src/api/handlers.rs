use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use std::time::Instant;

use crate::data_models::SearchPage;
use crate::error::ApiError;
use crate::search::DEFAULT_MAX_RESULTS;

use super::AppState;
use super::models::{DownloadRequest, DownloadResponse, MessageResponse, SearchParams};

pub async fn home_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "This is the main endpoint".to_string(),
    })
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchPage>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let query = match params.query.as_deref() {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(ApiError::BadRequest("Query parameter is required".to_string())),
    };
    let max_results = parse_max_results(params.max_results.as_deref())?;
    let page_token = params.page_token.as_deref().filter(|t| !t.is_empty());

    let start = Instant::now();
    let page = state.search.search(query, max_results, page_token).await?;

    log::info!(
        "search {:?} returned {} songs in {}ms",
        query,
        page.songs.len(),
        start.elapsed().as_millis()
    );
    Ok(Json(page))
}

pub async fn download_handler(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let urls = match request.urls {
        Some(urls) if !urls.is_empty() => urls,
        _ => {
            return Err(ApiError::BadRequest(
                "No URLs provided in the request".to_string(),
            ));
        }
    };

    let results = state.downloader.download_all(urls).await;
    Ok(Json(DownloadResponse { results }))
}

fn parse_max_results(raw: Option<&str>) -> Result<u32, ApiError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_RESULTS);
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ApiError::BadRequest(
            "maxResults must be a positive integer".to_string(),
        )),
    }
}

#[test]
fn test_parse_max_results() {
    assert_eq!(parse_max_results(None).unwrap(), 50);
    assert_eq!(parse_max_results(Some("2")).unwrap(), 2);
    assert_eq!(parse_max_results(Some(" 25 ")).unwrap(), 25);
    assert!(parse_max_results(Some("0")).is_err());
    assert!(parse_max_results(Some("-1")).is_err());
    assert!(parse_max_results(Some("lots")).is_err());
}

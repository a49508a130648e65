use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::api::AppState;
use crate::domain::RankingSnapshot;
use crate::error::AppError;

pub async fn get_ranking(State(state): State<AppState>) -> Result<Json<RankingSnapshot>, AppError> {
    let snapshot = state.ranking.get_ranking(Utc::now()).await?;
    Ok(Json(snapshot))
}

use axum::extract::{Path, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{parse_account, AppState};
use crate::domain::{MatchResult, Player, Tier};
use crate::engine::{LevelCurve, MemberLevels, SeasonLevels};
use crate::error::AppError;
use crate::orchestration::{DailyLogin, PropertySummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipView {
    pub tier: Tier,
    pub expire_date: NaiveDate,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    #[serde(flatten)]
    pub player: Player,
    pub season_level: i64,
    pub member_level: i64,
    pub membership: Option<MembershipView>,
    pub properties: PropertySummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    #[serde(default)]
    pub is_winner: bool,
    pub season_points_earned: Option<f64>,
    #[serde(default)]
    pub disconnected: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRequest {
    pub name: String,
    pub level: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub use_member_point: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub season_point_cost: i64,
    pub member_point_cost: i64,
    #[serde(flatten)]
    pub summary: PropertySummary,
}

pub async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerView>, AppError> {
    let account = parse_account(&id)?;
    let player = state
        .players
        .get_player(&account)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("player {}", account)))?;

    let now = Utc::now();
    let membership = state
        .memberships
        .get_membership(&account)
        .await?
        .map(|m| MembershipView {
            tier: m.tier,
            expire_date: m.expire_date,
            enabled: m.is_enabled_at(now),
        });
    let properties = state.properties.summary(&account).await?;

    Ok(Json(PlayerView {
        season_level: SeasonLevels.level_for_points(player.season_point_total),
        member_level: MemberLevels.level_for_points(player.member_point_total),
        player,
        membership,
        properties,
    }))
}

pub async fn record_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<Player>, AppError> {
    let account = parse_account(&id)?;
    let result = MatchResult {
        is_winner: request.is_winner,
        season_points_earned: request.season_points_earned,
        disconnected: request.disconnected,
    };
    let player = state
        .players
        .record_match_result(&account, &result, Utc::now())
        .await?;
    Ok(Json(player))
}

pub async fn daily_login(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DailyLogin>, AppError> {
    let account = parse_account(&id)?;
    let outcome = state.memberships.daily_login(&account, Utc::now()).await?;
    Ok(Json(outcome))
}

pub async fn upgrade_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PropertyRequest>,
) -> Result<Json<PropertySummary>, AppError> {
    let account = parse_account(&id)?;
    let summary = state
        .properties
        .upgrade_property(&account, request.name.trim(), request.level)
        .await?;
    Ok(Json(summary))
}

pub async fn reset_properties(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    let account = parse_account(&id)?;
    let cost = state
        .properties
        .reset_all_properties(&account, request.use_member_point)
        .await?;
    let summary = state.properties.summary(&account).await?;

    Ok(Json(ResetResponse {
        season_point_cost: -cost.season,
        member_point_cost: -cost.member,
        summary,
    }))
}

//! Member registry endpoints

use api_types::member::{
    MemberActivityKind, MemberActivityListResponse, MemberActivityView, MemberList,
    MemberListResponse, MemberNew, MemberStatus, MemberView,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Member, MemberActivity, MemberListFilter, RegisterMemberCmd};

use crate::{ServerError, server::ServerState, to_utc};

const DEFAULT_LIMIT: u64 = 50;

fn status_to_engine(status: MemberStatus) -> engine::MemberStatus {
    match status {
        MemberStatus::Pending => engine::MemberStatus::Pending,
        MemberStatus::Verified => engine::MemberStatus::Verified,
        MemberStatus::Active => engine::MemberStatus::Active,
    }
}

fn status_from_engine(status: engine::MemberStatus) -> MemberStatus {
    match status {
        engine::MemberStatus::Pending => MemberStatus::Pending,
        engine::MemberStatus::Verified => MemberStatus::Verified,
        engine::MemberStatus::Active => MemberStatus::Active,
    }
}

fn member_view(member: Member) -> MemberView {
    MemberView {
        id: member.id,
        member_number: member.member_number,
        name: member.name,
        nik: member.nik,
        address: member.address,
        phone: member.phone,
        status: status_from_engine(member.status),
        joined_at: member.joined_at,
        created_at: member.created_at,
    }
}

fn activity_view(activity: MemberActivity) -> MemberActivityView {
    MemberActivityView {
        id: activity.id,
        kind: match activity.kind {
            engine::MemberActivityKind::Registered => MemberActivityKind::Registered,
            engine::MemberActivityKind::Verified => MemberActivityKind::Verified,
            engine::MemberActivityKind::Activated => MemberActivityKind::Activated,
        },
        occurred_at: activity.occurred_at,
    }
}

/// Handle requests for registering a new member
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<MemberNew>,
) -> Result<(StatusCode, Json<MemberView>), ServerError> {
    let mut cmd = RegisterMemberCmd::new(payload.member_number, payload.name, payload.nik);
    cmd.address = payload.address;
    cmd.phone = payload.phone;
    cmd.joined_at = to_utc(payload.joined_at);

    let member = state.engine.register_member(cmd).await?;
    Ok((StatusCode::CREATED, Json(member_view(member))))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<MemberList>,
) -> Result<Json<MemberListResponse>, ServerError> {
    let filter = MemberListFilter {
        status: query.status.map(status_to_engine),
        query: query.q,
    };
    let (members, next_cursor) = state
        .engine
        .list_members_page(
            &filter,
            query.limit.unwrap_or(DEFAULT_LIMIT),
            query.cursor.as_deref(),
        )
        .await?;

    Ok(Json(MemberListResponse {
        members: members.into_iter().map(member_view).collect(),
        next_cursor,
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<MemberView>, ServerError> {
    let member = state.engine.member(id).await?;
    Ok(Json(member_view(member)))
}

pub async fn verify(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<MemberView>, ServerError> {
    let member = state.engine.verify_member(id).await?;
    Ok(Json(member_view(member)))
}

pub async fn activate(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<MemberView>, ServerError> {
    let member = state.engine.activate_member(id).await?;
    Ok(Json(member_view(member)))
}

pub async fn activities(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<MemberActivityListResponse>, ServerError> {
    let activities = state.engine.member_activities(id).await?;
    Ok(Json(MemberActivityListResponse {
        member_id: id,
        activities: activities.into_iter().map(activity_view).collect(),
    }))
}

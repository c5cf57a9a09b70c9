//! Savings ledger endpoints

use api_types::savings::{
    Balances, MovementKind, MovementList, MovementListResponse, MovementNew, MovementView,
    SavingsCategory,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{MovementCmd, MovementListFilter, SavingsBalances, SavingsMovement};

use crate::{ServerError, server::ServerState, to_utc};

const DEFAULT_LIMIT: u64 = 50;

fn category_to_engine(category: SavingsCategory) -> engine::SavingsCategory {
    match category {
        SavingsCategory::Mandatory => engine::SavingsCategory::Mandatory,
        SavingsCategory::Voluntary => engine::SavingsCategory::Voluntary,
        SavingsCategory::Special => engine::SavingsCategory::Special,
    }
}

fn category_from_engine(category: engine::SavingsCategory) -> SavingsCategory {
    match category {
        engine::SavingsCategory::Mandatory => SavingsCategory::Mandatory,
        engine::SavingsCategory::Voluntary => SavingsCategory::Voluntary,
        engine::SavingsCategory::Special => SavingsCategory::Special,
    }
}

fn movement_view(movement: SavingsMovement) -> MovementView {
    MovementView {
        id: movement.id,
        member_id: movement.member_id,
        category: category_from_engine(movement.category),
        kind: match movement.kind {
            engine::MovementKind::Deposit => MovementKind::Deposit,
            engine::MovementKind::Withdrawal => MovementKind::Withdrawal,
        },
        occurred_at: movement.occurred_at,
        amount_minor: movement.amount_minor,
        balance_after_minor: movement.balance_after_minor,
    }
}

fn balances_view(balances: SavingsBalances) -> Balances {
    Balances {
        member_id: balances.member_id,
        mandatory_minor: balances.mandatory_minor,
        voluntary_minor: balances.voluntary_minor,
        special_minor: balances.special_minor,
        total_minor: balances.total_minor(),
    }
}

/// Lists movements. Filtering by member also returns that member's balances.
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<MovementList>,
) -> Result<Json<MovementListResponse>, ServerError> {
    let filter = MovementListFilter {
        member_id: query.member_id,
        category: query.category.map(category_to_engine),
    };
    let balances = match query.member_id {
        Some(member_id) => Some(state.engine.savings_balances(member_id).await?),
        None => None,
    };
    let (movements, next_cursor) = state
        .engine
        .list_movements_page(
            filter,
            query.limit.unwrap_or(DEFAULT_LIMIT),
            query.cursor.as_deref(),
        )
        .await?;

    Ok(Json(MovementListResponse {
        movements: movements.into_iter().map(movement_view).collect(),
        balances: balances.map(balances_view),
        next_cursor,
    }))
}

pub async fn balances(
    State(state): State<ServerState>,
    Path(member_id): Path<i64>,
) -> Result<Json<Balances>, ServerError> {
    let balances = state.engine.savings_balances(member_id).await?;
    Ok(Json(balances_view(balances)))
}

async fn record(
    state: ServerState,
    payload: MovementNew,
    kind: engine::MovementKind,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    let mut cmd = MovementCmd::new(
        payload.member_id,
        category_to_engine(payload.category),
        kind,
        payload.amount_minor,
    );
    cmd.occurred_at = to_utc(payload.occurred_at);

    let movement = state.engine.record_movement(cmd).await?;
    Ok((StatusCode::CREATED, Json(movement_view(movement))))
}

pub async fn deposit(
    State(state): State<ServerState>,
    Json(payload): Json<MovementNew>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    record(state, payload, engine::MovementKind::Deposit).await
}

pub async fn withdrawal(
    State(state): State<ServerState>,
    Json(payload): Json<MovementNew>,
) -> Result<(StatusCode, Json<MovementView>), ServerError> {
    record(state, payload, engine::MovementKind::Withdrawal).await
}

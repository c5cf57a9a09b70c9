//! Loan lifecycle endpoints

use api_types::loan::{
    LoanApprove, LoanDisburse, LoanList, LoanListResponse, LoanNew, LoanStatus, LoanView,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Loan, LoanApplicationCmd, LoanListFilter};

use crate::{ServerError, server::ServerState, to_utc};

const DEFAULT_LIMIT: u64 = 50;

fn status_to_engine(status: LoanStatus) -> engine::LoanStatus {
    match status {
        LoanStatus::Application => engine::LoanStatus::Application,
        LoanStatus::Approved => engine::LoanStatus::Approved,
        LoanStatus::Active => engine::LoanStatus::Active,
        LoanStatus::Settled => engine::LoanStatus::Settled,
    }
}

fn status_from_engine(status: engine::LoanStatus) -> LoanStatus {
    match status {
        engine::LoanStatus::Application => LoanStatus::Application,
        engine::LoanStatus::Approved => LoanStatus::Approved,
        engine::LoanStatus::Active => LoanStatus::Active,
        engine::LoanStatus::Settled => LoanStatus::Settled,
    }
}

fn loan_view(loan: Loan) -> LoanView {
    LoanView {
        id: loan.id,
        member_id: loan.member_id,
        loan_number: loan.loan_number,
        application_date: loan.application_date,
        approval_date: loan.approval_date,
        disbursement_date: loan.disbursement_date,
        principal_minor: loan.principal_minor,
        term_months: loan.term_months,
        flat_rate_bps: loan.flat_rate.bps(),
        status: status_from_engine(loan.status),
    }
}

/// Handle requests for a new loan application
pub async fn apply(
    State(state): State<ServerState>,
    Json(payload): Json<LoanNew>,
) -> Result<(StatusCode, Json<LoanView>), ServerError> {
    let mut cmd = LoanApplicationCmd::new(
        payload.member_id,
        payload.principal_minor,
        payload.term_months,
        payload.flat_rate_bps,
    );
    cmd.application_date = to_utc(payload.application_date);

    let loan = state.engine.apply(cmd).await?;
    Ok((StatusCode::CREATED, Json(loan_view(loan))))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<LoanList>,
) -> Result<Json<LoanListResponse>, ServerError> {
    let filter = LoanListFilter {
        member_id: query.member_id,
        status: query.status.map(status_to_engine),
    };
    let (loans, next_cursor) = state
        .engine
        .list_loans_page(
            filter,
            query.limit.unwrap_or(DEFAULT_LIMIT),
            query.cursor.as_deref(),
        )
        .await?;

    Ok(Json(LoanListResponse {
        loans: loans.into_iter().map(loan_view).collect(),
        next_cursor,
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<Json<LoanView>, ServerError> {
    let loan = state.engine.loan(id).await?;
    Ok(Json(loan_view(loan)))
}

pub async fn approve(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    payload: Option<Json<LoanApprove>>,
) -> Result<Json<LoanView>, ServerError> {
    let approved_at = payload
        .and_then(|Json(body)| to_utc(body.approved_at))
        .unwrap_or_else(Utc::now);
    let loan = state.engine.approve(id, approved_at).await?;
    Ok(Json(loan_view(loan)))
}

/// Disburses an approved loan and generates its installment schedule.
pub async fn disburse(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    payload: Option<Json<LoanDisburse>>,
) -> Result<Json<LoanView>, ServerError> {
    let disbursed_at = payload
        .and_then(|Json(body)| to_utc(body.disbursed_at))
        .unwrap_or_else(Utc::now);
    let loan = state.engine.disburse(id, disbursed_at).await?;
    Ok(Json(loan_view(loan)))
}

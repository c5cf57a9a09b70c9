//! Installment endpoints

use api_types::installment::{
    InstallmentList, InstallmentListResponse, InstallmentView, PaymentNew, PaymentResponse,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use engine::{Installment, PaymentCmd};

use crate::{ServerError, server::ServerState, to_utc};

fn installment_view(installment: Installment) -> InstallmentView {
    InstallmentView {
        id: installment.id,
        loan_id: installment.loan_id,
        sequence_number: installment.sequence_number,
        due_date: installment.due_date,
        amount_due_minor: installment.amount_due_minor,
        payment_date: installment.payment_date,
        paid_amount_minor: installment.paid_amount_minor,
        late_fee_minor: installment.late_fee_minor,
    }
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<InstallmentList>,
) -> Result<Json<InstallmentListResponse>, ServerError> {
    let installments = state.engine.installments(query.loan_id).await?;
    Ok(Json(InstallmentListResponse {
        installments: installments.into_iter().map(installment_view).collect(),
    }))
}

/// Handle requests for paying one installment
pub async fn pay(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<PaymentNew>,
) -> Result<Json<PaymentResponse>, ServerError> {
    let mut cmd = PaymentCmd::new(id, payload.amount_minor);
    cmd.payment_date = to_utc(payload.payment_date);

    let outcome = state.engine.pay(cmd).await?;
    Ok(Json(PaymentResponse {
        installment: installment_view(outcome.installment),
        loan_settled: outcome.loan_settled,
    }))
}

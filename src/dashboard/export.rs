use axum::{
    Extension,
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    aggregation::filter_by_month,
    auth::UserID,
    csv_export::expenses_to_csv,
    dashboard::handlers::{DashboardState, FilterQuery},
    expense::ExpenseStore,
    timezone::local_today,
};

/// A route handler that downloads the selected month of expenses as CSV.
///
/// The file is named after the month, e.g. "expenses-2024-01.csv".
pub async fn export_expenses_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, Error> {
    let filter = query.resolve(&state.local_timezone)?;
    let today = local_today(&state.local_timezone)?;

    let snapshot = state.expense_store.subscribe(user_id)?.current();
    let expenses = filter_by_month(&snapshot, filter.month, today);
    let csv = expenses_to_csv(&expenses)
        .inspect_err(|error| tracing::error!("could not export expenses as CSV: {error}"))?;

    let disposition = format!("attachment; filename=\"expenses-{}.csv\"", filter.month);

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

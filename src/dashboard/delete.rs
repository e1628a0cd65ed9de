use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    auth::UserID, dashboard::handlers::DashboardState, database_id::ExpenseId,
    expense::ExpenseStore,
};

/// A route handler for deleting one of the logged in user's expenses.
///
/// The page learns about the change through the live stream, so failures are
/// only logged and the client always gets 200 OK.
pub async fn delete_expense_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<ExpenseId>,
) -> StatusCode {
    match state.expense_store.delete(user_id, expense_id) {
        Ok(()) => tracing::debug!("deleted expense {expense_id} for user {user_id}"),
        Err(error) => {
            tracing::warn!("could not delete expense {expense_id} for user {user_id}: {error}")
        }
    }

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        extract::{FromRef, Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        dashboard::{delete::delete_expense_endpoint, handlers::DashboardState},
        expense::{Category, ExpenseStore, NewExpense},
        test_utils::{get_test_app_state, insert_test_user},
    };

    #[tokio::test]
    async fn deletes_own_expense() {
        let app_state = get_test_app_state();
        let user_id = insert_test_user(&app_state.db_connection.lock().unwrap(), "a@b.com");
        let state = DashboardState::from_ref(&app_state);
        let expense = state
            .expense_store
            .create(
                user_id,
                NewExpense {
                    amount: 10.0,
                    category: Category::Food,
                    date: date!(2024 - 01 - 05),
                },
            )
            .unwrap();

        let status =
            delete_expense_endpoint(State(state.clone()), Extension(user_id), Path(expense.id))
                .await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            state
                .expense_store
                .subscribe(user_id)
                .unwrap()
                .current()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn missing_expense_still_succeeds() {
        let app_state = get_test_app_state();
        let user_id = insert_test_user(&app_state.db_connection.lock().unwrap(), "a@b.com");

        let status = delete_expense_endpoint(
            State(DashboardState::from_ref(&app_state)),
            Extension(user_id),
            Path(42),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn cannot_delete_other_users_expense() {
        let app_state = get_test_app_state();
        let (owner, intruder) = {
            let connection = app_state.db_connection.lock().unwrap();
            (
                insert_test_user(&connection, "owner@b.com"),
                insert_test_user(&connection, "intruder@b.com"),
            )
        };
        let state = DashboardState::from_ref(&app_state);
        let expense = state
            .expense_store
            .create(
                owner,
                NewExpense {
                    amount: 10.0,
                    category: Category::Food,
                    date: date!(2024 - 01 - 05),
                },
            )
            .unwrap();

        delete_expense_endpoint(State(state.clone()), Extension(intruder), Path(expense.id)).await;

        let snapshot = state.expense_store.subscribe(owner).unwrap().current();
        assert_eq!(snapshot.as_ref(), [expense]);
    }
}

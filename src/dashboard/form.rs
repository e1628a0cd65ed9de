//! The add-expense form and the handler that records new expenses.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    auth::UserID,
    dashboard::handlers::DashboardState,
    endpoints,
    expense::{Category, DATE_FORMAT, ExpenseStore, NewExpense},
    html::{BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    timezone::local_today,
};

pub(super) const MISSING_FIELDS_MESSAGE: &str = "Please enter amount, category, and date.";
pub(super) const ADD_FAILED_MESSAGE: &str = "Failed to add expense.";

/// The raw values of the add-expense form.
///
/// Every field is kept as text so that a rejected submission can be shown
/// back to the user exactly as they typed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseForm {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
}

impl ExpenseForm {
    /// An empty form with the first category selected and `today` as the date.
    pub(super) fn with_defaults(today: Date) -> Self {
        Self {
            amount: String::new(),
            category: Category::default().to_string(),
            date: today.format(DATE_FORMAT).unwrap_or_default(),
        }
    }

    /// Check the form and turn it into a [NewExpense].
    ///
    /// Returns `None` if a field is empty, the amount is not a finite number,
    /// the category is unknown or the date is not a calendar date.
    pub(super) fn validate(&self) -> Option<NewExpense> {
        let amount = self.amount.trim();
        let category = self.category.trim();
        let date = self.date.trim();

        if amount.is_empty() || category.is_empty() || date.is_empty() {
            return None;
        }

        let amount = amount
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())?;
        let category = category.parse::<Category>().ok()?;
        let date = Date::parse(date, DATE_FORMAT).ok()?;

        Some(NewExpense {
            amount,
            category,
            date,
        })
    }
}

/// Render the add-expense form filled with `form`.
///
/// The form replaces itself with the handler's response, so the fields reset
/// after a successful submission and keep their values after a failed one.
pub(super) fn expense_form_view(form: &ExpenseForm, error_message: Option<&str>) -> Markup {
    html! {
        form
            id="expense-form"
            hx-post=(endpoints::EXPENSES_API)
            hx-swap="outerHTML"
            class={ (CARD_STYLE) " space-y-4" }
        {
            h2 class="text-lg font-semibold" { "Add Expense" }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                input
                    type="number"
                    name="amount"
                    id="amount"
                    min="0"
                    step="0.01"
                    placeholder="0.00"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(form.amount);
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE) required
                {
                    @for category in Category::ALL {
                        option
                            value=(category.as_str())
                            selected[form.category == category.as_str()]
                        {
                            (category.as_str())
                        }
                    }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }
                input
                    type="date"
                    name="date"
                    id="date"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(form.date);
            }

            @if let Some(error_message) = error_message {
                p class="text-red-500 text-base" { (error_message) }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add Expense" }
        }
    }
}

/// A route handler that records a new expense for the logged in user.
///
/// Responds with a fresh form on success. The expense list is updated by the
/// live stream, not by this response.
pub async fn create_expense_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    let Some(new_expense) = form.validate() else {
        return expense_form_view(&form, Some(MISSING_FIELDS_MESSAGE)).into_response();
    };

    if let Err(error) = state.expense_store.create(user_id, new_expense) {
        tracing::error!("could not add expense for user {user_id}: {error}");
        return expense_form_view(&form, Some(ADD_FAILED_MESSAGE)).into_response();
    }

    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    expense_form_view(&ExpenseForm::with_defaults(today), None).into_response()
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        extract::{FromRef, State},
    };
    use axum_extra::extract::Form;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        auth::UserID,
        dashboard::{
            form::{
                ADD_FAILED_MESSAGE, ExpenseForm, MISSING_FIELDS_MESSAGE, create_expense_endpoint,
                expense_form_view,
            },
            handlers::DashboardState,
        },
        endpoints,
        expense::{Category, ExpenseStore, NewExpense},
        test_utils::{
            assert_form_error_message, assert_form_input, assert_form_input_with_value,
            assert_form_submit_button_with_text, assert_hx_endpoint, assert_status_ok,
            assert_valid_html, get_test_app_state, insert_test_user, must_get_form,
            parse_html_fragment,
        },
    };

    fn form(amount: &str, category: &str, date: &str) -> ExpenseForm {
        ExpenseForm {
            amount: amount.to_owned(),
            category: category.to_owned(),
            date: date.to_owned(),
        }
    }

    fn get_test_state() -> (DashboardState, UserID) {
        let app_state = get_test_app_state();
        let user_id = {
            let connection = app_state.db_connection.lock().unwrap();
            insert_test_user(&connection, "test@example.com")
        };

        (DashboardState::from_ref(&app_state), user_id)
    }

    #[test]
    fn validate_accepts_complete_form() {
        let got = form("150", "Food", "2024-01-05").validate();

        assert_eq!(
            got,
            Some(NewExpense {
                amount: 150.0,
                category: Category::Food,
                date: date!(2024 - 01 - 05),
            })
        );
    }

    #[test]
    fn validate_rejects_missing_or_malformed_fields() {
        for bad_form in [
            form("", "Food", "2024-01-05"),
            form("10", "", "2024-01-05"),
            form("10", "Food", ""),
            form("ten", "Food", "2024-01-05"),
            form("NaN", "Food", "2024-01-05"),
            form("10", "Gadgets", "2024-01-05"),
            form("10", "Food", "2024-02-30"),
        ] {
            assert_eq!(bad_form.validate(), None, "accepted {bad_form:?}");
        }
    }

    #[test]
    fn missing_fields_decode_as_empty() {
        let got: ExpenseForm = serde_html_form::from_str("amount=12.5&category=Food").unwrap();

        assert_eq!(got, form("12.5", "Food", ""));
        assert_eq!(got.validate(), None);
    }

    #[test]
    fn defaults_select_first_category_and_today() {
        let got = ExpenseForm::with_defaults(date!(2024 - 03 - 09));

        assert_eq!(got, form("", "Food", "2024-03-09"));
    }

    #[test]
    fn form_view_has_fields_and_keeps_values() {
        let html = scraper::Html::parse_fragment(
            &expense_form_view(&form("12.5", "Travel", "2024-01-05"), None).into_string(),
        );
        assert_valid_html(&html);

        let form_element = must_get_form(&html);
        assert_hx_endpoint(&form_element, endpoints::EXPENSES_API, "hx-post");
        assert_form_input_with_value(&form_element, "amount", "number", "12.5");
        let amount = form_element
            .select(&Selector::parse("input[name=amount]").unwrap())
            .next()
            .unwrap();
        assert_eq!(amount.value().attr("min"), Some("0"));
        assert_form_input_with_value(&form_element, "date", "date", "2024-01-05");
        assert_form_submit_button_with_text(&form_element, "Add Expense");

        let options: Vec<_> = form_element
            .select(&Selector::parse("select[name=category] option").unwrap())
            .collect();
        assert_eq!(options.len(), Category::ALL.len());
        let selected: Vec<_> = options
            .iter()
            .filter(|option| option.value().attr("selected").is_some())
            .map(|option| option.value().attr("value").unwrap_or_default())
            .collect();
        assert_eq!(selected, ["Travel"]);
    }

    #[tokio::test]
    async fn create_adds_expense_and_resets_form() {
        let (state, user_id) = get_test_state();

        let response = create_expense_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form("150", "Food", "2024-01-05")),
        )
        .await;

        assert_status_ok(&response);
        let html = parse_html_fragment(response).await;
        let form_element = must_get_form(&html);
        assert_form_input(&form_element, "amount", "number");
        assert_form_input_with_value(&form_element, "amount", "number", "");
        assert!(
            form_element
                .select(&Selector::parse("p").unwrap())
                .next()
                .is_none(),
            "want no error message after a successful submission"
        );

        let snapshot = state.expense_store.subscribe(user_id).unwrap().current();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].amount, 150.0);
        assert_eq!(snapshot[0].category, Category::Food);
        assert_eq!(snapshot[0].date, Some(date!(2024 - 01 - 05)));
    }

    #[tokio::test]
    async fn missing_field_shows_message_and_keeps_values() {
        let (state, user_id) = get_test_state();

        let response = create_expense_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(form("", "Bills", "2024-01-05")),
        )
        .await;

        let html = parse_html_fragment(response).await;
        let form_element = must_get_form(&html);
        assert_form_error_message(&form_element, MISSING_FIELDS_MESSAGE);
        assert_form_input_with_value(&form_element, "date", "date", "2024-01-05");
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
    async fn store_failure_shows_message_and_keeps_values() {
        let (state, user_id) = get_test_state();
        state
            .db_connection
            .lock()
            .unwrap()
            .execute("DROP TABLE expense", ())
            .unwrap();

        let response = create_expense_endpoint(
            State(state),
            Extension(user_id),
            Form(form("99", "Health", "2024-01-05")),
        )
        .await;

        let html = parse_html_fragment(response).await;
        let form_element = must_get_form(&html);
        assert_form_error_message(&form_element, ADD_FAILED_MESSAGE);
        assert_form_input_with_value(&form_element, "amount", "number", "99");
    }
}

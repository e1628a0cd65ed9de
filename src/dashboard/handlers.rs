//! Dashboard HTTP handlers and the state and query types they share.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    aggregation::aggregate,
    auth::{LogOutSignal, UserID, get_user_by_id},
    dashboard::view::dashboard_view,
    expense::{ExpenseStore, SQLiteExpenseStore},
    month::YearMonth,
    navigation::NavBar,
    preferences::ThemePreference,
    timezone::{current_month, local_today},
};

/// The state needed for displaying and updating the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection, used to look up the logged in user.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// The store holding every user's expenses.
    pub expense_store: SQLiteExpenseStore,
    /// Each user's dark mode preference.
    pub theme: ThemePreference,
    /// Closes live streams when their user logs out.
    pub log_outs: LogOutSignal,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            expense_store: state.expense_store.clone(),
            theme: state.theme.clone(),
            log_outs: state.log_outs.clone(),
        }
    }
}

/// The month and budget the dashboard is showing, as sent in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

impl FilterQuery {
    /// Fill in the current month if none was given.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if the month is not in the format "YYYY-MM",
    /// or [Error::InvalidTimezoneError] if the current month cannot be found.
    pub(super) fn resolve(self, local_timezone: &str) -> Result<Filter, Error> {
        let month = match self.month.as_deref().map(str::trim) {
            Some(month) if !month.is_empty() => month.parse()?,
            _ => current_month(local_timezone)?,
        };

        Ok(Filter {
            month,
            budget: self.budget.unwrap_or_default(),
        })
    }
}

/// The resolved month and the budget text the user entered.
///
/// The budget is kept as text: a budget that does not start with a number
/// never raises the over-budget alert.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Filter {
    pub month: YearMonth,
    pub budget: String,
}

#[derive(Serialize)]
struct FilterParams<'a> {
    month: String,
    budget: &'a str,
}

impl Filter {
    /// The filter as a query string, e.g. "month=2024-01&budget=100".
    pub(super) fn to_query_string(&self) -> String {
        serde_urlencoded::to_string(FilterParams {
            month: self.month.to_string(),
            budget: &self.budget,
        })
        .inspect_err(|error| tracing::error!("could not encode dashboard filter: {error}"))
        .unwrap_or_default()
    }
}

/// Display the dashboard for the month and budget in the query string.
///
/// The page is rendered from the user's current snapshot and then kept up to
/// date by the live stream.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<FilterQuery>,
) -> Result<Response, Error> {
    let filter = query.resolve(&state.local_timezone)?;
    let today = local_today(&state.local_timezone)?;

    let user = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_user_by_id(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?
    };

    let snapshot = state.expense_store.subscribe(user_id)?.current();
    let aggregation = aggregate(&snapshot, filter.month, &filter.budget, today);
    let is_dark = state.theme.is_dark(user_id)?;
    let nav_bar = NavBar::new(&user.email, is_dark);

    Ok(dashboard_view(nav_bar, is_dark, &filter, &aggregation, today).into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Router,
        extract::FromRef,
        http::StatusCode,
        routing::get,
    };
    use axum_test::TestServer;
    use scraper::{Html, Selector};
    use time::{Month, macros::date};

    use crate::{
        AppState, Error,
        auth::UserID,
        dashboard::handlers::{DashboardState, Filter, FilterQuery, get_dashboard_page},
        expense::{Category, ExpenseStore, NewExpense},
        month::YearMonth,
        test_utils::{assert_valid_html, get_test_app_state, insert_test_user},
    };

    fn get_test_server() -> (TestServer, AppState, UserID) {
        let state = get_test_app_state();
        let user_id = {
            let connection = state.db_connection.lock().unwrap();
            insert_test_user(&connection, "test@example.com")
        };

        let app = Router::new()
            .route("/dashboard", get(get_dashboard_page))
            .layer(Extension(user_id))
            .with_state(DashboardState::from_ref(&state));

        let server = TestServer::new(app);

        (server, state, user_id)
    }

    fn add_expense(state: &AppState, user_id: UserID, amount: f64, category: Category) {
        state
            .expense_store
            .create(
                user_id,
                NewExpense {
                    amount,
                    category,
                    date: date!(2024 - 01 - 05),
                },
            )
            .unwrap();
    }

    fn select_text(html: &Html, selector: &str) -> Option<String> {
        html.select(&Selector::parse(selector).unwrap())
            .next()
            .map(|element| element.text().collect::<String>())
    }

    #[test]
    fn resolve_parses_month_and_keeps_budget() {
        let query = FilterQuery {
            month: Some("2024-01".to_owned()),
            budget: Some("100".to_owned()),
        };

        let got = query.resolve("Etc/UTC").unwrap();

        assert_eq!(
            got,
            Filter {
                month: YearMonth::new(2024, Month::January),
                budget: "100".to_owned(),
            }
        );
    }

    #[test]
    fn resolve_rejects_invalid_month() {
        let query = FilterQuery {
            month: Some("January".to_owned()),
            budget: None,
        };

        assert_eq!(
            query.resolve("Etc/UTC"),
            Err(Error::InvalidMonth("January".to_owned()))
        );
    }

    #[test]
    fn query_string_encodes_budget() {
        let filter = Filter {
            month: YearMonth::new(2024, Month::March),
            budget: "1 000".to_owned(),
        };

        assert_eq!(filter.to_query_string(), "month=2024-03&budget=1+000");
    }

    #[tokio::test]
    async fn dashboard_shows_month_of_expenses() {
        let (server, state, user_id) = get_test_server();
        add_expense(&state, user_id, 100.0, Category::Food);
        add_expense(&state, user_id, 50.0, Category::Food);

        let response = server.get("/dashboard?month=2024-01").await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        let items = html
            .select(&Selector::parse("#expense-list li").unwrap())
            .count();
        assert_eq!(items, 2);
        let total = select_text(&html, "#monthly-total").expect("total missing");
        assert!(total.contains("Total this month: ₹150.00"), "got {total}");
        assert!(select_text(&html, "#budget-alert").is_none());
        let budget_input = html
            .select(&Selector::parse("input[name=budget]").unwrap())
            .next()
            .expect("budget input missing");
        assert_eq!(budget_input.value().attr("min"), Some("0"));
    }

    #[tokio::test]
    async fn dashboard_shows_budget_alert() {
        let (server, state, user_id) = get_test_server();
        add_expense(&state, user_id, 150.0, Category::Travel);

        let response = server.get("/dashboard?month=2024-01&budget=100").await;

        let html = Html::parse_document(&response.text());
        let alert = select_text(&html, "#budget-alert").expect("budget alert missing");
        assert!(alert.contains("You have exceeded your monthly budget!"));
    }

    #[tokio::test]
    async fn other_months_are_hidden() {
        let (server, state, user_id) = get_test_server();
        add_expense(&state, user_id, 150.0, Category::Travel);

        let response = server.get("/dashboard?month=2024-02").await;

        let html = Html::parse_document(&response.text());
        assert_eq!(
            html.select(&Selector::parse("#expense-list li").unwrap())
                .count(),
            0
        );
        let total = select_text(&html, "#monthly-total").expect("total missing");
        assert!(total.contains("₹0.00"), "got {total}");
    }

    #[tokio::test]
    async fn invalid_month_is_bad_request() {
        let (server, _, _) = get_test_server();

        let response = server.get("/dashboard?month=2024-13").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn theme_belongs_to_the_logged_in_user() {
        let state = get_test_app_state();
        let (alice, bob) = {
            let connection = state.db_connection.lock().unwrap();
            (
                insert_test_user(&connection, "alice@example.com"),
                insert_test_user(&connection, "bob@example.com"),
            )
        };
        state.theme.toggle(alice).unwrap();

        assert!(renders_dark(&state, alice).await, "alice chose dark mode");
        assert!(
            !renders_dark(&state, bob).await,
            "bob's page followed alice's theme"
        );
    }

    async fn renders_dark(state: &AppState, user_id: UserID) -> bool {
        let app = Router::new()
            .route("/dashboard", get(get_dashboard_page))
            .layer(Extension(user_id))
            .with_state(DashboardState::from_ref(state));
        let text = TestServer::new(app).get("/dashboard").await.text();

        Html::parse_document(&text)
            .select(&Selector::parse("html.dark").unwrap())
            .next()
            .is_some()
    }

    #[tokio::test]
    async fn live_stream_keeps_filter() {
        let (server, _, _) = get_test_server();

        let response = server.get("/dashboard?month=2024-01&budget=100").await;

        let html = Html::parse_document(&response.text());
        let live = html
            .select(&Selector::parse("[sse-connect]").unwrap())
            .next()
            .expect("live container missing");
        assert_eq!(
            live.value().attr("sse-connect"),
            Some("/api/expenses/live?month=2024-01&budget=100")
        );
    }
}

//! Renders the dashboard page and the fragments sent over the live stream.

use maud::{Markup, PreEscaped, html};
use time::Date;

use crate::{
    aggregation::Aggregation,
    dashboard::{
        chart::{category_pie_chart, chart_view},
        form::{ExpenseForm, expense_form_view},
        handlers::Filter,
    },
    endpoints::{self, format_endpoint},
    expense::{DATE_FORMAT, Expense},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, format_currency,
    },
    navigation::NavBar,
};

const ECHARTS_SCRIPT: &str = "/static/echarts.6.0.0.min.js";

pub(super) const BUDGET_ALERT_MESSAGE: &str = "Alert: You have exceeded your monthly budget!";

/// The full dashboard page.
pub(super) fn dashboard_view(
    nav_bar: NavBar,
    is_dark: bool,
    filter: &Filter,
    aggregation: &Aggregation,
    today: Date,
) -> Markup {
    let query = filter.to_query_string();
    let live_url = format!("{}?{query}", endpoints::EXPENSES_LIVE);
    let export_url = format!("{}?{query}", endpoints::EXPENSES_EXPORT);

    let content = html!(
        (nav_bar.into_html())

        div class={ (PAGE_CONTAINER_STYLE) " max-w-screen-md gap-6" }
        {
            (expense_form_view(&ExpenseForm::with_defaults(today), None))

            form
                id="filter-form"
                method="get"
                action=(endpoints::DASHBOARD_VIEW)
                class={ (CARD_STYLE) " flex flex-wrap items-end gap-4" }
            {
                div
                {
                    label for="month" class=(FORM_LABEL_STYLE) { "Month" }
                    input
                        type="month"
                        name="month"
                        id="month"
                        class=(FORM_TEXT_INPUT_STYLE)
                        value=(filter.month);
                }

                div
                {
                    label for="budget" class=(FORM_LABEL_STYLE) { "Monthly budget" }
                    input
                        type="number"
                        name="budget"
                        id="budget"
                        min="0"
                        step="0.01"
                        placeholder="No budget"
                        class=(FORM_TEXT_INPUT_STYLE)
                        value=(filter.budget);
                }

                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Apply" }

                a href=(export_url) id="export-link" class=(BUTTON_SECONDARY_STYLE) download
                {
                    "Export CSV"
                }
            }

            div
                hx-ext="sse"
                sse-connect=(live_url)
                class="w-full"
            {
                div id="live-content" sse-swap="snapshot" class={ (CARD_STYLE) " space-y-4" }
                {
                    (live_content(aggregation))
                }

                div id="theme-sync" sse-swap="theme" {}
                div id="session-sync" sse-swap="session" {}
            }
        }
    );

    base("Dashboard", is_dark, &[ECHARTS_SCRIPT], &content)
}

/// The parts of the page that depend on the user's expenses.
///
/// This is sent over the live stream every time the collection changes.
pub(super) fn live_content(aggregation: &Aggregation) -> Markup {
    html! {
        @if aggregation.over_budget {
            div
                id="budget-alert"
                role="alert"
                class="p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
            {
                (BUDGET_ALERT_MESSAGE)
            }
        }

        h2 class="text-lg font-semibold" { "Expenses" }

        @if aggregation.expenses.is_empty() {
            p id="no-expenses" class="text-gray-500 dark:text-gray-400" { "No expenses this month." }
        } @else {
            ul id="expense-list" class="divide-y divide-gray-200 dark:divide-gray-700"
            {
                @for expense in &aggregation.expenses {
                    (expense_item(expense))
                }
            }
        }

        @if !aggregation.category_totals.is_empty() {
            (chart_view(&category_pie_chart(&aggregation.category_totals)))
        }

        p id="monthly-total" class="text-lg font-semibold"
        {
            "Total this month: " (format_currency(aggregation.total))
        }
    }
}

fn expense_item(expense: &Expense) -> Markup {
    let date = expense
        .date
        .and_then(|date| date.format(DATE_FORMAT).ok())
        .unwrap_or_else(|| "no date".to_owned());

    html! {
        li class="flex items-center justify-between py-2"
        {
            span
            {
                (format_currency(expense.amount)) " - " (expense.category) " [" (date) "]"
            }

            button
                type="button"
                hx-delete=(format_endpoint(endpoints::EXPENSE, expense.id))
                hx-swap="none"
                aria-label="Delete expense"
                class=(BUTTON_DELETE_STYLE)
            {
                "❌"
            }
        }
    }
}

/// A script that switches the open page to the given theme.
pub(super) fn theme_script(is_dark: bool) -> Markup {
    let label = if is_dark { "Light mode" } else { "Dark mode" };
    let script = format!(
        r#"{{
            document.documentElement.classList.toggle("dark", {is_dark});
            const darkModeToggle = document.getElementById("dark-mode-toggle");
            if (darkModeToggle) darkModeToggle.textContent = "{label}";
        }}"#
    );

    html! {
        script { (PreEscaped(script)) }
    }
}

/// A script that reloads the open page, e.g. after the user logged out.
pub(super) fn reload_script() -> Markup {
    html! {
        script { (PreEscaped("window.location.reload();")) }
    }
}

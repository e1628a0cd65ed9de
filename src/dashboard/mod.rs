//! Dashboard module
//!
//! Provides the page where a user records expenses and reviews one month of
//! spending against a budget, with a pie chart per category and CSV export.
//! The page stays current through a Server-Sent Events stream.

mod chart;
mod delete;
mod export;
mod form;
mod handlers;
mod live;
mod view;

pub use delete::delete_expense_endpoint;
pub use export::export_expenses_endpoint;
pub use form::create_expense_endpoint;
pub use handlers::get_dashboard_page;
pub use live::get_live_expenses;

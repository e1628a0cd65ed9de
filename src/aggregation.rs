//! Turns a user's expenses into the numbers shown on the dashboard.
//!
//! Everything here is pure: the same expenses, month, budget and date always
//! give the same result.

use time::Date;

use crate::{
    expense::{Category, Expense},
    month::YearMonth,
};

/// The derived values for one month of expenses.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// The expenses that fall in the selected month, in snapshot order.
    pub expenses: Vec<Expense>,
    /// Total spent per category, in the order each category first appears.
    pub category_totals: Vec<(Category, f64)>,
    /// Total spent in the month.
    pub total: f64,
    /// Whether the total is over the budget.
    pub over_budget: bool,
}

/// Run every aggregation step for `month` against `budget`.
///
/// `today` is the current local date, used for expenses without a date.
pub fn aggregate(expenses: &[Expense], month: YearMonth, budget: &str, today: Date) -> Aggregation {
    let expenses = filter_by_month(expenses, month, today);
    let category_totals = category_totals(&expenses);
    let total = grand_total(&expenses);
    let over_budget = is_over_budget(total, budget);

    Aggregation {
        expenses,
        category_totals,
        total,
        over_budget,
    }
}

/// Keep the expenses whose date falls in `month`.
///
/// An expense without a date counts as belonging to the month that `today`
/// falls in.
pub fn filter_by_month(expenses: &[Expense], month: YearMonth, today: Date) -> Vec<Expense> {
    expenses
        .iter()
        .filter(|expense| month.contains(expense.date.unwrap_or(today)))
        .cloned()
        .collect()
}

/// Sum the amounts per category, keeping the order categories first appear in.
pub fn category_totals(expenses: &[Expense]) -> Vec<(Category, f64)> {
    let mut totals: Vec<(Category, f64)> = Vec::new();

    for expense in expenses {
        let amount = amount_or_zero(expense.amount);

        match totals
            .iter_mut()
            .find(|(category, _)| *category == expense.category)
        {
            Some((_, total)) => *total += amount,
            None => totals.push((expense.category, amount)),
        }
    }

    totals
}

/// Sum every amount in `expenses`.
pub fn grand_total(expenses: &[Expense]) -> f64 {
    expenses
        .iter()
        .map(|expense| amount_or_zero(expense.amount))
        .sum()
}

/// Whether `total` is strictly greater than the budget in `budget`.
///
/// The budget is the number `budget` starts with, so "12abc" is 12. An empty
/// budget, or one that does not start with a number, never raises an alert.
pub fn is_over_budget(total: f64, budget: &str) -> bool {
    leading_number(budget).is_some_and(|budget| total > budget)
}

/// The decimal number at the start of `text`, ignoring leading whitespace and
/// anything after the number.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_digits = digits_from(end);
    end += integer_digits;

    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = digits_from(end + 1);
        end += 1 + fraction_digits;
    }

    if integer_digits + fraction_digits == 0 {
        return None;
    }

    // An exponent only counts if it has digits, "2e" is just 2.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_digits = digits_from(end + 1 + sign);

        if exponent_digits > 0 {
            end += 1 + sign + exponent_digits;
        }
    }

    text[..end].parse().ok()
}

fn amount_or_zero(amount: f64) -> f64 {
    if amount.is_nan() { 0.0 } else { amount }
}

#[cfg(test)]
mod tests {
    use time::{Date, Month, macros::date};

    use crate::{
        aggregation::{
            Aggregation, aggregate, category_totals, filter_by_month, grand_total, is_over_budget,
        },
        expense::{Category, Expense},
        month::YearMonth,
    };

    const TODAY: Date = date!(2024 - 03 - 15);

    fn expense(id: i64, amount: f64, category: Category, date: Option<Date>) -> Expense {
        Expense {
            id,
            amount,
            category,
            date,
        }
    }

    fn scenario_expenses() -> Vec<Expense> {
        vec![
            expense(1, 100.0, Category::Food, Some(date!(2024 - 01 - 05))),
            expense(2, 50.0, Category::Food, Some(date!(2024 - 01 - 20))),
            expense(3, 30.0, Category::Travel, Some(date!(2024 - 02 - 01))),
        ]
    }

    fn mixed_expenses() -> Vec<Expense> {
        vec![
            expense(1, 12.5, Category::Travel, Some(date!(2024 - 03 - 01))),
            expense(2, 100.0, Category::Food, Some(date!(2024 - 03 - 02))),
            expense(3, 7.25, Category::Travel, Some(date!(2024 - 03 - 31))),
            expense(4, -3.0, Category::Other, Some(date!(2024 - 03 - 09))),
            expense(5, 40.0, Category::Bills, None),
            expense(6, 999.0, Category::Health, Some(date!(2024 - 04 - 01))),
            expense(7, f64::NAN, Category::Shopping, Some(date!(2024 - 03 - 10))),
        ]
    }

    #[test]
    fn scenario_for_january() {
        let got = aggregate(
            &scenario_expenses(),
            YearMonth::new(2024, Month::January),
            "100",
            TODAY,
        );

        assert_eq!(
            got,
            Aggregation {
                expenses: scenario_expenses()[..2].to_vec(),
                category_totals: vec![(Category::Food, 150.0)],
                total: 150.0,
                over_budget: true,
            }
        );
    }

    #[test]
    fn filter_is_idempotent() {
        let month = YearMonth::new(2024, Month::March);
        let once = filter_by_month(&mixed_expenses(), month, TODAY);

        let twice = filter_by_month(&once, month, TODAY);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn missing_date_counts_as_current_month() {
        let expenses = vec![expense(1, 40.0, Category::Bills, None)];

        let this_month = filter_by_month(&expenses, YearMonth::from_date(TODAY), TODAY);
        let last_month = filter_by_month(&expenses, YearMonth::new(2024, Month::February), TODAY);

        assert_eq!(this_month.len(), 1);
        assert!(last_month.is_empty());
    }

    #[test]
    fn category_totals_keep_first_seen_order() {
        let march = filter_by_month(&mixed_expenses(), YearMonth::new(2024, Month::March), TODAY);

        let got = category_totals(&march);

        assert_eq!(
            got,
            vec![
                (Category::Travel, 19.75),
                (Category::Food, 100.0),
                (Category::Other, -3.0),
                (Category::Bills, 40.0),
                (Category::Shopping, 0.0),
            ]
        );
    }

    #[test]
    fn category_totals_sum_to_grand_total() {
        for month in [Month::January, Month::February, Month::March, Month::April] {
            for expenses in [scenario_expenses(), mixed_expenses()] {
                let filtered = filter_by_month(&expenses, YearMonth::new(2024, month), TODAY);

                let sum_of_categories: f64 =
                    category_totals(&filtered).iter().map(|(_, total)| total).sum();
                let total = grand_total(&filtered);

                assert!(
                    (sum_of_categories - total).abs() < 1e-9,
                    "{sum_of_categories} != {total} for {month}"
                );
            }
        }
    }

    #[test]
    fn not_a_number_amounts_count_as_zero() {
        let expenses = vec![
            expense(1, f64::NAN, Category::Food, Some(TODAY)),
            expense(2, 5.0, Category::Food, Some(TODAY)),
        ];

        assert_eq!(grand_total(&expenses), 5.0);
    }

    #[test]
    fn budget_alert_is_monotonic() {
        let total = 150.0;

        for budget in ["150", "150.01", "200", "1e6"] {
            assert!(!is_over_budget(total, budget), "budget {budget}");
        }

        for budget in ["149.99", "100", "0", "-5"] {
            assert!(is_over_budget(total, budget), "budget {budget}");
        }
    }

    #[test]
    fn unset_or_invalid_budget_never_alerts() {
        for budget in ["", "   ", "abc", "NaN", "Infinity", ".", "-", "e5"] {
            assert!(!is_over_budget(1_000_000.0, budget), "budget {budget:?}");
        }
    }

    #[test]
    fn budget_uses_leading_number() {
        for budget in ["12abc", " 100 rupees", "1e2x", "99.5.5", "2e", "+.5kg"] {
            assert!(is_over_budget(150.0, budget), "budget {budget:?}");
        }

        assert!(!is_over_budget(150.0, "1e3abc"));
        assert!(!is_over_budget(150.0, "150.00 per month"));
    }

    #[test]
    fn empty_input_is_degenerate() {
        let got = aggregate(&[], YearMonth::new(2024, Month::January), "10", TODAY);

        assert_eq!(
            got,
            Aggregation {
                expenses: vec![],
                category_totals: vec![],
                total: 0.0,
                over_budget: false,
            }
        );
    }
}

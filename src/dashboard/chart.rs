//! The pie chart of spending per category.
//!
//! The chart is built with charming and drawn in the browser by ECharts. The
//! container and its init script are sent together so that the chart redraws
//! whenever the live content is swapped in.

use charming::{
    Chart,
    component::Legend,
    element::{Color, JsFunction, Tooltip, Trigger},
    series::Pie,
};
use maud::{Markup, PreEscaped, html};

use crate::expense::Category;

/// The slice colours, used in order of first appearance.
const PALETTE: [&str; 7] = [
    "#f87171", "#60a5fa", "#34d399", "#fbbf24", "#a78bfa", "#f472b6", "#facc15",
];

const CHART_ID: &str = "category-chart";

/// A pie chart with one slice per category in `category_totals`.
pub(super) fn category_pie_chart(category_totals: &[(Category, f64)]) -> Chart {
    let data: Vec<(f64, &str)> = category_totals
        .iter()
        .map(|(category, total)| (*total, category.as_str()))
        .collect();

    Chart::new()
        .color(PALETTE.iter().map(|colour| Color::from(*colour)).collect())
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("0%"))
        .series(Pie::new().name("Spending").radius("65%").data(data))
}

/// The chart container and the script that draws `chart` into it.
pub(super) fn chart_view(chart: &Chart) -> Markup {
    let script = format!(
        r#"(function() {{
            const chartDom = document.getElementById("{CHART_ID}");
            if (!chartDom || typeof echarts === "undefined") return;
            const isDark = document.documentElement.classList.contains("dark");
            const chart = echarts.init(chartDom, isDark ? "dark" : null);
            chart.setOption({chart});
            window.addEventListener("resize", () => chart.resize());
        }})();"#
    );

    html! {
        div id=(CHART_ID) class="w-full max-w-xs mx-auto min-h-[320px]" {}
        script { (PreEscaped(script)) }
    }
}

fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-IN', {
              style: 'currency',
              currency: 'INR'
            });
            return currencyFormatter.format(number);",
    )
}

//! The spending chart on the dashboard.
//!
//! Charts are ECharts configurations built with `charming`, serialised to JSON
//! and initialised by a small script in the page head.

use charming::{
    Chart,
    component::{Axis, Grid, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::Bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{dashboard::aggregation::CategorySpending, html::HeadElement};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// The container the chart is drawn into.
pub(super) fn chart_view(chart: &DashboardChart) -> Markup {
    html!(
        div
            id=(chart.id)
            class="min-h-[320px] w-full rounded dark:bg-gray-100"
        {}
    )
}

/// Script that draws `charts` once the page has loaded, following the
/// system colour scheme and resizing with the window.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    if (!chartDom) return;
                    const chart = echarts.init(chartDom);
                    chart.setOption({});

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    HeadElement::ScriptSource(PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    )))
}

/// A bar per category showing this month's spending.
pub(super) fn spending_by_category_chart(spending: &[CategorySpending]) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = spending
        .iter()
        .map(|entry| (entry.category.clone(), entry.total))
        .unzip();

    Chart::new()
        .title(Title::new().text("Spending by category").subtext("This month"))
        .tooltip(currency_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(Bar::new().name("Spent").data(values))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

#[cfg(test)]
mod chart_tests {
    use maud::PreEscaped;

    use crate::{dashboard::aggregation::CategorySpending, html::HeadElement};

    use super::{DashboardChart, charts_script, spending_by_category_chart};

    #[test]
    fn chart_lists_categories_and_totals() {
        let spending = [
            CategorySpending {
                category: "rent".to_owned(),
                total: 30.0,
            },
            CategorySpending {
                category: "food".to_owned(),
                total: 20.0,
            },
        ];

        let options = spending_by_category_chart(&spending).to_string();

        assert!(options.contains("\"rent\""), "got {options}");
        assert!(options.contains("\"food\""), "got {options}");
        assert!(options.contains("Spending by category"), "got {options}");
    }

    #[test]
    fn script_initialises_each_chart() {
        let charts = [DashboardChart {
            id: "spending-chart",
            options: "{}".to_owned(),
        }];

        let HeadElement::ScriptSource(PreEscaped(script)) = charts_script(&charts) else {
            panic!("expected inline script");
        };

        assert!(script.contains("getElementById(\"spending-chart\")"));
        assert!(script.contains("DOMContentLoaded"));
    }
}

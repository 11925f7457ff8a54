//! The fortnightly collections chart on the admin dashboard.
//!
//! Charts are built as ECharts options with `charming`, serialized to JSON and
//! initialised by a script in the page head.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisLabel, AxisPointer, AxisPointerType, AxisType, JsFunction, Tooltip, Trigger},
    series::bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{contribution::FortnightTotals, html::HeadElement};

/// A chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

pub(super) fn chart_container(chart: &DashboardChart) -> Markup {
    html!(
        section id="charts" class="w-full mx-auto mb-4"
        {
            div id=(chart.id) class="min-h-[380px] rounded dark:bg-gray-100" {}
        }
    )
}

/// The scripts that load ECharts and initialise `chart` once the page has loaded.
pub(super) fn chart_head_elements(chart: &DashboardChart) -> [HeadElement; 2] {
    let script = format!(
        r#"document.addEventListener('DOMContentLoaded', function() {{
            const chartDom = document.getElementById("{}");
            const chart = echarts.init(chartDom);
            chart.setOption({});

            window.addEventListener('resize', chart.resize);

            const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
            const updateTheme = () => {{
                chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
            }};
            darkModeMediaQuery.addEventListener('change', updateTheme);
            updateTheme();
        }});"#,
        chart.id, chart.options
    );

    [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        HeadElement::ScriptSource(PreEscaped(script)),
    ]
}

/// A bar chart of the shares and social fund collected in each fortnight.
pub(super) fn fortnight_collections_chart(totals: &[FortnightTotals]) -> DashboardChart {
    let labels: Vec<String> = totals
        .iter()
        .map(|total| total.fortnight.to_string())
        .collect();
    let shares: Vec<f64> = totals.iter().map(|total| total.shares).collect();
    let social_fund: Vec<f64> = totals.iter().map(|total| total.social_fund).collect();

    let chart = Chart::new()
        .title(
            Title::new()
                .text("Collections by Fortnight")
                .subtext("Shares and social fund"),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .legend(Legend::new().right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(bar::Bar::new().name("Shares").data(shares))
        .series(bar::Bar::new().name("Social Fund").data(social_fund));

    DashboardChart {
        id: "fortnight-collections-chart",
        options: chart.to_string(),
    }
}

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

use url::Url;

use crate::progress::GoalProgress;

const QUICKCHART_BASE: &str = "https://quickchart.io/chart";
const CHART_WIDTH: u32 = 500;
const CHART_HEIGHT: u32 = 300;
const CHARTJS_VERSION: &str = "2.9.4";

/// Gauge image URL for a player's overall goal progress.
///
/// The needle is clamped to the gauge range while the label keeps the real
/// percentage. Returns `None` when there is no overall percentage to show.
pub fn gauge_chart_url(progress: &GoalProgress) -> Option<Url> {
    let label = progress.overall?;
    let needle = progress.gauge_value()?;
    let config = gauge_config(needle, label);
    Url::parse_with_params(
        QUICKCHART_BASE,
        &[
            ("c", config),
            ("w", CHART_WIDTH.to_string()),
            ("h", CHART_HEIGHT.to_string()),
            ("v", CHARTJS_VERSION.to_string()),
        ],
    )
    .map_err(|err| tracing::error!(error = %err, "failed to build chart url"))
    .ok()
}

fn gauge_config(needle: i64, label: i64) -> String {
    format!(
        "{{type:'gauge',data:{{datasets:[{{value:{needle},data:[50,100,150,200],\
backgroundColor:['#D64545','#4098D7','#3EBD93','black'],borderWidth:2}}]}},\
options:{{valueLabel:{{fontSize:24,backgroundColor:'transparent',color:'#000',\
formatter:function(value,context){{return '{label} %';}},bottomMarginPercentage:10}}}}}}"
    )
}

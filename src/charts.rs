use leptos::*;

use crate::format::{compact, thousands};

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: &'static str,
    pub color: &'static str,
    pub values: Vec<f64>,
}

fn max_of(series: &[Series]) -> f64 {
    series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max)
        .max(1.0)
}

/// Grouped vertical bars, one group per label.
#[component]
pub fn BarChart(
    labels: Vec<String>,
    series: Vec<Series>,
    #[prop(default = 220)] height: u32,
    #[prop(default = compact as fn(f64) -> String)] format: fn(f64) -> String,
) -> impl IntoView {
    let max = max_of(&series);
    let legend = series.clone();

    view! {
        <div class="chart">
            <div style="display: flex; justify-content: space-between; font-size: 0.65rem; color: var(--muted);">
                <span>{format(max)}</span>
                <span>"0"</span>
            </div>
            <div style=format!("display: flex; align-items: flex-end; gap: 8px; height: {}px; border-bottom: 1px solid var(--border); padding: 0 4px;", height)>
                {labels.iter().enumerate().map(|(i, label)| {
                    view! {
                        <div style="flex: 1; display: flex; flex-direction: column; align-items: center; height: 100%; justify-content: flex-end;">
                            <div style="display: flex; align-items: flex-end; gap: 2px; width: 100%; height: 100%;">
                                {series.iter().map(|s| {
                                    let v = s.values.get(i).copied().unwrap_or(0.0);
                                    let h = (v / max) * 100.0;
                                    view! {
                                        <div
                                            style=format!("flex: 1; height: {}%; background: {}; border-radius: 4px 4px 0 0;", h, s.color)
                                            title=format!("{} {}: {}", label, s.name, format(v))
                                        ></div>
                                    }
                                }).collect_view()}
                            </div>
                        </div>
                    }
                }).collect_view()}
            </div>
            <div style="display: flex; gap: 8px; padding: 4px 4px 0;">
                {labels.iter().map(|label| view! {
                    <span style="flex: 1; text-align: center; font-size: 0.6rem; color: var(--muted); overflow: hidden; white-space: nowrap; text-overflow: ellipsis;">{label.clone()}</span>
                }).collect_view()}
            </div>
            <div style="display: flex; gap: 12px; margin-top: 8px; font-size: 0.7rem;">
                {legend.into_iter().map(|s| view! {
                    <span style="display: inline-flex; align-items: center; gap: 4px;">
                        <span style=format!("width: 10px; height: 10px; border-radius: 2px; background: {};", s.color)></span>
                        {s.name}
                    </span>
                }).collect_view()}
            </div>
        </div>
    }
}

/// Horizontal bars with a marker at each item's minimum.
#[component]
pub fn StockChart(bars: Vec<crate::inventory::StockBar>) -> impl IntoView {
    let max = bars.iter().map(|b| b.stock.max(b.minimo)).fold(0.0_f64, f64::max).max(1.0);

    view! {
        <div style="display: flex; flex-direction: column; gap: 8px;">
            {bars.into_iter().map(|b| {
                let w = (b.stock / max) * 100.0;
                let m = (b.minimo / max) * 100.0;
                view! {
                    <div style="display: flex; align-items: center; gap: 8px; font-size: 0.75rem;">
                        <span style="width: 160px; white-space: nowrap; overflow: hidden; text-overflow: ellipsis;" title=b.label.clone()>{b.label.clone()}</span>
                        <div style="flex: 1; position: relative; height: 14px; background: var(--surface); border-radius: 7px;">
                            <div style=format!("width: {}%; height: 100%; background: var(--primary); border-radius: 7px;", w)></div>
                            <div style=format!("position: absolute; top: -2px; left: {}%; width: 2px; height: 18px; background: var(--danger);", m) title=format!("Mínimo: {}", b.minimo)></div>
                        </div>
                        <span style="width: 48px; text-align: right; font-weight: bold;">{thousands(b.stock)}</span>
                    </div>
                }
            }).collect_view()}
        </div>
    }
}

/// Running total as a filled area of columns, with the month's new
/// entries overlaid.
#[component]
pub fn GrowthChart(points: Vec<crate::analytics::MonthGrowth>, #[prop(default = 200)] height: u32) -> impl IntoView {
    let max = points.iter().map(|p| p.cumulative).max().unwrap_or(1).max(1) as f64;

    view! {
        <div class="chart">
            <div style=format!("display: flex; align-items: flex-end; gap: 4px; height: {}px; border-bottom: 1px solid var(--border);", height)>
                {points.iter().map(|p| {
                    let total_h = (p.cumulative as f64 / max) * 100.0;
                    let new_h = (p.new as f64 / max) * 100.0;
                    view! {
                        <div style="flex: 1; position: relative; height: 100%; display: flex; align-items: flex-end;"
                             title=format!("{}: {} nuevos, {} acumulado", p.label, p.new, p.cumulative)>
                            <div style=format!("width: 100%; height: {}%; background: var(--primary); opacity: 0.25; border-radius: 3px 3px 0 0;", total_h)></div>
                            <div style=format!("position: absolute; bottom: 0; left: 25%; width: 50%; height: {}%; background: var(--secondary); border-radius: 3px 3px 0 0;", new_h)></div>
                        </div>
                    }
                }).collect_view()}
            </div>
            <div style="display: flex; gap: 4px; margin-top: 4px;">
                {points.iter().map(|p| view! {
                    <span style="flex: 1; text-align: center; font-size: 0.6rem; color: var(--muted);">{p.label.clone()}</span>
                }).collect_view()}
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_never_divides_by_zero() {
        assert_eq!(max_of(&[]), 1.0);
        let s = vec![Series { name: "a", color: "red", values: vec![3.0, 12.0] }, Series { name: "b", color: "blue", values: vec![0.5] }];
        assert_eq!(max_of(&s), 12.0);
    }
}

use crate::physics;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Time step of the reference curve, in seconds.
const CURVE_STEP: f64 = 0.1;
/// Shortest time span the chart shows.
const MIN_SPAN_S: f64 = 5.0;

/// Time span to plot: at least `MIN_SPAN_S`, stretched to the last sample.
pub fn chart_span(run_points: &[(f64, f64)]) -> f64 {
    let last = run_points.last().map(|(x, _)| *x).unwrap_or(0.0);
    last.ceil().max(MIN_SPAN_S)
}

/// Depth-over-time chart: the reference curve plus the samples of the run.
pub fn render_depth_chart(f: &mut Frame, area: Rect, run_points: &[(f64, f64)]) {
    let span = chart_span(run_points);
    let curve = physics::curve(CURVE_STEP, span);
    let y_max = physics::depth(span) * 1.05;

    let mut datasets = vec![Dataset::default()
        .name("depth = g·t²/2")
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::DarkGray))
        .data(&curve)];
    if !run_points.is_empty() {
        datasets.push(
            Dataset::default()
                .name("this run")
                .graph_type(GraphType::Line)
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(Color::Green))
                .data(run_points),
        );
    }

    let x_axis = Axis::default()
        .title("Time (s)")
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, span])
        .labels(vec![
            "0".to_string(),
            format!("{:.1}", span / 2.0),
            format!("{:.0}", span),
        ]);
    let y_axis = Axis::default()
        .title("Depth (m)")
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, y_max])
        .labels(vec![
            "0".to_string(),
            format!("{:.0}", y_max / 2.0),
            format!("{:.0}", y_max),
        ]);

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from("Depth over time")),
        )
        .x_axis(x_axis)
        .y_axis(y_axis);
    f.render_widget(chart, area);
}

mod summary;

pub use summary::{load_and_prepare, read_samples, summarize, DurationParser, LoadedCsv, ParamSummary};

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::domain::Scenario;
use crate::error::{Error, Result};

const CHART_SIZE: (u32, u32) = (900, 600);
const Y_LABEL: &str = "Average time per request (ms)";

fn plot_err(e: impl std::fmt::Display) -> Error {
    Error::Plot(e.to_string())
}

/// Headroom above the tallest error bar so it isn't clipped.
fn y_upper_bound(summaries: &[ParamSummary]) -> f64 {
    let top = summaries
        .iter()
        .map(|s| s.mean + s.std)
        .fold(0.0_f64, f64::max);
    if top > 0.0 {
        top * 1.15
    } else {
        1.0
    }
}

/// Bar chart of mean time per PARAM with std-dev error bars.
pub fn render_chart(
    summaries: &[ParamSummary],
    title: &str,
    x_label: &str,
    out: &Path,
) -> Result<()> {
    if summaries.is_empty() {
        return Err(Error::NoData(out.display().to_string()));
    }

    let n = summaries.len() as u32;
    let root = BitMapBackend::new(out, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_upper_bound(summaries))
        .map_err(plot_err)?;

    let label_for = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => summaries
            .get(*i as usize)
            .map(|s| s.param.clone())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_label)
        .y_desc(Y_LABEL)
        .x_labels(summaries.len())
        .x_label_formatter(&label_for)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.6).filled())
                .margin(12)
                .data(summaries.iter().enumerate().map(|(i, s)| (i as u32, s.mean))),
        )
        .map_err(plot_err)?;

    chart
        .draw_series(summaries.iter().enumerate().map(|(i, s)| {
            ErrorBar::new_vertical(
                SegmentValue::CenterOf(i as u32),
                (s.mean - s.std).max(0.0),
                s.mean,
                s.mean + s.std,
                BLACK.filled(),
                10,
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Read `<out_dir>/<scenario>.csv` and write `<out_dir>/<scenario>.png`.
pub fn plot_scenario(out_dir: &Path, scenario: Scenario) -> Result<PathBuf> {
    let csv_path = out_dir.join(scenario.csv_file_name());
    let png_path = out_dir.join(scenario.png_file_name());

    let summaries = load_and_prepare(&csv_path)?;
    for s in &summaries {
        info!(
            "  PARAM={}: mean={:.2} ms, std={:.2} ms over {} runs",
            s.param, s.mean, s.std, s.runs
        );
    }

    render_chart(&summaries, scenario.chart_title(), scenario.x_label(), &png_path)?;
    info!("Saved plot: {}", png_path.display());
    Ok(png_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(param: &str, mean: f64, std: f64) -> ParamSummary {
        ParamSummary {
            param: param.to_string(),
            mean,
            std,
            runs: 3,
        }
    }

    #[test]
    fn test_y_upper_bound_includes_error_bar() {
        let summaries = vec![summary("1", 10.0, 2.0), summary("10", 20.0, 5.0)];
        assert!((y_upper_bound(&summaries) - 28.75).abs() < 1e-9);
    }

    #[test]
    fn test_y_upper_bound_degenerate() {
        assert_eq!(y_upper_bound(&[summary("1", 0.0, 0.0)]), 1.0);
        assert_eq!(y_upper_bound(&[]), 1.0);
    }

    #[test]
    fn test_render_chart_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_chart(&[], "t", "x", &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, Error::NoData(_)));
    }

    #[test]
    fn test_plot_scenario_missing_csv() {
        let dir = tempfile::tempdir().unwrap();
        let err = plot_scenario(dir.path(), Scenario::Fanout).unwrap_err();
        assert!(matches!(err, Error::MissingCsv(_)));
    }

    #[test]
    fn test_plot_scenario_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("conc.csv"),
            "PARAM,AVG_TIME,RUN,FAILED\n\
             1,12.00,1,0\n1,14.00,2,0\n1,13.00,3,0\n\
             10,40.00,1,0\n10,44.00,2,0\n10,NaN,3,1\n",
        )
        .unwrap();

        let png = plot_scenario(dir.path(), Scenario::Conc).unwrap();
        assert_eq!(png, dir.path().join("conc.png"));
        let bytes = std::fs::read(&png).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}

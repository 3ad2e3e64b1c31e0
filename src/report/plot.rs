//! Convergence plot rendered to SVG.

use std::path::Path;

use plotters::prelude::*;

use crate::schema::EvolutionHistory;

use super::ReportError;

const PLOT_SIZE: (u32, u32) = (800, 500);

/// Plot best fitness per generation over a fixed y range.
///
/// Values outside `y_range` are drawn at its edges.
pub fn plot_convergence<P: AsRef<Path>>(
    history: &EvolutionHistory,
    path: P,
    y_range: (f64, f64),
) -> Result<(), ReportError> {
    let (y_min, y_max) = y_range;
    if !(y_min.is_finite() && y_max.is_finite() && y_min < y_max) {
        return Err(ReportError::PlotRange(y_min, y_max));
    }

    let path = path.as_ref();

    let x_max = history
        .records()
        .iter()
        .map(|r| r.generation)
        .max()
        .unwrap_or(0)
        .max(1);

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Convergence", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..x_max, y_min..y_max)
        .map_err(|e| plot_error(path, e))?;

    chart
        .configure_mesh()
        .x_desc("Generation")
        .y_desc("Best fitness")
        .draw()
        .map_err(|e| plot_error(path, e))?;

    let points = history
        .records()
        .iter()
        .map(|r| (r.generation, r.best_fitness.clamp(y_min, y_max)));
    chart
        .draw_series(LineSeries::new(points, RED.mix(0.5).stroke_width(2)))
        .map_err(|e| plot_error(path, e))?;

    root.present().map_err(|e| plot_error(path, e))?;
    log::info!("Convergence plot saved to {}", path.display());
    Ok(())
}

fn plot_error(path: &Path, e: impl std::fmt::Display) -> ReportError {
    ReportError::Plot {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

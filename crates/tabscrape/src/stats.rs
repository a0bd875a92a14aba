use std::fmt::Display;

use serde::Serialize;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StatsError {
    #[error("Need at least 3 complete (x, y) pairs, found {0}")]
    InsufficientData(usize),
    #[error("All x values are identical; slope is undefined")]
    ZeroVariance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionSummary {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub slope_std_error: f64,
    pub t_statistic: f64,
}

impl Display for RegressionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "┌─ OLS regression ─ {} observation(s)", self.n)?;
        writeln!(f, "│  Intercept:     {:>14.4}", self.intercept)?;
        writeln!(f, "│  Slope:         {:>14.4}", self.slope)?;
        writeln!(f, "│  Std. error:    {:>14.4}", self.slope_std_error)?;
        writeln!(f, "│  t-statistic:   {:>14.4}", self.t_statistic)?;
        write!(f, "└─ R²:            {:>14.4}", self.r_squared)
    }
}

fn complete_pairs(xs: &[Option<f64>], ys: &[Option<f64>]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect()
}

pub fn regress(xs: &[Option<f64>], ys: &[Option<f64>]) -> Result<RegressionSummary, StatsError> {
    let pairs = complete_pairs(xs, ys);
    let n = pairs.len();
    if n < 3 {
        return Err(StatsError::InsufficientData(n));
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / nf;

    let (sxx, sxy, syy) = pairs.iter().fold((0.0, 0.0, 0.0), |(sxx, sxy, syy), (x, y)| {
        let (dx, dy) = (x - mean_x, y - mean_y);
        (sxx + dx * dx, sxy + dx * dy, syy + dy * dy)
    });

    if sxx == 0.0 {
        return Err(StatsError::ZeroVariance);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let ss_res: f64 = pairs
        .iter()
        .map(|(x, y)| {
            let residual = y - (intercept + slope * x);
            residual * residual
        })
        .sum();

    let r_squared = if syy > 0.0 { 1.0 - ss_res / syy } else { 1.0 };
    let slope_std_error = (ss_res / (nf - 2.0) / sxx).sqrt();
    let t_statistic = if slope_std_error > 0.0 {
        slope / slope_std_error
    } else {
        f64::INFINITY.copysign(slope)
    };

    Ok(RegressionSummary {
        n,
        slope,
        intercept,
        r_squared,
        slope_std_error,
        t_statistic,
    })
}

pub fn scatter_plot(xs: &[Option<f64>], ys: &[Option<f64>], width: usize, height: usize) -> String {
    let pairs = complete_pairs(xs, ys);
    if pairs.is_empty() || width < 2 || height < 2 {
        return "(no data to plot)".to_string();
    }

    let (min_x, max_x) = bounds(pairs.iter().map(|(x, _)| *x));
    let (min_y, max_y) = bounds(pairs.iter().map(|(_, y)| *y));

    let scale = |v: f64, min: f64, max: f64, cells: usize| -> usize {
        if max > min {
            (((v - min) / (max - min)) * (cells - 1) as f64).round() as usize
        } else {
            cells / 2
        }
    };

    let mut grid = vec![vec![' '; width]; height];
    for (x, y) in &pairs {
        let col = scale(*x, min_x, max_x, width);
        let row = height - 1 - scale(*y, min_y, max_y, height);
        grid[row][col] = match grid[row][col] {
            ' ' => '*',
            _ => '#',
        };
    }

    let mut out = String::new();
    for (i, row) in grid.iter().enumerate() {
        let label = match i {
            0 => format!("{:>12.2}", max_y),
            i if i == height - 1 => format!("{:>12.2}", min_y),
            _ => " ".repeat(12),
        };
        out.push_str(&label);
        out.push_str(" │");
        out.extend(row.iter());
        out.push('\n');
    }
    out.push_str(&" ".repeat(13));
    out.push('└');
    out.push_str(&"─".repeat(width));
    out.push('\n');

    let min_label = format!("{:.2}", min_x);
    let max_label = format!("{:.2}", max_x);
    let gap = (width + 1).saturating_sub(min_label.len() + max_label.len());
    out.push_str(&" ".repeat(14));
    out.push_str(&min_label);
    out.push_str(&" ".repeat(gap));
    out.push_str(&max_label);
    out
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_regress_exact_line() {
        let summary = regress(&some(&[1.0, 2.0, 3.0, 4.0]), &some(&[3.0, 5.0, 7.0, 9.0])).unwrap();

        assert_eq!(summary.n, 4);
        assert!((summary.slope - 2.0).abs() < 1e-9);
        assert!((summary.intercept - 1.0).abs() < 1e-9);
        assert!((summary.r_squared - 1.0).abs() < 1e-9);
        assert!(summary.slope_std_error.abs() < 1e-9);
        assert!(summary.t_statistic.is_infinite());
    }

    #[test]
    fn test_regress_noisy_line() {
        let xs = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let ys = some(&[2.0, 4.1, 5.9, 8.2, 9.8]);
        let summary = regress(&xs, &ys).unwrap();

        assert!((summary.slope - 1.97).abs() < 1e-9);
        assert!((summary.intercept - 0.09).abs() < 1e-9);
        assert!(summary.r_squared > 0.99 && summary.r_squared < 1.0);
        assert!(summary.t_statistic > 10.0);
    }

    #[test]
    fn test_regress_skips_incomplete_pairs() {
        let xs = vec![Some(1.0), None, Some(2.0), Some(3.0), Some(4.0)];
        let ys = vec![Some(2.0), Some(100.0), None, Some(6.0), Some(8.0)];
        let summary = regress(&xs, &ys).unwrap();

        assert_eq!(summary.n, 3);
        assert!((summary.slope - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_regress_errors() {
        assert_eq!(
            regress(&some(&[1.0, 2.0]), &some(&[1.0, 2.0])),
            Err(StatsError::InsufficientData(2))
        );
        assert_eq!(
            regress(&some(&[5.0, 5.0, 5.0]), &some(&[1.0, 2.0, 3.0])),
            Err(StatsError::ZeroVariance)
        );
    }

    #[test]
    fn test_scatter_plot_marks_points() {
        let plot = scatter_plot(&some(&[0.0, 5.0, 10.0]), &some(&[0.0, 5.0, 10.0]), 11, 5);
        let lines: Vec<&str> = plot.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(plot.matches('*').count(), 3);
        assert!(lines[0].trim_start().starts_with("10.00"));
        assert!(lines[0].ends_with('*'), "max point sits top right");
    }

    #[test]
    fn test_scatter_plot_overlap_and_empty() {
        let plot = scatter_plot(&some(&[1.0, 1.0, 2.0]), &some(&[1.0, 1.0, 2.0]), 10, 4);
        assert_eq!(plot.matches('#').count(), 1);
        assert_eq!(plot.matches('*').count(), 1);

        assert_eq!(scatter_plot(&[], &[], 10, 4), "(no data to plot)");
    }
}

use ndarray::{Array1, Array2};

use crate::{error::FrameErr, frame::Frame};

/// Extracts a design matrix and target vector from a joined frame.
///
/// Cells are numeric-coerced; rows where any selected column coerces to
/// missing are dropped (complete-case filtering). With `intercept`, a
/// leading column of ones is prepended to the covariates.
///
/// # Errors
/// `MissingColumn` when a declared column is absent from the joined table,
/// `NoCompleteRows` when nothing survives filtering.
pub fn design_matrix(
    frame: &Frame,
    covariates: &[String],
    dependent: &str,
    intercept: bool,
) -> Result<(Array2<f64>, Array1<f64>), FrameErr> {
    let mut selected: Vec<&[_]> = Vec::with_capacity(covariates.len() + 1);
    for name in covariates {
        selected.push(
            frame
                .column(name)
                .ok_or_else(|| FrameErr::MissingColumn(name.clone()))?,
        );
    }
    let target = frame
        .column(dependent)
        .ok_or_else(|| FrameErr::MissingColumn(dependent.to_owned()))?;

    let mut x_rows: Vec<f64> = Vec::new();
    let mut y = Vec::new();
    let offset = usize::from(intercept);
    let width = offset + covariates.len();

    'rows: for row in 0..frame.rows() {
        let mut values = Vec::with_capacity(width);
        if intercept {
            values.push(1.0);
        }
        for column in &selected {
            match column[row].as_numeric() {
                Some(v) => values.push(v),
                None => continue 'rows,
            }
        }
        let Some(t) = target[row].as_numeric() else {
            continue 'rows;
        };

        x_rows.extend_from_slice(&values);
        y.push(t);
    }

    if y.is_empty() {
        return Err(FrameErr::NoCompleteRows);
    }

    let design = Array2::from_shape_vec((y.len(), width), x_rows)
        .expect("row width is constant by construction");
    Ok((design, Array1::from_vec(y)))
}

#[cfg(test)]
mod tests {
    use crate::frame::Cell;

    use super::*;

    fn frame() -> Frame {
        Frame::new()
            .with_column(
                "x1",
                vec![1.0.into(), 2.0.into(), Cell::Missing, "4".into()],
            )
            .with_column(
                "flag",
                vec![true.into(), false.into(), true.into(), "True".into()],
            )
            .with_column(
                "y",
                vec![10.0.into(), 20.0.into(), 30.0.into(), 40.0.into()],
            )
    }

    #[test]
    fn builds_intercept_first_design() {
        let (design, target) = design_matrix(
            &frame(),
            &["x1".to_owned(), "flag".to_owned()],
            "y",
            true,
        )
        .unwrap();

        // Row 2 is dropped: x1 is missing there.
        assert_eq!(design.shape(), &[3, 3]);
        assert_eq!(design.row(0).to_vec(), vec![1.0, 1.0, 1.0]);
        assert_eq!(design.row(1).to_vec(), vec![1.0, 2.0, 0.0]);
        assert_eq!(design.row(2).to_vec(), vec![1.0, 4.0, 1.0]);
        assert_eq!(target.to_vec(), vec![10.0, 20.0, 40.0]);
    }

    #[test]
    fn missing_declared_column_is_reported() {
        let err = design_matrix(&frame(), &["x9".to_owned()], "y", true);
        assert!(matches!(err, Err(FrameErr::MissingColumn(name)) if name == "x9"));
    }

    #[test]
    fn all_incomplete_rows_is_an_error() {
        let all_missing = Frame::new()
            .with_column("x1", vec![Cell::Missing, Cell::Missing])
            .with_column("y", vec![1.0.into(), 2.0.into()]);
        assert!(matches!(
            design_matrix(&all_missing, &["x1".to_owned()], "y", false),
            Err(FrameErr::NoCompleteRows)
        ));
    }
}

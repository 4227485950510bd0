use super::*;

fn matrix(rows: &[&[f64]]) -> Matrix {
    Matrix::from_rows(rows.iter().map(|row| row.to_vec()).collect()).expect("matrix")
}

fn example_pair() -> (Matrix, Matrix) {
    (
        matrix(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]),
        matrix(&[&[7.0, 8.0], &[9.0, 10.0], &[11.0, 12.0]]),
    )
}

#[test]
fn create_matrix_fills_and_rejects_empty_shapes() {
    let filled = create_matrix(2, 3, 1.5).expect("2x3");
    assert_eq!(filled.shape(), (2, 3));
    assert!(filled.data().iter().flatten().all(|v| *v == 1.5));

    assert!(create_matrix(0, 3, 0.0).is_err());
}

#[test]
fn multiplies_the_worked_example() {
    let (a, b) = example_pair();
    let c = multiply_matrices(&a, &b).expect("product");
    assert_eq!(c, matrix(&[&[58.0, 64.0], &[139.0, 154.0]]));
}

#[test]
fn multiplying_by_identity_returns_the_left_operand() {
    let a = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
    let identity = matrix(&[&[1.0, 0.0], &[0.0, 1.0]]);
    assert_eq!(multiply_matrices(&a, &identity).expect("product"), a);
}

#[test]
fn multiplying_by_zero_matrix_yields_zero_matrix() {
    let (a, _) = example_pair();
    let zero = create_matrix(3, 4, 0.0).expect("zero");
    let c = multiply_matrices(&a, &zero).expect("product");
    assert_eq!(c, create_matrix(2, 4, 0.0).expect("expected"));
}

#[test]
fn mismatched_shapes_fail_validation_and_multiplication() {
    let a = create_matrix(2, 3, 1.0).expect("a");
    let b = create_matrix(2, 2, 1.0).expect("b");

    let validation = validate_multiplication(&a, &b);
    assert!(!validation.is_valid);
    let message = validation.error.expect("message");
    assert!(message.contains("2×3"), "{message}");
    assert!(message.contains("2×2"), "{message}");
    assert!(message.contains("(3)"), "{message}");
    assert!(message.contains("(2)"), "{message}");

    let err = multiply_matrices(&a, &b).expect_err("must fail");
    assert_eq!(err.message, message);
}

#[test]
fn validation_tracks_inner_dimension_only() {
    for (ar, ac, br, bc) in [(1, 1, 1, 1), (2, 3, 3, 5), (4, 2, 3, 2), (3, 3, 2, 3)] {
        let a = create_matrix(ar, ac, 0.0).expect("a");
        let b = create_matrix(br, bc, 0.0).expect("b");
        assert_eq!(validate_multiplication(&a, &b).is_valid, ac == br);
    }
}

#[test]
fn dot_product_steps_for_first_cell_match_worked_example() {
    let (a, b) = example_pair();
    let steps = generate_dot_product_steps(&a, &b, 0, 0).expect("steps");

    let summary: Vec<_> = steps
        .iter()
        .map(|s| (s.k, s.a_value, s.b_value, s.product, s.partial_sum, s.is_complete))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, 1.0, 7.0, 7.0, 7.0, false),
            (1, 2.0, 9.0, 18.0, 25.0, false),
            (2, 3.0, 11.0, 33.0, 58.0, true),
        ]
    );
}

#[test]
fn partial_sums_accumulate_and_only_last_step_completes() {
    let a = matrix(&[&[2.0, -1.0, 3.0, 0.0], &[1.0, 4.0, -2.0, 1.0]]);
    let b = matrix(&[&[1.0, 0.0], &[2.0, 3.0], &[-1.0, 2.0], &[0.0, -1.0]]);
    let c = multiply_matrices(&a, &b).expect("product");

    for i in 0..2 {
        for j in 0..2 {
            let steps = generate_dot_product_steps(&a, &b, i, j).expect("steps");
            assert_eq!(steps.len(), 4);
            let mut running = 0.0;
            for (k, step) in steps.iter().enumerate() {
                running += a.data()[i][k] * b.data()[k][j];
                assert_eq!(step.k, k);
                assert_eq!(step.partial_sum, running);
                assert_eq!(step.is_complete, k == 3);
            }
            assert_eq!(steps[3].partial_sum, c.data()[i][j]);
        }
    }
}

#[test]
fn dot_product_steps_reject_cells_outside_the_result() {
    let (a, b) = example_pair();
    assert!(matches!(
        generate_dot_product_steps(&a, &b, 2, 0),
        Err(MatrixError::CellOutOfBounds { .. })
    ));
}

#[test]
fn resize_keeps_overlap_and_zero_fills() {
    let (a, _) = example_pair();
    let grown = resize_matrix(&a, 3, 4).expect("grow");
    assert_eq!(
        grown,
        matrix(&[
            &[1.0, 2.0, 3.0, 0.0],
            &[4.0, 5.0, 6.0, 0.0],
            &[0.0, 0.0, 0.0, 0.0],
        ])
    );

    let shrunk = resize_matrix(&a, 1, 2).expect("shrink");
    assert_eq!(shrunk, matrix(&[&[1.0, 2.0]]));
}

#[test]
fn resize_round_trip_keeps_values_inside_the_smaller_bounds() {
    let (a, _) = example_pair();
    let round_trip = resize_matrix(&resize_matrix(&a, 1, 2).expect("shrink"), 2, 3).expect("grow");
    assert_eq!(
        round_trip,
        matrix(&[&[1.0, 2.0, 0.0], &[0.0, 0.0, 0.0]])
    );
}

#[test]
fn update_matrix_cell_leaves_the_input_untouched() {
    let (a, _) = example_pair();
    let updated = update_matrix_cell(&a, 1, 2, -6.0).expect("update");
    assert_eq!(updated.get(1, 2), Some(-6.0));
    assert_eq!(a.get(1, 2), Some(6.0));
    assert!(update_matrix_cell(&a, 5, 0, 1.0).is_err());
}

#[test]
fn parse_cell_value_drops_malformed_input() {
    assert_eq!(parse_cell_value(" 2.5 "), Some(2.5));
    assert_eq!(parse_cell_value("-3"), Some(-3.0));
    assert_eq!(parse_cell_value("abc"), None);
    assert_eq!(parse_cell_value(""), None);
    assert_eq!(parse_cell_value("NaN"), None);
    assert_eq!(parse_cell_value("inf"), None);
}

#[test]
fn format_number_prints_integers_bare() {
    assert_eq!(format_number(58.0, 2), "58");
    assert_eq!(format_number(-4.0, 3), "-4");
    assert_eq!(format_number(1.0 / 3.0, 2), "0.33");
}

#[test]
fn format_number_caps_oversized_precision() {
    let text = format_number(1.5, 70_000);
    assert_eq!(text, format!("{:.20}", 1.5));
    assert_eq!(format_number(12.0, usize::MAX), "12");
}

#[test]
fn presets_are_valid_multipliable_pairs() {
    let all = presets();
    assert_eq!(all.len(), 4);
    for preset in &all {
        let (a, b) = preset.matrices().expect("preset matrices");
        assert!(validate_multiplication(&a, &b).is_valid, "{}", preset.name);
    }
    assert_eq!(preset(1).expect("identity").name, "Identity Test");
    assert_eq!(
        preset(9).expect_err("missing"),
        MatrixError::UnknownPreset { index: 9 }
    );
}

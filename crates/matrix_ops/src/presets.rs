use shared::{domain::Preset, error::MatrixError};

fn build(name: &str, description: &str, a: &[&[f64]], b: &[&[f64]]) -> Preset {
    Preset {
        name: name.to_string(),
        description: description.to_string(),
        matrix_a: a.iter().map(|row| row.to_vec()).collect(),
        matrix_b: b.iter().map(|row| row.to_vec()).collect(),
    }
}

pub fn presets() -> Vec<Preset> {
    vec![
        build(
            "2×3 × 3×2 Example",
            "Simple example: A(2×3) × B(3×2) = C(2×2)",
            &[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]],
            &[&[7.0, 8.0], &[9.0, 10.0], &[11.0, 12.0]],
        ),
        build(
            "Identity Test",
            "A × I = A (where I is identity matrix)",
            &[&[1.0, 2.0], &[3.0, 4.0]],
            &[&[1.0, 0.0], &[0.0, 1.0]],
        ),
        build(
            "Zero Matrix",
            "A × 0 = 0",
            &[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]],
            &[&[0.0, 0.0], &[0.0, 0.0], &[0.0, 0.0]],
        ),
        build(
            "Large Example",
            "3×4 × 4×3 example with varied values",
            &[
                &[2.0, -1.0, 3.0, 0.0],
                &[1.0, 4.0, -2.0, 1.0],
                &[0.0, 2.0, 1.0, -3.0],
            ],
            &[
                &[1.0, 0.0, -1.0],
                &[2.0, 3.0, 0.0],
                &[-1.0, 2.0, 1.0],
                &[0.0, -1.0, 2.0],
            ],
        ),
    ]
}

pub fn preset(index: usize) -> Result<Preset, MatrixError> {
    presets()
        .into_iter()
        .nth(index)
        .ok_or(MatrixError::UnknownPreset { index })
}

mod config;
mod render;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use matrix_ops::{generate_all_steps, generate_dot_product_steps, multiply_matrices, presets};
use shared::{
    domain::{HighlightState, MatrixSlot, ScreenPoint, StepMode},
    protocol::{StoreEvent, UserIntent},
};
use storage::Storage;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use visualizer_core::{
    dispatch_intent, restore_store, Animator, GridLayout, MatrixPersistence, SharedStore,
};

use crate::{
    config::{load_settings, normalize_database_url, Settings},
    render::{describe_event, describe_step, render_matrix},
};

#[derive(Parser, Debug)]
#[command(name = "matrix-visualizer", about = "Step through matrix multiplication")]
struct Cli {
    /// Overrides DATABASE_URL and visualizer.toml.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in example pairs.
    Presets,
    /// Print the saved matrices and whether they can be multiplied.
    Show,
    LoadPreset {
        index: usize,
    },
    SetCell {
        slot: MatrixSlot,
        row: usize,
        col: usize,
        value: String,
    },
    Resize {
        slot: MatrixSlot,
        rows: usize,
        cols: usize,
    },
    /// Compute A × B in one go.
    Multiply,
    /// Print the dot-product steps for one result cell, or for all of them.
    Steps {
        #[arg(long, requires = "col")]
        row: Option<usize>,
        #[arg(long, requires = "row")]
        col: Option<usize>,
    },
    /// Animate A × B step by step until every result cell is filled.
    Play {
        #[arg(long)]
        speed: Option<f64>,
        #[arg(long)]
        mode: Option<StepMode>,
        #[arg(long)]
        preset: Option<usize>,
        /// Redraw A and B with highlights on every step.
        #[arg(long)]
        grid: bool,
    },
    /// Forget the saved matrices.
    Clear,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open {database_url}"))?;
    storage.health_check().await?;
    debug!(%database_url, "storage ready");

    let mut store = restore_store(&storage)
        .await?
        .with_max_dimension(settings.max_dimension);
    store.set_precision(settings.precision)?;
    let store = store.into_shared();
    let animator = Animator::new(store.clone(), settings.animator_config());

    match cli.command {
        Command::Presets => {
            for (index, preset) in presets().iter().enumerate() {
                let (a, b) = preset.matrices()?;
                println!(
                    "{index}: {} ({} × {}) - {}",
                    preset.name,
                    a.shape_label(),
                    b.shape_label(),
                    preset.description
                );
            }
        }
        Command::Show => print_state(&store).await,
        Command::LoadPreset { index } => {
            edit(&animator, &storage, UserIntent::LoadPreset { index }).await?;
        }
        Command::SetCell {
            slot,
            row,
            col,
            value,
        } => {
            if matrix_ops::parse_cell_value(&value).is_none() {
                bail!("'{value}' is not a finite number");
            }
            let intent = UserIntent::EditCell {
                slot,
                row,
                col,
                raw: value,
            };
            edit(&animator, &storage, intent).await?;
        }
        Command::Resize { slot, rows, cols } => {
            edit(&animator, &storage, UserIntent::Resize { slot, rows, cols }).await?;
        }
        Command::Multiply => {
            let store = store.lock().await;
            let product = multiply_matrices(store.matrix_a(), store.matrix_b())?;
            print!(
                "{}",
                render_matrix(
                    "A × B",
                    &product,
                    store.settings().precision,
                    &HighlightState::default(),
                    None
                )
            );
        }
        Command::Steps { row, col } => {
            let store = store.lock().await;
            let precision = store.settings().precision;
            let steps = match (row, col) {
                (Some(row), Some(col)) => {
                    generate_dot_product_steps(store.matrix_a(), store.matrix_b(), row, col)?
                }
                _ => generate_all_steps(store.matrix_a(), store.matrix_b(), |progress| {
                    debug!(
                        completed = progress.completed_cells,
                        total = progress.total_cells,
                        "expanded cell"
                    );
                })?,
            };
            for step in &steps {
                println!("{}", describe_step(step, precision));
            }
        }
        Command::Play {
            speed,
            mode,
            preset,
            grid,
        } => {
            if let Some(index) = preset {
                edit(&animator, &storage, UserIntent::LoadPreset { index }).await?;
            }
            play(&animator, &settings, speed, mode, grid).await?;
        }
        Command::Clear => {
            let removed = storage.clear_matrices().await?;
            info!(removed, "cleared saved matrices");
        }
    }

    animator.shutdown().await;
    Ok(())
}

/// Applies an editing intent, persists the inputs and shows the result.
async fn edit(animator: &Arc<Animator>, storage: &Storage, intent: UserIntent) -> Result<()> {
    dispatch_intent(animator, intent).await?;
    let persisted = animator.store().lock().await.persisted();
    storage.save_matrices(&persisted).await?;
    print_state(animator.store()).await;
    Ok(())
}

async fn print_state(store: &SharedStore) {
    let snapshot = store.lock().await.snapshot();
    let precision = snapshot.settings.precision;
    let none = HighlightState::default();

    print!("{}", render_matrix("A", &snapshot.matrix_a, precision, &none, None));
    print!("{}", render_matrix("B", &snapshot.matrix_b, precision, &none, None));
    match (&snapshot.matrix_c, &snapshot.validation.error) {
        (Some(c), _) => print!("{}", render_matrix("C", c, precision, &none, None)),
        (None, Some(message)) => println!("C: {message}"),
        (None, None) => println!("C: not computed"),
    }
}

/// Runs one full pass on a controller that knows where the result cells are
/// and prints every step and commit as it happens.
async fn play(
    base: &Animator,
    settings: &Settings,
    speed: Option<f64>,
    mode: Option<StepMode>,
    grid: bool,
) -> Result<()> {
    let (precision, result_shape, events) = {
        let store = base.store().lock().await;
        let Some(result) = store.matrix_c() else {
            let message = store.validation().error.clone().unwrap_or_default();
            bail!("nothing to animate: {message}");
        };
        (store.settings().precision, result.shape(), store.subscribe())
    };

    let layout = GridLayout {
        result_origin: ScreenPoint { x: 0.0, y: 0.0 },
        cell_size: 1.0,
        running_sum: ScreenPoint {
            x: result_shape.1 as f64 + 1.0,
            y: 0.0,
        },
        rows: result_shape.0,
        cols: result_shape.1,
    };
    let animator = Animator::new_with_layout(
        base.store().clone(),
        base.config().clone(),
        Arc::new(layout),
    );

    dispatch_intent(
        &animator,
        UserIntent::SetSpeed {
            speed: speed.unwrap_or(settings.speed),
        },
    )
    .await?;
    dispatch_intent(
        &animator,
        UserIntent::SetStepMode {
            mode: mode.unwrap_or(settings.step_mode),
        },
    )
    .await?;
    dispatch_intent(&animator, UserIntent::TogglePlay).await?;

    let idle = animator.config().flight_total();
    let mut stream = BroadcastStream::new(events);
    let mut last_step = None;
    let mut started = false;
    let mut finished = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            next = tokio::time::timeout(idle, stream.next()) => match next {
                Ok(Some(Ok(StoreEvent::AnimationChanged { state }))) => {
                    started |= state.is_playing;
                    let step = state.current_step.map(|s| (s.i, s.j, s.k));
                    if let Some(current) = state.current_step.filter(|_| step != last_step) {
                        println!("{}", describe_step(&current, precision));
                        if grid {
                            print_highlights(&animator).await;
                        }
                    }
                    last_step = step;
                    if started && !state.is_playing && state.current_step.is_none() {
                        finished = true;
                    }
                }
                Ok(Some(Ok(event))) => {
                    if let Some(line) = describe_event(&event, precision) {
                        println!("{line}");
                    }
                }
                Ok(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    warn!(skipped, "renderer fell behind the event stream");
                }
                Ok(None) => break,
                Err(_) => {
                    if finished && animator.pending_flights().await.is_empty() {
                        break;
                    }
                }
            }
        }
    }

    animator.shutdown().await;
    let snapshot = animator.store().lock().await.snapshot();
    if let Some(c) = &snapshot.matrix_c {
        print!(
            "{}",
            render_matrix("C", c, precision, &HighlightState::default(), None)
        );
    }
    info!(
        completed = snapshot.animation.progress.completed_cells,
        total = snapshot.animation.progress.total_cells,
        "playback finished"
    );
    Ok(())
}

async fn print_highlights(animator: &Animator) {
    let snapshot = animator.store().lock().await.snapshot();
    let precision = snapshot.settings.precision;
    let active = snapshot.highlight_a.active_pair;
    print!(
        "{}",
        render_matrix(
            "A",
            &snapshot.matrix_a,
            precision,
            &snapshot.highlight_a,
            active.map(|pair| (pair.a.row, pair.a.col))
        )
    );
    print!(
        "{}",
        render_matrix(
            "B",
            &snapshot.matrix_b,
            precision,
            &snapshot.highlight_b,
            active.map(|pair| (pair.b.row, pair.b.col))
        )
    );
}

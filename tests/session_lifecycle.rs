//! Session lifecycle integration: the engine facade end to end.

use futures::StreamExt;

use qmethod_engine::application::{
    ApplyRotationCommand, CloseSessionCommand, OpenSessionCommand, PreviewRotationCommand,
    QMethodEngine, RunBootstrapCommand,
};
use qmethod_engine::config::AppConfig;
use qmethod_engine::domain::bootstrap::BootstrapOptions;
use qmethod_engine::domain::extraction::ExtractionMethod;
use qmethod_engine::domain::foundation::{ErrorCode, SessionId};
use qmethod_engine::domain::qsort::{DistributionGrid, GridColumn, QSortMatrix};
use qmethod_engine::domain::rotation::{RotationDelta, RotationMethod, RotationMode};
use qmethod_engine::domain::session::{CloseReason, RotationParams};

fn matrix() -> QSortMatrix {
    let grid = DistributionGrid::new(vec![
        GridColumn::new(-2, 1),
        GridColumn::new(-1, 2),
        GridColumn::new(0, 3),
        GridColumn::new(1, 2),
        GridColumn::new(2, 1),
    ])
    .unwrap();
    QSortMatrix::new(
        grid,
        vec![
            vec![-2, -1, -1, 0, 0, 0, 1, 1, 2],
            vec![-2, -1, -1, 0, 0, 1, 0, 1, 2],
            vec![-1, -2, -1, 0, 0, 0, 1, 2, 1],
            vec![2, 1, 1, 0, 0, 0, -1, -1, -2],
            vec![1, 2, 1, 0, 0, -1, 0, -2, -1],
            vec![2, 1, 0, 1, 0, -1, 0, -1, -2],
        ],
    )
    .unwrap()
}

fn engine() -> QMethodEngine {
    QMethodEngine::new(AppConfig::default())
}

async fn open(engine: &QMethodEngine) -> SessionId {
    let settings =
        engine.default_settings(ExtractionMethod::PrincipalComponents, 2, RotationMode::Orthogonal);
    engine
        .open_session(OpenSessionCommand {
            matrix: matrix(),
            settings,
        })
        .await
        .unwrap()
        .session_id
}

#[tokio::test]
async fn full_lifecycle_preview_confirm_close() {
    let engine = engine();
    let session_id = open(&engine).await;

    // Preview is free of side effects on the confirmation counter.
    let preview = engine
        .preview_rotation(PreviewRotationCommand {
            session_id,
            delta: RotationDelta {
                factor_a: 0,
                factor_b: 1,
                angle_degrees: 20.0,
            },
        })
        .await
        .unwrap();
    assert_eq!(preview.base_version, 0);

    let first = engine
        .apply_rotation(ApplyRotationCommand {
            session_id,
            params: RotationParams::Method {
                method: RotationMethod::Varimax,
            },
            expected_version: 0,
        })
        .await
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.outputs.factor_arrays().len(), 2);

    let second = engine
        .apply_rotation(ApplyRotationCommand {
            session_id,
            params: RotationParams::Delta {
                delta: RotationDelta {
                    factor_a: 0,
                    factor_b: 1,
                    angle_degrees: 10.0,
                },
            },
            expected_version: 1,
        })
        .await
        .unwrap();
    assert_eq!(second.version, 2);

    let closed = engine
        .close_session(CloseSessionCommand {
            session_id,
            reason: CloseReason::Requested,
        })
        .await
        .unwrap();
    let snapshot = closed.snapshot.unwrap();
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.session_id, session_id);
    assert!(engine.registry().get(session_id).is_err());
}

#[tokio::test]
async fn stale_confirmation_leaves_the_session_as_it_was() {
    let engine = engine();
    let session_id = open(&engine).await;

    engine
        .apply_rotation(ApplyRotationCommand {
            session_id,
            params: RotationParams::Method {
                method: RotationMethod::Varimax,
            },
            expected_version: 0,
        })
        .await
        .unwrap();

    let err = engine
        .apply_rotation(ApplyRotationCommand {
            session_id,
            params: RotationParams::Method {
                method: RotationMethod::Quartimax,
            },
            expected_version: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::StaleSessionVersion);

    // The surviving state is still the varimax confirmation.
    let handle = engine.registry().get(session_id).unwrap();
    let session = handle.lock().await;
    assert_eq!(session.version(), 1);
    assert_eq!(session.confirmed().method(), Some(RotationMethod::Varimax));
}

#[tokio::test]
async fn subscribers_see_a_session_history_in_version_order() {
    let engine = engine();
    let session_id = open(&engine).await;
    let stream = engine.subscribe(session_id);

    for expected in 0..3u64 {
        engine
            .apply_rotation(ApplyRotationCommand {
                session_id,
                params: RotationParams::Delta {
                    delta: RotationDelta {
                        factor_a: 0,
                        factor_b: 1,
                        angle_degrees: 5.0,
                    },
                },
                expected_version: expected,
            })
            .await
            .unwrap();
    }
    engine
        .close_session(CloseSessionCommand {
            session_id,
            reason: CloseReason::Requested,
        })
        .await
        .unwrap();

    let types: Vec<String> = stream.map(|e| e.event_type).collect().await;
    assert_eq!(
        types,
        vec![
            "rotation.confirmed.v1",
            "rotation.confirmed.v1",
            "rotation.confirmed.v1",
            "session.closed.v1",
        ]
    );
}

#[tokio::test]
async fn bootstrap_runs_against_the_confirmed_rotation() {
    let engine = engine();
    let session_id = open(&engine).await;
    engine
        .apply_rotation(ApplyRotationCommand {
            session_id,
            params: RotationParams::Method {
                method: RotationMethod::Varimax,
            },
            expected_version: 0,
        })
        .await
        .unwrap();

    let handle = engine
        .run_bootstrap(RunBootstrapCommand {
            session_id,
            options: BootstrapOptions {
                resamples: 150,
                seed: Some(99),
                confidence: 0.95,
            },
        })
        .await
        .unwrap();
    let result = handle.wait().await.unwrap();

    assert_eq!(result.seed(), 99);
    assert!(result.resamples_completed() > 0);
    // Every interval that exists must bracket its own mean.
    for p in 0..6 {
        for f in 0..2 {
            if let Some(estimate) = result.estimate(p, f) {
                assert!(estimate.lower <= estimate.mean + 1e-12);
                assert!(estimate.mean <= estimate.upper + 1e-12);
                assert!(estimate.std_error >= 0.0);
            }
        }
    }
    // Two clean opposing viewpoints resample stably.
    for stability in result.factor_stability() {
        assert!((0.0..=1.0).contains(stability));
    }

    // Same seed, same run.
    let again = engine
        .run_bootstrap(RunBootstrapCommand {
            session_id,
            options: BootstrapOptions {
                resamples: 150,
                seed: Some(99),
                confidence: 0.95,
            },
        })
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(again, result);
}

#[tokio::test]
async fn oblique_session_supports_promax_confirmations() {
    let engine = engine();
    let settings =
        engine.default_settings(ExtractionMethod::PrincipalComponents, 2, RotationMode::Oblique);
    let session_id = engine
        .open_session(OpenSessionCommand {
            matrix: matrix(),
            settings,
        })
        .await
        .unwrap()
        .session_id;

    let confirmed = engine
        .apply_rotation(ApplyRotationCommand {
            session_id,
            params: RotationParams::Method {
                method: RotationMethod::Promax,
            },
            expected_version: 0,
        })
        .await
        .unwrap();
    assert_eq!(confirmed.version, 1);
    // Oblique solutions carry factor correlations into the outputs.
    assert!(confirmed.rotated.factor_correlations().is_some());
    assert!(confirmed.outputs.factor_correlations().is_some());
}

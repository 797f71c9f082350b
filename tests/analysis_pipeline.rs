use std::fs;
use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};
use product_vision::pipeline::services::image::analysis::{AnalysisConfig, AnalysisOrchestrator};
use product_vision::pipeline::services::learning::{
    ImageClassifier, KnnTrainer, ModelRepository, Prediction, TrainingLayout, TrainingOptions,
};
use product_vision::pipeline::types::{AnalysisResult, ClassifierKind, FeatureVector, Position};

fn save(rgb: &RgbImage, path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    rgb.save(path).unwrap();
}

/// Solid subject on white, the subject's band moving with `shade`.
fn shot(subject: [u8; 3], shade: u8) -> RgbImage {
    ImageBuffer::from_fn(240, 240, |x, y| {
        if (60..180).contains(&x) && (60..180).contains(&y) {
            Rgb([subject[0], subject[1].saturating_add(shade), subject[2]])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

fn seed_position_images(root: &Path) {
    for i in 0..6u8 {
        save(&shot([200, 10, 10], i), &root.join(format!("position/Front/front-{i}.png")));
        save(&shot([10, 10, 200], i), &root.join(format!("position/Back/back-{i}.png")));
        // lateral shots still sitting in a pre-merge folder
        save(&shot([10, 160, 10], i), &root.join(format!("position/LateralLeft/side-{i}.png")));
    }
}

#[tokio::test]
async fn trains_persists_and_analyzes() {
    let dir = tempfile::tempdir().unwrap();
    let training = dir.path().join("training");
    let repository = ModelRepository::new(dir.path().join("models"));
    seed_position_images(&training);

    let outcome = KnnTrainer::new(ClassifierKind::Position, repository.clone())
        .train_from_layout(
            &TrainingLayout::new(&training),
            &TrainingOptions {
                test_ratio: 0.34,
                seed: Some(3),
                ..TrainingOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.model.classes, vec!["Front", "Back", "Side"]);
    assert_eq!(outcome.train_count + outcome.test_count, 18);
    assert_eq!(outcome.accuracy, 1.0);
    assert!(outcome.model_path.exists());

    let orchestrator = AnalysisOrchestrator::new(AnalysisConfig::default(), &repository).unwrap();
    let bytes = fs::read(training.join("position/LateralLeft/side-2.png")).unwrap();
    let result = orchestrator.analyze(&bytes);

    assert_eq!(result.position, Some(Position::Side));
    assert!(result.neutral_background);
    assert_eq!(result.dominant_color.as_deref(), Some("#0aa20a"));
}

#[test]
fn garbage_bytes_yield_default_result() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator =
        AnalysisOrchestrator::new(AnalysisConfig::default(), &ModelRepository::new(dir.path())).unwrap();

    assert_eq!(
        orchestrator.analyze(&[0xde, 0xad, 0xbe, 0xef]),
        AnalysisResult {
            position: None,
            neutral_background: false,
            product_only: false,
            dominant_color: None,
        }
    );
}

#[test]
fn classifier_without_artifact_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = ImageClassifier::new(ClassifierKind::Background, ModelRepository::new(dir.path()));
    let features = FeatureVector::zeros(9);
    assert_eq!(classifier.predict(&features).unwrap(), Prediction::ModelAbsent);
}

#[test]
fn reorganized_layout_trains_the_same_classes() {
    let dir = tempfile::tempdir().unwrap();
    let training = dir.path().join("training");
    seed_position_images(&training);
    let layout = TrainingLayout::new(&training);

    let before = layout.collect_images(ClassifierKind::Position).unwrap();
    let report = layout.reorganize_position_folders(false).unwrap();
    let after = layout.collect_images(ClassifierKind::Position).unwrap();

    assert_eq!(report.moved.len(), 6);
    assert!(!training.join("position/LateralLeft").exists());
    assert_eq!(before.keys().collect::<Vec<_>>(), after.keys().collect::<Vec<_>>());
    assert_eq!(after["Side"].len(), 6);
}

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use watermark_engine::*;

struct Fixture {
    dir: tempfile::TempDir,
    logo: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        RgbaImage::from_pixel(8, 4, Rgba([255, 0, 0, 255]))
            .save(&logo)
            .unwrap();
        Self { dir, logo }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn good_image(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        RgbaImage::from_pixel(40, 30, Rgba([0, 0, 200, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn corrupt_image(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, b"definitely not an image").unwrap();
        path
    }

    fn profile(&self) -> Profile {
        let mut logo = ImageSpec::new(&self.logo);
        logo.scale_percent = 50.0;
        logo.placement.anchor = Anchor::Center;
        logo.placement.opacity_percent = 100.0;
        Profile {
            name: "batch-test".to_string(),
            watermarks: vec![WatermarkSpec::Image(logo)],
            output: OutputSpec {
                format: OutputFormat::Png,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn no_partial_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .all(|e| !e.file_name().to_string_lossy().ends_with(".part"))
}

#[tokio::test]
async fn test_batch_with_failures() {
    let fx = Fixture::new();
    let mut sources = Vec::new();
    for i in 0..6 {
        sources.push(fx.good_image(&format!("good_{i}.png")));
    }
    sources.insert(2, fx.corrupt_image("bad_a.jpg"));
    sources.push(fx.corrupt_image("bad_b.jpg"));
    sources.push(fx.path("missing.png"));

    let dest = fx.path("out");
    let handle = run_batch(
        BatchJob::new(sources.clone(), fx.profile(), &dest),
        BatchOptions::default().with_workers(3),
    )
    .await
    .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.total, 9);
    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.aborted, 0);

    for (i, result) in summary.results.iter().enumerate() {
        assert_eq!(result.index, i);
        assert_eq!(result.source, sources[i]);
    }

    let bad = &summary.results[2];
    assert_eq!(bad.status, ItemStatus::Failed);
    assert!(bad.output.is_none());
    assert!(bad.planned_output.is_some());
    assert_eq!(bad.error.as_ref().unwrap().kind, FailureKind::Decode);
    assert_eq!(
        summary.results[8].error.as_ref().unwrap().kind,
        FailureKind::Filesystem
    );

    let first = summary.results[0].output.as_ref().unwrap();
    assert_eq!(first, &dest.join("good_0_watermarked.png"));
    let out = image::open(first).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (40, 30));
    assert_eq!(*out.get_pixel(20, 15), Rgba([255, 0, 0, 255]));
    assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 200, 255]));

    assert!(no_partial_files(&dest));
    assert!((summary.success_rate() - 6.0 / 9.0).abs() < 1e-6);
    assert_eq!(summary.failures_by_kind().get("decode"), Some(&2));
}

#[tokio::test]
async fn test_all_failures_still_complete() {
    let fx = Fixture::new();
    let sources = vec![fx.corrupt_image("a.jpg"), fx.corrupt_image("b.jpg")];
    let handle = run_batch(
        BatchJob::new(sources, fx.profile(), fx.path("out")),
        BatchOptions::default(),
    )
    .await
    .unwrap();
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn test_empty_batch() {
    let fx = Fixture::new();
    let handle = run_batch(
        BatchJob::new(Vec::new(), fx.profile(), fx.path("out")),
        BatchOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(handle.total(), 0);
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.state, JobState::Completed);
    assert!(summary.results.is_empty());
    assert_eq!(summary.success_rate(), 1.0);
}

#[tokio::test]
async fn test_cancel_after_m_items() {
    let fx = Fixture::new();
    let sources: Vec<PathBuf> = (0..8)
        .map(|i| fx.good_image(&format!("img_{i}.png")))
        .collect();

    const STOP_AFTER: usize = 3;
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let options = BatchOptions::default()
        .with_workers(1)
        .with_cancel_token(cancel)
        .on_item(move |_, progress| {
            if progress.completed == STOP_AFTER {
                trigger.cancel();
            }
        });

    let dest = fx.path("out");
    let handle = run_batch(BatchJob::new(sources, fx.profile(), &dest), options)
        .await
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.state, JobState::Aborted);
    assert_eq!(summary.succeeded, STOP_AFTER);
    assert_eq!(summary.aborted, 8 - STOP_AFTER);
    assert_eq!(summary.failed, 0);

    for result in &summary.results[STOP_AFTER..] {
        assert_eq!(result.status, ItemStatus::Aborted);
        assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::Cancelled);
        assert!(result.output.is_none());
        assert!(!result.planned_output.as_ref().unwrap().exists());
    }
    assert!(no_partial_files(&dest));
}

#[tokio::test]
async fn test_name_collision_keeps_first_output() {
    let fx = Fixture::new();
    let first = fx.good_image("a/photo.png");
    let second = fx.path("b/photo.png");
    std::fs::create_dir_all(second.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(10, 10, Rgba([0, 255, 0, 255]))
        .save(&second)
        .unwrap();

    let dest = fx.path("out");
    let handle = run_batch(
        BatchJob::new(vec![first, second], fx.profile(), &dest),
        BatchOptions::default().with_workers(2),
    )
    .await
    .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let collision = &summary.results[1];
    assert_eq!(
        collision.error.as_ref().unwrap().kind,
        FailureKind::NameCollision
    );
    assert!(collision.output.is_none());
    assert_eq!(collision.planned_output, summary.results[0].output);

    // The first source's output survives intact
    let out = image::open(dest.join("photo_watermarked.png")).unwrap();
    assert_eq!((out.width(), out.height()), (40, 30));
}

#[tokio::test]
async fn test_progress_and_streamed_results() {
    let fx = Fixture::new();
    let sources: Vec<PathBuf> = (0..5)
        .map(|i| fx.good_image(&format!("p_{i}.png")))
        .collect();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let options = BatchOptions::default()
        .with_workers(2)
        .on_item(move |_, progress| {
            assert_eq!(progress.total, 5);
            assert!(progress.completed >= 1 && progress.completed <= 5);
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let mut handle = run_batch(BatchJob::new(sources, fx.profile(), fx.path("out")), options)
        .await
        .unwrap();
    assert!(matches!(
        handle.state(),
        JobState::Pending | JobState::Running
    ));
    assert!(!handle.state().is_finished());

    let mut streamed = Vec::new();
    while let Some(result) = handle.next_result().await {
        streamed.push(result.index);
    }
    streamed.sort_unstable();
    assert_eq!(streamed, vec![0, 1, 2, 3, 4]);
    assert_eq!(handle.state(), JobState::Completed);
    assert!(handle.state().is_finished());

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.succeeded, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_missing_logo_fails_before_batch() {
    let fx = Fixture::new();
    let source = fx.good_image("x.png");
    let mut profile = fx.profile();
    profile.watermarks = vec![WatermarkSpec::Image(ImageSpec::new(fx.path("nope.png")))];

    let dest = fx.path("out");
    let err = run_batch(
        BatchJob::new(vec![source], profile, &dest),
        BatchOptions::default(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, WatermarkError::LogoLoad { .. }));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_undecodable_logo_fails_before_batch() {
    let fx = Fixture::new();
    std::fs::write(&fx.logo, b"broken").unwrap();
    let err = run_batch(
        BatchJob::new(vec![fx.good_image("x.png")], fx.profile(), fx.path("out")),
        BatchOptions::default(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, WatermarkError::LogoLoad { .. }));
}

#[tokio::test]
async fn test_resize_output() {
    let fx = Fixture::new();
    let source = fx.good_image("big.png");
    let mut profile = fx.profile();
    profile.output.resize = Some(OutputResize {
        max_width: Some(20),
        max_height: None,
    });

    let handle = run_batch(
        BatchJob::new(vec![source], profile, fx.path("out")),
        BatchOptions::default(),
    )
    .await
    .unwrap();
    let summary = handle.wait().await.unwrap();
    let out = image::open(summary.results[0].output.as_ref().unwrap()).unwrap();
    assert_eq!((out.width(), out.height()), (20, 15));
}

#[tokio::test]
async fn test_preview_does_not_write() {
    let fx = Fixture::new();
    let source = fx.good_image("preview.png");
    let prepared = PreparedProfile::prepare_async(fx.profile()).await.unwrap();

    let preview = render_preview(&source, prepared, 20).await.unwrap();
    assert_eq!(preview.dimensions(), (20, 15));
    assert!(!fx.path("out").exists());
}

#[tokio::test]
async fn test_panicking_callback_does_not_lose_results() {
    let fx = Fixture::new();
    let sources: Vec<PathBuf> = (0..3)
        .map(|i| fx.good_image(&format!("cb_{i}.png")))
        .collect();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let options = BatchOptions::default()
        .with_workers(1)
        .on_item(move |result, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            if result.index == 1 {
                panic!("callback failure on item 1");
            }
        });

    let handle = run_batch(BatchJob::new(sources, fx.profile(), fx.path("out")), options)
        .await
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    for result in &summary.results {
        assert_eq!(result.status, ItemStatus::Success);
        assert!(result.output.as_ref().unwrap().exists());
    }
}

#[tokio::test]
async fn test_results_carry_sizes_and_timing() {
    let fx = Fixture::new();
    let sources = vec![fx.good_image("m.png"), fx.corrupt_image("broken.png")];
    let mut profile = fx.profile();
    profile.output.resize = Some(OutputResize {
        max_width: Some(20),
        max_height: None,
    });

    let handle = run_batch(
        BatchJob::new(sources, profile, fx.path("out")),
        BatchOptions::default().with_workers(1),
    )
    .await
    .unwrap();
    let summary = handle.wait().await.unwrap();

    let ok = &summary.results[0];
    assert_eq!(ok.original_size, Some((40, 30)));
    assert_eq!(ok.output_size, Some((20, 15)));
    assert!(ok.processing_time > std::time::Duration::ZERO);

    let failed = &summary.results[1];
    assert_eq!(failed.status, ItemStatus::Failed);
    assert_eq!(failed.original_size, None);
    assert_eq!(failed.output_size, None);
}

//! End-to-end pipeline tests.
//!
//! Device-dependent tests return early when the machine has no usable GPU.

use imgturn::prelude::*;
use std::sync::{Arc, Mutex};

fn open_session(options: &PipelineOptions) -> Option<ComputeSession> {
    match ComputeSession::open(options) {
        Ok(session) => Some(session),
        Err(e @ PipelineError::DeviceUnavailable { .. })
        | Err(e @ PipelineError::ContextCreationFailed { .. }) => {
            println!("skipping: {}", e);
            None
        }
        Err(e) => panic!("session failed to open: {}", e),
    }
}

fn has_gpu() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let infos: Vec<_> = instance
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .map(|a| a.get_info())
        .collect();
    imgturn::gpu::device::select_gpu(&infos).is_some()
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn rgba_image(width: u32, height: u32, pixels: &[[u8; 4]]) -> HostImage {
    let samples: Vec<u8> = pixels.iter().flatten().copied().collect();
    HostImage::from_interleaved(width, height, 4, &samples).unwrap()
}

fn patterned(width: u32, height: u32, channels: u8) -> HostImage {
    let mut image = HostImage::new(width, height, channels).unwrap();
    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let value = (x * 7 + y * 13 + c as u32 * 31) % 256;
                image.set_sample(x, y, c, value as u8);
            }
        }
    }
    image
}

#[test]
fn test_two_by_two_rows_swap() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let pipeline = TransformPipeline::new(&session);

    let mut image = rgba_image(2, 2, &[RED, GREEN, BLUE, WHITE]);
    let report = pipeline.transform(&mut image).unwrap();

    assert_eq!(image, rgba_image(2, 2, &[BLUE, WHITE, RED, GREEN]));
    assert_eq!(report.width, 2);
    assert_eq!(report.height, 2);
    assert_eq!(report.work_groups, [1, 1]);
}

#[test]
fn test_flip_twice_is_identity() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let pipeline = TransformPipeline::new(&session).with_verify(true);

    let original = patterned(37, 19, 4);
    let mut image = original.clone();
    pipeline.transform(&mut image).unwrap();
    assert_ne!(image, original);
    pipeline.transform(&mut image).unwrap();
    assert_eq!(image, original);
}

#[test]
fn test_degenerate_sizes() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let pipeline = TransformPipeline::new(&session).with_verify(true);

    let row = patterned(9, 1, 3);
    let mut image = row.clone();
    pipeline.transform(&mut image).unwrap();
    assert_eq!(image, row);

    let mut column = HostImage::from_planar(1, 3, 1, vec![1, 2, 3]).unwrap();
    pipeline.transform(&mut column).unwrap();
    assert_eq!(column.as_planar(), &[3, 2, 1]);
}

#[test]
fn test_channel_counts_preserved() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let pipeline = TransformPipeline::new(&session).with_verify(true);

    for channels in 1..=4u8 {
        let mut image = patterned(20, 12, channels);
        let report = pipeline.transform(&mut image).unwrap();
        assert_eq!(image.channels(), channels);
        assert_eq!(report.channels, channels);
        assert!(report.verified);
        for c in 0..channels {
            assert_eq!(image.sample(3, 0, c), patterned(20, 12, channels).sample(3, 11, c));
        }
    }
}

#[test]
fn test_invalid_wgsl_is_compile_error() {
    if !has_gpu() {
        return;
    }
    let options = PipelineOptions::new().with_kernel(KernelSource::wgsl(
        "@compute @workgroup_size(8, 8) fn img_turn( { }",
        "img_turn",
        [8, 8],
    ));
    match ComputeSession::open(&options) {
        Err(PipelineError::CompileError { log }) => assert!(!log.is_empty()),
        Err(PipelineError::ContextCreationFailed { .. }) => {}
        other => panic!("expected CompileError, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_entry_point() {
    if !has_gpu() {
        return;
    }
    let source = imgturn::gpu::shaders::FLIP_VERTICAL;
    let options = PipelineOptions::new().with_kernel(KernelSource::wgsl(source, "img_flip", [8, 8]));
    match ComputeSession::open(&options) {
        Err(e @ PipelineError::KernelResolutionError { .. }) => {
            assert_eq!(e.stage(), Stage::Init);
        }
        Err(PipelineError::ContextCreationFailed { .. }) => {}
        other => panic!("expected KernelResolutionError, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_oversized_image_rejected() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let limit = session.context().max_image_dimension();
    let staging = PackedBuffer::new(1, 1);
    let err = DeviceImage::create(
        session.context(),
        limit + 1,
        1,
        HostRegion::ReadOnly(&staging),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ImageCreationFailed {
            access: AccessMode::ReadOnly,
            ..
        }
    ));
}

#[test]
fn test_swapped_arguments_rejected() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let ctx = session.context();
    let input_staging = PackedBuffer::new(4, 4);
    let mut output_staging = PackedBuffer::new(4, 4);
    let input = DeviceImage::create(ctx, 4, 4, HostRegion::ReadOnly(&input_staging)).unwrap();
    let output =
        DeviceImage::create(ctx, 4, 4, HostRegion::WriteOnly(&mut output_staging)).unwrap();

    let err = session.kernel().bind(ctx, &output, &input).unwrap_err();
    assert!(matches!(err, PipelineError::ArgumentBindingError { .. }));
    assert_eq!(err.stage(), Stage::Bind);
}

#[test]
fn test_transfer_direction_enforced() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let ctx = session.context();
    let input_staging = PackedBuffer::new(3, 2);
    let mut output_staging = PackedBuffer::new(3, 2);
    let mut input = DeviceImage::create(ctx, 3, 2, HostRegion::ReadOnly(&input_staging)).unwrap();
    let output =
        DeviceImage::create(ctx, 3, 2, HostRegion::WriteOnly(&mut output_staging)).unwrap();

    match output.write(ctx).unwrap_err() {
        PipelineError::TransferError { access, .. } => assert_eq!(access, AccessMode::WriteOnly),
        other => panic!("expected TransferError, got {:?}", other),
    }
    match input.read(ctx).unwrap_err() {
        PipelineError::TransferError { access, .. } => assert_eq!(access, AccessMode::ReadOnly),
        other => panic!("expected TransferError, got {:?}", other),
    }
}

#[test]
fn test_padded_dispatch_matches_reference() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let ctx = session.context();
    let kernel = session.kernel();
    let (width, height) = (5, 3);

    let input_staging = PixelBufferAdapter::to_packed(&patterned(width, height, 4));
    let mut output_staging = PackedBuffer::new(width, height);
    {
        let input =
            DeviceImage::create(ctx, width, height, HostRegion::ReadOnly(&input_staging)).unwrap();
        let mut output =
            DeviceImage::create(ctx, width, height, HostRegion::WriteOnly(&mut output_staging))
                .unwrap();
        let args = kernel.bind(ctx, &input, &output).unwrap();
        input.write(ctx).unwrap();

        let padded = WorkSize::for_image(width + 35, height + 37, kernel.workgroup_size());
        assert_eq!(padded.groups(), [5, 5]);
        kernel.dispatch(ctx, &args, padded).unwrap();
        output.read(ctx).unwrap();
    }

    assert_eq!(output_staging, HostReference::FlipVertical.apply(&input_staging));
}

#[test]
fn test_reused_pipeline_reports_each_call() {
    let Some(session) = open_session(&PipelineOptions::default()) else {
        return;
    };
    let pipeline = TransformPipeline::new(&session);

    let mut first = patterned(8, 8, 4);
    let mut second = patterned(8, 8, 4);
    let first_report = pipeline.transform(&mut first).unwrap();
    let second_report = pipeline.transform(&mut second).unwrap();

    let stages = |report: &TransformReport| -> Vec<Stage> {
        report.timings.iter().map(|t| t.stage).collect()
    };
    assert_eq!(first_report.timings.len(), second_report.timings.len());
    assert_eq!(stages(&first_report), stages(&second_report));
    assert_eq!(pipeline.tracker().timings().len(), 2 * first_report.timings.len());

    let second_stage_sum: f64 = second_report.timings.iter().map(|t| t.duration_ms).sum();
    assert!(second_report.total_ms >= second_stage_sum);
    assert!(second_report.total_ms < pipeline.tracker().elapsed_ms());
}

#[test]
fn test_no_backends_is_device_unavailable() {
    let options = PipelineOptions::new().with_backends(wgpu::Backends::empty());
    let err = ComputeSession::open(&options).unwrap_err();
    assert!(matches!(err, PipelineError::DeviceUnavailable { .. }));
    assert_eq!(err.stage(), Stage::Init);
}

#[test]
fn test_run_writes_output_and_reports_progress() {
    if !has_gpu() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");

    let codec = FileCodec::new();
    let original = patterned(16, 8, 3);
    codec.save(&original, &input).unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let options = PipelineOptions::new()
        .with_input(&input)
        .with_output(&output)
        .with_verify(true)
        .with_progress(move |update| sink.lock().unwrap().push(update));

    let report = match TransformPipeline::run(&options, &codec) {
        Ok(report) => report,
        Err(PipelineError::ContextCreationFailed { .. }) => return,
        Err(e) => panic!("run failed: {}", e),
    };
    assert!(report.verified);

    let flipped = codec.load(&output).unwrap();
    assert_eq!(flipped.sample(0, 0, 0), original.sample(0, 7, 0));

    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(ProgressUpdate::Started)));
    assert!(matches!(events.last(), Some(ProgressUpdate::Completed { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProgressUpdate::Failed { .. })));
}

#[test]
fn test_run_missing_input_writes_nothing() {
    if !has_gpu() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.png");
    let options = PipelineOptions::new()
        .with_input(dir.path().join("missing.png"))
        .with_output(&output);

    match TransformPipeline::run(&options, &FileCodec::new()) {
        Err(e @ PipelineError::ImageLoadError { .. }) => assert_eq!(e.stage(), Stage::Stage),
        Err(PipelineError::ContextCreationFailed { .. }) => {}
        other => panic!("expected ImageLoadError, got {:?}", other.map(|_| ())),
    }
    assert!(!output.exists());
}

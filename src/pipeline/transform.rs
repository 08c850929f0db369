//! The transform pipeline state machine.
//!
//! Init -> Stage -> Bind -> Transfer (write) -> Dispatch -> Transfer (read)
//! -> Finalize. The first error aborts the run; device resources acquired so
//! far are released as their owners go out of scope.

use crate::buffer::PixelBufferAdapter;
use crate::codec::ImageCodec;
use crate::core::error::{PipelineError, PipelineResult, Stage};
use crate::core::options::PipelineOptions;
use crate::core::types::{HostImage, PackedBuffer};
use crate::gpu::image::{DeviceImage, HostRegion};
use crate::gpu::kernel::WorkSize;
use crate::gpu::session::ComputeSession;
use crate::pipeline::progress::{ProgressTracker, StageTiming};
use serde::Serialize;
use std::time::Instant;

/// Summary of a completed transform.
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    /// Device the kernel ran on.
    pub device: String,
    /// Kernel entry point.
    pub entry_point: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Channel count of the host image.
    pub channels: u8,
    /// Dispatch geometry.
    pub work_size: WorkSize,
    /// Workgroups dispatched per axis.
    pub work_groups: [u32; 2],
    /// Whether the output was checked against the host reference.
    pub verified: bool,
    /// Per-stage timings, in execution order.
    pub timings: Vec<StageTiming>,
    /// Total wall-clock time in milliseconds.
    pub total_ms: f64,
}

impl TransformReport {
    /// JSON rendering of the report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

/// Runs the kernel of a [`ComputeSession`] over host images.
#[derive(Debug)]
pub struct TransformPipeline<'s> {
    session: &'s ComputeSession,
    tracker: ProgressTracker,
    verify: bool,
}

impl<'s> TransformPipeline<'s> {
    /// Create a pipeline over an open session.
    pub fn new(session: &'s ComputeSession) -> Self {
        Self {
            session,
            tracker: ProgressTracker::new(),
            verify: false,
        }
    }

    /// Report progress through `tracker`.
    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Enable/disable host verification of the device output.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// The tracker this pipeline reports to.
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Transform `image` in place on the device.
    ///
    /// Only the channels `image` has are written back. The report covers
    /// this call only, even when the pipeline is reused.
    pub fn transform(&self, image: &mut HostImage) -> PipelineResult<TransformReport> {
        let ctx = self.session.context();
        let kernel = self.session.kernel();
        let (width, height) = (image.width(), image.height());
        let work = kernel.work_size(width, height);

        log::debug!(
            "transforming {}x{} image with {} channel(s)",
            width,
            height,
            image.channels()
        );

        let input_staging = PixelBufferAdapter::to_packed(image);
        let mut output_staging = PackedBuffer::new(width, height);

        if !self.tracker.is_started() {
            self.tracker.start();
        }
        let first_timing = self.tracker.timings().len();
        let started = Instant::now();

        {
            let input_region = HostRegion::ReadOnly(&input_staging);
            let output_region = HostRegion::WriteOnly(&mut output_staging);
            let (input, mut output) = self.tracker.track(Stage::Stage, move || {
                let input = DeviceImage::create(ctx, width, height, input_region)?;
                let output = DeviceImage::create(ctx, width, height, output_region)?;
                Ok((input, output))
            })?;

            let args = self
                .tracker
                .track(Stage::Bind, || kernel.bind(ctx, &input, &output))?;

            self.tracker.track(Stage::Transfer, || input.write(ctx))?;
            self.tracker
                .track(Stage::Dispatch, || kernel.dispatch(ctx, &args, work))?;
            self.tracker.track(Stage::Transfer, || output.read(ctx))?;
        }

        let verified = self.tracker.track(Stage::Finalize, || {
            let verified = self.check_output(&input_staging, &output_staging)?;
            PixelBufferAdapter::from_packed(&output_staging, image);
            Ok(verified)
        })?;

        Ok(TransformReport {
            device: ctx.device_name().to_string(),
            entry_point: kernel.entry_point().to_string(),
            width,
            height,
            channels: image.channels(),
            work_size: work,
            work_groups: work.groups(),
            verified,
            timings: self.tracker.timings().split_off(first_timing),
            total_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    fn check_output(&self, input: &PackedBuffer, output: &PackedBuffer) -> PipelineResult<bool> {
        if !self.verify {
            return Ok(false);
        }
        let Some(reference) = self.session.kernel().reference() else {
            log::warn!(
                "kernel '{}' has no host reference; skipping verification",
                self.session.kernel().entry_point()
            );
            return Ok(false);
        };
        match reference.first_mismatch(input, output) {
            Some((x, y, expected, actual)) => Err(PipelineError::VerificationFailed {
                x,
                y,
                expected,
                actual,
            }),
            None => Ok(true),
        }
    }

    /// Full run: open a session, load, transform, save.
    ///
    /// The output file is written only after every device stage succeeded.
    pub fn run(options: &PipelineOptions, codec: &dyn ImageCodec) -> PipelineResult<TransformReport> {
        let tracker = ProgressTracker::new().with_callback(options.progress_callback.clone());
        tracker.start();

        let session = tracker.track(Stage::Init, || ComputeSession::open(options))?;
        let mut image = tracker.track(Stage::Stage, || codec.load(&options.input_path))?;

        let pipeline = TransformPipeline::new(&session)
            .with_tracker(tracker)
            .with_verify(options.verify);
        let mut report = pipeline.transform(&mut image)?;

        let tracker = pipeline.tracker();
        tracker.track(Stage::Finalize, || codec.save(&image, &options.output_path))?;
        tracker.complete();

        report.timings = tracker.timings();
        report.total_ms = tracker.elapsed_ms();

        log::info!(
            "flipped {}x{} image on {} in {:.2} ms -> {}",
            report.width,
            report.height,
            report.device,
            report.total_ms,
            options.output_path.display()
        );
        log::debug!("report: {}", report.to_json());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> TransformReport {
        let work = WorkSize::for_image(10, 3, [8, 8]);
        TransformReport {
            device: "Test GPU".to_string(),
            entry_point: "img_turn".to_string(),
            width: 10,
            height: 3,
            channels: 3,
            work_size: work,
            work_groups: work.groups(),
            verified: true,
            timings: vec![StageTiming {
                stage: Stage::Dispatch,
                duration_ms: 0.5,
            }],
            total_ms: 1.25,
        }
    }

    #[test]
    fn test_report_json() {
        let json: serde_json::Value = serde_json::from_str(&sample_report().to_json()).unwrap();
        assert_eq!(json["device"], "Test GPU");
        assert_eq!(json["entry_point"], "img_turn");
        assert_eq!(json["work_groups"], serde_json::json!([2, 1]));
        assert_eq!(json["timings"][0]["stage"], "dispatch");
        assert_eq!(json["verified"], true);
    }
}

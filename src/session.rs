//! Editing session — owns all pipeline state and its sequencing.
//!
//! One session edits one image at a time. Decodes and rasterizations are
//! suspend points, so each carries a ticket from a monotonically increasing
//! counter; a completion is applied only if its ticket is still the newest
//! (last-write-wins). Superseded results are discarded, never queued.

use crate::acquire::{self, AcquireError, CandidateFile, SourceImage};
use crate::config::PipelineConfig;
use crate::crop::{rasterize, CropRegion, RasterError, RasterizedCrop};
use crate::dispatch::{DispatchError, UploadPayload, UploadSink};
use crate::gate::{content_digest, DispatchGate};

/// Handle for an in-flight decode, compared at completion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket(u64);

/// A snapshot of everything a rasterization needs, taken when the region
/// changed. The source bitmap is `Arc`-backed, so the snapshot is cheap and
/// immune to the session loading a different image mid-flight.
#[derive(Debug, Clone)]
pub struct RasterJob {
    ticket: u64,
    source: SourceImage,
    region: CropRegion,
}

impl RasterJob {
    /// The constrained region this job will rasterize.
    pub fn region(&self) -> &CropRegion {
        &self.region
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The decode was the newest one and is now the session's source image.
    Loaded { width: u32, height: u32 },
    /// A newer decode started before this one finished; result discarded.
    Superseded,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// New content reached the sink; the gate now remembers its digest.
    Dispatched {
        digest: String,
        width: u32,
        height: u32,
    },
    /// Byte-identical to the last dispatch — suppressed by the gate.
    Duplicate,
    /// The region was degenerate (zero pixels); nothing to do.
    SkippedEmpty,
    /// A newer rasterization started before this one finished.
    Superseded,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No source image loaded")]
    NoSource,

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

pub struct EditorSession<S> {
    config: PipelineConfig,
    sink: S,
    source: Option<SourceImage>,
    region: Option<CropRegion>,
    gate: DispatchGate,
    decode_seq: u64,
    raster_seq: u64,
}

impl<S: UploadSink> EditorSession<S> {
    pub fn new(config: PipelineConfig, sink: S) -> Self {
        Self {
            config,
            sink,
            source: None,
            region: None,
            gate: DispatchGate::new(),
            decode_seq: 0,
            raster_seq: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn region(&self) -> Option<&CropRegion> {
        self.region.as_ref()
    }

    pub fn last_dispatched_digest(&self) -> Option<&str> {
        self.gate.last_dispatched()
    }

    /// Validates a candidate and reserves a decode ticket.
    ///
    /// Rejection leaves the session untouched — the previous image, region,
    /// and gate all survive.
    pub fn begin_acquire(&mut self, candidate: &CandidateFile) -> Result<DecodeTicket, AcquireError> {
        candidate.validate(self.config.max_file_bytes)?;
        self.decode_seq += 1;
        log::debug!(
            "[ACQUIRE] Accepted {:?} ({} bytes, {}) — decode #{}",
            candidate.name,
            candidate.bytes.len(),
            candidate.mime,
            self.decode_seq
        );
        Ok(DecodeTicket(self.decode_seq))
    }

    /// Applies a finished decode if its ticket is still the newest.
    ///
    /// On success the session starts fresh: new source, auto-centered
    /// initial region, gate reset, and any in-flight rasterization of the
    /// old image invalidated. A decode error changes nothing.
    pub fn complete_acquire(
        &mut self,
        ticket: DecodeTicket,
        decoded: Result<SourceImage, AcquireError>,
    ) -> Result<DecodeOutcome, AcquireError> {
        if ticket.0 != self.decode_seq {
            log::debug!(
                "[ACQUIRE] Decode #{} superseded by #{} — discarding",
                ticket.0,
                self.decode_seq
            );
            return Ok(DecodeOutcome::Superseded);
        }

        let source = decoded?;
        let (width, height) = (source.natural_width(), source.natural_height());

        self.region = Some(CropRegion::initial(width, height, self.config.aspect));
        self.source = Some(source);
        self.gate.reset();
        self.raster_seq += 1;

        log::info!("[ACQUIRE] Session now editing a {}x{} source", width, height);
        Ok(DecodeOutcome::Loaded { width, height })
    }

    /// Convenience path: validate, decode, and apply in one call.
    pub async fn load_candidate(
        &mut self,
        candidate: CandidateFile,
    ) -> Result<DecodeOutcome, AcquireError> {
        let ticket = self.begin_acquire(&candidate)?;
        let decoded = acquire::decode_candidate(candidate).await;
        self.complete_acquire(ticket, decoded)
    }

    /// Clears the source, region, and gate, and invalidates all in-flight work.
    pub fn reset(&mut self) {
        self.source = None;
        self.region = None;
        self.gate.reset();
        self.decode_seq += 1;
        self.raster_seq += 1;
        log::debug!("[SESSION] Reset");
    }

    /// Records a region mutation and returns the rasterization job for it.
    ///
    /// The region is re-constrained first (aspect, minimum size,
    /// containment). Zero-size regions — reachable transiently mid-drag —
    /// are kept as-is so the rasterizer skips them silently instead of the
    /// minimum-size rule inflating them into a real selection. Returns
    /// `None` when no image is loaded.
    pub fn set_region(&mut self, region: CropRegion) -> Option<RasterJob> {
        let source = self.source.as_ref()?;
        let constrained = if region
            .to_pixels(source.natural_width(), source.natural_height())
            .is_empty()
        {
            region
        } else {
            region.constrained(
                source.natural_width(),
                source.natural_height(),
                self.config.aspect,
                self.config.min_width,
                self.config.min_height,
            )
        };
        self.region = Some(constrained);
        self.raster_seq += 1;
        Some(RasterJob {
            ticket: self.raster_seq,
            source: source.clone(),
            region: constrained,
        })
    }

    /// Rasterizes a job against the session's config.
    ///
    /// `Ok(None)` means the region was degenerate — skip, don't report.
    pub fn rasterize_job(&self, job: &RasterJob) -> Result<Option<RasterizedCrop>, RasterError> {
        rasterize(&job.source, &job.region, &self.config)
    }

    /// Gates and dispatches a finished rasterization.
    ///
    /// Ticket freshness is checked first (last-write-wins), then the digest
    /// gate. The gate commits only after the sink reports success, so a
    /// failed dispatch of identical bytes will re-attempt rather than be
    /// suppressed.
    pub async fn complete_raster(
        &mut self,
        job: &RasterJob,
        raster: RasterizedCrop,
    ) -> Result<SubmitOutcome, PipelineError> {
        if job.ticket != self.raster_seq {
            log::debug!(
                "[RASTER] Job #{} superseded by #{} — discarding output",
                job.ticket,
                self.raster_seq
            );
            return Ok(SubmitOutcome::Superseded);
        }

        let digest = content_digest(&raster.bytes);
        if !self.gate.should_dispatch(&digest) {
            log::debug!("[GATE] Output unchanged ({digest}) — dispatch suppressed");
            return Ok(SubmitOutcome::Duplicate);
        }

        let (width, height) = (raster.width, raster.height);
        let payload = UploadPayload::new(
            raster.bytes,
            self.config.output.upload_file_name(),
            raster.mime,
        );
        self.sink.upload(payload).await?;

        self.gate.commit(digest.clone());
        log::info!("[GATE] Dispatched {}x{} crop, digest {}", width, height, digest);
        Ok(SubmitOutcome::Dispatched {
            digest,
            width,
            height,
        })
    }

    /// The common path for a region mutation: constrain, rasterize, gate,
    /// dispatch.
    pub async fn update_crop(&mut self, region: CropRegion) -> Result<SubmitOutcome, PipelineError> {
        let job = self.set_region(region).ok_or(PipelineError::NoSource)?;
        let Some(raster) = self.rasterize_job(&job)? else {
            return Ok(SubmitOutcome::SkippedEmpty);
        };
        self.complete_raster(&job, raster).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        calls: Arc<AtomicUsize>,
    }

    impl UploadSink for CountingSink {
        async fn upload(&self, _payload: UploadPayload) -> Result<(), DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session_with_counter(
        config: PipelineConfig,
    ) -> (EditorSession<CountingSink>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = CountingSink {
            calls: calls.clone(),
        };
        (EditorSession::new(config, sink), calls)
    }

    fn png_candidate(width: u32, height: u32) -> CandidateFile {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        CandidateFile::new("test.png", "image/png", bytes)
    }

    #[tokio::test]
    async fn region_mutation_without_a_source_is_refused() {
        let (mut session, _) = session_with_counter(PipelineConfig::default());
        assert!(session
            .set_region(CropRegion::percent(0.0, 0.0, 50.0, 50.0))
            .is_none());
        assert!(matches!(
            session
                .update_crop(CropRegion::percent(0.0, 0.0, 50.0, 50.0))
                .await,
            Err(PipelineError::NoSource)
        ));
    }

    #[test]
    fn rejected_candidate_changes_nothing() {
        let (mut session, _) = session_with_counter(PipelineConfig::default());
        let bad = CandidateFile::new("doc.txt", "text/plain", vec![0u8; 8]);
        assert!(matches!(
            session.begin_acquire(&bad),
            Err(AcquireError::InvalidFileType { .. })
        ));
        assert!(session.source().is_none());
        assert!(session.region().is_none());
    }

    #[tokio::test]
    async fn load_initializes_a_centered_initial_region() {
        let config = PipelineConfig {
            aspect: Some(1.0),
            ..Default::default()
        };
        let (mut session, _) = session_with_counter(config);

        let outcome = session.load_candidate(png_candidate(500, 500)).await.unwrap();
        assert_eq!(
            outcome,
            DecodeOutcome::Loaded {
                width: 500,
                height: 500
            }
        );

        let region = session.region().copied().unwrap();
        assert_eq!(region.unit, crate::crop::CropUnit::Percent);
        assert!((region.width - 80.0).abs() < 1e-6);
        assert!((region.x - 10.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stale_decode_is_discarded() {
        let (mut session, _) = session_with_counter(PipelineConfig::default());

        let first = png_candidate(100, 100);
        let second = png_candidate(200, 200);

        let ticket_a = session.begin_acquire(&first).unwrap();
        let ticket_b = session.begin_acquire(&second).unwrap();

        let decoded_a = acquire::decode_candidate(first).await;
        let decoded_b = acquire::decode_candidate(second).await;

        // First decode finishes last-but-one: applying it must be a no-op.
        assert_eq!(
            session.complete_acquire(ticket_a, decoded_a).unwrap(),
            DecodeOutcome::Superseded
        );
        assert!(session.source().is_none());

        assert_eq!(
            session.complete_acquire(ticket_b, decoded_b).unwrap(),
            DecodeOutcome::Loaded {
                width: 200,
                height: 200
            }
        );
        assert_eq!(session.source().unwrap().natural_width(), 200);
    }

    #[tokio::test]
    async fn failed_decode_keeps_the_previous_source() {
        let (mut session, _) = session_with_counter(PipelineConfig::default());
        session.load_candidate(png_candidate(64, 64)).await.unwrap();

        let garbage = CandidateFile::new("g.png", "image/png", vec![0xCD; 64]);
        let err = session.load_candidate(garbage).await.unwrap_err();
        assert!(matches!(err, AcquireError::FileReadError(_)));

        // The 64x64 source survives the failed swap.
        assert_eq!(session.source().unwrap().natural_width(), 64);
    }

    #[tokio::test]
    async fn reset_clears_source_region_and_gate() {
        let (mut session, calls) = session_with_counter(PipelineConfig {
            min_width: 8,
            min_height: 8,
            ..Default::default()
        });
        session.load_candidate(png_candidate(64, 64)).await.unwrap();
        session
            .update_crop(CropRegion::pixels(0.0, 0.0, 32.0, 32.0))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.last_dispatched_digest().is_some());

        session.reset();
        assert!(session.source().is_none());
        assert!(session.region().is_none());
        assert!(session.last_dispatched_digest().is_none());
    }
}

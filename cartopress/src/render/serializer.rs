//! System-wide render serialization.

use super::{RenderError, RenderRequest, Renderer, StageObserver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Serializes access to the non-reentrant renderer.
///
/// One instance is shared by every orchestration flow in the process; the
/// internal mutex is the ownership token for the rendering capability. Even
/// jobs submitted from different flows queue here, one at a time.
pub struct RenderSerializer {
    renderer: Arc<dyn Renderer>,
    guard: Mutex<()>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl RenderSerializer {
    /// Wraps a renderer with the serialization guard.
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            guard: Mutex::new(()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Renders one poster under the global lock and verifies the output.
    ///
    /// Returns the output file size in bytes. A renderer that reports success
    /// without leaving a non-empty file behind yields
    /// [`RenderError::VerificationFailed`] - never a silent success.
    pub async fn render(
        &self,
        request: &RenderRequest,
        on_stage: StageObserver<'_>,
    ) -> Result<u64, RenderError> {
        let _token = self.guard.lock().await;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        debug!(
            city = %request.city,
            theme = %request.theme.id,
            output = %request.output_path.display(),
            "render slot acquired"
        );

        let outcome = self.renderer.render(request, on_stage).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome.map_err(RenderError::Failed)?;

        let size = match tokio::fs::metadata(&request.output_path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                return Err(RenderError::VerificationFailed {
                    path: request.output_path.clone(),
                })
            }
        };

        info!(
            city = %request.city,
            theme = %request.theme.id,
            size_bytes = size,
            "render verified"
        );
        Ok(size)
    }

    /// Highest number of simultaneously executing renders observed.
    ///
    /// Must never exceed 1; exposed so tests can assert the invariant.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FeatureSet, GeoPoint, MapBundle, StreetGraph};
    use crate::render::RenderStage;
    use crate::theme::Theme;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    fn sample_request(output: std::path::PathBuf) -> RenderRequest {
        let graph = StreetGraph {
            nodes: vec![GeoPoint::new(40.4, -3.7), GeoPoint::new(40.42, -3.68)],
            edge_count: 1,
        };
        let bounds = graph.bounds().unwrap();
        RenderRequest {
            bundle: Arc::new(MapBundle {
                graph,
                water: Some(FeatureSet::new(1)),
                parks: None,
                bounds,
            }),
            theme: Theme::fallback(),
            city: "Madrid".to_string(),
            country: "Spain".to_string(),
            point: GeoPoint::new(40.4168, -3.7038),
            output_path: output,
            width_inches: 12.0,
            height_inches: 16.0,
            dpi: 300,
        }
    }

    /// Renderer double that writes a file after an optional delay.
    struct WritingRenderer {
        delay: Duration,
        write_file: bool,
    }

    impl Renderer for WritingRenderer {
        fn render<'a>(
            &'a self,
            request: &'a RenderRequest,
            on_stage: StageObserver<'a>,
        ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
            Box::pin(async move {
                for stage in RenderStage::ALL {
                    on_stage(stage);
                }
                tokio::time::sleep(self.delay).await;
                if self.write_file {
                    tokio::fs::write(&request.output_path, b"png-bytes")
                        .await
                        .map_err(|e| e.to_string())?;
                }
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_successful_render_returns_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("madrid.png");
        let serializer = RenderSerializer::new(Arc::new(WritingRenderer {
            delay: Duration::ZERO,
            write_file: true,
        }));

        let size = serializer
            .render(&sample_request(output), &|_| {})
            .await
            .unwrap();
        assert_eq!(size, 9);
    }

    #[tokio::test]
    async fn test_missing_output_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ghost.png");
        let serializer = RenderSerializer::new(Arc::new(WritingRenderer {
            delay: Duration::ZERO,
            write_file: false,
        }));

        let err = serializer
            .render(&sample_request(output), &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::VerificationFailed { .. }));
    }

    #[tokio::test]
    async fn test_stages_reported_in_fixed_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("stages.png");
        let serializer = RenderSerializer::new(Arc::new(WritingRenderer {
            delay: Duration::ZERO,
            write_file: true,
        }));

        let stages = std::sync::Mutex::new(Vec::new());
        serializer
            .render(&sample_request(output), &|stage| {
                stages.lock().unwrap().push(stage);
            })
            .await
            .unwrap();

        assert_eq!(stages.into_inner().unwrap(), RenderStage::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_concurrent_renders_never_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = Arc::new(RenderSerializer::new(Arc::new(WritingRenderer {
            delay: Duration::from_millis(15),
            write_file: true,
        })));

        let mut handles = Vec::new();
        for i in 0..4 {
            let serializer = serializer.clone();
            let output = dir.path().join(format!("poster-{}.png", i));
            handles.push(tokio::spawn(async move {
                serializer.render(&sample_request(output), &|_| {}).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(serializer.peak_in_flight(), 1);
    }
}

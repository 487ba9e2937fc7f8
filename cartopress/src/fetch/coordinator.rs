//! Concurrent download coordination.

use super::{DataFetcher, DataSource, FeatureSet, FetchError, GeoPoint, MapBundle, StreetGraph};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Concurrent download tasks per fetch - one per source.
pub const FETCH_WORKERS: usize = 3;

/// Pause after all downloads complete, bounding the request rate against the
/// upstream provider.
pub const POST_FETCH_PACING: Duration = Duration::from_millis(500);

/// Callback fired once per completed source, in arrival order, with a running
/// (completed, total) counter. Completion order across sources is not
/// guaranteed - callers must not assume streets finishes first.
pub type FetchObserver<'a> = &'a (dyn Fn(DataSource, usize, usize) + Send + Sync);

enum SourceOutcome {
    Streets(Result<StreetGraph, String>),
    Optional(Option<FeatureSet>),
}

/// Runs the three per-location downloads and aggregates the results.
pub struct FetchCoordinator {
    fetcher: Arc<dyn DataFetcher>,
    pacing: Duration,
}

impl FetchCoordinator {
    /// Creates a coordinator with the production pacing pause.
    pub fn new(fetcher: Arc<dyn DataFetcher>) -> Self {
        Self::with_pacing(fetcher, POST_FETCH_PACING)
    }

    /// Creates a coordinator with an explicit pacing pause.
    pub fn with_pacing(fetcher: Arc<dyn DataFetcher>, pacing: Duration) -> Self {
        Self { fetcher, pacing }
    }

    /// Downloads streets, water, and parks concurrently.
    ///
    /// Water and parks failing or coming back empty resolve to absent - an
    /// expected outcome for sparse areas, logged and absorbed. Only a street
    /// failure (or an empty street graph) is fatal. Waits for all three
    /// sources before computing bounds and returning.
    pub async fn fetch_all(
        &self,
        point: GeoPoint,
        distance: u32,
        on_each: FetchObserver<'_>,
    ) -> Result<MapBundle, FetchError> {
        info!(%point, distance, "fetching map data ({} concurrent downloads)", FETCH_WORKERS);

        let (tx, mut rx) = mpsc::channel::<(DataSource, SourceOutcome)>(FETCH_WORKERS);

        {
            let fetcher = self.fetcher.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = fetcher.fetch_streets(point, distance).await;
                let _ = tx
                    .send((DataSource::Streets, SourceOutcome::Streets(result)))
                    .await;
            });
        }
        {
            let fetcher = self.fetcher.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = optional_outcome(
                    DataSource::Water,
                    fetcher.fetch_water(point, distance).await,
                );
                let _ = tx.send((DataSource::Water, outcome)).await;
            });
        }
        {
            let fetcher = self.fetcher.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = optional_outcome(
                    DataSource::Parks,
                    fetcher.fetch_parks(point, distance).await,
                );
                let _ = tx.send((DataSource::Parks, outcome)).await;
            });
        }
        drop(tx);

        let mut streets: Option<Result<StreetGraph, String>> = None;
        let mut water: Option<FeatureSet> = None;
        let mut parks: Option<FeatureSet> = None;
        let mut completed = 0;

        while let Some((source, outcome)) = rx.recv().await {
            completed += 1;
            info!(source = %source, completed, total = FETCH_WORKERS, "download finished");

            match outcome {
                SourceOutcome::Streets(result) => streets = Some(result),
                SourceOutcome::Optional(features) => match source {
                    DataSource::Water => water = features,
                    DataSource::Parks => parks = features,
                    DataSource::Streets => unreachable!("streets is not an optional source"),
                },
            }

            on_each(source, completed, FETCH_WORKERS);
        }

        let graph = match streets {
            Some(Ok(graph)) => graph,
            Some(Err(msg)) => return Err(FetchError::Streets(msg)),
            None => return Err(FetchError::Streets("download task vanished".to_string())),
        };

        let bounds = graph.bounds().ok_or(FetchError::EmptyStreetNetwork)?;

        // One pacing sleep for the whole fetch, after everything completes.
        tokio::time::sleep(self.pacing).await;

        info!(
            edges = graph.edge_count,
            water = water.as_ref().map(|f| f.feature_count).unwrap_or(0),
            parks = parks.as_ref().map(|f| f.feature_count).unwrap_or(0),
            "all map data downloaded"
        );

        Ok(MapBundle {
            graph,
            water,
            parks,
            bounds,
        })
    }
}

/// Collapses an optional source's outcome: failures and empty sets both
/// become absent.
fn optional_outcome(
    source: DataSource,
    result: Result<Option<FeatureSet>, String>,
) -> SourceOutcome {
    match result {
        Ok(Some(features)) if !features.is_empty() => SourceOutcome::Optional(Some(features)),
        Ok(_) => {
            info!(source = %source, "no features found (normal for some locations)");
            SourceOutcome::Optional(None)
        }
        Err(msg) => {
            warn!(source = %source, error = %msg, "optional download failed, treating as absent");
            SourceOutcome::Optional(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Fetcher double with per-source canned outcomes and delays.
    struct ScriptedFetcher {
        streets: Result<StreetGraph, String>,
        water: Result<Option<FeatureSet>, String>,
        parks: Result<Option<FeatureSet>, String>,
        streets_delay: Duration,
    }

    impl ScriptedFetcher {
        fn happy() -> Self {
            Self {
                streets: Ok(sample_graph()),
                water: Ok(Some(FeatureSet::new(4))),
                parks: Ok(Some(FeatureSet::new(2))),
                streets_delay: Duration::ZERO,
            }
        }
    }

    fn sample_graph() -> StreetGraph {
        StreetGraph {
            nodes: vec![GeoPoint::new(51.5, -0.12), GeoPoint::new(51.52, -0.10)],
            edge_count: 1,
        }
    }

    impl DataFetcher for ScriptedFetcher {
        fn fetch_streets(
            &self,
            _point: GeoPoint,
            _distance: u32,
        ) -> Pin<Box<dyn Future<Output = Result<StreetGraph, String>> + Send + '_>> {
            Box::pin(async move {
                tokio::time::sleep(self.streets_delay).await;
                self.streets.clone()
            })
        }

        fn fetch_water(
            &self,
            _point: GeoPoint,
            _distance: u32,
        ) -> Pin<Box<dyn Future<Output = Result<Option<FeatureSet>, String>> + Send + '_>>
        {
            Box::pin(async move { self.water.clone() })
        }

        fn fetch_parks(
            &self,
            _point: GeoPoint,
            _distance: u32,
        ) -> Pin<Box<dyn Future<Output = Result<Option<FeatureSet>, String>> + Send + '_>>
        {
            Box::pin(async move { self.parks.clone() })
        }
    }

    fn coordinator(fetcher: ScriptedFetcher) -> FetchCoordinator {
        FetchCoordinator::with_pacing(Arc::new(fetcher), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_all_sources_aggregate() {
        let coordinator = coordinator(ScriptedFetcher::happy());
        let events = Mutex::new(Vec::new());

        let bundle = coordinator
            .fetch_all(GeoPoint::new(51.5, -0.12), 10_000, &|source, done, total| {
                events.lock().unwrap().push((source, done, total));
            })
            .await
            .unwrap();

        assert_eq!(bundle.graph.edge_count, 1);
        assert_eq!(bundle.water, Some(FeatureSet::new(4)));
        assert_eq!(bundle.parks, Some(FeatureSet::new(2)));

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 3);
        // Running counter is 1..=3 regardless of which source lands when.
        for (i, (_, done, total)) in events.iter().enumerate() {
            assert_eq!(*done, i + 1);
            assert_eq!(*total, 3);
        }
    }

    #[tokio::test]
    async fn test_optional_failures_become_absent() {
        let mut fetcher = ScriptedFetcher::happy();
        fetcher.water = Err("timeout".to_string());
        fetcher.parks = Ok(None);

        let bundle = coordinator(fetcher)
            .fetch_all(GeoPoint::new(51.5, -0.12), 10_000, &|_, _, _| {})
            .await
            .unwrap();

        assert!(bundle.water.is_none());
        assert!(bundle.parks.is_none());
    }

    #[tokio::test]
    async fn test_empty_feature_set_becomes_absent() {
        let mut fetcher = ScriptedFetcher::happy();
        fetcher.water = Ok(Some(FeatureSet::new(0)));

        let bundle = coordinator(fetcher)
            .fetch_all(GeoPoint::new(51.5, -0.12), 10_000, &|_, _, _| {})
            .await
            .unwrap();

        assert!(bundle.water.is_none());
    }

    #[tokio::test]
    async fn test_street_failure_is_fatal() {
        let mut fetcher = ScriptedFetcher::happy();
        fetcher.streets = Err("connection refused".to_string());

        let err = coordinator(fetcher)
            .fetch_all(GeoPoint::new(51.5, -0.12), 10_000, &|_, _, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Streets(_)));
    }

    #[tokio::test]
    async fn test_empty_street_graph_is_fatal() {
        let mut fetcher = ScriptedFetcher::happy();
        fetcher.streets = Ok(StreetGraph {
            nodes: vec![],
            edge_count: 0,
        });

        let err = coordinator(fetcher)
            .fetch_all(GeoPoint::new(51.5, -0.12), 10_000, &|_, _, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::EmptyStreetNetwork));
    }

    #[tokio::test]
    async fn test_waits_for_slow_mandatory_source() {
        let mut fetcher = ScriptedFetcher::happy();
        fetcher.streets_delay = Duration::from_millis(30);
        let order = Mutex::new(Vec::new());

        coordinator(fetcher)
            .fetch_all(GeoPoint::new(51.5, -0.12), 10_000, &|source, _, _| {
                order.lock().unwrap().push(source);
            })
            .await
            .unwrap();

        let order = order.into_inner().unwrap();
        // Streets was delayed, so it arrives last - arrival order, not
        // submission order.
        assert_eq!(order.len(), 3);
        assert_eq!(order[2], DataSource::Streets);
    }
}

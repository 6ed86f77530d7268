//! Async elevation loading
//!
//! Fetches run on a dedicated tokio runtime with a bounded number in flight.
//! The render thread queues tiles through [`TerrainProvider::request_terrain`]
//! and drains finished responses with [`TerrainLoader::poll`] once per frame.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::core::config::TerrainConfig;
use crate::core::types::Result;

use super::provider::{TerrainProvider, TerrainResponse, TerrainResult, TileKey};

/// Blocking source of elevation rasters (disk cache, HTTP client, generator)
pub trait ElevationSource: Send + Sync + 'static {
    /// Raster for `tile` with `(file_grid_size + 1)²` samples, or `None` when the tile has no data
    fn fetch(&self, tile: TileKey, file_grid_size: u32) -> Result<Option<Vec<f32>>>;
}

/// [`TerrainProvider`] backed by an [`ElevationSource`] on worker threads
pub struct TerrainLoader {
    config: TerrainConfig,
    request_tx: mpsc::UnboundedSender<TileKey>,
    result_rx: mpsc::UnboundedReceiver<TerrainResponse>,
    pending: HashSet<TileKey>,
    runtime: Option<Runtime>,
}

impl TerrainLoader {
    pub fn new(config: TerrainConfig, source: Arc<dyn ElevationSource>) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<TileKey>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<TerrainResponse>();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("terrain-loader")
            .enable_time()
            .build()?;

        let worker_config = config.clone();
        runtime.spawn(async move {
            Self::worker_loop(worker_config, source, &mut request_rx, result_tx).await;
        });
        log::info!("Terrain loader started ({} concurrent fetches)", config.max_concurrent);

        Ok(Self {
            config,
            request_tx,
            result_rx,
            pending: HashSet::new(),
            runtime: Some(runtime),
        })
    }

    async fn worker_loop(
        config: TerrainConfig,
        source: Arc<dyn ElevationSource>,
        request_rx: &mut mpsc::UnboundedReceiver<TileKey>,
        result_tx: mpsc::UnboundedSender<TerrainResponse>,
    ) {
        let max_concurrent = config.max_concurrent.max(1);
        let mut active_tasks = JoinSet::new();
        let mut queued: VecDeque<TileKey> = VecDeque::new();

        loop {
            tokio::select! {
                Some(tile) = request_rx.recv() => {
                    queued.push_back(tile);
                }

                Some(joined) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match joined {
                        Ok(response) => {
                            if result_tx.send(response).is_err() {
                                break;
                            }
                        }
                        Err(e) => log::error!("Terrain fetch task panicked: {}", e),
                    }
                }

                else => {
                    if queued.is_empty() && active_tasks.is_empty() {
                        break;
                    }
                }
            }

            while active_tasks.len() < max_concurrent {
                let Some(tile) = queued.pop_front() else {
                    break;
                };
                let source = Arc::clone(&source);
                let file_grid_size = config
                    .file_grid_size
                    .unwrap_or_else(|| config.grid_size_for_zoom(tile.zoom));
                active_tasks.spawn_blocking(move || Self::fetch_tile(source.as_ref(), tile, file_grid_size));
            }
        }
    }

    fn fetch_tile(source: &dyn ElevationSource, tile: TileKey, file_grid_size: u32) -> TerrainResponse {
        let result = match source.fetch(tile, file_grid_size) {
            Ok(Some(samples)) if !samples.is_empty() => TerrainResult::Elevations(samples),
            Ok(_) => TerrainResult::NoData,
            Err(e) => {
                log::warn!("Terrain fetch for {:?} failed: {}", tile, e);
                TerrainResult::Failed(e.to_string())
            }
        };
        TerrainResponse { tile, result }
    }

    /// Queue a tile. Returns `false` if it is already pending.
    pub fn request(&mut self, tile: TileKey) -> bool {
        if self.pending.contains(&tile) {
            return false;
        }
        if self.request_tx.send(tile).is_err() {
            log::error!("Terrain loader worker is gone, dropping request for {:?}", tile);
            return false;
        }
        self.pending.insert(tile);
        true
    }

    /// Finished responses (non-blocking)
    pub fn poll(&mut self) -> Vec<TerrainResponse> {
        let mut responses = Vec::new();
        while let Ok(response) = self.result_rx.try_recv() {
            self.pending.remove(&response.tile);
            responses.push(response);
        }
        responses
    }

    /// Poll until nothing is pending or `timeout` elapses
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<TerrainResponse> {
        let deadline = Instant::now() + timeout;
        let mut responses = self.poll();
        while !self.pending.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
            responses.extend(self.poll());
        }
        responses
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, tile: TileKey) -> bool {
        self.pending.contains(&tile)
    }
}

impl TerrainProvider for TerrainLoader {
    fn config(&self) -> &TerrainConfig {
        &self.config
    }

    fn request_terrain(&mut self, tile: TileKey) -> bool {
        self.request(tile)
    }
}

impl Drop for TerrainLoader {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

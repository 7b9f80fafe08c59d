//! # Build Pipeline Module
//!
//! Turns "this chunk needs a mesh" requests into committed mesh bytes without
//! ever blocking the thread that submits them.
//!
//! ## Threading model
//! A fixed pool of worker threads each owns a private request channel;
//! requests are handed out round-robin. Workers push their results onto one
//! shared FIFO as [`QueuedAction`] entries, and the single consumer thread
//! drains that FIFO once per frame via [`BuildPipeline::drain`]. Nothing else
//! crosses threads except the region allocator and the voxel field cache,
//! both internally locked.
//!
//! Actions can carry a frame-count delay. A destroyed chunk's buffer slot and
//! mesh region ride the FIFO with a one-frame delay so a draw call built from
//! last frame's visible set can still reference them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cgmath::Point2;
use log::{debug, warn};
use thiserror::Error;

use crate::config::StreamerConfig;
use crate::meshing::{
    face_indices, face_vertices, GreedyMesher, INDEX_BYTES_PER_FACE, VERTEX_BYTES_PER_FACE,
};
use crate::region::{Region, RegionAllocator, REGION_ALIGNMENT};
use crate::voxels::{FieldCache, TerrainSource};

/// The two shared mesh buffers a [`BufferSink`] writes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshBufferKind {
    Vertex,
    Index,
}

/// Consumer-side collaborator owning the physical mesh buffers.
///
/// Both methods are only ever called on the consumer thread, from inside the
/// per-frame drain. `resize` is guaranteed to arrive before any `write` whose
/// region lies beyond the previous capacity.
pub trait BufferSink {
    /// Copies `bytes` into the given buffer at `offset_bytes`.
    fn write(&mut self, kind: MeshBufferKind, offset_bytes: u64, bytes: &[u8]);

    /// Grows the physical buffers to hold `capacity_faces` worth of mesh data.
    fn resize(&mut self, capacity_faces: u64);
}

/// Why a build task produced no mesh.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The task panicked; the payload message is preserved for the log.
    #[error("mesh build task panicked: {0}")]
    Panicked(String),
}

/// A finished mesh ready to be committed into the shared buffers.
#[derive(Debug)]
pub struct MeshCommit {
    pub coord: Point2<i32>,
    /// Generation stamp of the build request; stale commits are discarded.
    pub build_id: u64,
    pub face_count: u64,
    /// `None` for an empty mesh, which occupies no buffer space.
    pub region: Option<Region>,
    pub y_min: i32,
    pub y_max: i32,
    pub vertex_bytes: Vec<u8>,
    pub index_bytes: Vec<u8>,
}

/// One entry on the consumer FIFO.
#[derive(Debug)]
pub enum QueuedAction {
    /// A worker finished building a chunk's mesh.
    CommitMesh(MeshCommit),
    /// A worker's build task failed; the chunk has no mesh.
    BuildFailed {
        coord: Point2<i32>,
        build_id: u64,
        error: BuildError,
    },
    /// A chunk's buffer slot and/or mesh region may be reused. A re-mesh
    /// releases only the replaced region and keeps its slot.
    ReleaseChunk {
        buffer_index: Option<usize>,
        region: Option<Region>,
    },
    /// The allocator's logical capacity grew; the physical buffers must be
    /// resized before the next mesh write.
    BuffersResized { capacity_faces: u64 },
}

/// A queued action plus the number of frames it must still wait.
#[derive(Debug)]
pub struct DelayedAction {
    pub action: QueuedAction,
    pub frames_to_delay: u32,
}

impl DelayedAction {
    fn immediate(action: QueuedAction) -> Self {
        DelayedAction {
            action,
            frames_to_delay: 0,
        }
    }
}

/// A build request as sent to a worker thread.
struct BuildRequest {
    coord: Point2<i32>,
    build_id: u64,
}

/// Worker pool plus the action FIFO connecting it to the consumer thread.
///
/// All methods taking `&mut self` are consumer-thread-only; the worker
/// threads only ever touch the allocator, the field cache, and the sending
/// half of the FIFO.
pub struct BuildPipeline {
    allocator: Arc<RegionAllocator>,
    cache: Arc<FieldCache>,
    request_senders: Vec<mpsc::Sender<BuildRequest>>,
    workers: Vec<JoinHandle<()>>,
    next_worker: usize,
    action_tx: mpsc::Sender<DelayedAction>,
    action_rx: mpsc::Receiver<DelayedAction>,
    held: Vec<DelayedAction>,
    in_flight: usize,
}

impl BuildPipeline {
    /// Spawns the worker pool and wires up the allocator and field cache.
    ///
    /// The allocator's growth callback posts a [`QueuedAction::BuffersResized`]
    /// entry onto the FIFO, so the physical resize always happens on the
    /// consumer thread even when growth was triggered from a worker.
    pub fn new(config: &StreamerConfig, terrain: Arc<dyn TerrainSource>) -> Self {
        let (action_tx, action_rx) = mpsc::channel::<DelayedAction>();

        let grow_tx = Mutex::new(action_tx.clone());
        let allocator = Arc::new(RegionAllocator::new(
            config.initial_buffer_capacity,
            move |capacity| {
                let new_capacity = capacity.max(REGION_ALIGNMENT) * 2;
                grow_tx
                    .lock()
                    .unwrap()
                    .send(DelayedAction::immediate(QueuedAction::BuffersResized {
                        capacity_faces: new_capacity,
                    }))
                    .ok();
                new_capacity
            },
        ));
        let cache = Arc::new(FieldCache::new(config.field_cache_capacity));

        let worker_count = config.effective_worker_count();
        let mut request_senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (request_tx, request_rx) = mpsc::channel::<BuildRequest>();
            let allocator = allocator.clone();
            let cache = cache.clone();
            let terrain = terrain.clone();
            let actions = action_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("mesh-build-{}", index))
                .spawn(move || worker_loop(request_rx, allocator, cache, terrain, actions))
                .expect("failed to spawn mesh build worker");
            request_senders.push(request_tx);
            workers.push(handle);
        }
        debug!("build pipeline started with {} workers", worker_count);

        BuildPipeline {
            allocator,
            cache,
            request_senders,
            workers,
            next_worker: 0,
            action_tx,
            action_rx,
            held: Vec::new(),
            in_flight: 0,
        }
    }

    /// The shared region allocator backing all mesh commits.
    pub fn allocator(&self) -> &Arc<RegionAllocator> {
        &self.allocator
    }

    /// The shared voxel field cache.
    pub fn cache(&self) -> &Arc<FieldCache> {
        &self.cache
    }

    /// Number of dispatched builds whose result has not yet been drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Dispatches a build for `coord` to the next worker, round-robin.
    ///
    /// Fire-and-forget: the result arrives through [`drain`](Self::drain) as
    /// a [`QueuedAction::CommitMesh`] or [`QueuedAction::BuildFailed`]
    /// carrying the same `build_id`.
    pub fn submit_build(&mut self, coord: Point2<i32>, build_id: u64) {
        self.in_flight += 1;
        let sender = &self.request_senders[self.next_worker];
        self.next_worker = (self.next_worker + 1) % self.request_senders.len();
        sender
            .send(BuildRequest { coord, build_id })
            .expect("mesh build worker disconnected");
    }

    /// Puts an action on the FIFO, to be executed after `frames_to_delay`
    /// further drains.
    pub fn enqueue(&self, action: QueuedAction, frames_to_delay: u32) {
        self.action_tx
            .send(DelayedAction {
                action,
                frames_to_delay,
            })
            .expect("action queue disconnected");
    }

    /// Drains every ready action, invoking `handle` for each.
    ///
    /// Actions still carrying a delay have it decremented and are held for a
    /// later drain. Never blocks: builds still running simply do not appear
    /// this frame.
    pub fn drain(&mut self, mut handle: impl FnMut(QueuedAction)) {
        let mut pending = std::mem::take(&mut self.held);
        while let Ok(entry) = self.action_rx.try_recv() {
            pending.push(entry);
        }

        for mut entry in pending {
            if entry.frames_to_delay > 0 {
                entry.frames_to_delay -= 1;
                self.held.push(entry);
                continue;
            }
            if matches!(
                entry.action,
                QueuedAction::CommitMesh(_) | QueuedAction::BuildFailed { .. }
            ) {
                self.in_flight -= 1;
            }
            handle(entry.action);
        }
    }

    /// Stops the worker pool and forces consumption of everything still on
    /// the FIFO, delayed entries included.
    pub fn shutdown(&mut self, mut handle: impl FnMut(QueuedAction)) {
        self.request_senders.clear();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("mesh build worker terminated with a panic");
            }
        }

        for entry in self.held.drain(..) {
            handle(entry.action);
        }
        while let Ok(entry) = self.action_rx.try_recv() {
            handle(entry.action);
        }
        self.in_flight = 0;
    }
}

impl Drop for BuildPipeline {
    fn drop(&mut self) {
        self.request_senders.clear();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    requests: mpsc::Receiver<BuildRequest>,
    allocator: Arc<RegionAllocator>,
    cache: Arc<FieldCache>,
    terrain: Arc<dyn TerrainSource>,
    actions: mpsc::Sender<DelayedAction>,
) {
    while let Ok(request) = requests.recv() {
        let coord = request.coord;
        let build_id = request.build_id;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            build_mesh(coord, build_id, &allocator, &cache, terrain.as_ref())
        }));

        let action = match outcome {
            Ok(commit) => QueuedAction::CommitMesh(commit),
            Err(payload) => QueuedAction::BuildFailed {
                coord,
                build_id,
                error: BuildError::Panicked(panic_message(payload.as_ref())),
            },
        };
        if actions.send(DelayedAction::immediate(action)).is_err() {
            // Consumer is gone; nothing left to build for.
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builds one chunk's mesh: field from the cache, greedy mesh, region
/// allocation, and byte packing. Runs on a worker thread.
fn build_mesh(
    coord: Point2<i32>,
    build_id: u64,
    allocator: &RegionAllocator,
    cache: &FieldCache,
    terrain: &dyn TerrainSource,
) -> MeshCommit {
    let field_resource = cache.get_or_generate(coord, terrain);
    let field = field_resource.get();

    let mut faces = Vec::new();
    let face_count = GreedyMesher::mesh(&field, |face| faces.push(face));
    let (y_min, y_max) = field.occupied_range().unwrap_or((0, 0));

    if face_count == 0 {
        return MeshCommit {
            coord,
            build_id,
            face_count: 0,
            region: None,
            y_min,
            y_max,
            vertex_bytes: Vec::new(),
            index_bytes: Vec::new(),
        };
    }

    let region = allocator.allocate(face_count as u64);

    let mut vertex_bytes = Vec::with_capacity(face_count * VERTEX_BYTES_PER_FACE as usize);
    let mut index_bytes = Vec::with_capacity(face_count * INDEX_BYTES_PER_FACE as usize);
    for (slot, face) in faces.iter().enumerate() {
        let vertices = face_vertices(coord, face);
        vertex_bytes.extend_from_slice(bytemuck::cast_slice(&vertices));
        // Index values address the shared vertex buffer, so each face's
        // global slot inside the region is baked in here.
        let indices = face_indices(region.offset as u32 + slot as u32);
        index_bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    }

    MeshCommit {
        coord,
        build_id,
        face_count: face_count as u64,
        region: Some(region),
        y_min,
        y_max,
        vertex_bytes,
        index_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::FlatTerrain;
    use std::time::Duration;

    fn small_config() -> StreamerConfig {
        StreamerConfig {
            worker_count: 2,
            field_cache_capacity: 4,
            initial_buffer_capacity: REGION_ALIGNMENT * 2,
            ..StreamerConfig::default()
        }
    }

    fn drain_until(
        pipeline: &mut BuildPipeline,
        mut want: impl FnMut(&QueuedAction) -> bool,
    ) -> Vec<QueuedAction> {
        let mut collected = Vec::new();
        for _ in 0..500 {
            let mut found = false;
            pipeline.drain(|action| {
                if want(&action) {
                    found = true;
                }
                collected.push(action);
            });
            if found {
                return collected;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("expected action never arrived; got {:?}", collected);
    }

    #[test]
    fn build_commits_packed_mesh_bytes() {
        let mut pipeline =
            BuildPipeline::new(&small_config(), Arc::new(FlatTerrain::new(2)));

        pipeline.submit_build(Point2::new(0, 0), 1);
        assert_eq!(pipeline.in_flight(), 1);

        let actions = drain_until(&mut pipeline, |action| {
            matches!(action, QueuedAction::CommitMesh(_))
        });
        assert_eq!(pipeline.in_flight(), 0);

        let commit = actions
            .iter()
            .find_map(|action| match action {
                QueuedAction::CommitMesh(commit) => Some(commit),
                _ => None,
            })
            .unwrap();
        assert_eq!(commit.coord, Point2::new(0, 0));
        assert_eq!(commit.build_id, 1);
        // A flat 64x64 top surface splits into four 32x32 quads.
        assert_eq!(commit.face_count, 4);
        assert!(commit.region.is_some());
        assert_eq!(
            commit.vertex_bytes.len() as u64,
            commit.face_count * VERTEX_BYTES_PER_FACE
        );
        assert_eq!(
            commit.index_bytes.len() as u64,
            commit.face_count * INDEX_BYTES_PER_FACE
        );
    }

    #[test]
    fn empty_terrain_commits_without_a_region() {
        let mut pipeline =
            BuildPipeline::new(&small_config(), Arc::new(FlatTerrain::new(0)));

        pipeline.submit_build(Point2::new(3, -2), 7);
        let actions = drain_until(&mut pipeline, |action| {
            matches!(action, QueuedAction::CommitMesh(_))
        });

        let commit = actions
            .iter()
            .find_map(|action| match action {
                QueuedAction::CommitMesh(commit) => Some(commit),
                _ => None,
            })
            .unwrap();
        assert_eq!(commit.face_count, 0);
        assert!(commit.region.is_none());
        assert!(commit.vertex_bytes.is_empty());
    }

    #[test]
    fn worker_panics_surface_as_build_failures() {
        struct BrokenTerrain;
        impl TerrainSource for BrokenTerrain {
            fn height(&self, _x: i32, _z: i32) -> i32 {
                panic!("terrain source exploded")
            }
        }

        let mut pipeline = BuildPipeline::new(&small_config(), Arc::new(BrokenTerrain));
        pipeline.submit_build(Point2::new(1, 1), 9);

        let actions = drain_until(&mut pipeline, |action| {
            matches!(action, QueuedAction::BuildFailed { .. })
        });
        assert_eq!(pipeline.in_flight(), 0);

        let (build_id, error) = actions
            .iter()
            .find_map(|action| match action {
                QueuedAction::BuildFailed {
                    build_id, error, ..
                } => Some((*build_id, error)),
                _ => None,
            })
            .unwrap();
        assert_eq!(build_id, 9);
        assert!(error.to_string().contains("terrain source exploded"));
    }

    #[test]
    fn delayed_actions_execute_one_drain_later() {
        let mut pipeline =
            BuildPipeline::new(&small_config(), Arc::new(FlatTerrain::new(0)));

        pipeline.enqueue(
            QueuedAction::ReleaseChunk {
                buffer_index: Some(3),
                region: None,
            },
            1,
        );

        let mut released = Vec::new();
        pipeline.drain(|action| released.push(action));
        assert!(released.is_empty(), "held for one frame");

        pipeline.drain(|action| released.push(action));
        assert!(matches!(
            released.as_slice(),
            [QueuedAction::ReleaseChunk {
                buffer_index: Some(3),
                ..
            }]
        ));
    }

    #[test]
    fn allocator_growth_posts_a_resize_action() {
        let mut pipeline =
            BuildPipeline::new(&small_config(), Arc::new(FlatTerrain::new(0)));

        let initial = pipeline.allocator().capacity();
        let _big = pipeline.allocator().allocate(initial + 1);

        let mut resizes = Vec::new();
        pipeline.drain(|action| {
            if let QueuedAction::BuffersResized { capacity_faces } = action {
                resizes.push(capacity_faces);
            }
        });
        assert_eq!(resizes.len(), 1);
        assert!(resizes[0] > initial);
        assert_eq!(pipeline.allocator().capacity(), resizes[0]);
    }

    #[test]
    fn shutdown_consumes_held_entries() {
        let mut pipeline =
            BuildPipeline::new(&small_config(), Arc::new(FlatTerrain::new(0)));
        pipeline.enqueue(
            QueuedAction::ReleaseChunk {
                buffer_index: Some(1),
                region: None,
            },
            5,
        );
        pipeline.drain(|_| panic!("still delayed"));

        let mut seen = 0;
        pipeline.shutdown(|_| seen += 1);
        assert_eq!(seen, 1);
    }
}

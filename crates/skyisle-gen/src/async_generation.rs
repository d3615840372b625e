//! Asynchronous chunk population on a fixed worker pool.
//!
//! Requests travel through a bounded channel to worker threads that share one
//! [`ChunkGenerator`]; finished columns come back through a second bounded
//! channel and are collected with [`AsyncChunkGenerator::drain_results`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashSet;
use skyisle_config::WorkerConfig;
use skyisle_coords::ChunkPos;
use skyisle_voxel::ChunkColumn;

use crate::pipeline::{ChunkGenerator, ChunkReport, GenerationError};

/// A request to populate a single chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationTask {
    pub chunk: ChunkPos,
}

/// A populated chunk, or the error that aborted it.
#[derive(Debug)]
pub struct GeneratedChunk {
    pub chunk: ChunkPos,
    pub result: Result<(ChunkColumn, ChunkReport), GenerationError>,
    /// Generation time in microseconds (for profiling).
    pub generation_time_us: u64,
}

/// Manages chunk population across a thread pool.
pub struct AsyncChunkGenerator {
    task_sender: Sender<GenerationTask>,
    result_receiver: Receiver<GeneratedChunk>,
    /// Chunks submitted and not yet drained.
    pending: Arc<DashSet<ChunkPos>>,
    in_flight: Arc<AtomicU64>,
}

impl AsyncChunkGenerator {
    /// Spawns `thread_count` workers sharing `generator`.
    ///
    /// At most `queue_capacity` requests wait in the queue; further
    /// submissions are rejected until workers catch up. Up to
    /// `result_capacity` finished chunks are buffered for draining.
    ///
    /// # Errors
    ///
    /// Fails if a worker thread cannot be spawned.
    pub fn new(
        generator: ChunkGenerator,
        thread_count: usize,
        queue_capacity: usize,
        result_capacity: usize,
    ) -> std::io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<GenerationTask>(queue_capacity.max(1));
        let (result_sender, result_receiver) = bounded::<GeneratedChunk>(result_capacity.max(1));
        let in_flight = Arc::new(AtomicU64::new(0));
        let generator = Arc::new(generator);

        for index in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let generator = Arc::clone(&generator);

            std::thread::Builder::new()
                .name(format!("chunk-gen-worker-{index}"))
                .spawn(move || {
                    while let Ok(task) = receiver.recv() {
                        let start = std::time::Instant::now();
                        let result = generator.generate_column(task.chunk);
                        let elapsed = start.elapsed().as_micros() as u64;

                        if let Err(err) = &result {
                            tracing::error!("Chunk {} failed: {}", task.chunk, err);
                        }
                        let _ = sender.send(GeneratedChunk {
                            chunk: task.chunk,
                            result,
                            generation_time_us: elapsed,
                        });

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })?;
        }

        tracing::debug!("Started {} chunk generation workers", thread_count.max(1));

        Ok(Self {
            task_sender,
            result_receiver,
            pending: Arc::new(DashSet::new()),
            in_flight,
        })
    }

    /// Creates a pool with one worker per CPU core, minus one.
    pub fn with_defaults(generator: ChunkGenerator) -> std::io::Result<Self> {
        let threads = num_cpus::get().max(2) - 1;
        Self::new(generator, threads, 64, 128)
    }

    /// Creates a pool sized by the worker section of the configuration.
    pub fn from_config(generator: ChunkGenerator, config: &WorkerConfig) -> std::io::Result<Self> {
        let threads = if config.threads == 0 {
            num_cpus::get().max(2) - 1
        } else {
            config.threads
        };
        Self::new(
            generator,
            threads,
            config.queue_capacity,
            config.result_capacity,
        )
    }

    /// Submits a chunk for background population.
    ///
    /// Returns `Err(task)` if the queue is full.
    pub fn submit(&self, task: GenerationTask) -> Result<(), GenerationTask> {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(task.chunk);
        self.task_sender.try_send(task).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            let task = e.into_inner();
            self.pending.remove(&task.chunk);
            task
        })
    }

    /// Drains all finished chunks.
    pub fn drain_results(&self) -> Vec<GeneratedChunk> {
        let mut results = Vec::new();
        while let Ok(chunk) = self.result_receiver.try_recv() {
            self.pending.remove(&chunk.chunk);
            results.push(chunk);
        }
        results
    }

    /// Number of tasks currently queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns `true` if `chunk` was submitted and its result not yet drained.
    pub fn is_pending(&self, chunk: &ChunkPos) -> bool {
        self.pending.contains(chunk)
    }
}

//! Memory management for mesh data inside large shared buffers.
//!
//! Every chunk's mesh lives somewhere inside a small number of big GPU-style
//! buffers, so mesh commits and draw calls never create or destroy buffer
//! objects. This module hands out the *where*: aligned integer ranges
//! ("regions") carved from a logical capacity by a first-fit free-list
//! allocator.
//!
//! # Design
//! - Free ranges are kept in a vector sorted by offset, disjoint and
//!   maximally coalesced. Indices into a sorted `Vec` replace linked nodes:
//!   the structure stays trivially relocatable and easy to inspect in a
//!   debugger.
//! - All sizes are rounded up to [`REGION_ALIGNMENT`] before bookkeeping.
//!   The returned [`Region`] still reports the caller's requested length.
//! - Running out of capacity is not a failure. The allocator asks its growth
//!   callback for a larger logical capacity and retries; the physical buffer
//!   resize happens later on the consumer thread.

use std::sync::Mutex;

use log::debug;

/// Allocation granularity, in allocator units. Requests and frees are rounded
/// up to a multiple of this before touching the free list.
pub const REGION_ALIGNMENT: u64 = 4096;

/// A contiguous allocated range inside the shared buffers.
///
/// `len` is the length the caller asked for, not the internally rounded
/// length; passing the region back to [`RegionAllocator::free`] re-rounds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// First unit of the range. Always a multiple of [`REGION_ALIGNMENT`].
    pub offset: u64,
    /// Requested length of the range, in units.
    pub len: u64,
}

/// A free range in the allocator's bookkeeping. Nodes never overlap, never
/// touch, and are sorted ascending by offset.
#[derive(Clone, Copy, Debug)]
struct FreeNode {
    offset: u64,
    len: u64,
}

struct AllocState {
    free: Vec<FreeNode>,
    capacity: u64,
}

/// First-fit free-list allocator over a growable logical capacity.
///
/// Thread-safe: a single internal mutex serializes concurrent callers.
/// Worker threads allocate while meshing; the consumer thread frees when
/// chunks are destroyed.
///
/// # Growth
/// When no free node can satisfy a request, the allocator invokes its growth
/// callback with the current capacity and expects a strictly larger new
/// capacity back. The added range is appended to the free list (merging with
/// the tail when contiguous) and the request is retried. Growth failing
/// altogether is fatal and propagates as a panic from the callback.
pub struct RegionAllocator {
    state: Mutex<AllocState>,
    grow: Box<dyn Fn(u64) -> u64 + Send + Sync>,
}

fn round_up(value: u64) -> u64 {
    value.div_ceil(REGION_ALIGNMENT) * REGION_ALIGNMENT
}

impl RegionAllocator {
    /// Creates an allocator over `capacity` units, all free.
    ///
    /// # Arguments
    /// * `capacity` - Initial logical capacity; rounded up to the alignment
    /// * `grow` - Callback invoked when a request cannot be satisfied; takes
    ///   the current capacity and returns the new, strictly larger capacity
    pub fn new(capacity: u64, grow: impl Fn(u64) -> u64 + Send + Sync + 'static) -> Self {
        let capacity = round_up(capacity);
        let free = if capacity > 0 {
            vec![FreeNode {
                offset: 0,
                len: capacity,
            }]
        } else {
            Vec::new()
        };

        RegionAllocator {
            state: Mutex::new(AllocState { free, capacity }),
            grow: Box::new(grow),
        }
    }

    /// Allocates `len` units and returns the reserved region.
    ///
    /// Scans the sorted free list head to tail and carves the rounded size
    /// off the front of the first node that fits. If no node fits, grows the
    /// capacity and retries until one does.
    ///
    /// # Panics
    /// Panics if the growth callback does not increase the capacity.
    pub fn allocate(&self, len: u64) -> Region {
        let rounded = round_up(len);
        let mut state = self.state.lock().unwrap();

        loop {
            if let Some(index) = state.free.iter().position(|node| node.len >= rounded) {
                let node = &mut state.free[index];
                let offset = node.offset;
                node.offset += rounded;
                node.len -= rounded;
                if node.len < REGION_ALIGNMENT {
                    state.free.remove(index);
                }
                return Region { offset, len };
            }

            let current = state.capacity;
            let new_capacity = round_up((self.grow)(current));
            assert!(
                new_capacity > current,
                "buffer growth callback returned {} units for a capacity of {}",
                new_capacity,
                current
            );
            debug!(
                "mesh buffer capacity grown from {} to {} units",
                current, new_capacity
            );

            let added = FreeNode {
                offset: current,
                len: new_capacity - current,
            };
            match state.free.last_mut() {
                Some(tail) if tail.offset + tail.len == added.offset => tail.len += added.len,
                _ => state.free.push(added),
            }
            state.capacity = new_capacity;
        }
    }

    /// Returns a previously allocated region to the free list.
    ///
    /// The freed range is merged with the preceding and/or following free
    /// node when contiguous, so free space is always maximally coalesced.
    pub fn free(&self, region: Region) {
        let rounded = round_up(region.len);
        if rounded == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap();

        let index = state
            .free
            .iter()
            .position(|node| node.offset > region.offset)
            .unwrap_or(state.free.len());

        let merges_prev = index > 0 && {
            let prev = &state.free[index - 1];
            debug_assert!(
                prev.offset + prev.len <= region.offset,
                "double free or overlapping free at offset {}",
                region.offset
            );
            prev.offset + prev.len == region.offset
        };
        let merges_next = index < state.free.len() && {
            let next = &state.free[index];
            debug_assert!(
                region.offset + rounded <= next.offset,
                "double free or overlapping free at offset {}",
                region.offset
            );
            region.offset + rounded == next.offset
        };

        match (merges_prev, merges_next) {
            (true, true) => {
                // Freed range bridges two nodes; collapse to a single one.
                let next_len = state.free[index].len;
                state.free[index - 1].len += rounded + next_len;
                state.free.remove(index);
            }
            (true, false) => state.free[index - 1].len += rounded,
            (false, true) => {
                let next = &mut state.free[index];
                next.offset = region.offset;
                next.len += rounded;
            }
            (false, false) => state.free.insert(
                index,
                FreeNode {
                    offset: region.offset,
                    len: rounded,
                },
            ),
        }
    }

    /// Current logical capacity, in units.
    pub fn capacity(&self) -> u64 {
        self.state.lock().unwrap().capacity
    }

    /// Total free units across all free nodes.
    pub fn free_units(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.free.iter().map(|node| node.len).sum()
    }

    /// Number of nodes in the free list. Mostly useful for diagnostics and
    /// coalescing checks.
    pub fn free_node_count(&self) -> usize {
        self.state.lock().unwrap().free.len()
    }
}

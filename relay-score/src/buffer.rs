use rand::Rng;
use std::collections::VecDeque;

/// Ordered sequence of observation vectors with a fixed eviction policy.
pub enum RollingBuffer {
    /// Plain ring buffer: oldest entry evicted on overflow.
    DropOldest {
        entries: VecDeque<Vec<f64>>,
        capacity: usize,
    },
    /// Reservoir sampler: preserves a uniform sample of the full stream
    /// once the buffer has filled, rather than always keeping the most
    /// recent entries.
    Reservoir {
        entries: Vec<Vec<f64>>,
        capacity: usize,
        seen: u64,
    },
}

impl RollingBuffer {
    pub fn new(capacity: usize, use_reservoir: bool) -> Self {
        if use_reservoir {
            RollingBuffer::Reservoir {
                entries: Vec::with_capacity(capacity),
                capacity,
                seen: 0,
            }
        } else {
            RollingBuffer::DropOldest {
                entries: VecDeque::with_capacity(capacity),
                capacity,
            }
        }
    }

    pub fn push(&mut self, vector: Vec<f64>) {
        match self {
            RollingBuffer::DropOldest { entries, capacity } => {
                entries.push_back(vector);
                while entries.len() > *capacity {
                    entries.pop_front();
                }
            }
            RollingBuffer::Reservoir {
                entries,
                capacity,
                seen,
            } => {
                *seen += 1;
                if entries.len() < *capacity {
                    entries.push(vector);
                } else {
                    let idx = rand::rng().random_range(0..*seen as usize);
                    if idx < *capacity {
                        entries[idx] = vector;
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RollingBuffer::DropOldest { entries, .. } => entries.len(),
            RollingBuffer::Reservoir { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of the buffer's contents, taken under the
    /// caller's lock and then used lock-free by the retrain routine.
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        match self {
            RollingBuffer::DropOldest { entries, .. } => entries.iter().cloned().collect(),
            RollingBuffer::Reservoir { entries, .. } => entries.clone(),
        }
    }
}

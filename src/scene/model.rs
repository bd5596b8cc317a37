//! Voxel model grid

/// A 3-dimensional grid of palette indices
///
/// Storage is x-fastest, then y, then z:
/// `index = x + y * size_x + z * size_x * size_y`. A voxel of 0 is empty;
/// any other value indexes the scene palette. `voxel_hash` is a rolling
/// hash over the raw grid used to accelerate duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
    pub voxel_hash: u32,
    pub voxels: Vec<u8>,
}

impl Model {
    /// Create an all-empty grid of the given dimensions
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        let voxels = vec![0u8; (size_x * size_y * size_z) as usize];
        let voxel_hash = voxel_hash(&voxels);
        Self {
            size_x,
            size_y,
            size_z,
            voxel_hash,
            voxels,
        }
    }

    /// Grid index for a coordinate triple
    #[inline]
    pub fn voxel_index(&self, x: u32, y: u32, z: u32) -> usize {
        (x + y * self.size_x + z * self.size_x * self.size_y) as usize
    }

    /// Color index at a coordinate, or `None` outside the grid
    pub fn voxel_at(&self, x: u32, y: u32, z: u32) -> Option<u8> {
        if x < self.size_x && y < self.size_y && z < self.size_z {
            Some(self.voxels[self.voxel_index(x, y, z)])
        } else {
            None
        }
    }

    /// Set a voxel and leave the hash stale; call [`Self::rehash`] after
    /// a batch of edits
    pub fn set_voxel(&mut self, x: u32, y: u32, z: u32, color_index: u8) {
        let index = self.voxel_index(x, y, z);
        self.voxels[index] = color_index;
    }

    /// Recompute the content hash after the grid changed
    pub fn rehash(&mut self) {
        self.voxel_hash = voxel_hash(&self.voxels);
    }

    /// Number of non-empty voxels
    pub fn solid_voxel_count(&self) -> u32 {
        self.voxels.iter().filter(|&&v| v != 0).count() as u32
    }

    /// Content-wise equality: hash first, then dimensions, then bytes
    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        self.voxel_hash == other.voxel_hash
            && self.size_x == other.size_x
            && self.size_y == other.size_y
            && self.size_z == other.size_z
            && self.voxels == other.voxels
    }
}

/// Rolling content hash over a raw voxel grid
pub(crate) fn voxel_hash(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |hash, &byte| u32::from(byte).wrapping_add(hash.wrapping_mul(65559)))
}

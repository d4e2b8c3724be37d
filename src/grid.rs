//! Grid geometry, dispatch batching and ping-pong bookkeeping.

/// Batch size for grid-indexed passes (one invocation per cell).
pub const GRID_WORKGROUP: (u32, u32) = (16, 16);

/// Batch size for particle-indexed passes (one invocation per particle).
pub const PARTICLE_WORKGROUP: u32 = 256;

/// Number of batches needed to cover `extent` invocations.
///
/// Rounds up; kernels bounds-check the tail batch.
#[inline]
pub fn workgroup_count(extent: u32, size: u32) -> u32 {
    extent.div_ceil(size)
}

/// Extent of the simulated grid in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of cells.
    #[inline]
    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Flat index of `(x, y)`, row-major: `x + width * y`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        x as usize + self.width as usize * y as usize
    }

    /// Cell under a continuous position, truncating toward zero.
    ///
    /// `None` when the position is outside `[0, width) x [0, height)`.
    #[inline]
    pub fn cell_at(&self, x: f32, y: f32) -> Option<(u32, u32)> {
        if x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32 {
            // Guard against rounding up at the far edge.
            let cx = (x as u32).min(self.width - 1);
            let cy = (y as u32).min(self.height - 1);
            Some((cx, cy))
        } else {
            None
        }
    }

    /// Dispatch size covering every cell in [`GRID_WORKGROUP`] batches.
    pub fn workgroups(&self) -> (u32, u32) {
        (
            workgroup_count(self.width, GRID_WORKGROUP.0),
            workgroup_count(self.height, GRID_WORKGROUP.1),
        )
    }

    /// Resolution as the `ivec2` the kernels receive.
    pub fn as_ivec2(&self) -> [i32; 2] {
        [self.width as i32, self.height as i32]
    }
}

/// One of the two buffers of a ping-pong pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    A,
    B,
}

impl Slot {
    /// The other buffer of the pair.
    #[inline]
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Which slot a pass reads and which it writes.
///
/// Only constructed through [`GridRoles::reading`], so `read != write`
/// always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRoles {
    read: Slot,
    write: Slot,
}

impl GridRoles {
    /// Roles for a frame whose readable ("previous") buffer is `read`.
    pub fn reading(read: Slot) -> Self {
        Self {
            read,
            write: read.other(),
        }
    }

    #[inline]
    pub fn read(&self) -> Slot {
        self.read
    }

    #[inline]
    pub fn write(&self) -> Slot {
        self.write
    }
}

/// Two owned buffers addressed by [`Slot`].
///
/// Holds no role state of its own; whoever owns the dispatch order decides
/// which slot is "previous" each frame.
#[derive(Clone, Debug)]
pub struct PingPong<T> {
    buffers: [T; 2],
}

impl<T> PingPong<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { buffers: [a, b] }
    }

    #[inline]
    pub fn get(&self, slot: Slot) -> &T {
        &self.buffers[slot.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        &mut self.buffers[slot.index()]
    }

    /// Borrow the read side shared and the write side exclusively.
    pub fn split(&mut self, roles: GridRoles) -> (&T, &mut T) {
        let [a, b] = &mut self.buffers;
        match roles.read() {
            Slot::A => (&*a, b),
            Slot::B => (&*b, a),
        }
    }
}

impl<T: Clone> PingPong<T> {
    /// Two copies of `value`.
    pub fn splat(value: T) -> Self {
        Self::new(value.clone(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(1280, 16), 80);
        assert_eq!(workgroup_count(720, 16), 45);
        assert_eq!(workgroup_count(721, 16), 46);
        assert_eq!(workgroup_count(1, 256), 1);
        assert_eq!(workgroup_count(0, 256), 0);
    }

    #[test]
    fn test_index_linearization() {
        let size = GridSize::new(1280, 720);
        assert_eq!(size.index(0, 0), 0);
        assert_eq!(size.index(5, 0), 5);
        assert_eq!(size.index(3, 2), 3 + 1280 * 2);
        assert_eq!(size.index(1279, 719), size.cells() - 1);
    }

    #[test]
    fn test_cell_at() {
        let size = GridSize::new(4, 3);
        assert_eq!(size.cell_at(0.0, 0.0), Some((0, 0)));
        assert_eq!(size.cell_at(3.99, 2.5), Some((3, 2)));
        assert_eq!(size.cell_at(4.0, 0.0), None);
        assert_eq!(size.cell_at(-0.1, 0.0), None);
        assert_eq!(size.cell_at(0.0, 3.0), None);
    }

    #[test]
    fn test_roles_never_alias() {
        for slot in [Slot::A, Slot::B] {
            let roles = GridRoles::reading(slot);
            assert_ne!(roles.read(), roles.write());
            assert_eq!(roles.read(), slot);
        }
    }

    #[test]
    fn test_ping_pong_split() {
        let mut pair = PingPong::new(vec![1], vec![2]);

        let (read, write) = pair.split(GridRoles::reading(Slot::A));
        assert_eq!(read, &vec![1]);
        write[0] = 20;
        assert_eq!(pair.get(Slot::B), &vec![20]);

        let (read, write) = pair.split(GridRoles::reading(Slot::B));
        assert_eq!(read, &vec![20]);
        write[0] = 10;
        assert_eq!(pair.get(Slot::A), &vec![10]);
    }
}

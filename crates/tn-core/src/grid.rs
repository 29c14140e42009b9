//! Grid shape and flat state-vector layout.
//!
//! A tank network state is one flat vector of `3 * rows * cols` reals split
//! into three contiguous blocks (level, outflow, inflow). Every routine that
//! reads or writes a state goes through [`StateLayout`] so residual and
//! Jacobian code can never disagree on the mapping
//! `index = block_offset + cols * row + col`.

use crate::error::{TnError, TnResult};
use crate::numeric::Real;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position of one tank in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TankIndex {
    pub row: usize,
    pub col: usize,
}

impl TankIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Fixed `(rows, cols)` dimensions of a tank array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridShape {
    rows: usize,
    cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> TnResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(TnError::InvalidArg {
                what: "grid must contain at least one tank",
            });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of tanks.
    pub fn tanks(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, tank: TankIndex) -> bool {
        tank.row < self.rows && tank.col < self.cols
    }

    /// Row-major flat index of a tank.
    pub fn flat(&self, tank: TankIndex) -> TnResult<usize> {
        if !self.contains(tank) {
            return Err(TnError::IndexOob {
                what: if tank.row >= self.rows { "row" } else { "col" },
                index: if tank.row >= self.rows {
                    tank.row
                } else {
                    tank.col
                },
                len: if tank.row >= self.rows {
                    self.rows
                } else {
                    self.cols
                },
            });
        }
        Ok(self.cols * tank.row + tank.col)
    }

    /// Inverse of [`GridShape::flat`]. Caller guarantees `k < tanks()`.
    pub fn tank(&self, k: usize) -> TankIndex {
        TankIndex {
            row: k / self.cols,
            col: k % self.cols,
        }
    }

    /// Tanks in row-major order, i.e. in topological order of the routing.
    pub fn iter(&self) -> impl Iterator<Item = TankIndex> + '_ {
        (0..self.tanks()).map(move |k| self.tank(k))
    }

    /// Flat index of the tank above, if any.
    pub fn up(&self, k: usize) -> Option<usize> {
        (k >= self.cols).then(|| k - self.cols)
    }

    /// Flat index of the tank to the left, if any.
    pub fn left(&self, k: usize) -> Option<usize> {
        (k % self.cols != 0).then(|| k - 1)
    }
}

/// One of the three contiguous blocks of a state vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    /// Water level `h`.
    Level,
    /// Outflow `Qout`.
    Outflow,
    /// Inflow `Qin`.
    Inflow,
}

impl Block {
    pub const ALL: [Block; 3] = [Block::Level, Block::Outflow, Block::Inflow];

    fn ordinal(self) -> usize {
        match self {
            Block::Level => 0,
            Block::Outflow => 1,
            Block::Inflow => 2,
        }
    }
}

/// Typed accessor over the flat `[h | Qout | Qin]` state layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLayout {
    shape: GridShape,
}

impl StateLayout {
    pub fn new(shape: GridShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn state_len(&self) -> usize {
        3 * self.shape.tanks()
    }

    pub fn control_len(&self) -> usize {
        self.shape.tanks()
    }

    pub fn offset(&self, block: Block) -> usize {
        block.ordinal() * self.shape.tanks()
    }

    pub fn index(&self, block: Block, row: usize, col: usize) -> TnResult<usize> {
        Ok(self.offset(block) + self.shape.flat(TankIndex::new(row, col))?)
    }

    fn check_state(&self, x: &[Real]) -> TnResult<()> {
        crate::numeric::ensure_len(x, self.state_len(), "state vector")
    }

    pub fn block<'a>(&self, x: &'a [Real], block: Block) -> TnResult<&'a [Real]> {
        self.check_state(x)?;
        let n = self.shape.tanks();
        let start = self.offset(block);
        Ok(&x[start..start + n])
    }

    pub fn block_mut<'a>(&self, x: &'a mut [Real], block: Block) -> TnResult<&'a mut [Real]> {
        self.check_state(x)?;
        let n = self.shape.tanks();
        let start = self.offset(block);
        Ok(&mut x[start..start + n])
    }

    /// Borrow all three blocks at once: `(h, qout, qin)`.
    pub fn split_mut<'a>(
        &self,
        x: &'a mut [Real],
    ) -> TnResult<(&'a mut [Real], &'a mut [Real], &'a mut [Real])> {
        self.check_state(x)?;
        let n = self.shape.tanks();
        let (h, rest) = x.split_at_mut(n);
        let (qout, qin) = rest.split_at_mut(n);
        Ok((h, qout, qin))
    }

    pub fn get(&self, x: &[Real], block: Block, row: usize, col: usize) -> TnResult<Real> {
        self.check_state(x)?;
        Ok(x[self.index(block, row, col)?])
    }

    pub fn get_mut<'a>(
        &self,
        x: &'a mut [Real],
        block: Block,
        row: usize,
        col: usize,
    ) -> TnResult<&'a mut Real> {
        self.check_state(x)?;
        let i = self.index(block, row, col)?;
        Ok(&mut x[i])
    }
}

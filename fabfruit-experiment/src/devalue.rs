//! Which blocks each box is devalued at, for SOA and DD.
//!
//! Nine blocks with two devalued boxes each give eighteen slots, which six
//! boxes fill three times each. Boxes are drawn greedily from the blocks
//! that still have room; a draw that paints itself into a corner is thrown
//! away and started over.

use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::error::{DesignError, Result};

/// Upper bound on restarts before the draw is declared hopeless.
pub const MAX_DRAW_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevaluationDraw {
    pub blocks: usize,
    /// Blocks each box spends devalued.
    pub per_box: usize,
    pub boxes: usize,
    /// Boxes devalued at every block.
    pub per_block: usize,
}

impl DevaluationDraw {
    /// Check that the slots boxes need equal the slots blocks offer.
    pub fn new(blocks: usize, per_box: usize, boxes: usize, per_block: usize) -> Result<Self> {
        let draw = Self {
            blocks,
            per_box,
            boxes,
            per_block,
        };
        let needed = per_box.checked_mul(boxes);
        let offered = per_block.checked_mul(blocks);
        let balanced = needed.is_some() && needed == offered;
        if blocks == 0 || boxes == 0 || !balanced || per_box > blocks || per_block > boxes {
            return Err(DesignError::Infeasible {
                blocks,
                per_box,
                boxes,
                per_block,
            });
        }
        Ok(draw)
    }

    /// Sorted devalued block indices for every box, in box order.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec<usize>>> {
        for attempt in 1..=MAX_DRAW_ATTEMPTS {
            if let Some(assignment) = self.try_draw(rng) {
                debug!(attempt, ?assignment, "devaluation draw");
                return Ok(assignment);
            }
            debug!(attempt, "bad devaluation draw, redrawing");
        }
        Err(DesignError::DrawExhausted {
            attempts: MAX_DRAW_ATTEMPTS,
        })
    }

    fn try_draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<Vec<usize>>> {
        let mut per_block_count = vec![0usize; self.blocks];
        let mut assignment = Vec::with_capacity(self.boxes);

        for _ in 0..self.boxes {
            let open: Vec<usize> = per_block_count
                .iter()
                .enumerate()
                .filter(|(_, n)| **n < self.per_block)
                .map(|(block, _)| block)
                .collect();
            if open.len() < self.per_box {
                return None;
            }

            let mut picked: Vec<usize> = index::sample(rng, open.len(), self.per_box)
                .into_iter()
                .map(|i| open[i])
                .collect();
            picked.sort_unstable();
            for block in &picked {
                per_block_count[*block] += 1;
            }
            assignment.push(picked);
        }
        Some(assignment)
    }
}

/// Devalued blocks for each of `boxes` boxes. See [`DevaluationDraw`].
pub fn devalued_blocks<R: Rng + ?Sized>(
    blocks: usize,
    per_box: usize,
    boxes: usize,
    per_block: usize,
    rng: &mut R,
) -> Result<Vec<Vec<usize>>> {
    DevaluationDraw::new(blocks, per_box, boxes, per_block)?.generate(rng)
}

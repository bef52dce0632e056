//! Per-tree bootstrap sampling.

use rand::Rng;
use rand::seq::SliceRandom;

/// A tree's in-bag sample and its out-of-bag complement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub(crate) in_bag: Vec<usize>,
    pub(crate) out_of_bag: Vec<usize>,
}

impl Bootstrap {
    /// Draw `draw_count` in-bag indices from `0..n_samples`.
    ///
    /// With `replace`, indices are drawn independently and uniformly, so
    /// duplicates are possible. Without it, a uniform random permutation of
    /// `0..n_samples` is truncated to `draw_count`. The out-of-bag set holds
    /// every index that was never drawn. Both lists are ascending.
    pub fn draw(
        n_samples: usize,
        draw_count: usize,
        replace: bool,
        rng: &mut impl Rng,
    ) -> Self {
        let mut in_bag = if replace {
            (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
        } else {
            let mut all: Vec<usize> = (0..n_samples).collect();
            all.shuffle(rng);
            all.truncate(draw_count);
            all
        };
        in_bag.sort_unstable();

        let mut drawn = vec![false; n_samples];
        for &idx in &in_bag {
            drawn[idx] = true;
        }
        let out_of_bag = (0..n_samples).filter(|&i| !drawn[i]).collect();

        Self { in_bag, out_of_bag }
    }

    /// In-bag sample indices (with multiplicity when drawn with replacement).
    #[must_use]
    pub fn in_bag(&self) -> &[usize] {
        &self.in_bag
    }

    /// Out-of-bag sample indices.
    #[must_use]
    pub fn out_of_bag(&self) -> &[usize] {
        &self.out_of_bag
    }
}

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub const SIZES: [u32; 3] = [1_024, 8_192, 65_536];
pub const OPS_PER_SIZE: usize = 5_000;

const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

fn mix_seed(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn rng_for(kind: u64, size: u32) -> StdRng {
    let seed = 0x5EED_2026
        ^ (kind.wrapping_mul(SEED_MIX))
        ^ u64::from(size).wrapping_mul(SEED_MIX.rotate_left(17));
    StdRng::seed_from_u64(mix_seed(seed))
}

#[derive(Clone, Copy, Debug)]
pub enum Op {
    FindRoot(u32),
    /// Cut the child and relink it below its old parent; always legal.
    Toggle(u32, u32),
}

#[derive(Clone, Debug)]
pub struct Case {
    pub n: u32,
    pub links: Vec<(u32, u32)>,
    pub ops: Vec<Op>,
}

pub fn generate_lookup_case(n: u32) -> Case {
    let mut rng = rng_for(1, n);
    let mut links: Vec<(u32, u32)> = (1..n).map(|i| (i, rng.random_range(0..i))).collect();
    links.shuffle(&mut rng);
    links.truncate(links.len() / 2);

    let mut ops = Vec::with_capacity(OPS_PER_SIZE);
    for _ in 0..OPS_PER_SIZE {
        if rng.random_range(0..100_u32) < 70 || links.is_empty() {
            ops.push(Op::FindRoot(rng.random_range(0..n)));
        } else {
            let (u, p) = links[rng.random_range(0..links.len())];
            ops.push(Op::Toggle(u, p));
        }
    }
    Case { n, links, ops }
}

/// Complete binary tree plus one lookup per node, for the multi-threaded
/// throughput runs.
pub fn generate_mt_case(n: u32) -> Case {
    let mut rng = rng_for(2, n);
    let links: Vec<(u32, u32)> = (1..n).map(|i| (i, (i - 1) / 2)).collect();
    let mut lookups: Vec<u32> = (0..n).collect();
    lookups.shuffle(&mut rng);
    let ops = lookups.into_iter().map(Op::FindRoot).collect();
    Case { n, links, ops }
}

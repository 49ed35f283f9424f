//! Random distributed scalar encoding.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::EncoderParams;
use crate::sdr::Sdr;

/// Encodes scalars into `size` bits, `active_bits` of them active.
///
/// The real line is cut in buckets of width `resolution`. A value activates
/// the bits of `active_bits` consecutive buckets, starting from its own, each
/// bucket drawing its bit from a generator keyed by the seed and the bucket. Values a few buckets apart thus
/// share most of their bits, while distant values share almost none. There
/// is no bound on the range of encodable values.
#[derive(Debug, Clone)]
pub struct RandomDistributedScalarEncoder {
    size: usize,
    active_bits: usize,
    resolution: f64,
    seed: u64,
}

impl RandomDistributedScalarEncoder {
    /// Create a new encoder
    pub fn new(params: &EncoderParams) -> RandomDistributedScalarEncoder {
        RandomDistributedScalarEncoder {
            size: params.size,
            active_bits: params.active_bits,
            resolution: params.resolution,
            seed: params.seed,
        }
    }

    /// Width of the encodings.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Width of a bucket.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Encode a value. Non finite values yield an empty pattern.
    ///
    /// Buckets drawing the same bit may leave slightly fewer than
    /// `active_bits` bits active.
    pub fn encode(&self, value: f64) -> Sdr {
        if !value.is_finite() {
            return Sdr::new(self.size);
        }
        let bucket = (value / self.resolution).floor() as i64;
        Sdr::from_active(
            self.size,
            (0..self.active_bits as i64).map(|offset| self.bit(bucket.wrapping_add(offset))),
        )
    }

    fn bit(&self, bucket: i64) -> usize {
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&self.seed.to_le_bytes());
        key[8..16].copy_from_slice(&bucket.to_le_bytes());
        StdRng::from_seed(key).gen_range(0..self.size)
    }
}

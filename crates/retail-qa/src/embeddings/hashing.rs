//! Deterministic bag-of-words embedder.
//!
//! Hashes word tokens and character trigrams into a fixed number of buckets
//! with 64-bit FNV-1a, so vectors are stable across builds and toolchains.
//! No model files, so it doubles as the offline default and the test double
//! for anything that needs an `EmbeddingModel`.

use anyhow::Result;

use super::{normalize, EmbeddingModel};

const TRIGRAM_WEIGHT: f32 = 0.3;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token.as_bytes()) % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EmbeddingModel for HashingEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            embedding[self.bucket(word)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let trigram: String = window.iter().collect();
                    embedding[self.bucket(&format!("#{}", trigram))] += TRIGRAM_WEIGHT;
                }
            }
        }

        Ok(normalize(embedding))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

use common::model::record::GenerationId;
use std::collections::HashSet;
use uuid::Uuid;

/// Lowercase Crockford base32: no `i`, `l`, `o` or `u`, so IDs survive being read aloud or retyped.
const ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Characters per ID. 16 symbols of 5 bits drawn from a v4 UUID give 74 random bits.
pub const ID_LENGTH: usize = 16;

/// Issues generation IDs for one job.
///
/// Every ID handed out is remembered, so a job never sees the same value twice
/// even in the astronomically unlikely event of a random collision.
#[derive(Debug, Default)]
pub struct IdAllocator {
    issued: HashSet<GenerationId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> GenerationId {
        loop {
            let candidate = GenerationId::new(encode(Uuid::new_v4()));
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }
}

fn encode(uuid: Uuid) -> String {
    let mut bits = uuid.as_u128();
    let mut out = String::with_capacity(ID_LENGTH);
    for _ in 0..ID_LENGTH {
        out.push(ALPHABET[(bits & 0x1f) as usize] as char);
        bits >>= 5;
    }
    out
}

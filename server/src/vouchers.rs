//! Voucher code generation.
//!
//! Vouchers are issued at the moment payment succeeds. The generator is
//! injected through the booking environment so tests can pin the codes; the
//! aggregate itself enforces uniqueness against the set of every code ever
//! issued, so a (vanishingly unlikely) random collision is retried rather
//! than reused.

use crate::types::VoucherCode;
use rand::Rng;
use std::sync::Mutex;

/// Alphabet used for voucher codes: uppercase letters and digits
const VOUCHER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated voucher code
const VOUCHER_LEN: usize = 8;

/// Voucher generator port
pub trait VoucherGenerator: Send + Sync {
    /// Produce a candidate voucher code
    ///
    /// Candidates must not be derivable from any booking attribute; the
    /// caller checks uniqueness and may call again on collision.
    fn generate(&self) -> VoucherCode;
}

/// Production generator: 8 random characters from `[A-Z0-9]`
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomVoucherGenerator;

impl RandomVoucherGenerator {
    /// Creates a new random voucher generator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl VoucherGenerator for RandomVoucherGenerator {
    fn generate(&self) -> VoucherCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..VOUCHER_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..VOUCHER_CHARSET.len());
                char::from(VOUCHER_CHARSET[idx])
            })
            .collect();
        VoucherCode::new(code)
    }
}

/// Deterministic generator for tests: replays a fixed sequence, then falls
/// back to a counter
#[derive(Debug, Default)]
pub struct SequenceVoucherGenerator {
    queue: Mutex<SequenceState>,
}

#[derive(Debug, Default)]
struct SequenceState {
    scripted: Vec<String>,
    next: usize,
    fallback: u64,
}

impl SequenceVoucherGenerator {
    /// Creates a generator that yields the given codes in order
    #[must_use]
    pub fn scripted(codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            queue: Mutex::new(SequenceState {
                scripted: codes.into_iter().map(Into::into).collect(),
                next: 0,
                fallback: 0,
            }),
        }
    }
}

impl VoucherGenerator for SequenceVoucherGenerator {
    fn generate(&self) -> VoucherCode {
        let Ok(mut state) = self.queue.lock() else {
            return VoucherCode::new("POISONED".to_string());
        };
        if state.next < state.scripted.len() {
            let code = state.scripted[state.next].clone();
            state.next += 1;
            return VoucherCode::new(code);
        }
        state.fallback += 1;
        VoucherCode::new(format!("SEQ{:05}", state.fallback))
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

// Both coordinates a quiet NaN: no pointer seen yet, or it left.
const ABSENT: u64 = 0x7FC0_0000_7FC0_0000;

fn pack(x: f32, y: f32) -> u64 {
    ((x.to_bits() as u64) << 32) | y.to_bits() as u64
}

/// Most recent pointer position in logical units. Writers overwrite, readers
/// take whatever was written last; both halves travel in one atomic word so a
/// reader never sees `x` from one event and `y` from another.
#[derive(Debug)]
pub struct PointerState {
    bits: AtomicU64,
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerState {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(ABSENT),
        }
    }

    pub fn set(&self, x: f32, y: f32) {
        self.bits.store(pack(x, y), Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.bits.store(ABSENT, Ordering::Relaxed);
    }

    pub fn get(&self) -> Option<(f32, f32)> {
        let bits = self.bits.load(Ordering::Relaxed);
        let x = f32::from_bits((bits >> 32) as u32);
        let y = f32::from_bits(bits as u32);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_absent() {
        assert_eq!(PointerState::new().get(), None);
    }

    #[test]
    fn last_write_wins() {
        let p = PointerState::new();
        p.set(1.0, 2.0);
        p.set(-3.5, 400.25);
        assert_eq!(p.get(), Some((-3.5, 400.25)));
        p.clear();
        assert_eq!(p.get(), None);
    }

    #[test]
    fn readers_on_other_threads_see_whole_pairs() {
        let p = Arc::new(PointerState::new());
        let writer = {
            let p = Arc::clone(&p);
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    let v = i as f32;
                    p.set(v, v * 2.0);
                }
            })
        };
        for _ in 0..10_000 {
            if let Some((x, y)) = p.get() {
                assert_eq!(y, x * 2.0);
            }
        }
        writer.join().unwrap();
        assert_eq!(p.get(), Some((9_999.0, 19_998.0)));
    }
}

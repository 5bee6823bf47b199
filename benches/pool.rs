#![feature(test)]
extern crate segpool;
extern crate test;
#[macro_use]
extern crate trackable;

use segpool::{SequencePool, SequencePoolBuilder};
use test::Bencher;

#[bench]
fn rent_and_dispose_small(b: &mut Bencher) {
    let pool = track_try_unwrap!(SequencePool::<u8>::new(1024));
    b.iter(|| {
        let mut seq = pool.rent(16);
        seq.dispose();
    });
}

#[bench]
fn rent_and_dispose_spanning_segments(b: &mut Bencher) {
    let pool = track_try_unwrap!(SequencePool::<u8>::new(1024));
    b.iter(|| {
        let mut seq = pool.rent(4097);
        seq.dispose();
    });
}

#[bench]
fn rent_with_fragmentation(b: &mut Bencher) {
    let pool = track_try_unwrap!(SequencePool::<u8>::new(1024));
    let mut held = (0..256).map(|i| pool.rent(1 + i % 97)).collect::<Vec<_>>();
    for seq in held.iter_mut().step_by(2) {
        seq.dispose();
    }
    b.iter(|| {
        let mut seq = pool.rent(50);
        seq.dispose();
    });
}

#[bench]
fn push_without_clearing(b: &mut Bencher) {
    let pool = track_try_unwrap!(SequencePoolBuilder::new()
        .clear_returned_sequences(false)
        .finish::<u32>());
    let mut seq = pool.greedy_rent(0);
    let mut i = 0;
    b.iter(|| {
        seq.push(i);
        i += 1;
    });
}

#[bench]
fn iterate_segments(b: &mut Bencher) {
    let pool = track_try_unwrap!(SequencePool::<u64>::new(256));
    let seq = pool.rent(100_000);
    seq.fill(1);
    b.iter(|| {
        seq.segments()
            .map(|s| s.iter().sum::<u64>())
            .sum::<u64>()
    });
}

//! Ready-made toy programs
//!
//! Location numbering: main block lives in 0..100, block `k` starts at
//! `1000 * k`.

use super::builders::ProgramBuilder;
use super::toy::ToyProgram;
use std::sync::Arc;

pub const MAIN: u32 = 0;
pub const CALLEE: u32 = 1;
pub const LEAF: u32 = 2;

/// main calls block 1 twice with the same value
///
/// ```text
/// main: 0 -call B1-> 1 -call B1-> 2 -> 3
/// B1:   1000 -(+1)-> 1001 -(-1)-> 1002
/// ```
pub fn double_call() -> Arc<ToyProgram> {
    ProgramBuilder::new(0, 3)
        .block(CALLEE, 1000, 1002)
        .call(0, CALLEE, 1)
        .call(1, CALLEE, 2)
        .step(2, 3, 0)
        .step(1000, 1001, 1)
        .step(1001, 1002, -1)
        .build()
}

/// block 1 reaches an error location
///
/// ```text
/// main: 0 -call B1-> 1 -> 2
/// B1:   1000 -> 1001 (error)
///       1000 -> 1002
/// ```
pub fn target_in_callee() -> Arc<ToyProgram> {
    ProgramBuilder::new(0, 2)
        .block(CALLEE, 1000, 1002)
        .call(0, CALLEE, 1)
        .step(1, 2, 0)
        .step(1000, 1001, 0)
        .step(1000, 1002, 0)
        .error(1001)
        .build()
}

/// block 1 calls itself
///
/// ```text
/// main: 0 -call B1-> 1 -> 2
/// B1:   1000 -(+1)-> 1001 -call B1-> 1002 -> 1003
/// ```
pub fn direct_recursion() -> Arc<ToyProgram> {
    ProgramBuilder::new(0, 2)
        .block(CALLEE, 1000, 1003)
        .call(0, CALLEE, 1)
        .step(1, 2, 0)
        .step(1000, 1001, 1)
        .call(1001, CALLEE, 1002)
        .step(1002, 1003, 0)
        .build()
}

/// block 1 calls block 2, which calls block 1 with the same value
pub fn mutual_recursion() -> Arc<ToyProgram> {
    ProgramBuilder::new(0, 2)
        .block(CALLEE, 1000, 1003)
        .block(LEAF, 2000, 2002)
        .call(0, CALLEE, 1)
        .step(1, 2, 0)
        .step(1000, 1001, 0)
        .call(1001, LEAF, 1002)
        .step(1002, 1003, 0)
        .call(2000, CALLEE, 2001)
        .step(2001, 2002, 0)
        .build()
}

/// main enters both blocks of a mutual recursion, so the two executors
/// resolve each other's entries concurrently
///
/// ```text
/// main: 0 -> 10 -call B2-> 11 -> 30
///       0 -> 20 -call B1-> 21 -> 30
/// B1:   1000 -call B2-> 1001 -> 1002
/// B2:   2000 -call B1-> 2001 -> 2002
/// ```
pub fn crossed_recursion() -> Arc<ToyProgram> {
    ProgramBuilder::new(0, 30)
        .block(CALLEE, 1000, 1002)
        .block(LEAF, 2000, 2002)
        .step(0, 10, 0)
        .step(0, 20, 0)
        .call(10, LEAF, 11)
        .call(20, CALLEE, 21)
        .step(11, 30, 0)
        .step(21, 30, 0)
        .call(1000, LEAF, 1001)
        .step(1001, 1002, 0)
        .call(2000, CALLEE, 2001)
        .step(2001, 2002, 0)
        .build()
}

/// main -> block 1 -> block 2, values threaded through
///
/// ```text
/// main: 0 -(+5)-> 1 -call B1-> 2 -> 3
/// B1:   1000 -call B2-> 1001 -(+1)-> 1002
/// B2:   2000 -(*)-> 2001 -(+10)-> 2002
/// ```
pub fn nested_calls() -> Arc<ToyProgram> {
    ProgramBuilder::new(0, 3)
        .block(CALLEE, 1000, 1002)
        .block(LEAF, 2000, 2002)
        .step(0, 1, 5)
        .call(1, CALLEE, 2)
        .step(2, 3, 0)
        .call(1000, LEAF, 1001)
        .step(1001, 1002, 1)
        .step(2000, 2001, 0)
        .step(2001, 2002, 10)
        .build()
}

/// block 1 is a straight line of `len` steps
pub fn long_callee(len: u32) -> Arc<ToyProgram> {
    let mut builder = ProgramBuilder::new(0, 2)
        .block(CALLEE, 1000, 1000 + len)
        .call(0, CALLEE, 1)
        .step(1, 2, 0);
    for i in 0..len {
        builder = builder.step(1000 + i, 1001 + i, 1);
    }
    builder.build()
}

pub const FANOUT_BLOCKS: u32 = 4;
pub const SHARED_LEAF: u32 = 9;

/// `branches` main branches over `FANOUT_BLOCKS` middle blocks that all call
/// one shared leaf with the same value
///
/// ```text
/// main:  0 -(+i%4)-> 100+i -call B(1+i%4)-> 200+i -> 1
/// B(k):  1000k -(-(k-1))-> 1000k+1 -call B9-> 1000k+2 -> 1000k+3
/// B9:    9000 -> 9001 -> 9002
/// ```
pub fn fanout(branches: u32) -> Arc<ToyProgram> {
    let mut builder = ProgramBuilder::new(0, 1).block(SHARED_LEAF, 9000, 9002);

    for k in 1..=FANOUT_BLOCKS {
        let base = 1000 * k;
        builder = builder
            .block(k, base, base + 3)
            .step(base, base + 1, -((k - 1) as i64))
            .call(base + 1, SHARED_LEAF, base + 2)
            .step(base + 2, base + 3, 0);
    }

    for i in 0..branches {
        let k = 1 + i % FANOUT_BLOCKS;
        builder = builder
            .step(0, 100 + i, (k - 1) as i64)
            .call(100 + i, k, 200 + i)
            .step(200 + i, 1, 0);
    }

    builder
        .step(9000, 9001, 0)
        .step(9001, 9002, 0)
        .build()
}

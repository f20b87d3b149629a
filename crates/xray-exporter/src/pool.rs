// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reusable scratch state for conversions.
//!
//! A conversion needs two attribute tables and an output buffer. Instead of allocating them
//! per span, [`ScratchPool::checkout`] hands out a [`PooledScratch`] guard which puts the
//! cleared scratch back into the pool when dropped, including on early returns. Concurrent
//! conversions each check out their own scratch.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use crate::attributes::AttributeTable;

/// Initial capacity of the output buffer of a fresh scratch.
const INITIAL_BUFFER_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
pub struct Scratch {
    pub resource: AttributeTable,
    pub span: AttributeTable,
    pub buffer: Vec<u8>,
}

impl Scratch {
    fn new() -> Self {
        Scratch {
            buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
            ..Default::default()
        }
    }

    fn clear(&mut self) {
        self.resource.clear();
        self.span.clear();
        self.buffer.clear();
    }
}

/// Bounded pool of [`Scratch`] values. Scratch returned while the pool is full is dropped.
#[derive(Debug)]
pub struct ScratchPool {
    free: Mutex<Vec<Scratch>>,
    capacity: usize,
}

impl ScratchPool {
    pub fn new(capacity: usize) -> Self {
        ScratchPool {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn checkout(&self) -> PooledScratch<'_> {
        let scratch = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(Scratch::new);
        PooledScratch {
            pool: self,
            scratch,
        }
    }

    /// Number of scratch values waiting in the pool.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn give_back(&self, mut scratch: Scratch) {
        scratch.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(scratch);
        }
    }
}

/// Scratch checked out of a [`ScratchPool`], returned on drop.
pub struct PooledScratch<'p> {
    pool: &'p ScratchPool,
    scratch: Scratch,
}

impl Deref for PooledScratch<'_> {
    type Target = Scratch;

    fn deref(&self) -> &Scratch {
        &self.scratch
    }
}

impl DerefMut for PooledScratch<'_> {
    fn deref_mut(&mut self) -> &mut Scratch {
        &mut self.scratch
    }
}

impl Drop for PooledScratch<'_> {
    fn drop(&mut self) {
        // the placeholder left behind owns no heap memory
        let scratch = std::mem::take(&mut self.scratch);
        self.pool.give_back(scratch);
    }
}

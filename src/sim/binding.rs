//! Ping-pong bookkeeping.
//!
//! The two cell-state buffers never change identity. Two binding configurations are
//! built once, one per direction, and each step only *selects* one of them by parity.

/// Identifies one of the two cell-state buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellBuffer {
    A,
    B,
}

impl CellBuffer {
    pub fn other(self) -> Self {
        match self {
            CellBuffer::A => CellBuffer::B,
            CellBuffer::B => CellBuffer::A,
        }
    }
}

/// Parity of a step; also the index of the binding configuration it selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn of(step: u64) -> Self {
        if step % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    pub fn index(self) -> usize {
        match self {
            Parity::Even => 0,
            Parity::Odd => 1,
        }
    }

    /// The buffer that is authoritative on a step of this parity
    pub fn current(self) -> CellBuffer {
        match self {
            Parity::Even => CellBuffer::A,
            Parity::Odd => CellBuffer::B,
        }
    }

    /// The parity whose configuration has `buffer` in its write slot
    pub fn writing(buffer: CellBuffer) -> Self {
        match buffer {
            CellBuffer::B => Parity::Even,
            CellBuffer::A => Parity::Odd,
        }
    }
}

/// An immutable `(uniforms, read, write)` triple presented to a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingConfiguration<H> {
    pub uniforms: H,
    pub read: H,
    pub write: H,
}

/// Exactly two values, one per parity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingPair<T>([T; 2]);

impl<T> BindingPair<T> {
    pub fn get(&self, parity: Parity) -> &T {
        &self.0[parity.index()]
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> BindingPair<U> {
        BindingPair(self.0.map(f))
    }

    pub fn as_array(&self) -> &[T; 2] {
        &self.0
    }
}

impl<H: Clone> BindingPair<BindingConfiguration<H>> {
    /// Build both directions: `A -> B` for even steps, `B -> A` for odd steps.
    pub fn ping_pong(uniforms: H, buffer_a: H, buffer_b: H) -> Self {
        BindingPair([
            BindingConfiguration {
                uniforms: uniforms.clone(),
                read: buffer_a.clone(),
                write: buffer_b.clone(),
            },
            BindingConfiguration {
                uniforms,
                read: buffer_b,
                write: buffer_a,
            },
        ])
    }
}

/// Counts completed simulation steps. Only ever moves forward by one.
#[derive(Debug, Default)]
pub struct StepCounter(u64);

impl StepCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn parity(&self) -> Parity {
        Parity::of(self.0)
    }

    pub(crate) fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

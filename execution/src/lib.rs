//! Strata execution layer.
//!
//! This crate turns authenticated transactions into literal [`Delta`](strata_types::Delta)
//! records. The [`Interpreter`] reads through a two-tier view (speculative [`Scratch`] first,
//! committed [`State`] second), runs the handler for the transaction kind and compiles the
//! handler's mutations. It never writes; applying deltas is the caller's job.
//!
//! ## Determinism requirements
//! - Do not read the wall clock inside execution; expirations are checked against the
//!   caller-supplied timestamp.
//! - Avoid iteration order of hash-based collections influencing outputs.
//! - Business rejections are `Ok(None)`; only malformed input and store contract violations
//!   are errors.
//!
//! ## Block pipeline (example)
//! ```rust
//! use strata_execution::{commit, execute, Memory, Scratch};
//! use strata_types::{Instruction, Transaction};
//! use commonware_cryptography::{ed25519::PrivateKey, Signer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let alice = PrivateKey::from_seed(1).public_key();
//! let bob = PrivateKey::from_seed(2).public_key();
//! let mut state = Memory::with_balances([(alice.clone(), 100)]);
//! let mut scratch = Scratch::new();
//!
//! let tx = Transaction::new(alice, Instruction::Standard { receiver: bob.clone(), amount: 40 });
//! let outputs = execute(&mut scratch, &state, 1_700_000_000, vec![tx])?;
//! commit(&mut state, &outputs)?;
//! scratch.clear();
//! assert_eq!(state.balance(&bob), Some(40));
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod replay;
pub mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod scenario_tests;

mod layer;

pub use compiler::{compile, Mutation, Mutations};
pub use layer::{commit, execute, Interpreter};
pub use state::{Lookup, Memory, Scratch, State, Store, Tiered};

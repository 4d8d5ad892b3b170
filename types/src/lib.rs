pub mod codec;
pub mod delta;
pub mod execution;
pub mod ledger;

mod compat;

pub use delta::{Column, Delta, DeltaError, Literal, Operation};
pub use execution::{Instruction, Output, Transaction, TransactionError, Wallet};
pub use ledger::{Balance, Filter, Hashlock, Relation, Row, Swap, Vote};

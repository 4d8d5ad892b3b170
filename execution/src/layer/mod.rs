use anyhow::{bail, Context as _, Result};
use commonware_cryptography::Digestible;
use std::collections::BTreeMap;
use strata_types::{Balance, Delta, Filter, Instruction, Output, Row, Swap, Transaction, Wallet};
use tracing::{debug, trace};

use crate::compiler::{compile, Mutation, Mutations};
use crate::state::{Scratch, State, Store, Tiered};

mod handlers;

/// Per-call pending overlay.
///
/// Handlers write balances here as they emit mutations, so a later read in the same call observes
/// an earlier write. Nothing survives the call.
pub(crate) struct Session<'v, V: State> {
    view: &'v V,
    pending: BTreeMap<Wallet, u64>,
    timestamp: u64,
}

impl<'v, V: State> Session<'v, V> {
    pub(crate) fn new(view: &'v V, timestamp: u64) -> Self {
        Self {
            view,
            pending: BTreeMap::new(),
            timestamp,
        }
    }

    /// Current balance of `wallet`, `None` if it has no row.
    fn balance(&self, wallet: &Wallet) -> Result<Option<u64>> {
        if let Some(amount) = self.pending.get(wallet) {
            return Ok(Some(*amount));
        }
        let filter = Filter::Balance {
            wallet: wallet.clone(),
        };
        match self.view.read(&filter)? {
            Some(Row::Balance(balance)) => Ok(Some(balance.amount)),
            Some(other) => bail!(
                "store returned balance filter row of relation {}",
                other.relation()
            ),
            None => Ok(None),
        }
    }

    /// Record `amount` as the new balance of `wallet`.
    ///
    /// `previous` is what [`Session::balance`] returned; a wallet with no row gets an insert.
    fn set_balance(&mut self, wallet: &Wallet, previous: Option<u64>, amount: u64) -> Mutation {
        self.pending.insert(wallet.clone(), amount);
        let row = Row::Balance(Balance {
            wallet: wallet.clone(),
            amount,
        });
        match previous {
            Some(_) => Mutation::Update(row),
            None => Mutation::Insert(row),
        }
    }

    /// Add `amount` to `wallet`. `None` if the balance would overflow.
    fn credit(&mut self, wallet: &Wallet, amount: u64) -> Result<Option<Mutation>> {
        let previous = self.balance(wallet)?;
        let Some(next) = previous.unwrap_or(0).checked_add(amount) else {
            return Ok(None);
        };
        Ok(Some(self.set_balance(wallet, previous, next)))
    }

    fn scan_swaps(&self, filter: &Filter) -> Result<Vec<Swap>> {
        self.view
            .scan(filter)?
            .into_iter()
            .map(|row| match row {
                Row::Swap(swap) => Ok(swap),
                other => bail!(
                    "store returned swaps filter row of relation {}",
                    other.relation()
                ),
            })
            .collect()
    }

    fn dispatch(&mut self, transaction: &Transaction) -> Result<Option<Mutations>> {
        let sender = &transaction.sender;
        match &transaction.instruction {
            Instruction::Standard { receiver, amount } => {
                self.handle_transfer(sender, receiver, *amount)
            }
            Instruction::Vote { policy, choice } => Ok(self.handle_vote(sender, policy, choice)),
            Instruction::SwapInitiate {
                receiver,
                amount,
                expiration,
                hashlock,
            } => self.handle_swap_initiate(sender, receiver, *amount, *expiration, *hashlock),
            Instruction::SwapSettle { secret } => self.handle_swap_settle(sender, secret),
        }
    }
}

/// Turns one transaction into the deltas that apply it.
///
/// Reads go through a [`Tiered`] view: speculative effects in `scratch` win over the committed
/// `state`. The interpreter never writes; it is safe to call repeatedly on the same inputs.
pub struct Interpreter<'a, S: State> {
    view: Tiered<'a, S>,
    timestamp: u64,
}

impl<'a, S: State> Interpreter<'a, S> {
    /// `timestamp` is the block time (unix seconds) used for every expiration check.
    pub fn new(scratch: &'a Scratch, state: &'a S, timestamp: u64) -> Self {
        Self {
            view: Tiered::new(scratch, state),
            timestamp,
        }
    }

    /// Interpret `transaction`.
    ///
    /// Returns `Ok(None)` when the transaction is rejected by a business rule (insufficient
    /// funds, nothing to settle, overflow) and `Err` when the input is malformed or the store
    /// breaks its contract.
    pub fn interpret(&self, transaction: &Transaction) -> Result<Option<Vec<Delta>>> {
        transaction.validate().context("invalid transaction")?;

        let mut session = Session::new(&self.view, self.timestamp);
        let deltas = compile(session.dispatch(transaction)?);
        match &deltas {
            Some(deltas) => {
                debug!(
                    sender = ?transaction.sender,
                    kind = transaction.instruction.kind(),
                    deltas = deltas.len(),
                    "accepted transaction"
                );
                for delta in deltas {
                    trace!(%delta, "emitted delta");
                }
            }
            None => debug!(
                sender = ?transaction.sender,
                kind = transaction.instruction.kind(),
                digest = ?transaction.digest(),
                "rejected transaction"
            ),
        }
        Ok(deltas)
    }
}

/// Interpret `transactions` in order at `timestamp`.
///
/// Each accepted delta list is applied to `scratch` before the next transaction runs, so later
/// transactions observe earlier ones. `state` is never written. Any error aborts the batch and
/// leaves `scratch` in an unspecified state.
pub fn execute<S: State>(
    scratch: &mut Scratch,
    state: &S,
    timestamp: u64,
    transactions: Vec<Transaction>,
) -> Result<Vec<Output>> {
    let mut outputs = Vec::with_capacity(transactions.len());
    for transaction in transactions {
        let deltas = Interpreter::new(scratch, state, timestamp).interpret(&transaction)?;
        match deltas {
            Some(deltas) => {
                scratch
                    .apply(&deltas)
                    .context("failed to apply deltas to scratch")?;
                outputs.push(Output::Accepted {
                    transaction,
                    deltas,
                });
            }
            None => outputs.push(Output::Rejected(transaction)),
        }
    }
    let accepted = outputs
        .iter()
        .filter(|output| matches!(output, Output::Accepted { .. }))
        .count();
    debug!(
        timestamp,
        transactions = outputs.len(),
        accepted,
        "executed batch"
    );
    Ok(outputs)
}

/// Apply the accepted deltas of `outputs` to `state`, in order.
pub fn commit<S: Store>(state: &mut S, outputs: &[Output]) -> Result<()> {
    for output in outputs {
        state
            .apply(output.deltas())
            .with_context(|| format!("failed to commit {:?}", output.transaction().digest()))?;
    }
    Ok(())
}

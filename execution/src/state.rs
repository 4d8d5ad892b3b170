//! Read-through state access.
//!
//! The interpreter reads through a [`Tiered`] view: a speculative [`Scratch`] layer holding the
//! effects of transactions sequenced earlier in the same block, falling back to the committed
//! store. Writes never happen here; compiled deltas are applied by whoever owns the store.

use anyhow::{bail, Context as _, Result};
use std::collections::{BTreeMap, BTreeSet};
use strata_types::{Balance, Delta, Filter, Operation, Relation, Row, Swap, Vote, Wallet};

/// Store contract consumed by the interpreter.
pub trait State {
    /// Zero or one row matching `filter`. Absence is not an error.
    fn read(&self, filter: &Filter) -> Result<Option<Row>>;

    /// Every row matching `filter`.
    fn scan(&self, filter: &Filter) -> Result<Vec<Row>>;
}

/// A store that compiled deltas can be applied to.
pub trait Store: State {
    fn insert(&mut self, row: Row) -> Result<()>;
    fn update(&mut self, row: Row) -> Result<()>;
    fn delete(&mut self, row: &Row) -> Result<()>;

    /// Apply `deltas` in order. An error leaves the store partially updated; callers treat it
    /// as fatal and discard the store.
    fn apply(&mut self, deltas: &[Delta]) -> Result<()> {
        for delta in deltas {
            let row = Row::try_from(delta).with_context(|| format!("malformed delta: {delta}"))?;
            match delta.operation {
                Operation::Insert => self.insert(row)?,
                Operation::Update => self.update(row)?,
                Operation::Delete => self.delete(&row)?,
            }
        }
        Ok(())
    }
}

fn single(mut rows: Vec<Row>, filter: &Filter) -> Result<Option<Row>> {
    if rows.len() > 1 {
        bail!("{} rows match {filter:?}, expected at most one", rows.len());
    }
    Ok(rows.pop())
}

/// In-memory committed store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    balances: BTreeMap<Wallet, u64>,
    votes: Vec<Vote>,
    swaps: BTreeMap<Swap, usize>,
}

impl Memory {
    pub fn with_balances(balances: impl IntoIterator<Item = (Wallet, u64)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn balance(&self, wallet: &Wallet) -> Option<u64> {
        self.balances.get(wallet).copied()
    }

    pub fn balances(&self) -> impl Iterator<Item = (&Wallet, u64)> {
        self.balances.iter().map(|(wallet, amount)| (wallet, *amount))
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Outstanding swaps, repeated once per identical row.
    pub fn swaps(&self) -> impl Iterator<Item = &Swap> {
        self.swaps
            .iter()
            .flat_map(|(swap, count)| std::iter::repeat(swap).take(*count))
    }

    /// Sum of all balances and escrowed amounts.
    pub fn total_value(&self) -> u128 {
        let held: u128 = self.balances.values().map(|amount| *amount as u128).sum();
        let escrowed: u128 = self.swaps().map(|swap| swap.amount as u128).sum();
        held + escrowed
    }

    fn rows(&self, relation: Relation) -> Vec<Row> {
        match relation {
            Relation::Balances => self
                .balances
                .iter()
                .map(|(wallet, amount)| {
                    Row::Balance(Balance {
                        wallet: wallet.clone(),
                        amount: *amount,
                    })
                })
                .collect(),
            Relation::Votes => self.votes.iter().cloned().map(Row::Vote).collect(),
            Relation::Swaps => self.swaps().cloned().map(Row::Swap).collect(),
        }
    }
}

impl State for Memory {
    fn read(&self, filter: &Filter) -> Result<Option<Row>> {
        match filter {
            Filter::Balance { wallet } => Ok(self.balance(wallet).map(|amount| {
                Row::Balance(Balance {
                    wallet: wallet.clone(),
                    amount,
                })
            })),
            _ => single(self.scan(filter)?, filter),
        }
    }

    fn scan(&self, filter: &Filter) -> Result<Vec<Row>> {
        Ok(self
            .rows(filter.relation())
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect())
    }
}

impl Store for Memory {
    fn insert(&mut self, row: Row) -> Result<()> {
        match row {
            Row::Balance(balance) => {
                if self.balances.contains_key(&balance.wallet) {
                    bail!("duplicate balance row for {:?}", balance.wallet);
                }
                self.balances.insert(balance.wallet, balance.amount);
            }
            Row::Vote(vote) => self.votes.push(vote),
            Row::Swap(swap) => *self.swaps.entry(swap).or_default() += 1,
        }
        Ok(())
    }

    fn update(&mut self, row: Row) -> Result<()> {
        match row {
            Row::Balance(balance) => match self.balances.get_mut(&balance.wallet) {
                Some(amount) => *amount = balance.amount,
                None => bail!("update of missing balance row for {:?}", balance.wallet),
            },
            other => bail!("{} rows cannot be updated", other.relation()),
        }
        Ok(())
    }

    fn delete(&mut self, row: &Row) -> Result<()> {
        // A delete removes every row it matches; matching nothing is not an error.
        match row {
            Row::Balance(balance) => {
                self.balances.remove(&balance.wallet);
            }
            Row::Vote(vote) => self.votes.retain(|candidate| candidate != vote),
            Row::Swap(swap) => {
                self.swaps.remove(swap);
            }
        }
        Ok(())
    }
}

/// Result of asking the scratch layer about a keyed row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Scratch holds the row.
    Found(Row),
    /// Scratch deleted the row; the committed store must not be consulted.
    Absent,
    /// Scratch knows nothing about the row.
    Unbound,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Status {
    Update(u64),
    Delete,
}

/// Speculative, disposable layer over a committed store.
#[derive(Clone, Debug, Default)]
pub struct Scratch {
    balances: BTreeMap<Wallet, Status>,
    added: BTreeMap<Row, usize>,
    removed: BTreeSet<Row>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }

    /// Discard all speculation.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn lookup(&self, filter: &Filter) -> Lookup {
        let Filter::Balance { wallet } = filter else {
            return Lookup::Unbound;
        };
        match self.balances.get(wallet) {
            Some(Status::Update(amount)) => Lookup::Found(Row::Balance(Balance {
                wallet: wallet.clone(),
                amount: *amount,
            })),
            Some(Status::Delete) => Lookup::Absent,
            None => Lookup::Unbound,
        }
    }

    /// Whether `row`, as seen in the committed store, is superseded by this layer.
    pub fn shadows(&self, row: &Row) -> bool {
        match row {
            Row::Balance(balance) => self.balances.contains_key(&balance.wallet),
            Row::Vote(_) | Row::Swap(_) => self.removed.contains(row),
        }
    }
}

impl State for Scratch {
    fn read(&self, filter: &Filter) -> Result<Option<Row>> {
        if filter.is_keyed() {
            return Ok(match self.lookup(filter) {
                Lookup::Found(row) => Some(row),
                Lookup::Absent | Lookup::Unbound => None,
            });
        }
        single(self.scan(filter)?, filter)
    }

    fn scan(&self, filter: &Filter) -> Result<Vec<Row>> {
        let balances = self.balances.iter().filter_map(|(wallet, status)| match status {
            Status::Update(amount) => Some(Row::Balance(Balance {
                wallet: wallet.clone(),
                amount: *amount,
            })),
            Status::Delete => None,
        });
        let added = self
            .added
            .iter()
            .flat_map(|(row, count)| std::iter::repeat(row.clone()).take(*count));
        Ok(balances
            .chain(added)
            .filter(|row| filter.matches(row))
            .collect())
    }
}

impl Store for Scratch {
    fn insert(&mut self, row: Row) -> Result<()> {
        match row {
            Row::Balance(balance) => {
                if let Some(Status::Update(_)) = self.balances.get(&balance.wallet) {
                    bail!("duplicate balance row for {:?}", balance.wallet);
                }
                self.balances
                    .insert(balance.wallet, Status::Update(balance.amount));
            }
            row => *self.added.entry(row).or_default() += 1,
        }
        Ok(())
    }

    fn update(&mut self, row: Row) -> Result<()> {
        match row {
            Row::Balance(balance) => {
                if let Some(Status::Delete) = self.balances.get(&balance.wallet) {
                    bail!("update of deleted balance row for {:?}", balance.wallet);
                }
                self.balances
                    .insert(balance.wallet, Status::Update(balance.amount));
            }
            other => bail!("{} rows cannot be updated", other.relation()),
        }
        Ok(())
    }

    fn delete(&mut self, row: &Row) -> Result<()> {
        match row {
            Row::Balance(balance) => {
                self.balances.insert(balance.wallet.clone(), Status::Delete);
            }
            row => {
                self.added.remove(row);
                self.removed.insert(row.clone());
            }
        }
        Ok(())
    }
}

/// Scratch-first, state-fallback view handed to every handler.
pub struct Tiered<'a, S: State> {
    scratch: &'a Scratch,
    state: &'a S,
}

impl<'a, S: State> Tiered<'a, S> {
    pub fn new(scratch: &'a Scratch, state: &'a S) -> Self {
        Self { scratch, state }
    }

    fn checked(&self, filter: &Filter, row: Row) -> Result<Row> {
        if !filter.matches(&row) {
            bail!(
                "state store returned a {} row that does not match {filter:?}",
                row.relation()
            );
        }
        Ok(row)
    }
}

impl<S: State> State for Tiered<'_, S> {
    fn read(&self, filter: &Filter) -> Result<Option<Row>> {
        if !filter.is_keyed() {
            return single(self.scan(filter)?, filter);
        }
        match self.scratch.lookup(filter) {
            Lookup::Found(row) => Ok(Some(row)),
            Lookup::Absent => Ok(None),
            Lookup::Unbound => self
                .state
                .read(filter)?
                .map(|row| self.checked(filter, row))
                .transpose(),
        }
    }

    fn scan(&self, filter: &Filter) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for row in self.state.scan(filter)? {
            let row = self.checked(filter, row)?;
            if !self.scratch.shadows(&row) {
                rows.push(row);
            }
        }
        rows.extend(self.scratch.scan(filter)?);

        // Canonical order, independent of either store's iteration order.
        rows.sort();
        Ok(rows)
    }
}

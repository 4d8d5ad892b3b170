//! Render handler mutations into literal [`Delta`] records.

use strata_types::{Delta, Operation, Row};

/// An abstract mutation emitted by a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Insert(Row),
    Update(Row),
    Delete(Row),
}

impl Mutation {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Insert(_) => Operation::Insert,
            Self::Update(_) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
        }
    }

    pub fn row(&self) -> &Row {
        match self {
            Self::Insert(row) | Self::Update(row) | Self::Delete(row) => row,
        }
    }

    pub fn compile(&self) -> Delta {
        Delta::new(self.operation(), self.row())
    }
}

/// Ordered mutations of one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mutations(Vec<Mutation>);

impl From<Mutation> for Mutations {
    fn from(mutation: Mutation) -> Self {
        Self(vec![mutation])
    }
}

impl From<Vec<Mutation>> for Mutations {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self(mutations)
    }
}

impl From<(Mutation, Mutation)> for Mutations {
    fn from((first, second): (Mutation, Mutation)) -> Self {
        Self(vec![first, second])
    }
}

/// Compile a handler result.
///
/// `None` and an empty list both mean the transaction was rejected. Emission order is kept:
/// later deltas may assume earlier ones were applied.
pub fn compile<M: Into<Mutations>>(mutations: Option<M>) -> Option<Vec<Delta>> {
    let Mutations(mutations) = mutations?.into();
    if mutations.is_empty() {
        return None;
    }
    Some(mutations.iter().map(Mutation::compile).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::wallet;
    use strata_types::{Balance, Vote};

    fn balance(seed: u64, amount: u64) -> Row {
        Row::Balance(Balance {
            wallet: wallet(seed),
            amount,
        })
    }

    #[test]
    fn test_rejection_compiles_to_nothing() {
        assert_eq!(compile::<Mutation>(None), None);
        assert_eq!(compile(Some(Vec::<Mutation>::new())), None);
    }

    #[test]
    fn test_single_mutation_is_normalized() {
        let vote = Row::Vote(Vote {
            wallet: wallet(3),
            policy: "P".into(),
            choice: "C".into(),
        });
        let deltas = compile(Some(Mutation::Insert(vote.clone()))).unwrap();
        assert_eq!(deltas, vec![Delta::new(Operation::Insert, &vote)]);
    }

    #[test]
    fn test_order_is_preserved() {
        let debit = Mutation::Update(balance(1, 60));
        let credit = Mutation::Insert(balance(2, 40));
        let deltas = compile(Some((debit.clone(), credit.clone()))).unwrap();
        assert_eq!(deltas, vec![debit.compile(), credit.compile()]);
        assert_eq!(deltas[0].operation, Operation::Update);
        assert_eq!(deltas[1].operation, Operation::Insert);
    }

    #[test]
    fn test_compiled_records_are_literal() {
        let delta = Mutation::Update(balance(1, 60)).compile();
        let rendered = delta.to_string();
        assert!(!rendered.contains('?'));
        assert!(rendered.contains("amount = 60"));
    }
}

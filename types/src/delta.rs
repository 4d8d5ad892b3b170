//! Literal mutation records.
//!
//! A [`Delta`] is fully self-describing: relation, operation and concrete column values. It
//! carries no handle into the process that produced it, so it can be logged, shipped to another
//! replica, or replayed later byte-for-byte.

use crate::codec::{read_text, text_encode_size, write_text};
use crate::execution::{MAX_CHOICE_LENGTH, MAX_POLICY_LENGTH};
use crate::ledger::{Balance, Hashlock, Relation, Row, Swap, Vote};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::hex;
use std::fmt;
use thiserror::Error as ThisError;

/// Widest row of any relation.
pub const MAX_DELTA_COLUMNS: usize = 5;

/// Longest text literal any relation stores.
pub const MAX_TEXT_LENGTH: usize = if MAX_POLICY_LENGTH > MAX_CHOICE_LENGTH {
    MAX_POLICY_LENGTH
} else {
    MAX_CHOICE_LENGTH
};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Write for Operation {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Insert => 0,
            Self::Update => 1,
            Self::Delete => 2,
        };
        tag.write(writer);
    }
}

impl Read for Operation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Insert),
            1 => Ok(Self::Update),
            2 => Ok(Self::Delete),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Operation {
    const SIZE: usize = u8::SIZE;
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Column {
    Wallet,
    Amount,
    Policy,
    Choice,
    Sender,
    Receiver,
    Expiration,
    Hashlock,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::Amount => "amount",
            Self::Policy => "policy",
            Self::Choice => "choice",
            Self::Sender => "sender",
            Self::Receiver => "receiver",
            Self::Expiration => "expiration",
            Self::Hashlock => "hashlock",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Self::Wallet => 0,
            Self::Amount => 1,
            Self::Policy => 2,
            Self::Choice => 3,
            Self::Sender => 4,
            Self::Receiver => 5,
            Self::Expiration => 6,
            Self::Hashlock => 7,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Write for Column {
    fn write(&self, writer: &mut impl BufMut) {
        self.tag().write(writer);
    }
}

impl Read for Column {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Wallet),
            1 => Ok(Self::Amount),
            2 => Ok(Self::Policy),
            3 => Ok(Self::Choice),
            4 => Ok(Self::Sender),
            5 => Ok(Self::Receiver),
            6 => Ok(Self::Expiration),
            7 => Ok(Self::Hashlock),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Column {
    const SIZE: usize = u8::SIZE;
}

/// A bound value.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Literal {
    Wallet(PublicKey),
    Integer(u64),
    Text(String),
    Hashlock(Hashlock),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wallet(wallet) => write!(f, "'{}'", hex(wallet.as_ref())),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Hashlock(hashlock) => write!(f, "'{hashlock}'"),
        }
    }
}

impl Write for Literal {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Wallet(wallet) => {
                0u8.write(writer);
                wallet.write(writer);
            }
            Self::Integer(value) => {
                1u8.write(writer);
                value.write(writer);
            }
            Self::Text(text) => {
                2u8.write(writer);
                write_text(text, writer);
            }
            Self::Hashlock(hashlock) => {
                3u8.write(writer);
                hashlock.write(writer);
            }
        }
    }
}

impl Read for Literal {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let literal = match u8::read(reader)? {
            0 => Self::Wallet(PublicKey::read(reader)?),
            1 => Self::Integer(u64::read(reader)?),
            2 => Self::Text(read_text(reader, MAX_TEXT_LENGTH, "Literal")?),
            3 => Self::Hashlock(Hashlock::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(literal)
    }
}

impl EncodeSize for Literal {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Wallet(_) => PublicKey::SIZE,
                Self::Integer(_) => u64::SIZE,
                Self::Text(text) => text_encode_size(text),
                Self::Hashlock(_) => Hashlock::SIZE,
            }
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum DeltaError {
    #[error("{relation} delta is missing column {column}")]
    MissingColumn { relation: Relation, column: Column },
    #[error("column {column} holds a literal of the wrong type")]
    MistypedColumn { column: Column },
    #[error("{relation} delta does not list its columns in canonical form")]
    NonCanonical { relation: Relation },
    #[error("delta binds {count} columns, more than any row has")]
    TooManyColumns { count: usize },
}

/// One literal mutation.
///
/// Never binds more than [`MAX_DELTA_COLUMNS`] columns.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Delta {
    pub operation: Operation,
    pub relation: Relation,
    values: Vec<(Column, Literal)>,
}

impl Delta {
    /// Bind every column of `row` into a literal record.
    pub fn new(operation: Operation, row: &Row) -> Self {
        let values = match row {
            Row::Balance(balance) => vec![
                (Column::Wallet, Literal::Wallet(balance.wallet.clone())),
                (Column::Amount, Literal::Integer(balance.amount)),
            ],
            Row::Vote(vote) => vec![
                (Column::Wallet, Literal::Wallet(vote.wallet.clone())),
                (Column::Policy, Literal::Text(vote.policy.clone())),
                (Column::Choice, Literal::Text(vote.choice.clone())),
            ],
            Row::Swap(swap) => vec![
                (Column::Sender, Literal::Wallet(swap.sender.clone())),
                (Column::Receiver, Literal::Wallet(swap.receiver.clone())),
                (Column::Amount, Literal::Integer(swap.amount)),
                (Column::Expiration, Literal::Integer(swap.expiration)),
                (Column::Hashlock, Literal::Hashlock(swap.hashlock)),
            ],
        };
        Self {
            operation,
            relation: row.relation(),
            values,
        }
    }

    /// Bind arbitrary columns. The result need not describe a valid row.
    pub fn from_values(
        operation: Operation,
        relation: Relation,
        values: Vec<(Column, Literal)>,
    ) -> Result<Self, DeltaError> {
        if values.len() > MAX_DELTA_COLUMNS {
            return Err(DeltaError::TooManyColumns {
                count: values.len(),
            });
        }
        Ok(Self {
            operation,
            relation,
            values,
        })
    }

    pub fn values(&self) -> &[(Column, Literal)] {
        &self.values
    }

    pub fn get(&self, column: Column) -> Option<&Literal> {
        self.values
            .iter()
            .find(|(candidate, _)| *candidate == column)
            .map(|(_, literal)| literal)
    }

    /// Columns that identify the target row of an update or delete.
    ///
    /// Balances are keyed by wallet. Votes and swaps have no primary key, so every column
    /// takes part in the match.
    pub fn is_key(&self, column: Column) -> bool {
        match self.relation {
            Relation::Balances => column == Column::Wallet,
            Relation::Votes | Relation::Swaps => true,
        }
    }

    fn wallet(&self, column: Column) -> Result<PublicKey, DeltaError> {
        match self.require(column)? {
            Literal::Wallet(wallet) => Ok(wallet.clone()),
            _ => Err(DeltaError::MistypedColumn { column }),
        }
    }

    fn integer(&self, column: Column) -> Result<u64, DeltaError> {
        match self.require(column)? {
            Literal::Integer(value) => Ok(*value),
            _ => Err(DeltaError::MistypedColumn { column }),
        }
    }

    fn text(&self, column: Column) -> Result<String, DeltaError> {
        match self.require(column)? {
            Literal::Text(text) => Ok(text.clone()),
            _ => Err(DeltaError::MistypedColumn { column }),
        }
    }

    fn hashlock(&self, column: Column) -> Result<Hashlock, DeltaError> {
        match self.require(column)? {
            Literal::Hashlock(hashlock) => Ok(*hashlock),
            _ => Err(DeltaError::MistypedColumn { column }),
        }
    }

    fn require(&self, column: Column) -> Result<&Literal, DeltaError> {
        self.get(column).ok_or(DeltaError::MissingColumn {
            relation: self.relation,
            column,
        })
    }
}

impl TryFrom<&Delta> for Row {
    type Error = DeltaError;

    fn try_from(delta: &Delta) -> Result<Self, Self::Error> {
        let row = match delta.relation {
            Relation::Balances => Row::Balance(Balance {
                wallet: delta.wallet(Column::Wallet)?,
                amount: delta.integer(Column::Amount)?,
            }),
            Relation::Votes => Row::Vote(Vote {
                wallet: delta.wallet(Column::Wallet)?,
                policy: delta.text(Column::Policy)?,
                choice: delta.text(Column::Choice)?,
            }),
            Relation::Swaps => Row::Swap(Swap {
                sender: delta.wallet(Column::Sender)?,
                receiver: delta.wallet(Column::Receiver)?,
                amount: delta.integer(Column::Amount)?,
                expiration: delta.integer(Column::Expiration)?,
                hashlock: delta.hashlock(Column::Hashlock)?,
            }),
        };

        // Reject duplicated, reordered or extra columns.
        if Delta::new(delta.operation, &row).values != delta.values {
            return Err(DeltaError::NonCanonical {
                relation: delta.relation,
            });
        }
        Ok(row)
    }
}

fn assignments<'a>(values: impl Iterator<Item = &'a (Column, Literal)>, sep: &str) -> String {
    values
        .map(|(column, literal)| format!("{column} = {literal}"))
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = || self.values.iter().filter(|(column, _)| self.is_key(*column));
        match self.operation {
            Operation::Insert => {
                let columns = self
                    .values
                    .iter()
                    .map(|(column, _)| column.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                let literals = self
                    .values
                    .iter()
                    .map(|(_, literal)| literal.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "INSERT INTO {} ({columns}) VALUES ({literals})",
                    self.relation
                )
            }
            Operation::Update => {
                let set = assignments(
                    self.values.iter().filter(|(column, _)| !self.is_key(*column)),
                    ", ",
                );
                write!(
                    f,
                    "UPDATE {} SET {set} WHERE {}",
                    self.relation,
                    assignments(key(), " AND ")
                )
            }
            Operation::Delete => write!(
                f,
                "DELETE FROM {} WHERE {}",
                self.relation,
                assignments(key(), " AND ")
            ),
        }
    }
}

impl Write for Delta {
    fn write(&self, writer: &mut impl BufMut) {
        self.operation.write(writer);
        self.relation.write(writer);
        debug_assert!(self.values.len() <= MAX_DELTA_COLUMNS);
        (self.values.len() as u8).write(writer);
        for (column, literal) in &self.values {
            column.write(writer);
            literal.write(writer);
        }
    }
}

impl Read for Delta {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let operation = Operation::read(reader)?;
        let relation = Relation::read(reader)?;
        let count = u8::read(reader)? as usize;
        if count > MAX_DELTA_COLUMNS {
            return Err(Error::Invalid("Delta", "too many columns"));
        }
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push((Column::read(reader)?, Literal::read(reader)?));
        }
        Ok(Self {
            operation,
            relation,
            values,
        })
    }
}

impl EncodeSize for Delta {
    fn encode_size(&self) -> usize {
        Operation::SIZE
            + Relation::SIZE
            + u8::SIZE
            + self
                .values
                .iter()
                .map(|(_, literal)| Column::SIZE + literal.encode_size())
                .sum::<usize>()
    }
}

//! Rows, relations and read predicates of the ledger.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::{from_hex_formatted, hex};
use std::fmt;
use tiny_keccak::{Hasher as _, Sha3};

/// Size of a hashlock digest in bytes.
pub const HASHLOCK_LENGTH: usize = 32;

/// SHA3-256 digest a redeemer must match by presenting a secret.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Hashlock([u8; HASHLOCK_LENGTH]);

impl Hashlock {
    /// Hash raw secret bytes. The digest function is fixed by the protocol.
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut hasher = Sha3::v256();
        hasher.update(secret);
        let mut digest = [0u8; HASHLOCK_LENGTH];
        hasher.finalize(&mut digest);
        Self(digest)
    }

    /// Parse a hex string (optionally `0x` prefixed).
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = from_hex_formatted(s)?;
        let digest: [u8; HASHLOCK_LENGTH] = bytes.as_slice().try_into().ok()?;
        Some(Self(digest))
    }
}

impl From<[u8; HASHLOCK_LENGTH]> for Hashlock {
    fn from(value: [u8; HASHLOCK_LENGTH]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Hashlock {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hashlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

impl fmt::Debug for Hashlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hashlock({})", hex(&self.0))
    }
}

impl Write for Hashlock {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for Hashlock {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(<[u8; HASHLOCK_LENGTH]>::read(reader)?))
    }
}

impl FixedSize for Hashlock {
    const SIZE: usize = HASHLOCK_LENGTH;
}

/// Named relations the interpreter reads and mutates.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Relation {
    Balances,
    Votes,
    Swaps,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Balances => "balances",
            Self::Votes => "votes",
            Self::Swaps => "swaps",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Write for Relation {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Balances => 0,
            Self::Votes => 1,
            Self::Swaps => 2,
        };
        tag.write(writer);
    }
}

impl Read for Relation {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Balances),
            1 => Ok(Self::Votes),
            2 => Ok(Self::Swaps),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Relation {
    const SIZE: usize = u8::SIZE;
}

/// Spendable amount held by a wallet. At most one row per wallet.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance {
    pub wallet: PublicKey,
    pub amount: u64,
}

/// A policy vote. Append-only; duplicates are legal.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Vote {
    pub wallet: PublicKey,
    pub policy: String,
    pub choice: String,
}

/// HTLC escrow. Identified by the full tuple, not by a primary key.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Swap {
    pub sender: PublicKey,
    pub receiver: PublicKey,
    pub amount: u64,
    /// Unix timestamp (seconds).
    pub expiration: u64,
    pub hashlock: Hashlock,
}

impl Swap {
    /// The receiver may still claim the escrow.
    pub fn is_redeemable(&self, now: u64) -> bool {
        self.expiration > now
    }

    /// The sender may reclaim the escrow.
    ///
    /// A swap whose expiration equals `now` is neither redeemable nor refundable.
    pub fn is_refundable(&self, now: u64) -> bool {
        self.expiration < now
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Row {
    Balance(Balance),
    Vote(Vote),
    Swap(Swap),
}

impl Row {
    pub fn relation(&self) -> Relation {
        match self {
            Self::Balance(_) => Relation::Balances,
            Self::Vote(_) => Relation::Votes,
            Self::Swap(_) => Relation::Swaps,
        }
    }
}

impl From<Balance> for Row {
    fn from(value: Balance) -> Self {
        Self::Balance(value)
    }
}

impl From<Vote> for Row {
    fn from(value: Vote) -> Self {
        Self::Vote(value)
    }
}

impl From<Swap> for Row {
    fn from(value: Swap) -> Self {
        Self::Swap(value)
    }
}

/// Read predicate over a single relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    /// The balance row of `wallet`.
    Balance { wallet: PublicKey },
    /// Swaps claimable by `receiver` under `hashlock`.
    SwapsTo {
        receiver: PublicKey,
        hashlock: Hashlock,
    },
    /// Swaps funded by `sender` under `hashlock`.
    SwapsFrom { sender: PublicKey, hashlock: Hashlock },
}

impl Filter {
    pub fn relation(&self) -> Relation {
        match self {
            Self::Balance { .. } => Relation::Balances,
            Self::SwapsTo { .. } | Self::SwapsFrom { .. } => Relation::Swaps,
        }
    }

    /// Whether the predicate selects at most one row by construction.
    pub fn is_keyed(&self) -> bool {
        matches!(self, Self::Balance { .. })
    }

    pub fn matches(&self, row: &Row) -> bool {
        match (self, row) {
            (Self::Balance { wallet }, Row::Balance(balance)) => &balance.wallet == wallet,
            (Self::SwapsTo { receiver, hashlock }, Row::Swap(swap)) => {
                &swap.receiver == receiver && &swap.hashlock == hashlock
            }
            (Self::SwapsFrom { sender, hashlock }, Row::Swap(swap)) => {
                &swap.sender == sender && &swap.hashlock == hashlock
            }
            _ => false,
        }
    }
}

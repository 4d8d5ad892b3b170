use crate::codec::{read_text, text_encode_size, write_text};
use crate::delta::Delta;
use crate::ledger::Hashlock;
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, RangeCfg, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    ed25519::PublicKey,
    sha256::{Digest, Sha256},
    Digestible, Hasher,
};
use thiserror::Error as ThisError;

/// Maximum policy identifier length for vote transactions.
pub const MAX_POLICY_LENGTH: usize = 64;

/// Maximum choice length for vote transactions.
pub const MAX_CHOICE_LENGTH: usize = 64;

/// Maximum secret length for swap settlement.
pub const MAX_SECRET_LENGTH: usize = 256;

/// Most deltas a single transaction may emit when shipped inside an [`Output`].
pub const MAX_TRANSACTION_DELTAS: usize = 1024;

/// Most distinct escrows one settlement releases. Each costs a credit and a delete.
pub const MAX_SETTLEMENTS: usize = MAX_TRANSACTION_DELTAS / 2;

/// Wallets are identified by their ed25519 public key.
pub type Wallet = PublicKey;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum TransactionError {
    #[error("policy too long (len={len}, max={max})")]
    PolicyTooLong { len: usize, max: usize },
    #[error("choice too long (len={len}, max={max})")]
    ChoiceTooLong { len: usize, max: usize },
    #[error("secret too long (len={len}, max={max})")]
    SecretTooLong { len: usize, max: usize },
}

/// An already-authenticated transaction. The interpreter trusts `sender`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Wallet,
    pub instruction: Instruction,
}

impl Transaction {
    pub fn new(sender: Wallet, instruction: Instruction) -> Self {
        Self {
            sender,
            instruction,
        }
    }

    /// Check field bounds a decoded transaction already satisfies.
    ///
    /// Transactions built in memory skip the codec, so the interpreter re-checks them.
    pub fn validate(&self) -> Result<(), TransactionError> {
        match &self.instruction {
            Instruction::Vote { policy, choice } => {
                if policy.len() > MAX_POLICY_LENGTH {
                    return Err(TransactionError::PolicyTooLong {
                        len: policy.len(),
                        max: MAX_POLICY_LENGTH,
                    });
                }
                if choice.len() > MAX_CHOICE_LENGTH {
                    return Err(TransactionError::ChoiceTooLong {
                        len: choice.len(),
                        max: MAX_CHOICE_LENGTH,
                    });
                }
            }
            Instruction::SwapSettle { secret } => {
                if secret.len() > MAX_SECRET_LENGTH {
                    return Err(TransactionError::SecretTooLong {
                        len: secret.len(),
                        max: MAX_SECRET_LENGTH,
                    });
                }
            }
            Instruction::Standard { .. } | Instruction::SwapInitiate { .. } => {}
        }
        Ok(())
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.sender.write(writer);
        self.instruction.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let sender = PublicKey::read(reader)?;
        let instruction = Instruction::read(reader)?;
        Ok(Self {
            sender,
            instruction,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        PublicKey::SIZE + self.instruction.encode_size()
    }
}

impl Digestible for Transaction {
    type Digest = Digest;

    fn digest(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(self.sender.as_ref());
        let mut instruction = Vec::with_capacity(self.instruction.encode_size());
        self.instruction.write(&mut instruction);
        hasher.update(&instruction);
        hasher.finalize()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Move `amount` from the sender to `receiver`.
    /// Binary: [0] [receiver:32] [amount:u64 BE]
    Standard { receiver: Wallet, amount: u64 },

    /// Record a policy vote.
    /// Binary: [1] [policyLen:varint] [policy...] [choiceLen:varint] [choice...]
    Vote { policy: String, choice: String },

    /// Lock `amount` into an HTLC escrow for `receiver`.
    ///
    /// The hashlock is not checked. Settlement (redeem and refund alike) must present the
    /// preimage, which is capped at [`MAX_SECRET_LENGTH`] bytes; an escrow locked under a longer
    /// preimage can never be released.
    /// Binary: [2] [receiver:32] [amount:u64 BE] [expiration:u64 BE] [hashlock:32]
    SwapInitiate {
        receiver: Wallet,
        amount: u64,
        expiration: u64,
        hashlock: Hashlock,
    },

    /// Redeem or refund every eligible escrow locked under `sha3_256(secret)`.
    ///
    /// The secret may be empty; at most [`MAX_SECRET_LENGTH`] bytes.
    /// Binary: [3] [secretLen:varint] [secret...]
    SwapSettle { secret: Vec<u8> },
}

impl Instruction {
    /// Human-readable transaction kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Standard { .. } => "standard",
            Self::Vote { .. } => "vote",
            Self::SwapInitiate { .. } => "swap_initiate",
            Self::SwapSettle { .. } => "swap_settle",
        }
    }
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Standard { receiver, amount } => {
                0u8.write(writer);
                receiver.write(writer);
                amount.write(writer);
            }
            Self::Vote { policy, choice } => {
                1u8.write(writer);
                write_text(policy, writer);
                write_text(choice, writer);
            }
            Self::SwapInitiate {
                receiver,
                amount,
                expiration,
                hashlock,
            } => {
                2u8.write(writer);
                receiver.write(writer);
                amount.write(writer);
                expiration.write(writer);
                hashlock.write(writer);
            }
            Self::SwapSettle { secret } => {
                3u8.write(writer);
                secret.write(writer);
            }
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            0 => Self::Standard {
                receiver: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
            },
            1 => Self::Vote {
                policy: read_text(reader, MAX_POLICY_LENGTH, "policy")?,
                choice: read_text(reader, MAX_CHOICE_LENGTH, "choice")?,
            },
            2 => Self::SwapInitiate {
                receiver: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
                expiration: u64::read(reader)?,
                hashlock: Hashlock::read(reader)?,
            },
            3 => Self::SwapSettle {
                secret: Vec::<u8>::read_range(reader, 0..=MAX_SECRET_LENGTH)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Standard { .. } => PublicKey::SIZE + u64::SIZE,
                Self::Vote { policy, choice } => {
                    text_encode_size(policy) + text_encode_size(choice)
                }
                Self::SwapInitiate { .. } => {
                    PublicKey::SIZE + u64::SIZE + u64::SIZE + Hashlock::SIZE
                }
                Self::SwapSettle { secret } => secret.encode_size(),
            }
    }
}

/// The interpreter's verdict on one transaction of a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Accepted {
        transaction: Transaction,
        deltas: Vec<Delta>,
    },
    Rejected(Transaction),
}

impl Output {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Self::Accepted { transaction, .. } | Self::Rejected(transaction) => transaction,
        }
    }

    /// Deltas to apply; empty when rejected.
    pub fn deltas(&self) -> &[Delta] {
        match self {
            Self::Accepted { deltas, .. } => deltas,
            Self::Rejected(_) => &[],
        }
    }
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Accepted {
                transaction,
                deltas,
            } => {
                0u8.write(writer);
                transaction.write(writer);
                deltas.write(writer);
            }
            Self::Rejected(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Accepted {
                transaction: Transaction::read(reader)?,
                deltas: Vec::<Delta>::read_cfg(
                    reader,
                    &(RangeCfg::from(1..=MAX_TRANSACTION_DELTAS), ()),
                )?,
            }),
            1 => Ok(Self::Rejected(Transaction::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Accepted {
                    transaction,
                    deltas,
                } => transaction.encode_size() + deltas.encode_size(),
                Self::Rejected(transaction) => transaction.encode_size(),
            }
    }
}

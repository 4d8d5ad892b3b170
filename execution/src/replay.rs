//! Replay a scripted sequence of blocks against an in-memory ledger.
//!
//! The script is YAML: genesis balances plus blocks, each with a timestamp and the transactions
//! to run at that time. Wallets are written as a seed number (derived with
//! `PrivateKey::from_seed`) or as a hex encoded public key.
//!
//! ```yaml
//! log_level: info
//! genesis:
//!   - wallet: 1
//!     amount: 100
//! blocks:
//!   - timestamp: 1700000000
//!     transactions:
//!       - sender: 1
//!         instruction:
//!           standard: { receiver: 2, amount: 40 }
//!       - sender: 1
//!         instruction:
//!           swap_initiate: { receiver: 2, amount: 30, expiration: 1700000060, secret: s }
//!   - timestamp: 1700000030
//!     transactions:
//!       - sender: 2
//!         instruction:
//!           swap_settle: { secret: s }
//! ```

use crate::layer::{commit, execute};
use crate::state::{Memory, Scratch};
use anyhow::{Context as _, Result};
use commonware_codec::DecodeExt;
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use commonware_utils::from_hex_formatted;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, path::Path, str::FromStr};
use strata_types::{Hashlock, Instruction, Output, Transaction, TransactionError, Wallet};
use thiserror::Error;
use tracing::{info, Level};

fn default_log_level() -> String {
    "info".to_string()
}

/// A wallet given by seed or by hex encoded public key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WalletRef {
    Seed(u64),
    Hex(String),
}

impl WalletRef {
    fn resolve(&self) -> Result<Wallet, ConfigError> {
        match self {
            Self::Seed(seed) => Ok(PrivateKey::from_seed(*seed).public_key()),
            Self::Hex(value) => from_hex_formatted(value)
                .and_then(|bytes| Wallet::decode(bytes.as_ref()).ok())
                .ok_or_else(|| ConfigError::InvalidWallet {
                    value: value.clone(),
                }),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GenesisConfig {
    pub wallet: WalletRef,
    pub amount: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionConfig {
    Standard {
        receiver: WalletRef,
        amount: u64,
    },
    Vote {
        policy: String,
        choice: String,
    },
    /// Exactly one of `secret` (hashed here) or `hashlock` (hex) must be set.
    SwapInitiate {
        receiver: WalletRef,
        amount: u64,
        expiration: u64,
        #[serde(default)]
        secret: Option<String>,
        #[serde(default)]
        hashlock: Option<String>,
    },
    SwapSettle {
        secret: String,
    },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TransactionConfig {
    pub sender: WalletRef,
    /// A single-key map naming the instruction kind.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub instruction: InstructionConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BlockConfig {
    /// Unix seconds used for every expiration check in the block.
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<TransactionConfig>,
}

/// Replay script as written on disk.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub genesis: Vec<GenesisConfig>,
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("wallet must be a seed or a hex public key: {value}")]
    InvalidWallet { value: String },
    #[error("hashlock must be 32 hex encoded bytes: {value}")]
    InvalidHashlock { value: String },
    #[error("block {block} transaction {index}: set exactly one of secret or hashlock")]
    AmbiguousHashlock { block: usize, index: usize },
    #[error("duplicate genesis balance for {value:?}")]
    DuplicateGenesis { value: WalletRef },
    #[error("block {block} timestamp {timestamp} is before the previous block ({previous})")]
    TimestampRegression {
        block: usize,
        timestamp: u64,
        previous: u64,
    },
    #[error("block {block} transaction {index} is invalid")]
    InvalidTransaction {
        block: usize,
        index: usize,
        #[source]
        source: TransactionError,
    },
}

/// A block ready to execute.
#[derive(Clone, Debug)]
pub struct Block {
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
}

pub struct ValidatedConfig {
    pub log_level: Level,
    pub genesis: Vec<(Wallet, u64)>,
    pub blocks: Vec<Block>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        serde_yaml::from_str(&contents).context("Could not parse config file")
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        let mut seen = BTreeSet::new();
        let mut genesis = Vec::with_capacity(self.genesis.len());
        for entry in &self.genesis {
            let wallet = entry.wallet.resolve()?;
            if !seen.insert(wallet.clone()) {
                return Err(ConfigError::DuplicateGenesis {
                    value: entry.wallet.clone(),
                });
            }
            genesis.push((wallet, entry.amount));
        }

        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut previous = 0;
        for (block, config) in self.blocks.iter().enumerate() {
            if config.timestamp < previous {
                return Err(ConfigError::TimestampRegression {
                    block,
                    timestamp: config.timestamp,
                    previous,
                });
            }
            previous = config.timestamp;

            let mut transactions = Vec::with_capacity(config.transactions.len());
            for (index, tx) in config.transactions.iter().enumerate() {
                let transaction = Transaction::new(
                    tx.sender.resolve()?,
                    tx.instruction.resolve(block, index)?,
                );
                transaction
                    .validate()
                    .map_err(|source| ConfigError::InvalidTransaction {
                        block,
                        index,
                        source,
                    })?;
                transactions.push(transaction);
            }
            blocks.push(Block {
                timestamp: config.timestamp,
                transactions,
            });
        }

        Ok(ValidatedConfig {
            log_level,
            genesis,
            blocks,
        })
    }
}

impl InstructionConfig {
    fn resolve(&self, block: usize, index: usize) -> Result<Instruction, ConfigError> {
        Ok(match self {
            Self::Standard { receiver, amount } => Instruction::Standard {
                receiver: receiver.resolve()?,
                amount: *amount,
            },
            Self::Vote { policy, choice } => Instruction::Vote {
                policy: policy.clone(),
                choice: choice.clone(),
            },
            Self::SwapInitiate {
                receiver,
                amount,
                expiration,
                secret,
                hashlock,
            } => {
                let hashlock = match (secret, hashlock) {
                    (Some(secret), None) => Hashlock::from_secret(secret.as_bytes()),
                    (None, Some(value)) => {
                        Hashlock::from_hex(value).ok_or_else(|| ConfigError::InvalidHashlock {
                            value: value.clone(),
                        })?
                    }
                    _ => return Err(ConfigError::AmbiguousHashlock { block, index }),
                };
                Instruction::SwapInitiate {
                    receiver: receiver.resolve()?,
                    amount: *amount,
                    expiration: *expiration,
                    hashlock,
                }
            }
            Self::SwapSettle { secret } => Instruction::SwapSettle {
                secret: secret.as_bytes().to_vec(),
            },
        })
    }
}

/// Outputs of one replayed block.
#[derive(Clone, Debug)]
pub struct BlockReport {
    pub timestamp: u64,
    pub outputs: Vec<Output>,
}

/// Everything a replay produced.
#[derive(Clone, Debug)]
pub struct Report {
    pub blocks: Vec<BlockReport>,
    pub state: Memory,
}

/// Execute every block against a fresh ledger seeded with the genesis balances.
///
/// Each block runs on its own scratch layer and is committed before the next one starts.
pub fn run(config: &ValidatedConfig) -> Result<Report> {
    let mut state = Memory::with_balances(config.genesis.iter().cloned());
    let mut scratch = Scratch::new();
    let mut blocks = Vec::with_capacity(config.blocks.len());
    for (height, block) in config.blocks.iter().enumerate() {
        let outputs = execute(
            &mut scratch,
            &state,
            block.timestamp,
            block.transactions.clone(),
        )
        .with_context(|| format!("block {height} failed"))?;
        commit(&mut state, &outputs).with_context(|| format!("block {height} failed to commit"))?;
        scratch.clear();
        info!(
            height,
            timestamp = block.timestamp,
            transactions = outputs.len(),
            "replayed block"
        );
        blocks.push(BlockReport {
            timestamp: block.timestamp,
            outputs,
        });
    }
    Ok(Report { blocks, state })
}

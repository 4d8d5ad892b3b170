//! Deterministic fixtures for tests and local replays.

use crate::state::Memory;
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use strata_types::{Hashlock, Instruction, Swap, Transaction, Wallet};

/// Wallet derived from `seed`. Same seed, same wallet.
pub fn wallet(seed: u64) -> Wallet {
    PrivateKey::from_seed(seed).public_key()
}

pub fn swap(sender: u64, receiver: u64, amount: u64, expiration: u64, hashlock: Hashlock) -> Swap {
    Swap {
        sender: wallet(sender),
        receiver: wallet(receiver),
        amount,
        expiration,
        hashlock,
    }
}

/// Committed store funded with `(seed, amount)` pairs.
pub fn funded(balances: &[(u64, u64)]) -> Memory {
    Memory::with_balances(
        balances
            .iter()
            .map(|(seed, amount)| (wallet(*seed), *amount)),
    )
}

pub fn transfer(sender: u64, receiver: u64, amount: u64) -> Transaction {
    Transaction::new(
        wallet(sender),
        Instruction::Standard {
            receiver: wallet(receiver),
            amount,
        },
    )
}

pub fn vote(sender: u64, policy: &str, choice: &str) -> Transaction {
    Transaction::new(
        wallet(sender),
        Instruction::Vote {
            policy: policy.to_string(),
            choice: choice.to_string(),
        },
    )
}

pub fn initiate(
    sender: u64,
    receiver: u64,
    amount: u64,
    expiration: u64,
    secret: &[u8],
) -> Transaction {
    Transaction::new(
        wallet(sender),
        Instruction::SwapInitiate {
            receiver: wallet(receiver),
            amount,
            expiration,
            hashlock: Hashlock::from_secret(secret),
        },
    )
}

pub fn settle(sender: u64, secret: &[u8]) -> Transaction {
    Transaction::new(
        wallet(sender),
        Instruction::SwapSettle {
            secret: secret.to_vec(),
        },
    )
}

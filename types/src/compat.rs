#![cfg(test)]
use crate::delta::{Delta, Operation};
use crate::execution::{Instruction, Transaction};
use crate::ledger::{Balance, Hashlock, Row};
use commonware_codec::Encode;
use commonware_cryptography::{ed25519::PrivateKey, Signer};

#[test]
fn balance_delta_encoding_is_stable() {
    let wallet = PrivateKey::from_seed(1).public_key();
    let delta = Delta::new(
        Operation::Update,
        &Row::Balance(Balance {
            wallet: wallet.clone(),
            amount: 60,
        }),
    );

    let mut expected = vec![1u8, 0, 2, 0, 0];
    expected.extend_from_slice(wallet.as_ref());
    expected.extend_from_slice(&[1, 1, 0, 0, 0, 0, 0, 0, 0, 60]);
    assert_eq!(delta.encode().as_ref(), expected.as_slice());
}

#[test]
fn settle_encoding_is_stable() {
    let sender = PrivateKey::from_seed(2).public_key();
    let tx = Transaction::new(
        sender.clone(),
        Instruction::SwapSettle {
            secret: vec![0xab, 0xcd],
        },
    );

    let mut expected = sender.as_ref().to_vec();
    expected.extend_from_slice(&[3, 2, 0xab, 0xcd]);
    assert_eq!(tx.encode().as_ref(), expected.as_slice());
}

#[test]
fn hashlock_of_known_secret_is_stable() {
    // SHA3-256("abc")
    assert_eq!(
        Hashlock::from_secret(b"abc").to_string(),
        "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"
    );
}

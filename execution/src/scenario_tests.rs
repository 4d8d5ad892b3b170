//! End-to-end handler behavior through the public interpreter.

use crate::mocks::{funded, initiate, settle, swap, transfer, vote, wallet};
use crate::state::{Memory, Scratch, Store};
use crate::{commit, execute, Interpreter};
use strata_types::{Balance, Delta, Hashlock, Operation, Output, Row, Transaction, Vote};

const T: u64 = 1_700_000_000;

fn balance(seed: u64, amount: u64) -> Row {
    Row::Balance(Balance {
        wallet: wallet(seed),
        amount,
    })
}

fn interpret(state: &Memory, timestamp: u64, tx: &Transaction) -> Option<Vec<Delta>> {
    let scratch = Scratch::new();
    Interpreter::new(&scratch, state, timestamp)
        .interpret(tx)
        .unwrap()
}

/// Apply `tx` to `state` if accepted. Returns whether it was.
fn apply(state: &mut Memory, timestamp: u64, tx: &Transaction) -> bool {
    match interpret(state, timestamp, tx) {
        Some(deltas) => {
            state.apply(&deltas).unwrap();
            true
        }
        None => false,
    }
}

#[test]
fn test_transfer_to_new_wallet() {
    let state = funded(&[(1, 100)]);
    let deltas = interpret(&state, T, &transfer(1, 2, 40)).unwrap();
    assert_eq!(
        deltas,
        vec![
            Delta::new(Operation::Update, &balance(1, 60)),
            Delta::new(Operation::Insert, &balance(2, 40)),
        ]
    );
}

#[test]
fn test_transfer_to_existing_wallet_updates() {
    let state = funded(&[(1, 100), (2, 5)]);
    let deltas = interpret(&state, T, &transfer(1, 2, 40)).unwrap();
    assert_eq!(deltas[1], Delta::new(Operation::Update, &balance(2, 45)));
}

#[test]
fn test_transfer_insufficient_funds() {
    let mut state = funded(&[(1, 50)]);
    assert_eq!(interpret(&state, T, &transfer(1, 2, 100)), None);
    assert!(!apply(&mut state, T, &transfer(1, 2, 100)));
    assert_eq!(state.balance(&wallet(1)), Some(50));
    assert_eq!(state.balance(&wallet(2)), None);
}

#[test]
fn test_transfer_edges() {
    // Unknown sender.
    let state = funded(&[(2, 10)]);
    assert_eq!(interpret(&state, T, &transfer(1, 2, 0)), None);

    // Exact balance and zero amount are both fine.
    let state = funded(&[(1, 40)]);
    let deltas = interpret(&state, T, &transfer(1, 2, 40)).unwrap();
    assert_eq!(deltas[0], Delta::new(Operation::Update, &balance(1, 0)));
    assert!(interpret(&state, T, &transfer(1, 2, 0)).is_some());

    // Receiver overflow rejects.
    let state = funded(&[(1, 10), (2, u64::MAX)]);
    assert_eq!(interpret(&state, T, &transfer(1, 2, 1)), None);
}

#[test]
fn test_self_transfer_nets_out() {
    let mut state = funded(&[(1, 100)]);
    let deltas = interpret(&state, T, &transfer(1, 1, 40)).unwrap();
    assert_eq!(
        deltas,
        vec![
            Delta::new(Operation::Update, &balance(1, 60)),
            Delta::new(Operation::Update, &balance(1, 100)),
        ]
    );
    state.apply(&deltas).unwrap();
    assert_eq!(state.balance(&wallet(1)), Some(100));
}

#[test]
fn test_swap_initiate_escrows() {
    let state = funded(&[(1, 100)]);
    let hashlock = Hashlock::from_secret(b"H");
    let deltas = interpret(&state, T, &initiate(1, 2, 30, T + 60, b"H")).unwrap();
    assert_eq!(
        deltas,
        vec![
            Delta::new(Operation::Update, &balance(1, 70)),
            Delta::new(Operation::Insert, &Row::Swap(swap(1, 2, 30, T + 60, hashlock))),
        ]
    );
}

#[test]
fn test_swap_initiate_without_balance_row() {
    let state = Memory::default();
    assert_eq!(interpret(&state, T, &initiate(1, 2, 1, T + 60, b"H")), None);

    // Zero escrow from a wallet without a row creates the row.
    let deltas = interpret(&state, T, &initiate(1, 2, 0, T + 60, b"H")).unwrap();
    assert_eq!(deltas[0], Delta::new(Operation::Insert, &balance(1, 0)));
}

#[test]
fn test_redeem_before_expiration() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));

    let deltas = interpret(&state, T + 30, &settle(2, b"H")).unwrap();
    let escrow = swap(1, 2, 30, T + 60, Hashlock::from_secret(b"H"));
    assert_eq!(
        deltas,
        vec![
            Delta::new(Operation::Insert, &balance(2, 30)),
            Delta::new(Operation::Delete, &Row::Swap(escrow)),
        ]
    );

    state.apply(&deltas).unwrap();
    assert_eq!(state.balance(&wallet(2)), Some(30));
    assert_eq!(state.swaps().count(), 0);
    assert_eq!(state.total_value(), 100);
}

#[test]
fn test_expired_swap_refunds_only() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));

    // Too late to redeem.
    assert_eq!(interpret(&state, T + 61, &settle(2, b"H")), None);

    let deltas = interpret(&state, T + 61, &settle(1, b"H")).unwrap();
    let escrow = swap(1, 2, 30, T + 60, Hashlock::from_secret(b"H"));
    assert_eq!(
        deltas,
        vec![
            Delta::new(Operation::Update, &balance(1, 100)),
            Delta::new(Operation::Delete, &Row::Swap(escrow)),
        ]
    );
    state.apply(&deltas).unwrap();
    assert_eq!(state.balance(&wallet(1)), Some(100));
}

#[test]
fn test_refund_not_available_before_expiration() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));
    assert_eq!(interpret(&state, T + 59, &settle(1, b"H")), None);
}

#[test]
fn test_expiration_instant_settles_nothing() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));
    assert_eq!(interpret(&state, T + 60, &settle(2, b"H")), None);
    assert_eq!(interpret(&state, T + 60, &settle(1, b"H")), None);
}

#[test]
fn test_wrong_secret_settles_nothing() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));
    assert_eq!(interpret(&state, T + 1, &settle(2, b"not it")), None);
    assert_eq!(interpret(&state, T + 61, &settle(1, b"not it")), None);
}

#[test]
fn test_reused_hashlock_settles_every_escrow() {
    let mut state = funded(&[(1, 100), (3, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));
    assert!(apply(&mut state, T, &initiate(3, 2, 20, T + 60, b"H")));

    let deltas = interpret(&state, T + 1, &settle(2, b"H")).unwrap();
    assert_eq!(deltas.len(), 4);
    assert_eq!(deltas[0].operation, Operation::Insert);
    assert_eq!(deltas[2], Delta::new(Operation::Update, &balance(2, 50)));

    state.apply(&deltas).unwrap();
    assert_eq!(state.balance(&wallet(2)), Some(50));
    assert_eq!(state.swaps().count(), 0);
    assert_eq!(state.total_value(), 200);
}

#[test]
fn test_duplicate_escrows_are_each_credited() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"H")));
    assert_eq!(state.swaps().count(), 2);

    // One delete removes both copies, so they share one credit.
    let escrow = swap(1, 2, 30, T + 60, Hashlock::from_secret(b"H"));
    let deltas = interpret(&state, T + 1, &settle(2, b"H")).unwrap();
    assert_eq!(
        deltas,
        vec![
            Delta::new(Operation::Insert, &balance(2, 60)),
            Delta::new(Operation::Delete, &Row::Swap(escrow)),
        ]
    );

    state.apply(&deltas).unwrap();
    assert_eq!(state.balance(&wallet(2)), Some(60));
    assert_eq!(state.swaps().count(), 0);
    assert_eq!(state.total_value(), 100);
}

#[test]
fn test_empty_secret_locks_and_settles() {
    let mut state = funded(&[(1, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 60, b"")));
    assert!(apply(&mut state, T, &initiate(1, 3, 20, T + 60, b"")));

    assert!(apply(&mut state, T + 1, &settle(2, b"")));
    assert_eq!(state.balance(&wallet(2)), Some(30));
    assert_eq!(state.swaps().count(), 1);

    assert!(apply(&mut state, T + 61, &settle(1, b"")));
    assert_eq!(state.balance(&wallet(1)), Some(70));
    assert_eq!(state.swaps().count(), 0);
    assert_eq!(state.total_value(), 100);
}

#[test]
fn test_settlement_is_capped_per_call() {
    use commonware_codec::{DecodeExt, Encode};
    use strata_types::execution::{MAX_SETTLEMENTS, MAX_TRANSACTION_DELTAS};

    // One escrow more than a single call may release, each with a distinct expiration.
    let hashlock = Hashlock::from_secret(b"H");
    let mut state = funded(&[(1, 0)]);
    for offset in 0..=MAX_SETTLEMENTS as u64 {
        state
            .insert(Row::Swap(swap(1, 2, 1, T + 60 + offset, hashlock)))
            .unwrap();
    }

    let tx = settle(2, b"H");
    let deltas = interpret(&state, T, &tx).unwrap();
    assert_eq!(deltas.len(), MAX_TRANSACTION_DELTAS);
    assert_eq!(
        deltas[MAX_TRANSACTION_DELTAS - 2],
        Delta::new(Operation::Update, &balance(2, MAX_SETTLEMENTS as u64))
    );

    // The result still fits an output.
    let output = Output::Accepted {
        transaction: tx.clone(),
        deltas: deltas.clone(),
    };
    assert_eq!(Output::decode(output.encode().as_ref()).unwrap(), output);

    // The latest expiration sorts last and is left for the next call.
    state.apply(&deltas).unwrap();
    let remaining: Vec<_> = state.swaps().cloned().collect();
    assert_eq!(
        remaining,
        vec![swap(1, 2, 1, T + 60 + MAX_SETTLEMENTS as u64, hashlock)]
    );

    assert!(apply(&mut state, T, &tx));
    assert_eq!(state.swaps().count(), 0);
    assert_eq!(state.balance(&wallet(2)), Some(MAX_SETTLEMENTS as u64 + 1));
    assert_eq!(state.total_value(), MAX_SETTLEMENTS as u128 + 1);
}

#[test]
fn test_settle_redeems_and_refunds_in_one_call() {
    // Wallet 2 is owed one escrow and funded another, expired one, under the same lock.
    let mut state = funded(&[(1, 100), (2, 100)]);
    assert!(apply(&mut state, T, &initiate(1, 2, 30, T + 600, b"H")));
    assert!(apply(&mut state, T, &initiate(2, 3, 10, T + 60, b"H")));

    let deltas = interpret(&state, T + 61, &settle(2, b"H")).unwrap();
    assert_eq!(
        deltas[0],
        Delta::new(Operation::Update, &balance(2, 120))
    );
    assert_eq!(
        deltas[2],
        Delta::new(Operation::Update, &balance(2, 130))
    );
    state.apply(&deltas).unwrap();
    assert_eq!(state.balance(&wallet(2)), Some(130));
    assert_eq!(state.total_value(), 200);
}

#[test]
fn test_vote_always_accepted() {
    let state = Memory::default();
    let deltas = interpret(&state, T, &vote(3, "P", "C")).unwrap();
    assert_eq!(
        deltas,
        vec![Delta::new(
            Operation::Insert,
            &Row::Vote(Vote {
                wallet: wallet(3),
                policy: "P".into(),
                choice: "C".into(),
            })
        )]
    );

    // Repeated votes append.
    let mut state = Memory::default();
    assert!(apply(&mut state, T, &vote(3, "P", "C")));
    assert!(apply(&mut state, T, &vote(3, "P", "C")));
    assert_eq!(state.votes().len(), 2);
}

#[test]
fn test_swap_lifecycle_within_one_block() {
    // Initiate and redeem in the same batch: the redeem sees the escrow through scratch.
    let mut state = funded(&[(1, 100)]);
    let mut scratch = Scratch::new();
    let outputs = execute(
        &mut scratch,
        &state,
        T,
        vec![
            initiate(1, 2, 30, T + 60, b"H"),
            settle(2, b"H"),
            settle(2, b"H"),
        ],
    )
    .unwrap();
    assert!(matches!(outputs[0], Output::Accepted { .. }));
    assert!(matches!(outputs[1], Output::Accepted { .. }));
    assert!(matches!(outputs[2], Output::Rejected(_)));

    commit(&mut state, &outputs).unwrap();
    assert_eq!(state.balance(&wallet(1)), Some(70));
    assert_eq!(state.balance(&wallet(2)), Some(30));
    assert_eq!(state.swaps().count(), 0);
}

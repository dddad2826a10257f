//! # Concurrency Integration Tests
//!
//! The engine is a single-writer state machine; callers on several threads
//! share it through `Arc<Mutex<_>>`. Racing releases of one escrow must
//! produce exactly one payout.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use ddrail_settlement::SettlementEngine;
use ddrail_types::*;
use ed25519_dalek::SigningKey;

fn shared_engine_with_escrow(
    amount: u64,
) -> (Arc<Mutex<SettlementEngine>>, Identity, Identity) {
    let admin = Identity::random();
    let treasurer = Identity::random();
    let issuer = Identity::random();
    let seller = Identity::random();

    let mut engine = SettlementEngine::new(EngineConfig::new(Identity::random(), admin));
    let usdc = {
        let ledger = engine.ledger_mut();
        let usdc = ledger
            .create_mint(&SigningKey::from_bytes(&rand::random()), 6, issuer)
            .unwrap();
        let acct = ledger.ensure_associated_account(seller, usdc).unwrap();
        ledger.mint_to(usdc, acct, issuer, amount).unwrap();
        usdc
    };
    engine.initialize(admin, treasurer).unwrap();
    engine.configure(admin, usdc).unwrap();
    engine.deposit(seller, usdc, amount).unwrap();
    engine.offer_dd(seller, amount).unwrap();

    (Arc::new(Mutex::new(engine)), treasurer, seller)
}

#[test]
fn racing_releases_pay_exactly_once() {
    let (engine, treasurer, seller) = shared_engine_with_escrow(100_000_000);
    let barrier = Arc::new(Barrier::new(2));
    let beneficiaries = [Identity::random(), Identity::random()];

    let handles: Vec<_> = beneficiaries
        .iter()
        .map(|&beneficiary| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut engine = engine.lock().unwrap();
                engine.release_funds(treasurer, seller, beneficiary)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let no_escrow = results
        .iter()
        .filter(|r| matches!(r, Err(RailError::NoEscrow(owner)) if *owner == seller))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(no_escrow, 1);

    let engine = engine.lock().unwrap();
    let paid: u64 = beneficiaries.iter().map(|b| engine.dd_balance(b)).sum();
    assert_eq!(paid, 100_000_000);
    assert!(engine.escrow(&seller).is_none());
    engine.verify_parity().unwrap();
}

#[test]
fn parallel_depositors_all_land() {
    let admin = Identity::random();
    let issuer = Identity::random();
    let users: Vec<Identity> = (0..8).map(|_| Identity::random()).collect();

    let mut engine = SettlementEngine::new(EngineConfig::new(Identity::random(), admin));
    let usdc = {
        let ledger = engine.ledger_mut();
        let usdc = ledger
            .create_mint(&SigningKey::from_bytes(&rand::random()), 6, issuer)
            .unwrap();
        for user in &users {
            let acct = ledger.ensure_associated_account(*user, usdc).unwrap();
            ledger.mint_to(usdc, acct, issuer, 1_000).unwrap();
        }
        usdc
    };
    engine.initialize(admin, Identity::random()).unwrap();
    engine.configure(admin, usdc).unwrap();
    let engine = Arc::new(Mutex::new(engine));

    let handles: Vec<_> = users
        .iter()
        .map(|&user| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..10 {
                    engine.lock().unwrap().deposit(user, usdc, 100).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let engine = engine.lock().unwrap();
    for user in &users {
        assert_eq!(engine.dd_balance(user), 1_000);
        assert_eq!(engine.reserve_balance(user), 0);
    }
    assert_eq!(engine.vault_balance(), 8_000);
    engine.verify_parity().unwrap();
    engine.journal().verify_chain().unwrap();
}

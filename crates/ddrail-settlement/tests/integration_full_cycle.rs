//! # Full-Cycle Integration Tests
//!
//! Drives the engine through its whole lifecycle, then through an OTC deal:
//!
//! ```text
//! initialize → configure → deposit → redeem → offer_dd → release_funds
//! signed offers → OfferBook → Deal → readout → SettlementDesk release
//! ```

use ddrail_ledger::Ed25519Verifier;
use ddrail_settlement::{OfferBook, OfferStatus, SettlementDesk, SettlementEngine};
use ddrail_types::*;
use ed25519_dalek::{Signer, SigningKey};

struct World {
    engine: SettlementEngine,
    admin: Identity,
    treasurer: Identity,
    usdc: Identity,
    usdc_issuer: Identity,
}

fn world_with_treasurer(treasurer: Identity) -> World {
    let admin = Identity::random();
    let usdc_issuer = Identity::random();
    let mut engine = SettlementEngine::new(EngineConfig::new(Identity::random(), admin));
    let usdc = engine
        .ledger_mut()
        .create_mint(&SigningKey::from_bytes(&rand::random()), 6, usdc_issuer)
        .unwrap();
    engine.initialize(admin, treasurer).unwrap();
    engine.configure(admin, usdc).unwrap();
    World {
        engine,
        admin,
        treasurer,
        usdc,
        usdc_issuer,
    }
}

fn world() -> World {
    world_with_treasurer(Identity::random())
}

fn fund(w: &mut World, user: Identity, amount: u64) {
    let ledger = w.engine.ledger_mut();
    let acct = ledger.ensure_associated_account(user, w.usdc).unwrap();
    ledger.mint_to(w.usdc, acct, w.usdc_issuer, amount).unwrap();
}

fn signed_request(key: &SigningKey, amount: u64, bank_account: &str) -> OfferRequest {
    let mut request = OfferRequest {
        amount: u128::from(amount),
        bank_account: bank_account.to_string(),
        public_key: Identity::from_verifying_key(&key.verifying_key()).to_base58(),
        signature: String::new(),
    };
    let signature = key.sign(&request.canonical_payload());
    request.signature = bs58::encode(signature.to_bytes()).into_string();
    request
}

// ═══════════════════════════════════════════════════════════════════
// Lifecycle scenario
// ═══════════════════════════════════════════════════════════════════

#[test]
fn deposit_redeem_escrow_release_scenario() {
    let mut w = world();
    let user = Identity::random();
    fund(&mut w, user, 1_000_000_000);
    let reserve_start = w.engine.reserve_balance(&user);

    // deposit 223 DD
    w.engine.deposit(user, w.usdc, 223_000_000).unwrap();
    assert_eq!(w.engine.reserve_balance(&user), reserve_start - 223_000_000);
    assert_eq!(w.engine.dd_balance(&user), 223_000_000);
    w.engine.verify_parity().unwrap();

    // redeem 123 DD
    w.engine.redeem(user, w.usdc, 123_000_000).unwrap();
    assert_eq!(w.engine.dd_balance(&user), 100_000_000);
    assert_eq!(w.engine.reserve_balance(&user), reserve_start - 100_000_000);
    w.engine.verify_parity().unwrap();

    // lock 100 DD
    let record = w.engine.offer_dd(user, 100_000_000).unwrap();
    assert_eq!(w.engine.dd_balance(&user), 0);
    assert_eq!(w.engine.escrow_balance(&user), 100_000_000);
    assert_eq!(record.custody, w.engine.escrow_custody(&user));

    // release back to the owner
    w.engine.release_funds(w.treasurer, user, user).unwrap();
    assert_eq!(w.engine.dd_balance(&user), 100_000_000);
    assert!(w.engine.escrow(&user).is_none());
    assert_eq!(
        w.engine.release_funds(w.treasurer, user, user).unwrap_err(),
        RailError::NoEscrow(user)
    );

    w.engine.verify_parity().unwrap();
    assert_eq!(w.engine.vault_balance(), 100_000_000);
    assert_eq!(w.engine.dd_supply(), 100_000_000);
}

#[test]
fn journal_records_every_transition() {
    let mut w = world();
    let user = Identity::random();
    fund(&mut w, user, 10);
    w.engine.deposit(user, w.usdc, 10).unwrap();
    w.engine.offer_fiat(user, 5).unwrap();
    w.engine.offer_dd(user, 10).unwrap();
    w.engine.release_funds(w.treasurer, user, user).unwrap();
    w.engine.redeem(user, w.usdc, 10).unwrap();

    let labels: Vec<&str> = w
        .engine
        .journal()
        .entries()
        .iter()
        .map(|e| e.event.label())
        .collect();
    assert_eq!(
        labels,
        [
            "INITIALIZED",
            "CONFIGURED",
            "DEPOSITED",
            "FIAT_OFFERED",
            "ESCROW_OPENED",
            "FUNDS_RELEASED",
            "REDEEMED"
        ]
    );
    w.engine.journal().verify_chain().unwrap();
}

#[test]
fn failed_operations_leave_no_journal_trace() {
    let mut w = world();
    let user = Identity::random();
    let before = w.engine.journal().len();
    assert!(w.engine.deposit(user, w.usdc, 1).is_err());
    assert!(w.engine.offer_dd(user, 1).is_err());
    assert!(w.engine.release_funds(w.treasurer, user, user).is_err());
    assert!(w.engine.configure(user, w.usdc).is_err());
    assert_eq!(w.engine.journal().len(), before);
}

#[test]
fn many_users_conserve_supply() {
    let mut w = world();
    let users: Vec<Identity> = (0..20).map(|_| Identity::random()).collect();
    for (i, user) in users.iter().enumerate() {
        fund(&mut w, *user, 1_000);
        w.engine.deposit(*user, w.usdc, 100 + i as u64).unwrap();
    }
    for user in users.iter().step_by(2) {
        w.engine.redeem(*user, w.usdc, 50).unwrap();
    }
    for user in users.iter().skip(1).step_by(3) {
        w.engine.offer_dd(*user, 40).unwrap();
    }
    w.engine.verify_parity().unwrap();

    let held: u128 = users
        .iter()
        .map(|u| u128::from(w.engine.dd_balance(u)) + u128::from(w.engine.escrow_balance(u)))
        .sum();
    assert_eq!(held, u128::from(w.engine.dd_supply()));
    assert_eq!(w.engine.vault_balance(), w.engine.dd_supply());
}

#[test]
fn admin_is_not_settlement_authority() {
    let mut w = world();
    let user = Identity::random();
    fund(&mut w, user, 10);
    w.engine.deposit(user, w.usdc, 10).unwrap();
    w.engine.offer_dd(user, 10).unwrap();
    assert!(matches!(
        w.engine.release_funds(w.admin, user, w.admin),
        Err(RailError::Unauthorized { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════
// OTC deal through the side channel
// ═══════════════════════════════════════════════════════════════════

#[test]
fn signed_offers_to_released_deal() {
    let treasurer_key = SigningKey::from_bytes(&rand::random());
    let treasurer = Identity::from_verifying_key(&treasurer_key.verifying_key());
    let mut w = world_with_treasurer(treasurer);

    let seller_key = SigningKey::from_bytes(&rand::random());
    let buyer_key = SigningKey::from_bytes(&rand::random());
    let seller = Identity::from_verifying_key(&seller_key.verifying_key());
    let buyer = Identity::from_verifying_key(&buyer_key.verifying_key());

    // Seller holds DD.
    fund(&mut w, seller, 100_000_000);
    w.engine.deposit(seller, w.usdc, 100_000_000).unwrap();

    // Both sides advertise.
    let mut book = OfferBook::new(w.engine.config().dd_decimals);
    let ask = book
        .submit(
            &signed_request(&seller_key, 100_000_000, "SELLER-IBAN"),
            OfferDirection::DdToFiat,
            &Ed25519Verifier,
        )
        .unwrap();
    let bid = book
        .submit(
            &signed_request(&buyer_key, 100_000_000, "BUYER-IBAN"),
            OfferDirection::FiatToDd,
            &Ed25519Verifier,
        )
        .unwrap();
    assert_eq!(book.status(&ask), Some(OfferStatus::Pending));
    assert_eq!(book.open_offers().len(), 1);

    // Seller locks DD; the ask becomes open.
    assert!(book.promote_funded(&w.engine).promoted.is_empty());
    w.engine.offer_dd(seller, 100_000_000).unwrap();
    let report = book.promote_funded(&w.engine);
    assert_eq!(report.promoted, vec![ask]);
    assert_eq!(book.open_offers().len(), 2);

    // Pair and reconcile.
    let env = std::collections::HashMap::from([
        ("PROGRAM_ID", w.engine.config().program_id.to_base58()),
        ("DD_MINT", w.engine.dd_mint().address().to_base58()),
        (
            "TREASURER_SECRET_KEY",
            serde_json::to_string(&treasurer_key.to_keypair_bytes().to_vec()).unwrap(),
        ),
    ]);
    let treasury = TreasuryConfig::from_lookup(|k| env.get(k).cloned());
    let mut desk = SettlementDesk::from_treasury(&treasury).unwrap();
    let deal = desk.open_deal(&mut book, &ask, &bid).unwrap();
    assert!(book.is_empty());

    // Only one leg confirmed: nothing released.
    desk.ingest_readout("2024-03-01,Transfer to SELLER-IBAN,100.00,BUYER-IBAN,tx-1\n");
    assert!(desk.release_settled(&mut w.engine).is_empty());
    assert_eq!(w.engine.escrow_balance(&seller), 100_000_000);

    desk.ingest_readout(
        "# incoming\n2024-03-01,Transfer from BUYER-IBAN,100.00,SELLER-IBAN,tx-2\n",
    );
    let outcomes = desk.release_settled(&mut w.engine);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].deal, deal);
    assert_eq!(outcomes[0].result.as_ref().unwrap().paid, 100_000_000);
    assert!(desk.deals().is_empty());

    assert_eq!(w.engine.dd_balance(&buyer), 100_000_000);
    assert_eq!(w.engine.dd_balance(&seller), 0);
    assert!(w.engine.escrow(&seller).is_none());
    w.engine.verify_parity().unwrap();
}

#[test]
fn stale_offer_is_reported_not_promoted() {
    let mut w = world();
    let seller_key = SigningKey::from_bytes(&rand::random());
    let seller = Identity::from_verifying_key(&seller_key.verifying_key());
    fund(&mut w, seller, 50);
    w.engine.deposit(seller, w.usdc, 50).unwrap();

    let mut book = OfferBook::new(6);
    let ask = book
        .submit(
            &signed_request(&seller_key, 50, "SELLER-IBAN"),
            OfferDirection::DdToFiat,
            &Ed25519Verifier,
        )
        .unwrap();
    w.engine.offer_dd(seller, 49).unwrap();

    let report = book.promote_funded(&w.engine);
    assert!(report.promoted.is_empty());
    assert_eq!(report.stale, vec![ask]);
    assert_eq!(book.status(&ask), Some(OfferStatus::Pending));
}

#[test]
fn forged_offer_is_rejected() {
    let owner_key = SigningKey::from_bytes(&rand::random());
    let forger_key = SigningKey::from_bytes(&rand::random());
    let mut request = signed_request(&owner_key, 10, "OWNER-IBAN");
    // Re-sign with a different key but keep the owner's public key.
    let forged = forger_key.sign(&request.canonical_payload());
    request.signature = bs58::encode(forged.to_bytes()).into_string();

    let mut book = OfferBook::new(6);
    assert!(matches!(
        book.submit(&request, OfferDirection::FiatToDd, &Ed25519Verifier),
        Err(RailError::AttestationInvalid { .. })
    ));

    // Changing the bank account after signing is also caught.
    let mut request = signed_request(&owner_key, 10, "OWNER-IBAN");
    request.bank_account = "ATTACKER-IBAN".into();
    assert!(book
        .submit(&request, OfferDirection::FiatToDd, &Ed25519Verifier)
        .is_err());
    assert!(book.is_empty());
}

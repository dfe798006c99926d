//! End-to-end tests of the signing pipeline through `SigningEngine`.
//!
//! Every scenario goes intent -> canonical action -> msgpack -> hash ->
//! signature and checks the result from the outside: body JSON, nonce order
//! and signer recovery.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};

use alloy::primitives::{Address, B256};
use hlsign_core::{
    ClientOrderId, Grouping, Instrument, InstrumentBook, OrderBatch, OrderIntent, OrderSide,
    Price, Size, Tpsl,
};
use hlsign_signer::encoder;
use hlsign_signer::wire::{ApproveBuilderFee, OrderAction, SIGNATURE_CHAIN_ID};
use hlsign_signer::{
    L1Action, Network, OrderTypeWire, OrderWire, PhantomAgent, RequestOptions, SignError,
    SigningEngine, SigningIdentity, UserAction,
};
use rust_decimal_macros::dec;

// Well-known test private key (DO NOT use in production)
const TEST_PRIVATE_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

fn book() -> InstrumentBook {
    [
        Instrument::perp("BTC", 0, 5).with_tick_size(Price::new(dec!(1))),
        Instrument::perp("ETH", 1, 4),
    ]
    .into_iter()
    .collect()
}

fn identity() -> SigningIdentity {
    SigningIdentity::from_hex(TEST_PRIVATE_KEY).expect("test key")
}

fn btc_tpsl_legs() -> Vec<OrderIntent> {
    vec![
        OrderIntent::limit("BTC", OrderSide::Buy, Size::new(dec!(0.01)), Price::new(dec!(105000))),
        OrderIntent::trigger(
            "BTC",
            OrderSide::Sell,
            Size::new(dec!(0.01)),
            Price::new(dec!(110000)),
            Tpsl::Tp,
            Price::new(dec!(110000)),
            true,
        ),
        OrderIntent::trigger(
            "BTC",
            OrderSide::Sell,
            Size::new(dec!(0.01)),
            Price::new(dec!(100000)),
            Tpsl::Sl,
            Price::new(dec!(100000)),
            true,
        ),
    ]
}

/// Market buy of 0.001 BTC with no reference price.
#[test]
fn test_market_btc_order_end_to_end() {
    let engine = SigningEngine::new(book(), Network::Testnet);
    let id = identity();
    let opts = RequestOptions::default();
    let intent = OrderIntent::market("BTC", OrderSide::Buy, Size::new(dec!(0.001)), Price::ZERO);

    let first = engine.place_order(&id, intent.clone(), &opts).expect("sign");
    let second = engine.place_order(&id, intent, &opts).expect("sign");

    let body = first.to_value().expect("json");
    let order = &body["action"]["orders"][0];
    assert_eq!(body["action"]["type"], "order");
    assert_eq!(body["action"]["grouping"], "na");
    assert_eq!(order["a"], 0);
    assert_eq!(order["b"], true);
    assert_eq!(order["p"], "0");
    assert_eq!(order["s"], "0.001");
    assert_eq!(order["r"], false);
    assert_eq!(order["t"]["limit"]["tif"], "Ioc");
    assert!(order.get("c").is_none());

    assert!(second.nonce > first.nonce);
    let expected: Address = TEST_ADDRESS.parse().unwrap();
    assert_eq!(first.recover_signer().unwrap(), expected);
    assert_eq!(second.recover_signer().unwrap(), expected);
}

/// The same three legs are a valid order-level group but not a position group.
#[test]
fn test_tpsl_batch_under_both_groupings() {
    let engine = SigningEngine::new(book(), Network::Testnet);
    let id = identity();
    let opts = RequestOptions::default();

    let normal = OrderBatch::new(btc_tpsl_legs(), Grouping::NormalTpsl);
    let signed = engine.place_batch(&id, &normal, &opts).expect("normalTpsl");
    let body = signed.to_value().unwrap();
    assert_eq!(body["action"]["grouping"], "normalTpsl");
    let orders = body["action"]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[1]["t"]["trigger"]["tpsl"], "tp");
    assert_eq!(orders[2]["t"]["trigger"]["tpsl"], "sl");
    assert_eq!(orders[2]["t"]["trigger"]["triggerPx"], "100000");

    let position = OrderBatch::new(btc_tpsl_legs(), Grouping::PositionTpsl);
    assert!(matches!(
        engine.place_batch(&id, &position, &opts),
        Err(SignError::InvalidGrouping(_))
    ));
}

#[test]
fn test_size_precision_and_sub_lot_rejection() {
    let engine = SigningEngine::new(book(), Network::Testnet);
    let id = identity();
    let opts = RequestOptions::default();

    let ok = OrderIntent::limit("ETH", OrderSide::Buy, Size::new(dec!(0.123456)), Price::new(dec!(2000)));
    let body = engine.place_order(&id, ok, &opts).unwrap().to_value().unwrap();
    assert_eq!(body["action"]["orders"][0]["s"], "0.1234");

    let dust = OrderIntent::limit("ETH", OrderSide::Buy, Size::new(dec!(0.00001)), Price::new(dec!(2000)));
    assert!(matches!(
        engine.place_order(&id, dust, &opts),
        Err(SignError::InvalidQuantity(_))
    ));

    let unknown = OrderIntent::limit("DOGE", OrderSide::Buy, Size::new(dec!(1)), Price::new(dec!(1)));
    assert_eq!(
        engine.place_order(&id, unknown, &opts).unwrap_err(),
        SignError::UnknownInstrument("DOGE".to_string())
    );
}

/// Nonces issued from many threads for one identity never repeat and keep
/// increasing within each thread.
#[test]
fn test_concurrent_signing_nonces_are_unique() {
    let engine = Arc::new(SigningEngine::new(book(), Network::Testnet));
    let id = Arc::new(identity());

    let per_thread: Vec<Vec<u64>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let id = Arc::clone(&id);
                scope.spawn(move || {
                    (0..25)
                        .map(|_| {
                            engine
                                .place_order(
                                    &id,
                                    OrderIntent::market(
                                        "BTC",
                                        OrderSide::Sell,
                                        Size::new(dec!(0.001)),
                                        Price::ZERO,
                                    ),
                                    &RequestOptions::default(),
                                )
                                .expect("sign")
                                .nonce
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut seen = HashSet::new();
    for nonces in &per_thread {
        assert!(nonces.windows(2).all(|w| w[0] < w[1]));
        for nonce in nonces {
            assert!(seen.insert(*nonce), "duplicate nonce {nonce}");
        }
    }
    assert_eq!(seen.len(), 100);
}

/// Separate engines in one process draw from the same per-identity counter,
/// so a testnet and a mainnet engine never reuse a nonce for one signer.
#[test]
fn test_independent_engines_share_nonce_source() {
    let id = Arc::new(identity());
    let barrier = Arc::new(Barrier::new(2));

    let per_engine: Vec<Vec<u64>> = std::thread::scope(|scope| {
        let handles: Vec<_> = [Network::Testnet, Network::Mainnet]
            .into_iter()
            .map(|network| {
                let id = Arc::clone(&id);
                let barrier = Arc::clone(&barrier);
                scope.spawn(move || {
                    let engine = SigningEngine::new(book(), network);
                    barrier.wait();
                    (0..50)
                        .map(|_| {
                            engine
                                .place_order(
                                    &id,
                                    OrderIntent::market(
                                        "ETH",
                                        OrderSide::Buy,
                                        Size::new(dec!(0.01)),
                                        Price::ZERO,
                                    ),
                                    &RequestOptions::default(),
                                )
                                .expect("sign")
                                .nonce
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let all: HashSet<u64> = per_engine.iter().flatten().copied().collect();
    assert_eq!(all.len(), 100);
}

#[test]
fn test_signed_action_round_trips_through_msgpack() {
    let engine = SigningEngine::new(book(), Network::Mainnet);
    let batch = OrderBatch::new(btc_tpsl_legs(), Grouping::NormalTpsl);
    let signed = engine
        .place_batch(&identity(), &batch, &RequestOptions::default())
        .unwrap();
    let hlsign_signer::Action::L1(action) = &signed.action else {
        panic!("expected an L1 action");
    };

    let bytes = encoder::encode(action).unwrap();
    let decoded: L1Action = encoder::decode(&bytes).unwrap();
    assert_eq!(&decoded, action);

    let as_value: serde_json::Value = encoder::decode(&bytes).unwrap();
    assert_eq!(as_value, serde_json::to_value(action).unwrap());
}

/// Known action, nonce and network reproduce the reference action hash.
#[test]
fn test_reference_action_signs_over_reference_hash() {
    let engine = SigningEngine::new(book(), Network::Testnet);
    let id = identity();
    let action = L1Action::Order(OrderAction {
        orders: vec![OrderWire {
            asset: 110027,
            is_buy: true,
            limit_px: "105.00".to_string(),
            sz: "0.2".to_string(),
            reduce_only: false,
            order_type: OrderTypeWire::ioc(),
            cloid: Some(ClientOrderId::from_hex("0x0de3e244a8f44fc28a6b7bc852d66d19").unwrap()),
        }],
        grouping: Grouping::Na,
        builder: None,
    });

    let signed = engine
        .sign_l1_at(&id, action, 1769339470576, &RequestOptions::default())
        .unwrap();

    let reference = B256::from_slice(
        &hex::decode("904c57b8f4b75ac9da005b49298dc39af735ed8c3a89b241f5f1e061e0207868").unwrap(),
    );
    assert_eq!(
        signed.digest(),
        PhantomAgent::new(reference, Network::Testnet).signing_hash()
    );
    assert_eq!(signed.recover_signer().unwrap(), id.address());
    assert_eq!(signed.nonce, 1769339470576);
}

#[test]
fn test_user_signed_withdraw_recovers_signer() {
    let engine = SigningEngine::new(book(), Network::Mainnet);
    let id = identity();

    let signed = engine
        .withdraw(&id, id.address(), dec!(12.345))
        .expect("withdraw");
    let body = signed.to_value().unwrap();
    assert_eq!(body["action"]["type"], "withdraw3");
    assert_eq!(body["action"]["hyperliquidChain"], "Mainnet");
    assert_eq!(body["action"]["amount"], "12.34");
    assert_eq!(body["action"]["time"], signed.nonce);

    let hlsign_signer::Action::User(action) = &signed.action else {
        panic!("expected a user action");
    };
    assert_eq!(signed.digest(), action.signing_hash());
    assert_eq!(signed.recover_signer().unwrap(), id.address());
}

#[test]
fn test_expiring_vault_request_body() {
    let engine = SigningEngine::new(book(), Network::Testnet);
    let vault: Address = "0x1719884eb866cb12b2287399b15f7db5e7d775ea".parse().unwrap();
    let opts = RequestOptions::default()
        .with_vault(vault)
        .with_expires_after(1_900_000_000_000);

    let signed = engine
        .update_leverage(&identity(), "ETH", 10, true, &opts)
        .unwrap();
    let json = signed.to_json().unwrap();
    assert!(json.starts_with(r#"{"action":{"type":"updateLeverage","asset":1,"isCross":true,"leverage":10},"nonce":"#));
    assert!(json.ends_with(r#""vaultAddress":"0x1719884eb866cb12b2287399b15f7db5e7d775ea","expiresAfter":1900000000000}"#));
}

// Vectors produced by the Hyperliquid SDKs for this key.
const SDK_PRIVATE_KEY: &str = "0xe908f86dbb4d55ac876378565aafeabc187f6690f046459397b17d9b9a19688e";

fn assert_triplet(signed: &hlsign_signer::SignedRequest, r: &str, s: &str, v: u8) {
    assert_eq!(signed.signature.r, r);
    assert_eq!(signed.signature.s, s);
    assert_eq!(signed.signature.v, v);
}

#[test]
fn test_sdk_vector_limit_order() {
    let id = SigningIdentity::from_hex(SDK_PRIVATE_KEY).unwrap();
    let action = L1Action::Order(OrderAction {
        orders: vec![OrderWire {
            asset: 1,
            is_buy: true,
            limit_px: "2000.0".to_string(),
            sz: "3.5".to_string(),
            reduce_only: false,
            order_type: OrderTypeWire::ioc(),
            cloid: None,
        }],
        grouping: Grouping::Na,
        builder: None,
    });
    let opts = RequestOptions::default();

    let mainnet = SigningEngine::new(book(), Network::Mainnet)
        .sign_l1_at(&id, action.clone(), 1583838, &opts)
        .unwrap();
    assert_triplet(
        &mainnet,
        "0x77957e58e70f43b6b68581f2dc42011fc384538a2e5b7bf42d5b936f19fbb673",
        "0x60721a8598727230f67080efee48c812a6a4442013fd3b0eed509171bef9f23f",
        28,
    );

    let testnet = SigningEngine::new(book(), Network::Testnet)
        .sign_l1_at(&id, action, 1583838, &opts)
        .unwrap();
    assert_triplet(
        &testnet,
        "0xcd0925372ff1ed499e54883e9a6205ecfadec748f80ec463fe2f84f120964877",
        "0x6377961965cb7b12414186b1ea291e95fd512722427efcbcfb3b0b2bcd4d79d0",
        28,
    );
}

#[test]
fn test_sdk_vector_approve_builder_fee() {
    let id = SigningIdentity::from_hex(SDK_PRIVATE_KEY).unwrap();
    let engine = SigningEngine::new(book(), Network::Mainnet);
    let builder: Address = "0x1234567890123456789012345678901234567890".parse().unwrap();
    let action = |chain: &str| {
        UserAction::ApproveBuilderFee(ApproveBuilderFee {
            signature_chain_id: SIGNATURE_CHAIN_ID.to_string(),
            hyperliquid_chain: chain.to_string(),
            max_fee_rate: "0.001%".to_string(),
            builder,
            nonce: 1583838,
        })
    };

    let mainnet = engine.sign_user(&id, action("Mainnet")).unwrap();
    assert_triplet(
        &mainnet,
        "0x343c9078af7c3d6683abefd0ca3b2960de5b669b716863e6dc49090853a4a3cd",
        "0x6c016301239461091a8ca3ea5ac783362526c4d9e9e624ffc563aea93d6ac239",
        27,
    );
    assert_eq!(mainnet.nonce, 1583838);

    let testnet = engine.sign_user(&id, action("Testnet")).unwrap();
    assert_triplet(
        &testnet,
        "0x2ada43eeebeba9cfe13faf95aa84e5b8c4885c3a07cbf4536f2df5edd340d4eb",
        "0x1ed0e24f60a80d199a842258d5fa737a18d486f7d4e656268b434d226f2811d7",
        28,
    );
}

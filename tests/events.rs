use std::time::Duration;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, LogData, U256, address},
    rpc::types::Log,
};
use dydx_bindings::{
    Binding, DescriptorError, Error, FilterOptions, RemoteError, WatchOptions, abi::Contract,
    testing::{self, MockChain},
};
use tokio_test::assert_ok;

const ERC20: &str = r#"[
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"account","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]},
    {"type":"event","name":"Transfer","anonymous":false,"inputs":[
     {"name":"from","type":"address","indexed":true},
     {"name":"to","type":"address","indexed":true},
     {"name":"value","type":"uint256","indexed":false}]}
]"#;

const TOKEN: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
const ALICE: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
const BOB: Address = address!("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

fn transfer(binding: &Binding, from: Address, to: Address, value: u64, block: u64, idx: u64) -> Log {
    let data = binding
        .descriptor()
        .event("Transfer")
        .unwrap()
        .encode_log(&[
            DynSolValue::Address(from),
            DynSolValue::Address(to),
            DynSolValue::Uint(U256::from(value), 256),
        ])
        .unwrap();
    testing::log(binding.address(), data, block, idx)
}

/// Log with the Transfer topics but a body too short to decode.
fn malformed_transfer(binding: &Binding, block: u64) -> Log {
    let valid = transfer(binding, ALICE, BOB, 0, block, 0);
    let data = LogData::new_unchecked(valid.topics().to_vec(), Bytes::from(vec![1u8; 8]));
    testing::log(binding.address(), data, block, 1)
}

/// Filter on the first indexed parameter only yields matching logs.
#[tokio::test]
async fn test_filter_by_indexed_parameter() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    chain.push_log(transfer(&token, ALICE, BOB, 1, 10, 0));
    chain.push_log(transfer(&token, BOB, ALICE, 2, 10, 1));
    chain.push_log(transfer(&token, ALICE, ALICE, 3, 11, 0));

    let filterer = token.filterer(chain.clone());
    let events = filterer
        .filter(
            "Transfer",
            &[vec![DynSolValue::Address(ALICE)]],
            FilterOptions::new(0),
        )
        .await
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.log().topics()[1], ALICE.into_word());
        assert_eq!(event.get("from"), Some(&DynSolValue::Address(ALICE)));
    }
    assert_eq!(
        events[1].get("value"),
        Some(&DynSolValue::Uint(U256::from(3), 256))
    );

    // Alternatives within one position
    let events = filterer
        .filter(
            "Transfer",
            &[vec![], vec![DynSolValue::Address(ALICE), DynSolValue::Address(BOB)]],
            FilterOptions::new(0),
        )
        .await
        .unwrap();
    assert_eq!(events.count(), 3);

    assert!(matches!(
        filterer
            .filter("Transfer", &[vec![], vec![], vec![]], FilterOptions::new(0))
            .await,
        Err(Error::Encoding(_))
    ));
    assert!(matches!(
        filterer.filter("Approval", &[], FilterOptions::new(0)).await,
        Err(Error::UnknownEvent(_))
    ));
}

/// Historical query over a range with N matching logs yields exactly N
/// events in source order, then terminates without error.
#[tokio::test]
async fn test_filter_block_range() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    for block in 1..=20 {
        chain.push_log(transfer(&token, ALICE, BOB, block, block, 0));
    }

    let mut events = token
        .filterer(chain)
        .filter("Transfer", &[], FilterOptions::range(5, 14))
        .await
        .unwrap();
    let mut blocks = Vec::new();
    while events.advance() {
        let event = events.event().unwrap();
        assert_eq!(event.name(), "Transfer");
        blocks.push(event.block_number().unwrap());
    }
    assert_eq!(blocks, (5..=14).collect::<Vec<_>>());
    assert!(events.error().is_none());
    assert!(!events.advance());
}

/// Events needing more than four topics are refused when binding, an
/// anonymous event filters on all four.
#[tokio::test]
async fn test_filter_on_every_topic() {
    const FOUR: &str = r#"[
        {"type":"event","name":"Four","anonymous":ANONYMOUS,"inputs":[
         {"name":"a","type":"uint256","indexed":true},
         {"name":"b","type":"uint256","indexed":true},
         {"name":"c","type":"uint256","indexed":true},
         {"name":"d","type":"uint256","indexed":true}]}
    ]"#;
    assert!(matches!(
        Binding::from_json(TOKEN, &FOUR.replace("ANONYMOUS", "false")),
        Err(DescriptorError::TooManyTopics { topics: 5, .. })
    ));

    let chain = MockChain::new();
    let binding = Binding::from_json(TOKEN, &FOUR.replace("ANONYMOUS", "true")).unwrap();
    let entry = binding.descriptor().event("Four").unwrap();
    for (d, idx) in [(1u64, 0u64), (2, 1)] {
        let data = entry
            .encode_log(&[
                DynSolValue::Uint(U256::from(7), 256),
                DynSolValue::Uint(U256::from(8), 256),
                DynSolValue::Uint(U256::from(9), 256),
                DynSolValue::Uint(U256::from(d), 256),
            ])
            .unwrap();
        chain.push_log(testing::log(TOKEN, data, 3, idx));
    }

    let last = vec![DynSolValue::Uint(U256::from(1), 256)];
    let events = binding
        .filterer(chain)
        .filter("Four", &[vec![], vec![], vec![], last], FilterOptions::new(0))
        .await
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].get("d"), Some(&DynSolValue::Uint(U256::from(1), 256)));
}

/// Decoding failure of a historical log stops iteration and is kept.
#[tokio::test]
async fn test_filter_malformed_log() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    chain.push_log(transfer(&token, ALICE, BOB, 1, 1, 0));
    chain.push_log(malformed_transfer(&token, 2));
    chain.push_log(transfer(&token, ALICE, BOB, 3, 3, 0));

    let mut events = token
        .filterer(chain)
        .filter("Transfer", &[], FilterOptions::new(0))
        .await
        .unwrap();
    assert!(events.advance());
    assert!(!events.advance());
    assert!(matches!(events.error(), Some(Error::Decoding(_))));
}

/// Live events are delivered in source order until unsubscribed.
#[tokio::test]
async fn test_watch_and_unsubscribe() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    let filterer = token.filterer(chain.clone());

    let mut subscription = filterer
        .watch(
            "Transfer",
            &[vec![], vec![DynSolValue::Address(BOB)]],
            &WatchOptions::default(),
        )
        .await
        .unwrap();

    for idx in 0..5 {
        chain.emit(transfer(&token, ALICE, BOB, idx, 100, idx));
        // Not matching the filter
        chain.emit(transfer(&token, BOB, ALICE, idx, 100, 10 + idx));
    }

    for idx in 0..5 {
        let event = subscription.recv().await.unwrap();
        assert_eq!(event.log_index(), Some(idx));
        assert_eq!(event.get("to"), Some(&DynSolValue::Address(BOB)));
    }

    assert_ok!(subscription.unsubscribe().await);
    assert_eq!(chain.subscriber_count(), 0);
}

/// One malformed log terminates a live subscription with a decoding error.
#[tokio::test]
async fn test_watch_malformed_log_terminates() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    let mut subscription = token
        .filterer(chain.clone())
        .watch("Transfer", &[], &WatchOptions::default())
        .await
        .unwrap();

    chain.emit(transfer(&token, ALICE, BOB, 1, 1, 0));
    chain.emit(malformed_transfer(&token, 2));
    chain.emit(transfer(&token, ALICE, BOB, 3, 3, 0));

    let event = subscription.recv().await.unwrap();
    assert_eq!(event.block_number(), Some(1));
    assert!(subscription.recv().await.is_none());
    assert!(matches!(subscription.wait().await, Err(Error::Decoding(_))));
}

/// With `skip_malformed` the subscription outlives malformed logs.
#[tokio::test]
async fn test_watch_skip_malformed() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    let mut subscription = token
        .filterer(chain.clone())
        .watch(
            "Transfer",
            &[],
            &WatchOptions::new().skip_malformed(true).channel_size(1),
        )
        .await
        .unwrap();

    chain.emit(transfer(&token, ALICE, BOB, 1, 1, 0));
    chain.emit(malformed_transfer(&token, 2));
    chain.emit(transfer(&token, ALICE, BOB, 3, 3, 0));
    chain.close_subscriptions();

    let mut blocks = Vec::new();
    while let Some(event) = subscription.recv().await {
        blocks.push(event.block_number().unwrap());
    }
    assert_eq!(blocks, vec![1, 3]);
    assert_ok!(subscription.wait().await);
}

/// Upstream errors terminate the subscription and are reported.
#[tokio::test]
async fn test_watch_upstream_error() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    let mut subscription = token
        .filterer(chain.clone())
        .watch("Transfer", &[], &WatchOptions::default())
        .await
        .unwrap();

    chain.emit(transfer(&token, ALICE, BOB, 1, 1, 0));
    chain.fail_subscriptions(RemoteError::Transport("connection reset".to_string()));

    assert!(subscription.recv().await.is_some());
    assert!(subscription.recv().await.is_none());
    assert!(matches!(
        subscription.wait().await,
        Err(Error::RemoteCall(RemoteError::Transport(_)))
    ));
}

/// Unsubscribing does not wait for a consumer that stopped receiving.
#[tokio::test]
async fn test_unsubscribe_with_pending_delivery() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    let subscription = token
        .filterer(chain.clone())
        .watch("Transfer", &[], &WatchOptions::new().channel_size(1))
        .await
        .unwrap();

    for idx in 0..10 {
        chain.emit(transfer(&token, ALICE, BOB, idx, 1, idx));
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!subscription.is_finished());

    let result = tokio::time::timeout(Duration::from_secs(5), subscription.unsubscribe()).await;
    assert_ok!(assert_ok!(result));
}

/// Dropping the subscription stops the background task.
#[tokio::test]
async fn test_drop_subscription() {
    let chain = MockChain::new();
    let token = Binding::from_json(TOKEN, ERC20).unwrap();
    let subscription = token
        .filterer(chain.clone())
        .watch("Transfer", &[], &WatchOptions::default())
        .await
        .unwrap();
    assert_eq!(chain.subscriber_count(), 1);

    drop(subscription);
    for _ in 0..100 {
        if chain.subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(chain.subscriber_count(), 0);
}

/// Single logs are decoded by name or by topic.
#[tokio::test]
async fn test_parse_protocol_events() {
    let proxy = Binding::new(
        address!("0x07aBe965500A49370D331eCD613c7AC47dD6e547"),
        Contract::AdminUpgradeabilityProxy.descriptor().unwrap(),
    );
    let filterer = proxy.filterer(MockChain::new());
    let implementation = address!("0x00000000000000000000000000000000000000cc");

    let data = proxy
        .descriptor()
        .event("Upgraded")
        .unwrap()
        .encode_log(&[DynSolValue::Address(implementation)])
        .unwrap();
    let log = testing::log(proxy.address(), data, 1, 0);

    let event = filterer.parse("Upgraded", log.clone()).unwrap();
    assert_eq!(
        event.fields(),
        &[(
            "implementation".to_string(),
            DynSolValue::Address(implementation)
        )]
    );
    assert_eq!(filterer.parse_any(log.clone()).unwrap(), event);
    assert!(matches!(
        filterer.parse("AdminChanged", log),
        Err(Error::Decoding(_))
    ));

    let unknown = testing::log(
        proxy.address(),
        LogData::new_unchecked(vec![B256::repeat_byte(1)], Bytes::new()),
        1,
        0,
    );
    assert!(matches!(filterer.parse_any(unknown), Err(Error::UnknownEvent(_))));
}

/// Struct fields of protocol events decode as tuples.
#[tokio::test]
async fn test_parse_order_filled() {
    let orders = Binding::new(Address::ZERO, Contract::P1Orders.descriptor().unwrap());
    let fill = DynSolValue::Tuple(vec![
        DynSolValue::Uint(U256::from(1_000), 256),
        DynSolValue::Uint(U256::from(25_000), 256),
        DynSolValue::Uint(U256::from(3), 256),
        DynSolValue::Bool(false),
    ]);
    let values = vec![
        DynSolValue::FixedBytes(B256::repeat_byte(0x11), 32),
        DynSolValue::FixedBytes(B256::with_last_byte(1), 32),
        DynSolValue::Uint(U256::ZERO, 256),
        fill.clone(),
    ];
    let data = orders
        .descriptor()
        .event("LogOrderFilled")
        .unwrap()
        .encode_log(&values)
        .unwrap();

    let event = orders
        .filterer(MockChain::new())
        .parse_any(testing::log(Address::ZERO, data, 7, 3))
        .unwrap();
    assert_eq!(event.name(), "LogOrderFilled");
    assert_eq!(event.get("fill"), Some(&fill));
    assert_eq!(event.values().cloned().collect::<Vec<_>>(), values);
    assert_eq!(event.block_number(), Some(7));
    assert_eq!(event.log_index(), Some(3));
}

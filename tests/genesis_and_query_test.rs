use chainlet_rs::{
    config::Params,
    error::ChainletError,
    genesis::{self, GenesisState},
    query::{self, PageRequest},
    types::{
        chainlet::{Chainlet, ChainletStatus},
        data_types::Timestamp,
        stack::{Stack, StackVersion},
    },
};

mod common;

use crate::common::{
    chain::TestChain,
    fixtures::{self, MAINTAINER},
};

fn stack(name: &str, versions: &[&str]) -> Stack {
    Stack {
        display_name: name.to_string(),
        description: String::new(),
        fees: vec![fixtures::fees("upc")],
        versions: versions
            .iter()
            .map(|version| StackVersion {
                image: format!("registry/{}:{}", name, version),
                version: version.to_string(),
                checksum: format!("sha256:{}-{}", name, version),
                enabled: true,
                ccv_consumer: false,
            })
            .collect(),
    }
}

fn chainlet(chain_id: &str, stack: &str, version: &str, auto_upgrade: bool) -> Chainlet {
    Chainlet {
        chain_id: chain_id.to_string(),
        chainlet_name: chain_id.to_string(),
        launcher: MAINTAINER.to_string(),
        maintainers: vec![MAINTAINER.to_string()],
        stack_name: stack.to_string(),
        stack_version: version.to_string(),
        status: ChainletStatus::Online,
        auto_upgrade,
        is_ccv_consumer: false,
        consumer_id: None,
        spawn_time: Timestamp::from_secs(0),
        is_service_chainlet: false,
        upgrade: None,
    }
}

fn genesis() -> GenesisState {
    GenesisState {
        params: Params::builder().automatic_chainlet_upgrade_interval(5).build(),
        stacks: vec![stack("alpha", &["1.0.0", "1.1.0"]), stack("beta", &["0.1.0"])],
        chainlets: vec![
            chainlet("alpha_1-1", "alpha", "1.0.0", true),
            chainlet("alpha_2-1", "alpha", "1.1.0", false),
            chainlet("beta_1-1", "beta", "0.1.0", false),
        ],
    }
}

#[test]
fn genesis_round_trips_through_export() {
    let genesis = genesis();
    let chain = TestChain::with_genesis(genesis.clone());

    assert_eq!(genesis::export_genesis(&chain.db).unwrap(), genesis);
    assert_eq!(query::chainlet_count(&chain.db).unwrap(), 3);
    assert_eq!(query::params(&chain.db).unwrap(), genesis.params);
    assert!(chain.db.len() > 0);
}

#[test]
fn genesis_state_loads_from_json() {
    let genesis = genesis();
    let json = serde_json::to_string(&genesis).unwrap();
    assert!(json.contains("\"automatic_chainlet_upgrade_interval\":5"));

    let parsed: GenesisState = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, genesis);

    let chain = TestChain::with_genesis(parsed);
    assert_eq!(genesis::export_genesis(&chain.db).unwrap(), genesis);
}

#[test]
fn genesis_state_feeds_the_version_tree() {
    let mut chain = TestChain::with_genesis(genesis());

    chain.skip_to(5);
    chain.begin_block().unwrap();

    assert_eq!(chain.chainlet("alpha_1-1").stack_version, "1.1.0");
    assert_eq!(chain.chainlet("beta_1-1").stack_version, "0.1.0");
}

#[test]
fn inconsistent_genesis_is_rejected() {
    let mut duplicate_stack = genesis();
    duplicate_stack.stacks.push(stack("alpha", &["2.0.0"]));

    let mut colliding_versions = genesis();
    colliding_versions.stacks[1].versions.push(StackVersion {
        image: "registry/beta:0.1.0".to_string(),
        version: "0.2.0".to_string(),
        checksum: "sha256:other".to_string(),
        enabled: true,
        ccv_consumer: false,
    });

    let mut bad_version = genesis();
    bad_version.stacks[1].versions[0].version = "zero".to_string();

    let mut duplicate_chainlet = genesis();
    duplicate_chainlet
        .chainlets
        .push(chainlet("beta_1-1", "beta", "0.1.0", false));

    let mut unknown_version = genesis();
    unknown_version
        .chainlets
        .push(chainlet("beta_2-1", "beta", "0.9.0", false));

    let mut too_many = genesis();
    too_many.params.max_chainlets = 2;

    for state in [
        duplicate_stack,
        colliding_versions,
        bad_version,
        duplicate_chainlet,
        unknown_version,
        too_many,
    ] {
        assert!(state.validate().is_err());
    }
    assert!(genesis().validate().is_ok());
    assert!(GenesisState::default().validate().is_ok());
}

#[test]
fn invalid_genesis_writes_nothing() {
    let mut chain = TestChain::new(Params::default());
    let mut invalid = genesis();
    invalid.chainlets[0].chain_id = "0invalid".to_string();

    let result = chain.execute(|controller, ctx| {
        let result = controller.init_genesis(ctx, &invalid);
        assert!(ctx.updates().is_empty());
        assert!(ctx.events().is_empty());
        result
    });

    assert!(matches!(result, Err(ChainletError::Validation(_))));
    assert!(query::stack(&chain.db, "alpha").unwrap().is_none());
}

#[test]
fn list_queries_are_paginated() {
    let chain = TestChain::with_genesis(genesis());

    let first = query::chainlets(&chain.db, &PageRequest::new(None, 2)).unwrap();
    assert_eq!(
        first
            .items
            .iter()
            .map(|c| c.chain_id.as_str())
            .collect::<Vec<_>>(),
        vec!["alpha_1-1", "alpha_2-1"]
    );
    assert_eq!(first.next_key.as_deref(), Some("beta_1-1"));
    assert_eq!(first.total, 3);

    let second = query::chainlets(&chain.db, &PageRequest::new(first.next_key, 2)).unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].chain_id, "beta_1-1");
    assert!(second.next_key.is_none());

    // A zero limit falls back to the default page size.
    let all = query::stacks(&chain.db, &PageRequest::default()).unwrap();
    assert_eq!(all.items.len(), 2);
    assert!(all.next_key.is_none());
    assert_eq!(all.total, 2);
}

#[test]
fn point_queries_return_none_for_unknown_keys() {
    let chain = TestChain::with_genesis(genesis());

    assert!(query::chainlet(&chain.db, "gamma_1-1").unwrap().is_none());
    assert!(query::stack(&chain.db, "gamma").unwrap().is_none());
    assert_eq!(
        query::stack(&chain.db, "beta").unwrap(),
        Some(stack("beta", &["0.1.0"]))
    );
}

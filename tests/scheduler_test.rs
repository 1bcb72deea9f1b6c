use chainlet_rs::{
    config::Params,
    error::{ChainletError, ErrorCategory},
    events::Event,
    scheduler,
    state::{Context, KVGet, KVStore},
    types::data_types::{BlockHeight, Timestamp},
    version_tree::VersionTreeCache,
};

mod common;

use crate::common::{chain::TestChain, fixtures, mem_db::MemWriteBatch};

const INTERVAL: u64 = 10;

/// A chain that scans for automatic upgrades every [`INTERVAL`] blocks, with stack `test` at 1.0.0 and
/// chainlets `auto_1-1` (opted in) and `manual_1-1` (opted out) running it.
fn chain_with_chainlets() -> TestChain {
    let mut chain = TestChain::new(
        Params::builder()
            .automatic_chainlet_upgrade_interval(INTERVAL)
            .build(),
    );
    chain.submit(fixtures::create_stack("test", "1.0.0", false)).unwrap();
    chain
        .submit(fixtures::launch_auto_upgrading("auto_1-1", "test", "1.0.0"))
        .unwrap();
    chain.submit(fixtures::launch("manual_1-1", "test", "1.0.0")).unwrap();
    chain.take_events();
    chain
}

#[test]
fn auto_upgrades_run_only_at_interval_heights() {
    let mut chain = chain_with_chainlets();
    chain.submit(fixtures::update_stack("test", "1.0.1", false)).unwrap();
    chain.submit(fixtures::update_stack("test", "1.1.0", false)).unwrap();
    chain.submit(fixtures::update_stack("test", "2.0.0", false)).unwrap();
    chain.take_events();

    // 1. Blocks between scans leave the chainlets alone.
    chain.skip_to(INTERVAL - 1);
    chain.begin_block().unwrap();
    assert_eq!(chain.height, INTERVAL - 1);
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");

    // 2. The scan moves opted-in chainlets to the newest version of their major.
    chain.begin_block().unwrap();
    assert_eq!(chain.height, INTERVAL);
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.1.0");
    assert_eq!(chain.chainlet("manual_1-1").stack_version, "1.0.0");

    let events = chain.take_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Event::UpgradeChainlet(e) if e.chain_id == "auto_1-1" && e.from_version == "1.0.0" && e.to_version == "1.1.0" && e.automatic
    ));

    // 3. The next scan has nothing left to do.
    chain.skip_to(2 * INTERVAL);
    chain.begin_block().unwrap();
    assert!(chain.take_events().is_empty());
}

#[test]
fn auto_upgrades_can_be_turned_off() {
    let mut chain = TestChain::new(
        Params::builder()
            .automatic_chainlet_upgrades(false)
            .automatic_chainlet_upgrade_interval(INTERVAL)
            .build(),
    );
    chain.submit(fixtures::create_stack("test", "1.0.0", false)).unwrap();
    chain
        .submit(fixtures::launch_auto_upgrading("auto_1-1", "test", "1.0.0"))
        .unwrap();
    chain.submit(fixtures::update_stack("test", "1.0.1", false)).unwrap();

    chain.skip_to(INTERVAL);
    chain.begin_block().unwrap();
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");
}

#[test]
fn auto_upgrades_skip_chainlets_with_a_pending_upgrade() {
    let mut chain = TestChain::new(
        Params::builder()
            .automatic_chainlet_upgrade_interval(INTERVAL)
            .build(),
    );
    chain.submit(fixtures::create_stack("test", "1.0.0", true)).unwrap();
    chain.submit(fixtures::update_stack("test", "2.0.0", true)).unwrap();
    chain
        .submit(fixtures::launch_auto_upgrading("auto_1-1", "test", "1.0.0"))
        .unwrap();

    let client = chain.parent.state().consumers.values().next().unwrap().client_id.clone().unwrap();
    chain.parent.open_channel("channel-1", "connection-1", &client);
    chain.parent.set_client_height(&client, 50);
    chain
        .submit(fixtures::upgrade("auto_1-1", "2.0.0", "channel-1"))
        .unwrap();
    chain.submit(fixtures::update_stack("test", "1.0.1", true)).unwrap();
    chain.take_events();

    chain.skip_to(INTERVAL);
    chain.begin_block().unwrap();

    let chainlet = chain.chainlet("auto_1-1");
    assert_eq!(chainlet.stack_version, "1.0.0");
    assert!(chainlet.upgrade.is_some());
}

#[test]
fn disabling_the_only_newer_version_leaves_chainlets_unchanged() {
    let mut chain = chain_with_chainlets();
    chain.submit(fixtures::update_stack("test", "1.0.1", false)).unwrap();
    chain.submit(fixtures::disable_version("test", "1.0.1")).unwrap();
    chain.take_events();

    chain.skip_to(INTERVAL);
    chain.begin_block().unwrap();

    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");
    assert!(chain.take_events().is_empty());
}

#[test]
fn out_of_sync_version_tree_is_an_integrity_failure() {
    let mut chain = chain_with_chainlets();
    chain.submit(fixtures::update_stack("test", "1.0.1", false)).unwrap();

    // Disable 1.0.1 behind the controller's back, leaving its version tree stale.
    {
        let mut stack = chain.stack("test");
        stack
            .versions
            .iter_mut()
            .find(|v| v.version == "1.0.1")
            .unwrap()
            .enabled = false;

        let db = chain.db.clone();
        let mut ctx = Context::new(&db, BlockHeight::new(chain.height), chain.time);
        ctx.set_stack(&stack).unwrap();
        let (write_batch, _) = ctx.into_write_batch::<MemWriteBatch>();
        chain.db.write(write_batch);
    }
    chain.take_events();

    chain.skip_to(INTERVAL);
    let result = chain.begin_block();
    assert!(matches!(result, Err(ChainletError::Integrity(_))));
    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Integrity);
    assert!(err.is_fatal());
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");

    // The failed execution dropped the stale tree. A rebuilt one agrees with the registry.
    chain.skip_to(2 * INTERVAL);
    chain.begin_block().unwrap();
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");
}

#[test]
fn auto_upgrade_reports_how_many_chainlets_moved() {
    let mut chain = chain_with_chainlets();
    chain
        .submit(fixtures::launch_auto_upgrading("auto_2-1", "test", "1.0.0"))
        .unwrap();
    chain.submit(fixtures::update_stack("test", "1.2.0", false)).unwrap();

    let db = chain.db.clone();
    let mut parent = chain.parent.clone();
    let mut ctx = Context::new(&db, BlockHeight::new(chain.height), Timestamp::from_secs(0));
    let cache = VersionTreeCache::new();
    let upgraded = scheduler::auto_upgrade(&mut ctx, &cache, &mut parent).unwrap();

    assert_eq!(upgraded, 2);
    let events = ctx.events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|event| matches!(event, Event::UpgradeChainlet(e) if e.to_version == "1.2.0")));
}

#[test]
fn auto_upgrades_register_consumers_for_consumer_versions() {
    let mut chain = chain_with_chainlets();
    chain.submit(fixtures::update_stack("test", "1.1.0", true)).unwrap();
    chain.take_events();

    chain.skip_to(INTERVAL);
    chain.begin_block().unwrap();

    // 1. The opted-in chainlet moved to the consumer version and became a consumer on the way.
    let chainlet = chain.chainlet("auto_1-1");
    assert_eq!(chainlet.stack_version, "1.1.0");
    assert!(chainlet.is_ccv_consumer);
    let consumer_id = chainlet.consumer_id.unwrap();
    assert_eq!(
        chain.parent.state().consumers[&consumer_id].chain_id,
        "auto_1-1"
    );
    assert_eq!(
        chain.db.pending_init("auto_1-1").unwrap(),
        Some(consumer_id.clone())
    );

    // 2. The opted-out chainlet was left alone.
    let manual = chain.chainlet("manual_1-1");
    assert_eq!(manual.stack_version, "1.0.0");
    assert!(!manual.is_ccv_consumer);
    assert!(manual.consumer_id.is_none());

    let events = chain.take_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        Event::RegisterConsumer(e) if e.chain_id == "auto_1-1" && e.consumer_id == consumer_id
    ));
    assert!(matches!(
        &events[1],
        Event::UpgradeChainlet(e) if e.chain_id == "auto_1-1" && e.to_version == "1.1.0" && e.automatic
    ));
}

#[test]
fn uncommitted_stack_updates_do_not_reach_the_scan() {
    let mut chain = chain_with_chainlets();

    // 1. A version added in a context that is dropped instead of committed.
    chain
        .execute_and_drop(|controller, ctx| {
            controller.handle_msg(ctx, &fixtures::update_stack("test", "1.1.0", false))
        })
        .unwrap();
    assert!(chain.take_events().is_empty());
    assert!(chain.stack("test").version("1.1.0").is_none());

    // 2. The scan agrees with the committed registry, like that of a freshly started node.
    chain.skip_to(INTERVAL);
    chain.begin_block().unwrap();
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");
    assert!(chain.take_events().is_empty());

    // 3. Once committed, the same update is picked up by the next scan.
    chain.submit(fixtures::update_stack("test", "1.1.0", false)).unwrap();
    chain.skip_to(2 * INTERVAL);
    chain.begin_block().unwrap();
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.1.0");
}

#[test]
fn rolled_back_stack_updates_do_not_reach_the_scan() {
    let mut chain = chain_with_chainlets();

    // 1. A version is added and then rolled back by an enclosing atomic section. The context is committed.
    let result: Result<(), ChainletError> = chain.execute(|controller, ctx| {
        ctx.atomic(|ctx| {
            controller.handle_msg(ctx, &fixtures::update_stack("test", "1.1.0", false))?;
            Err(ChainletError::Validation("abandoned".to_string()))
        })
    });
    assert!(matches!(result, Err(ChainletError::Validation(_))));
    assert!(chain.stack("test").version("1.1.0").is_none());
    assert!(chain.take_events().is_empty());

    // 2. The scan neither upgrades to the rolled-back version nor reports the tree as out of sync.
    chain.skip_to(INTERVAL);
    chain.begin_block().unwrap();
    assert_eq!(chain.chainlet("auto_1-1").stack_version, "1.0.0");
}

#[test]
fn housekeeping_runs_every_block() {
    let mut chain = chain_with_chainlets();

    chain.begin_block().unwrap();
    chain.begin_block().unwrap();

    assert_eq!(
        chain.parent.state().housekeeping_heights,
        vec![BlockHeight::new(2), BlockHeight::new(3)]
    );
}

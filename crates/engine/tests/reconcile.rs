mod common;

use common::{cents, engine_with_db, equal_expense, group_of, register, user};
use engine::{
    BalanceQuery, BalanceScope, CreateSettlementCmd, EngineError, GroupBalances, ItemInput,
    Participant, RegisterUserCmd, SettlementListFilter, SettlementStatus, SplitRule,
};

const DEV_PHONE: &str = "+39 333 123 4567";

fn balance_of(balances: &GroupBalances, id: &str) -> Option<i64> {
    balances
        .balances
        .iter()
        .find(|row| row.participant.id() == id)
        .map(|row| row.balance.cents())
}

#[tokio::test]
async fn registering_with_phone_merges_pending_participant() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;
    let dev = engine
        .add_pending_participant(&group.id, "alice", "Dev", DEV_PHONE)
        .await
        .unwrap();
    let pending = Participant::pending(dev.id.as_str());

    let expense = engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            pending.clone(),
            8000,
            vec![user("alice"), pending.clone()],
        ))
        .await
        .unwrap();

    let before = engine
        .group_balances(BalanceQuery::new(&group.id, "alice"))
        .await
        .unwrap();
    assert_eq!(balance_of(&before, &dev.id), Some(4000));
    assert_eq!(balance_of(&before, "alice"), Some(-4000));

    // National format: the default country code fills in the prefix.
    let registration = engine
        .register_user(RegisterUserCmd::new("dev", "Dev").phone("333 1234567"))
        .await
        .unwrap();
    assert_eq!(registration.reconciled.groups, vec![group.id.clone()]);
    assert_eq!(registration.reconciled.expenses_reassigned, 1);

    let roster = engine.group_roster(&group.id, "alice").await.unwrap();
    assert!(roster.pending.is_empty());
    assert!(roster.is_member("dev"));

    let expenses = engine.list_expenses(&group.id, "dev").await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].id, expense.id);
    assert_eq!(expenses[0].payer, user("dev"));
    assert!(expenses[0].splits.iter().any(|s| s.participant == user("dev")));
    assert!(
        expenses[0]
            .splits
            .iter()
            .all(|s| !matches!(s.participant, Participant::Pending(_)))
    );

    let after = engine
        .group_balances(BalanceQuery::new(&group.id, "alice"))
        .await
        .unwrap();
    assert_eq!(balance_of(&after, "dev"), Some(4000));
    assert_eq!(balance_of(&after, "alice"), Some(-4000));
    assert_eq!(balance_of(&after, &dev.id), None);
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;
    let dev = engine
        .add_pending_participant(&group.id, "alice", "Dev", DEV_PHONE)
        .await
        .unwrap();
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            3000,
            vec![user("alice"), Participant::pending(dev.id.as_str())],
        ))
        .await
        .unwrap();
    register(&engine, "dev", Some(DEV_PHONE)).await;

    let snapshot = engine
        .group_balances(BalanceQuery::new(&group.id, "alice").scope(BalanceScope::Group))
        .await
        .unwrap();
    let expenses = engine.list_expenses(&group.id, "alice").await.unwrap();

    let report = engine
        .reconcile_pending_participant(DEV_PHONE, "dev")
        .await
        .unwrap();
    assert!(report.is_empty());

    assert_eq!(
        engine
            .group_balances(BalanceQuery::new(&group.id, "alice").scope(BalanceScope::Group))
            .await
            .unwrap(),
        snapshot
    );
    assert_eq!(
        engine.list_expenses(&group.id, "alice").await.unwrap(),
        expenses
    );
}

#[tokio::test]
async fn member_split_and_pending_split_are_merged() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;
    register(&engine, "dev", None).await;
    engine
        .add_group_member(&group.id, "alice", "dev")
        .await
        .unwrap();
    let pending = engine
        .add_pending_participant(&group.id, "alice", "Devi", DEV_PHONE)
        .await
        .unwrap();

    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            900,
            vec![
                user("alice"),
                user("dev"),
                Participant::pending(pending.id.as_str()),
            ],
        ))
        .await
        .unwrap();

    let report = engine
        .reconcile_pending_participant(DEV_PHONE, "dev")
        .await
        .unwrap();
    assert_eq!(report.splits_merged, 1);

    let expenses = engine.list_expenses(&group.id, "alice").await.unwrap();
    let dev_split = expenses[0]
        .splits
        .iter()
        .find(|s| s.participant == user("dev"))
        .unwrap();
    assert_eq!(dev_split.amount, cents(600));
    assert_eq!(expenses[0].splits.len(), 2);
    assert_eq!(expenses[0].split_total(), cents(900));
}

#[tokio::test]
async fn item_involvement_follows_the_user() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;
    let dev = engine
        .add_pending_participant(&group.id, "alice", "Dev", DEV_PHONE)
        .await
        .unwrap();
    let pending = Participant::pending(dev.id.as_str());

    engine
        .create_expense(engine::ExpenseCmd::new(
            &group.id,
            "alice",
            "pizza night",
            cents(2500),
            user("alice"),
            SplitRule::Itemized {
                items: vec![
                    ItemInput::new("pizza", cents(1500), vec![user("alice"), pending.clone()]),
                    ItemInput::new("wine", cents(1000), vec![pending.clone()]),
                ],
            },
        ))
        .await
        .unwrap();

    register(&engine, "dev", Some(DEV_PHONE)).await;

    let expenses = engine.list_expenses(&group.id, "alice").await.unwrap();
    for item in &expenses[0].items {
        assert!(item.involved.contains(&user("dev")));
        assert!(!item.involved.contains(&pending));
    }
}

#[tokio::test]
async fn pending_settlements_move_to_the_user() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;
    let dev = engine
        .add_pending_participant(&group.id, "alice", "Dev", DEV_PHONE)
        .await
        .unwrap();

    engine
        .create_settlement(CreateSettlementCmd::new(
            &group.id,
            "bob",
            user("bob"),
            Participant::pending(dev.id.as_str()),
            cents(1200),
        ))
        .await
        .unwrap();

    register(&engine, "dev", Some(DEV_PHONE)).await;

    let settlements = engine
        .list_settlements(&group.id, "dev", SettlementListFilter::default())
        .await
        .unwrap();
    assert_eq!(settlements.len(), 1);
    assert_eq!(settlements[0].to, user("dev"));
    assert_eq!(settlements[0].status, SettlementStatus::Pending);

    // The pending slot now belongs to bob -> dev.
    let err = engine
        .create_settlement(CreateSettlementCmd::new(
            &group.id,
            "bob",
            user("bob"),
            user("dev"),
            cents(100),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    engine
        .confirm_settlement(&group.id, &settlements[0].id, "dev")
        .await
        .unwrap();
}

#[tokio::test]
async fn phone_of_a_registered_user_cannot_be_pending() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;
    register(&engine, "dev", Some(DEV_PHONE)).await;

    let err = engine
        .add_pending_participant(&group.id, "alice", "Dev", "0039 333 1234567")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn phone_is_unique_per_group() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;
    engine
        .add_pending_participant(&group.id, "alice", "Dev", DEV_PHONE)
        .await
        .unwrap();

    let err = engine
        .add_pending_participant(&group.id, "alice", "Devi", "3331234567")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}

mod common;

use common::{cents, engine_with_db, equal_expense, group_of, user};
use engine::{
    BalanceQuery, BalanceScope, CreateSettlementCmd, DebtMode, EngineError, GroupBalances,
    ParticipantBalance,
};

fn balance_of(balances: &GroupBalances, id: &str) -> i64 {
    balances
        .balances
        .iter()
        .find(|row| row.participant.id() == id)
        .map(|row: &ParticipantBalance| row.balance.cents())
        .unwrap()
}

fn debts(list: &[engine::Debt]) -> Vec<(String, String, i64)> {
    list.iter()
        .map(|d| (d.from.id().to_string(), d.to.id().to_string(), d.amount.cents()))
        .collect()
}

#[tokio::test]
async fn equal_split_dinner() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;

    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            9000,
            vec![user("alice"), user("bob"), user("carol")],
        ))
        .await
        .unwrap();

    let result = engine
        .group_balances(BalanceQuery::new(&group.id, "alice"))
        .await
        .unwrap();
    assert_eq!(balance_of(&result, "alice"), 6000);
    assert_eq!(balance_of(&result, "bob"), -3000);
    assert_eq!(balance_of(&result, "carol"), -3000);

    let mut detailed = debts(&result.detailed_debts);
    detailed.sort();
    assert_eq!(
        detailed,
        vec![
            ("bob".to_string(), "alice".to_string(), 3000),
            ("carol".to_string(), "alice".to_string(), 3000),
        ]
    );
    assert!(result.simplified_debts.is_empty());
}

#[tokio::test]
async fn confirmed_payment_clears_the_payer() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            9000,
            vec![user("alice"), user("bob"), user("carol")],
        ))
        .await
        .unwrap();

    let settlement = engine
        .create_settlement(CreateSettlementCmd::new(
            &group.id,
            "bob",
            user("bob"),
            user("alice"),
            cents(3000),
        ))
        .await
        .unwrap();

    // Not confirmed yet: nothing moves.
    let before = engine
        .group_balances(BalanceQuery::new(&group.id, "alice"))
        .await
        .unwrap();
    assert_eq!(balance_of(&before, "alice"), 6000);
    assert_eq!(balance_of(&before, "bob"), -3000);

    engine
        .confirm_settlement(&group.id, &settlement.id, "alice")
        .await
        .unwrap();

    let after = engine
        .group_balances(BalanceQuery::new(&group.id, "alice"))
        .await
        .unwrap();
    assert_eq!(balance_of(&after, "alice"), 3000);
    assert_eq!(balance_of(&after, "bob"), 0);
    assert_eq!(balance_of(&after, "carol"), -3000);
    assert_eq!(
        debts(&after.detailed_debts),
        vec![("carol".to_string(), "alice".to_string(), 3000)]
    );
}

#[tokio::test]
async fn opposite_debts_net_in_simplified_mode() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;
    // bob pays 50 for alice, alice pays 20 for bob
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("bob"),
            5000,
            vec![user("alice")],
        ))
        .await
        .unwrap();
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            2000,
            vec![user("bob")],
        ))
        .await
        .unwrap();

    let detailed = engine
        .group_balances(BalanceQuery::new(&group.id, "alice"))
        .await
        .unwrap();
    assert_eq!(
        debts(&detailed.detailed_debts),
        vec![
            ("alice".to_string(), "bob".to_string(), 5000),
            ("bob".to_string(), "alice".to_string(), 2000),
        ]
    );

    let simplified = engine
        .group_balances(BalanceQuery::new(&group.id, "alice").mode(DebtMode::Simplified))
        .await
        .unwrap();
    assert_eq!(
        debts(&simplified.simplified_debts),
        vec![("alice".to_string(), "bob".to_string(), 3000)]
    );
    assert!(simplified.detailed_debts.is_empty());
}

#[tokio::test]
async fn caller_scope_hides_other_pairs() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("carol"),
            2000,
            vec![user("alice"), user("bob")],
        ))
        .await
        .unwrap();

    let bob_view = engine
        .group_balances(BalanceQuery::new(&group.id, "bob"))
        .await
        .unwrap();
    assert_eq!(bob_view.pairs.len(), 1);
    assert_eq!(
        debts(&bob_view.detailed_debts),
        vec![("bob".to_string(), "carol".to_string(), 1000)]
    );
    // Balances always cover the whole group.
    assert_eq!(bob_view.balances.len(), 3);

    let admin_view = engine
        .group_balances(BalanceQuery::new(&group.id, "alice").scope(BalanceScope::Group))
        .await
        .unwrap();
    assert_eq!(admin_view.pairs.len(), 2);
    assert_eq!(admin_view.detailed_debts.len(), 2);
}

#[tokio::test]
async fn group_scope_needs_admin() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;

    let err = engine
        .group_balances(BalanceQuery::new(&group.id, "bob").scope(BalanceScope::Group))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn outsiders_cannot_read_balances() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;
    common::register(&engine, "mallory", None).await;

    let err = engine
        .group_balances(BalanceQuery::new(&group.id, "mallory"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn minimal_mode_collapses_chains() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;
    // alice owes bob 10, bob owes carol 10
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("bob"),
            1000,
            vec![user("alice")],
        ))
        .await
        .unwrap();
    engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("carol"),
            1000,
            vec![user("bob")],
        ))
        .await
        .unwrap();

    let result = engine
        .group_balances(
            BalanceQuery::new(&group.id, "alice")
                .scope(BalanceScope::Group)
                .mode(DebtMode::Minimal),
        )
        .await
        .unwrap();
    assert_eq!(
        debts(&result.simplified_debts),
        vec![("alice".to_string(), "carol".to_string(), 1000)]
    );
}

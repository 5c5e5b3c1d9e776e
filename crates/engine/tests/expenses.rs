mod common;

use common::{cents, engine_with_db, equal_expense, group_of, user};
use engine::{EngineError, ExpenseCmd, ItemInput, Money, Participant, SplitRule};

fn amount_of(expense: &engine::Expense, participant: &Participant) -> i64 {
    expense
        .splits
        .iter()
        .find(|s| &s.participant == participant)
        .map(|s| s.amount.cents())
        .unwrap()
}

#[tokio::test]
async fn equal_split_spreads_the_odd_cent() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;

    let expense = engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            10000,
            vec![user("alice"), user("bob"), user("carol")],
        ))
        .await
        .unwrap();
    assert_eq!(expense.split_total(), cents(10000));
    assert_eq!(amount_of(&expense, &user("alice")), 3334);
    assert_eq!(amount_of(&expense, &user("bob")), 3333);

    let stored = engine.list_expenses(&group.id, "bob").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].split_total(), cents(10000));
    assert_eq!(amount_of(&stored[0], &user("carol")), 3333);
}

#[tokio::test]
async fn exact_amounts_must_match_the_total() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;

    let err = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "taxi",
            cents(3000),
            user("alice"),
            SplitRule::Exact {
                amounts: vec![(user("alice"), cents(1000)), (user("bob"), cents(1000))],
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let expense = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "taxi",
            cents(3000),
            user("alice"),
            SplitRule::Exact {
                amounts: vec![(user("alice"), cents(1000)), (user("bob"), cents(2000))],
            },
        ))
        .await
        .unwrap();
    assert_eq!(amount_of(&expense, &user("bob")), 2000);
}

#[tokio::test]
async fn oversized_amounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;

    // The two splits would wrap around to the one-cent total.
    let err = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "taxi",
            cents(1),
            user("alice"),
            SplitRule::Exact {
                amounts: vec![(user("alice"), Money::new(i64::MAX)), (user("bob"), cents(1))],
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            Money::MAX.cents() + 1,
            vec![user("alice"), user("bob")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "party",
            cents(1000),
            user("alice"),
            SplitRule::Itemized {
                items: vec![
                    ItemInput::new("cake", Money::new(i64::MAX), vec![user("alice")]),
                    ItemInput::new("balloons", cents(1000), vec![user("bob")]),
                ],
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let expense = engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            Money::MAX.cents(),
            vec![user("alice"), user("bob")],
        ))
        .await
        .unwrap();
    assert_eq!(expense.split_total(), Money::MAX);
}

#[tokio::test]
async fn percentage_and_shares_round_to_the_total() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;

    let expense = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "hotel",
            cents(1000),
            user("alice"),
            SplitRule::Percentage {
                basis_points: vec![
                    (user("alice"), 5000),
                    (user("bob"), 2500),
                    (user("carol"), 2500),
                ],
            },
        ))
        .await
        .unwrap();
    assert_eq!(amount_of(&expense, &user("alice")), 500);
    assert_eq!(amount_of(&expense, &user("carol")), 250);

    let err = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "hotel",
            cents(1000),
            user("alice"),
            SplitRule::Percentage {
                basis_points: vec![(user("alice"), 5000), (user("bob"), 2500)],
            },
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let expense = engine
        .create_expense(ExpenseCmd::new(
            &group.id,
            "alice",
            "fuel",
            cents(1001),
            user("alice"),
            SplitRule::Shares {
                weights: vec![(user("alice"), 1), (user("bob"), 1), (user("carol"), 1)],
            },
        ))
        .await
        .unwrap();
    assert_eq!(expense.split_total(), cents(1001));
}

#[tokio::test]
async fn splits_must_reference_the_roster() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;

    let err = engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            1000,
            vec![user("alice"), user("zed")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine
        .create_expense(equal_expense(
            &group.id,
            "alice",
            user("alice"),
            1000,
            vec![user("alice"), user("alice")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let err = engine
        .create_expense(equal_expense(&group.id, "alice", user("alice"), 0, vec![user("bob")]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn members_record_only_their_own_payments() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob"]).await;

    let err = engine
        .create_expense(equal_expense(
            &group.id,
            "bob",
            user("alice"),
            1000,
            vec![user("alice"), user("bob")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .create_expense(equal_expense(
            &group.id,
            "bob",
            user("bob"),
            1000,
            vec![user("alice"), user("bob")],
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_replaces_splits() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;
    let expense = engine
        .create_expense(equal_expense(
            &group.id,
            "bob",
            user("bob"),
            1200,
            vec![user("alice"), user("bob")],
        ))
        .await
        .unwrap();

    let err = engine
        .update_expense(
            &expense.id,
            equal_expense(
                &group.id,
                "carol",
                user("carol"),
                1200,
                vec![user("carol")],
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let updated = engine
        .update_expense(
            &expense.id,
            equal_expense(
                &group.id,
                "bob",
                user("bob"),
                1500,
                vec![user("alice"), user("bob"), user("carol")],
            ),
        )
        .await
        .unwrap();
    assert_eq!(updated.id, expense.id);
    assert_eq!(updated.created_by, "bob");

    let stored = engine.list_expenses(&group.id, "alice").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, cents(1500));
    assert_eq!(stored[0].splits.len(), 3);
    assert_eq!(amount_of(&stored[0], &user("carol")), 500);
}

#[tokio::test]
async fn delete_by_payer_or_admin() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice", "bob", "carol"]).await;
    let expense = engine
        .create_expense(equal_expense(
            &group.id,
            "bob",
            user("bob"),
            900,
            vec![user("alice"), user("bob"), user("carol")],
        ))
        .await
        .unwrap();

    let err = engine
        .delete_expense(&group.id, &expense.id, "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine
        .delete_expense(&group.id, &expense.id, "alice")
        .await
        .unwrap();
    assert!(
        engine
            .list_expenses(&group.id, "alice")
            .await
            .unwrap()
            .is_empty()
    );

    let err = engine
        .delete_expense(&group.id, &expense.id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn malformed_ids_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let group = group_of(&engine, &["alice"]).await;

    let err = engine
        .delete_expense(&group.id, "not-a-uuid", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidId(_)));
}

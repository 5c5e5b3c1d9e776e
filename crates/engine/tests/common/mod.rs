#![allow(dead_code)]

use engine::{Engine, ExpenseCmd, Group, Money, Participant, RegisterUserCmd, SplitRule};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Same as `engine_with_db` but backed by a SQLite file, so several pooled
/// connections really race. The caller removes the returned path.
pub async fn engine_with_file_db() -> (Engine, DatabaseConnection, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db, path)
}

pub async fn register(engine: &Engine, username: &str, phone: Option<&str>) {
    let mut cmd = RegisterUserCmd::new(username, capitalize(username));
    if let Some(phone) = phone {
        cmd = cmd.phone(phone);
    }
    engine.register_user(cmd).await.unwrap();
}

/// Registers the users and puts them in a group created by the first one.
pub async fn group_of(engine: &Engine, users: &[&str]) -> Group {
    for user in users {
        register(engine, user, None).await;
    }
    let group = engine.create_group("Trip", users[0]).await.unwrap();
    for user in &users[1..] {
        engine
            .add_group_member(&group.id, users[0], user)
            .await
            .unwrap();
    }
    group
}

pub fn user(id: &str) -> Participant {
    Participant::registered(id)
}

pub fn cents(value: i64) -> Money {
    Money::new(value)
}

pub fn equal_expense(
    group_id: &str,
    caller: &str,
    payer: Participant,
    amount: i64,
    participants: Vec<Participant>,
) -> ExpenseCmd {
    ExpenseCmd::new(
        group_id,
        caller,
        "dinner",
        Money::new(amount),
        payer,
        SplitRule::Equal { participants },
    )
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

use std::error::Error;

use sqlite_binder::prelude::*;
use tempfile::tempdir;

fn setup() -> Result<Session, DbError> {
    let se = Session::open_in_memory()?;
    se.execute_sql("create table some_table (id integer primary key, name text)")?;
    Ok(se)
}

fn count(se: &Session) -> Result<i64, DbError> {
    let mut n = 0_i64;
    se.once("select count(*) from some_table").put(into(&mut n))?.execute()?;
    Ok(n)
}

fn insert(se: &Session, id: i32) -> Result<(), DbError> {
    se.once("insert into some_table (id, name) values (:id, :name)")
        .put(using_value(id).named("id"))?
        .put(using_value(format!("row {id}")).named("name"))?
        .execute()?;
    Ok(())
}

#[test]
fn commit_keeps_changes() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("txn.db");
    {
        let se = Session::open(&path, OpenFlags::default())?;
        se.execute_sql("create table some_table (id integer primary key, name text)")?;
        let tx = se.transaction(TransactionKind::Immediate)?;
        assert_eq!(se.active_txn(), Some(TransactionKind::Immediate));
        insert(&se, 1)?;
        insert(&se, 2)?;
        tx.commit()?;
        assert!(se.active_txn().is_none());
    }
    let se = Session::open(&path, OpenFlags::READ)?;
    assert_eq!(count(&se)?, 2);
    Ok(())
}

#[test]
fn rollback_discards_changes() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1)?;
    let tx = Transaction::begin(&se, TransactionKind::Deferred)?;
    insert(&se, 2)?;
    assert_eq!(count(&se)?, 2);
    tx.rollback()?;
    assert_eq!(count(&se)?, 1);
    assert!(se.active_txn().is_none());
    Ok(())
}

#[test]
fn drop_rolls_back() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    {
        let _tx = se.transaction(TransactionKind::Exclusive)?;
        insert(&se, 1)?;
    }
    assert_eq!(count(&se)?, 0);
    assert!(se.active_txn().is_none());
    Ok(())
}

#[test]
fn nested_transactions_are_rejected() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let outer = se.transaction(TransactionKind::Deferred)?;
    let err = se.transaction(TransactionKind::Immediate).unwrap_err();
    assert!(matches!(err, DbError::NestedTransactionNotSupported));
    assert_eq!(err.code(), -1);
    assert_eq!(se.active_txn(), Some(TransactionKind::Deferred));
    outer.commit()?;

    // A new transaction may start once the first one is over.
    let again = se.transaction(TransactionKind::Immediate)?;
    assert_eq!(again.kind(), TransactionKind::Immediate);
    again.rollback()?;
    Ok(())
}

#[test]
fn failed_statement_inside_transaction_can_still_commit() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let tx = se.transaction(TransactionKind::Deferred)?;
    insert(&se, 1)?;
    let err = insert(&se, 1).unwrap_err();
    assert_eq!(err.code() & 0xff, 19);
    insert(&se, 2)?;
    tx.commit()?;
    assert_eq!(count(&se)?, 2);
    Ok(())
}

#[test]
fn kind_parses_from_config() -> Result<(), Box<dyn Error>> {
    let kind: TransactionKind = serde_json::from_str("\"exclusive\"")?;
    assert_eq!(kind, TransactionKind::Exclusive);
    assert_eq!(TransactionKind::default(), TransactionKind::Deferred);
    Ok(())
}

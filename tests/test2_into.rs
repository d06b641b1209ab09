use std::cell::{Cell, RefCell};
use std::error::Error;

use sqlite_binder::prelude::*;

fn setup() -> Result<Session, DbError> {
    let se = Session::open_in_memory()?;
    se.execute_sql("create table some_table (id integer, name text, salary real, data blob)")?;
    Ok(se)
}

fn insert(se: &Session, id: i32, name: &str, salary: f64) -> Result<(), DbError> {
    se.once("insert into some_table (id, name, salary) values (?, ?, ?)")
        .put(using_value(id))?
        .put(using_value(name.to_owned()))?
        .put(using_value(salary))?
        .execute()?;
    Ok(())
}

#[test]
fn into_by_position() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1, "Ignat", 345.2)?;

    let mut id = 0_i32;
    let mut name = String::new();
    let mut salary = 0.0_f64;
    {
        let mut st = Statement::with_sql(&se, "select * from some_table where id = 1");
        st.query_mut()
            .put(into(&mut id))?
            .put(into(&mut name))?
            .put(into(&mut salary))?;
        assert!(st.exec()?, "select completed");
        assert!(se.last_exec());
        assert!(!st.exec()?, "single row");
        assert!(!se.last_exec());
    }
    assert_eq!((id, name.as_str(), salary), (1, "Ignat", 345.2));
    Ok(())
}

#[test]
fn into_by_name_ignores_binder_order() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1, "Egor", 345.2)?;

    let mut id = 0_i32;
    let mut name = String::new();
    let mut salary = 0.0_f64;
    {
        let mut st = Statement::with_sql(&se, "select id, name, salary from some_table");
        st.query_mut()
            .put(into(&mut salary).named("salary"))?
            .put(into(&mut id).named("id"))?
            .put(into(&mut name).named("name"))?;
        assert!(st.exec()?);
        assert!(!st.exec()?);
    }
    assert_eq!((id, name.as_str(), salary), (1, "Egor", 345.2));
    Ok(())
}

#[test]
fn into_by_invalid_name_leaves_statement_unprepared() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut id = 0_i32;
    let mut st = Statement::with_sql(&se, "select id from some_table");
    st.query_mut().put(into(&mut id).named("id_ZZZ"))?;
    match st.exec() {
        Err(DbError::NoSuchColumn(name)) => assert_eq!(name, "id_ZZZ"),
        other => panic!("expected NoSuchColumn, got {other:?}"),
    }
    assert!(!st.is_prepared());
    assert_eq!(st.state(), StatementState::Unprepared);
    Ok(())
}

#[test]
fn column_names_match_case_sensitively() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1, "Case", 1.0)?;
    let mut id = 0_i32;
    let err = se
        .once("select id from some_table")
        .put(into(&mut id).named("ID"))?
        .execute()
        .unwrap_err();
    assert!(matches!(err, DbError::NoSuchColumn(_)));
    assert_eq!(err.code(), -2);
    Ok(())
}

#[test]
fn null_blob_reads_as_empty() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1, "Gosha", 634.4)?;

    let mut id = 0_i32;
    let mut name = String::new();
    let mut salary = 0.0_f64;
    let mut data = vec![9_u8];
    {
        let mut st = Statement::with_sql(&se, "select * from some_table where id = 1");
        st.query_mut()
            .put(into(&mut id))?
            .put(into(&mut name))?
            .put(into(&mut salary))?
            .put(into(&mut data))?;
        assert!(st.exec()?);
        assert!(!st.exec()?);
    }
    assert_eq!(name, "Gosha");
    assert!(data.is_empty());
    Ok(())
}

#[test]
fn explicit_position_then_next_column() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 7, "Seven", 7.5)?;

    let mut salary = 0.0_f64;
    let mut id = 0_i32;
    let mut name = String::new();
    se.once("select id, name, salary from some_table")
        .put(into(&mut salary).at(2))?
        .put(into(&mut id).at(0))?
        .put(into(&mut name))?
        .execute()?;
    assert_eq!((id, name.as_str(), salary), (7, "Seven", 7.5));
    Ok(())
}

#[test]
fn cell_targets_are_visible_between_steps() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        insert(&se, id, name, 0.0)?;
    }

    let id = Cell::new(0_i64);
    let name = RefCell::new(String::new());
    let mut st = Statement::with_sql(&se, "select id, name from some_table order by id");
    st.query_mut().put(into(&id))?.put(into(&name))?;

    let mut seen = Vec::new();
    while st.exec()? {
        seen.push((id.get(), name.borrow().clone()));
    }
    assert_eq!(
        seen,
        vec![(1, "a".to_owned()), (2, "b".to_owned()), (3, "c".to_owned())]
    );
    assert_eq!(st.state(), StatementState::Done);
    Ok(())
}

#[test]
fn targets_keep_last_row_after_done() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1, "first", 0.0)?;
    insert(&se, 2, "last", 0.0)?;

    let name = RefCell::new(String::from("untouched"));
    let mut st = Statement::with_sql(&se, "select name from some_table order by id");
    st.query_mut().put(into(&name))?;
    assert!(st.exec()?);
    assert!(st.exec()?);
    assert!(!st.exec()?);
    assert_eq!(*name.borrow(), "last");

    st.set_query(Query::new("select name from some_table where id = 99"));
    st.query_mut().put(into(&name))?;
    assert!(!st.exec()?);
    assert_eq!(*name.borrow(), "last");
    Ok(())
}

#[test]
fn into_and_use_together() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    insert(&se, 1, "one", 1.0)?;
    insert(&se, 2, "two", 2.0)?;

    let wanted = Cell::new(1_i32);
    let name = RefCell::new(String::new());
    let mut st = Statement::with_sql(&se, "select name from some_table where id = ?");
    st.query_mut().put(into(&name))?.put(using(&wanted))?;
    assert!(st.exec()?);
    assert_eq!(*name.borrow(), "one");

    wanted.set(2);
    st.reset(true)?;
    assert!(st.exec()?);
    assert_eq!(*name.borrow(), "two");
    assert!(!st.exec()?);
    Ok(())
}

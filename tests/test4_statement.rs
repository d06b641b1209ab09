use std::error::Error;

use sqlite_binder::prelude::*;

const SQLITE_ERROR: i32 = 1;
const SQLITE_CONSTRAINT: i32 = 19;
const SQLITE_MISUSE: i32 = 21;
const SQLITE_RANGE: i32 = 25;

fn setup() -> Result<Session, DbError> {
    let se = Session::open_in_memory()?;
    se.execute_sql("create table some_table (id integer primary key, name text)")?;
    se.execute_sql("insert into some_table (id, name) values (1, 'one'), (2, 'two')")?;
    Ok(se)
}

#[test]
fn lifecycle_states() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select id from some_table order by id");
    assert_eq!(st.state(), StatementState::Unprepared);

    st.prepare()?;
    assert_eq!(st.state(), StatementState::Prepared);
    assert!(st.is_prepared());

    assert!(st.exec()?);
    assert_eq!(st.state(), StatementState::Row);
    assert_eq!(st.get::<i32>(0)?, 1);
    assert!(st.exec()?);
    assert!(!st.exec()?);
    assert_eq!(st.state(), StatementState::Done);

    st.reset(false)?;
    assert_eq!(st.state(), StatementState::Prepared);
    assert!(st.exec()?);
    assert_eq!(st.get::<i32>(0)?, 1);

    st.finalize(true)?;
    assert_eq!(st.state(), StatementState::Unprepared);
    assert!(!st.is_prepared());
    // Finalizing or resetting again is harmless.
    st.finalize(true)?;
    st.reset(true)?;
    Ok(())
}

#[test]
fn exec_prepares_on_demand() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select count(*) from some_table");
    assert!(st.exec()?);
    assert!(st.is_prepared());
    assert_eq!(st.get::<i64>(0)?, 2);
    Ok(())
}

#[test]
fn only_one_statement_per_text() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select 1; select 2");
    let err = st.prepare().unwrap_err();
    assert!(matches!(err, DbError::MultiStatementNotSupported));
    assert_eq!(err.code(), -4);
    assert!(!st.is_prepared());

    st.set_query(Query::new("select 1;  \n\t"));
    st.prepare()?;
    assert!(st.is_prepared());
    Ok(())
}

#[test]
fn text_without_a_statement_is_rejected() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    for sql in ["", "   ", "-- nothing here"] {
        let mut st = Statement::with_sql(&se, sql);
        assert!(matches!(st.prepare(), Err(DbError::InvalidArgument(_))), "{sql:?}");
        assert!(!st.is_prepared());
    }
    Ok(())
}

#[test]
fn syntax_error_reports_engine_message() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "selec id from some_table");
    let err = st.exec().unwrap_err();
    assert_eq!(err.code(), SQLITE_ERROR);
    assert!(err.to_string().contains("syntax error"), "{err}");
    assert!(!st.is_prepared());
    assert_eq!(se.last_error() & 0xff, SQLITE_ERROR);
    assert!(se.check_last_error().is_err());
    Ok(())
}

#[test]
fn step_failure_finalizes_the_statement() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "insert into some_table (id, name) values (1, 'dup')");
    let err = st.exec().unwrap_err();
    assert_eq!(err.code() & 0xff, SQLITE_CONSTRAINT);
    assert!(err.to_string().contains("UNIQUE"), "{err}");
    assert!(!st.is_prepared());
    assert!(!se.last_exec());

    // The same statement can be retried after fixing the text.
    st.query_mut().clear();
    st.query_mut().append("insert into some_table (id, name) values (3, 'three')");
    assert!(!st.exec()?);
    assert_eq!(se.last_insert_rowid(), 3);
    Ok(())
}

#[test]
fn column_metadata() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select 1 as a, 'x' as b, 2.5 as c, x'00' as d, null as e");
    st.prepare()?;
    assert_eq!(st.column_count()?, 5);
    assert_eq!(st.column_name(1)?, "b");
    assert_eq!(st.column_index("c")?, 2);
    assert!(matches!(st.column_index("C"), Err(DbError::NoSuchColumn(_))));
    assert_eq!(st.column_name(9).unwrap_err().code(), SQLITE_RANGE);

    assert!(st.exec()?);
    assert_eq!(st.column_type(0)?, ColumnType::Integer);
    assert_eq!(st.column_type(1)?, ColumnType::Text);
    assert_eq!(st.column_type(2)?, ColumnType::Real);
    assert_eq!(st.column_type(3)?, ColumnType::Blob);
    assert_eq!(st.column_type(4)?, ColumnType::Null);
    assert_eq!(st.column_value::<Option<i32>>(4)?, None);
    assert_eq!(st.column_value::<String>(1)?, "x");
    assert_eq!(st.column_value::<Vec<u8>>(3)?, vec![0]);
    assert_eq!(st.get::<f32>(2)?, 2.5);
    Ok(())
}

#[test]
fn column_access_needs_a_row() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select id from some_table where id = 99");
    assert_eq!(st.column_count().unwrap_err().code(), SQLITE_MISUSE);
    assert_eq!(st.get::<i32>(0).unwrap_err().code(), SQLITE_MISUSE);

    st.prepare()?;
    assert_eq!(st.get::<i32>(0).unwrap_err().code(), SQLITE_RANGE);
    assert!(!st.exec()?);
    assert_eq!(st.column_type(0).unwrap_err().code(), SQLITE_RANGE);
    Ok(())
}

#[test]
fn out_of_range_column_in_a_row() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select id from some_table");
    assert!(st.exec()?);
    assert_eq!(st.get::<i32>(1).unwrap_err().code(), SQLITE_RANGE);
    assert_eq!(st.get::<i32>(-1).unwrap_err().code(), SQLITE_RANGE);
    Ok(())
}

#[test]
fn changing_the_query_finalizes() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let mut st = Statement::with_sql(&se, "select name from some_table");
    st.prepare()?;
    st.query_mut().append(" where id = 2");
    assert!(!st.is_prepared());
    assert!(st.exec()?);
    assert_eq!(st.get::<String>(0)?, "two");

    let taken = st.take_query();
    assert_eq!(taken.sql(), "select name from some_table where id = 2");
    assert!(st.query().is_empty());
    assert_eq!(st.state(), StatementState::Unprepared);
    Ok(())
}

#[test]
fn closed_session_is_reported() -> Result<(), Box<dyn Error>> {
    let se = Session::new();
    let mut st = Statement::with_sql(&se, "select 1");
    assert!(matches!(st.exec(), Err(DbError::SessionNotOpen)));
    assert_eq!(st.state(), StatementState::Unprepared);
    Ok(())
}

#[test]
fn statement_debug_shows_query() -> Result<(), Box<dyn Error>> {
    let se = setup()?;
    let st = Statement::with_sql(&se, "select 1");
    let shown = format!("{st:?}");
    assert!(shown.contains("select 1"), "{shown}");
    assert!(shown.contains("Unprepared"), "{shown}");
    Ok(())
}

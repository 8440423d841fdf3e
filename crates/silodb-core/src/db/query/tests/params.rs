use super::*;
use crate::{
    db::query::{ParameterError, QueryError},
    error::ErrorClass,
};

fn parameter_error(err: QueryError) -> ParameterError {
    match err {
        QueryError::Parameter(err) => err,
        other => panic!("expected parameter error, got {other:?}"),
    }
}

#[test]
fn rebinding_an_int_condition() {
    let store = scalar_store();
    let query = store
        .query()
        .equal(&TestEntity::SIMPLE_INT, 2007)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.find_unique().unwrap().map(|e| e.id), Some(8));

    query.set_parameter(&TestEntity::SIMPLE_INT, 2004).unwrap();

    assert_eq!(query.find_unique().unwrap().map(|e| e.id), Some(5));
}

#[test]
fn rebinding_between_bounds() {
    let store = scalar_store();
    let query = store
        .query()
        .between(&TestEntity::SIMPLE_INT, 2005, 2008)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.count().unwrap(), 4);

    query
        .set_parameters(&TestEntity::SIMPLE_INT, 2002, 2003)
        .unwrap();

    assert_eq!(ids(&query.find().unwrap()), vec![3, 4]);
}

#[test]
fn rebinding_a_float_threshold() {
    let store = scalar_store();
    let query = store
        .query()
        .greater(&TestEntity::SIMPLE_FLOAT, 400.65)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.count().unwrap(), 3);

    query
        .set_parameter(&TestEntity::SIMPLE_FLOAT, 400.75)
        .unwrap();

    assert_eq!(query.count().unwrap(), 2);
}

#[test]
fn rebinding_float_between() {
    let store = scalar_store();
    let query = store
        .query()
        .between(&TestEntity::SIMPLE_FLOAT, 400.15, 400.75)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.count().unwrap(), 6);

    query
        .set_parameters(&TestEntity::SIMPLE_FLOAT, 400.65, 400.85)
        .unwrap();

    assert_eq!(ids(&query.find().unwrap()), vec![8, 9]);
}

#[test]
fn rebinding_a_string_condition() {
    let (store, _) = string_store();
    let query = store
        .query()
        .equal(&TestEntity::SIMPLE_STRING, "banana")
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.find_unique().unwrap().map(|e| e.id), Some(1));

    query
        .set_parameter(&TestEntity::SIMPLE_STRING, "bar")
        .unwrap();
    assert_eq!(query.find_unique().unwrap().map(|e| e.id), Some(3));

    query
        .set_parameter(&TestEntity::SIMPLE_STRING, "not here!")
        .unwrap();
    assert_eq!(query.find_unique().unwrap(), None);
}

#[test]
fn rebinding_an_in_list() {
    let store = scalar_store();
    let query = store
        .query()
        .is_in(&TestEntity::SIMPLE_INT, [2001])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.count().unwrap(), 1);

    query
        .set_parameter_list(&TestEntity::SIMPLE_INT, [2002, 2005, 4000])
        .unwrap();

    assert_eq!(ints(&query.find().unwrap()), vec![2002, 2005]);
}

#[test]
fn aliases_disambiguate_repeated_properties() {
    let store = scalar_store();
    let query = store
        .query()
        .greater(&TestEntity::SIMPLE_INT, 2003)
        .unwrap()
        .parameter_alias("low")
        .unwrap()
        .less(&TestEntity::SIMPLE_INT, 2007)
        .unwrap()
        .parameter_alias("high")
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.count().unwrap(), 3);

    let err = query
        .set_parameter(&TestEntity::SIMPLE_INT, 2009)
        .unwrap_err();
    assert_eq!(
        parameter_error(err),
        ParameterError::Ambiguous {
            target: "simple_int".to_string(),
            count: 2,
        }
    );

    query.set_parameter_alias("high", 2009).unwrap();
    assert_eq!(ints(&query.find().unwrap()), vec![2004, 2005, 2006, 2007, 2008]);

    query.set_parameter_alias("low", 2007).unwrap();
    assert_eq!(ints(&query.find().unwrap()), vec![2008]);
}

#[test]
fn alias_rebinding_of_pairs_and_lists() {
    let store = scalar_store();
    let query = store
        .query()
        .between(&TestEntity::SIMPLE_LONG, 3000, 3001)
        .unwrap()
        .parameter_alias("range")
        .unwrap()
        .or()
        .unwrap()
        .is_in(&TestEntity::SIMPLE_INT, [2009])
        .unwrap()
        .parameter_alias("picked")
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(query.count().unwrap(), 3);

    query.set_parameters_alias("range", 3004, 3004).unwrap();
    query
        .set_parameter_list_alias("picked", [2000, 2001])
        .unwrap();

    assert_eq!(ints(&query.find().unwrap()), vec![2000, 2001, 2004]);
}

#[test]
fn unknown_targets_are_not_found() {
    let store = scalar_store();
    let query = store
        .query()
        .equal(&TestEntity::SIMPLE_INT, 2007)
        .unwrap()
        .build()
        .unwrap();

    let err = query
        .set_parameter(&TestEntity::SIMPLE_LONG, 1)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidArgument);

    let err = query.set_parameter_alias("nope", 1).unwrap_err();
    assert_eq!(
        parameter_error(err),
        ParameterError::NotFound {
            target: "nope".to_string(),
        }
    );
}

#[test]
fn rejected_rebinds_leave_the_query_unchanged() {
    let store = scalar_store();
    let query = store
        .query()
        .between(&TestEntity::SIMPLE_INT, 2000, 2001)
        .unwrap()
        .build()
        .unwrap();

    let err = query
        .set_parameter(&TestEntity::SIMPLE_INT, 2005)
        .unwrap_err();
    assert!(matches!(
        parameter_error(err),
        ParameterError::TypeMismatch { op: "between", .. }
    ));

    let err = query
        .set_parameters(&TestEntity::SIMPLE_INT, "a", "b")
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::TypeMismatch);

    let err = query
        .set_parameters(&TestEntity::SIMPLE_INT, None::<i32>, 2003)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NullArgument);

    assert_eq!(query.count().unwrap(), 2);
}

use pretty_assertions::assert_eq;
use tidyframe::window::{cummean, cumsum, lag, rank};
use tidyframe::{
    AsofDirection, AsofOptions, Column, FoldMode, Frame, FrameError, JoinKeys, Mutation,
    PivotWider, RankOptions, RowFn, SortKey, Summary, TieMethod, Value,
};

fn frame(names: &[&str], rows: Vec<Vec<Value>>) -> Frame {
    Frame::from_rows(names.to_vec(), rows).unwrap()
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&v| Value::Int(v)).collect()
}

fn strs(values: &[&str]) -> Vec<Value> {
    values.iter().map(|&v| Value::from(v)).collect()
}

#[test]
fn summarise_emits_groups_in_first_seen_order() {
    let df = Frame::from_columns([
        ("k", Column::from_iter(["B", "A", "B", "C"])),
        ("v", Column::from_iter([1, 2, 3, 4])),
    ])
    .unwrap();
    let out = df
        .group_by(&["k"])
        .unwrap()
        .summarise(
            &Summary::new()
                .agg("key", |g| Ok(g.extract_nth("k", 0)?))
                .agg("total", |g| Ok(tidyframe::stats::sum(&g.extract("v")?, false)?)),
        )
        .unwrap();

    assert_eq!(out.names(), &["key", "total"]);
    assert_eq!(out.extract("key").unwrap(), strs(&["B", "A", "C"]));
    assert_eq!(out.extract("total").unwrap(), ints(&[4, 2, 4]));
}

#[test]
fn ungrouped_summarise_collapses_to_one_row() {
    let df = Frame::from_columns([("v", Column::from_iter([1, 2, 3]))]).unwrap();
    let out = df
        .summarise(&Summary::new().agg("n", |g| Ok(Value::from(g.len()))))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.extract("n").unwrap(), ints(&[3]));
}

#[test]
fn null_keyed_rows_form_one_group() {
    let df = Frame::from_columns([(
        "k",
        Column::new(vec![Value::Null, Value::from("a"), Value::Null]),
    )])
    .unwrap();
    let grouped = df.group_by(&["k"]).unwrap();
    assert_eq!(grouped.n_groups(), 2);
    assert_eq!(grouped.index().groups()[0].rows(), &[0, 2]);
}

#[test]
fn grouped_filter_keeps_original_group_order_and_drops_emptied_groups() {
    let df = Frame::from_columns([
        ("k", Column::from_iter(["B", "A", "B", "C"])),
        ("v", Column::from_iter([1, 2, 3, 4])),
    ])
    .unwrap();
    let kept = df
        .group_by(&["k"])
        .unwrap()
        .filter(|row, _, _| Ok(row.get("v")?.as_i64() != Some(2)))
        .unwrap();
    let keys: Vec<Value> = kept
        .index()
        .groups()
        .iter()
        .map(|g| g.key()[0].clone())
        .collect();
    assert_eq!(keys, strs(&["B", "C"]));
    assert_eq!(kept.frame().extract("v").unwrap(), ints(&[1, 3, 4]));
}

#[test]
fn grouped_head_returns_what_each_group_has() {
    let df = Frame::from_columns([
        ("k", Column::from_iter(["a", "b", "a", "a"])),
        ("v", Column::from_iter([1, 2, 3, 4])),
    ])
    .unwrap();
    let top = df.group_by(&["k"]).unwrap().head(2);
    assert_eq!(top.frame().extract("v").unwrap(), ints(&[1, 3, 2]));
    assert_eq!(top.n_groups(), 2);
}

#[test]
fn duplicate_keys_join_as_cartesian_product() {
    let left = frame(&["k", "l"], vec![ints(&[1, 10]), ints(&[1, 11])]);
    let right = frame(&["k", "r"], vec![ints(&[1, 20]), ints(&[1, 21]), ints(&[1, 22])]);
    let out = left.inner_join(&right, "k").unwrap();
    assert_eq!(out.len(), 6);
    assert_eq!(out.names(), &["k", "l", "r"]);
    assert_eq!(out.extract("r").unwrap(), ints(&[20, 21, 22, 20, 21, 22]));
    assert!(out.columns().all(|(_, c)| !c.is_optional()));
}

#[test]
fn outer_join_marks_unmatched_sides_absent_and_optional() {
    let left = frame(&["k", "v"], vec![vec![1.into(), "a".into()]]);
    let right = frame(&["k", "w"], vec![vec![2.into(), "b".into()]]);
    let out = left.outer_join(&right, "k").unwrap();

    assert_eq!(out.names(), &["k", "v", "w"]);
    assert_eq!(out.extract("k").unwrap(), ints(&[1, 2]));
    assert_eq!(out.extract("v").unwrap(), vec!["a".into(), Value::Absent]);
    assert_eq!(out.extract("w").unwrap(), vec![Value::Absent, "b".into()]);
    assert!(out.column("v").unwrap().is_optional());
    assert!(out.column("w").unwrap().is_optional());
}

#[test]
fn mapped_keys_and_suffixes() {
    let left = frame(&["id", "x"], vec![ints(&[1, 5])]);
    let right = frame(&["key", "x"], vec![ints(&[1, 6])]);
    let out = left
        .inner_join(&right, JoinKeys::mapped(&["id"], &["key"]))
        .unwrap();
    assert_eq!(out.names(), &["id", "x", "x_y"]);
    assert_eq!(out.row(0).unwrap().to_vec(), ints(&[1, 5, 6]));

    assert!(matches!(
        left.inner_join(&right, JoinKeys::mapped(&["id", "x"], &["key"])),
        Err(FrameError::InvalidJoinKeys(_))
    ));
}

#[test]
fn null_join_keys_match_each_other() {
    let left = Frame::from_columns([("k", Column::new(vec![Value::Null, Value::Int(1)]))]).unwrap();
    let right = Frame::from_columns([
        ("k", Column::new(vec![Value::Null])),
        ("w", Column::from_iter(["matched"])),
    ])
    .unwrap();
    let out = left.inner_join(&right, "k").unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.extract("w").unwrap(), strs(&["matched"]));
}

#[test]
fn asof_tolerance_boundary_is_inclusive() {
    let left = Frame::from_columns([("t", Column::from_iter([5]))]).unwrap();
    let right = Frame::from_columns([
        ("t", Column::from_iter([3, 8])),
        ("tag", Column::from_iter(["three", "eight"])),
    ])
    .unwrap();
    let options = AsofOptions::default()
        .direction(AsofDirection::Backward)
        .tolerance(2.0);
    let out = left.asof_join(&right, "t", &options).unwrap();
    assert_eq!(out.extract("tag").unwrap(), strs(&["three"]));

    let tighter = AsofOptions::default().tolerance(1.999);
    let out = left.asof_join(&right, "t", &tighter).unwrap();
    assert_eq!(out.extract("tag").unwrap(), vec![Value::Absent]);
}

#[test]
fn rank_averages_ties() {
    let ranks = rank(&ints(&[3, 1, 4, 1, 5]), RankOptions::default());
    let expected: Vec<Value> = [3.0, 1.5, 4.0, 1.5, 5.0].into_iter().map(Value::Float).collect();
    assert_eq!(ranks, expected);

    let dense = rank(
        &ints(&[3, 1, 4, 1, 5]),
        RankOptions {
            ties: TieMethod::Dense,
            descending: true,
        },
    );
    assert_eq!(dense, ints(&[3, 4, 2, 4, 1]));
}

#[test]
fn lag_rejects_negative_shift_and_saturates_long_ones() {
    assert!(matches!(
        lag(&ints(&[1, 2]), -1, None),
        Err(FrameError::NegativeShift(-1))
    ));
    assert_eq!(
        lag(&ints(&[1, 2]), 5, Some(Value::Int(0))).unwrap(),
        ints(&[0, 0])
    );
    assert_eq!(lag(&ints(&[1, 2]), 0, None).unwrap(), ints(&[1, 2]));
}

#[test]
fn unnest_keeps_a_row_for_empty_lists() {
    let df = Frame::from_columns([
        ("id", Column::from_iter([1, 2, 3])),
        (
            "items",
            Column::new(vec![
                Value::list(vec![]),
                Value::list(vec!["x".into(), "y".into()]),
                Value::Null,
            ]),
        ),
    ])
    .unwrap();
    let out = df.unnest("items").unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(out.extract("id").unwrap(), ints(&[1, 2, 2, 3]));
    assert_eq!(
        out.extract("items").unwrap(),
        vec![Value::Absent, "x".into(), "y".into(), Value::Null]
    );
}

#[test]
fn transpose_round_trips_mixed_columns() {
    let df = Frame::from_columns([
        ("a", Column::from_iter([1, 2])),
        ("b", Column::from_iter(["x", "y"])),
        ("c", Column::new(vec![Value::Absent, Value::Bool(true)])),
    ])
    .unwrap();
    let once = df.transpose(3).unwrap();
    assert_eq!(once.names(), &["row_0", "row_1"]);
    assert_eq!(once.row_labels().unwrap(), &["a", "b", "c"]);
    assert_eq!(once.extract("row_1").unwrap(), vec![Value::Int(2), "y".into(), true.into()]);

    let twice = once.transpose(2).unwrap();
    assert_eq!(twice, df);
    assert!(twice.column("c").unwrap().is_optional());
    assert!(twice.row_labels().is_none());

    assert!(matches!(
        df.transpose(2),
        Err(FrameError::TransposeRowCount { expected: 2, actual: 3 })
    ));
}

#[test]
fn overwriting_a_grouping_column_regroups() {
    let df = Frame::from_columns([
        ("k", Column::from_iter(["a", "b", "a"])),
        ("v", Column::from_iter([1, 2, 3])),
    ])
    .unwrap();
    let regrouped = df
        .group_by(&["k"])
        .unwrap()
        .mutate(&Mutation::new().with("k", |row, _, _| {
            let v = row.get("v")?.as_i64().unwrap_or_default();
            Ok(if v >= 2 { "z".into() } else { row.get("k")?.clone() })
        }))
        .unwrap();

    let groups: Vec<(Value, Vec<usize>)> = regrouped
        .index()
        .groups()
        .iter()
        .map(|g| (g.key()[0].clone(), g.rows().to_vec()))
        .collect();
    assert_eq!(
        groups,
        vec![(Value::from("a"), vec![0]), (Value::from("z"), vec![1, 2])]
    );
}

#[test]
fn mutating_other_columns_keeps_the_group_index() {
    let df = Frame::from_columns([("k", Column::from_iter(["a", "b", "a"]))]).unwrap();
    let grouped = df.group_by(&["k"]).unwrap();
    let out = grouped
        .mutate(&Mutation::new().with("pos", |_, index, _| Ok(Value::from(index))))
        .unwrap();
    assert_eq!(out.index(), grouped.index());
    assert_eq!(out.frame().extract("pos").unwrap(), ints(&[0, 0, 1]));
}

#[test]
fn pivot_wider_fails_on_duplicate_cells_without_aggregator() {
    let df = frame(
        &["id", "name", "value"],
        vec![
            vec![1.into(), "x".into(), 10.into()],
            vec![1.into(), "x".into(), 11.into()],
        ],
    );
    assert!(matches!(
        df.pivot_wider(&PivotWider::new("name", "value")),
        Err(FrameError::DuplicatePivotCell { .. })
    ));

    let summed = df
        .pivot_wider(
            &PivotWider::new("name", "value")
                .aggregate(|cell| Ok(tidyframe::stats::sum(cell, false)?)),
        )
        .unwrap();
    assert_eq!(summed.extract("x").unwrap(), ints(&[21]));
}

#[test]
fn pivot_wider_expected_columns_fix_the_output() {
    let df = frame(
        &["id", "name", "value"],
        vec![
            vec![1.into(), "x".into(), 10.into()],
            vec![2.into(), "y".into(), 20.into()],
        ],
    );
    let out = df
        .pivot_wider(&PivotWider::new("name", "value").expected_columns(&["y", "z", "x"]))
        .unwrap();
    assert_eq!(out.names(), &["id", "y", "z", "x"]);
    assert_eq!(out.extract("z").unwrap(), vec![Value::Absent, Value::Absent]);
    assert_eq!(out.extract("x").unwrap(), vec![10.into(), Value::Absent]);

    match df.pivot_wider(&PivotWider::new("name", "value").expected_columns(&["x"])) {
        Err(FrameError::UnexpectedPivotNames { unexpected, .. }) => {
            assert_eq!(unexpected, vec!["y".to_string()])
        }
        other => panic!("expected UnexpectedPivotNames, got {other:?}"),
    }
}

#[test]
fn cumulative_folds_propagate_or_skip_missing() {
    let input = vec![Value::Int(1), Value::Null, Value::Int(2)];
    assert_eq!(
        cumsum(&input, FoldMode::Propagate).unwrap(),
        vec![Value::Float(1.0), Value::Null, Value::Null]
    );
    assert_eq!(
        cumsum(&input, FoldMode::Remove).unwrap(),
        vec![Value::Float(1.0), Value::Float(1.0), Value::Float(3.0)]
    );
    assert_eq!(
        cummean(&input, FoldMode::Remove).unwrap(),
        vec![Value::Float(1.0), Value::Float(1.0), Value::Float(1.5)]
    );

    let nan = cumsum(&[Value::Float(f64::NAN), Value::Int(1)], FoldMode::Propagate).unwrap();
    assert!(nan.iter().all(|v| v.as_f64().is_some_and(f64::is_nan)));
}

#[test]
fn row_labels_follow_selection_but_not_new_row_sets() {
    let df = Frame::from_columns([("v", Column::from_iter([3, 1, 2]))])
        .unwrap()
        .set_row_labels(vec!["r0", "r1", "r2"])
        .unwrap();

    let filtered = df
        .filter(|row, _, _| Ok(row.get("v")?.as_i64() != Some(1)))
        .unwrap();
    assert_eq!(filtered.row_labels().unwrap(), &["r0", "r2"]);

    let sorted = df.arrange(&[SortKey::asc("v")]).unwrap();
    assert_eq!(sorted.row_labels().unwrap(), &["r1", "r2", "r0"]);

    let joined = df.inner_join(&df, "v").unwrap();
    assert!(joined.row_labels().is_none());

    let summary = df
        .summarise(&Summary::new().agg("n", |g| Ok(Value::from(g.len()))))
        .unwrap();
    assert!(summary.row_labels().is_none());
}

#[test]
fn callback_errors_abort_while_error_values_are_data() {
    let df = Frame::from_columns([("v", Column::from_iter([1, 2, 3]))]).unwrap();

    let failed = df.mutate(&Mutation::new().with("w", |row, _, _| {
        match row.get("v")?.as_i64() {
            Some(2) => Err("boom".into()),
            other => Ok(other.into()),
        }
    }));
    match failed {
        Err(FrameError::Callback { verb, position, .. }) => {
            assert_eq!((verb, position), ("mutate", 1));
        }
        other => panic!("expected a callback failure, got {other:?}"),
    }

    let stored = df
        .mutate(&Mutation::new().with("w", |_, index, _| {
            Ok(if index == 1 { Value::error("bad row") } else { Value::Int(0) })
        }))
        .unwrap();
    assert_eq!(stored.extract_nth("w", 1).unwrap(), Value::error("bad row"));
}

#[test]
fn sync_mutate_rejects_async_callbacks() {
    let df = Frame::from_columns([("v", Column::from_iter([1]))]).unwrap();
    let mutation = Mutation::new().column(
        "w",
        RowFn::future(|_, _| async { Ok::<_, tidyframe::CallbackError>(Value::Int(1)) }),
    );
    assert!(matches!(
        df.mutate(&mutation),
        Err(FrameError::AsyncCallback { verb: "mutate", .. })
    ));
}

#[test]
fn empty_frames_flow_through_verbs() {
    let df = Frame::from_columns([
        ("k", Column::new(Vec::new())),
        ("v", Column::new(Vec::new())),
    ])
    .unwrap();
    assert!(df.is_empty());
    let out = df
        .mutate(&Mutation::new().with("w", |_, _, _| Ok(Value::Int(1))))
        .unwrap();
    assert_eq!(out.names(), &["k", "v", "w"]);
    assert!(out.is_empty());
    assert!(df.arrange(&[SortKey::desc("v")]).unwrap().is_empty());
    assert_eq!(df.group_by(&["k"]).unwrap().n_groups(), 0);
    assert!(df.inner_join(&df, "k").unwrap().is_empty());
    assert!(df.unnest("v").unwrap().is_empty());
    assert_eq!(
        df.summarise(&Summary::new().agg("n", |g| Ok(Value::from(g.len()))))
            .unwrap()
            .extract("n")
            .unwrap(),
        ints(&[0])
    );
}

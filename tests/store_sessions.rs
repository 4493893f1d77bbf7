use roster::{
    core::store::{ReentryPolicy, StoreConfig, StoreError, StudentStore},
    op::Op,
    student::{StudentField, StudentRecord},
    types::{Gender, SessionMode, StudentId},
};

fn create(store: &mut StudentStore, name: &str) -> StudentRecord {
    store.begin_create().expect("begin");
    store
        .update_draft_field(StudentField::Name, name)
        .expect("name");
    store.commit().expect("commit").0
}

fn seeded(names: &[&str]) -> StudentStore {
    let mut store = StudentStore::new();
    for name in names {
        create(&mut store, name);
    }
    store
}

#[test]
fn begin_create_mints_blank_draft_with_defaults() {
    let mut store = StudentStore::new();
    let draft = store.begin_create().expect("begin");

    assert_eq!(draft.id.as_str(), "STU-1");
    assert_eq!(draft.gender, Gender::Male);
    assert!(draft.name.is_empty() && draft.email.is_empty() && draft.dob.is_empty());
    assert_eq!(store.session_mode(), Some(SessionMode::Creating));
    assert!(store.is_empty());
}

#[test]
fn create_round_trip_appends_at_end() {
    let mut store = seeded(&["Zed"]);

    store.begin_create().expect("begin");
    store
        .update_draft_field(StudentField::Name, "Alice")
        .expect("name");
    let (rec, stored) = store.commit().expect("commit");

    assert_eq!(rec.id.as_str(), "STU-2");
    assert_eq!(rec.name, "Alice");
    assert_eq!(store.list().last(), Some(&rec));
    assert_eq!(store.len(), 2);
    assert!(matches!(stored.op, Op::Appended { .. }));
    assert!(!store.is_session_active());
}

#[test]
fn edit_round_trip_replaces_in_place_and_keeps_id() {
    let mut store = seeded(&["Ann", "Bob"]);
    let a = store.list()[0].clone();
    let b_id = store.list()[1].id.clone();

    let draft = store.begin_edit(1).expect("edit");
    assert_eq!(draft.id, b_id);
    store
        .update_draft_field(StudentField::Name, "Bob2")
        .expect("name");

    // Original untouched until commit.
    assert_eq!(store.list()[1].name, "Bob");

    let (rec, stored) = store.commit().expect("commit");
    assert_eq!(store.list(), &[a, rec.clone()]);
    assert_eq!(rec.id, b_id);
    assert_eq!(rec.name, "Bob2");
    match stored.op {
        Op::Replaced { index, prev, .. } => {
            assert_eq!(index, 1);
            assert_eq!(prev.name, "Bob");
        }
        other => panic!("unexpected op {other:?}"),
    }
}

#[test]
fn cancel_leaves_records_untouched_and_is_idempotent() {
    let mut store = seeded(&["Ann", "Bob"]);
    let before = store.list_cloned();

    store.begin_edit(0).expect("edit");
    store
        .update_draft_field(StudentField::Email, "ann@example.com")
        .expect("email");
    store
        .update_draft_field(StudentField::Gender, "female")
        .expect("gender");

    assert!(store.cancel());
    assert_eq!(store.list(), before.as_slice());
    assert!(store.draft().is_none());

    assert!(!store.cancel());
    assert_eq!(store.list(), before.as_slice());
}

#[test]
fn cancelled_create_burns_its_id() {
    let mut store = StudentStore::new();
    store.begin_create().expect("begin");
    store.cancel();

    let rec = create(&mut store, "Ann");
    assert_eq!(rec.id.as_str(), "STU-2");
}

#[test]
fn ids_never_reissued_after_delete() {
    let mut store = seeded(&["Ann", "Bob", "Cid"]);
    store.delete(2).expect("delete");
    store.delete(0).expect("delete");

    let rec = create(&mut store, "Dee");
    assert_eq!(rec.id.as_str(), "STU-4");
    assert_eq!(store.next_sequence(), 5);
}

#[test]
fn delete_shifts_later_positions_down() {
    let mut store = seeded(&["Ann", "Bob", "Cid"]);
    let original = store.list_cloned();

    let (removed, stored) = store.delete(0).expect("delete");
    assert_eq!(removed, original[0]);
    assert_eq!(store.list(), &original[1..]);
    assert_eq!(stored.op, Op::Removed { index: 0, record: removed });
}

#[test]
fn out_of_range_indices_fail_without_change() {
    let mut store = seeded(&["Ann", "Bob"]);
    let before = store.list_cloned();

    assert_eq!(
        store.begin_edit(99),
        Err(StoreError::OutOfRange { index: 99, len: 2 })
    );
    assert_eq!(
        store.delete(99).map(|(r, _)| r),
        Err(StoreError::OutOfRange { index: 99, len: 2 })
    );
    assert_eq!(store.list(), before.as_slice());
    assert!(!store.is_session_active());
}

#[test]
fn identity_is_immutable_in_any_session() {
    let mut store = seeded(&["Ann"]);

    store.begin_create().expect("begin");
    assert_eq!(
        store.update_draft_field(StudentField::Id, "HACKED"),
        Err(StoreError::ImmutableField(StudentField::Id))
    );
    assert_eq!(store.draft().map(|d| d.id.as_str()), Some("STU-2"));
    store.cancel();

    store.begin_edit(0).expect("edit");
    let field: StudentField = "id".parse().expect("field");
    assert!(store.update_draft_field(field, "HACKED").is_err());
    assert_eq!(store.draft().map(|d| d.id.as_str()), Some("STU-1"));
}

#[test]
fn draft_ops_require_open_session() {
    let mut store = StudentStore::new();
    assert_eq!(
        store.update_draft_field(StudentField::Name, "x"),
        Err(StoreError::NoActiveSession)
    );
    assert_eq!(
        store.commit().map(|(r, _)| r),
        Err(StoreError::NoActiveSession)
    );
}

#[test]
fn invalid_gender_leaves_draft_unchanged() {
    let mut store = StudentStore::new();
    store.begin_create().expect("begin");
    store
        .update_draft_field(StudentField::Gender, "Other")
        .expect("gender");

    let err = store
        .update_draft_field(StudentField::Gender, "robot")
        .expect_err("rejected");
    assert!(matches!(err, StoreError::InvalidFieldValue { field: StudentField::Gender, .. }));
    assert_eq!(store.draft().map(|d| d.gender), Some(Gender::Other));
}

#[test]
fn unknown_field_name_is_rejected() {
    assert_eq!(
        "nickname".parse::<StudentField>(),
        Err(StoreError::UnknownField("nickname".to_string()))
    );
    assert_eq!("dob".parse::<StudentField>(), Ok(StudentField::Dob));
}

#[test]
fn reentrant_begin_is_rejected_by_default() {
    let mut store = seeded(&["Ann"]);
    store.begin_create().expect("begin");
    store
        .update_draft_field(StudentField::Name, "unsaved")
        .expect("name");

    assert_eq!(store.begin_create(), Err(StoreError::SessionAlreadyActive));
    assert_eq!(store.begin_edit(0), Err(StoreError::SessionAlreadyActive));
    assert_eq!(store.draft().map(|d| d.name.as_str()), Some("unsaved"));
    // Rejected begin mints nothing.
    assert_eq!(store.next_sequence(), 3);
}

#[test]
fn discard_policy_replaces_open_draft() {
    let mut store = StudentStore::with_config(StoreConfig {
        reentry: ReentryPolicy::DiscardDraft,
        ..StoreConfig::default()
    });
    store.begin_create().expect("begin");
    store
        .update_draft_field(StudentField::Name, "lost")
        .expect("name");

    let second = store.begin_create().expect("begin again");
    assert_eq!(second.id.as_str(), "STU-2");
    assert_eq!(store.draft().map(|d| d.name.as_str()), Some(""));

    store.commit().expect("commit");
    assert_eq!(store.len(), 1);
}

#[test]
fn delete_under_open_edit_makes_commit_stale() {
    let mut store = seeded(&["Ann", "Bob", "Cid"]);
    store.begin_edit(1).expect("edit");
    store
        .update_draft_field(StudentField::Name, "Bob2")
        .expect("name");

    store.delete(0).expect("delete");
    let before = store.list_cloned();

    assert_eq!(
        store.commit().map(|(r, _)| r),
        Err(StoreError::StaleSessionTarget { index: 1 })
    );
    assert_eq!(store.list(), before.as_slice());
    assert!(store.is_session_active());
    assert!(store.cancel());
}

#[test]
fn delete_of_edit_target_at_end_makes_commit_stale() {
    let mut store = seeded(&["Ann", "Bob"]);
    store.begin_edit(1).expect("edit");
    store.delete(1).expect("delete");

    assert_eq!(
        store.commit().map(|(r, _)| r),
        Err(StoreError::StaleSessionTarget { index: 1 })
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn delete_after_edit_target_keeps_commit_valid() {
    let mut store = seeded(&["Ann", "Bob", "Cid"]);
    store.begin_edit(0).expect("edit");
    store
        .update_draft_field(StudentField::Address, "1 Main St")
        .expect("address");
    store.delete(2).expect("delete");

    let (rec, _) = store.commit().expect("commit");
    assert_eq!(store.list()[0], rec);
    assert_eq!(rec.address, "1 Main St");
}

#[test]
fn find_locates_by_identity() {
    let mut store = seeded(&["Ann", "Bob"]);
    let (idx, rec) = store.find(&StudentId::from("STU-2")).expect("found");
    assert_eq!((idx, rec.name.as_str()), (1, "Bob"));

    store.delete(0).expect("delete");
    assert_eq!(store.find(&StudentId::from("STU-2")).map(|(i, _)| i), Some(0));
    assert!(store.find(&StudentId::from("STU-1")).is_none());
}

#[test]
fn op_sequence_advances_per_committed_change() {
    let mut store = StudentStore::new();
    assert_eq!(store.latest_op_seq(), 0);

    create(&mut store, "Ann");
    store.begin_create().expect("begin");
    store.cancel();
    store.begin_edit(0).expect("edit");
    let (_, edit) = store.commit().expect("commit");
    let (_, del) = store.delete(0).expect("delete");

    assert_eq!((edit.seq, del.seq), (2, 3));
    assert_eq!(store.latest_op_seq(), 3);
}

#[test]
fn custom_prefix_is_used_for_minting() {
    let mut store = StudentStore::with_config(StoreConfig {
        id_prefix: "S".to_string(),
        ..StoreConfig::default()
    });
    assert_eq!(store.begin_create().expect("begin").id.as_str(), "S1");
}

#[test]
fn find_tracks_positions_through_commits_and_deletes() {
    let mut store = seeded(&["Ann", "Bob", "Cid", "Dee"]);
    store.delete(1).expect("delete");
    store.begin_edit(1).expect("edit");
    store
        .update_draft_field(StudentField::Name, "Cid2")
        .expect("name");
    store.commit().expect("commit");
    create(&mut store, "Eve");

    for (index, rec) in store.list().iter().enumerate() {
        assert_eq!(store.find(&rec.id), Some((index, rec)));
    }
    assert!(store.find(&StudentId::from("STU-2")).is_none());
    assert_eq!(store.find(&StudentId::from("STU-5")).map(|(i, _)| i), Some(3));
}

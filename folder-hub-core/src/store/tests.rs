use super::*;
use crate::documents::InMemoryDocumentRepository;
use crate::model::DocumentRef;

fn setup() -> (HierarchyStore, Arc<InMemoryDocumentRepository>) {
    let docs = Arc::new(InMemoryDocumentRepository::new());
    (HierarchyStore::in_memory(docs.clone()), docs)
}

async fn folder(store: &HierarchyStore, name: &str, parent: Option<Uuid>) -> FolderNode {
    store
        .add(FolderNode::new(name, Uuid::nil()).with_parent(parent))
        .await
        .unwrap()
}

#[tokio::test]
async fn add_derives_path_and_level() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let c = folder(&store, "C", Some(b.id)).await;

    assert_eq!((a.path.as_str(), a.level), ("A", 0));
    assert_eq!((c.path.as_str(), c.level), ("A/B/C", 2));
    assert_eq!(c.version, 1);
    assert_eq!(store.get_depth(c.id).await, 2);
    assert_eq!(store.get_depth(Uuid::new_v4()).await, -1);
}

#[tokio::test]
async fn add_rejects_unknown_parent_and_bad_names() {
    let (store, _) = setup();
    let orphan = FolderNode::new("X", Uuid::nil()).with_parent(Some(Uuid::new_v4()));
    assert!(matches!(store.add(orphan).await, Err(HierarchyError::NotFound(_))));
    assert!(matches!(
        store.add(FolderNode::new("a/b", Uuid::nil())).await,
        Err(HierarchyError::InvalidName(_))
    ));
}

#[tokio::test]
async fn breadcrumbs_and_descendancy() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let c = folder(&store, "C", Some(b.id)).await;

    let crumbs: Vec<_> = store
        .get_breadcrumbs(c.id)
        .await
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(crumbs, vec!["A", "B", "C"]);

    assert!(store.is_descendant_of(c.id, a.id).await);
    assert!(store.is_descendant_of(c.id, b.id).await);
    assert!(!store.is_descendant_of(a.id, c.id).await);
    assert!(!store.is_descendant_of(a.id, a.id).await);
    assert_eq!(store.ancestor_ids(c.id).await, vec![b.id, a.id]);
    assert_eq!(store.descendant_ids(a.id).await.len(), 2);
    assert_eq!(store.get_parent(c.id).await.map(|p| p.id), Some(b.id));
}

#[tokio::test]
async fn siblings_exclude_self_and_inactive() {
    let (store, _) = setup();
    let root = folder(&store, "root", None).await;
    let x = folder(&store, "x", Some(root.id)).await;
    let y = folder(&store, "y", Some(root.id)).await;
    let z = folder(&store, "z", Some(root.id)).await;
    store.set_active(z.id, false, None).await.unwrap();

    let siblings = store.get_siblings(x.id).await;
    assert_eq!(siblings.len(), 1);
    assert_eq!(siblings[0].id, y.id);
    assert!(store.get_siblings(Uuid::new_v4()).await.is_empty());
}

#[tokio::test]
async fn move_rebuilds_whole_subtree() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let c = folder(&store, "C", Some(b.id)).await;
    let d = folder(&store, "D", Some(c.id)).await;
    let other = folder(&store, "Other", None).await;

    let moved = store.move_folder(c.id, Some(other.id), None, None).await.unwrap();
    assert_eq!(moved.path, "Other/C");
    assert_eq!(moved.level, 1);

    let d = store.get_by_id(d.id).await.unwrap();
    assert_eq!(d.path, "Other/C/D");
    assert_eq!(d.level, 2);
    assert_eq!(d.version, 2);
    assert!(store.verify_integrity().await.is_clean());

    let root = store.move_folder(c.id, None, None, None).await.unwrap();
    assert_eq!((root.path.as_str(), root.level), ("C", 0));
}

#[tokio::test]
async fn move_into_descendant_is_refused() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;

    let err = store.move_folder(a.id, Some(b.id), None, None).await.unwrap_err();
    assert!(matches!(err, HierarchyError::WouldCreateCycle { .. }));
    let err = store.move_folder(a.id, Some(a.id), None, None).await.unwrap_err();
    assert!(matches!(err, HierarchyError::WouldCreateCycle { .. }));
    assert_eq!(store.get_by_id(a.id).await.unwrap().parent_id, None);
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", None).await;

    let renamed = store.rename(a.id, "A2", None).await.unwrap();
    assert_eq!(renamed.version, 2);

    let err = store.move_folder(a.id, Some(b.id), Some(1), None).await.unwrap_err();
    assert!(matches!(
        err,
        HierarchyError::ConcurrencyConflict { expected: 1, actual: 2, .. }
    ));

    let mut stale = a.clone();
    stale.description = Some("old copy".to_string());
    assert!(matches!(
        store.update(stale).await,
        Err(HierarchyError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
async fn update_with_new_parent_rebuilds_paths() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", None).await;
    let c = folder(&store, "C", Some(b.id)).await;

    let mut edit = store.get_by_id(b.id).await.unwrap();
    edit.parent_id = Some(a.id);
    edit.color = Some("#336699".to_string());
    let updated = store.update(edit).await.unwrap();
    assert_eq!(updated.path, "A/B");
    assert_eq!(updated.color.as_deref(), Some("#336699"));
    assert_eq!(store.get_by_id(c.id).await.unwrap().path, "A/B/C");
}

#[tokio::test]
async fn rename_cascades_to_descendants() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let c = folder(&store, "C", Some(b.id)).await;

    store.rename(b.id, "Budget", None).await.unwrap();
    assert_eq!(store.get_by_id(c.id).await.unwrap().path, "A/Budget/C");
}

#[tokio::test]
async fn delete_guards() {
    let (store, docs) = setup();
    let sys = store
        .add(FolderNode::new("Inbox", Uuid::nil()).system())
        .await
        .unwrap();
    let parent = folder(&store, "Parent", None).await;
    let child = folder(&store, "Child", Some(parent.id)).await;
    docs.insert(DocumentRef::new("memo.pdf", Some(child.id), 12));

    assert!(matches!(
        store.delete(sys.id).await,
        Err(HierarchyError::BlockedBySystemFlag(_))
    ));
    assert!(matches!(
        store.delete(parent.id).await,
        Err(HierarchyError::BlockedByNonEmpty(_))
    ));
    assert!(matches!(
        store.delete(child.id).await,
        Err(HierarchyError::BlockedByNonEmpty(_))
    ));
    assert!(store.has_documents(child.id).await.unwrap());
    assert!(matches!(
        store.delete(Uuid::new_v4()).await,
        Err(HierarchyError::NotFound(_))
    ));

    let empty = folder(&store, "Empty", None).await;
    store.delete(empty.id).await.unwrap();
    assert!(!store.exists(empty.id).await);

    // system folders can still be deactivated
    let off = store.set_active(sys.id, false, None).await.unwrap();
    assert!(!off.is_active);
}

#[tokio::test]
async fn deactivation_hides_the_subtree() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    folder(&store, "C", Some(b.id)).await;

    store.set_active(b.id, false, None).await.unwrap();
    assert_eq!(store.get_by_department(None).await.len(), 1);
    assert!(store.get_children(a.id).await.is_empty());
    assert!(store.has_children(a.id).await);

    store.set_active(b.id, true, None).await.unwrap();
    assert_eq!(store.get_by_department(None).await.len(), 3);
}

#[tokio::test]
async fn listings_are_scoped_and_ordered() {
    let (store, _) = setup();
    let dept = Uuid::new_v4();
    let creator = Uuid::new_v4();
    let shared = folder(&store, "Shared", None).await;
    for (name, order) in [("Zeta", 0), ("Alpha", 1), ("Beta", 0)] {
        store
            .add(
                FolderNode::new(name, creator)
                    .with_department(Some(dept))
                    .with_parent(Some(shared.id))
                    .with_display_order(order),
            )
            .await
            .unwrap();
    }

    let names = |v: Vec<FolderNode>| v.into_iter().map(|f| f.name).collect::<Vec<_>>();
    assert_eq!(names(store.get_by_department(Some(dept)).await), vec!["Beta", "Zeta", "Alpha"]);
    assert_eq!(store.get_visible_to_department(Some(dept)).await.len(), 4);
    assert_eq!(names(store.get_root_folders(None).await), vec!["Shared"]);
    assert!(store.get_root_folders(Some(dept)).await.is_empty());
    assert_eq!(store.get_by_creator(creator).await.len(), 3);
    assert_eq!(store.get_children(shared.id).await.len(), 3);
    let detail = store.get_with_children(shared.id).await.unwrap();
    assert_eq!(names(detail.children), vec!["Beta", "Zeta", "Alpha"]);
}

#[tokio::test]
async fn search_matches_name_and_description() {
    let (store, _) = setup();
    folder(&store, "Quarterly Reports", None).await;
    store
        .add(FolderNode::new("Misc", Uuid::nil()).with_description("old REPORTS archive"))
        .await
        .unwrap();
    folder(&store, "Invoices", None).await;

    assert_eq!(store.search_by_name("report", None).await.len(), 2);
    assert_eq!(store.search_by_name("  ", None).await.len(), 0);
    assert!(store.search_by_name("report", Some(Uuid::new_v4())).await.is_empty());
}

#[tokio::test]
async fn reorder_sets_display_order() {
    let (store, _) = setup();
    let root = folder(&store, "root", None).await;
    let a = folder(&store, "a", Some(root.id)).await;
    let b = folder(&store, "b", Some(root.id)).await;
    let c = folder(&store, "c", Some(root.id)).await;

    store.reorder(Some(root.id), &[c.id, a.id, b.id]).await.unwrap();
    let order: Vec<_> = store.get_children(root.id).await.into_iter().map(|f| f.id).collect();
    assert_eq!(order, vec![c.id, a.id, b.id]);

    let stranger = folder(&store, "stranger", None).await;
    assert!(matches!(
        store.reorder(Some(root.id), &[stranger.id]).await,
        Err(HierarchyError::NotFound(_))
    ));
}

#[tokio::test]
async fn unique_child_names() {
    let (store, _) = setup();
    let root = folder(&store, "root", None).await;
    let reports = || FolderNode::new("Reports", Uuid::nil()).with_parent(Some(root.id));
    let first = store.create_child_unique(reports()).await.unwrap();
    let second = store.create_child_unique(reports()).await.unwrap();
    let third = store.create_child_unique(reports()).await.unwrap();
    assert_eq!(first.name, "Reports");
    assert_eq!(second.name, "Reports (1)");
    assert_eq!(third.path, "root/Reports (2)");
}

#[tokio::test]
async fn depth_limit_applies_to_add_and_move() {
    let docs = Arc::new(InMemoryDocumentRepository::new());
    let config = HierarchyConfig {
        max_depth: 2,
        ..HierarchyConfig::default()
    };
    let store = HierarchyStore::from_config(&config, docs).await.unwrap();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let too_deep = FolderNode::new("C", Uuid::nil()).with_parent(Some(b.id));
    assert!(matches!(store.add(too_deep).await, Err(HierarchyError::TooDeep { .. })));

    let x = folder(&store, "X", None).await;
    folder(&store, "Y", Some(x.id)).await;
    assert!(matches!(
        store.move_folder(x.id, Some(a.id), None, None).await,
        Err(HierarchyError::TooDeep { .. })
    ));
    assert_eq!(store.get_by_id(x.id).await.unwrap().level, 0);
}

#[tokio::test]
async fn integrity_report_and_repair() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    {
        let mut arena = store.folders.write().await;
        let node = arena.get_mut(&b.id).unwrap();
        node.path = "wrong".to_string();
        let mut lost = FolderNode::new("Lost", Uuid::nil()).with_parent(Some(Uuid::new_v4()));
        lost.level = 1;
        arena.insert(lost.id, lost);
    }

    let report = store.verify_integrity().await;
    assert_eq!(report.stale_paths, vec![b.id]);
    assert_eq!(report.missing_parents.len(), 1);
    assert!(report.cycles.is_empty());

    assert_eq!(store.repair_paths().await.unwrap(), 1);
    assert_eq!(store.get_by_id(b.id).await.unwrap().path, "A/B");
}

#[tokio::test]
async fn persisted_store_survives_reopen() {
    let tempdir = tempfile::tempdir().unwrap();
    let docs: Arc<dyn DocumentRepository> = Arc::new(InMemoryDocumentRepository::new());
    let (a, c) = {
        let store = HierarchyStore::open(tempdir.path(), docs.clone()).await.unwrap();
        let a = folder(&store, "A", None).await;
        let b = folder(&store, "B", Some(a.id)).await;
        let c = folder(&store, "C", Some(b.id)).await;
        store.move_folder(c.id, Some(a.id), None, None).await.unwrap();
        (a, c)
    };

    let store = HierarchyStore::open(tempdir.path(), docs).await.unwrap();
    let c = store.get_by_id(c.id).await.unwrap();
    assert_eq!(c.parent_id, Some(a.id));
    assert_eq!(c.path, "A/C");
    assert_eq!(store.all().await.len(), 3);
    assert!(!tempdir.path().join("folders.json.tmp").exists());
}

#[tokio::test]
async fn restore_under_inactive_ancestor_is_refused() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let c = folder(&store, "C", Some(b.id)).await;
    store.set_active(b.id, false, None).await.unwrap();

    let err = store.set_active(c.id, true, None).await.unwrap_err();
    assert!(matches!(
        err,
        HierarchyError::InactiveAncestor { folder, ancestor } if folder == c.id && ancestor == b.id
    ));
    assert!(!store.get_by_id(c.id).await.unwrap().is_active);

    // flat listing and tree agree on what is visible
    let listed = store.get_by_department(None).await;
    let forest = crate::tree::TreeBuilder::default().build(&listed, &[]);
    assert_eq!(listed.len(), 1);
    assert_eq!(crate::tree::flatten(&forest).len(), 1);

    store.set_active(b.id, true, None).await.unwrap();
    assert!(store.get_by_id(c.id).await.unwrap().is_active);
}

#[tokio::test]
async fn active_folders_cannot_be_placed_under_inactive_ones() {
    let (store, _) = setup();
    let archive = folder(&store, "Archive", None).await;
    let loose = folder(&store, "Loose", None).await;
    store.set_active(archive.id, false, None).await.unwrap();

    let child = FolderNode::new("Child", Uuid::nil()).with_parent(Some(archive.id));
    assert!(matches!(
        store.add(child).await,
        Err(HierarchyError::InactiveAncestor { .. })
    ));
    assert!(matches!(
        store.move_folder(loose.id, Some(archive.id), None, None).await,
        Err(HierarchyError::InactiveAncestor { .. })
    ));

    let mut edit = store.get_by_id(loose.id).await.unwrap();
    edit.parent_id = Some(archive.id);
    assert!(matches!(
        store.update(edit).await,
        Err(HierarchyError::InactiveAncestor { .. })
    ));
    assert_eq!(store.get_by_id(loose.id).await.unwrap().parent_id, None);

    // an inactive folder may still be filed away under one
    store.set_active(loose.id, false, None).await.unwrap();
    let filed = store.move_folder(loose.id, Some(archive.id), None, None).await.unwrap();
    assert_eq!(filed.path, "Archive/Loose");
}

#[tokio::test]
async fn update_keeps_activation_and_system_flags() {
    let (store, _) = setup();
    let a = folder(&store, "A", None).await;
    let b = folder(&store, "B", Some(a.id)).await;
    let c = folder(&store, "C", Some(b.id)).await;

    let mut edit = store.get_by_id(b.id).await.unwrap();
    edit.is_active = false;
    edit.is_system_folder = true;
    edit.description = Some("budget".to_string());
    let updated = store.update(edit).await.unwrap();

    assert!(updated.is_active);
    assert!(!updated.is_system_folder);
    assert_eq!(updated.description.as_deref(), Some("budget"));
    assert!(store.get_by_id(c.id).await.unwrap().is_active);
    assert_eq!(store.get_by_department(None).await.len(), 3);
}

#[tokio::test]
async fn add_under_other_department_is_refused() {
    let (store, _) = setup();
    let (hr, sales) = (Uuid::new_v4(), Uuid::new_v4());
    let payroll = store
        .add(FolderNode::new("Payroll", Uuid::nil()).with_department(Some(hr)))
        .await
        .unwrap();

    let leads = FolderNode::new("Leads", Uuid::nil())
        .with_department(Some(sales))
        .with_parent(Some(payroll.id));
    assert!(matches!(
        store.add(leads).await,
        Err(HierarchyError::DepartmentMismatch { target, .. }) if target == payroll.id
    ));
    assert_eq!(store.all().await.len(), 1);
}

#[tokio::test]
async fn rescoping_a_parent_away_from_its_children_is_refused() {
    let (store, _) = setup();
    let (hr, sales) = (Uuid::new_v4(), Uuid::new_v4());
    let payroll = store
        .add(FolderNode::new("Payroll", Uuid::nil()).with_department(Some(hr)))
        .await
        .unwrap();
    let slips = store
        .add(
            FolderNode::new("Slips", Uuid::nil())
                .with_department(Some(hr))
                .with_parent(Some(payroll.id)),
        )
        .await
        .unwrap();

    let mut edit = payroll.clone();
    edit.department_id = Some(sales);
    assert!(matches!(
        store.update(edit).await,
        Err(HierarchyError::DepartmentMismatch { node, target }) if node == slips.id && target == payroll.id
    ));

    let stored = store.get_by_id(payroll.id).await.unwrap();
    assert_eq!(stored.department_id, Some(hr));
    assert_eq!(stored.version, payroll.version);
    assert!(store.verify_integrity().await.is_clean());
}

#[tokio::test]
async fn lowered_depth_limit_reports_existing_deep_folders() {
    let tempdir = tempfile::tempdir().unwrap();
    let docs: Arc<dyn DocumentRepository> = Arc::new(InMemoryDocumentRepository::new());
    let c = {
        let store = HierarchyStore::open(tempdir.path(), docs.clone()).await.unwrap();
        let a = folder(&store, "A", None).await;
        let b = folder(&store, "B", Some(a.id)).await;
        folder(&store, "C", Some(b.id)).await
    };

    let config = HierarchyConfig {
        max_depth: 2,
        data_dir: Some(tempdir.path().to_path_buf()),
        ..HierarchyConfig::default()
    };
    let store = HierarchyStore::from_config(&config, docs).await.unwrap();
    let report = store.verify_integrity().await;
    assert_eq!(report.too_deep, vec![c.id]);
    assert!(!report.is_clean());
    assert!(report.stale_paths.is_empty());
}

//! Builds a small department hierarchy and prints it as an indented tree.
//!
//! Settings come from `FOLDER_HUB_*` environment variables; set
//! `FOLDER_HUB_DATA_DIR` to keep the folders between runs and `RUST_LOG` to
//! see the store's tracing output.

use anyhow::Result;
use folder_hub_core::{
    access::{DepartmentAccessGate, Role, UserContext},
    config::HierarchyConfig,
    documents::InMemoryDocumentRepository,
    model::DocumentRef,
    service::{FolderService, NewFolder},
    store::HierarchyStore,
    tree::{self, FolderTreeNode},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn print_node(node: &FolderTreeNode, indent: usize) {
    println!(
        "{:indent$}{} ({} docs, {} bytes)",
        "",
        node.folder.name,
        node.total_document_count,
        node.total_size_bytes,
        indent = indent * 2
    );
    for child in &node.children {
        print_node(child, indent + 1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = HierarchyConfig::from_env()?;
    let docs = Arc::new(InMemoryDocumentRepository::new());
    let store = Arc::new(HierarchyStore::from_config(&config, docs.clone()).await?);
    let service = FolderService::new(store.clone(), Arc::new(DepartmentAccessGate), &config);

    let finance = Uuid::new_v4();
    let admin = UserContext {
        id: Uuid::new_v4(),
        department_id: None,
        role: Role::Admin,
    };
    let clerk = UserContext::employee(Uuid::new_v4(), Some(finance));

    let company = service
        .create_folder(
            &admin,
            NewFolder {
                name: "Company".into(),
                unique_name: true,
                ..Default::default()
            },
        )
        .await?;
    let finance_root = service
        .create_folder(
            &clerk,
            NewFolder {
                name: "Finance".into(),
                parent_id: Some(company.id),
                department_id: Some(finance),
                unique_name: true,
                ..Default::default()
            },
        )
        .await?;
    for quarter in ["Q1", "Q2"] {
        let folder = service
            .create_folder(
                &clerk,
                NewFolder {
                    name: quarter.into(),
                    parent_id: Some(finance_root.id),
                    department_id: Some(finance),
                    ..Default::default()
                },
            )
            .await?;
        docs.insert(DocumentRef::new(format!("{}-ledger.xlsx", quarter), Some(folder.id), 4096));
    }

    let forest = service.folder_tree(&clerk, Some(finance)).await?;
    for root in &forest {
        print_node(root, 0);
    }
    let stats = tree::stats(&forest);
    info!(
        folders = stats.folder_count,
        documents = stats.document_count,
        bytes = stats.total_size_bytes,
        "finance tree built"
    );
    Ok(())
}

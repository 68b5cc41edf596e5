//! Box/Cargo Allocator
//!
//! A box holds at most one cargo at a time. The only record of the pairing
//! is the `Box` column of the cargo table, so allocation and release are a
//! plain read followed by a write.
//!
//! **Concurrency:** there is no lock and no version check between the read
//! and the write. Two concurrent `allocate` calls for the same box both
//! succeed and leave two cargo rows claiming it; the later write wins for
//! any single row.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use wops_common::records::{scan, CargoRecord, RecordSet, Scanned};
use wops_common::store::{Field, RowStore};
use wops_common::{Error, Outcome, Result};

use super::required;

/// Optional filters for [`BoxAllocator::list_unboxed_cargo`], combined with AND
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CargoFilter {
    /// Case-insensitive substring of the store name
    pub store: Option<String>,
    /// Exact store type (case-insensitive)
    #[serde(rename = "type")]
    pub store_type: Option<String>,
    /// Exact segment (case-insensitive)
    pub segment: Option<String>,
}

impl CargoFilter {
    fn matches(&self, cargo: &CargoRecord) -> bool {
        let store = given(&self.store).map_or(true, |s| {
            cargo.store.to_lowercase().contains(&s.to_lowercase())
        });
        let store_type = given(&self.store_type).map_or(true, |t| same(&cargo.store_type, t));
        let segment = given(&self.segment).map_or(true, |s| same(&cargo.segment, s));
        store && store_type && segment
    }
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn same(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Cargo table operations
#[derive(Clone)]
pub struct BoxAllocator {
    store: Arc<dyn RowStore>,
    cargo_table: String,
    segments: Vec<String>,
}

impl BoxAllocator {
    pub fn new(store: Arc<dyn RowStore>, cargo_table: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            store,
            cargo_table: cargo_table.into(),
            segments,
        }
    }

    /// True when the cargo's segment or store type is allow-listed
    fn handled(&self, cargo: &CargoRecord) -> bool {
        self.segments
            .iter()
            .any(|s| same(s, &cargo.segment) || same(s, &cargo.store_type))
    }

    async fn cargo(&self) -> Result<RecordSet<CargoRecord>> {
        let table = self.store.get_all_rows(&self.cargo_table).await?;
        Ok(scan(table))
    }

    /// Allow-listed cargo with no box, narrowed by `filter`
    pub async fn list_unboxed_cargo(&self, filter: &CargoFilter) -> Result<Vec<CargoRecord>> {
        let set = self.cargo().await?;
        let cargo: Vec<CargoRecord> = set
            .entries
            .into_iter()
            .map(|e| e.record)
            .filter(|c| c.box_id.is_none() && self.handled(c) && filter.matches(c))
            .collect();
        debug!(count = cargo.len(), "Listed unboxed cargo");
        Ok(cargo)
    }

    /// Allow-listed cargo currently sitting in a box
    pub async fn list_occupied_boxes(&self) -> Result<Vec<CargoRecord>> {
        let set = self.cargo().await?;
        Ok(set
            .entries
            .into_iter()
            .map(|e| e.record)
            .filter(|c| c.box_id.is_some() && self.handled(c))
            .collect())
    }

    /// Put `cargo_id` into `box_id`
    ///
    /// Does not check whether the box is already occupied.
    pub async fn allocate(&self, box_id: &str, cargo_id: &str) -> Result<Outcome> {
        let box_id = required(box_id, "boxId")?;
        let cargo_id = required(cargo_id, "cargoId")?;

        let set = self.cargo().await?;
        let Some(entry) = set.entries.iter().find(|e| e.record.cargo_id == cargo_id) else {
            return Ok(Outcome::NotFound);
        };

        self.write_box(&set, entry, box_id).await?;
        info!(box_id, cargo_id, row = entry.row.number(), "Allocated cargo to box");
        Ok(Outcome::Applied)
    }

    /// Empty `box_id`; other columns of the cargo row are left untouched
    pub async fn release(&self, box_id: &str) -> Result<Outcome> {
        let box_id = required(box_id, "boxId")?;

        let set = self.cargo().await?;
        let Some(entry) = set
            .entries
            .iter()
            .find(|e| e.record.box_id.as_deref() == Some(box_id))
        else {
            return Ok(Outcome::NotFound);
        };

        self.write_box(&set, entry, "").await?;
        info!(box_id, cargo_id = %entry.record.cargo_id, "Released box");
        Ok(Outcome::Applied)
    }

    async fn write_box(
        &self,
        set: &RecordSet<CargoRecord>,
        entry: &Scanned<CargoRecord>,
        value: &str,
    ) -> Result<()> {
        let mut row = entry.row.clone();
        if !set.columns.set(&mut row, Field::Box, value) {
            return Err(Error::Store(format!(
                "table '{}' has no '{}' column",
                self.cargo_table,
                Field::Box.canonical()
            )));
        }
        self.store.update_row(&self.cargo_table, &row).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wops_common::config::DEFAULT_STORE_SEGMENTS;
    use wops_common::store::MemoryStore;

    async fn setup(rows: &[&[&str]]) -> (Arc<MemoryStore>, BoxAllocator) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_table("Cargas", &["Carga", "Box", "Loja", "Tipo", "Segmento", "Volume", "Rota"], rows)
            .await;
        let segments = DEFAULT_STORE_SEGMENTS.iter().map(|s| s.to_string()).collect();
        (store.clone(), BoxAllocator::new(store, "Cargas", segments))
    }

    #[tokio::test]
    async fn test_only_unboxed_allow_listed_cargo() {
        let (_, allocator) = setup(&[
            &["C1", "", "Loja Centro", "", "LJ COMPER", "3,5", ""],
            &["C2", "5", "Loja Norte", "", "LJ COMPER", "1", ""],
            &["C3", "", "Loja Sul", "", "OTHER", "2", ""],
        ])
        .await;

        let cargo = allocator.list_unboxed_cargo(&CargoFilter::default()).await.unwrap();
        let ids: Vec<&str> = cargo.iter().map(|c| c.cargo_id.as_str()).collect();
        assert_eq!(ids, vec!["C1"]);
        assert_eq!(cargo[0].volume, 3.5);
    }

    #[tokio::test]
    async fn test_allow_list_matches_store_type_case_insensitive() {
        let (_, allocator) = setup(&[
            &["C1", "", "A", "lj perto", "", "1", ""],
            &["C2", "", "B", "", "Lj Fort", "1", ""],
            &["C3", "", "C", "ATACADO", "VAREJO", "1", ""],
        ])
        .await;

        let cargo = allocator.list_unboxed_cargo(&CargoFilter::default()).await.unwrap();
        assert_eq!(cargo.len(), 2);
    }

    #[tokio::test]
    async fn test_filters_are_anded() {
        let (_, allocator) = setup(&[
            &["C1", "", "Loja Centro", "Super", "LJ COMPER", "1", ""],
            &["C2", "", "Loja Centro", "Mini", "LJ COMPER", "1", ""],
            &["C3", "", "Loja Norte", "Super", "LJ COMPER", "1", ""],
        ])
        .await;

        let filter = CargoFilter {
            store: Some("centro".to_string()),
            store_type: Some(" super ".to_string()),
            segment: Some("lj comper".to_string()),
        };
        let cargo = allocator.list_unboxed_cargo(&filter).await.unwrap();
        assert_eq!(cargo.len(), 1);
        assert_eq!(cargo[0].cargo_id, "C1");

        let blank = CargoFilter {
            store: Some("  ".to_string()),
            ..CargoFilter::default()
        };
        assert_eq!(allocator.list_unboxed_cargo(&blank).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_allocate_then_release_restores_row() {
        let (store, allocator) = setup(&[&["C1", "", "Loja Centro", "", "LJ COMPER", "3,5", "R-04"]]).await;
        let before = store.get_all_rows("Cargas").await.unwrap().rows[0].clone();

        assert_eq!(allocator.allocate("12", "C1").await.unwrap(), Outcome::Applied);
        let occupied = allocator.list_occupied_boxes().await.unwrap();
        assert_eq!(occupied[0].box_id.as_deref(), Some("12"));
        assert!(allocator.list_unboxed_cargo(&CargoFilter::default()).await.unwrap().is_empty());

        assert_eq!(allocator.release("12").await.unwrap(), Outcome::Applied);
        let after = store.get_all_rows("Cargas").await.unwrap().rows[0].clone();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_not_found_outcomes() {
        let (_, allocator) = setup(&[&["C1", "", "A", "", "LJ COMPER", "1", ""]]).await;

        assert_eq!(allocator.allocate("12", "C9").await.unwrap(), Outcome::NotFound);
        assert_eq!(allocator.release("12").await.unwrap(), Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let (_, allocator) = setup(&[]).await;

        assert!(matches!(allocator.allocate("", "C1").await, Err(Error::Validation(_))));
        assert!(matches!(allocator.allocate("1", " ").await, Err(Error::Validation(_))));
        assert!(matches!(allocator.release("").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_allocate_does_not_check_occupancy() {
        let (_, allocator) = setup(&[
            &["C1", "", "A", "", "LJ COMPER", "1", ""],
            &["C2", "", "B", "", "LJ COMPER", "1", ""],
        ])
        .await;

        allocator.allocate("7", "C1").await.unwrap();
        allocator.allocate("7", "C2").await.unwrap();

        let occupied = allocator.list_occupied_boxes().await.unwrap();
        assert_eq!(occupied.len(), 2);
        assert!(occupied.iter().all(|c| c.box_id.as_deref() == Some("7")));
    }
}

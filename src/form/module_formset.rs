//! The module formset: editing the full set of a course's modules in one
//! request.
//!
//! A submission carries rows named `modules-{i}-id`, `modules-{i}-title`,
//! `modules-{i}-description` and `modules-{i}-delete`. The whole set either
//! validates and commits in a single transaction, or commits nothing and is
//! re-rendered with per-row errors.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Module;

/// Blank rows appended after the bound rows on the edit form.
pub const EXTRA_BLANK_ROWS: usize = 2;

/// One editable module row.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleRow {
    /// Present for rows bound to an existing module; absent for additions.
    pub id: Option<Uuid>,
    pub title: String,
    pub description: String,

    /// Row flagged for deletion.
    pub delete: bool,

    /// Validation errors for this row.
    pub errors: Vec<String>,
}

impl ModuleRow {
    fn bound(module: &Module) -> Self {
        Self {
            id: Some(module.id),
            title: module.title.clone(),
            description: module.description.clone(),
            delete: false,
            errors: Vec::new(),
        }
    }

    /// An untouched extra row: no id and nothing typed into it.
    pub fn is_blank(&self) -> bool {
        self.id.is_none() && self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}

/// The full set of module rows for one course.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleFormSet {
    pub rows: Vec<ModuleRow>,
}

impl ModuleFormSet {
    /// Build a formset bound to the course's current modules, with extra
    /// blank rows for additions.
    pub fn for_modules(modules: &[Module]) -> Self {
        let mut rows: Vec<ModuleRow> = modules.iter().map(ModuleRow::bound).collect();
        rows.extend((0..EXTRA_BLANK_ROWS).map(|_| ModuleRow::default()));

        Self { rows }
    }

    /// Rebind the formset to submitted form pairs.
    ///
    /// Row indices do not need to be contiguous; rows come back sorted by
    /// index. Unparsable ids become row errors rather than hard failures so
    /// the row can be re-rendered.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut by_index: BTreeMap<usize, ModuleRow> = BTreeMap::new();

        for (key, value) in pairs {
            let Some(rest) = key.strip_prefix("modules-") else {
                continue;
            };
            let Some((index, field)) = rest.split_once('-') else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };

            let row = by_index.entry(index).or_default();
            match field {
                "id" => {
                    if !value.is_empty() {
                        match Uuid::parse_str(value) {
                            Ok(id) => row.id = Some(id),
                            Err(_) => row.errors.push("Invalid module id.".to_string()),
                        }
                    }
                }
                "title" => row.title = value.clone(),
                "description" => row.description = value.clone(),
                "delete" => row.delete = matches!(value.as_str(), "on" | "1" | "true"),
                _ => {}
            }
        }

        Self {
            rows: by_index.into_values().collect(),
        }
    }

    /// Validate every row. Returns true only when the whole set is clean.
    ///
    /// Field rule: a non-blank row needs a title. Cross-row rule: titles
    /// must be unique within the submission (deleted rows excluded).
    pub fn validate(&mut self) -> bool {
        let mut seen_titles: Vec<String> = Vec::new();

        for row in &mut self.rows {
            if row.is_blank() || row.delete {
                continue;
            }

            if row.title.trim().is_empty() {
                row.errors.push("Title is required.".to_string());
                continue;
            }

            let normalized = row.title.trim().to_lowercase();
            if seen_titles.contains(&normalized) {
                row.errors.push("Duplicate module title.".to_string());
            } else {
                seen_titles.push(normalized);
            }
        }

        !self.has_errors()
    }

    /// Whether any row carries an error.
    pub fn has_errors(&self) -> bool {
        self.rows.iter().any(|r| !r.errors.is_empty())
    }

    /// Apply every addition, edit, and deletion in one transaction.
    ///
    /// Callers must validate first; this only runs on a clean set.
    pub async fn save(&self, pool: &PgPool, course_id: Uuid) -> Result<()> {
        let mut tx = pool.begin().await.context("failed to start transaction")?;

        for row in &self.rows {
            if row.is_blank() {
                continue;
            }

            match (row.id, row.delete) {
                (Some(id), true) => {
                    Module::delete_in_tx(&mut *tx, id, course_id).await?;
                }
                (Some(id), false) => {
                    Module::update_in_tx(&mut *tx, id, course_id, &row.title, &row.description)
                        .await?;
                }
                (None, false) => {
                    Module::insert_in_tx(&mut *tx, course_id, &row.title, &row.description).await?;
                }
                // Deleting a row that was never persisted is a no-op
                (None, true) => {}
            }
        }

        tx.commit().await.context("failed to commit formset")?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bound_formset_appends_blank_rows() {
        let formset = ModuleFormSet::for_modules(&[]);
        assert_eq!(formset.rows.len(), EXTRA_BLANK_ROWS);
        assert!(formset.rows.iter().all(ModuleRow::is_blank));
    }

    #[test]
    fn parses_rows_sorted_by_index() {
        let formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-1-title", "Second"),
            ("modules-0-title", "First"),
            ("modules-0-description", "intro"),
            ("modules-1-description", ""),
        ]));

        assert_eq!(formset.rows.len(), 2);
        assert_eq!(formset.rows[0].title, "First");
        assert_eq!(formset.rows[0].description, "intro");
        assert_eq!(formset.rows[1].title, "Second");
    }

    #[test]
    fn parses_ids_and_delete_flags() {
        let id = Uuid::now_v7();
        let formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-0-id", &id.to_string()),
            ("modules-0-title", "Keep"),
            ("modules-0-delete", "on"),
        ]));

        assert_eq!(formset.rows[0].id, Some(id));
        assert!(formset.rows[0].delete);
    }

    #[test]
    fn bad_id_is_a_row_error() {
        let mut formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-0-id", "not-a-uuid"),
            ("modules-0-title", "Broken"),
        ]));

        assert!(!formset.validate());
        assert!(formset.rows[0].errors.iter().any(|e| e.contains("id")));
    }

    #[test]
    fn blank_extra_rows_do_not_fail_validation() {
        let mut formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-0-title", "Only row"),
            ("modules-1-title", ""),
            ("modules-1-description", ""),
        ]));

        assert!(formset.validate());
    }

    #[test]
    fn missing_title_fails_the_set() {
        let mut formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-0-title", "Fine"),
            ("modules-1-title", ""),
            ("modules-1-description", "text but no title"),
        ]));

        assert!(!formset.validate());
        assert!(formset.rows[0].errors.is_empty());
        assert_eq!(formset.rows[1].errors, vec!["Title is required."]);
    }

    #[test]
    fn duplicate_titles_fail_the_set() {
        let mut formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-0-title", "Basics"),
            ("modules-1-title", "  basics "),
        ]));

        assert!(!formset.validate());
        assert!(formset.rows[1].errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn deleted_rows_skip_field_validation() {
        let id = Uuid::now_v7();
        let mut formset = ModuleFormSet::from_pairs(&pairs(&[
            ("modules-0-id", &id.to_string()),
            ("modules-0-title", ""),
            ("modules-0-delete", "on"),
        ]));

        assert!(formset.validate());
    }
}

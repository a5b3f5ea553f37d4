//! Sync engine for one-way CardDAV to text-file synchronization.
//!
//! A run fetches the whole address book, validates it, scans the
//! destination folder, archives files whose contact disappeared and then
//! creates or rewrites one file per contact. Renamed contacts keep their
//! file name and are only reported.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::frontmatter;
use crate::reconcile::{self, Action, Plan, RenameConflict};
use crate::remote::Remote;
use crate::vcard_io;
use crate::vdir;

/// Result of a sync operation
#[derive(Debug, Default)]
pub struct SyncResult {
    pub archived: usize,
    pub created: usize,
    pub updated: usize,
    /// Existing files whose front matter was already current.
    pub unchanged: usize,
    pub renames: Vec<RenameConflict>,
}

pub struct SyncEngine<'a> {
    destination: &'a Path,
    extension: &'a str,
    dry_run: bool,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a Config, dry_run: bool) -> Self {
        Self {
            destination: &config.destination,
            extension: &config.extension,
            dry_run,
        }
    }

    /// Run the sync operation
    pub fn sync<R: Remote>(&self, remote: &R) -> Result<SyncResult> {
        let payload = remote.fetch_address_data()?;
        let records = vcard_io::decode(&payload)?;
        tracing::info!(contacts = records.len(), "decoded address book");

        reconcile::validate(&records)?;

        let index = vdir::build_local_index(self.destination, self.extension)?;
        tracing::info!(
            files = index.len(),
            folder = %self.destination.display(),
            "indexed destination folder"
        );

        let plan = reconcile::plan(&records, &index, self.extension)?;

        let result = if self.dry_run {
            self.preview(plan)?
        } else {
            self.apply(plan)?
        };

        self.print_summary(&result);
        Ok(result)
    }

    fn apply(&self, plan: Plan<'_>) -> Result<SyncResult> {
        let mut result = SyncResult::default();

        // Archive first so a freed file name can be taken by a new contact.
        vdir::archive(self.destination, &plan.archive)?;
        result.archived = plan.archive.len();

        for action in &plan.actions {
            let front_matter = frontmatter::encode(action.record());
            match action {
                Action::Update { filename, .. } => {
                    let path = self.destination.join(filename);
                    if vdir::rewrite(&path, &front_matter)? {
                        tracing::info!(file = %filename, "updated contact");
                        result.updated += 1;
                    } else {
                        result.unchanged += 1;
                    }
                }
                Action::Create { filename, .. } => {
                    vdir::write_new(self.destination, filename, &front_matter)?;
                    tracing::info!(file = %filename, "created contact");
                    result.created += 1;
                }
            }
        }

        result.renames = plan.renames;
        Ok(result)
    }

    fn preview(&self, plan: Plan<'_>) -> Result<SyncResult> {
        let mut result = SyncResult::default();

        for filename in &plan.archive {
            println!("[dry-run] Would archive contact: {}", filename);
            result.archived += 1;
        }
        for action in &plan.actions {
            match action {
                Action::Update { filename, record } => {
                    let path = self.destination.join(filename);
                    let front_matter = frontmatter::encode(record);
                    if vdir::rewritten(&path, &front_matter)?.is_some() {
                        println!("[dry-run] Would update contact: {}", filename);
                        result.updated += 1;
                    } else {
                        println!("[dry-run] Unchanged contact: {}", filename);
                        result.unchanged += 1;
                    }
                }
                Action::Create { filename, .. } => {
                    println!("[dry-run] Would create contact: {}", filename);
                    result.created += 1;
                }
            }
        }

        result.renames = plan.renames;
        Ok(result)
    }

    /// Print sync summary
    fn print_summary(&self, result: &SyncResult) {
        for rename in &result.renames {
            println!("Contact changed from: {}, to: {}", rename.from, rename.to);
            println!("Please take care to change the filename and any references to the file.");
        }

        tracing::info!(
            archived = result.archived,
            created = result.created,
            updated = result.updated,
            unchanged = result.unchanged,
            renames = result.renames.len(),
            dry_run = self.dry_run,
            "sync finished"
        );
        println!("All done!");
    }
}

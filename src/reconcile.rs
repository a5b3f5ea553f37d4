//! Pure reconciliation of remote contacts against the local index.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::contact::ContactRecord;
use crate::error::{Error, Result};
use crate::vdir::{self, LocalIndex};

/// Reject the remote set when two contacts share a display name.
///
/// Scans everything before failing so the error lists every offending
/// name once, in the order the duplicates were found.
pub fn validate_unique_fullnames(records: &[ContactRecord]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();

    for record in records {
        let name = record.fullname.as_str();
        if !seen.insert(name) && !duplicates.iter().any(|d| d == name) {
            duplicates.push(name.to_string());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(Error::DuplicateNames(duplicates))
    }
}

/// Every contact needs a display name to name its file after.
pub fn validate_names_present(records: &[ContactRecord]) -> Result<()> {
    match records.iter().find(|r| r.fullname.trim().is_empty()) {
        Some(record) => Err(Error::MissingName {
            uid: record.uid.clone(),
        }),
        None => Ok(()),
    }
}

/// Distinct display names may still clean up to the same file name
/// (`AC/DC` and `AC_DC`); reject those before anything is written.
pub fn validate_unique_file_stems(records: &[ContactRecord]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for record in records {
        let stem = vdir::sanitize_file_stem(&record.fullname);
        match seen.get(&stem) {
            Some(first) if *first != record.fullname => {
                return Err(Error::FileNameClash {
                    stem,
                    first: first.to_string(),
                    second: record.fullname.clone(),
                });
            }
            Some(_) => {}
            None => {
                seen.insert(stem, &record.fullname);
            }
        }
    }
    Ok(())
}

pub fn validate(records: &[ContactRecord]) -> Result<()> {
    validate_unique_fullnames(records)?;
    validate_names_present(records)?;
    validate_unique_file_stems(records)
}

/// Local uids with no remote contact left.
pub fn archivable_uids(records: &[ContactRecord], index: &LocalIndex) -> BTreeSet<String> {
    let matched: HashSet<&str> = records
        .iter()
        .map(|r| r.uid.as_str())
        .filter(|uid| index.contains_key(*uid))
        .collect();

    index
        .keys()
        .filter(|uid| !matched.contains(uid.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<'a> {
    /// Rewrite the front matter of the existing file; its name never changes.
    Update {
        record: &'a ContactRecord,
        filename: String,
    },
    /// Write a new file named after the contact.
    Create {
        record: &'a ContactRecord,
        filename: String,
    },
}

impl<'a> Action<'a> {
    pub fn record(&self) -> &'a ContactRecord {
        match self {
            Action::Update { record, .. } | Action::Create { record, .. } => record,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Action::Update { filename, .. } | Action::Create { filename, .. } => filename,
        }
    }
}

pub fn classify<'a>(record: &'a ContactRecord, index: &LocalIndex, extension: &str) -> Action<'a> {
    match index.get(&record.uid) {
        Some(filename) => Action::Update {
            record,
            filename: filename.clone(),
        },
        None => Action::Create {
            record,
            filename: vdir::file_name_for(&record.fullname, extension),
        },
    }
}

/// A contact whose display name no longer matches its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameConflict {
    pub from: String,
    pub to: String,
}

/// Everything one run will do, computed before touching the folder.
#[derive(Debug, Default)]
pub struct Plan<'a> {
    /// File names to move into `archived`, in uid order.
    pub archive: Vec<String>,
    pub actions: Vec<Action<'a>>,
    pub renames: Vec<RenameConflict>,
}

/// Fails when a new contact's file name is still held by a file that
/// stays in the folder, so the run stops before archiving anything.
pub fn plan<'a>(records: &'a [ContactRecord], index: &LocalIndex, extension: &str) -> Result<Plan<'a>> {
    let archived_uids = archivable_uids(records, index);
    let archive = archived_uids
        .iter()
        .filter_map(|uid| index.get(uid).cloned())
        .collect();

    let kept: HashMap<&str, &str> = index
        .iter()
        .filter(|(uid, _)| !archived_uids.contains(*uid))
        .map(|(uid, filename)| (filename.as_str(), uid.as_str()))
        .collect();

    let mut actions = Vec::with_capacity(records.len());
    let mut renames: Vec<RenameConflict> = Vec::new();

    for record in records {
        let action = classify(record, index, extension);
        match &action {
            Action::Update { filename, .. } => {
                let stem = vdir::file_stem(filename, extension);
                if stem != vdir::sanitize_file_stem(&record.fullname) {
                    record_rename(&mut renames, stem, &record.fullname);
                }
            }
            Action::Create { filename, .. } => {
                if let Some(holder) = kept.get(filename.as_str()) {
                    return Err(Error::NameHeld {
                        filename: filename.clone(),
                        uid: record.uid.clone(),
                        holder: holder.to_string(),
                    });
                }
            }
        }
        actions.push(action);
    }

    Ok(Plan {
        archive,
        actions,
        renames,
    })
}

// Keyed by the old stem: a later contact with the same stem replaces the target.
fn record_rename(renames: &mut Vec<RenameConflict>, from: &str, to: &str) {
    match renames.iter_mut().find(|r| r.from == from) {
        Some(existing) => existing.to = to.to_string(),
        None => renames.push(RenameConflict {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

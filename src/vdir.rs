//! The destination folder: scanning it into a uid index, archiving files
//! that lost their remote contact, and writing front matter back.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::frontmatter::{self, FrontMatter};

pub const ARCHIVE_DIR: &str = "archived";

/// Contact uid to file name (not path) inside the destination folder.
pub type LocalIndex = BTreeMap<String, String>;

/// Files directly inside `dir` whose name ends with `extension`, sorted by
/// name. Subdirectories, `archived` included, are not visited.
pub fn list_contact_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io("read directory", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read directory", dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(extension))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse the front matter of every contact file and map uid to file name.
///
/// Any unreadable or unparsable file aborts the scan; two files claiming
/// the same uid are reported rather than one silently shadowing the other.
pub fn build_local_index(dir: &Path, extension: &str) -> Result<LocalIndex> {
    let mut index = LocalIndex::new();

    for path in list_contact_files(dir, extension)? {
        let content = fs::read_to_string(&path).map_err(|e| Error::io("read", &path, e))?;
        let front_matter = frontmatter::parse(&content).map_err(|source| Error::FrontMatter {
            path: path.clone(),
            source,
        })?;
        let filename = file_name(&path);
        tracing::debug!(uid = %front_matter.uid, file = %filename, "indexed contact file");

        if let Some(first) = index.get(&front_matter.uid) {
            return Err(Error::DuplicateLocalUid {
                uid: front_matter.uid,
                first: first.clone(),
                second: filename,
            });
        }
        index.insert(front_matter.uid, filename);
    }

    Ok(index)
}

/// Move each named file from `dir` into `dir/archived`, creating it first.
///
/// An older archived file of the same name is kept; the newer one gets a
/// numbered name instead. Stops at the first failed move; files moved
/// before that stay archived.
pub fn archive(dir: &Path, filenames: &[String]) -> Result<()> {
    if filenames.is_empty() {
        return Ok(());
    }

    let archive_dir = dir.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_dir)
        .map_err(|e| Error::io("create directory", &archive_dir, e))?;

    for filename in filenames {
        let source = dir.join(filename);
        let target = free_archive_path(&archive_dir, filename);
        fs::rename(&source, &target).map_err(|e| Error::io("archive", &source, e))?;
        tracing::debug!(from = %source.display(), to = %target.display(), "moved contact file");
        println!("Contact: {} archived", filename);
    }

    Ok(())
}

// `Name.txt`, then `Name (1).txt`, `Name (2).txt`, ...
fn free_archive_path(archive_dir: &Path, filename: &str) -> PathBuf {
    let target = archive_dir.join(filename);
    if !target.exists() {
        return target;
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let extension = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter: u32 = 1;
    loop {
        let candidate = archive_dir.join(format!("{stem} ({counter}){extension}"));
        if !candidate.exists() {
            tracing::warn!(
                file = %filename,
                archived_as = %candidate.display(),
                "archive already holds a file of that name"
            );
            return candidate;
        }
        counter += 1;
    }
}

/// Write a brand-new contact file holding only the front matter block.
pub fn write_new(dir: &Path, filename: &str, front_matter: &FrontMatter) -> Result<PathBuf> {
    let path = dir.join(filename);
    if path.exists() {
        return Err(Error::NameTaken { path });
    }

    let text = serialize(&path, front_matter)?;
    write_atomic(&path, text.as_bytes())?;
    Ok(path)
}

/// Replace the front matter of an existing file, keeping its body.
///
/// Returns `false` without touching the file when nothing would change.
pub fn rewrite(path: &Path, front_matter: &FrontMatter) -> Result<bool> {
    match rewritten(path, front_matter)? {
        Some(updated) => {
            write_atomic(path, updated.as_bytes())?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// The new text of `path` with `front_matter` in place, or `None` when
/// the file already holds exactly that.
pub fn rewritten(path: &Path, front_matter: &FrontMatter) -> Result<Option<String>> {
    let current = fs::read_to_string(path).map_err(|e| Error::io("read", path, e))?;
    let updated = frontmatter::replace(&current, front_matter).map_err(|source| {
        Error::FrontMatter {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok((updated != current).then_some(updated))
}

/// File name for a contact: the display name with characters that cannot
/// appear in a file name replaced by `_`, plus the extension.
pub fn file_name_for(fullname: &str, extension: &str) -> String {
    format!("{}{}", sanitize_file_stem(fullname), extension)
}

pub fn sanitize_file_stem(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect()
}

/// `filename` without `extension`.
pub fn file_stem<'a>(filename: &'a str, extension: &str) -> &'a str {
    filename.strip_suffix(extension).unwrap_or(filename)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn serialize(path: &Path, front_matter: &FrontMatter) -> Result<String> {
    frontmatter::serialize(front_matter).map_err(|source| Error::FrontMatter {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a temporary sibling and rename it over `target`.
pub fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));

    let name = file_name(target);
    let mut temp_path = parent.join(format!(".{name}.tmp"));
    let mut counter: u32 = 0;
    while temp_path.exists() {
        counter += 1;
        temp_path = parent.join(format!(".{name}.{counter}.tmp"));
    }

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(|e| Error::io("create temporary file", &temp_path, e))?;

        file.write_all(data)
            .map_err(|e| Error::io("write temporary file", &temp_path, e))?;
        file.sync_all()
            .map_err(|e| Error::io("sync temporary file", &temp_path, e))?;
    }

    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io("write", target, e));
    }
    tracing::debug!(path = %target.display(), bytes = data.len(), "wrote contact file");

    Ok(())
}

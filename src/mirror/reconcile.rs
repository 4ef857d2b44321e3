//! Matching incoming comments against the numbered comment files of a thread.
//!
//! A comment keeps the number it was first stored under: when the same
//! remote id shows up again the file is replaced in place, otherwise the
//! comment is appended under the next free number.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::date_util::format_timestamp;
use crate::error::{Error, Result};
use crate::github::Comment;

use super::layout::{comment_file_name, parse_comment_file_name};
use super::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First time this remote id was seen; stored under a fresh number.
    New(u32),
    /// Known remote id whose stored content differed; rewritten in place.
    Overwritten(u32),
    /// Known remote id with identical content; file left untouched.
    Unchanged(u32),
}

impl ReconcileOutcome {
    pub fn number(self) -> u32 {
        match self {
            ReconcileOutcome::New(n)
            | ReconcileOutcome::Overwritten(n)
            | ReconcileOutcome::Unchanged(n) => n,
        }
    }
}

fn identity_line(remote_id: u64) -> String {
    format!("GitHub ID: {remote_id}")
}

/// Text stored for one comment.
pub fn render_comment(comment: &Comment) -> String {
    let mut out = format!(
        "{}\nAuthor: {}\nCreated: {}\n\n{}",
        identity_line(comment.remote_id),
        comment.author,
        format_timestamp(comment.created_at),
        comment.body
    );
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn read_first_line(path: &Path) -> Result<String> {
    let file = fs::File::open(path).map_err(|e| Error::fs(path, e))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| Error::fs(path, e))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Find the stored file for `comment` (same author tag, same remote id) and
/// the highest number in use.
fn scan(thread_dir: &Path, comment: &Comment) -> Result<(Option<(u32, PathBuf)>, u32)> {
    let identity = identity_line(comment.remote_id);
    let mut max_number = 0;

    let entries = fs::read_dir(thread_dir).map_err(|e| Error::fs(thread_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::fs(thread_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some((number, author)) = name.to_str().and_then(parse_comment_file_name) else {
            continue;
        };
        max_number = max_number.max(number);

        if author == comment.author && read_first_line(&path)? == identity {
            return Ok((Some((number, path)), max_number));
        }
    }
    Ok((None, max_number))
}

/// Store `comment` in `thread_dir`, reusing its number when already present.
pub fn reconcile(thread_dir: &Path, comment: &Comment) -> Result<ReconcileOutcome> {
    let rendered = render_comment(comment);

    match scan(thread_dir, comment)? {
        (Some((number, path)), _) => {
            let existing = fs::read_to_string(&path).map_err(|e| Error::fs(&path, e))?;
            if existing == rendered {
                log::debug!("Comment {number} from {} unchanged", comment.author);
                return Ok(ReconcileOutcome::Unchanged(number));
            }
            write_atomic(&path, &rendered)?;
            log::debug!(
                "Comment {number} from {} has been edited, overwrote {}",
                comment.author,
                path.display()
            );
            Ok(ReconcileOutcome::Overwritten(number))
        }
        (None, max_number) => {
            let number = max_number.checked_add(1).ok_or_else(|| {
                Error::MalformedItem(format!(
                    "no comment number left after {max_number} in {}",
                    thread_dir.display()
                ))
            })?;
            let path = thread_dir.join(comment_file_name(number, &comment.author));
            write_atomic(&path, &rendered)?;
            log::debug!("New comment {number} from {}", comment.author);
            Ok(ReconcileOutcome::New(number))
        }
    }
}

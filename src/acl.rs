//! Initiator / target ACLs
//!
//! `initiators.allow` and `targets.allow` hold one line per target:
//!
//! ```text
//! iqn.2001-04.com.example:storage.disk1 192.168.22.0/24, 10.0.0.5
//! ALL 192.168.0.0/16
//! ```
//!
//! The first entry is separated from the IQN by whitespace, the others by
//! commas.

use crate::document::{check_iqn, first_token, Document, LineId, Placement};
use crate::error::{IetError, IetResult};

/// Engine editing the ACL line of one target
#[derive(Debug, Clone)]
pub struct AclEngine {
    iqn: String,
}

impl AclEngine {
    pub fn new(iqn: impl Into<String>) -> Self {
        Self { iqn: iqn.into() }
    }

    pub fn iqn(&self) -> &str {
        &self.iqn
    }

    /// Id of the line carrying this target's ACLs
    pub fn line_id(&self, doc: &Document) -> Option<LineId> {
        doc.directives()
            .find(|(_, text)| first_token(text) == Some(self.iqn.as_str()))
            .map(|(id, _)| id)
    }

    /// ACL entries of this target, empty when the target has no line
    pub fn get(&self, doc: &Document) -> IetResult<Vec<String>> {
        let Some(id) = self.line_id(doc) else {
            return Ok(Vec::new());
        };
        let line = doc.get(id).unwrap_or_default();
        let (_, acls) = parse_acl_line(line)?;
        Ok(acls)
    }

    /// ACL entries of every target in the file, in file order
    pub fn get_all(doc: &Document) -> IetResult<Vec<(String, Vec<String>)>> {
        let mut all: Vec<(String, Vec<String>)> = Vec::new();
        for (_, line) in doc.directives() {
            let (iqn, acls) = parse_acl_line(line)?;
            match all.iter_mut().find(|(existing, _)| *existing == iqn) {
                Some(slot) => {
                    log::warn!("{} has more than one ACL line, using the last one", iqn);
                    slot.1 = acls;
                }
                None => all.push((iqn, acls)),
            }
        }
        Ok(all)
    }

    /// Allow `entry` for this target
    pub fn add(&self, doc: &mut Document, entry: &str) -> IetResult<()> {
        check_iqn(&self.iqn)?;
        let entry = check_entry(entry)?;
        let mut acls = self.get(doc)?;

        if acls.is_empty() {
            let id = doc.insert(format!("{} {}", self.iqn, entry), Placement::End)?;
            log::debug!("Added ACL line for {} as line {}", self.iqn, id);
            return Ok(());
        }

        if acls.iter().any(|acl| acl == entry) {
            return Err(IetError::Duplication(format!(
                "The acl {} was already added",
                entry
            )));
        }

        acls.push(entry.to_string());
        self.rewrite(doc, &acls)?;
        log::debug!("Added ACL {} to {}", entry, self.iqn);
        Ok(())
    }

    /// Remove `entry`; the whole line goes once the last entry is removed
    pub fn delete(&self, doc: &mut Document, entry: &str) -> IetResult<()> {
        if !doc.has_content() {
            return Err(IetError::Parser("The file is empty".to_string()));
        }

        let entry = entry.trim();
        let mut acls = self.get(doc)?;
        let pos = acls.iter().position(|acl| acl == entry).ok_or_else(|| {
            IetError::NotFound(format!(
                "The acl {} was not found on target {}",
                entry, self.iqn
            ))
        })?;
        acls.remove(pos);

        if acls.is_empty() {
            if let Some(id) = self.line_id(doc) {
                doc.remove(id)?;
            }
            log::debug!("Removed last ACL of {}, line deleted", self.iqn);
        } else {
            self.rewrite(doc, &acls)?;
            log::debug!("Deleted ACL {} from {}", entry, self.iqn);
        }
        Ok(())
    }

    fn rewrite(&self, doc: &mut Document, acls: &[String]) -> IetResult<()> {
        let id = self.line_id(doc).ok_or_else(|| {
            IetError::NotFound(format!("The target {} has no ACL line", self.iqn))
        })?;
        doc.replace(id, format!("{} {}", self.iqn, acls.join(", ")))
    }
}

/// Split `<IQN> <acl1>, <acl2>, ...` into the IQN and its entries
fn parse_acl_line(line: &str) -> IetResult<(String, Vec<String>)> {
    let mut segments = line.split(',');
    let first = segments.next().unwrap_or_default().trim();

    let Some((iqn, first_acl)) = first.split_once(char::is_whitespace) else {
        return Err(IetError::Parser(format!("The target {} has no acls", first)));
    };

    let acls = std::iter::once(first_acl)
        .chain(segments)
        .map(|acl| acl.trim().to_string())
        .filter(|acl| !acl.is_empty())
        .collect();
    Ok((iqn.to_string(), acls))
}

fn check_entry(entry: &str) -> IetResult<&str> {
    let entry = entry.trim();
    if entry.is_empty() || entry.contains(',') || entry.contains('#') {
        return Err(IetError::Invalid(format!(
            "{:?} cannot be written as an ACL entry",
            entry
        )));
    }
    Ok(entry)
}

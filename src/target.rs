//! Target blocks
//!
//! A target block is a `Target <IQN>` line followed by its option lines, up
//! to the next `Target` line or the end of the file:
//!
//! ```text
//! Target iqn.2001-04.com.example:storage.disk1
//!     IncomingUser joe secret
//!     Lun 0 Path=/dev/sdc,Type=fileio
//!     MaxConnections 1
//! ```
//!
//! Block positions are looked up again on every call, so an engine can be
//! kept around while the document is edited by other engines.

use crate::auth::{ChapCredentials, CredentialKind};
use crate::document::{check_iqn, first_token, Document, LineId, Placement};
use crate::error::{IetError, IetResult};
use crate::lun::{first_free_id, Lun, LunSpec};

/// Option key; LUN lines are keyed by id as well so `Lun 3` and `Lun 36`
/// stay distinct
#[derive(Debug, PartialEq, Eq)]
enum OptionKey<'a> {
    Lun(Option<&'a str>),
    Plain(&'a str),
}

impl<'a> OptionKey<'a> {
    fn of(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next()? {
            "Lun" => Some(OptionKey::Lun(tokens.next())),
            key => Some(OptionKey::Plain(key)),
        }
    }
}

/// Location of a target block inside a document
#[derive(Debug, Clone)]
struct TargetBlock {
    head: LineId,
    options: Vec<(LineId, String)>,
    next: Option<LineId>,
}

/// Engine editing one target block
#[derive(Debug, Clone)]
pub struct TargetEngine {
    iqn: String,
    placement: Placement,
    last_added_lun: Option<u32>,
}

impl TargetEngine {
    pub fn new(iqn: impl Into<String>) -> Self {
        Self {
            iqn: iqn.into(),
            placement: Placement::End,
            last_added_lun: None,
        }
    }

    /// Where [`add_target`](Self::add_target) puts the definition line
    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn iqn(&self) -> &str {
        &self.iqn
    }

    /// Id of this target's `Target` line
    pub fn target_id(&self, doc: &Document) -> Option<LineId> {
        self.block(doc).map(|b| b.head)
    }

    /// Id of the following `Target` line; `None` means the block runs to the
    /// end of the document (or the target does not exist)
    pub fn next_target_id(&self, doc: &Document) -> Option<LineId> {
        self.block(doc).and_then(|b| b.next)
    }

    pub fn exists(&self, doc: &Document) -> bool {
        self.block(doc).is_some()
    }

    /// Add the target definition
    pub fn add_target(&self, doc: &mut Document) -> IetResult<LineId> {
        check_iqn(&self.iqn)?;
        if self.exists(doc) {
            return Err(IetError::Duplication(format!(
                "The target {} already exists",
                self.iqn
            )));
        }

        let id = doc.insert(format!("Target {}", self.iqn), self.placement)?;
        log::debug!("Added target {} as line {}", self.iqn, id);
        Ok(id)
    }

    /// Delete the target definition
    ///
    /// Fails with [`IetError::TargetNotEmpty`] while options or LUNs remain.
    pub fn delete_target(&self, doc: &mut Document) -> IetResult<()> {
        let block = self.block_or_fail(doc)?;

        if !block.options.is_empty() {
            return Err(IetError::TargetNotEmpty(format!(
                "The target {} has options defined",
                self.iqn
            )));
        }

        doc.remove(block.head)?;
        log::debug!("Deleted target {}", self.iqn);
        Ok(())
    }

    /// All option lines of the target, in file order
    ///
    /// `None` if the block has no options or the target does not exist.
    pub fn options(&self, doc: &Document) -> Option<Vec<String>> {
        let block = self.block(doc)?;
        if block.options.is_empty() {
            return None;
        }
        Some(block.options.into_iter().map(|(_, text)| text).collect())
    }

    /// Find the line already holding the key of `option`
    ///
    /// Only the key is compared, the value is ignored. LUN lines are matched
    /// on `Lun <id>`.
    pub fn is_option_set(&self, doc: &Document, option: &str) -> IetResult<Option<LineId>> {
        let block = self.block_or_fail(doc)?;
        Ok(find_option(&block, option))
    }

    /// Add an option, replacing an existing line with the same key
    ///
    /// An option given without indentation takes the indentation of the
    /// block's existing options.
    pub fn add_option(&self, doc: &mut Document, option: &str) -> IetResult<LineId> {
        let block = self.block_or_fail(doc)?;

        if option.trim().is_empty() || option.contains('#') {
            return Err(IetError::Invalid(format!("{:?} is not a directive", option)));
        }
        if first_token(option) == Some("Target") {
            return Err(IetError::Invalid(format!(
                "{:?} would start a new target inside {}",
                option, self.iqn
            )));
        }

        if let Some(existing) = find_option(&block, option) {
            let line = indent_like(doc.get(existing).unwrap_or_default(), option);
            doc.replace(existing, line)?;
            log::debug!("Updated option {:?} on {} (line {})", option, self.iqn, existing);
            return Ok(existing);
        }

        // Keep the block contiguous: new options go after the last one
        let (anchor, line) = match block.options.last() {
            Some((id, text)) => (*id, indent_like(text, option)),
            None => (block.head, option.to_string()),
        };
        let id = doc.insert(line, Placement::After(anchor))?;
        log::debug!("Added option {:?} to {} as line {}", option, self.iqn, id);
        Ok(id)
    }

    /// Delete an option by key; the value does not need to match
    pub fn delete_option(&self, doc: &mut Document, option: &str) -> IetResult<()> {
        let block = self.block_or_fail(doc)?;

        if block.options.is_empty() {
            return Err(IetError::NotFound(format!(
                "The target {} has no options",
                self.iqn
            )));
        }

        let id = find_option(&block, option).ok_or_else(|| {
            IetError::NotFound(format!("The option {} was not found", option))
        })?;

        doc.remove(id)?;
        log::debug!("Deleted option {:?} from {} (line {})", option, self.iqn, id);
        Ok(())
    }

    /// LUNs of the target, or only the one with `id`
    ///
    /// Returns `None` when nothing matches.
    pub fn luns(&self, doc: &Document, id: Option<u32>) -> IetResult<Option<Vec<Lun>>> {
        let block = self.block_or_fail(doc)?;

        let mut luns = Vec::new();
        for (_, text) in &block.options {
            if let Some(lun) = Lun::parse(text)? {
                match id {
                    Some(wanted) if lun.id == wanted => return Ok(Some(vec![lun])),
                    Some(_) => {}
                    None => luns.push(lun),
                }
            }
        }

        if luns.is_empty() {
            Ok(None)
        } else {
            Ok(Some(luns))
        }
    }

    /// Single LUN by id
    pub fn lun(&self, doc: &Document, id: u32) -> IetResult<Option<Lun>> {
        Ok(self
            .luns(doc, Some(id))?
            .and_then(|luns| luns.into_iter().next()))
    }

    /// Smallest LUN id not in use on this target
    ///
    /// `None` if the target does not exist.
    pub fn next_free_lun(&self, doc: &Document) -> IetResult<Option<u32>> {
        if !self.exists(doc) {
            return Ok(None);
        }
        let used = self
            .luns(doc, None)?
            .unwrap_or_default()
            .into_iter()
            .map(|lun| lun.id);
        Ok(Some(first_free_id(used)))
    }

    /// Add a LUN with the next free id and return that id
    pub fn add_lun(&mut self, doc: &mut Document, spec: &LunSpec) -> IetResult<u32> {
        let id = self.next_free_lun(doc)?.ok_or_else(|| self.not_found())?;
        let line = spec.to_directive(id)?;

        self.add_option(doc, &line)?;
        self.last_added_lun = Some(id);
        log::info!("Added LUN {} to {}", id, self.iqn);
        Ok(id)
    }

    /// Remove a LUN by id
    pub fn delete_lun(&self, doc: &mut Document, id: u32) -> IetResult<()> {
        if self.luns(doc, Some(id))?.is_none() {
            return Err(IetError::NotFound(format!(
                "The lun {} was not found on {}",
                id, self.iqn
            )));
        }

        let block = self.block_or_fail(doc)?;
        let lines: Vec<LineId> = block
            .options
            .iter()
            .filter(|(_, text)| matches!(Lun::parse(text), Ok(Some(lun)) if lun.id == id))
            .map(|(line, _)| *line)
            .collect();

        for line in lines {
            doc.remove(line)?;
        }
        log::info!("Deleted LUN {} from {}", id, self.iqn);
        Ok(())
    }

    /// CHAP accounts set on this target
    pub fn credentials(&self, doc: &Document) -> IetResult<Vec<(CredentialKind, ChapCredentials)>> {
        let block = self.block_or_fail(doc)?;
        Ok(block
            .options
            .iter()
            .filter_map(|(_, text)| ChapCredentials::parse(text))
            .collect())
    }

    /// Id of the LUN added last by this engine
    pub fn last_added_lun(&self) -> Option<u32> {
        self.last_added_lun
    }

    pub fn add_incoming_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<LineId> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Incoming)?;
        self.add_option(doc, &line)
    }

    pub fn delete_incoming_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<()> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Incoming)?;
        self.delete_option(doc, &line)
    }

    pub fn add_outgoing_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<LineId> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Outgoing)?;
        self.add_option(doc, &line)
    }

    pub fn delete_outgoing_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<()> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Outgoing)?;
        self.delete_option(doc, &line)
    }

    fn is_definition(&self, line: &str) -> bool {
        let mut tokens = line.split_whitespace();
        tokens.next() == Some("Target")
            && tokens.next() == Some(self.iqn.as_str())
            && tokens.next().is_none()
    }

    fn block(&self, doc: &Document) -> Option<TargetBlock> {
        let mut directives = doc
            .directives()
            .skip_while(|(_, text)| !self.is_definition(text));
        let (head, _) = directives.next()?;

        let mut options = Vec::new();
        let mut next = None;
        for (id, text) in directives {
            if first_token(text) == Some("Target") {
                next = Some(id);
                break;
            }
            options.push((id, text.to_string()));
        }

        Some(TargetBlock { head, options, next })
    }

    fn block_or_fail(&self, doc: &Document) -> IetResult<TargetBlock> {
        self.block(doc).ok_or_else(|| self.not_found())
    }

    fn not_found(&self) -> IetError {
        IetError::NotFound(format!("The target {} was not found", self.iqn))
    }
}

/// `option` with the leading whitespace of `model` when it has none itself
fn indent_like(model: &str, option: &str) -> String {
    if option.starts_with(char::is_whitespace) {
        return option.to_string();
    }
    let indent = &model[..model.len() - model.trim_start().len()];
    format!("{}{}", indent, option)
}

fn find_option(block: &TargetBlock, option: &str) -> Option<LineId> {
    let wanted = OptionKey::of(option)?;
    block
        .options
        .iter()
        .find(|(_, text)| OptionKey::of(text).as_ref() == Some(&wanted))
        .map(|(id, _)| *id)
}

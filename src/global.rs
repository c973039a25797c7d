//! Global options
//!
//! Global options are written like target options but sit before the first
//! `Target` definition and apply to the whole daemon (for example the
//! `IncomingUser` accounts used for discovery sessions).

use crate::auth::{ChapCredentials, CredentialKind};
use crate::document::{first_token, Document, LineId, Placement};
use crate::error::{IetError, IetResult};

/// Engine adding and removing global options
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalOptions;

impl GlobalOptions {
    pub fn new() -> Self {
        GlobalOptions
    }

    /// Global option lines in file order
    pub fn options<'a>(&self, doc: &'a Document) -> Vec<&'a str> {
        global_range(doc).map(|(_, text)| text).collect()
    }

    /// Id of the global line whose text is exactly `option`, if any
    pub fn find(&self, doc: &Document, option: &str) -> Option<LineId> {
        global_range(doc)
            .find(|(_, text)| *text == option)
            .map(|(id, _)| id)
    }

    /// CHAP accounts configured for discovery sessions
    pub fn credentials(&self, doc: &Document) -> Vec<(CredentialKind, ChapCredentials)> {
        global_range(doc)
            .filter_map(|(_, text)| ChapCredentials::parse(text))
            .collect()
    }

    /// Add a global line
    ///
    /// The line goes after the last existing global option, or at the very
    /// start of the file when there is none.
    pub fn add(&self, doc: &mut Document, option: &str) -> IetResult<LineId> {
        check_option(option)?;

        if self.find(doc, option).is_some() {
            return Err(IetError::Duplication(format!(
                "The option {} is already set",
                option
            )));
        }

        let placement = match global_range(doc).last() {
            Some((last, _)) => Placement::After(last),
            None => Placement::Start,
        };
        let id = doc.insert(option, placement)?;
        log::debug!("Added global option {:?} as line {}", option, id);
        Ok(id)
    }

    /// Remove a global line
    ///
    /// Target definitions are outside the global range, so this never
    /// removes a target or its options.
    pub fn delete(&self, doc: &mut Document, option: &str) -> IetResult<()> {
        let id = self.find(doc, option).ok_or_else(|| {
            IetError::NotFound(format!("The option {} was not found", option))
        })?;
        doc.remove(id)?;
        log::debug!("Deleted global option {:?} (line {})", option, id);
        Ok(())
    }

    /// Add an `IncomingUser` line for discovery authentication
    pub fn add_incoming_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<LineId> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Incoming)?;
        self.add(doc, &line)
    }

    /// Add an `OutgoingUser` line for discovery authentication
    pub fn add_outgoing_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<LineId> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Outgoing)?;
        self.add(doc, &line)
    }

    pub fn delete_incoming_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<()> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Incoming)?;
        self.delete(doc, &line)
    }

    pub fn delete_outgoing_user(&self, doc: &mut Document, user: &str, password: &str) -> IetResult<()> {
        let line = ChapCredentials::new(user, password).to_directive(CredentialKind::Outgoing)?;
        self.delete(doc, &line)
    }
}

/// Directives before the first `Target` line
fn global_range(doc: &Document) -> impl Iterator<Item = (LineId, &str)> {
    doc.directives()
        .take_while(|(_, text)| first_token(text) != Some("Target"))
}

fn check_option(option: &str) -> IetResult<()> {
    if option.trim().is_empty() || option.contains('#') {
        return Err(IetError::Invalid(format!(
            "{:?} is not a directive",
            option
        )));
    }
    if first_token(option) == Some("Target") {
        return Err(IetError::Invalid(
            "target definitions cannot be added as global options".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = "\
# ietd.conf
IncomingUser joe secret

Target iqn.2020.example:tgt1
    MaxConnections 1
";

    #[test]
    fn test_add_to_empty_file() {
        let mut doc = Document::parse("");
        GlobalOptions::new().add(&mut doc, "Authentication no").unwrap();
        assert_eq!(doc.render(), "Authentication no");
    }

    #[test]
    fn test_add_after_last_global() {
        let mut doc = Document::parse(CONF);
        GlobalOptions::new().add(&mut doc, "OutgoingUser jack pass").unwrap();
        assert_eq!(
            doc.render(),
            "# ietd.conf\nIncomingUser joe secret\nOutgoingUser jack pass\n\nTarget iqn.2020.example:tgt1\n    MaxConnections 1\n"
        );
    }

    #[test]
    fn test_add_without_globals_goes_first() {
        let mut doc = Document::parse("Target iqn.a\n");
        GlobalOptions::new().add(&mut doc, "Authentication no").unwrap();
        assert_eq!(doc.render(), "Authentication no\nTarget iqn.a\n");
    }

    #[test]
    fn test_add_duplicate() {
        let mut doc = Document::parse(CONF);
        let err = GlobalOptions::new()
            .add_incoming_user(&mut doc, "joe", "secret")
            .unwrap_err();
        assert!(err.is_duplication());
    }

    #[test]
    fn test_target_option_is_not_global() {
        let mut doc = Document::parse(CONF);
        let global = GlobalOptions::new();

        // Same text inside a target block does not count as a duplicate
        global.add(&mut doc, "MaxConnections 1").unwrap();
        assert_eq!(global.options(&doc), vec!["IncomingUser joe secret", "MaxConnections 1"]);

        let err = GlobalOptions::new().delete(&mut Document::parse("Target iqn.a\nMaxConnections 1"), "MaxConnections 1");
        assert!(err.unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete() {
        let mut doc = Document::parse(CONF);
        let global = GlobalOptions::new();
        global.delete_incoming_user(&mut doc, "joe", "secret").unwrap();
        assert_eq!(
            doc.render(),
            "# ietd.conf\n\nTarget iqn.2020.example:tgt1\n    MaxConnections 1\n"
        );

        assert!(global.delete(&mut doc, "IncomingUser joe secret").unwrap_err().is_not_found());
    }

    #[test]
    fn test_no_target_means_everything_is_global() {
        let mut doc = Document::parse("Authentication no\nIncomingUser a b");
        let global = GlobalOptions::new();
        assert_eq!(global.options(&doc).len(), 2);
        global.delete_incoming_user(&mut doc, "a", "b").unwrap();
        assert_eq!(doc.render(), "Authentication no");
    }

    #[test]
    fn test_find_is_exact() {
        let doc = Document::parse("  Authentication no\nIncomingUser joe secret\n");
        let global = GlobalOptions::new();
        assert_eq!(global.find(&doc, "IncomingUser joe secret"), Some(LineId::new(1)));
        assert_eq!(global.find(&doc, "Authentication no"), None);
        assert_eq!(global.find(&doc, "  Authentication no"), Some(LineId::new(0)));
    }

    #[test]
    fn test_credentials() {
        let mut doc = Document::parse(CONF);
        let global = GlobalOptions::new();
        global.add_outgoing_user(&mut doc, "jack", "pass").unwrap();

        assert_eq!(
            global.credentials(&doc),
            vec![
                (CredentialKind::Incoming, ChapCredentials::new("joe", "secret")),
                (CredentialKind::Outgoing, ChapCredentials::new("jack", "pass")),
            ]
        );
        assert!(global.credentials(&Document::parse("Target iqn.a\n")).is_empty());
    }

    #[test]
    fn test_rejects_target_and_comment_lines() {
        let mut doc = Document::new();
        let global = GlobalOptions::new();
        assert!(matches!(global.add(&mut doc, "Target iqn.a"), Err(IetError::Invalid(_))));
        assert!(matches!(global.add(&mut doc, "# note"), Err(IetError::Invalid(_))));
        assert!(matches!(global.add(&mut doc, "  "), Err(IetError::Invalid(_))));
    }
}

//! Identifier scheme shared by the package tree and the HTML preview.
//!
//! A paragraph carries one [`ParagraphIdentity`] (an 8-character hex token).
//! Each representation wraps it in a prefixed [`ElementId`] such as
//! `p-1A2B3C4D` or `li-1A2B3C4D`; synthetic HTML constructs (list wrappers,
//! table parts) get ids of their own.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const TOKEN_LEN: usize = 8;

/// Draws a fresh 8-character uppercase hex token from the thread-local CSPRNG.
///
/// No collision check is performed against tokens already in use.
pub fn mint_token() -> String {
    format!("{:08X}", rand::random::<u32>())
}

/// Persistent identity of one paragraph within a package (`w14:paraId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParagraphIdentity(String);

impl ParagraphIdentity {
    /// Mints a fresh identity. Values stay below `0x80000000`, the range
    /// word processors accept for `w14:paraId`.
    pub fn mint() -> Self {
        Self(format!("{:08X}", rand::random::<u32>() & 0x7FFF_FFFF))
    }

    /// Accepts any 8-digit hex token, preserving it verbatim.
    pub fn parse(token: &str) -> Option<Self> {
        if is_token(token) {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    /// Keeps whatever token the package already carries, even when another
    /// producer wrote something other than 8 hex digits.
    pub(crate) fn parse_lenient(token: &str) -> Self {
        Self(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParagraphIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_token(s: &str) -> bool {
    s.len() == TOKEN_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Node-kind prefix of an [`ElementId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    Paragraph,
    ListItem,
    Table,
    Row,
    Cell,
    List,
}

impl IdPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            IdPrefix::Paragraph => "p",
            IdPrefix::ListItem => "li",
            IdPrefix::Table => "tbl",
            IdPrefix::Row => "tr",
            IdPrefix::Cell => "td",
            IdPrefix::List => "list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "p" => Some(IdPrefix::Paragraph),
            "li" => Some(IdPrefix::ListItem),
            "tbl" => Some(IdPrefix::Table),
            "tr" => Some(IdPrefix::Row),
            "td" => Some(IdPrefix::Cell),
            "list" => Some(IdPrefix::List),
            _ => None,
        }
    }

    /// Prefix for a freshly introduced HTML element, chosen by tag name.
    pub fn for_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(IdPrefix::Paragraph),
            "li" => Some(IdPrefix::ListItem),
            "table" => Some(IdPrefix::Table),
            "tr" => Some(IdPrefix::Row),
            "td" | "th" => Some(IdPrefix::Cell),
            "ul" | "ol" => Some(IdPrefix::List),
            _ => None,
        }
    }

    pub fn is_table_part(self) -> bool {
        matches!(self, IdPrefix::Table | IdPrefix::Row | IdPrefix::Cell)
    }
}

/// Externally visible identifier of an addressable node: `{prefix}-{token}`.
///
/// Lookup is exact string equality, so the raw string is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(prefix: IdPrefix, token: &str) -> Self {
        Self(format!("{}-{}", prefix.as_str(), token))
    }

    /// Fresh identifier. Paragraph and list-item tokens are valid
    /// paragraph identities, so the package can adopt them verbatim.
    pub fn fresh(prefix: IdPrefix) -> Self {
        match prefix {
            IdPrefix::Paragraph | IdPrefix::ListItem => {
                Self::for_paragraph(prefix, &ParagraphIdentity::mint())
            }
            _ => Self::new(prefix, &mint_token()),
        }
    }

    pub fn for_paragraph(prefix: IdPrefix, identity: &ParagraphIdentity) -> Self {
        Self::new(prefix, identity.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> Option<IdPrefix> {
        self.0.split_once('-').and_then(|(p, _)| IdPrefix::parse(p))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.split_once('-').map(|(_, t)| t)
    }

    /// The paragraph identity behind a `p-` or `li-` identifier.
    pub fn paragraph_identity(&self) -> Option<ParagraphIdentity> {
        match self.prefix()? {
            IdPrefix::Paragraph | IdPrefix::ListItem => ParagraphIdentity::parse(self.token()?),
            _ => None,
        }
    }

    pub fn is_table_addressed(&self) -> bool {
        self.prefix().map(IdPrefix::is_table_part).unwrap_or(false)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_uppercase_hex() {
        for _ in 0..64 {
            let t = mint_token();
            assert_eq!(t.len(), TOKEN_LEN);
            assert!(t.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }

    #[test]
    fn minted_identities_stay_in_para_id_range() {
        for _ in 0..64 {
            let id = ParagraphIdentity::mint();
            let v = u32::from_str_radix(id.as_str(), 16).unwrap();
            assert!(v < 0x8000_0000);
        }
    }

    #[test]
    fn splits_prefix_and_token() {
        let id = ElementId::from("li-00AB12CD");
        assert_eq!(id.prefix(), Some(IdPrefix::ListItem));
        assert_eq!(id.paragraph_identity().unwrap().as_str(), "00AB12CD");

        let cell = ElementId::from("td-0-1-2");
        assert!(cell.is_table_addressed());
        assert!(cell.paragraph_identity().is_none());

        assert!(ElementId::from("list-0A0A0A0A").paragraph_identity().is_none());
        assert!(ElementId::from("p-short").paragraph_identity().is_none());
    }

    #[test]
    fn fresh_paragraph_ids_carry_paragraph_identities() {
        let id = ElementId::fresh(IdPrefix::ListItem);
        assert!(id.as_str().starts_with("li-"));
        assert!(id.paragraph_identity().is_some());
        assert_eq!(ElementId::fresh(IdPrefix::List).token().unwrap().len(), TOKEN_LEN);
    }

    #[test]
    fn prefix_follows_tag_name() {
        assert_eq!(IdPrefix::for_tag("H3"), Some(IdPrefix::Paragraph));
        assert_eq!(IdPrefix::for_tag("th"), Some(IdPrefix::Cell));
        assert_eq!(IdPrefix::for_tag("ol"), Some(IdPrefix::List));
        assert_eq!(IdPrefix::for_tag("span"), None);
    }
}

//! Weighting document (weighting.json) loading.
//!
//! The document is a list of entries, each pairing a nested allocation with
//! the accounts it applies to:
//!
//! ```json
//! [
//!   {
//!     "portfolio": [
//!       { "60": [ { "50": "VTI" }, { "50": "VXUS" } ] },
//!       { "40": "BND" }
//!     ],
//!     "accounts": "12345678, 87654321"
//!   }
//! ]
//! ```
//!
//! A sibling group is a list of objects. Each object maps whole-number
//! percentages to either a ticker or another sibling group. Object key order
//! is kept as written, since it decides the order of equal-percent tickers.
//!
//! Only the shape is checked here. Whether each group adds up to 100 is the
//! resolver's job, so one bad entry can be skipped without rejecting the file.

use std::fmt;
use std::path::Path;

use allotment::{TargetAllocation, Ticker, Weight, WeightingError, WeightingNode, resolve};
use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::{Error, Result};

/// A parsed weighting document.
#[derive(Debug, Clone)]
pub struct WeightingDocument {
    pub entries: Vec<WeightingEntry>,
}

/// One allocation and the accounts that should follow it.
#[derive(Debug, Clone, Deserialize)]
pub struct WeightingEntry {
    #[serde(deserialize_with = "deserialize_group")]
    pub portfolio: Vec<Weight>,
    #[serde(deserialize_with = "deserialize_accounts")]
    pub accounts: Vec<String>,
}

impl WeightingEntry {
    /// Flatten this entry's tree into a target table.
    pub fn resolve(&self) -> std::result::Result<TargetAllocation, WeightingError> {
        resolve(&self.portfolio)
    }
}

impl WeightingDocument {
    /// Load and validate a weighting file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::DocumentRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<WeightingEntry> = serde_json::from_str(json)?;
        let doc = Self { entries };
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::Document("no entries".into()));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.accounts.is_empty() {
                return Err(Error::Document(format!("entry {i} lists no accounts")));
            }
        }
        Ok(())
    }
}

// === Deserialization ===

fn deserialize_group<'de, D>(deserializer: D) -> std::result::Result<Vec<Weight>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_seq(GroupVisitor)
}

/// `[ {pct: node, ...}, ... ]` → weights in document order.
struct GroupVisitor;

impl<'de> Visitor<'de> for GroupVisitor {
    type Value = Vec<Weight>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of {percentage: ticker or group} objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut weights = Vec::new();
        while let Some(Members(members)) = seq.next_element()? {
            weights.extend(members);
        }
        Ok(weights)
    }
}

/// One object of a sibling group; may hold several percentages.
struct Members(Vec<Weight>);

impl<'de> Deserialize<'de> for Members {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MembersVisitor)
    }
}

struct MembersVisitor;

impl<'de> Visitor<'de> for MembersVisitor {
    type Value = Members;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping percentages to tickers or groups")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut weights = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            let percent = key.trim().parse::<u32>().map_err(|_| {
                <A::Error as de::Error>::custom(format!("percentage '{key}' is not a whole number"))
            })?;
            let Node(node) = map.next_value()?;
            weights.push(Weight { percent, node });
        }
        Ok(Members(weights))
    }
}

/// A ticker string or a nested sibling group.
struct Node(WeightingNode);

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a ticker or a nested group")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        let ticker = v.trim();
        if ticker.is_empty() {
            return Err(E::custom("empty ticker"));
        }
        Ok(Node(WeightingNode::Leaf(Ticker::new(ticker))))
    }

    fn visit_seq<A>(self, seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        GroupVisitor.visit_seq(seq).map(|g| Node(WeightingNode::Group(g)))
    }
}

fn deserialize_accounts<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(AccountsVisitor)
}

/// `"123, 456"`, `123456` or `["123", 456]`.
struct AccountsVisitor;

fn split_accounts(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

impl<'de> Visitor<'de> for AccountsVisitor {
    type Value = Vec<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an account number, a comma-separated list, or an array of them")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(split_accounts(v).collect())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(vec![v.to_string()])
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut accounts = Vec::new();
        while let Some(AccountNumbers(more)) = seq.next_element()? {
            accounts.extend(more);
        }
        Ok(accounts)
    }
}

struct AccountNumbers(Vec<String>);

impl<'de> Deserialize<'de> for AccountNumbers {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarAccountVisitor)
    }
}

struct ScalarAccountVisitor;

impl<'de> Visitor<'de> for ScalarAccountVisitor {
    type Value = AccountNumbers;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an account number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(AccountNumbers(split_accounts(v).collect()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(AccountNumbers(vec![v.to_string()]))
    }
}

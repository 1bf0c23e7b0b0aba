//! Europe PMC source databases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ClientError;

bitflags::bitflags! {
    /// Operations a source database supports beyond search, detail,
    /// citation, reference and database-link lookups
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const FULL_TEXT = 1 << 0;
        const SUPPLEMENTARY_FILES = 1 << 1;
    }
}

/// Source database a Europe PMC record belongs to
///
/// Record identifiers are only unique within their source, so every lookup
/// takes a `(DataSource, id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSource {
    /// PubMed/MEDLINE
    Med,
    /// PubMed Central
    Pmc,
    /// Patents
    Pat,
    /// Agricola
    Agr,
    /// Chinese Biological Abstracts
    Cba,
    /// CiteXplore
    Ctx,
    /// EThOS theses
    Eth,
    /// NHS Evidence
    Hir,
    /// Preprints
    Ppr,
    /// NCBI Bookshelf
    Nbk,
}

impl DataSource {
    /// All known sources
    pub const ALL: [DataSource; 10] = [
        DataSource::Med,
        DataSource::Pmc,
        DataSource::Pat,
        DataSource::Agr,
        DataSource::Cba,
        DataSource::Ctx,
        DataSource::Eth,
        DataSource::Hir,
        DataSource::Ppr,
        DataSource::Nbk,
    ];

    /// Code used in endpoint paths (e.g. `MED/12345/citations`)
    pub fn code(&self) -> &'static str {
        match self {
            DataSource::Med => "MED",
            DataSource::Pmc => "PMC",
            DataSource::Pat => "PAT",
            DataSource::Agr => "AGR",
            DataSource::Cba => "CBA",
            DataSource::Ctx => "CTX",
            DataSource::Eth => "ETH",
            DataSource::Hir => "HIR",
            DataSource::Ppr => "PPR",
            DataSource::Nbk => "NBK",
        }
    }

    pub fn capabilities(&self) -> SourceCapabilities {
        match self {
            DataSource::Pmc => {
                SourceCapabilities::FULL_TEXT | SourceCapabilities::SUPPLEMENTARY_FILES
            }
            _ => SourceCapabilities::empty(),
        }
    }

    /// Whether full text XML can be retrieved for this source
    pub fn supports_full_text(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::FULL_TEXT)
    }

    /// Whether supplementary files can be retrieved for this source
    pub fn supports_supplementary_files(&self) -> bool {
        self.capabilities()
            .contains(SourceCapabilities::SUPPLEMENTARY_FILES)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DataSource {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        DataSource::ALL
            .iter()
            .copied()
            .find(|source| source.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| ClientError::InvalidArgument(format!("unknown source: {:?}", s)))
    }
}

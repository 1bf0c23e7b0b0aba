//! Publication and author models derived from raw search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::response::{as_sequence, flag, scalar_string, scalar_u64};

/// An author entry from a record's structured author list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub initials: Option<String>,
    pub affiliation: Option<String>,
    /// Persistent identifier, usually an ORCID
    pub orcid: Option<String>,
}

impl AuthorRecord {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Default::default()
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if let Value::String(name) = value {
            return Some(Self::new(name.clone()));
        }

        let first_name = scalar_string(value.get("firstName"));
        let last_name = scalar_string(value.get("lastName"));
        let full_name = scalar_string(value.get("fullName")).or_else(|| {
            // Collective authors only carry a collective name
            scalar_string(value.get("collectiveName")).or_else(|| {
                let parts: Vec<&str> = [first_name.as_deref(), last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            })
        })?;

        let affiliation = scalar_string(value.get("affiliation")).or_else(|| {
            as_sequence(
                value
                    .get("authorAffiliationDetailsList")
                    .and_then(|list| list.get("authorAffiliation")),
            )
            .into_iter()
            .find_map(|entry| scalar_string(entry.get("affiliation")))
        });

        Some(Self {
            full_name,
            first_name,
            last_name,
            initials: scalar_string(value.get("initials")),
            affiliation,
            orcid: value.get("authorId").and_then(|id| {
                scalar_string(id.get("value")).or_else(|| scalar_string(Some(id)))
            }),
        })
    }
}

/// Journal metadata for a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalInfo {
    pub title: Option<String>,
    pub issn: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
}

impl JournalInfo {
    fn from_record(record: &Value) -> Self {
        let info = record.get("journalInfo");
        let journal = info.and_then(|info| info.get("journal"));

        Self {
            title: scalar_string(journal.and_then(|j| j.get("title")))
                .or_else(|| scalar_string(record.get("journalTitle"))),
            issn: scalar_string(journal.and_then(|j| j.get("issn"))),
            volume: scalar_string(info.and_then(|i| i.get("volume")))
                .or_else(|| scalar_string(record.get("journalVolume"))),
            issue: scalar_string(info.and_then(|i| i.get("issue")))
                .or_else(|| scalar_string(record.get("issue"))),
            pages: scalar_string(record.get("pageInfo")),
        }
    }
}

/// A publication as returned by a search or lookup
///
/// Built once from a raw result and never modified afterwards; the
/// disambiguator wraps copies in [`DisambiguatedPublication`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Identifier, scoped to `source`
    pub id: Option<String>,
    /// Source database code (`MED`, `PMC`, ...)
    pub source: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    pub doi: Option<String>,
    pub title: String,
    /// Structured authors, in the order the service returned them
    pub authors: Vec<AuthorRecord>,
    /// Names from a plain `authors` list, one entry per author
    pub author_list: Vec<String>,
    /// Plain author field used when no author list is present
    pub author_string: Option<String>,
    pub journal: JournalInfo,
    pub publication_date: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub mesh_terms: Vec<String>,
    pub citation_count: Option<u64>,
    pub is_open_access: bool,
    pub has_pdf: bool,
    pub has_full_text: bool,
}

impl PublicationRecord {
    /// Build a record from one `resultList.result` entry
    pub fn from_value(value: &Value) -> Self {
        let authors = as_sequence(
            value
                .get("authorList")
                .and_then(|list| list.get("author")),
        )
        .into_iter()
        .filter_map(AuthorRecord::from_value)
        .collect();

        let (author_list, author_string) = match value.get("authors") {
            Some(Value::Array(items)) => (
                items
                    .iter()
                    .filter_map(|item| scalar_string(Some(item)))
                    .collect(),
                scalar_string(value.get("authorString")),
            ),
            other => (
                Vec::new(),
                scalar_string(other).or_else(|| scalar_string(value.get("authorString"))),
            ),
        };

        let keywords = as_sequence(
            value
                .get("keywordList")
                .and_then(|list| list.get("keyword")),
        )
        .into_iter()
        .filter_map(|keyword| scalar_string(Some(keyword)))
        .collect();

        let mesh_terms = as_sequence(
            value
                .get("meshHeadingList")
                .and_then(|list| list.get("meshHeading")),
        )
        .into_iter()
        .filter_map(|heading| scalar_string(heading.get("descriptorName")))
        .collect();

        Self {
            id: scalar_string(value.get("id")),
            source: scalar_string(value.get("source")),
            pmid: scalar_string(value.get("pmid")),
            pmcid: scalar_string(value.get("pmcid")),
            doi: scalar_string(value.get("doi")),
            title: scalar_string(value.get("title")).unwrap_or_default(),
            authors,
            author_list,
            author_string,
            journal: JournalInfo::from_record(value),
            publication_date: scalar_string(value.get("firstPublicationDate"))
                .or_else(|| scalar_string(value.get("pubDate")))
                .or_else(|| scalar_string(value.get("pubYear"))),
            abstract_text: scalar_string(value.get("abstractText")),
            keywords,
            mesh_terms,
            citation_count: scalar_u64(value.get("citedByCount")),
            is_open_access: flag(value.get("isOpenAccess")),
            has_pdf: flag(value.get("hasPDF")),
            has_full_text: flag(value.get("inEPMC")) || flag(value.get("hasTextMinedTerms")),
        }
    }

    /// Author names to score during disambiguation.
    ///
    /// Uses the structured author list when present, then the plain
    /// `authors` list with each entry kept whole, otherwise splits the plain
    /// author field on `,` and `;`.
    pub fn author_names(&self) -> Vec<&str> {
        if !self.authors.is_empty() {
            return self
                .authors
                .iter()
                .map(|author| author.full_name.as_str())
                .filter(|name| !name.trim().is_empty())
                .collect();
        }

        if !self.author_list.is_empty() {
            return self
                .author_list
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .collect();
        }

        self.author_string
            .as_deref()
            .map(|authors| {
                authors
                    .split([',', ';'])
                    .map(|name| name.trim().trim_end_matches('.').trim())
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A candidate author string and its match score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorMatch {
    pub candidate: String,
    /// Integer score in `0..=100`
    pub score: u8,
}

/// A publication that survived disambiguation, with its match evidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisambiguatedPublication {
    #[serde(flatten)]
    pub publication: PublicationRecord,
    /// Every qualifying author, best first
    pub author_matches: Vec<AuthorMatch>,
    /// Maximum of `author_matches` scores
    pub best_match_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_core_record() {
        let record = PublicationRecord::from_value(&json!({
            "id": "31010933",
            "source": "MED",
            "pmid": "31010933",
            "doi": "10.1016/j.cell.2019.03.040",
            "title": "Cell competition in the skin",
            "authorList": {"author": [
                {
                    "fullName": "Watt FM",
                    "firstName": "Fiona M",
                    "lastName": "Watt",
                    "initials": "FM",
                    "authorId": {"type": "ORCID", "value": "0000-0001-9151-5154"},
                    "authorAffiliationDetailsList": {"authorAffiliation": [
                        {"affiliation": "King's College London"}
                    ]}
                },
                {"fullName": "Smith J"}
            ]},
            "journalInfo": {
                "volume": "177",
                "issue": "3",
                "journal": {"title": "Cell", "issn": "0092-8674"}
            },
            "pageInfo": "1-10",
            "firstPublicationDate": "2019-04-18",
            "keywordList": {"keyword": ["skin", "stem cells"]},
            "meshHeadingList": {"meshHeading": {"descriptorName": "Epidermis"}},
            "citedByCount": 12,
            "isOpenAccess": "Y",
            "hasPDF": "N",
            "inEPMC": "Y"
        }));

        assert_eq!(record.id.as_deref(), Some("31010933"));
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.authors[0].orcid.as_deref(), Some("0000-0001-9151-5154"));
        assert_eq!(
            record.authors[0].affiliation.as_deref(),
            Some("King's College London")
        );
        assert_eq!(record.journal.title.as_deref(), Some("Cell"));
        assert_eq!(record.journal.pages.as_deref(), Some("1-10"));
        assert_eq!(record.keywords, vec!["skin", "stem cells"]);
        assert_eq!(record.mesh_terms, vec!["Epidermis"]);
        assert_eq!(record.citation_count, Some(12));
        assert!(record.is_open_access);
        assert!(!record.has_pdf);
        assert!(record.has_full_text);
        assert_eq!(record.author_names(), vec!["Watt FM", "Smith J"]);
    }

    #[test]
    fn test_single_author_object() {
        let record = PublicationRecord::from_value(&json!({
            "title": "Solo",
            "authorList": {"author": {"fullName": "Fiona M Watt"}}
        }));
        assert_eq!(record.author_names(), vec!["Fiona M Watt"]);
    }

    #[test]
    fn test_author_string_fallback() {
        let record = PublicationRecord::from_value(&json!({
            "title": "Lite record",
            "authorString": "Watt FM, Jensen KB; Smith J."
        }));
        assert!(record.authors.is_empty());
        assert_eq!(record.author_names(), vec!["Watt FM", "Jensen KB", "Smith J"]);
    }

    #[test]
    fn test_authors_list_fallback() {
        let record = PublicationRecord::from_value(&json!({
            "title": "Other shape",
            "authors": ["Doudna JA", "Charpentier E"]
        }));
        assert_eq!(record.author_names(), vec!["Doudna JA", "Charpentier E"]);
    }

    #[test]
    fn test_authors_list_entries_stay_whole() {
        let record = PublicationRecord::from_value(&json!({
            "title": "Inverted names",
            "authors": ["Watt, Fiona M", "Jensen, Kim B"]
        }));
        assert_eq!(record.author_list, vec!["Watt, Fiona M", "Jensen, Kim B"]);
        assert_eq!(record.author_names(), vec!["Watt, Fiona M", "Jensen, Kim B"]);
    }

    #[test]
    fn test_authors_list_preferred_over_author_string() {
        let record = PublicationRecord::from_value(&json!({
            "title": "Both fields",
            "authors": ["Fiona M Watt"],
            "authorString": "Smith J"
        }));
        assert_eq!(record.author_names(), vec!["Fiona M Watt"]);
        assert_eq!(record.author_string.as_deref(), Some("Smith J"));
    }

    #[test]
    fn test_authors_string_preferred_over_author_string() {
        let record = PublicationRecord::from_value(&json!({
            "title": "Plain authors",
            "authors": "Watt FM; Jensen KB",
            "authorString": "Smith J"
        }));
        assert!(record.author_list.is_empty());
        assert_eq!(record.author_names(), vec!["Watt FM", "Jensen KB"]);
    }

    #[test]
    fn test_missing_fields_default() {
        let record = PublicationRecord::from_value(&json!({}));
        assert_eq!(record.title, "");
        assert!(record.author_names().is_empty());
        assert_eq!(record.citation_count, None);
        assert!(!record.is_open_access);
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::normalize_name;

/// Matches a release year in parentheses like `(1982)`.
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((?:19|20)\d{2}\)").expect("Invalid year regex"));

/// Separator used in category paths, e.g. `Sci-Fi/Space`.
const CATEGORY_SEPARATOR: char = '/';

/// Static mapping from category path to the canonical titles it holds.
///
/// Categories keep the order they were written in.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Catalog {
    #[serde(deserialize_with = "ordered_entries")]
    categories: Vec<(String, Vec<String>)>,
}

impl Catalog {
    #[must_use]
    pub fn new(categories: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Total number of titles across all categories.
    #[must_use]
    pub fn title_count(&self) -> usize {
        self.categories.iter().map(|(_, titles)| titles.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(category, titles)| (category.as_str(), titles.as_slice()))
    }

    /// Reverse index from normalized title to category path.
    /// A title listed under several categories maps to the last one in catalog order.
    #[must_use]
    pub fn title_index(&self) -> HashMap<String, &str> {
        let mut index = HashMap::new();
        for (category, titles) in &self.categories {
            for title in titles {
                index.insert(normalize_name(title), category.as_str());
            }
        }
        index
    }

    /// Titles that appear more than once, with every category listing them.
    #[must_use]
    pub fn duplicate_titles(&self) -> Vec<(String, Vec<String>)> {
        let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (category, titles) in &self.categories {
            for title in titles {
                seen.entry(normalize_name(title)).or_default().push(category.clone());
            }
        }
        seen.into_iter().filter(|(_, categories)| categories.len() > 1).collect()
    }

    /// Expected directory for every catalog title as `(title, base/category/title)`.
    #[must_use]
    pub fn expected_title_dirs(&self, base: &Path) -> Vec<(String, PathBuf)> {
        self.categories
            .iter()
            .flat_map(|(category, titles)| {
                let dir = category_dir(base, category);
                titles.iter().map(move |title| (title.clone(), dir.join(title)))
            })
            .collect()
    }

    /// Every category directory together with its intermediate ancestors below `base`.
    ///
    /// `Sci-Fi/Space` yields both `base/Sci-Fi` and `base/Sci-Fi/Space`.
    #[must_use]
    pub fn category_dirs(&self, base: &Path) -> BTreeSet<PathBuf> {
        let mut dirs = BTreeSet::new();
        for (category, _) in &self.categories {
            let mut current = base.to_path_buf();
            for part in split_category(category) {
                current.push(part);
                dirs.insert(current.clone());
            }
        }
        dirs
    }
}

/// Resolve a category path like `Sci-Fi/Space` under the library base.
#[must_use]
pub fn category_dir(base: &Path, category: &str) -> PathBuf {
    split_category(category).fold(base.to_path_buf(), |dir, part| dir.join(part))
}

fn split_category(category: &str) -> impl Iterator<Item = &str> {
    category
        .split(CATEGORY_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// Mapping from a mis-named file to its canonical name, in the order written.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RenameMap {
    #[serde(deserialize_with = "ordered_entries")]
    entries: Vec<(String, String)>,
}

/// Suspicious rename map entry. These are reported but still processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameWarning {
    /// New name has no `(YYYY)` release year.
    MissingYear { new_name: String },
    /// New name has no file extension.
    MissingExtension { new_name: String },
    /// Several old names map to the same new name.
    DuplicateTarget { new_name: String, old_names: Vec<String> },
}

impl RenameMap {
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(old, new)| (old.into(), new.into())).collect(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Title folder name for a canonical file name: the name without its extension.
    #[must_use]
    pub fn title_for(new_name: &str) -> String {
        crate::path_to_file_stem_string(Path::new(new_name))
    }

    /// Check entries for likely typos.
    #[must_use]
    pub fn lint(&self) -> Vec<RenameWarning> {
        let mut warnings = Vec::new();
        for (_, new_name) in &self.entries {
            if !RE_YEAR.is_match(new_name) {
                warnings.push(RenameWarning::MissingYear {
                    new_name: new_name.clone(),
                });
            }
            if Path::new(new_name).extension().is_none() {
                warnings.push(RenameWarning::MissingExtension {
                    new_name: new_name.clone(),
                });
            }
        }

        let duplicates = self
            .entries
            .iter()
            .into_group_map_by(|(_, new_name)| new_name.clone())
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .map(|(new_name, group)| RenameWarning::DuplicateTarget {
                new_name,
                old_names: group.into_iter().map(|(old, _)| old.clone()).collect(),
            });
        warnings.extend(duplicates);
        warnings
    }
}

/// Deserialize a table into key-value pairs in document order.
fn ordered_entries<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct EntriesVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a table")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

impl fmt::Display for RenameWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingYear { new_name } => write!(f, "No release year in new name: {new_name}"),
            Self::MissingExtension { new_name } => write!(f, "No file extension in new name: {new_name}"),
            Self::DuplicateTarget { new_name, old_names } => {
                write!(f, "Several files renamed to {new_name}: {}", old_names.join(", "))
            }
        }
    }
}

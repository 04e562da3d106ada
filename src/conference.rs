//! Conferences covered by the dataset

use crate::error::{Error, Result};
use dialoguer::FuzzySelect;
use std::{collections::HashSet, sync::OnceLock};
use unicase::UniCase;

/// Research area that a conference belongs to
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Area {
    ComputerVision,
    NaturalLanguage,
    MachineLearning,
    ArtificialIntelligence,
    Others,
}
//
impl Area {
    /// Short label, as shown in charts
    pub fn label(self) -> &'static str {
        match self {
            Self::ComputerVision => "CV",
            Self::NaturalLanguage => "NLP",
            Self::MachineLearning => "ML",
            Self::ArtificialIntelligence => "AI",
            Self::Others => "Others",
        }
    }
}

/// What we know about a conference
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConferenceInfo {
    /// Short internal code, as found in the raw data files
    pub code: &'static str,

    /// Canonical human-readable name
    pub display_name: &'static str,

    /// Research area
    pub area: Area,
}

/// Bidirectional mapping between conference codes and display names
///
/// Both directions are case-insensitive, and the mapping is guaranteed to be a
/// bijection, so `code(display_name(c)) == c` for every known code.
#[derive(Clone, Debug)]
pub struct ConferenceNameMap(Box<[ConferenceInfo]>);
//
impl ConferenceNameMap {
    /// Build a name map, checking that it is a bijection
    pub fn new(conferences: impl IntoIterator<Item = ConferenceInfo>) -> Result<Self> {
        let conferences = conferences.into_iter().collect::<Box<[_]>>();
        let mut codes = HashSet::with_capacity(conferences.len());
        let mut names = HashSet::with_capacity(conferences.len());
        for info in conferences.iter() {
            if !codes.insert(UniCase::new(info.code)) {
                return Err(Error::NotBijective(info.code.into()));
            }
            if !names.insert(UniCase::new(info.display_name)) {
                return Err(Error::NotBijective(info.display_name.into()));
            }
        }
        Ok(Self(conferences))
    }

    /// Name map of every conference from the dataset
    pub fn builtin() -> &'static Self {
        static LAZY: OnceLock<ConferenceNameMap> = OnceLock::new();
        LAZY.get_or_init(|| {
            Self::new(supported_conferences().iter().copied())
                .expect("the builtin conference list should be a bijection")
        })
    }

    /// Iterate over known conferences
    pub fn iter(&self) -> impl Iterator<Item = &ConferenceInfo> + '_ {
        self.0.iter()
    }

    /// Information about a conference, looked up by code
    pub fn by_code(&self, code: &str) -> Result<&ConferenceInfo> {
        self.iter()
            .find(|info| UniCase::new(info.code) == UniCase::new(code))
            .ok_or_else(|| Error::UnknownConference(code.into()))
    }

    /// Information about a conference, looked up by display name
    pub fn by_display_name(&self, name: &str) -> Result<&ConferenceInfo> {
        self.iter()
            .find(|info| UniCase::new(info.display_name) == UniCase::new(name))
            .ok_or_else(|| Error::UnknownConference(name.into()))
    }

    /// Translate a conference code into its display name
    pub fn display_name(&self, code: &str) -> Result<&'static str> {
        self.by_code(code).map(|info| info.display_name)
    }

    /// Translate a display name back into a conference code
    pub fn code(&self, name: &str) -> Result<&'static str> {
        self.by_display_name(name).map(|info| info.code)
    }

    /// Resolve user input, which may be either a code or a display name, into
    /// a display name
    pub fn resolve(&self, code_or_name: &str) -> Result<&'static str> {
        match self.code(code_or_name) {
            Ok(code) => self.display_name(code),
            Err(_) => self.display_name(code_or_name),
        }
    }

    /// Display name that raw data cell contents should be replaced with, if any
    ///
    /// Unlike [`display_name()`](Self::display_name), this is exact-match, so
    /// that free text that merely looks like a code is left alone.
    pub(crate) fn normalize(&self, cell: &str) -> Option<&'static str> {
        self.iter()
            .find(|info| info.code == cell)
            .map(|info| info.display_name)
    }

    /// Ask the user to select a conference, returning its display name
    pub fn prompt(&self) -> Result<&'static str> {
        let names = self
            .iter()
            .map(|info| format!("{} ({})", info.display_name, info.code))
            .collect::<Vec<_>>();
        let idx = FuzzySelect::new()
            .with_prompt("Which conference should I show?")
            .items(&names)
            .default(0)
            .max_length(usize::MAX)
            .interact()
            .map_err(Error::NoSelection)?;
        Ok(self.0[idx].display_name)
    }
}

/// Every conference from the dataset, in the order used by selectors
fn supported_conferences() -> &'static [ConferenceInfo] {
    use Area::*;
    const fn conf(code: &'static str, display_name: &'static str, area: Area) -> ConferenceInfo {
        ConferenceInfo {
            code,
            display_name,
            area,
        }
    }
    const CONFERENCES: &[ConferenceInfo] = &[
        conf("cvpr", "CVPR", ComputerVision),
        conf("colm", "CoLM", NaturalLanguage),
        conf("acmmm", "ACM MM", Others),
        conf("www", "The Web Conference", Others),
        conf("icml", "ICML", MachineLearning),
        conf("acl", "ACL", NaturalLanguage),
        conf("corl", "CoRL", Others),
        conf("nips", "NeurIPS", MachineLearning),
        conf("siggraphasia", "SIGGRAPH Asia", ComputerVision),
        conf("ijcai", "IJCAI", ArtificialIntelligence),
        conf("wacv", "WACV", ComputerVision),
        conf("iccv", "ICCV", ComputerVision),
        conf("iclr", "ICLR", MachineLearning),
        conf("eccv", "ECCV", ComputerVision),
        conf("aaai", "AAAI", ArtificialIntelligence),
        conf("aistats", "AISTATS", MachineLearning),
        conf("siggraph", "SIGGRAPH", ComputerVision),
        conf("emnlp", "EMNLP", NaturalLanguage),
    ];
    CONFERENCES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_map_round_trips() {
        let map = ConferenceNameMap::builtin();
        for info in map.iter() {
            let name = map.display_name(info.code).unwrap();
            assert_eq!(map.code(name).unwrap(), info.code);
        }
    }

    #[test]
    fn builtin_map_is_bijective() {
        let map = ConferenceNameMap::builtin();
        let mut names = map.iter().map(|info| info.display_name.to_lowercase()).collect::<Vec<_>>();
        let len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), len);
    }

    #[test]
    fn lookups_ignore_case() {
        let map = ConferenceNameMap::builtin();
        assert_eq!(map.display_name("NIPS").unwrap(), "NeurIPS");
        assert_eq!(map.code("neurips").unwrap(), "nips");
        assert_eq!(map.resolve("siggraphasia").unwrap(), "SIGGRAPH Asia");
        assert_eq!(map.resolve("SIGGRAPH Asia").unwrap(), "SIGGRAPH Asia");
        assert_eq!(map.by_code("iclr").unwrap().area.label(), "ML");
    }

    #[test]
    fn unknown_conferences_are_rejected() {
        let map = ConferenceNameMap::builtin();
        assert!(matches!(map.display_name("foo"), Err(Error::UnknownConference(c)) if &*c == "foo"));
        assert!(matches!(map.code("Foo Conf"), Err(Error::UnknownConference(_))));
    }

    #[test]
    fn duplicate_display_names_are_rejected() {
        let result = ConferenceNameMap::new([
            ConferenceInfo {
                code: "a",
                display_name: "Same",
                area: Area::Others,
            },
            ConferenceInfo {
                code: "b",
                display_name: "same",
                area: Area::Others,
            },
        ]);
        assert!(matches!(result, Err(Error::NotBijective(name)) if &*name == "same"));
    }

    #[test]
    fn normalization_is_exact() {
        let map = ConferenceNameMap::builtin();
        assert_eq!(map.normalize("cvpr"), Some("CVPR"));
        assert_eq!(map.normalize("CVPR"), None);
        assert_eq!(map.normalize("unrelated"), None);
    }
}

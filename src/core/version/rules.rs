// ─── Rule Evaluator ───
// Decides whether a library or argument applies to the current platform.

use tracing::trace;

use super::version_file::{LibraryRule, RuleAction};
use crate::core::platform::{OsFamily, PlatformInfo};

/// Normalised rule: an action and an optional platform identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRule {
    pub action: RuleAction,
    /// `None` means the rule applies to every platform.
    pub os: Option<String>,
}

impl PlatformRule {
    pub fn allow(os: Option<&str>) -> Self {
        Self {
            action: RuleAction::Allow,
            os: os.map(str::to_ascii_lowercase),
        }
    }

    pub fn disallow(os: Option<&str>) -> Self {
        Self {
            action: RuleAction::Disallow,
            os: os.map(str::to_ascii_lowercase),
        }
    }
}

/// Evaluates rule lists against one platform and game version.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    platform: PlatformInfo,
    game_version: Option<String>,
}

impl RuleEvaluator {
    pub fn new(platform: PlatformInfo, game_version: Option<&str>) -> Self {
        Self {
            platform,
            game_version: game_version.map(str::to_string),
        }
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn game_version(&self) -> Option<&str> {
        self.game_version.as_deref()
    }

    /// Platform identifiers for this evaluator, most specific first.
    pub fn identifiers(&self) -> Vec<String> {
        self.platform.identifiers(self.game_version.as_deref())
    }

    /// Evaluate raw manifest rules.
    pub fn allows(&self, rules: &[LibraryRule]) -> bool {
        if rules.is_empty() {
            return true;
        }
        let converted: Vec<PlatformRule> = rules
            .iter()
            .filter_map(|rule| self.convert(rule))
            .collect();
        if converted.is_empty() {
            // Every rule was about another platform or an OS version we
            // never match: the library targets someone else.
            return false;
        }
        self.allows_normalized(&converted)
    }

    /// Evaluate already-normalised rules.
    pub fn allows_normalized(&self, rules: &[PlatformRule]) -> bool {
        if rules.is_empty() {
            return true;
        }

        let relevant: Vec<&PlatformRule> = rules
            .iter()
            .filter(|rule| match &rule.os {
                None => true,
                Some(os) => OsFamily::from_identifier(os) == Some(self.platform.os),
            })
            .collect();
        if relevant.is_empty() {
            return false;
        }

        let identifiers = self.identifiers();
        let selected: Vec<&PlatformRule> = identifiers
            .iter()
            .find(|identifier| {
                relevant
                    .iter()
                    .any(|rule| rule.os.as_deref() == Some(identifier.as_str()))
            })
            .map(|identifier| {
                relevant
                    .iter()
                    .copied()
                    .filter(|rule| match &rule.os {
                        None => true,
                        Some(os) => os == identifier,
                    })
                    .collect()
            })
            .unwrap_or_else(|| {
                relevant
                    .iter()
                    .copied()
                    .filter(|rule| rule.os.is_none())
                    .collect()
            });

        trace!(
            "rule selection for {:?}: {} of {} rules",
            identifiers.first(),
            selected.len(),
            rules.len()
        );

        if selected.is_empty() {
            return false;
        }
        if selected
            .iter()
            .any(|rule| rule.action == RuleAction::Disallow)
        {
            return false;
        }
        selected.iter().any(|rule| rule.action == RuleAction::Allow)
    }

    /// Convert a manifest rule. Returns `None` for rules that can never
    /// apply here: foreign OS families and OS-version constraints.
    fn convert(&self, rule: &LibraryRule) -> Option<PlatformRule> {
        let Some(os) = &rule.os else {
            return Some(PlatformRule {
                action: rule.action.clone(),
                os: None,
            });
        };

        // Version regexes only target ancient OS releases (osx 10.5 and the like).
        if os.version.is_some() {
            return None;
        }

        let identifier = match (&os.name, &os.arch) {
            (None, None) => None,
            (Some(name), None) => Some(name.to_ascii_lowercase()),
            (Some(name), Some(arch)) => Some(format!(
                "{}-{}",
                name.to_ascii_lowercase(),
                arch.to_ascii_lowercase()
            )),
            (None, Some(arch)) => Some(format!(
                "{}-{}",
                self.platform.os.as_str(),
                arch.to_ascii_lowercase()
            )),
        };

        if let Some(id) = &identifier {
            if OsFamily::from_identifier(id) != Some(self.platform.os) {
                return None;
            }
        }

        Some(PlatformRule {
            action: rule.action.clone(),
            os: identifier,
        })
    }
}

/// One-shot form of [`RuleEvaluator::allows`].
pub fn is_allowed(rules: &[LibraryRule], platform: &PlatformInfo, game_version: Option<&str>) -> bool {
    RuleEvaluator::new(platform.clone(), game_version).allows(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::OsRule;

    fn linux() -> PlatformInfo {
        PlatformInfo::new(OsFamily::Linux, "x86_64")
    }

    fn osx_arm() -> PlatformInfo {
        PlatformInfo::new(OsFamily::Osx, "arm64")
    }

    fn rule(action: RuleAction, name: Option<&str>) -> LibraryRule {
        LibraryRule {
            action,
            os: name.map(|n| OsRule {
                name: Some(n.to_string()),
                arch: None,
                version: None,
            }),
        }
    }

    #[test]
    fn no_rules_means_allowed() {
        assert!(is_allowed(&[], &linux(), Some("1.20.1")));
    }

    #[test]
    fn specific_disallow_beats_generic_allow() {
        let rules = vec![
            rule(RuleAction::Allow, None),
            rule(RuleAction::Disallow, Some("osx")),
        ];
        let on_osx = PlatformInfo::new(OsFamily::Osx, "x86_64");
        assert!(!is_allowed(&rules, &on_osx, Some("1.20.1")));
        assert!(is_allowed(&rules, &linux(), Some("1.20.1")));
    }

    #[test]
    fn rules_only_about_foreign_platforms_exclude() {
        let rules = vec![rule(RuleAction::Allow, Some("windows"))];
        assert!(!is_allowed(&rules, &linux(), None));
    }

    #[test]
    fn allow_only_current_os() {
        let rules = vec![rule(RuleAction::Allow, Some("linux"))];
        assert!(is_allowed(&rules, &linux(), None));
    }

    #[test]
    fn arch_tagged_rule_outranks_bare_os() {
        let evaluator = RuleEvaluator::new(osx_arm(), Some("1.20.1"));
        let rules = vec![
            PlatformRule::allow(Some("osx")),
            PlatformRule::disallow(Some("osx-arm64")),
        ];
        assert!(!evaluator.allows_normalized(&rules));

        let x86 = RuleEvaluator::new(PlatformInfo::new(OsFamily::Osx, "x86_64"), Some("1.20.1"));
        assert!(x86.allows_normalized(&rules));
    }

    #[test]
    fn low_versions_ignore_arch_tagged_rules() {
        let rules = vec![PlatformRule::allow(Some("osx-arm64"))];
        let modern = RuleEvaluator::new(osx_arm(), Some("1.20.1"));
        let legacy = RuleEvaluator::new(osx_arm(), Some("1.16.5"));
        assert!(modern.allows_normalized(&rules));
        assert!(!legacy.allows_normalized(&rules));
    }

    #[test]
    fn disallow_wins_within_same_tier() {
        let evaluator = RuleEvaluator::new(linux(), None);
        let rules = vec![
            PlatformRule::allow(Some("linux")),
            PlatformRule::disallow(Some("linux")),
        ];
        assert!(!evaluator.allows_normalized(&rules));
    }

    #[test]
    fn os_version_constraints_never_match() {
        let rules = vec![
            rule(RuleAction::Allow, None),
            LibraryRule {
                action: RuleAction::Disallow,
                os: Some(OsRule {
                    name: Some("osx".into()),
                    arch: None,
                    version: Some("^10\\.5\\.\\d$".into()),
                }),
            },
        ];
        let on_osx = PlatformInfo::new(OsFamily::Osx, "x86_64");
        assert!(is_allowed(&rules, &on_osx, Some("1.7.10")));
    }
}

//! Skills users offer to the marketplace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use swap_core::{AttachmentId, Credits, SkillId, UserId};
use tracing::info;

use crate::error::{MarketError, Result};

/// Maximum length of a skill name.
const MAX_NAME_LEN: usize = 80;

/// Self-assessed proficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    /// Learning the craft.
    Beginner,
    /// Comfortable with routine jobs.
    Intermediate,
    /// Professional quality.
    Expert,
}

impl SkillLevel {
    /// Points this level contributes to a match score.
    #[must_use]
    pub const fn weight(self) -> u8 {
        match self {
            Self::Beginner => 20,
            Self::Intermediate => 35,
            Self::Expert => 50,
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

impl FromStr for SkillLevel {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "expert" => Ok(Self::Expert),
            other => Err(MarketError::InvalidSkill {
                reason: format!("unknown level: {other}"),
            }),
        }
    }
}

/// A listed skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill identifier.
    pub id: SkillId,
    /// The user offering it.
    pub owner: UserId,
    /// Short name, e.g. "Guitar lessons".
    pub name: String,
    /// Normalized category used for matching.
    pub category: String,
    /// Proficiency.
    pub level: SkillLevel,
    /// Asking price per hour.
    pub hourly_rate: Credits,
    /// Optional free text.
    pub description: Option<String>,
    /// Portfolio attachments.
    pub portfolio: Vec<AttachmentId>,
    /// When the skill was listed.
    pub created_at: DateTime<Utc>,
}

/// Input for listing a skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSkill {
    /// Short name.
    pub name: String,
    /// Category, normalized on insert.
    pub category: String,
    /// Proficiency.
    pub level: SkillLevel,
    /// Asking price per hour.
    pub hourly_rate: Credits,
    /// Optional free text.
    pub description: Option<String>,
    /// Portfolio attachments.
    pub portfolio: Vec<AttachmentId>,
}

/// Lowercases and trims a category.
///
/// # Errors
///
/// Returns [`MarketError::InvalidSkill`] if the category is blank.
pub fn normalize_category(category: &str) -> Result<String> {
    let category = category.trim().to_lowercase();
    if category.is_empty() {
        return Err(MarketError::InvalidSkill {
            reason: "category cannot be empty".to_string(),
        });
    }
    Ok(category)
}

/// Every listed skill.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SkillCatalog {
    skills: HashMap<SkillId, Skill>,
}

impl SkillCatalog {
    /// Creates a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists a skill for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidSkill`] for a blank or overlong name or a
    /// blank category.
    pub fn add(&mut self, owner: &UserId, skill: NewSkill, now: DateTime<Utc>) -> Result<SkillId> {
        let name = skill.name.trim().to_string();
        if name.is_empty() {
            return Err(MarketError::InvalidSkill {
                reason: "name cannot be empty".to_string(),
            });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(MarketError::InvalidSkill {
                reason: format!("name exceeds {MAX_NAME_LEN} characters"),
            });
        }
        let category = normalize_category(&skill.category)?;
        let description = skill
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let id = SkillId::new();
        self.skills.insert(
            id.clone(),
            Skill {
                id: id.clone(),
                owner: owner.clone(),
                name,
                category: category.clone(),
                level: skill.level,
                hourly_rate: skill.hourly_rate,
                description,
                portfolio: skill.portfolio,
                created_at: now,
            },
        );
        info!(skill_id = %id, owner = %owner, %category, "listed skill");
        Ok(id)
    }

    /// Removes a skill. Only its owner may do this.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] or [`MarketError::NotAuthorized`].
    pub fn remove(&mut self, owner: &UserId, id: &SkillId) -> Result<Skill> {
        self.require_owned(owner, id)?;
        self.skills
            .remove(id)
            .ok_or_else(|| MarketError::not_found("skill", id))
    }

    /// Adds a portfolio attachment to an owned skill.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] or [`MarketError::NotAuthorized`].
    pub fn attach(&mut self, owner: &UserId, id: &SkillId, attachment: AttachmentId) -> Result<()> {
        self.require_owned(owner, id)?;
        if let Some(skill) = self.skills.get_mut(id) {
            if !skill.portfolio.contains(&attachment) {
                skill.portfolio.push(attachment);
            }
        }
        Ok(())
    }

    /// Gets a skill by ID.
    #[must_use]
    pub fn get(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.get(id)
    }

    /// Gets a skill, failing if it is absent or owned by someone else.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] or [`MarketError::NotAuthorized`].
    pub fn require_owned(&self, owner: &UserId, id: &SkillId) -> Result<&Skill> {
        let skill = self
            .skills
            .get(id)
            .ok_or_else(|| MarketError::not_found("skill", id))?;
        if &skill.owner != owner {
            return Err(MarketError::not_authorized(format!(
                "skill {id} belongs to another user"
            )));
        }
        Ok(skill)
    }

    /// Skills listed by a user, oldest first.
    #[must_use]
    pub fn owned_by(&self, owner: &UserId) -> Vec<&Skill> {
        let mut skills: Vec<_> = self.skills.values().filter(|s| &s.owner == owner).collect();
        skills.sort_by_key(|s| s.created_at);
        skills
    }

    /// Skills in a category. The category is normalized before comparing.
    #[must_use]
    pub fn in_category(&self, category: &str) -> Vec<&Skill> {
        let wanted = category.trim().to_lowercase();
        self.skills
            .values()
            .filter(|s| s.category == wanted)
            .collect()
    }

    /// Number of listed skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Returns true if no skills are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn guitar() -> NewSkill {
        NewSkill {
            name: "Guitar lessons".to_string(),
            category: " Music ".to_string(),
            level: SkillLevel::Expert,
            hourly_rate: Credits::new(20),
            description: Some("  ".to_string()),
            portfolio: Vec::new(),
        }
    }

    #[test_case(SkillLevel::Beginner, 20)]
    #[test_case(SkillLevel::Intermediate, 35)]
    #[test_case(SkillLevel::Expert, 50)]
    fn level_weights(level: SkillLevel, weight: u8) {
        assert_eq!(level.weight(), weight);
    }

    #[test_case("expert", SkillLevel::Expert)]
    #[test_case(" Beginner", SkillLevel::Beginner)]
    #[test_case("INTERMEDIATE", SkillLevel::Intermediate)]
    fn level_parses(input: &str, expected: SkillLevel) {
        assert_eq!(input.parse::<SkillLevel>(), Ok(expected));
    }

    #[test]
    fn add_normalizes_fields() {
        let mut catalog = SkillCatalog::new();
        let owner = UserId::new();
        let id = catalog.add(&owner, guitar(), Utc::now()).expect("add");

        let skill = catalog.get(&id).expect("skill");
        assert_eq!(skill.category, "music");
        assert!(skill.description.is_none());
        assert_eq!(catalog.in_category("MUSIC").len(), 1);
        assert_eq!(catalog.owned_by(&owner).len(), 1);
    }

    #[test]
    fn blank_name_or_category_is_rejected() {
        let mut catalog = SkillCatalog::new();
        let owner = UserId::new();
        let mut blank = guitar();
        blank.name = "   ".to_string();
        assert!(matches!(
            catalog.add(&owner, blank, Utc::now()),
            Err(MarketError::InvalidSkill { .. })
        ));

        let mut uncategorized = guitar();
        uncategorized.category = String::new();
        assert!(catalog.add(&owner, uncategorized, Utc::now()).is_err());
        assert!(catalog.is_empty());
    }

    #[test]
    fn only_owner_can_remove_or_attach() {
        let mut catalog = SkillCatalog::new();
        let owner = UserId::new();
        let stranger = UserId::new();
        let id = catalog.add(&owner, guitar(), Utc::now()).expect("add");
        let photo = AttachmentId::new();

        assert!(matches!(
            catalog.attach(&stranger, &id, photo.clone()),
            Err(MarketError::NotAuthorized { .. })
        ));
        catalog.attach(&owner, &id, photo.clone()).expect("attach");
        catalog.attach(&owner, &id, photo).expect("attach twice");
        assert_eq!(catalog.get(&id).expect("skill").portfolio.len(), 1);

        assert!(catalog.remove(&stranger, &id).is_err());
        catalog.remove(&owner, &id).expect("remove");
        assert!(matches!(
            catalog.remove(&owner, &id),
            Err(MarketError::NotFound { .. })
        ));
    }
}

//! Learner preferences collected during onboarding

use serde::{Deserialize, Serialize};

/// The seven onboarding answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub learning_style: String,
    #[serde(default)]
    pub learning_pace: String,
    #[serde(default)]
    pub learning_approach: String,
    #[serde(default)]
    pub preferred_time: String,
    #[serde(default)]
    pub session_duration: String,
    #[serde(default)]
    pub learning_environment: String,
    #[serde(default)]
    pub learning_strength: String,
}

impl UserPreferences {
    /// Labelled lines used when describing a learner to the model
    pub fn labelled(&self) -> [(&'static str, &str); 7] {
        [
            ("Learning Style", &self.learning_style),
            ("Learning Pace", &self.learning_pace),
            ("Learning Approach", &self.learning_approach),
            ("Preferred Time", &self.preferred_time),
            ("Session Duration", &self.session_duration),
            ("Learning Environment", &self.learning_environment),
            ("Learning Strength", &self.learning_strength),
        ]
    }
}

/// Partial preferences; present keys replace stored ones
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub learning_style: Option<String>,
    pub learning_pace: Option<String>,
    pub learning_approach: Option<String>,
    pub preferred_time: Option<String>,
    pub session_duration: Option<String>,
    pub learning_environment: Option<String>,
    pub learning_strength: Option<String>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.learning_style.is_none()
            && self.learning_pace.is_none()
            && self.learning_approach.is_none()
            && self.preferred_time.is_none()
            && self.session_duration.is_none()
            && self.learning_environment.is_none()
            && self.learning_strength.is_none()
    }

    /// Merge into existing preferences (or an empty set)
    pub fn merge_into(self, base: Option<UserPreferences>) -> UserPreferences {
        let mut merged = base.unwrap_or_default();
        let fields = [
            (&mut merged.learning_style, self.learning_style),
            (&mut merged.learning_pace, self.learning_pace),
            (&mut merged.learning_approach, self.learning_approach),
            (&mut merged.preferred_time, self.preferred_time),
            (&mut merged.session_duration, self.session_duration),
            (&mut merged.learning_environment, self.learning_environment),
            (&mut merged.learning_strength, self.learning_strength),
        ];
        for (target, value) in fields {
            if let Some(v) = value {
                *target = v;
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_wire_names() {
        let prefs: UserPreferences = serde_json::from_str(
            r#"{"learningStyle":"visual","learningPace":"steady","preferredTime":"morning"}"#,
        )
        .unwrap();
        assert_eq!(prefs.learning_style, "visual");
        assert_eq!(prefs.learning_pace, "steady");
        assert_eq!(prefs.preferred_time, "morning");
        assert_eq!(prefs.learning_strength, "");

        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["sessionDuration"], "");
    }

    #[test]
    fn test_patch_merges_over_existing() {
        let base = UserPreferences {
            learning_style: "visual".to_string(),
            learning_pace: "steady".to_string(),
            ..Default::default()
        };
        let patch: PreferencesPatch =
            serde_json::from_str(r#"{"learningPace":"fast","learningStrength":"practice"}"#).unwrap();
        assert!(!patch.is_empty());

        let merged = patch.merge_into(Some(base));
        assert_eq!(merged.learning_style, "visual");
        assert_eq!(merged.learning_pace, "fast");
        assert_eq!(merged.learning_strength, "practice");
    }

    #[test]
    fn test_patch_onto_nothing() {
        let patch: PreferencesPatch = serde_json::from_str(r#"{"learningStyle":"auditory"}"#).unwrap();
        let merged = patch.merge_into(None);
        assert_eq!(merged.learning_style, "auditory");
        assert_eq!(merged.learning_pace, "");
    }

    #[test]
    fn test_empty_patch() {
        let patch: PreferencesPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_labelled_order() {
        let labels: Vec<&str> = UserPreferences::default()
            .labelled()
            .iter()
            .map(|(label, _)| *label)
            .collect();
        assert_eq!(labels[0], "Learning Style");
        assert_eq!(labels[6], "Learning Strength");
    }
}
